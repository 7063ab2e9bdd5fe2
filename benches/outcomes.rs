use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wager_engine::games::crash::sample_crash_point;
use wager_engine::games::dice::DiceRound;
use wager_engine::games::mines::{MinesOdds, MinesRound};
use wager_engine::games::plinko::PlinkoRound;
use wager_engine::games::{Direction, GameInput, GameParams, GameProcessor, RiskLevel, StdRandom};
use wager_engine::EngineConfig;

fn bench_crash_point(c: &mut Criterion) {
    let config = EngineConfig::default();
    let mut rng = StdRandom::seeded(7);

    c.bench_function("sample_crash_point", |b| {
        b.iter(|| sample_crash_point(black_box(&config.crash), &mut rng))
    });
}

fn bench_mines_start(c: &mut Criterion) {
    let config = EngineConfig::default();
    let odds = MinesOdds::new(&config.mines);
    let mut rng = StdRandom::seeded(7);

    c.bench_function("mines_start_5", |b| {
        b.iter(|| MinesRound::start(black_box(5), &odds, &mut rng))
    });
}

fn bench_plinko_drop(c: &mut Criterion) {
    let config = EngineConfig::default();
    let mut rng = StdRandom::seeded(7);

    c.bench_function("plinko_drop_16", |b| {
        b.iter(|| PlinkoRound::start(black_box(16), RiskLevel::High, &config.plinko, &mut rng))
    });
}

fn bench_dice_roll(c: &mut Criterion) {
    let config = EngineConfig::default();
    let mut rng = StdRandom::seeded(7);

    c.bench_function("dice_roll", |b| {
        b.iter(|| DiceRound::start(black_box(50.5), Direction::Over, &config.dice, &mut rng))
    });
}

fn bench_processor_round_trip(c: &mut Criterion) {
    let processor = GameProcessor::with_rng(EngineConfig::testing(), StdRandom::seeded(7));

    c.bench_function("processor_mines_reveal_cash_out", |b| {
        b.iter(|| {
            processor.reset().ok();
            if let Ok(id) = processor.start_round(GameParams::Mines { mines: 1 }, 1.0) {
                let _ = processor.act(id, GameInput::Reveal(0));
                let _ = processor.cash_out(id);
            }
        })
    });
}

criterion_group!(
    benches,
    bench_crash_point,
    bench_mines_start,
    bench_plinko_drop,
    bench_dice_roll,
    bench_processor_round_trip
);
criterion_main!(benches);
