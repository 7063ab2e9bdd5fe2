//! Wager Engine CLI
//!
//! Plays single rounds against the persisted balance, runs strategy
//! simulations and manages configuration.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wager_engine::{
    common::types::format_money,
    games::{
        Difficulty, Direction, RiskLevel, RoundView, Simulator, StdRandom, Strategy,
    },
    generate_sample_config, ConfigLoader, GameInput, GameParams, GameProcessor,
    SessionState, SessionStatus, WagerResult,
};

/// Wager Engine CLI
#[derive(Parser)]
#[command(name = "wager-engine")]
#[command(about = "Wagering engine for single-player mini-games")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print engine counters in Prometheus format when done
    #[arg(long)]
    metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current balance
    Balance,

    /// Show recent settlements, newest first
    History {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Restore the starting balance and clear history
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Play one round
    Play {
        #[command(subcommand)]
        game: PlayCommand,
    },

    /// Simulate a fixed strategy and report the observed return
    Simulate {
        #[arg(short, long, value_enum)]
        game: GameArg,

        #[arg(short, long, default_value = "10000")]
        rounds: u64,

        #[arg(short, long, default_value = "1.0")]
        stake: f64,

        #[arg(long, default_value = "3")]
        mines: u8,

        /// Cells revealed before cashing out
        #[arg(long, default_value = "2")]
        reveals: u8,

        #[arg(long, value_enum, default_value = "medium")]
        difficulty: DifficultyArg,

        /// Floors climbed before cashing out
        #[arg(long, default_value = "2")]
        floors: u8,

        /// Crash cash-out point or limbo target
        #[arg(long, default_value = "2.0")]
        target: f64,

        #[arg(long, default_value = "50.0")]
        threshold: f64,

        /// Bet under the threshold instead of over
        #[arg(long)]
        under: bool,

        #[arg(long, default_value = "12")]
        rows: u8,

        #[arg(long, value_enum, default_value = "medium")]
        risk: RiskArg,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum PlayCommand {
    /// Threshold roll
    Dice {
        #[arg(short, long)]
        stake: f64,
        #[arg(short, long)]
        threshold: f64,
        #[arg(long, conflicts_with = "under")]
        over: bool,
        #[arg(long)]
        under: bool,
    },
    /// Instant ascending multiplier
    Limbo {
        #[arg(short, long)]
        stake: f64,
        #[arg(short, long)]
        target: f64,
    },
    /// Row drop
    Plinko {
        #[arg(short, long)]
        stake: f64,
        #[arg(long, default_value = "12")]
        rows: u8,
        #[arg(long, value_enum, default_value = "medium")]
        risk: RiskArg,
    },
    /// Grid reveal
    Mines {
        #[arg(short, long)]
        stake: f64,
        #[arg(short, long)]
        mines: u8,
        /// Cells to reveal, in order
        #[arg(long, value_delimiter = ',')]
        reveal: Vec<u8>,
        #[arg(long)]
        cash_out: bool,
    },
    /// Tower climb
    Tower {
        #[arg(short, long)]
        stake: f64,
        #[arg(long, value_enum, default_value = "medium")]
        difficulty: DifficultyArg,
        /// Door per floor, bottom first
        #[arg(long, value_delimiter = ',')]
        doors: Vec<u8>,
        #[arg(long)]
        cash_out: bool,
    },
    /// Live ascending multiplier with automatic cash-out
    Crash {
        #[arg(short, long)]
        stake: f64,
        #[arg(long)]
        cash_out_at: f64,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write the default configuration as TOML
    Init { path: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum GameArg {
    Mines,
    Tower,
    Crash,
    Limbo,
    Dice,
    Plinko,
}

#[derive(Clone, Copy, ValueEnum)]
enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Medium => Difficulty::Medium,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RiskArg {
    Low,
    Medium,
    High,
}

impl From<RiskArg> for RiskLevel {
    fn from(arg: RiskArg) -> Self {
        match arg {
            RiskArg::Low => RiskLevel::Low,
            RiskArg::Medium => RiskLevel::Medium,
            RiskArg::High => RiskLevel::High,
        }
    }
}

#[tokio::main]
async fn main() -> WagerResult<()> {
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;

    let default_level = if cli.verbose {
        "debug"
    } else {
        config.monitoring.log_level.as_filter()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let processor = match cli.command {
        Commands::Config { action } => return run_config(action),
        Commands::Simulate {
            game,
            rounds,
            stake,
            mines,
            reveals,
            difficulty,
            floors,
            target,
            threshold,
            under,
            rows,
            risk,
            seed,
        } => {
            let strategy = match game {
                GameArg::Mines => Strategy::Mines { mines, reveals },
                GameArg::Tower => Strategy::Tower {
                    difficulty: difficulty.into(),
                    floors,
                },
                GameArg::Crash => Strategy::Crash { cash_out_at: target },
                GameArg::Limbo => Strategy::Limbo { target },
                GameArg::Dice => Strategy::Dice {
                    threshold,
                    direction: direction(under),
                },
                GameArg::Plinko => Strategy::Plinko {
                    rows,
                    risk: risk.into(),
                },
            };
            let rng = match seed {
                Some(seed) => StdRandom::seeded(seed),
                None => StdRandom::new(),
            };
            let report = Simulator::new(config, rng).run(strategy, rounds, stake)?;
            println!("{}", report.render());
            return Ok(());
        }
        command => {
            let processor = GameProcessor::from_config(config)?;
            run_command(&processor, command).await?;
            processor
        }
    };

    if cli.metrics {
        if processor.config().monitoring.enable_metrics {
            print!("{}", processor.metrics().render_prometheus());
        } else {
            warn!("Metrics are disabled in the configuration");
        }
    }
    Ok(())
}

fn run_config(action: ConfigCommand) -> WagerResult<()> {
    match action {
        ConfigCommand::Init { path } => {
            generate_sample_config(&path.to_string_lossy())?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}

async fn run_command(processor: &GameProcessor, command: Commands) -> WagerResult<()> {
    match command {
        Commands::Balance => {
            println!("Balance: {}", format_money(processor.balance()));
        }
        Commands::History { limit } => {
            let entries = processor.history(limit);
            if entries.is_empty() {
                println!("No settled rounds yet");
            }
            for entry in entries {
                println!(
                    "{}  {:<6}  stake {:>10}  x{:<8.2}  profit {:>10}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.game.to_string(),
                    format_money(entry.stake),
                    entry.multiplier,
                    format_money(entry.profit)
                );
            }
        }
        Commands::Reset { yes } => {
            if !yes {
                println!("Reset clears all history; pass --yes to confirm");
                return Ok(());
            }
            let balance = processor.reset()?;
            println!("Balance reset to {}", format_money(balance));
        }
        Commands::Play { game } => play(processor, game).await?,
        Commands::Simulate { .. } | Commands::Config { .. } => {}
    }
    Ok(())
}

async fn play(processor: &GameProcessor, game: PlayCommand) -> WagerResult<()> {
    let state = match game {
        PlayCommand::Dice {
            stake,
            threshold,
            over: _,
            under,
        } => {
            let params = GameParams::Dice {
                threshold,
                direction: direction(under),
            };
            let id = processor.start_round(params, stake)?;
            processor.get_state(id)?
        }
        PlayCommand::Limbo { stake, target } => {
            let id = processor.start_round(GameParams::Limbo { target }, stake)?;
            processor.get_state(id)?
        }
        PlayCommand::Plinko { stake, rows, risk } => {
            let params = GameParams::Plinko {
                rows,
                risk: risk.into(),
            };
            let id = processor.start_round(params, stake)?;
            processor.get_state(id)?
        }
        PlayCommand::Mines {
            stake,
            mines,
            reveal,
            cash_out,
        } => {
            let id = processor.start_round(GameParams::Mines { mines }, stake)?;
            let mut state = processor.get_state(id)?;
            for cell in reveal {
                if state.status != SessionStatus::Active {
                    break;
                }
                state = processor.act(id, GameInput::Reveal(cell))?;
            }
            if cash_out && state.status == SessionStatus::Active {
                state = processor.cash_out(id)?;
            }
            state
        }
        PlayCommand::Tower {
            stake,
            difficulty,
            doors,
            cash_out,
        } => {
            let params = GameParams::Tower {
                difficulty: difficulty.into(),
            };
            let id = processor.start_round(params, stake)?;
            let mut state = processor.get_state(id)?;
            for door in doors {
                if state.status != SessionStatus::Active {
                    break;
                }
                state = processor.act(id, GameInput::Door(door))?;
            }
            if cash_out && state.status == SessionStatus::Active {
                state = processor.cash_out(id)?;
            }
            state
        }
        PlayCommand::Crash { stake, cash_out_at } => play_crash(processor, stake, cash_out_at).await?,
    };

    if state.status == SessionStatus::Active {
        // Rounds do not outlive the process; keep the debit
        warn!("Round {} left open, stake forfeited", state.session_id);
        processor.save_state()?;
    }

    print_state(&state);
    println!("Balance: {}", format_money(processor.balance()));
    Ok(())
}

async fn play_crash(processor: &GameProcessor, stake: f64, cash_out_at: f64) -> WagerResult<SessionState> {
    let handle = processor.start_live_crash(stake)?;
    let mut ticks = handle.subscribe();
    info!("Crash round {} live, cashing out at {:.2}x", handle.session_id(), cash_out_at);

    let state = loop {
        tokio::select! {
            settled = handle.finished() => break settled?,
            changed = ticks.changed() => {
                if changed.is_err() {
                    break handle.finished().await?;
                }
                let current = *ticks.borrow();
                println!("  {:.2}x", current);
                if current >= cash_out_at {
                    break handle.cash_out().await?;
                }
            }
        }
    };
    Ok(state)
}

fn print_state(state: &SessionState) {
    println!(
        "{} round {}: {} at {:.2}x, payout {}",
        state.game,
        state.session_id,
        state.status,
        state.multiplier,
        format_money(state.payout)
    );

    match &state.round {
        RoundView::Mines {
            revealed,
            mine_positions,
            ..
        } => {
            println!("  revealed: {:?}", revealed);
            if let Some(mines) = mine_positions {
                println!("  mines:    {:?}", mines);
            }
        }
        RoundView::Tower {
            current_floor,
            picks,
            eggs,
            ..
        } => {
            println!("  floor {} picks {:?}", current_floor, picks);
            for (floor, eggs) in eggs.iter().enumerate() {
                if let Some(eggs) = eggs {
                    println!("  floor {} eggs {:?}", floor, eggs);
                }
            }
        }
        RoundView::Crash { crash_point, .. } => {
            if let Some(point) = crash_point {
                println!("  crashed at {:.2}x", point);
            }
        }
        RoundView::Limbo { target, crash_point } => {
            println!("  target {:.2}x, result {:.2}x", target, crash_point);
        }
        RoundView::Dice {
            threshold,
            direction,
            win_chance,
            roll,
        } => {
            println!(
                "  rolled {:.2} ({} {:.2}, {:.2}% chance)",
                roll, direction, threshold, win_chance
            );
        }
        RoundView::Plinko { path, bucket, .. } => {
            let path: String = path.iter().map(|&right| if right { 'R' } else { 'L' }).collect();
            println!("  path {} into bucket {}", path, bucket);
        }
    }
}

fn direction(under: bool) -> Direction {
    if under {
        Direction::Under
    } else {
        Direction::Over
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_play_mines() {
        let cli = Cli::parse_from([
            "wager-engine", "play", "mines", "--stake", "1", "--mines", "3", "--reveal", "0,4,9",
            "--cash-out",
        ]);
        match cli.command {
            Commands::Play {
                game: PlayCommand::Mines { reveal, cash_out, .. },
            } => {
                assert_eq!(reveal, vec![0, 4, 9]);
                assert!(cash_out);
            }
            _ => panic!("unexpected command"),
        }
    }
}
