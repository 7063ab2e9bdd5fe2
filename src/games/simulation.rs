//! Batch simulation of fixed strategies
//!
//! Plays many rounds of one game against a private ledger and reports the
//! observed return-to-player. Live crash rounds are simulated by resolving
//! the cash-out at the strategy's target directly, which settles exactly as
//! the live driver would for a player who cashes out when the curve shows
//! that value.

use crate::common::traits::RandomSource;
use crate::config::{EngineConfig, LedgerConfig};
use crate::errors::{ParameterError, WagerResult};
use crate::games::mines::MinesOdds;
use crate::games::session::{BetSession, RoundState};
use crate::games::types::{
    Difficulty, Direction, GameInput, GameParams, GameType, RiskLevel, RoundResult, RoundView,
    SessionStatus,
};
use crate::ledger::{HistoryEntry, Ledger};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Fixed per-round decision rule
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum Strategy {
    /// Reveal `reveals` random cells, then cash out
    Mines { mines: u8, reveals: u8 },
    /// Pick random doors for `floors` floors, then cash out
    Tower { difficulty: Difficulty, floors: u8 },
    /// Cash out when the curve shows `cash_out_at`
    Crash { cash_out_at: f64 },
    Limbo { target: f64 },
    Dice { threshold: f64, direction: Direction },
    Plinko { rows: u8, risk: RiskLevel },
}

impl Strategy {
    pub fn params(&self) -> GameParams {
        match *self {
            Strategy::Mines { mines, .. } => GameParams::Mines { mines },
            Strategy::Tower { difficulty, .. } => GameParams::Tower { difficulty },
            Strategy::Crash { .. } => GameParams::Crash,
            Strategy::Limbo { target } => GameParams::Limbo { target },
            Strategy::Dice {
                threshold,
                direction,
            } => GameParams::Dice {
                threshold,
                direction,
            },
            Strategy::Plinko { rows, risk } => GameParams::Plinko { rows, risk },
        }
    }

    pub fn game_type(&self) -> GameType {
        self.params().game_type()
    }

    fn validate(&self, config: &EngineConfig) -> WagerResult<()> {
        match *self {
            Strategy::Mines { mines, reveals } => {
                let max = config.mines.grid_size.saturating_sub(mines);
                if reveals == 0 || reveals > max {
                    return Err(ParameterError::StrategyBounds {
                        field: "reveals",
                        value: reveals,
                        max,
                    }
                    .into());
                }
            }
            Strategy::Tower { floors, .. } => {
                if floors == 0 || floors > config.tower.floors {
                    return Err(ParameterError::StrategyBounds {
                        field: "floors",
                        value: floors,
                        max: config.tower.floors,
                    }
                    .into());
                }
            }
            Strategy::Crash { cash_out_at } => {
                if !(cash_out_at.is_finite() && cash_out_at >= 1.0) {
                    return Err(ParameterError::TargetMultiplier {
                        target: cash_out_at,
                        min: 1.0,
                        max: config.crash.max_crash_point,
                    }
                    .into());
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Mines { mines, reveals } => {
                write!(f, "mines k={} reveal {} then cash out", mines, reveals)
            }
            Strategy::Tower { difficulty, floors } => {
                write!(f, "tower {} climb {} floors", difficulty, floors)
            }
            Strategy::Crash { cash_out_at } => write!(f, "crash cash out at {:.2}x", cash_out_at),
            Strategy::Limbo { target } => write!(f, "limbo target {:.2}x", target),
            Strategy::Dice {
                threshold,
                direction,
            } => write!(f, "dice {} {:.2}", direction, threshold),
            Strategy::Plinko { rows, risk } => write!(f, "plinko {} rows {} risk", rows, risk),
        }
    }
}

/// Aggregate results of a simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub game: GameType,
    pub strategy: String,
    pub rounds: u64,
    pub stake: f64,
    pub wagered: f64,
    pub returned: f64,
    /// Rounds that returned more than the stake
    pub profitable: u64,
    pub lost: u64,
    pub max_multiplier: f64,
    pub final_balance: f64,
    pub elapsed: Duration,
}

impl SimulationReport {
    /// Returned over wagered
    pub fn rtp(&self) -> f64 {
        if self.wagered > 0.0 {
            self.returned / self.wagered
        } else {
            0.0
        }
    }

    pub fn house_edge(&self) -> f64 {
        1.0 - self.rtp()
    }

    pub fn win_rate(&self) -> f64 {
        if self.rounds > 0 {
            self.profitable as f64 / self.rounds as f64
        } else {
            0.0
        }
    }

    pub fn average_multiplier(&self) -> f64 {
        if self.rounds > 0 {
            self.returned / (self.stake * self.rounds as f64)
        } else {
            0.0
        }
    }

    /// Human-readable summary
    pub fn render(&self) -> String {
        let mut report = String::new();

        report.push_str(&format!("Simulation: {}\n", self.strategy));
        report.push_str(&format!("{}\n", "=".repeat(50)));
        report.push_str(&format!("Rounds:          {}\n", self.rounds));
        report.push_str(&format!(
            "Wagered:         {:.2} ({:.2} per round)\n",
            self.wagered, self.stake
        ));
        report.push_str(&format!("Returned:        {:.2}\n", self.returned));
        report.push_str(&format!("RTP:             {:.3}%\n", self.rtp() * 100.0));
        report.push_str(&format!("House edge:      {:.3}%\n", self.house_edge() * 100.0));
        report.push_str(&format!(
            "Win rate:        {:.2}% ({} lost outright)\n",
            self.win_rate() * 100.0,
            self.lost
        ));
        report.push_str(&format!("Avg multiplier:  {:.4}x\n", self.average_multiplier()));
        report.push_str(&format!("Max multiplier:  {:.2}x\n", self.max_multiplier));
        report.push_str(&format!("Final balance:   {:.2}\n", self.final_balance));
        report.push_str(&format!("Elapsed:         {:?}\n", self.elapsed));

        report
    }
}

/// Runs strategies against an isolated ledger
pub struct Simulator {
    config: EngineConfig,
    odds: MinesOdds,
    rng: Box<dyn RandomSource>,
}

impl Simulator {
    pub fn new<R: RandomSource + 'static>(config: EngineConfig, rng: R) -> Self {
        Self {
            odds: MinesOdds::new(&config.mines),
            config,
            rng: Box::new(rng),
        }
    }

    /// Play `rounds` rounds of `strategy` at a flat `stake`
    pub fn run(&mut self, strategy: Strategy, rounds: u64, stake: f64) -> WagerResult<SimulationReport> {
        strategy.validate(&self.config)?;
        RoundState::validate(&strategy.params(), &self.config, &self.odds)?;

        // Bankroll large enough that every round can be staked
        let ledger = Ledger::new(LedgerConfig {
            starting_balance: stake * rounds as f64,
            history_capacity: 1,
            ..self.config.ledger.clone()
        });

        let started = Instant::now();
        let mut report = SimulationReport {
            game: strategy.game_type(),
            strategy: strategy.to_string(),
            rounds,
            stake,
            wagered: 0.0,
            returned: 0.0,
            profitable: 0,
            lost: 0,
            max_multiplier: 0.0,
            final_balance: 0.0,
            elapsed: Duration::ZERO,
        };

        for _ in 0..rounds {
            ledger.place_stake(stake)?;
            let session = self.play_round(strategy, stake)?;

            let entry = HistoryEntry::new(session.id(), session.game(), stake, session.multiplier());
            report.wagered += stake;
            report.returned += entry.payout;
            report.max_multiplier = report.max_multiplier.max(entry.multiplier);
            if entry.is_win() {
                report.profitable += 1;
            }
            if session.status() == SessionStatus::Lost {
                report.lost += 1;
            }
            ledger.settle(entry);
        }

        report.final_balance = ledger.balance();
        report.elapsed = started.elapsed();
        debug!(
            "Simulated {} rounds of {} in {:?}",
            rounds, report.strategy, report.elapsed
        );
        Ok(report)
    }

    fn play_round(&mut self, strategy: Strategy, stake: f64) -> WagerResult<BetSession> {
        let (round, result) =
            RoundState::start(strategy.params(), &self.config, &self.odds, self.rng.as_mut())?;
        let mut session = BetSession::new(stake, round);
        session.apply(result);

        match strategy {
            Strategy::Mines { reveals, .. } => {
                for _ in 0..reveals {
                    if !session.is_active() {
                        break;
                    }
                    let cell = self.pick_hidden_cell(&session);
                    session.act(GameInput::Reveal(cell))?;
                }
                if session.is_active() {
                    session.cash_out()?;
                }
            }
            Strategy::Tower { floors, .. } => {
                for _ in 0..floors {
                    if !session.is_active() {
                        break;
                    }
                    let door = self.rng.draw_int(self.config.tower.doors as u32) as u8;
                    session.act(GameInput::Door(door))?;
                }
                if session.is_active() {
                    session.cash_out()?;
                }
            }
            Strategy::Crash { cash_out_at } => {
                let result = match session.round_mut().as_crash_mut() {
                    Some(round) => round.resolve_cash_out(cash_out_at),
                    None => RoundResult::Loss,
                };
                session.apply(result);
            }
            Strategy::Limbo { .. } | Strategy::Dice { .. } | Strategy::Plinko { .. } => {}
        }

        Ok(session)
    }

    fn pick_hidden_cell(&mut self, session: &BetSession) -> u8 {
        let revealed = match session.round().view(false) {
            RoundView::Mines { revealed, .. } => revealed,
            _ => Vec::new(),
        };
        let hidden: Vec<u8> = (0..self.odds.grid_size())
            .filter(|cell| !revealed.contains(cell))
            .collect();
        hidden[self.rng.draw_int(hidden.len() as u32) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WagerError;
    use crate::games::rng::StdRandom;

    fn simulator(seed: u64) -> Simulator {
        Simulator::new(EngineConfig::testing(), StdRandom::seeded(seed))
    }

    #[test]
    fn test_dice_rtp_matches_edge() {
        let report = simulator(1)
            .run(
                Strategy::Dice {
                    threshold: 50.0,
                    direction: Direction::Over,
                },
                400_000,
                1.0,
            )
            .unwrap();

        assert!((report.rtp() - 0.99).abs() < 0.01, "rtp {}", report.rtp());
        assert!(report.rtp() < 1.0);
        assert_eq!(report.lost + report.profitable, report.rounds);
    }

    #[test]
    fn test_limbo_rtp_matches_edge() {
        let report = simulator(2)
            .run(Strategy::Limbo { target: 2.0 }, 200_000, 1.0)
            .unwrap();
        assert!((report.rtp() - 0.99).abs() < 0.015, "rtp {}", report.rtp());
    }

    #[test]
    fn test_mines_rtp_matches_edge() {
        let report = simulator(3)
            .run(Strategy::Mines { mines: 3, reveals: 2 }, 200_000, 1.0)
            .unwrap();
        assert!((report.rtp() - 0.99).abs() < 0.015, "rtp {}", report.rtp());
    }

    #[test]
    fn test_balance_is_conserved() {
        let report = simulator(4)
            .run(
                Strategy::Plinko {
                    rows: 12,
                    risk: RiskLevel::Low,
                },
                10_000,
                0.5,
            )
            .unwrap();

        let expected = report.stake * report.rounds as f64 - report.wagered + report.returned;
        assert!((report.final_balance - expected).abs() < 1e-6);
    }

    #[test]
    fn test_crash_and_tower_run() {
        let crash = simulator(5)
            .run(Strategy::Crash { cash_out_at: 1.5 }, 5_000, 1.0)
            .unwrap();
        assert_eq!(crash.game, GameType::Crash);
        assert!(crash.max_multiplier <= 1.5);

        let tower = simulator(6)
            .run(
                Strategy::Tower {
                    difficulty: Difficulty::Hard,
                    floors: 1,
                },
                5_000,
                1.0,
            )
            .unwrap();
        // One floor of three eggs in four doors: roughly a quarter survive
        assert!((tower.win_rate() - 0.25).abs() < 0.03, "win rate {}", tower.win_rate());
    }

    #[test]
    fn test_invalid_strategies() {
        let mut sim = simulator(7);
        assert!(matches!(
            sim.run(Strategy::Mines { mines: 3, reveals: 0 }, 1, 1.0),
            Err(WagerError::InvalidParameters(ParameterError::StrategyBounds {
                field: "reveals",
                value: 0,
                max: 22,
            }))
        ));
        assert!(matches!(
            sim.run(Strategy::Mines { mines: 24, reveals: 2 }, 1, 1.0),
            Err(WagerError::InvalidParameters(ParameterError::StrategyBounds { max: 1, .. }))
        ));
        assert!(matches!(
            sim.run(
                Strategy::Tower {
                    difficulty: Difficulty::Easy,
                    floors: 7,
                },
                1,
                1.0
            ),
            Err(WagerError::InvalidParameters(ParameterError::StrategyBounds {
                field: "floors",
                value: 7,
                max: 6,
            }))
        ));
        assert!(sim.run(Strategy::Limbo { target: 0.5 }, 1, 1.0).is_err());
    }

    #[test]
    fn test_render() {
        let report = simulator(8)
            .run(Strategy::Limbo { target: 1.5 }, 100, 1.0)
            .unwrap();
        let text = report.render();
        assert!(text.contains("Simulation: limbo target 1.50x"));
        assert!(text.contains("RTP:"));
        assert!(text.contains("Rounds:          100"));
    }
}
