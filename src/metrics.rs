//! Engine counters with Prometheus text exposition

use crate::common::types::lock;
use crate::games::types::GameType;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct GameCounters {
    started: AtomicU64,
    won: AtomicU64,
    lost: AtomicU64,
}

#[derive(Debug, Default)]
struct MoneyTotals {
    wagered: f64,
    paid_out: f64,
}

/// Counters for rounds, money flow and rejected requests
#[derive(Debug)]
pub struct EngineMetrics {
    start_time: Instant,
    games: [GameCounters; 6],
    rejected: AtomicU64,
    totals: Mutex<MoneyTotals>,
}

/// Serialisable view of one game's counters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameMetrics {
    pub game: GameType,
    pub started: u64,
    pub won: u64,
    pub lost: u64,
}

/// Serialisable view of all counters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSnapshot {
    pub games: Vec<GameMetrics>,
    pub rejected: u64,
    pub total_wagered: f64,
    pub total_paid_out: f64,
    pub uptime_secs: u64,
}

impl MetricsSnapshot {
    /// Paid out over wagered, `None` before any stake
    pub fn return_to_player(&self) -> Option<f64> {
        (self.total_wagered > 0.0).then(|| self.total_paid_out / self.total_wagered)
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            games: Default::default(),
            rejected: AtomicU64::new(0),
            totals: Mutex::new(MoneyTotals::default()),
        }
    }

    pub fn record_start(&self, game: GameType, stake: f64) {
        self.games[game.index()].started.fetch_add(1, Ordering::Relaxed);
        lock(&self.totals).wagered += stake;
    }

    pub fn record_settlement(&self, game: GameType, payout: f64, won: bool) {
        let counters = &self.games[game.index()];
        if won {
            counters.won.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.lost.fetch_add(1, Ordering::Relaxed);
        }
        lock(&self.totals).paid_out += payout;
    }

    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let totals = lock(&self.totals);
        MetricsSnapshot {
            games: GameType::ALL
                .iter()
                .map(|&game| {
                    let counters = &self.games[game.index()];
                    GameMetrics {
                        game,
                        started: counters.started.load(Ordering::Relaxed),
                        won: counters.won.load(Ordering::Relaxed),
                        lost: counters.lost.load(Ordering::Relaxed),
                    }
                })
                .collect(),
            rejected: self.rejected.load(Ordering::Relaxed),
            total_wagered: totals.wagered,
            total_paid_out: totals.paid_out,
            uptime_secs: self.uptime().as_secs(),
        }
    }

    /// Prometheus text exposition format
    pub fn render_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = String::new();

        for (name, help, pick) in [
            ("wager_rounds_started_total", "Rounds started", 0),
            ("wager_rounds_won_total", "Rounds settled with a payout", 1),
            ("wager_rounds_lost_total", "Rounds settled with no payout", 2),
        ] {
            let _ = writeln!(out, "# HELP {} {}", name, help);
            let _ = writeln!(out, "# TYPE {} counter", name);
            for game in &snapshot.games {
                let value = match pick {
                    0 => game.started,
                    1 => game.won,
                    _ => game.lost,
                };
                let _ = writeln!(out, "{}{{game=\"{}\"}} {}", name, game.game, value);
            }
        }

        let _ = writeln!(out, "# HELP wager_rejected_requests_total Requests rejected without side effects");
        let _ = writeln!(out, "# TYPE wager_rejected_requests_total counter");
        let _ = writeln!(out, "wager_rejected_requests_total {}", snapshot.rejected);

        let _ = writeln!(out, "# HELP wager_wagered_total Sum of committed stakes");
        let _ = writeln!(out, "# TYPE wager_wagered_total counter");
        let _ = writeln!(out, "wager_wagered_total {}", snapshot.total_wagered);

        let _ = writeln!(out, "# HELP wager_paid_out_total Sum of settled payouts");
        let _ = writeln!(out, "# TYPE wager_paid_out_total counter");
        let _ = writeln!(out, "wager_paid_out_total {}", snapshot.total_paid_out);

        let _ = writeln!(out, "# HELP wager_uptime_seconds Seconds since the engine started");
        let _ = writeln!(out, "# TYPE wager_uptime_seconds gauge");
        let _ = writeln!(out, "wager_uptime_seconds {}", snapshot.uptime_secs);

        out
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = EngineMetrics::new();
        metrics.record_start(GameType::Dice, 10.0);
        metrics.record_start(GameType::Dice, 5.0);
        metrics.record_settlement(GameType::Dice, 19.8, true);
        metrics.record_settlement(GameType::Dice, 0.0, false);
        metrics.record_rejection();

        let snapshot = metrics.snapshot();
        let dice = &snapshot.games[GameType::Dice.index()];
        assert_eq!(dice.game, GameType::Dice);
        assert_eq!((dice.started, dice.won, dice.lost), (2, 1, 1));
        assert_eq!(snapshot.rejected, 1);
        assert_eq!(snapshot.total_wagered, 15.0);
        assert!((snapshot.return_to_player().unwrap() - 1.32).abs() < 1e-9);
    }

    #[test]
    fn test_prometheus_output() {
        let metrics = EngineMetrics::new();
        metrics.record_start(GameType::Mines, 1.0);

        let text = metrics.render_prometheus();
        assert!(text.contains("# TYPE wager_rounds_started_total counter"));
        assert!(text.contains("wager_rounds_started_total{game=\"mines\"} 1"));
        assert!(text.contains("wager_rounds_won_total{game=\"plinko\"} 0"));
        assert!(text.contains("wager_wagered_total 1"));
    }

    #[test]
    fn test_no_rtp_before_any_stake() {
        assert!(EngineMetrics::new().snapshot().return_to_player().is_none());
    }
}
