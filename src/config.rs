//! Engine configuration with validation and defaults
//!
//! House edges, band boundaries and board sizes live here rather than in the
//! game modules so they can be tuned without touching game logic.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete engine configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ledger: LedgerConfig,
    pub mines: MinesConfig,
    pub tower: TowerConfig,
    pub crash: CrashConfig,
    pub dice: DiceConfig,
    pub plinko: PlinkoConfig,
    pub storage: StorageConfig,
    pub monitoring: MonitoringConfig,
}

/// Balance and history settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Balance after a reset or when no saved state exists
    pub starting_balance: f64,
    pub min_stake: f64,
    pub history_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_balance: 100.0,
            min_stake: 0.10,
            history_capacity: 50,
        }
    }
}

/// Grid-reveal settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MinesConfig {
    pub grid_size: u8,
    /// Multiplicative house edge factor applied to fair odds (ρ)
    pub house_edge: f64,
    pub min_multiplier: f64,
}

impl Default for MinesConfig {
    fn default() -> Self {
        Self {
            grid_size: 25,
            house_edge: 0.99,
            min_multiplier: 1.01,
        }
    }
}

/// Per-difficulty tower settings
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TowerLevel {
    pub eggs: u8,
    pub multiplier: f64,
}

/// Tower-climb settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerConfig {
    pub floors: u8,
    pub doors: u8,
    pub easy: TowerLevel,
    pub medium: TowerLevel,
    pub hard: TowerLevel,
}

impl Default for TowerConfig {
    fn default() -> Self {
        Self {
            floors: 6,
            doors: 4,
            easy: TowerLevel { eggs: 1, multiplier: 1.5 },
            medium: TowerLevel { eggs: 2, multiplier: 2.0 },
            hard: TowerLevel { eggs: 3, multiplier: 3.0 },
        }
    }
}

/// One probability band of a banded crash distribution
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CrashBand {
    pub probability: f64,
    pub low: f64,
    pub high: f64,
}

/// Crash point distribution family, shared by the live and instant variants
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CrashDistribution {
    /// `C = edge / (1 - r)`, giving `P(C >= x) = edge / x`
    Inverse,
    /// Piecewise-uniform bands with increasing ceilings
    Banded { bands: Vec<CrashBand> },
}

impl CrashDistribution {
    /// Four uniform bands from an earlier tuning
    ///
    /// Their tail is heavier than `edge / x` (`P(C >= 2) = 0.67`), so targets
    /// in the lower bands return more than they take. See
    /// [`CrashConfig::overpaying_target`].
    pub fn default_bands() -> Self {
        CrashDistribution::Banded {
            bands: vec![
                CrashBand { probability: 0.33, low: 1.0, high: 2.0 },
                CrashBand { probability: 0.33, low: 2.0, high: 5.0 },
                CrashBand { probability: 0.24, low: 5.0, high: 15.0 },
                CrashBand { probability: 0.10, low: 15.0, high: 100.0 },
            ],
        }
    }
}

/// Ascending-multiplier settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashConfig {
    pub house_edge: f64,
    pub max_crash_point: f64,
    pub min_target: f64,
    pub distribution: CrashDistribution,
    /// Live curve: `1 + growth * t^exponent`, t in seconds
    pub growth_per_second: f64,
    pub curve_exponent: f64,
    pub tick_interval_ms: u64,
}

impl CrashDistribution {
    /// `P(C >= x)` before the crash point is floored to hundredths
    pub fn tail_probability(&self, house_edge: f64, x: f64) -> f64 {
        if x <= 1.0 {
            return 1.0;
        }
        match self {
            CrashDistribution::Inverse => (house_edge / x).min(1.0),
            CrashDistribution::Banded { bands } => bands
                .iter()
                .map(|band| {
                    if x <= band.low {
                        band.probability
                    } else if x >= band.high {
                        0.0
                    } else {
                        band.probability * (band.high - x) / (band.high - band.low)
                    }
                })
                .sum(),
        }
    }
}

impl CrashConfig {
    /// First band boundary at which a fixed target pays back more than the
    /// house edge allows, i.e. `P(C >= x) > house_edge / x`
    pub fn overpaying_target(&self) -> Option<f64> {
        let CrashDistribution::Banded { bands } = &self.distribution else {
            return None;
        };
        let mut targets: Vec<f64> = bands
            .iter()
            .flat_map(|band| [band.low, band.high])
            .chain(std::iter::once(self.min_target))
            .filter(|&x| x > 1.0 && x <= self.max_crash_point)
            .collect();
        targets.sort_by(|a, b| a.total_cmp(b));

        targets.into_iter().find(|&x| {
            self.distribution.tail_probability(self.house_edge, x) > self.house_edge / x + 1e-12
        })
    }
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            house_edge: 0.99,
            max_crash_point: 1000.0,
            min_target: 1.01,
            distribution: CrashDistribution::Inverse,
            growth_per_second: 0.6,
            curve_exponent: 0.8,
            tick_interval_ms: 50,
        }
    }
}

/// Threshold-roll settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DiceConfig {
    pub house_edge_percent: f64,
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            house_edge_percent: 1.0,
        }
    }
}

/// Row-drop settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlinkoConfig {
    pub allowed_rows: Vec<u8>,
}

impl Default for PlinkoConfig {
    fn default() -> Self {
        Self {
            allowed_rows: vec![8, 12, 16],
        }
    }
}

/// Persistence settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_path: String,
    pub persist: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: "./wager_state.json".to_string(),
            persist: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Logging and metrics settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: LogLevel,
    pub enable_metrics: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            enable_metrics: true,
        }
    }
}

impl EngineConfig {
    /// Configuration for tests and simulations: no persistence, fast ticks
    pub fn testing() -> Self {
        Self {
            crash: CrashConfig {
                tick_interval_ms: 10,
                ..Default::default()
            },
            storage: StorageConfig {
                persist: false,
                ..Default::default()
            },
            monitoring: MonitoringConfig {
                log_level: LogLevel::Warn,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let ledger = &self.ledger;
        if !(ledger.starting_balance.is_finite() && ledger.starting_balance >= 0.0) {
            return Err(ConfigValidationError::InvalidValue(
                "ledger.starting_balance must be a non-negative number".to_string(),
            ));
        }
        if !(ledger.min_stake.is_finite() && ledger.min_stake > 0.0) {
            return Err(ConfigValidationError::InvalidValue(
                "ledger.min_stake must be > 0".to_string(),
            ));
        }
        if ledger.history_capacity == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "ledger.history_capacity must be > 0".to_string(),
            ));
        }

        if self.mines.grid_size < 2 || self.mines.grid_size > 64 {
            return Err(ConfigValidationError::InvalidValue(
                "mines.grid_size must be within 2..=64".to_string(),
            ));
        }
        check_edge_factor("mines.house_edge", self.mines.house_edge)?;
        // The cheapest reveal (one mine, first cell) must clear the floor so
        // the multiplier stays strictly increasing in safe reveals
        let n = self.mines.grid_size as f64;
        let first_reveal = self.mines.house_edge * n / (n - 1.0);
        if !(self.mines.min_multiplier.is_finite() && first_reveal >= self.mines.min_multiplier)
            || first_reveal <= 1.0
        {
            return Err(ConfigValidationError::LogicalInconsistency(format!(
                "mines first reveal pays {:.4}, below min_multiplier {} or 1",
                first_reveal, self.mines.min_multiplier
            )));
        }

        let tower = &self.tower;
        if tower.floors == 0 || tower.doors < 2 {
            return Err(ConfigValidationError::InvalidValue(
                "tower needs at least one floor and two doors".to_string(),
            ));
        }
        for level in [tower.easy, tower.medium, tower.hard] {
            if level.eggs == 0 || level.eggs >= tower.doors {
                return Err(ConfigValidationError::LogicalInconsistency(format!(
                    "tower egg count {} must leave at least one safe door of {}",
                    level.eggs, tower.doors
                )));
            }
            if level.multiplier <= 1.0 {
                return Err(ConfigValidationError::InvalidValue(
                    "tower multipliers must be > 1".to_string(),
                ));
            }
        }

        let crash = &self.crash;
        check_edge_factor("crash.house_edge", crash.house_edge)?;
        if crash.min_target < 1.0 || crash.max_crash_point <= crash.min_target {
            return Err(ConfigValidationError::LogicalInconsistency(
                "crash.max_crash_point must exceed crash.min_target >= 1".to_string(),
            ));
        }
        if !(crash.curve_exponent > 0.0 && crash.curve_exponent < 1.0) {
            return Err(ConfigValidationError::InvalidValue(
                "crash.curve_exponent must be in (0, 1)".to_string(),
            ));
        }
        if crash.growth_per_second <= 0.0 || crash.tick_interval_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "crash curve growth and tick interval must be > 0".to_string(),
            ));
        }
        if let CrashDistribution::Banded { bands } = &crash.distribution {
            let total: f64 = bands.iter().map(|b| b.probability).sum();
            if bands.is_empty() || (total - 1.0).abs() > 1e-9 {
                return Err(ConfigValidationError::LogicalInconsistency(format!(
                    "crash band probabilities sum to {}, expected 1",
                    total
                )));
            }
            if bands.iter().any(|b| b.low < 1.0 || b.high <= b.low || b.probability <= 0.0) {
                return Err(ConfigValidationError::InvalidValue(
                    "crash bands need 1 <= low < high and positive probability".to_string(),
                ));
            }
        }

        let edge = self.dice.house_edge_percent;
        if !(0.0..50.0).contains(&edge) {
            return Err(ConfigValidationError::InvalidValue(
                "dice.house_edge_percent must be within [0, 50)".to_string(),
            ));
        }

        if self.plinko.allowed_rows.is_empty()
            || self
                .plinko
                .allowed_rows
                .iter()
                .any(|rows| !crate::games::plinko::SUPPORTED_ROWS.contains(rows))
        {
            return Err(ConfigValidationError::InvalidValue(
                "plinko.allowed_rows must be a non-empty subset of 8, 12, 16".to_string(),
            ));
        }

        if self.storage.persist && self.storage.state_path.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "storage.state_path".to_string(),
            ));
        }

        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.crash.tick_interval_ms)
    }
}

fn check_edge_factor(field: &str, value: f64) -> Result<(), ConfigValidationError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigValidationError::InvalidValue(format!(
            "{} must be in (0, 1], got {}",
            field, value
        )))
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
    #[error("Configuration logical inconsistency: {0}")]
    LogicalInconsistency(String),
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
