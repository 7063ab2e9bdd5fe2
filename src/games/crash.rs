//! Ascending-multiplier model shared by the live (crash) and instant (limbo)
//! variants
//!
//! A crash point `C >= 1.00` is drawn once per round. The live variant lets
//! the multiplier rise along a concave curve until it reaches `C`; the
//! instant variant compares a pre-committed target against `C`.

use crate::common::traits::RandomSource;
use crate::common::types::floor_hundredths;
use crate::config::{CrashConfig, CrashDistribution};
use crate::errors::ParameterError;
use crate::games::session::Round;
use crate::games::types::{GameType, HiddenOutcome, RoundResult, RoundView};
use std::time::Duration;

/// Draw a crash point, quoted to two decimals
pub fn sample_crash_point(config: &CrashConfig, rng: &mut dyn RandomSource) -> f64 {
    let raw = match &config.distribution {
        CrashDistribution::Inverse => {
            // P(C >= x) = edge / x
            let r = rng.draw();
            config.house_edge / (1.0 - r)
        }
        CrashDistribution::Banded { bands } => {
            let r = rng.draw();
            let mut cumulative = 0.0;
            let band = bands
                .iter()
                .find(|band| {
                    cumulative += band.probability;
                    r < cumulative
                })
                .or_else(|| bands.last());

            match band {
                Some(band) => band.low + rng.draw() * (band.high - band.low),
                None => 1.0,
            }
        }
    };

    floor_hundredths(raw).clamp(1.0, config.max_crash_point)
}

/// Display curve of the live variant: `1 + growth * t^exponent`
#[derive(Debug, Clone, Copy)]
pub struct GrowthCurve {
    growth: f64,
    exponent: f64,
}

impl GrowthCurve {
    pub fn new(config: &CrashConfig) -> Self {
        Self {
            growth: config.growth_per_second,
            exponent: config.curve_exponent,
        }
    }

    pub fn multiplier_at(&self, elapsed: Duration) -> f64 {
        1.0 + self.growth * elapsed.as_secs_f64().powf(self.exponent)
    }

    /// Elapsed time at which the curve reaches `multiplier`
    pub fn time_to_reach(&self, multiplier: f64) -> Duration {
        if multiplier <= 1.0 {
            return Duration::ZERO;
        }
        let secs = ((multiplier - 1.0) / self.growth).powf(1.0 / self.exponent);
        Duration::from_secs_f64(secs)
    }
}

/// State of one live crash round
///
/// Timing lives in the round driver; this type only records how the race
/// between cash-out and bust was decided.
#[derive(Debug, Clone)]
pub struct CrashRound {
    crash_point: f64,
    cashed_out_at: Option<f64>,
    busted: bool,
}

impl CrashRound {
    pub fn start(config: &CrashConfig, rng: &mut dyn RandomSource) -> Self {
        Self::with_crash_point(sample_crash_point(config, rng))
    }

    pub fn with_crash_point(crash_point: f64) -> Self {
        Self {
            crash_point,
            cashed_out_at: None,
            busted: false,
        }
    }

    pub fn crash_point(&self) -> f64 {
        self.crash_point
    }

    pub fn is_busted(&self) -> bool {
        self.busted
    }

    /// Settle a cash-out request observed at displayed multiplier `at`
    ///
    /// Wins only while the curve is strictly below the crash point.
    pub fn resolve_cash_out(&mut self, at: f64) -> RoundResult {
        if at < self.crash_point {
            let multiplier = floor_hundredths(at).max(1.0);
            self.cashed_out_at = Some(multiplier);
            RoundResult::Win { multiplier }
        } else {
            self.resolve_bust()
        }
    }

    /// The curve reached the crash point with no cash-out
    pub fn resolve_bust(&mut self) -> RoundResult {
        self.busted = true;
        RoundResult::Loss
    }
}

impl Round for CrashRound {
    const GAME: GameType = GameType::Crash;

    fn multiplier(&self) -> f64 {
        self.cashed_out_at.unwrap_or(1.0)
    }

    fn view(&self, settled: bool) -> RoundView {
        RoundView::Crash {
            cashed_out_at: self.cashed_out_at,
            crash_point: settled.then_some(self.crash_point),
        }
    }

    fn hidden_outcome(&self) -> HiddenOutcome {
        HiddenOutcome::Crash {
            crash_point: self.crash_point,
        }
    }
}

/// Instant variant: the target is committed before the crash point is drawn
#[derive(Debug, Clone)]
pub struct LimboRound {
    target: f64,
    crash_point: f64,
}

impl LimboRound {
    pub fn validate_target(target: f64, config: &CrashConfig) -> Result<(), ParameterError> {
        if target.is_finite() && target >= config.min_target && target <= config.max_crash_point {
            Ok(())
        } else {
            Err(ParameterError::TargetMultiplier {
                target,
                min: config.min_target,
                max: config.max_crash_point,
            })
        }
    }

    pub fn start(
        target: f64,
        config: &CrashConfig,
        rng: &mut dyn RandomSource,
    ) -> Result<Self, ParameterError> {
        Self::validate_target(target, config)?;
        Ok(Self::with_crash_point(target, sample_crash_point(config, rng)))
    }

    pub fn with_crash_point(target: f64, crash_point: f64) -> Self {
        Self {
            target,
            crash_point,
        }
    }

    pub fn crash_point(&self) -> f64 {
        self.crash_point
    }

    /// Win iff `target <= crash_point`, paying the target
    pub fn resolve(&self) -> RoundResult {
        if self.target <= self.crash_point {
            RoundResult::Win {
                multiplier: self.target,
            }
        } else {
            RoundResult::Loss
        }
    }
}

impl Round for LimboRound {
    const GAME: GameType = GameType::Limbo;

    fn multiplier(&self) -> f64 {
        match self.resolve() {
            RoundResult::Win { multiplier } => multiplier,
            _ => 0.0,
        }
    }

    fn view(&self, _settled: bool) -> RoundView {
        RoundView::Limbo {
            target: self.target,
            crash_point: self.crash_point,
        }
    }

    fn hidden_outcome(&self) -> HiddenOutcome {
        HiddenOutcome::Crash {
            crash_point: self.crash_point,
        }
    }
}
