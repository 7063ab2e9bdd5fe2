//! Threshold roll
//!
//! `multiplier * win_chance == 100 - edge` for every threshold, so the house
//! edge is flat regardless of the player's choice.

use crate::common::traits::RandomSource;
use crate::config::DiceConfig;
use crate::errors::ParameterError;
use crate::games::session::Round;
use crate::games::types::{Direction, GameType, HiddenOutcome, RoundResult, RoundView};

/// Win chance in percent
pub fn win_chance(threshold: f64, direction: Direction) -> f64 {
    match direction {
        Direction::Over => 100.0 - threshold,
        Direction::Under => threshold,
    }
}

pub fn multiplier(threshold: f64, direction: Direction, config: &DiceConfig) -> f64 {
    (100.0 - config.house_edge_percent) / win_chance(threshold, direction)
}

pub fn validate_threshold(threshold: f64) -> Result<(), ParameterError> {
    if threshold.is_finite() && threshold > 1.0 && threshold < 99.0 {
        Ok(())
    } else {
        Err(ParameterError::DiceThreshold(threshold))
    }
}

/// A single resolved roll
#[derive(Debug, Clone)]
pub struct DiceRound {
    threshold: f64,
    direction: Direction,
    roll: f64,
    multiplier: f64,
}

impl DiceRound {
    pub fn start(
        threshold: f64,
        direction: Direction,
        config: &DiceConfig,
        rng: &mut dyn RandomSource,
    ) -> Result<Self, ParameterError> {
        validate_threshold(threshold)?;
        Ok(Self {
            threshold,
            direction,
            roll: rng.draw() * 100.0,
            multiplier: multiplier(threshold, direction, config),
        })
    }

    pub fn roll(&self) -> f64 {
        self.roll
    }

    pub fn is_win(&self) -> bool {
        match self.direction {
            Direction::Over => self.roll > self.threshold,
            Direction::Under => self.roll < self.threshold,
        }
    }

    pub fn resolve(&self) -> RoundResult {
        if self.is_win() {
            RoundResult::Win {
                multiplier: self.multiplier,
            }
        } else {
            RoundResult::Loss
        }
    }
}

impl Round for DiceRound {
    const GAME: GameType = GameType::Dice;

    fn multiplier(&self) -> f64 {
        if self.is_win() {
            self.multiplier
        } else {
            0.0
        }
    }

    fn view(&self, _settled: bool) -> RoundView {
        RoundView::Dice {
            threshold: self.threshold,
            direction: self.direction,
            win_chance: win_chance(self.threshold, self.direction),
            roll: self.roll,
        }
    }

    fn hidden_outcome(&self) -> HiddenOutcome {
        HiddenOutcome::Dice { roll: self.roll }
    }
}
