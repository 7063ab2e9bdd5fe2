//! Tower-climb game
//!
//! Each floor hides `eggs` bad doors. Every safe pick multiplies the running
//! multiplier by the difficulty's per-floor factor; the top floor settles.

use crate::common::traits::RandomSource;
use crate::config::{TowerConfig, TowerLevel};
use crate::errors::ActionError;
use crate::games::session::Round;
use crate::games::types::{Difficulty, GameInput, GameType, HiddenOutcome, RoundResult, RoundView};

impl TowerConfig {
    pub fn level(&self, difficulty: Difficulty) -> TowerLevel {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

/// Multiplier after clearing `floors` floors
pub fn multiplier(level: TowerLevel, floors: u8) -> f64 {
    level.multiplier.powi(floors as i32)
}

/// State of one tower-climb round
#[derive(Debug, Clone)]
pub struct TowerRound {
    difficulty: Difficulty,
    level: TowerLevel,
    doors: u8,
    /// Egg doors per floor, sorted, fixed at start
    eggs: Vec<Vec<u8>>,
    picks: Vec<u8>,
    current_floor: u8,
    multiplier: f64,
}

impl TowerRound {
    pub fn start(difficulty: Difficulty, config: &TowerConfig, rng: &mut dyn RandomSource) -> Self {
        let level = config.level(difficulty);
        let eggs = (0..config.floors)
            .map(|_| {
                let mut floor = rng.sample_distinct(config.doors, level.eggs);
                floor.sort_unstable();
                floor
            })
            .collect();

        Self {
            difficulty,
            level,
            doors: config.doors,
            eggs,
            picks: Vec::new(),
            current_floor: 0,
            multiplier: 1.0,
        }
    }

    pub fn floors(&self) -> u8 {
        self.eggs.len() as u8
    }

    pub fn current_floor(&self) -> u8 {
        self.current_floor
    }

    pub fn is_egg(&self, floor: u8, door: u8) -> bool {
        self.eggs
            .get(floor as usize)
            .map_or(false, |eggs| eggs.contains(&door))
    }

    fn open(&mut self, door: u8) -> Result<RoundResult, ActionError> {
        if door >= self.doors {
            return Err(ActionError::OutOfRange {
                index: door,
                max: self.doors,
            });
        }

        self.picks.push(door);
        if self.is_egg(self.current_floor, door) {
            return Ok(RoundResult::Loss);
        }

        self.multiplier *= self.level.multiplier;
        self.current_floor += 1;

        if self.current_floor == self.floors() {
            return Ok(RoundResult::Win {
                multiplier: self.multiplier,
            });
        }
        Ok(RoundResult::Continue)
    }
}

impl Round for TowerRound {
    const GAME: GameType = GameType::Tower;

    fn act(&mut self, input: GameInput) -> Result<RoundResult, ActionError> {
        match input {
            GameInput::Door(door) => self.open(door),
            GameInput::Reveal(_) => Err(ActionError::UnexpectedInput {
                game: Self::GAME,
                expected: "a door pick",
            }),
        }
    }

    fn cash_out(&mut self) -> Result<RoundResult, ActionError> {
        if self.current_floor == 0 {
            return Err(ActionError::NothingToCashOut);
        }
        Ok(RoundResult::Win {
            multiplier: self.multiplier,
        })
    }

    fn multiplier(&self) -> f64 {
        self.multiplier
    }

    fn view(&self, settled: bool) -> RoundView {
        // Passed floors stay visible; the rest of the board only once settled
        let eggs = self
            .eggs
            .iter()
            .enumerate()
            .map(|(floor, eggs)| (settled || floor < self.current_floor as usize).then(|| eggs.clone()))
            .collect();

        RoundView::Tower {
            difficulty: self.difficulty,
            floors: self.floors(),
            current_floor: self.current_floor,
            picks: self.picks.clone(),
            eggs,
        }
    }

    fn hidden_outcome(&self) -> HiddenOutcome {
        HiddenOutcome::Tower {
            eggs: self.eggs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::rng::{ReplayRandom, StdRandom};

    fn safe_door(round: &TowerRound) -> u8 {
        (0..4).find(|&d| !round.is_egg(round.current_floor(), d)).unwrap()
    }

    fn egg_door(round: &TowerRound) -> u8 {
        (0..4).find(|&d| round.is_egg(round.current_floor(), d)).unwrap()
    }

    #[test]
    fn test_egg_counts_per_difficulty() {
        let config = TowerConfig::default();
        let mut rng = StdRandom::seeded(1);
        for (difficulty, eggs) in [
            (Difficulty::Easy, 1),
            (Difficulty::Medium, 2),
            (Difficulty::Hard, 3),
        ] {
            let round = TowerRound::start(difficulty, &config, &mut rng);
            match round.hidden_outcome() {
                HiddenOutcome::Tower { eggs: floors } => {
                    assert_eq!(floors.len(), 6);
                    assert!(floors.iter().all(|f| f.len() == eggs));
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_climb_to_top_auto_settles() {
        let config = TowerConfig::default();
        let mut rng = StdRandom::seeded(21);
        let mut round = TowerRound::start(Difficulty::Medium, &config, &mut rng);

        for floor in 0..5 {
            let door = safe_door(&round);
            assert_eq!(round.act(GameInput::Door(door)).unwrap(), RoundResult::Continue);
            assert_eq!(round.current_floor(), floor + 1);
        }
        let door = safe_door(&round);
        match round.act(GameInput::Door(door)).unwrap() {
            RoundResult::Win { multiplier } => assert_eq!(multiplier, 64.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_egg_loses() {
        let config = TowerConfig::default();
        let mut rng = StdRandom::seeded(13);
        let mut round = TowerRound::start(Difficulty::Hard, &config, &mut rng);
        let door = egg_door(&round);
        assert_eq!(round.act(GameInput::Door(door)).unwrap(), RoundResult::Loss);
        assert_eq!(round.current_floor(), 0);
    }

    #[test]
    fn test_cash_out_after_first_floor() {
        let config = TowerConfig::default();
        let mut rng = ReplayRandom::new(vec![0.9, 0.1, 0.5]);
        let mut round = TowerRound::start(Difficulty::Easy, &config, &mut rng);
        assert_eq!(round.cash_out(), Err(ActionError::NothingToCashOut));

        let door = safe_door(&round);
        round.act(GameInput::Door(door)).unwrap();
        assert_eq!(round.cash_out().unwrap(), RoundResult::Win { multiplier: 1.5 });
    }

    #[test]
    fn test_view_reveals_passed_floors_only() {
        let config = TowerConfig::default();
        let mut rng = StdRandom::seeded(17);
        let mut round = TowerRound::start(Difficulty::Easy, &config, &mut rng);
        let door = safe_door(&round);
        round.act(GameInput::Door(door)).unwrap();

        match round.view(false) {
            RoundView::Tower { eggs, current_floor, .. } => {
                assert_eq!(current_floor, 1);
                assert!(eggs[0].is_some());
                assert!(eggs[1..].iter().all(Option::is_none));
            }
            other => panic!("unexpected {:?}", other),
        }
        match round.view(true) {
            RoundView::Tower { eggs, .. } => assert!(eggs.iter().all(Option::is_some)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_door_out_of_range() {
        let config = TowerConfig::default();
        let mut rng = StdRandom::seeded(2);
        let mut round = TowerRound::start(Difficulty::Easy, &config, &mut rng);
        assert!(matches!(
            round.act(GameInput::Door(4)),
            Err(ActionError::OutOfRange { index: 4, max: 4 })
        ));
        assert!(round.picks.is_empty());
    }

    #[test]
    fn test_multiplier_formula() {
        let config = TowerConfig::default();
        assert_eq!(multiplier(config.level(Difficulty::Hard), 2), 9.0);
        assert_eq!(multiplier(config.level(Difficulty::Easy), 0), 1.0);
    }
}
