//! Grid-reveal game: `n` cells, `k` hidden mines
//!
//! The payout after `g` safe reveals is the inverse probability of drawing
//! `g` safe cells in a row without replacement, scaled by the house edge.

use crate::common::traits::RandomSource;
use crate::config::MinesConfig;
use crate::errors::{ActionError, ParameterError};
use crate::games::session::Round;
use crate::games::types::{GameInput, GameType, HiddenOutcome, RoundResult, RoundView};

/// Multiplier after `safe` reveals on a `grid`-cell board with `mines` mines
///
/// `ρ · Π_{i<g} (n − i) / (n − k − i)`, floored at the configured minimum.
/// A validated config keeps the first reveal above that floor.
/// Zero reveals pays exactly 1.
pub fn multiplier(grid: u8, mines: u8, safe: u8, config: &MinesConfig) -> f64 {
    if safe == 0 {
        return 1.0;
    }

    let n = grid as f64;
    let k = mines as f64;
    let fair = (0..safe).fold(1.0, |acc, i| {
        let i = i as f64;
        acc * (n - i) / (n - k - i)
    });

    (config.house_edge * fair).max(config.min_multiplier)
}

/// Precomputed multipliers indexed by mine count, then safe reveals
#[derive(Debug, Clone)]
pub struct MinesOdds {
    grid_size: u8,
    rows: Vec<Vec<f64>>,
}

impl MinesOdds {
    pub fn new(config: &MinesConfig) -> Self {
        let n = config.grid_size;
        let rows = (0..n)
            .map(|k| {
                if k == 0 {
                    return Vec::new();
                }
                (0..=n - k).map(|g| multiplier(n, k, g, config)).collect()
            })
            .collect();

        Self { grid_size: n, rows }
    }

    pub fn grid_size(&self) -> u8 {
        self.grid_size
    }

    pub fn max_mines(&self) -> u8 {
        self.grid_size - 1
    }

    /// Multipliers for `g = 0..=n-k`, or `None` for an unsupported mine count
    pub fn row(&self, mines: u8) -> Option<&[f64]> {
        self.rows
            .get(mines as usize)
            .filter(|row| !row.is_empty())
            .map(Vec::as_slice)
    }

    pub fn get(&self, mines: u8, safe: u8) -> Option<f64> {
        self.row(mines)?.get(safe as usize).copied()
    }
}

/// State of one grid-reveal round
#[derive(Debug, Clone)]
pub struct MinesRound {
    grid_size: u8,
    mines: u8,
    /// Sorted mine positions, fixed at start
    positions: Vec<u8>,
    revealed: Vec<u8>,
    safe_reveals: u8,
    odds: Vec<f64>,
}

impl MinesRound {
    /// Place `mines` mines on the board
    pub fn start(
        mines: u8,
        odds: &MinesOdds,
        rng: &mut dyn RandomSource,
    ) -> Result<Self, ParameterError> {
        let row = odds.row(mines).ok_or(ParameterError::MineCount {
            count: mines,
            max: odds.max_mines(),
        })?;

        let mut positions = rng.sample_distinct(odds.grid_size(), mines);
        positions.sort_unstable();

        Ok(Self {
            grid_size: odds.grid_size(),
            mines,
            positions,
            revealed: Vec::new(),
            safe_reveals: 0,
            odds: row.to_vec(),
        })
    }

    pub fn safe_reveals(&self) -> u8 {
        self.safe_reveals
    }

    pub fn is_mine(&self, index: u8) -> bool {
        self.positions.binary_search(&index).is_ok()
    }

    fn safe_cells(&self) -> u8 {
        self.grid_size - self.mines
    }

    fn reveal(&mut self, index: u8) -> Result<RoundResult, ActionError> {
        if index >= self.grid_size {
            return Err(ActionError::OutOfRange {
                index,
                max: self.grid_size,
            });
        }
        if self.revealed.contains(&index) {
            return Err(ActionError::AlreadyRevealed(index));
        }

        self.revealed.push(index);
        if self.is_mine(index) {
            return Ok(RoundResult::Loss);
        }

        self.safe_reveals += 1;
        if self.safe_reveals == self.safe_cells() {
            // Full clear settles at the last table entry
            return Ok(RoundResult::Win {
                multiplier: self.multiplier(),
            });
        }

        Ok(RoundResult::Continue)
    }
}

impl Round for MinesRound {
    const GAME: GameType = GameType::Mines;

    fn act(&mut self, input: GameInput) -> Result<RoundResult, ActionError> {
        match input {
            GameInput::Reveal(index) => self.reveal(index),
            GameInput::Door(_) => Err(ActionError::UnexpectedInput {
                game: Self::GAME,
                expected: "a cell reveal",
            }),
        }
    }

    fn cash_out(&mut self) -> Result<RoundResult, ActionError> {
        if self.safe_reveals == 0 {
            return Err(ActionError::NothingToCashOut);
        }
        Ok(RoundResult::Win {
            multiplier: self.multiplier(),
        })
    }

    fn multiplier(&self) -> f64 {
        self.odds[self.safe_reveals as usize]
    }

    fn view(&self, settled: bool) -> RoundView {
        RoundView::Mines {
            mines: self.mines,
            revealed: self.revealed.clone(),
            safe_reveals: self.safe_reveals,
            next_multiplier: if settled {
                None
            } else {
                self.odds.get(self.safe_reveals as usize + 1).copied()
            },
            mine_positions: settled.then(|| self.positions.clone()),
        }
    }

    fn hidden_outcome(&self) -> HiddenOutcome {
        HiddenOutcome::Mines {
            positions: self.positions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::rng::{ReplayRandom, StdRandom};

    fn odds() -> MinesOdds {
        MinesOdds::new(&MinesConfig::default())
    }

    fn first_safe(round: &MinesRound) -> u8 {
        (0..25).find(|&i| !round.is_mine(i)).unwrap()
    }

    #[test]
    fn test_multiplier_strictly_increasing() {
        let odds = odds();
        for k in 1..=24 {
            let row = odds.row(k).unwrap();
            assert_eq!(row[0], 1.0);
            assert_eq!(row.len(), (25 - k + 1) as usize);
            for pair in row.windows(2) {
                assert!(pair[1] > pair[0], "k={} row={:?}", k, row);
            }
        }
    }

    #[test]
    fn test_known_values() {
        let config = MinesConfig::default();
        // One mine, one safe cell: 0.99 * 25/24
        assert!((multiplier(25, 1, 1, &config) - 1.03125).abs() < 1e-9);
        // 24 mines, the single safe cell: 0.99 * 25
        assert!((multiplier(25, 24, 1, &config) - 24.75).abs() < 1e-9);
        // Three mines, two safe cells: 0.99 * 25/22 * 24/21
        let expected = 0.99 * (25.0 / 22.0) * (24.0 / 21.0);
        assert!((multiplier(25, 3, 2, &config) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_minimum_multiplier_floor() {
        let config = MinesConfig {
            house_edge: 0.5,
            ..Default::default()
        };
        assert_eq!(multiplier(25, 1, 1, &config), 1.01);
    }

    #[test]
    fn test_unsupported_mine_counts() {
        let odds = odds();
        let mut rng = StdRandom::seeded(3);
        assert!(MinesRound::start(0, &odds, &mut rng).is_err());
        assert!(MinesRound::start(25, &odds, &mut rng).is_err());
        assert!(MinesRound::start(24, &odds, &mut rng).is_ok());
    }

    #[test]
    fn test_mine_positions_are_distinct() {
        let odds = odds();
        let mut rng = StdRandom::seeded(11);
        let round = MinesRound::start(10, &odds, &mut rng).unwrap();
        match round.hidden_outcome() {
            HiddenOutcome::Mines { positions } => {
                assert_eq!(positions.len(), 10);
                assert!(positions.windows(2).all(|w| w[0] < w[1]));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_reveal_safe_then_duplicate() {
        let odds = odds();
        let mut rng = StdRandom::seeded(5);
        let mut round = MinesRound::start(3, &odds, &mut rng).unwrap();
        let cell = first_safe(&round);

        assert_eq!(round.act(GameInput::Reveal(cell)).unwrap(), RoundResult::Continue);
        assert_eq!(round.safe_reveals(), 1);
        assert_eq!(
            round.act(GameInput::Reveal(cell)),
            Err(ActionError::AlreadyRevealed(cell))
        );
        assert_eq!(round.safe_reveals(), 1);
    }

    #[test]
    fn test_hitting_a_mine_loses() {
        let odds = odds();
        let mut rng = StdRandom::seeded(8);
        let mut round = MinesRound::start(5, &odds, &mut rng).unwrap();
        let mine = (0..25).find(|&i| round.is_mine(i)).unwrap();

        assert_eq!(round.act(GameInput::Reveal(mine)).unwrap(), RoundResult::Loss);
    }

    #[test]
    fn test_cash_out_needs_a_reveal() {
        let odds = odds();
        let mut rng = StdRandom::seeded(2);
        let mut round = MinesRound::start(3, &odds, &mut rng).unwrap();
        assert_eq!(round.cash_out(), Err(ActionError::NothingToCashOut));

        let cell = first_safe(&round);
        round.act(GameInput::Reveal(cell)).unwrap();
        match round.cash_out().unwrap() {
            RoundResult::Win { multiplier } => assert_eq!(multiplier, odds.get(3, 1).unwrap()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_full_clear_auto_settles() {
        let odds = odds();
        let mut rng = ReplayRandom::constant(0.0);
        let mut round = MinesRound::start(24, &odds, &mut rng).unwrap();
        let safe = first_safe(&round);

        match round.act(GameInput::Reveal(safe)).unwrap() {
            RoundResult::Win { multiplier } => assert!((multiplier - 24.75).abs() < 1e-9),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_and_wrong_input() {
        let odds = odds();
        let mut rng = StdRandom::seeded(4);
        let mut round = MinesRound::start(3, &odds, &mut rng).unwrap();
        assert!(matches!(
            round.act(GameInput::Reveal(25)),
            Err(ActionError::OutOfRange { .. })
        ));
        assert!(matches!(
            round.act(GameInput::Door(0)),
            Err(ActionError::UnexpectedInput { .. })
        ));
    }

    #[test]
    fn test_view_hides_mines_until_settled() {
        let odds = odds();
        let mut rng = StdRandom::seeded(6);
        let round = MinesRound::start(3, &odds, &mut rng).unwrap();

        match round.view(false) {
            RoundView::Mines { mine_positions, next_multiplier, .. } => {
                assert!(mine_positions.is_none());
                assert_eq!(next_multiplier, odds.get(3, 1));
            }
            other => panic!("unexpected {:?}", other),
        }
        match round.view(true) {
            RoundView::Mines { mine_positions, .. } => {
                assert_eq!(mine_positions.unwrap().len(), 3)
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
