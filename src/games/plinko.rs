//! Row-drop game
//!
//! The ball takes `rows` fair left/right bounces; the bucket is the number of
//! right bounces, so bucket indices follow Binomial(rows, 1/2). Every table
//! keeps its expected value just under 1 under that distribution.

use crate::common::traits::RandomSource;
use crate::config::PlinkoConfig;
use crate::errors::ParameterError;
use crate::games::session::Round;
use crate::games::types::{GameType, HiddenOutcome, RiskLevel, RoundResult, RoundView};

pub const SUPPORTED_ROWS: [u8; 3] = [8, 12, 16];

const LOW_8: [f64; 9] = [5.6, 2.1, 1.1, 1.0, 0.5, 1.0, 1.1, 2.1, 5.6];
const LOW_12: [f64; 13] = [8.4, 3.0, 1.6, 1.4, 1.1, 1.0, 0.5, 1.0, 1.1, 1.4, 1.6, 3.0, 8.4];
const LOW_16: [f64; 17] = [
    16.0, 9.0, 2.0, 1.4, 1.4, 1.2, 1.1, 1.0, 0.5, 1.0, 1.1, 1.2, 1.4, 1.4, 2.0, 9.0, 16.0,
];

const MEDIUM_8: [f64; 9] = [13.0, 3.0, 1.3, 0.7, 0.4, 0.7, 1.3, 3.0, 13.0];
const MEDIUM_12: [f64; 13] = [33.0, 11.0, 4.0, 2.0, 1.1, 0.6, 0.3, 0.6, 1.1, 2.0, 4.0, 11.0, 33.0];
const MEDIUM_16: [f64; 17] = [
    110.0, 41.0, 10.0, 5.0, 3.0, 1.5, 1.0, 0.5, 0.3, 0.5, 1.0, 1.5, 3.0, 5.0, 10.0, 41.0, 110.0,
];

const HIGH_8: [f64; 9] = [29.0, 4.0, 1.5, 0.3, 0.2, 0.3, 1.5, 4.0, 29.0];
const HIGH_12: [f64; 13] = [170.0, 24.0, 8.1, 2.0, 0.7, 0.2, 0.2, 0.2, 0.7, 2.0, 8.1, 24.0, 170.0];
const HIGH_16: [f64; 17] = [
    1000.0, 130.0, 26.0, 9.0, 4.0, 2.0, 0.2, 0.2, 0.2, 0.2, 0.2, 2.0, 4.0, 9.0, 26.0, 130.0, 1000.0,
];

/// Multiplier table for `(risk, rows)`, indexed by bucket
pub fn table(risk: RiskLevel, rows: u8) -> Option<&'static [f64]> {
    let table: &'static [f64] = match (risk, rows) {
        (RiskLevel::Low, 8) => &LOW_8,
        (RiskLevel::Low, 12) => &LOW_12,
        (RiskLevel::Low, 16) => &LOW_16,
        (RiskLevel::Medium, 8) => &MEDIUM_8,
        (RiskLevel::Medium, 12) => &MEDIUM_12,
        (RiskLevel::Medium, 16) => &MEDIUM_16,
        (RiskLevel::High, 8) => &HIGH_8,
        (RiskLevel::High, 12) => &HIGH_12,
        (RiskLevel::High, 16) => &HIGH_16,
        _ => return None,
    };
    Some(table)
}

/// Probability of landing in each bucket after `rows` fair bounces
pub fn bucket_probabilities(rows: u8) -> Vec<f64> {
    let n = rows as usize;
    let total = 2f64.powi(rows as i32);
    let mut coefficient = 1.0;
    (0..=n)
        .map(|k| {
            let p = coefficient / total;
            coefficient = coefficient * (n - k) as f64 / (k + 1) as f64;
            p
        })
        .collect()
}

/// Expected multiplier of a table under the binomial bucket distribution
pub fn expected_value(risk: RiskLevel, rows: u8) -> Option<f64> {
    let table = table(risk, rows)?;
    Some(
        bucket_probabilities(rows)
            .iter()
            .zip(table)
            .map(|(p, m)| p * m)
            .sum(),
    )
}

/// A resolved drop
#[derive(Debug, Clone)]
pub struct PlinkoRound {
    rows: u8,
    risk: RiskLevel,
    /// `true` is a bounce to the right
    path: Vec<bool>,
    bucket: usize,
    multiplier: f64,
}

impl PlinkoRound {
    pub fn start(
        rows: u8,
        risk: RiskLevel,
        config: &PlinkoConfig,
        rng: &mut dyn RandomSource,
    ) -> Result<Self, ParameterError> {
        if !config.allowed_rows.contains(&rows) {
            return Err(ParameterError::PlinkoRows(rows));
        }
        let table = table(risk, rows).ok_or(ParameterError::PlinkoRows(rows))?;

        let path: Vec<bool> = (0..rows).map(|_| rng.draw() >= 0.5).collect();
        let bucket = path.iter().filter(|&&right| right).count();

        Ok(Self {
            rows,
            risk,
            path,
            bucket,
            multiplier: table[bucket],
        })
    }

    pub fn bucket(&self) -> usize {
        self.bucket
    }

    /// Always settles as a payout, possibly below the stake
    pub fn resolve(&self) -> RoundResult {
        RoundResult::Win {
            multiplier: self.multiplier,
        }
    }
}

impl Round for PlinkoRound {
    const GAME: GameType = GameType::Plinko;

    fn multiplier(&self) -> f64 {
        self.multiplier
    }

    fn view(&self, _settled: bool) -> RoundView {
        RoundView::Plinko {
            rows: self.rows,
            risk: self.risk,
            path: self.path.clone(),
            bucket: self.bucket,
        }
    }

    fn hidden_outcome(&self) -> HiddenOutcome {
        HiddenOutcome::Plinko {
            bounces: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::rng::{ReplayRandom, StdRandom};

    const RISKS: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    #[test]
    fn test_tables_are_symmetric_and_sized() {
        for risk in RISKS {
            for rows in SUPPORTED_ROWS {
                let table = table(risk, rows).unwrap();
                assert_eq!(table.len(), rows as usize + 1);
                let reversed: Vec<f64> = table.iter().rev().copied().collect();
                assert_eq!(table, reversed.as_slice());

                // Non-decreasing away from the centre
                let centre = rows as usize / 2;
                for i in centre..rows as usize {
                    assert!(table[i + 1] >= table[i], "{:?}/{}", risk, rows);
                }
            }
        }
    }

    #[test]
    fn test_every_table_has_a_house_edge() {
        for risk in RISKS {
            for rows in SUPPORTED_ROWS {
                let ev = expected_value(risk, rows).unwrap();
                assert!(ev < 1.0 && ev > 0.98, "{:?}/{} ev={}", risk, rows, ev);
            }
        }
    }

    #[test]
    fn test_bucket_probabilities_sum_to_one() {
        for rows in SUPPORTED_ROWS {
            let total: f64 = bucket_probabilities(rows).iter().sum();
            assert!((total - 1.0).abs() < 1e-12);
        }
        assert!((bucket_probabilities(12)[6] - 924.0 / 4096.0).abs() < 1e-15);
    }

    #[test]
    fn test_unsupported_rows() {
        let config = PlinkoConfig::default();
        let mut rng = StdRandom::seeded(1);
        assert_eq!(
            PlinkoRound::start(10, RiskLevel::Low, &config, &mut rng).unwrap_err(),
            ParameterError::PlinkoRows(10)
        );
    }

    #[test]
    fn test_all_right_lands_in_last_bucket() {
        let config = PlinkoConfig::default();
        let round =
            PlinkoRound::start(8, RiskLevel::High, &config, &mut ReplayRandom::constant(0.9)).unwrap();
        assert_eq!(round.bucket(), 8);
        assert_eq!(round.resolve(), RoundResult::Win { multiplier: 29.0 });
    }

    #[test]
    fn test_drop_histogram_converges_to_binomial() {
        let config = PlinkoConfig::default();
        let mut rng = StdRandom::seeded(12);
        let drops = 100_000;
        let mut histogram = [0usize; 13];
        for _ in 0..drops {
            let round = PlinkoRound::start(12, RiskLevel::Medium, &config, &mut rng).unwrap();
            histogram[round.bucket()] += 1;
        }

        for (bucket, expected) in bucket_probabilities(12).iter().enumerate() {
            let observed = histogram[bucket] as f64 / drops as f64;
            assert!(
                (observed - expected).abs() < 0.005,
                "bucket {}: observed {} expected {}",
                bucket,
                observed,
                expected
            );
        }
    }
}
