//! Shared traits and interfaces
//!
//! The engine talks to randomness and persistence only through these seams,
//! so either can be swapped without touching game logic.

use crate::errors::WagerResult;
use crate::storage::PersistedState;

/// Source of uniform random draws consumed by every outcome generator
pub trait RandomSource: Send {
    /// Uniform draw in `[0, 1)`
    fn draw(&mut self) -> f64;

    /// Uniform integer in `[0, n)`; returns 0 when `n == 0`
    fn draw_int(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        ((self.draw() * n as f64) as u32).min(n - 1)
    }

    /// `k` distinct positions out of `0..n`, drawn without replacement
    fn sample_distinct(&mut self, n: u8, k: u8) -> Vec<u8> {
        let mut positions: Vec<u8> = (0..n).collect();
        let k = k.min(n) as usize;

        // Partial Fisher-Yates: the first k slots end up uniformly chosen
        for i in 0..k {
            let remaining = positions.len() - i;
            let j = i + self.draw_int(remaining as u32) as usize;
            positions.swap(i, j);
        }

        positions.truncate(k);
        positions
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn draw(&mut self) -> f64 {
        (**self).draw()
    }

    fn draw_int(&mut self, n: u32) -> u32 {
        (**self).draw_int(n)
    }

    fn sample_distinct(&mut self, n: u8, k: u8) -> Vec<u8> {
        (**self).sample_distinct(n, k)
    }
}

/// Persistence collaborator for balance and history
pub trait StateStore: Send + Sync {
    /// Load previously saved state, `None` when nothing was saved yet
    fn load(&self) -> WagerResult<Option<PersistedState>>;

    /// Replace the saved state
    fn save(&self, state: &PersistedState) -> WagerResult<()>;
}
