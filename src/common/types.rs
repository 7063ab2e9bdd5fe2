//! Shared helpers for money amounts and timestamps

use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Tolerance used when comparing money amounts
pub const MONEY_EPSILON: f64 = 1e-9;

/// Current wall-clock time, used to stamp history entries
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Round an amount to whole cents for display
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Floor a multiplier to two decimals (crash points are quoted this way)
pub fn floor_hundredths(value: f64) -> f64 {
    (value * 100.0).floor() / 100.0
}

/// Format an amount the way balances are shown to players
pub fn format_money(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(1.005_1), 1.01);
        assert_eq!(round_cents(2.0), 2.0);
    }

    #[test]
    fn test_floor_hundredths() {
        assert_eq!(floor_hundredths(3.409), 3.4);
        assert_eq!(floor_hundredths(1.0), 1.0);
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(100.0), "$100.00");
        assert_eq!(format_money(0.1), "$0.10");
    }
}
