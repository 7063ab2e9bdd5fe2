//! Balance ledger and settlement history
//!
//! The ledger is the single authority over the balance. Debits are checked
//! against the balance under the same lock that applies them, and a
//! settlement credits the payout and appends its history record in one step.

use crate::common::types::{lock, now, MONEY_EPSILON};
use crate::config::LedgerConfig;
use crate::errors::{LedgerError, StakeError};
use crate::games::types::{GameType, SessionId};
use crate::storage::PersistedState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

/// Immutable settlement record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub session_id: SessionId,
    pub game: GameType,
    pub stake: f64,
    /// 0 on a loss
    pub multiplier: f64,
    pub payout: f64,
    /// `payout - stake`
    pub profit: f64,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(session_id: SessionId, game: GameType, stake: f64, multiplier: f64) -> Self {
        let payout = stake * multiplier;
        Self {
            id: Uuid::new_v4(),
            session_id,
            game,
            stake,
            multiplier,
            payout,
            profit: payout - stake,
            timestamp: now(),
        }
    }

    pub fn is_win(&self) -> bool {
        self.profit > 0.0
    }
}

/// Bounded most-recent-first record of settlements
#[derive(Debug, Clone)]
pub struct HistoryRecorder {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend an entry, discarding the oldest beyond capacity
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// Up to `limit` entries, newest first
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.entries.iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace contents with `entries` (newest first), keeping the bound
    pub fn restore(&mut self, entries: Vec<HistoryEntry>) {
        self.entries = entries.into_iter().take(self.capacity).collect();
    }
}

#[derive(Debug)]
struct LedgerInner {
    balance: f64,
    history: HistoryRecorder,
}

/// Process-wide balance plus its history
#[derive(Debug)]
pub struct Ledger {
    config: LedgerConfig,
    inner: Mutex<LedgerInner>,
}

/// Stake rules: finite, at least the minimum, at most the balance
pub fn validate_stake(stake: f64, balance: f64, minimum: f64) -> Result<(), StakeError> {
    if !stake.is_finite() {
        return Err(StakeError::NotFinite);
    }
    if stake + MONEY_EPSILON < minimum {
        return Err(StakeError::BelowMinimum { stake, minimum });
    }
    if stake > balance + MONEY_EPSILON {
        return Err(StakeError::ExceedsBalance { stake, balance });
    }
    Ok(())
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        let inner = LedgerInner {
            balance: config.starting_balance,
            history: HistoryRecorder::new(config.history_capacity),
        };
        Self {
            config,
            inner: Mutex::new(inner),
        }
    }

    /// Ledger seeded from previously persisted state
    pub fn from_state(config: LedgerConfig, state: PersistedState) -> Self {
        let ledger = Self::new(config);
        ledger.restore(state);
        ledger
    }

    pub fn balance(&self) -> f64 {
        lock(&self.inner).balance
    }

    pub fn min_stake(&self) -> f64 {
        self.config.min_stake
    }

    /// Validate and debit a stake atomically
    pub fn place_stake(&self, stake: f64) -> Result<f64, StakeError> {
        let mut inner = lock(&self.inner);
        validate_stake(stake, inner.balance, self.config.min_stake)?;
        inner.balance = (inner.balance - stake).max(0.0);
        Ok(inner.balance)
    }

    /// Remove `amount`, refusing to go negative
    pub fn debit(&self, amount: f64) -> Result<f64, LedgerError> {
        check_amount(amount)?;
        let mut inner = lock(&self.inner);
        if amount > inner.balance + MONEY_EPSILON {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: inner.balance,
            });
        }
        inner.balance = (inner.balance - amount).max(0.0);
        Ok(inner.balance)
    }

    pub fn credit(&self, amount: f64) -> Result<f64, LedgerError> {
        check_amount(amount)?;
        let mut inner = lock(&self.inner);
        inner.balance += amount;
        Ok(inner.balance)
    }

    /// Apply a signed delta, clamping the result at zero
    pub fn apply_delta(&self, delta: f64) -> f64 {
        let mut inner = lock(&self.inner);
        if delta.is_finite() {
            inner.balance = (inner.balance + delta).max(0.0);
        }
        inner.balance
    }

    /// Credit the entry's payout and record it
    pub fn settle(&self, entry: HistoryEntry) -> f64 {
        let mut inner = lock(&self.inner);
        if entry.payout.is_finite() && entry.payout > 0.0 {
            inner.balance += entry.payout;
        }
        inner.history.append(entry);
        inner.balance
    }

    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        lock(&self.inner).history.recent(limit)
    }

    pub fn history_len(&self) -> usize {
        lock(&self.inner).history.len()
    }

    /// Back to the starting balance with an empty history
    pub fn reset(&self) -> f64 {
        let mut inner = lock(&self.inner);
        inner.balance = self.config.starting_balance;
        inner.history.clear();
        inner.balance
    }

    pub fn snapshot(&self) -> PersistedState {
        let inner = lock(&self.inner);
        PersistedState {
            balance: inner.balance,
            history: inner.history.recent(self.config.history_capacity),
        }
    }

    pub fn restore(&self, state: PersistedState) {
        let mut inner = lock(&self.inner);
        inner.balance = if state.balance.is_finite() {
            state.balance.max(0.0)
        } else {
            self.config.starting_balance
        };
        inner.history.restore(state.history);
    }
}

fn check_amount(amount: f64) -> Result<(), LedgerError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> Ledger {
        Ledger::new(LedgerConfig::default())
    }

    fn entry(stake: f64, multiplier: f64) -> HistoryEntry {
        HistoryEntry::new(SessionId::new(), GameType::Dice, stake, multiplier)
    }

    #[test]
    fn test_stake_validation() {
        assert_eq!(
            validate_stake(0.05, 100.0, 0.10),
            Err(StakeError::BelowMinimum { stake: 0.05, minimum: 0.10 })
        );
        assert_eq!(validate_stake(f64::NAN, 100.0, 0.10), Err(StakeError::NotFinite));
        assert_eq!(
            validate_stake(150.0, 100.0, 0.10),
            Err(StakeError::ExceedsBalance { stake: 150.0, balance: 100.0 })
        );
        assert!(validate_stake(0.10, 100.0, 0.10).is_ok());
        assert!(validate_stake(100.0, 100.0, 0.10).is_ok());
    }

    #[test]
    fn test_place_stake_rejection_leaves_balance() {
        let ledger = ledger();
        assert!(ledger.place_stake(100.01).is_err());
        assert_eq!(ledger.balance(), 100.0);
        assert_eq!(ledger.place_stake(25.0).unwrap(), 75.0);
    }

    #[test]
    fn test_debit_insufficient_funds() {
        let ledger = ledger();
        assert_eq!(
            ledger.debit(200.0),
            Err(LedgerError::InsufficientFunds { requested: 200.0, available: 100.0 })
        );
        assert_eq!(ledger.debit(40.0).unwrap(), 60.0);
        assert_eq!(ledger.credit(5.0).unwrap(), 65.0);
        assert!(ledger.credit(-1.0).is_err());
    }

    #[test]
    fn test_apply_delta_clamps_at_zero() {
        let ledger = ledger();
        assert_eq!(ledger.apply_delta(-250.0), 0.0);
        assert_eq!(ledger.apply_delta(f64::NAN), 0.0);
        assert_eq!(ledger.apply_delta(12.5), 12.5);
    }

    #[test]
    fn test_settle_credits_and_records() {
        let ledger = ledger();
        ledger.place_stake(10.0).unwrap();
        let balance = ledger.settle(entry(10.0, 2.5));
        assert_eq!(balance, 115.0);

        let history = ledger.recent(50);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].payout, 25.0);
        assert_eq!(history[0].profit, 15.0);
        assert!(history[0].is_win());
    }

    #[test]
    fn test_loss_entry() {
        let loss = entry(4.0, 0.0);
        assert_eq!(loss.payout, 0.0);
        assert_eq!(loss.profit, -4.0);
        assert!(!loss.is_win());
    }

    #[test]
    fn test_history_bound_keeps_newest() {
        let ledger = ledger();
        for i in 0..60 {
            ledger.settle(entry(1.0 + i as f64, 0.0));
        }

        let recent = ledger.recent(50);
        assert_eq!(recent.len(), 50);
        assert_eq!(recent[0].stake, 60.0);
        assert_eq!(recent[49].stake, 11.0);
        assert_eq!(ledger.history_len(), 50);
    }

    #[test]
    fn test_reset() {
        let ledger = ledger();
        ledger.place_stake(30.0).unwrap();
        ledger.settle(entry(30.0, 0.0));

        assert_eq!(ledger.reset(), 100.0);
        assert_eq!(ledger.balance(), 100.0);
        assert!(ledger.recent(50).is_empty());
    }

    #[test]
    fn test_snapshot_and_restore() {
        let ledger = ledger();
        ledger.place_stake(10.0).unwrap();
        ledger.settle(entry(10.0, 1.5));
        let state = ledger.snapshot();

        let restored = Ledger::from_state(LedgerConfig::default(), state.clone());
        assert_eq!(restored.balance(), 105.0);
        assert_eq!(restored.recent(50), state.history);
    }

    #[test]
    fn test_restore_sanitises_balance() {
        let ledger = ledger();
        ledger.restore(PersistedState {
            balance: -5.0,
            history: Vec::new(),
        });
        assert_eq!(ledger.balance(), 0.0);
    }
}
