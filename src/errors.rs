//! Error types for the wagering engine
//!
//! Every rejection is recoverable: a rejected request leaves the balance,
//! the session and the history untouched.

use crate::games::types::{GameType, SessionId, SessionStatus};

/// Root error type for all engine operations
#[derive(Debug, thiserror::Error)]
pub enum WagerError {
    /// Stake below minimum, not a number, or more than the balance
    #[error("Invalid stake: {0}")]
    InvalidStake(#[from] StakeError),

    /// Action against a session that cannot accept it
    #[error("Invalid action: {0}")]
    InvalidAction(#[from] ActionError),

    /// Round parameters outside the supported range
    #[error("Invalid parameters: {0}")]
    InvalidParameters(#[from] ParameterError),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Balance/history persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Stake validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StakeError {
    #[error("stake {stake:.2} is below the minimum of {minimum:.2}")]
    BelowMinimum { stake: f64, minimum: f64 },

    #[error("stake is not a finite number")]
    NotFinite,

    #[error("stake {stake:.2} exceeds balance {balance:.2}")]
    ExceedsBalance { stake: f64, balance: f64 },
}

/// Session action errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("session is {0}, not active")]
    NotActive(SessionStatus),

    #[error("position {0} already revealed")]
    AlreadyRevealed(u8),

    #[error("position {index} out of range (0..{max})")]
    OutOfRange { index: u8, max: u8 },

    #[error("unexpected input for {game}: expected {expected}")]
    UnexpectedInput { game: GameType, expected: &'static str },

    #[error("a {0} round is already in progress")]
    RoundInProgress(GameType),

    #[error("nothing to cash out yet")]
    NothingToCashOut,

    #[error("{0} does not support manual cash-out")]
    CashOutUnsupported(GameType),

    #[error("live round {0} is settled by its round driver")]
    LiveRoundDriven(SessionId),

    #[error("live rounds need a running tokio runtime")]
    NoRuntime,
}

/// Round parameter errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("mine count {count} outside 1..={max}")]
    MineCount { count: u8, max: u8 },

    #[error("unsupported plinko row count {0}")]
    PlinkoRows(u8),

    #[error("dice threshold {0} outside (1, 99)")]
    DiceThreshold(f64),

    #[error("target multiplier {target} outside {min}..={max}")]
    TargetMultiplier { target: f64, min: f64, max: f64 },

    #[error("strategy {field} = {value} outside 1..={max}")]
    StrategyBounds {
        field: &'static str,
        value: u8,
        max: u8,
    },
}

/// Configuration and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

/// Ledger-level errors, surfaced to callers as stake errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient funds: requested {requested:.2}, available {available:.2}")]
    InsufficientFunds { requested: f64, available: f64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),
}

impl From<LedgerError> for WagerError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientFunds {
                requested,
                available,
            } => WagerError::InvalidStake(StakeError::ExceedsBalance {
                stake: requested,
                balance: available,
            }),
            LedgerError::InvalidAmount(_) => WagerError::InvalidStake(StakeError::NotFinite),
        }
    }
}

impl From<std::io::Error> for WagerError {
    fn from(e: std::io::Error) -> Self {
        WagerError::Storage(StorageError::ReadFailed(e.to_string()))
    }
}

impl From<serde_json::Error> for WagerError {
    fn from(e: serde_json::Error) -> Self {
        WagerError::Storage(StorageError::CorruptedData(e.to_string()))
    }
}

// Convenience type alias for Results
pub type WagerResult<T> = Result<T, WagerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WagerError::from(StakeError::BelowMinimum {
            stake: 0.05,
            minimum: 0.10,
        });

        assert!(err.to_string().contains("Invalid stake"));
        assert!(err.to_string().contains("0.05"));
    }

    #[test]
    fn test_insufficient_funds_becomes_invalid_stake() {
        let err: WagerError = LedgerError::InsufficientFunds {
            requested: 5.0,
            available: 2.0,
        }
        .into();

        match err {
            WagerError::InvalidStake(StakeError::ExceedsBalance { stake, balance }) => {
                assert_eq!(stake, 5.0);
                assert_eq!(balance, 2.0);
            }
            other => panic!("Expected invalid stake, got {:?}", other),
        }
    }

    #[test]
    fn test_error_source() {
        use std::error::Error;

        let err = WagerError::from(ActionError::NothingToCashOut);
        assert!(err.source().is_some());
    }
}
