//! Wager Engine - wagering core for single-player mini-games
//!
//! Outcome generation, odds and bet lifecycle for six games (mines, tower,
//! crash, limbo, dice, plinko) against one virtual balance. Each round
//! commits its hidden outcome at start; every settlement credits the ledger
//! and appends to a bounded history.

pub mod common;
pub mod config;
pub mod errors;
pub mod games;
pub mod ledger;
pub mod metrics;
pub mod storage;

pub use common::config::{generate_sample_config, ConfigBuilder, ConfigLoader};
pub use common::traits::{RandomSource, StateStore};
pub use config::EngineConfig;
pub use errors::{WagerError, WagerResult};
pub use games::{
    GameInput, GameParams, GameProcessor, GameType, LiveCrashHandle, SessionId, SessionState,
    SessionStatus,
};
pub use ledger::{HistoryEntry, Ledger};
pub use metrics::EngineMetrics;
pub use storage::{JsonFileStore, MemoryStore, PersistedState};
