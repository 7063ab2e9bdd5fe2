//! Common utilities and shared functionality
//!
//! This module contains utilities and shared code used across the engine.

pub mod config;
pub mod traits;
pub mod types;
