//! Configuration loading for the wagering engine
//!
//! TOML file first, then `WAGER_*` environment overrides, then validation.

use crate::config::{
    CrashConfig, DiceConfig, EngineConfig, LedgerConfig, LogLevel, MinesConfig, PlinkoConfig,
    StorageConfig, TowerConfig,
};
use crate::errors::{ConfigurationError, WagerResult};
use std::env;
use std::path::Path;

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> WagerResult<EngineConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => EngineConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;

        config
            .validate()
            .map_err(|e| ConfigurationError::ValidationFailed(e.to_string()))?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> WagerResult<EngineConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut EngineConfig) -> WagerResult<()> {
        if let Ok(balance) = env::var("WAGER_STARTING_BALANCE") {
            config.ledger.starting_balance = parse_env("WAGER_STARTING_BALANCE", balance)?;
        }
        if let Ok(stake) = env::var("WAGER_MIN_STAKE") {
            config.ledger.min_stake = parse_env("WAGER_MIN_STAKE", stake)?;
        }
        if let Ok(path) = env::var("WAGER_STATE_PATH") {
            config.storage.state_path = path;
        }
        if let Ok(level) = env::var("WAGER_LOG_LEVEL") {
            config.monitoring.log_level = match level.to_ascii_lowercase().as_str() {
                "error" => LogLevel::Error,
                "warn" => LogLevel::Warn,
                "info" => LogLevel::Info,
                "debug" => LogLevel::Debug,
                "trace" => LogLevel::Trace,
                _ => {
                    return Err(ConfigurationError::InvalidValue {
                        field: "WAGER_LOG_LEVEL".to_string(),
                        value: level,
                        reason: "Expected error, warn, info, debug or trace".to_string(),
                    }
                    .into())
                }
            };
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &EngineConfig, path: &str) -> WagerResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

fn parse_env(field: &str, value: String) -> WagerResult<f64> {
    value.parse::<f64>().map_err(|_| {
        ConfigurationError::InvalidValue {
            field: field.to_string(),
            value,
            reason: "Invalid decimal amount".to_string(),
        }
        .into()
    })
}

/// Builder pattern for creating configurations
pub struct ConfigBuilder {
    config: EngineConfig,
}

impl ConfigBuilder {
    /// Create a new config builder with defaults
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn ledger(mut self, ledger: LedgerConfig) -> Self {
        self.config.ledger = ledger;
        self
    }

    pub fn mines(mut self, mines: MinesConfig) -> Self {
        self.config.mines = mines;
        self
    }

    pub fn tower(mut self, tower: TowerConfig) -> Self {
        self.config.tower = tower;
        self
    }

    pub fn crash(mut self, crash: CrashConfig) -> Self {
        self.config.crash = crash;
        self
    }

    pub fn dice(mut self, dice: DiceConfig) -> Self {
        self.config.dice = dice;
        self
    }

    pub fn plinko(mut self, plinko: PlinkoConfig) -> Self {
        self.config.plinko = plinko;
        self
    }

    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> WagerResult<()> {
    let config = EngineConfig::default();
    ConfigLoader::new().save(&config, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrashDistribution;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_load() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.ledger.history_capacity, 50);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .ledger(LedgerConfig {
                starting_balance: 250.0,
                ..Default::default()
            })
            .tower(TowerConfig {
                floors: 9,
                ..Default::default()
            })
            .build();

        assert_eq!(config.ledger.starting_balance, 250.0);
        assert_eq!(config.tower.floors, 9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_config() -> WagerResult<()> {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        let mut original = EngineConfig::default();
        original.crash.distribution = CrashDistribution::default_bands();
        original.mines.house_edge = 0.97;

        let loader = ConfigLoader::new();
        loader.save(&original, path)?;

        let loaded = ConfigLoader::new().with_path(path).load()?;
        assert_eq!(loaded.mines.house_edge, 0.97);
        assert_eq!(loaded.crash.distribution, original.crash.distribution);
        assert_eq!(loaded.tower.easy, original.tower.easy);

        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> WagerResult<()> {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "[ledger]\nstarting_balance = 42.0\n")?;

        let loaded = ConfigLoader::new().with_path(temp_file.path()).load()?;
        assert_eq!(loaded.ledger.starting_balance, 42.0);
        assert_eq!(loaded.ledger.min_stake, 0.10);
        assert_eq!(loaded.tower.floors, 6);

        Ok(())
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "[mines]\nhouse_edge = 1.5\n").unwrap();

        assert!(ConfigLoader::new().with_path(temp_file.path()).load().is_err());
    }
}
