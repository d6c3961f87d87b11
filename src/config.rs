//! Configuration management with validation and defaults.
//!
//! TOML file plus environment-variable overrides, validated before use.

use crate::errors::{GameError, GameResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Top-level server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FairhouseConfig {
    pub server: ServerConfig,
    pub crash: CrashConfig,
    pub games: GamesConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

/// Crash round engine tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashConfig {
    /// How long the betting window stays open.
    pub betting_window_ms: u64,
    /// Multiplier tick period while running.
    pub tick_interval_ms: u64,
    /// Pause between a crash and the next round.
    pub cooldown_ms: u64,
    /// Per-second growth of the live curve: m(t) = growth_base^t.
    pub growth_base: f64,
    /// Starting pool for the shared bank.
    pub initial_bank: u64,
    pub min_bet: u64,
}

/// Coinflip/mines settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GamesConfig {
    pub min_bet: u64,
    pub starting_balance: u64,
    pub history_limit: usize,
}

impl Default for FairhouseConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            crash: CrashConfig::default(),
            games: GamesConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            betting_window_ms: 20_000,
            tick_interval_ms: 100,
            cooldown_ms: 3_000,
            growth_base: 1.07,
            initial_bank: 1_000_000,
            min_bet: 1,
        }
    }
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            min_bet: 100_000,
            starting_balance: 1_000_000,
            history_limit: 50,
        }
    }
}

/// Configuration loader with environment variable support.
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load from file (if set), apply env overrides, validate.
    pub fn load(&self) -> GameResult<FairhouseConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            FairhouseConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> GameResult<FairhouseConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GameError::Validation(format!("failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| GameError::Validation(format!("failed to parse TOML: {}", e)))
    }

    fn apply_env_overrides(&self, config: &mut FairhouseConfig) -> GameResult<()> {
        if let Ok(host) = env::var("FAIRHOUSE_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = env::var("FAIRHOUSE_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| GameError::Validation(format!("invalid FAIRHOUSE_PORT: {}", port)))?;
        }
        if let Ok(bank) = env::var("FAIRHOUSE_CRASH_BANK") {
            config.crash.initial_bank = bank.parse().map_err(|_| {
                GameError::Validation(format!("invalid FAIRHOUSE_CRASH_BANK: {}", bank))
            })?;
        }
        if let Ok(min_bet) = env::var("FAIRHOUSE_MIN_BET") {
            config.games.min_bet = min_bet.parse().map_err(|_| {
                GameError::Validation(format!("invalid FAIRHOUSE_MIN_BET: {}", min_bet))
            })?;
        }
        Ok(())
    }

    fn validate(&self, config: &FairhouseConfig) -> GameResult<()> {
        if config.server.port == 0 {
            return Err(GameError::Validation("server.port cannot be zero".into()));
        }
        if config.crash.tick_interval_ms == 0 {
            return Err(GameError::Validation(
                "crash.tick_interval_ms cannot be zero".into(),
            ));
        }
        if config.crash.growth_base <= 1.0 {
            return Err(GameError::Validation(
                "crash.growth_base must be greater than 1".into(),
            ));
        }
        if config.crash.betting_window_ms == 0 {
            return Err(GameError::Validation(
                "crash.betting_window_ms cannot be zero".into(),
            ));
        }
        if config.games.history_limit == 0 {
            return Err(GameError::Validation(
                "games.history_limit cannot be zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
