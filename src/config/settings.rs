use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

use crate::analysis::aggregator::{DEFAULT_HISTORY_CAPACITY, MAX_HISTORY_CAPACITY};
use crate::capture::listener::{DEFAULT_MAX_DATAGRAM, MAX_DATAGRAM};
use crate::visualization::presenter::DEFAULT_TOP_TALKERS;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5005";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot write config file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub listener: ListenerConfig,
    pub history: HistoryConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub bind_addr: String,
    pub max_datagram_size: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    pub refresh_rate_ms: u64,
    pub top_talkers: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_datagram_size: DEFAULT_MAX_DATAGRAM,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 100,
            top_talkers: DEFAULT_TOP_TALKERS,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listener.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "listener.bind_addr '{}' is not an address:port pair",
                self.listener.bind_addr
            )));
        }
        if !(1..=MAX_DATAGRAM).contains(&self.listener.max_datagram_size) {
            return Err(ConfigError::Invalid(format!(
                "listener.max_datagram_size must be between 1 and {}",
                MAX_DATAGRAM
            )));
        }
        if self.history.capacity > MAX_HISTORY_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "history.capacity must be at most {}",
                MAX_HISTORY_CAPACITY
            )));
        }
        if self.ui.refresh_rate_ms == 0 {
            return Err(ConfigError::Invalid("ui.refresh_rate_ms must be positive".to_string()));
        }
        Ok(())
    }
}
