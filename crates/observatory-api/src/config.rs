use std::net::SocketAddr;
use std::path::PathBuf;

use metrics_core::{MetricsConfig, MoralLabelMatch};
use thiserror::Error;

pub const DEFAULT_SQLITE_PATH: &str = "observatory.sqlite";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

pub const SQLITE_PATH_ENV: &str = "OBSERVATORY_SQLITE_PATH";
pub const BIND_ADDR_ENV: &str = "OBSERVATORY_ADDR";
pub const MORAL_LABEL_MATCH_ENV: &str = "OBSERVATORY_MORAL_LABEL_MATCH";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is not a socket address: {value}")]
    InvalidAddr { key: &'static str, value: String },
    #[error("{key}: {message}")]
    InvalidLabelMatch { key: &'static str, message: String },
}

/// Runtime settings shared by the server and the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservatoryConfig {
    pub sqlite_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub metrics: MetricsConfig,
}

impl Default for ObservatoryConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from(DEFAULT_SQLITE_PATH),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            metrics: MetricsConfig::default(),
        }
    }
}

impl ObservatoryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from a key lookup; blank values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = read(SQLITE_PATH_ENV) {
            config.sqlite_path = PathBuf::from(path);
        }

        if let Some(addr) = read(BIND_ADDR_ENV) {
            config.bind_addr = addr.trim().parse().map_err(|_| ConfigError::InvalidAddr {
                key: BIND_ADDR_ENV,
                value: addr.clone(),
            })?;
        }

        if let Some(policy) = read(MORAL_LABEL_MATCH_ENV) {
            config.metrics.moral_label_match =
                policy
                    .parse::<MoralLabelMatch>()
                    .map_err(|message| ConfigError::InvalidLabelMatch {
                        key: MORAL_LABEL_MATCH_ENV,
                        message,
                    })?;
        }

        Ok(config)
    }
}
