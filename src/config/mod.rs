//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::num::NonZeroU32;

use crate::game::SnapshotPolicy;

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,

    /// Seed for the world RNG; `None` picks one at startup
    pub world_seed: Option<u64>,
    pub snapshot_policy: SnapshotPolicy,

    /// Max inbound move frames per second per socket
    pub input_rate_limit: NonZeroU32,
    /// Frames buffered per socket before new ones are dropped
    pub outbox_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // PORT wins over SERVER_ADDR
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(_) => return Err(ConfigError::Invalid("LOG_FORMAT")),
        };

        let world_seed = lookup("WORLD_SEED")
            .map(|v| v.trim().parse::<u64>())
            .transpose()
            .map_err(|_| ConfigError::Invalid("WORLD_SEED"))?;

        let snapshot_policy = match lookup("SNAPSHOT_POLICY") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::Invalid("SNAPSHOT_POLICY"))?,
            None => SnapshotPolicy::default(),
        };

        let input_rate_limit = NonZeroU32::new(parse_or("INPUT_RATE_LIMIT", &lookup, 240)?)
            .ok_or(ConfigError::Invalid("INPUT_RATE_LIMIT"))?;
        let outbox_capacity: usize = parse_or("OUTBOX_CAPACITY", &lookup, 32)?;
        if outbox_capacity == 0 {
            return Err(ConfigError::Invalid("OUTBOX_CAPACITY"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,
            world_seed,
            snapshot_policy,
            input_rate_limit,
            outbox_capacity,
        })
    }
}

fn parse_or<T, F>(key: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
