//! Configuration module
//!
//! Queue settings read from the environment (and an optional `.env` file).

use std::env;

use crate::error::QueueError;

// Common constants
const DEFAULT_QUEUE_NAME: &str = "ferry";
const DEFAULT_QUEUE_CAPACITY: usize = 10;

pub const QUEUE_NAME_VAR: &str = "FERRY_QUEUE_NAME";
pub const QUEUE_CAPACITY_VAR: &str = "FERRY_QUEUE_CAPACITY";

/// Queue settings.
///
/// `name` only labels log records; `capacity` bounds the buffer of each run
/// started from this config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    pub name: String,
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_QUEUE_NAME.to_string(),
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = lookup(QUEUE_NAME_VAR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string());

        let capacity = match lookup(QUEUE_CAPACITY_VAR) {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                anyhow::anyhow!("{QUEUE_CAPACITY_VAR} must be a positive integer, got '{raw}'")
            })?,
            None => DEFAULT_QUEUE_CAPACITY,
        };

        let config = Self { name, capacity };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.capacity == 0 {
            return Err(QueueError::InvalidCapacity);
        }
        if self.name.trim().is_empty() {
            return Err(QueueError::Config("queue name must not be empty".to_string()));
        }
        Ok(())
    }
}
