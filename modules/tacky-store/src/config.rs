use std::env;

use tracing::info;

use crate::error::{Result, StoreError};

const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Store configuration, optionally loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Record one snapshot per flushed batch.
    pub time_travel: bool,
    /// Snapshots kept before the oldest is evicted.
    pub history_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            time_travel: false,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl StoreConfig {
    /// Load from `TACKY_TIME_TRAVEL` and `TACKY_HISTORY_LIMIT`.
    /// Unset variables fall back to the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let time_travel = match lookup("TACKY_TIME_TRAVEL") {
            Some(raw) => parse_flag("TACKY_TIME_TRAVEL", &raw)?,
            None => defaults.time_travel,
        };

        let history_limit = match lookup("TACKY_HISTORY_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or_else(|| {
                    StoreError::Config(format!(
                        "TACKY_HISTORY_LIMIT must be a positive integer, got `{raw}`"
                    ))
                })?,
            None => defaults.history_limit,
        };

        Ok(Self {
            time_travel,
            history_limit,
        })
    }

    pub fn with_time_travel(mut self, enabled: bool) -> Self {
        self.time_travel = enabled;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Log the active settings.
    pub fn log(&self) {
        info!(
            time_travel = self.time_travel,
            history_limit = self.history_limit,
            "Store config"
        );
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(StoreError::Config(format!(
            "{key} must be a boolean flag, got `{other}`"
        ))),
    }
}
