//! Loader configuration
//!
//! Defaults, overridden by `KVLOAD_*` environment variables, overridden by
//! command-line flags.

use crate::normalize::NormalizationMode;
use crate::throttle::{FixedIntervalPause, Throttle, ThrottleKind, TokenBucket, Unthrottled};
use kvload_common::error::env_parse;
use kvload_common::{KvloadError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Loader Configuration Constants
// ============================================================================

/// Attribute that holds each record's primary key
pub const DEFAULT_KEY_ATTRIBUTE: &str = "fileId";

/// Lines between pauses and counter snapshots
pub const DEFAULT_BATCH_SIZE: u64 = 100;

/// Length of each pause, in seconds
pub const DEFAULT_PAUSE_SECS: u64 = 3;

/// Records with store calls outstanding at once
pub const DEFAULT_MAX_IN_FLIGHT: usize = 1;

/// Token-bucket rate; roughly the fixed policy's average throughput
pub const DEFAULT_RATE_PER_SEC: u32 = 33;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub key_attribute: String,

    /// Lines between counter snapshots; also the fixed-pause interval and
    /// the token-bucket burst
    pub batch_size: u64,

    pub pause_secs: u64,

    pub max_in_flight: usize,

    pub normalization: NormalizationMode,

    pub throttle: ThrottleKind,

    pub rate_per_sec: u32,

    /// Directory receiving the error-data file
    pub error_dir: PathBuf,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            key_attribute: DEFAULT_KEY_ATTRIBUTE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            pause_secs: DEFAULT_PAUSE_SECS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            normalization: NormalizationMode::Literal,
            throttle: ThrottleKind::Fixed,
            rate_per_sec: DEFAULT_RATE_PER_SEC,
            error_dir: PathBuf::from("."),
        }
    }
}

impl LoaderConfig {
    /// Defaults with environment overrides applied
    ///
    /// Environment variables:
    /// - `KVLOAD_KEY_ATTRIBUTE`
    /// - `KVLOAD_BATCH_SIZE`
    /// - `KVLOAD_PAUSE_SECS`
    /// - `KVLOAD_MAX_IN_FLIGHT`
    /// - `KVLOAD_NORMALIZATION`: literal or structural
    /// - `KVLOAD_THROTTLE`: fixed, token-bucket or none
    /// - `KVLOAD_RATE_PER_SEC`
    /// - `KVLOAD_ERROR_DIR`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("KVLOAD_KEY_ATTRIBUTE") {
            config.key_attribute = key;
        }
        if let Some(batch_size) = env_parse("KVLOAD_BATCH_SIZE")? {
            config.batch_size = batch_size;
        }
        if let Some(pause) = env_parse("KVLOAD_PAUSE_SECS")? {
            config.pause_secs = pause;
        }
        if let Some(max) = env_parse("KVLOAD_MAX_IN_FLIGHT")? {
            config.max_in_flight = max;
        }
        if let Some(mode) = env_parse("KVLOAD_NORMALIZATION")? {
            config.normalization = mode;
        }
        if let Some(kind) = env_parse("KVLOAD_THROTTLE")? {
            config.throttle = kind;
        }
        if let Some(rate) = env_parse("KVLOAD_RATE_PER_SEC")? {
            config.rate_per_sec = rate;
        }
        if let Ok(dir) = std::env::var("KVLOAD_ERROR_DIR") {
            config.error_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn builder() -> LoaderConfigBuilder {
        LoaderConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_attribute.trim().is_empty() {
            return Err(KvloadError::config("key attribute must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(KvloadError::config("batch size must be at least 1"));
        }
        if self.max_in_flight == 0 {
            return Err(KvloadError::config("max in-flight must be at least 1"));
        }
        if self.throttle == ThrottleKind::TokenBucket && self.rate_per_sec == 0 {
            return Err(KvloadError::config("token-bucket rate must be at least 1 per second"));
        }
        Ok(())
    }

    pub fn pause(&self) -> Duration {
        Duration::from_secs(self.pause_secs)
    }

    /// Build the configured throttle policy
    pub fn build_throttle(&self) -> Box<dyn Throttle> {
        match self.throttle {
            ThrottleKind::Fixed => Box::new(FixedIntervalPause::new(self.batch_size, self.pause())),
            ThrottleKind::TokenBucket => {
                let burst = u32::try_from(self.batch_size).unwrap_or(u32::MAX);
                Box::new(TokenBucket::new(self.rate_per_sec, burst))
            },
            ThrottleKind::None => Box::new(Unthrottled),
        }
    }
}

#[derive(Default)]
pub struct LoaderConfigBuilder {
    config: LoaderConfig,
}

impl LoaderConfigBuilder {
    pub fn key_attribute(mut self, key: impl Into<String>) -> Self {
        self.config.key_attribute = key.into();
        self
    }

    pub fn batch_size(mut self, batch_size: u64) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn pause_secs(mut self, secs: u64) -> Self {
        self.config.pause_secs = secs;
        self
    }

    pub fn max_in_flight(mut self, max: usize) -> Self {
        self.config.max_in_flight = max;
        self
    }

    pub fn normalization(mut self, mode: NormalizationMode) -> Self {
        self.config.normalization = mode;
        self
    }

    pub fn throttle(mut self, kind: ThrottleKind) -> Self {
        self.config.throttle = kind;
        self
    }

    pub fn rate_per_sec(mut self, rate: u32) -> Self {
        self.config.rate_per_sec = rate;
        self
    }

    pub fn error_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.error_dir = dir.into();
        self
    }

    pub fn build(self) -> LoaderConfig {
        self.config
    }
}
