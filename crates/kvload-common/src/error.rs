//! Error types shared across kvload crates

use thiserror::Error;

/// Result type alias for shared helpers
pub type Result<T> = std::result::Result<T, KvloadError>;

/// Error type for configuration parsing and shared I/O
#[derive(Error, Debug)]
pub enum KvloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl KvloadError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an error for a value that could not be parsed
    pub fn parse(what: &str, value: impl std::fmt::Display) -> Self {
        Self::Parse(format!("invalid {}: {}", what, value))
    }
}

/// Read an environment variable and parse it, ignoring unset variables.
///
/// A set-but-unparseable value is an error rather than a silent default.
pub fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| KvloadError::Config(format!("{}={:?}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}
