//! kvload Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Idempotent loader for newline-delimited JSON files of typed-wrapper
//! items. Each line is normalized, parsed, checked against the target table
//! by primary key, and inserted only when absent. Per-line failures are
//! counted and the raw line is appended to an error-data file for replay;
//! the run carries on.
//!
//! # Example
//!
//! ```no_run
//! use kvload::config::LoaderConfig;
//! use kvload::failure_sink::FailureSink;
//! use kvload::loader::Loader;
//! use kvload::store::InMemoryStore;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LoaderConfig::default();
//!     let sink = FailureSink::open("errorData.txt")?;
//!     let store = InMemoryStore::new(&config.key_attribute);
//!
//!     let stats = Loader::new(store, "files", &config, sink)
//!         .run(Path::new("files.jsonl"))
//!         .await?;
//!     println!("{}", stats.completion_message());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod failure_sink;
pub mod inserter;
pub mod loader;
pub mod normalize;
pub mod progress;
pub mod record;
pub mod shutdown;
pub mod stats;
pub mod store;
pub mod throttle;

// Re-export commonly used types
pub use config::LoaderConfig;
pub use error::{LoadError, RecordError, Result};
pub use loader::Loader;
pub use stats::LoadStats;

use clap::Parser;
use normalize::NormalizationMode;
use std::path::PathBuf;
use store::DynamoConfig;
use throttle::ThrottleKind;

/// kvload - load a newline-delimited JSON file into a key-value table,
/// skipping records whose primary key already exists
#[derive(Parser, Debug)]
#[command(name = "kvload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source file, one JSON item per line. Also names the target table
    /// unless --table is given.
    pub source: PathBuf,

    /// Target table (defaults to SOURCE as written)
    #[arg(long)]
    pub table: Option<String>,

    /// Primary key attribute
    #[arg(long)]
    pub key_attribute: Option<String>,

    /// Lines between pauses and counter snapshots
    #[arg(long)]
    pub batch_size: Option<u64>,

    /// Pause length in seconds for the fixed throttle
    #[arg(long)]
    pub pause_secs: Option<u64>,

    /// Records with store calls outstanding at once
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// How lowercase type tags are rewritten
    #[arg(long, value_enum)]
    pub normalization: Option<NormalizationMode>,

    /// Throttle policy
    #[arg(long, value_enum)]
    pub throttle: Option<ThrottleKind>,

    /// Lines per second for the token-bucket throttle
    #[arg(long)]
    pub rate_per_sec: Option<u32>,

    /// Directory for the error-data file
    #[arg(long)]
    pub error_dir: Option<PathBuf>,

    /// Directory for the log file
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// AWS region of the target table
    #[arg(long)]
    pub region: Option<String>,

    /// Custom store endpoint, e.g. a local emulator
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Validate and count against an empty in-memory table; nothing is written remotely
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Table name: `--table`, or the source argument verbatim
    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| self.source.to_string_lossy().into_owned())
    }

    /// Environment configuration with flag overrides applied, validated
    pub fn loader_config(&self) -> kvload_common::Result<LoaderConfig> {
        let mut config = LoaderConfig::from_env()?;

        if let Some(key) = &self.key_attribute {
            config.key_attribute = key.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(pause) = self.pause_secs {
            config.pause_secs = pause;
        }
        if let Some(max) = self.max_in_flight {
            config.max_in_flight = max;
        }
        if let Some(mode) = self.normalization {
            config.normalization = mode;
        }
        if let Some(kind) = self.throttle {
            config.throttle = kind;
        }
        if let Some(rate) = self.rate_per_sec {
            config.rate_per_sec = rate;
        }
        if let Some(dir) = &self.error_dir {
            config.error_dir = dir.clone();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn dynamo_config(&self) -> kvload_common::Result<DynamoConfig> {
        let mut config = DynamoConfig::from_env()?;

        if let Some(region) = &self.region {
            config.region = Some(region.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = Some(endpoint.clone());
        }

        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_table_defaults_to_source_argument() {
        let cli = Cli::try_parse_from(["kvload", "fileTable"]).unwrap();
        assert_eq!(cli.table_name(), "fileTable");

        let cli = Cli::try_parse_from(["kvload", "data/files.jsonl", "--table", "files"]).unwrap();
        assert_eq!(cli.table_name(), "files");
    }

    #[test]
    fn test_source_is_required() {
        let err = Cli::try_parse_from(["kvload"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    #[serial]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "kvload",
            "files",
            "--batch-size",
            "10",
            "--max-in-flight",
            "4",
            "--normalization",
            "structural",
            "--throttle",
            "token-bucket",
            "--rate-per-sec",
            "50",
        ])
        .unwrap();

        let config = cli.loader_config().unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_in_flight, 4);
        assert_eq!(config.normalization, NormalizationMode::Structural);
        assert_eq!(config.throttle, ThrottleKind::TokenBucket);
        assert_eq!(config.rate_per_sec, 50);
    }

    #[test]
    #[serial]
    fn test_invalid_flag_values_fail_validation() {
        let cli = Cli::try_parse_from(["kvload", "files", "--max-in-flight", "0"]).unwrap();
        assert!(cli.loader_config().is_err());
    }

    #[test]
    #[serial]
    fn test_region_flag() {
        let cli = Cli::try_parse_from(["kvload", "files", "--region", "eu-west-1"]).unwrap();
        assert_eq!(cli.dynamo_config().unwrap().region.as_deref(), Some("eu-west-1"));
    }
}
