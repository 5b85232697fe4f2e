//! kvload Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared logging, error handling and file naming for the kvload workspace.
//!
//! # Overview
//!
//! - **Logging**: console/file tracing setup with timestamped log files
//! - **Error Handling**: the common error type and result alias
//! - **Stamps**: run timestamps used to name log and error-data files
//!
//! # Example
//!
//! ```no_run
//! use kvload_common::logging::{init_logging, LogConfig};
//! use kvload_common::stamp::RunStamp;
//!
//! fn main() -> anyhow::Result<()> {
//!     let stamp = RunStamp::now();
//!     let config = LogConfig::builder()
//!         .log_file_name(stamp.file_name("kvload", "log"))
//!         .build();
//!     let _guard = init_logging(&config)?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod stamp;

// Re-export commonly used types
pub use error::{KvloadError, Result};
