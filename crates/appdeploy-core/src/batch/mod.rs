//! Batch descriptor ingestion.
//!
//! A batch file is produced by the packaging pipeline and lists the
//! applications that were created or superseded since the last run.

pub mod backup;
pub mod parser;

use std::path::PathBuf;

use thiserror::Error;

pub use backup::backup_batch_file;
pub use parser::{parse_batch_file, parse_batch_str, parse_superseded_by};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to read batch file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid batch JSON: {0}")]
    Parse(String),

    #[error("invalid batch record #{index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
}
