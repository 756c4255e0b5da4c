//! Failures that abort an extraction pass

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// The root is missing, unreadable, or not a directory.
    #[error("cannot scan {}: {reason}", path.display())]
    Input { path: PathBuf, reason: String },

    /// More files than the configured maximum. No partial graph is returned.
    #[error("too many files: the scan exceeded the limit of {limit} files")]
    Capacity { limit: usize },
}
