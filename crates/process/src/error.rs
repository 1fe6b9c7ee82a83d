//! Error types for process supervision.

use std::io;

use thiserror::Error;

/// Result type for process operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while supervising a child process.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error.
    #[error("io error: {0} - {1}")]
    Io(&'static str, #[source] io::Error),

    /// Failed to spawn a process
    #[error("Failed to spawn process: {0}")]
    SpawnProcess(String),
}
