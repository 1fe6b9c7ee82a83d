use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Result type for admin operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur talking to a database endpoint.
#[derive(Debug, Error)]
pub enum Error {
    /// A mutating command did not return the expected acknowledgement.
    #[error("{command} on {endpoint} was not acknowledged:\n{output}")]
    NotAcknowledged {
        /// Command name.
        command: &'static str,

        /// Target endpoint.
        endpoint: String,

        /// Raw output of the command.
        output: String,
    },

    /// The admin shell exited with a failure the client cannot interpret.
    #[error("{operation} on {endpoint} failed ({status}):\n{output}")]
    ShellFailed {
        /// Operation name.
        operation: &'static str,

        /// Target endpoint.
        endpoint: String,

        /// Shell exit status.
        status: ExitStatus,

        /// Combined stdout and stderr.
        output: String,
    },

    /// The admin shell could not be launched.
    #[error("failed to spawn admin shell: {0}")]
    Spawn(#[source] io::Error),

    /// The call did not complete within its bound.
    #[error("{operation} on {endpoint} timed out after {after:?}")]
    Timeout {
        /// Operation name.
        operation: &'static str,

        /// Target endpoint.
        endpoint: String,

        /// The bound that was exceeded.
        after: Duration,
    },
}
