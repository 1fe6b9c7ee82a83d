use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Boxed error from an underlying implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors shared by all bootable services.
#[derive(Debug, Error)]
pub enum BootableError {
    /// Already started.
    #[error("{0} already started")]
    AlreadyStarted(&'static str),

    /// The service exited before it answered a readiness check.
    #[error("{name} exited before becoming ready: {status}")]
    ExitedBeforeReady {
        /// Name of the service.
        name: &'static str,

        /// Exit status reported by the process.
        status: ExitStatus,
    },

    /// An operation required a running service.
    #[error("{0} not started")]
    NotStarted(&'static str),

    /// Any other failure from the implementation.
    #[error("{name}: {source}")]
    Other {
        /// Name of the service.
        name: &'static str,

        /// Underlying error.
        #[source]
        source: BoxError,
    },

    /// The service did not become ready in time.
    #[error("timed out after {timeout:?} waiting for {name} to become ready")]
    ReadyTimeout {
        /// Name of the service.
        name: &'static str,

        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// The service process could not be launched.
    #[error("failed to spawn {name}: {source}")]
    Spawn {
        /// Name of the service.
        name: &'static str,

        /// Underlying error.
        #[source]
        source: BoxError,
    },
}

impl BootableError {
    /// Wraps an implementation error.
    pub fn other<E>(name: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other {
            name,
            source: Box::new(source),
        }
    }

    /// Wraps a launch failure.
    pub fn spawn<E>(name: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Spawn {
            name,
            source: Box::new(source),
        }
    }
}
