use std::time::Duration;

use nix::sys::signal::Signal;
use tracing::{info, warn};

/// Describes an external program supervised by this crate.
pub trait ProcessApplication: Send + Sync + 'static {
    /// Arguments passed to the executable.
    fn args(&self) -> Vec<String>;

    /// Path to the executable.
    fn executable(&self) -> &str;

    /// Handles a line the process wrote to stderr.
    fn handle_stderr(&self, line: &str) {
        warn!(target: "process", "{}: {}", self.name(), line);
    }

    /// Handles a line the process wrote to stdout.
    fn handle_stdout(&self, line: &str) {
        info!(target: "process", "{}: {}", self.name(), line);
    }

    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Signal sent when supervision is asked to stop the process.
    fn shutdown_signal(&self) -> Signal {
        Signal::SIGTERM
    }

    /// How long to wait after `shutdown_signal` before killing the process.
    fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }
}
