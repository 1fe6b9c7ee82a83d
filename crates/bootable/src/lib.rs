//! Abstract lifecycle interface for services the bootstrap agent drives.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::{BootableError, BoxError};

use std::time::Duration;

use async_trait::async_trait;

/// Trait for bootable services.
///
/// Starting is split from readiness: `start` only launches the service, and
/// `wait_ready` blocks until it answers or the timeout elapses.
#[async_trait]
pub trait Bootable
where
    Self: Send + Sync + 'static,
{
    /// Get the name of the bootable service.
    fn bootable_name(&self) -> &'static str;

    /// Launch the bootable service without waiting for it to be ready.
    async fn start(&self) -> Result<(), BootableError>;

    /// Wait until the service is ready, failing once `timeout` has elapsed.
    async fn wait_ready(&self, timeout: Duration) -> Result<(), BootableError>;

    /// Shutdown the bootable service.
    ///
    /// With a `grace` period the service is asked to hand over for up to that
    /// long. Without one the shutdown is forced.
    async fn shutdown(&self, grace: Option<Duration>) -> Result<(), BootableError>;

    /// Wait for the bootable service to exit.
    async fn wait(&self);
}
