//! Administrative access to database endpoints.
//!
//! Every call runs against an [`Endpoint`]: the co-located engine or a peer.
//! Queries return raw payloads which the [`classify`] functions interpret.
//! Commands mutate replica-set state and must be acknowledged.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

pub mod classify;
mod command;
mod endpoint;
mod error;
mod shell;

pub use classify::ReplicaSetState;
pub use command::{AdminCommand, CommandOutput, Readiness, ShutdownMode, StatusQuery};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use shell::{ShellAdminClient, ShellAdminClientOptions};

use async_trait::async_trait;

/// Executes administrative queries and commands against database endpoints.
#[async_trait]
pub trait AdminClient
where
    Self: Clone + Send + Sync + 'static,
{
    /// Liveness probe.
    ///
    /// A refused connection is `NotReady`, not an error.
    async fn ping(&self, endpoint: &Endpoint) -> Result<Readiness>;

    /// Runs a read-only query and returns its raw payload.
    async fn query_status(&self, endpoint: &Endpoint, query: StatusQuery) -> Result<String>;

    /// Runs a mutating command.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NotAcknowledged`] when a command that expects
    /// acknowledgement does not get it. Nothing is retried.
    async fn run_command(
        &self,
        endpoint: &Endpoint,
        command: &AdminCommand,
    ) -> Result<CommandOutput>;
}

/// Checks `payload` against what `command` expects.
///
/// # Errors
///
/// Returns [`Error::NotAcknowledged`] if the command expects `ok: 1` and the
/// payload does not carry it.
pub fn acknowledge(
    endpoint: &Endpoint,
    command: &AdminCommand,
    payload: String,
) -> Result<CommandOutput> {
    let acknowledged = classify::is_acknowledged(&payload);

    if command.expects_acknowledgement() && !acknowledged {
        return Err(Error::NotAcknowledged {
            command: command.name(),
            endpoint: endpoint.to_string(),
            output: payload,
        });
    }

    Ok(CommandOutput {
        acknowledged,
        payload,
    })
}
