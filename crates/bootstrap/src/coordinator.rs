mod step_01_start_engine;
mod step_02_discover_peers;
mod step_03_search_primary;
mod step_04_initialize_primary;
mod step_04_join_secondary;
mod step_05_hand_over;

use crate::context::{BootstrapContext, BootstrapState, Outcome, Role};
use crate::error::{Error, Result};
use crate::seed::SeedPolicy;

use std::time::Duration;

use mongo_init_admin::AdminClient;
use mongo_init_bootable::Bootable;
use mongo_init_discovery::{PeerDiscovery, SelfIdentity};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Default bound for the engine to become ready.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(60);

/// Default grace period for a secondary to hand over when shutting down.
pub const DEFAULT_SECONDARY_GRACE: Duration = Duration::from_secs(20);

/// What happens to the engine after this member became primary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PrimaryExit {
    /// Force the engine down so the orchestrator restarts it configured.
    #[default]
    Shutdown,

    /// Keep the engine running until it exits or shutdown is requested.
    Supervise,
}

/// Tunables for a bootstrap run.
#[derive(Clone, Debug)]
pub struct BootstrapConfig {
    /// Port the engines listen on, registered with every member host.
    /// `None` leaves the engine default (27017) implied.
    pub member_port: Option<u16>,

    /// Engine exit policy for a primary.
    pub primary_exit: PrimaryExit,

    /// Bound for the engine to become ready.
    pub ready_timeout: Duration,

    /// Identifier of the replica set to create or join.
    pub replica_set_id: String,

    /// Grace period passed to the engine when a secondary shuts down.
    pub secondary_grace: Duration,

    /// Which member may initiate a new replica set.
    pub seed_policy: SeedPolicy,
}

impl BootstrapConfig {
    /// Default tunables for `replica_set_id`.
    pub fn new(replica_set_id: impl Into<String>) -> Self {
        Self {
            member_port: None,
            primary_exit: PrimaryExit::default(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            replica_set_id: replica_set_id.into(),
            secondary_grace: DEFAULT_SECONDARY_GRACE,
            seed_policy: SeedPolicy::default(),
        }
    }

    /// Host string under which `identity` is registered in the replica set.
    #[must_use]
    pub fn member_host(&self, identity: &SelfIdentity) -> String {
        match self.member_port {
            Some(port) => format!("{}:{}", identity.fqdn(), port),
            None => identity.fqdn().to_string(),
        }
    }
}

/// Options for configuring a `Bootstrap`.
pub struct BootstrapOptions<B, A, D>
where
    B: Bootable,
    A: AdminClient,
    D: PeerDiscovery,
{
    /// Admin client for the local engine and peers.
    pub admin: A,

    /// Tunables.
    pub config: BootstrapConfig,

    /// Peer discovery.
    pub discovery: D,

    /// The co-located engine.
    pub engine: B,
}

/// Drives one member from a bare engine to a replica-set member.
pub struct Bootstrap<B, A, D>
where
    B: Bootable,
    A: AdminClient,
    D: PeerDiscovery,
{
    admin: A,
    config: BootstrapConfig,
    context: BootstrapContext,
    discovery: D,
    engine: B,
    started: bool,
}

impl<B, A, D> Bootstrap<B, A, D>
where
    B: Bootable,
    A: AdminClient,
    D: PeerDiscovery,
{
    /// Creates a new `Bootstrap`.
    pub fn new(
        BootstrapOptions {
            admin,
            config,
            discovery,
            engine,
        }: BootstrapOptions<B, A, D>,
    ) -> Self {
        Self {
            admin,
            config,
            context: BootstrapContext::default(),
            discovery,
            engine,
            started: false,
        }
    }

    /// Values gathered so far.
    #[must_use]
    pub const fn context(&self) -> &BootstrapContext {
        &self.context
    }

    /// Runs the bootstrap to completion.
    ///
    /// Cancelling `shutdown_token` before the member has joined aborts the run.
    /// Afterwards it ends supervision of a primary.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. The engine is shut down before
    /// returning if it was started.
    pub async fn run(&mut self, shutdown_token: &CancellationToken) -> Result<Outcome> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }

        self.started = true;

        let joined = tokio::select! {
            result = self.join() => result,
            () = shutdown_token.cancelled() => Err(Error::Cancelled),
        };

        let (identity, role) = match joined {
            Ok(joined) => joined,
            Err(e) => return Err(self.fail(e).await),
        };

        if let Err(e) = step_05_hand_over::execute(self, &role, shutdown_token).await {
            error!("failed to hand over the engine: {}", e);
            return Err(self.fail(e).await);
        }

        self.transition(BootstrapState::Done);

        info!("bye");

        Ok(Outcome {
            identity,
            role,
            state: BootstrapState::Done,
        })
    }

    async fn join(&mut self) -> Result<(SelfIdentity, Role)> {
        if let Err(e) = step_01_start_engine::execute(self).await {
            error!("failed to start the engine: {}", e);
            return Err(e);
        }

        let identity = match step_02_discover_peers::execute(self).await {
            Ok(identity) => identity,
            Err(e) => {
                error!("failed to discover peers: {}", e);
                return Err(e);
            }
        };

        let primary = match step_03_search_primary::execute(self, &identity).await {
            Ok(primary) => primary,
            Err(e) => {
                error!("failed to search for a primary: {}", e);
                return Err(e);
            }
        };

        let role = if let Some(primary) = primary {
            step_04_join_secondary::execute(self, &identity, primary).await
        } else {
            step_04_initialize_primary::execute(self, &identity).await
        };

        match role {
            Ok(role) => Ok((identity, role)),
            Err(e) => {
                error!("failed to configure the replica set: {}", e);
                Err(e)
            }
        }
    }

    async fn fail(&mut self, e: Error) -> Error {
        self.transition(BootstrapState::Fatal);
        self.unwind().await;
        e
    }

    /// Forces the engine down if this run started it.
    async fn unwind(&mut self) {
        if !self.context.engine_started {
            return;
        }

        if let Err(e) = self.engine.shutdown(None).await {
            warn!("failed to shut down {}: {}", self.engine.bootable_name(), e);
        }

        self.context.engine_started = false;
    }

    fn transition(&mut self, state: BootstrapState) {
        match self.context.state() {
            Some(previous) => info!("{} -> {}", previous, state),
            None => info!("-> {}", state),
        }

        self.context.history.push(state);
    }
}
