//! Bootstrap Step 1: Engine Start
//!
//! Launches the engine and blocks until it answers a ping. Peer discovery is
//! never attempted for an engine that did not become ready.

use super::Bootstrap;
use crate::context::BootstrapState;
use crate::error::Result;

use mongo_init_admin::AdminClient;
use mongo_init_bootable::Bootable;
use mongo_init_discovery::PeerDiscovery;
use tracing::info;

pub async fn execute<B, A, D>(bootstrap: &mut Bootstrap<B, A, D>) -> Result<()>
where
    B: Bootable,
    A: AdminClient,
    D: PeerDiscovery,
{
    bootstrap.transition(BootstrapState::Starting);

    bootstrap.engine.start().await?;
    bootstrap.context.engine_started = true;

    info!("{} started", bootstrap.engine.bootable_name());

    bootstrap.transition(BootstrapState::WaitingReady);

    bootstrap
        .engine
        .wait_ready(bootstrap.config.ready_timeout)
        .await?;

    info!("{} is ready", bootstrap.engine.bootable_name());

    Ok(())
}
