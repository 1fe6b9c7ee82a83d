//! Bootstrap Step 5: Engine Hand-over
//!
//! A secondary shuts its engine down with a grace period. A primary either
//! forces it down or keeps supervising it, depending on `PrimaryExit`. A
//! supervised engine that exits by itself fails the run.

use super::{Bootstrap, PrimaryExit};
use crate::context::{BootstrapState, Role};
use crate::error::{Error, Result};

use mongo_init_admin::AdminClient;
use mongo_init_bootable::Bootable;
use mongo_init_discovery::PeerDiscovery;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn execute<B, A, D>(
    bootstrap: &mut Bootstrap<B, A, D>,
    role: &Role,
    shutdown_token: &CancellationToken,
) -> Result<()>
where
    B: Bootable,
    A: AdminClient,
    D: PeerDiscovery,
{
    let grace = match (role, bootstrap.config.primary_exit) {
        (Role::Secondary { .. }, _) => Some(bootstrap.config.secondary_grace),
        (Role::Primary { .. }, PrimaryExit::Shutdown) => None,
        (Role::Primary { .. }, PrimaryExit::Supervise) => {
            bootstrap.transition(BootstrapState::Supervising);

            info!("supervising {}", bootstrap.engine.bootable_name());

            tokio::select! {
                () = bootstrap.engine.wait() => {
                    return Err(Error::EngineExited(bootstrap.engine.bootable_name()));
                }
                () = shutdown_token.cancelled() => {
                    info!("shutdown requested");
                }
            }

            Some(bootstrap.config.secondary_grace)
        }
    };

    bootstrap.transition(BootstrapState::ShuttingDown);

    bootstrap.engine.shutdown(grace).await?;
    bootstrap.context.engine_started = false;

    Ok(())
}
