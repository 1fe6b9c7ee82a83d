//! Bootstrap Step 4b: Initialize as Primary
//!
//! With no primary in sight, the local engine either already runs a config
//! listing this member, or has none and gets a new single-member set. Any other
//! status is fatal and no command is issued.

use super::Bootstrap;
use crate::context::{BootstrapState, Role};
use crate::error::{Error, Result};

use mongo_init_admin::{
    AdminClient, AdminCommand, Endpoint, ReplicaSetState, StatusQuery, classify,
};
use mongo_init_bootable::Bootable;
use mongo_init_discovery::{PeerDiscovery, SelfIdentity};
use tracing::info;

pub async fn execute<B, A, D>(
    bootstrap: &mut Bootstrap<B, A, D>,
    identity: &SelfIdentity,
) -> Result<Role>
where
    B: Bootable,
    A: AdminClient,
    D: PeerDiscovery,
{
    bootstrap.transition(BootstrapState::InitializingPrimary);

    info!("initializing myself as primary...");

    let status = bootstrap
        .admin
        .query_status(&Endpoint::Local, StatusQuery::ReplicaSetStatus)
        .await?;

    let member_host = bootstrap.config.member_host(identity);

    match classify::classify_replica_set_status(&status, &member_host) {
        ReplicaSetState::NotInitialized => {
            let seed = bootstrap
                .config
                .seed_policy
                .seed(identity.address(), &bootstrap.context.peers);

            if seed != identity.address() {
                return Err(Error::NotSeedMember {
                    identity: identity.address().clone(),
                    seed: seed.clone(),
                });
            }

            info!(
                "initiating new replica set {}",
                bootstrap.config.replica_set_id
            );

            bootstrap
                .admin
                .run_command(
                    &Endpoint::Local,
                    &AdminCommand::InitiateReplicaSet {
                        replica_set_id: bootstrap.config.replica_set_id.clone(),
                        members: vec![member_host],
                    },
                )
                .await?;

            info!("replica set initialized");

            Ok(Role::Primary { initiated: true })
        }
        ReplicaSetState::Configured => {
            info!("replica set already initialized");

            Ok(Role::Primary { initiated: false })
        }
        ReplicaSetState::Unrecognized => Err(Error::UnrecognizedState {
            endpoint: Endpoint::Local.to_string(),
            status,
        }),
    }
}
