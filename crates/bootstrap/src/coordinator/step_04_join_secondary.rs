//! Bootstrap Step 4a: Join as Secondary
//!
//! Registers this member with the primary found in step 3 unless the primary's
//! config already lists it.

use super::Bootstrap;
use crate::context::{BootstrapState, Role};
use crate::error::Result;

use mongo_init_admin::{AdminClient, AdminCommand, Endpoint, StatusQuery, classify};
use mongo_init_bootable::Bootable;
use mongo_init_discovery::{PeerAddress, PeerDiscovery, SelfIdentity};
use tracing::info;

pub async fn execute<B, A, D>(
    bootstrap: &mut Bootstrap<B, A, D>,
    identity: &SelfIdentity,
    primary: PeerAddress,
) -> Result<Role>
where
    B: Bootable,
    A: AdminClient,
    D: PeerDiscovery,
{
    bootstrap.transition(BootstrapState::JoiningSecondary);

    let endpoint = Endpoint::remote(primary.as_str());

    info!("checking if the primary already knows about me...");

    let config = bootstrap
        .admin
        .query_status(&endpoint, StatusQuery::ReplicaSetConfig)
        .await?;

    let member_host = bootstrap.config.member_host(identity);

    if classify::lists_member(&config, &member_host) {
        info!("{} is already aware of me, no need to add myself", primary);

        return Ok(Role::Secondary {
            primary,
            added: false,
        });
    }

    info!("adding myself to the replica set of {}...", primary);

    bootstrap
        .admin
        .run_command(
            &endpoint,
            &AdminCommand::AddMember { host: member_host },
        )
        .await?;

    info!("successfully added myself to the replica set of {}", primary);

    Ok(Role::Secondary {
        primary,
        added: true,
    })
}
