//! Bootstrap Step 3: Primary Search
//!
//! Probes peers in discovery order, skipping self, and stops at the first one
//! that reports itself primary.

use super::Bootstrap;
use crate::context::BootstrapState;
use crate::error::Result;

use mongo_init_admin::{AdminClient, Endpoint, StatusQuery, classify};
use mongo_init_bootable::Bootable;
use mongo_init_discovery::{PeerAddress, PeerDiscovery, SelfIdentity};
use tracing::{debug, info};

pub async fn execute<B, A, D>(
    bootstrap: &mut Bootstrap<B, A, D>,
    identity: &SelfIdentity,
) -> Result<Option<PeerAddress>>
where
    B: Bootable,
    A: AdminClient,
    D: PeerDiscovery,
{
    bootstrap.transition(BootstrapState::SearchingPrimary);

    info!("searching for an existing primary...");

    let mut primary = None;

    for peer in &bootstrap.context.peers {
        if peer == identity.address() {
            continue;
        }

        let payload = bootstrap
            .admin
            .query_status(&Endpoint::remote(peer.as_str()), StatusQuery::IsMaster)
            .await?;

        if classify::is_primary(&payload) {
            info!("primary found: {}", peer);
            primary = Some(peer.clone());
            break;
        }

        debug!("{} is not primary", peer);
    }

    if primary.is_none() {
        info!("there is no active primary");
    }

    bootstrap.context.primary.clone_from(&primary);

    Ok(primary)
}
