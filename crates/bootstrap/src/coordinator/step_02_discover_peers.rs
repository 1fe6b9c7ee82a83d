//! Bootstrap Step 2: Peer Discovery
//!
//! Resolves this member's fully-qualified name and enumerates the members
//! published under its service domain. An empty answer is normal for the first
//! member.

use super::Bootstrap;
use crate::context::BootstrapState;
use crate::error::{Error, Result};

use mongo_init_admin::AdminClient;
use mongo_init_bootable::Bootable;
use mongo_init_discovery::{PeerDiscovery, SelfIdentity};
use tracing::info;

pub async fn execute<B, A, D>(bootstrap: &mut Bootstrap<B, A, D>) -> Result<SelfIdentity>
where
    B: Bootable,
    A: AdminClient,
    D: PeerDiscovery,
{
    bootstrap.transition(BootstrapState::DiscoveringPeers);

    let identity = bootstrap
        .discovery
        .resolve_self()
        .await
        .map_err(Error::discovery)?;

    info!("FQDN: {}", identity);

    let peers = bootstrap
        .discovery
        .discover_peers(&identity)
        .await
        .map_err(Error::discovery)?;

    if peers.is_empty() {
        info!("seems like there are no other members alive");
    } else {
        info!(
            "found peers: {}",
            peers
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    bootstrap.context.identity = Some(identity.clone());
    bootstrap.context.peers = peers;

    Ok(identity)
}
