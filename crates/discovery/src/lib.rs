//! Peer discovery for stateful-set members.
//!
//! Each member has a stable fully-qualified name of the form
//! `<hostname>.<service domain>`. Enumerating the service domain yields every
//! member that is currently published, this one included.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod dns;
mod error;
mod identity;

pub use dns::{DnsPeerDiscovery, DnsPeerDiscoveryOptions};
pub use error::{Error, Result};
pub use identity::{PeerAddress, SelfIdentity};

use async_trait::async_trait;
use indexmap::IndexSet;

/// Resolves this member's identity and enumerates its peers.
#[async_trait]
pub trait PeerDiscovery
where
    Self: Send + Sync + 'static,
{
    /// Error type for lookups.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Determines the fully-qualified name of this member.
    async fn resolve_self(&self) -> std::result::Result<SelfIdentity, Self::Error>;

    /// Enumerates member addresses in answer order.
    ///
    /// The set may include `identity` itself. An empty set means no member is
    /// published yet and is not an error.
    async fn discover_peers(
        &self,
        identity: &SelfIdentity,
    ) -> std::result::Result<IndexSet<PeerAddress>, Self::Error>;
}
