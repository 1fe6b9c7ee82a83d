//! Replica-set bootstrap for stateful-set members.
//!
//! On start a member launches its engine, waits for it to become ready, finds
//! its peers and then either joins the replica set run by an existing primary
//! or initializes a new one. The engine is then shut down, or supervised when
//! the member became primary and [`PrimaryExit::Supervise`] is configured.
//!
//! Every external effect goes through three seams, so the whole state machine
//! runs against any engine, admin client and discovery implementation:
//! - [`Bootable`](mongo_init_bootable::Bootable) for the engine lifecycle
//! - [`AdminClient`](mongo_init_admin::AdminClient) for queries and commands
//! - [`PeerDiscovery`](mongo_init_discovery::PeerDiscovery) for identity and peers
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod context;
mod coordinator;
mod error;
mod seed;

pub use context::{BootstrapContext, BootstrapState, Outcome, Role};
pub use coordinator::{
    Bootstrap, BootstrapConfig, BootstrapOptions, DEFAULT_READY_TIMEOUT, DEFAULT_SECONDARY_GRACE,
    PrimaryExit,
};
pub use error::{Error, Result};
pub use seed::SeedPolicy;
