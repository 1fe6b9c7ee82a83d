//! In-memory cluster for exercising the bootstrap coordinator.
//!
//! A [`MockCluster`] holds one simulated engine per member. Each engine keeps
//! its own replica-set config, so two members initiating independently end up
//! with two sets, as they would for real. Every call made through the mock
//! clients is recorded as a [`Call`].
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod admin;
mod discovery;
mod engine;
mod error;

pub use admin::MockAdminClient;
pub use discovery::MockDiscovery;
pub use engine::MockEngine;
pub use error::Error;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indexmap::IndexMap;
use mongo_init_admin::{AdminCommand, StatusQuery};
use tokio::sync::Notify;

/// A replica-set configuration as held by one engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaSetConfig {
    /// Replica-set identifier.
    pub id: String,

    /// Member hosts, in `_id` order.
    pub members: Vec<String>,

    /// Incremented on every membership change.
    pub version: u32,
}

/// A recorded interaction with the cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    /// A mutating admin command.
    Command {
        /// Member whose agent issued the command.
        from: String,

        /// Member the command was sent to.
        target: String,

        /// The command.
        command: AdminCommand,

        /// Whether the reply carried `ok: 1`.
        acknowledged: bool,
    },

    /// Peer enumeration.
    DiscoverPeers {
        /// Member that asked.
        host: String,
    },

    /// Liveness probe.
    Ping {
        /// Member whose agent probed.
        from: String,

        /// Member that was probed.
        target: String,
    },

    /// Read-only admin query.
    Query {
        /// Member whose agent queried.
        from: String,

        /// Member that was queried.
        target: String,

        /// The query.
        query: StatusQuery,
    },

    /// Self identity lookup.
    ResolveSelf {
        /// Member that asked.
        host: String,
    },

    /// Engine shutdown through the lifecycle interface.
    Shutdown {
        /// Member whose engine was shut down.
        host: String,

        /// Grace period, `None` when forced.
        grace: Option<Duration>,
    },

    /// Engine start through the lifecycle interface.
    Start {
        /// Member whose engine was started.
        host: String,
    },
}

#[derive(Debug)]
struct Member {
    config: Option<ReplicaSetConfig>,
    never_ready: bool,
    overrides: HashMap<StatusQuery, String>,
    pings_until_ready: usize,
    primary: bool,
    published: bool,
    running: bool,
}

impl Member {
    fn new() -> Self {
        Self {
            config: None,
            never_ready: false,
            overrides: HashMap::new(),
            pings_until_ready: 0,
            primary: false,
            published: true,
            running: true,
        }
    }
}

#[derive(Debug, Default)]
struct ClusterState {
    calls: Vec<Call>,
    discovery_failure: bool,
    members: IndexMap<String, Member>,
}

impl ClusterState {
    fn record(&mut self, call: Call) {
        self.calls.push(call);
    }

    /// Installs `config` on every engine it lists.
    fn distribute(&mut self, config: &ReplicaSetConfig) {
        for host in &config.members {
            if let Some(member) = self.members.get_mut(engine_host(host)) {
                member.config = Some(config.clone());
            }
        }
    }
}

/// Name of the engine behind a member host, without the port.
pub(crate) fn engine_host(member: &str) -> &str {
    member.split_once(':').map_or(member, |(host, _)| host)
}

/// Shared state of a simulated cluster.
///
/// Cloning is cheap and every clone sees the same cluster.
#[derive(Clone, Debug, Default)]
pub struct MockCluster {
    exited: Arc<Notify>,
    state: Arc<Mutex<ClusterState>>,
}

impl MockCluster {
    /// Creates an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ClusterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a running, published member with no replica-set config.
    pub fn add_member(&self, host: &str) -> &Self {
        self.state()
            .members
            .insert(host.to_string(), Member::new());
        self
    }

    /// Makes `host` the primary of a new replica set containing `members`.
    ///
    /// The set is installed on every listed engine.
    pub fn seed_primary(&self, host: &str, replica_set_id: &str, members: &[&str]) -> &Self {
        let config = ReplicaSetConfig {
            id: replica_set_id.to_string(),
            members: members.iter().map(ToString::to_string).collect(),
            version: 1,
        };

        let mut state = self.state();
        state.distribute(&config);
        if let Some(member) = state.members.get_mut(host) {
            member.primary = true;
        }
        drop(state);

        self
    }

    /// The local engine of `host` answers `NotReady` to the first `pings` probes.
    pub fn set_ready_after(&self, host: &str, pings: usize) -> &Self {
        self.with_member(host, |member| member.pings_until_ready = pings);
        self
    }

    /// The local engine of `host` never becomes ready.
    pub fn set_never_ready(&self, host: &str) -> &Self {
        self.with_member(host, |member| member.never_ready = true);
        self
    }

    /// Replaces the payload `host` returns for `query`.
    pub fn set_status_override(&self, host: &str, query: StatusQuery, payload: &str) -> &Self {
        self.with_member(host, |member| {
            member.overrides.insert(query, payload.to_string());
        });
        self
    }

    /// Removes `host` from DNS answers while keeping its engine.
    pub fn unpublish(&self, host: &str) -> &Self {
        self.with_member(host, |member| member.published = false);
        self
    }

    /// Makes every peer enumeration fail.
    pub fn set_discovery_failure(&self, fail: bool) -> &Self {
        self.state().discovery_failure = fail;
        self
    }

    /// Brings the engine of `host` back up, as the orchestrator would.
    pub fn restart(&self, host: &str) -> &Self {
        self.with_member(host, |member| member.running = true);
        self
    }

    /// Stops the engine of `host` without going through its agent.
    pub fn crash(&self, host: &str) -> &Self {
        self.with_member(host, |member| member.running = false);
        self.exited.notify_waiters();
        self
    }

    /// All recorded calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Recorded admin commands whose reply was acknowledged.
    #[must_use]
    pub fn acknowledged_commands(&self) -> Vec<(String, AdminCommand)> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Command {
                    target,
                    command,
                    acknowledged: true,
                    ..
                } => Some((target.clone(), command.clone())),
                _ => None,
            })
            .collect()
    }

    /// Replica-set config held by the engine of `host`.
    #[must_use]
    pub fn replica_set(&self, host: &str) -> Option<ReplicaSetConfig> {
        self.state()
            .members
            .get(host)
            .and_then(|member| member.config.clone())
    }

    /// Whether the engine of `host` considers itself primary.
    #[must_use]
    pub fn is_primary(&self, host: &str) -> bool {
        self.state()
            .members
            .get(host)
            .is_some_and(|member| member.primary)
    }

    /// Whether the engine of `host` is running.
    #[must_use]
    pub fn is_running(&self, host: &str) -> bool {
        self.state()
            .members
            .get(host)
            .is_some_and(|member| member.running)
    }

    /// Admin client for the agent of `host`.
    #[must_use]
    pub fn admin(&self, host: &str) -> MockAdminClient {
        MockAdminClient::new(self.clone(), host)
    }

    /// Peer discovery for the agent of `host`.
    #[must_use]
    pub fn discovery(&self, host: &str) -> MockDiscovery {
        MockDiscovery::new(self.clone(), host)
    }

    /// Engine lifecycle for `host`.
    #[must_use]
    pub fn engine(&self, host: &str) -> MockEngine {
        MockEngine::new(self.clone(), host)
    }

    fn with_member<T>(&self, host: &str, f: impl FnOnce(&mut Member) -> T) -> Option<T> {
        self.state().members.get_mut(host).map(f)
    }
}
