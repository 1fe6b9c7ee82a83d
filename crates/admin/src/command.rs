use std::fmt;
use std::time::Duration;

use serde_json::{Value, json};

/// Whether an endpoint answered a liveness probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// The engine answered the ping.
    Ready,

    /// The engine is not accepting connections yet.
    NotReady,
}

/// Read-only queries whose raw payload is interpreted by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusQuery {
    /// Whether the endpoint is currently primary.
    IsMaster,

    /// The replica-set membership configuration.
    ReplicaSetConfig,

    /// The replica-set status as seen by the endpoint.
    ReplicaSetStatus,
}

impl StatusQuery {
    /// Short name used in logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IsMaster => "isMaster",
            Self::ReplicaSetConfig => "replSetGetConfig",
            Self::ReplicaSetStatus => "replSetGetStatus",
        }
    }

    /// Shell expression evaluated for this query.
    #[must_use]
    pub const fn script(self) -> &'static str {
        match self {
            Self::IsMaster => "db.isMaster()",
            Self::ReplicaSetConfig => "rs.config()",
            Self::ReplicaSetStatus => "rs.status()",
        }
    }
}

/// How the engine should stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Stop immediately, even as primary.
    Force,

    /// Wait up to `timeout` for a secondary to catch up before stepping down.
    Graceful {
        /// Handover bound.
        timeout: Duration,
    },
}

impl ShutdownMode {
    /// Graceful when a grace period is given, forced otherwise.
    #[must_use]
    pub const fn from_grace(grace: Option<Duration>) -> Self {
        match grace {
            Some(timeout) => Self::Graceful { timeout },
            None => Self::Force,
        }
    }
}

/// Mutating administrative commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdminCommand {
    /// Add a member to the replica set of the receiving primary.
    AddMember {
        /// Fully-qualified name of the new member.
        host: String,
    },

    /// Create a new replica set.
    InitiateReplicaSet {
        /// Replica-set identifier.
        replica_set_id: String,

        /// Initial members, numbered in order.
        members: Vec<String>,
    },

    /// Stop the engine.
    Shutdown(ShutdownMode),
}

impl AdminCommand {
    /// Command document sent to the engine.
    #[must_use]
    pub fn document(&self) -> Value {
        match self {
            Self::AddMember { host } => json!({ "host": host }),
            Self::InitiateReplicaSet {
                replica_set_id,
                members,
            } => {
                let members: Vec<Value> = members
                    .iter()
                    .enumerate()
                    .map(|(id, host)| json!({ "_id": id, "host": host }))
                    .collect();

                json!({ "_id": replica_set_id, "members": members })
            }
            Self::Shutdown(ShutdownMode::Force) => json!({ "force": true }),
            Self::Shutdown(ShutdownMode::Graceful { timeout }) => {
                json!({ "timeoutSecs": timeout.as_secs() })
            }
        }
    }

    /// Whether the command must answer with `ok: 1`.
    ///
    /// Shutdown drops the connection before it can reply.
    #[must_use]
    pub const fn expects_acknowledgement(&self) -> bool {
        !matches!(self, Self::Shutdown(_))
    }

    /// Short name used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddMember { .. } => "replSetAdd",
            Self::InitiateReplicaSet { .. } => "replSetInitiate",
            Self::Shutdown(_) => "shutdown",
        }
    }

    /// Shell expression evaluated for this command.
    #[must_use]
    pub fn script(&self) -> String {
        let document = self.document();

        match self {
            Self::AddMember { .. } => format!("rs.add({document})"),
            Self::InitiateReplicaSet { .. } => format!("rs.initiate({document})"),
            Self::Shutdown(_) => format!("db.shutdownServer({document})"),
        }
    }
}

impl fmt::Display for AdminCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.document())
    }
}

/// Result of a command the engine acknowledged (or was not required to).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the payload carried `ok: 1`.
    pub acknowledged: bool,

    /// Raw payload.
    pub payload: String,
}
