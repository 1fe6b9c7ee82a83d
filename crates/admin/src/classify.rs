//! Interpreting raw shell payloads.
//!
//! Both the legacy `mongo` shell (`"ok" : 1`) and `mongosh` (`ok: 1`) output
//! formats are recognised.

use std::sync::LazyLock;

use regex::Regex;

static OK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""?\bok"?\s*:\s*1(?:\.0)?\b"#).expect("Invalid regex pattern")
});

static PRIMARY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"?\b(?:ismaster|isWritablePrimary)"?\s*:\s*true\b"#)
        .expect("Invalid regex pattern")
});

const NOT_INITIALIZED_MARKER: &str = "no replset config has been received";

const CONNECTION_REFUSED_MARKERS: &[&str] = &[
    "exception: connect failed",
    "ECONNREFUSED",
    "Connection refused",
    "connection refused",
];

const SERVER_ERROR_MARKERS: &[&str] = &["MongoServerError", "\"errmsg\"", "errmsg:"];

/// What a replica-set status payload says about this member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplicaSetState {
    /// The engine has never received a replica-set configuration.
    NotInitialized,

    /// The engine already runs a configuration that includes this member.
    Configured,

    /// Anything else.
    Unrecognized,
}

/// Whether a payload carries `ok: 1`.
#[must_use]
pub fn is_acknowledged(payload: &str) -> bool {
    OK_REGEX.is_match(payload)
}

/// Whether an `isMaster` payload reports a writable primary.
#[must_use]
pub fn is_primary(payload: &str) -> bool {
    PRIMARY_REGEX.is_match(payload)
}

/// Whether shell output shows the engine refused the connection.
#[must_use]
pub fn is_connection_refused(output: &str) -> bool {
    CONNECTION_REFUSED_MARKERS
        .iter()
        .any(|marker| output.contains(marker))
}

/// Whether shell output is an error reply from a reachable server.
#[must_use]
pub fn is_server_error(output: &str) -> bool {
    SERVER_ERROR_MARKERS
        .iter()
        .any(|marker| output.contains(marker))
}

/// Classifies a `rs.status()` payload from the point of view of `self_host`.
#[must_use]
pub fn classify_replica_set_status(payload: &str, self_host: &str) -> ReplicaSetState {
    if payload.contains(NOT_INITIALIZED_MARKER) {
        ReplicaSetState::NotInitialized
    } else if lists_member(payload, self_host) {
        ReplicaSetState::Configured
    } else {
        ReplicaSetState::Unrecognized
    }
}

/// Whether `payload` names `host` as a whole host name.
///
/// `mongo-1.db` is not found inside `mongo-10.db` or `mongo-1.db.example`.
#[must_use]
pub fn lists_member(payload: &str, host: &str) -> bool {
    if host.is_empty() {
        return false;
    }

    let is_name_char = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '.';

    payload.match_indices(host).any(|(start, _)| {
        let before = payload[..start].chars().next_back();
        let after = payload[start + host.len()..].chars().next();

        !before.is_some_and(is_name_char)
            && match after {
                // A trailing dot is only part of the name if a label follows.
                Some('.') => !payload[start + host.len() + 1..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphanumeric()),
                Some(c) => !is_name_char(c),
                None => true,
            }
    })
}
