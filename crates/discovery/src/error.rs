use std::net::IpAddr;

use thiserror::Error;

/// Result type for discovery operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during name resolution.
///
/// "No records" answers are not errors: they produce an empty peer set.
#[derive(Debug, Error)]
pub enum Error {
    /// The local host name could not be read.
    #[error("failed to read local hostname: {0}")]
    Hostname(#[source] nix::Error),

    /// The host name resolved to no address.
    #[error("{0} resolved to no address")]
    NoAddress(String),

    /// The address has no reverse name.
    #[error("no reverse name for {0}")]
    NoReverseName(IpAddr),

    /// The fully-qualified name has no domain part to enumerate.
    #[error("{0} has no service domain")]
    NoServiceDomain(String),

    /// A lookup failed for a reason other than missing records.
    #[error("failed to resolve {name}: {source}")]
    Resolve {
        /// The name that was looked up.
        name: String,

        /// Resolver error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The system resolver configuration could not be loaded.
    #[error("failed to create DNS resolver: {0}")]
    ResolverConfig(#[source] Box<dyn std::error::Error + Send + Sync>),
}
