use crate::error::{Error, Result};

use std::fmt;

/// Fully-qualified network name of a cluster member.
///
/// Stored without a trailing dot and in lower case, so names from different
/// lookups compare equal.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerAddress(String);

impl PeerAddress {
    /// Normalizes `name` into a peer address.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PeerAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerAddress {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Network identity of this member, fixed for the lifetime of the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelfIdentity {
    fqdn: PeerAddress,
    hostname: String,
}

impl SelfIdentity {
    /// Creates an identity from the local host name and its resolved fqdn.
    pub fn new(hostname: impl Into<String>, fqdn: impl AsRef<str>) -> Self {
        Self {
            fqdn: PeerAddress::new(fqdn),
            hostname: hostname.into(),
        }
    }

    /// Fully-qualified name, as registered in replica-set membership.
    #[must_use]
    pub const fn address(&self) -> &PeerAddress {
        &self.fqdn
    }

    /// Fully-qualified name as a string slice.
    #[must_use]
    pub fn fqdn(&self) -> &str {
        self.fqdn.as_str()
    }

    /// Local host name.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The domain that enumerates all members: the fqdn without its host label.
    ///
    /// # Errors
    ///
    /// Returns an error if the fqdn has no domain part.
    pub fn service_domain(&self) -> Result<&str> {
        let fqdn = self.fqdn.as_str();
        let hostname = self.hostname.to_ascii_lowercase();

        let domain = fqdn
            .strip_prefix(hostname.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .or_else(|| fqdn.split_once('.').map(|(_, rest)| rest))
            .filter(|domain| !domain.is_empty());

        domain.ok_or_else(|| Error::NoServiceDomain(fqdn.to_string()))
    }
}

impl fmt::Display for SelfIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqdn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    #[test]
    fn test_peer_address_normalization() {
        assert_eq!(
            PeerAddress::new("Mongo-0.Mongo.default.svc.cluster.local."),
            PeerAddress::new("mongo-0.mongo.default.svc.cluster.local")
        );
        assert_eq!(PeerAddress::new(" a.b ").as_str(), "a.b");
    }

    #[test]
    fn test_service_domain_strips_hostname() {
        let identity = SelfIdentity::new("mongo-2", "mongo-2.mongo.db.svc.cluster.local.");

        assert_eq!(identity.fqdn(), "mongo-2.mongo.db.svc.cluster.local");
        assert_eq!(
            identity.service_domain().unwrap(),
            "mongo.db.svc.cluster.local"
        );
    }

    #[test]
    fn test_service_domain_falls_back_to_first_label() {
        let identity = SelfIdentity::new("localhost", "10-0-0-7.mongo.db.svc.cluster.local");

        assert_eq!(
            identity.service_domain().unwrap(),
            "mongo.db.svc.cluster.local"
        );
    }

    #[test]
    fn test_service_domain_requires_a_domain() {
        let identity = SelfIdentity::new("mongo-0", "mongo-0");

        assert_matches!(identity.service_domain(), Err(Error::NoServiceDomain(_)));
    }
}
