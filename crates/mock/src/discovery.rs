use crate::{Call, Error, MockCluster};

use async_trait::async_trait;
use indexmap::IndexSet;
use mongo_init_discovery::{PeerAddress, PeerDiscovery, SelfIdentity};

/// Peer discovery over the published members of a [`MockCluster`].
///
/// Peers are returned in the order members were added.
#[derive(Clone, Debug)]
pub struct MockDiscovery {
    cluster: MockCluster,
    host: String,
}

impl MockDiscovery {
    pub(crate) fn new(cluster: MockCluster, host: &str) -> Self {
        Self {
            cluster,
            host: host.to_string(),
        }
    }
}

#[async_trait]
impl PeerDiscovery for MockDiscovery {
    type Error = Error;

    async fn resolve_self(&self) -> Result<SelfIdentity, Error> {
        tokio::task::yield_now().await;

        self.cluster.state().record(Call::ResolveSelf {
            host: self.host.clone(),
        });

        let hostname = self
            .host
            .split_once('.')
            .map_or(self.host.as_str(), |(label, _)| label);

        Ok(SelfIdentity::new(hostname, &self.host))
    }

    async fn discover_peers(&self, identity: &SelfIdentity) -> Result<IndexSet<PeerAddress>, Error> {
        tokio::task::yield_now().await;

        let domain = identity.service_domain()?;
        let mut state = self.cluster.state();

        state.record(Call::DiscoverPeers {
            host: self.host.clone(),
        });

        if state.discovery_failure {
            return Err(Error::Resolve(domain.to_string()));
        }

        let peers = state
            .members
            .iter()
            .filter(|(_, member)| member.published)
            .map(|(host, _)| PeerAddress::new(host))
            .collect();
        drop(state);

        Ok(peers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_published_members_in_order() {
        let cluster = MockCluster::new();
        cluster
            .add_member("mongo-2.mongo.db")
            .add_member("mongo-0.mongo.db")
            .add_member("mongo-1.mongo.db")
            .unpublish("mongo-1.mongo.db");

        let discovery = cluster.discovery("mongo-0.mongo.db");
        let identity = discovery.resolve_self().await.unwrap();

        assert_eq!(identity.hostname(), "mongo-0");
        assert_eq!(identity.service_domain().unwrap(), "mongo.db");

        let peers = discovery.discover_peers(&identity).await.unwrap();
        let peers: Vec<&str> = peers.iter().map(PeerAddress::as_str).collect();

        assert_eq!(peers, vec!["mongo-2.mongo.db", "mongo-0.mongo.db"]);
    }
}
