use crate::error::{Error, Result};
use crate::{PeerAddress, PeerDiscovery, SelfIdentity};

use std::net::IpAddr;

use async_trait::async_trait;
use hickory_resolver::Resolver;
use indexmap::IndexSet;
use tracing::{debug, info};

/// Options for configuring `DnsPeerDiscovery`.
#[derive(Clone, Debug, Default)]
pub struct DnsPeerDiscoveryOptions {
    /// Use this fully-qualified name instead of resolving it.
    pub fqdn: Option<String>,

    /// Use this host name instead of the one reported by the OS.
    pub hostname: Option<String>,
}

/// Discovers peers through the system DNS resolver.
///
/// Self identity comes from a forward lookup of the host name followed by a
/// reverse lookup of its address. Peers are the targets of the SRV records
/// published for the service domain.
#[derive(Clone, Debug, Default)]
pub struct DnsPeerDiscovery {
    options: DnsPeerDiscoveryOptions,
}

impl DnsPeerDiscovery {
    /// Creates a new `DnsPeerDiscovery`.
    #[must_use]
    pub const fn new(options: DnsPeerDiscoveryOptions) -> Self {
        Self { options }
    }

    fn local_hostname(&self) -> Result<String> {
        if let Some(hostname) = &self.options.hostname {
            return Ok(hostname.clone());
        }

        let hostname = nix::unistd::gethostname().map_err(Error::Hostname)?;

        Ok(hostname.to_string_lossy().into_owned())
    }
}

#[async_trait]
impl PeerDiscovery for DnsPeerDiscovery {
    type Error = Error;

    async fn resolve_self(&self) -> Result<SelfIdentity> {
        let hostname = self.local_hostname()?;

        if let Some(fqdn) = &self.options.fqdn {
            info!("using configured FQDN: {}", fqdn);
            return Ok(SelfIdentity::new(hostname, fqdn));
        }

        let resolver = Resolver::tokio_from_system_conf()
            .map_err(|e| Error::ResolverConfig(Box::new(e)))?;

        let addresses = resolver
            .lookup_ip(hostname.as_str())
            .await
            .map_err(|e| Error::Resolve {
                name: hostname.clone(),
                source: Box::new(e),
            })?;

        let address = addresses
            .iter()
            .find(IpAddr::is_ipv4)
            .or_else(|| addresses.iter().next())
            .ok_or_else(|| Error::NoAddress(hostname.clone()))?;

        debug!("{} resolves to {}", hostname, address);

        let names = resolver
            .reverse_lookup(address)
            .await
            .map_err(|e| Error::Resolve {
                name: address.to_string(),
                source: Box::new(e),
            })?;

        let names: Vec<String> = names.iter().map(ToString::to_string).collect();
        let host_prefix = format!("{}.", hostname.to_ascii_lowercase());

        let fqdn = names
            .iter()
            .find(|name| name.to_ascii_lowercase().starts_with(&host_prefix))
            .or_else(|| names.first())
            .ok_or(Error::NoReverseName(address))?;

        let identity = SelfIdentity::new(hostname, fqdn);

        info!("FQDN: {}", identity);

        Ok(identity)
    }

    async fn discover_peers(&self, identity: &SelfIdentity) -> Result<IndexSet<PeerAddress>> {
        let domain = identity.service_domain()?;

        let resolver = Resolver::tokio_from_system_conf()
            .map_err(|e| Error::ResolverConfig(Box::new(e)))?;

        match resolver.srv_lookup(domain).await {
            Ok(records) => {
                let peers = collect_peers(records.iter().map(|srv| srv.target().to_string()));

                info!("found peers: {:?}", peers);

                Ok(peers)
            }
            Err(e) if e.is_no_records_found() => {
                info!(
                    "seems like there are no other members alive ({}): {}",
                    domain, e
                );

                Ok(IndexSet::new())
            }
            Err(e) => Err(Error::Resolve {
                name: domain.to_string(),
                source: Box::new(e),
            }),
        }
    }
}

/// Normalizes record targets into a deduplicated set, keeping answer order.
fn collect_peers<I, S>(targets: I) -> IndexSet<PeerAddress>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    targets
        .into_iter()
        .map(PeerAddress::new)
        .filter(|peer| !peer.as_str().is_empty())
        .collect()
}
