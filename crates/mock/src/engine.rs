use crate::{Call, MockAdminClient, MockCluster};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mongo_init_admin::{AdminClient, Endpoint, Readiness};
use mongo_init_bootable::{Bootable, BootableError};
use tracing::debug;

const NAME: &str = "mock-mongod";

/// Engine lifecycle for one member of a [`MockCluster`].
///
/// Readiness is probed through the member's own [`MockAdminClient`], so the
/// countdown set with [`MockCluster::set_ready_after`] applies.
#[derive(Clone, Debug)]
pub struct MockEngine {
    admin: MockAdminClient,
    cluster: MockCluster,
    host: String,
    started: Arc<AtomicBool>,
}

impl MockEngine {
    pub(crate) fn new(cluster: MockCluster, host: &str) -> Self {
        Self {
            admin: MockAdminClient::new(cluster.clone(), host),
            cluster,
            host: host.to_string(),
            started: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl Bootable for MockEngine {
    fn bootable_name(&self) -> &'static str {
        NAME
    }

    async fn start(&self) -> Result<(), BootableError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(BootableError::AlreadyStarted(NAME));
        }

        self.cluster.state().record(Call::Start {
            host: self.host.clone(),
        });
        self.cluster.restart(&self.host);

        Ok(())
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<(), BootableError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(BootableError::NotStarted(NAME));
        }

        let probe = async {
            loop {
                match self.admin.ping(&Endpoint::Local).await {
                    Ok(Readiness::Ready) => return Ok(()),
                    Ok(Readiness::NotReady) => tokio::time::sleep(Duration::from_millis(1)).await,
                    Err(e) => return Err(BootableError::other(NAME, e)),
                }
            }
        };

        tokio::time::timeout(timeout, probe)
            .await
            .map_err(|_| BootableError::ReadyTimeout {
                name: NAME,
                timeout,
            })?
    }

    async fn shutdown(&self, grace: Option<Duration>) -> Result<(), BootableError> {
        if !self.started.swap(false, Ordering::SeqCst) {
            debug!("{} not started, nothing to shut down", self.host);
            return Ok(());
        }

        self.cluster.state().record(Call::Shutdown {
            host: self.host.clone(),
            grace,
        });
        self.cluster.crash(&self.host);

        Ok(())
    }

    async fn wait(&self) {
        loop {
            let exited = self.cluster.exited.notified();

            if !self.cluster.is_running(&self.host) {
                return;
            }

            exited.await;
        }
    }
}
