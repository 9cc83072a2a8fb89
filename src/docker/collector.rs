//! The per-pass fact collector.

use std::sync::Arc;

use crate::error::ResultOkLogExt;

use super::client::DockerClient;
use super::error::Result;
use super::facts::{ContainerFact, NetworkFact, VolumeFact};

/// All raw facts gathered from the engine for one discovery pass.
///
/// The batch is fetched once per pass and treated as read-only input by every
/// subsequent per-stack build.
#[derive(Debug, Clone, Default)]
pub struct FactBatch {
    pub containers: Vec<ContainerFact>,
    pub networks: Vec<NetworkFact>,
    pub volumes: Vec<VolumeFact>,
}

/// Fetches raw per-object facts from the engine.
pub struct FactCollector<C> {
    client: Arc<C>,
}

impl<C: DockerClient> FactCollector<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Collects container, network and volume facts for one pass.
    ///
    /// Containers are enumerated in every state. A per-container inspect
    /// failure is replaced by a stub fact carrying the error marker so one
    /// malformed object never aborts the batch. Network/volume listing
    /// failures degrade to empty lists, as they only feed the "actual"
    /// rollup source.
    ///
    /// # Errors
    ///
    /// Returns an error only if the container listing itself fails, i.e. the
    /// engine is unreachable. Callers must treat such a pass as unavailable.
    pub async fn collect(&self) -> Result<FactBatch> {
        let refs = self.client.list_containers().await?;
        log::debug!("Listed {} containers", refs.len());

        let mut containers = Vec::with_capacity(refs.len());
        for container_ref in refs {
            match self.client.inspect_container(&container_ref.id).await {
                Ok(fact) => containers.push(fact),
                Err(err) => {
                    log::warn!(
                        "failed to inspect container `{}`: {err}",
                        container_ref.name
                    );
                    containers.push(ContainerFact::stub(
                        container_ref.id,
                        container_ref.name,
                        err.to_string(),
                    ));
                }
            }
        }

        let networks = self
            .client
            .list_networks()
            .await
            .ok_log_ctx("failed to list networks")
            .unwrap_or_default();
        let volumes = self
            .client
            .list_volumes()
            .await
            .ok_log_ctx("failed to list volumes")
            .unwrap_or_default();

        Ok(FactBatch {
            containers,
            networks,
            volumes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::mock::MockDockerClient;

    #[tokio::test]
    async fn test_collect_returns_all_states() {
        let client = MockDockerClient::new()
            .with_container(MockDockerClient::running_container("aaa111", "web-app"))
            .with_container(MockDockerClient::exited_container("bbb222", "web-db"));
        let collector = FactCollector::new(Arc::new(client));

        let batch = collector.collect().await.unwrap();
        assert_eq!(batch.containers.len(), 2);
        assert!(batch.containers.iter().any(|c| c.running));
        assert!(batch.containers.iter().any(|c| !c.running));
    }

    #[tokio::test]
    async fn test_inspect_failure_yields_stub() {
        let client = MockDockerClient::new()
            .with_container(MockDockerClient::running_container("aaa111", "ok"))
            .with_container(MockDockerClient::running_container("bbb222", "broken"))
            .with_failing_inspect("bbb222");
        let collector = FactCollector::new(Arc::new(client));

        let batch = collector.collect().await.unwrap();
        assert_eq!(batch.containers.len(), 2);
        let stub = batch
            .containers
            .iter()
            .find(|c| c.name == "broken")
            .unwrap();
        assert!(stub.is_stub());
        let ok = batch.containers.iter().find(|c| c.name == "ok").unwrap();
        assert!(!ok.is_stub());
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_fatal() {
        let client = MockDockerClient::new().with_failing_list();
        let collector = FactCollector::new(Arc::new(client));
        assert!(collector.collect().await.is_err());
    }

    #[tokio::test]
    async fn test_network_listing_failure_degrades() {
        let client = MockDockerClient::new()
            .with_container(MockDockerClient::running_container("aaa111", "web-app"))
            .with_failing_object_lists();
        let collector = FactCollector::new(Arc::new(client));

        let batch = collector.collect().await.unwrap();
        assert_eq!(batch.containers.len(), 1);
        assert!(batch.networks.is_empty());
        assert!(batch.volumes.is_empty());
    }
}
