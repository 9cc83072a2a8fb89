//! The engine client abstraction and its bollard-backed implementation.
//!
//! Production code talks to the daemon through [`BollardClient`]; tests use
//! the mock client so no engine is required to exercise the core.

use std::future::Future;
use std::path::Path;

use bollard::container::{InspectContainerOptions, ListContainersOptions, StatsOptions};
use bollard::network::ListNetworksOptions;
use bollard::volume::ListVolumesOptions;
use futures_util::StreamExt;

use crate::container::ContainerID;

use super::error::{Error, Result};
use super::facts::{ContainerFact, NetworkFact, ResourceUsage, VolumeFact};

/// A lightweight handle to one listed container, enough to drive a
/// follow-up inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    pub id: ContainerID,
    pub name: String,
}

/// Engine operations required by a discovery pass.
///
/// The trait is `Send + Sync + 'static` so a pass can share one client across
/// concurrently built stacks.
pub trait DockerClient: Send + Sync + 'static {
    /// Lists **all** containers regardless of state.
    ///
    /// # Errors
    ///
    /// An error here means the engine is unreachable; the whole pass is
    /// unavailable.
    fn list_containers(&self) -> impl Future<Output = Result<Vec<ContainerRef>>> + Send;

    /// Inspects one container and converts it into a [`ContainerFact`].
    fn inspect_container(&self, id: &ContainerID)
    -> impl Future<Output = Result<ContainerFact>> + Send;

    /// Lists engine networks.
    fn list_networks(&self) -> impl Future<Output = Result<Vec<NetworkFact>>> + Send;

    /// Lists engine volumes.
    fn list_volumes(&self) -> impl Future<Output = Result<Vec<VolumeFact>>> + Send;

    /// Takes a one-shot resource usage sample for a running container.
    ///
    /// Failures are mapped to `None`; live stats only ever enrich a result.
    fn live_stats(&self, id: &ContainerID) -> impl Future<Output = Option<ResourceUsage>> + Send;

    /// Checks engine connectivity.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Production client backed by the bollard library.
#[derive(Debug, Clone)]
pub struct BollardClient {
    docker: bollard::Docker,
}

impl BollardClient {
    /// Connects using the engine's platform defaults (usually
    /// `/var/run/docker.sock`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the socket cannot be reached.
    pub fn connect_local() -> Result<Self> {
        let docker = bollard::Docker::connect_with_local_defaults()
            .map_err(|err| Error::Connection(err.to_string()))?;
        Ok(Self { docker })
    }

    /// Connects to a specific unix socket path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the socket cannot be reached.
    pub fn connect_with_socket(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let docker = bollard::Docker::connect_with_socket(
            &path.to_string_lossy(),
            120,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|err| Error::Connection(format!("{}: {err}", path.display())))?;
        Ok(Self { docker })
    }
}

impl DockerClient for BollardClient {
    async fn list_containers(&self) -> Result<Vec<ContainerRef>> {
        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|err| Error::Api {
                operation: "list_containers",
                message: err.to_string(),
            })?;

        let mut out = Vec::with_capacity(containers.len());
        for container in containers {
            let Some(id) = container.id.as_deref().and_then(|id| ContainerID::new(id).ok())
            else {
                log::warn!("skipping listed container without id");
                continue;
            };
            let name = container
                .names
                .unwrap_or_default()
                .first()
                .map(|name| name.trim_start_matches('/').to_owned())
                .unwrap_or_else(|| id.short().to_owned());
            out.push(ContainerRef { id, name });
        }

        Ok(out)
    }

    async fn inspect_container(&self, id: &ContainerID) -> Result<ContainerFact> {
        let response = self
            .docker
            .inspect_container(id.as_ref(), None::<InspectContainerOptions>)
            .await
            .map_err(|err| match err {
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                } => Error::NotFound { id: id.to_string() },
                err => Error::Api {
                    operation: "inspect_container",
                    message: err.to_string(),
                },
            })?;

        ContainerFact::from_inspect(response)
    }

    async fn list_networks(&self) -> Result<Vec<NetworkFact>> {
        let networks = self
            .docker
            .list_networks(None::<ListNetworksOptions<String>>)
            .await
            .map_err(|err| Error::Api {
                operation: "list_networks",
                message: err.to_string(),
            })?;

        Ok(networks.into_iter().map(NetworkFact::from).collect())
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeFact>> {
        let response = self
            .docker
            .list_volumes(None::<ListVolumesOptions<String>>)
            .await
            .map_err(|err| Error::Api {
                operation: "list_volumes",
                message: err.to_string(),
            })?;

        Ok(response
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(VolumeFact::from)
            .collect())
    }

    async fn live_stats(&self, id: &ContainerID) -> Option<ResourceUsage> {
        let options = StatsOptions {
            stream: false,
            one_shot: true,
        };
        let mut stream = self.docker.stats(id.as_ref(), Some(options));
        match stream.next().await {
            Some(Ok(stats)) => Some(ResourceUsage::from_stats(&stats)),
            Some(Err(err)) => {
                log::debug!("failed to sample stats for container `{id}`: {err}");
                None
            }
            None => None,
        }
    }

    async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map_err(|err| Error::Connection(err.to_string()))?;
        Ok(())
    }
}
