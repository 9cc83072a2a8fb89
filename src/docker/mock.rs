//! Configurable in-memory engine client for tests.
//!
//! The mock serves pre-built facts so the discovery pipeline can be exercised
//! without a running engine.

use std::collections::{HashMap, HashSet};

use crate::container::ContainerID;

use super::client::{ContainerRef, DockerClient};
use super::error::{Error, Result};
use super::facts::{ComposeIdentity, ContainerFact, NetworkFact, ResourceUsage, VolumeFact};

#[derive(Debug, Default)]
pub struct MockDockerClient {
    containers: Vec<ContainerFact>,
    networks: Vec<NetworkFact>,
    volumes: Vec<VolumeFact>,
    usage: HashMap<String, ResourceUsage>,
    failing_inspects: HashSet<String>,
    fail_list: bool,
    fail_object_lists: bool,
}

impl MockDockerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(mut self, container: ContainerFact) -> Self {
        self.containers.push(container);
        self
    }

    pub fn with_network(mut self, network: NetworkFact) -> Self {
        self.networks.push(network);
        self
    }

    pub fn with_volume(mut self, volume: VolumeFact) -> Self {
        self.volumes.push(volume);
        self
    }

    pub fn with_usage(mut self, id: &str, usage: ResourceUsage) -> Self {
        self.usage.insert(id.to_owned(), usage);
        self
    }

    /// Makes inspecting the given container id fail while it still shows up
    /// in the listing.
    pub fn with_failing_inspect(mut self, id: &str) -> Self {
        self.failing_inspects.insert(id.to_owned());
        self
    }

    /// Simulates an unreachable engine.
    pub fn with_failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// Makes the network/volume listings fail while containers still work.
    pub fn with_failing_object_lists(mut self) -> Self {
        self.fail_object_lists = true;
        self
    }

    /// A minimal running container without compose labels.
    pub fn running_container(id: &str, name: &str) -> ContainerFact {
        let mut fact = ContainerFact::stub(
            ContainerID::new(id).expect("valid test container id"),
            name.to_owned(),
            String::new(),
        );
        fact.error = None;
        fact.image = format!("{name}:latest");
        fact.state = "running".to_owned();
        fact.running = true;
        fact
    }

    /// A minimal exited container without compose labels.
    pub fn exited_container(id: &str, name: &str) -> ContainerFact {
        let mut fact = Self::running_container(id, name);
        fact.state = "exited".to_owned();
        fact.running = false;
        fact
    }

    /// A compose-managed container with project and service labels set.
    pub fn compose_container(
        id: &str,
        name: &str,
        project: &str,
        service: &str,
        running: bool,
    ) -> ContainerFact {
        let mut fact = if running {
            Self::running_container(id, name)
        } else {
            Self::exited_container(id, name)
        };
        fact.labels.insert(
            super::facts::COMPOSE_PROJECT_LABEL.to_owned(),
            project.to_owned(),
        );
        fact.labels.insert(
            super::facts::COMPOSE_SERVICE_LABEL.to_owned(),
            service.to_owned(),
        );
        fact.compose = ComposeIdentity::from_labels(&fact.labels);
        fact
    }
}

impl DockerClient for MockDockerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerRef>> {
        if self.fail_list {
            return Err(Error::Connection("mock engine unreachable".to_owned()));
        }
        Ok(self
            .containers
            .iter()
            .map(|fact| ContainerRef {
                id: fact.id.clone(),
                name: fact.name.clone(),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &ContainerID) -> Result<ContainerFact> {
        if self.failing_inspects.contains(id.as_ref()) {
            return Err(Error::Api {
                operation: "inspect_container",
                message: "mock inspect failure".to_owned(),
            });
        }
        self.containers
            .iter()
            .find(|fact| fact.id == *id)
            .cloned()
            .ok_or_else(|| Error::NotFound { id: id.to_string() })
    }

    async fn list_networks(&self) -> Result<Vec<NetworkFact>> {
        if self.fail_object_lists {
            return Err(Error::Api {
                operation: "list_networks",
                message: "mock list failure".to_owned(),
            });
        }
        Ok(self.networks.clone())
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeFact>> {
        if self.fail_object_lists {
            return Err(Error::Api {
                operation: "list_volumes",
                message: "mock list failure".to_owned(),
            });
        }
        Ok(self.volumes.clone())
    }

    async fn live_stats(&self, id: &ContainerID) -> Option<ResourceUsage> {
        self.usage.get(id.as_ref()).copied()
    }

    async fn ping(&self) -> Result<()> {
        if self.fail_list {
            return Err(Error::Connection("mock engine unreachable".to_owned()));
        }
        Ok(())
    }
}
