//! Docker engine access: the client abstraction and the per-pass fact collector.
//!
//! All engine traffic goes through the [`DockerClient`] trait so the rest of
//! the crate (and the test suite) never touches bollard types directly.

mod client;
mod collector;
mod error;
mod facts;
#[cfg(test)]
pub mod mock;

pub use client::{BollardClient, ContainerRef, DockerClient};
pub use collector::{FactBatch, FactCollector};
pub use error::{Error, Result};
pub use facts::{
    COMPOSE_CONFIG_FILES_LABEL, COMPOSE_CONTAINER_NUMBER_LABEL, COMPOSE_PROJECT_LABEL,
    COMPOSE_SERVICE_LABEL, COMPOSE_WORKING_DIR_LABEL, ComposeIdentity, ContainerFact, HealthState,
    MountFact, MountKind, NetworkAttachment, NetworkFact, PortBinding, ResourceLimits,
    ResourceUsage, VolumeFact,
};
