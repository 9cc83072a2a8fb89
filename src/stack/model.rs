//! The aggregate root returned for every logical stack.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::aggregate::AggregatedConfigBlock;
use crate::compose::{ServiceDefinition, StackDefinition};
use crate::container::ContainerID;
use crate::discovery::Provenance;
use crate::docker::{ContainerFact, HealthState, MountFact, PortBinding, ResourceUsage};

use super::rollup::{NetworkRollupEntry, VolumeRollupEntry};
use super::status::StackStatus;

/// Condensed per-container view carried by stacks and services.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ContainerSummary {
    pub id: ContainerID,
    pub short_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub image: String,
    pub state: String,
    pub running: bool,
    pub health: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ResourceUsage>,
    /// Error marker inherited from a stub fact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContainerSummary {
    pub fn from_fact(fact: &ContainerFact, usage: Option<ResourceUsage>) -> Self {
        Self {
            id: fact.id.clone(),
            short_id: fact.id.short().to_owned(),
            name: fact.name.clone(),
            service: fact.service_name().map(str::to_owned),
            image: fact.image.clone(),
            state: fact.state.clone(),
            running: fact.running,
            health: fact.health,
            created_at: fact.created_at.clone(),
            started_at: fact.started_at.clone(),
            usage,
            error: fact.error.clone(),
        }
    }
}

/// One service of a stack, enriched with everything observed on its
/// containers.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ServiceView {
    pub name: String,
    /// Declared entry from the definition; `None` for a service observed on
    /// containers only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<ServiceDefinition>,
    pub status: StackStatus,
    pub containers: Vec<ContainerSummary>,
    /// Realized port bindings flattened across the service's containers.
    pub ports: Vec<PortBinding>,
    /// Names of the networks the service's containers are attached to.
    pub networks: Vec<String>,
    /// Realized mounts flattened across the service's containers.
    pub volumes: Vec<MountFact>,
    /// Observed container environment, first container wins on duplicates.
    pub environment: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub health: HealthSummary,
}

/// Container health tally for one stack or service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct HealthSummary {
    pub healthy: usize,
    pub unhealthy: usize,
    pub unknown: usize,
    pub overall: HealthOverall,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthOverall {
    Healthy,
    Degraded,
    #[default]
    Unknown,
}

impl HealthSummary {
    /// Tallies probe states. Containers without a probe (or still starting)
    /// count as unknown; overall is healthy only when at least one probe
    /// reports healthy and none report unhealthy.
    pub fn tally<'a>(states: impl IntoIterator<Item = &'a HealthState>) -> Self {
        let mut summary = Self::default();
        for state in states {
            match state {
                HealthState::Healthy => summary.healthy += 1,
                HealthState::Unhealthy => summary.unhealthy += 1,
                HealthState::Starting | HealthState::None => summary.unknown += 1,
            }
        }
        summary.overall = if summary.unhealthy > 0 {
            HealthOverall::Degraded
        } else if summary.healthy > 0 {
            HealthOverall::Healthy
        } else {
            HealthOverall::Unknown
        };
        summary
    }
}

/// Container counts plus summed live usage for one stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct StackStats {
    pub total_containers: usize,
    pub running_containers: usize,
    pub stopped_containers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_usage_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_bytes: Option<u64>,
}

/// Declared secrets/configs and the env files found next to a directory
/// definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct EnvironmentMeta {
    pub declared_secrets: Vec<String>,
    pub declared_configs: Vec<String>,
    /// Well-known env-file names present in the stack directory; always
    /// empty for external and orphan stacks.
    pub env_files: Vec<String>,
}

/// The unified, queryable view of one logical stack.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct UnifiedStack {
    pub name: String,
    pub provenance: Provenance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub status: StackStatus,
    pub definition: StackDefinition,
    pub services: BTreeMap<String, ServiceView>,
    pub networks: Vec<NetworkRollupEntry>,
    pub volumes: Vec<VolumeRollupEntry>,
    pub containers: Vec<ContainerSummary>,
    pub stats: StackStats,
    pub environment: EnvironmentMeta,
    pub health: HealthSummary,
    pub aggregated_configs: AggregatedConfigBlock,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_tally() {
        let states = [
            HealthState::Healthy,
            HealthState::Healthy,
            HealthState::None,
        ];
        let summary = HealthSummary::tally(&states);
        assert_eq!(summary.healthy, 2);
        assert_eq!(summary.unknown, 1);
        assert_eq!(summary.overall, HealthOverall::Healthy);
    }

    #[test]
    fn test_health_degraded_wins() {
        let states = [HealthState::Healthy, HealthState::Unhealthy];
        let summary = HealthSummary::tally(&states);
        assert_eq!(summary.overall, HealthOverall::Degraded);
    }

    #[test]
    fn test_health_unknown_without_probes() {
        let states = [HealthState::None, HealthState::Starting];
        let summary = HealthSummary::tally(&states);
        assert_eq!(summary.overall, HealthOverall::Unknown);
    }
}
