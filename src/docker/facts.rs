//! Typed records for everything the engine reports about one object.
//!
//! Facts are immutable once fetched and live for exactly one discovery pass.
//! Maps use `BTreeMap` so two passes over unchanged engine state serialize
//! identically.

use std::collections::BTreeMap;

use bollard::models::{
    ContainerInspectResponse, ContainerStateStatusEnum, HealthStatusEnum, MountPointTypeEnum,
    Network, Volume,
};

use crate::container::ContainerID;

use super::error::Error;

/// Compose project label set by the engine on every compose-managed container.
pub const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";
pub const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";
pub const COMPOSE_CONTAINER_NUMBER_LABEL: &str = "com.docker.compose.container-number";
pub const COMPOSE_CONFIG_FILES_LABEL: &str = "com.docker.compose.project.config_files";
pub const COMPOSE_WORKING_DIR_LABEL: &str = "com.docker.compose.project.working_dir";

/// The compose identity of a container, extracted from its engine labels.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ComposeIdentity {
    pub project: String,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_files: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

impl ComposeIdentity {
    /// Extracts the compose identity from a label map.
    ///
    /// Returns `None` if the project label is absent; a missing service label
    /// falls back to an empty string so the classifier can still bucket the
    /// container by project.
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Option<Self> {
        let project = labels.get(COMPOSE_PROJECT_LABEL)?.clone();
        let service = labels.get(COMPOSE_SERVICE_LABEL).cloned().unwrap_or_default();
        let container_number = labels
            .get(COMPOSE_CONTAINER_NUMBER_LABEL)
            .and_then(|n| n.parse().ok());
        let config_files = labels.get(COMPOSE_CONFIG_FILES_LABEL).cloned();
        let working_dir = labels.get(COMPOSE_WORKING_DIR_LABEL).cloned();

        Some(Self {
            project,
            service,
            container_number,
            config_files,
            working_dir,
        })
    }
}

/// A container's attachment to one engine network.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct NetworkAttachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

/// The kind of a container mount as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    Bind,
    Volume,
    Tmpfs,
    Other,
}

impl MountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MountKind::Bind => "bind",
            MountKind::Volume => "volume",
            MountKind::Tmpfs => "tmpfs",
            MountKind::Other => "other",
        }
    }
}

impl From<MountPointTypeEnum> for MountKind {
    fn from(value: MountPointTypeEnum) -> Self {
        match value {
            MountPointTypeEnum::BIND => MountKind::Bind,
            MountPointTypeEnum::VOLUME => MountKind::Volume,
            MountPointTypeEnum::TMPFS => MountKind::Tmpfs,
            _ => MountKind::Other,
        }
    }
}

/// One realized mount of a container.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MountFact {
    pub kind: MountKind,
    /// Volume name for `volume` mounts; `None` for bind/tmpfs mounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Host path for bind mounts, storage path for volume mounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub read_write: bool,
}

/// One realized host-port binding of a container port.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PortBinding {
    pub container_port: u16,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
}

/// Resource limits configured on the container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ResourceLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nano_cpus: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<i64>,
}

/// Health probe state as reported by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// The container has no health probe configured.
    #[default]
    None,
    Starting,
    Healthy,
    Unhealthy,
}

impl From<HealthStatusEnum> for HealthState {
    fn from(value: HealthStatusEnum) -> Self {
        match value {
            HealthStatusEnum::STARTING => HealthState::Starting,
            HealthStatusEnum::HEALTHY => HealthState::Healthy,
            HealthStatusEnum::UNHEALTHY => HealthState::Unhealthy,
            _ => HealthState::None,
        }
    }
}

/// One-shot resource usage snapshot for a running container.
///
/// Used only to enrich running containers; any collection failure is mapped
/// to `None` upstream, never to an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct ResourceUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_usage_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_bytes: Option<u64>,
}

impl ResourceUsage {
    /// Derives a usage snapshot from a one-shot engine stats sample.
    pub fn from_stats(stats: &bollard::container::Stats) -> Self {
        let cpu_delta = stats
            .cpu_stats
            .cpu_usage
            .total_usage
            .checked_sub(stats.precpu_stats.cpu_usage.total_usage);
        let system_delta = stats
            .cpu_stats
            .system_cpu_usage
            .zip(stats.precpu_stats.system_cpu_usage)
            .and_then(|(now, before)| now.checked_sub(before));
        let cpu_percent = cpu_delta.zip(system_delta).and_then(|(cpu, system)| {
            if system == 0 {
                return None;
            }
            let online = stats.cpu_stats.online_cpus.unwrap_or(1).max(1) as f64;
            Some(cpu as f64 / system as f64 * online * 100.0)
        });

        Self {
            cpu_percent,
            memory_usage_bytes: stats.memory_stats.usage,
            memory_limit_bytes: stats.memory_stats.limit,
        }
    }
}

/// Everything the engine reports about one container, flattened into a
/// typed, immutable record.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ContainerFact {
    pub id: ContainerID,
    pub name: String,
    pub image: String,
    /// Raw engine state string, e.g. `running` or `exited`.
    pub state: String,
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compose: Option<ComposeIdentity>,
    pub networks: BTreeMap<String, NetworkAttachment>,
    pub mounts: Vec<MountFact>,
    pub ports: Vec<PortBinding>,
    pub environment: BTreeMap<String, String>,
    pub limits: ResourceLimits,
    pub health: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<String>,
    /// Error marker carried by stub facts when per-object extraction failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContainerFact {
    /// Builds a fact from an engine inspect response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`] if the response is missing the
    /// container id; every other missing field degrades to a default.
    pub fn from_inspect(response: ContainerInspectResponse) -> super::Result<Self> {
        let id = response
            .id
            .as_deref()
            .and_then(|id| ContainerID::new(id).ok())
            .ok_or_else(|| Error::MalformedResponse("inspect response without id".to_owned()))?;
        let name = response
            .name
            .as_deref()
            .map(|name| name.trim_start_matches('/').to_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| id.short().to_owned());

        let state = response.state.as_ref();
        let running = state.and_then(|s| s.running).unwrap_or(false);
        let status = state
            .and_then(|s| s.status)
            .filter(|status| *status != ContainerStateStatusEnum::EMPTY)
            .map(|status| status.to_string())
            .unwrap_or_else(|| "unknown".to_owned());
        let health = state
            .and_then(|s| s.health.as_ref())
            .and_then(|h| h.status)
            .map(HealthState::from)
            .unwrap_or_default();

        let config = response.config.as_ref();
        let labels: BTreeMap<String, String> = config
            .and_then(|c| c.labels.clone())
            .unwrap_or_default()
            .into_iter()
            .collect();
        let environment = config
            .and_then(|c| c.env.as_deref())
            .map(parse_environment)
            .unwrap_or_default();
        let image = config
            .and_then(|c| c.image.clone())
            .or(response.image)
            .unwrap_or_default();

        let network_settings = response.network_settings.as_ref();
        let networks = network_settings
            .and_then(|settings| settings.networks.as_ref())
            .map(|networks| {
                networks
                    .iter()
                    .map(|(name, endpoint)| {
                        (
                            name.clone(),
                            NetworkAttachment {
                                ip_address: endpoint.ip_address.clone().filter(|ip| !ip.is_empty()),
                                mac_address: endpoint
                                    .mac_address
                                    .clone()
                                    .filter(|mac| !mac.is_empty()),
                            },
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        let ports = network_settings
            .and_then(|settings| settings.ports.as_ref())
            .map(|ports| parse_port_map(ports))
            .unwrap_or_default();

        let mut mounts: Vec<MountFact> = response
            .mounts
            .unwrap_or_default()
            .into_iter()
            .map(|mount| MountFact {
                kind: mount.typ.map(MountKind::from).unwrap_or(MountKind::Other),
                name: mount.name,
                source: mount.source.filter(|source| !source.is_empty()),
                destination: mount.destination.unwrap_or_default(),
                mode: mount.mode.filter(|mode| !mode.is_empty()),
                read_write: mount.rw.unwrap_or(true),
            })
            .collect();
        mounts.sort_by(|a, b| a.destination.cmp(&b.destination));

        let host_config = response.host_config.as_ref();
        let limits = ResourceLimits {
            nano_cpus: host_config.and_then(|hc| hc.nano_cpus).filter(|n| *n > 0),
            memory_bytes: host_config.and_then(|hc| hc.memory).filter(|m| *m > 0),
        };
        let restart_policy = host_config
            .and_then(|hc| hc.restart_policy.as_ref())
            .and_then(|policy| policy.name)
            .map(|name| name.to_string())
            .filter(|name| !name.is_empty());

        let compose = ComposeIdentity::from_labels(&labels);

        Ok(Self {
            id,
            name,
            image,
            state: status,
            running,
            created_at: response.created,
            started_at: state.and_then(|s| s.started_at.clone()),
            finished_at: state.and_then(|s| s.finished_at.clone()),
            labels,
            compose,
            networks,
            mounts,
            ports,
            environment,
            limits,
            health,
            restart_policy,
            error: None,
        })
    }

    /// Builds a stub fact carrying an error marker.
    ///
    /// Used when per-object extraction fails so a single malformed container
    /// never aborts the batch.
    pub fn stub(id: ContainerID, name: String, error: String) -> Self {
        Self {
            id,
            name,
            image: String::new(),
            state: "unknown".to_owned(),
            running: false,
            created_at: None,
            started_at: None,
            finished_at: None,
            labels: BTreeMap::new(),
            compose: None,
            networks: BTreeMap::new(),
            mounts: Vec::new(),
            ports: Vec::new(),
            environment: BTreeMap::new(),
            limits: ResourceLimits::default(),
            health: HealthState::None,
            restart_policy: None,
            error: Some(error),
        }
    }

    /// Returns the compose service name, if any.
    pub fn service_name(&self) -> Option<&str> {
        self.compose
            .as_ref()
            .map(|compose| compose.service.as_str())
            .filter(|service| !service.is_empty())
    }

    /// Returns the compose project name, if any.
    pub fn project_name(&self) -> Option<&str> {
        self.compose.as_ref().map(|compose| compose.project.as_str())
    }

    pub fn is_stub(&self) -> bool {
        self.error.is_some()
    }
}

/// An engine network record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NetworkFact {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub attached_containers: usize,
}

impl From<Network> for NetworkFact {
    fn from(network: Network) -> Self {
        Self {
            id: network.id.unwrap_or_default(),
            name: network.name.unwrap_or_default(),
            driver: network.driver,
            scope: network.scope,
            created_at: network.created,
            labels: network.labels.unwrap_or_default().into_iter().collect(),
            attached_containers: network
                .containers
                .as_ref()
                .map(|containers| containers.len())
                .unwrap_or(0),
        }
    }
}

/// An engine volume record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VolumeFact {
    pub name: String,
    pub driver: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub mountpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_count: Option<i64>,
}

impl From<Volume> for VolumeFact {
    fn from(volume: Volume) -> Self {
        Self {
            name: volume.name,
            driver: volume.driver,
            scope: volume.scope.map(|scope| scope.to_string()),
            mountpoint: volume.mountpoint,
            created_at: volume.created_at,
            labels: volume.labels.into_iter().collect(),
            ref_count: volume.usage_data.map(|usage| usage.ref_count),
        }
    }
}

/// Parses engine `K=V` environment entries into a map.
///
/// Entries without `=` are skipped; a duplicate key keeps the last value, the
/// same resolution the engine applies.
fn parse_environment(env: &[String]) -> BTreeMap<String, String> {
    env.iter()
        .filter_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            if key.is_empty() {
                return None;
            }
            Some((key.to_owned(), value.to_owned()))
        })
        .collect()
}

/// Parses an engine port map (`"80/tcp" -> [{host_ip, host_port}]`) into
/// realized port bindings. Entries with no host binding are unpublished and
/// skipped.
fn parse_port_map(
    ports: &std::collections::HashMap<String, Option<Vec<bollard::models::PortBinding>>>,
) -> Vec<PortBinding> {
    let mut out: Vec<PortBinding> = ports
        .iter()
        .filter_map(|(key, bindings)| {
            let (container_port, protocol) = parse_port_key(key)?;
            let bindings = bindings.as_ref()?;
            Some(bindings.iter().map(move |binding| PortBinding {
                container_port,
                protocol: protocol.to_owned(),
                host_ip: binding.host_ip.clone().filter(|ip| !ip.is_empty()),
                host_port: binding
                    .host_port
                    .as_deref()
                    .and_then(|port| port.parse().ok()),
            }))
        })
        .flatten()
        .collect();
    out.sort_by(|a, b| {
        (a.container_port, &a.protocol, a.host_port).cmp(&(b.container_port, &b.protocol, b.host_port))
    });
    out
}

/// Splits an engine port key like `80/tcp` into port and protocol.
///
/// A missing protocol defaults to `tcp`; an unparseable port yields `None`.
fn parse_port_key(key: &str) -> Option<(u16, &str)> {
    let (port, protocol) = match key.split_once('/') {
        Some((port, protocol)) => (port, protocol),
        None => (key, "tcp"),
    };
    Some((port.parse().ok()?, protocol))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_compose_identity_from_labels() {
        let labels = labels(&[
            (COMPOSE_PROJECT_LABEL, "web"),
            (COMPOSE_SERVICE_LABEL, "app"),
            (COMPOSE_CONTAINER_NUMBER_LABEL, "2"),
        ]);
        let identity = ComposeIdentity::from_labels(&labels).unwrap();
        assert_eq!(identity.project, "web");
        assert_eq!(identity.service, "app");
        assert_eq!(identity.container_number, Some(2));
        assert!(identity.config_files.is_none());
    }

    #[test]
    fn test_compose_identity_requires_project_label() {
        let labels = labels(&[(COMPOSE_SERVICE_LABEL, "app")]);
        assert!(ComposeIdentity::from_labels(&labels).is_none());
    }

    #[test]
    fn test_parse_environment_skips_invalid_entries() {
        let env = vec![
            "PATH=/usr/bin".to_owned(),
            "EMPTY=".to_owned(),
            "novalue".to_owned(),
            "=orphaned".to_owned(),
        ];
        let parsed = parse_environment(&env);
        assert_eq!(parsed.get("PATH").map(String::as_str), Some("/usr/bin"));
        assert_eq!(parsed.get("EMPTY").map(String::as_str), Some(""));
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_parse_port_key() {
        assert_eq!(parse_port_key("80/tcp"), Some((80, "tcp")));
        assert_eq!(parse_port_key("53/udp"), Some((53, "udp")));
        assert_eq!(parse_port_key("8080"), Some((8080, "tcp")));
        assert_eq!(parse_port_key("http/tcp"), None);
    }

    #[test]
    fn test_parse_port_map_skips_unpublished() {
        let mut ports = std::collections::HashMap::new();
        ports.insert(
            "80/tcp".to_owned(),
            Some(vec![bollard::models::PortBinding {
                host_ip: Some("0.0.0.0".to_owned()),
                host_port: Some("8080".to_owned()),
            }]),
        );
        ports.insert("9000/tcp".to_owned(), None);

        let parsed = parse_port_map(&ports);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].container_port, 80);
        assert_eq!(parsed[0].host_port, Some(8080));
    }

    #[test]
    fn test_stub_fact_carries_error_marker() {
        let id = ContainerID::new("abc123").unwrap();
        let stub = ContainerFact::stub(id, "broken".to_owned(), "inspect failed".to_owned());
        assert!(stub.is_stub());
        assert!(!stub.running);
        assert_eq!(stub.state, "unknown");
    }

    #[test]
    fn test_from_inspect_requires_id() {
        let response = ContainerInspectResponse::default();
        assert!(ContainerFact::from_inspect(response).is_err());
    }
}
