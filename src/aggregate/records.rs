//! The aggregated record types.
//!
//! Records are built fresh each pass and never mutated after the detector
//! runs.

use crate::docker::MountKind;

/// Scope a record was flattened from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordLevel {
    Stack,
    Service,
    Container,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NetworkRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    pub external: bool,
    pub level: RecordLevel,
    /// Owning stack, service or container name.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PortRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
    pub container_port: u16,
    pub protocol: String,
    pub level: RecordLevel,
    pub source: String,
    /// Set by the detector when another record in the same scope binds the
    /// same (host port, protocol).
    pub conflicts: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VolumeRecord {
    pub kind: MountKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub read_write: bool,
    /// Declared as `external` in the definition; always false for observed
    /// mounts.
    pub external: bool,
    pub level: RecordLevel,
    pub source: String,
    /// All sources using the same (kind, name); the own source for an
    /// unshared record.
    pub shared_by: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvCategory {
    Database,
    Auth,
    Config,
    System,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EnvironmentRecord {
    pub key: String,
    /// Redacted (`None`) for secret-classified keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub is_secret: bool,
    pub category: EnvCategory,
    pub level: RecordLevel,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelCategory {
    System,
    Extension,
    Compose,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LabelRecord {
    pub key: String,
    pub value: String,
    pub category: LabelCategory,
    pub level: RecordLevel,
    pub source: String,
}

/// One scope's flattened configuration. Always structurally valid; the
/// default block doubles as the documented fallback when aggregation fails
/// internally.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct AggregatedConfigBlock {
    pub networks: Vec<NetworkRecord>,
    pub ports: Vec<PortRecord>,
    pub volumes: Vec<VolumeRecord>,
    pub environment: Vec<EnvironmentRecord>,
    pub labels: Vec<LabelRecord>,
}

impl AggregatedConfigBlock {
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
            && self.ports.is_empty()
            && self.volumes.is_empty()
            && self.environment.is_empty()
            && self.labels.is_empty()
    }
}
