//! The declarative stack definition model.
//!
//! Mirrors the compose file format closely enough to answer the questions the
//! stack builder asks: which services exist, which networks/volumes are
//! declared, which secrets/configs/env keys a service names. The format is
//! notoriously flexible, so several fields accept both their short and long
//! syntax via untagged enums.

use std::collections::BTreeMap;

/// A parsed (or synthesized) stack definition.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StackDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, ServiceDefinition>,
    /// Top-level network declarations. Compose allows `networks: {db: }`, so
    /// the value side is optional.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, Option<NetworkDefinition>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, Option<VolumeDefinition>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: BTreeMap<String, serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configs: BTreeMap<String, serde_yaml::Value>,
}

impl StackDefinition {
    /// The empty-but-valid definition used when nothing can be read or
    /// synthesized for a stack.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
            && self.networks.is_empty()
            && self.volumes.is_empty()
            && self.secrets.is_empty()
            && self.configs.is_empty()
    }

    pub fn declared_secret_names(&self) -> impl Iterator<Item = &str> {
        self.secrets.keys().map(String::as_str)
    }

    pub fn declared_config_names(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }
}

/// One service entry of a definition.
///
/// Unknown keys are ignored on purpose; the builder only consumes the fields
/// below.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ServiceDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Build context in string or map form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
    #[serde(default, skip_serializing_if = "Environment::is_empty")]
    pub environment: Environment,
    /// `env_file` in string or list form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeSpec>,
    #[serde(default, skip_serializing_if = "ServiceNetworks::is_empty")]
    pub networks: ServiceNetworks,
    #[serde(default, skip_serializing_if = "DependsOn::is_empty")]
    pub depends_on: DependsOn,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configs: Vec<serde_yaml::Value>,
}

/// A service command in shell or argv form.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Command {
    Shell(String),
    Argv(Vec<String>),
}

/// Service environment, accepted as either a `KEY=VALUE` list or a map.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Environment {
    List(Vec<String>),
    Map(BTreeMap<String, serde_yaml::Value>),
}

impl Default for Environment {
    fn default() -> Self {
        Environment::List(Vec::new())
    }
}

impl Environment {
    pub fn is_empty(&self) -> bool {
        match self {
            Environment::List(entries) => entries.is_empty(),
            Environment::Map(entries) => entries.is_empty(),
        }
    }

    /// Normalizes both syntaxes into a key/value map.
    ///
    /// List entries without a `=` declare a pass-through key and map to an
    /// empty value, as do explicit nulls in map form. Scalar values are
    /// rendered as their YAML string form.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        match self {
            Environment::List(entries) => entries
                .iter()
                .map(|entry| match entry.split_once('=') {
                    Some((key, value)) => (key.to_owned(), value.to_owned()),
                    None => (entry.clone(), String::new()),
                })
                .collect(),
            Environment::Map(entries) => entries
                .iter()
                .map(|(key, value)| (key.clone(), scalar_to_string(value)))
                .collect(),
        }
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_owned())
            .unwrap_or_default(),
    }
}

/// A declared port mapping, parsed from the short string/number syntax or the
/// long map syntax.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum PortSpec {
    Number(u16),
    Short(String),
    Long {
        target: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        published: Option<serde_yaml::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        protocol: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        host_ip: Option<String>,
    },
}

/// A service volume entry in short (`source:target[:mode]`) or long form.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum VolumeSpec {
    Short(String),
    Long {
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        read_only: Option<bool>,
    },
}

/// Service-level network attachment, accepted as a list of names or a map
/// with per-network options.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ServiceNetworks {
    List(Vec<String>),
    Map(BTreeMap<String, serde_yaml::Value>),
}

impl Default for ServiceNetworks {
    fn default() -> Self {
        ServiceNetworks::List(Vec::new())
    }
}

impl ServiceNetworks {
    pub fn is_empty(&self) -> bool {
        match self {
            ServiceNetworks::List(names) => names.is_empty(),
            ServiceNetworks::Map(entries) => entries.is_empty(),
        }
    }

    pub fn names(&self) -> Vec<String> {
        match self {
            ServiceNetworks::List(names) => names.clone(),
            ServiceNetworks::Map(entries) => entries.keys().cloned().collect(),
        }
    }
}

/// Service dependencies in list or conditional map form.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum DependsOn {
    List(Vec<String>),
    Map(BTreeMap<String, serde_yaml::Value>),
}

impl Default for DependsOn {
    fn default() -> Self {
        DependsOn::List(Vec::new())
    }
}

impl DependsOn {
    pub fn is_empty(&self) -> bool {
        match self {
            DependsOn::List(names) => names.is_empty(),
            DependsOn::Map(entries) => entries.is_empty(),
        }
    }

    pub fn names(&self) -> Vec<String> {
        match self {
            DependsOn::List(names) => names.clone(),
            DependsOn::Map(entries) => entries.keys().cloned().collect(),
        }
    }
}

/// Service labels as a map or a `key=value` list.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Labels {
    Map(BTreeMap<String, serde_yaml::Value>),
    List(Vec<String>),
}

impl Default for Labels {
    fn default() -> Self {
        Labels::Map(BTreeMap::new())
    }
}

impl Labels {
    pub fn is_empty(&self) -> bool {
        match self {
            Labels::Map(entries) => entries.is_empty(),
            Labels::List(entries) => entries.is_empty(),
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        match self {
            Labels::Map(entries) => entries
                .iter()
                .map(|(key, value)| (key.clone(), scalar_to_string(value)))
                .collect(),
            Labels::List(entries) => entries
                .iter()
                .map(|entry| match entry.split_once('=') {
                    Some((key, value)) => (key.to_owned(), value.to_owned()),
                    None => (entry.clone(), String::new()),
                })
                .collect(),
        }
    }
}

/// A top-level network declaration.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NetworkDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<serde_yaml::Value>,
}

impl NetworkDefinition {
    pub fn is_external(&self) -> bool {
        external_flag(self.external.as_ref())
    }
}

/// A top-level volume declaration.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VolumeDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<serde_yaml::Value>,
}

impl VolumeDefinition {
    pub fn is_external(&self) -> bool {
        external_flag(self.external.as_ref())
    }
}

// `external` may be a bool or the legacy `{name: ...}` map form.
fn external_flag(value: Option<&serde_yaml::Value>) -> bool {
    match value {
        Some(serde_yaml::Value::Bool(flag)) => *flag,
        Some(serde_yaml::Value::Mapping(_)) => true,
        _ => false,
    }
}
