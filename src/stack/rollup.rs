//! Three-source network and volume rollups.
//!
//! For both networks and volumes a stack merges three views keyed by name:
//! declared in the definition, observed on the stack's containers, and actual
//! engine objects. An entry is `active` iff the engine actually has the
//! object, else `defined`.

use std::collections::BTreeMap;

use crate::compose::{NetworkDefinition, StackDefinition, VolumeDefinition};
use crate::docker::{ContainerFact, MountKind, NetworkFact, VolumeFact};

/// Which sources contributed a rollup entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RollupSource {
    Declared,
    Observed,
    Actual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RollupStatus {
    /// Present as an actual engine object.
    Active,
    /// Known only from the definition or container facts.
    Defined,
}

/// Declared-in-definition payload of a network rollup entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct DeclaredNetwork {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    pub external: bool,
}

/// Observed-from-containers payload of a network rollup entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ObservedNetwork {
    /// Names of the stack containers attached to the network.
    pub containers: Vec<String>,
    pub ip_addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NetworkRollupEntry {
    pub name: String,
    pub status: RollupStatus,
    pub sources: Vec<RollupSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared: Option<DeclaredNetwork>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<ObservedNetwork>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<NetworkFact>,
}

/// Declared-in-definition payload of a volume rollup entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct DeclaredVolume {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    pub external: bool,
}

/// Observed-from-containers payload of a volume rollup entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ObservedVolume {
    /// Names of the stack containers mounting the volume.
    pub containers: Vec<String>,
    pub destinations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VolumeRollupEntry {
    pub name: String,
    pub status: RollupStatus,
    pub sources: Vec<RollupSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared: Option<DeclaredVolume>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<ObservedVolume>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<VolumeFact>,
}

/// Merges declared, observed and actual networks into one list sorted by
/// name.
pub fn network_rollup(
    definition: &StackDefinition,
    containers: &[ContainerFact],
    actual: &[NetworkFact],
) -> Vec<NetworkRollupEntry> {
    let mut declared: BTreeMap<&str, DeclaredNetwork> = BTreeMap::new();
    for (name, network) in &definition.networks {
        declared.insert(name, declared_network(network.as_ref()));
    }

    let mut observed: BTreeMap<&str, ObservedNetwork> = BTreeMap::new();
    for container in containers {
        for (name, attachment) in &container.networks {
            let entry = observed.entry(name).or_default();
            entry.containers.push(container.name.clone());
            if let Some(ip) = &attachment.ip_address {
                entry.ip_addresses.push(ip.clone());
            }
        }
    }

    let mut names: Vec<&str> = declared
        .keys()
        .chain(observed.keys())
        .copied()
        .chain(actual.iter().map(|network| network.name.as_str()))
        .collect();
    names.sort_unstable();
    names.dedup();

    names
        .into_iter()
        .map(|name| {
            let declared = declared.get(name).cloned();
            let observed = observed.get(name).cloned();
            let actual = actual.iter().find(|network| network.name == name).cloned();
            let sources = source_list(declared.is_some(), observed.is_some(), actual.is_some());
            NetworkRollupEntry {
                name: name.to_owned(),
                status: status_for(actual.is_some()),
                sources,
                declared,
                observed,
                actual,
            }
        })
        .collect()
}

/// Merges declared, observed and actual volumes into one list sorted by
/// name. Only named volume mounts count as observed; bind and tmpfs mounts
/// have no engine volume to roll up.
pub fn volume_rollup(
    definition: &StackDefinition,
    containers: &[ContainerFact],
    actual: &[VolumeFact],
) -> Vec<VolumeRollupEntry> {
    let mut declared: BTreeMap<&str, DeclaredVolume> = BTreeMap::new();
    for (name, volume) in &definition.volumes {
        declared.insert(name, declared_volume(volume.as_ref()));
    }

    let mut observed: BTreeMap<&str, ObservedVolume> = BTreeMap::new();
    for container in containers {
        for mount in &container.mounts {
            if mount.kind != MountKind::Volume {
                continue;
            }
            let Some(name) = mount.name.as_deref() else {
                continue;
            };
            let entry = observed.entry(name).or_default();
            entry.containers.push(container.name.clone());
            entry.destinations.push(mount.destination.clone());
        }
    }

    let mut names: Vec<&str> = declared
        .keys()
        .chain(observed.keys())
        .copied()
        .chain(actual.iter().map(|volume| volume.name.as_str()))
        .collect();
    names.sort_unstable();
    names.dedup();

    names
        .into_iter()
        .map(|name| {
            let declared = declared.get(name).cloned();
            let observed = observed.get(name).cloned();
            let actual = actual.iter().find(|volume| volume.name == name).cloned();
            let sources = source_list(declared.is_some(), observed.is_some(), actual.is_some());
            VolumeRollupEntry {
                name: name.to_owned(),
                status: status_for(actual.is_some()),
                sources,
                declared,
                observed,
                actual,
            }
        })
        .collect()
}

fn declared_network(definition: Option<&NetworkDefinition>) -> DeclaredNetwork {
    definition
        .map(|network| DeclaredNetwork {
            driver: network.driver.clone(),
            external: network.is_external(),
        })
        .unwrap_or_default()
}

fn declared_volume(definition: Option<&VolumeDefinition>) -> DeclaredVolume {
    definition
        .map(|volume| DeclaredVolume {
            driver: volume.driver.clone(),
            external: volume.is_external(),
        })
        .unwrap_or_default()
}

fn source_list(declared: bool, observed: bool, actual: bool) -> Vec<RollupSource> {
    let mut sources = Vec::new();
    if declared {
        sources.push(RollupSource::Declared);
    }
    if observed {
        sources.push(RollupSource::Observed);
    }
    if actual {
        sources.push(RollupSource::Actual);
    }
    sources
}

fn status_for(actual: bool) -> RollupStatus {
    if actual {
        RollupStatus::Active
    } else {
        RollupStatus::Defined
    }
}
