//! Flattening of stacks and service views into aggregated records.

use crate::discovery::Provenance;
use crate::stack::{ServiceView, UnifiedStack};

use super::classify::{classify_env_key, classify_label_key, is_secret_key};
use super::detect::{mark_port_conflicts, mark_volume_sharing};
use super::records::{
    AggregatedConfigBlock, EnvironmentRecord, LabelRecord, NetworkRecord, PortRecord, RecordLevel,
    VolumeRecord,
};

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("service `{service}` references container `{container}` outside stack `{stack}`")]
    InconsistentScope {
        stack: String,
        service: String,
        container: String,
    },
}

/// Aggregates one stack's declared and observed configuration into a
/// classified, conflict/sharing-annotated block.
///
/// The result is always structurally valid: an internal failure is logged
/// and yields [`AggregatedConfigBlock::default`], never an error to the
/// caller.
pub fn aggregate_stack(stack: &UnifiedStack) -> AggregatedConfigBlock {
    match try_aggregate_stack(stack) {
        Ok(block) => block,
        Err(err) => {
            log::error!("failed to aggregate configs for stack `{}`: {err}", stack.name);
            AggregatedConfigBlock::default()
        }
    }
}

/// Aggregates a single service view standalone, producing service-level
/// records only.
pub fn aggregate_service(view: &ServiceView) -> AggregatedConfigBlock {
    let mut block = AggregatedConfigBlock::default();
    flatten_service(view, RecordLevel::Service, &mut block);
    mark_port_conflicts(&mut block.ports);
    mark_volume_sharing(&mut block.volumes);
    block
}

fn try_aggregate_stack(stack: &UnifiedStack) -> Result<AggregatedConfigBlock, Error> {
    verify_scope(stack)?;

    let mut block = AggregatedConfigBlock::default();

    for (name, network) in &stack.definition.networks {
        block.networks.push(NetworkRecord {
            name: name.clone(),
            driver: network.as_ref().and_then(|n| n.driver.clone()),
            external: network.as_ref().is_some_and(|n| n.is_external()),
            level: RecordLevel::Stack,
            source: stack.name.clone(),
        });
    }
    for (name, volume) in &stack.definition.volumes {
        block.volumes.push(VolumeRecord {
            kind: crate::docker::MountKind::Volume,
            name: Some(name.clone()),
            destination: None,
            read_write: true,
            external: volume.as_ref().is_some_and(|v| v.is_external()),
            level: RecordLevel::Stack,
            source: stack.name.clone(),
            shared_by: Vec::new(),
        });
    }

    // Orphan pseudo-stacks have no real service layer; their observations
    // are container-level.
    let level = match stack.provenance {
        Provenance::Orphan => RecordLevel::Container,
        Provenance::Directory | Provenance::External => RecordLevel::Service,
    };
    for view in stack.services.values() {
        flatten_service(view, level, &mut block);
    }

    mark_port_conflicts(&mut block.ports);
    mark_volume_sharing(&mut block.volumes);
    Ok(block)
}

/// Every service-view container must belong to the stack's own container
/// list; a violated scope means the stack object is corrupt and must not
/// produce records.
fn verify_scope(stack: &UnifiedStack) -> Result<(), Error> {
    for view in stack.services.values() {
        for container in &view.containers {
            if !stack.containers.iter().any(|c| c.id == container.id) {
                return Err(Error::InconsistentScope {
                    stack: stack.name.clone(),
                    service: view.name.clone(),
                    container: container.name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn flatten_service(view: &ServiceView, level: RecordLevel, block: &mut AggregatedConfigBlock) {
    for name in &view.networks {
        block.networks.push(NetworkRecord {
            name: name.clone(),
            driver: None,
            external: false,
            level,
            source: view.name.clone(),
        });
    }
    for port in &view.ports {
        block.ports.push(PortRecord {
            host_ip: port.host_ip.clone(),
            host_port: port.host_port,
            container_port: port.container_port,
            protocol: port.protocol.clone(),
            level,
            source: view.name.clone(),
            conflicts: false,
        });
    }
    for mount in &view.volumes {
        block.volumes.push(VolumeRecord {
            kind: mount.kind,
            name: mount.name.clone(),
            destination: Some(mount.destination.clone()),
            read_write: mount.read_write,
            external: false,
            level,
            source: view.name.clone(),
            shared_by: Vec::new(),
        });
    }
    for (key, value) in &view.environment {
        let is_secret = is_secret_key(key);
        block.environment.push(EnvironmentRecord {
            key: key.clone(),
            value: (!is_secret).then(|| value.clone()),
            is_secret,
            category: classify_env_key(key),
            level,
            source: view.name.clone(),
        });
    }
    for (key, value) in &view.labels {
        block.labels.push(LabelRecord {
            key: key.clone(),
            value: value.clone(),
            category: classify_label_key(key),
            level,
            source: view.name.clone(),
        });
    }
}
