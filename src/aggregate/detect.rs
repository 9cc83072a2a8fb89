//! Conflict and sharing detection over one scope's aggregated records.
//!
//! The detector runs per stack or per service, never across stacks; two
//! independent stacks binding the same host port are intentionally not
//! cross-checked.

use std::collections::BTreeMap;

use super::records::{PortRecord, VolumeRecord};

/// Flags every port record whose (host port, protocol) pair appears more
/// than once in the scope. Records without a host port are unpublished and
/// excluded from grouping. Never errors.
pub fn mark_port_conflicts(ports: &mut [PortRecord]) {
    let mut groups: BTreeMap<(u16, &str), usize> = BTreeMap::new();
    for port in ports.iter() {
        if let Some(host_port) = port.host_port {
            *groups.entry((host_port, port.protocol.as_str())).or_insert(0) += 1;
        }
    }
    let conflicting: Vec<(u16, String)> = groups
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|((host_port, protocol), _)| (host_port, protocol.to_owned()))
        .collect();

    for port in ports.iter_mut() {
        port.conflicts = port.host_port.is_some_and(|host_port| {
            conflicting
                .iter()
                .any(|(p, proto)| *p == host_port && *proto == port.protocol)
        });
    }
}

/// Sets every volume record's `shared_by` to the full source list of its
/// (kind, name) group; a singleton's `shared_by` is its own source. Unnamed
/// mounts are excluded and keep only their own source. Never errors.
pub fn mark_volume_sharing(volumes: &mut [VolumeRecord]) {
    let mut groups: BTreeMap<(&str, &str), Vec<String>> = BTreeMap::new();
    for volume in volumes.iter() {
        if let Some(name) = volume.name.as_deref() {
            groups
                .entry((volume.kind.as_str(), name))
                .or_default()
                .push(volume.source.clone());
        }
    }
    let groups: BTreeMap<(String, String), Vec<String>> = groups
        .into_iter()
        .map(|((kind, name), mut sources)| {
            sources.sort();
            sources.dedup();
            ((kind.to_owned(), name.to_owned()), sources)
        })
        .collect();

    for volume in volumes.iter_mut() {
        let shared = volume
            .name
            .as_deref()
            .and_then(|name| groups.get(&(volume.kind.as_str().to_owned(), name.to_owned())));
        volume.shared_by = match shared {
            Some(sources) if sources.len() >= 2 => sources.clone(),
            _ => vec![volume.source.clone()],
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::records::RecordLevel;
    use crate::docker::MountKind;

    fn port(source: &str, host_port: Option<u16>, protocol: &str) -> PortRecord {
        PortRecord {
            host_ip: None,
            host_port,
            container_port: 80,
            protocol: protocol.to_owned(),
            level: RecordLevel::Service,
            source: source.to_owned(),
            conflicts: false,
        }
    }

    fn volume(source: &str, name: Option<&str>) -> VolumeRecord {
        VolumeRecord {
            kind: MountKind::Volume,
            name: name.map(str::to_owned),
            destination: Some("/data".to_owned()),
            read_write: true,
            external: false,
            level: RecordLevel::Service,
            source: source.to_owned(),
            shared_by: Vec::new(),
        }
    }

    #[test]
    fn test_port_conflict_symmetry() {
        let mut ports = vec![
            port("app", Some(8080), "tcp"),
            port("api", Some(8080), "tcp"),
            port("metrics", Some(9090), "tcp"),
        ];
        mark_port_conflicts(&mut ports);

        assert!(ports[0].conflicts);
        assert!(ports[1].conflicts);
        assert!(!ports[2].conflicts);
    }

    #[test]
    fn test_port_protocol_distinguishes_groups() {
        let mut ports = vec![port("dns", Some(53), "tcp"), port("dns", Some(53), "udp")];
        mark_port_conflicts(&mut ports);
        assert!(!ports[0].conflicts);
        assert!(!ports[1].conflicts);
    }

    #[test]
    fn test_unpublished_ports_excluded() {
        let mut ports = vec![port("a", None, "tcp"), port("b", None, "tcp")];
        mark_port_conflicts(&mut ports);
        assert!(!ports[0].conflicts);
        assert!(!ports[1].conflicts);
    }

    #[test]
    fn test_volume_sharing_symmetry() {
        let mut volumes = vec![
            volume("app", Some("shared-data")),
            volume("worker", Some("shared-data")),
            volume("db", Some("db-data")),
        ];
        mark_volume_sharing(&mut volumes);

        assert_eq!(volumes[0].shared_by, vec!["app", "worker"]);
        assert_eq!(volumes[1].shared_by, vec!["app", "worker"]);
        assert_eq!(volumes[2].shared_by, vec!["db"]);
    }

    #[test]
    fn test_unnamed_mounts_keep_own_source() {
        let mut volumes = vec![volume("a", None), volume("b", None)];
        mark_volume_sharing(&mut volumes);
        assert_eq!(volumes[0].shared_by, vec!["a"]);
        assert_eq!(volumes[1].shared_by, vec!["b"]);
    }
}
