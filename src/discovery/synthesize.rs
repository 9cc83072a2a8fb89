//! Definition resolution and synthesis.
//!
//! Directory seeds read their located file; external seeds try the compose
//! config-files path their containers advertise; everything else is inferred
//! back from realized container facts. Resolution never fails the caller: the
//! worst case is [`StackDefinition::empty`].

use std::collections::BTreeMap;
use std::path::Path;

use crate::compose::{
    Environment, PortSpec, ServiceDefinition, StackDefinition, VolumeSpec, read_definition,
};
use crate::docker::{ContainerFact, MountFact, PortBinding};

use super::classify::{Provenance, StackSeed};

/// Resolves the declarative definition for one seed.
///
/// A directory definition that fails to read or parse degrades the seed to
/// inferred mode with a logged diagnostic; the pass continues.
pub fn resolve_definition(seed: &StackSeed) -> StackDefinition {
    match seed.provenance {
        Provenance::Directory => {
            if let Some(path) = &seed.definition_file {
                match read_definition(path) {
                    Ok(definition) => return definition,
                    Err(err) => {
                        log::warn!("stack `{}` degrades to inferred definition: {err}", seed.name)
                    }
                }
            }
            synthesize(&seed.containers)
        }
        Provenance::External => {
            if let Some(path) = recorded_definition_path(&seed.containers) {
                match read_definition(&path) {
                    Ok(definition) => return definition,
                    Err(err) => log::debug!(
                        "recorded definition for external stack `{}` unusable: {err}",
                        seed.name
                    ),
                }
            }
            synthesize(&seed.containers)
        }
        Provenance::Orphan => synthesize(&seed.containers),
    }
}

/// The definition file path recorded in the first container's compose
/// identity, if any. The label may hold a comma-separated list; the first
/// entry wins.
fn recorded_definition_path(containers: &[ContainerFact]) -> Option<std::path::PathBuf> {
    let config_files = containers
        .iter()
        .find_map(|container| container.compose.as_ref()?.config_files.as_deref())?;
    let first = config_files.split(',').next()?.trim();
    if first.is_empty() {
        return None;
    }
    let path = Path::new(first);
    path.is_file().then(|| path.to_path_buf())
}

/// Infers a definition from realized container facts: one service per
/// distinct service label, falling back to the container name. Empty
/// collections are omitted from the result.
fn synthesize(containers: &[ContainerFact]) -> StackDefinition {
    if containers.is_empty() {
        return StackDefinition::empty();
    }

    let mut services: BTreeMap<String, ServiceDefinition> = BTreeMap::new();
    for container in containers {
        let service = container
            .service_name()
            .unwrap_or(container.name.as_str())
            .to_owned();
        services
            .entry(service)
            .or_insert_with(|| infer_service(container));
    }

    StackDefinition {
        services,
        ..StackDefinition::empty()
    }
}

fn infer_service(container: &ContainerFact) -> ServiceDefinition {
    let image = (!container.image.is_empty()).then(|| container.image.clone());
    let ports = container
        .ports
        .iter()
        .filter_map(declarative_port)
        .map(PortSpec::Short)
        .collect();
    let volumes = container
        .mounts
        .iter()
        .filter_map(declarative_volume)
        .map(VolumeSpec::Short)
        .collect();
    let environment = if container.environment.is_empty() {
        Environment::default()
    } else {
        Environment::Map(
            container
                .environment
                .iter()
                .map(|(key, value)| (key.clone(), serde_yaml::Value::String(value.clone())))
                .collect(),
        )
    };

    ServiceDefinition {
        image,
        restart: container.restart_policy.clone(),
        environment,
        ports,
        volumes,
        ..ServiceDefinition::default()
    }
}

/// Renders a realized binding back into the declarative
/// `[host_ip:]host_port:container_port[/protocol]` short syntax. Unpublished
/// bindings are skipped.
fn declarative_port(binding: &PortBinding) -> Option<String> {
    let host_port = binding.host_port?;
    let mut out = String::new();
    if let Some(host_ip) = &binding.host_ip {
        out.push_str(host_ip);
        out.push(':');
    }
    out.push_str(&format!("{host_port}:{}", binding.container_port));
    if binding.protocol != "tcp" {
        out.push('/');
        out.push_str(&binding.protocol);
    }
    Some(out)
}

/// Renders a realized mount back into the `source:destination[:mode]` short
/// syntax. Mounts without a usable source (e.g. tmpfs) are skipped.
fn declarative_volume(mount: &MountFact) -> Option<String> {
    let source = mount.name.as_deref().or(mount.source.as_deref())?;
    let mut out = format!("{source}:{}", mount.destination);
    if !mount.read_write {
        out.push_str(":ro");
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::MountKind;
    use crate::docker::mock::MockDockerClient;

    fn seed(provenance: Provenance, containers: Vec<ContainerFact>) -> StackSeed {
        StackSeed {
            name: "test".to_owned(),
            provenance,
            path: None,
            definition_file: None,
            env_files: Vec::new(),
            containers,
        }
    }

    #[test]
    fn test_synthesize_one_service_per_label() {
        let containers = vec![
            MockDockerClient::compose_container("aaa111", "caddy-proxy-1", "caddy", "proxy", true),
            MockDockerClient::compose_container("bbb222", "caddy-proxy-2", "caddy", "proxy", true),
        ];
        let definition = resolve_definition(&seed(Provenance::External, containers));

        assert_eq!(definition.services.len(), 1);
        assert!(definition.services.contains_key("proxy"));
    }

    #[test]
    fn test_synthesize_orphan_uses_container_name() {
        let containers = vec![MockDockerClient::running_container("aaa111", "redis-cache")];
        let definition = resolve_definition(&seed(Provenance::Orphan, containers));

        assert_eq!(definition.services.len(), 1);
        let service = &definition.services["redis-cache"];
        assert_eq!(service.image.as_deref(), Some("redis-cache:latest"));
        assert!(service.ports.is_empty());
        assert!(service.environment.is_empty());
    }

    #[test]
    fn test_synthesize_copies_ports_and_volumes() {
        let mut container = MockDockerClient::running_container("aaa111", "web");
        container.ports.push(PortBinding {
            container_port: 80,
            protocol: "tcp".to_owned(),
            host_ip: Some("0.0.0.0".to_owned()),
            host_port: Some(8080),
        });
        container.ports.push(PortBinding {
            container_port: 53,
            protocol: "udp".to_owned(),
            host_ip: None,
            host_port: Some(53),
        });
        container.mounts.push(MountFact {
            kind: MountKind::Volume,
            name: Some("data".to_owned()),
            source: None,
            destination: "/var/lib/data".to_owned(),
            mode: None,
            read_write: false,
        });

        let definition = resolve_definition(&seed(Provenance::Orphan, vec![container]));
        let service = &definition.services["web"];
        assert_eq!(
            service.ports,
            vec![
                PortSpec::Short("0.0.0.0:8080:80".to_owned()),
                PortSpec::Short("53:53/udp".to_owned()),
            ]
        );
        assert_eq!(
            service.volumes,
            vec![VolumeSpec::Short("data:/var/lib/data:ro".to_owned())]
        );
    }

    #[test]
    fn test_no_containers_yields_empty_definition() {
        let definition = resolve_definition(&seed(Provenance::External, Vec::new()));
        assert_eq!(definition, StackDefinition::empty());
    }

    #[test]
    fn test_unparseable_directory_definition_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("compose.yaml");
        std::fs::write(&file, "services: [broken\n").unwrap();

        let containers = vec![MockDockerClient::compose_container(
            "aaa111", "web-app-1", "web", "app", true,
        )];
        let mut seed = seed(Provenance::Directory, containers);
        seed.definition_file = Some(file);

        let definition = resolve_definition(&seed);
        assert!(definition.services.contains_key("app"));
    }

    #[test]
    fn test_external_prefers_recorded_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("docker-compose.yml");
        std::fs::write(&file, "services:\n  proxy:\n    image: caddy:2\n").unwrap();

        let mut container =
            MockDockerClient::compose_container("aaa111", "caddy-proxy-1", "caddy", "proxy", true);
        if let Some(compose) = container.compose.as_mut() {
            compose.config_files = Some(file.to_string_lossy().into_owned());
        }

        let definition = resolve_definition(&seed(Provenance::External, vec![container]));
        assert_eq!(
            definition.services["proxy"].image.as_deref(),
            Some("caddy:2")
        );
    }
}
