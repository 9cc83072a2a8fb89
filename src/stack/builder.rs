//! The canonical stack builder.
//!
//! One build path covers all three provenance classes; the differences are
//! fully isolated in the definition resolution that happens before the
//! builder runs. Given its inputs the build is deterministic and performs no
//! I/O.

use std::collections::BTreeMap;

use crate::compose::StackDefinition;
use crate::discovery::StackSeed;
use crate::docker::{ContainerFact, NetworkFact, PortBinding, ResourceUsage, VolumeFact};

use super::model::{
    ContainerSummary, EnvironmentMeta, HealthSummary, ServiceView, StackStats, UnifiedStack,
};
use super::rollup::{network_rollup, volume_rollup};
use super::status::StackStatus;

/// Builds one [`UnifiedStack`] from a seed, its resolved definition and the
/// engine objects scoped to the stack.
pub struct StackBuilder {
    seed: StackSeed,
    definition: StackDefinition,
    networks: Vec<NetworkFact>,
    volumes: Vec<VolumeFact>,
    usage: BTreeMap<String, ResourceUsage>,
}

impl StackBuilder {
    pub fn new(seed: StackSeed, definition: StackDefinition) -> Self {
        Self {
            seed,
            definition,
            networks: Vec::new(),
            volumes: Vec::new(),
            usage: BTreeMap::new(),
        }
    }

    /// Engine networks belonging to this stack.
    pub fn with_networks(mut self, networks: Vec<NetworkFact>) -> Self {
        self.networks = networks;
        self
    }

    /// Engine volumes belonging to this stack.
    pub fn with_volumes(mut self, volumes: Vec<VolumeFact>) -> Self {
        self.volumes = volumes;
        self
    }

    /// Live usage samples keyed by container id.
    pub fn with_usage(mut self, usage: BTreeMap<String, ResourceUsage>) -> Self {
        self.usage = usage;
        self
    }

    pub fn build(self) -> UnifiedStack {
        let Self {
            mut seed,
            definition,
            networks,
            volumes,
            usage,
        } = self;
        seed.containers.sort_by(|a, b| a.name.cmp(&b.name));

        let services = build_services(&definition, &seed.containers, &usage);

        let containers: Vec<ContainerSummary> = seed
            .containers
            .iter()
            .map(|fact| ContainerSummary::from_fact(fact, usage.get(fact.id.as_ref()).copied()))
            .collect();
        let running = containers.iter().filter(|c| c.running).count();
        let status = StackStatus::for_stack(running, containers.len());
        let health = HealthSummary::tally(seed.containers.iter().map(|fact| &fact.health));
        let stats = stack_stats(&containers, &usage);

        let environment = EnvironmentMeta {
            declared_secrets: definition
                .declared_secret_names()
                .map(str::to_owned)
                .collect(),
            declared_configs: definition
                .declared_config_names()
                .map(str::to_owned)
                .collect(),
            env_files: seed.env_files.clone(),
        };

        UnifiedStack {
            name: seed.name,
            provenance: seed.provenance,
            path: seed.path,
            status,
            networks: network_rollup(&definition, &seed.containers, &networks),
            volumes: volume_rollup(&definition, &seed.containers, &volumes),
            definition,
            services,
            containers,
            stats,
            environment,
            health,
            aggregated_configs: Default::default(),
        }
    }
}

/// Builds the service map: one view per declared service plus one per
/// service observed on containers only. Containers without a service label
/// group under their own name, which is how orphan pseudo-stacks get their
/// single service.
fn build_services(
    definition: &StackDefinition,
    containers: &[ContainerFact],
    usage: &BTreeMap<String, ResourceUsage>,
) -> BTreeMap<String, ServiceView> {
    let mut grouped: BTreeMap<&str, Vec<&ContainerFact>> = BTreeMap::new();
    for container in containers {
        let service = container.service_name().unwrap_or(container.name.as_str());
        grouped.entry(service).or_default().push(container);
    }
    for name in definition.services.keys() {
        grouped.entry(name).or_default();
    }

    grouped
        .into_iter()
        .map(|(name, members)| {
            let view = build_service(name, definition, &members, usage);
            (name.to_owned(), view)
        })
        .collect()
}

fn build_service(
    name: &str,
    definition: &StackDefinition,
    members: &[&ContainerFact],
    usage: &BTreeMap<String, ResourceUsage>,
) -> ServiceView {
    let running = members.iter().filter(|fact| fact.running).count();

    let mut ports: Vec<PortBinding> = members
        .iter()
        .flat_map(|fact| fact.ports.iter().cloned())
        .collect();
    ports.sort_by(|a, b| {
        (a.container_port, &a.protocol, a.host_port).cmp(&(
            b.container_port,
            &b.protocol,
            b.host_port,
        ))
    });
    ports.dedup();

    let mut networks: Vec<String> = members
        .iter()
        .flat_map(|fact| fact.networks.keys().cloned())
        .collect();
    networks.sort();
    networks.dedup();

    let mut volumes: Vec<_> = members
        .iter()
        .flat_map(|fact| fact.mounts.iter().cloned())
        .collect();
    volumes.sort_by(|a, b| (&a.destination, &a.name).cmp(&(&b.destination, &b.name)));
    volumes.dedup();

    let mut environment = BTreeMap::new();
    let mut labels = BTreeMap::new();
    for member in members {
        for (key, value) in &member.environment {
            environment.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for (key, value) in &member.labels {
            labels.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    ServiceView {
        name: name.to_owned(),
        definition: definition.services.get(name).cloned(),
        status: StackStatus::for_service(running, members.len()),
        containers: members
            .iter()
            .map(|fact| ContainerSummary::from_fact(fact, usage.get(fact.id.as_ref()).copied()))
            .collect(),
        ports,
        networks,
        volumes,
        environment,
        labels,
        health: HealthSummary::tally(members.iter().map(|fact| &fact.health)),
    }
}

/// Sums live usage over the containers that produced a sample; all-`None`
/// when no sample exists.
fn stack_stats(
    containers: &[ContainerSummary],
    usage: &BTreeMap<String, ResourceUsage>,
) -> StackStats {
    let running = containers.iter().filter(|c| c.running).count();
    let mut cpu_percent = None;
    let mut memory_usage_bytes = None;
    let mut memory_limit_bytes = None;
    for sample in usage.values() {
        if let Some(cpu) = sample.cpu_percent {
            *cpu_percent.get_or_insert(0.0) += cpu;
        }
        if let Some(memory) = sample.memory_usage_bytes {
            *memory_usage_bytes.get_or_insert(0) += memory;
        }
        if let Some(limit) = sample.memory_limit_bytes {
            *memory_limit_bytes.get_or_insert(0) += limit;
        }
    }

    StackStats {
        total_containers: containers.len(),
        running_containers: running,
        stopped_containers: containers.len() - running,
        cpu_percent,
        memory_usage_bytes,
        memory_limit_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Provenance;
    use crate::docker::mock::MockDockerClient;

    fn seed(
        name: &str,
        provenance: Provenance,
        containers: Vec<ContainerFact>,
    ) -> StackSeed {
        StackSeed {
            name: name.to_owned(),
            provenance,
            path: None,
            definition_file: None,
            env_files: Vec::new(),
            containers,
        }
    }

    fn web_definition() -> StackDefinition {
        serde_yaml::from_str(
            r"
services:
  app:
    image: web/app:1
  db:
    image: postgres:16
",
        )
        .unwrap()
    }

    #[test]
    fn test_partial_stack_status() {
        let containers = vec![
            MockDockerClient::compose_container("aaa111", "web-app-1", "web", "app", true),
            MockDockerClient::compose_container("bbb222", "web-app-2", "web", "app", false),
            MockDockerClient::compose_container("ccc333", "web-db-1", "web", "db", true),
        ];
        let stack = StackBuilder::new(
            seed("web", Provenance::Directory, containers),
            web_definition(),
        )
        .build();

        assert_eq!(stack.status, StackStatus::Partial);
        assert_eq!(stack.services["app"].status, StackStatus::Partial);
        assert_eq!(stack.services["db"].status, StackStatus::Running);
        assert_eq!(stack.stats.total_containers, 3);
        assert_eq!(stack.stats.running_containers, 2);
    }

    #[test]
    fn test_idle_stack_is_empty() {
        let stack = StackBuilder::new(
            seed("idle", Provenance::Directory, Vec::new()),
            web_definition(),
        )
        .build();

        assert_eq!(stack.status, StackStatus::Empty);
        assert_eq!(stack.services.len(), 2);
        assert_eq!(stack.services["app"].status, StackStatus::NoContainers);
        assert_eq!(stack.services["db"].status, StackStatus::NoContainers);
    }

    #[test]
    fn test_undeclared_service_still_appears() {
        let containers = vec![MockDockerClient::compose_container(
            "ddd444", "web-job-1", "web", "job", true,
        )];
        let stack = StackBuilder::new(
            seed("web", Provenance::Directory, containers),
            web_definition(),
        )
        .build();

        assert_eq!(stack.services.len(), 3);
        assert!(stack.services["job"].definition.is_none());
        assert_eq!(stack.services["job"].status, StackStatus::Running);
    }

    #[test]
    fn test_usage_summed_into_stats() {
        let containers = vec![
            MockDockerClient::compose_container("aaa111", "web-app-1", "web", "app", true),
            MockDockerClient::compose_container("ccc333", "web-db-1", "web", "db", true),
        ];
        let usage: BTreeMap<String, ResourceUsage> = [
            (
                "aaa111".to_owned(),
                ResourceUsage {
                    cpu_percent: Some(10.0),
                    memory_usage_bytes: Some(100),
                    memory_limit_bytes: None,
                },
            ),
            (
                "ccc333".to_owned(),
                ResourceUsage {
                    cpu_percent: Some(5.0),
                    memory_usage_bytes: Some(50),
                    memory_limit_bytes: None,
                },
            ),
        ]
        .into();

        let stack = StackBuilder::new(
            seed("web", Provenance::Directory, containers),
            web_definition(),
        )
        .with_usage(usage)
        .build();

        assert_eq!(stack.stats.cpu_percent, Some(15.0));
        assert_eq!(stack.stats.memory_usage_bytes, Some(150));
        assert_eq!(stack.stats.memory_limit_bytes, None);
        let app_container = &stack.services["app"].containers[0];
        assert_eq!(app_container.usage.unwrap().cpu_percent, Some(10.0));
    }

    #[test]
    fn test_build_is_deterministic() {
        let containers = || {
            vec![
                MockDockerClient::compose_container("ccc333", "web-db-1", "web", "db", true),
                MockDockerClient::compose_container("aaa111", "web-app-1", "web", "app", true),
            ]
        };
        let build = |containers| {
            StackBuilder::new(seed("web", Provenance::Directory, containers), web_definition())
                .build()
        };

        let first = build(containers());
        let second = build(containers().into_iter().rev().collect());
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
