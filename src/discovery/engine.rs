//! Full discovery pass orchestration.
//!
//! A pass fetches one read-only fact batch, classifies it into seeds and
//! builds every stack concurrently under an overall deadline. Nothing
//! persists between passes except the snapshot handed to the caller.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::aggregate;
use crate::docker::{
    COMPOSE_PROJECT_LABEL, DockerClient, FactBatch, FactCollector, NetworkFact, ResourceUsage,
    VolumeFact,
};
use crate::stack::{StackBuilder, UnifiedStack};

use super::classify::{Provenance, StackSeed, classify};
use super::synthesize::resolve_definition;

/// The result of one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// All discovered stacks, sorted by name.
    pub stacks: Vec<UnifiedStack>,
    /// Set when the deadline expired and in-flight stacks were omitted.
    pub partial: bool,
}

/// Runs discovery passes against one engine client and stacks root.
pub struct StackDiscovery<C> {
    client: Arc<C>,
    stacks_root: PathBuf,
}

impl<C: DockerClient> StackDiscovery<C> {
    pub fn new(client: Arc<C>, stacks_root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            stacks_root: stacks_root.into(),
        }
    }

    /// Runs one full pass.
    ///
    /// Per-stack builds run concurrently over the shared read-only batch.
    /// When `deadline` expires, the stacks that finished are returned with
    /// `partial` set; in-flight builds are aborted and omitted rather than
    /// surfaced half-populated.
    ///
    /// # Errors
    ///
    /// Fails only when the engine is unreachable; every other failure is
    /// scoped to one stack or one object and degrades locally.
    pub async fn discover_all(&self, deadline: Duration) -> crate::docker::Result<Snapshot> {
        let collector = FactCollector::new(Arc::clone(&self.client));
        let batch = Arc::new(collector.collect().await?);
        let seeds = classify(batch.containers.clone(), &self.stacks_root);
        log::debug!("classified {} containers into {} stacks", batch.containers.len(), seeds.len());

        let mut set = JoinSet::new();
        for seed in seeds {
            let client = Arc::clone(&self.client);
            let batch = Arc::clone(&batch);
            set.spawn(async move { build_stack(seed, &batch, client.as_ref()).await });
        }

        let mut stacks = Vec::new();
        let mut partial = false;
        let drain = async {
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(stack) => stacks.push(stack),
                    Err(err) if err.is_panic() => log::error!("stack build panicked: {err}"),
                    Err(_) => {}
                }
            }
        };
        if tokio::time::timeout(deadline, drain).await.is_err() {
            log::warn!("discovery deadline expired, returning partial snapshot");
            partial = true;
            set.abort_all();
        }

        stacks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Snapshot { stacks, partial })
    }
}

async fn build_stack<C: DockerClient>(
    seed: StackSeed,
    batch: &FactBatch,
    client: &C,
) -> UnifiedStack {
    let definition = resolve_definition(&seed);
    let networks = networks_for_stack(&seed, &batch.networks);
    let volumes = volumes_for_stack(&seed, &batch.volumes);

    let mut usage: BTreeMap<String, ResourceUsage> = BTreeMap::new();
    for container in seed.containers.iter().filter(|c| c.running) {
        if let Some(sample) = client.live_stats(&container.id).await {
            usage.insert(container.id.to_string(), sample);
        }
    }

    let mut stack = StackBuilder::new(seed, definition)
        .with_networks(networks)
        .with_volumes(volumes)
        .with_usage(usage)
        .build();
    stack.aggregated_configs = aggregate::aggregate_stack(&stack);
    stack
}

/// Engine networks scoped to one stack: labeled with the stack's compose
/// project, or attached to by one of its containers.
fn networks_for_stack(seed: &StackSeed, networks: &[NetworkFact]) -> Vec<NetworkFact> {
    networks
        .iter()
        .filter(|network| {
            project_label_matches(seed, &network.labels)
                || seed
                    .containers
                    .iter()
                    .any(|container| container.networks.contains_key(&network.name))
        })
        .cloned()
        .collect()
}

/// Engine volumes scoped to one stack: labeled with the stack's compose
/// project, or mounted by one of its containers.
fn volumes_for_stack(seed: &StackSeed, volumes: &[VolumeFact]) -> Vec<VolumeFact> {
    volumes
        .iter()
        .filter(|volume| {
            project_label_matches(seed, &volume.labels)
                || seed.containers.iter().any(|container| {
                    container
                        .mounts
                        .iter()
                        .any(|mount| mount.name.as_deref() == Some(volume.name.as_str()))
                })
        })
        .cloned()
        .collect()
}

fn project_label_matches(seed: &StackSeed, labels: &BTreeMap<String, String>) -> bool {
    seed.provenance != Provenance::Orphan
        && labels.get(COMPOSE_PROJECT_LABEL) == Some(&seed.name)
}
