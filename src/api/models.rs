use crate::discovery::Provenance;
use crate::snapshot::SnapshotStore;
use crate::stack::{HealthOverall, StackStatus, UnifiedStack};

/// Condensed per-stack line for the listing endpoint.
#[derive(Debug, serde::Serialize)]
pub struct StackSummary {
    pub name: String,
    pub provenance: Provenance,
    pub status: StackStatus,
    pub services: usize,
    pub total_containers: usize,
    pub running_containers: usize,
    pub health: HealthOverall,
}

impl From<&UnifiedStack> for StackSummary {
    fn from(stack: &UnifiedStack) -> Self {
        Self {
            name: stack.name.clone(),
            provenance: stack.provenance,
            status: stack.status,
            services: stack.services.len(),
            total_containers: stack.stats.total_containers,
            running_containers: stack.stats.running_containers,
            health: stack.health.overall,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct StackListResponse {
    pub stacks: Vec<StackSummary>,
    pub partial: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh_epoch_secs: Option<u64>,
}

impl StackListResponse {
    pub fn from_store(store: &SnapshotStore) -> Self {
        Self {
            stacks: store.stacks().iter().map(StackSummary::from).collect(),
            partial: store.partial(),
            last_refresh_epoch_secs: store.last_refresh_epoch_secs(),
        }
    }
}
