//! The published snapshot shared between the discovery loop and the API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

use crate::discovery::Snapshot;
use crate::stack::UnifiedStack;

/// Holds the latest discovery snapshot for concurrent readers.
///
/// An empty store means "no stacks", never an error.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    stacks: DashMap<String, UnifiedStack>,
    partial: AtomicBool,
    /// Unix seconds of the last replace; 0 before the first pass.
    last_refresh: AtomicU64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a new snapshot, dropping stacks that disappeared.
    pub fn replace(&self, snapshot: Snapshot) {
        let names: Vec<String> = snapshot
            .stacks
            .iter()
            .map(|stack| stack.name.clone())
            .collect();
        self.stacks
            .retain(|name, _| names.iter().any(|n| n == name));
        for stack in snapshot.stacks {
            self.stacks.insert(stack.name.clone(), stack);
        }

        self.partial.store(snapshot.partial, Ordering::Relaxed);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        self.last_refresh.store(now, Ordering::Relaxed);
    }

    /// All stacks of the current snapshot, sorted by name.
    pub fn stacks(&self) -> Vec<UnifiedStack> {
        let mut stacks: Vec<UnifiedStack> = self
            .stacks
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        stacks.sort_by(|a, b| a.name.cmp(&b.name));
        stacks
    }

    pub fn get(&self, name: &str) -> Option<UnifiedStack> {
        self.stacks.get(name).map(|entry| entry.value().clone())
    }

    pub fn partial(&self) -> bool {
        self.partial.load(Ordering::Relaxed)
    }

    /// Unix seconds of the last refresh, `None` before the first pass.
    pub fn last_refresh_epoch_secs(&self) -> Option<u64> {
        match self.last_refresh.load(Ordering::Relaxed) {
            0 => None,
            secs => Some(secs),
        }
    }
}
