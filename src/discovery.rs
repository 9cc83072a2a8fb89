//! Stack discovery: partitioning containers into stacks and orchestrating a
//! full pass.

mod classify;
mod engine;
mod synthesize;

pub use classify::{ORPHAN_PREFIX, Provenance, StackSeed, classify};
pub use engine::{Snapshot, StackDiscovery};
pub use synthesize::resolve_definition;
