//! Flattened, classified, conflict/sharing-annotated configuration records.

mod aggregator;
mod classify;
mod detect;
mod records;

pub use aggregator::{aggregate_service, aggregate_stack};
pub use classify::{classify_env_key, classify_label_key, is_secret_key};
pub use detect::{mark_port_conflicts, mark_volume_sharing};
pub use records::{
    AggregatedConfigBlock, EnvCategory, EnvironmentRecord, LabelCategory, LabelRecord,
    NetworkRecord, PortRecord, RecordLevel, VolumeRecord,
};
