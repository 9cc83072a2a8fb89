//! The unified stack view and its builder.

mod builder;
mod model;
mod rollup;
mod status;

pub use builder::StackBuilder;
pub use model::{
    ContainerSummary, EnvironmentMeta, HealthOverall, HealthSummary, ServiceView, StackStats,
    UnifiedStack,
};
pub use rollup::{
    DeclaredNetwork, DeclaredVolume, NetworkRollupEntry, ObservedNetwork, ObservedVolume,
    RollupSource, RollupStatus, VolumeRollupEntry, network_rollup, volume_rollup,
};
pub use status::StackStatus;
