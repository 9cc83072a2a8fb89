//! On-disk declarative stack definitions.
//!
//! Locates and parses compose files; the definition model is also the target
//! of the synthesizer when no file exists for a stack.

mod definition;
mod error;
mod reader;

pub use definition::{
    Command, DependsOn, Environment, Labels, NetworkDefinition, PortSpec, ServiceDefinition,
    ServiceNetworks, StackDefinition, VolumeDefinition, VolumeSpec,
};
pub use error::{Error, Result};
pub use reader::{
    DEFINITION_FILE_CANDIDATES, ENV_FILE_CANDIDATES, existing_env_files, find_definition_file,
    read_definition,
};
