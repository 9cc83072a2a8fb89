//! Definition file lookup and parsing.

use std::path::{Path, PathBuf};

use super::definition::StackDefinition;
use super::error::{Error, Result};

/// Definition file names in lookup priority order.
pub const DEFINITION_FILE_CANDIDATES: [&str; 4] = [
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

/// Environment file names checked when summarizing a stack directory.
pub const ENV_FILE_CANDIDATES: [&str; 3] = [".env", ".env.local", "stack.env"];

/// Returns the highest-priority definition file present in `dir`, if any.
pub fn find_definition_file(dir: &Path) -> Option<PathBuf> {
    DEFINITION_FILE_CANDIDATES
        .iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| path.is_file())
}

/// Reads and parses the definition file at `path`.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the file does not exist, [`Error::Read`]
/// for any other I/O failure and [`Error::Parse`] for malformed YAML.
pub fn read_definition(path: &Path) -> Result<StackDefinition> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Error::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    serde_yaml::from_str(&raw).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Lists the well-known environment files present in `dir`, in candidate
/// order. Only their names are reported, never their contents.
pub fn existing_env_files(dir: &Path) -> Vec<String> {
    ENV_FILE_CANDIDATES
        .iter()
        .filter(|candidate| dir.join(candidate).is_file())
        .map(|candidate| (*candidate).to_owned())
        .collect()
}
