use std::path::PathBuf;

/// Errors that may occur while locating or parsing a definition file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("definition file not found: `{path}`")]
    NotFound { path: PathBuf },
    #[error("failed to read definition file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse definition file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
