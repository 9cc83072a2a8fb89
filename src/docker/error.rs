#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine socket could not be reached at all. A pass hitting this is
    /// unavailable; callers must not attempt partial reconciliation.
    #[error("failed to connect to docker engine: {0}")]
    Connection(String),
    #[error("container `{id}` not found")]
    NotFound { id: String },
    #[error("docker api call `{operation}` failed: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },
    /// The engine returned an object that is missing required fields.
    #[error("malformed engine response: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
