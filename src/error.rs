/// Top-level errors that abort the monitor.
///
/// Everything recoverable is handled inside the modules; only configuration
/// and engine-connectivity failures bubble up to `main`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] crate::config::Error),
    #[error("container engine error: {0}")]
    Docker(#[from] crate::docker::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait ResultOkLogExt<T, E> {
    /// Converts the result into an `Option`, logging the error arm.
    fn ok_log(self) -> Option<T>;

    /// Like [`ok_log`](Self::ok_log), but prefixes the log line with `context`.
    fn ok_log_ctx(self, context: &str) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }

    fn ok_log_ctx(self, context: &str) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{context}: {err}");
                None
            }
        }
    }
}
