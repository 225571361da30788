//! Worker error types.

use argonbox_core::ArgonError;
use thiserror::Error;

/// Errors surfaced by [`ArgonWorker`](crate::ArgonWorker) and
/// [`WorkerPool`](crate::WorkerPool).
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The orchestrator rejected or failed the request.
    #[error(transparent)]
    Hash(#[from] ArgonError),

    /// The worker was terminated, or its isolated context exited.
    #[error("worker terminated")]
    Terminated,

    /// Spawned outside a tokio runtime.
    #[error("no tokio runtime is running")]
    NoRuntime,

    /// The isolated context's thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// A response did not match the request kind.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid worker or pool settings.
    #[error("invalid worker configuration: {0}")]
    Config(String),
}

impl WorkerError {
    /// The orchestrator error, if this is one.
    #[must_use]
    pub fn as_hash_error(&self) -> Option<&ArgonError> {
        match self {
            Self::Hash(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_errors_pass_through() {
        let err = WorkerError::from(ArgonError::InvalidParameter("t"));
        assert_eq!(err.to_string(), ArgonError::InvalidParameter("t").to_string());
        assert_eq!(err.as_hash_error(), Some(&ArgonError::InvalidParameter("t")));
        assert!(WorkerError::Terminated.as_hash_error().is_none());
    }
}
