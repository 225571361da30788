//! Telemetry error types.

use thiserror::Error;

/// Errors raised while building or installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A logging setting could not be understood.
    #[error("invalid logging {field}: {message}")]
    Invalid {
        /// Which setting (`"format"`, `"target"`, `"filter"`).
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Install(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
