//! Error types shared by the engine host and the async worker.

use thiserror::Error;

use crate::status;

/// Errors surfaced by hashing operations.
///
/// The first four variants are the caller-visible taxonomy: they describe what
/// went wrong with a request. The remaining variants describe a broken engine
/// image or a misbehaving engine.
///
/// `Clone` so that errors raised inside a worker thread can be forwarded
/// verbatim to the awaiting caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgonError {
    /// A caller precondition was violated. Raised before any engine call.
    ///
    /// The payload names the offending option (`"t"`, `"p"`, `"m"`,
    /// `"length"`, `"version"`, `"variant"`).
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// The engine could not satisfy an allocation.
    ///
    /// Usually means the requested memory cost does not fit the engine's
    /// linear memory (or the configured memory limit).
    #[error("engine could not allocate {requested} bytes")]
    AllocationError {
        /// Number of bytes requested.
        requested: u64,
    },

    /// The engine's hash entry point returned a nonzero status.
    #[error("engine returned status {0}")]
    EngineError(i32),

    /// The engine comparators only handle 32- and 64-byte hashes.
    #[error("unsupported hash length for engine comparison: {0}")]
    UnsupportedLength(usize),

    /// The engine image could not be read, compiled, linked or instantiated,
    /// or does not export the expected entry points.
    #[error("engine image error: {0}")]
    ImageLoad(String),

    /// The engine image does not match its expected BLAKE3 digest.
    #[error("engine image hash mismatch: expected {expected}, got {actual}")]
    ImageHashMismatch {
        /// Expected digest (hex).
        expected: String,
        /// Actual digest (hex).
        actual: String,
    },

    /// The engine trapped while executing an entry point.
    #[error("engine trapped: {0}")]
    Trap(String),

    /// The call was interrupted because its context is being torn down.
    #[error("engine call cancelled")]
    Cancelled,

    /// A span reached outside the engine's linear memory.
    #[error("engine memory access out of bounds: addr={addr}, len={len}")]
    OutOfBounds {
        /// Base address of the span.
        addr: u32,
        /// Length of the span.
        len: u32,
    },
}

impl ArgonError {
    /// Symbolic name of the engine status carried by [`ArgonError::EngineError`].
    #[must_use]
    pub fn status_name(&self) -> Option<&'static str> {
        match self {
            Self::EngineError(code) => Some(status::name(*code)),
            _ => None,
        }
    }

    /// Whether the caller can recover by changing its inputs or cost
    /// parameters (as opposed to a broken engine image).
    #[must_use]
    pub fn is_caller_fixable(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter(_) | Self::AllocationError { .. } | Self::UnsupportedLength(_)
        )
    }
}

/// Result type for hashing operations.
pub type ArgonResult<T> = Result<T, ArgonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_parameter() {
        let err = ArgonError::InvalidParameter("m");
        assert_eq!(err.to_string(), "invalid parameter: m");
    }

    #[test]
    fn engine_error_status_name() {
        let err = ArgonError::EngineError(-6);
        assert_eq!(err.status_name(), Some("ARGON2_SALT_TOO_SHORT"));
        assert_eq!(ArgonError::Trap("x".into()).status_name(), None);
    }

    #[test]
    fn caller_fixable_classification() {
        assert!(ArgonError::InvalidParameter("t").is_caller_fixable());
        assert!(ArgonError::AllocationError { requested: 1 }.is_caller_fixable());
        assert!(ArgonError::UnsupportedLength(48).is_caller_fixable());
        assert!(!ArgonError::EngineError(-22).is_caller_fixable());
        assert!(!ArgonError::ImageLoad("missing export".into()).is_caller_fixable());
        assert!(!ArgonError::Cancelled.is_caller_fixable());
    }
}
