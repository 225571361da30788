//! Messages exchanged with the isolated context.
//!
//! Requests carry a dispatcher-assigned id. Responses echo it back and are
//! matched to their caller by id only, never by arrival order.

use std::fmt;

use argonbox_core::{ArgonResult, Digest, HashOptions};
use argonbox_engine::HashOrchestrator;
use zeroize::Zeroizing;

/// Kind of a request, kept with its pending entry for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Argon2 hash.
    Hash,
    /// Argon2 verify.
    Verify,
    /// BLAKE2b.
    KeyedHash,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash => write!(f, "hash"),
            Self::Verify => write!(f, "verify"),
            Self::KeyedHash => write!(f, "keyed_hash"),
        }
    }
}

/// An orchestrator call with owned arguments.
pub(crate) enum Operation {
    Hash {
        password: Zeroizing<Vec<u8>>,
        salt: Vec<u8>,
        options: HashOptions,
    },
    Verify {
        password: Zeroizing<Vec<u8>>,
        salt: Vec<u8>,
        expected: Vec<u8>,
        options: HashOptions,
    },
    KeyedHash {
        message: Vec<u8>,
        length: usize,
    },
}

impl Operation {
    pub(crate) fn kind(&self) -> OperationKind {
        match self {
            Self::Hash { .. } => OperationKind::Hash,
            Self::Verify { .. } => OperationKind::Verify,
            Self::KeyedHash { .. } => OperationKind::KeyedHash,
        }
    }

    /// Run the call synchronously.
    pub(crate) fn execute(self, orchestrator: &HashOrchestrator) -> ArgonResult<Outcome> {
        match self {
            Self::Hash {
                password,
                salt,
                options,
            } => orchestrator
                .hash(&password, &salt, &options)
                .map(Outcome::Digest),
            Self::Verify {
                password,
                salt,
                expected,
                options,
            } => orchestrator
                .verify(&password, &salt, &expected, &options)
                .map(Outcome::Verified),
            Self::KeyedHash { message, length } => orchestrator
                .keyed_hash(&message, length)
                .map(Outcome::Digest),
        }
    }
}

/// Successful result of an [`Operation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Digest(Digest),
    Verified(bool),
}

/// Dispatcher to isolated context.
pub(crate) struct WorkerRequest {
    pub(crate) id: u64,
    pub(crate) operation: Operation,
}

/// Isolated context to dispatcher.
pub(crate) enum WorkerMessage {
    /// Sent once, before any request is processed.
    Ready,
    /// Settles request `id`.
    Response {
        id: u64,
        outcome: ArgonResult<Outcome>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_operation() {
        let op = Operation::KeyedHash {
            message: b"a".to_vec(),
            length: 32,
        };
        assert_eq!(op.kind(), OperationKind::KeyedHash);
        let op = Operation::Verify {
            password: Zeroizing::new(b"pw".to_vec()),
            salt: Vec::new(),
            expected: Vec::new(),
            options: HashOptions::new(),
        };
        assert_eq!(op.kind(), OperationKind::Verify);
        assert_eq!(OperationKind::KeyedHash.to_string(), "keyed_hash");
    }
}
