//! Argonbox Core - Shared types for the Argon2/BLAKE2b engine host.
//!
//! This crate provides:
//! - [`HashOptions`]: caller-facing, partially specified hashing options
//! - [`HashParams`]: the validated, immutable parameter set handed to an engine
//! - [`Digest`]: an owned hash output, detached from any engine memory
//! - [`ArgonError`]: the error taxonomy shared by the sync and async paths
//!
//! Nothing here touches the compute engine. Validation performed by
//! [`HashParams::resolve`] runs before any engine instance is created, so an
//! [`ArgonError::InvalidParameter`] never costs an allocation.
//!
//! # Example
//!
//! ```
//! use argonbox_core::{HashOptions, HashParams, Variant};
//!
//! let options = HashOptions::new()
//!     .with_time_cost(2)
//!     .with_variant(Variant::Argon2i);
//!
//! let params = HashParams::resolve(&options).unwrap();
//! assert_eq!(params.time_cost(), 2);
//! assert_eq!(params.memory_kib(), 65536);
//! assert_eq!(params.length(), 32);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;
pub mod status;

mod digest;
mod error;
mod options;
mod params;

pub use digest::{Digest, constant_time_eq};
pub use error::{ArgonError, ArgonResult};
pub use options::{
    DEFAULT_LENGTH, DEFAULT_MEMORY_KIB, DEFAULT_PARALLELISM, DEFAULT_TIME_COST, EngineVersion,
    HashOptions, Variant,
};
pub use params::{DEFAULT_KEYED_HASH_LENGTH, HashParams, MAX_KEYED_HASH_LENGTH, MIN_LENGTH};
