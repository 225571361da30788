//! Argonbox engine host.
//!
//! Runs the sandboxed Argon2/BLAKE2b compute engine under wasmtime:
//!
//! - [`EngineLoader`] compiles and checks an engine image once.
//! - [`EngineImage`] hands out a fresh [`EngineHandle`] per request, each
//!   with its own linear memory.
//! - [`MemoryBridge`] moves bytes in and out of that memory.
//! - [`HashOrchestrator`] exposes `hash`, `verify` and `keyed_hash`.
//!
//! ```rust,no_run
//! use argonbox_core::HashOptions;
//! use argonbox_engine::{EngineLoader, HashOrchestrator};
//!
//! let image = EngineLoader::new().load_file("engine.wasm".as_ref())?;
//! let argon = HashOrchestrator::new(image);
//! let digest = argon.hash(b"password", b"somesalt", &HashOptions::new())?;
//! assert!(argon.verify(b"password", b"somesalt", digest.as_bytes(), &HashOptions::new())?);
//! # Ok::<(), argonbox_core::ArgonError>(())
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![warn(unreachable_pub)]

mod bridge;
mod cancel;
mod config;
mod handle;
mod loader;
mod orchestrator;
mod profile;
mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use bridge::{ForeignSpan, MemoryBridge};
pub use cancel::CancelToken;
pub use config::defaults_from_config;
pub use handle::EngineHandle;
pub use loader::{EngineImage, EngineLoader};
pub use orchestrator::HashOrchestrator;
pub use profile::{
    AbiProfile, COMMON_FUNCTIONS, COMPARATORS, ProfileChoice, SCRATCH_ENTRY, VERSIONED_ENTRY,
    VerifyChoice, VerifyStrategy,
};
pub use state::HandleState;

use argonbox_core::ArgonError;

/// Map a failed engine call to [`ArgonError::Trap`], or
/// [`ArgonError::Cancelled`] for an epoch interrupt.
pub(crate) fn trap(err: wasmtime::Error) -> ArgonError {
    match err.downcast_ref::<wasmtime::Trap>() {
        Some(wasmtime::Trap::Interrupt) => ArgonError::Cancelled,
        Some(trap) => ArgonError::Trap(trap.to_string()),
        None => ArgonError::Trap(format!("{err:#}")),
    }
}
