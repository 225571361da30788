//! Interrupting engine calls that are already running.
//!
//! Every engine built by [`EngineLoader`](crate::EngineLoader) has epoch
//! interruption enabled, and every store checks its handle's token each time
//! the engine epoch advances. [`CancelToken::cancel`] sets the token and
//! advances the epoch, so a call on that token's handles traps at its next
//! loop header or function entry. Handles on other tokens, or on none, keep
//! running.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use wasmtime::Engine;

/// Shared cancellation flag for the handles an orchestrator creates.
///
/// Obtained from [`EngineImage::cancel_token`](crate::EngineImage::cancel_token).
/// Clones share the flag. Cancellation is permanent.
#[derive(Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    engine: Engine,
}

impl CancelToken {
    pub(crate) fn new(engine: Engine) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            engine,
        }
    }

    /// Interrupt running calls and refuse new ones.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
        self.engine.increment_epoch();
    }

    /// Whether [`cancel`](Self::cancel) has run.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub(crate) fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
