//! Per-instance store state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;
use wasmtime::ResourceLimiter;

/// Tables are only used for indirect calls inside the engine.
const MAX_TABLE_ELEMENTS: usize = 10_000;

/// Host state carried by every engine instance's store.
///
/// Enforces the optional linear memory cap. A refused growth surfaces inside
/// the engine as a failed `memory.grow`, which the engine reports as a null
/// allocation or an allocation status code.
///
/// Also carries the cancellation flag checked on every epoch tick.
#[derive(Debug, Clone, Default)]
pub struct HandleState {
    memory_limit_bytes: Option<usize>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl HandleState {
    pub(crate) fn new(memory_limit_bytes: Option<usize>) -> Self {
        Self {
            memory_limit_bytes,
            cancelled: None,
        }
    }

    pub(crate) fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    /// Whether the handle's cancel token has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }
}

impl ResourceLimiter for HandleState {
    fn memory_growing(
        &mut self,
        current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        match self.memory_limit_bytes {
            Some(limit) if desired > limit => {
                warn!(
                    current_bytes = current,
                    desired_bytes = desired,
                    limit_bytes = limit,
                    "engine memory grow rejected: exceeds limit"
                );
                Ok(false)
            },
            _ => Ok(true),
        }
    }

    fn table_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        Ok(desired <= MAX_TABLE_ELEMENTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_allows_growth() {
        let mut state = HandleState::new(None);
        assert!(state.memory_growing(0, usize::MAX, None).unwrap());
    }

    #[test]
    fn limit_refuses_growth_past_cap() {
        let mut state = HandleState::new(Some(1 << 20));
        assert!(state.memory_growing(0, 1 << 20, None).unwrap());
        assert!(!state.memory_growing(1 << 20, (1 << 20) + 65536, None).unwrap());
    }

    #[test]
    fn cancel_flag_is_observed() {
        let flag = Arc::new(AtomicBool::new(false));
        let state = HandleState::new(None).with_cancel_flag(Arc::clone(&flag));
        assert!(!state.is_cancelled());
        flag.store(true, Ordering::Release);
        assert!(state.is_cancelled());
        assert!(!HandleState::default().is_cancelled());
    }

    #[test]
    fn table_cap() {
        let mut state = HandleState::default();
        assert!(state.table_growing(0, 10, None).unwrap());
        assert!(!state.table_growing(0, 10_001, None).unwrap());
    }
}
