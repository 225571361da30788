//! Memory bridge between the host and one engine instance's linear memory.
//!
//! This is the only module that deals in raw engine addresses. Every span it
//! hands out is bounds-checked against the instance's memory before it is
//! returned, so later reads and writes through the same span cannot go out
//! of range (engine memory only grows).

use std::ops::Range;

use argonbox_core::{ArgonError, ArgonResult};
use tracing::trace;
use wasmtime::{Memory, Store, TypedFunc};

use crate::state::HandleState;

/// A live allocation inside one engine instance's linear memory.
///
/// Only meaningful together with the [`EngineHandle`](crate::EngineHandle)
/// that produced it. The null span `(0, 0)` stands for an absent optional
/// input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignSpan {
    addr: u32,
    len: u32,
}

impl ForeignSpan {
    /// The null span, passed to the engine for absent inputs.
    #[must_use]
    pub const fn null() -> Self {
        Self { addr: 0, len: 0 }
    }

    #[cfg(test)]
    pub(crate) const fn new(addr: u32, len: u32) -> Self {
        Self { addr, len }
    }

    /// Whether this is the null span.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.addr == 0
    }

    /// Base address in engine memory.
    #[must_use]
    pub const fn addr(&self) -> u32 {
        self.addr
    }

    /// Length in bytes.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// Whether the span covers zero bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn range(&self) -> ArgonResult<Range<usize>> {
        let out_of_bounds = || ArgonError::OutOfBounds {
            addr: self.addr,
            len: self.len,
        };
        let start = usize::try_from(self.addr).map_err(|_| out_of_bounds())?;
        let len = usize::try_from(self.len).map_err(|_| out_of_bounds())?;
        let end = start.checked_add(len).ok_or_else(out_of_bounds)?;
        Ok(start..end)
    }
}

/// Allocates, reads, writes and releases spans in an engine instance's
/// linear memory through the engine's own allocator exports.
pub struct MemoryBridge {
    /// Engine linear memory (`memory` export).
    memory: Memory,
    /// Engine allocator: `m(size) -> addr`, `0` on failure.
    alloc: TypedFunc<u32, u32>,
    /// Engine wipe-and-free: `w(addr, size)`.
    wipe: TypedFunc<(u32, u32), ()>,
}

impl MemoryBridge {
    pub(crate) fn new(
        memory: Memory,
        alloc: TypedFunc<u32, u32>,
        wipe: TypedFunc<(u32, u32), ()>,
    ) -> Self {
        Self {
            memory,
            alloc,
            wipe,
        }
    }

    /// Request `size` bytes from the engine allocator.
    ///
    /// # Errors
    ///
    /// [`ArgonError::AllocationError`] if the engine returns a null address,
    /// an address whose span does not fit its memory, or traps.
    pub fn allocate(&self, store: &mut Store<HandleState>, size: u32) -> ArgonResult<ForeignSpan> {
        let failed = ArgonError::AllocationError {
            requested: u64::from(size),
        };
        let addr = self.alloc.call(&mut *store, size).map_err(|e| {
            trace!(size, error = %e, "engine allocator trapped");
            failed.clone()
        })?;
        if addr == 0 {
            return Err(failed);
        }

        let span = ForeignSpan { addr, len: size };
        let range = span.range().map_err(|_| failed.clone())?;
        if range.end > self.memory.data_size(&*store) {
            return Err(failed);
        }
        Ok(span)
    }

    /// Copy `bytes` into `span`. `bytes.len()` must equal the span length.
    ///
    /// # Errors
    ///
    /// [`ArgonError::OutOfBounds`] if the lengths differ or the span does not
    /// lie inside engine memory.
    pub fn write(
        &self,
        store: &mut Store<HandleState>,
        span: ForeignSpan,
        bytes: &[u8],
    ) -> ArgonResult<()> {
        let dest = self.view_mut(store, span)?;
        if dest.len() != bytes.len() {
            return Err(ArgonError::OutOfBounds {
                addr: span.addr,
                len: span.len,
            });
        }
        dest.copy_from_slice(bytes);
        Ok(())
    }

    /// View the bytes under `span`.
    ///
    /// The view borrows the store, so it cannot outlive the next allocation
    /// or the instance itself. Copy out before returning data to callers.
    ///
    /// # Errors
    ///
    /// [`ArgonError::OutOfBounds`] if the span does not lie inside engine
    /// memory.
    pub fn read<'s>(
        &self,
        store: &'s Store<HandleState>,
        span: ForeignSpan,
    ) -> ArgonResult<&'s [u8]> {
        let range = span.range()?;
        self.memory
            .data(store)
            .get(range)
            .ok_or(ArgonError::OutOfBounds {
                addr: span.addr,
                len: span.len,
            })
    }

    /// Zero `span` and hand it back to the engine allocator.
    ///
    /// The null span is a no-op. The span must not be read afterwards.
    ///
    /// # Errors
    ///
    /// [`ArgonError::OutOfBounds`] for a span outside engine memory,
    /// [`ArgonError::Trap`] if the engine's wipe export traps.
    pub fn release(&self, store: &mut Store<HandleState>, span: ForeignSpan) -> ArgonResult<()> {
        if span.is_null() {
            return Ok(());
        }
        self.view_mut(store, span)?.fill(0);
        self.wipe
            .call(&mut *store, (span.addr, span.len))
            .map_err(crate::trap)
    }

    /// Allocate a span sized for `bytes` and copy them in.
    ///
    /// # Errors
    ///
    /// [`ArgonError::AllocationError`] if the input does not fit a 32-bit
    /// engine address space or the engine cannot allocate it.
    pub fn place(&self, store: &mut Store<HandleState>, bytes: &[u8]) -> ArgonResult<ForeignSpan> {
        let size = u32::try_from(bytes.len()).map_err(|_| ArgonError::AllocationError {
            requested: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
        })?;
        let span = self.allocate(store, size)?;
        self.write(store, span, bytes)?;
        Ok(span)
    }

    /// Like [`place`](Self::place), but `None` yields the null span without
    /// touching the allocator.
    ///
    /// # Errors
    ///
    /// Same as [`place`](Self::place).
    pub fn place_optional(
        &self,
        store: &mut Store<HandleState>,
        bytes: Option<&[u8]>,
    ) -> ArgonResult<ForeignSpan> {
        match bytes {
            Some(bytes) => self.place(store, bytes),
            None => Ok(ForeignSpan::null()),
        }
    }

    /// Current size of engine memory in bytes.
    pub fn memory_size(&self, store: &Store<HandleState>) -> usize {
        self.memory.data_size(store)
    }

    fn view_mut<'s>(
        &self,
        store: &'s mut Store<HandleState>,
        span: ForeignSpan,
    ) -> ArgonResult<&'s mut [u8]> {
        let range = span.range()?;
        self.memory
            .data_mut(store)
            .get_mut(range)
            .ok_or(ArgonError::OutOfBounds {
                addr: span.addr,
                len: span.len,
            })
    }
}

impl std::fmt::Debug for MemoryBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBridge").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_span() {
        let span = ForeignSpan::null();
        assert!(span.is_null());
        assert!(span.is_empty());
        assert_eq!(span.range().unwrap(), 0..0);
    }
}
