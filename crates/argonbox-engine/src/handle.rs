//! One engine instance, bound to a private linear memory.

use argonbox_core::{ArgonError, ArgonResult, HashParams};
use wasmtime::{Instance, Store, TypedFunc, WasmParams, WasmResults};

use crate::bridge::{ForeignSpan, MemoryBridge};
use crate::profile::{AbiProfile, COMPARATORS, VerifyStrategy};
use crate::state::HandleState;

type U32x15 = (
    u32,
    u32,
    u32,
    u32,
    u32,
    u32,
    u32,
    u32,
    u32,
    u32,
    u32,
    u32,
    u32,
    u32,
    u32,
);

enum HashEntry {
    ExplicitScratch(TypedFunc<U32x15, ()>),
    VersionAware(TypedFunc<U32x15, i32>),
}

struct Comparators {
    eq32: TypedFunc<(u32, u32), i32>,
    eq64: TypedFunc<(u32, u32), i32>,
}

/// Spans handed to the hash entry point.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HashSpans {
    pub(crate) out: ForeignSpan,
    pub(crate) work: ForeignSpan,
    pub(crate) pwd: ForeignSpan,
    pub(crate) salt: ForeignSpan,
    pub(crate) secret: ForeignSpan,
    pub(crate) ad: ForeignSpan,
}

/// A fresh engine instance used for exactly one request.
///
/// Owns its store, so its linear memory is never shared. Dropping the handle
/// discards the instance together with everything left in its memory.
pub struct EngineHandle {
    store: Store<HandleState>,
    bridge: MemoryBridge,
    profile: AbiProfile,
    hash: HashEntry,
    blake2b: TypedFunc<(u32, u32, u32, u32), ()>,
    comparators: Option<Comparators>,
}

fn typed<P, R>(
    instance: &Instance,
    store: &mut Store<HandleState>,
    name: &str,
) -> ArgonResult<TypedFunc<P, R>>
where
    P: WasmParams,
    R: WasmResults,
{
    instance
        .get_typed_func::<P, R>(&mut *store, name)
        .map_err(|e| ArgonError::ImageLoad(format!("export `{name}`: {e:#}")))
}

impl EngineHandle {
    pub(crate) fn bind(
        mut store: Store<HandleState>,
        instance: &Instance,
        profile: AbiProfile,
        verify: VerifyStrategy,
    ) -> ArgonResult<Self> {
        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| ArgonError::ImageLoad("engine does not export `memory`".into()))?;
        let bridge = MemoryBridge::new(
            memory,
            typed(instance, &mut store, "m")?,
            typed(instance, &mut store, "w")?,
        );

        let entry = profile.entry_point();
        let hash = match profile {
            AbiProfile::ExplicitScratch => {
                HashEntry::ExplicitScratch(typed(instance, &mut store, entry)?)
            },
            AbiProfile::VersionAware => HashEntry::VersionAware(typed(instance, &mut store, entry)?),
        };
        let blake2b = typed(instance, &mut store, "b")?;
        let comparators = match verify {
            VerifyStrategy::Engine => Some(Comparators {
                eq32: typed(instance, &mut store, COMPARATORS[0])?,
                eq64: typed(instance, &mut store, COMPARATORS[1])?,
            }),
            VerifyStrategy::Host => None,
        };

        Ok(Self {
            store,
            bridge,
            profile,
            hash,
            blake2b,
            comparators,
        })
    }

    /// Binding profile of this instance.
    #[must_use]
    pub fn profile(&self) -> AbiProfile {
        self.profile
    }

    /// Current size of the instance's linear memory in bytes.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        self.bridge.memory_size(&self.store)
    }

    /// See [`MemoryBridge::allocate`].
    ///
    /// # Errors
    ///
    /// [`ArgonError::AllocationError`] if the engine cannot allocate.
    pub fn allocate(&mut self, size: u32) -> ArgonResult<ForeignSpan> {
        self.bridge.allocate(&mut self.store, size)
    }

    /// See [`MemoryBridge::place`].
    ///
    /// # Errors
    ///
    /// [`ArgonError::AllocationError`] if the engine cannot allocate.
    pub fn place(&mut self, bytes: &[u8]) -> ArgonResult<ForeignSpan> {
        self.bridge.place(&mut self.store, bytes)
    }

    /// See [`MemoryBridge::place_optional`].
    ///
    /// # Errors
    ///
    /// [`ArgonError::AllocationError`] if the engine cannot allocate.
    pub fn place_optional(&mut self, bytes: Option<&[u8]>) -> ArgonResult<ForeignSpan> {
        self.bridge.place_optional(&mut self.store, bytes)
    }

    /// See [`MemoryBridge::read`].
    ///
    /// # Errors
    ///
    /// [`ArgonError::OutOfBounds`] for a span outside engine memory.
    pub fn read(&self, span: ForeignSpan) -> ArgonResult<&[u8]> {
        self.bridge.read(&self.store, span)
    }

    /// Copy `span` into a host-owned buffer.
    ///
    /// # Errors
    ///
    /// [`ArgonError::OutOfBounds`] for a span outside engine memory.
    pub fn copy_out(&self, span: ForeignSpan) -> ArgonResult<Vec<u8>> {
        self.read(span).map(<[u8]>::to_vec)
    }

    /// See [`MemoryBridge::release`].
    ///
    /// # Errors
    ///
    /// [`ArgonError::Trap`] if the engine's wipe export traps.
    pub fn release(&mut self, span: ForeignSpan) -> ArgonResult<()> {
        self.bridge.release(&mut self.store, span)
    }

    /// Invoke the hash entry point with already-placed inputs.
    pub(crate) fn call_hash(&mut self, spans: &HashSpans, params: &HashParams) -> ArgonResult<()> {
        let HashSpans {
            out,
            work,
            pwd,
            salt,
            secret,
            ad,
        } = *spans;
        match &self.hash {
            HashEntry::ExplicitScratch(entry) => entry
                .call(
                    &mut self.store,
                    (
                        out.addr(),
                        out.len(),
                        work.addr(),
                        params.variant().code(),
                        params.memory_kib(),
                        params.time_cost(),
                        params.parallelism(),
                        pwd.addr(),
                        salt.addr(),
                        pwd.len(),
                        salt.len(),
                        secret.addr(),
                        ad.addr(),
                        secret.len(),
                        ad.len(),
                    ),
                )
                .map_err(crate::trap),
            HashEntry::VersionAware(entry) => {
                let status = entry
                    .call(
                        &mut self.store,
                        (
                            params.time_cost(),
                            params.memory_kib(),
                            params.parallelism(),
                            pwd.addr(),
                            pwd.len(),
                            salt.addr(),
                            salt.len(),
                            secret.addr(),
                            secret.len(),
                            ad.addr(),
                            ad.len(),
                            out.addr(),
                            out.len(),
                            params.variant().code(),
                            params.version().code(),
                        ),
                    )
                    .map_err(crate::trap)?;
                if status == 0 {
                    Ok(())
                } else {
                    Err(ArgonError::EngineError(status))
                }
            },
        }
    }

    /// Invoke the keyed-hash entry point.
    pub(crate) fn call_blake2b(&mut self, out: ForeignSpan, msg: ForeignSpan) -> ArgonResult<()> {
        self.blake2b
            .call(&mut self.store, (out.addr(), out.len(), msg.addr(), msg.len()))
            .map_err(crate::trap)
    }

    /// Compare two equally sized spans with the engine's constant-time
    /// comparator for their length.
    pub(crate) fn call_compare(&mut self, a: ForeignSpan, b: ForeignSpan) -> ArgonResult<bool> {
        let comparators = self.comparators.as_ref().ok_or_else(|| {
            ArgonError::ImageLoad("engine comparators are not bound for this image".into())
        })?;
        let compare = match (a.len(), b.len()) {
            (32, 32) => &comparators.eq32,
            (64, 64) => &comparators.eq64,
            (len, _) => {
                return Err(ArgonError::UnsupportedLength(
                    usize::try_from(len).unwrap_or(usize::MAX),
                ));
            },
        };
        let status = compare
            .call(&mut self.store, (a.addr(), b.addr()))
            .map_err(crate::trap)?;
        Ok(status == 0)
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("profile", &self.profile)
            .field("memory_size", &self.memory_size())
            .field("has_comparators", &self.comparators.is_some())
            .finish_non_exhaustive()
    }
}
