//! Hash orchestration over per-call engine instances.
//!
//! Every operation follows the same shape: validate, instantiate a fresh
//! [`EngineHandle`], place inputs, invoke, copy the output out and drop the
//! handle. Nothing survives from one call to the next inside the engine.

use argonbox_core::{
    ArgonError, ArgonResult, Digest, HashOptions, HashParams, MAX_KEYED_HASH_LENGTH,
};
use tracing::debug;

use crate::bridge::ForeignSpan;
use crate::cancel::CancelToken;
use crate::handle::{EngineHandle, HashSpans};
use crate::loader::EngineImage;
use crate::profile::{AbiProfile, VerifyStrategy};

/// Synchronous `hash` / `verify` / `keyed_hash` over an [`EngineImage`].
///
/// Blocks the calling thread for the duration of each computation. Use
/// `argonbox-worker` to run the same operations off the caller's thread.
///
/// With a [`CancelToken`] attached, firing the token interrupts the call in
/// progress with [`ArgonError::Cancelled`] and fails every later call the
/// same way.
#[derive(Debug, Clone)]
pub struct HashOrchestrator {
    image: EngineImage,
    defaults: HashOptions,
    cancel: Option<CancelToken>,
}

impl HashOrchestrator {
    /// Orchestrator with the built-in defaults.
    #[must_use]
    pub fn new(image: EngineImage) -> Self {
        Self {
            image,
            defaults: HashOptions::default(),
            cancel: None,
        }
    }

    /// Attach `token` to every handle this orchestrator creates.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Use `defaults` for every option a call leaves unset.
    #[must_use]
    pub fn with_defaults(mut self, defaults: HashOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// The engine image requests are run against.
    #[must_use]
    pub fn image(&self) -> &EngineImage {
        &self.image
    }

    /// Defaults applied under each call's options.
    #[must_use]
    pub fn defaults(&self) -> &HashOptions {
        &self.defaults
    }

    /// The attached cancel token, if any.
    #[must_use]
    pub fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel.as_ref()
    }

    /// Resolve `options` against the configured and built-in defaults and
    /// check the bound engine can express them.
    ///
    /// # Errors
    ///
    /// [`ArgonError::InvalidParameter`] naming the offending option.
    pub fn resolve(&self, options: &HashOptions) -> ArgonResult<HashParams> {
        let params = HashParams::resolve(&options.or(&self.defaults))?;
        self.image.profile().admit(&params)?;
        Ok(params)
    }

    /// Compute the Argon2 digest of `password` with `salt`.
    ///
    /// # Errors
    ///
    /// - [`ArgonError::InvalidParameter`] before any engine work.
    /// - [`ArgonError::AllocationError`] if the engine runs out of memory.
    /// - [`ArgonError::EngineError`] for a nonzero engine status.
    /// - [`ArgonError::Trap`] if the engine traps.
    /// - [`ArgonError::Cancelled`] if the attached cancel token fires.
    pub fn hash(&self, password: &[u8], salt: &[u8], options: &HashOptions) -> ArgonResult<Digest> {
        let params = self.resolve(options)?;
        let mut handle = self.instantiate()?;
        let out = run_hash(&mut handle, password, salt, &params)?;
        let digest = Digest::from_vec(handle.copy_out(out)?);
        debug!(
            variant = %params.variant(),
            version = %params.version(),
            t = params.time_cost(),
            m = params.memory_kib(),
            p = params.parallelism(),
            length = params.length(),
            "argon2 hash computed"
        );
        Ok(digest)
    }

    /// Recompute the digest and compare it with `expected` in constant time.
    ///
    /// A length mismatch between `expected` and the configured output length
    /// is `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Everything [`hash`](Self::hash) returns, plus
    /// [`ArgonError::UnsupportedLength`] when the engine comparators are in
    /// use and the length is neither 32 nor 64.
    pub fn verify(
        &self,
        password: &[u8],
        salt: &[u8],
        expected: &[u8],
        options: &HashOptions,
    ) -> ArgonResult<bool> {
        let params = self.resolve(options)?;
        let length = usize::try_from(params.length()).unwrap_or(usize::MAX);
        if expected.len() != length {
            debug!(
                expected_len = expected.len(),
                length, "verify length mismatch"
            );
            return Ok(false);
        }

        let matched = match self.image.verify_strategy() {
            VerifyStrategy::Engine => {
                if !matches!(length, 32 | 64) {
                    return Err(ArgonError::UnsupportedLength(length));
                }
                let mut handle = self.instantiate()?;
                let out = run_hash(&mut handle, password, salt, &params)?;
                let expected = handle.place(expected)?;
                handle.call_compare(out, expected)?
            },
            VerifyStrategy::Host => {
                let mut handle = self.instantiate()?;
                let out = run_hash(&mut handle, password, salt, &params)?;
                Digest::from_vec(handle.copy_out(out)?).ct_eq_bytes(expected)
            },
        };
        debug!(strategy = %self.image.verify_strategy(), matched, "argon2 verify completed");
        Ok(matched)
    }

    /// Unkeyed BLAKE2b of `message` with a `length`-byte output.
    ///
    /// # Errors
    ///
    /// [`ArgonError::InvalidParameter`] with `"length"` unless
    /// `1 <= length <= 64`, otherwise allocation and trap errors.
    pub fn keyed_hash(&self, message: &[u8], length: usize) -> ArgonResult<Digest> {
        if !(1..=MAX_KEYED_HASH_LENGTH).contains(&length) {
            return Err(ArgonError::InvalidParameter("length"));
        }
        let out_len = u32::try_from(length).map_err(|_| ArgonError::InvalidParameter("length"))?;

        let mut handle = self.instantiate()?;
        let out = handle.allocate(out_len)?;
        let msg = handle.place(message)?;
        let called = handle.call_blake2b(out, msg);
        handle.release(msg)?;
        called?;

        let digest = Digest::from_vec(handle.copy_out(out)?);
        debug!(length, message_len = message.len(), "blake2b hash computed");
        Ok(digest)
    }

    fn instantiate(&self) -> ArgonResult<EngineHandle> {
        self.image.instantiate_with(self.cancel.as_ref())
    }
}

/// Place every input, invoke the hash entry point and wipe the secrets.
///
/// Returns the output span, still inside `handle`.
pub(crate) fn run_hash(
    handle: &mut EngineHandle,
    password: &[u8],
    salt: &[u8],
    params: &HashParams,
) -> ArgonResult<ForeignSpan> {
    let out = handle.allocate(params.length())?;
    let work = match handle.profile() {
        AbiProfile::ExplicitScratch => {
            let size = u32::try_from(params.memory_bytes()).map_err(|_| {
                ArgonError::AllocationError {
                    requested: params.memory_bytes(),
                }
            })?;
            handle.allocate(size)?
        },
        AbiProfile::VersionAware => ForeignSpan::null(),
    };
    let pwd = handle.place(password)?;
    let salt = handle.place(salt)?;
    let secret = handle.place_optional(params.secret())?;
    let ad = handle.place_optional(params.ad())?;

    let spans = HashSpans {
        out,
        work,
        pwd,
        salt,
        secret,
        ad,
    };
    let called = handle.call_hash(&spans, params);

    // Wipe secret material whether or not the engine succeeded.
    let wiped = handle
        .release(pwd)
        .and_then(|()| handle.release(secret));
    called?;
    wiped?;
    Ok(out)
}
