//! Engine image loading with builder-pattern configuration.
//!
//! [`EngineLoader`] compiles and checks an engine image once. The resulting
//! [`EngineImage`] is cheap to clone and is the factory for per-request
//! [`EngineHandle`]s.

use std::path::Path;
use std::sync::Arc;

use argonbox_core::{ArgonError, ArgonResult};
use tracing::{debug, info, warn};
use wasmtime::{Engine, ExternType, InstancePre, Linker, Module, Store, Trap, UpdateDeadline};

use crate::cancel::CancelToken;
use crate::handle::EngineHandle;
use crate::profile::{
    AbiProfile, COMMON_FUNCTIONS, ProfileChoice, VerifyChoice, VerifyStrategy, exports_function,
};
use crate::state::HandleState;

/// Factory for [`EngineImage`]s with shared load settings.
///
/// # Example
///
/// ```rust,no_run
/// use argonbox_engine::{EngineLoader, VerifyChoice};
///
/// let image = EngineLoader::new()
///     .with_memory_limit(256 * 1024 * 1024)
///     .with_verify_strategy(VerifyChoice::Host)
///     .load_file("engine.wasm".as_ref())?;
/// # Ok::<(), argonbox_core::ArgonError>(())
/// ```
#[derive(Clone, Default)]
pub struct EngineLoader {
    max_memory_bytes: Option<u64>,
    expected_hash: Option<String>,
    require_hash: bool,
    profile: ProfileChoice,
    verify: VerifyChoice,
}

impl std::fmt::Debug for EngineLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineLoader")
            .field("max_memory_bytes", &self.max_memory_bytes)
            .field("has_expected_hash", &self.expected_hash.is_some())
            .field("require_hash", &self.require_hash)
            .field("profile", &self.profile)
            .field("verify", &self.verify)
            .finish()
    }
}

impl EngineLoader {
    /// Loader with no memory cap, no integrity pin and automatic detection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap every instance's linear memory at `bytes`. `0` removes the cap.
    #[must_use]
    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = (bytes > 0).then_some(bytes);
        self
    }

    /// Pin the image to a hex-encoded BLAKE3 digest.
    #[must_use]
    pub fn with_expected_hash(mut self, hex: impl Into<String>) -> Self {
        self.expected_hash = Some(hex.into());
        self
    }

    /// Refuse images loaded without a pinned digest.
    #[must_use]
    pub fn with_require_hash(mut self, require: bool) -> Self {
        self.require_hash = require;
        self
    }

    /// Choose the binding profile instead of detecting it.
    #[must_use]
    pub fn with_profile(mut self, choice: ProfileChoice) -> Self {
        self.profile = choice;
        self
    }

    /// Choose where `verify` compares digests.
    #[must_use]
    pub fn with_verify_strategy(mut self, choice: VerifyChoice) -> Self {
        self.verify = choice;
        self
    }

    /// Read and load an image from disk.
    ///
    /// # Errors
    ///
    /// [`ArgonError::ImageLoad`] if the file cannot be read, plus everything
    /// [`load_bytes`](Self::load_bytes) returns.
    pub fn load_file(&self, path: &Path) -> ArgonResult<EngineImage> {
        let bytes = std::fs::read(path).map_err(|e| {
            ArgonError::ImageLoad(format!("failed to read {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), size = bytes.len(), "read engine image");
        self.load_bytes(&bytes)
    }

    /// Compile and check an image.
    ///
    /// Accepts a binary module or, for tests, its text format.
    ///
    /// # Errors
    ///
    /// - [`ArgonError::ImageHashMismatch`] if a pinned digest does not match.
    /// - [`ArgonError::ImageLoad`] if the module does not compile, lacks a
    ///   required export, or cannot be instantiated.
    pub fn load_bytes(&self, bytes: &[u8]) -> ArgonResult<EngineImage> {
        let digest = verify_hash(bytes, self.expected_hash.as_deref(), self.require_hash)?;

        let mut config = wasmtime::Config::new();
        config.epoch_interruption(true);
        let engine = Engine::new(&config)
            .map_err(|e| ArgonError::ImageLoad(format!("failed to create engine: {e:#}")))?;
        let module = Module::new(&engine, bytes)
            .map_err(|e| ArgonError::ImageLoad(format!("failed to compile engine: {e:#}")))?;

        let profile = AbiProfile::detect(&module, self.profile)?;
        let verify = VerifyStrategy::detect(&module, self.verify)?;
        check_exports(&module)?;

        let linker = Linker::<HandleState>::new(&engine);
        let pre = linker
            .instantiate_pre(&module)
            .map_err(|e| ArgonError::ImageLoad(format!("engine has unresolved imports: {e:#}")))?;

        let memory_limit = self
            .max_memory_bytes
            .map(|b| usize::try_from(b).unwrap_or(usize::MAX));
        let image = EngineImage {
            inner: Arc::new(ImageInner {
                engine,
                pre,
                profile,
                verify,
                memory_limit,
                digest,
            }),
        };

        // Surface start-function traps and initial memory over the cap at
        // load time rather than on the first request.
        drop(image.instantiate()?);

        info!(
            profile = %profile,
            verify = %verify,
            digest = %image.digest(),
            memory_limit = ?memory_limit,
            "engine image loaded"
        );
        Ok(image)
    }
}

/// Check the image digest against `expected`, returning the actual digest.
fn verify_hash(bytes: &[u8], expected: Option<&str>, require_hash: bool) -> ArgonResult<String> {
    let actual = blake3::hash(bytes).to_hex().to_string();
    match expected {
        Some(expected) => {
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(ArgonError::ImageHashMismatch {
                    expected: expected.to_string(),
                    actual,
                });
            }
            debug!(digest = %actual, "engine image hash verified");
        },
        None if require_hash => {
            return Err(ArgonError::ImageLoad(
                "engine image hash required but not configured".into(),
            ));
        },
        None => {
            warn!(digest = %actual, "engine image integrity not verified");
        },
    }
    Ok(actual)
}

fn check_exports(module: &Module) -> ArgonResult<()> {
    if !matches!(module.get_export("memory"), Some(ExternType::Memory(_))) {
        return Err(ArgonError::ImageLoad(
            "engine does not export `memory`".into(),
        ));
    }
    if let Some(missing) = COMMON_FUNCTIONS
        .iter()
        .find(|name| !exports_function(module, name))
    {
        return Err(ArgonError::ImageLoad(format!(
            "engine does not export `{missing}`"
        )));
    }
    Ok(())
}

struct ImageInner {
    engine: Engine,
    pre: InstancePre<HandleState>,
    profile: AbiProfile,
    verify: VerifyStrategy,
    memory_limit: Option<usize>,
    digest: String,
}

/// A compiled, checked engine image.
///
/// Cloning shares the compiled code. Every [`instantiate`](Self::instantiate)
/// call yields an independent instance with its own memory.
#[derive(Clone)]
pub struct EngineImage {
    inner: Arc<ImageInner>,
}

impl EngineImage {
    /// Binding profile detected or forced at load time.
    #[must_use]
    pub fn profile(&self) -> AbiProfile {
        self.inner.profile
    }

    /// Verification strategy chosen at load time.
    #[must_use]
    pub fn verify_strategy(&self) -> VerifyStrategy {
        self.inner.verify
    }

    /// Hex BLAKE3 digest of the image bytes.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.inner.digest
    }

    /// Per-instance linear memory cap in bytes, if any.
    #[must_use]
    pub fn memory_limit(&self) -> Option<usize> {
        self.inner.memory_limit
    }

    /// A new cancel token for handles created from this image.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken::new(self.inner.engine.clone())
    }

    /// Create a fresh instance.
    ///
    /// # Errors
    ///
    /// [`ArgonError::ImageLoad`] if instantiation fails or an export has the
    /// wrong signature.
    pub fn instantiate(&self) -> ArgonResult<EngineHandle> {
        self.instantiate_with(None)
    }

    /// Create a fresh instance whose calls trap once `cancel` fires.
    ///
    /// # Errors
    ///
    /// [`ArgonError::Cancelled`] if `cancel` has already fired, otherwise as
    /// [`instantiate`](Self::instantiate).
    pub fn instantiate_with(&self, cancel: Option<&CancelToken>) -> ArgonResult<EngineHandle> {
        let mut state = HandleState::new(self.inner.memory_limit);
        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(ArgonError::Cancelled);
            }
            state = state.with_cancel_flag(token.flag());
        }

        let mut store = Store::new(&self.inner.engine, state);
        store.limiter(|state| state);
        store.set_epoch_deadline(1);
        store.epoch_deadline_callback(|ctx| {
            if ctx.data().is_cancelled() {
                Err(Trap::Interrupt.into())
            } else {
                Ok(UpdateDeadline::Continue(1))
            }
        });
        let instance = self
            .inner
            .pre
            .instantiate(&mut store)
            .map_err(|e| ArgonError::ImageLoad(format!("failed to instantiate engine: {e:#}")))?;
        EngineHandle::bind(store, &instance, self.inner.profile, self.inner.verify)
    }
}

impl std::fmt::Debug for EngineImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineImage")
            .field("profile", &self.inner.profile)
            .field("verify", &self.inner.verify)
            .field("digest", &self.inner.digest)
            .field("memory_limit", &self.inner.memory_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"(module
        (memory (export "memory") 1)
        (func (export "m") (param i32) (result i32) i32.const 8)
        (func (export "w") (param i32 i32))
        (func (export "b") (param i32 i32 i32 i32))
        (func (export "argon2_hash_wasm")
            (param i32 i32 i32 i32 i32 i32 i32 i32 i32 i32 i32 i32 i32 i32 i32)
            (result i32)
            i32.const 0))"#;

    #[test]
    fn hash_verification_match() {
        let data = b"engine";
        let expected = blake3::hash(data).to_hex().to_string();
        assert_eq!(verify_hash(data, Some(&expected), true).unwrap(), expected);
        assert!(verify_hash(data, Some(&expected.to_uppercase()), false).is_ok());
    }

    #[test]
    fn hash_verification_mismatch() {
        let result = verify_hash(b"engine", Some(&"0".repeat(64)), false);
        assert!(matches!(result, Err(ArgonError::ImageHashMismatch { .. })));
    }

    #[test]
    fn hash_verification_none_is_ok() {
        assert!(verify_hash(b"engine", None, false).is_ok());
    }

    #[test]
    fn hash_verification_none_rejected_when_required() {
        assert!(matches!(
            verify_hash(b"engine", None, true),
            Err(ArgonError::ImageLoad(_))
        ));
    }

    #[test]
    fn loads_minimal_image() {
        let image = EngineLoader::new().load_bytes(MINIMAL.as_bytes()).unwrap();
        assert_eq!(image.profile(), AbiProfile::VersionAware);
        assert_eq!(image.verify_strategy(), VerifyStrategy::Host);
        assert_eq!(image.digest().len(), 64);
        assert!(image.memory_limit().is_none());
        let handle = image.instantiate().unwrap();
        assert_eq!(handle.memory_size(), 65536);
    }

    #[test]
    fn zero_memory_limit_means_unlimited() {
        let loader = EngineLoader::new().with_memory_limit(0);
        let image = loader.load_bytes(MINIMAL.as_bytes()).unwrap();
        assert!(image.memory_limit().is_none());
    }

    #[test]
    fn initial_memory_over_cap_is_rejected() {
        // One page is 64 KiB, the cap is half of that.
        let result = EngineLoader::new()
            .with_memory_limit(32 * 1024)
            .load_bytes(MINIMAL.as_bytes());
        assert!(matches!(result, Err(ArgonError::ImageLoad(_))));
    }

    #[test]
    fn missing_memory_export() {
        let wat = MINIMAL.replace(r#"(memory (export "memory") 1)"#, "(memory 1)");
        assert!(matches!(
            EngineLoader::new().load_bytes(wat.as_bytes()),
            Err(ArgonError::ImageLoad(_))
        ));
    }

    #[test]
    fn unresolved_import_is_rejected() {
        let wat = MINIMAL.replace(
            "(module",
            r#"(module (import "env" "clock" (func))"#,
        );
        assert!(matches!(
            EngineLoader::new().load_bytes(wat.as_bytes()),
            Err(ArgonError::ImageLoad(_))
        ));
    }

    #[test]
    fn garbage_does_not_compile() {
        assert!(matches!(
            EngineLoader::new().load_bytes(b"\0asm\x02garbage"),
            Err(ArgonError::ImageLoad(_))
        ));
    }

    #[test]
    fn cancelled_token_refuses_new_instances() {
        let image = EngineLoader::new().load_bytes(MINIMAL.as_bytes()).unwrap();
        let token = image.cancel_token();
        assert!(image.instantiate_with(Some(&token)).is_ok());
        token.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(
            image.instantiate_with(Some(&token)),
            Err(ArgonError::Cancelled)
        ));
        // Other handles on the same image are unaffected.
        assert!(image.instantiate().is_ok());
        assert!(!image.cancel_token().is_cancelled());
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            EngineLoader::new().load_file(&dir.path().join("absent.wasm")),
            Err(ArgonError::ImageLoad(_))
        ));
    }
}
