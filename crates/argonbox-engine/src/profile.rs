//! Engine binding profiles.
//!
//! Engine editions differ in how their hash entry point is called. Each
//! edition is a closed [`AbiProfile`], chosen once when the image is loaded;
//! the per-call path only dispatches on the stored choice.

use std::fmt;
use std::str::FromStr;

use argonbox_core::{ArgonError, ArgonResult, EngineVersion, HashParams};
use wasmtime::{ExternType, Module};

/// Export name of the explicit-scratch hash entry point.
pub const SCRATCH_ENTRY: &str = "a";
/// Export name of the version-aware hash entry point.
pub const VERSIONED_ENTRY: &str = "argon2_hash_wasm";
/// Exports every edition must provide besides its hash entry point.
pub const COMMON_FUNCTIONS: [&str; 3] = ["m", "w", "b"];
/// Constant-time comparator exports (32-byte and 64-byte).
pub const COMPARATORS: [&str; 2] = ["t", "s"];

/// Calling convention of the engine's hash entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbiProfile {
    /// `a(hash, hash_len, work, variant, blocks, passes, lanes, pwd, salt,
    /// pwd_len, salt_len, key, ad, key_len, ad_len)`.
    ///
    /// The host allocates the `m` KiB working area. Supports parallelism,
    /// always computes version `0x13`.
    ExplicitScratch,
    /// `argon2_hash_wasm(t, m, p, pwd, pwd_len, salt, salt_len, secret,
    /// secret_len, ad, ad_len, hash, hash_len, variant, version) -> status`.
    ///
    /// The engine manages its own working memory. Supports both versions,
    /// parallelism fixed at 1.
    VersionAware,
}

impl AbiProfile {
    /// Export name of this profile's hash entry point.
    #[must_use]
    pub const fn entry_point(self) -> &'static str {
        match self {
            Self::ExplicitScratch => SCRATCH_ENTRY,
            Self::VersionAware => VERSIONED_ENTRY,
        }
    }

    /// Reject parameters this calling convention cannot express.
    ///
    /// # Errors
    ///
    /// [`ArgonError::InvalidParameter`] with `"version"` for an explicit-scratch
    /// engine asked for anything but `0x13`, or `"p"` for a version-aware
    /// engine asked for more than one lane.
    pub fn admit(self, params: &HashParams) -> ArgonResult<()> {
        match self {
            Self::ExplicitScratch if params.version() != EngineVersion::V0x13 => {
                Err(ArgonError::InvalidParameter("version"))
            },
            Self::VersionAware if params.parallelism() != 1 => {
                Err(ArgonError::InvalidParameter("p"))
            },
            _ => Ok(()),
        }
    }

    /// Pick the profile for `module` according to `choice`.
    ///
    /// # Errors
    ///
    /// [`ArgonError::ImageLoad`] if the module exports neither entry point,
    /// or the forced profile's entry point is missing.
    pub fn detect(module: &Module, choice: ProfileChoice) -> ArgonResult<Self> {
        let has = |profile: AbiProfile| exports_function(module, profile.entry_point());
        match choice {
            ProfileChoice::Auto if has(Self::VersionAware) => Ok(Self::VersionAware),
            ProfileChoice::Auto if has(Self::ExplicitScratch) => Ok(Self::ExplicitScratch),
            ProfileChoice::Auto => Err(ArgonError::ImageLoad(format!(
                "engine exports no hash entry point (expected `{VERSIONED_ENTRY}` or `{SCRATCH_ENTRY}`)"
            ))),
            ProfileChoice::Forced(profile) if has(profile) => Ok(profile),
            ProfileChoice::Forced(profile) => Err(ArgonError::ImageLoad(format!(
                "engine does not export `{}` required by the {profile} profile",
                profile.entry_point()
            ))),
        }
    }
}

impl fmt::Display for AbiProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExplicitScratch => write!(f, "explicit-scratch"),
            Self::VersionAware => write!(f, "version-aware"),
        }
    }
}

/// How the loader picks an [`AbiProfile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProfileChoice {
    /// Version-aware if the engine exports it, otherwise explicit-scratch.
    #[default]
    Auto,
    /// Require a specific profile.
    Forced(AbiProfile),
}

impl FromStr for ProfileChoice {
    type Err = ArgonError;

    fn from_str(s: &str) -> ArgonResult<Self> {
        match s {
            "auto" => Ok(Self::Auto),
            "explicit-scratch" => Ok(Self::Forced(AbiProfile::ExplicitScratch)),
            "version-aware" => Ok(Self::Forced(AbiProfile::VersionAware)),
            other => Err(ArgonError::ImageLoad(format!("unknown engine profile '{other}'"))),
        }
    }
}

/// Where `verify` compares the recomputed hash with the expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifyStrategy {
    /// The engine's constant-time comparators (`t` for 32 bytes, `s` for 64).
    /// Other lengths fail with [`ArgonError::UnsupportedLength`].
    Engine,
    /// Constant-time comparison in the host. Any length.
    Host,
}

impl VerifyStrategy {
    /// Pick the strategy for `module` according to `choice`.
    ///
    /// # Errors
    ///
    /// [`ArgonError::ImageLoad`] if [`VerifyChoice::Engine`] is requested and
    /// the module lacks either comparator.
    pub fn detect(module: &Module, choice: VerifyChoice) -> ArgonResult<Self> {
        let has_comparators = COMPARATORS
            .iter()
            .all(|name| exports_function(module, name));
        match choice {
            VerifyChoice::Host => Ok(Self::Host),
            VerifyChoice::Auto if has_comparators => Ok(Self::Engine),
            VerifyChoice::Auto => Ok(Self::Host),
            VerifyChoice::Engine if has_comparators => Ok(Self::Engine),
            VerifyChoice::Engine => Err(ArgonError::ImageLoad(
                "engine comparators `t` and `s` are required but not exported".into(),
            )),
        }
    }
}

impl fmt::Display for VerifyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine => write!(f, "engine"),
            Self::Host => write!(f, "host"),
        }
    }
}

/// How the loader picks a [`VerifyStrategy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerifyChoice {
    /// Engine comparators when exported, host comparison otherwise.
    #[default]
    Auto,
    /// Require the engine comparators.
    Engine,
    /// Always compare in the host.
    Host,
}

impl FromStr for VerifyChoice {
    type Err = ArgonError;

    fn from_str(s: &str) -> ArgonResult<Self> {
        match s {
            "auto" => Ok(Self::Auto),
            "engine" => Ok(Self::Engine),
            "host" => Ok(Self::Host),
            other => Err(ArgonError::ImageLoad(format!("unknown verify strategy '{other}'"))),
        }
    }
}

/// Whether `module` exports a function named `name`.
pub(crate) fn exports_function(module: &Module, name: &str) -> bool {
    matches!(module.get_export(name), Some(ExternType::Func(_)))
}
