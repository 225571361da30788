//! Caller-facing hashing options.

use std::fmt;
use std::str::FromStr;

use zeroize::Zeroizing;

use crate::error::{ArgonError, ArgonResult};

/// Default time cost (passes over memory).
pub const DEFAULT_TIME_COST: u32 = 3;
/// Default memory cost in KiB (64 MiB).
pub const DEFAULT_MEMORY_KIB: u32 = 1 << 16;
/// Default parallelism (lanes).
pub const DEFAULT_PARALLELISM: u32 = 1;
/// Default output length in bytes.
pub const DEFAULT_LENGTH: u32 = 32;

/// Argon2 variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Data-dependent addressing.
    Argon2d,
    /// Data-independent addressing.
    Argon2i,
    /// Hybrid (first half pass data-independent).
    #[default]
    Argon2id,
}

impl Variant {
    /// All variants, in engine code order.
    pub const ALL: [Variant; 3] = [Variant::Argon2d, Variant::Argon2i, Variant::Argon2id];

    /// Numeric code passed to the engine.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Argon2d => 0,
            Self::Argon2i => 1,
            Self::Argon2id => 2,
        }
    }

    /// Lowercase name (`argon2d`, `argon2i`, `argon2id`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Argon2d => "argon2d",
            Self::Argon2i => "argon2i",
            Self::Argon2id => "argon2id",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = ArgonError;

    fn from_str(s: &str) -> ArgonResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "argon2d" | "d" => Ok(Self::Argon2d),
            "argon2i" | "i" => Ok(Self::Argon2i),
            "argon2id" | "id" => Ok(Self::Argon2id),
            _ => Err(ArgonError::InvalidParameter("variant")),
        }
    }
}

/// Argon2 algorithm version understood by version-aware engines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EngineVersion {
    /// Version 1.0 (`0x10`).
    V0x10,
    /// Version 1.3 (`0x13`), the latest.
    #[default]
    V0x13,
}

impl EngineVersion {
    /// Latest supported version.
    pub const LATEST: EngineVersion = EngineVersion::V0x13;

    /// Numeric code passed to the engine.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::V0x10 => 0x10,
            Self::V0x13 => 0x13,
        }
    }
}

impl TryFrom<u32> for EngineVersion {
    type Error = ArgonError;

    fn try_from(value: u32) -> ArgonResult<Self> {
        match value {
            0x10 => Ok(Self::V0x10),
            0x13 => Ok(Self::V0x13),
            _ => Err(ArgonError::InvalidParameter("version")),
        }
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.code())
    }
}

/// Partially specified hashing options.
///
/// Every field is optional; omitted fields are filled from orchestrator
/// defaults and then from the built-in defaults when the options are
/// resolved into [`HashParams`](crate::HashParams).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HashOptions {
    /// Time cost `t`.
    pub time_cost: Option<u32>,
    /// Memory cost `m`, in KiB.
    pub memory_kib: Option<u32>,
    /// Parallelism `p`.
    pub parallelism: Option<u32>,
    /// Argon2 variant.
    pub variant: Option<Variant>,
    /// Engine version.
    pub version: Option<EngineVersion>,
    /// Output length in bytes.
    pub length: Option<u32>,
    /// Optional secret (pepper). Wiped from host memory on drop.
    pub secret: Option<Zeroizing<Vec<u8>>>,
    /// Optional associated data.
    pub ad: Option<Vec<u8>>,
}

impl HashOptions {
    /// Options with every field unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time cost.
    #[must_use]
    pub fn with_time_cost(mut self, t: u32) -> Self {
        self.time_cost = Some(t);
        self
    }

    /// Set the memory cost in KiB.
    #[must_use]
    pub fn with_memory_kib(mut self, m: u32) -> Self {
        self.memory_kib = Some(m);
        self
    }

    /// Set the parallelism.
    #[must_use]
    pub fn with_parallelism(mut self, p: u32) -> Self {
        self.parallelism = Some(p);
        self
    }

    /// Set the variant.
    #[must_use]
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = Some(variant);
        self
    }

    /// Set the engine version.
    #[must_use]
    pub fn with_version(mut self, version: EngineVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Set the output length in bytes.
    #[must_use]
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Set the secret.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.secret = Some(Zeroizing::new(secret.into()));
        self
    }

    /// Set the associated data.
    #[must_use]
    pub fn with_ad(mut self, ad: impl Into<Vec<u8>>) -> Self {
        self.ad = Some(ad.into());
        self
    }

    /// Fill every unset field from `base`.
    #[must_use]
    pub fn or(&self, base: &HashOptions) -> HashOptions {
        HashOptions {
            time_cost: self.time_cost.or(base.time_cost),
            memory_kib: self.memory_kib.or(base.memory_kib),
            parallelism: self.parallelism.or(base.parallelism),
            variant: self.variant.or(base.variant),
            version: self.version.or(base.version),
            length: self.length.or(base.length),
            secret: self.secret.clone().or_else(|| base.secret.clone()),
            ad: self.ad.clone().or_else(|| base.ad.clone()),
        }
    }
}

impl fmt::Debug for HashOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashOptions")
            .field("time_cost", &self.time_cost)
            .field("memory_kib", &self.memory_kib)
            .field("parallelism", &self.parallelism)
            .field("variant", &self.variant)
            .field("version", &self.version)
            .field("length", &self.length)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("ad_len", &self.ad.as_ref().map(Vec::len))
            .finish()
    }
}
