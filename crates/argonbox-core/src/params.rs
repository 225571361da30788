//! Validated hashing parameters.

use std::fmt;

use zeroize::Zeroizing;

use crate::error::{ArgonError, ArgonResult};
use crate::options::{
    DEFAULT_LENGTH, DEFAULT_MEMORY_KIB, DEFAULT_PARALLELISM, DEFAULT_TIME_COST, EngineVersion,
    HashOptions, Variant,
};

/// Minimum Argon2 output (tag) length in bytes.
pub const MIN_LENGTH: u32 = 4;

/// Conventional keyed-hash (BLAKE2b) output length.
pub const DEFAULT_KEYED_HASH_LENGTH: usize = 32;

/// Maximum output length of the keyed-hash (BLAKE2b) entry point.
pub const MAX_KEYED_HASH_LENGTH: usize = 64;

/// Memory granule: `m` must be a multiple of this many KiB.
const MEMORY_GRANULE_KIB: u32 = 1024;

/// Minimum memory per lane, in KiB.
const MIN_MEMORY_KIB_PER_LANE: u64 = 8 * 1024;

/// Fully resolved, validated parameters for one hash computation.
///
/// Immutable once constructed. The only way to build one is
/// [`HashParams::resolve`], so holding a `HashParams` means every
/// precondition below already holds:
///
/// - `time_cost >= 1`
/// - `parallelism >= 1`
/// - `memory_kib % 1024 == 0` and `memory_kib >= 8 * parallelism * 1024`
/// - `length >= 4`
#[derive(Clone, PartialEq, Eq)]
pub struct HashParams {
    time_cost: u32,
    memory_kib: u32,
    parallelism: u32,
    variant: Variant,
    version: EngineVersion,
    length: u32,
    secret: Option<Zeroizing<Vec<u8>>>,
    ad: Option<Vec<u8>>,
}

impl HashParams {
    /// Apply built-in defaults to `options` and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ArgonError::InvalidParameter`] naming the first violated
    /// option, checked in the order `t`, `p`, `m`, `length`.
    pub fn resolve(options: &HashOptions) -> ArgonResult<Self> {
        let time_cost = options.time_cost.unwrap_or(DEFAULT_TIME_COST);
        let memory_kib = options.memory_kib.unwrap_or(DEFAULT_MEMORY_KIB);
        let parallelism = options.parallelism.unwrap_or(DEFAULT_PARALLELISM);
        let length = options.length.unwrap_or(DEFAULT_LENGTH);

        if time_cost < 1 {
            return Err(ArgonError::InvalidParameter("t"));
        }
        if parallelism < 1 {
            return Err(ArgonError::InvalidParameter("p"));
        }
        let min_memory = u64::from(parallelism).saturating_mul(MIN_MEMORY_KIB_PER_LANE);
        if memory_kib % MEMORY_GRANULE_KIB != 0 || u64::from(memory_kib) < min_memory {
            return Err(ArgonError::InvalidParameter("m"));
        }
        if length < MIN_LENGTH {
            return Err(ArgonError::InvalidParameter("length"));
        }

        Ok(Self {
            time_cost,
            memory_kib,
            parallelism,
            variant: options.variant.unwrap_or_default(),
            version: options.version.unwrap_or_default(),
            length,
            secret: options.secret.clone(),
            ad: options.ad.clone(),
        })
    }

    /// Time cost `t`.
    #[must_use]
    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    /// Memory cost `m` in KiB. Equal to the number of 1 KiB Argon2 blocks.
    #[must_use]
    pub fn memory_kib(&self) -> u32 {
        self.memory_kib
    }

    /// Memory cost in bytes.
    #[must_use]
    pub fn memory_bytes(&self) -> u64 {
        u64::from(self.memory_kib).saturating_mul(1024)
    }

    /// Parallelism `p`.
    #[must_use]
    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    /// Argon2 variant.
    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Engine version.
    #[must_use]
    pub fn version(&self) -> EngineVersion {
        self.version
    }

    /// Output length in bytes.
    #[must_use]
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Secret bytes, if any.
    #[must_use]
    pub fn secret(&self) -> Option<&[u8]> {
        self.secret.as_deref().map(Vec::as_slice)
    }

    /// Associated data, if any.
    #[must_use]
    pub fn ad(&self) -> Option<&[u8]> {
        self.ad.as_deref()
    }
}

impl fmt::Debug for HashParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashParams")
            .field("t", &self.time_cost)
            .field("m", &self.memory_kib)
            .field("p", &self.parallelism)
            .field("variant", &self.variant)
            .field("version", &self.version)
            .field("length", &self.length)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("ad_len", &self.ad.as_ref().map(Vec::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied() {
        let params = HashParams::resolve(&HashOptions::new()).unwrap();
        assert_eq!(params.time_cost(), 3);
        assert_eq!(params.memory_kib(), 65536);
        assert_eq!(params.parallelism(), 1);
        assert_eq!(params.variant(), Variant::Argon2id);
        assert_eq!(params.version(), EngineVersion::V0x13);
        assert_eq!(params.length(), 32);
        assert_eq!(params.memory_bytes(), 64 * 1024 * 1024);
        assert!(params.secret().is_none());
        assert!(params.ad().is_none());
    }

    #[test]
    fn zero_time_cost_rejected() {
        let err = HashParams::resolve(&HashOptions::new().with_time_cost(0)).unwrap_err();
        assert_eq!(err, ArgonError::InvalidParameter("t"));
    }

    #[test]
    fn zero_parallelism_rejected() {
        let err = HashParams::resolve(&HashOptions::new().with_parallelism(0)).unwrap_err();
        assert_eq!(err, ArgonError::InvalidParameter("p"));
    }

    #[test]
    fn memory_not_multiple_of_1024_rejected() {
        let err = HashParams::resolve(&HashOptions::new().with_memory_kib(65537)).unwrap_err();
        assert_eq!(err, ArgonError::InvalidParameter("m"));
    }

    #[test]
    fn memory_below_lane_minimum_rejected() {
        // 4 lanes need at least 32 MiB.
        let options = HashOptions::new()
            .with_parallelism(4)
            .with_memory_kib(16 * 1024);
        let err = HashParams::resolve(&options).unwrap_err();
        assert_eq!(err, ArgonError::InvalidParameter("m"));

        let options = options.with_memory_kib(32 * 1024);
        assert!(HashParams::resolve(&options).is_ok());
    }

    #[test]
    fn huge_parallelism_does_not_overflow() {
        let options = HashOptions::new()
            .with_parallelism(u32::MAX)
            .with_memory_kib(u32::MAX - 1023);
        let err = HashParams::resolve(&options).unwrap_err();
        assert_eq!(err, ArgonError::InvalidParameter("m"));
    }

    #[test]
    fn short_length_rejected() {
        let err = HashParams::resolve(&HashOptions::new().with_length(3)).unwrap_err();
        assert_eq!(err, ArgonError::InvalidParameter("length"));
        assert!(HashParams::resolve(&HashOptions::new().with_length(4)).is_ok());
    }

    #[test]
    fn t_checked_before_m() {
        let options = HashOptions::new().with_time_cost(0).with_memory_kib(1);
        assert_eq!(
            HashParams::resolve(&options).unwrap_err(),
            ArgonError::InvalidParameter("t")
        );
    }

    #[test]
    fn secret_and_ad_carried() {
        let options = HashOptions::new()
            .with_secret(b"k".to_vec())
            .with_ad(b"ctx".to_vec());
        let params = HashParams::resolve(&options).unwrap();
        assert_eq!(params.secret(), Some(&b"k"[..]));
        assert_eq!(params.ad(), Some(&b"ctx"[..]));
        assert!(!format!("{params:?}").contains("\"k\""));
    }
}
