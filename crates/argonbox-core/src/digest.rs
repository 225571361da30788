//! Owned hash output.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Host-owned hash output.
///
/// Always a copy of the engine's output span, so it stays valid after the
/// engine instance that produced it is gone.
///
/// Equality is constant-time with respect to the contents. The bytes are
/// wiped when the digest is dropped.
#[derive(Clone, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Digest(Vec<u8>);

impl Digest {
    /// Wrap an owned byte vector.
    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Take the bytes. The caller becomes responsible for wiping them.
    #[must_use]
    pub fn into_vec(mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the digest is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Constant-time comparison against raw bytes.
    ///
    /// A length mismatch is simply `false`.
    #[must_use]
    pub fn ct_eq_bytes(&self, other: &[u8]) -> bool {
        constant_time_eq(&self.0, other)
    }
}

impl PartialEq for Digest {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.0, &other.0)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Digest> for Vec<u8> {
    fn from(digest: Digest) -> Self {
        digest.into_vec()
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compare two byte strings in time independent of their contents.
///
/// Lengths are not secret: unequal lengths return `false` without
/// inspecting the bytes.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    bool::from(a.ct_eq(b))
}
