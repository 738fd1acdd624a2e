//! Core domain entities shared by the discovery layers.

use std::fmt;

use sha2::{Digest, Sha256};

/// 256-bit node identifier, `SHA-256(compressed public key)`.
///
/// # Security
///
/// Equality is constant-time. The default `PartialEq` for byte arrays
/// short-circuits on the first difference, which leaks the matching prefix
/// length through timing.
// SAFETY: derived_hash_with_manual_eq is intentional. Equal ids have equal
// bytes, so hashing the bytes stays consistent with the manual PartialEq.
#[allow(clippy::derived_hash_with_manual_eq)]
#[derive(Clone, Copy, Hash)]
pub struct NodeId(pub [u8; 32]);

impl PartialEq for NodeId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        let mut result = 0u8;
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            result |= a ^ b;
        }
        result == 0
    }
}

impl Eq for NodeId {}

impl NodeId {
    /// Create a NodeId from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive the id of a node from its compressed public key.
    pub fn from_public_key(pubkey: &[u8]) -> Self {
        Self(Sha256::digest(pubkey).into())
    }

    /// Random id, used as a lookup target.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for NodeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self)
    }
}

impl fmt::Display for NodeId {
    /// Short form: the first four bytes, enough to tell nodes apart in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}…", hex::encode(&self.0[..4]))
    }
}

/// Unix timestamp in seconds.
///
/// Values are clamped to year 9999 so epoch arithmetic can never overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Maximum reasonable timestamp (year 9999).
    pub const MAX_REASONABLE: u64 = 253_402_300_799;

    /// Create a new timestamp, clamping to `MAX_REASONABLE`.
    pub fn new(secs: u64) -> Self {
        Self(secs.min(Self::MAX_REASONABLE))
    }

    /// Seconds since the Unix epoch.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Add seconds, saturating at `MAX_REASONABLE`.
    pub fn add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs).min(Self::MAX_REASONABLE))
    }

    /// Subtract seconds, saturating at 0.
    pub fn sub_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }
}
