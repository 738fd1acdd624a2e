//! Fixed-width fork primitives.

use std::fmt;

use crate::domain::Timestamp;

/// Epoch number since genesis.
pub type Epoch = u64;

/// Sentinel epoch meaning "no fork scheduled".
pub const FAR_FUTURE_EPOCH: Epoch = u64::MAX;

/// First epoch of the chain.
pub const GENESIS_EPOCH: Epoch = 0;

/// 4-byte protocol version identifying a fork.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ForkVersion(pub [u8; 4]);

/// 4-byte fingerprint of (active fork version, genesis validators root).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ForkDigest(pub [u8; 4]);

/// 32-byte genesis validators root.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Root(pub [u8; 32]);

macro_rules! impl_hex_fmt {
    ($($ty:ident),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($ty), self)
            }
        }

        impl $ty {
            /// Underlying bytes.
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }
    )*};
}

impl_hex_fmt!(ForkVersion, ForkDigest, Root);

impl Root {
    /// All-zero placeholder used before the validators root is known.
    pub const ZERO: Root = Root([0u8; 32]);
}

/// Genesis identity of a network instance. Set once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenesisInfo {
    /// Genesis time.
    pub genesis_time: Timestamp,
    /// Root of the initial validator set; unique per network instance.
    pub genesis_validators_root: Root,
}

impl GenesisInfo {
    /// Create genesis info.
    pub fn new(genesis_time: Timestamp, genesis_validators_root: Root) -> Self {
        Self {
            genesis_time,
            genesis_validators_root,
        }
    }
}

/// The fork active at an epoch and the one it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fork {
    /// Version before the active fork (equal to `current_version` at genesis).
    pub previous_version: ForkVersion,
    /// Active version.
    pub current_version: ForkVersion,
    /// Epoch at which the active fork started.
    pub epoch: Epoch,
}
