//! # Fork Identity
//!
//! Fork schedule resolution and fork digest derivation.
//!
//! Everything here is pure: the same (genesis data, schedule, wall-clock
//! epoch) always yields the same version and digest.

// Semantic submodules
mod config;
mod digest;
mod primitives;
mod schedule;

// Re-export public API
#[cfg(any(test, feature = "test-utils"))]
pub use config::ConfigOverrideGuard;
pub use config::{ChainSpec, NetworkConfig, SharedNetworkConfig};
pub use digest::{compute_fork_digest, create_fork_digest, current_epoch};
pub use primitives::{
    Epoch, Fork, ForkDigest, ForkVersion, GenesisInfo, Root, FAR_FUTURE_EPOCH, GENESIS_EPOCH,
};
pub use schedule::ForkSchedule;
