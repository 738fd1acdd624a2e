//! Fork digest derivation.
//!
//! The digest is the first four bytes of the SSZ `hash_tree_root` of
//! `ForkData { current_version, genesis_validators_root }`. Two nodes only
//! share a digest when they run the same fork of the same network instance.

use sha2::{Digest, Sha256};

use super::config::{ChainSpec, NetworkConfig};
use super::primitives::{Epoch, ForkDigest, ForkVersion, GenesisInfo, Root, GENESIS_EPOCH};
use crate::domain::Timestamp;

/// Digest of a version under a genesis validators root.
///
/// `SHA-256(version ‖ 28 zero bytes ‖ root)[0..4]`: the version is a
/// 4-byte SSZ vector right-padded to one 32-byte chunk.
pub fn compute_fork_digest(version: ForkVersion, genesis_validators_root: &Root) -> ForkDigest {
    let mut version_chunk = [0u8; 32];
    version_chunk[..4].copy_from_slice(&version.0);

    let mut hasher = Sha256::new();
    hasher.update(version_chunk);
    hasher.update(genesis_validators_root.0);
    let root = hasher.finalize();

    ForkDigest([root[0], root[1], root[2], root[3]])
}

/// Epoch at `now`. Before genesis, or with no genesis yet, this is epoch 0.
pub fn current_epoch(genesis: Option<&GenesisInfo>, chain: &ChainSpec, now: Timestamp) -> Epoch {
    match genesis {
        Some(genesis) => chain.epoch_at(genesis.genesis_time, now),
        None => GENESIS_EPOCH,
    }
}

/// Digest of the fork active at `now`.
///
/// With no genesis data the all-zero root stands in for the validators root.
pub fn create_fork_digest(
    genesis: Option<&GenesisInfo>,
    config: &NetworkConfig,
    now: Timestamp,
) -> ForkDigest {
    let epoch = current_epoch(genesis, &config.chain, now);
    let version = config.schedule.version_for_epoch(epoch);
    let root = genesis
        .map(|g| g.genesis_validators_root)
        .unwrap_or(Root::ZERO);
    compute_fork_digest(version, &root)
}
