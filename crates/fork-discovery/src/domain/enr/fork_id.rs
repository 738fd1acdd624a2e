//! Fork-identity record entry.
//!
//! The entry is exchanged between independent implementations, so the
//! layout is exact: `fork_digest (4) ‖ next_fork_version (4) ‖
//! next_fork_epoch (8, little-endian)`, 16 bytes, no prefix or padding.
//! This is the SSZ encoding of the fixed-size container.

use super::record::NodeRecord;
use crate::domain::fork::{
    create_fork_digest, current_epoch, Epoch, ForkDigest, ForkVersion, GenesisInfo,
    NetworkConfig, FAR_FUTURE_EPOCH,
};
use crate::domain::{DecodeError, Timestamp};

/// Record key under which the fork identity is stored.
pub const ENR_FORK_ID_KEY: &str = "eth2";

/// Encoded width of an `EnrForkId`.
pub const ENR_FORK_ID_LEN: usize = 16;

/// Fork identity advertised in a node record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrForkId {
    /// Digest of the fork the node currently follows.
    pub fork_digest: ForkDigest,
    /// Version of the next planned fork (current version if none planned).
    pub next_fork_version: ForkVersion,
    /// Epoch of the next planned fork (`FAR_FUTURE_EPOCH` if none).
    pub next_fork_epoch: Epoch,
}

impl EnrForkId {
    /// Fork identity a node with this genesis data and config announces at `now`.
    ///
    /// Before genesis the validators root is all-zero and the epoch is 0.
    /// With no next fork planned, the announced next version is the current one.
    pub fn derive(genesis: Option<&GenesisInfo>, config: &NetworkConfig, now: Timestamp) -> Self {
        let fork_digest = create_fork_digest(genesis, config, now);
        let epoch = current_epoch(genesis, &config.chain, now);
        let fork = config.schedule.fork_at(epoch);

        let next_fork_epoch = config.schedule.next_fork_epoch();
        let next_fork_version = if next_fork_epoch == FAR_FUTURE_EPOCH {
            fork.current_version
        } else {
            config.schedule.next_fork_version()
        };

        Self {
            fork_digest,
            next_fork_version,
            next_fork_epoch,
        }
    }

    /// Fixed 16-byte encoding.
    pub fn encode(&self) -> [u8; ENR_FORK_ID_LEN] {
        let mut out = [0u8; ENR_FORK_ID_LEN];
        out[0..4].copy_from_slice(&self.fork_digest.0);
        out[4..8].copy_from_slice(&self.next_fork_version.0);
        out[8..16].copy_from_slice(&self.next_fork_epoch.to_le_bytes());
        out
    }

    /// Decode the fixed 16-byte encoding.
    ///
    /// # Errors
    ///
    /// `DecodeError::InvalidLength` for any input that is not exactly 16 bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let bytes: &[u8; ENR_FORK_ID_LEN] =
            bytes.try_into().map_err(|_| DecodeError::InvalidLength {
                expected: ENR_FORK_ID_LEN,
                actual: bytes.len(),
            })?;

        let mut digest = [0u8; 4];
        digest.copy_from_slice(&bytes[0..4]);
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[4..8]);
        let mut epoch = [0u8; 8];
        epoch.copy_from_slice(&bytes[8..16]);

        Ok(Self {
            fork_digest: ForkDigest(digest),
            next_fork_version: ForkVersion(version),
            next_fork_epoch: Epoch::from_le_bytes(epoch),
        })
    }
}

/// Read the fork identity out of a record.
///
/// # Errors
///
/// `DecodeError::MissingEntry` if the record has no `eth2` entry, or the
/// decode error of a malformed one.
pub fn retrieve_fork_entry(record: &NodeRecord) -> Result<EnrForkId, DecodeError> {
    let raw = record
        .entry(ENR_FORK_ID_KEY)
        .ok_or(DecodeError::MissingEntry(ENR_FORK_ID_KEY))?;
    EnrForkId::decode(raw)
}
