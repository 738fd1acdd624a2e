//! Fork schedule resolution.

use std::collections::BTreeMap;

use super::primitives::{Epoch, Fork, ForkVersion, FAR_FUTURE_EPOCH, GENESIS_EPOCH};
use crate::domain::ConfigError;

/// Epoch → version schedule plus the announced next transition.
///
/// Validated once at construction; lookups never fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkSchedule {
    genesis_fork_version: ForkVersion,
    versions: BTreeMap<Epoch, ForkVersion>,
    next_fork_epoch: Epoch,
    next_fork_version: ForkVersion,
}

impl ForkSchedule {
    /// Build a schedule.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidSchedule` if `versions` is empty, pins a
    /// genesis-epoch version other than `genesis_fork_version`, or does not
    /// contain the announced next fork.
    pub fn new(
        genesis_fork_version: ForkVersion,
        versions: BTreeMap<Epoch, ForkVersion>,
        next_fork_epoch: Epoch,
        next_fork_version: ForkVersion,
    ) -> Result<Self, ConfigError> {
        if versions.is_empty() {
            return Err(ConfigError::InvalidSchedule(
                "schedule has no versions".to_string(),
            ));
        }

        if let Some(v) = versions.get(&GENESIS_EPOCH) {
            if *v != genesis_fork_version {
                return Err(ConfigError::InvalidSchedule(format!(
                    "epoch 0 maps to {v} but genesis fork version is {genesis_fork_version}"
                )));
            }
        }

        if next_fork_epoch != FAR_FUTURE_EPOCH
            && versions.get(&next_fork_epoch) != Some(&next_fork_version)
        {
            return Err(ConfigError::InvalidSchedule(format!(
                "next fork {next_fork_version} at epoch {next_fork_epoch} is not in the schedule"
            )));
        }

        Ok(Self {
            genesis_fork_version,
            versions,
            next_fork_epoch,
            next_fork_version,
        })
    }

    /// Schedule with only the genesis fork and nothing planned.
    pub fn genesis_only(genesis_fork_version: ForkVersion) -> Self {
        Self {
            genesis_fork_version,
            versions: BTreeMap::from([(GENESIS_EPOCH, genesis_fork_version)]),
            next_fork_epoch: FAR_FUTURE_EPOCH,
            next_fork_version: genesis_fork_version,
        }
    }

    /// Same versions, different announced next transition.
    ///
    /// Unlike `new`, the announcement is not checked against the versions.
    pub fn with_next_fork(mut self, epoch: Epoch, version: ForkVersion) -> Self {
        self.next_fork_epoch = epoch;
        self.next_fork_version = version;
        self
    }

    /// Version active at `epoch`: the entry with the greatest epoch ≤ `epoch`.
    /// Falls back to the genesis version when no entry applies.
    pub fn version_for_epoch(&self, epoch: Epoch) -> ForkVersion {
        self.versions
            .range(..=epoch)
            .next_back()
            .map(|(_, version)| *version)
            .unwrap_or(self.genesis_fork_version)
    }

    /// Active fork at `epoch` together with its predecessor.
    pub fn fork_at(&self, epoch: Epoch) -> Fork {
        let mut applicable = self.versions.range(..=epoch).rev();
        match applicable.next() {
            Some((&start, &current_version)) => Fork {
                previous_version: applicable
                    .next()
                    .map(|(_, version)| *version)
                    .unwrap_or(current_version),
                current_version,
                epoch: start,
            },
            None => Fork {
                previous_version: self.genesis_fork_version,
                current_version: self.genesis_fork_version,
                epoch: GENESIS_EPOCH,
            },
        }
    }

    /// Version at genesis.
    pub fn genesis_fork_version(&self) -> ForkVersion {
        self.genesis_fork_version
    }

    /// Epoch of the next planned fork (`FAR_FUTURE_EPOCH` if none).
    pub fn next_fork_epoch(&self) -> Epoch {
        self.next_fork_epoch
    }

    /// Version of the next planned fork.
    pub fn next_fork_version(&self) -> ForkVersion {
        self.next_fork_version
    }

    /// All scheduled (epoch, version) pairs in epoch order.
    pub fn versions(&self) -> impl Iterator<Item = (Epoch, ForkVersion)> + '_ {
        self.versions.iter().map(|(e, v)| (*e, *v))
    }
}

impl Default for ForkSchedule {
    fn default() -> Self {
        Self::genesis_only(ForkVersion([0, 0, 0, 0]))
    }
}
