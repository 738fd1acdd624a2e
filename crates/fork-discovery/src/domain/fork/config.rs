//! Network configuration snapshots.

use std::sync::Arc;

use parking_lot::RwLock;

use super::primitives::Epoch;
use super::schedule::ForkSchedule;
use crate::domain::{ConfigError, Timestamp};

/// Slot timing of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainSpec {
    /// Seconds per slot (default 12).
    pub seconds_per_slot: u64,
    /// Slots per epoch (default 32).
    pub slots_per_epoch: u64,
}

impl ChainSpec {
    /// Validated slot timing.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidTiming` if either value is zero.
    pub fn new(seconds_per_slot: u64, slots_per_epoch: u64) -> Result<Self, ConfigError> {
        if seconds_per_slot == 0 || slots_per_epoch == 0 {
            return Err(ConfigError::InvalidTiming(format!(
                "seconds_per_slot={seconds_per_slot}, slots_per_epoch={slots_per_epoch}"
            )));
        }
        Ok(Self {
            seconds_per_slot,
            slots_per_epoch,
        })
    }

    /// Epoch at `now` for a chain that started at `genesis_time`.
    ///
    /// Saturates to 0 before genesis.
    pub fn epoch_at(&self, genesis_time: Timestamp, now: Timestamp) -> Epoch {
        let elapsed = now.as_secs().saturating_sub(genesis_time.as_secs());
        elapsed
            .checked_div(self.seconds_per_slot)
            .and_then(|slots| slots.checked_div(self.slots_per_epoch))
            .unwrap_or(0)
    }

    /// Length of one epoch in seconds.
    pub fn epoch_duration_secs(&self) -> u64 {
        self.seconds_per_slot.saturating_mul(self.slots_per_epoch)
    }
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self {
            seconds_per_slot: 12,
            slots_per_epoch: 32,
        }
    }
}

/// Static network configuration consumed by digest derivation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkConfig {
    /// Fork schedule.
    pub schedule: ForkSchedule,
    /// Slot timing.
    pub chain: ChainSpec,
}

impl NetworkConfig {
    /// Create a config.
    pub fn new(schedule: ForkSchedule, chain: ChainSpec) -> Self {
        Self { schedule, chain }
    }
}

/// Shared handle to the active `NetworkConfig`.
///
/// Readers take an immutable `Arc` snapshot per derivation, so a concurrent
/// swap can never be observed half-applied.
#[derive(Debug, Clone, Default)]
pub struct SharedNetworkConfig {
    inner: Arc<RwLock<Arc<NetworkConfig>>>,
}

impl SharedNetworkConfig {
    /// Wrap a config.
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Immutable snapshot of the active config.
    pub fn snapshot(&self) -> Arc<NetworkConfig> {
        Arc::clone(&self.inner.read())
    }

    /// Replace the config wholesale until the guard drops.
    ///
    /// Test harnesses only. `LocalIdentity` picks the new schedule up on its
    /// next read or `refresh`.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn override_config(&self, config: NetworkConfig) -> ConfigOverrideGuard {
        let previous = std::mem::replace(&mut *self.inner.write(), Arc::new(config));
        ConfigOverrideGuard {
            target: self.clone(),
            previous: Some(previous),
        }
    }
}

/// Restores the previous config snapshot on drop.
#[cfg(any(test, feature = "test-utils"))]
#[must_use = "the override is reverted as soon as the guard is dropped"]
pub struct ConfigOverrideGuard {
    target: SharedNetworkConfig,
    previous: Option<Arc<NetworkConfig>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl Drop for ConfigOverrideGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.target.inner.write() = previous;
        }
    }
}
