//! Local identity lifecycle.
//!
//! The local record is the only mutable state shared between the discovery
//! engine and the compatibility gate. Every change goes through
//! `LocalIdentity`, which re-derives the fork entry, bumps the sequence
//! number and re-signs under a single lock.

use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::domain::{
    EnrForkId, ForkDigest, GenesisInfo, IdentityError, NetworkConfig, NodeId,
    NodeRecord, RecordSigner, SharedNetworkConfig, Timestamp, ENR_FORK_ID_KEY,
};
use crate::ports::TimeSource;

/// Derive the fork entry, store it in `record`, bump `seq` and re-sign.
///
/// `record` is only replaced once signing succeeded; on error it is left
/// exactly as it was.
///
/// # Errors
///
/// `IdentityError::Signing` if the signer fails or holds another key.
pub fn attach_fork_entry(
    record: &mut NodeRecord,
    signer: &dyn RecordSigner,
    genesis: Option<&GenesisInfo>,
    config: &NetworkConfig,
    now: Timestamp,
) -> Result<EnrForkId, IdentityError> {
    let fork_id = EnrForkId::derive(genesis, config, now);

    let mut updated = record.clone();
    updated.set_entry(ENR_FORK_ID_KEY, fork_id.encode().to_vec());
    updated.bump_seq();
    updated.sign(signer)?;

    *record = updated;
    Ok(fork_id)
}

struct IdentityState {
    record: NodeRecord,
    genesis: Option<GenesisInfo>,
    announced: EnrForkId,
}

/// Owner of the node's signed record.
pub struct LocalIdentity {
    signer: Arc<dyn RecordSigner>,
    config: SharedNetworkConfig,
    time: Arc<dyn TimeSource>,
    state: Mutex<IdentityState>,
}

impl LocalIdentity {
    /// Take ownership of `record` and attach the fork entry immediately.
    ///
    /// With `genesis` unset the node announces the pre-genesis entry (zero
    /// validators root, epoch 0).
    ///
    /// # Errors
    ///
    /// `IdentityError::Signing` if the initial signature cannot be produced.
    pub fn new(
        mut record: NodeRecord,
        signer: Arc<dyn RecordSigner>,
        config: SharedNetworkConfig,
        genesis: Option<GenesisInfo>,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, IdentityError> {
        let announced = attach_fork_entry(
            &mut record,
            signer.as_ref(),
            genesis.as_ref(),
            &config.snapshot(),
            time.now(),
        )?;

        info!(
            node_id = %record.node_id(),
            fork_digest = %announced.fork_digest,
            next_fork_epoch = announced.next_fork_epoch,
            pre_genesis = genesis.is_none(),
            "local fork identity attached"
        );

        Ok(Self {
            signer,
            config,
            time,
            state: Mutex::new(IdentityState {
                record,
                genesis,
                announced,
            }),
        })
    }

    /// Record the genesis data once it becomes known and re-attach.
    ///
    /// Setting the same value again is a no-op.
    ///
    /// # Errors
    ///
    /// `IdentityError::GenesisAlreadySet` for a conflicting value, or a
    /// signing failure.
    pub fn set_genesis(&self, genesis: GenesisInfo) -> Result<EnrForkId, IdentityError> {
        let mut state = self.state.lock();
        match state.genesis {
            Some(existing) if existing == genesis => return Ok(state.announced),
            Some(_) => return Err(IdentityError::GenesisAlreadySet),
            None => {}
        }

        let config = self.config.snapshot();
        let now = self.time.now();
        let announced = attach_fork_entry(
            &mut state.record,
            self.signer.as_ref(),
            Some(&genesis),
            &config,
            now,
        )?;
        state.genesis = Some(genesis);
        state.announced = announced;

        info!(
            genesis_validators_root = %genesis.genesis_validators_root,
            fork_digest = %announced.fork_digest,
            seq = state.record.seq(),
            "genesis known, fork identity updated"
        );
        Ok(announced)
    }

    /// Re-attach if the entry no longer matches what the current epoch and
    /// schedule derive. Returns whether the record changed.
    ///
    /// # Errors
    ///
    /// Signing failure. The previous record stays in place.
    pub fn refresh(&self) -> Result<bool, IdentityError> {
        let mut state = self.state.lock();
        self.refresh_locked(&mut state)
    }

    fn refresh_locked(&self, state: &mut IdentityState) -> Result<bool, IdentityError> {
        let config = self.config.snapshot();
        let now = self.time.now();

        if EnrForkId::derive(state.genesis.as_ref(), &config, now) == state.announced {
            return Ok(false);
        }

        let previous = state.announced;
        let announced = attach_fork_entry(
            &mut state.record,
            self.signer.as_ref(),
            state.genesis.as_ref(),
            &config,
            now,
        )?;
        state.announced = announced;

        info!(
            old_digest = %previous.fork_digest,
            new_digest = %announced.fork_digest,
            next_fork_epoch = announced.next_fork_epoch,
            seq = state.record.seq(),
            "fork identity refreshed"
        );
        Ok(true)
    }

    /// Current record, refreshed first if stale.
    ///
    /// # Errors
    ///
    /// Signing failure during the refresh.
    pub fn record(&self) -> Result<NodeRecord, IdentityError> {
        let mut state = self.state.lock();
        self.refresh_locked(&mut state)?;
        Ok(state.record.clone())
    }

    /// Current record, refreshed first if stale.
    ///
    /// If the refresh cannot be signed, the failure is logged and the last
    /// signed record is returned.
    pub fn current_record(&self) -> NodeRecord {
        let mut state = self.state.lock();
        self.refresh_or_keep(&mut state);
        state.record.clone()
    }

    /// Fork entry embedded in the record, refreshed first if stale.
    pub fn announced_fork_id(&self) -> EnrForkId {
        let mut state = self.state.lock();
        self.refresh_or_keep(&mut state);
        state.announced
    }

    fn refresh_or_keep(&self, state: &mut IdentityState) {
        if let Err(err) = self.refresh_locked(state) {
            warn!(error = %err, "failed to refresh local fork identity, keeping previous record");
        }
    }

    /// Fork entry the current epoch and schedule derive, from one config
    /// snapshot. Does not touch the record.
    pub fn expected_fork_id(&self) -> EnrForkId {
        let genesis = self.state.lock().genesis;
        EnrForkId::derive(genesis.as_ref(), &self.config.snapshot(), self.time.now())
    }

    /// Digest of the fork active right now, derived fresh.
    pub fn current_fork_digest(&self) -> ForkDigest {
        self.expected_fork_id().fork_digest
    }

    /// Genesis data, if known.
    pub fn genesis(&self) -> Option<GenesisInfo> {
        self.state.lock().genesis
    }

    /// Local node id.
    pub fn node_id(&self) -> NodeId {
        self.state.lock().record.node_id()
    }

    /// Clock used for epoch derivation.
    pub fn time_source(&self) -> &Arc<dyn TimeSource> {
        &self.time
    }

    /// Shared network config this identity derives from.
    pub fn network_config(&self) -> &SharedNetworkConfig {
        &self.config
    }

    /// Update the advertised endpoint. Re-signs only if something changed.
    ///
    /// # Errors
    ///
    /// Signing failure. The previous record stays in place.
    pub fn set_endpoint(
        &self,
        ip: Option<IpAddr>,
        udp_port: u16,
        tcp_port: u16,
    ) -> Result<(), IdentityError> {
        let mut state = self.state.lock();
        let mut updated = state.record.clone();
        updated.set_ip(ip);
        updated.set_udp_port(udp_port);
        updated.set_tcp_port(tcp_port);

        if updated.ip() == state.record.ip()
            && updated.udp_port() == state.record.udp_port()
            && updated.tcp_port() == state.record.tcp_port()
        {
            return Ok(());
        }

        updated.bump_seq();
        updated.sign(self.signer.as_ref())?;
        state.record = updated;
        Ok(())
    }
}

impl std::fmt::Debug for LocalIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LocalIdentity")
            .field("node_id", &state.record.node_id())
            .field("seq", &state.record.seq())
            .field("announced", &state.announced)
            .finish_non_exhaustive()
    }
}
