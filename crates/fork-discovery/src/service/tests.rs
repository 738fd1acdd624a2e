//! Tests for the identity lifecycle, the gate and the pipeline.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::*;
use crate::adapters::Secp256k1Signer;
use crate::domain::{
    compute_fork_digest, retrieve_fork_entry, ChainSpec, FilterDecision, ForkSchedule,
    ForkVersion, GenesisInfo, IdentityError, NetworkConfig, NodeId, NodeRecord, NodeRecordConfig,
    PublicKey, RecordSigner, RejectReason, Root, SharedNetworkConfig, Signature, SigningError,
    Timestamp, WarningReason, FAR_FUTURE_EPOCH,
};
use crate::ports::DiscoveryEngine;
use crate::test_utils::FixedTimeSource;

const V0: ForkVersion = ForkVersion([0, 0, 0, 0]);
const V1: ForkVersion = ForkVersion([1, 0, 0, 0]);

/// Seconds in one epoch under the default chain spec.
const EPOCH_SECS: u64 = 12 * 32;

const GENESIS_TIME: u64 = 1_000_000;

fn genesis(root_byte: u8) -> GenesisInfo {
    GenesisInfo::new(Timestamp::new(GENESIS_TIME), Root([root_byte; 32]))
}

/// V0 at genesis, V1 from epoch 10, announced as the next fork.
fn forking_config() -> NetworkConfig {
    NetworkConfig::new(
        ForkSchedule::new(V0, BTreeMap::from([(0, V0), (10, V1)]), 10, V1).unwrap(),
        ChainSpec::default(),
    )
}

fn unsigned_record(signer: &dyn RecordSigner, port: u16) -> NodeRecord {
    NodeRecord::new_unsigned(NodeRecordConfig {
        seq: 0,
        pubkey: signer.public_key(),
        ip: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        udp_port: Some(port),
        tcp_port: Some(port),
    })
}

struct Node {
    identity: Arc<LocalIdentity>,
    time: Arc<FixedTimeSource>,
    config: SharedNetworkConfig,
}

fn node(config: NetworkConfig, genesis: Option<GenesisInfo>, now: u64, port: u16) -> Node {
    let signer = Arc::new(Secp256k1Signer::random());
    let time = Arc::new(FixedTimeSource::new(now));
    let config = SharedNetworkConfig::new(config);
    let identity = LocalIdentity::new(
        unsigned_record(signer.as_ref(), port),
        signer,
        config.clone(),
        genesis,
        time.clone(),
    )
    .unwrap();
    Node {
        identity: Arc::new(identity),
        time,
        config,
    }
}

/// Signer that always fails, standing in for an unavailable key manager.
struct BrokenSigner(PublicKey);

impl RecordSigner for BrokenSigner {
    fn public_key(&self) -> PublicKey {
        self.0
    }

    fn sign(&self, _payload: &[u8]) -> Result<Signature, SigningError> {
        Err(SigningError::Backend("key manager offline".to_string()))
    }
}

/// Signer that can be switched off after the identity was created.
struct SwitchableSigner {
    inner: Secp256k1Signer,
    broken: AtomicBool,
}

impl RecordSigner for SwitchableSigner {
    fn public_key(&self) -> PublicKey {
        self.inner.public_key()
    }

    fn sign(&self, payload: &[u8]) -> Result<Signature, SigningError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(SigningError::Backend("key manager offline".to_string()));
        }
        self.inner.sign(payload)
    }
}

/// V0 at genesis, V1 from epoch 1, nothing planned after that.
fn past_fork_config() -> NetworkConfig {
    NetworkConfig::new(
        ForkSchedule::new(V0, BTreeMap::from([(0, V0), (1, V1)]), FAR_FUTURE_EPOCH, V0).unwrap(),
        ChainSpec::default(),
    )
}

struct StaticEngine {
    local: NodeRecord,
    found: Vec<NodeRecord>,
}

#[async_trait]
impl DiscoveryEngine for StaticEngine {
    async fn lookup(&self, _target: NodeId) -> Vec<NodeRecord> {
        self.found.clone()
    }

    fn local_record(&self) -> NodeRecord {
        self.local.clone()
    }

    async fn close(&self) {}
}

// =============================================================================
// TEST GROUP 1: Attaching the Fork Entry
// =============================================================================

#[test]
fn test_attach_then_retrieve_returns_entry() {
    let signer = Secp256k1Signer::random();
    let mut record = unsigned_record(&signer, 9000);
    let config = forking_config();

    let attached = attach_fork_entry(
        &mut record,
        &signer,
        Some(&genesis(1)),
        &config,
        Timestamp::new(GENESIS_TIME),
    )
    .unwrap();

    assert_eq!(retrieve_fork_entry(&record).unwrap(), attached);
    assert_eq!(record.seq(), 1);
    assert!(record.verify_signature());
}

#[test]
fn test_attach_pre_genesis_is_decodable() {
    let signer = Secp256k1Signer::random();
    let mut record = unsigned_record(&signer, 9000);

    let attached = attach_fork_entry(
        &mut record,
        &signer,
        None,
        &NetworkConfig::default(),
        Timestamp::new(5),
    )
    .unwrap();

    let decoded = retrieve_fork_entry(&record).unwrap();
    assert_eq!(decoded, attached);
    assert_eq!(decoded.fork_digest, compute_fork_digest(V0, &Root::ZERO));
}

#[test]
fn test_attach_genesis_in_future_announces_genesis_version() {
    let signer = Secp256k1Signer::random();
    let mut record = unsigned_record(&signer, 9000);

    let attached = attach_fork_entry(
        &mut record,
        &signer,
        Some(&genesis(1)),
        &NetworkConfig::default(),
        Timestamp::new(GENESIS_TIME - 100),
    )
    .unwrap();

    assert_eq!(attached.next_fork_version, V0);
    assert_eq!(attached.next_fork_epoch, FAR_FUTURE_EPOCH);
}

#[test]
fn test_attach_signing_failure_leaves_record_untouched() {
    let good = Secp256k1Signer::random();
    let broken = BrokenSigner(good.public_key());
    let mut record = unsigned_record(&good, 9000);
    record.sign(&good).unwrap();
    let before = record.clone();

    let err = attach_fork_entry(
        &mut record,
        &broken,
        None,
        &NetworkConfig::default(),
        Timestamp::new(0),
    )
    .unwrap_err();

    assert!(matches!(err, IdentityError::Signing(SigningError::Backend(_))));
    assert_eq!(record, before);
}

// =============================================================================
// TEST GROUP 2: Local Identity Lifecycle
// =============================================================================

#[test]
fn test_identity_new_attaches_immediately() {
    let node = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9000);

    let record = node.identity.current_record();
    assert_eq!(
        retrieve_fork_entry(&record).unwrap(),
        node.identity.announced_fork_id()
    );
    assert_eq!(node.identity.announced_fork_id().next_fork_epoch, 10);
}

#[test]
fn test_identity_new_fails_when_signer_is_broken() {
    let good = Secp256k1Signer::random();
    let result = LocalIdentity::new(
        unsigned_record(&good, 9000),
        Arc::new(BrokenSigner(good.public_key())),
        SharedNetworkConfig::default(),
        None,
        Arc::new(FixedTimeSource::new(0)),
    );
    assert!(matches!(result, Err(IdentityError::Signing(_))));
}

#[test]
fn test_refresh_is_noop_within_epoch() {
    let node = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9000);
    let seq = node.identity.current_record().seq();

    node.time.advance(EPOCH_SECS - 1);

    assert!(!node.identity.refresh().unwrap());
    assert_eq!(node.identity.current_record().seq(), seq);
}

#[test]
fn test_refresh_across_fork_boundary_updates_digest() {
    let node = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9000);
    let before = node.identity.announced_fork_id();

    node.time.set(GENESIS_TIME + 10 * EPOCH_SECS);

    assert!(node.identity.refresh().unwrap());
    let after = node.identity.announced_fork_id();
    assert_ne!(after.fork_digest, before.fork_digest);
    assert_eq!(after.fork_digest, compute_fork_digest(V1, &Root([1; 32])));
}

#[test]
fn test_record_refreshes_stale_entry() {
    let node = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9000);
    node.time.set(GENESIS_TIME + 10 * EPOCH_SECS);

    let record = node.identity.record().unwrap();

    assert_eq!(
        retrieve_fork_entry(&record).unwrap().fork_digest,
        compute_fork_digest(V1, &Root([1; 32]))
    );
    assert!(record.verify_signature());
}

#[test]
fn test_reads_across_fork_boundary_are_fresh() {
    let node = node(past_fork_config(), Some(genesis(1)), GENESIS_TIME, 9000);
    node.time.set(GENESIS_TIME + 2 * EPOCH_SECS);

    let announced = node.identity.announced_fork_id();
    assert_eq!(announced.fork_digest, compute_fork_digest(V1, &Root([1; 32])));
    assert_eq!(announced.next_fork_version, V1);

    let record = node.identity.current_record();
    assert_eq!(retrieve_fork_entry(&record).unwrap(), announced);
    assert!(record.verify_signature());
    assert!(!node.identity.refresh().unwrap());
}

#[test]
fn test_failed_refresh_keeps_last_signed_record() {
    let signer = Arc::new(SwitchableSigner {
        inner: Secp256k1Signer::random(),
        broken: AtomicBool::new(false),
    });
    let time = Arc::new(FixedTimeSource::new(GENESIS_TIME));
    let identity = LocalIdentity::new(
        unsigned_record(signer.as_ref(), 9000),
        signer.clone(),
        SharedNetworkConfig::new(past_fork_config()),
        Some(genesis(1)),
        time.clone(),
    )
    .unwrap();
    let before = identity.current_record();

    signer.broken.store(true, Ordering::SeqCst);
    time.set(GENESIS_TIME + 2 * EPOCH_SECS);

    assert_eq!(identity.current_record(), before);
    assert!(identity.record().is_err());
    assert_eq!(
        identity.expected_fork_id().fork_digest,
        compute_fork_digest(V1, &Root([1; 32]))
    );
}

#[test]
fn test_set_genesis_leaves_pre_genesis_mode() {
    let node = node(NetworkConfig::default(), None, GENESIS_TIME, 9000);
    assert_eq!(
        node.identity.announced_fork_id().fork_digest,
        compute_fork_digest(V0, &Root::ZERO)
    );

    let announced = node.identity.set_genesis(genesis(4)).unwrap();

    assert_eq!(announced.fork_digest, compute_fork_digest(V0, &Root([4; 32])));
    assert_eq!(node.identity.genesis(), Some(genesis(4)));
}

#[test]
fn test_set_genesis_is_immutable() {
    let node = node(NetworkConfig::default(), Some(genesis(1)), GENESIS_TIME, 9000);
    let seq = node.identity.current_record().seq();

    assert!(node.identity.set_genesis(genesis(1)).is_ok());
    assert_eq!(node.identity.current_record().seq(), seq);
    assert_eq!(
        node.identity.set_genesis(genesis(2)),
        Err(IdentityError::GenesisAlreadySet)
    );
}

#[test]
fn test_config_override_reaches_record_on_refresh() {
    let node = node(NetworkConfig::default(), Some(genesis(1)), GENESIS_TIME, 9000);

    let guard = node.config.override_config(NetworkConfig::new(
        ForkSchedule::genesis_only(V0).with_next_fork(7, V1),
        ChainSpec::default(),
    ));
    assert!(node.identity.refresh().unwrap());
    assert_eq!(node.identity.announced_fork_id().next_fork_epoch, 7);

    drop(guard);
    assert!(node.identity.refresh().unwrap());
    assert_eq!(
        node.identity.announced_fork_id().next_fork_epoch,
        FAR_FUTURE_EPOCH
    );
}

#[test]
fn test_set_endpoint_resigns_once() {
    let node = node(NetworkConfig::default(), None, 0, 9000);
    let seq = node.identity.current_record().seq();

    node.identity
        .set_endpoint(Some(IpAddr::V4(Ipv4Addr::LOCALHOST)), 9100, 13100)
        .unwrap();
    let record = node.identity.current_record();
    assert_eq!(record.seq(), seq + 1);
    assert_eq!(record.udp_port(), Some(9100));
    assert!(record.verify_signature());

    node.identity
        .set_endpoint(Some(IpAddr::V4(Ipv4Addr::LOCALHOST)), 9100, 13100)
        .unwrap();
    assert_eq!(node.identity.current_record().seq(), seq + 1);
}

// =============================================================================
// TEST GROUP 3: Compatibility Gate
// =============================================================================

#[test]
fn test_gate_rejects_other_network() {
    let local = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9000);
    let other = node(forking_config(), Some(genesis(2)), GENESIS_TIME, 9001);
    let gate = CompatibilityGate::new(local.identity.clone());

    assert!(matches!(
        gate.filter_peer(&other.identity.current_record()),
        FilterDecision::Reject(RejectReason::ForkDigestMismatch { .. })
    ));
}

#[test]
fn test_gate_warns_on_next_epoch_difference() {
    let local = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9000);
    let peer_config = NetworkConfig::new(
        ForkSchedule::new(V0, BTreeMap::from([(0, V0), (12, V1)]), 12, V1).unwrap(),
        ChainSpec::default(),
    );
    let peer = node(peer_config, Some(genesis(1)), GENESIS_TIME, 9001);
    let gate = CompatibilityGate::new(local.identity.clone());

    assert_eq!(
        gate.filter_peer(&peer.identity.current_record()),
        FilterDecision::AcceptWithWarning(WarningReason::NextForkEpochMismatch {
            local: 10,
            remote: 12,
        })
    );
}

#[test]
fn test_gate_accepts_same_fork_identity() {
    let local = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9000);
    let peer = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9001);
    let gate = CompatibilityGate::new(local.identity.clone());

    assert_eq!(
        gate.filter_peer(&peer.identity.current_record()),
        FilterDecision::Accept
    );
}

#[test]
fn test_gate_rejects_own_record() {
    let local = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9000);
    let gate = CompatibilityGate::new(local.identity.clone());

    assert_eq!(
        gate.filter_peer(&local.identity.current_record()),
        FilterDecision::Reject(RejectReason::SelfRecord)
    );
}

#[test]
fn test_gate_uses_fresh_digest_after_local_fork() {
    let local = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9000);
    let peer = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9001);
    let gate = CompatibilityGate::new(local.identity.clone());
    let stale_peer_record = peer.identity.current_record();

    // Local node crosses the fork; the peer's record still carries V0.
    local.time.set(GENESIS_TIME + 10 * EPOCH_SECS);

    assert!(matches!(
        gate.filter_peer(&stale_peer_record),
        FilterDecision::Reject(RejectReason::ForkDigestMismatch { .. })
    ));
}

#[test]
fn test_gate_compares_fresh_next_fork_after_boundary() {
    let local = node(past_fork_config(), Some(genesis(1)), GENESIS_TIME, 9000);
    let peer = node(past_fork_config(), Some(genesis(1)), GENESIS_TIME, 9001);
    let gate = CompatibilityGate::new(local.identity.clone());

    local.time.set(GENESIS_TIME + 2 * EPOCH_SECS);
    peer.time.set(GENESIS_TIME + 2 * EPOCH_SECS);

    assert_eq!(
        gate.filter_peer(&peer.identity.current_record()),
        FilterDecision::Accept
    );
}

#[test]
fn test_gate_is_fresh_even_when_local_record_cannot_be_signed() {
    let signer = Arc::new(SwitchableSigner {
        inner: Secp256k1Signer::random(),
        broken: AtomicBool::new(false),
    });
    let time = Arc::new(FixedTimeSource::new(GENESIS_TIME));
    let local = Arc::new(
        LocalIdentity::new(
            unsigned_record(signer.as_ref(), 9000),
            signer.clone(),
            SharedNetworkConfig::new(past_fork_config()),
            Some(genesis(1)),
            time.clone(),
        )
        .unwrap(),
    );
    let peer = node(past_fork_config(), Some(genesis(1)), GENESIS_TIME, 9001);
    let gate = CompatibilityGate::new(local);

    signer.broken.store(true, Ordering::SeqCst);
    time.set(GENESIS_TIME + 2 * EPOCH_SECS);
    peer.time.set(GENESIS_TIME + 2 * EPOCH_SECS);

    assert_eq!(
        gate.filter_peer(&peer.identity.current_record()),
        FilterDecision::Accept
    );
}

// =============================================================================
// TEST GROUP 4: Discovery Pipeline
// =============================================================================

#[tokio::test]
async fn test_pipeline_returns_only_compatible_addresses() {
    let local = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9000);
    let same = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9001);
    let other = node(forking_config(), Some(genesis(2)), GENESIS_TIME, 9002);
    let warned_config = NetworkConfig::new(
        ForkSchedule::new(V0, BTreeMap::from([(0, V0), (11, V1)]), 11, V1).unwrap(),
        ChainSpec::default(),
    );
    let warned = node(warned_config, Some(genesis(1)), GENESIS_TIME, 9003);

    let engine = StaticEngine {
        local: local.identity.current_record(),
        found: vec![
            same.identity.current_record(),
            other.identity.current_record(),
            warned.identity.current_record(),
            local.identity.current_record(),
        ],
    };
    let pipeline = DiscoveryPipeline::new(
        Arc::new(engine),
        Arc::new(CompatibilityGate::new(local.identity.clone())),
    );

    let addrs = pipeline.discover(NodeId::random()).await;

    let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
    assert_eq!(
        addrs,
        vec![
            SocketAddr::new(localhost, 9001),
            SocketAddr::new(localhost, 9003)
        ]
    );
    assert_eq!(
        pipeline.stats(),
        FilterStats {
            accepted: 2,
            warned: 1,
            rejected: 2,
        }
    );
}

#[tokio::test]
async fn test_pipeline_deduplicates_addresses_and_accumulates_stats() {
    let local = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9000);
    let peer = node(forking_config(), Some(genesis(1)), GENESIS_TIME, 9001);
    let record = peer.identity.current_record();

    let engine = StaticEngine {
        local: local.identity.current_record(),
        found: vec![record.clone(), record],
    };
    let pipeline = DiscoveryPipeline::new(
        Arc::new(engine),
        Arc::new(CompatibilityGate::new(local.identity.clone())),
    );

    assert_eq!(pipeline.discover(NodeId::random()).await.len(), 1);
    assert_eq!(pipeline.discover(NodeId::random()).await.len(), 1);
    assert_eq!(pipeline.stats().accepted, 4);
    assert_eq!(pipeline.engine().local_record().node_id(), local.identity.node_id());
}
