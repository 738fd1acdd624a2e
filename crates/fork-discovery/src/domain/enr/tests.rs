//! Tests for node records and the fork-identity entry.
//!
//! Reference: EIP-778 (Ethereum Node Records)

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::*;
use crate::adapters::Secp256k1Signer;
use crate::domain::fork::{
    compute_fork_digest, ChainSpec, ForkDigest, ForkSchedule, ForkVersion, GenesisInfo,
    NetworkConfig, Root, FAR_FUTURE_EPOCH,
};
use crate::domain::{DecodeError, IdentityError, RecordError, SigningError, Timestamp};

const V0: ForkVersion = ForkVersion([0, 0, 0, 0]);
const V1: ForkVersion = ForkVersion([1, 0, 0, 0]);

fn make_record(signer: &Secp256k1Signer) -> NodeRecord {
    NodeRecord::new_unsigned(NodeRecordConfig {
        seq: 1,
        pubkey: signer.public_key(),
        ip: Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 100))),
        udp_port: Some(9000),
        tcp_port: Some(13000),
    })
}

fn signed_record(signer: &Secp256k1Signer) -> NodeRecord {
    let mut record = make_record(signer);
    record.set_entry(
        ENR_FORK_ID_KEY,
        EnrForkId {
            fork_digest: ForkDigest([1, 2, 3, 4]),
            next_fork_version: V1,
            next_fork_epoch: 42,
        }
        .encode()
        .to_vec(),
    );
    record.sign(signer).unwrap();
    record
}

fn config_with_next_fork(epoch: u64, version: ForkVersion) -> NetworkConfig {
    NetworkConfig::new(
        ForkSchedule::genesis_only(V0).with_next_fork(epoch, version),
        ChainSpec::default(),
    )
}

// =============================================================================
// TEST GROUP 1: Fork Entry Encoding
// =============================================================================

#[test]
fn test_fork_id_encode_layout() {
    let fork_id = EnrForkId {
        fork_digest: ForkDigest([0xAA, 0xBB, 0xCC, 0xDD]),
        next_fork_version: ForkVersion([1, 2, 3, 4]),
        next_fork_epoch: 0x0102,
    };

    let bytes = fork_id.encode();

    assert_eq!(bytes.len(), ENR_FORK_ID_LEN);
    assert_eq!(&bytes[0..4], &[0xAA, 0xBB, 0xCC, 0xDD]);
    assert_eq!(&bytes[4..8], &[1, 2, 3, 4]);
    // Epoch is little-endian.
    assert_eq!(&bytes[8..16], &[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn test_fork_id_far_future_epoch_encodes_as_all_ones() {
    let fork_id = EnrForkId {
        fork_digest: ForkDigest::default(),
        next_fork_version: V0,
        next_fork_epoch: FAR_FUTURE_EPOCH,
    };
    assert_eq!(&fork_id.encode()[8..16], &[0xFF; 8]);
}

#[test]
fn test_fork_id_decode_recovers_fields() {
    let fork_id = EnrForkId {
        fork_digest: ForkDigest([9, 8, 7, 6]),
        next_fork_version: V1,
        next_fork_epoch: 74_240,
    };
    assert_eq!(EnrForkId::decode(&fork_id.encode()).unwrap(), fork_id);
}

#[test]
fn test_fork_id_decode_rejects_short_and_long_input() {
    assert_eq!(
        EnrForkId::decode(&[0u8; 15]),
        Err(DecodeError::InvalidLength {
            expected: 16,
            actual: 15
        })
    );
    assert_eq!(
        EnrForkId::decode(&[0u8; 17]),
        Err(DecodeError::InvalidLength {
            expected: 16,
            actual: 17
        })
    );
    assert!(EnrForkId::decode(&[]).is_err());
}

#[test]
fn test_retrieve_fork_entry_missing() {
    let signer = Secp256k1Signer::random();
    let record = make_record(&signer);
    assert_eq!(
        retrieve_fork_entry(&record),
        Err(DecodeError::MissingEntry(ENR_FORK_ID_KEY))
    );
}

#[test]
fn test_retrieve_fork_entry_malformed() {
    let signer = Secp256k1Signer::random();
    let mut record = make_record(&signer);
    record.set_entry(ENR_FORK_ID_KEY, vec![0u8; 5]);
    assert!(matches!(
        retrieve_fork_entry(&record),
        Err(DecodeError::InvalidLength { actual: 5, .. })
    ));
}

// =============================================================================
// TEST GROUP 2: Fork Entry Derivation
// =============================================================================

#[test]
fn test_derive_pre_genesis_uses_zero_root() {
    let config = NetworkConfig::default();
    let fork_id = EnrForkId::derive(None, &config, Timestamp::new(1_000));

    assert_eq!(fork_id.fork_digest, compute_fork_digest(V0, &Root::ZERO));
    assert_eq!(fork_id.next_fork_epoch, FAR_FUTURE_EPOCH);
}

#[test]
fn test_derive_without_planned_fork_announces_current_version() {
    let config = NetworkConfig::new(
        ForkSchedule::new(V0, BTreeMap::from([(0, V0), (10, V1)]), FAR_FUTURE_EPOCH, V0)
            .unwrap(),
        ChainSpec::default(),
    );
    let genesis = GenesisInfo::new(Timestamp::new(0), Root([3u8; 32]));
    // Epoch 10 starts at 10 * 384 seconds.
    let now = Timestamp::new(10 * 384);

    let fork_id = EnrForkId::derive(Some(&genesis), &config, now);

    assert_eq!(fork_id.next_fork_version, V1);
    assert_eq!(fork_id.fork_digest, compute_fork_digest(V1, &Root([3u8; 32])));
}

#[test]
fn test_derive_with_planned_fork_announces_it() {
    let config = config_with_next_fork(50, V1);
    let genesis = GenesisInfo::new(Timestamp::new(1_000), Root([5u8; 32]));

    let fork_id = EnrForkId::derive(Some(&genesis), &config, Timestamp::new(2_000));

    assert_eq!(fork_id.next_fork_version, V1);
    assert_eq!(fork_id.next_fork_epoch, 50);
    assert_eq!(fork_id.fork_digest, compute_fork_digest(V0, &Root([5u8; 32])));
}

#[test]
fn test_derive_genesis_in_future_is_epoch_zero() {
    let config = NetworkConfig::default();
    let genesis = GenesisInfo::new(Timestamp::new(10_000), Root([7u8; 32]));

    let fork_id = EnrForkId::derive(Some(&genesis), &config, Timestamp::new(5));

    assert_eq!(fork_id.fork_digest, compute_fork_digest(V0, &Root([7u8; 32])));
    assert_eq!(fork_id.next_fork_version, V0);
}

// =============================================================================
// TEST GROUP 3: Record Signing
// =============================================================================

#[test]
fn test_unsigned_record_does_not_verify() {
    let signer = Secp256k1Signer::random();
    assert!(!make_record(&signer).verify_signature());
}

#[test]
fn test_signed_record_verifies() {
    let signer = Secp256k1Signer::random();
    let record = signed_record(&signer);
    assert!(record.verify_signature());
    assert_eq!(record.node_id(), crate::domain::NodeId::from_public_key(&signer.public_key().0));
}

#[test]
fn test_mutation_invalidates_signature() {
    let signer = Secp256k1Signer::random();
    let mut record = signed_record(&signer);

    record.set_tcp_port(14000);
    assert!(!record.verify_signature());

    record.sign(&signer).unwrap();
    assert!(record.verify_signature());
}

#[test]
fn test_sign_with_wrong_key_fails() {
    let owner = Secp256k1Signer::random();
    let other = Secp256k1Signer::random();
    let mut record = make_record(&owner);

    let err = record.sign(&other).unwrap_err();
    assert_eq!(err, IdentityError::Signing(SigningError::KeyMismatch));
}

#[test]
fn test_bump_seq_saturates() {
    let signer = Secp256k1Signer::random();
    let mut record = NodeRecord::new_unsigned(NodeRecordConfig {
        seq: u64::MAX,
        pubkey: signer.public_key(),
        ip: None,
        udp_port: None,
        tcp_port: None,
    });
    record.bump_seq();
    assert_eq!(record.seq(), u64::MAX);
}

#[test]
fn test_zero_port_is_unset() {
    let signer = Secp256k1Signer::random();
    let mut record = make_record(&signer);
    record.set_tcp_port(0);
    assert_eq!(record.tcp_port(), None);
    assert_eq!(record.tcp_socket_addr(), None);
    assert!(record.udp_socket_addr().is_some());
}

// =============================================================================
// TEST GROUP 4: Record Encoding
// =============================================================================

#[test]
fn test_binary_form_preserves_record() {
    let signer = Secp256k1Signer::random();
    let record = signed_record(&signer);

    let decoded = NodeRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();

    assert_eq!(decoded, record);
    assert!(decoded.verify_signature());
    assert_eq!(retrieve_fork_entry(&decoded).unwrap().next_fork_epoch, 42);
}

#[test]
fn test_ipv6_record_decodes() {
    let signer = Secp256k1Signer::random();
    let mut record = make_record(&signer);
    record.set_ip(Some(IpAddr::V6(Ipv6Addr::LOCALHOST)));
    record.sign(&signer).unwrap();

    let decoded = NodeRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.ip(), Some(IpAddr::V6(Ipv6Addr::LOCALHOST)));
}

#[test]
fn test_text_form_has_prefix_and_parses() {
    let signer = Secp256k1Signer::random();
    let record = signed_record(&signer);

    let text = record.to_text().unwrap();
    assert!(text.starts_with(ENR_PREFIX));

    let parsed: NodeRecord = text.parse().unwrap();
    assert_eq!(parsed, record);
}

#[test]
fn test_text_form_rejects_bad_input() {
    assert_eq!(
        "abc".parse::<NodeRecord>(),
        Err(RecordError::MissingPrefix)
    );
    assert_eq!(
        "enr:!!!".parse::<NodeRecord>(),
        Err(RecordError::InvalidBase64)
    );
}

#[test]
fn test_text_form_rejects_unsigned_record() {
    let signer = Secp256k1Signer::random();
    let record = make_record(&signer);
    let text = record.to_text().unwrap();
    assert_eq!(
        text.parse::<NodeRecord>(),
        Err(RecordError::InvalidSignature)
    );
}

#[test]
fn test_truncated_record_rejected() {
    let signer = Secp256k1Signer::random();
    let bytes = signed_record(&signer).to_bytes().unwrap();
    assert_eq!(
        NodeRecord::from_bytes(&bytes[..bytes.len() - 1]),
        Err(RecordError::Truncated)
    );
}

#[test]
fn test_trailing_bytes_rejected() {
    let signer = Secp256k1Signer::random();
    let mut bytes = signed_record(&signer).to_bytes().unwrap();
    bytes.push(0);
    assert_eq!(
        NodeRecord::from_bytes(&bytes),
        Err(RecordError::TrailingBytes(1))
    );
}

#[test]
fn test_untrusted_record_size_limit() {
    let signer = Secp256k1Signer::random();
    let bytes = signed_record(&signer).to_bytes().unwrap();

    assert!(NodeRecord::from_untrusted(&bytes, 300).is_ok());
    assert!(matches!(
        NodeRecord::from_untrusted(&bytes, 10),
        Err(RecordError::TooLarge { limit: 10, .. })
    ));
}

#[test]
fn test_untrusted_record_tampered_signature() {
    let signer = Secp256k1Signer::random();
    let mut bytes = signed_record(&signer).to_bytes().unwrap();
    // Flip a bit in the seq field.
    bytes[7] ^= 0x01;
    assert_eq!(
        NodeRecord::from_untrusted(&bytes, 300),
        Err(RecordError::InvalidSignature)
    );
}
