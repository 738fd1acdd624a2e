//! # Fork-Aware Peer Discovery
//!
//! Discovers peers over a Kademlia-style UDP protocol and keeps only those
//! that live on the same fork of the same network instance.
//!
//! Every node advertises a signed record carrying a 16-byte fork identity
//! (`eth2` entry): the 4-byte digest of the active fork version and the
//! genesis validators root, plus the next planned fork. Candidates whose
//! digest differs are rejected before any connection attempt.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** Fork schedule, digest derivation, node records, the
//!   compatibility rules and the routing table
//! - **Ports Layer:** Trait definitions for external dependencies
//! - **Service Layer:** Local identity lifecycle, compatibility gate,
//!   discover-then-filter pipeline
//! - **Adapters Layer:** Signer, clocks, config sources, UDP engine
//!
//! ## Feature Flags
//!
//! - `network` (default) - UDP discovery engine and TOML config loading
//! - `test-utils` - `FixedTimeSource` and scoped config overrides
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use fork_discovery::{
//!     compute_fork_digest, CompatibilityGate, ForkVersion, LocalIdentity, NetworkConfig,
//!     NodeRecord, NodeRecordConfig, RecordSigner, Root, Secp256k1Signer, SharedNetworkConfig,
//!     SystemTimeSource,
//! };
//!
//! // Digest of the zero version on a network whose root is not yet known.
//! let digest = compute_fork_digest(ForkVersion([0, 0, 0, 0]), &Root::ZERO);
//! assert_eq!(digest.0, [0xf5, 0xa5, 0xfd, 0x42]);
//!
//! let signer = Arc::new(Secp256k1Signer::random());
//! let record = NodeRecord::new_unsigned(NodeRecordConfig {
//!     seq: 0,
//!     pubkey: signer.public_key(),
//!     ip: None,
//!     udp_port: Some(9000),
//!     tcp_port: Some(13000),
//! });
//!
//! // No genesis yet: the record carries the pre-genesis fork entry.
//! let identity = Arc::new(
//!     LocalIdentity::new(
//!         record,
//!         signer,
//!         SharedNetworkConfig::new(NetworkConfig::default()),
//!         None,
//!         Arc::new(SystemTimeSource::new()),
//!     )
//!     .unwrap(),
//! );
//! let gate = CompatibilityGate::new(identity.clone());
//!
//! // A node never accepts itself.
//! assert!(!gate.filter_peer(&identity.record().unwrap()).is_accepted());
//! ```

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Test utilities (FixedTimeSource)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// CORE RE-EXPORTS
// =============================================================================

// Fork identity
pub use domain::{
    compute_fork_digest, create_fork_digest, current_epoch, ChainSpec, Epoch, Fork, ForkDigest,
    ForkSchedule, ForkVersion, GenesisInfo, NetworkConfig, Root, SharedNetworkConfig,
    FAR_FUTURE_EPOCH, GENESIS_EPOCH,
};

// Records
pub use domain::{
    retrieve_fork_entry, EnrForkId, NodeRecord, NodeRecordConfig, PublicKey, RecordSigner,
    Signature, ENR_FORK_ID_KEY, ENR_PREFIX,
};

// Compatibility rules
pub use domain::{evaluate_fork_compatibility, FilterDecision, RejectReason, WarningReason};

// Routing
pub use domain::{
    find_k_closest, sort_by_distance, xor_distance, DiscoveryConfig, Distance, InsertOutcome,
    NodeId, RoutingTable, Timestamp,
};

// Errors
pub use domain::{
    ConfigError, DecodeError, DiscoveryError, IdentityError, RecordError, SigningError,
};

// Port traits
pub use ports::{ConfigProvider, DiscoveryEngine, ForkFilterApi, PeerSourceApi, TimeSource};

// Service
pub use service::{
    attach_fork_entry, CompatibilityGate, DiscoveryPipeline, FilterStats, LocalIdentity,
};

// =============================================================================
// ADAPTER RE-EXPORTS
// =============================================================================

pub use adapters::{Secp256k1Signer, StaticConfigProvider, SystemTimeSource};

#[cfg(feature = "network")]
pub use adapters::{TomlConfigProvider, UdpDiscovery};

// =============================================================================
// TEST UTILITIES (Requires `test-utils` feature)
// =============================================================================

#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::FixedTimeSource;
