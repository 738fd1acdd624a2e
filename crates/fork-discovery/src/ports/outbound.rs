//! # Driven Ports (Outbound SPI)
//!
//! Interfaces the host application (or the bundled adapters) must provide.

use async_trait::async_trait;

use crate::domain::{DiscoveryConfig, GenesisInfo, NetworkConfig, NodeId, NodeRecord, Timestamp};

pub use crate::domain::RecordSigner;

/// Abstract interface for time-related operations.
///
/// Enables deterministic testing by injecting controllable time sources.
/// Production implementations use system time; tests use fixed timestamps.
pub trait TimeSource: Send + Sync {
    /// Get the current timestamp.
    fn now(&self) -> Timestamp;
}

/// Abstract interface for configuration loading.
pub trait ConfigProvider: Send + Sync {
    /// Fork schedule and slot timing.
    fn network_config(&self) -> NetworkConfig;

    /// Discovery engine parameters.
    fn discovery_config(&self) -> DiscoveryConfig;

    /// Genesis data, if already known. `None` runs the node pre-genesis.
    fn genesis(&self) -> Option<GenesisInfo>;

    /// Textual (`enr:`) records of the bootstrap nodes.
    fn bootstrap_records(&self) -> Vec<String>;

    /// Persistent secret key. `None` means use an ephemeral one.
    fn node_key(&self) -> Option<[u8; 32]> {
        None
    }
}

/// Distributed lookup over the discovery network.
///
/// Candidates returned by `lookup` have valid signatures but are otherwise
/// unfiltered. Closing is idempotent and safe while lookups are in flight;
/// those lookups return whatever they had collected.
#[async_trait]
pub trait DiscoveryEngine: Send + Sync {
    /// Nodes found while searching toward `target`, closest first.
    async fn lookup(&self, target: NodeId) -> Vec<NodeRecord>;

    /// The record this node currently advertises.
    fn local_record(&self) -> NodeRecord;

    /// Stop the engine and wait for its background task to exit.
    async fn close(&self);
}
