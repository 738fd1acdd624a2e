//! # Driving Ports (Inbound API)
//!
//! The APIs the connection manager uses to obtain peers worth dialing.

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::domain::{FilterDecision, NodeId, NodeRecord};

/// Fork compatibility check for a single discovered record.
///
/// Implementations are stateless and may be called from any number of
/// tasks concurrently.
///
/// # Example
///
/// ```rust,ignore
/// fn dialable<F: ForkFilterApi>(filter: &F, records: &[NodeRecord]) -> usize {
///     records.iter().filter(|r| filter.filter_peer(r).is_accepted()).count()
/// }
/// ```
pub trait ForkFilterApi: Send + Sync {
    /// Decide whether the candidate may be dialed.
    fn filter_peer(&self, candidate: &NodeRecord) -> FilterDecision;
}

/// Source of filtered, dialable peer addresses.
#[async_trait]
pub trait PeerSourceApi: Send + Sync {
    /// Run a lookup toward `target` and return the TCP addresses of every
    /// accepted candidate.
    async fn discover(&self, target: NodeId) -> Vec<SocketAddr>;
}
