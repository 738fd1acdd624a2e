//! Lookup → gate → dialable addresses.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{FilterDecision, NodeId, NodeRecord};
use crate::ports::{DiscoveryEngine, ForkFilterApi, PeerSourceApi};

/// Snapshot of gate decisions seen by a pipeline.
///
/// `accepted` counts every dialable candidate; `warned` is the subset that
/// was accepted with a warning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Candidates handed on as dialable.
    pub accepted: u64,
    /// Accepted candidates that disagree about the next fork.
    pub warned: u64,
    /// Candidates refused.
    pub rejected: u64,
}

#[derive(Debug, Default)]
struct FilterCounters {
    accepted: AtomicU64,
    warned: AtomicU64,
    rejected: AtomicU64,
}

/// Runs discovery lookups and passes every candidate through the gate.
pub struct DiscoveryPipeline {
    engine: Arc<dyn DiscoveryEngine>,
    filter: Arc<dyn ForkFilterApi>,
    counters: FilterCounters,
}

impl DiscoveryPipeline {
    /// Create a pipeline over an engine and a gate.
    pub fn new(engine: Arc<dyn DiscoveryEngine>, filter: Arc<dyn ForkFilterApi>) -> Self {
        Self {
            engine,
            filter,
            counters: FilterCounters::default(),
        }
    }

    /// Look up nodes near `target` and return the TCP addresses of the
    /// compatible ones.
    pub async fn discover(&self, target: NodeId) -> Vec<SocketAddr> {
        let candidates = self.engine.lookup(target).await;
        let dialable = self.filter_candidates(&candidates);
        debug!(
            lookup_target = %target,
            candidates = candidates.len(),
            dialable = dialable.len(),
            "discovery round finished"
        );
        dialable
    }

    /// Filter already-discovered records. Duplicate addresses are returned once.
    pub fn filter_candidates(&self, candidates: &[NodeRecord]) -> Vec<SocketAddr> {
        let mut seen = HashSet::new();
        let mut dialable = Vec::new();

        for candidate in candidates {
            let decision = self.filter.filter_peer(candidate);
            match decision {
                FilterDecision::Accept => {
                    self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                }
                FilterDecision::AcceptWithWarning(_) => {
                    self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                    self.counters.warned.fetch_add(1, Ordering::Relaxed);
                }
                FilterDecision::Reject(_) => {
                    self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            }

            if let Some(addr) = candidate.tcp_socket_addr() {
                if seen.insert(addr) {
                    dialable.push(addr);
                }
            }
        }

        dialable
    }

    /// Decision counters since creation.
    pub fn stats(&self) -> FilterStats {
        FilterStats {
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            warned: self.counters.warned.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Arc<dyn DiscoveryEngine> {
        &self.engine
    }
}

#[async_trait]
impl PeerSourceApi for DiscoveryPipeline {
    async fn discover(&self, target: NodeId) -> Vec<SocketAddr> {
        DiscoveryPipeline::discover(self, target).await
    }
}
