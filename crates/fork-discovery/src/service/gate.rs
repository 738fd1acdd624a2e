//! Compatibility gate bound to the local identity.

use std::sync::Arc;

use tracing::{debug, trace};

use super::identity::LocalIdentity;
use crate::domain::{evaluate_fork_compatibility, FilterDecision, NodeRecord};
use crate::ports::ForkFilterApi;

/// Applies the fork compatibility rules against the node's own fork
/// identity.
///
/// The local fork identity is derived fresh on every call, so a fork
/// transition is reflected immediately even if the record could not be
/// re-signed yet.
#[derive(Debug, Clone)]
pub struct CompatibilityGate {
    identity: Arc<LocalIdentity>,
}

impl CompatibilityGate {
    /// Create a gate for `identity`.
    pub fn new(identity: Arc<LocalIdentity>) -> Self {
        Self { identity }
    }

    /// Decide whether `candidate` may be dialed.
    pub fn filter_peer(&self, candidate: &NodeRecord) -> FilterDecision {
        let local = self.identity.expected_fork_id();
        let decision = evaluate_fork_compatibility(
            candidate,
            &self.identity.node_id(),
            local.fork_digest,
            &local,
        );

        match &decision {
            FilterDecision::Accept => {
                trace!(peer = %candidate.node_id(), "peer accepted");
            }
            FilterDecision::AcceptWithWarning(reason) => {
                debug!(peer = %candidate.node_id(), %reason, "peer accepted with warning");
            }
            FilterDecision::Reject(reason) => {
                debug!(peer = %candidate.node_id(), %reason, "peer rejected");
            }
        }

        decision
    }
}

impl ForkFilterApi for CompatibilityGate {
    fn filter_peer(&self, candidate: &NodeRecord) -> FilterDecision {
        CompatibilityGate::filter_peer(self, candidate)
    }
}
