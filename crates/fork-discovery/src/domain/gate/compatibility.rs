//! Fork compatibility rules.

use super::decision::{FilterDecision, RejectReason, WarningReason};
use crate::domain::enr::{retrieve_fork_entry, EnrForkId, NodeRecord};
use crate::domain::fork::ForkDigest;
use crate::domain::NodeId;

/// Decide whether `candidate` may be dialed by the local node.
///
/// `local_digest` and `announced` must both be derived for the current
/// epoch, normally from the same `EnrForkId`. Checks run in a fixed order
/// and the first failing one decides.
pub fn evaluate_fork_compatibility(
    candidate: &NodeRecord,
    local_id: &NodeId,
    local_digest: ForkDigest,
    announced: &EnrForkId,
) -> FilterDecision {
    if candidate.tcp_socket_addr().is_none() {
        return FilterDecision::Reject(RejectReason::NotDialable);
    }
    if candidate.node_id() == *local_id {
        return FilterDecision::Reject(RejectReason::SelfRecord);
    }

    let remote = match retrieve_fork_entry(candidate) {
        Ok(entry) => entry,
        Err(err) => return FilterDecision::Reject(RejectReason::MalformedForkData(err)),
    };

    if remote.fork_digest != local_digest {
        return FilterDecision::Reject(RejectReason::ForkDigestMismatch {
            local: local_digest,
            remote: remote.fork_digest,
        });
    }

    if remote.next_fork_version != announced.next_fork_version {
        return FilterDecision::AcceptWithWarning(WarningReason::NextForkVersionMismatch {
            local: announced.next_fork_version,
            remote: remote.next_fork_version,
        });
    }

    if remote.next_fork_epoch != announced.next_fork_epoch {
        return FilterDecision::AcceptWithWarning(WarningReason::NextForkEpochMismatch {
            local: announced.next_fork_epoch,
            remote: remote.next_fork_epoch,
        });
    }

    FilterDecision::Accept
}
