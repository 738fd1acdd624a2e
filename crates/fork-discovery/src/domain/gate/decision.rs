//! Outcomes of the compatibility check.

use std::fmt;

use crate::domain::fork::{Epoch, ForkDigest, ForkVersion};
use crate::domain::DecodeError;

/// Decision on whether a discovered peer may be dialed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    /// Same fork, same planned transition.
    Accept,
    /// Same fork today, different planned transition. Still dialable.
    AcceptWithWarning(WarningReason),
    /// Not dialable.
    Reject(RejectReason),
}

impl FilterDecision {
    /// True for `Accept` and `AcceptWithWarning`.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Reject(_))
    }

    /// True only for `AcceptWithWarning`.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::AcceptWithWarning(_))
    }
}

impl fmt::Display for FilterDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::AcceptWithWarning(reason) => write!(f, "accept with warning: {reason}"),
            Self::Reject(reason) => write!(f, "reject: {reason}"),
        }
    }
}

/// Why a peer was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Record has no IP or no TCP port.
    NotDialable,
    /// Record belongs to the local node.
    SelfRecord,
    /// Fork entry missing or undecodable.
    MalformedForkData(DecodeError),
    /// Peer follows another fork or another network instance.
    ForkDigestMismatch {
        /// Our current digest.
        local: ForkDigest,
        /// Digest the peer advertises.
        remote: ForkDigest,
    },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDialable => write!(f, "peer record has no dialable address"),
            Self::SelfRecord => write!(f, "record belongs to the local node"),
            Self::MalformedForkData(err) => write!(f, "malformed fork data: {err}"),
            Self::ForkDigestMismatch { local, remote } => {
                write!(f, "fork digest mismatch: local {local}, peer {remote}")
            }
        }
    }
}

/// Why an accepted peer was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningReason {
    /// Peer plans a different next fork version.
    NextForkVersionMismatch {
        /// Version we announce.
        local: ForkVersion,
        /// Version the peer announces.
        remote: ForkVersion,
    },
    /// Peer plans the next fork at a different epoch.
    NextForkEpochMismatch {
        /// Epoch we announce.
        local: Epoch,
        /// Epoch the peer announces.
        remote: Epoch,
    },
}

impl fmt::Display for WarningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NextForkVersionMismatch { local, remote } => write!(
                f,
                "peer matches fork digest but has different next fork version (local {local}, peer {remote})"
            ),
            Self::NextForkEpochMismatch { local, remote } => write!(
                f,
                "peer matches fork digest but has different next fork epoch (local {local}, peer {remote})"
            ),
        }
    }
}
