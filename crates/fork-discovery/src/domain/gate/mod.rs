//! # Compatibility Gate
//!
//! Pure decision procedure run on every discovered peer before it is handed
//! to the connection manager.
//!
//! - Digest mismatch is a hard partition boundary: `Reject`
//! - Next-fork disagreement is tolerated: `AcceptWithWarning`
//!
//! No state is kept between evaluations.

// Semantic submodules
mod compatibility;
mod decision;

// Re-export public API
pub use compatibility::evaluate_fork_compatibility;
pub use decision::{FilterDecision, RejectReason, WarningReason};
