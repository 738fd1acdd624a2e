//! # Fork-Aware Discovery Service
//!
//! Wires the pure domain to the ports:
//!
//! - `LocalIdentity` owns and re-signs the local record
//! - `CompatibilityGate` applies the fork rules against it
//! - `DiscoveryPipeline` feeds engine lookups through the gate

// Semantic submodules
mod gate;
mod identity;
mod pipeline;

// Re-export public API
pub use gate::CompatibilityGate;
pub use identity::{attach_fork_entry, LocalIdentity};
pub use pipeline::{DiscoveryPipeline, FilterStats};

#[cfg(test)]
mod tests;
