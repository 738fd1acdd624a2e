//! # Node Records
//!
//! Self-signed node identity records carrying the fork-identity entry.
//!
//! ## Security Properties
//!
//! - Self-signed: ECDSA (secp256k1, SHA-256) by the node's own key
//! - Sequence number: bumped on every published change
//! - Bounded: records from the network are size-checked before decoding
//!
//! Reference: EIP-778 (Ethereum Node Records)

// Semantic submodules
pub(crate) mod codec;
mod fork_id;
mod record;
mod security;

// Re-export public API
pub use fork_id::{retrieve_fork_entry, EnrForkId, ENR_FORK_ID_KEY, ENR_FORK_ID_LEN};
pub use record::{NodeRecord, NodeRecordConfig, ENR_PREFIX};
pub use security::{verify_signature, PublicKey, RecordSigner, Signature};

#[cfg(test)]
mod tests;
