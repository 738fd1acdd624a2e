//! # UDP Discovery Engine
//!
//! Compact Kademlia-style discovery over tokio UDP.
//!
//! - One actor task owns the socket, the routing table and pending requests
//! - Handles talk to it over an `mpsc` channel with `oneshot` replies
//! - Every record received is size-checked and signature-verified
//! - A periodic tick re-derives the local fork entry across epoch rollovers

// Semantic submodules
mod actor;
mod engine;
/// Wire protocol
pub mod wire;

// Re-export public API
pub use engine::UdpDiscovery;
pub use wire::{
    Message, MessageType, WireError, MAX_NODES_PER_PACKET, MAX_PACKET_SIZE, MAX_RECORD_SIZE,
};
