//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Ports (Inbound):** APIs this crate exposes to the connection manager
//! - **Driven Ports (Outbound):** SPIs this crate requires from adapters

pub mod inbound;
pub mod outbound;

pub use inbound::{ForkFilterApi, PeerSourceApi};
pub use outbound::{ConfigProvider, DiscoveryEngine, TimeSource};
