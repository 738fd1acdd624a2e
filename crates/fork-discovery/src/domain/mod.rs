//! Domain Layer - Pure fork-identity and Kademlia logic with no I/O
//!
//! This module contains:
//! - Fork schedule resolution and fork digest derivation
//! - Signed node records and the fork-identity entry (EIP-778)
//! - The fork compatibility decision procedure
//! - Node identifiers, XOR distance and the routing table

pub mod enr;
pub mod fork;
pub mod gate;
pub mod routing_table;
pub mod services;
/// Core domain types (entities, values, errors)
pub mod types;

pub use enr::*;
pub use fork::*;
pub use gate::*;
pub use routing_table::*;
pub use services::*;
pub use types::*;
