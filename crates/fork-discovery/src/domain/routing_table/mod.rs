//! Routing Table Implementation
//!
//! Flat Kademlia table of signed node records, one k-bucket per bit of
//! XOR distance from the local node.

// Semantic submodules
mod bucket;
mod table;

// Re-export public API
pub use bucket::{KBucket, TableEntry};
pub use table::{InsertOutcome, RoutingTable, NUM_BUCKETS};
