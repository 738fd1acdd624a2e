//! Main RoutingTable implementation.

use crate::domain::enr::NodeRecord;
use crate::domain::services::{bucket_for_peer, find_k_closest};
use crate::domain::{NodeId, Timestamp};

use super::bucket::KBucket;

/// Number of buckets, one per bit of the id.
pub const NUM_BUCKETS: usize = 256;

/// What `RoutingTable::insert` did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// New node added.
    Inserted,
    /// Known node, newer record stored.
    Updated,
    /// Known node, record not newer; only liveness refreshed.
    Refreshed,
    /// Bucket full, record dropped.
    BucketFull,
    /// Record of the local node, ignored.
    SelfRecord,
}

/// Kademlia routing table keyed by the local node id.
#[derive(Debug)]
pub struct RoutingTable {
    local_node_id: NodeId,
    buckets: Vec<KBucket>,
    k: usize,
}

impl RoutingTable {
    /// Create an empty table with bucket size `k`.
    pub fn new(local_node_id: NodeId, k: usize) -> Self {
        Self {
            local_node_id,
            buckets: (0..NUM_BUCKETS).map(|_| KBucket::new()).collect(),
            k: k.max(1),
        }
    }

    /// Local node id.
    pub fn local_node_id(&self) -> &NodeId {
        &self.local_node_id
    }

    /// Total entries across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(KBucket::len).sum()
    }

    /// True if no entries.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(KBucket::is_empty)
    }

    /// Add or refresh a record.
    ///
    /// Records are assumed verified. A known node's record is only replaced
    /// by one with a higher sequence number.
    pub fn insert(&mut self, record: NodeRecord, now: Timestamp) -> InsertOutcome {
        let node_id = record.node_id();
        if node_id == self.local_node_id {
            return InsertOutcome::SelfRecord;
        }

        let bucket = &mut self.buckets[bucket_for_peer(&self.local_node_id, &node_id)];

        if let Some(pos) = bucket.position(&node_id) {
            if record.seq() > bucket.entries[pos].record.seq() {
                bucket.refresh(pos, Some(record), now);
                return InsertOutcome::Updated;
            }
            bucket.refresh(pos, None, now);
            return InsertOutcome::Refreshed;
        }

        if bucket.is_full(self.k) {
            return InsertOutcome::BucketFull;
        }

        bucket.push(record, now);
        InsertOutcome::Inserted
    }

    /// Look up a node's record.
    pub fn get(&self, node_id: &NodeId) -> Option<&NodeRecord> {
        let bucket = &self.buckets[bucket_for_peer(&self.local_node_id, node_id)];
        bucket.position(node_id).map(|pos| &bucket.entries[pos].record)
    }

    /// Remove a node, returning its record.
    pub fn remove(&mut self, node_id: &NodeId) -> Option<NodeRecord> {
        let idx = bucket_for_peer(&self.local_node_id, node_id);
        self.buckets[idx].remove(node_id).map(|e| e.record)
    }

    /// Up to `n` records closest to `target`.
    pub fn closest(&self, target: &NodeId, n: usize) -> Vec<NodeRecord> {
        find_k_closest(&self.records(), target, n)
    }

    /// All records.
    pub fn records(&self) -> Vec<NodeRecord> {
        self.buckets
            .iter()
            .flat_map(|b| b.entries().iter().map(|e| e.record.clone()))
            .collect()
    }

    /// Bucket at `index`, if any.
    pub fn bucket(&self, index: usize) -> Option<&KBucket> {
        self.buckets.get(index)
    }
}
