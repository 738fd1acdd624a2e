//! K-Bucket implementation for Kademlia routing.

use crate::domain::enr::NodeRecord;
use crate::domain::{NodeId, Timestamp};

/// A record in the table with the time it was last heard from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    /// Latest known record of the node.
    pub record: NodeRecord,
    /// Last time the node answered or was announced.
    pub last_seen: Timestamp,
}

/// A k-bucket storing up to k records at one distance.
///
/// Entries are kept least-recently-seen first. A full bucket keeps its
/// existing entries and drops newcomers, which favours long-lived nodes.
#[derive(Debug, Clone, Default)]
pub struct KBucket {
    pub(crate) entries: Vec<TableEntry>,
}

impl KBucket {
    /// Create a new empty k-bucket
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the bucket is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the bucket is full
    pub fn is_full(&self, k: usize) -> bool {
        self.entries.len() >= k
    }

    /// Entries, least recently seen first.
    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub(crate) fn position(&self, node_id: &NodeId) -> Option<usize> {
        self.entries.iter().position(|e| e.record.node_id() == *node_id)
    }

    /// Append as most recently seen (assumes not full).
    pub(crate) fn push(&mut self, record: NodeRecord, now: Timestamp) {
        self.entries.push(TableEntry {
            record,
            last_seen: now,
        });
    }

    /// Move an entry to the most-recently-seen end, optionally replacing its record.
    pub(crate) fn refresh(&mut self, pos: usize, record: Option<NodeRecord>, now: Timestamp) {
        let mut entry = self.entries.remove(pos);
        if let Some(record) = record {
            entry.record = record;
        }
        entry.last_seen = now;
        self.entries.push(entry);
    }

    pub(crate) fn remove(&mut self, node_id: &NodeId) -> Option<TableEntry> {
        self.position(node_id).map(|pos| self.entries.remove(pos))
    }
}
