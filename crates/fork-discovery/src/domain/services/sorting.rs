//! Record sorting and selection.

use crate::domain::enr::NodeRecord;
use crate::domain::NodeId;

/// Sort records by XOR distance to `target` (closest first).
pub fn sort_by_distance(records: &mut [NodeRecord], target: &NodeId) {
    records.sort_by_cached_key(|r| DistanceKey::new(&r.node_id(), target));
}

/// Up to `k` records closest to `target`.
pub fn find_k_closest(records: &[NodeRecord], target: &NodeId, k: usize) -> Vec<NodeRecord> {
    let mut sorted = records.to_vec();
    sort_by_distance(&mut sorted, target);
    sorted.truncate(k);
    sorted
}

/// XOR of an id with the target. Byte-wise ordering equals distance ordering.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct DistanceKey([u8; 32]);

impl DistanceKey {
    fn new(id: &NodeId, target: &NodeId) -> Self {
        let mut out = [0u8; 32];
        for (o, (a, b)) in out.iter_mut().zip(id.as_bytes().iter().zip(target.as_bytes())) {
            *o = a ^ b;
        }
        Self(out)
    }
}
