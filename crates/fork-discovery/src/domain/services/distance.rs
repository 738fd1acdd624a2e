//! XOR-metric distance calculations.

use crate::domain::{Distance, NodeId};

/// Bucket-level distance between two ids.
///
/// Symmetric. The result is the index of the first differing bit, so lower
/// values mean farther apart; identical ids map to 255.
pub fn xor_distance(a: &NodeId, b: &NodeId) -> Distance {
    Distance::new(bucket_for_peer(a, b) as u8)
}

/// Bucket a remote node falls into relative to the local node.
#[inline]
pub fn bucket_for_peer(local: &NodeId, remote: &NodeId) -> usize {
    let local_bytes = local.as_bytes();
    let remote_bytes = remote.as_bytes();

    for i in 0..32 {
        let xor = local_bytes[i] ^ remote_bytes[i];
        if xor != 0 {
            return i * 8 + xor.leading_zeros() as usize;
        }
    }

    255
}
