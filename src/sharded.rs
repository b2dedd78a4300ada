//! Optional sharded hash index for high-throughput deployments (§4.10).
//!
//! Behind `feature = "sharded-index"`: the default, single-lock pool
//! (`pool::txpool::PoolInner`'s `hash_index: RwLock<HashMap<..>>`) is the
//! primary supported configuration (§2 calls this component "optional" and
//! SPEC_FULL.md §4.10 matches the teacher's convention of feature-gating
//! optional subsystems rather than always paying sharding overhead). This
//! module stands alone as a drop-in replacement for that single `RwLock`
//! when one lock becomes contended: `N` shards, each independently locked,
//! selected by the high-order bytes of the transaction hash.

use std::sync::atomic::{AtomicUsize, Ordering};

use alloy_primitives::TxHash;
use parking_lot::RwLock;

use crate::identifier::TransactionId;

/// `N` must be a power of two so shard selection is a cheap mask instead of
/// a modulo; enforced by [`ShardedIndex::new`].
pub struct ShardedIndex {
    shards: Vec<RwLock<std::collections::HashMap<TxHash, TransactionId>>>,
    mask: usize,
}

impl std::fmt::Debug for ShardedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedIndex").field("shards", &self.shards.len()).finish()
    }
}

impl ShardedIndex {
    /// `shard_count` must be a power of two (panics otherwise — this is a
    /// construction-time configuration error, not a runtime condition).
    pub fn new(shard_count: usize) -> Self {
        assert!(shard_count.is_power_of_two(), "shard_count must be a power of two, got {shard_count}");
        Self {
            shards: (0..shard_count).map(|_| RwLock::new(std::collections::HashMap::new())).collect(),
            mask: shard_count - 1,
        }
    }

    /// Routes by the high-order 4 bytes of the hash modulo `N` (§4.10), here
    /// expressed as `& mask` since `N` is a power of two.
    fn shard_for(&self, hash: &TxHash) -> usize {
        let high = u32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]]);
        high as usize & self.mask
    }

    pub fn insert(&self, hash: TxHash, id: TransactionId) {
        let shard = self.shard_for(&hash);
        self.shards[shard].write().insert(hash, id);
    }

    pub fn remove(&self, hash: &TxHash) -> Option<TransactionId> {
        let shard = self.shard_for(hash);
        self.shards[shard].write().remove(hash)
    }

    pub fn get(&self, hash: &TxHash) -> Option<TransactionId> {
        let shard = self.shard_for(hash);
        self.shards[shard].read().get(hash).copied()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cross-shard query (§4.10: "Cross-shard queries (by sender) iterate
    /// all shards"): every entry whose `TransactionId` belongs to `sender`.
    pub fn hashes_for_sender(&self, sender: crate::identifier::SenderId) -> Vec<TxHash> {
        self.shards
            .iter()
            .flat_map(|shard| {
                shard.read().iter().filter(|(_, id)| id.sender == sender).map(|(hash, _)| *hash).collect::<Vec<_>>()
            })
            .collect()
    }

    /// Per-shard occupancy, used by [`Self::rebalance`] to find the
    /// over/under-loaded shards.
    fn loads(&self) -> Vec<usize> {
        self.shards.iter().map(|s| s.read().len()).collect()
    }

    /// Redistributes excess entries from any shard exceeding `1.5 *
    /// average` load into the least-loaded shards (§4.10 "Rebalancing").
    /// Shards are locked one at a time, always visited in ascending
    /// shard-id order for both the scan and the move, so a concurrent
    /// rebalance from another thread cannot form a lock cycle (§5: "the
    /// sharded index... takes shards in shard-id order to prevent cycles").
    pub fn rebalance(&self) {
        let loads = self.loads();
        if loads.is_empty() {
            return;
        }
        let average = loads.iter().sum::<usize>() as f64 / loads.len() as f64;
        let threshold = (1.5 * average).ceil() as usize;

        let overloaded: Vec<usize> = (0..loads.len()).filter(|&i| loads[i] > threshold).collect();
        if overloaded.is_empty() {
            return;
        }

        for over_idx in overloaded {
            loop {
                let current_loads = self.loads();
                if current_loads[over_idx] <= threshold {
                    break;
                }
                let Some((under_idx, _)) =
                    current_loads.iter().enumerate().filter(|&(i, _)| i != over_idx).min_by_key(|&(_, &l)| l)
                else {
                    break;
                };
                // Lock the lower shard-id first regardless of which side is
                // the source, so a concurrent rebalance acquiring the same
                // pair always agrees on ordering and cannot cycle.
                let (lo, hi) = (over_idx.min(under_idx), over_idx.max(under_idx));
                let moved = {
                    let (mut first, mut second) = (self.shards[lo].write(), self.shards[hi].write());
                    let (source, dest) =
                        if over_idx == lo { (&mut first, &mut second) } else { (&mut second, &mut first) };
                    let entry = source.iter().next().map(|(h, id)| (*h, *id));
                    if let Some((hash, id)) = entry {
                        source.remove(&hash);
                        dest.insert(hash, id);
                    }
                    entry
                };
                if moved.is_none() {
                    break;
                }
            }
        }
    }
}

/// Round-robin shard picker for callers that want to pre-size or warm
/// shards before the first real hash arrives (e.g. benchmark setup).
#[derive(Debug, Default)]
pub struct RoundRobin(AtomicUsize);

impl RoundRobin {
    pub fn next(&self, shard_count: usize) -> usize {
        self.0.fetch_add(1, Ordering::Relaxed) % shard_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::SenderId;

    fn hash_with_high_byte(b: u8) -> TxHash {
        let mut bytes = [0u8; 32];
        bytes[0] = b;
        TxHash::from(bytes)
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn rejects_non_power_of_two_shard_count() {
        ShardedIndex::new(3);
    }

    #[test]
    fn routes_and_round_trips_by_hash() {
        let index = ShardedIndex::new(4);
        let id = TransactionId::new(SenderId(0), 0);
        let hash = hash_with_high_byte(0xAB);
        index.insert(hash, id);
        assert_eq!(index.get(&hash), Some(id));
        assert_eq!(index.len(), 1);
        assert_eq!(index.remove(&hash), Some(id));
        assert!(index.is_empty());
    }

    #[test]
    fn cross_shard_query_finds_all_of_a_sender() {
        let index = ShardedIndex::new(4);
        let sender = SenderId(7);
        for b in [0x00u8, 0x40, 0x80, 0xC0] {
            index.insert(hash_with_high_byte(b), TransactionId::new(sender, b as u64));
        }
        let found = index.hashes_for_sender(sender);
        assert_eq!(found.len(), 4);
    }

    #[test]
    fn rebalance_relieves_an_overloaded_shard() {
        let index = ShardedIndex::new(2);
        // Force everything into shard 0 by giving every hash a high byte
        // whose top bit (mod 2 via mask) is 0.
        for i in 0..10u64 {
            let mut bytes = [0u8; 32];
            bytes[0] = 0; // shard 0
            bytes[31] = i as u8;
            index.insert(TxHash::from(bytes), TransactionId::new(SenderId(i), 0));
        }
        assert_eq!(index.loads(), vec![10, 0]);
        index.rebalance();
        let loads = index.loads();
        assert_eq!(loads.iter().sum::<usize>(), 10);
        assert!(loads[1] > 0, "rebalance should have moved some entries into the idle shard");
    }
}
