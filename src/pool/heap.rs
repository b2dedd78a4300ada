//! Priced min-heap over pending transactions (§4.2).
//!
//! Grounded on the `other_examples` `BestTransactions` fragment's
//! `all: BTreeMap<TransactionId, _>` / `independent: BTreeSet<_>` pattern:
//! ordering by a derived priority key via a `BTreeSet`, generalized here
//! into a full add/pop/remove/re-key contract instead of a one-shot
//! iterator. Removal is lazy (mark-stale, skip on pop) per the spec;
//! `cleanup()` compacts once the stale count crosses a configured
//! threshold.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::identifier::TransactionId;

/// A single heap entry: effective price ascending, ties broken by
/// insertion order (older first), per §4.2's "Ordering" rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct HeapKey {
    price: u128,
    submission_id: u64,
    id: TransactionId,
}

/// Lazily-deleted min-heap keyed by effective gas price.
///
/// Held under the owning component's lock (§5: "Priced heap operations are
/// always performed under the owner's lock").
#[derive(Debug)]
pub struct PricedHeap {
    entries: BTreeSet<HeapKey>,
    /// Current key for every live (non-stale) entry, needed to remove an
    /// entry by `TransactionId` alone and to rebuild on `rekey`.
    keys: HashMap<TransactionId, HeapKey>,
    stale: HashSet<TransactionId>,
    stale_threshold: usize,
}

impl PricedHeap {
    pub fn new(stale_threshold: usize) -> Self {
        Self {
            entries: BTreeSet::new(),
            keys: HashMap::new(),
            stale: HashSet::new(),
            stale_threshold,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Idempotent on `id`: re-adding an already-present, non-stale id is a
    /// no-op (the existing key is kept rather than duplicated).
    pub fn add_pending(&mut self, id: TransactionId, submission_id: u64, price: u128) {
        if self.keys.contains_key(&id) {
            return;
        }
        let key = HeapKey { price, submission_id, id };
        self.entries.insert(key);
        self.keys.insert(id, key);
    }

    /// Lazy removal: the entry is marked stale and skipped by `pop_cheapest`
    /// and `peek_highest`, but not physically removed from `entries` until
    /// `cleanup()`.
    pub fn remove(&mut self, id: &TransactionId) {
        if self.keys.remove(id).is_some() {
            self.stale.insert(*id);
            if self.stale.len() >= self.stale_threshold {
                self.cleanup();
            }
        }
    }

    /// Pops and returns the id of the lowest-priced non-stale entry.
    pub fn pop_cheapest(&mut self) -> Option<TransactionId> {
        loop {
            let key = *self.entries.iter().next()?;
            self.entries.remove(&key);
            if self.stale.remove(&key.id) {
                continue;
            }
            // `keys` may already be gone if `remove` raced a `cleanup`; that
            // can't happen under the single-lock discipline, but guard anyway.
            if self.keys.remove(&key.id).is_some() {
                return Some(key.id);
            }
        }
    }

    /// Returns (without removing) the id of the highest-priced non-stale
    /// entry.
    pub fn peek_highest(&self) -> Option<TransactionId> {
        self.entries
            .iter()
            .rev()
            .find(|key| !self.stale.contains(&key.id))
            .map(|key| key.id)
    }

    /// Re-keys every live entry with a freshly computed price (§4.2:
    /// "`set_base_fee(bf)` re-keys all entries and re-heapifies"). Entries
    /// whose id is absent from `prices` are dropped (treated as removed).
    pub fn rekey(&mut self, prices: impl IntoIterator<Item = (TransactionId, u128)>) {
        let submission_ids: HashMap<TransactionId, u64> =
            self.keys.iter().map(|(id, key)| (*id, key.submission_id)).collect();
        self.entries.clear();
        self.keys.clear();
        self.stale.clear();
        for (id, price) in prices {
            if let Some(submission_id) = submission_ids.get(&id) {
                let key = HeapKey { price, submission_id: *submission_id, id };
                self.entries.insert(key);
                self.keys.insert(id, key);
            }
        }
    }

    /// Rebuilds `entries` to physically drop every stale key.
    pub fn cleanup(&mut self) {
        if self.stale.is_empty() {
            return;
        }
        self.entries.retain(|key| !self.stale.contains(&key.id));
        self.stale.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::SenderId;

    fn id(sender: u64, nonce: u64) -> TransactionId {
        TransactionId::new(SenderId(sender), nonce)
    }

    #[test]
    fn pops_cheapest_first() {
        let mut heap = PricedHeap::new(256);
        heap.add_pending(id(0, 0), 0, 300);
        heap.add_pending(id(1, 0), 1, 100);
        heap.add_pending(id(2, 0), 2, 200);

        assert_eq!(heap.pop_cheapest(), Some(id(1, 0)));
        assert_eq!(heap.pop_cheapest(), Some(id(2, 0)));
        assert_eq!(heap.pop_cheapest(), Some(id(0, 0)));
        assert_eq!(heap.pop_cheapest(), None);
    }

    #[test]
    fn ties_broken_by_insertion_order() {
        let mut heap = PricedHeap::new(256);
        heap.add_pending(id(0, 0), 5, 100);
        heap.add_pending(id(1, 0), 1, 100);
        // both priced 100; the older (smaller submission_id) pops first.
        assert_eq!(heap.pop_cheapest(), Some(id(1, 0)));
        assert_eq!(heap.pop_cheapest(), Some(id(0, 0)));
    }

    #[test]
    fn lazy_remove_skipped_on_pop() {
        let mut heap = PricedHeap::new(256);
        heap.add_pending(id(0, 0), 0, 100);
        heap.add_pending(id(1, 0), 1, 200);
        heap.remove(&id(0, 0));
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.pop_cheapest(), Some(id(1, 0)));
    }

    #[test]
    fn peek_highest_skips_stale_without_removing() {
        let mut heap = PricedHeap::new(256);
        heap.add_pending(id(0, 0), 0, 100);
        heap.add_pending(id(1, 0), 1, 200);
        heap.remove(&id(1, 0));
        assert_eq!(heap.peek_highest(), Some(id(0, 0)));
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn rekey_reprices_every_live_entry() {
        let mut heap = PricedHeap::new(256);
        heap.add_pending(id(0, 0), 0, 100);
        heap.add_pending(id(1, 0), 1, 200);
        heap.rekey([(id(0, 0), 500), (id(1, 0), 50)]);
        assert_eq!(heap.pop_cheapest(), Some(id(1, 0)));
        assert_eq!(heap.pop_cheapest(), Some(id(0, 0)));
    }

    #[test]
    fn cleanup_compacts_stale_entries() {
        let mut heap = PricedHeap::new(2);
        heap.add_pending(id(0, 0), 0, 100);
        heap.add_pending(id(1, 0), 1, 200);
        heap.add_pending(id(2, 0), 2, 300);
        heap.remove(&id(0, 0));
        heap.remove(&id(1, 0));
        // stale_threshold of 2 was hit inside the second `remove` call.
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.pop_cheapest(), Some(id(2, 0)));
    }
}
