//! Future-transaction queue manager (§4.3): per-sender, nonce-sorted
//! queues for transactions not yet contiguous with the account's
//! `pending_nonce`, plus per-account and global capacity enforcement and
//! contiguous-prefix promotion.
//!
//! New module; grounded structurally on the teacher's two-tier
//! `OrderStorage`/`LimitOrderPool` shape (a per-entity map guarded by a
//! size tracker, `order_storage.rs`/`limit/mod.rs`), generalized from
//! angstrom's order-matching domain to nonce-keyed transaction queuing.
//! Per DESIGN.md's resolution of the "does the priced heap see queued
//! transactions" open question, this module owns its own [`PricedHeap`]
//! scoped to just the queued set rather than sharing the main pool's.

use std::collections::{BTreeMap, HashMap};

use crate::identifier::{SenderId, TransactionId};
use crate::pool::heap::PricedHeap;
use crate::validate::ValidTx;

type SenderQueue = BTreeMap<u64, ValidTx>;

/// Per-sender future-transaction queues with global and per-account
/// priced eviction.
#[derive(Debug)]
pub struct QueueManager {
    per_sender: HashMap<SenderId, SenderQueue>,
    /// Global priced index over every queued transaction, used for
    /// whole-pool capacity eviction (§4.3: "when global cap reached, evict
    /// lowest effective-price tx across all senders").
    global_heap: PricedHeap,
    max_per_sender: usize,
    max_total: usize,
}

impl QueueManager {
    pub fn new(max_per_sender: usize, max_total: usize, heap_stale_threshold: usize) -> Self {
        Self {
            per_sender: HashMap::new(),
            global_heap: PricedHeap::new(heap_stale_threshold),
            max_per_sender,
            max_total,
        }
    }

    pub fn total_count(&self) -> usize {
        self.global_heap.len()
    }

    pub fn count_for_sender(&self, sender: SenderId) -> usize {
        self.per_sender.get(&sender).map_or(0, |q| q.len())
    }

    pub fn get(&self, sender: SenderId, nonce: u64) -> Option<&ValidTx> {
        self.per_sender.get(&sender)?.get(&nonce)
    }

    pub fn is_full_for_sender(&self, sender: SenderId) -> bool {
        self.count_for_sender(sender) >= self.max_per_sender
    }

    pub fn is_globally_full(&self) -> bool {
        self.total_count() >= self.max_total
    }

    /// Inserts (or same-nonce replaces) `tx`. Returns the previous occupant
    /// of that `(sender, nonce)` slot, if any — callers perform the RBF
    /// acceptance check before calling this.
    pub fn insert(&mut self, sender: SenderId, submission_id: u64, base_fee: u128, tx: ValidTx) -> Option<ValidTx> {
        let nonce = tx.nonce();
        let id = TransactionId::new(sender, nonce);
        let price = tx.effective_price(base_fee);
        let previous = self.per_sender.entry(sender).or_default().insert(nonce, tx);
        if previous.is_some() {
            self.global_heap.remove(&id);
        }
        self.global_heap.add_pending(id, submission_id, price);
        previous
    }

    pub fn remove(&mut self, sender: SenderId, nonce: u64) -> Option<ValidTx> {
        let queue = self.per_sender.get_mut(&sender)?;
        let removed = queue.remove(&nonce);
        if removed.is_some() {
            self.global_heap.remove(&TransactionId::new(sender, nonce));
            if queue.is_empty() {
                self.per_sender.remove(&sender);
            }
        }
        removed
    }

    /// Removes and returns the lowest-priced queued transaction belonging
    /// to `sender` (per-account eviction, §4.3).
    pub fn evict_cheapest_for_sender(&mut self, sender: SenderId) -> Option<ValidTx> {
        let queue = self.per_sender.get(&sender)?;
        let (cheapest_nonce, _) = queue
            .iter()
            .min_by(|(_, a), (_, b)| {
                // base fee is not tracked per-entry here; callers needing an
                // exact price comparison use `evict_cheapest_global`, which is
                // heap-backed. This path compares by fee_cap as a cheap proxy
                // when no base fee context is available (e.g. pure per-account
                // pruning), then falls back to nonce order.
                a.transaction.fee_cap().cmp(&b.transaction.fee_cap())
            })
            .map(|(nonce, tx)| (*nonce, tx.clone()))?;
        self.remove(sender, cheapest_nonce)
    }

    /// Removes and returns the globally lowest-priced queued transaction
    /// (§4.3 global eviction), `None` if the queue is empty.
    pub fn evict_cheapest_global(&mut self) -> Option<ValidTx> {
        let id = self.global_heap.pop_cheapest()?;
        let queue = self.per_sender.get_mut(&id.sender)?;
        let removed = queue.remove(&id.nonce);
        if queue.is_empty() {
            self.per_sender.remove(&id.sender);
        }
        removed
    }

    /// Removes and returns the contiguous prefix `[base_nonce, base_nonce+1,
    /// ...]` from `sender`'s queue (§4.3 `promote_ready`), in nonce-ascending
    /// order.
    pub fn promote_ready(&mut self, sender: SenderId, base_nonce: u64) -> Vec<ValidTx> {
        let mut promoted = Vec::new();
        let mut next = base_nonce;
        loop {
            let Some(queue) = self.per_sender.get_mut(&sender) else { break };
            let Some(tx) = queue.remove(&next) else { break };
            self.global_heap.remove(&TransactionId::new(sender, next));
            promoted.push(tx);
            next += 1;
        }
        if let Some(queue) = self.per_sender.get(&sender) {
            if queue.is_empty() {
                self.per_sender.remove(&sender);
            }
        }
        promoted
    }

    /// Drops every entry for `sender` with `nonce < min_nonce` (used by
    /// reset-on-reorg, §4.4); returns the dropped transactions.
    pub fn drop_below(&mut self, sender: SenderId, min_nonce: u64) -> Vec<ValidTx> {
        let Some(queue) = self.per_sender.get_mut(&sender) else { return Vec::new() };
        let stale_nonces: Vec<u64> = queue.range(..min_nonce).map(|(n, _)| *n).collect();
        let mut dropped = Vec::with_capacity(stale_nonces.len());
        for nonce in stale_nonces {
            if let Some(tx) = queue.remove(&nonce) {
                self.global_heap.remove(&TransactionId::new(sender, nonce));
                dropped.push(tx);
            }
        }
        if queue.is_empty() {
            self.per_sender.remove(&sender);
        }
        dropped
    }

    pub fn transactions_for_sender(&self, sender: SenderId) -> Vec<ValidTx> {
        self.per_sender.get(&sender).map(|q| q.values().cloned().collect()).unwrap_or_default()
    }

    pub fn all_transactions(&self) -> Vec<ValidTx> {
        self.per_sender.values().flat_map(|q| q.values().cloned()).collect()
    }

    /// Re-keys the global eviction heap after a base-fee update.
    pub fn set_base_fee(&mut self, base_fee: u128) {
        let prices: Vec<(TransactionId, u128)> = self
            .per_sender
            .iter()
            .flat_map(|(sender, queue)| {
                queue.iter().map(move |(nonce, tx)| {
                    (TransactionId::new(*sender, *nonce), tx.effective_price(base_fee))
                })
            })
            .collect();
        self.global_heap.rekey(prices);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use alloy_primitives::{Address, TxHash, U256};

    use super::*;
    use crate::identifier::TransactionId as Tid;
    use crate::traits::TransactionOrigin;
    use crate::tx::{PoolTransaction, To, TxKind};
    use crate::validate::ValidPoolTransaction;

    fn mock_tx(sender_id: SenderId, sender: Address, nonce: u64, fee_cap: u128, submission_id: u64) -> ValidTx {
        let tx = PoolTransaction {
            kind: TxKind::DynamicFee,
            hash: TxHash::from_slice(&[nonce as u8; 32]),
            sender,
            nonce,
            gas_limit: 21_000,
            to: To::Call(Address::ZERO),
            value: U256::ZERO,
            data: Default::default(),
            access_list: vec![],
            authorization_list: vec![],
            chain_id: None,
            gas_price: None,
            max_fee_per_gas: Some(fee_cap),
            max_priority_fee_per_gas: Some(fee_cap),
            max_fee_per_blob_gas: None,
            blob_versioned_hashes: vec![],
            r: U256::from(1u8),
            s: U256::from(1u8),
            encoded_length: 120,
        };
        Arc::new(ValidPoolTransaction {
            transaction_id: Tid::new(sender_id, nonce),
            cost: tx.cost(),
            encoded_length: tx.encoded_length,
            origin: TransactionOrigin::External,
            submission_id,
            timestamp: Instant::now(),
            transaction: tx,
        })
    }

    #[test]
    fn promote_ready_returns_contiguous_prefix_only() {
        let mut q = QueueManager::new(16, 1000, 256);
        let s = SenderId(0);
        q.insert(s, 0, 0, mock_tx(s, Address::ZERO, 2, 100, 0));
        q.insert(s, 1, 0, mock_tx(s, Address::ZERO, 3, 100, 1));
        q.insert(s, 2, 0, mock_tx(s, Address::ZERO, 5, 100, 2));

        let promoted = q.promote_ready(s, 2);
        assert_eq!(promoted.len(), 2);
        assert_eq!(promoted[0].nonce(), 2);
        assert_eq!(promoted[1].nonce(), 3);
        assert_eq!(q.count_for_sender(s), 1);
    }

    #[test]
    fn global_eviction_picks_lowest_price() {
        let mut q = QueueManager::new(16, 1000, 256);
        let a = SenderId(0);
        let b = SenderId(1);
        q.insert(a, 0, 0, mock_tx(a, Address::ZERO, 5, 300, 0));
        q.insert(b, 1, 0, mock_tx(b, Address::with_last_byte(1), 5, 100, 1));

        let evicted = q.evict_cheapest_global().unwrap();
        assert_eq!(evicted.transaction.fee_cap(), 100);
        assert_eq!(q.total_count(), 1);
    }

    #[test]
    fn drop_below_removes_stale_nonces() {
        let mut q = QueueManager::new(16, 1000, 256);
        let s = SenderId(0);
        q.insert(s, 0, 0, mock_tx(s, Address::ZERO, 1, 100, 0));
        q.insert(s, 1, 0, mock_tx(s, Address::ZERO, 2, 100, 1));
        q.insert(s, 2, 0, mock_tx(s, Address::ZERO, 5, 100, 2));

        let dropped = q.drop_below(s, 3);
        assert_eq!(dropped.len(), 2);
        assert_eq!(q.count_for_sender(s), 1);
    }
}
