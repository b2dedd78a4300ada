//! The blob subpool (§4.7): type-3 (EIP-4844) transactions only, tracked
//! separately from the main pool because their gas accounting (blob gas
//! alongside execution gas) and fee floor (blob base fee, independent from
//! the execution base fee) are both distinct dimensions.
//!
//! Structurally this is the main pool's shape (`txpool.rs`) specialized:
//! per-sender nonce-ordered pending/queued storage, a priced heap, an
//! [`AccountTracker`], and an [`RbfEngine`] — all scoped to blob
//! transactions. Per DESIGN.md, blob-subpool accounts are tracked
//! independently from the main pool's; the top-level `Pool` wrapper
//! (`lib.rs`) is responsible for detecting a `(sender, nonce)` collision
//! across the two subpools (e.g. a blob-to-non-blob replacement) before
//! dispatching to either one.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use alloy_primitives::{Address, TxHash, U256};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, instrument};

use crate::config::PoolConfig;
use crate::constants::MAX_BLOB_GAS_PER_BLOCK;
use crate::error::{PolicyError, PoolError, PoolResult};
use crate::fee_math::{blob_base_fee, next_excess_blob_gas};
use crate::identifier::{SenderId, SenderIdentifiers, TransactionId};
use crate::metrics::BlobPoolMetrics;
use crate::pool::account::AccountTracker;
use crate::pool::events::{FullTransactionEvent, PoolEventBroadcast, TransactionEvent, TransactionEvents};
use crate::pool::heap::PricedHeap;
use crate::pool::rbf::RbfEngine;
use crate::traits::TransactionOrigin;
use crate::tx::{PoolTransaction, TxKind};
use crate::validate::{TransactionValidationOutcome, ValidPoolTransaction, ValidTx};

type BlobQueue = BTreeMap<u64, ValidTx>;

/// Type-3-only sibling of [`crate::pool::txpool::PoolInner`].
pub struct BlobPool<S> {
    config: PoolConfig,
    validator: crate::validate::pipeline::Validator<S>,
    identifiers: RwLock<SenderIdentifiers>,
    accounts: RwLock<AccountTracker>,
    pending: RwLock<HashMap<SenderId, BlobQueue>>,
    queued: RwLock<HashMap<SenderId, BlobQueue>>,
    /// Keyed by blob fee cap rather than `effective_price`: the floor that
    /// actually gates blob-transaction inclusion (§4.7).
    heap: RwLock<PricedHeap>,
    rbf: RwLock<RbfEngine>,
    hash_index: RwLock<HashMap<TxHash, (SenderId, u64)>>,
    excess_blob_gas: Mutex<u64>,
    submission_counter: AtomicU64,
    events: Mutex<PoolEventBroadcast>,
    metrics: BlobPoolMetrics,
}

impl<S: crate::traits::StateReader> BlobPool<S> {
    pub fn new(config: PoolConfig, validator: crate::validate::pipeline::Validator<S>) -> Self {
        let heap = PricedHeap::new(config.heap_stale_threshold);
        Self {
            identifiers: RwLock::new(SenderIdentifiers::new()),
            accounts: RwLock::new(AccountTracker::new()),
            pending: RwLock::new(HashMap::new()),
            queued: RwLock::new(HashMap::new()),
            heap: RwLock::new(heap),
            rbf: RwLock::new(RbfEngine::new(config.price_bump, config.max_replacements, config.max_chain_depth)),
            hash_index: RwLock::new(HashMap::new()),
            excess_blob_gas: Mutex::new(0),
            submission_counter: AtomicU64::new(0),
            events: Mutex::new(PoolEventBroadcast::new()),
            metrics: BlobPoolMetrics::default(),
            config,
            validator,
        }
    }

    pub fn blob_base_fee(&self) -> u128 {
        blob_base_fee(*self.excess_blob_gas.lock())
    }

    pub fn excess_blob_gas(&self) -> u64 {
        *self.excess_blob_gas.lock()
    }

    fn next_submission_id(&self) -> u64 {
        self.submission_counter.fetch_add(1, Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.pending.read().values().map(|m| m.len()).sum::<usize>()
            + self.queued.read().values().map(|m| m.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total blob gas committed by pending transactions across every
    /// sender. Used to enforce §4.7's `blob_gas ≤ max_blob_gas_per_block`
    /// on the set of transactions actually ready for the next block; queued
    /// (future-nonce) transactions don't count against it since they can't
    /// be included yet.
    fn pending_blob_gas_used(&self) -> u64 {
        self.pending.read().values().flat_map(|q| q.values()).map(|tx| tx.transaction.blob_gas_used()).sum()
    }

    #[instrument(skip(self, tx), fields(hash))]
    pub async fn add_transaction(&self, origin: TransactionOrigin, peer: Option<Address>, tx: PoolTransaction) -> PoolResult<TxHash> {
        debug_assert_eq!(tx.kind, TxKind::Blob, "BlobPool only accepts type-3 transactions");
        let hash = tx.hash;
        tracing::Span::current().record("hash", tracing::field::display(hash));

        if self.hash_index.read().contains_key(&hash) {
            return Err(PoolError::AlreadyKnown(hash));
        }

        let outcome = self.validator.validate(origin, peer, tx).await;
        let (valid, balance, state_nonce) = match outcome {
            TransactionValidationOutcome::Valid { transaction, balance, state_nonce, .. } => (transaction, balance, state_nonce),
            TransactionValidationOutcome::Invalid(_, err) => return Err(PoolError::Validation(err)),
            TransactionValidationOutcome::Error(hash, _) => return Err(PoolError::AlreadyKnown(hash)),
        };

        self.insert_valid(origin, valid, balance, state_nonce)
    }

    fn insert_valid(&self, origin: TransactionOrigin, tx: PoolTransaction, balance: U256, state_nonce: u64) -> PoolResult<TxHash> {
        let hash = tx.hash;
        let sender_addr = tx.sender;
        let nonce = tx.nonce;
        let cost = tx.cost();

        let sender = self.identifiers.write().sender_id_or_create(sender_addr);
        self.accounts.write().get_or_create(sender, state_nonce, balance);
        let id = TransactionId::new(sender, nonce);
        let pending_nonce = self.accounts.read().get(sender).map_or(state_nonce, |a| a.pending_nonce);

        let valid_tx: ValidTx = Arc::new(ValidPoolTransaction {
            transaction_id: id,
            cost,
            encoded_length: tx.encoded_length,
            origin,
            submission_id: self.next_submission_id(),
            timestamp: Instant::now(),
            transaction: tx,
        });

        let existing = self
            .pending
            .read()
            .get(&sender)
            .and_then(|q| q.get(&nonce))
            .or_else(|| self.queued.read().get(&sender).and_then(|q| q.get(&nonce)))
            .cloned();

        if let Some(existing) = existing {
            let is_pending = self.pending.read().get(&sender).map(|q| q.contains_key(&nonce)).unwrap_or(false);
            return self.apply_replacement(sender, id, existing, valid_tx, is_pending).map(|_| hash);
        }

        self.rbf
            .write()
            .note_fresh_slot(sender)
            .map_err(|_| PoolError::Policy(PolicyError::ChainDepthExceeded(sender_addr)))?;

        let occupied = self.count_for_sender(sender);
        if occupied >= self.config.max_account_slots {
            self.rbf.write().release_chain_slot(sender);
            return Err(PoolError::Policy(PolicyError::SenderLimitExceeded(sender_addr)));
        }

        if nonce == pending_nonce {
            if let Err(err) = self.admit_to_pending(sender, valid_tx) {
                self.rbf.write().release_chain_slot(sender);
                return Err(err);
            }
        } else {
            self.admit_to_queued(sender, valid_tx);
        }

        self.hash_index.write().insert(hash, (sender, nonce));
        Ok(hash)
    }

    fn count_for_sender(&self, sender: SenderId) -> usize {
        self.pending.read().get(&sender).map_or(0, |q| q.len()) + self.queued.read().get(&sender).map_or(0, |q| q.len())
    }

    fn apply_replacement(&self, sender: SenderId, id: TransactionId, existing: ValidTx, incoming: PoolTransaction, is_pending: bool) -> PoolResult<()> {
        self.rbf.write().check_replacement(id, existing.sender(), &existing.transaction, &incoming)?;

        let incoming_hash = incoming.hash;
        let existing_hash = *existing.hash();
        let cost = incoming.cost();

        let valid_tx: ValidTx = Arc::new(ValidPoolTransaction {
            transaction_id: id,
            cost,
            encoded_length: incoming.encoded_length,
            origin: existing.origin,
            submission_id: self.next_submission_id(),
            timestamp: Instant::now(),
            transaction: incoming,
        });

        self.accounts.write().replace_pending_tx(sender, id.nonce, cost);
        let blob_fee_cap = valid_tx.transaction.max_fee_per_blob_gas.unwrap_or_default();

        let store = if is_pending { &self.pending } else { &self.queued };
        store.write().entry(sender).or_default().insert(id.nonce, valid_tx.clone());
        self.heap.write().remove(&id);
        self.heap.write().add_pending(id, valid_tx.submission_id, blob_fee_cap);

        self.hash_index.write().remove(&existing_hash);
        self.hash_index.write().insert(incoming_hash, (sender, id.nonce));
        self.rbf.write().record_accepted(id);

        let mut events = self.events.lock();
        events.notify(existing_hash, TransactionEvent::Replaced(incoming_hash));
        events.notify_all(FullTransactionEvent {
            hash: incoming_hash,
            transaction: valid_tx,
            event: if is_pending { TransactionEvent::Pending } else { TransactionEvent::Queued },
        });
        Ok(())
    }

    fn admit_to_pending(&self, sender: SenderId, tx: ValidTx) -> PoolResult<()> {
        let blob_fee_cap = tx.transaction.max_fee_per_blob_gas.unwrap_or_default();

        if self.len() >= self.config.blob_limit.max_txs {
            self.make_room_for(sender, blob_fee_cap)?;
        }

        let incoming_gas = tx.transaction.blob_gas_used();
        let pending_gas = self.pending_blob_gas_used();
        if pending_gas + incoming_gas > MAX_BLOB_GAS_PER_BLOCK {
            return Err(PoolError::Policy(PolicyError::BlobGasExceeded {
                pending: pending_gas + incoming_gas,
                max: MAX_BLOB_GAS_PER_BLOCK,
            }));
        }

        let id = tx.transaction_id;
        self.pending.write().entry(sender).or_default().insert(id.nonce, tx.clone());
        self.heap.write().add_pending(id, tx.submission_id, blob_fee_cap);
        self.accounts.write().add_pending_tx(sender, id.nonce, tx.cost());
        self.events.lock().notify_all(FullTransactionEvent { hash: *tx.hash(), transaction: tx.clone(), event: TransactionEvent::Pending });
        self.metrics.admissions.increment(1);

        let new_pending_nonce = self.accounts.read().get(sender).map_or(id.nonce + 1, |a| a.pending_nonce);
        self.promote_from_queue(sender, new_pending_nonce);
        Ok(())
    }

    fn admit_to_queued(&self, sender: SenderId, tx: ValidTx) {
        let id = tx.transaction_id;
        self.queued.write().entry(sender).or_default().insert(id.nonce, tx.clone());
        self.accounts.write().add_pending_tx(sender, id.nonce, tx.cost());
        self.events.lock().notify_all(FullTransactionEvent { hash: *tx.hash(), transaction: tx, event: TransactionEvent::Queued });
    }

    /// Evicts the cheapest (lowest blob-fee-cap) unprotected pending blob
    /// transaction, mirroring the main pool's `make_room_for` but keyed on
    /// blob fee cap instead of effective execution price (§4.7).
    fn make_room_for(&self, incoming_sender: SenderId, incoming_blob_fee_cap: u128) -> PoolResult<()> {
        let mut skipped = Vec::new();
        let victim = loop {
            let Some(id) = self.heap.write().pop_cheapest() else { break None };
            let highest = self.pending.read().get(&id.sender).and_then(|q| q.keys().next_back().copied());
            if highest == Some(id.nonce) || id.sender == incoming_sender {
                skipped.push(id);
                continue;
            }
            break Some(id);
        };

        let result = match victim {
            Some(id) => {
                let fee_cap = self
                    .pending
                    .read()
                    .get(&id.sender)
                    .and_then(|q| q.get(&id.nonce))
                    .and_then(|tx| tx.transaction.max_fee_per_blob_gas);
                match fee_cap {
                    Some(f) if f < incoming_blob_fee_cap => {
                        if let Some(tx) = self.pending.write().get_mut(&id.sender).and_then(|q| q.remove(&id.nonce)) {
                            self.accounts.write().remove_tx(id.sender, id.nonce);
                            self.hash_index.write().remove(tx.hash());
                            self.metrics.evictions.increment(1);
                            self.events.lock().notify(*tx.hash(), TransactionEvent::Discarded);
                        }
                        Ok(())
                    }
                    _ => {
                        skipped.push(id);
                        Err(PoolError::Policy(PolicyError::PoolFull))
                    }
                }
            }
            None => Err(PoolError::Policy(PolicyError::PoolFull)),
        };

        for id in skipped {
            if let Some(tx) = self.pending.read().get(&id.sender).and_then(|q| q.get(&id.nonce)) {
                let fee_cap = tx.transaction.max_fee_per_blob_gas.unwrap_or_default();
                self.heap.write().add_pending(id, tx.submission_id, fee_cap);
            }
        }
        result
    }

    fn promote_from_queue(&self, sender: SenderId, new_pending_nonce: u64) {
        let mut promoted = Vec::new();
        {
            let mut queued = self.queued.write();
            if let Some(queue) = queued.get_mut(&sender) {
                let mut next = new_pending_nonce;
                while let Some(tx) = queue.remove(&next) {
                    promoted.push(tx);
                    next += 1;
                }
                if queue.is_empty() {
                    queued.remove(&sender);
                }
            }
        }
        for tx in promoted {
            let id = tx.transaction_id;
            let blob_fee_cap = tx.transaction.max_fee_per_blob_gas.unwrap_or_default();
            self.pending.write().entry(sender).or_default().insert(id.nonce, tx.clone());
            self.heap.write().add_pending(id, tx.submission_id, blob_fee_cap);
            self.events.lock().notify_all(FullTransactionEvent { hash: *tx.hash(), transaction: tx.clone(), event: TransactionEvent::Pending });
            self.events.lock().notify(*tx.hash(), TransactionEvent::Pending);
            debug!(target: "txpool::blob", sender = %tx.sender(), nonce = id.nonce, "promoted to pending");
        }
    }

    pub fn get(&self, hash: &TxHash) -> Option<ValidTx> {
        let (sender, nonce) = *self.hash_index.read().get(hash)?;
        self.pending
            .read()
            .get(&sender)
            .and_then(|q| q.get(&nonce))
            .cloned()
            .or_else(|| self.queued.read().get(&sender).and_then(|q| q.get(&nonce)).cloned())
    }

    pub fn remove_transactions(&self, hashes: Vec<TxHash>) -> Vec<ValidTx> {
        let mut removed = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let Some((sender, nonce)) = self.hash_index.read().get(&hash).copied() else { continue };
            let tx = self
                .pending
                .write()
                .get_mut(&sender)
                .and_then(|q| q.remove(&nonce))
                .or_else(|| self.queued.write().get_mut(&sender).and_then(|q| q.remove(&nonce)));
            if let Some(tx) = tx {
                self.heap.write().remove(&TransactionId::new(sender, nonce));
                self.accounts.write().remove_tx(sender, nonce);
                self.rbf.write().clear_slot(TransactionId::new(sender, nonce));
                self.hash_index.write().remove(&hash);
                self.events.lock().notify(hash, TransactionEvent::Discarded);
                removed.push(tx);
            }
        }
        removed
    }

    pub fn pending_transactions(&self) -> Vec<ValidTx> {
        self.pending.read().values().flat_map(|q| q.values().cloned()).collect()
    }

    pub fn queued_transactions(&self) -> Vec<ValidTx> {
        self.queued.read().values().flat_map(|q| q.values().cloned()).collect()
    }

    /// Advances `excess_blob_gas` given the parent block's blob gas usage,
    /// recomputes the blob base fee, and evicts every pending/queued
    /// transaction whose `blob_fee_cap` now falls below it (§4.7,
    /// invariant I8).
    pub fn on_new_block(&self, parent_blob_gas_used: u64) {
        let excess = {
            let mut excess = self.excess_blob_gas.lock();
            *excess = next_excess_blob_gas(*excess, parent_blob_gas_used);
            *excess
        };
        self.set_excess_blob_gas(excess);
    }

    /// Directly sets `excess_blob_gas` (§4.7 `set_excess_blob_gas`),
    /// recomputing the blob base fee and evicting any pending/queued
    /// transaction whose `blob_fee_cap` now falls below it.
    pub fn set_excess_blob_gas(&self, excess: u64) {
        *self.excess_blob_gas.lock() = excess;
        let fee = blob_base_fee(excess);
        self.metrics.excess_blob_gas.set(excess as f64);
        self.apply_blob_base_fee(fee);
    }

    /// Directly sets the blob base fee floor without deriving it from
    /// `excess_blob_gas` (e.g. when the embedder reports the fee itself via
    /// `BlockInfo`), evicting any pending/queued transaction that now falls
    /// below it.
    pub fn set_blob_base_fee(&self, blob_base_fee: u128) {
        self.apply_blob_base_fee(blob_base_fee);
    }

    fn apply_blob_base_fee(&self, fee: u128) {
        self.metrics.blob_base_fee.set(fee as f64);
        self.validator.set_blob_base_fee(fee);
        self.evict_below_blob_base_fee(fee);
    }

    /// Removes every pending/queued blob transaction with `blob_fee_cap <
    /// floor`, restoring invariant I8 after a blob base fee rise. Mirrors
    /// `make_room_for`'s removal bookkeeping (heap, accounts, hash_index,
    /// events) but is unconditional rather than price-competitive: a
    /// transaction whose fee cap can no longer clear the floor has no path
    /// to inclusion regardless of what else is in the pool.
    fn evict_below_blob_base_fee(&self, floor: u128) {
        let mut victims: Vec<(SenderId, u64, TxHash)> = Vec::new();
        for store in [&self.pending, &self.queued] {
            for (sender, queue) in store.read().iter() {
                for (nonce, tx) in queue.iter() {
                    let fee_cap = tx.transaction.max_fee_per_blob_gas.unwrap_or_default();
                    if fee_cap < floor {
                        victims.push((*sender, *nonce, *tx.hash()));
                    }
                }
            }
        }

        for (sender, nonce, hash) in victims {
            let removed = self
                .pending
                .write()
                .get_mut(&sender)
                .and_then(|q| q.remove(&nonce))
                .or_else(|| self.queued.write().get_mut(&sender).and_then(|q| q.remove(&nonce)));
            if removed.is_some() {
                self.heap.write().remove(&TransactionId::new(sender, nonce));
                self.accounts.write().remove_tx(sender, nonce);
                self.rbf.write().clear_slot(TransactionId::new(sender, nonce));
                self.hash_index.write().remove(&hash);
                self.metrics.evictions.increment(1);
                self.events.lock().notify(hash, TransactionEvent::Discarded);
            }
        }
    }

    pub fn reset<F>(&self, new_state: F)
    where
        F: Fn(Address) -> (u64, U256),
    {
        let senders = self.accounts.read().senders();
        for sender in senders {
            let sender_addr = self.identifiers.read().address(sender);
            let (new_nonce, new_balance) = new_state(sender_addr);

            if let Some(queue) = self.pending.write().get_mut(&sender) {
                let stale: Vec<u64> = queue.range(..new_nonce).map(|(n, _)| *n).collect();
                for nonce in stale {
                    if let Some(tx) = queue.remove(&nonce) {
                        self.heap.write().remove(&TransactionId::new(sender, nonce));
                        self.hash_index.write().remove(tx.hash());
                        self.events.lock().notify(*tx.hash(), TransactionEvent::Mined(alloy_primitives::B256::ZERO));
                    }
                }
            }
            if let Some(queue) = self.queued.write().get_mut(&sender) {
                let stale: Vec<u64> = queue.range(..new_nonce).map(|(n, _)| *n).collect();
                for nonce in stale {
                    if let Some(tx) = queue.remove(&nonce) {
                        self.hash_index.write().remove(tx.hash());
                        self.events.lock().notify(*tx.hash(), TransactionEvent::Discarded);
                    }
                }
            }

            let still_active = self.accounts.write().reset_account(sender, new_nonce, new_balance);
            if still_active {
                self.promote_from_queue(sender, new_nonce);
            } else {
                self.rbf.write().wipe_sender(sender);
            }
        }
    }

    pub fn add_pending_listener(&self, hash: TxHash) -> TransactionEvents {
        self.events.lock().subscribe(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockStateReader, MockTransactionFactory};
    use crate::validate::pipeline::Validator;

    fn make_pool(config: PoolConfig, state: MockStateReader) -> BlobPool<MockStateReader> {
        let validator = Validator::new(config.clone(), Arc::new(state), 1);
        BlobPool::new(config, validator)
    }

    #[tokio::test]
    async fn blob_fee_cap_eviction_protects_highest_nonce() {
        let mut config = PoolConfig::default();
        config.blob_limit.max_txs = 2;
        config.max_account_slots = 10;
        let pool = make_pool(config, MockStateReader::new());
        let mut factory = MockTransactionFactory::new();
        let sender = Address::with_last_byte(9);

        let low = factory.blob(sender, 0, 1000, 100, 10);
        let mid = factory.blob(sender, 1, 1000, 100, 20);
        pool.add_transaction(TransactionOrigin::External, None, low).await.unwrap();
        pool.add_transaction(TransactionOrigin::External, None, mid).await.unwrap();

        let high = factory.blob(sender, 2, 1000, 100, 500);
        let high_hash = high.hash;
        pool.add_transaction(TransactionOrigin::External, None, high).await.unwrap();

        assert!(pool.get(&high_hash).is_some());
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn excess_blob_gas_starts_at_floor() {
        let pool = make_pool(PoolConfig::default(), MockStateReader::new());
        assert_eq!(pool.blob_base_fee(), crate::constants::MIN_BLOB_BASE_FEE);
    }

    /// §8 scenario 4: raising the blob base fee above a resident tx's
    /// `blob_fee_cap` evicts it (invariant I8) while a sufficiently-capped
    /// sibling survives.
    #[tokio::test]
    async fn set_excess_blob_gas_evicts_below_new_floor() {
        let pool = make_pool(PoolConfig::default(), MockStateReader::new());
        let mut factory = MockTransactionFactory::new();
        let cheap_sender = Address::with_last_byte(1);
        let dear_sender = Address::with_last_byte(2);

        let cheap = factory.blob(cheap_sender, 0, 1000, 100, 50);
        let cheap_hash = cheap.hash;
        let dear = factory.blob(dear_sender, 0, 1000, 100, 200);
        let dear_hash = dear.hash;

        pool.add_transaction(TransactionOrigin::External, None, cheap).await.unwrap();
        pool.add_transaction(TransactionOrigin::External, None, dear).await.unwrap();
        assert_eq!(pool.len(), 2);

        pool.set_excess_blob_gas(20_000_000);
        assert!(pool.blob_base_fee() > 100);

        assert!(pool.get(&cheap_hash).is_none());
        assert!(pool.get(&dear_hash).is_some());
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn blob_gas_per_block_cap_is_enforced() {
        let mut config = PoolConfig::default();
        config.max_account_slots = 10;
        let pool = make_pool(config, MockStateReader::new());
        let mut factory = MockTransactionFactory::new();
        let sender = Address::with_last_byte(3);

        // MAX_BLOB_GAS_PER_BLOCK / BLOB_GAS_PER_BLOB = MAX_BLOBS_PER_BLOCK (6)
        // single-blob transactions fit in the pending set; a 7th must not.
        for nonce in 0u64..6 {
            let tx = factory.blob(sender, nonce, 1000, 100, 50);
            pool.add_transaction(TransactionOrigin::External, None, tx).await.unwrap();
        }
        assert_eq!(pool.pending_blob_gas_used(), crate::constants::MAX_BLOB_GAS_PER_BLOCK);

        let overflow = factory.blob(sender, 6, 1000, 100, 50);
        let err = pool.add_transaction(TransactionOrigin::External, None, overflow).await.unwrap_err();
        assert_eq!(err.kind(), "blob_gas_exceeded");
    }

    /// Mirrors the main pool's equivalent regression: a `pool_full`
    /// rejection on the pending-admission path must release the chain-depth
    /// slot it provisionally took.
    #[tokio::test]
    async fn chain_depth_not_leaked_on_pool_full_rejection() {
        let mut config = PoolConfig::default();
        config.blob_limit.max_txs = 1;
        config.max_account_slots = 10;
        let pool = make_pool(config, MockStateReader::new());
        let mut factory = MockTransactionFactory::new();
        let sender_a = Address::with_last_byte(1);
        let sender_b = Address::with_last_byte(2);

        let tx_a = factory.blob(sender_a, 0, 1_000_000, 1_000_000, 1_000_000);
        pool.add_transaction(TransactionOrigin::External, None, tx_a).await.unwrap();

        let tx_b = factory.blob(sender_b, 0, 1, 1, 1);
        let err = pool.add_transaction(TransactionOrigin::External, None, tx_b).await.unwrap_err();
        assert_eq!(err.kind(), "pool_full");

        let sender_b_id = pool.identifiers.read().sender_id(&sender_b).unwrap();
        assert_eq!(pool.rbf.read().chain_depth(sender_b_id), 0);
    }
}
