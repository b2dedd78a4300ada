//! The main pool (§4.6): pending/queued storage for legacy, access-list,
//! dynamic-fee, and set-code transactions (blob transactions are handled
//! by the dedicated subpool, [`crate::pool::blob::BlobPool`]), replace-by-fee
//! coordination, capacity eviction with sender protection, and reorg
//! handling.
//!
//! This is the direct generalization of the teacher's `Pool<V, T>` /
//! `PoolInner` (`lib.rs`) and the unpruned `reth-transaction-pool`
//! `Pool<V, T, S>` (`other_examples` lib.rs fragment): kept as an
//! `Arc`-wrapped inner guarded by component-scoped `parking_lot::RwLock`s
//! (§5), generalized from order-matching semantics to nonce/fee mempool
//! semantics.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use alloy_primitives::{Address, TxHash, U256};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, instrument, trace, warn};

use crate::config::PoolConfig;
use crate::error::{PolicyError, PoolError, PoolResult};
use crate::identifier::{SenderId, SenderIdentifiers, TransactionId};
use crate::metrics::PoolMetrics;
use crate::pool::account::AccountTracker;
use crate::pool::events::{FullTransactionEvent, PoolEventBroadcast, TransactionEvent, TransactionEvents};
use crate::pool::heap::PricedHeap;
use crate::pool::queue::QueueManager;
use crate::pool::rbf::RbfEngine;
use crate::pool::state::SubPool;
use crate::traits::{AllPoolTransactions, BlockInfo, PoolSize, TransactionOrigin};
use crate::tx::PoolTransaction;
use crate::validate::{TransactionValidationOutcome, ValidPoolTransaction, ValidTx};

/// Per-sender, nonce-sorted pending storage plus the global priced-eviction
/// heap scoped to just the pending set (DESIGN.md's resolution: queued
/// transactions never participate here).
#[derive(Debug, Default)]
struct PendingStore {
    by_sender: HashMap<SenderId, BTreeMap<u64, ValidTx>>,
}

impl PendingStore {
    fn insert(&mut self, sender: SenderId, tx: ValidTx) -> Option<ValidTx> {
        self.by_sender.entry(sender).or_default().insert(tx.nonce(), tx)
    }

    fn remove(&mut self, sender: SenderId, nonce: u64) -> Option<ValidTx> {
        let map = self.by_sender.get_mut(&sender)?;
        let removed = map.remove(&nonce);
        if map.is_empty() {
            self.by_sender.remove(&sender);
        }
        removed
    }

    fn get(&self, sender: SenderId, nonce: u64) -> Option<&ValidTx> {
        self.by_sender.get(&sender)?.get(&nonce)
    }

    /// The highest-nonce pending tx for `sender`, if any — protected from
    /// capacity eviction (§4.6 step 7, invariant I-protect).
    fn highest_nonce(&self, sender: SenderId) -> Option<u64> {
        self.by_sender.get(&sender).and_then(|m| m.keys().next_back().copied())
    }

    fn count_for_sender(&self, sender: SenderId) -> usize {
        self.by_sender.get(&sender).map_or(0, |m| m.len())
    }

    fn total_count(&self) -> usize {
        self.by_sender.values().map(|m| m.len()).sum()
    }

    fn all(&self) -> Vec<ValidTx> {
        self.by_sender.values().flat_map(|m| m.values().cloned()).collect()
    }

    fn senders(&self) -> Vec<SenderId> {
        self.by_sender.keys().copied().collect()
    }

    fn for_sender(&self, sender: SenderId) -> Vec<ValidTx> {
        self.by_sender.get(&sender).map(|m| m.values().cloned().collect()).unwrap_or_default()
    }
}

/// Internal guts of [`Pool`], split into component-scoped locks per §5.
pub struct PoolInner<S> {
    config: PoolConfig,
    validator: crate::validate::pipeline::Validator<S>,
    identifiers: RwLock<SenderIdentifiers>,
    accounts: RwLock<AccountTracker>,
    pending: RwLock<PendingStore>,
    pending_heap: RwLock<PricedHeap>,
    queue: RwLock<QueueManager>,
    rbf: RwLock<RbfEngine>,
    hash_index: RwLock<HashMap<TxHash, (SenderId, u64)>>,
    base_fee: Mutex<u128>,
    block_info: RwLock<BlockInfo>,
    submission_counter: AtomicU64,
    events: Mutex<PoolEventBroadcast>,
    metrics: PoolMetrics,
}

impl<S: crate::traits::StateReader> PoolInner<S> {
    pub fn new(config: PoolConfig, validator: crate::validate::pipeline::Validator<S>) -> Self {
        let queue = QueueManager::new(config.max_account_slots, config.queued_limit.max_txs, config.heap_stale_threshold);
        let pending_heap = PricedHeap::new(config.heap_stale_threshold);
        Self {
            identifiers: RwLock::new(SenderIdentifiers::new()),
            accounts: RwLock::new(AccountTracker::new()),
            pending: RwLock::new(PendingStore::default()),
            pending_heap: RwLock::new(pending_heap),
            queue: RwLock::new(queue),
            rbf: RwLock::new(RbfEngine::new(config.price_bump, config.max_replacements, config.max_chain_depth)),
            hash_index: RwLock::new(HashMap::new()),
            base_fee: Mutex::new(0),
            block_info: RwLock::new(BlockInfo::default()),
            submission_counter: AtomicU64::new(0),
            events: Mutex::new(PoolEventBroadcast::new()),
            metrics: PoolMetrics::default(),
            config,
            validator,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn block_info(&self) -> BlockInfo {
        *self.block_info.read()
    }

    pub fn set_block_info(&self, info: BlockInfo) {
        *self.block_info.write() = info;
    }

    /// Forwards the current blob base fee to the validation pipeline (used
    /// by `stage_blob`); the main pool itself never admits blob transactions
    /// (those go to [`crate::pool::blob::BlobPool`]), but the validator
    /// instance is shared across both subpools.
    pub fn set_blob_base_fee(&self, blob_base_fee: u128) {
        self.validator.set_blob_base_fee(blob_base_fee);
    }

    pub fn size(&self) -> PoolSize {
        let pending = self.pending.read().total_count();
        let queued = self.queue.read().total_count();
        PoolSize { pending, pending_size: 0, queued, queued_size: 0, blob: 0, blob_size: 0, total: pending + queued }
    }

    pub fn len(&self) -> usize {
        self.pending.read().total_count() + self.queue.read().total_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validates and admits `tx` (§4.6 admission algorithm). Returns the
    /// transaction's hash on success.
    #[instrument(skip(self, tx), fields(hash))]
    pub async fn add_transaction(&self, origin: TransactionOrigin, peer: Option<Address>, tx: PoolTransaction) -> PoolResult<TxHash> {
        let hash = tx.hash;
        tracing::Span::current().record("hash", tracing::field::display(hash));

        if self.hash_index.read().contains_key(&hash) {
            self.metrics.validation_already_known.increment(1);
            return Err(PoolError::AlreadyKnown(hash));
        }

        let outcome = self.validator.validate(origin, peer, tx).await;
        let (valid_tx, balance, state_nonce) = match outcome {
            TransactionValidationOutcome::Valid { transaction, balance, state_nonce, .. } => {
                (transaction, balance, state_nonce)
            }
            TransactionValidationOutcome::Invalid(_, err) => {
                self.metrics.validation_rejected.increment(1);
                trace!(target: "txpool", error = %err, "rejected at validation pipeline");
                return Err(PoolError::Validation(err));
            }
            TransactionValidationOutcome::Error(hash, msg) => {
                warn!(target: "txpool", %hash, error = %msg, "state reader error during validation");
                return Err(PoolError::Validation(crate::error::ValidationError::InvalidSignature));
            }
        };

        self.insert_valid(origin, valid_tx, balance, state_nonce)
    }

    fn next_submission_id(&self) -> u64 {
        self.submission_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Commits an already-validated transaction into pending or queued
    /// storage, running RBF, capacity, and promotion logic (§4.6 steps 2-8).
    fn insert_valid(&self, origin: TransactionOrigin, tx: PoolTransaction, balance: U256, state_nonce: u64) -> PoolResult<TxHash> {
        let hash = tx.hash;
        let sender_addr = tx.sender;
        let nonce = tx.nonce;
        let cost = tx.cost();

        let sender = self.identifiers.write().sender_id_or_create(sender_addr);
        {
            let mut accounts = self.accounts.write();
            accounts.get_or_create(sender, state_nonce, balance);
        }
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

        let existing_in_pending = self.pending.read().get(sender, nonce).cloned();
        let existing_in_queue = self.queue.read().get(sender, nonce).cloned();

        if let Some(existing) = existing_in_pending.as_ref().or(existing_in_queue.as_ref()) {
            self.apply_replacement(sender, id, existing.clone(), valid_tx, existing_in_pending.is_some())?;
            return Ok(hash);
        }

        // Fresh (sender, nonce) slot: enforce spam caps before admitting.
        self.rbf.write().note_fresh_slot(sender).map_err(|_| {
            PoolError::Policy(PolicyError::ChainDepthExceeded(sender_addr))
        })?;

        // Per-sender capacity (§4.6 step 6); replacements are exempt, fresh
        // slots are not.
        let occupied = self.pending.read().count_for_sender(sender) + self.queue.read().count_for_sender(sender);
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

    fn base_fee(&self) -> u128 {
        *self.base_fee.lock()
    }

    /// Replace-by-fee at an already-occupied `(sender, nonce)` slot (§4.5,
    /// §4.6 step 5).
    fn apply_replacement(
        &self,
        sender: SenderId,
        id: TransactionId,
        existing: ValidTx,
        incoming: PoolTransaction,
        existing_is_pending: bool,
    ) -> PoolResult<()> {
        self.rbf
            .write()
            .check_replacement(id, existing.sender(), &existing.transaction, &incoming)?;

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

        if existing_is_pending {
            self.pending.write().insert(sender, valid_tx.clone());
            let price = valid_tx.effective_price(self.base_fee());
            self.pending_heap.write().remove(&id);
            self.pending_heap.write().add_pending(id, valid_tx.submission_id, price);
        } else {
            let base_fee = self.base_fee();
            self.queue.write().insert(sender, valid_tx.submission_id, base_fee, valid_tx.clone());
        }

        self.hash_index.write().remove(&existing_hash);
        self.hash_index.write().insert(incoming_hash, (sender, id.nonce));
        self.rbf.write().record_accepted(id);

        let mut events = self.events.lock();
        events.notify(existing_hash, TransactionEvent::Replaced(incoming_hash));
        events.notify_all(FullTransactionEvent {
            hash: incoming_hash,
            transaction: valid_tx.clone(),
            event: if existing_is_pending { TransactionEvent::Pending } else { TransactionEvent::Queued },
        });
        self.metrics.replacements.increment(1);
        debug!(target: "txpool", sender = %valid_tx.sender(), nonce = id.nonce, "transaction replaced");
        Ok(())
    }

    /// Inserts `tx` into pending storage, enforcing global capacity with
    /// sender protection (§4.6 step 7), then promotes any now-contiguous
    /// queued prefix (step 8).
    fn admit_to_pending(&self, sender: SenderId, tx: ValidTx) -> PoolResult<()> {
        let base_fee = self.base_fee();
        let price = tx.effective_price(base_fee);

        if self.pending.read().total_count() >= self.config.pending_limit.max_txs {
            self.make_room_for(sender, price)?;
        }

        let id = tx.transaction_id;
        self.pending.write().insert(sender, tx.clone());
        self.pending_heap.write().add_pending(id, tx.submission_id, price);
        self.accounts.write().add_pending_tx(sender, id.nonce, tx.cost());

        let mut events = self.events.lock();
        events.notify_all(FullTransactionEvent { hash: *tx.hash(), transaction: tx.clone(), event: TransactionEvent::Pending });
        drop(events);

        let new_pending_nonce = self.accounts.read().get(sender).map_or(id.nonce + 1, |a| a.pending_nonce);
        self.promote_from_queue(sender, new_pending_nonce);
        Ok(())
    }

    fn admit_to_queued(&self, sender: SenderId, tx: ValidTx) {
        let base_fee = self.base_fee();
        if self.queue.read().total_count() >= self.config.queued_limit.max_txs {
            if let Some(evicted) = self.queue.write().evict_cheapest_global() {
                self.forget(*evicted.hash());
                self.metrics.queue_evictions.increment(1);
            }
        }
        let id = tx.transaction_id;
        self.queue.write().insert(sender, tx.submission_id, base_fee, tx.clone());
        self.accounts.write().add_pending_tx(sender, id.nonce, tx.cost());
        self.events
            .lock()
            .notify_all(FullTransactionEvent { hash: *tx.hash(), transaction: tx, event: TransactionEvent::Queued });
    }

    /// Evicts the cheapest unprotected pending transaction whose price is
    /// below `incoming_price` (§4.6 step 7). Errors with `pool_full` if no
    /// such transaction exists.
    fn make_room_for(&self, incoming_sender: SenderId, incoming_price: u128) -> PoolResult<()> {
        let mut skipped = Vec::new();
        let victim = loop {
            let Some(id) = self.pending_heap.write().pop_cheapest() else { break None };
            let is_protected = self.pending.read().highest_nonce(id.sender) == Some(id.nonce);
            if is_protected || id.sender == incoming_sender {
                skipped.push(id);
                continue;
            }
            break Some(id);
        };

        let result = match victim {
            Some(id) => {
                let price = self.pending.read().get(id.sender, id.nonce).map(|tx| tx.effective_price(self.base_fee()));
                match price {
                    Some(p) if p < incoming_price => {
                        if let Some(tx) = self.pending.write().remove(id.sender, id.nonce) {
                            self.accounts.write().remove_tx(id.sender, id.nonce);
                            self.forget(*tx.hash());
                            self.metrics.pending_evictions.increment(1);
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

        // Re-add whatever we popped-but-didn't-evict back into the heap.
        for id in skipped {
            if let Some(tx) = self.pending.read().get(id.sender, id.nonce) {
                let price = tx.effective_price(self.base_fee());
                self.pending_heap.write().add_pending(id, tx.submission_id, price);
            }
        }
        result
    }

    /// Moves every contiguous queued transaction starting at
    /// `new_pending_nonce` into pending storage (§4.6 step 8, §4.3
    /// `promote_ready`).
    fn promote_from_queue(&self, sender: SenderId, new_pending_nonce: u64) {
        let promoted = self.queue.write().promote_ready(sender, new_pending_nonce);
        if promoted.is_empty() {
            return;
        }
        let base_fee = self.base_fee();
        for tx in promoted {
            let id = tx.transaction_id;
            let price = tx.effective_price(base_fee);
            self.pending.write().insert(sender, tx.clone());
            self.pending_heap.write().add_pending(id, tx.submission_id, price);
            self.events
                .lock()
                .notify_all(FullTransactionEvent { hash: *tx.hash(), transaction: tx.clone(), event: TransactionEvent::Pending });
            self.events.lock().notify(*tx.hash(), TransactionEvent::Pending);
            debug!(target: "txpool", sender = %tx.sender(), nonce = id.nonce, "promoted to pending");
        }
    }

    fn forget(&self, hash: TxHash) {
        self.hash_index.write().remove(&hash);
    }

    pub fn get(&self, hash: &TxHash) -> Option<ValidTx> {
        let (sender, nonce) = *self.hash_index.read().get(hash)?;
        self.pending.read().get(sender, nonce).cloned().or_else(|| self.queue.read().get(sender, nonce).cloned())
    }

    pub fn get_all(&self, hashes: Vec<TxHash>) -> Vec<ValidTx> {
        hashes.iter().filter_map(|h| self.get(h)).collect()
    }

    pub fn remove_transactions(&self, hashes: Vec<TxHash>) -> Vec<ValidTx> {
        let mut removed = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let Some((sender, nonce)) = self.hash_index.read().get(&hash).copied() else { continue };
            let tx = self
                .pending
                .write()
                .remove(sender, nonce)
                .or_else(|| self.queue.write().remove(sender, nonce));
            if let Some(tx) = tx {
                self.pending_heap.write().remove(&TransactionId::new(sender, nonce));
                self.accounts.write().remove_tx(sender, nonce);
                self.rbf.write().clear_slot(TransactionId::new(sender, nonce));
                self.forget(hash);
                self.events.lock().notify(hash, TransactionEvent::Discarded);
                removed.push(tx);
            }
        }
        removed
    }

    pub fn pending_transactions(&self) -> Vec<ValidTx> {
        self.pending.read().all()
    }

    pub fn queued_transactions(&self) -> Vec<ValidTx> {
        self.queue.read().all_transactions()
    }

    pub fn all_transactions(&self) -> AllPoolTransactions {
        AllPoolTransactions { pending: self.pending_transactions(), queued: self.queued_transactions() }
    }

    /// Globally descending by effective price, nonce order preserved per
    /// sender (§6 `pending_sorted`).
    pub fn pending_sorted(&self) -> Vec<ValidTx> {
        let base_fee = self.base_fee();
        let mut txs = self.pending.read().all();
        txs.sort_by(|a, b| b.effective_price(base_fee).cmp(&a.effective_price(base_fee)));
        txs
    }

    pub fn get_transactions_by_sender(&self, sender_addr: Address) -> Vec<ValidTx> {
        let Some(sender) = self.identifiers.read().sender_id(&sender_addr) else { return Vec::new() };
        let mut txs = self.pending.read().for_sender(sender);
        txs.extend(self.queue.read().transactions_for_sender(sender));
        txs
    }

    /// Every sender with at least one pending or queued transaction. Backed
    /// by the account tracker, which spans both sub-pools.
    pub fn unique_senders(&self) -> HashSet<Address> {
        let identifiers = self.identifiers.read();
        self.accounts.read().senders().into_iter().map(|s| identifiers.address(s)).collect()
    }

    /// Forwards the new base fee to the pending heap and evicts pending
    /// transactions whose fee cap can no longer cover it (§4.6 "Base-fee
    /// update").
    pub fn set_base_fee(&self, new_base_fee: u128) {
        *self.base_fee.lock() = new_base_fee;
        self.validator.set_base_fee(new_base_fee);
        let prices: Vec<(TransactionId, u128)> = self
            .pending
            .read()
            .by_sender
            .iter()
            .flat_map(|(sender, map)| {
                map.iter().map(move |(nonce, tx)| (TransactionId::new(*sender, *nonce), tx.effective_price(new_base_fee)))
            })
            .collect();
        self.pending_heap.write().rekey(prices);
        self.queue.write().set_base_fee(new_base_fee);

        let underpriced: Vec<(SenderId, u64, TxHash)> = self
            .pending
            .read()
            .by_sender
            .iter()
            .flat_map(|(sender, map)| {
                map.iter()
                    .filter(|(_, tx)| tx.transaction.fee_cap() < new_base_fee)
                    .map(move |(nonce, tx)| (*sender, *nonce, *tx.hash()))
            })
            .collect();

        for (sender, nonce, hash) in underpriced {
            if self.pending.write().remove(sender, nonce).is_some() {
                self.pending_heap.write().remove(&TransactionId::new(sender, nonce));
                self.accounts.write().remove_tx(sender, nonce);
                self.forget(hash);
                self.events.lock().notify(hash, TransactionEvent::Discarded);
                self.metrics.base_fee_evictions.increment(1);
            }
        }
    }

    /// Applies a sealed block's new state (§4.6 "Reset"). For every tracked
    /// sender: drop stale pending/queued entries, recompute `pending_nonce`,
    /// promote the newly contiguous queued prefix.
    #[instrument(skip(self, new_state))]
    pub fn reset<F>(&self, new_state: F)
    where
        F: Fn(Address) -> (u64, U256),
    {
        let senders = self.accounts.read().senders();
        for sender in senders {
            let sender_addr = self.identifiers.read().address(sender);
            let (new_nonce, new_balance) = new_state(sender_addr);

            let stale_pending: Vec<u64> = self
                .pending
                .read()
                .for_sender(sender)
                .into_iter()
                .filter(|tx| tx.nonce() < new_nonce)
                .map(|tx| tx.nonce())
                .collect();
            for nonce in stale_pending {
                if let Some(tx) = self.pending.write().remove(sender, nonce) {
                    self.pending_heap.write().remove(&TransactionId::new(sender, nonce));
                    self.forget(*tx.hash());
                    self.events.lock().notify(*tx.hash(), TransactionEvent::Mined(self.block_info().last_seen_block_hash));
                }
            }

            let dropped_queued = self.queue.write().drop_below(sender, new_nonce);
            for tx in &dropped_queued {
                self.forget(*tx.hash());
                self.events.lock().notify(*tx.hash(), TransactionEvent::Discarded);
            }

            let still_active = self.accounts.write().reset_account(sender, new_nonce, new_balance);
            if still_active {
                self.promote_from_queue(sender, new_nonce);
            } else {
                self.rbf.write().wipe_sender(sender);
            }
        }
        self.metrics.resets.increment(1);
        trace!(target: "txpool", "reset complete");
    }

    pub fn add_pending_listener(&self, hash: TxHash) -> TransactionEvents {
        self.events.lock().subscribe(hash)
    }

    pub fn add_all_transactions_event_listener(&self) -> crate::pool::events::AllTransactionsEvents {
        self.events.lock().subscribe_all()
    }
}

/// Derives a transaction's externally visible sub-pool from which internal
/// store it currently resides in (used by listeners/introspection).
pub fn subpool_of(in_pending: bool) -> SubPool {
    if in_pending {
        SubPool::Pending
    } else {
        SubPool::Queued
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::PoolConfig;
    use crate::test_utils::{MockStateReader, MockTransactionFactory};
    use crate::validate::pipeline::Validator;

    fn make_pool(config: PoolConfig, state: MockStateReader) -> PoolInner<MockStateReader> {
        let validator = Validator::new(config.clone(), Arc::new(state), 1);
        PoolInner::new(config, validator)
    }

    #[tokio::test]
    async fn promotion_on_gap_fill() {
        let state = MockStateReader::new();
        let pool = make_pool(PoolConfig::default(), state);
        let mut factory = MockTransactionFactory::new();
        let sender = Address::with_last_byte(1);

        for nonce in [0u64, 2, 3, 4] {
            let tx = factory.dynamic_fee(sender, nonce, 100, 10);
            pool.add_transaction(TransactionOrigin::External, None, tx).await.unwrap();
        }
        assert_eq!(pool.pending_transactions().len(), 1);
        assert_eq!(pool.queued_transactions().len(), 3);

        let tx1 = factory.dynamic_fee(sender, 1, 100, 10);
        pool.add_transaction(TransactionOrigin::External, None, tx1).await.unwrap();

        assert_eq!(pool.pending_transactions().len(), 5);
        assert_eq!(pool.queued_transactions().len(), 0);
    }

    #[tokio::test]
    async fn eviction_protects_highest_nonce() {
        let state = MockStateReader::new();
        let mut config = PoolConfig::default();
        config.pending_limit.max_txs = 4;
        config.max_account_slots = 10;
        let pool = make_pool(config, state);
        let mut factory = MockTransactionFactory::new();
        let sender_a = Address::with_last_byte(1);
        let sender_b = Address::with_last_byte(2);

        for (nonce, price) in [(0u64, 100u128), (1, 200), (2, 300), (3, 400)] {
            let tx = factory.dynamic_fee(sender_a, nonce, price, price);
            pool.add_transaction(TransactionOrigin::External, None, tx).await.unwrap();
        }

        let tx_b = factory.dynamic_fee(sender_b, 0, 500, 500);
        pool.add_transaction(TransactionOrigin::External, None, tx_b).await.unwrap();

        assert_eq!(pool.len(), 4);
        let a_pending = pool.get_transactions_by_sender(sender_a);
        assert!(a_pending.iter().any(|tx| tx.nonce() == 3));
        assert!(!a_pending.iter().any(|tx| tx.nonce() == 0));
    }

    #[tokio::test]
    async fn rbf_accept_and_reject() {
        let state = MockStateReader::new();
        let pool = make_pool(PoolConfig::default(), state);
        let mut factory = MockTransactionFactory::new();
        let sender = Address::with_last_byte(1);

        let original = factory.legacy(sender, 0, 1000);
        let original_hash = original.hash;
        pool.add_transaction(TransactionOrigin::External, None, original).await.unwrap();

        let too_low = factory.legacy(sender, 0, 1099);
        let err = pool.add_transaction(TransactionOrigin::External, None, too_low).await.unwrap_err();
        assert_eq!(err.kind(), "replacement_underpriced");

        let enough = factory.legacy(sender, 0, 1100);
        let new_hash = enough.hash;
        pool.add_transaction(TransactionOrigin::External, None, enough).await.unwrap();

        assert!(pool.get(&original_hash).is_none());
        assert!(pool.get(&new_hash).is_some());
    }

    #[tokio::test]
    async fn reset_removes_mined_transactions() {
        let state = MockStateReader::new();
        let pool = make_pool(PoolConfig::default(), state);
        let mut factory = MockTransactionFactory::new();
        let sender = Address::with_last_byte(1);

        for nonce in 0u64..5 {
            let tx = factory.dynamic_fee(sender, nonce, 100, 10);
            pool.add_transaction(TransactionOrigin::External, None, tx).await.unwrap();
        }
        assert_eq!(pool.pending_transactions().len(), 5);

        pool.reset(|_| (3, U256::from(1_000_000_000u64)));

        let remaining = pool.pending_transactions();
        assert_eq!(remaining.len(), 2);
        let mut nonces: Vec<u64> = remaining.iter().map(|t| t.nonce()).collect();
        nonces.sort();
        assert_eq!(nonces, vec![3, 4]);
    }

    /// A `pool_full` rejection on the pending-admission path must not leave
    /// the sender's chain-depth counter permanently inflated, or repeated
    /// rejections eventually produce spurious `chain_depth_exceeded` errors
    /// for a sender that never got a single transaction accepted.
    #[tokio::test]
    async fn chain_depth_not_leaked_on_pool_full_rejection() {
        let state = MockStateReader::new();
        let mut config = PoolConfig::default();
        config.pending_limit.max_txs = 1;
        config.max_account_slots = 10;
        let pool = make_pool(config, state);
        let mut factory = MockTransactionFactory::new();
        let sender_a = Address::with_last_byte(1);
        let sender_b = Address::with_last_byte(2);

        let tx_a = factory.dynamic_fee(sender_a, 0, 1_000_000, 1_000_000);
        pool.add_transaction(TransactionOrigin::External, None, tx_a).await.unwrap();

        // sender_a's lone pending tx is protected (highest-nonce pending for
        // its sender), so sender_b's cheap tx can't evict it and admission
        // fails with pool_full rather than succeeding.
        let tx_b = factory.dynamic_fee(sender_b, 0, 1, 1);
        let err = pool.add_transaction(TransactionOrigin::External, None, tx_b).await.unwrap_err();
        assert_eq!(err.kind(), "pool_full");

        let sender_b_id = pool.identifiers.read().sender_id(&sender_b).unwrap();
        assert_eq!(pool.rbf.read().chain_depth(sender_b_id), 0);
    }
}
