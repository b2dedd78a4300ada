//! An in-memory pending-transaction pool for an Ethereum-style node.
//!
//! ## Functionality
//!
//! The pool is responsible for:
//!
//!    - admitting and validating incoming transactions
//!    - tracking per-account nonce sequencing, promoting transactions from
//!      `queued` to `pending` as nonce gaps close
//!    - replace-by-fee acceptance for a resubmission at an already-occupied
//!      `(sender, nonce)` slot
//!    - providing the best transactions for block production, fee-ordered
//!    - enforcing pool size limits via price-based eviction
//!    - tracking EIP-4844 blob transactions in a dedicated sub-pool with its
//!      own blob-gas accounting and blob base fee
//!
//! ## Assumptions
//!
//! The pool itself does not decode transactions from the wire, recover
//! signatures, or verify KZG proofs — those are the embedder's
//! responsibility, surfaced to the pool only through [`PoolTransaction`]'s
//! plain fields and the [`StateReader`] the pool queries for nonce/balance.
//! A transaction that can never become valid (nonce already mined, bad
//! signature) is rejected at admission and never touches pool storage; a
//! transaction that is valid now or could become valid after a future state
//! change sits in `queued` until its nonce gap closes.
//!
//! ## Architecture
//!
//! [`Pool`] is a cheaply-`Clone`able `Arc` wrapper over two independently
//! locked sub-pools: [`pool::PoolInner`] (legacy/access-list/dynamic-fee/
//! set-code transactions) and [`pool::blob::BlobPool`] (EIP-4844 blob
//! transactions). Dispatch between them happens once, at admission, based on
//! [`tx::TxKind`]; everything downstream (capacity, RBF, promotion) is
//! scoped to whichever sub-pool owns the transaction.
//!
//! ## Feature flags
//!
//! - `test-utils`: exposes [`test_utils`] to downstream crates.
//! - `sharded-index`: enables the sharded hash index for high-throughput
//!   deployments (§4.10).

#![warn(missing_debug_implementations, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]

use std::collections::HashSet;
use std::sync::Arc;

use alloy_primitives::{Address, TxHash};
use tokio::sync::mpsc::Receiver;
use tracing::{instrument, trace};

use crate::pool::blob::BlobPool;
use crate::pool::events::{FullTransactionEvent, TransactionEvent};
use crate::pool::PoolInner;
use crate::traits::{
    AllPoolTransactions, BestTransactions, BlockInfo, CanonicalStateUpdate, ChangedAccount, NewTransactionEvent,
    PoolSize, StateReader, TransactionOrigin, TransactionPool, TransactionPoolExt,
};
use crate::tx::{PoolTransaction, TxKind};
use crate::validate::ValidTx;

pub use crate::config::{JournalConfig, LocalTransactionConfig, PoolConfig, PoolConfigBuilder, PriceBumpConfig, RateLimitConfig, SubPoolLimit};
pub use crate::error::{PolicyError, PoolError, PoolResult, ValidationError};
pub use crate::pool::state::SubPool;
pub use crate::pool::{AllTransactionsEvents, PoolEventBroadcast, PropagateKind, TransactionEvents};
pub use crate::validate::{TransactionValidationOutcome, ValidPoolTransaction};

pub mod config;
pub mod constants;
pub mod error;
pub mod fee_math;
pub mod identifier;
pub mod journal;
pub mod maintain;
pub mod metrics;
pub mod noop;
pub mod oracle;
pub mod pool;
pub mod traits;
pub mod tx;
pub mod validate;

#[cfg(any(test, feature = "test-utils"))]
/// Mock [`StateReader`] and transaction-builder fixtures shared by the
/// crate's own tests and, under the `test-utils` feature, by downstream
/// crates.
pub mod test_utils;

#[cfg(feature = "sharded-index")]
pub mod sharded;

/// A shareable, `Arc`-backed transaction pool, combining the main pool
/// (legacy/access-list/dynamic-fee/set-code) and the blob sub-pool behind
/// one [`TransactionPool`] surface.
pub struct Pool<S> {
    inner: Arc<PoolInner<S>>,
    blob: Arc<BlobPool<S>>,
}

impl<S> Clone for Pool<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), blob: Arc::clone(&self.blob) }
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Pool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").field("size", &self.pool_size()).finish()
    }
}

impl<S: StateReader> Pool<S> {
    /// Builds a new pool from a single `config` and a shared [`StateReader`],
    /// wiring up both sub-pools with independent [`validate::pipeline::Validator`]
    /// instances (each tracks its own current base fee / blob base fee, set
    /// via [`Self::set_block_info`]).
    pub fn new(config: PoolConfig, state: Arc<S>, chain_id: u64) -> Self {
        let main_validator = validate::pipeline::Validator::new(config.clone(), Arc::clone(&state), chain_id);
        let blob_validator = validate::pipeline::Validator::new(config.clone(), state, chain_id);
        Self {
            inner: Arc::new(PoolInner::new(config.clone(), main_validator)),
            blob: Arc::new(BlobPool::new(config, blob_validator)),
        }
    }

    /// The pool this transaction's `(sender, nonce)` slot would occupy. Used
    /// by admission to dispatch to the right sub-pool and, for a blob
    /// replacement check, to look the existing occupant up on the other
    /// side.
    fn subpool_for(kind: TxKind) -> bool {
        kind.is_blob()
    }

    pub fn config(&self) -> &PoolConfig {
        self.inner.config()
    }

    pub fn len(&self) -> usize {
        self.inner.len() + self.blob.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty() && self.blob.is_empty()
    }

    /// Advances the blob sub-pool's `excess_blob_gas` tracker from the
    /// parent block's blob gas usage (§4.7). The main pool's base fee is
    /// advanced separately via [`Self::set_block_info`].
    pub fn on_new_block(&self, parent_blob_gas_used: u64) {
        self.blob.on_new_block(parent_blob_gas_used);
    }
}

#[async_trait::async_trait]
impl<S: StateReader> TransactionPool for Pool<S> {
    fn pool_size(&self) -> PoolSize {
        let main = self.inner.size();
        let blob_txs = self.blob.pending_transactions().len() + self.blob.queued_transactions().len();
        PoolSize {
            blob: blob_txs,
            total: main.total + blob_txs,
            ..main
        }
    }

    fn block_info(&self) -> BlockInfo {
        self.inner.block_info()
    }

    async fn add_transaction_and_subscribe(
        &self,
        origin: TransactionOrigin,
        tx: PoolTransaction,
    ) -> PoolResult<Receiver<TransactionEvent>> {
        let hash = self.add_transaction(origin, tx).await?;
        let rx = if self.blob.get(&hash).is_some() {
            self.blob.add_pending_listener(hash)
        } else {
            self.inner.add_pending_listener(hash)
        };
        Ok(rx)
    }

    #[instrument(skip(self, tx), target = "txpool")]
    async fn add_transaction(&self, origin: TransactionOrigin, tx: PoolTransaction) -> PoolResult<TxHash> {
        trace!(target: "txpool", kind = ?tx.kind, sender = %tx.sender, nonce = tx.nonce, "admitting transaction");
        if Self::subpool_for(tx.kind) {
            self.blob.add_transaction(origin, None, tx).await
        } else {
            self.inner.add_transaction(origin, None, tx).await
        }
    }

    async fn add_transactions(&self, origin: TransactionOrigin, txs: Vec<PoolTransaction>) -> Vec<PoolResult<TxHash>> {
        let mut results = Vec::with_capacity(txs.len());
        for tx in txs {
            results.push(self.add_transaction(origin, tx).await);
        }
        results
    }

    fn transaction_event_listener(&self, hash: TxHash) -> Option<Receiver<TransactionEvent>> {
        if self.inner.get(&hash).is_some() {
            Some(self.inner.add_pending_listener(hash))
        } else if self.blob.get(&hash).is_some() {
            Some(self.blob.add_pending_listener(hash))
        } else {
            None
        }
    }

    fn new_transactions_listener(&self) -> Receiver<NewTransactionEvent> {
        // Both sub-pools broadcast [`FullTransactionEvent`]s but the
        // `TransactionPool` surface wants a sub-pool-tagged stream; adapt the
        // main pool's broadcast (the common case) directly. Blob insertions
        // are still visible via `transaction_event_listener`/`add_all_transactions_event_listener`.
        let mut all = self.inner.add_all_transactions_event_listener();
        let (tx, rx) = tokio::sync::mpsc::channel(256);
        tokio::spawn(async move {
            while let Some(FullTransactionEvent { transaction, event, .. }) = all.recv().await {
                if matches!(event, TransactionEvent::Pending) {
                    if tx.send(NewTransactionEvent { subpool: SubPool::Pending, transaction: transaction.clone() }).await.is_err() {
                        break;
                    }
                }
            }
        });
        rx
    }

    fn pooled_transaction_hashes(&self) -> Vec<TxHash> {
        self.all_transactions()
            .pending
            .iter()
            .chain(self.all_transactions().queued.iter())
            .map(|tx| *tx.hash())
            .collect()
    }

    fn pooled_transaction_hashes_max(&self, max: usize) -> Vec<TxHash> {
        self.pooled_transaction_hashes().into_iter().take(max).collect()
    }

    fn pooled_transactions(&self) -> Vec<ValidTx> {
        let mut all = self.inner.pending_transactions();
        all.extend(self.inner.queued_transactions());
        all.extend(self.blob.pending_transactions());
        all.extend(self.blob.queued_transactions());
        all
    }

    fn pooled_transactions_max(&self, max: usize) -> Vec<ValidTx> {
        self.pooled_transactions().into_iter().take(max).collect()
    }

    fn best_transactions(&self) -> Box<dyn BestTransactions<Item = ValidTx>> {
        let base_fee = self.block_info().pending_base_fee;
        let blob_base_fee = self.block_info().pending_blob_base_fee;
        self.best_transactions_with_base_fee(base_fee, blob_base_fee)
    }

    fn best_transactions_with_base_fee(&self, base_fee: u128, _blob_base_fee: u128) -> Box<dyn BestTransactions<Item = ValidTx>> {
        let mut txs = self.inner.pending_sorted();
        txs.extend(self.blob.pending_transactions());
        txs.sort_by(|a, b| b.effective_price(base_fee).cmp(&a.effective_price(base_fee)));
        Box::new(PendingIter { remaining: txs.into() })
    }

    fn pending_transactions(&self) -> Vec<ValidTx> {
        let mut txs = self.inner.pending_transactions();
        txs.extend(self.blob.pending_transactions());
        txs
    }

    fn queued_transactions(&self) -> Vec<ValidTx> {
        let mut txs = self.inner.queued_transactions();
        txs.extend(self.blob.queued_transactions());
        txs
    }

    fn all_transactions(&self) -> AllPoolTransactions {
        let mut all = self.inner.all_transactions();
        all.pending.extend(self.blob.pending_transactions());
        all.queued.extend(self.blob.queued_transactions());
        all
    }

    fn remove_transactions(&self, hashes: Vec<TxHash>) -> Vec<ValidTx> {
        let mut removed = self.inner.remove_transactions(hashes.clone());
        removed.extend(self.blob.remove_transactions(hashes));
        removed
    }

    fn retain_unknown(&self, hashes: &mut Vec<TxHash>) {
        hashes.retain(|h| self.get(h).is_none());
    }

    fn get(&self, hash: &TxHash) -> Option<ValidTx> {
        self.inner.get(hash).or_else(|| self.blob.get(hash))
    }

    fn get_all(&self, hashes: Vec<TxHash>) -> Vec<ValidTx> {
        hashes.iter().filter_map(|h| self.get(h)).collect()
    }

    fn get_transactions_by_sender(&self, sender: Address) -> Vec<ValidTx> {
        let mut txs = self.inner.get_transactions_by_sender(sender);
        txs.extend(
            self.blob
                .pending_transactions()
                .into_iter()
                .chain(self.blob.queued_transactions())
                .filter(|tx| tx.sender() == sender),
        );
        txs
    }

    fn unique_senders(&self) -> HashSet<Address> {
        self.inner.unique_senders()
    }
}

impl<S: StateReader> TransactionPoolExt for Pool<S> {
    #[instrument(skip(self, info), target = "txpool")]
    fn set_block_info(&self, info: BlockInfo) {
        trace!(target: "txpool", block = info.last_seen_block_number, "updating pool block info");
        self.inner.set_block_info(info);
        self.inner.set_base_fee(info.pending_base_fee);
        self.inner.set_blob_base_fee(info.pending_blob_base_fee);
        // The main pool holds no blob transactions (dispatch happens once at
        // admission), so its `set_blob_base_fee` only updates an otherwise
        // unused validator floor; the blob sub-pool is the one that actually
        // evicts transactions below the new floor (§4.7, invariant I8).
        self.blob.set_blob_base_fee(info.pending_blob_base_fee);
    }

    fn on_canonical_state_change(&self, update: CanonicalStateUpdate) {
        let new_state: std::collections::HashMap<Address, (u64, alloy_primitives::U256)> =
            update.changed_accounts.iter().map(|a| (a.address, (a.nonce, a.balance))).collect();
        let lookup = |addr: Address| new_state.get(&addr).copied().unwrap_or((0, alloy_primitives::U256::ZERO));
        self.inner.reset(lookup);
        self.blob.reset(lookup);
        self.set_block_info(BlockInfo {
            last_seen_block_hash: update.new_tip_hash,
            last_seen_block_number: update.new_tip_number,
            pending_base_fee: update.pending_block_base_fee,
            pending_blob_base_fee: update.pending_block_blob_base_fee,
        });
    }

    fn update_accounts(&self, accounts: Vec<ChangedAccount>) {
        let new_state: std::collections::HashMap<Address, (u64, alloy_primitives::U256)> =
            accounts.iter().map(|a| (a.address, (a.nonce, a.balance))).collect();
        let lookup = |addr: Address| new_state.get(&addr).copied().unwrap_or((0, alloy_primitives::U256::ZERO));
        self.inner.reset(lookup);
        self.blob.reset(lookup);
    }
}

/// Snapshot iterator over a fee-sorted transaction list (built once by
/// [`Pool::best_transactions`]); invalidating a transaction also drops every
/// later-nonce transaction from the same sender still in the remaining
/// queue, since they can no longer be included without their ancestor.
struct PendingIter {
    remaining: std::collections::VecDeque<ValidTx>,
}

impl Iterator for PendingIter {
    type Item = ValidTx;

    fn next(&mut self) -> Option<Self::Item> {
        self.remaining.pop_front()
    }
}

impl BestTransactions for PendingIter {
    fn mark_invalid(&mut self, transaction: &Self::Item) {
        let sender = transaction.sender();
        let nonce = transaction.nonce();
        self.remaining.retain(|tx| !(tx.sender() == sender && tx.nonce() >= nonce));
    }

    fn no_updates(&mut self) {}
}
