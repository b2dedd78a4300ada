//! Public traits and supporting types for the pool's external interfaces
//! (§6), generalized from the teacher's `OrderPool`/`OrderValidator` trait
//! surface (`order-pool/src/traits.rs`) to plain Ethereum transactions.

use std::collections::HashSet;
use std::sync::Arc;

use alloy_primitives::{Address, TxHash, U256};
use tokio::sync::mpsc::Receiver;

use crate::error::PoolResult;
use crate::pool::state::SubPool;
use crate::tx::PoolTransaction;
use crate::validate::ValidPoolTransaction;

/// External collaborator answering the two state queries the pool needs.
/// Everything else (RLP codec, signature recovery, KZG verification, P2P,
/// block building) lives outside the core (§1).
#[async_trait::async_trait]
#[auto_impl::auto_impl(Arc)]
pub trait StateReader: Send + Sync {
    async fn get_nonce(&self, address: Address) -> PoolResult<u64>;
    async fn get_balance(&self, address: Address) -> PoolResult<U256>;
    /// Whether the account has contract bytecode (signer accounts must not).
    async fn has_bytecode(&self, address: Address) -> PoolResult<bool>;
}

/// Where a transaction originated, affecting propagation and per-sender
/// exemptions (mirrors the teacher's `OrderOrigin`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransactionOrigin {
    /// Submitted locally, e.g. via RPC on this node.
    Local,
    /// Received from a network peer; untrusted.
    External,
    /// Submitted locally and never propagated.
    Private,
}

impl TransactionOrigin {
    pub fn is_local(&self) -> bool {
        matches!(self, TransactionOrigin::Local)
    }
}

/// Read-model snapshot of the pool's current population.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolSize {
    pub pending: usize,
    pub pending_size: usize,
    pub queued: usize,
    pub queued_size: usize,
    pub blob: usize,
    pub blob_size: usize,
    pub total: usize,
}

/// The block the pool is currently tracking plus the fee fields that gate
/// sub-pool membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub last_seen_block_hash: alloy_primitives::B256,
    pub last_seen_block_number: u64,
    pub pending_base_fee: u128,
    pub pending_blob_base_fee: u128,
}

impl Default for BlockInfo {
    fn default() -> Self {
        Self {
            last_seen_block_hash: alloy_primitives::B256::ZERO,
            last_seen_block_number: 0,
            pending_base_fee: 0,
            pending_blob_base_fee: crate::constants::MIN_BLOB_BASE_FEE,
        }
    }
}

/// An account whose nonce/balance changed in a canonical state update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangedAccount {
    pub address: Address,
    pub nonce: u64,
    pub balance: U256,
}

/// Describes a new canonical block (or range) for [`TransactionPoolExt::on_canonical_state_change`].
#[derive(Debug, Clone)]
pub struct CanonicalStateUpdate {
    pub new_tip_hash: alloy_primitives::B256,
    pub new_tip_number: u64,
    pub pending_block_base_fee: u128,
    pub pending_block_blob_base_fee: u128,
    pub changed_accounts: Vec<ChangedAccount>,
    pub mined_transactions: Vec<TxHash>,
}

/// Emitted whenever a new valid transaction is inserted into a sub-pool.
#[derive(Debug)]
pub struct NewTransactionEvent {
    pub subpool: SubPool,
    pub transaction: Arc<ValidPoolTransaction<PoolTransaction>>,
}

impl Clone for NewTransactionEvent {
    fn clone(&self) -> Self {
        Self { subpool: self.subpool, transaction: self.transaction.clone() }
    }
}

/// All transactions in the pool, split by sub-pool membership.
#[derive(Debug, Clone, Default)]
pub struct AllPoolTransactions {
    pub pending: Vec<Arc<ValidPoolTransaction<PoolTransaction>>>,
    pub queued: Vec<Arc<ValidPoolTransaction<PoolTransaction>>>,
}

/// An iterator that yields transactions ready for block production, in
/// descending effective-price order, respecting per-sender nonce order.
/// Mirrors the teacher's `BestTransactions` trait.
pub trait BestTransactions: Iterator + Send {
    /// Marks a transaction (and everything depending on it) invalid; the
    /// iterator must not yield it or any of its descendants again.
    fn mark_invalid(&mut self, transaction: &Self::Item);
    /// Stop listening for pool updates; only return what was known at
    /// iterator-construction time.
    fn no_updates(&mut self);
}

/// Limit applied to [`TransactionPool::get_pooled_transaction_elements`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetPooledTransactionLimit {
    None,
    SizeSoftLimit(usize),
}

impl GetPooledTransactionLimit {
    pub fn exceeds(&self, size: usize) -> bool {
        match self {
            GetPooledTransactionLimit::None => false,
            GetPooledTransactionLimit::SizeSoftLimit(limit) => size > *limit,
        }
    }
}

/// General-purpose pool abstraction used by RPC and block-production
/// consumers. Mirrors the shape of the teacher's `OrderPool` trait,
/// generalized to plain transactions (no order/searcher split).
#[async_trait::async_trait]
#[auto_impl::auto_impl(Arc)]
pub trait TransactionPool: Send + Sync {
    /// Returns stats about the pool's sub-pools.
    fn pool_size(&self) -> PoolSize;

    /// Returns the block the pool is currently tracking.
    fn block_info(&self) -> BlockInfo;

    /// Adds an unvalidated transaction from the network.
    async fn add_external_transaction(&self, tx: PoolTransaction) -> PoolResult<TxHash> {
        self.add_transaction(TransactionOrigin::External, tx).await
    }

    /// Adds an unvalidated transaction and returns an event stream for it.
    async fn add_transaction_and_subscribe(
        &self,
        origin: TransactionOrigin,
        tx: PoolTransaction,
    ) -> PoolResult<Receiver<crate::pool::events::TransactionEvent>>;

    /// Adds an unvalidated transaction into the pool.
    async fn add_transaction(&self, origin: TransactionOrigin, tx: PoolTransaction) -> PoolResult<TxHash>;

    /// Adds several unvalidated transactions, returning one result per input.
    async fn add_transactions(
        &self,
        origin: TransactionOrigin,
        txs: Vec<PoolTransaction>,
    ) -> Vec<PoolResult<TxHash>>;

    /// A change-event stream for a single transaction, `None` if unknown.
    fn transaction_event_listener(&self, hash: TxHash) -> Option<Receiver<crate::pool::events::TransactionEvent>>;

    /// A stream of new transactions inserted anywhere in the pool.
    fn new_transactions_listener(&self) -> Receiver<NewTransactionEvent>;

    /// Hashes of every transaction currently pooled.
    fn pooled_transaction_hashes(&self) -> Vec<TxHash>;

    /// The first `max` hashes, for peers with a bounded request budget.
    fn pooled_transaction_hashes_max(&self, max: usize) -> Vec<TxHash>;

    /// All pooled transaction objects.
    fn pooled_transactions(&self) -> Vec<Arc<ValidPoolTransaction<PoolTransaction>>>;

    fn pooled_transactions_max(&self, max: usize) -> Vec<Arc<ValidPoolTransaction<PoolTransaction>>>;

    /// An iterator over transactions ready for block production, fee-ordered.
    fn best_transactions(&self) -> Box<dyn BestTransactions<Item = Arc<ValidPoolTransaction<PoolTransaction>>>>;

    /// Same as [`Self::best_transactions`] but filtering on the given base
    /// fee (and, for blob transactions, blob base fee).
    fn best_transactions_with_base_fee(
        &self,
        base_fee: u128,
        blob_base_fee: u128,
    ) -> Box<dyn BestTransactions<Item = Arc<ValidPoolTransaction<PoolTransaction>>>>;

    /// All transactions ready for inclusion in the next block, grouped by
    /// sender and nonce-ordered.
    fn pending_transactions(&self) -> Vec<Arc<ValidPoolTransaction<PoolTransaction>>>;

    /// All transactions waiting on a nonce gap.
    fn queued_transactions(&self) -> Vec<Arc<ValidPoolTransaction<PoolTransaction>>>;

    fn all_transactions(&self) -> AllPoolTransactions;

    /// Removes the given hashes (and anything depending on them).
    fn remove_transactions(&self, hashes: Vec<TxHash>) -> Vec<Arc<ValidPoolTransaction<PoolTransaction>>>;

    /// Keeps only hashes unknown to the pool.
    fn retain_unknown(&self, hashes: &mut Vec<TxHash>);

    fn contains(&self, hash: &TxHash) -> bool {
        self.get(hash).is_some()
    }

    fn get(&self, hash: &TxHash) -> Option<Arc<ValidPoolTransaction<PoolTransaction>>>;

    fn get_all(&self, hashes: Vec<TxHash>) -> Vec<Arc<ValidPoolTransaction<PoolTransaction>>>;

    fn get_transactions_by_sender(&self, sender: Address) -> Vec<Arc<ValidPoolTransaction<PoolTransaction>>>;

    fn unique_senders(&self) -> HashSet<Address>;
}

/// Extension allowing the embedding node to drive block/canonical-state
/// updates into the pool. Mirrors the teacher's `OrderPoolExt`.
#[auto_impl::auto_impl(Arc)]
pub trait TransactionPoolExt: TransactionPool {
    fn set_block_info(&self, info: BlockInfo);
    fn on_canonical_state_change(&self, update: CanonicalStateUpdate);
    fn update_accounts(&self, accounts: Vec<ChangedAccount>);
}
