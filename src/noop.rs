//! A no-op [`TransactionPool`], for embedders that need to satisfy the trait
//! bound (RPC wiring, tests) without running a real pool. Mirrors the
//! teacher's `NoopOrderPool` (`traits.rs`).

use std::collections::HashSet;

use alloy_primitives::{Address, TxHash};
use tokio::sync::mpsc;

use crate::error::{PolicyError, PoolError, PoolResult};
use crate::pool::events::{NewTransactionEvent, TransactionEvent};
use crate::traits::{
    AllPoolTransactions, BestTransactions, BlockInfo, CanonicalStateUpdate, ChangedAccount, GetPooledTransactionLimit,
    PoolSize, TransactionOrigin, TransactionPool, TransactionPoolExt,
};
use crate::tx::PoolTransaction;
use crate::validate::ValidPoolTransaction;

/// An iterator that never yields anything, satisfying [`BestTransactions`]
/// for callers of [`NoopTransactionPool::best_transactions`].
pub struct NoopBestTransactions;

impl Iterator for NoopBestTransactions {
    type Item = std::sync::Arc<ValidPoolTransaction<PoolTransaction>>;

    fn next(&mut self) -> Option<Self::Item> {
        None
    }
}

impl BestTransactions for NoopBestTransactions {
    fn mark_invalid(&mut self, _transaction: &Self::Item) {}
    fn no_updates(&mut self) {}
}

/// Accepts nothing, stores nothing, reports an empty pool. `GetPooledTransactionLimit`
/// re-exported only so downstream crates can reference it alongside this type.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransactionPool;

#[async_trait::async_trait]
impl TransactionPool for NoopTransactionPool {
    fn pool_size(&self) -> PoolSize {
        PoolSize::default()
    }

    fn block_info(&self) -> BlockInfo {
        BlockInfo::default()
    }

    async fn add_transaction_and_subscribe(
        &self,
        _origin: TransactionOrigin,
        tx: PoolTransaction,
    ) -> PoolResult<mpsc::Receiver<TransactionEvent>> {
        Err(reject(tx))
    }

    async fn add_transaction(&self, _origin: TransactionOrigin, tx: PoolTransaction) -> PoolResult<TxHash> {
        Err(reject(tx))
    }

    async fn add_transactions(&self, origin: TransactionOrigin, txs: Vec<PoolTransaction>) -> Vec<PoolResult<TxHash>> {
        let mut results = Vec::with_capacity(txs.len());
        for tx in txs {
            results.push(self.add_transaction(origin, tx).await);
        }
        results
    }

    fn transaction_event_listener(&self, _hash: TxHash) -> Option<mpsc::Receiver<TransactionEvent>> {
        None
    }

    fn new_transactions_listener(&self) -> mpsc::Receiver<NewTransactionEvent> {
        mpsc::channel(1).1
    }

    fn pooled_transaction_hashes(&self) -> Vec<TxHash> {
        Vec::new()
    }

    fn pooled_transaction_hashes_max(&self, _max: usize) -> Vec<TxHash> {
        Vec::new()
    }

    fn pooled_transactions(&self) -> Vec<std::sync::Arc<ValidPoolTransaction<PoolTransaction>>> {
        Vec::new()
    }

    fn pooled_transactions_max(&self, _max: usize) -> Vec<std::sync::Arc<ValidPoolTransaction<PoolTransaction>>> {
        Vec::new()
    }

    fn best_transactions(&self) -> Box<dyn BestTransactions<Item = std::sync::Arc<ValidPoolTransaction<PoolTransaction>>>> {
        Box::new(NoopBestTransactions)
    }

    fn best_transactions_with_base_fee(
        &self,
        _base_fee: u128,
        _blob_base_fee: u128,
    ) -> Box<dyn BestTransactions<Item = std::sync::Arc<ValidPoolTransaction<PoolTransaction>>>> {
        Box::new(NoopBestTransactions)
    }

    fn pending_transactions(&self) -> Vec<std::sync::Arc<ValidPoolTransaction<PoolTransaction>>> {
        Vec::new()
    }

    fn queued_transactions(&self) -> Vec<std::sync::Arc<ValidPoolTransaction<PoolTransaction>>> {
        Vec::new()
    }

    fn all_transactions(&self) -> AllPoolTransactions {
        AllPoolTransactions::default()
    }

    fn remove_transactions(&self, _hashes: Vec<TxHash>) -> Vec<std::sync::Arc<ValidPoolTransaction<PoolTransaction>>> {
        Vec::new()
    }

    fn retain_unknown(&self, _hashes: &mut Vec<TxHash>) {}

    fn get(&self, _hash: &TxHash) -> Option<std::sync::Arc<ValidPoolTransaction<PoolTransaction>>> {
        None
    }

    fn get_all(&self, _hashes: Vec<TxHash>) -> Vec<std::sync::Arc<ValidPoolTransaction<PoolTransaction>>> {
        Vec::new()
    }

    fn get_transactions_by_sender(&self, _sender: Address) -> Vec<std::sync::Arc<ValidPoolTransaction<PoolTransaction>>> {
        Vec::new()
    }

    fn unique_senders(&self) -> HashSet<Address> {
        HashSet::new()
    }
}

impl TransactionPoolExt for NoopTransactionPool {
    fn set_block_info(&self, _info: BlockInfo) {}
    fn on_canonical_state_change(&self, _update: CanonicalStateUpdate) {}
    fn update_accounts(&self, _accounts: Vec<ChangedAccount>) {}
}

fn reject(tx: PoolTransaction) -> PoolError {
    let _ = tx;
    PoolError::Policy(PolicyError::PoolFull)
}

/// Re-exported so callers pattern-matching on the limit type don't need an
/// extra `use` when they only otherwise touch this module.
pub use GetPooledTransactionLimit as NoopPooledTransactionLimit;
