//! Pool maintenance (§4.6 "Reset", §7): a background task that drives
//! canonical-state updates into the pool as they arrive, so callers don't
//! have to thread `reset`/`set_base_fee` calls through their own block
//! processing loop.
//!
//! Mirrors `reth-transaction-pool`'s `maintain::maintain_transaction_pool`
//! future (referenced in the unpruned `other_examples` lib.rs fragment):
//! generic over [`TransactionPoolExt`] rather than a concrete pool type, fed
//! by a channel of [`CanonicalStateUpdate`]s instead of a live chain
//! subscription (out of scope, see SPEC_FULL.md Non-goals: "P2P networking",
//! "chain following").

use tokio::sync::mpsc::Receiver;
use tracing::{debug, info};

use crate::traits::{CanonicalStateUpdate, TransactionPoolExt};

/// Consumes `updates` until the channel closes, forwarding each one to
/// `pool.on_canonical_state_change` and logging a summary line per update.
/// Intended to be spawned as its own task by the embedder.
pub async fn maintain_transaction_pool<P>(pool: P, mut updates: Receiver<CanonicalStateUpdate>)
where
    P: TransactionPoolExt,
{
    info!(target: "txpool::maintain", "pool maintenance task started");
    while let Some(update) = updates.recv().await {
        debug!(
            target: "txpool::maintain",
            block = update.new_tip_number,
            mined = update.mined_transactions.len(),
            changed_accounts = update.changed_accounts.len(),
            "applying canonical state update"
        );
        pool.on_canonical_state_change(update);
    }
    info!(target: "txpool::maintain", "pool maintenance task stopped: update channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noop::NoopTransactionPool;
    use std::sync::Arc;

    #[tokio::test]
    async fn maintenance_task_drains_until_channel_closed() {
        let pool = Arc::new(NoopTransactionPool);
        let (tx, rx) = tokio::sync::mpsc::channel(4);

        let handle = tokio::spawn(maintain_transaction_pool(pool, rx));

        tx.send(CanonicalStateUpdate {
            new_tip_hash: Default::default(),
            new_tip_number: 1,
            pending_block_base_fee: 0,
            pending_block_blob_base_fee: 1,
            changed_accounts: Vec::new(),
            mined_transactions: Vec::new(),
        })
        .await
        .unwrap();
        drop(tx);

        handle.await.unwrap();
    }
}
