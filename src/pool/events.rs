//! Per-transaction event stream and the listener registries that back it.
//! Generalized from the teacher's `FullOrderEvent`/`OrderEvents`
//! (`pool/events.rs`) to plain transactions: no order-replacement-by-match
//! concept, but the same pending/queued/mined/replaced/discarded/invalid/
//! propagated lifecycle shape.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{TxHash, B256};
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::validate::ValidPoolTransaction;
use crate::tx::PoolTransaction;

/// A way a transaction was propagated, mirrors the teacher's `PropagateKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagateKind {
    /// Sent the full transaction body to the peer.
    Full,
    /// Announced only the hash.
    Hash,
}

/// Status changes of a single transaction, delivered over that
/// transaction's event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionEvent {
    /// Moved into the pending sub-pool (executable now).
    Pending,
    /// Moved into (or remains in) the queued sub-pool (nonce gap).
    Queued,
    /// Included in the block with this hash.
    Mined(B256),
    /// Replaced by the transaction with this hash (RBF).
    Replaced(TxHash),
    /// Dropped due to capacity limits.
    Discarded,
    /// Became invalid indefinitely (e.g. nonce rewound below it after reorg).
    Invalid,
    /// Propagated to peers.
    Propagated(Arc<Vec<PropagateKind>>),
}

impl TransactionEvent {
    /// No further events will be delivered for this hash once one of these
    /// fires.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Mined(_) | Self::Replaced(_) | Self::Discarded | Self::Invalid)
    }
}

/// Receiver half handed back to a caller subscribing to one transaction.
pub type TransactionEvents = Receiver<TransactionEvent>;

/// A newly inserted transaction, broadcast to every "all transactions"
/// subscriber.
#[derive(Debug, Clone)]
pub struct FullTransactionEvent {
    pub hash: TxHash,
    pub transaction: Arc<ValidPoolTransaction<PoolTransaction>>,
    pub event: TransactionEvent,
}

/// Receiver half for the "every transaction" event stream.
pub struct AllTransactionsEvents {
    receiver: Receiver<FullTransactionEvent>,
}

impl AllTransactionsEvents {
    pub fn new(receiver: Receiver<FullTransactionEvent>) -> Self {
        Self { receiver }
    }

    pub async fn recv(&mut self) -> Option<FullTransactionEvent> {
        self.receiver.recv().await
    }
}

/// Registry of per-hash and all-transactions event subscribers.
///
/// Channel sends never block the caller holding the pool lock: per §5,
/// notification happens after the pool's internal state transition has
/// already committed, using a bounded channel whose `try_send` failures are
/// dropped rather than awaited (a slow subscriber cannot stall admission).
#[derive(Default)]
pub struct PoolEventBroadcast {
    per_hash: HashMap<TxHash, Vec<Sender<TransactionEvent>>>,
    all: Vec<Sender<FullTransactionEvent>>,
}

const EVENT_CHANNEL_CAPACITY: usize = 256;

impl PoolEventBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new per-hash subscriber, returning its receiver half.
    pub fn subscribe(&mut self, hash: TxHash) -> TransactionEvents {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.per_hash.entry(hash).or_default().push(tx);
        rx
    }

    /// Registers a new all-transactions subscriber.
    pub fn subscribe_all(&mut self) -> AllTransactionsEvents {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.all.push(tx);
        AllTransactionsEvents::new(rx)
    }

    /// Notifies every subscriber of `hash`, pruning closed channels and any
    /// now-terminal per-hash subscriber list.
    pub fn notify(&mut self, hash: TxHash, event: TransactionEvent) {
        if let Some(senders) = self.per_hash.get_mut(&hash) {
            senders.retain(|s| s.try_send(event.clone()).is_ok() || !s.is_closed());
            if event.is_final() {
                self.per_hash.remove(&hash);
            }
        }
        self.all.retain(|s| !s.is_closed());
    }

    /// Notifies all-transactions subscribers of a freshly inserted
    /// transaction, independent of `notify`'s per-hash delivery.
    pub fn notify_all(&mut self, full: FullTransactionEvent) {
        for sender in &self.all {
            let _ = sender.try_send(full.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_events_classified_correctly() {
        assert!(TransactionEvent::Mined(B256::ZERO).is_final());
        assert!(TransactionEvent::Replaced(TxHash::ZERO).is_final());
        assert!(TransactionEvent::Discarded.is_final());
        assert!(TransactionEvent::Invalid.is_final());
        assert!(!TransactionEvent::Pending.is_final());
        assert!(!TransactionEvent::Queued.is_final());
    }

    #[tokio::test]
    async fn subscriber_receives_notification() {
        let mut broadcast = PoolEventBroadcast::new();
        let hash = TxHash::from_slice(&[1u8; 32]);
        let mut rx = broadcast.subscribe(hash);
        broadcast.notify(hash, TransactionEvent::Pending);
        assert_eq!(rx.recv().await, Some(TransactionEvent::Pending));
    }

    #[tokio::test]
    async fn final_event_removes_per_hash_subscribers() {
        let mut broadcast = PoolEventBroadcast::new();
        let hash = TxHash::from_slice(&[2u8; 32]);
        let _rx = broadcast.subscribe(hash);
        broadcast.notify(hash, TransactionEvent::Mined(B256::ZERO));
        assert!(broadcast.per_hash.is_empty());
    }
}
