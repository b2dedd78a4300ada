//! The pool's internal components (§4): transaction state classification,
//! the priced eviction heap, per-account bookkeeping, the future-transaction
//! queue, replace-by-fee policy, the event broadcast registry, the blob
//! subpool, and the main pool itself.
//!
//! Mirrors the teacher's `pool/` module layout (`order_storage.rs`,
//! `state.rs`, `events.rs`) one-for-one where the concept survives, and adds
//! the modules a nonce/fee mempool needs that order-matching never did
//! (`account`, `queue`, `rbf`, `heap`, `blob`, `txpool`).

pub mod account;
pub mod blob;
pub mod events;
pub mod heap;
pub mod queue;
pub mod rbf;
pub mod state;
pub mod txpool;

pub use events::{AllTransactionsEvents, FullTransactionEvent, PoolEventBroadcast, PropagateKind, TransactionEvent, TransactionEvents};
pub use state::{SubPool, TxState};
pub use txpool::PoolInner;
