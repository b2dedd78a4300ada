//! Validation outcome types and the pooled-transaction wrapper, generalized
//! from the teacher's `validate/mod.rs` (`TransactionValidationOutcome`,
//! `ValidPoolTransaction`).

pub mod pipeline;

use std::sync::Arc;
use std::time::Instant;

use alloy_primitives::{Address, TxHash, U256};

use crate::error::ValidationError;
use crate::identifier::TransactionId;
use crate::traits::TransactionOrigin;
use crate::tx::PoolTransaction;

pub use pipeline::Validator;

/// The result of running a transaction through the validation pipeline.
#[derive(Debug, Clone)]
pub enum TransactionValidationOutcome<T> {
    /// Passed every stage; carries the fields the pool needs to decide
    /// pending vs. queued placement without re-querying state.
    Valid {
        balance: U256,
        state_nonce: u64,
        transaction: T,
        /// Whether this transaction may be propagated to peers.
        propagate: bool,
    },
    /// Rejected at some stage; the transaction is handed back unchanged so
    /// the caller can inspect it (e.g. for logging) without re-encoding.
    Invalid(T, ValidationError),
    /// The `StateReader` itself failed; distinct from a validation failure
    /// since it reflects an external/resource error, not a bad transaction.
    Error(TxHash, String),
}

/// A transaction that has passed validation and is resident in a sub-pool,
/// decorated with the bookkeeping fields the pool's internal structures
/// need (dense id, cached cost, insertion order).
#[derive(Debug)]
pub struct ValidPoolTransaction<T> {
    pub transaction: T,
    pub transaction_id: TransactionId,
    /// Upper-bound cost reserved against the sender's balance.
    pub cost: U256,
    pub encoded_length: usize,
    pub origin: TransactionOrigin,
    /// Monotonic submission counter, used as the priced-heap tie-break
    /// (§4.2: "tie-break by insertion time, older first").
    pub submission_id: u64,
    pub timestamp: Instant,
}

impl ValidPoolTransaction<PoolTransaction> {
    pub fn hash(&self) -> &TxHash {
        &self.transaction.hash
    }

    pub fn sender(&self) -> Address {
        self.transaction.sender
    }

    pub fn nonce(&self) -> u64 {
        self.transaction.nonce
    }

    pub fn cost(&self) -> U256 {
        self.cost
    }

    pub fn gas_limit(&self) -> u64 {
        self.transaction.gas_limit
    }

    pub fn is_local(&self) -> bool {
        self.origin.is_local()
    }

    pub fn effective_price(&self, base_fee: u128) -> u128 {
        self.transaction.effective_price(base_fee)
    }

    pub fn size(&self) -> usize {
        self.encoded_length
    }
}

impl<T> PartialEq for ValidPoolTransaction<T> {
    fn eq(&self, other: &Self) -> bool {
        self.transaction_id == other.transaction_id
    }
}
impl<T> Eq for ValidPoolTransaction<T> {}

/// Handy alias used across the pool internals.
pub type ValidTx = Arc<ValidPoolTransaction<PoolTransaction>>;
