//! The five-stage validation pipeline (§4.1): rate-limit → syntax →
//! signature → state → blob. Generalized from the teacher's single-stage,
//! ad-hoc `OrderValidatorInner::validate_one` (`validate/eth.rs`) into an
//! explicit, ordered stage list; the "Stateless/Stateful Checks" split
//! documented in the unpruned `reth-transaction-pool` lib.rs fragment is
//! the structural model for where each check lives.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_primitives::Address;
use parking_lot::Mutex;

use crate::config::PoolConfig;
use crate::constants::{MAX_BLOBS_PER_BLOCK, MIN_BLOB_BASE_FEE};
use crate::error::ValidationError;
use crate::traits::{StateReader, TransactionOrigin};
use crate::tx::{PoolTransaction, TxKind};

use super::TransactionValidationOutcome;

/// Token-bucket rate limiter keyed by peer identity, used by the optional
/// first pipeline stage. One bucket per peer; refills continuously at
/// `max_per_peer_rate` tokens per `rate_window`.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<Address, Bucket>>,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `peer` may submit now, consuming one token.
    pub fn check(&self, peer: Address, max_per_window: u32, window: Duration) -> bool {
        let mut buckets = self.buckets.lock();
        let now = Instant::now();
        let bucket = buckets.entry(peer).or_insert(Bucket { tokens: max_per_window as f64, last_refill: now });
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        let refill_rate = max_per_window as f64 / window.as_secs_f64().max(f64::EPSILON);
        bucket.tokens = (bucket.tokens + elapsed * refill_rate).min(max_per_window as f64);
        bucket.last_refill = now;
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Runs transactions through the five ordered stages and returns a
/// categorized outcome.
pub struct Validator<S> {
    config: PoolConfig,
    state: Arc<S>,
    rate_limiter: RateLimiter,
    chain_id: u64,
    current_base_fee: Mutex<u128>,
    current_blob_base_fee: Mutex<u128>,
}

impl<S: StateReader> Validator<S> {
    pub fn new(config: PoolConfig, state: Arc<S>, chain_id: u64) -> Self {
        Self {
            config,
            state,
            rate_limiter: RateLimiter::new(),
            chain_id,
            current_base_fee: Mutex::new(0),
            current_blob_base_fee: Mutex::new(MIN_BLOB_BASE_FEE),
        }
    }

    pub fn set_base_fee(&self, base_fee: u128) {
        *self.current_base_fee.lock() = base_fee;
    }

    pub fn set_blob_base_fee(&self, blob_base_fee: u128) {
        *self.current_blob_base_fee.lock() = blob_base_fee;
    }

    /// Validates one transaction, short-circuiting on the first failing
    /// stage. `peer` is `None` for locally submitted transactions, which are
    /// exempt from rate-limiting.
    pub async fn validate(
        &self,
        origin: TransactionOrigin,
        peer: Option<Address>,
        tx: PoolTransaction,
    ) -> TransactionValidationOutcome<PoolTransaction> {
        if let Err(e) = self.stage_rate_limit(peer) {
            return TransactionValidationOutcome::Invalid(tx, e);
        }
        if let Err(e) = self.stage_syntax(&tx) {
            return TransactionValidationOutcome::Invalid(tx, e);
        }
        if let Err(e) = self.stage_signature(&tx) {
            return TransactionValidationOutcome::Invalid(tx, e);
        }
        let (state_nonce, balance) = match self.stage_state(&tx).await {
            Ok(pair) => pair,
            Err(Ok(e)) => return TransactionValidationOutcome::Invalid(tx, e),
            Err(Err(msg)) => return TransactionValidationOutcome::Error(tx.hash, msg),
        };
        if let Err(e) = self.stage_blob(&tx) {
            return TransactionValidationOutcome::Invalid(tx, e);
        }

        let propagate = match origin {
            TransactionOrigin::External => true,
            TransactionOrigin::Local => self.config.local_transactions.propagate,
            TransactionOrigin::Private => false,
        };

        TransactionValidationOutcome::Valid { balance, state_nonce, transaction: tx, propagate }
    }

    fn stage_rate_limit(&self, peer: Option<Address>) -> Result<(), ValidationError> {
        if !self.config.rate_limit.enabled {
            return Ok(());
        }
        let Some(peer) = peer else { return Ok(()) };
        let window = Duration::from_secs(self.config.rate_limit.rate_window_secs);
        if self.rate_limiter.check(peer, self.config.rate_limit.max_per_peer_rate, window) {
            Ok(())
        } else {
            Err(ValidationError::RateLimited)
        }
    }

    fn stage_syntax(&self, tx: &PoolTransaction) -> Result<(), ValidationError> {
        if tx.gas_limit == 0 {
            return Err(ValidationError::ZeroGasLimit);
        }
        if tx.gas_limit > self.config.block_gas_limit {
            return Err(ValidationError::GasLimitTooHigh(tx.gas_limit, self.config.block_gas_limit));
        }
        if let Some(tip) = tx.tip_cap() {
            if tx.fee_cap() < tip {
                return Err(ValidationError::FeeCapLessThanTipCap(tx.fee_cap(), tip));
            }
        }
        if tx.data.len() > self.config.max_data_size {
            return Err(ValidationError::OversizedData(tx.data.len(), self.config.max_data_size));
        }
        if tx.encoded_length > self.config.max_tx_size {
            return Err(ValidationError::OversizedEncoding(tx.encoded_length, self.config.max_tx_size));
        }
        if let Some(chain_id) = tx.chain_id {
            if chain_id != self.chain_id {
                return Err(ValidationError::ChainIdMismatch { tx: chain_id, pool: self.chain_id });
            }
        }
        let required = tx.intrinsic_gas();
        if tx.gas_limit < required {
            return Err(ValidationError::IntrinsicGasTooLow { required, gas_limit: tx.gas_limit });
        }
        Ok(())
    }

    fn stage_signature(&self, tx: &PoolTransaction) -> Result<(), ValidationError> {
        if tx.r.is_zero() || tx.s.is_zero() {
            return Err(ValidationError::InvalidSignature);
        }
        for (idx, auth) in tx.authorization_list.iter().enumerate() {
            if auth.r.is_zero() || auth.s.is_zero() {
                return Err(ValidationError::InvalidAuthorizationSignature(idx));
            }
        }
        Ok(())
    }

    /// Returns `Ok((state_nonce, balance))`, `Err(Ok(validation_error))` for
    /// a rejected transaction, or `Err(Err(message))` if the `StateReader`
    /// itself failed (a resource error, not a validation failure).
    async fn stage_state(
        &self,
        tx: &PoolTransaction,
    ) -> Result<(u64, alloy_primitives::U256), Result<ValidationError, String>> {
        let has_bytecode = self.state.has_bytecode(tx.sender).await.map_err(|e| Err(e.to_string()))?;
        if has_bytecode {
            return Err(Ok(ValidationError::SignerAccountHasBytecode(tx.sender)));
        }

        let state_nonce = self.state.get_nonce(tx.sender).await.map_err(|e| Err(e.to_string()))?;
        if tx.nonce < state_nonce {
            return Err(Ok(ValidationError::NonceTooLow { tx_nonce: tx.nonce, state_nonce }));
        }
        if tx.nonce > state_nonce + self.config.max_nonce_gap {
            return Err(Ok(ValidationError::NonceTooHigh {
                tx_nonce: tx.nonce,
                state_nonce,
                max_gap: self.config.max_nonce_gap,
            }));
        }

        let balance = self.state.get_balance(tx.sender).await.map_err(|e| Err(e.to_string()))?;
        let cost = tx.cost();
        if cost > balance {
            return Err(Ok(ValidationError::InsufficientFunds { cost, balance }));
        }

        Ok((state_nonce, balance))
    }

    fn stage_blob(&self, tx: &PoolTransaction) -> Result<(), ValidationError> {
        if tx.kind != TxKind::Blob {
            return Ok(());
        }
        if tx.blob_versioned_hashes.is_empty() {
            return Err(ValidationError::BlobMissingHashes);
        }
        for (idx, hash) in tx.blob_versioned_hashes.iter().enumerate() {
            if hash[0] != 0x01 {
                return Err(ValidationError::InvalidBlobVersionedHash(idx));
            }
        }
        if tx.blob_versioned_hashes.len() as u64 > MAX_BLOBS_PER_BLOCK {
            return Err(ValidationError::TooManyBlobs(tx.blob_versioned_hashes.len(), MAX_BLOBS_PER_BLOCK));
        }
        let blob_base_fee = *self.current_blob_base_fee.lock();
        let blob_fee_cap = tx.max_fee_per_blob_gas.unwrap_or_default();
        if blob_fee_cap < blob_base_fee {
            return Err(ValidationError::BlobFeeCapBelowBaseFee { blob_fee_cap, blob_base_fee });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::PoolConfig;
    use crate::test_utils::{MockStateReader, MockTransactionFactory};
    use crate::traits::TransactionOrigin;

    fn validator(config: PoolConfig, state: MockStateReader) -> Validator<MockStateReader> {
        Validator::new(config, Arc::new(state), 1)
    }

    #[tokio::test]
    async fn nonce_gap_exactly_at_limit_is_accepted() {
        let config = PoolConfig::default();
        let state = MockStateReader::new();
        let sender = Address::with_last_byte(9);
        let v = validator(config.clone(), state);
        let mut factory = MockTransactionFactory::new();
        let tx = factory.dynamic_fee(sender, config.max_nonce_gap, 100, 10);
        let outcome = v.validate(TransactionOrigin::External, None, tx).await;
        assert!(matches!(outcome, TransactionValidationOutcome::Valid { .. }));
    }

    #[tokio::test]
    async fn nonce_gap_one_past_limit_is_rejected() {
        let config = PoolConfig::default();
        let state = MockStateReader::new();
        let sender = Address::with_last_byte(9);
        let v = validator(config.clone(), state);
        let mut factory = MockTransactionFactory::new();
        let tx = factory.dynamic_fee(sender, config.max_nonce_gap + 1, 100, 10);
        let outcome = v.validate(TransactionOrigin::External, None, tx).await;
        match outcome {
            TransactionValidationOutcome::Invalid(_, ValidationError::NonceTooHigh { .. }) => {}
            other => panic!("expected NonceTooHigh, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fee_cap_equal_to_tip_cap_is_accepted() {
        let v = validator(PoolConfig::default(), MockStateReader::new());
        let mut factory = MockTransactionFactory::new();
        let tx = factory.dynamic_fee(Address::with_last_byte(1), 0, 500, 500);
        let outcome = v.validate(TransactionOrigin::External, None, tx).await;
        assert!(matches!(outcome, TransactionValidationOutcome::Valid { .. }));
    }

    #[tokio::test]
    async fn fee_cap_below_tip_cap_is_rejected() {
        let v = validator(PoolConfig::default(), MockStateReader::new());
        let mut factory = MockTransactionFactory::new();
        let tx = factory.dynamic_fee(Address::with_last_byte(1), 0, 499, 500);
        let outcome = v.validate(TransactionOrigin::External, None, tx).await;
        assert!(matches!(
            outcome,
            TransactionValidationOutcome::Invalid(_, ValidationError::FeeCapLessThanTipCap(..))
        ));
    }

    #[tokio::test]
    async fn zero_gas_limit_is_rejected() {
        let v = validator(PoolConfig::default(), MockStateReader::new());
        let mut factory = MockTransactionFactory::new();
        let mut tx = factory.legacy(Address::with_last_byte(1), 0, 100);
        tx.gas_limit = 0;
        let outcome = v.validate(TransactionOrigin::External, None, tx).await;
        assert!(matches!(outcome, TransactionValidationOutcome::Invalid(_, ValidationError::ZeroGasLimit)));
    }

    #[tokio::test]
    async fn nonce_below_state_nonce_is_rejected() {
        let state = MockStateReader::new();
        let sender = Address::with_last_byte(3);
        state.set_nonce(sender, 5);
        let v = validator(PoolConfig::default(), state);
        let mut factory = MockTransactionFactory::new();
        let tx = factory.dynamic_fee(sender, 4, 100, 10);
        let outcome = v.validate(TransactionOrigin::External, None, tx).await;
        assert!(matches!(
            outcome,
            TransactionValidationOutcome::Invalid(_, ValidationError::NonceTooLow { .. })
        ));
    }

    #[tokio::test]
    async fn insufficient_balance_is_rejected() {
        let state = MockStateReader::new();
        let sender = Address::with_last_byte(4);
        state.set_balance(sender, U256::from(10u64));
        let v = validator(PoolConfig::default(), state);
        let mut factory = MockTransactionFactory::new();
        let tx = factory.dynamic_fee(sender, 0, 1_000_000, 10);
        let outcome = v.validate(TransactionOrigin::External, None, tx).await;
        assert!(matches!(
            outcome,
            TransactionValidationOutcome::Invalid(_, ValidationError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn blob_missing_hashes_is_rejected() {
        let v = validator(PoolConfig::default(), MockStateReader::new());
        let mut factory = MockTransactionFactory::new();
        let mut tx = factory.blob(Address::with_last_byte(5), 0, 500, 10, 500);
        tx.blob_versioned_hashes.clear();
        let outcome = v.validate(TransactionOrigin::External, None, tx).await;
        assert!(matches!(
            outcome,
            TransactionValidationOutcome::Invalid(_, ValidationError::BlobMissingHashes)
        ));
    }

    #[tokio::test]
    async fn blob_fee_cap_below_current_blob_base_fee_is_rejected() {
        let v = validator(PoolConfig::default(), MockStateReader::new());
        v.set_blob_base_fee(1000);
        let mut factory = MockTransactionFactory::new();
        let tx = factory.blob(Address::with_last_byte(6), 0, 500, 10, 100);
        let outcome = v.validate(TransactionOrigin::External, None, tx).await;
        assert!(matches!(
            outcome,
            TransactionValidationOutcome::Invalid(_, ValidationError::BlobFeeCapBelowBaseFee { .. })
        ));
    }

    #[tokio::test]
    async fn signer_account_with_bytecode_is_rejected() {
        let state = MockStateReader::new();
        let sender = Address::with_last_byte(7);
        state.set_has_bytecode(sender, true);
        let v = validator(PoolConfig::default(), state);
        let mut factory = MockTransactionFactory::new();
        let tx = factory.legacy(sender, 0, 100);
        let outcome = v.validate(TransactionOrigin::External, None, tx).await;
        assert!(matches!(
            outcome,
            TransactionValidationOutcome::Invalid(_, ValidationError::SignerAccountHasBytecode(_))
        ));
    }

    #[tokio::test]
    async fn chain_id_mismatch_is_rejected() {
        let v = validator(PoolConfig::default(), MockStateReader::new());
        let mut factory = MockTransactionFactory::with_chain_id(Some(999));
        let tx = factory.legacy(Address::with_last_byte(8), 0, 100);
        let outcome = v.validate(TransactionOrigin::External, None, tx).await;
        assert!(matches!(
            outcome,
            TransactionValidationOutcome::Invalid(_, ValidationError::ChainIdMismatch { .. })
        ));
    }
}
