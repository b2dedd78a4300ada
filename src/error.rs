//! Error taxonomy for the pool.
//!
//! Every failure the pool can produce is a value, never a panic or an
//! exception, per the crate's error-handling design: validation and policy
//! errors are reported verbatim to the submitter, resource (journal) errors
//! are logged/counted but never fail a pool operation, and invariant
//! violations are reserved for bugs.

use alloy_primitives::{Address, TxHash, U256};

use crate::identifier::TransactionId;

/// Result alias used throughout the crate.
pub type PoolResult<T> = Result<T, PoolError>;

/// Top-level error returned by pool operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolError {
    /// The transaction failed one of the validation-pipeline stages.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The transaction was rejected by pool policy (capacity, RBF, spam caps).
    #[error(transparent)]
    Policy(#[from] PolicyError),
    /// The transaction hash is already present in the pool.
    #[error("[{0}] already known")]
    AlreadyKnown(TxHash),
}

impl PoolError {
    /// The stable error-kind string used by metrics and RPC error mapping.
    ///
    /// These names match the taxonomy the pool is specified against and are
    /// intentionally decoupled from the `Display` message, which may change.
    pub fn kind(&self) -> &'static str {
        match self {
            PoolError::AlreadyKnown(_) => "already_known",
            PoolError::Validation(e) => e.kind(),
            PoolError::Policy(e) => e.kind(),
        }
    }
}

/// Errors produced by the five-stage validation pipeline (§4.1).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("rate limit exceeded for peer")]
    RateLimited,
    #[error("gas limit is zero")]
    ZeroGasLimit,
    #[error("gas limit {0} exceeds block gas limit {1}")]
    GasLimitTooHigh(u64, u64),
    #[error("negative value field")]
    NegativeValue,
    #[error("fee_cap ({0}) is less than tip_cap ({1})")]
    FeeCapLessThanTipCap(u128, u128),
    #[error("input data of size {0} exceeds max of {1}")]
    OversizedData(usize, usize),
    #[error("encoded transaction of {0} bytes exceeds RLP ceiling of {1} bytes")]
    OversizedEncoding(usize, usize),
    #[error("signature r/s malformed or zero")]
    InvalidSignature,
    #[error("authorization tuple {0} has a malformed signature")]
    InvalidAuthorizationSignature(usize),
    #[error("nonce {tx_nonce} is lower than account nonce {state_nonce}")]
    NonceTooLow { tx_nonce: u64, state_nonce: u64 },
    #[error("nonce {tx_nonce} is more than {max_gap} ahead of account nonce {state_nonce}")]
    NonceTooHigh { tx_nonce: u64, state_nonce: u64, max_gap: u64 },
    #[error("insufficient funds: cost {cost} exceeds balance {balance}")]
    InsufficientFunds { cost: U256, balance: U256 },
    #[error("intrinsic gas {required} exceeds supplied gas limit {gas_limit}")]
    IntrinsicGasTooLow { required: u64, gas_limit: u64 },
    #[error("blob transaction carries no blob hashes")]
    BlobMissingHashes,
    #[error("blob hash at index {0} has invalid versioned-hash prefix")]
    InvalidBlobVersionedHash(usize),
    #[error("blob_fee_cap {blob_fee_cap} is below current blob base fee {blob_base_fee}")]
    BlobFeeCapBelowBaseFee { blob_fee_cap: u128, blob_base_fee: u128 },
    #[error("blob count {0} exceeds max blobs per block {1}")]
    TooManyBlobs(usize, u64),
    #[error("signer account {0} has contract bytecode")]
    SignerAccountHasBytecode(Address),
    #[error("chain id mismatch: tx {tx}, pool {pool}")]
    ChainIdMismatch { tx: u64, pool: u64 },
}

impl ValidationError {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::RateLimited => "rate_limited",
            ValidationError::ZeroGasLimit | ValidationError::GasLimitTooHigh(..) => "gas_limit",
            ValidationError::NegativeValue => "negative_value",
            ValidationError::FeeCapLessThanTipCap(..) => "fee_cap_below_tip",
            ValidationError::OversizedData(..) => "oversized_data",
            ValidationError::OversizedEncoding(..) => "oversized_encoding",
            ValidationError::InvalidSignature | ValidationError::InvalidAuthorizationSignature(_) => {
                "invalid_signature"
            }
            ValidationError::NonceTooLow { .. } => "nonce_too_low",
            ValidationError::NonceTooHigh { .. } => "nonce_too_high",
            ValidationError::InsufficientFunds { .. } => "insufficient_funds",
            ValidationError::IntrinsicGasTooLow { .. } => "intrinsic_gas",
            ValidationError::BlobMissingHashes => "blob_missing_hashes",
            ValidationError::InvalidBlobVersionedHash(_) => "blob_missing_hashes",
            ValidationError::BlobFeeCapBelowBaseFee { .. } => "blob_fee_cap_below_base_fee",
            ValidationError::TooManyBlobs(..) => "blob_gas_exceeded",
            ValidationError::SignerAccountHasBytecode(_) => "signer_has_bytecode",
            ValidationError::ChainIdMismatch { .. } => "chain_id_mismatch",
        }
    }
}

/// Errors produced by pool policy: capacity, RBF, per-sender/global limits
/// (§4.3, §4.5, §4.6).
#[derive(Debug, Clone, thiserror::Error)]
pub enum PolicyError {
    #[error("replacement underpriced for {0:?}")]
    ReplacementUnderpriced(TransactionId),
    #[error("underpriced relative to cheapest pending tx")]
    Underpriced,
    #[error("pool is full and no unprotected transaction is cheaper than the incoming one")]
    PoolFull,
    #[error("sender {0} exceeded its account slot limit")]
    SenderLimitExceeded(Address),
    #[error("(sender, nonce) slot {0:?} exceeded its replacement limit")]
    ReplacementLimitExceeded(TransactionId),
    #[error("sender {0} exceeded its maximum chain depth")]
    ChainDepthExceeded(Address),
    #[error("cannot replace a blob transaction with a non-blob transaction at the same nonce")]
    BlobToNonBlobDowngrade,
    #[error("admitting this transaction would bring pending blob gas to {pending}, above the per-block maximum of {max}")]
    BlobGasExceeded { pending: u64, max: u64 },
}

impl PolicyError {
    pub fn kind(&self) -> &'static str {
        match self {
            PolicyError::ReplacementUnderpriced(_) => "replacement_underpriced",
            PolicyError::Underpriced => "underpriced",
            PolicyError::PoolFull => "pool_full",
            PolicyError::SenderLimitExceeded(_) => "sender_limit_exceeded",
            PolicyError::ReplacementLimitExceeded(_) => "replacement_limit_exceeded",
            PolicyError::ChainDepthExceeded(_) => "chain_depth_exceeded",
            PolicyError::BlobToNonBlobDowngrade => "blob_downgrade_rejected",
            PolicyError::BlobGasExceeded { .. } => "blob_gas_exceeded",
        }
    }
}

/// Errors from the journal. These are never returned from pool operations;
/// they are logged and counted (see [`crate::metrics`]) and surfaced here
/// only for the journal's own unit tests and the background worker's
/// internal retry logic.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame length {0} implausible (file size {1})")]
    ImplausibleFrameLength(u64, u64),
    #[error("record failed to decode at offset {0}")]
    RecordDecode(u64),
    #[error("journal channel closed")]
    ChannelClosed,
}

/// An internal invariant was violated. Fatal to the owning pool instance.
#[derive(Debug, Clone, thiserror::Error)]
#[error("pool invariant violated: {0}")]
pub struct InvariantViolation(pub String);
