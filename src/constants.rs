//! Protocol and pool-policy constants shared across the crate.
//!
//! These mirror the values enforced by mainnet Ethereum clients; the pool
//! does not derive them from genesis/chain config because it has no access
//! to one (see [`crate::traits::StateReader`]).

/// Floor for the blob base fee; `fake_exponential` never returns below this.
pub const MIN_BLOB_BASE_FEE: u128 = 1;

/// Gas consumed by a single blob (2**17).
pub const BLOB_GAS_PER_BLOB: u64 = 131_072;

/// Maximum number of blobs a single block may contain.
pub const MAX_BLOBS_PER_BLOCK: u64 = 6;

/// Target number of blobs per block; excess-blob-gas accounting targets this.
pub const TARGET_BLOBS_PER_BLOCK: u64 = 3;

/// Target blob gas per block, derived from [`TARGET_BLOBS_PER_BLOCK`].
pub const TARGET_BLOB_GAS_PER_BLOCK: u64 = TARGET_BLOBS_PER_BLOCK * BLOB_GAS_PER_BLOB;

/// Maximum blob gas a single block may consume.
pub const MAX_BLOB_GAS_PER_BLOCK: u64 = MAX_BLOBS_PER_BLOCK * BLOB_GAS_PER_BLOB;

/// EIP-4844 `BLOB_BASE_FEE_UPDATE_FRACTION`.
pub const BLOB_BASE_FEE_UPDATE_FRACTION: u128 = 3_338_477;

/// Per-address surcharge for EIP-2930 access list entries.
pub const ACCESS_LIST_ADDRESS_COST: u64 = 2_400;

/// Per-storage-key surcharge for EIP-2930 access list entries.
pub const ACCESS_LIST_STORAGE_COST: u64 = 1_900;

/// Intrinsic gas for a plain value transfer.
pub const INTRINSIC_GAS_TRANSFER: u64 = 21_000;

/// Intrinsic gas for a contract-creation transaction.
pub const INTRINSIC_GAS_CREATION: u64 = 53_000;

/// Per-byte gas charge for a zero data byte.
pub const CALLDATA_GAS_PER_ZERO_BYTE: u64 = 4;

/// Per-byte gas charge for a non-zero data byte.
pub const CALLDATA_GAS_PER_NONZERO_BYTE: u64 = 16;

/// Default minimum percentage bump required for a fee-replacement to be
/// accepted (applies to `gas_price`/`fee_cap`/`tip_cap`).
pub const DEFAULT_PRICE_BUMP: u32 = 10;

/// Minimum percentage bump required for `blob_fee_cap` on a blob replacement.
pub const DEFAULT_BLOB_PRICE_BUMP: u32 = 100;

/// Default maximum distance between an account's confirmed nonce and an
/// incoming transaction's nonce before it is rejected outright.
pub const DEFAULT_MAX_NONCE_GAP: u64 = 64;

/// Default maximum encoded transaction size accepted by the pool (128 KiB).
pub const DEFAULT_MAX_TX_SIZE: usize = 128 * 1024;

/// Default maximum number of replacements accepted for a single
/// `(sender, nonce)` slot.
pub const DEFAULT_MAX_REPLACEMENTS: u32 = 25;

/// Default maximum number of outstanding transactions (pending + queued) for
/// a single sender.
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 100;

/// Default global pool capacity (number of transactions).
pub const DEFAULT_MAX_POOL_SIZE: usize = 10_000;

/// Default per-sender pending+queued slot limit.
pub const DEFAULT_MAX_ACCOUNT_SLOTS: usize = 16;

/// Lazy-deletion threshold: once this many stale entries accumulate in the
/// priced heap, the next mutating operation triggers a [`crate::pool::heap`]
/// compaction.
pub const DEFAULT_HEAP_STALE_THRESHOLD: usize = 256;

/// Number of sealed-block records retained by the fee-oracle ring buffers.
pub const DEFAULT_FEE_HISTORY_LIMIT: usize = 1_024;

/// Bound on the `fake_exponential` accumulation loop; the series is expected
/// to have converged to zero well before this many iterations for any
/// realistic `excess_blob_gas`.
pub const FAKE_EXPONENTIAL_ITERATION_BOUND: u32 = 100;
