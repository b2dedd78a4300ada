//! Pool configuration.
//!
//! A plain struct constructed by the embedding node; the pool itself never
//! reads environment variables or parses CLI arguments (out of scope, see
//! §1). Mirrors the teacher's `PoolConfig`/builder idiom.

use crate::constants::*;

/// Tunables for replace-by-fee acceptance.
#[derive(Debug, Clone, Copy)]
pub struct PriceBumpConfig {
    /// Minimum percentage bump required on `gas_price`/`fee_cap`.
    pub fee_bump: u32,
    /// Minimum percentage bump required on `tip_cap`.
    pub tip_bump: u32,
    /// Minimum percentage bump required on `blob_fee_cap` for blob-vs-blob
    /// replacements.
    pub blob_fee_bump: u32,
}

impl Default for PriceBumpConfig {
    fn default() -> Self {
        Self {
            fee_bump: DEFAULT_PRICE_BUMP,
            tip_bump: DEFAULT_PRICE_BUMP,
            blob_fee_bump: DEFAULT_BLOB_PRICE_BUMP,
        }
    }
}

/// A size limit shared by a sub-pool (pending, queued, blob).
#[derive(Debug, Clone, Copy)]
pub struct SubPoolLimit {
    /// Maximum number of transactions.
    pub max_txs: usize,
    /// Soft byte-size budget, used for metrics/introspection only; capacity
    /// enforcement is transaction-count based per §4.6.
    pub max_size_bytes: usize,
}

impl SubPoolLimit {
    pub const fn new(max_txs: usize, max_size_bytes: usize) -> Self {
        Self { max_txs, max_size_bytes }
    }
}

/// Rate-limiting configuration for the admission pipeline's optional first
/// stage (§4.1).
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_per_peer_rate: u32,
    pub rate_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { enabled: false, max_per_peer_rate: 200, rate_window_secs: 1 }
    }
}

/// Local-transaction propagation policy, mirrors the teacher's
/// `propagate_local_transactions` toggle (`validate/eth.rs`).
#[derive(Debug, Clone, Copy)]
pub struct LocalTransactionConfig {
    /// Whether local transactions are exempt from per-sender/global eviction.
    pub no_exemptions: bool,
    /// Whether transactions submitted locally should be propagated to peers.
    pub propagate: bool,
}

impl Default for LocalTransactionConfig {
    fn default() -> Self {
        Self { no_exemptions: false, propagate: true }
    }
}

/// Journal persistence configuration (§4.9).
#[derive(Debug, Clone)]
pub struct JournalConfig {
    pub path: std::path::PathBuf,
    /// Flush to stable storage after this many writes.
    pub flush_count: u32,
    /// ...or after this much wall-clock time, whichever comes first.
    pub flush_interval: std::time::Duration,
    /// Rotate after this many live frames.
    pub rotate_count: u64,
    /// ...or after this much wall-clock time since the last rotation.
    pub rotate_age: std::time::Duration,
    /// Bounded channel depth for the background flush worker.
    pub channel_capacity: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: std::path::PathBuf::from("txpool.journal"),
            flush_count: 64,
            flush_interval: std::time::Duration::from_secs(5),
            rotate_count: 50_000,
            rotate_age: std::time::Duration::from_secs(3600),
            channel_capacity: 4096,
        }
    }
}

/// Top-level pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub pending_limit: SubPoolLimit,
    pub queued_limit: SubPoolLimit,
    pub blob_limit: SubPoolLimit,
    pub max_account_slots: usize,
    pub price_bump: PriceBumpConfig,
    pub max_nonce_gap: u64,
    pub max_tx_size: usize,
    pub max_replacements: u32,
    pub max_chain_depth: usize,
    pub heap_stale_threshold: usize,
    pub fee_history_limit: usize,
    pub rate_limit: RateLimitConfig,
    pub local_transactions: LocalTransactionConfig,
    pub journal: JournalConfig,
    pub block_gas_limit: u64,
    pub max_data_size: usize,
    pub spike_threshold_pct: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pending_limit: SubPoolLimit::new(DEFAULT_MAX_POOL_SIZE, usize::MAX),
            queued_limit: SubPoolLimit::new(DEFAULT_MAX_POOL_SIZE, usize::MAX),
            blob_limit: SubPoolLimit::new(DEFAULT_MAX_POOL_SIZE / 10, usize::MAX),
            max_account_slots: DEFAULT_MAX_ACCOUNT_SLOTS,
            price_bump: PriceBumpConfig::default(),
            max_nonce_gap: DEFAULT_MAX_NONCE_GAP,
            max_tx_size: DEFAULT_MAX_TX_SIZE,
            max_replacements: DEFAULT_MAX_REPLACEMENTS,
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            heap_stale_threshold: DEFAULT_HEAP_STALE_THRESHOLD,
            fee_history_limit: DEFAULT_FEE_HISTORY_LIMIT,
            rate_limit: RateLimitConfig::default(),
            local_transactions: LocalTransactionConfig::default(),
            journal: JournalConfig::default(),
            block_gas_limit: 30_000_000,
            max_data_size: 128 * 1024,
            spike_threshold_pct: 200,
        }
    }
}

/// Builder for [`PoolConfig`], mirroring the teacher's
/// `AngstromOrderValidatorBuilder` fluent-setter style.
#[derive(Debug, Clone, Default)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    pub fn new() -> Self {
        Self { config: PoolConfig::default() }
    }

    pub fn with_max_pool_size(mut self, max_txs: usize) -> Self {
        self.config.pending_limit.max_txs = max_txs;
        self
    }

    pub fn with_max_account_slots(mut self, slots: usize) -> Self {
        self.config.max_account_slots = slots;
        self
    }

    pub fn with_price_bump(mut self, fee_bump: u32, tip_bump: u32) -> Self {
        self.config.price_bump.fee_bump = fee_bump;
        self.config.price_bump.tip_bump = tip_bump;
        self
    }

    pub fn with_max_nonce_gap(mut self, gap: u64) -> Self {
        self.config.max_nonce_gap = gap;
        self
    }

    pub fn no_local_transaction_exemptions(mut self) -> Self {
        self.config.local_transactions.no_exemptions = true;
        self
    }

    pub fn with_journal_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config.journal.path = path.into();
        self
    }

    pub fn with_rate_limit(mut self, max_per_peer_rate: u32, window_secs: u64) -> Self {
        self.config.rate_limit = RateLimitConfig {
            enabled: true,
            max_per_peer_rate,
            rate_window_secs: window_secs,
        };
        self
    }

    pub fn build(self) -> PoolConfig {
        self.config
    }
}
