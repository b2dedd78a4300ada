//! Pool metrics, registered through the plain `metrics` facade the way
//! `reth-metrics`'s generated structs do it by hand underneath their derive
//! macro: each field is a pre-resolved [`metrics::Counter`]/[`metrics::Gauge`]
//! handle obtained once at construction rather than re-resolved by name on
//! every call site.

use metrics::{Counter, Gauge};

/// Counters and gauges for the main pool and queue manager (§9
/// "Observability").
#[derive(Clone)]
pub struct PoolMetrics {
    pub validation_already_known: Counter,
    pub validation_rejected: Counter,
    pub replacements: Counter,
    pub queue_evictions: Counter,
    pub pending_evictions: Counter,
    pub base_fee_evictions: Counter,
    pub resets: Counter,
    pub pending_size: Gauge,
    pub queued_size: Gauge,
}

impl Default for PoolMetrics {
    fn default() -> Self {
        Self {
            validation_already_known: metrics::counter!("txpool_validation_already_known_total"),
            validation_rejected: metrics::counter!("txpool_validation_rejected_total"),
            replacements: metrics::counter!("txpool_replacements_total"),
            queue_evictions: metrics::counter!("txpool_queue_evictions_total"),
            pending_evictions: metrics::counter!("txpool_pending_evictions_total"),
            base_fee_evictions: metrics::counter!("txpool_base_fee_evictions_total"),
            resets: metrics::counter!("txpool_resets_total"),
            pending_size: metrics::gauge!("txpool_pending_size"),
            queued_size: metrics::gauge!("txpool_queued_size"),
        }
    }
}

/// Blob subpool metrics (§4.7 "Observability"), kept separate from
/// [`PoolMetrics`] since the blob subpool's capacity and eviction rates are
/// meaningfully different from the main pool's.
#[derive(Clone)]
pub struct BlobPoolMetrics {
    pub admissions: Counter,
    pub evictions: Counter,
    pub excess_blob_gas: Gauge,
    pub blob_base_fee: Gauge,
}

impl Default for BlobPoolMetrics {
    fn default() -> Self {
        Self {
            admissions: metrics::counter!("txpool_blob_admissions_total"),
            evictions: metrics::counter!("txpool_blob_evictions_total"),
            excess_blob_gas: metrics::gauge!("txpool_excess_blob_gas"),
            blob_base_fee: metrics::gauge!("txpool_blob_base_fee"),
        }
    }
}

/// Journal metrics (§4.9 "Observability").
#[derive(Clone)]
pub struct JournalMetrics {
    pub writes: Counter,
    pub replays: Counter,
    pub corruptions: Counter,
    pub rotations: Counter,
    pub flushes: Counter,
    pub bytes_written: Counter,
}

impl Default for JournalMetrics {
    fn default() -> Self {
        Self {
            writes: metrics::counter!("txpool_journal_writes_total"),
            replays: metrics::counter!("txpool_journal_replays_total"),
            corruptions: metrics::counter!("txpool_journal_corruptions_total"),
            rotations: metrics::counter!("txpool_journal_rotations_total"),
            flushes: metrics::counter!("txpool_journal_flushes_total"),
            bytes_written: metrics::counter!("txpool_journal_bytes_written_total"),
        }
    }
}

/// Fee oracle metrics (§4.8 "Observability").
#[derive(Clone)]
pub struct OracleMetrics {
    pub samples_recorded: Counter,
    pub spikes_detected: Counter,
}

impl Default for OracleMetrics {
    fn default() -> Self {
        Self {
            samples_recorded: metrics::counter!("txpool_oracle_samples_total"),
            spikes_detected: metrics::counter!("txpool_oracle_spikes_total"),
        }
    }
}
