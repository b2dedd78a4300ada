//! Fee oracle (§4.8): a sliding window of recent block fee observations used
//! to recommend gas prices and tip caps for submitters, and to flag blob
//! fee spikes.
//!
//! Grounded on the teacher's sliding-window sampling idiom (`order_storage`'s
//! bounded history buffers) generalized to fee percentiles; the percentile
//! math itself (`(n-1) * p / 100` index, nearest-rank) follows
//! `reth`'s `eth_feeHistory` oracle as documented in the unpruned fragment
//! under `other_examples`.

use std::collections::VecDeque;

use parking_lot::RwLock;

use crate::metrics::OracleMetrics;

/// One block's worth of fee observations.
#[derive(Debug, Clone, Copy)]
pub struct BlockFeeRecord {
    pub block_number: u64,
    pub base_fee: u128,
    pub blob_base_fee: u128,
    pub gas_used: u64,
    pub gas_limit: u64,
    /// Tip caps paid by transactions actually included, used for the tip
    /// percentile estimate; empty blocks contribute no samples.
    pub rewards: [u128; 3],
}

/// Percentile-based price suggestions at three urgency tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeRecommendation {
    pub slow: u128,
    pub medium: u128,
    pub fast: u128,
}

/// Maintains a bounded window of [`BlockFeeRecord`]s and answers percentile
/// queries over it. Thread-safe: callers push new blocks concurrently with
/// readers computing recommendations.
pub struct FeeOracle {
    history: RwLock<VecDeque<BlockFeeRecord>>,
    capacity: usize,
    spike_threshold_pct: u32,
    metrics: OracleMetrics,
}

impl FeeOracle {
    pub fn new(capacity: usize, spike_threshold_pct: u32) -> Self {
        Self {
            history: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            spike_threshold_pct,
            metrics: OracleMetrics::default(),
        }
    }

    /// Appends a new block's fee record, evicting the oldest if the window
    /// is full.
    pub fn record_block(&self, record: BlockFeeRecord) {
        let mut history = self.history.write();
        if history.len() >= self.capacity {
            history.pop_front();
        }
        history.push_back(record);
        self.metrics.samples_recorded.increment(1);
    }

    pub fn len(&self) -> usize {
        self.history.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The nearest-rank percentile of `values` (already sorted ascending by
    /// the caller). `p` is 0-100.
    fn percentile(values: &[u128], p: u32) -> u128 {
        if values.is_empty() {
            return 0;
        }
        let rank = ((values.len() - 1) as u64 * p as u64 / 100) as usize;
        values[rank]
    }

    /// Suggests an `eth_gasPrice`-style single figure: the median base fee
    /// of the window plus the median tip.
    pub fn suggest_gas_price(&self) -> u128 {
        let history = self.history.read();
        if history.is_empty() {
            return 0;
        }
        let mut base_fees: Vec<u128> = history.iter().map(|r| r.base_fee).collect();
        base_fees.sort_unstable();
        let base = Self::percentile(&base_fees, 50);
        base.saturating_add(self.suggest_tip_cap())
    }

    /// Median of the per-block median reward (`rewards[1]`, the 50th
    /// percentile tip paid by included transactions).
    pub fn suggest_tip_cap(&self) -> u128 {
        let history = self.history.read();
        let mut tips: Vec<u128> = history.iter().map(|r| r.rewards[1]).collect();
        if tips.is_empty() {
            return 0;
        }
        tips.sort_unstable();
        Self::percentile(&tips, 50)
    }

    /// `suggest_fee_cap()` (§4.8): `2 * latest_base_fee + tip`, a flat
    /// safety margin against base-fee drift rather than a multi-block
    /// projection.
    pub fn suggest_fee_cap(&self) -> u128 {
        let history = self.history.read();
        let latest_base_fee = history.back().map_or(0, |r| r.base_fee);
        drop(history);
        latest_base_fee.saturating_mul(2).saturating_add(self.suggest_tip_cap())
    }

    /// Slow/medium/fast recommendation (§4.8): tips at the 10th/50th/90th
    /// percentiles, fees built from `next_base_fee · {1, 1.25, 1.5} + tip`.
    pub fn recommend(&self) -> FeeRecommendation {
        let next_base_fee = self.estimate_next_base_fee();
        let history = self.history.read();
        let mut tips: Vec<u128> = history.iter().map(|r| r.rewards[1]).collect();
        tips.sort_unstable();
        drop(history);
        FeeRecommendation {
            slow: next_base_fee.saturating_add(Self::percentile(&tips, 10)),
            medium: (next_base_fee.saturating_mul(5) / 4).saturating_add(Self::percentile(&tips, 50)),
            fast: (next_base_fee.saturating_mul(3) / 2).saturating_add(Self::percentile(&tips, 90)),
        }
    }

    /// EIP-1559 base-fee delta estimate for the next block (§4.8): target is
    /// `gas_limit/2`, `delta = base_fee * |used - target| / target / 8`,
    /// floored at 1 wei when the block ran hot (rising base fee).
    pub fn estimate_next_base_fee(&self) -> u128 {
        let history = self.history.read();
        let Some(latest) = history.back() else { return 0 };
        let target = latest.gas_limit / 2;
        if target == 0 {
            return latest.base_fee;
        }
        let used = latest.gas_used;
        let diff = used.abs_diff(target);
        let delta = latest.base_fee.saturating_mul(diff as u128) / target as u128 / 8;
        match used.cmp(&target) {
            std::cmp::Ordering::Greater => latest.base_fee.saturating_add(delta.max(1)),
            std::cmp::Ordering::Less => latest.base_fee.saturating_sub(delta),
            std::cmp::Ordering::Equal => latest.base_fee,
        }
    }

    /// Whether the most recent block's blob base fee exceeds the trailing
    /// moving average by more than `spike_threshold_pct` percent (§4.8
    /// "spike detection").
    pub fn blob_fee_spike(&self) -> bool {
        let history = self.history.read();
        if history.len() < 2 {
            return false;
        }
        let current = history.back().unwrap().blob_base_fee;
        let sum: u128 = history.iter().map(|r| r.blob_base_fee).sum();
        let moving_avg = sum / history.len() as u128;
        if moving_avg == 0 {
            return false;
        }
        let spike = current.saturating_mul(100) / moving_avg > self.spike_threshold_pct as u128;
        if spike {
            self.metrics.spikes_detected.increment(1);
        }
        spike
    }

    pub fn suggest_blob_fee_cap(&self) -> u128 {
        let history = self.history.read();
        let Some(latest) = history.back() else { return crate::constants::MIN_BLOB_BASE_FEE };
        latest.blob_base_fee.saturating_add(latest.blob_base_fee / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a record at 50% gas usage (exactly at target), so the base
    /// fee holds steady unless a test overrides `gas_used`/`gas_limit`.
    fn record(block: u64, base_fee: u128, blob_base_fee: u128, tip: u128) -> BlockFeeRecord {
        BlockFeeRecord {
            block_number: block,
            base_fee,
            blob_base_fee,
            gas_used: 15_000_000,
            gas_limit: 30_000_000,
            rewards: [tip / 2, tip, tip * 2],
        }
    }

    fn record_with_usage(block: u64, base_fee: u128, gas_used: u64, gas_limit: u64, tip: u128) -> BlockFeeRecord {
        BlockFeeRecord {
            block_number: block,
            base_fee,
            blob_base_fee: 1,
            gas_used,
            gas_limit,
            rewards: [tip / 2, tip, tip * 2],
        }
    }

    #[test]
    fn empty_oracle_returns_zero() {
        let oracle = FeeOracle::new(10, 200);
        assert_eq!(oracle.suggest_gas_price(), 0);
        assert!(!oracle.blob_fee_spike());
        assert_eq!(oracle.estimate_next_base_fee(), 0);
    }

    #[test]
    fn window_evicts_oldest_beyond_capacity() {
        let oracle = FeeOracle::new(3, 200);
        for i in 0..5 {
            oracle.record_block(record(i, 100 + i as u128, 1, 10));
        }
        assert_eq!(oracle.len(), 3);
    }

    #[test]
    fn suggest_fee_cap_is_twice_base_fee_plus_tip() {
        let oracle = FeeOracle::new(10, 200);
        oracle.record_block(record(0, 1000, 1, 40));
        assert_eq!(oracle.suggest_fee_cap(), 1000 * 2 + oracle.suggest_tip_cap());
    }

    #[test]
    fn recommend_orders_slow_medium_fast() {
        let oracle = FeeOracle::new(10, 200);
        for i in 0..5 {
            oracle.record_block(record(i, 1000, 1, 10 + i as u128 * 5));
        }
        let rec = oracle.recommend();
        assert!(rec.slow <= rec.medium);
        assert!(rec.medium <= rec.fast);
    }

    #[test]
    fn blob_fee_spike_detected_above_threshold() {
        let oracle = FeeOracle::new(10, 150);
        for _ in 0..5 {
            oracle.record_block(record(0, 1000, 100, 10));
        }
        oracle.record_block(record(0, 1000, 500, 10));
        assert!(oracle.blob_fee_spike());
    }

    #[test]
    fn estimate_next_base_fee_holds_steady_at_exact_target() {
        let oracle = FeeOracle::new(10, 200);
        oracle.record_block(record_with_usage(0, 1000, 15_000_000, 30_000_000, 10));
        assert_eq!(oracle.estimate_next_base_fee(), 1000);
    }

    #[test]
    fn estimate_next_base_fee_rises_when_block_ran_hot() {
        // used = gas_limit (full block): diff = target, delta = base_fee / 8.
        let oracle = FeeOracle::new(10, 200);
        oracle.record_block(record_with_usage(0, 1000, 30_000_000, 30_000_000, 10));
        assert_eq!(oracle.estimate_next_base_fee(), 1125);
    }

    #[test]
    fn estimate_next_base_fee_falls_when_block_ran_cold() {
        // used = 0: diff = target, delta = base_fee / 8, base fee decreases.
        let oracle = FeeOracle::new(10, 200);
        oracle.record_block(record_with_usage(0, 1000, 0, 30_000_000, 10));
        assert_eq!(oracle.estimate_next_base_fee(), 875);
    }

    #[test]
    fn estimate_next_base_fee_falls_back_to_base_fee_when_gas_limit_is_zero() {
        let oracle = FeeOracle::new(10, 200);
        oracle.record_block(record_with_usage(0, 1000, 0, 0, 10));
        assert_eq!(oracle.estimate_next_base_fee(), 1000);
    }
}
