//! Replace-by-fee policy engine (§4.5): fee-bump acceptance rules, spam
//! caps per `(sender, nonce)` and per sender, and acceptance statistics.
//!
//! New module — the teacher has no RBF logic (angstrom orders do not
//! bump-replace), so this is authored fresh in the teacher's
//! `thiserror`-enum-and-plain-struct idiom, grounded structurally on
//! `LimitPoolError`'s enum-of-rejection-reasons style (`limit/mod.rs`).

use std::collections::HashMap;

use alloy_primitives::{Address, TxHash};

use crate::config::PriceBumpConfig;
use crate::error::PolicyError;
use crate::identifier::{SenderId, TransactionId};
use crate::tx::{PoolTransaction, TxKind};

/// Per-`(sender, nonce)` replacement bookkeeping.
#[derive(Debug, Clone, Default)]
struct ReplacementSlot {
    count: u32,
}

/// Running totals exposed for metrics/introspection (§4.5 "Statistics").
#[derive(Debug, Clone, Copy, Default)]
pub struct RbfStats {
    pub attempts: u64,
    pub accepted: u64,
    pub rejected_underpriced: u64,
    pub rejected_replacement_limit: u64,
    pub rejected_chain_depth: u64,
    pub rejected_blob_downgrade: u64,
    pub rejected_duplicate: u64,
}

/// Tracks replacement chains and enforces the fee-bump and spam-cap rules.
#[derive(Debug, Default)]
pub struct RbfEngine {
    slots: HashMap<TransactionId, ReplacementSlot>,
    chain_depth: HashMap<SenderId, usize>,
    price_bump: PriceBumpConfig,
    max_replacements: u32,
    max_chain_depth: usize,
    stats: RbfStats,
}

/// Outcome of an accepted replacement check: whether the incoming
/// transaction counts against the sender's chain-depth budget (a same-slot
/// replacement does not increase depth; only net-new nonces do).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    /// No transaction currently occupies this `(sender, nonce)`.
    Fresh,
    /// A transaction occupies this slot and the replacement was accepted.
    Replaced,
}

impl RbfEngine {
    pub fn new(price_bump: PriceBumpConfig, max_replacements: u32, max_chain_depth: usize) -> Self {
        Self {
            slots: HashMap::new(),
            chain_depth: HashMap::new(),
            price_bump,
            max_replacements,
            max_chain_depth,
            stats: RbfStats::default(),
        }
    }

    pub fn stats(&self) -> RbfStats {
        self.stats
    }

    pub fn chain_depth(&self, sender: SenderId) -> usize {
        self.chain_depth.get(&sender).copied().unwrap_or(0)
    }

    /// Called when a brand-new `(sender, nonce)` slot is occupied (no
    /// existing resident); accounts it against the sender's chain depth.
    pub fn note_fresh_slot(&mut self, sender: SenderId) -> Result<(), PolicyError> {
        let depth = self.chain_depth.entry(sender).or_insert(0);
        if *depth >= self.max_chain_depth {
            self.stats.rejected_chain_depth += 1;
            return Err(PolicyError::ChainDepthExceeded(Address::ZERO));
        }
        *depth += 1;
        Ok(())
    }

    /// Evaluates whether `incoming` may replace `existing` at the same
    /// `(sender, nonce)` slot (§4.5 rules). Does not mutate state on
    /// rejection; call [`Self::record_accepted`] once the caller has
    /// committed the swap.
    pub fn check_replacement(
        &mut self,
        id: TransactionId,
        sender: Address,
        existing: &PoolTransaction,
        incoming: &PoolTransaction,
    ) -> Result<(), PolicyError> {
        self.stats.attempts += 1;

        if existing.hash == incoming.hash {
            self.stats.rejected_duplicate += 1;
            return Err(PolicyError::ReplacementUnderpriced(id));
        }

        let slot = self.slots.entry(id).or_default();
        if slot.count >= self.max_replacements {
            self.stats.rejected_replacement_limit += 1;
            return Err(PolicyError::ReplacementLimitExceeded(id));
        }

        if existing.kind.is_blob() && !incoming.kind.is_blob() {
            self.stats.rejected_blob_downgrade += 1;
            return Err(PolicyError::BlobToNonBlobDowngrade);
        }

        if !self.satisfies_fee_bump(existing, incoming) {
            self.stats.rejected_underpriced += 1;
            return Err(PolicyError::ReplacementUnderpriced(id));
        }

        let _ = sender;
        Ok(())
    }

    /// Commits an accepted replacement: increments the slot's replacement
    /// counter and the acceptance statistic. Chain depth is unaffected
    /// (same nonce, no net-new slot).
    pub fn record_accepted(&mut self, id: TransactionId) {
        self.slots.entry(id).or_default().count += 1;
        self.stats.accepted += 1;
    }

    /// Clears the replacement counter for a confirmed or otherwise
    /// finalized `(sender, nonce)` slot.
    pub fn clear_slot(&mut self, id: TransactionId) {
        self.slots.remove(&id);
    }

    /// Wipes every tracked slot and chain-depth counter for `sender`
    /// (sender's chain reset by a reorg or full removal).
    pub fn wipe_sender(&mut self, sender: SenderId) {
        self.slots.retain(|id, _| id.sender != sender);
        self.chain_depth.remove(&sender);
    }

    /// Releases one unit of chain depth when a slot is vacated without
    /// replacement (removal, eviction, mined).
    pub fn release_chain_slot(&mut self, sender: SenderId) {
        if let Some(depth) = self.chain_depth.get_mut(&sender) {
            *depth = depth.saturating_sub(1);
            if *depth == 0 {
                self.chain_depth.remove(&sender);
            }
        }
    }

    fn satisfies_fee_bump(&self, existing: &PoolTransaction, incoming: &PoolTransaction) -> bool {
        let bumped = |old: u128, bump_pct: u32| -> u128 {
            old.saturating_mul(100 + bump_pct as u128) / 100
        };

        if existing.kind.is_blob() && incoming.kind.is_blob() {
            let fee_ok = incoming.fee_cap() >= bumped(existing.fee_cap(), self.price_bump.fee_bump);
            let tip_ok = incoming.tip_cap().unwrap_or_default()
                >= bumped(existing.tip_cap().unwrap_or_default(), self.price_bump.tip_bump);
            let blob_ok = incoming.max_fee_per_blob_gas.unwrap_or_default()
                >= bumped(existing.max_fee_per_blob_gas.unwrap_or_default(), self.price_bump.blob_fee_bump);
            return fee_ok && tip_ok && blob_ok;
        }

        // Legacy vs legacy, dynamic-fee vs dynamic-fee, or non-blob -> blob
        // upgrade: fee_cap must always clear the bump; tip_cap is only
        // checked when both sides actually carry one.
        let fee_ok = incoming.fee_cap() >= bumped(existing.fee_cap(), self.price_bump.fee_bump);
        let tip_ok = match (existing.tip_cap(), incoming.tip_cap()) {
            (Some(old_tip), Some(new_tip)) => new_tip >= bumped(old_tip, self.price_bump.tip_bump),
            _ => true,
        };
        fee_ok && tip_ok
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Bytes, U256};

    use super::*;
    use crate::tx::To;

    fn legacy(hash: u8, gas_price: u128) -> PoolTransaction {
        PoolTransaction {
            kind: TxKind::Legacy,
            hash: TxHash::from_slice(&[hash; 32]),
            sender: Address::ZERO,
            nonce: 0,
            gas_limit: 21_000,
            to: To::Call(Address::ZERO),
            value: U256::ZERO,
            data: Bytes::new(),
            access_list: vec![],
            authorization_list: vec![],
            chain_id: None,
            gas_price: Some(gas_price),
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            max_fee_per_blob_gas: None,
            blob_versioned_hashes: vec![],
            r: U256::from(1u8),
            s: U256::from(1u8),
            encoded_length: 110,
        }
    }

    fn id() -> TransactionId {
        TransactionId::new(SenderId(0), 0)
    }

    #[test]
    fn rejects_bump_below_ten_percent() {
        let mut engine = RbfEngine::new(PriceBumpConfig::default(), 25, 100);
        let old = legacy(1, 1000);
        let nine_pct = legacy(2, 1090);
        assert!(matches!(
            engine.check_replacement(id(), Address::ZERO, &old, &nine_pct),
            Err(PolicyError::ReplacementUnderpriced(_))
        ));
    }

    #[test]
    fn accepts_bump_at_exactly_ten_percent() {
        let mut engine = RbfEngine::new(PriceBumpConfig::default(), 25, 100);
        let old = legacy(1, 1000);
        let ten_pct = legacy(2, 1100);
        assert!(engine.check_replacement(id(), Address::ZERO, &old, &ten_pct).is_ok());
    }

    #[test]
    fn duplicate_hash_rejected() {
        let mut engine = RbfEngine::new(PriceBumpConfig::default(), 25, 100);
        let old = legacy(1, 1000);
        let same = legacy(1, 1000);
        assert!(matches!(
            engine.check_replacement(id(), Address::ZERO, &old, &same),
            Err(PolicyError::ReplacementUnderpriced(_))
        ));
    }

    #[test]
    fn replacement_limit_enforced() {
        let mut engine = RbfEngine::new(PriceBumpConfig::default(), 2, 100);
        let mut price = 1000u128;
        for _ in 0..2 {
            let old = legacy(1, price);
            price = price * 110 / 100;
            let next = legacy(2, price);
            assert!(engine.check_replacement(id(), Address::ZERO, &old, &next).is_ok());
            engine.record_accepted(id());
        }
        let old = legacy(1, price);
        let next = legacy(2, price * 2);
        assert!(matches!(
            engine.check_replacement(id(), Address::ZERO, &old, &next),
            Err(PolicyError::ReplacementLimitExceeded(_))
        ));
    }

    #[test]
    fn blob_to_non_blob_downgrade_rejected() {
        let mut engine = RbfEngine::new(PriceBumpConfig::default(), 25, 100);
        let mut blob = legacy(1, 1000);
        blob.kind = TxKind::Blob;
        blob.max_fee_per_gas = Some(1000);
        blob.max_priority_fee_per_gas = Some(100);
        blob.max_fee_per_blob_gas = Some(50);
        blob.gas_price = None;
        let non_blob = legacy(2, 10_000);
        assert!(matches!(
            engine.check_replacement(id(), Address::ZERO, &blob, &non_blob),
            Err(PolicyError::BlobToNonBlobDowngrade)
        ));
    }

    #[test]
    fn chain_depth_exhausted() {
        let mut engine = RbfEngine::new(PriceBumpConfig::default(), 25, 2);
        let sender = SenderId(0);
        assert!(engine.note_fresh_slot(sender).is_ok());
        assert!(engine.note_fresh_slot(sender).is_ok());
        assert!(matches!(engine.note_fresh_slot(sender), Err(PolicyError::ChainDepthExceeded(_))));
    }
}
