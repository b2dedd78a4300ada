//! Transaction state bits and the pending/queued classification derived
//! from them.
//!
//! Structurally grounded on the unpruned `reth-transaction-pool`
//! `pool/state.rs` fragment's `TxState` bitflags and `SubPool` derivation.
//! That source derives three sub-pools (`Queued`, `BaseFee`, `Pending`);
//! this crate's public API exposes only the two the specification calls
//! for (`Pending`, `Queued` — see SPEC_FULL.md §11), so `BASE_FEE_POOL_BITS`
//! collapses into `Pending` once its one missing bit (`ENOUGH_FEE_CAP_BLOCK`)
//! is also satisfied. Internally the bit is still tracked because it is
//! cheap and documents exactly why a transaction is parked.

use bitflags::bitflags;

bitflags! {
    /// Bits describing why a transaction either is or isn't promotable to
    /// the pending sub-pool. A transaction is pending iff every bit is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
    pub struct TxState: u8 {
        /// No ancestor (sender, nonce - 1) is still parked in queued.
        const NO_PARKED_ANCESTORS = 0b10000;
        /// The transaction is contiguous with the account's pending_nonce;
        /// i.e. there is no nonce gap ahead of it.
        const NO_NONCE_GAPS = 0b01000;
        /// The reserved balance (this tx's cost plus everything ahead of it)
        /// does not exceed the account's balance.
        const ENOUGH_BALANCE = 0b00100;
        /// `gas_limit` does not exceed the configured block gas limit.
        const NOT_TOO_MUCH_GAS = 0b00010;
        /// `fee_cap` is at least the currently tracked base fee.
        const ENOUGH_FEE_CAP_BLOCK = 0b00001;

        /// All bits required for pending membership.
        const PENDING_BITS = Self::NO_PARKED_ANCESTORS.bits()
            | Self::NO_NONCE_GAPS.bits()
            | Self::ENOUGH_BALANCE.bits()
            | Self::NOT_TOO_MUCH_GAS.bits()
            | Self::ENOUGH_FEE_CAP_BLOCK.bits();
    }
}

impl TxState {
    /// A transaction is pending iff it carries every bit in `PENDING_BITS`.
    pub fn is_pending(&self) -> bool {
        self.bits() >= Self::PENDING_BITS.bits()
    }

    pub fn has_nonce_gap(&self) -> bool {
        !self.intersects(Self::NO_NONCE_GAPS)
    }
}

/// A transaction's externally visible placement: executable now, or parked
/// behind a nonce gap / insufficient balance / fee cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SubPool {
    Queued = 0,
    Pending = 1,
}

impl SubPool {
    pub fn is_pending(&self) -> bool {
        matches!(self, SubPool::Pending)
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, SubPool::Queued)
    }
}

impl From<TxState> for SubPool {
    fn from(state: TxState) -> Self {
        if state.is_pending() {
            SubPool::Pending
        } else {
            SubPool::Queued
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_pending() {
        assert!(TxState::PENDING_BITS.is_pending());
        let all_but_one = TxState::PENDING_BITS - TxState::ENOUGH_FEE_CAP_BLOCK;
        assert!(!all_but_one.is_pending());
    }

    #[test]
    fn test_tx_queued() {
        let state = TxState::NO_PARKED_ANCESTORS | TxState::ENOUGH_BALANCE;
        assert!(state.has_nonce_gap());
        assert_eq!(SubPool::from(state), SubPool::Queued);
    }

    #[test]
    fn test_subpool_from_full_state() {
        assert_eq!(SubPool::from(TxState::PENDING_BITS), SubPool::Pending);
    }
}
