//! Per-sender account tracking (§4.4): state nonce, pending nonce, reserved
//! balance, and the known-nonce set used to derive `pending_nonce` by
//! walking forward from `state_nonce`.
//!
//! New module; the teacher has no equivalent (angstrom orders aren't
//! nonce-sequenced), so this is authored fresh, grounded structurally on
//! the `AccountRecord` shape implied by `validate/eth.rs`'s
//! `state.basic_account(sender)` lookup — generalized from a one-shot
//! lookup into a persistent per-sender ledger.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use alloy_primitives::U256;

use crate::identifier::SenderId;

/// One sender's nonce/balance bookkeeping (§3 "Account record").
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub state_nonce: u64,
    pub pending_nonce: u64,
    pub state_balance: U256,
    /// Cost reserved per pending nonce; invariant I5: the sum equals
    /// `reserved_balance`.
    pub pending_tx_costs: BTreeMap<u64, U256>,
    /// Every nonce (pending or queued) currently occupied by this sender,
    /// used to walk the contiguous prefix when recomputing `pending_nonce`.
    pub known_nonces: BTreeSet<u64>,
    pub dirty: bool,
}

impl AccountRecord {
    fn new(state_nonce: u64, state_balance: U256) -> Self {
        Self {
            state_nonce,
            pending_nonce: state_nonce,
            state_balance,
            pending_tx_costs: BTreeMap::new(),
            known_nonces: BTreeSet::new(),
            dirty: false,
        }
    }

    /// Sum of `pending_tx_costs`; invariant I5.
    pub fn reserved_balance(&self) -> U256 {
        self.pending_tx_costs.values().fold(U256::ZERO, |acc, c| acc.saturating_add(*c))
    }

    /// Walks forward from `state_nonce` through the contiguous known-nonce
    /// set and sets `pending_nonce` to one past the last contiguous nonce.
    fn recompute_pending_nonce(&mut self) {
        let mut next = self.state_nonce;
        while self.known_nonces.contains(&next) {
            next += 1;
        }
        self.pending_nonce = next;
    }

    pub fn is_empty(&self) -> bool {
        self.known_nonces.is_empty()
    }
}

/// Per-sender account ledger, lazily populated on first admission (§4.4:
/// "Lazy-loads state on first mention").
#[derive(Debug, Default)]
pub struct AccountTracker {
    accounts: HashMap<SenderId, AccountRecord>,
}

impl AccountTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sender: SenderId) -> Option<&AccountRecord> {
        self.accounts.get(&sender)
    }

    /// Returns the account, creating it (seeded from `state_nonce`/
    /// `state_balance`) if this is the first time `sender` has been seen.
    pub fn get_or_create(&mut self, sender: SenderId, state_nonce: u64, state_balance: U256) -> &mut AccountRecord {
        self.accounts
            .entry(sender)
            .or_insert_with(|| AccountRecord::new(state_nonce, state_balance))
    }

    /// Records a transaction's cost against `sender`'s reservation and
    /// recomputes `pending_nonce` by walking the known-nonce set forward
    /// from `state_nonce` (§4.4).
    pub fn add_pending_tx(&mut self, sender: SenderId, nonce: u64, cost: U256) {
        if let Some(acct) = self.accounts.get_mut(&sender) {
            acct.known_nonces.insert(nonce);
            acct.pending_tx_costs.insert(nonce, cost);
            acct.recompute_pending_nonce();
        }
    }

    /// Atomically swaps the reservation at `(sender, nonce)` for a
    /// replacement transaction (§4.4: "swaps reservations atomically").
    pub fn replace_pending_tx(&mut self, sender: SenderId, nonce: u64, new_cost: U256) {
        if let Some(acct) = self.accounts.get_mut(&sender) {
            acct.pending_tx_costs.insert(nonce, new_cost);
            // known_nonces and pending_nonce are unaffected by a same-slot swap.
        }
    }

    /// Drops a (sender, nonce) reservation entirely (tx mined, evicted, or
    /// removed) and recomputes `pending_nonce`.
    pub fn remove_tx(&mut self, sender: SenderId, nonce: u64) {
        let Some(acct) = self.accounts.get_mut(&sender) else { return };
        acct.known_nonces.remove(&nonce);
        acct.pending_tx_costs.remove(&nonce);
        acct.recompute_pending_nonce();
        if acct.is_empty() {
            self.accounts.remove(&sender);
        }
    }

    /// Applies a sealed block's new state for `sender`: advances
    /// `state_nonce`/`state_balance`, drops any reservation below the new
    /// state nonce, recomputes `pending_nonce`, and marks the account dirty.
    /// Returns `true` if the account still has outstanding entries.
    pub fn reset_account(&mut self, sender: SenderId, new_state_nonce: u64, new_state_balance: U256) -> bool {
        let Some(acct) = self.accounts.get_mut(&sender) else { return false };
        acct.state_nonce = new_state_nonce;
        acct.state_balance = new_state_balance;
        acct.dirty = true;
        acct.known_nonces.retain(|n| *n >= new_state_nonce);
        acct.pending_tx_costs.retain(|n, _| *n >= new_state_nonce);
        acct.recompute_pending_nonce();
        if acct.is_empty() {
            self.accounts.remove(&sender);
            false
        } else {
            true
        }
    }

    /// Every sender currently tracked, used by `reset_on_reorg` callers to
    /// iterate without holding a borrow on `self`.
    pub fn senders(&self) -> Vec<SenderId> {
        self.accounts.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(n: u64) -> SenderId {
        SenderId(n)
    }

    #[test]
    fn pending_nonce_walks_contiguous_prefix() {
        let mut tracker = AccountTracker::new();
        tracker.get_or_create(sid(0), 0, U256::from(1_000_000u64));
        tracker.add_pending_tx(sid(0), 0, U256::from(10u64));
        tracker.add_pending_tx(sid(0), 2, U256::from(10u64));
        assert_eq!(tracker.get(sid(0)).unwrap().pending_nonce, 1);
        tracker.add_pending_tx(sid(0), 1, U256::from(10u64));
        assert_eq!(tracker.get(sid(0)).unwrap().pending_nonce, 3);
    }

    #[test]
    fn reset_drops_mined_nonces_but_keeps_surviving_entries() {
        let mut tracker = AccountTracker::new();
        tracker.get_or_create(sid(0), 0, U256::from(1_000_000u64));
        tracker.add_pending_tx(sid(0), 0, U256::from(10u64));
        tracker.add_pending_tx(sid(0), 1, U256::from(10u64));
        tracker.add_pending_tx(sid(0), 2, U256::from(10u64));

        // nonce 0 mined, 1 and 2 still outstanding: the account survives.
        assert!(tracker.reset_account(sid(0), 1, U256::from(1_000_000u64)));
        let acct = tracker.get(sid(0)).unwrap();
        assert_eq!(acct.pending_tx_costs.len(), 2);
        assert_eq!(acct.pending_nonce, 3);
    }

    #[test]
    fn reset_past_every_outstanding_nonce_removes_the_account() {
        let mut tracker = AccountTracker::new();
        tracker.get_or_create(sid(0), 0, U256::from(1_000_000u64));
        tracker.add_pending_tx(sid(0), 0, U256::from(10u64));
        tracker.add_pending_tx(sid(0), 1, U256::from(10u64));

        // nonce 2 mined past both outstanding entries: the account empties
        // and is dropped entirely.
        assert!(!tracker.reset_account(sid(0), 2, U256::from(1_000_000u64)));
        assert!(tracker.is_empty());
        assert!(tracker.get(sid(0)).is_none());
    }

    #[test]
    fn reserved_balance_matches_sum_of_costs() {
        let mut tracker = AccountTracker::new();
        tracker.get_or_create(sid(0), 0, U256::from(1_000_000u64));
        tracker.add_pending_tx(sid(0), 0, U256::from(100u64));
        tracker.add_pending_tx(sid(0), 1, U256::from(200u64));
        assert_eq!(tracker.get(sid(0)).unwrap().reserved_balance(), U256::from(300u64));
    }
}
