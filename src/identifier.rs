//! Dense integer handles standing in for the shared-pointer graph the
//! original design used between the hash index, the priced heap, and the
//! per-account structures.
//!
//! Per the crate's re-architecture note: an arena (here, [`SenderIdentifiers`])
//! owns the canonical `Address -> SenderId` mapping, and every other
//! structure addresses a sender by its dense `SenderId` rather than by
//! `Address` directly. This keeps per-sender maps cheap to key and avoids
//! cloning `Address` into every index.

use std::collections::HashMap;

use alloy_primitives::Address;

/// Dense identifier for a sender, allocated on first observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SenderId(pub(crate) u64);

impl SenderId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Identifies a transaction slot by `(sender, nonce)`. At most one
/// transaction occupies a given `TransactionId` across pending ∪ queued
/// (invariant I4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId {
    pub sender: SenderId,
    pub nonce: u64,
}

impl TransactionId {
    pub fn new(sender: SenderId, nonce: u64) -> Self {
        Self { sender, nonce }
    }

    /// The `TransactionId` of the transaction that must precede this one in
    /// nonce order (used by the best-transactions iterator to "unlock" the
    /// next nonce once its ancestor is yielded).
    pub fn unchecked_ancestor(&self) -> Option<Self> {
        (self.nonce > 0).then(|| Self { sender: self.sender, nonce: self.nonce - 1 })
    }
}

impl PartialOrd for TransactionId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TransactionId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.sender, self.nonce).cmp(&(other.sender, other.nonce))
    }
}

/// Bidirectional arena mapping sender addresses to dense [`SenderId`]s.
///
/// An account record (§3) is created here on first admission for that
/// sender; the reverse mapping lets the pool report `Address`es back to
/// callers without threading the original address through every internal
/// structure.
#[derive(Debug, Default)]
pub struct SenderIdentifiers {
    address_to_id: HashMap<Address, SenderId>,
    id_to_address: Vec<Address>,
}

impl SenderIdentifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing id for `addr`, allocating a new one if this is
    /// the first time `addr` has been observed.
    pub fn sender_id_or_create(&mut self, addr: Address) -> SenderId {
        if let Some(id) = self.address_to_id.get(&addr) {
            return *id;
        }
        let id = SenderId(self.id_to_address.len() as u64);
        self.id_to_address.push(addr);
        self.address_to_id.insert(addr, id);
        id
    }

    pub fn sender_id(&self, addr: &Address) -> Option<SenderId> {
        self.address_to_id.get(addr).copied()
    }

    pub fn address(&self, id: SenderId) -> Address {
        self.id_to_address[id.0 as usize]
    }
}
