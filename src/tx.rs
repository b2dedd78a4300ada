//! The pool's transaction model.
//!
//! Per Design Note: transactions are a tagged sum over the five Ethereum
//! transaction types rather than a trait-object hierarchy; callers match on
//! [`TxKind`] and the pool computes `effective_price`/`effective_tip`/`cost`
//! via small explicit helpers instead of virtual dispatch.

use alloy_primitives::{Address, Bytes, TxHash, U256};

/// The five transaction type tags the pool understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxKind {
    Legacy,
    AccessList,
    DynamicFee,
    Blob,
    SetCode,
}

impl TxKind {
    pub fn is_blob(self) -> bool {
        matches!(self, TxKind::Blob)
    }

    /// The wire type byte, as used in error messages and metrics labels.
    pub fn type_byte(self) -> u8 {
        match self {
            TxKind::Legacy => 0x00,
            TxKind::AccessList => 0x01,
            TxKind::DynamicFee => 0x02,
            TxKind::Blob => 0x03,
            TxKind::SetCode => 0x04,
        }
    }
}

/// A single `(address, storage_keys)` entry of an EIP-2930 access list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessListItem {
    pub address: Address,
    pub storage_keys: Vec<[u8; 32]>,
}

/// An EIP-7702 authorization tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub chain_id: u64,
    pub address: Address,
    pub nonce: u64,
    pub r: U256,
    pub s: U256,
}

/// The call target: either a recipient address or contract creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum To {
    Call(Address),
    Create,
}

impl To {
    pub fn is_create(self) -> bool {
        matches!(self, To::Create)
    }

    pub fn address(self) -> Option<Address> {
        match self {
            To::Call(addr) => Some(addr),
            To::Create => None,
        }
    }
}

/// A signed transaction, opaque to callers beyond the fields the pool needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolTransaction {
    pub kind: TxKind,
    pub hash: TxHash,
    pub sender: Address,
    pub nonce: u64,
    pub gas_limit: u64,
    pub to: To,
    pub value: U256,
    pub data: Bytes,
    pub access_list: Vec<AccessListItem>,
    pub authorization_list: Vec<Authorization>,
    pub chain_id: Option<u64>,

    /// `gas_price` for [`TxKind::Legacy`]/[`TxKind::AccessList`]; unused
    /// otherwise.
    pub gas_price: Option<u128>,
    /// `max_fee_per_gas` for dynamic-fee/blob/set-code transactions.
    pub max_fee_per_gas: Option<u128>,
    /// `max_priority_fee_per_gas` for dynamic-fee/blob/set-code transactions.
    pub max_priority_fee_per_gas: Option<u128>,
    /// `max_fee_per_blob_gas`, blob transactions only.
    pub max_fee_per_blob_gas: Option<u128>,
    /// Versioned hashes, blob transactions only.
    pub blob_versioned_hashes: Vec<[u8; 32]>,

    pub r: U256,
    pub s: U256,

    /// Cached RLP-encoded length, computed by the submitter (out of scope:
    /// RLP codec itself).
    pub encoded_length: usize,
}

impl PoolTransaction {
    /// The fee cap: `gas_price` for legacy/access-list, `max_fee_per_gas`
    /// otherwise.
    pub fn fee_cap(&self) -> u128 {
        self.max_fee_per_gas.or(self.gas_price).unwrap_or_default()
    }

    /// The tip cap, `None` for types without a separate priority fee.
    pub fn tip_cap(&self) -> Option<u128> {
        self.max_priority_fee_per_gas
    }

    /// `min(fee_cap, base_fee + tip_cap)` for dynamic-fee/blob/set-code
    /// transactions; `gas_price` for legacy/access-list. See GLOSSARY.
    pub fn effective_price(&self, base_fee: u128) -> u128 {
        match self.tip_cap() {
            Some(tip) => self.fee_cap().min(base_fee.saturating_add(tip)),
            None => self.gas_price.unwrap_or_default(),
        }
    }

    /// `effective_price(base_fee) - base_fee`, i.e. the miner's take per
    /// unit gas; `None` if the fee cap cannot cover the base fee.
    pub fn effective_tip(&self, base_fee: u128) -> Option<u128> {
        let price = self.effective_price(base_fee);
        price.checked_sub(base_fee)
    }

    /// Total blob gas consumed (0 for non-blob transactions).
    pub fn blob_gas_used(&self) -> u64 {
        if self.kind.is_blob() {
            self.blob_versioned_hashes.len() as u64 * crate::constants::BLOB_GAS_PER_BLOB
        } else {
            0
        }
    }

    /// Upper bound on the total value this transaction may consume from the
    /// sender's balance: `gas_limit * fee_cap + value (+ blob_gas *
    /// blob_fee_cap)`.
    pub fn cost(&self) -> U256 {
        let mut cost = U256::from(self.gas_limit).saturating_mul(U256::from(self.fee_cap()));
        cost = cost.saturating_add(self.value);
        if let Some(blob_fee_cap) = self.max_fee_per_blob_gas {
            cost = cost
                .saturating_add(U256::from(self.blob_gas_used()).saturating_mul(U256::from(blob_fee_cap)));
        }
        cost
    }

    /// Intrinsic gas: base transfer/creation cost plus per-byte calldata and
    /// access-list surcharges (§6 constants).
    pub fn intrinsic_gas(&self) -> u64 {
        use crate::constants::*;
        let mut gas = if self.to.is_create() { INTRINSIC_GAS_CREATION } else { INTRINSIC_GAS_TRANSFER };
        for byte in self.data.iter() {
            gas += if *byte == 0 { CALLDATA_GAS_PER_ZERO_BYTE } else { CALLDATA_GAS_PER_NONZERO_BYTE };
        }
        for item in &self.access_list {
            gas += ACCESS_LIST_ADDRESS_COST + item.storage_keys.len() as u64 * ACCESS_LIST_STORAGE_COST;
        }
        gas
    }

    pub fn size(&self) -> usize {
        self.encoded_length
    }
}
