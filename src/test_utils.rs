//! Test doubles shared by the unit tests sprinkled through `pool/` and
//! `validate/`, and available to downstream crates under the `test-utils`
//! feature (mirrors the teacher's `test_utils.rs` convention of gating test
//! scaffolding behind a feature rather than duplicating it per-crate).

use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, TxHash, U256};
use parking_lot::RwLock;

use crate::error::PoolResult;
use crate::traits::StateReader;
use crate::tx::{PoolTransaction, To, TxKind};

/// An in-memory [`StateReader`] with per-address overrides and a generous
/// default balance so tests don't have to fund every sender explicitly.
pub struct MockStateReader {
    nonces: RwLock<HashMap<Address, u64>>,
    balances: RwLock<HashMap<Address, U256>>,
    bytecode: RwLock<HashSet<Address>>,
    default_balance: U256,
}

impl MockStateReader {
    pub fn new() -> Self {
        Self {
            nonces: RwLock::new(HashMap::new()),
            balances: RwLock::new(HashMap::new()),
            bytecode: RwLock::new(HashSet::new()),
            default_balance: U256::from(u128::MAX),
        }
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.nonces.write().insert(address, nonce);
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.balances.write().insert(address, balance);
    }

    pub fn set_has_bytecode(&self, address: Address, has_bytecode: bool) {
        if has_bytecode {
            self.bytecode.write().insert(address);
        } else {
            self.bytecode.write().remove(&address);
        }
    }
}

impl Default for MockStateReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StateReader for MockStateReader {
    async fn get_nonce(&self, address: Address) -> PoolResult<u64> {
        Ok(self.nonces.read().get(&address).copied().unwrap_or(0))
    }

    async fn get_balance(&self, address: Address) -> PoolResult<U256> {
        Ok(self.balances.read().get(&address).copied().unwrap_or(self.default_balance))
    }

    async fn has_bytecode(&self, address: Address) -> PoolResult<bool> {
        Ok(self.bytecode.read().contains(&address))
    }
}

/// Builds syntactically/cryptographically-valid-looking [`PoolTransaction`]s
/// for tests, assigning each a distinct hash from an internal counter
/// (deterministic, unlike a real signer) rather than actually signing
/// anything.
pub struct MockTransactionFactory {
    chain_id: Option<u64>,
    next_id: u64,
}

impl MockTransactionFactory {
    pub fn new() -> Self {
        Self { chain_id: Some(1), next_id: 0 }
    }

    pub fn with_chain_id(chain_id: Option<u64>) -> Self {
        Self { chain_id, next_id: 0 }
    }

    fn next_hash(&mut self) -> TxHash {
        let id = self.next_id;
        self.next_id += 1;
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&id.to_be_bytes());
        TxHash::from(bytes)
    }

    fn base(&mut self, sender: Address, nonce: u64) -> PoolTransaction {
        PoolTransaction {
            kind: TxKind::Legacy,
            hash: self.next_hash(),
            sender,
            nonce,
            gas_limit: 21_000,
            to: To::Call(Address::ZERO),
            value: U256::ZERO,
            data: Default::default(),
            access_list: Vec::new(),
            authorization_list: Vec::new(),
            chain_id: self.chain_id,
            gas_price: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            max_fee_per_blob_gas: None,
            blob_versioned_hashes: Vec::new(),
            r: U256::from(1),
            s: U256::from(1),
            encoded_length: 110,
        }
    }

    pub fn legacy(&mut self, sender: Address, nonce: u64, gas_price: u128) -> PoolTransaction {
        let mut tx = self.base(sender, nonce);
        tx.kind = TxKind::Legacy;
        tx.gas_price = Some(gas_price);
        tx
    }

    pub fn access_list(&mut self, sender: Address, nonce: u64, gas_price: u128) -> PoolTransaction {
        let mut tx = self.base(sender, nonce);
        tx.kind = TxKind::AccessList;
        tx.gas_price = Some(gas_price);
        tx
    }

    pub fn dynamic_fee(&mut self, sender: Address, nonce: u64, fee_cap: u128, tip_cap: u128) -> PoolTransaction {
        let mut tx = self.base(sender, nonce);
        tx.kind = TxKind::DynamicFee;
        tx.max_fee_per_gas = Some(fee_cap);
        tx.max_priority_fee_per_gas = Some(tip_cap);
        tx
    }

    pub fn set_code(&mut self, sender: Address, nonce: u64, fee_cap: u128, tip_cap: u128) -> PoolTransaction {
        let mut tx = self.base(sender, nonce);
        tx.kind = TxKind::SetCode;
        tx.max_fee_per_gas = Some(fee_cap);
        tx.max_priority_fee_per_gas = Some(tip_cap);
        tx.authorization_list.push(crate::tx::Authorization {
            chain_id: self.chain_id.unwrap_or(1),
            address: Address::ZERO,
            nonce: 0,
            r: U256::from(1),
            s: U256::from(1),
        });
        tx
    }

    pub fn blob(&mut self, sender: Address, nonce: u64, fee_cap: u128, tip_cap: u128, blob_fee_cap: u128) -> PoolTransaction {
        let mut tx = self.base(sender, nonce);
        tx.kind = TxKind::Blob;
        tx.max_fee_per_gas = Some(fee_cap);
        tx.max_priority_fee_per_gas = Some(tip_cap);
        tx.max_fee_per_blob_gas = Some(blob_fee_cap);
        let mut versioned_hash = [0u8; 32];
        versioned_hash[0] = 0x01;
        tx.blob_versioned_hashes = vec![versioned_hash];
        tx.encoded_length = 110;
        tx
    }
}

impl Default for MockTransactionFactory {
    fn default() -> Self {
        Self::new()
    }
}
