use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::hash::{UInt160, UInt256};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub script_hash: UInt160,
    pub is_frozen: bool,
    /// Public keys this account votes for.
    pub votes: Vec<Vec<u8>>,
    /// Fixed8 balance per asset.
    pub balances: BTreeMap<UInt256, i64>,
}

impl Account {
    /// The account every unknown script hash resolves to.
    pub fn empty(script_hash: UInt160) -> Self {
        Self { script_hash, ..Default::default() }
    }

    pub fn balance(&self, asset_id: &UInt256) -> i64 {
        self.balances.get(asset_id).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetType {
    CreditFlag = 0x40,
    DutyFlag = 0x80,
    GoverningToken = 0x00,
    UtilityToken = 0x01,
    Currency = 0x08,
    Share = 0x90,
    Invoice = 0x98,
    Token = 0x60,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub asset_id: UInt256,
    pub asset_type: AssetType,
    pub name: String,
    /// Fixed8 total amount, -1 for unlimited.
    pub amount: i64,
    pub available: i64,
    pub precision: u8,
    /// Encoded owner public key.
    pub owner: Vec<u8>,
    pub admin: UInt160,
    pub issuer: UInt160,
    pub expiration: u32,
    pub is_frozen: bool,
}

/// Contract property bit flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContractProperties(pub u8);

impl ContractProperties {
    pub const NO_PROPERTY: u8 = 0;
    pub const HAS_STORAGE: u8 = 1 << 0;
    pub const HAS_DYNAMIC_INVOKE: u8 = 1 << 1;
    pub const PAYABLE: u8 = 1 << 2;

    pub fn has_storage(&self) -> bool {
        self.0 & Self::HAS_STORAGE != 0
    }

    pub fn has_dynamic_invoke(&self) -> bool {
        self.0 & Self::HAS_DYNAMIC_INVOKE != 0
    }

    pub fn is_payable(&self) -> bool {
        self.0 & Self::PAYABLE != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub script_hash: UInt160,
    pub script: Vec<u8>,
    pub parameter_list: Vec<u8>,
    pub return_type: u8,
    pub properties: ContractProperties,
    pub name: String,
    pub code_version: String,
    pub author: String,
    pub email: String,
    pub description: String,
}

impl Contract {
    pub fn has_storage(&self) -> bool {
        self.properties.has_storage()
    }

    pub fn has_dynamic_invoke(&self) -> bool {
        self.properties.has_dynamic_invoke()
    }

    pub fn is_payable(&self) -> bool {
        self.properties.is_payable()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    /// Compressed public key.
    pub public_key: Vec<u8>,
    pub registered: bool,
    pub votes: i64,
}
