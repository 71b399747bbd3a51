use alloc::vec::Vec;
use core::convert::TryInto;

use crate::hash::{UInt160, UInt256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Miner = 0x00,
    Issue = 0x01,
    Claim = 0x02,
    Enrollment = 0x20,
    Register = 0x40,
    Contract = 0x80,
    State = 0x90,
    Publish = 0xd0,
    /// Carries a script that is executed by the VM when the transaction is persisted.
    Invocation = 0xd1,
}

impl TransactionType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(TransactionType::Miner),
            0x01 => Some(TransactionType::Issue),
            0x02 => Some(TransactionType::Claim),
            0x20 => Some(TransactionType::Enrollment),
            0x40 => Some(TransactionType::Register),
            0x80 => Some(TransactionType::Contract),
            0x90 => Some(TransactionType::State),
            0xd0 => Some(TransactionType::Publish),
            0xd1 => Some(TransactionType::Invocation),
            _ => None,
        }
    }
}

/// Attribute usage byte. Only the values the VM inspects get names.
pub mod attribute_usage {
    pub const CONTRACT_HASH: u8 = 0x00;
    pub const ECDH02: u8 = 0x02;
    pub const ECDH03: u8 = 0x03;
    /// Data is a 20-byte script hash that must witness the transaction.
    pub const SCRIPT: u8 = 0x20;
    pub const VOTE: u8 = 0x30;
    pub const DESCRIPTION_URL: u8 = 0x81;
    pub const DESCRIPTION: u8 = 0x90;
    pub const REMARK: u8 = 0xf0;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub usage: u8,
    pub data: Vec<u8>,
}

/// Reference to an output of a previous transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Input {
    pub prev_hash: UInt256,
    pub prev_index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub asset_id: UInt256,
    /// Fixed8 amount.
    pub value: i64,
    pub script_hash: UInt160,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub hash: UInt256,
    pub tx_type: TransactionType,
    pub version: u8,
    pub attributes: Vec<Attribute>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    /// Invocation script; empty for non-invocation transactions.
    pub script: Vec<u8>,
    /// System fee paid for execution, Fixed8.
    pub gas: i64,
}

impl Transaction {
    /// Script hashes named by `Script` attributes.
    pub fn attribute_script_hashes(&self) -> impl Iterator<Item = UInt160> + '_ {
        self.attributes
            .iter()
            .filter(|attr| attr.usage == attribute_usage::SCRIPT)
            .filter_map(|attr| UInt160::from_slice(&attr.data))
    }

    /// Deterministic encoding of the unsigned transaction. This is the message
    /// that signatures checked by `CHECKSIG` commit to.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(self.tx_type as u8);
        out.push(self.version);

        out.extend_from_slice(&(self.attributes.len() as u32).to_le_bytes());
        for attr in &self.attributes {
            out.push(attr.usage);
            out.extend_from_slice(&(attr.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&attr.data);
        }

        out.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            out.extend_from_slice(&input.prev_hash.0);
            out.extend_from_slice(&input.prev_index.to_le_bytes());
        }

        out.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            out.extend_from_slice(&output.asset_id.0);
            out.extend_from_slice(&output.value.to_le_bytes());
            out.extend_from_slice(&output.script_hash.0);
        }

        out.extend_from_slice(&(self.script.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.script);
        out.extend_from_slice(&self.gas.to_le_bytes());
        out
    }

    /// Decode a buffer produced by `encode`. The hash is not part of the
    /// encoding and must be supplied by the caller.
    pub fn decode(hash: UInt256, encoded: &[u8]) -> Option<Self> {
        let mut cursor = 0usize;

        let mut read = |len: usize| -> Option<&[u8]> {
            if cursor + len > encoded.len() {
                return None;
            }
            let slice = &encoded[cursor..cursor + len];
            cursor += len;
            Some(slice)
        };

        let tx_type = TransactionType::from_u8(*read(1)?.first()?)?;
        let version = *read(1)?.first()?;

        let attr_count = u32::from_le_bytes(read(4)?.try_into().ok()?) as usize;
        let mut attributes = Vec::new();
        for _ in 0..attr_count {
            let usage = *read(1)?.first()?;
            let len = u32::from_le_bytes(read(4)?.try_into().ok()?) as usize;
            let data = read(len)?.to_vec();
            attributes.push(Attribute { usage, data });
        }

        let input_count = u32::from_le_bytes(read(4)?.try_into().ok()?) as usize;
        let mut inputs = Vec::new();
        for _ in 0..input_count {
            let prev_hash = UInt256::from_slice(read(32)?)?;
            let prev_index = u16::from_le_bytes(read(2)?.try_into().ok()?);
            inputs.push(Input { prev_hash, prev_index });
        }

        let output_count = u32::from_le_bytes(read(4)?.try_into().ok()?) as usize;
        let mut outputs = Vec::new();
        for _ in 0..output_count {
            let asset_id = UInt256::from_slice(read(32)?)?;
            let value = i64::from_le_bytes(read(8)?.try_into().ok()?);
            let script_hash = UInt160::from_slice(read(20)?)?;
            outputs.push(Output { asset_id, value, script_hash });
        }

        let script_len = u32::from_le_bytes(read(4)?.try_into().ok()?) as usize;
        let script = read(script_len)?.to_vec();
        let gas = i64::from_le_bytes(read(8)?.try_into().ok()?);

        Some(Transaction {
            hash,
            tx_type,
            version,
            attributes,
            inputs,
            outputs,
            script,
            gas,
        })
    }
}
