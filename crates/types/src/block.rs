use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::hash::{UInt160, UInt256};
use crate::transaction::Transaction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub hash: UInt256,
    pub version: u32,
    pub prev_hash: UInt256,
    pub merkle_root: UInt256,
    /// Seconds since the unix epoch.
    pub timestamp: u32,
    pub index: u32,
    pub consensus_data: u64,
    pub next_consensus: UInt160,
}

/// A header plus its transactions. Transactions are shared with the ledger's
/// transaction index so handing them to the VM never copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Arc<Transaction>>,
}

impl Block {
    pub fn hash(&self) -> UInt256 {
        self.header.hash
    }

    pub fn index(&self) -> u32 {
        self.header.index
    }
}
