#![no_std]

extern crate alloc;

pub mod hash;
pub use hash::{UInt160, UInt256, UINT160_LEN, UINT256_LEN};

pub mod transaction;
pub use transaction::*;

pub mod block;
pub use block::{Block, Header};

pub mod ledger;
pub use ledger::*;

pub mod storage_context;
pub use storage_context::StorageContext;
