use std::fmt::Debug;
use std::sync::Arc;

use thiserror::Error;
use types::{Account, Asset, Block, Contract, Header, Transaction, UInt160, UInt256, Validator};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger has no blocks")]
    Empty,
    #[error("ledger backend failure: {0}")]
    Backend(String),
}

impl LedgerError {
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Empty => "LEDGER_EMPTY",
            LedgerError::Backend(_) => "LEDGER_BACKEND",
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Blocks are addressed either by hash or by height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockId {
    Hash(UInt256),
    Index(u32),
}

/// Read-only view of ledger state consumed by the VM's interop services.
///
/// An implementation handed to an engine must stay fixed for the lifetime of
/// that invocation: two engines reading the same snapshot have to observe the
/// same entities, or their results diverge. Every lookup returns an immutable
/// snapshot (`Arc`) or `None` when the entity does not exist; `Err` is reserved
/// for backend failures and faults the invocation.
pub trait Blockchain: Debug + Send + Sync {
    fn current_block(&self) -> LedgerResult<Arc<Block>>;

    fn block(&self, id: BlockId) -> LedgerResult<Option<Arc<Block>>>;

    fn header(&self, id: BlockId) -> LedgerResult<Option<Arc<Header>>>;

    /// Transaction plus the height of the block that contains it.
    fn transaction(&self, hash: &UInt256) -> LedgerResult<Option<(Arc<Transaction>, u32)>>;

    fn account(&self, script_hash: &UInt160) -> LedgerResult<Option<Arc<Account>>>;

    fn asset(&self, asset_id: &UInt256) -> LedgerResult<Option<Arc<Asset>>>;

    fn contract(&self, script_hash: &UInt160) -> LedgerResult<Option<Arc<Contract>>>;

    fn validators(&self) -> LedgerResult<Vec<Arc<Validator>>>;

    fn height(&self) -> LedgerResult<u32> {
        Ok(self.current_block()?.index())
    }
}
