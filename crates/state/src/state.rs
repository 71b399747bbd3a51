use std::collections::HashMap;
use std::sync::Arc;

use hex::encode as hex_encode;
use tracing::debug;
use types::{Account, Asset, Block, Contract, Header, Transaction, UInt160, UInt256, Validator};

use crate::blockchain::{BlockId, Blockchain, LedgerError, LedgerResult};

/// In-memory ledger snapshot.
///
/// EDUCATIONAL PURPOSE: This struct holds every entity the VM is allowed to
/// read: the block chain itself, the transaction index, accounts, assets,
/// contracts and the validator set. It is built up front (or restored from a
/// node's database) and then shared read-only between every engine that
/// validates against it.
///
/// DATA STRUCTURE: Blocks are kept in a vector indexed by height with a hash
/// index on the side; everything else sits in hash maps keyed by the entity's
/// identifier. Entities are stored as `Arc` so handing one to a script is a
/// reference-count bump, never a copy.
#[derive(Clone, Debug, Default)]
pub struct State {
    blocks: Vec<Arc<Block>>,
    headers: Vec<Arc<Header>>,
    block_index: HashMap<UInt256, u32>,
    transactions: HashMap<UInt256, (Arc<Transaction>, u32)>,

    pub accounts: HashMap<UInt160, Arc<Account>>,
    pub assets: HashMap<UInt256, Arc<Asset>>,
    pub contracts: HashMap<UInt160, Arc<Contract>>,
    pub validators: Vec<Arc<Validator>>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `block` at the next height and indexes its transactions.
    ///
    /// The block's own `index` is overwritten with the height it lands at so
    /// lookups by hash and by index always agree.
    pub fn add_block(&mut self, mut block: Block) -> u32 {
        let height = self.blocks.len() as u32;
        block.header.index = height;

        for tx in &block.transactions {
            self.transactions.insert(tx.hash, (Arc::clone(tx), height));
        }
        self.block_index.insert(block.hash(), height);
        self.headers.push(Arc::new(block.header.clone()));
        self.blocks.push(Arc::new(block));
        height
    }

    pub fn put_account(&mut self, account: Account) {
        self.accounts.insert(account.script_hash, Arc::new(account));
    }

    pub fn register_asset(&mut self, asset: Asset) {
        self.assets.insert(asset.asset_id, Arc::new(asset));
    }

    /// Deploys a contract under its script hash, replacing any previous one.
    pub fn deploy_contract(&mut self, contract: Contract) {
        self.contracts.insert(contract.script_hash, Arc::new(contract));
    }

    pub fn add_validator(&mut self, validator: Validator) {
        self.validators.push(Arc::new(validator));
    }

    pub fn is_contract(&self, script_hash: &UInt160) -> bool {
        self.contracts.contains_key(script_hash)
    }

    fn resolve(&self, id: BlockId) -> Option<usize> {
        match id {
            BlockId::Index(index) => {
                let index = index as usize;
                (index < self.blocks.len()).then_some(index)
            }
            BlockId::Hash(hash) => self.block_index.get(&hash).map(|h| *h as usize),
        }
    }

    /// Logs a human-readable summary of the snapshot at debug level.
    pub fn pretty_print(&self) {
        debug!("--- State Dump ---");
        debug!(height = self.blocks.len(), txs = self.transactions.len(), "chain");
        for (hash, acc) in &self.accounts {
            debug!(
                address = %hex_encode(hash.0),
                frozen = acc.is_frozen,
                votes = acc.votes.len(),
                assets = acc.balances.len(),
                "account"
            );
        }
        for (hash, contract) in &self.contracts {
            debug!(
                address = %hex_encode(hash.0),
                name = %contract.name,
                code_size = contract.script.len(),
                storage = contract.has_storage(),
                "contract"
            );
        }
    }
}

impl Blockchain for State {
    fn current_block(&self) -> LedgerResult<Arc<Block>> {
        self.blocks.last().cloned().ok_or(LedgerError::Empty)
    }

    fn block(&self, id: BlockId) -> LedgerResult<Option<Arc<Block>>> {
        Ok(self.resolve(id).map(|i| Arc::clone(&self.blocks[i])))
    }

    fn header(&self, id: BlockId) -> LedgerResult<Option<Arc<Header>>> {
        Ok(self.resolve(id).map(|i| Arc::clone(&self.headers[i])))
    }

    fn transaction(&self, hash: &UInt256) -> LedgerResult<Option<(Arc<Transaction>, u32)>> {
        Ok(self.transactions.get(hash).cloned())
    }

    fn account(&self, script_hash: &UInt160) -> LedgerResult<Option<Arc<Account>>> {
        Ok(self.accounts.get(script_hash).cloned())
    }

    fn asset(&self, asset_id: &UInt256) -> LedgerResult<Option<Arc<Asset>>> {
        Ok(self.assets.get(asset_id).cloned())
    }

    fn contract(&self, script_hash: &UInt160) -> LedgerResult<Option<Arc<Contract>>> {
        Ok(self.contracts.get(script_hash).cloned())
    }

    fn validators(&self) -> LedgerResult<Vec<Arc<Validator>>> {
        Ok(self.validators.clone())
    }
}
