#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use executor::{Executor, ExecutorConfig};
use state::State;
use storage::{ChangeSet, Storage, StorageResult, Store};
use types::{
    Block, Contract, ContractProperties, Header, Transaction, TransactionType, UInt160, UInt256,
};
use vm::opcode::*;
use vm::{Crypto, DefaultCrypto, Host, ScriptBuilder};

pub const GENESIS_TIME: u32 = 1_600_000_000;

pub fn header(index: u32, timestamp: u32) -> Header {
    Header {
        hash: UInt256([index as u8 + 1; 32]),
        version: 0,
        prev_hash: UInt256::zero(),
        merkle_root: UInt256::zero(),
        timestamp,
        index,
        consensus_data: 7,
        next_consensus: UInt160::zero(),
    }
}

pub fn block(index: u32, transactions: Vec<Arc<Transaction>>) -> Arc<Block> {
    Arc::new(Block {
        header: header(index, GENESIS_TIME + 15 * index),
        transactions,
    })
}

pub fn script_hash(script: &[u8]) -> UInt160 {
    DefaultCrypto.hash160(script)
}

pub fn contract(script: &[u8]) -> Contract {
    Contract {
        script_hash: script_hash(script),
        script: script.to_vec(),
        parameter_list: vec![],
        return_type: 0xff,
        properties: ContractProperties(ContractProperties::HAS_STORAGE),
        name: "counter".into(),
        code_version: "1.0".into(),
        author: "executor".into(),
        email: "executor@example.org".into(),
        description: "fixture".into(),
    }
}

/// Invocation transaction; `tag` keeps hashes of identical scripts apart.
pub fn invocation(script: Vec<u8>, tag: u8, gas: i64) -> Arc<Transaction> {
    Arc::new(Transaction {
        hash: UInt256([tag; 32]),
        tx_type: TransactionType::Invocation,
        version: 1,
        attributes: vec![],
        inputs: vec![],
        outputs: vec![],
        script,
        gas,
    })
}

pub fn miner(tag: u8) -> Arc<Transaction> {
    Arc::new(Transaction {
        hash: UInt256([tag; 32]),
        tx_type: TransactionType::Miner,
        version: 0,
        attributes: vec![],
        inputs: vec![],
        outputs: vec![],
        script: vec![],
        gas: 0,
    })
}

/// Reads key `n` of the executing contract, adds one and writes it back.
pub fn counter_script(key: &[u8]) -> Vec<u8> {
    let mut sb = ScriptBuilder::new();
    sb.emit_push_bytes(key)
        .emit_syscall("Neo.Storage.GetContext")
        .emit_syscall("Neo.Storage.Get")
        .emit(INC)
        .emit_push_bytes(key)
        .emit_syscall("Neo.Storage.GetContext")
        .emit_syscall("Neo.Storage.Put")
        .emit(RET);
    sb.into_bytes()
}

/// Gas of one `counter_script` run with a one-byte key and value.
pub const COUNTER_GAS: u64 = 1 + 100 + 1 + 1 + 1000 + 1;

/// Store wrapper that counts commits and closes.
#[derive(Debug, Default)]
pub struct CountingStore {
    pub inner: Storage,
    pub commits: AtomicUsize,
    pub closes: AtomicUsize,
}

impl CountingStore {
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Store for CountingStore {
    fn get(&self, script_hash: &UInt160, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(script_hash, key)
    }

    fn commit(&self, changes: ChangeSet) -> StorageResult<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit(changes)
    }

    fn close(&self) -> StorageResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}

/// A ledger with a genesis block, an empty store and the given contracts.
pub struct Fixture {
    pub state: State,
    pub store: Arc<Storage>,
}

impl Fixture {
    pub fn new<S: AsRef<[u8]>>(contracts: &[S]) -> Self {
        let mut state = State::new();
        state.add_block(Block {
            header: header(0, GENESIS_TIME),
            transactions: vec![],
        });
        for script in contracts {
            state.deploy_contract(contract(script.as_ref()));
        }
        Self {
            state,
            store: Arc::new(Storage::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new::<&[u8]>(&[])
    }

    pub fn host(&self) -> Host {
        let store: Arc<dyn Store> = self.store.clone();
        Host::new(Arc::new(self.state.clone()), store)
    }

    pub fn executor(&self, config: ExecutorConfig) -> Executor {
        Executor::new(config, self.host())
    }

    pub fn read(&self, script: &[u8], key: &[u8]) -> Option<Vec<u8>> {
        self.store.get(&script_hash(script), key).unwrap()
    }
}
