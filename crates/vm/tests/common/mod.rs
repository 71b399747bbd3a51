#![allow(dead_code)]

use std::sync::Arc;

use state::State;
use storage::{Storage, Store};
use types::{
    Block, Contract, ContractProperties, Header, Transaction, TransactionType, UInt160, UInt256,
};
use vm::{
    Crypto, DefaultCrypto, ExecutionEngine, ExecutionLimits, Host, ScriptContainer, TriggerType,
};

pub const GENESIS_TIME: u32 = 1_600_000_000;

pub fn header(index: u32, timestamp: u32) -> Header {
    Header {
        hash: UInt256([index as u8 + 1; 32]),
        version: 0,
        prev_hash: UInt256::zero(),
        merkle_root: UInt256([0xAB; 32]),
        timestamp,
        index,
        consensus_data: 42,
        next_consensus: UInt160([0xCC; 20]),
    }
}

pub fn script_hash(script: &[u8]) -> UInt160 {
    DefaultCrypto.hash160(script)
}

pub fn contract(script: Vec<u8>, properties: u8) -> Contract {
    Contract {
        script_hash: script_hash(&script),
        script,
        parameter_list: vec![],
        return_type: 0xff,
        properties: ContractProperties(properties),
        name: "test".into(),
        code_version: "1.0".into(),
        author: "vm".into(),
        email: "vm@example.org".into(),
        description: "fixture".into(),
    }
}

pub fn invocation(script: Vec<u8>) -> Transaction {
    Transaction {
        hash: UInt256([0x77; 32]),
        tx_type: TransactionType::Invocation,
        version: 1,
        attributes: vec![],
        inputs: vec![],
        outputs: vec![],
        script,
        gas: 0,
    }
}

/// A ledger with a genesis block and an empty store.
pub struct Fixture {
    pub state: State,
    pub store: Arc<Storage>,
}

impl Fixture {
    pub fn new() -> Self {
        let mut state = State::new();
        state.add_block(Block {
            header: header(0, GENESIS_TIME),
            transactions: vec![],
        });
        Self {
            state,
            store: Arc::new(Storage::new()),
        }
    }

    pub fn host(&self) -> Host {
        let store: Arc<dyn Store> = self.store.clone();
        Host::new(Arc::new(self.state.clone()), store)
    }
}

pub fn engine_for(host: &Host, script: Vec<u8>) -> ExecutionEngine {
    engine_with(host, ScriptContainer::new(script), ExecutionLimits::default())
}

pub fn engine_with(
    host: &Host,
    container: ScriptContainer,
    limits: ExecutionLimits,
) -> ExecutionEngine {
    let mut engine = ExecutionEngine::new(TriggerType::Application, host, limits);
    engine.load_container(container).unwrap();
    engine
}

pub fn run(script: Vec<u8>) -> ExecutionEngine {
    let fixture = Fixture::new();
    let mut engine = engine_for(&fixture.host(), script);
    engine.execute();
    engine
}
