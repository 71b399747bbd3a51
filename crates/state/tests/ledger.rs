use std::collections::BTreeMap;
use std::sync::Arc;

use state::{BlockId, Blockchain, LedgerError, State};
use types::{
    Account, Block, Header, Transaction, TransactionType, UInt160, UInt256,
};

fn header(hash: u8, index: u32) -> Header {
    Header {
        hash: UInt256([hash; 32]),
        version: 0,
        prev_hash: UInt256::zero(),
        merkle_root: UInt256::zero(),
        timestamp: 1_500_000_000 + index,
        index,
        consensus_data: 42,
        next_consensus: UInt160::zero(),
    }
}

fn tx(hash: u8) -> Arc<Transaction> {
    Arc::new(Transaction {
        hash: UInt256([hash; 32]),
        tx_type: TransactionType::Invocation,
        version: 1,
        attributes: vec![],
        inputs: vec![],
        outputs: vec![],
        script: vec![0x51],
        gas: 0,
    })
}

#[test]
fn empty_ledger_has_no_current_block() {
    let state = State::new();
    assert_eq!(state.current_block(), Err(LedgerError::Empty));
}

#[test]
fn blocks_resolve_by_hash_and_index() {
    let mut state = State::new();
    state.add_block(Block { header: header(1, 0), transactions: vec![] });
    // index is rewritten to the height the block lands at
    let height = state.add_block(Block { header: header(2, 99), transactions: vec![tx(7)] });
    assert_eq!(height, 1);

    let by_index = state.block(BlockId::Index(1)).unwrap().expect("block 1");
    let by_hash = state.block(BlockId::Hash(UInt256([2; 32]))).unwrap().expect("block by hash");
    assert_eq!(by_index.hash(), by_hash.hash());
    assert_eq!(by_hash.index(), 1);
    assert_eq!(state.height().unwrap(), 1);
    assert!(state.block(BlockId::Index(2)).unwrap().is_none());
    assert_eq!(state.header(BlockId::Index(0)).unwrap().unwrap().hash, UInt256([1; 32]));
}

#[test]
fn transactions_are_indexed_with_their_height() {
    let mut state = State::new();
    state.add_block(Block { header: header(1, 0), transactions: vec![tx(5), tx(6)] });

    let (found, height) = state.transaction(&UInt256([6; 32])).unwrap().expect("tx");
    assert_eq!(found.hash, UInt256([6; 32]));
    assert_eq!(height, 0);
    assert!(state.transaction(&UInt256([8; 32])).unwrap().is_none());
}

#[test]
fn accounts_are_snapshots() {
    let mut state = State::new();
    let mut balances = BTreeMap::new();
    balances.insert(UInt256([3; 32]), 500);
    state.put_account(Account {
        script_hash: UInt160([1; 20]),
        is_frozen: false,
        votes: vec![],
        balances,
    });

    let snapshot = state.clone();
    state.put_account(Account::empty(UInt160([1; 20])));

    let old = snapshot.account(&UInt160([1; 20])).unwrap().unwrap();
    assert_eq!(old.balance(&UInt256([3; 32])), 500);
    let new = state.account(&UInt160([1; 20])).unwrap().unwrap();
    assert_eq!(new.balance(&UInt256([3; 32])), 0);
}
