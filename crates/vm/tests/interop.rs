mod common;

use std::sync::Arc;

use common::{contract, engine_for, engine_with, header, invocation, script_hash, Fixture};
use num_bigint::BigInt;
use storage::Store;
use types::{
    attribute_usage, Attribute, Block, ContractProperties, Input, Output, UInt160, UInt256,
};
use vm::opcode::*;
use vm::{
    ExecutionEngine, ExecutionLimits, ScriptBuilder, ScriptContainer, StackItem, TriggerType,
    VMState, VmError,
};

fn put_script(key: &[u8], value: &[u8]) -> ScriptBuilder {
    let mut sb = ScriptBuilder::new();
    sb.emit_push_bytes(value)
        .emit_push_bytes(key)
        .emit_syscall("Neo.Storage.GetContext")
        .emit_syscall("Neo.Storage.Put");
    sb
}

/// Deploys `script` as a contract with the given properties and returns a
/// fixture whose ledger knows it.
fn deployed(script: &[u8], properties: u8) -> Fixture {
    let mut fixture = Fixture::new();
    fixture
        .state
        .deploy_contract(contract(script.to_vec(), properties));
    fixture
}

#[test]
fn halted_writes_commit_and_faulted_writes_vanish() {
    let mut sb = put_script(b"k", b"v");
    sb.emit(RET);
    let script = sb.into_bytes();
    let fixture = deployed(&script, ContractProperties::HAS_STORAGE);
    let hash = script_hash(&script);

    let mut engine = engine_for(&fixture.host(), script);
    assert_eq!(engine.execute(), VMState::Halt);
    // store untouched until commit
    assert_eq!(fixture.store.get(&hash, b"k").unwrap(), None);
    assert_eq!(engine.commit().unwrap(), 1);
    assert_eq!(fixture.store.get(&hash, b"k").unwrap(), Some(b"v".to_vec()));

    let mut sb = put_script(b"k2", b"v2");
    sb.emit(THROW);
    let script = sb.into_bytes();
    let fixture = deployed(&script, ContractProperties::HAS_STORAGE);
    let hash = script_hash(&script);

    let mut engine = engine_for(&fixture.host(), script);
    assert_eq!(engine.execute(), VMState::Fault);
    assert!(engine.storage().changes().is_empty());
    assert_eq!(
        engine.commit().unwrap_err(),
        VmError::InvalidOperation("only a halted engine can commit")
    );
    assert_eq!(fixture.store.get(&hash, b"k2").unwrap(), None);
    assert!(fixture.store.is_empty());
}

#[test]
fn put_is_priced_per_kib() {
    let value = vec![7u8; 1500];
    let mut sb = put_script(b"key", &value);
    sb.emit(RET);
    let script = sb.into_bytes();
    let fixture = deployed(&script, ContractProperties::HAS_STORAGE);

    let mut engine = engine_for(&fixture.host(), script);
    assert_eq!(engine.execute(), VMState::Halt);
    // GetContext 1 + Put 2000 + RET 1
    assert_eq!(engine.gas_consumed(), 2002);
}

#[test]
fn reads_see_pending_writes() {
    let mut sb = put_script(b"k", b"fresh");
    sb.emit_push_bytes(b"k")
        .emit_syscall("Neo.Storage.GetContext")
        .emit_syscall("Neo.Storage.Get")
        .emit_push_bytes(b"missing")
        .emit_syscall("Neo.Storage.GetReadOnlyContext")
        .emit_syscall("Neo.Storage.Get")
        .emit(RET);
    let script = sb.into_bytes();
    let fixture = deployed(&script, ContractProperties::HAS_STORAGE);

    let mut engine = engine_for(&fixture.host(), script);
    assert_eq!(engine.execute(), VMState::Halt);
    let stack = engine.result_stack();
    assert_eq!(&*stack[0].as_bytes().unwrap(), b"fresh");
    assert!(stack[1].as_bytes().unwrap().is_empty());
}

#[test]
fn writes_need_application_trigger_and_writable_context() {
    let mut sb = put_script(b"k", b"v");
    sb.emit(RET);
    let script = sb.into_bytes();
    let fixture = deployed(&script, ContractProperties::HAS_STORAGE);

    let mut verifier = ExecutionEngine::new(
        TriggerType::Verification,
        &fixture.host(),
        ExecutionLimits::default(),
    );
    verifier.load_script(script).unwrap();
    assert_eq!(verifier.execute(), VMState::Fault);
    assert_eq!(verifier.last_error().unwrap().code(), "INVALID_OPERATION");

    let mut sb = ScriptBuilder::new();
    sb.emit_push_bytes(b"v")
        .emit_push_bytes(b"k")
        .emit_syscall("Neo.Storage.GetContext")
        .emit_syscall("Neo.StorageContext.AsReadOnly")
        .emit_syscall("Neo.Storage.Put")
        .emit(RET);
    let script = sb.into_bytes();
    let fixture = deployed(&script, ContractProperties::HAS_STORAGE);
    let mut engine = engine_for(&fixture.host(), script);
    assert_eq!(engine.execute(), VMState::Fault);
    assert_eq!(
        engine.last_error(),
        Some(&VmError::InvalidOperation("storage context is read-only"))
    );
}

#[test]
fn storage_needs_a_deployed_contract_with_storage() {
    let mut sb = put_script(b"k", b"v");
    sb.emit(RET);
    let script = sb.into_bytes();

    let fixture = Fixture::new();
    let mut engine = engine_for(&fixture.host(), script.clone());
    assert_eq!(engine.execute(), VMState::Fault);
    assert_eq!(engine.last_error().unwrap().code(), "CONTRACT_NOT_FOUND");

    let fixture = deployed(&script, ContractProperties::NO_PROPERTY);
    let mut engine = engine_for(&fixture.host(), script);
    assert_eq!(engine.execute(), VMState::Fault);
    assert_eq!(
        engine.last_error(),
        Some(&VmError::InvalidOperation("contract has no storage"))
    );
}

#[test]
fn oversized_storage_key_faults() {
    let mut sb = put_script(&[1u8; 1025], b"v");
    sb.emit(RET);
    let script = sb.into_bytes();
    let fixture = deployed(&script, ContractProperties::HAS_STORAGE);
    let mut engine = engine_for(&fixture.host(), script);
    assert_eq!(engine.execute(), VMState::Fault);
    assert_eq!(
        engine.last_error(),
        Some(&VmError::ItemTooLarge { size: 1025, limit: 1024 })
    );
}

#[test]
fn unknown_account_resolves_to_the_empty_account() {
    let unknown = UInt160([0x42; 20]);
    let mut sb = ScriptBuilder::new();
    sb.emit_push_bytes(unknown.as_bytes())
        .emit_syscall("Neo.Blockchain.GetAccount")
        .emit(DUP)
        .emit_syscall("Neo.Account.GetScriptHash")
        .emit(SWAP)
        .emit_push_bytes(&[0x99; 32])
        .emit(SWAP)
        .emit_syscall("Neo.Account.GetBalance")
        .emit(RET);
    let script = sb.into_bytes();
    let fixture = Fixture::new();

    for _ in 0..2 {
        let mut engine = engine_for(&fixture.host(), script.clone());
        assert_eq!(engine.execute(), VMState::Halt);
        let stack = engine.result_stack();
        assert_eq!(&*stack[0].as_bytes().unwrap(), unknown.as_bytes());
        assert_eq!(stack[1].as_integer().unwrap(), BigInt::from(0));
        // GetAccount 100, DUP/SWAP/SWAP/RET, two getters
        assert_eq!(engine.gas_consumed(), 100 + 4 + 2);
    }
}

#[test]
fn missing_ledger_entities_push_sentinels() {
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(99)
        .emit_syscall("Neo.Blockchain.GetHeader")
        .emit_push_bytes(&[0x11; 32])
        .emit_syscall("Neo.Blockchain.GetTransaction")
        .emit_push_bytes(&[0x11; 32])
        .emit_syscall("Neo.Blockchain.GetTransactionHeight")
        .emit_push_bytes(&[0x11; 20])
        .emit_syscall("Neo.Blockchain.GetContract")
        .emit(RET);
    let engine = {
        let fixture = Fixture::new();
        let mut engine = engine_for(&fixture.host(), sb.into_bytes());
        engine.execute();
        engine
    };
    assert_eq!(engine.state(), VMState::Halt);
    let stack = engine.result_stack();
    assert!(stack[0].as_bytes().unwrap().is_empty());
    assert!(stack[1].as_bytes().unwrap().is_empty());
    assert_eq!(stack[2].as_integer().unwrap(), BigInt::from(-1));
    assert!(stack[3].as_bytes().unwrap().is_empty());
}

#[test]
fn header_getters_accept_blocks() {
    let mut sb = ScriptBuilder::new();
    sb.emit(PUSH0)
        .emit_syscall("Neo.Blockchain.GetBlock")
        .emit(DUP)
        .emit_syscall("Neo.Header.GetTimestamp")
        .emit(SWAP)
        .emit_syscall("Neo.Block.GetTransactionCount")
        .emit(PUSH0)
        .emit_syscall("Neo.Blockchain.GetHeader")
        .emit_syscall("Neo.Header.GetConsensusData")
        .emit_syscall("Neo.Blockchain.GetHeight")
        .emit(RET);
    let fixture = Fixture::new();
    let mut engine = engine_for(&fixture.host(), sb.into_bytes());
    assert_eq!(engine.execute(), VMState::Halt);
    let stack = engine.result_stack();
    assert_eq!(
        stack[0].as_integer().unwrap(),
        BigInt::from(common::GENESIS_TIME)
    );
    assert_eq!(stack[1].as_integer().unwrap(), BigInt::from(0));
    assert_eq!(stack[2].as_integer().unwrap(), BigInt::from(42));
    assert_eq!(stack[3].as_integer().unwrap(), BigInt::from(0));
}

#[test]
fn check_witness_uses_attributes_and_spent_outputs() {
    let signer = UInt160([0x51; 20]);
    let owner = UInt160([0x52; 20]);
    let stranger = UInt160([0x53; 20]);

    let mut fixture = Fixture::new();
    let mut funding = invocation(vec![]);
    funding.hash = UInt256([0x10; 32]);
    funding.outputs.push(Output {
        asset_id: UInt256([0xAA; 32]),
        value: 100,
        script_hash: owner,
    });
    fixture.state.add_block(Block {
        header: header(1, common::GENESIS_TIME + 15),
        transactions: vec![Arc::new(funding)],
    });

    let mut tx = invocation(vec![]);
    tx.attributes.push(Attribute {
        usage: attribute_usage::SCRIPT,
        data: signer.as_bytes().to_vec(),
    });
    tx.inputs.push(Input {
        prev_hash: UInt256([0x10; 32]),
        prev_index: 0,
    });
    let tx = Arc::new(tx);

    let mut sb = ScriptBuilder::new();
    for hash in [signer, owner, stranger] {
        sb.emit_push_bytes(hash.as_bytes())
            .emit_syscall("Neo.Runtime.CheckWitness");
    }
    sb.emit(RET);
    let container = ScriptContainer::new(sb.into_bytes()).with_transaction(tx);
    let mut engine = engine_with(&fixture.host(), container, ExecutionLimits::default());
    assert_eq!(engine.execute(), VMState::Halt);
    let witnessed: Vec<bool> = engine.result_stack().iter().map(StackItem::as_bool).collect();
    assert_eq!(witnessed, vec![true, true, false]);
    assert_eq!(engine.gas_consumed(), 3 * 200 + 1);
}

#[test]
fn notifications_are_dropped_on_fault_but_logs_survive() {
    let mut sb = ScriptBuilder::new();
    sb.emit_push_bytes(b"hello")
        .emit_syscall("Neo.Runtime.Log")
        .emit_push_int(5)
        .emit_syscall("Neo.Runtime.Notify")
        .emit(RET);
    let script = sb.into_bytes();
    let fixture = Fixture::new();
    let mut engine = engine_for(&fixture.host(), script.clone());
    assert_eq!(engine.execute(), VMState::Halt);
    assert_eq!(engine.notifications().len(), 1);
    assert_eq!(engine.notifications()[0].script_hash, script_hash(&script));
    assert_eq!(engine.logs()[0].message, "hello");

    let mut faulting = script;
    faulting.pop();
    faulting.push(THROW);
    let mut engine = engine_for(&fixture.host(), faulting);
    assert_eq!(engine.execute(), VMState::Fault);
    assert!(engine.notifications().is_empty());
    assert_eq!(engine.logs().len(), 1);
}

#[test]
fn get_time_prefers_the_persisting_block() {
    let mut sb = ScriptBuilder::new();
    sb.emit_syscall("Neo.Runtime.GetTime").emit(RET);
    let script = sb.into_bytes();
    let fixture = Fixture::new();

    let mut engine = engine_for(&fixture.host(), script.clone());
    engine.execute();
    assert_eq!(
        engine.result_stack()[0].as_integer().unwrap(),
        BigInt::from(common::GENESIS_TIME + 15)
    );

    let persisting = Arc::new(Block {
        header: header(1, 1_700_000_000),
        transactions: vec![],
    });
    let mut engine = ExecutionEngine::new(
        TriggerType::Application,
        &fixture.host(),
        ExecutionLimits::default(),
    )
    .with_persisting_block(persisting);
    engine.load_script(script).unwrap();
    engine.execute();
    assert_eq!(
        engine.result_stack()[0].as_integer().unwrap(),
        BigInt::from(1_700_000_000u32)
    );
}

#[test]
fn script_hash_services_follow_the_call_chain() {
    let mut callee = ScriptBuilder::new();
    callee
        .emit_syscall("System.ExecutionEngine.GetCallingScriptHash")
        .emit_syscall("System.ExecutionEngine.GetExecutingScriptHash")
        .emit_syscall("System.ExecutionEngine.GetEntryScriptHash")
        .emit(RET);
    let callee = callee.into_bytes();
    let callee_hash = script_hash(&callee);

    let mut caller = ScriptBuilder::new();
    caller.emit_app_call(callee_hash, false).emit(RET);
    let caller = caller.into_bytes();
    let caller_hash = script_hash(&caller);

    let mut fixture = Fixture::new();
    fixture
        .state
        .deploy_contract(contract(callee, ContractProperties::NO_PROPERTY));
    let mut engine = engine_for(&fixture.host(), caller);
    assert_eq!(engine.execute(), VMState::Halt);
    let stack: Vec<Vec<u8>> = engine
        .result_stack()
        .iter()
        .map(|item| item.as_bytes().unwrap().to_vec())
        .collect();
    assert_eq!(stack[0], caller_hash.as_bytes());
    assert_eq!(stack[1], callee_hash.as_bytes());
    assert_eq!(stack[2], caller_hash.as_bytes());
}

#[test]
fn app_call_to_unknown_contract_faults() {
    let mut sb = ScriptBuilder::new();
    sb.emit_app_call(UInt160([0x01; 20]), false).emit(RET);
    let fixture = Fixture::new();
    let mut engine = engine_for(&fixture.host(), sb.into_bytes());
    assert_eq!(engine.execute(), VMState::Fault);
    assert_eq!(engine.last_error().unwrap().code(), "CONTRACT_NOT_FOUND");
}

#[test]
fn dynamic_invoke_requires_the_flag() {
    let mut callee = ScriptBuilder::new();
    callee.emit_push_int(11).emit(RET);
    let callee = callee.into_bytes();
    let callee_hash = script_hash(&callee);

    let mut caller = ScriptBuilder::new();
    caller
        .emit_push_bytes(callee_hash.as_bytes())
        .emit_app_call(UInt160::zero(), true);
    let caller = caller.into_bytes();

    for (properties, expected) in [
        (ContractProperties::HAS_DYNAMIC_INVOKE, VMState::Halt),
        (ContractProperties::NO_PROPERTY, VMState::Fault),
    ] {
        let mut fixture = deployed(&caller, properties);
        fixture
            .state
            .deploy_contract(contract(callee.clone(), ContractProperties::NO_PROPERTY));
        let mut engine = engine_for(&fixture.host(), caller.clone());
        assert_eq!(engine.execute(), expected);
        if expected == VMState::Halt {
            assert_eq!(
                engine.result_stack()[0].as_integer().unwrap(),
                BigInt::from(11)
            );
        }
    }
}

#[test]
fn contract_storage_context_only_for_itself() {
    let mut sb = ScriptBuilder::new();
    sb.emit_syscall("System.ExecutionEngine.GetExecutingScriptHash")
        .emit_syscall("Neo.Blockchain.GetContract")
        .emit_syscall("Neo.Contract.GetStorageContext")
        .emit(RET);
    let script = sb.into_bytes();
    let fixture = deployed(&script, ContractProperties::HAS_STORAGE);
    let mut engine = engine_for(&fixture.host(), script);
    assert_eq!(engine.execute(), VMState::Halt);
    let context = engine.result_stack()[0].as_storage_context().unwrap();
    assert!(!context.read_only);
}

#[test]
fn syscall_by_hash_matches_syscall_by_name() {
    let mut by_name = ScriptBuilder::new();
    by_name.emit_syscall("Neo.Runtime.GetTrigger").emit(RET);
    let mut by_hash = ScriptBuilder::new();
    by_hash.emit_syscall_hash("Neo.Runtime.GetTrigger").emit(RET);

    let fixture = Fixture::new();
    for script in [by_name.into_bytes(), by_hash.into_bytes()] {
        let mut engine = engine_for(&fixture.host(), script);
        assert_eq!(engine.execute(), VMState::Halt);
        assert_eq!(
            engine.result_stack()[0].as_integer().unwrap(),
            BigInt::from(0x10)
        );
    }
}

#[test]
fn unknown_syscall_faults() {
    let mut sb = ScriptBuilder::new();
    sb.emit_syscall("Neo.Nope").emit(RET);
    let engine = common::run(sb.into_bytes());
    assert_eq!(engine.last_error().unwrap().code(), "UNKNOWN_INTEROP");
}

#[test]
fn storage_calls_need_a_storage_context() {
    let mut sb = ScriptBuilder::new();
    sb.emit(PUSH1)
        .emit(PUSH1)
        .emit_syscall("Neo.Storage.Get")
        .emit(RET);
    let engine = common::run(sb.into_bytes());
    assert_eq!(engine.state(), VMState::Fault);
    let err = engine.last_error().unwrap();
    assert_eq!(err.code(), "INVALID_VALUE_STORAGE_CONTEXT_STACK_ITEM");
    assert_eq!(
        err.to_string(),
        "Invalid Value. Expected StorageContextStackItem"
    );
}
