mod common;

use std::sync::Arc;

use common::{engine_for, engine_with, invocation, run, Fixture};
use k256::ecdsa::{signature::hazmat::PrehashSigner, Signature, SigningKey};
use num_bigint::BigInt;
use vm::opcode::*;
use vm::{
    Crypto, DefaultCrypto, ExecutionLimits, InvalidValue, ScriptBuilder, ScriptContainer,
    StackItem, VMState, VmError,
};

fn top_integer(engine: &vm::ExecutionEngine) -> BigInt {
    engine.result_stack().last().unwrap().as_integer().unwrap()
}

#[test]
fn add_halts_with_seven_and_exact_gas() {
    let engine = run(vec![PUSH1 + 2, PUSH1 + 3, ADD, RET]);
    assert_eq!(engine.state(), VMState::Halt);
    assert_eq!(engine.result_stack().len(), 1);
    assert_eq!(top_integer(&engine), BigInt::from(7));
    // two free pushes, ADD and RET at one unit each
    assert_eq!(engine.gas_consumed(), 2);
    assert!(engine.last_error().is_none());
}

#[test]
fn falling_off_the_end_returns() {
    let engine = run(vec![PUSH1 + 4]);
    assert_eq!(engine.state(), VMState::Halt);
    assert_eq!(top_integer(&engine), BigInt::from(5));
}

#[test]
fn arithmetic_on_wide_operands_is_exact() {
    let a = BigInt::from(u128::MAX);
    let b = -BigInt::from(u64::MAX);
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(a.clone())
        .emit_push_int(b.clone())
        .emit(MUL)
        .emit(RET);
    let engine = run(sb.into_bytes());
    assert_eq!(engine.state(), VMState::Halt);
    assert_eq!(top_integer(&engine), &a * &b);
}

#[test]
fn results_wider_than_32_bytes_fault() {
    let mut max = vec![0xffu8; 32];
    max[31] = 0x7f;
    let mut sb = ScriptBuilder::new();
    sb.emit_push_bytes(&max).emit(DUP).emit(ADD).emit(RET);
    let engine = run(sb.into_bytes());
    assert_eq!(engine.state(), VMState::Fault);
    assert_eq!(
        engine.last_error(),
        Some(&VmError::IntegerOverflow { limit: 32 })
    );
    assert!(engine.result_stack().is_empty());
}

#[test]
fn division_by_zero_faults() {
    let engine = run(vec![PUSH1, PUSH0, DIV, RET]);
    assert_eq!(engine.state(), VMState::Fault);
    assert_eq!(engine.last_error().unwrap().code(), "DIVISION_BY_ZERO");
}

#[test]
fn shifts_are_bounded() {
    let mut sb = ScriptBuilder::new();
    sb.emit(PUSH1).emit_push_int(254).emit(SHL).emit(PUSH1 + 6).emit(SHR).emit(RET);
    let engine = run(sb.into_bytes());
    assert_eq!(engine.state(), VMState::Halt);
    assert_eq!(top_integer(&engine), BigInt::from(1) << 247usize);

    let mut sb = ScriptBuilder::new();
    sb.emit(PUSH1).emit_push_int(257).emit(SHL).emit(RET);
    let engine = run(sb.into_bytes());
    assert_eq!(engine.state(), VMState::Fault);
    assert_eq!(
        engine.last_error(),
        Some(&VmError::ShiftOutOfRange { shift: 257, limit: 256 })
    );
}

#[test]
fn stack_underflow_faults() {
    let engine = run(vec![PUSH1, ADD]);
    assert_eq!(engine.state(), VMState::Fault);
    assert_eq!(engine.last_error(), Some(&VmError::StackUnderflow));
}

#[test]
fn mismatched_coercion_reports_the_expected_shape() {
    let mut sb = ScriptBuilder::new();
    sb.emit(PUSH1).emit_syscall("Neo.Header.GetHash").emit(RET);
    let engine = run(sb.into_bytes());
    assert_eq!(engine.state(), VMState::Fault);
    let err = engine.last_error().unwrap();
    assert_eq!(err, &VmError::InvalidValue(InvalidValue::BlockBase));
    assert_eq!(err.code(), "INVALID_VALUE_BLOCK_BASE");
    assert_eq!(err.to_string(), "Invalid Value. Expected BlockBase");

    let engine = run(vec![PUSH1, PUSH1, PICKITEM, RET]);
    assert_eq!(
        engine.last_error(),
        Some(&VmError::InvalidValue(InvalidValue::Array))
    );
}

#[test]
fn dup_copies_structs_but_shares_arrays() {
    // PUSH1 NEWSTRUCT DUP PUSH0 PUSH5 SETITEM RET: writes into the copy
    let engine = run(vec![PUSH1, NEWSTRUCT, DUP, PUSH0, PUSH1 + 4, SETITEM, RET]);
    assert_eq!(engine.state(), VMState::Halt);
    let original = engine.result_stack()[0].as_struct().unwrap();
    assert!(original.borrow()[0].equals(&StackItem::Boolean(false)));

    let engine = run(vec![PUSH1, NEWARRAY, DUP, PUSH0, PUSH1 + 4, SETITEM, RET]);
    assert_eq!(engine.state(), VMState::Halt);
    let original = engine.result_stack()[0].as_array().unwrap();
    assert!(original.borrow()[0].equals(&StackItem::from(5i64)));
}

#[test]
fn structs_compare_by_value_and_arrays_by_identity() {
    let engine = run(vec![PUSH1, NEWSTRUCT, PUSH1, NEWSTRUCT, EQUAL, RET]);
    assert!(engine.result_stack()[0].as_bool());

    let engine = run(vec![PUSH1, NEWARRAY, PUSH1, NEWARRAY, EQUAL, RET]);
    assert!(!engine.result_stack()[0].as_bool());
}

#[test]
fn map_keys_match_by_bytes() {
    // map[1] = 9; map[true] is the same entry
    let mut sb = ScriptBuilder::new();
    sb.emit(NEWMAP)
        .emit(DUP)
        .emit(PUSH1)
        .emit_push_int(9)
        .emit(SETITEM)
        .emit(DUP)
        .emit_push_bytes(&[1])
        .emit(HASKEY)
        .emit(SWAP)
        .emit(ARRAYSIZE)
        .emit(RET);
    let engine = run(sb.into_bytes());
    assert_eq!(engine.state(), VMState::Halt);
    assert_eq!(top_integer(&engine), BigInt::from(1));
    assert!(engine.result_stack()[0].as_bool());
}

#[test]
fn splice_operations() {
    let mut sb = ScriptBuilder::new();
    sb.emit_push_bytes(b"hello ")
        .emit_push_bytes(b"world")
        .emit(CAT)
        .emit(DUP)
        .emit(PUSH1 + 5)
        .emit(PUSH1 + 2)
        .emit(SUBSTR)
        .emit(SWAP)
        .emit(PUSH1 + 1)
        .emit(RIGHT)
        .emit(RET);
    let engine = run(sb.into_bytes());
    assert_eq!(engine.state(), VMState::Halt);
    let stack = engine.result_stack();
    assert_eq!(&*stack[0].as_bytes().unwrap(), b"wor");
    assert_eq!(&*stack[1].as_bytes().unwrap(), b"ld");

    let engine = run(vec![PUSH1, PUSH1 + 1, RIGHT, RET]);
    assert_eq!(engine.last_error().unwrap().code(), "INDEX_OUT_OF_RANGE");
}

#[test]
fn conditional_jump_skips_forward() {
    // PUSH1 JMPIF +4 PUSH2 PUSH3 RET: lands on PUSH3
    let mut sb = ScriptBuilder::new();
    sb.emit(PUSH1)
        .emit_jump(JMPIF, 4)
        .emit(PUSH1 + 1)
        .emit(PUSH1 + 2)
        .emit(RET);
    let engine = run(sb.into_bytes());
    assert_eq!(engine.state(), VMState::Halt);
    assert_eq!(engine.result_stack().len(), 1);
    assert_eq!(top_integer(&engine), BigInt::from(3));
}

#[test]
fn jump_outside_the_script_faults_even_when_not_taken() {
    let mut sb = ScriptBuilder::new();
    sb.emit(PUSH0).emit_jump(JMPIF, 100).emit(RET);
    let engine = run(sb.into_bytes());
    assert_eq!(engine.state(), VMState::Fault);
    assert_eq!(engine.last_error().unwrap().code(), "INVALID_JUMP");
}

#[test]
fn call_passes_stack_and_slots_hold_arguments() {
    // 0: PUSH5 1: PUSH7 2: CALL +4 5: RET
    // 6: INITSLOT 1 2  9: LDARG0 11: LDARG1 13: SUB 14: RET
    let script = vec![
        PUSH1 + 4,
        PUSH1 + 6,
        CALL, 4, 0,
        RET,
        INITSLOT, 1, 2,
        LDARG, 0,
        LDARG, 1,
        SUB,
        RET,
    ];
    let engine = run(script);
    assert_eq!(engine.state(), VMState::Halt);
    assert_eq!(engine.result_stack().len(), 1);
    assert_eq!(top_integer(&engine), BigInt::from(2));
}

#[test]
fn uninitialized_slot_faults() {
    let engine = run(vec![LDLOC, 0, RET]);
    assert_eq!(engine.last_error(), Some(&VmError::SlotNotInitialized));
}

#[test]
fn recursion_past_max_depth_faults() {
    let fixture = Fixture::new();
    let limits = ExecutionLimits {
        max_invocation_depth: 16,
        ..Default::default()
    };
    let mut engine = engine_with(
        &fixture.host(),
        ScriptContainer::new(vec![CALL, 0, 0]),
        limits,
    );
    assert_eq!(engine.execute(), VMState::Fault);
    assert_eq!(
        engine.last_error(),
        Some(&VmError::InvocationDepthExceeded { limit: 16 })
    );
    assert_eq!(engine.invocation_stack().len(), 0);
}

#[test]
fn gas_exhaustion_stops_before_the_instruction() {
    let fixture = Fixture::new();
    let script = vec![PUSH1, PUSH1 + 1, ADD, PUSH1 + 2, ADD, RET];
    let mut engine = engine_with(
        &fixture.host(),
        ScriptContainer::new(script.clone()),
        ExecutionLimits::default().with_gas_limit(1),
    );
    assert_eq!(engine.execute(), VMState::Fault);
    assert_eq!(
        engine.last_error(),
        Some(&VmError::InsufficientGas { price: 1, remaining: 0 })
    );
    assert_eq!(engine.gas_consumed(), 1);
    assert_eq!(engine.gas_remaining(), 0);
    assert_eq!(
        engine.fault_location(),
        Some((common::script_hash(&script), 4))
    );
}

#[test]
fn step_limit_faults() {
    let fixture = Fixture::new();
    // JMP 0 spins in place
    let limits = ExecutionLimits {
        max_steps: Some(50),
        ..Default::default()
    };
    let mut engine = engine_with(
        &fixture.host(),
        ScriptContainer::new(vec![JMP, 0, 0]),
        limits,
    );
    assert_eq!(engine.execute(), VMState::Fault);
    assert_eq!(
        engine.last_error(),
        Some(&VmError::StepLimitExceeded { limit: 50 })
    );
    assert_eq!(engine.steps(), 50);
}

#[test]
fn stack_size_is_bounded() {
    let fixture = Fixture::new();
    let limits = ExecutionLimits {
        max_stack_size: 3,
        ..Default::default()
    };
    let mut engine = engine_with(
        &fixture.host(),
        ScriptContainer::new(vec![PUSH1, PUSH1, TOALTSTACK, PUSH1, PUSH1, RET]),
        limits,
    );
    assert_eq!(engine.execute(), VMState::Fault);
    assert_eq!(
        engine.last_error(),
        Some(&VmError::StackOverflow { size: 4, limit: 3 })
    );
}

#[test]
fn nested_arrays_count_toward_stack_size() {
    let fixture = Fixture::new();
    let limits = ExecutionLimits {
        max_stack_size: 64,
        ..Default::default()
    };
    // 0: PUSH0 NEWARRAY
    // 2: PUSH1 NEWARRAY DUP PUSH0 PUSH3 ROLL SETITEM   wraps the top array in a new one
    // 9: JMP -7
    let script = vec![
        PUSH0, NEWARRAY,
        PUSH1, NEWARRAY, DUP, PUSH0, PUSH1 + 2, ROLL, SETITEM,
        JMP, 0xf9, 0xff,
    ];
    let mut engine = engine_with(&fixture.host(), ScriptContainer::new(script), limits);
    assert_eq!(engine.execute(), VMState::Fault);
    assert!(matches!(
        engine.last_error(),
        Some(VmError::StackOverflow { limit: 64, .. })
    ));
    // one level per seven instructions, so the walk stopped near the limit
    assert!(engine.steps() < 2 + 7 * 70);
}

#[test]
fn throw_faults() {
    let engine = run(vec![PUSH1, THROW]);
    assert_eq!(engine.state(), VMState::Fault);
    assert_eq!(engine.last_error(), Some(&VmError::Throw));

    let engine = run(vec![PUSH1, THROWIFNOT, PUSH1 + 1, RET]);
    assert_eq!(engine.state(), VMState::Halt);
}

#[test]
fn terminal_states_are_sticky() {
    let mut engine = run(vec![PUSH1, RET]);
    assert_eq!(engine.execute(), VMState::Halt);
    assert_eq!(engine.step_into(), VMState::Halt);
    assert_eq!(engine.gas_consumed(), 1);
}

#[test]
fn breakpoints_pause_and_resume() {
    let fixture = Fixture::new();
    let script = vec![PUSH1, PUSH1 + 1, ADD, RET];
    let mut engine = engine_for(&fixture.host(), script.clone());
    engine.add_breakpoint(common::script_hash(&script), 2);

    assert_eq!(engine.execute(), VMState::Break);
    let ctx = engine.current_context().unwrap();
    assert_eq!(ctx.instruction_pointer(), 2);
    assert_eq!(ctx.depth(), 2);

    assert_eq!(engine.step_into(), VMState::Break);
    assert_eq!(engine.current_context().unwrap().depth(), 1);

    assert_eq!(engine.execute(), VMState::Halt);
    assert_eq!(top_integer(&engine), BigInt::from(3));
}

#[test]
fn step_over_runs_the_whole_call() {
    let fixture = Fixture::new();
    // 0: CALL +5  3: PUSH2 4: RET  5: PUSH1 6: RET
    let script = vec![CALL, 5, 0, PUSH1 + 1, RET, PUSH1, RET];
    let mut engine = engine_for(&fixture.host(), script);
    assert_eq!(engine.step_over(), VMState::Break);
    assert_eq!(engine.invocation_stack().len(), 1);
    assert_eq!(engine.current_context().unwrap().instruction_pointer(), 3);
    assert_eq!(engine.current_context().unwrap().depth(), 1);
    assert_eq!(engine.execute(), VMState::Halt);
    assert_eq!(engine.result_stack().len(), 2);
}

#[test]
fn arguments_are_pushed_first_on_top() {
    let fixture = Fixture::new();
    let container = ScriptContainer::new(vec![SUB, RET])
        .with_arguments(vec![StackItem::from(10i64), StackItem::from(3i64)]);
    let mut engine = engine_with(&fixture.host(), container, ExecutionLimits::default());
    assert_eq!(engine.execute(), VMState::Halt);
    // stack was [3, 10] with 10 on top: 3 - 10
    assert_eq!(top_integer(&engine), BigInt::from(-7));
}

#[test]
fn checksig_verifies_against_the_container() {
    let fixture = Fixture::new();
    let key = SigningKey::from_slice(&[3u8; 32]).unwrap();
    let public_key = key.verifying_key().to_sec1_bytes();

    let build = |signature: &[u8]| {
        let mut sb = ScriptBuilder::new();
        sb.emit_push_bytes(signature)
            .emit_push_bytes(&public_key)
            .emit(CHECKSIG)
            .emit(RET);
        sb.into_bytes()
    };

    let tx = invocation(vec![]);
    let digest = DefaultCrypto.sha256(&tx.encode());
    let signature: Signature = key.sign_prehash(&digest).unwrap();
    let signature = signature.to_bytes();

    let tx = Arc::new(tx);
    let container = ScriptContainer::new(build(&signature)).with_transaction(Arc::clone(&tx));
    let mut engine = engine_with(&fixture.host(), container, ExecutionLimits::default());
    assert_eq!(engine.execute(), VMState::Halt);
    assert!(engine.result_stack()[0].as_bool());
    assert_eq!(engine.gas_consumed(), 101);

    let container = ScriptContainer::new(build(&[0u8; 64])).with_transaction(tx);
    let mut engine = engine_with(&fixture.host(), container, ExecutionLimits::default());
    assert_eq!(engine.execute(), VMState::Halt);
    assert!(!engine.result_stack()[0].as_bool());

    // without a container there is nothing to verify against
    let engine = run(build(&signature));
    assert_eq!(engine.state(), VMState::Fault);
}

#[test]
fn hash_opcodes_match_the_crypto_collaborator() {
    let mut sb = ScriptBuilder::new();
    sb.emit_push_bytes(b"abc").emit(SHA256).emit(RET);
    let engine = run(sb.into_bytes());
    assert_eq!(
        hex::encode(&*engine.result_stack()[0].as_bytes().unwrap()),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(engine.gas_consumed(), 11);
}

#[test]
fn unknown_opcode_faults_with_position() {
    let engine = run(vec![PUSH1, 0xFF]);
    assert_eq!(
        engine.last_error(),
        Some(&VmError::UnknownOpcode { opcode: 0xFF, position: 1 })
    );
}
