mod common;

use common::{block, counter_script, invocation, Fixture, COUNTER_GAS};
use executor::ExecutorConfig;
use once_cell::sync::Lazy;
use vm::opcode::*;
use vm::VMState;

#[derive(Debug)]
pub struct TestCase<'a> {
    pub name: &'a str,
    /// Script and paid gas of each invocation, in block order.
    pub transactions: Vec<(Vec<u8>, i64)>,
    /// Free gas per invocation.
    pub gas_limit: u64,
    pub expected_states: Vec<VMState>,
    pub expected_committed: usize,
    pub expected_gas: u64,
}

fn throwing_counter() -> Vec<u8> {
    let mut script = counter_script(b"t");
    script.pop();
    script.push(THROW);
    script
}

pub static TEST_CASES: Lazy<Vec<TestCase<'static>>> = Lazy::new(|| {
    vec![
        TestCase {
            name: "empty block",
            transactions: vec![],
            gas_limit: 10_000,
            expected_states: vec![],
            expected_committed: 0,
            expected_gas: 0,
        },
        TestCase {
            name: "pure arithmetic writes nothing",
            transactions: vec![(vec![PUSH1 + 2, PUSH1 + 3, ADD, RET], 0)],
            gas_limit: 10_000,
            expected_states: vec![VMState::Halt],
            expected_committed: 0,
            expected_gas: 2,
        },
        TestCase {
            name: "two counters",
            transactions: vec![(counter_script(b"a"), 0), (counter_script(b"b"), 0)],
            gas_limit: 10_000,
            expected_states: vec![VMState::Halt, VMState::Halt],
            expected_committed: 2,
            expected_gas: 2 * COUNTER_GAS,
        },
        TestCase {
            name: "fault between halts",
            transactions: vec![
                (counter_script(b"a"), 0),
                (throwing_counter(), 0),
                (counter_script(b"b"), 0),
            ],
            gas_limit: 10_000,
            expected_states: vec![VMState::Halt, VMState::Fault, VMState::Halt],
            expected_committed: 2,
            // THROW costs what RET would have
            expected_gas: 3 * COUNTER_GAS,
        },
        TestCase {
            name: "out of gas without a fee",
            transactions: vec![(vec![PUSH1, SHA256, RET], 0), (vec![PUSH1, SHA256, RET], 10)],
            gas_limit: 5,
            expected_states: vec![VMState::Fault, VMState::Halt],
            expected_committed: 0,
            expected_gas: 11,
        },
        TestCase {
            name: "unknown opcode",
            transactions: vec![(vec![0xFF], 0)],
            gas_limit: 10_000,
            expected_states: vec![VMState::Fault],
            expected_committed: 0,
            expected_gas: 0,
        },
    ]
});

#[test]
fn run_table() {
    for case in TEST_CASES.iter() {
        for parallel in [true, false] {
            let scripts: Vec<&Vec<u8>> = case.transactions.iter().map(|(s, _)| s).collect();
            let fixture = Fixture::new(&scripts);
            let config = ExecutorConfig::default()
                .with_gas_limit(case.gas_limit)
                .with_parallel(parallel);
            let executor = fixture.executor(config);

            let txs = case
                .transactions
                .iter()
                .enumerate()
                .map(|(i, (script, gas))| invocation(script.clone(), i as u8 + 1, *gas))
                .collect();
            let receipt = executor.validate_block(block(1, txs)).unwrap();

            let states: Vec<VMState> = receipt.receipts.iter().map(|r| r.state).collect();
            assert_eq!(states, case.expected_states, "{} (parallel = {parallel})", case.name);
            assert_eq!(receipt.committed, case.expected_committed, "{}: committed", case.name);
            assert_eq!(receipt.gas_consumed(), case.expected_gas, "{}: gas", case.name);
        }
    }
}
