use std::collections::HashSet;
use std::sync::Arc;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use state::Blockchain;
use storage::{ChangeSet, StorageCache};
use tracing::{debug, info, warn};
use types::{Block, Transaction, UInt160};

use crate::decoder::decode;
use crate::errors::{VmError, VmResult};
use crate::execution_context::ExecutionContext;
use crate::global::{Config, ExecutionLimits};
use crate::host_interface::{Crypto, Host};
use crate::instruction::Instruction;
use crate::interop::InteropPrice;
use crate::invocation_stack::InvocationStack;
use crate::metering::{GasMeter, GasSchedule};
use crate::script::{Script, ScriptContainer};
use crate::stack_item::{integer_to_bytes, ItemCounter, StackItem};

/// Engine state. `Halt` and `Fault` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VMState {
    None,
    Halt,
    Fault,
    Break,
}

/// Why a script runs. Storage writes are only allowed under `Application`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerType {
    Verification = 0x00,
    Application = 0x10,
}

/// Event raised by `Neo.Runtime.Notify`.
#[derive(Debug, Clone)]
pub struct Notification {
    pub script_hash: UInt160,
    pub state: StackItem,
}

/// Message emitted by `Neo.Runtime.Log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub script_hash: UInt160,
    pub message: String,
}

/// Everything left once an engine is done: its terminal state, results,
/// side channels and the storage writes it wants committed.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub state: VMState,
    pub result_stack: Vec<StackItem>,
    pub gas_consumed: u64,
    pub notifications: Vec<Notification>,
    pub logs: Vec<LogEntry>,
    pub error: Option<VmError>,
    /// Empty unless the engine halted.
    pub changes: ChangeSet,
}

/// The stack-machine interpreter.
///
/// EDUCATIONAL PURPOSE: This is the fetch/decode/execute loop of the VM. An
/// engine owns one invocation: a stack of frames, a gas budget, a buffer of
/// storage writes and the side channels scripts can write to (notifications
/// and logs). It reaches ledger state only through the collaborators in
/// [`Host`].
///
/// STATE MACHINE:
/// - `None`: runnable.
/// - `Break`: paused on a breakpoint or after a single step; `execute` and
///   the `step_*` methods resume it.
/// - `Halt`: the outermost frame returned; `result_stack` holds its stack.
/// - `Fault`: some step failed. Frames and the result stack are dropped,
///   buffered storage writes are discarded and `last_error` says why.
///
/// DETERMINISM: The engine is single threaded, its only inputs are the
/// script, the container and a fixed ledger snapshot, and every limit it
/// enforces is a constant. Two engines fed the same inputs agree on every
/// item and on HALT vs FAULT.
#[derive(Debug)]
pub struct ExecutionEngine {
    state: VMState,
    trigger: TriggerType,
    invocation_stack: InvocationStack,
    result_stack: Vec<StackItem>,
    gas: GasMeter,
    schedule: GasSchedule,
    limits: ExecutionLimits,
    host: Host,
    storage: StorageCache,
    container: Option<Arc<Transaction>>,
    persisting_block: Option<Arc<Block>>,
    notifications: Vec<Notification>,
    logs: Vec<LogEntry>,
    breakpoints: HashSet<(UInt160, usize)>,
    last_error: Option<VmError>,
    fault_location: Option<(UInt160, usize)>,
    cursor: Option<(UInt160, usize)>,
    steps: u64,
}

impl ExecutionEngine {
    pub fn new(trigger: TriggerType, host: &Host, limits: ExecutionLimits) -> Self {
        Self {
            state: VMState::None,
            trigger,
            invocation_stack: InvocationStack::new(limits.max_invocation_depth),
            result_stack: Vec::new(),
            gas: GasMeter::new(limits.gas_limit),
            schedule: GasSchedule::default(),
            limits,
            host: host.clone(),
            storage: StorageCache::new(Arc::clone(&host.store)),
            container: None,
            persisting_block: None,
            notifications: Vec::new(),
            logs: Vec::new(),
            breakpoints: HashSet::new(),
            last_error: None,
            fault_location: None,
            cursor: None,
            steps: 0,
        }
    }

    pub fn with_gas_schedule(mut self, schedule: GasSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Block being persisted while this engine runs; `Runtime.GetTime`
    /// reports its timestamp.
    pub fn with_persisting_block(mut self, block: Arc<Block>) -> Self {
        self.persisting_block = Some(block);
        self
    }

    /// Loads bytecode as a new frame. The script hash is derived from the bytes.
    pub fn load_script(&mut self, bytes: Vec<u8>) -> VmResult<()> {
        let hash = self.host.crypto.hash160(&bytes);
        self.invocation_stack
            .push(ExecutionContext::new(Script::new(bytes, hash)))
    }

    /// Loads the container's script at its entry point and pushes its
    /// arguments so the first one ends on top.
    pub fn load_container(&mut self, container: ScriptContainer) -> VmResult<()> {
        let ScriptContainer {
            transaction,
            script,
            entry_ip,
            arguments,
        } = container;
        self.container = transaction;
        self.load_script(script)?;

        let ctx = self.invocation_stack.current_mut()?;
        ctx.jump(entry_ip as i64)?;
        for argument in arguments.into_iter().rev() {
            ctx.push(argument);
        }
        Ok(())
    }

    // ===== Running =====

    /// Runs until HALT, FAULT or a breakpoint.
    pub fn execute(&mut self) -> VMState {
        if self.is_terminal() {
            return self.state;
        }
        self.state = VMState::None;
        while self.state == VMState::None {
            self.execute_next();
        }
        self.state
    }

    /// Executes exactly one instruction and pauses.
    pub fn step_into(&mut self) -> VMState {
        if self.is_terminal() {
            return self.state;
        }
        self.state = VMState::None;
        self.execute_next();
        if self.state == VMState::None {
            self.state = VMState::Break;
        }
        self.state
    }

    /// Executes one instruction, then keeps going until control is back at
    /// the current call depth.
    pub fn step_over(&mut self) -> VMState {
        if self.is_terminal() {
            return self.state;
        }
        self.state = VMState::None;
        let depth = self.invocation_stack.len();
        self.execute_next();
        while self.state == VMState::None && self.invocation_stack.len() > depth {
            self.execute_next();
        }
        if self.state == VMState::None {
            self.state = VMState::Break;
        }
        self.state
    }

    /// Runs until the current frame returns.
    pub fn step_out(&mut self) -> VMState {
        if self.is_terminal() {
            return self.state;
        }
        self.state = VMState::None;
        let depth = self.invocation_stack.len();
        while self.state == VMState::None && self.invocation_stack.len() >= depth {
            self.execute_next();
        }
        if self.state == VMState::None {
            self.state = VMState::Break;
        }
        self.state
    }

    pub fn add_breakpoint(&mut self, script_hash: UInt160, position: usize) {
        self.breakpoints.insert((script_hash, position));
    }

    pub fn remove_breakpoint(&mut self, script_hash: UInt160, position: usize) -> bool {
        self.breakpoints.remove(&(script_hash, position))
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, VMState::Halt | VMState::Fault)
    }

    fn execute_next(&mut self) {
        if self.invocation_stack.is_empty() {
            self.halt();
            return;
        }
        if let Err(err) = self.step() {
            self.fault(err);
            return;
        }
        if self.state == VMState::None {
            if let Ok(ctx) = self.invocation_stack.current() {
                let at = (ctx.script_hash(), ctx.instruction_pointer());
                if self.breakpoints.contains(&at) {
                    debug!(script = %at.0, ip = at.1, "breakpoint");
                    self.state = VMState::Break;
                }
            }
        }
    }

    /// Fetch, decode, charge, execute.
    fn step(&mut self) -> VmResult<()> {
        let (instr, position, size) = {
            let ctx = self.invocation_stack.current()?;
            let position = ctx.instruction_pointer();
            self.cursor = Some((ctx.script_hash(), position));
            let (instr, size) = decode(ctx.script().bytes(), position)?;
            (instr, position, size)
        };

        if let Some(limit) = self.limits.max_steps {
            if self.steps >= limit {
                return Err(VmError::StepLimitExceeded { limit });
            }
        }
        let price = self.price(&instr)?;
        self.gas.charge(price)?;
        self.steps += 1;

        debug!(
            ip = position,
            op = %instr.pretty_print(),
            price,
            gas = self.gas.consumed(),
            depth = self.invocation_stack.len(),
            "step"
        );

        self.invocation_stack
            .current_mut()?
            .set_instruction_pointer(position + size);
        self.execute_instruction(instr, position)?;
        self.check_stack_size()
    }

    fn price(&self, instr: &Instruction) -> VmResult<u64> {
        match instr {
            Instruction::Syscall(id) => match self.host.interop.get(*id)?.price {
                InteropPrice::Fixed(price) => Ok(price),
                InteropPrice::Dynamic(price) => price(self),
            },
            Instruction::CheckMultiSig => {
                let keys = match self.current_context()?.peek(0)? {
                    StackItem::Array(items) | StackItem::Struct(items) => items.borrow().len(),
                    other => usize::try_from(&other.as_integer()?).unwrap_or(0),
                };
                Ok(self.schedule.check_multisig_price(keys))
            }
            other => Ok(self.schedule.opcode_price(other)),
        }
    }

    /// Nested collection elements count toward the limit, which also bounds
    /// how deeply items can nest.
    fn check_stack_size(&self) -> VmResult<()> {
        let mut counter = ItemCounter::new();
        self.invocation_stack.count_items(&mut counter);
        counter.add_all(self.result_stack.iter());
        let size = counter.count();
        if size > self.limits.max_stack_size {
            return Err(VmError::StackOverflow {
                size,
                limit: self.limits.max_stack_size,
            });
        }
        Ok(())
    }

    pub(crate) fn halt(&mut self) {
        self.state = VMState::Halt;
        info!(
            gas = self.gas.consumed(),
            results = self.result_stack.len(),
            writes = self.storage.changes().len(),
            "HALT"
        );
    }

    fn fault(&mut self, err: VmError) {
        let thrown = self
            .invocation_stack
            .current()
            .map(ExecutionContext::has_pending_exception)
            .unwrap_or(false);
        self.fault_location = self.cursor;
        warn!(
            code = err.code(),
            error = %err,
            location = ?self.fault_location,
            thrown,
            gas = self.gas.consumed(),
            "FAULT"
        );
        self.state = VMState::Fault;
        self.invocation_stack.clear();
        self.result_stack.clear();
        self.notifications.clear();
        self.storage.discard();
        self.last_error = Some(err);
    }

    // ===== Frame access used by opcodes and interop handlers =====

    pub fn current_context(&self) -> VmResult<&ExecutionContext> {
        self.invocation_stack.current()
    }

    pub fn current_context_mut(&mut self) -> VmResult<&mut ExecutionContext> {
        self.invocation_stack.current_mut()
    }

    pub fn invocation_stack(&self) -> &InvocationStack {
        &self.invocation_stack
    }

    pub(crate) fn invocation_stack_mut(&mut self) -> &mut InvocationStack {
        &mut self.invocation_stack
    }

    pub(crate) fn result_stack_mut(&mut self) -> &mut Vec<StackItem> {
        &mut self.result_stack
    }

    pub fn push(&mut self, item: StackItem) -> VmResult<()> {
        self.current_context_mut()?.push(item);
        Ok(())
    }

    pub fn pop(&mut self) -> VmResult<StackItem> {
        self.current_context_mut()?.pop()
    }

    pub fn peek(&self, n: usize) -> VmResult<&StackItem> {
        self.current_context()?.peek(n)
    }

    pub fn pop_bytes(&mut self) -> VmResult<Vec<u8>> {
        Ok(self.pop()?.as_bytes()?.to_vec())
    }

    pub fn pop_bool(&mut self) -> VmResult<bool> {
        Ok(self.pop()?.as_bool())
    }

    pub fn pop_integer(&mut self) -> VmResult<BigInt> {
        self.pop()?.as_integer()
    }

    /// Pops a non-negative integer usable as an index or count.
    pub fn pop_index(&mut self) -> VmResult<usize> {
        let value = self.pop_integer()?;
        usize::try_from(&value).map_err(|_| VmError::IndexOutOfRange {
            index: i64::try_from(&value).unwrap_or(i64::MIN),
            len: 0,
        })
    }

    /// Pushes an arithmetic result, refusing results wider than the integer limit.
    pub fn push_integer(&mut self, value: BigInt) -> VmResult<()> {
        if integer_to_bytes(&value).len() > Config::MAX_INTEGER_SIZE {
            return Err(VmError::IntegerOverflow {
                limit: Config::MAX_INTEGER_SIZE,
            });
        }
        self.push(StackItem::Integer(value))
    }

    // ===== Collaborators and side channels =====

    pub fn trigger(&self) -> TriggerType {
        self.trigger
    }

    pub fn container(&self) -> Option<&Arc<Transaction>> {
        self.container.as_ref()
    }

    pub fn persisting_block(&self) -> Option<&Arc<Block>> {
        self.persisting_block.as_ref()
    }

    pub fn blockchain(&self) -> Arc<dyn Blockchain> {
        Arc::clone(&self.host.blockchain)
    }

    pub fn crypto(&self) -> Arc<dyn Crypto> {
        Arc::clone(&self.host.crypto)
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn storage(&self) -> &StorageCache {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut StorageCache {
        &mut self.storage
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    pub fn gas_schedule(&self) -> &GasSchedule {
        &self.schedule
    }

    pub fn notify(&mut self, script_hash: UInt160, state: StackItem) {
        debug!(script = %script_hash, state = %state.to_json(), "notify");
        self.notifications.push(Notification { script_hash, state });
    }

    pub fn log(&mut self, script_hash: UInt160, message: String) {
        info!(script = %script_hash, %message, "runtime log");
        self.logs.push(LogEntry {
            script_hash,
            message,
        });
    }

    // ===== Results =====

    pub fn state(&self) -> VMState {
        self.state
    }

    pub fn result_stack(&self) -> &[StackItem] {
        &self.result_stack
    }

    pub fn gas_consumed(&self) -> u64 {
        self.gas.consumed()
    }

    pub fn gas_remaining(&self) -> u64 {
        self.gas.remaining()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn last_error(&self) -> Option<&VmError> {
        self.last_error.as_ref()
    }

    /// Script hash and instruction offset of the instruction that faulted.
    pub fn fault_location(&self) -> Option<(UInt160, usize)> {
        self.fault_location
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Consumes the engine. Storage writes survive only a HALT.
    pub fn into_outcome(self) -> ExecutionOutcome {
        let changes = if self.state == VMState::Halt {
            self.storage.into_changes()
        } else {
            ChangeSet::default()
        };
        ExecutionOutcome {
            state: self.state,
            result_stack: self.result_stack,
            gas_consumed: self.gas.consumed(),
            notifications: self.notifications,
            logs: self.logs,
            error: self.last_error,
            changes,
        }
    }

    /// Applies the buffered storage writes of a halted engine to the store.
    pub fn commit(self) -> VmResult<usize> {
        if self.state != VMState::Halt {
            return Err(VmError::InvalidOperation("only a halted engine can commit"));
        }
        let written = self.storage.commit()?;
        info!(written, "storage committed");
        Ok(written)
    }
}
