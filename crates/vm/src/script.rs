use std::rc::Rc;
use std::sync::Arc;

use num_bigint::BigInt;
use types::{Transaction, UInt160};

use crate::interop::interop_hash;
use crate::opcode;
use crate::stack_item::{integer_to_bytes, StackItem};

/// Bytecode plus the hash that identifies it.
///
/// Frames of the same script share the bytes through an `Rc`, so an
/// intra-script `CALL` never copies code.
#[derive(Debug, Clone)]
pub struct Script {
    bytes: Rc<[u8]>,
    hash: UInt160,
}

impl Script {
    pub fn new(bytes: impl Into<Rc<[u8]>>, hash: UInt160) -> Self {
        Self {
            bytes: bytes.into(),
            hash,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn hash(&self) -> UInt160 {
        self.hash
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What an engine is asked to run: the entry script, where to start in it,
/// its arguments, and the transaction (if any) it runs on behalf of.
#[derive(Debug, Clone, Default)]
pub struct ScriptContainer {
    pub transaction: Option<Arc<Transaction>>,
    pub script: Vec<u8>,
    pub entry_ip: usize,
    /// Pushed onto the outermost frame so the first argument ends on top.
    pub arguments: Vec<StackItem>,
}

impl ScriptContainer {
    pub fn new(script: Vec<u8>) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    /// Runs the transaction's own invocation script.
    pub fn for_transaction(tx: Arc<Transaction>) -> Self {
        Self {
            script: tx.script.clone(),
            transaction: Some(tx),
            ..Default::default()
        }
    }

    pub fn with_transaction(mut self, tx: Arc<Transaction>) -> Self {
        self.transaction = Some(tx);
        self
    }

    pub fn with_arguments(mut self, arguments: Vec<StackItem>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_entry_ip(mut self, entry_ip: usize) -> Self {
        self.entry_ip = entry_ip;
        self
    }
}

/// Emits bytecode. Used by tests and the `vm-run` tool to assemble scripts
/// without hand-writing opcode bytes.
#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    code: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn emit(&mut self, op: u8) -> &mut Self {
        self.code.push(op);
        self
    }

    pub fn emit_with(&mut self, op: u8, operand: &[u8]) -> &mut Self {
        self.code.push(op);
        self.code.extend_from_slice(operand);
        self
    }

    pub fn emit_push_int(&mut self, value: impl Into<BigInt>) -> &mut Self {
        let value = value.into();
        if value == BigInt::from(-1) {
            return self.emit(opcode::PUSHM1);
        }
        if value == BigInt::from(0) {
            return self.emit(opcode::PUSH0);
        }
        if value > BigInt::from(0) && value <= BigInt::from(16) {
            let small = u8::try_from(&value).unwrap_or(1);
            return self.emit(opcode::PUSH1 - 1 + small);
        }
        self.emit_push_bytes(&integer_to_bytes(&value))
    }

    pub fn emit_push_bool(&mut self, value: bool) -> &mut Self {
        if value {
            self.emit(opcode::PUSH1)
        } else {
            self.emit(opcode::PUSH0)
        }
    }

    pub fn emit_push_bytes(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        if len == 0 {
            self.emit(opcode::PUSH0);
        } else if len <= opcode::PUSHBYTES75 as usize {
            self.emit_with(len as u8, data);
        } else if len <= u8::MAX as usize {
            self.emit_with(opcode::PUSHDATA1, &[len as u8]);
            self.code.extend_from_slice(data);
        } else if len <= u16::MAX as usize {
            self.emit_with(opcode::PUSHDATA2, &(len as u16).to_le_bytes());
            self.code.extend_from_slice(data);
        } else {
            self.emit_with(opcode::PUSHDATA4, &(len as u32).to_le_bytes());
            self.code.extend_from_slice(data);
        }
        self
    }

    /// `JMP`-family or `CALL` with an offset relative to this opcode.
    pub fn emit_jump(&mut self, op: u8, offset: i16) -> &mut Self {
        self.emit_with(op, &offset.to_le_bytes())
    }

    pub fn emit_syscall(&mut self, name: &str) -> &mut Self {
        self.emit_with(opcode::SYSCALL, &[name.len() as u8]);
        self.code.extend_from_slice(name.as_bytes());
        self
    }

    /// SYSCALL in its compact four-byte form.
    pub fn emit_syscall_hash(&mut self, name: &str) -> &mut Self {
        self.emit_with(opcode::SYSCALL, &[4]);
        self.code
            .extend_from_slice(&interop_hash(name.as_bytes()).to_le_bytes());
        self
    }

    pub fn emit_app_call(&mut self, hash: UInt160, tail: bool) -> &mut Self {
        let op = if tail { opcode::TAILCALL } else { opcode::APPCALL };
        self.emit_with(op, &hash.0)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.code.clone()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.code
    }
}
