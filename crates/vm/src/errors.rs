use state::LedgerError;
use storage::StorageError;
use thiserror::Error;

/// A coercion asked a stack item for a shape it does not have.
///
/// Every variant names the shape that was expected, never the one that was
/// found, so two nodes rejecting the same script report the same error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidValue {
    #[error("Invalid Value. Expected Array")]
    Array,
    #[error("Invalid Value. Expected Buffer")]
    Buffer,
    #[error("Invalid Value. Expected Integer")]
    Integer,
    #[error("Invalid Value. Expected Boolean")]
    Boolean,
    #[error("Invalid Value. Expected Map")]
    Map,
    #[error("Invalid Value. Expected Struct")]
    Struct,
    #[error("Invalid Value. Expected Interface")]
    Interface,
    #[error("Invalid Value. Expected Header")]
    Header,
    #[error("Invalid Value. Expected Block")]
    Block,
    #[error("Invalid Value. Expected BlockBase")]
    BlockBase,
    #[error("Invalid Value. Expected Transaction")]
    Transaction,
    #[error("Invalid Value. Expected Attribute")]
    Attribute,
    #[error("Invalid Value. Expected AttributeStackItem")]
    AttributeStackItem,
    #[error("Invalid Value. Expected Input")]
    Input,
    #[error("Invalid Value. Expected Output")]
    Output,
    #[error("Invalid Value. Expected Account")]
    Account,
    #[error("Invalid Value. Expected Asset")]
    Asset,
    #[error("Invalid Value. Expected Contract")]
    Contract,
    #[error("Invalid Value. Expected Validator")]
    Validator,
    #[error("Invalid Value. Expected StorageContextStackItem")]
    StorageContext,
}

impl InvalidValue {
    pub fn code(&self) -> &'static str {
        match self {
            InvalidValue::Array => "INVALID_VALUE_ARRAY",
            InvalidValue::Buffer => "INVALID_VALUE_BUFFER",
            InvalidValue::Integer => "INVALID_VALUE_INTEGER",
            InvalidValue::Boolean => "INVALID_VALUE_BOOLEAN",
            InvalidValue::Map => "INVALID_VALUE_MAP",
            InvalidValue::Struct => "INVALID_VALUE_STRUCT",
            InvalidValue::Interface => "INVALID_VALUE_INTERFACE",
            InvalidValue::Header => "INVALID_VALUE_HEADER",
            InvalidValue::Block => "INVALID_VALUE_BLOCK",
            InvalidValue::BlockBase => "INVALID_VALUE_BLOCK_BASE",
            InvalidValue::Transaction => "INVALID_VALUE_TRANSACTION",
            InvalidValue::Attribute => "INVALID_VALUE_ATTRIBUTE",
            InvalidValue::AttributeStackItem => "INVALID_VALUE_ATTRIBUTE_STACK_ITEM",
            InvalidValue::Input => "INVALID_VALUE_INPUT",
            InvalidValue::Output => "INVALID_VALUE_OUTPUT",
            InvalidValue::Account => "INVALID_VALUE_ACCOUNT",
            InvalidValue::Asset => "INVALID_VALUE_ASSET",
            InvalidValue::Contract => "INVALID_VALUE_CONTRACT",
            InvalidValue::Validator => "INVALID_VALUE_VALIDATOR",
            InvalidValue::StorageContext => "INVALID_VALUE_STORAGE_CONTEXT_STACK_ITEM",
        }
    }
}

/// Everything that can fault an engine.
///
/// Errors never escape `ExecutionEngine::execute`; the engine records the
/// first one in `last_error()` and moves to `VMState::Fault`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error(transparent)]
    InvalidValue(#[from] InvalidValue),

    #[error("evaluation stack underflow")]
    StackUnderflow,
    #[error("stack size {size} exceeds limit {limit}")]
    StackOverflow { size: usize, limit: usize },
    #[error("invocation depth exceeds limit {limit}")]
    InvocationDepthExceeded { limit: usize },
    #[error("no execution context")]
    NoContext,

    #[error("unknown opcode 0x{opcode:02x} at {position}")]
    UnknownOpcode { opcode: u8, position: usize },
    #[error("operand of opcode 0x{opcode:02x} at {position} is truncated")]
    TruncatedOperand { opcode: u8, position: usize },
    #[error("jump target {target} outside script of length {len}")]
    InvalidJump { target: i64, len: usize },

    #[error("insufficient gas: price {price}, remaining {remaining}")]
    InsufficientGas { price: u64, remaining: u64 },
    #[error("step limit of {limit} reached")]
    StepLimitExceeded { limit: u64 },

    #[error("unknown interop service 0x{0:08x}")]
    UnknownInterop(u32),
    #[error("interop name is not valid ascii")]
    InvalidInteropName,

    #[error("integer exceeds {limit} bytes")]
    IntegerOverflow { limit: usize },
    #[error("shift {shift} outside [-{limit}, {limit}]")]
    ShiftOutOfRange { shift: i64, limit: i64 },
    #[error("division by zero")]
    DivisionByZero,
    #[error("item of {size} bytes exceeds limit {limit}")]
    ItemTooLarge { size: usize, limit: usize },
    #[error("array of {size} items exceeds limit {limit}")]
    ArrayTooLarge { size: usize, limit: usize },
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("slot index {index} out of range for slot of size {len}")]
    SlotOutOfRange { index: usize, len: usize },
    #[error("slot is not initialized")]
    SlotNotInitialized,
    #[error("map key must be a primitive item")]
    InvalidMapKey,
    #[error("key not found in map")]
    KeyNotFound,

    #[error("contract {0} not found")]
    ContractNotFound(String),
    #[error("script threw an exception")]
    Throw,
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl VmError {
    /// Stable identifier reported in receipts and logs.
    pub fn code(&self) -> &'static str {
        match self {
            VmError::InvalidValue(inner) => inner.code(),
            VmError::StackUnderflow => "STACK_UNDERFLOW",
            VmError::StackOverflow { .. } => "STACK_OVERFLOW",
            VmError::InvocationDepthExceeded { .. } => "INVOCATION_DEPTH_EXCEEDED",
            VmError::NoContext => "NO_CONTEXT",
            VmError::UnknownOpcode { .. } => "UNKNOWN_OPCODE",
            VmError::TruncatedOperand { .. } => "TRUNCATED_OPERAND",
            VmError::InvalidJump { .. } => "INVALID_JUMP",
            VmError::InsufficientGas { .. } => "INSUFFICIENT_GAS",
            VmError::StepLimitExceeded { .. } => "STEP_LIMIT_EXCEEDED",
            VmError::UnknownInterop(_) => "UNKNOWN_INTEROP",
            VmError::InvalidInteropName => "INVALID_INTEROP_NAME",
            VmError::IntegerOverflow { .. } => "INTEGER_OVERFLOW",
            VmError::ShiftOutOfRange { .. } => "SHIFT_OUT_OF_RANGE",
            VmError::DivisionByZero => "DIVISION_BY_ZERO",
            VmError::ItemTooLarge { .. } => "ITEM_TOO_LARGE",
            VmError::ArrayTooLarge { .. } => "ARRAY_TOO_LARGE",
            VmError::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            VmError::SlotOutOfRange { .. } => "SLOT_OUT_OF_RANGE",
            VmError::SlotNotInitialized => "SLOT_NOT_INITIALIZED",
            VmError::InvalidMapKey => "INVALID_MAP_KEY",
            VmError::KeyNotFound => "KEY_NOT_FOUND",
            VmError::ContractNotFound(_) => "CONTRACT_NOT_FOUND",
            VmError::Throw => "THROW",
            VmError::InvalidOperation(_) => "INVALID_OPERATION",
            VmError::Ledger(inner) => inner.code(),
            VmError::Storage(inner) => inner.code(),
        }
    }
}

pub type VmResult<T> = Result<T, VmError>;
