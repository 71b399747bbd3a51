pub mod decoder;
pub mod engine;
pub mod errors;
mod exe;
pub mod execution_context;
pub mod global;
pub mod host_interface;
pub mod instruction;
pub mod interop;
pub mod invocation_stack;
pub mod metering;
pub mod opcode;
pub mod script;
pub mod stack_item;

pub use engine::{
    ExecutionEngine, ExecutionOutcome, LogEntry, Notification, TriggerType, VMState,
};
pub use errors::{InvalidValue, VmError, VmResult};
pub use global::{Config, ExecutionLimits};
pub use host_interface::{Crypto, DefaultCrypto, Host};
pub use instruction::Instruction;
pub use interop::{interop_hash, InteropPrice, InteropRegistry};
pub use metering::{GasMeter, GasSchedule};
pub use script::{Script, ScriptBuilder, ScriptContainer};
pub use stack_item::{InteropInterface, MapKey, StackItem};
