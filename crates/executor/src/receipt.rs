use core::fmt;

use serde::Serialize;
use serde_json::Value;
use types::UInt256;
use vm::{ExecutionOutcome, LogEntry, Notification, VMState};

/// Event raised by a script, in a form that can leave the engine thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRecord {
    pub script_hash: String,
    pub state: Value,
}

impl From<&Notification> for NotificationRecord {
    fn from(notification: &Notification) -> Self {
        Self {
            script_hash: notification.script_hash.to_string(),
            state: notification.state.to_json(),
        }
    }
}

/// Represents the result of executing one script container.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionReceipt {
    /// Hash of the transaction, zero for a bare script.
    pub tx_hash: String,

    pub state: VMState,

    /// Gas used by this invocation alone, in 0.001 GAS units.
    pub gas_consumed: u64,

    /// Result stack, bottom first.
    pub stack: Vec<Value>,

    pub notifications: Vec<NotificationRecord>,

    pub logs: Vec<String>,

    /// Stable error code when the invocation faulted.
    pub error_code: Option<String>,
    pub error: Option<String>,

    /// Storage entries written on behalf of this invocation.
    pub storage_writes: usize,
}

impl TransactionReceipt {
    /// Builds a receipt from the outcome of an engine. Stack items are
    /// rendered to JSON here because they cannot cross threads.
    pub fn new(tx_hash: UInt256, outcome: &ExecutionOutcome) -> Self {
        TransactionReceipt {
            tx_hash: tx_hash.to_string(),
            state: outcome.state,
            gas_consumed: outcome.gas_consumed,
            stack: outcome.result_stack.iter().map(|item| item.to_json()).collect(),
            notifications: outcome.notifications.iter().map(NotificationRecord::from).collect(),
            logs: outcome.logs.iter().map(format_log).collect(),
            error_code: outcome.error.as_ref().map(|err| err.code().to_string()),
            error: outcome.error.as_ref().map(|err| err.to_string()),
            storage_writes: outcome.changes.len(),
        }
    }

    pub fn is_halt(&self) -> bool {
        self.state == VMState::Halt
    }

    /// Top of the result stack.
    pub fn top(&self) -> Option<&Value> {
        self.stack.last()
    }
}

fn format_log(entry: &LogEntry) -> String {
    format!("{}: {}", entry.script_hash, entry.message)
}

impl fmt::Display for TransactionReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Transaction Receipt ===")?;
        writeln!(f, "Tx: {}", self.tx_hash)?;
        writeln!(f, "State: {:?}", self.state)?;
        writeln!(f, "Gas: {}", self.gas_consumed)?;
        if let Some(code) = &self.error_code {
            writeln!(f, "Error: {} ({})", code, self.error.as_deref().unwrap_or(""))?;
        }
        writeln!(f, "Stack:")?;
        for (i, item) in self.stack.iter().enumerate() {
            writeln!(f, "  [{}] {}", i, item)?;
        }
        writeln!(f, "Notifications:")?;
        for (i, event) in self.notifications.iter().enumerate() {
            writeln!(f, "  [{}] {} {}", i, event.script_hash, event.state)?;
        }
        writeln!(f, "Logs:")?;
        for (i, line) in self.logs.iter().enumerate() {
            writeln!(f, "  [{}] {}", i, line)?;
        }
        writeln!(f, "Storage writes: {}", self.storage_writes)?;

        Ok(())
    }
}

/// Receipts of every invocation transaction in a block, in block order.
#[derive(Debug, Clone, Serialize)]
pub struct BlockReceipt {
    pub block_hash: String,
    pub index: u32,
    pub receipts: Vec<TransactionReceipt>,
    /// Storage entries applied to the store once the block was validated.
    pub committed: usize,
}

impl BlockReceipt {
    pub fn gas_consumed(&self) -> u64 {
        self.receipts.iter().map(|r| r.gas_consumed).sum()
    }

    pub fn halted(&self) -> usize {
        self.receipts.iter().filter(|r| r.is_halt()).count()
    }
}

impl fmt::Display for BlockReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Block {} ({}) ===", self.index, self.block_hash)?;
        writeln!(
            f,
            "Invocations: {} ({} halted), gas {}, committed {}",
            self.receipts.len(),
            self.halted(),
            self.gas_consumed(),
            self.committed
        )?;
        for receipt in &self.receipts {
            write!(f, "{}", receipt)?;
        }
        Ok(())
    }
}

/// Hash reported for scripts run without a transaction.
pub(crate) fn bare_script_hash() -> UInt256 {
    UInt256::zero()
}
