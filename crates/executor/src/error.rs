use state::LedgerError;
use storage::StorageError;
use thiserror::Error;
use types::UInt256;
use vm::VmError;

/// Failures of the executor itself. A script that FAULTs is not one of them:
/// its outcome is reported in the receipt.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Vm(#[from] VmError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("transaction {0} carries no script")]
    NotInvocation(UInt256),
    #[error("node is stopped")]
    NodeStopped,

    #[error("unable to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse config: {0}")]
    Config(#[from] toml::de::Error),
}

impl ExecutorError {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorError::Vm(err) => err.code(),
            ExecutorError::Storage(err) => err.code(),
            ExecutorError::Ledger(err) => err.code(),
            ExecutorError::NotInvocation(_) => "NOT_INVOCATION",
            ExecutorError::NodeStopped => "NODE_STOPPED",
            ExecutorError::Io(_) => "CONFIG_IO",
            ExecutorError::Config(_) => "CONFIG_PARSE",
        }
    }
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
