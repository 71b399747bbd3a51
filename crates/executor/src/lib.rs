// external
pub extern crate hex;

// exports
pub mod config;
pub mod error;
pub mod executor;
pub mod node;
pub mod receipt;

pub use config::ExecutorConfig;
pub use error::{ExecutorError, ExecutorResult};
pub use executor::Executor;
pub use node::{Node, NodeState};
pub use receipt::{BlockReceipt, NotificationRecord, TransactionReceipt};
