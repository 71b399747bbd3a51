use std::sync::Arc;

use state::Blockchain;
use storage::Store;
use tracing::{info, warn};
use types::{Block, Transaction};
use vm::{Host, ScriptContainer};

use crate::config::ExecutorConfig;
use crate::error::{ExecutorError, ExecutorResult};
use crate::executor::Executor;
use crate::receipt::{BlockReceipt, TransactionReceipt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Running,
    Stopped,
}

/// Owns the executor and the storage backend for the lifetime of a node.
///
/// The store is released exactly once: by `stop`, or when the node is dropped
/// while still running.
#[derive(Debug)]
pub struct Node {
    state: NodeState,
    executor: Executor,
}

impl Node {
    pub fn open(
        config: ExecutorConfig,
        blockchain: Arc<dyn Blockchain>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self::with_host(config, Host::new(blockchain, store))
    }

    pub fn with_host(config: ExecutorConfig, host: Host) -> Self {
        info!(parallel = config.parallel, gas_limit = config.limits.gas_limit, "node started");
        Self {
            state: NodeState::Running,
            executor: Executor::new(config, host),
        }
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn executor(&self) -> ExecutorResult<&Executor> {
        match self.state {
            NodeState::Running => Ok(&self.executor),
            NodeState::Stopped => Err(ExecutorError::NodeStopped),
        }
    }

    pub fn run_tx(&self, tx: Arc<Transaction>) -> ExecutorResult<TransactionReceipt> {
        self.executor()?.run_tx(tx)
    }

    pub fn run_script(&self, container: ScriptContainer) -> ExecutorResult<TransactionReceipt> {
        self.executor()?.run_script(container)
    }

    pub fn validate_block(&self, block: Arc<Block>) -> ExecutorResult<BlockReceipt> {
        self.executor()?.validate_block(block)
    }

    /// Closes the store. Stopping a stopped node does nothing.
    pub fn stop(&mut self) -> ExecutorResult<()> {
        if self.state == NodeState::Stopped {
            return Ok(());
        }
        self.state = NodeState::Stopped;
        self.executor.host().store.close()?;
        info!("node stopped");
        Ok(())
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(code = err.code(), %err, "closing store on drop failed");
        }
    }
}
