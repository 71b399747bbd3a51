use std::sync::Arc;

use rayon::prelude::*;
use storage::ChangeSet;
use tracing::{debug, info};
use types::{Block, Transaction, TransactionType, UInt256};
use vm::{
    ExecutionEngine, ExecutionLimits, Host, ScriptContainer, TriggerType, VMState,
};

use crate::config::ExecutorConfig;
use crate::error::{ExecutorError, ExecutorResult};
use crate::receipt::{bare_script_hash, BlockReceipt, TransactionReceipt};

/// A finished invocation whose storage writes have not been applied yet.
struct Execution {
    receipt: TransactionReceipt,
    changes: ChangeSet,
}

/// Runs script containers against the ledger and applies what they write.
///
/// EDUCATIONAL PURPOSE: This is the layer between the node and the VM. The VM
/// knows how to run one script; the executor decides which scripts run, with
/// which gas budget, and when their storage writes become visible.
///
/// TRANSACTION FLOW:
/// 1. Only invocation transactions carry a script; anything else is rejected.
/// 2. Gas budget = the free allowance from the config + the system fee the
///    transaction paid (`tx.gas`).
/// 3. A fresh engine runs the script to HALT or FAULT.
/// 4. A HALT commits the engine's buffered writes as one change set. A FAULT
///    drops them, so a failing script never leaves partial state behind.
///
/// BLOCK VALIDATION:
/// Every invocation in a block runs in its own engine, in parallel when the
/// config allows it. All of them read the store as it was when the block
/// started because nothing is committed until every engine is done. The
/// change sets are then applied one by one in block order, so every node ends
/// with the same store whatever the thread scheduling was.
#[derive(Debug, Clone)]
pub struct Executor {
    config: ExecutorConfig,
    host: Host,
}

impl Executor {
    pub fn new(config: ExecutorConfig, host: Host) -> Self {
        Self { config, host }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Executes an invocation transaction and commits its writes if it halts.
    pub fn run_tx(&self, tx: Arc<Transaction>) -> ExecutorResult<TransactionReceipt> {
        ensure_invocation(&tx)?;
        let limits = self.limits_for(&tx);
        let hash = tx.hash;
        let execution = self.execute(
            TriggerType::Application,
            ScriptContainer::for_transaction(tx),
            hash,
            limits,
            None,
        )?;
        self.commit(execution)
    }

    /// Executes an arbitrary container under the application trigger. Without
    /// a transaction the receipt carries the zero hash and the configured gas
    /// limit applies as is.
    pub fn run_script(&self, container: ScriptContainer) -> ExecutorResult<TransactionReceipt> {
        let (hash, limits) = match &container.transaction {
            Some(tx) => (tx.hash, self.limits_for(tx)),
            None => (bare_script_hash(), self.config.limits),
        };
        let execution = self.execute(TriggerType::Application, container, hash, limits, None)?;
        self.commit(execution)
    }

    /// Runs a verification script. It passes when it halts leaving exactly one
    /// item, and that item is true. Nothing is ever committed.
    pub fn verify(&self, container: ScriptContainer) -> ExecutorResult<bool> {
        let hash = container
            .transaction
            .as_ref()
            .map_or_else(bare_script_hash, |tx| tx.hash);
        let mut engine = self.engine(TriggerType::Verification, self.config.limits, None);
        engine.load_container(container)?;
        let state = engine.execute();
        let passed = state == VMState::Halt
            && matches!(engine.result_stack(), [result] if result.as_bool());
        debug!(tx = %hash, ?state, passed, "verification finished");
        Ok(passed)
    }

    /// Executes every invocation transaction of `block` and commits the
    /// writes of those that halted, in block order.
    ///
    /// The block is applied as one change set: if any invocation cannot be
    /// set up or the store rejects the commit, the store is left untouched.
    pub fn validate_block(&self, block: Arc<Block>) -> ExecutorResult<BlockReceipt> {
        let invocations: Vec<&Arc<Transaction>> = block
            .transactions
            .iter()
            .filter(|tx| tx.tx_type == TransactionType::Invocation)
            .collect();

        let run = |tx: &&Arc<Transaction>| {
            self.execute(
                TriggerType::Application,
                ScriptContainer::for_transaction(Arc::clone(tx)),
                tx.hash,
                self.limits_for(tx),
                Some(Arc::clone(&block)),
            )
        };
        let results: Vec<ExecutorResult<Execution>> = if self.config.parallel {
            invocations.par_iter().map(run).collect()
        } else {
            invocations.iter().map(run).collect()
        };

        let executions = results.into_iter().collect::<ExecutorResult<Vec<_>>>()?;

        // Apply results sequentially for determinism
        let mut receipts = Vec::with_capacity(executions.len());
        let mut changes = ChangeSet::default();
        let mut committed = 0;
        for Execution { receipt, changes: tx_changes } in executions {
            committed += tx_changes.len();
            changes.merge(tx_changes);
            receipts.push(receipt);
        }
        if !changes.is_empty() {
            self.host.store.commit(changes)?;
        }

        let receipt = BlockReceipt {
            block_hash: block.hash().to_string(),
            index: block.index(),
            receipts,
            committed,
        };
        info!(
            index = receipt.index,
            invocations = receipt.receipts.len(),
            halted = receipt.halted(),
            gas = receipt.gas_consumed(),
            committed,
            "block validated"
        );
        Ok(receipt)
    }

    fn limits_for(&self, tx: &Transaction) -> ExecutionLimits {
        let paid = u64::try_from(tx.gas).unwrap_or(0);
        let limits = self.config.limits;
        limits.with_gas_limit(limits.gas_limit.saturating_add(paid))
    }

    fn engine(
        &self,
        trigger: TriggerType,
        limits: ExecutionLimits,
        block: Option<Arc<Block>>,
    ) -> ExecutionEngine {
        let engine = ExecutionEngine::new(trigger, &self.host, limits)
            .with_gas_schedule(self.config.gas);
        match block {
            Some(block) => engine.with_persisting_block(block),
            None => engine,
        }
    }

    fn execute(
        &self,
        trigger: TriggerType,
        container: ScriptContainer,
        hash: UInt256,
        limits: ExecutionLimits,
        block: Option<Arc<Block>>,
    ) -> ExecutorResult<Execution> {
        let mut engine = self.engine(trigger, limits, block);
        engine.load_container(container)?;
        let state = engine.execute();
        let outcome = engine.into_outcome();
        debug!(tx = %hash, ?state, gas = outcome.gas_consumed, "invocation finished");

        let receipt = TransactionReceipt::new(hash, &outcome);
        Ok(Execution {
            receipt,
            changes: outcome.changes,
        })
    }

    fn commit(&self, execution: Execution) -> ExecutorResult<TransactionReceipt> {
        let Execution { receipt, changes } = execution;
        if !changes.is_empty() {
            self.host.store.commit(changes)?;
        }
        Ok(receipt)
    }
}

fn ensure_invocation(tx: &Transaction) -> ExecutorResult<()> {
    if tx.tx_type != TransactionType::Invocation {
        return Err(ExecutorError::NotInvocation(tx.hash));
    }
    Ok(())
}
