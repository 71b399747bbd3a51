use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;
use types::{Transaction, UInt160};

use crate::engine::ExecutionEngine;
use crate::errors::{VmError, VmResult};
use crate::global::Config;
use crate::interop::{InteropPrice, InteropRegistry};
use crate::stack_item::{InteropInterface, StackItem};

const CHECK_WITNESS_PRICE: u64 = 200;

pub(crate) fn register(registry: &mut InteropRegistry) {
    let default = InteropPrice::Fixed(1);
    registry.register("Neo.Runtime.GetTrigger", default, get_trigger);
    registry.register(
        "Neo.Runtime.CheckWitness",
        InteropPrice::Fixed(CHECK_WITNESS_PRICE),
        check_witness,
    );
    registry.register("Neo.Runtime.Notify", default, notify);
    registry.register("Neo.Runtime.Log", default, log);
    registry.register("Neo.Runtime.GetTime", default, get_time);

    registry.register(
        "System.ExecutionEngine.GetScriptContainer",
        default,
        get_script_container,
    );
    registry.register(
        "System.ExecutionEngine.GetExecutingScriptHash",
        default,
        get_executing_script_hash,
    );
    registry.register(
        "System.ExecutionEngine.GetCallingScriptHash",
        default,
        get_calling_script_hash,
    );
    registry.register(
        "System.ExecutionEngine.GetEntryScriptHash",
        default,
        get_entry_script_hash,
    );
}

fn get_trigger(engine: &mut ExecutionEngine) -> VmResult<()> {
    let trigger = engine.trigger() as i64;
    engine.push(StackItem::from(trigger))
}

/// Pushes whether the given hash (or the hash of the given public key's
/// signature script) must witness the current transaction.
fn check_witness(engine: &mut ExecutionEngine) -> VmResult<()> {
    let bytes = engine.pop_bytes()?;
    let hash = match bytes.len() {
        20 => UInt160::from_slice(&bytes)
            .ok_or(VmError::InvalidOperation("expected a 20-byte hash"))?,
        33 => {
            let mut script = Vec::with_capacity(35);
            script.push(0x21);
            script.extend_from_slice(&bytes);
            script.push(0xAC);
            engine.crypto().hash160(&script)
        }
        _ => return Err(VmError::InvalidOperation("witness must be a hash or a public key")),
    };
    let tx = engine
        .container()
        .cloned()
        .ok_or(VmError::InvalidOperation("no script container"))?;
    let witnessed = script_hashes_for_verifying(engine, &tx)?.contains(&hash);
    debug!(%hash, witnessed, "check witness");
    engine.push(StackItem::from(witnessed))
}

/// Hashes that must sign `tx`: those named by `Script` attributes plus the
/// owners of the outputs it spends.
pub(crate) fn script_hashes_for_verifying(
    engine: &ExecutionEngine,
    tx: &Transaction,
) -> VmResult<BTreeSet<UInt160>> {
    let mut hashes: BTreeSet<UInt160> = tx.attribute_script_hashes().collect();
    let ledger = engine.blockchain();
    for input in &tx.inputs {
        let (prev, _) = ledger
            .transaction(&input.prev_hash)?
            .ok_or(VmError::InvalidOperation("referenced transaction not found"))?;
        let output = prev
            .outputs
            .get(input.prev_index as usize)
            .ok_or(VmError::InvalidOperation("referenced output not found"))?;
        hashes.insert(output.script_hash);
    }
    Ok(hashes)
}

fn notify(engine: &mut ExecutionEngine) -> VmResult<()> {
    let state = engine.pop()?;
    let script_hash = engine.current_context()?.script_hash();
    engine.notify(script_hash, state);
    Ok(())
}

fn log(engine: &mut ExecutionEngine) -> VmResult<()> {
    let message = engine.pop_bytes()?;
    let script_hash = engine.current_context()?.script_hash();
    engine.log(script_hash, String::from_utf8_lossy(&message).into_owned());
    Ok(())
}

/// Timestamp of the block being persisted, or an estimate one block after
/// the current tip when nothing is being persisted.
fn get_time(engine: &mut ExecutionEngine) -> VmResult<()> {
    let time = match engine.persisting_block() {
        Some(block) => block.header.timestamp,
        None => {
            let ledger = engine.blockchain();
            let tip = ledger.current_block()?;
            tip.header.timestamp.saturating_add(Config::SECONDS_PER_BLOCK)
        }
    };
    engine.push(StackItem::from(time))
}

fn get_script_container(engine: &mut ExecutionEngine) -> VmResult<()> {
    let tx = engine
        .container()
        .map(Arc::clone)
        .ok_or(VmError::InvalidOperation("no script container"))?;
    engine.push(StackItem::from(InteropInterface::Transaction(tx)))
}

fn get_executing_script_hash(engine: &mut ExecutionEngine) -> VmResult<()> {
    let hash = engine.current_context()?.script_hash();
    engine.push(StackItem::from(hash.as_bytes()))
}

fn get_calling_script_hash(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = match engine.invocation_stack().calling() {
        Some(ctx) => StackItem::from(ctx.script_hash().as_bytes()),
        None => StackItem::empty_bytes(),
    };
    engine.push(item)
}

fn get_entry_script_hash(engine: &mut ExecutionEngine) -> VmResult<()> {
    let hash = engine
        .invocation_stack()
        .entry()
        .map(|ctx| ctx.script_hash())
        .ok_or(VmError::NoContext)?;
    engine.push(StackItem::from(hash.as_bytes()))
}
