//! Contract storage services.
//!
//! Reads go through the engine's [`storage::StorageCache`], so a contract
//! sees its own pending writes. Writes stay buffered in that cache until the
//! engine HALTs and the caller commits it.

use std::sync::Arc;

use tracing::debug;
use types::StorageContext;

use crate::engine::{ExecutionEngine, TriggerType};
use crate::errors::{VmError, VmResult};
use crate::global::Config;
use crate::interop::{InteropPrice, InteropRegistry};
use crate::stack_item::{InteropInterface, StackItem};

pub(crate) fn register(registry: &mut InteropRegistry) {
    let default = InteropPrice::Fixed(1);
    registry.register("Neo.Storage.GetContext", default, get_context);
    registry.register("Neo.Storage.GetReadOnlyContext", default, get_read_only_context);
    registry.register("Neo.Storage.Get", InteropPrice::Fixed(100), get);
    registry.register("Neo.Storage.Put", InteropPrice::Dynamic(put_price), put);
    registry.register("Neo.Storage.Delete", InteropPrice::Fixed(100), delete);
    registry.register("Neo.StorageContext.AsReadOnly", default, as_read_only);
}

fn push_context(engine: &mut ExecutionEngine, context: StorageContext) -> VmResult<()> {
    engine.push(StackItem::from(InteropInterface::StorageContext(Arc::new(context))))
}

fn get_context(engine: &mut ExecutionEngine) -> VmResult<()> {
    let hash = engine.current_context()?.script_hash();
    push_context(engine, StorageContext::new(hash))
}

fn get_read_only_context(engine: &mut ExecutionEngine) -> VmResult<()> {
    let hash = engine.current_context()?.script_hash();
    push_context(engine, StorageContext::new(hash).as_read_only())
}

fn as_read_only(engine: &mut ExecutionEngine) -> VmResult<()> {
    let context = engine.pop()?.as_storage_context()?;
    push_context(engine, context.as_read_only())
}

/// The context's contract must be deployed with storage enabled.
fn check_storage_context(engine: &ExecutionEngine, context: &StorageContext) -> VmResult<()> {
    match engine.blockchain().contract(&context.script_hash)? {
        Some(contract) if contract.has_storage() => Ok(()),
        Some(_) => Err(VmError::InvalidOperation("contract has no storage")),
        None => Err(VmError::ContractNotFound(context.script_hash.to_string())),
    }
}

/// Pops a context that may be written through.
fn pop_writable_context(engine: &mut ExecutionEngine) -> VmResult<Arc<StorageContext>> {
    if engine.trigger() != TriggerType::Application {
        return Err(VmError::InvalidOperation(
            "storage writes need the application trigger",
        ));
    }
    let context = engine.pop()?.as_storage_context()?;
    if context.read_only {
        return Err(VmError::InvalidOperation("storage context is read-only"));
    }
    check_storage_context(engine, &context)?;
    Ok(context)
}

fn get(engine: &mut ExecutionEngine) -> VmResult<()> {
    let context = engine.pop()?.as_storage_context()?;
    check_storage_context(engine, &context)?;
    let key = engine.pop_bytes()?;
    let value = engine.storage().get(&context.script_hash, &key)?;
    let item = value.map(StackItem::from).unwrap_or_else(StackItem::empty_bytes);
    engine.push(item)
}

/// Priced per started KiB of key plus value. Runs before the call, so the
/// context is still on top with the key and value under it.
fn put_price(engine: &ExecutionEngine) -> VmResult<u64> {
    let key_len = engine.peek(1)?.as_bytes()?.len();
    let value_len = engine.peek(2)?.as_bytes()?.len();
    Ok(engine.gas_schedule().storage_put_price(key_len, value_len))
}

fn put(engine: &mut ExecutionEngine) -> VmResult<()> {
    let context = pop_writable_context(engine)?;
    let key = engine.pop_bytes()?;
    if key.len() > Config::MAX_STORAGE_KEY_SIZE {
        return Err(VmError::ItemTooLarge {
            size: key.len(),
            limit: Config::MAX_STORAGE_KEY_SIZE,
        });
    }
    let value = engine.pop_bytes()?;
    debug!(
        contract = %context.script_hash,
        key = %hex::encode(&key),
        size = value.len(),
        "storage put"
    );
    engine.storage_mut().put(&context.script_hash, &key, value);
    Ok(())
}

fn delete(engine: &mut ExecutionEngine) -> VmResult<()> {
    let context = pop_writable_context(engine)?;
    let key = engine.pop_bytes()?;
    debug!(contract = %context.script_hash, key = %hex::encode(&key), "storage delete");
    engine.storage_mut().delete(&context.script_hash, &key);
    Ok(())
}
