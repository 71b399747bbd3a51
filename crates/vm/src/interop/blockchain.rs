use std::sync::Arc;

use num_bigint::BigInt;
use state::BlockId;
use types::{Account, UInt256};

use crate::engine::ExecutionEngine;
use crate::errors::{VmError, VmResult};
use crate::interop::{pop_hash160, pop_hash256, InteropPrice, InteropRegistry};
use crate::stack_item::{InteropInterface, StackItem};

pub(crate) fn register(registry: &mut InteropRegistry) {
    let default = InteropPrice::Fixed(1);
    let lookup = InteropPrice::Fixed(100);
    let heavy = InteropPrice::Fixed(200);

    registry.register("Neo.Blockchain.GetHeight", default, get_height);
    registry.register("Neo.Blockchain.GetHeader", lookup, get_header);
    registry.register("Neo.Blockchain.GetBlock", heavy, get_block);
    registry.register("Neo.Blockchain.GetTransaction", lookup, get_transaction);
    registry.register(
        "Neo.Blockchain.GetTransactionHeight",
        lookup,
        get_transaction_height,
    );
    registry.register("Neo.Blockchain.GetAccount", lookup, get_account);
    registry.register("Neo.Blockchain.GetValidators", heavy, get_validators);
    registry.register("Neo.Blockchain.GetAsset", lookup, get_asset);
    registry.register("Neo.Blockchain.GetContract", lookup, get_contract);
}

/// Up to five bytes is a block index, 32 bytes a block hash.
pub(crate) fn block_id(bytes: &[u8]) -> VmResult<BlockId> {
    match bytes.len() {
        0..=5 => {
            let index = BigInt::from_signed_bytes_le(bytes);
            u32::try_from(&index)
                .map(BlockId::Index)
                .map_err(|_| VmError::InvalidOperation("block index out of range"))
        }
        32 => UInt256::from_slice(bytes)
            .map(BlockId::Hash)
            .ok_or(VmError::InvalidOperation("expected a 32-byte hash")),
        _ => Err(VmError::InvalidOperation("expected a block index or hash")),
    }
}

fn get_height(engine: &mut ExecutionEngine) -> VmResult<()> {
    let height = engine.blockchain().height()?;
    engine.push(StackItem::from(height))
}

fn get_header(engine: &mut ExecutionEngine) -> VmResult<()> {
    let id = block_id(&engine.pop_bytes()?)?;
    let item = match engine.blockchain().header(id)? {
        Some(header) => StackItem::from(InteropInterface::Header(header)),
        None => StackItem::empty_bytes(),
    };
    engine.push(item)
}

fn get_block(engine: &mut ExecutionEngine) -> VmResult<()> {
    let id = block_id(&engine.pop_bytes()?)?;
    let item = match engine.blockchain().block(id)? {
        Some(block) => StackItem::from(InteropInterface::Block(block)),
        None => StackItem::empty_bytes(),
    };
    engine.push(item)
}

fn get_transaction(engine: &mut ExecutionEngine) -> VmResult<()> {
    let hash = pop_hash256(engine)?;
    let item = match engine.blockchain().transaction(&hash)? {
        Some((tx, _)) => StackItem::from(InteropInterface::Transaction(tx)),
        None => StackItem::empty_bytes(),
    };
    engine.push(item)
}

fn get_transaction_height(engine: &mut ExecutionEngine) -> VmResult<()> {
    let hash = pop_hash256(engine)?;
    let height = match engine.blockchain().transaction(&hash)? {
        Some((_, height)) => i64::from(height),
        None => -1,
    };
    engine.push(StackItem::from(height))
}

/// Unknown hashes resolve to an empty account, never to a fault.
fn get_account(engine: &mut ExecutionEngine) -> VmResult<()> {
    let hash = pop_hash160(engine)?;
    let account = engine
        .blockchain()
        .account(&hash)?
        .unwrap_or_else(|| Arc::new(Account::empty(hash)));
    engine.push(StackItem::from(InteropInterface::Account(account)))
}

fn get_validators(engine: &mut ExecutionEngine) -> VmResult<()> {
    let validators = engine
        .blockchain()
        .validators()?
        .into_iter()
        .map(|v| StackItem::from(InteropInterface::Validator(v)))
        .collect();
    engine.push(StackItem::new_array(validators))
}

fn get_asset(engine: &mut ExecutionEngine) -> VmResult<()> {
    let asset_id = pop_hash256(engine)?;
    let item = match engine.blockchain().asset(&asset_id)? {
        Some(asset) => StackItem::from(InteropInterface::Asset(asset)),
        None => StackItem::empty_bytes(),
    };
    engine.push(item)
}

fn get_contract(engine: &mut ExecutionEngine) -> VmResult<()> {
    let hash = pop_hash160(engine)?;
    let item = match engine.blockchain().contract(&hash)? {
        Some(contract) => StackItem::from(InteropInterface::Contract(contract)),
        None => StackItem::empty_bytes(),
    };
    engine.push(item)
}
