//! Read-only getters on the ledger entities scripts receive as interop
//! interfaces. Each pops its entity (and any argument after it) and pushes
//! one field.

use std::sync::Arc;

use num_bigint::BigInt;
use types::StorageContext;

use crate::engine::ExecutionEngine;
use crate::errors::{VmError, VmResult};
use crate::interop::{pop_hash256, InteropHandler, InteropPrice, InteropRegistry};
use crate::stack_item::{InteropInterface, StackItem};

macro_rules! getter {
    ($name:ident, $coerce:ident, |$entity:ident| $field:expr) => {
        fn $name(engine: &mut ExecutionEngine) -> VmResult<()> {
            let $entity = engine.pop()?.$coerce()?;
            let item = StackItem::from($field);
            engine.push(item)
        }
    };
}

const GETTERS: &[(&str, InteropHandler)] = &[
    ("Neo.Header.GetHash", header_hash),
    ("Neo.Header.GetVersion", header_version),
    ("Neo.Header.GetPrevHash", header_prev_hash),
    ("Neo.Header.GetMerkleRoot", header_merkle_root),
    ("Neo.Header.GetTimestamp", header_timestamp),
    ("Neo.Header.GetIndex", header_index),
    ("Neo.Header.GetConsensusData", header_consensus_data),
    ("Neo.Header.GetNextConsensus", header_next_consensus),
    ("Neo.Block.GetTransactionCount", block_transaction_count),
    ("Neo.Block.GetTransactions", block_transactions),
    ("Neo.Block.GetTransaction", block_transaction),
    ("Neo.Transaction.GetHash", transaction_hash),
    ("Neo.Transaction.GetType", transaction_type),
    ("Neo.Transaction.GetAttributes", transaction_attributes),
    ("Neo.Transaction.GetInputs", transaction_inputs),
    ("Neo.Transaction.GetOutputs", transaction_outputs),
    ("Neo.Attribute.GetUsage", attribute_usage),
    ("Neo.Attribute.GetData", attribute_data),
    ("Neo.Input.GetHash", input_hash),
    ("Neo.Input.GetIndex", input_index),
    ("Neo.Output.GetAssetId", output_asset_id),
    ("Neo.Output.GetValue", output_value),
    ("Neo.Output.GetScriptHash", output_script_hash),
    ("Neo.Account.GetScriptHash", account_script_hash),
    ("Neo.Account.GetVotes", account_votes),
    ("Neo.Account.GetBalance", account_balance),
    ("Neo.Asset.GetAssetId", asset_id),
    ("Neo.Asset.GetAssetType", asset_type),
    ("Neo.Asset.GetAmount", asset_amount),
    ("Neo.Asset.GetAvailable", asset_available),
    ("Neo.Asset.GetPrecision", asset_precision),
    ("Neo.Asset.GetOwner", asset_owner),
    ("Neo.Asset.GetAdmin", asset_admin),
    ("Neo.Asset.GetIssuer", asset_issuer),
    ("Neo.Contract.GetScript", contract_script),
    ("Neo.Contract.IsPayable", contract_is_payable),
    ("Neo.Contract.GetStorageContext", contract_storage_context),
    ("Neo.Validator.GetPublicKey", validator_public_key),
];

pub(crate) fn register(registry: &mut InteropRegistry) {
    for &(name, handler) in GETTERS {
        registry.register(name, InteropPrice::Fixed(1), handler);
    }
    registry.register(
        "Neo.Transaction.GetReferences",
        InteropPrice::Fixed(200),
        transaction_references,
    );
}

// ===== Header (also accepts a Block) =====

getter!(header_hash, as_block_base, |base| base.header().hash.as_bytes());
getter!(header_version, as_block_base, |base| base.header().version);
getter!(header_prev_hash, as_block_base, |base| base.header().prev_hash.as_bytes());
getter!(header_merkle_root, as_block_base, |base| base.header().merkle_root.as_bytes());
getter!(header_timestamp, as_block_base, |base| base.header().timestamp);
getter!(header_index, as_block_base, |base| base.header().index);
getter!(header_consensus_data, as_block_base, |base| {
    BigInt::from(base.header().consensus_data)
});
getter!(header_next_consensus, as_block_base, |base| {
    base.header().next_consensus.as_bytes()
});

// ===== Block =====

getter!(block_transaction_count, as_block, |block| block.transactions.len() as i64);

fn block_transactions(engine: &mut ExecutionEngine) -> VmResult<()> {
    let block = engine.pop()?.as_block()?;
    let limit = engine.limits().max_array_size;
    if block.transactions.len() > limit {
        return Err(VmError::ArrayTooLarge {
            size: block.transactions.len(),
            limit,
        });
    }
    let items = block
        .transactions
        .iter()
        .map(|tx| StackItem::from(InteropInterface::Transaction(Arc::clone(tx))))
        .collect();
    engine.push(StackItem::new_array(items))
}

fn block_transaction(engine: &mut ExecutionEngine) -> VmResult<()> {
    let block = engine.pop()?.as_block()?;
    let index = engine.pop_index()?;
    let tx = block
        .transactions
        .get(index)
        .ok_or(VmError::IndexOutOfRange {
            index: index as i64,
            len: block.transactions.len(),
        })?;
    engine.push(StackItem::from(InteropInterface::Transaction(Arc::clone(tx))))
}

// ===== Transaction =====

getter!(transaction_hash, as_transaction, |tx| tx.hash.as_bytes());
getter!(transaction_type, as_transaction, |tx| tx.tx_type as u8 as i64);

fn transaction_attributes(engine: &mut ExecutionEngine) -> VmResult<()> {
    let tx = engine.pop()?.as_transaction()?;
    let items = tx
        .attributes
        .iter()
        .map(|attr| StackItem::from(InteropInterface::Attribute(Arc::new(attr.clone()))))
        .collect();
    push_list(engine, items)
}

fn transaction_inputs(engine: &mut ExecutionEngine) -> VmResult<()> {
    let tx = engine.pop()?.as_transaction()?;
    let items = tx
        .inputs
        .iter()
        .map(|input| StackItem::from(InteropInterface::Input(Arc::new(*input))))
        .collect();
    push_list(engine, items)
}

fn transaction_outputs(engine: &mut ExecutionEngine) -> VmResult<()> {
    let tx = engine.pop()?.as_transaction()?;
    let items = tx
        .outputs
        .iter()
        .map(|output| StackItem::from(InteropInterface::Output(Arc::new(output.clone()))))
        .collect();
    push_list(engine, items)
}

/// The outputs spent by each input, resolved through the ledger.
fn transaction_references(engine: &mut ExecutionEngine) -> VmResult<()> {
    let tx = engine.pop()?.as_transaction()?;
    let ledger = engine.blockchain();
    let mut items = Vec::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        let (prev, _) = ledger
            .transaction(&input.prev_hash)?
            .ok_or(VmError::InvalidOperation("referenced transaction not found"))?;
        let output = prev
            .outputs
            .get(input.prev_index as usize)
            .ok_or(VmError::InvalidOperation("referenced output not found"))?;
        items.push(StackItem::from(InteropInterface::Output(Arc::new(output.clone()))));
    }
    push_list(engine, items)
}

fn push_list(engine: &mut ExecutionEngine, items: Vec<StackItem>) -> VmResult<()> {
    let limit = engine.limits().max_array_size;
    if items.len() > limit {
        return Err(VmError::ArrayTooLarge {
            size: items.len(),
            limit,
        });
    }
    engine.push(StackItem::new_array(items))
}

// ===== Attribute =====

fn attribute_usage(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = engine.pop()?;
    let attr = item.as_attribute_item()?.as_attribute()?;
    engine.push(StackItem::from(u32::from(attr.usage)))
}

fn attribute_data(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = engine.pop()?;
    let attr = item.as_attribute_item()?.as_attribute()?;
    engine.push(StackItem::from(&attr.data[..]))
}

// ===== Input / Output =====

getter!(input_hash, as_input, |input| input.prev_hash.as_bytes());
getter!(input_index, as_input, |input| u32::from(input.prev_index));
getter!(output_asset_id, as_output, |output| output.asset_id.as_bytes());
getter!(output_value, as_output, |output| output.value);
getter!(output_script_hash, as_output, |output| output.script_hash.as_bytes());

// ===== Account =====

getter!(account_script_hash, as_account, |account| account.script_hash.as_bytes());

fn account_votes(engine: &mut ExecutionEngine) -> VmResult<()> {
    let account = engine.pop()?.as_account()?;
    let votes = account
        .votes
        .iter()
        .map(|key| StackItem::from(&key[..]))
        .collect();
    engine.push(StackItem::new_array(votes))
}

fn account_balance(engine: &mut ExecutionEngine) -> VmResult<()> {
    let account = engine.pop()?.as_account()?;
    let asset_id = pop_hash256(engine)?;
    engine.push(StackItem::from(account.balance(&asset_id)))
}

// ===== Asset =====

getter!(asset_id, as_asset, |asset| asset.asset_id.as_bytes());
getter!(asset_type, as_asset, |asset| asset.asset_type as u8 as i64);
getter!(asset_amount, as_asset, |asset| asset.amount);
getter!(asset_available, as_asset, |asset| asset.available);
getter!(asset_precision, as_asset, |asset| u32::from(asset.precision));
getter!(asset_owner, as_asset, |asset| &asset.owner[..]);
getter!(asset_admin, as_asset, |asset| asset.admin.as_bytes());
getter!(asset_issuer, as_asset, |asset| asset.issuer.as_bytes());

// ===== Contract =====

getter!(contract_script, as_contract, |contract| &contract.script[..]);
getter!(contract_is_payable, as_contract, |contract| contract.is_payable());

/// A contract handle only yields a storage context to that same contract.
fn contract_storage_context(engine: &mut ExecutionEngine) -> VmResult<()> {
    let contract = engine.pop()?.as_contract()?;
    let current = engine.current_context()?.script_hash();
    if contract.script_hash != current {
        return Err(VmError::InvalidOperation(
            "storage context requested for another contract",
        ));
    }
    let context = StorageContext::new(contract.script_hash);
    engine.push(StackItem::from(InteropInterface::StorageContext(Arc::new(context))))
}

// ===== Validator =====

getter!(validator_public_key, as_validator, |validator| &validator.public_key[..]);
