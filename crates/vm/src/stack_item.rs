use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::Zero;
use serde_json::{json, Value};
use types::{
    Account, Asset, Attribute, Block, Contract, Header, Input, Output, StorageContext,
    Transaction, Validator,
};

use crate::errors::{InvalidValue, VmError, VmResult};
use crate::global::Config;

pub type ItemList = Rc<RefCell<Vec<StackItem>>>;
pub type ItemMap = Rc<RefCell<IndexMap<MapKey, StackItem>>>;

/// Opaque handle to a ledger entity handed to a script by an interop call.
///
/// Entities are immutable snapshots; the handle only bumps a reference count.
#[derive(Debug, Clone)]
pub enum InteropInterface {
    Header(Arc<Header>),
    Block(Arc<Block>),
    Transaction(Arc<Transaction>),
    Attribute(Arc<Attribute>),
    Input(Arc<Input>),
    Output(Arc<Output>),
    Account(Arc<Account>),
    Asset(Arc<Asset>),
    Contract(Arc<Contract>),
    Validator(Arc<Validator>),
    StorageContext(Arc<StorageContext>),
}

impl InteropInterface {
    pub fn type_name(&self) -> &'static str {
        match self {
            InteropInterface::Header(_) => "Header",
            InteropInterface::Block(_) => "Block",
            InteropInterface::Transaction(_) => "Transaction",
            InteropInterface::Attribute(_) => "Attribute",
            InteropInterface::Input(_) => "Input",
            InteropInterface::Output(_) => "Output",
            InteropInterface::Account(_) => "Account",
            InteropInterface::Asset(_) => "Asset",
            InteropInterface::Contract(_) => "Contract",
            InteropInterface::Validator(_) => "Validator",
            InteropInterface::StorageContext(_) => "StorageContext",
        }
    }

    /// Identity comparison: two handles are equal only if they wrap the same snapshot.
    pub fn ptr_eq(&self, other: &InteropInterface) -> bool {
        use InteropInterface as I;
        match (self, other) {
            (I::Header(a), I::Header(b)) => Arc::ptr_eq(a, b),
            (I::Block(a), I::Block(b)) => Arc::ptr_eq(a, b),
            (I::Transaction(a), I::Transaction(b)) => Arc::ptr_eq(a, b),
            (I::Attribute(a), I::Attribute(b)) => Arc::ptr_eq(a, b),
            (I::Input(a), I::Input(b)) => Arc::ptr_eq(a, b),
            (I::Output(a), I::Output(b)) => Arc::ptr_eq(a, b),
            (I::Account(a), I::Account(b)) => Arc::ptr_eq(a, b),
            (I::Asset(a), I::Asset(b)) => Arc::ptr_eq(a, b),
            (I::Contract(a), I::Contract(b)) => Arc::ptr_eq(a, b),
            (I::Validator(a), I::Validator(b)) => Arc::ptr_eq(a, b),
            (I::StorageContext(a), I::StorageContext(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Header-or-Block view used by the `Neo.Header.*` getters.
#[derive(Debug, Clone)]
pub enum BlockBase {
    Header(Arc<Header>),
    Block(Arc<Block>),
}

impl BlockBase {
    pub fn header(&self) -> &Header {
        match self {
            BlockBase::Header(header) => header,
            BlockBase::Block(block) => &block.header,
        }
    }
}

/// A value on the evaluation stack.
///
/// EDUCATIONAL PURPOSE: The VM is typed, but loosely: every opcode asks its
/// operands for the shape it needs through one of the `as_*` coercions below.
/// A coercion either produces that shape or fails with the [`InvalidValue`]
/// variant that names it, and that failure FAULTs the engine.
///
/// SHARING SEMANTICS:
/// - `Boolean`, `Integer`, `ByteArray` are immutable values.
/// - `Array` and `Map` are shared references; mutating one alias is visible
///   through every other alias.
/// - `Struct` shares storage like `Array` but is deep-copied whenever it is
///   duplicated or stored into a collection, so it behaves like a value.
#[derive(Clone)]
pub enum StackItem {
    Boolean(bool),
    Integer(BigInt),
    ByteArray(Rc<[u8]>),
    Array(ItemList),
    Struct(ItemList),
    Map(ItemMap),
    Interface(InteropInterface),
}

macro_rules! interface_coercion {
    ($(#[$meta:meta])* $name:ident, $variant:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $name(&self) -> Result<Arc<$ty>, InvalidValue> {
            match self {
                StackItem::Interface(InteropInterface::$variant(inner)) => Ok(Arc::clone(inner)),
                _ => Err(InvalidValue::$variant),
            }
        }
    };
}

impl StackItem {
    pub fn empty_bytes() -> Self {
        StackItem::ByteArray(Rc::from(Vec::new()))
    }

    pub fn new_array(items: Vec<StackItem>) -> Self {
        StackItem::Array(Rc::new(RefCell::new(items)))
    }

    pub fn new_struct(items: Vec<StackItem>) -> Self {
        StackItem::Struct(Rc::new(RefCell::new(items)))
    }

    pub fn new_map() -> Self {
        StackItem::Map(Rc::new(RefCell::new(IndexMap::new())))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            StackItem::Boolean(_) => "Boolean",
            StackItem::Integer(_) => "Integer",
            StackItem::ByteArray(_) => "ByteArray",
            StackItem::Array(_) => "Array",
            StackItem::Struct(_) => "Struct",
            StackItem::Map(_) => "Map",
            StackItem::Interface(_) => "InteropInterface",
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            StackItem::Boolean(_) | StackItem::Integer(_) | StackItem::ByteArray(_)
        )
    }

    pub fn as_bool(&self) -> bool {
        match self {
            StackItem::Boolean(value) => *value,
            StackItem::Integer(value) => !value.is_zero(),
            StackItem::ByteArray(bytes) => {
                bytes.len() > Config::MAX_INTEGER_SIZE || bytes.iter().any(|b| *b != 0)
            }
            _ => true,
        }
    }

    /// Byte encoding of a primitive item.
    pub fn as_bytes(&self) -> Result<Rc<[u8]>, InvalidValue> {
        match self {
            StackItem::Boolean(true) => Ok(Rc::from(vec![1u8])),
            StackItem::Boolean(false) => Ok(Rc::from(Vec::new())),
            StackItem::Integer(value) => Ok(Rc::from(integer_to_bytes(value))),
            StackItem::ByteArray(bytes) => Ok(Rc::clone(bytes)),
            _ => Err(InvalidValue::Buffer),
        }
    }

    pub fn as_integer(&self) -> VmResult<BigInt> {
        match self {
            StackItem::Integer(value) => Ok(value.clone()),
            StackItem::Boolean(value) => Ok(BigInt::from(*value as u8)),
            StackItem::ByteArray(bytes) => {
                if bytes.len() > Config::MAX_INTEGER_SIZE {
                    return Err(VmError::IntegerOverflow {
                        limit: Config::MAX_INTEGER_SIZE,
                    });
                }
                Ok(BigInt::from_signed_bytes_le(bytes))
            }
            _ => Err(InvalidValue::Integer.into()),
        }
    }

    /// Element list of an `Array` or a `Struct`.
    pub fn as_array(&self) -> Result<ItemList, InvalidValue> {
        match self {
            StackItem::Array(items) | StackItem::Struct(items) => Ok(Rc::clone(items)),
            _ => Err(InvalidValue::Array),
        }
    }

    pub fn as_struct(&self) -> Result<ItemList, InvalidValue> {
        match self {
            StackItem::Struct(items) => Ok(Rc::clone(items)),
            _ => Err(InvalidValue::Struct),
        }
    }

    pub fn as_map(&self) -> Result<ItemMap, InvalidValue> {
        match self {
            StackItem::Map(map) => Ok(Rc::clone(map)),
            _ => Err(InvalidValue::Map),
        }
    }

    pub fn as_interface(&self) -> Result<&InteropInterface, InvalidValue> {
        match self {
            StackItem::Interface(inner) => Ok(inner),
            _ => Err(InvalidValue::Interface),
        }
    }

    interface_coercion!(as_header, Header, Header);
    interface_coercion!(as_block, Block, Block);
    interface_coercion!(as_transaction, Transaction, Transaction);
    interface_coercion!(as_attribute, Attribute, Attribute);
    interface_coercion!(as_input, Input, Input);
    interface_coercion!(as_output, Output, Output);
    interface_coercion!(as_account, Account, Account);
    interface_coercion!(as_asset, Asset, Asset);
    interface_coercion!(as_contract, Contract, Contract);
    interface_coercion!(as_validator, Validator, Validator);
    interface_coercion!(as_storage_context, StorageContext, StorageContext);

    pub fn as_block_base(&self) -> Result<BlockBase, InvalidValue> {
        match self {
            StackItem::Interface(InteropInterface::Header(header)) => {
                Ok(BlockBase::Header(Arc::clone(header)))
            }
            StackItem::Interface(InteropInterface::Block(block)) => {
                Ok(BlockBase::Block(Arc::clone(block)))
            }
            _ => Err(InvalidValue::BlockBase),
        }
    }

    /// The item itself, provided it wraps an attribute.
    pub fn as_attribute_item(&self) -> Result<&StackItem, InvalidValue> {
        match self {
            StackItem::Interface(InteropInterface::Attribute(_)) => Ok(self),
            _ => Err(InvalidValue::AttributeStackItem),
        }
    }

    /// `EQUAL` semantics.
    pub fn equals(&self, other: &StackItem) -> bool {
        match (self, other) {
            (StackItem::Array(a), StackItem::Array(b)) => Rc::ptr_eq(a, b),
            (StackItem::Map(a), StackItem::Map(b)) => Rc::ptr_eq(a, b),
            (StackItem::Interface(a), StackItem::Interface(b)) => a.ptr_eq(b),
            (StackItem::Struct(a), StackItem::Struct(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (a, b) if a.is_primitive() && b.is_primitive() => {
                match (a.as_bytes(), b.as_bytes()) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Copy made by `DUP`-class opcodes and by stores into collections.
    /// Structs are copied recursively; everything else shares.
    pub fn duplicate(&self) -> StackItem {
        match self {
            StackItem::Struct(items) => {
                let copied = items.borrow().iter().map(StackItem::duplicate).collect();
                StackItem::new_struct(copied)
            }
            other => other.clone(),
        }
    }

    /// RPC-style rendering, e.g. `{"type":"Integer","value":"7"}`.
    pub fn to_json(&self) -> Value {
        let mut visiting = Vec::new();
        self.to_json_inner(&mut visiting)
    }

    fn to_json_inner(&self, visiting: &mut Vec<usize>) -> Value {
        match self {
            StackItem::Boolean(value) => json!({ "type": "Boolean", "value": value }),
            StackItem::Integer(value) => json!({ "type": "Integer", "value": value.to_string() }),
            StackItem::ByteArray(bytes) => {
                json!({ "type": "ByteArray", "value": hex::encode(bytes) })
            }
            StackItem::Array(items) | StackItem::Struct(items) => {
                let ptr = Rc::as_ptr(items) as usize;
                if visiting.contains(&ptr) {
                    return json!({ "type": self.type_name(), "value": Value::Null });
                }
                visiting.push(ptr);
                let values: Vec<Value> = items
                    .borrow()
                    .iter()
                    .map(|item| item.to_json_inner(visiting))
                    .collect();
                visiting.pop();
                json!({ "type": self.type_name(), "value": values })
            }
            StackItem::Map(map) => {
                let ptr = Rc::as_ptr(map) as usize;
                if visiting.contains(&ptr) {
                    return json!({ "type": "Map", "value": Value::Null });
                }
                visiting.push(ptr);
                let entries: Vec<Value> = map
                    .borrow()
                    .iter()
                    .map(|(key, value)| {
                        json!({
                            "key": key.item().to_json_inner(visiting),
                            "value": value.to_json_inner(visiting),
                        })
                    })
                    .collect();
                visiting.pop();
                json!({ "type": "Map", "value": entries })
            }
            StackItem::Interface(inner) => {
                json!({ "type": "InteropInterface", "value": inner.type_name() })
            }
        }
    }
}

/// Minimal two's-complement little-endian encoding; zero encodes as `[]`.
pub fn integer_to_bytes(value: &BigInt) -> Vec<u8> {
    if value.is_zero() {
        Vec::new()
    } else {
        value.to_signed_bytes_le()
    }
}

impl fmt::Debug for StackItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackItem::Boolean(value) => write!(f, "Boolean({})", value),
            StackItem::Integer(value) => write!(f, "Integer({})", value),
            StackItem::ByteArray(bytes) => write!(f, "ByteArray({})", hex::encode(bytes)),
            StackItem::Array(items) => write!(f, "Array(len={})", items.borrow().len()),
            StackItem::Struct(items) => write!(f, "Struct(len={})", items.borrow().len()),
            StackItem::Map(map) => write!(f, "Map(len={})", map.borrow().len()),
            StackItem::Interface(inner) => write!(f, "Interface({})", inner.type_name()),
        }
    }
}

impl From<bool> for StackItem {
    fn from(value: bool) -> Self {
        StackItem::Boolean(value)
    }
}

impl From<BigInt> for StackItem {
    fn from(value: BigInt) -> Self {
        StackItem::Integer(value)
    }
}

impl From<i64> for StackItem {
    fn from(value: i64) -> Self {
        StackItem::Integer(BigInt::from(value))
    }
}

impl From<u32> for StackItem {
    fn from(value: u32) -> Self {
        StackItem::Integer(BigInt::from(value))
    }
}

impl From<Vec<u8>> for StackItem {
    fn from(value: Vec<u8>) -> Self {
        StackItem::ByteArray(Rc::from(value))
    }
}

impl From<&[u8]> for StackItem {
    fn from(value: &[u8]) -> Self {
        StackItem::ByteArray(Rc::from(value))
    }
}

impl From<InteropInterface> for StackItem {
    fn from(value: InteropInterface) -> Self {
        StackItem::Interface(value)
    }
}

/// Map key: a primitive item compared and hashed by its byte encoding, so
/// `Integer(1)`, `Boolean(true)` and `ByteArray([1])` address the same entry.
#[derive(Clone)]
pub struct MapKey {
    item: StackItem,
    bytes: Rc<[u8]>,
}

impl MapKey {
    pub fn new(item: StackItem) -> VmResult<Self> {
        if !item.is_primitive() {
            return Err(VmError::InvalidMapKey);
        }
        let bytes = item.as_bytes()?;
        Ok(Self { item, bytes })
    }

    pub fn item(&self) -> &StackItem {
        &self.item
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Debug for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MapKey({:?})", self.item)
    }
}

/// Counts items reachable from the engine's stacks and slots.
///
/// Every reference counts, including elements nested inside arrays, structs
/// and maps (a map entry counts its key and its value). A shared collection
/// has its contents counted once no matter how many aliases point at it, so
/// cycles terminate.
#[derive(Debug, Default)]
pub struct ItemCounter {
    seen: HashSet<usize>,
    pending: Vec<StackItem>,
    count: usize,
}

impl ItemCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Marks an allocation as visited; `false` if it was already seen.
    pub fn first_visit<T>(&mut self, ptr: *const T) -> bool {
        self.seen.insert(ptr as *const () as usize)
    }

    pub fn add_all<'a>(&mut self, items: impl IntoIterator<Item = &'a StackItem>) {
        for item in items {
            self.add(item);
        }
        while let Some(collection) = self.pending.pop() {
            match &collection {
                StackItem::Array(items) | StackItem::Struct(items) => {
                    for item in items.borrow().iter() {
                        self.add(item);
                    }
                }
                StackItem::Map(map) => {
                    for value in map.borrow().values() {
                        self.count += 1;
                        self.add(value);
                    }
                }
                _ => {}
            }
        }
    }

    fn add(&mut self, item: &StackItem) {
        self.count += 1;
        let fresh = match item {
            StackItem::Array(items) | StackItem::Struct(items) => {
                self.first_visit(Rc::as_ptr(items))
            }
            StackItem::Map(map) => self.first_visit(Rc::as_ptr(map)),
            _ => false,
        };
        if fresh {
            self.pending.push(item.clone());
        }
    }
}
