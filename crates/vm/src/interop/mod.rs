//! Interop services reachable through `SYSCALL`.
//!
//! EDUCATIONAL PURPOSE: Scripts cannot touch anything outside their own
//! stacks except through this table. A `SYSCALL` operand resolves to a
//! 32-bit method id; the registry maps that id to a price and a handler that
//! pops its arguments from, and pushes its results onto, the current frame.

use std::collections::HashMap;
use std::fmt;

use sha2::{Digest, Sha256};
use types::{UInt160, UInt256};

use crate::engine::ExecutionEngine;
use crate::errors::{VmError, VmResult};

pub mod blockchain;
pub mod entities;
pub mod runtime;
pub mod storage;

pub type InteropHandler = fn(&mut ExecutionEngine) -> VmResult<()>;

/// Gas price of a service. Dynamic prices look at the stack as it is before
/// the call and must not modify it.
#[derive(Clone, Copy)]
pub enum InteropPrice {
    Fixed(u64),
    Dynamic(fn(&ExecutionEngine) -> VmResult<u64>),
}

impl fmt::Debug for InteropPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteropPrice::Fixed(price) => write!(f, "Fixed({})", price),
            InteropPrice::Dynamic(_) => write!(f, "Dynamic"),
        }
    }
}

#[derive(Clone, Copy)]
pub struct InteropDescriptor {
    pub name: &'static str,
    pub hash: u32,
    pub price: InteropPrice,
    pub handler: InteropHandler,
}

impl fmt::Debug for InteropDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteropDescriptor")
            .field("name", &self.name)
            .field("hash", &format_args!("0x{:08x}", self.hash))
            .field("price", &self.price)
            .finish()
    }
}

/// Method id of an interop name: the first four bytes of its SHA-256,
/// read little-endian.
pub fn interop_hash(name: &[u8]) -> u32 {
    let digest = Sha256::digest(name);
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

#[derive(Default)]
pub struct InteropRegistry {
    services: HashMap<u32, InteropDescriptor>,
}

impl InteropRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every service a ledger node exposes to contracts.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        runtime::register(&mut registry);
        blockchain::register(&mut registry);
        entities::register(&mut registry);
        storage::register(&mut registry);
        registry
    }

    /// Adds or replaces a service.
    pub fn register(&mut self, name: &'static str, price: InteropPrice, handler: InteropHandler) {
        let hash = interop_hash(name.as_bytes());
        self.services.insert(
            hash,
            InteropDescriptor {
                name,
                hash,
                price,
                handler,
            },
        );
    }

    pub fn get(&self, id: u32) -> VmResult<&InteropDescriptor> {
        self.services.get(&id).ok_or(VmError::UnknownInterop(id))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(&interop_hash(name.as_bytes()))
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for InteropRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteropRegistry")
            .field("services", &self.services.len())
            .finish()
    }
}

pub(crate) fn pop_hash160(engine: &mut ExecutionEngine) -> VmResult<UInt160> {
    let bytes = engine.pop_bytes()?;
    UInt160::from_slice(&bytes).ok_or(VmError::InvalidOperation("expected a 20-byte hash"))
}

pub(crate) fn pop_hash256(engine: &mut ExecutionEngine) -> VmResult<UInt256> {
    let bytes = engine.pop_bytes()?;
    UInt256::from_slice(&bytes).ok_or(VmError::InvalidOperation("expected a 32-byte hash"))
}
