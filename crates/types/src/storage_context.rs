use crate::hash::UInt160;

/// Handle that scopes storage access to one contract's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageContext {
    pub script_hash: UInt160,
    pub read_only: bool,
}

impl StorageContext {
    pub fn new(script_hash: UInt160) -> Self {
        Self { script_hash, read_only: false }
    }

    pub fn as_read_only(&self) -> Self {
        Self { script_hash: self.script_hash, read_only: true }
    }
}
