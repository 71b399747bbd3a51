use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::debug;
use types::UInt160;

pub mod cache;
pub mod error;

pub use cache::{ChangeSet, StorageCache};
pub use error::{StorageError, StorageResult};

/// Key of one storage slot: the owning contract plus the contract-chosen key.
///
/// Ordering is by contract first, so one contract's entries are contiguous.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageKey {
    pub script_hash: UInt160,
    pub key: Vec<u8>,
}

impl StorageKey {
    pub fn new(script_hash: UInt160, key: &[u8]) -> Self {
        Self { script_hash, key: key.to_vec() }
    }
}

/// Storage collaborator consumed by the VM.
///
/// Reads are scoped by contract identity. Writes never reach a `Store`
/// directly: they are buffered in a [`StorageCache`] and handed over as one
/// [`ChangeSet`] once the invocation halts.
pub trait Store: Debug + Send + Sync {
    fn get(&self, script_hash: &UInt160, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Applies every entry of `changes` or none of them.
    fn commit(&self, changes: ChangeSet) -> StorageResult<()>;

    /// Releases the backend. Further reads and commits fail with `Closed`.
    fn close(&self) -> StorageResult<()>;
}

/// In-memory contract storage.
///
/// The map sits behind a `RwLock` so several engines validating the same
/// block can read it concurrently while a commit takes the write lock once
/// per change set.
#[derive(Debug, Default)]
pub struct Storage {
    pub map: RwLock<BTreeMap<StorageKey, Vec<u8>>>,
    closed: AtomicBool,
}

impl Storage {
    pub fn new() -> Self {
        Self::with_map(BTreeMap::new())
    }

    /// Creates a store pre-populated with `initial`, e.g. restored from a snapshot.
    pub fn with_map(initial: BTreeMap<StorageKey, Vec<u8>>) -> Self {
        Self {
            map: RwLock::new(initial),
            closed: AtomicBool::new(false),
        }
    }

    /// Writes straight into the map, bypassing the buffered path. Used to
    /// seed state before any invocation runs.
    pub fn insert(&self, script_hash: UInt160, key: &[u8], value: Vec<u8>) {
        self.map.write().insert(StorageKey::new(script_hash, key), value);
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Logs every entry at debug level.
    pub fn dump(&self) {
        debug!("--- Storage Dump ---");
        for (key, value) in self.map.read().iter() {
            debug!(
                contract = %key.script_hash,
                key = %hex::encode(&key.key),
                len = value.len(),
                value = %hex::encode(value),
                "storage entry"
            );
        }
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.is_closed() {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl Store for Storage {
    fn get(&self, script_hash: &UInt160, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        let lookup = StorageKey::new(*script_hash, key);
        Ok(self.map.read().get(&lookup).cloned())
    }

    fn commit(&self, changes: ChangeSet) -> StorageResult<()> {
        self.ensure_open()?;
        let mut map = self.map.write();
        for (key, value) in changes.into_entries() {
            match value {
                Some(value) => {
                    map.insert(key, value);
                }
                None => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn close(&self) -> StorageResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_scoped_by_contract() {
        let storage = Storage::new();
        storage.insert(UInt160([1u8; 20]), b"key", vec![1]);
        storage.insert(UInt160([2u8; 20]), b"key", vec![2]);

        assert_eq!(storage.get(&UInt160([1u8; 20]), b"key").unwrap(), Some(vec![1]));
        assert_eq!(storage.get(&UInt160([2u8; 20]), b"key").unwrap(), Some(vec![2]));
        assert_eq!(storage.get(&UInt160([3u8; 20]), b"key").unwrap(), None);
    }

    #[test]
    fn closed_store_rejects_access() {
        let storage = Storage::new();
        storage.close().unwrap();
        assert_eq!(storage.get(&UInt160::zero(), b"k"), Err(StorageError::Closed));
        assert_eq!(storage.commit(ChangeSet::default()), Err(StorageError::Closed));
    }
}
