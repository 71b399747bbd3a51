use std::collections::BTreeMap;
use std::sync::Arc;

use types::UInt160;

use crate::{StorageKey, StorageResult, Store};

/// Pending writes of one invocation. `None` marks a deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: BTreeMap<StorageKey, Option<Vec<u8>>>,
}

impl ChangeSet {
    pub fn put(&mut self, key: StorageKey, value: Vec<u8>) {
        self.entries.insert(key, Some(value));
    }

    pub fn delete(&mut self, key: StorageKey) {
        self.entries.insert(key, None);
    }

    pub fn get(&self, key: &StorageKey) -> Option<&Option<Vec<u8>>> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StorageKey, &Option<Vec<u8>>)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> impl Iterator<Item = (StorageKey, Option<Vec<u8>>)> {
        self.entries.into_iter()
    }

    /// Layers `later` over this set; its entries win on shared keys.
    pub fn merge(&mut self, later: ChangeSet) {
        self.entries.extend(later.entries);
    }
}

/// Write buffer layered over a shared [`Store`] for the lifetime of one
/// invocation.
///
/// Reads see this invocation's own pending writes first and fall through to
/// the backing store otherwise. Nothing reaches the store until
/// [`StorageCache::commit`]; dropping the cache discards every write.
#[derive(Debug)]
pub struct StorageCache {
    store: Arc<dyn Store>,
    pending: ChangeSet,
}

impl StorageCache {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            pending: ChangeSet::default(),
        }
    }

    pub fn get(&self, script_hash: &UInt160, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let lookup = StorageKey::new(*script_hash, key);
        if let Some(pending) = self.pending.get(&lookup) {
            return Ok(pending.clone());
        }
        self.store.get(script_hash, key)
    }

    pub fn put(&mut self, script_hash: &UInt160, key: &[u8], value: Vec<u8>) {
        self.pending.put(StorageKey::new(*script_hash, key), value);
    }

    pub fn delete(&mut self, script_hash: &UInt160, key: &[u8]) {
        self.pending.delete(StorageKey::new(*script_hash, key));
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.pending
    }

    /// Detaches the buffered writes so the caller can commit them later,
    /// e.g. in transaction order after a parallel block validation.
    pub fn into_changes(self) -> ChangeSet {
        self.pending
    }

    /// Applies the buffered writes and returns how many entries were written.
    pub fn commit(self) -> StorageResult<usize> {
        let count = self.pending.len();
        self.store.commit(self.pending)?;
        Ok(count)
    }

    /// Drops every buffered write.
    pub fn discard(&mut self) {
        self.pending = ChangeSet::default();
    }
}
