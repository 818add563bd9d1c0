//! In-memory implementations of the collaborator traits.
//!
//! These are primarily for testing. They have the same semantics as the
//! SQLite backend but keep everything in memory with no persistence. The
//! blob store also exposes its raw contents so tests can play the
//! adversary.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use sealbox_core::BlobId;

use crate::error::{Result, StoreError};
use crate::traits::{BlobStore, KeyDirectory, KeyRole};

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|e| StoreError::Poisoned(e.to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|e| StoreError::Poisoned(e.to_string()))
}

/// In-memory blob store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<BlobId, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every id currently holding a record.
    pub fn ids(&self) -> Result<Vec<BlobId>> {
        let mut ids: Vec<BlobId> = read(&self.blobs)?.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    /// Number of records.
    pub fn len(&self) -> Result<usize> {
        Ok(read(&self.blobs)?.len())
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Total bytes stored across all records.
    pub fn raw_len(&self) -> Result<usize> {
        Ok(read(&self.blobs)?.values().map(Vec::len).sum())
    }

    /// Snapshot of every record, for before/after comparisons in tests.
    pub fn snapshot(&self) -> Result<HashMap<BlobId, Vec<u8>>> {
        Ok(read(&self.blobs)?.clone())
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, id: &BlobId, data: &[u8]) -> Result<()> {
        write(&self.blobs)?.insert(*id, data.to_vec());
        Ok(())
    }

    fn get(&self, id: &BlobId) -> Result<Option<Vec<u8>>> {
        Ok(read(&self.blobs)?.get(id).cloned())
    }

    fn delete(&self, id: &BlobId) -> Result<()> {
        write(&self.blobs)?.remove(id);
        Ok(())
    }

    fn contains(&self, id: &BlobId) -> Result<bool> {
        Ok(read(&self.blobs)?.contains_key(id))
    }
}

/// In-memory key directory.
#[derive(Default)]
pub struct MemoryDirectory {
    keys: RwLock<HashMap<(String, KeyRole), [u8; 32]>>,
}

impl MemoryDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyDirectory for MemoryDirectory {
    fn publish(&self, name: &str, role: KeyRole, key: [u8; 32]) -> Result<()> {
        let mut keys = write(&self.keys)?;
        let slot = (name.to_string(), role);
        if keys.contains_key(&slot) {
            return Err(StoreError::AlreadyPublished {
                name: name.to_string(),
                role,
            });
        }
        keys.insert(slot, key);
        Ok(())
    }

    fn lookup(&self, name: &str, role: KeyRole) -> Result<Option<[u8; 32]>> {
        Ok(read(&self.keys)?.get(&(name.to_string(), role)).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let store = MemoryBlobStore::new();
        let id = BlobId::random();

        assert_eq!(store.get(&id).unwrap(), None);
        store.put(&id, b"hello").unwrap();
        assert_eq!(store.get(&id).unwrap(), Some(b"hello".to_vec()));
        assert!(store.contains(&id).unwrap());

        store.put(&id, b"bye").unwrap();
        assert_eq!(store.get(&id).unwrap(), Some(b"bye".to_vec()));

        store.delete(&id).unwrap();
        assert_eq!(store.get(&id).unwrap(), None);
        // Deleting again is fine
        store.delete(&id).unwrap();
    }

    #[test]
    fn test_inspection_hooks() {
        let store = MemoryBlobStore::new();
        assert!(store.is_empty().unwrap());

        let a = BlobId::random();
        let b = BlobId::random();
        store.put(&a, &[0u8; 10]).unwrap();
        store.put(&b, &[0u8; 5]).unwrap();

        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.raw_len().unwrap(), 15);
        let ids = store.ids().unwrap();
        assert!(ids.contains(&a) && ids.contains(&b));
    }

    #[test]
    fn test_directory_is_append_only() {
        let dir = MemoryDirectory::new();
        dir.publish("alice", KeyRole::Encryption, [1u8; 32]).unwrap();
        dir.publish("alice", KeyRole::Verification, [2u8; 32]).unwrap();

        let err = dir
            .publish("alice", KeyRole::Encryption, [3u8; 32])
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyPublished { .. }));

        assert_eq!(
            dir.lookup("alice", KeyRole::Encryption).unwrap(),
            Some([1u8; 32])
        );
        assert_eq!(
            dir.lookup("alice", KeyRole::Verification).unwrap(),
            Some([2u8; 32])
        );
        assert_eq!(dir.lookup("bob", KeyRole::Encryption).unwrap(), None);
    }

    #[test]
    fn test_directory_names_are_case_sensitive() {
        let dir = MemoryDirectory::new();
        dir.publish("Alice", KeyRole::Encryption, [1u8; 32]).unwrap();
        assert_eq!(dir.lookup("alice", KeyRole::Encryption).unwrap(), None);
        dir.publish("alice", KeyRole::Encryption, [2u8; 32]).unwrap();
    }
}
