use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use bytes::Bytes;
use docvault_types::ObjectId;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Nothing is persisted. Blobs are held
/// as [`Bytes`] so reads hand out cheap clones of the stored buffer.
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<ObjectId, Bytes>>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }

    /// Insert `data` under `id` without hashing it.
    ///
    /// Exists so tests can stage a colliding entry; the store itself always
    /// derives ids from content.
    #[cfg(test)]
    pub(crate) fn insert_raw(&self, id: ObjectId, data: &[u8]) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Bytes::copy_from_slice(data));
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn add_object(&self, data: &[u8]) -> StoreResult<ObjectId> {
        let id = ObjectId::compute(data);
        let mut map = self.objects.write().map_err(|_| StoreError::poisoned())?;
        match map.get(&id) {
            Some(existing) if existing.as_ref() != data => Err(StoreError::Collision(id)),
            Some(_) => Ok(id),
            None => {
                map.insert(id, Bytes::copy_from_slice(data));
                debug!(id = %id.short_hex(), len = data.len(), "stored blob in memory");
                Ok(id)
            }
        }
    }

    fn get_object(&self, id: &ObjectId) -> StoreResult<Bytes> {
        let map = self.objects.read().map_err(|_| StoreError::poisoned())?;
        map.get(id).cloned().ok_or(StoreError::NotFound(*id))
    }

    fn contains(&self, id: &ObjectId) -> StoreResult<bool> {
        let map = self.objects.read().map_err(|_| StoreError::poisoned())?;
        Ok(map.contains_key(id))
    }

    fn object_ids(&self) -> StoreResult<Vec<ObjectId>> {
        let map = self.objects.read().map_err(|_| StoreError::poisoned())?;
        let mut ids: Vec<ObjectId> = map.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("object_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Content addressing
    // -----------------------------------------------------------------------

    #[test]
    fn add_and_get() {
        let store = InMemoryBlobStore::new();
        let id = store.add_object(b"hello world").unwrap();
        assert_eq!(id, ObjectId::compute(b"hello world"));
        assert_eq!(store.get_object(&id).unwrap().as_ref(), b"hello world");
    }

    #[test]
    fn add_is_idempotent() {
        let store = InMemoryBlobStore::new();
        let id1 = store.add_object(b"idempotent").unwrap();
        let id2 = store.add_object(b"idempotent").unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn different_content_produces_different_ids() {
        let store = InMemoryBlobStore::new();
        let id1 = store.add_object(b"aaa").unwrap();
        let id2 = store.add_object(b"bbb").unwrap();
        assert_ne!(id1, id2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn empty_blob_is_storable() {
        let store = InMemoryBlobStore::new();
        let id = store.add_object(b"").unwrap();
        assert!(store.get_object(&id).unwrap().is_empty());
    }

    #[test]
    fn collision_is_reported() {
        let store = InMemoryBlobStore::new();
        let id = ObjectId::compute(b"genuine");
        store.insert_raw(id, b"impostor");
        let err = store.add_object(b"genuine").unwrap_err();
        assert!(matches!(err, StoreError::Collision(c) if c == id));
    }

    // -----------------------------------------------------------------------
    // Lookup failures
    // -----------------------------------------------------------------------

    #[test]
    fn missing_object_is_not_found() {
        let store = InMemoryBlobStore::new();
        let id = ObjectId::compute(b"missing");
        assert!(matches!(store.get_object(&id), Err(StoreError::NotFound(_))));
        assert!(!store.contains(&id).unwrap());
    }

    #[test]
    fn malformed_hex_is_invalid_id() {
        let store = InMemoryBlobStore::new();
        let a = store.add_object(b"a").unwrap();
        let b = store.add_object(b"b").unwrap();
        let err = store.get_object_hex(&format!("{a}{b}")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidId { .. }));
        assert_eq!(store.get_object_hex(&a.to_hex()).unwrap().as_ref(), b"a");
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[test]
    fn total_bytes_and_ids() {
        let store = InMemoryBlobStore::default();
        assert!(store.is_empty());
        store.add_object(b"12345").unwrap();
        store.add_object(b"123456789").unwrap();
        assert_eq!(store.total_bytes(), 14);
        let ids = store.object_ids().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] <= ids[1]);
    }

    #[test]
    fn batch_add() {
        let store = InMemoryBlobStore::new();
        let ids = store
            .add_objects(&[b"one".as_slice(), b"two".as_slice(), b"one".as_slice()])
            .unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], ids[2]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryBlobStore::new());
        let id = store.add_object(b"shared data").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let data = store.get_object(&id).unwrap();
                    assert_eq!(ObjectId::compute(&data), id);
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryBlobStore::new();
        store.add_object(b"x").unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryBlobStore"));
        assert!(debug.contains("object_count"));
    }
}
