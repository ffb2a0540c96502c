use bytes::Bytes;
use docvault_types::ObjectId;

use crate::error::{StoreError, StoreResult};

/// Content-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - Blobs are immutable once added. The id is the SHA-1 of the bytes, so
///   the same data always produces the same id.
/// - Adding bytes whose id is already present compares the full content; a
///   mismatch is reported as [`StoreError::Collision`], never ignored.
/// - Nothing is ever rewritten or deleted.
/// - All I/O errors are propagated, never silently ignored.
pub trait BlobStore: Send + Sync {
    /// Store `data` and return its id. Idempotent.
    fn add_object(&self, data: &[u8]) -> StoreResult<ObjectId>;

    /// Fetch the bytes stored under `id`.
    ///
    /// Returns [`StoreError::NotFound`] if no such object exists.
    fn get_object(&self, id: &ObjectId) -> StoreResult<Bytes>;

    /// Check whether an object exists in the store.
    fn contains(&self, id: &ObjectId) -> StoreResult<bool>;

    /// All stored ids, sorted.
    fn object_ids(&self) -> StoreResult<Vec<ObjectId>>;

    /// Fetch by textual id. Malformed ids fail with [`StoreError::InvalidId`].
    fn get_object_hex(&self, id: &str) -> StoreResult<Bytes> {
        let parsed = ObjectId::from_hex(id).map_err(|e| StoreError::invalid_id(id, e))?;
        self.get_object(&parsed)
    }

    /// Add several blobs and return their ids in order.
    ///
    /// Default implementation calls `add_object()` for each blob.
    fn add_objects(&self, blobs: &[&[u8]]) -> StoreResult<Vec<ObjectId>> {
        blobs.iter().map(|data| self.add_object(data)).collect()
    }
}

impl<T: BlobStore + ?Sized> BlobStore for Box<T> {
    fn add_object(&self, data: &[u8]) -> StoreResult<ObjectId> {
        (**self).add_object(data)
    }

    fn get_object(&self, id: &ObjectId) -> StoreResult<Bytes> {
        (**self).get_object(id)
    }

    fn contains(&self, id: &ObjectId) -> StoreResult<bool> {
        (**self).contains(id)
    }

    fn object_ids(&self) -> StoreResult<Vec<ObjectId>> {
        (**self).object_ids()
    }
}
