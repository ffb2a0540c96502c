//! Content-addressed blob storage for docvault.
//!
//! Blobs are immutable byte sequences identified by the SHA-1 of their
//! content. A store is built once, offline, then opened read-only for
//! serving; there is no update, delete or garbage collection.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//! - [`DirectoryBlobStore`] -- one file per object under `ab/cdef…` shards
//! - [`ArchiveBlobStore`] -- a single append-only ustar archive
//!
//! # Design Rules
//!
//! 1. Adding identical bytes twice yields the same id and stores them once.
//! 2. Adding bytes whose id is taken by different bytes is a [`StoreError::Collision`].
//! 3. Existing bytes are never rewritten; the archive only grows at its end.
//! 4. Concurrent reads are always safe (objects are immutable).
//! 5. All I/O errors are propagated, never silently ignored.

pub mod archive;
pub mod config;
pub mod directory;
pub mod error;
pub mod memory;
pub mod traits;

pub use archive::{ArchiveBlobStore, MemberLocation};
pub use config::{open_store, BackendKind, StoreConfig};
pub use directory::DirectoryBlobStore;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBlobStore;
pub use traits::BlobStore;

pub use bytes::Bytes;
pub use docvault_types::ObjectId;
