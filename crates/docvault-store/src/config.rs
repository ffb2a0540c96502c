use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::archive::ArchiveBlobStore;
use crate::directory::DirectoryBlobStore;
use crate::error::StoreResult;
use crate::memory::InMemoryBlobStore;
use crate::traits::BlobStore;

/// Which blob store backend to construct.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Volatile `HashMap` store.
    Memory,
    /// One file per object under `<path>/ab/cdef…`.
    #[default]
    Directory,
    /// Single append-only ustar archive at `<path>`.
    Archive,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Directory => write!(f, "directory"),
            Self::Archive => write!(f, "archive"),
        }
    }
}

/// Configuration for opening a blob store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend to construct.
    pub backend: BackendKind,
    /// Directory root or archive file, depending on the backend.
    pub path: PathBuf,
    /// Open without write access (serving mode).
    pub read_only: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Directory,
            path: PathBuf::from("objects"),
            read_only: false,
        }
    }
}

/// Construct the configured backend.
pub fn open_store(config: &StoreConfig) -> StoreResult<Box<dyn BlobStore>> {
    info!(
        backend = %config.backend,
        path = %config.path.display(),
        read_only = config.read_only,
        "opening blob store"
    );
    let store: Box<dyn BlobStore> = match (config.backend, config.read_only) {
        (BackendKind::Memory, _) => Box::new(InMemoryBlobStore::new()),
        (BackendKind::Directory, false) => Box::new(DirectoryBlobStore::open(&config.path)?),
        (BackendKind::Directory, true) => {
            Box::new(DirectoryBlobStore::open_read_only(&config.path)?)
        }
        (BackendKind::Archive, false) => Box::new(ArchiveBlobStore::open(&config.path)?),
        (BackendKind::Archive, true) => Box::new(ArchiveBlobStore::open_read_only(&config.path)?),
    };
    Ok(store)
}
