use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use docvault_types::ObjectId;
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// Blob store keeping one file per object in two-level sharded directories.
///
/// Object `abcdef…` lives at `<root>/ab/cdef…`; the shard directory is created
/// on first use. Files hold the raw blob bytes and nothing else. New objects
/// are written to a temporary file inside the shard directory and renamed
/// into place, so a partially written object never appears under its id.
#[derive(Debug, Clone)]
pub struct DirectoryBlobStore {
    root: PathBuf,
    writable: bool,
}

impl DirectoryBlobStore {
    /// Open (or create) a sharded store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "opened directory blob store");
        Ok(Self {
            root,
            writable: true,
        })
    }

    /// Open an existing store without write access.
    pub fn open_read_only(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("blob directory {} does not exist", root.display()),
            )));
        }
        Ok(Self {
            root,
            writable: false,
        })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of the object with the given id.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (prefix, rest) = id.shard_parts();
        self.root.join(prefix).join(rest)
    }

    fn read_existing(&self, path: &Path) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl BlobStore for DirectoryBlobStore {
    fn add_object(&self, data: &[u8]) -> StoreResult<ObjectId> {
        let id = ObjectId::compute(data);
        let path = self.object_path(&id);

        if let Some(existing) = self.read_existing(&path)? {
            if existing != data {
                return Err(StoreError::Collision(id));
            }
            return Ok(id);
        }
        if !self.writable {
            return Err(StoreError::ReadOnly);
        }

        let shard = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&shard)?;
        let mut tmp = NamedTempFile::new_in(&shard)?;
        tmp.write_all(data)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(id = %id.short_hex(), len = data.len(), "stored blob file");
        Ok(id)
    }

    fn get_object(&self, id: &ObjectId) -> StoreResult<Bytes> {
        self.read_existing(&self.object_path(id))?
            .map(Bytes::from)
            .ok_or(StoreError::NotFound(*id))
    }

    fn contains(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }

    fn object_ids(&self) -> StoreResult<Vec<ObjectId>> {
        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|e| {
                StoreError::Io(
                    e.into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "walk loop")),
                )
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = rel.to_string_lossy().replace('\\', "/");
            // Temporary files and anything else foreign to the layout are ignored.
            if let Ok(id) = ObjectId::from_shard_name(&name) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
