//! Single-file archive backend.
//!
//! All blobs live in one append-only file laid out as a restricted ustar
//! stream (see [`header`]). Opening the archive scans it front to back and
//! records where each payload lives; new blobs are appended at the recorded
//! end of data, so earlier members are never rewritten.
//!
//! ```text
//! [header ab/cdef…][payload][zero padding to 512]
//! [header 12/3456…][payload][zero padding to 512]
//! ...
//! [two zero blocks]   <- trailer, overwritten by the next append
//! ```

pub mod header;

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use bytes::Bytes;
use docvault_types::ObjectId;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

use self::header::{padded_len, MemberHeader, BLOCK_SIZE};

/// Where a member's payload sits inside the archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberLocation {
    /// Byte offset of the first payload byte.
    pub offset: u64,
    /// Payload length in bytes.
    pub len: u64,
}

struct ArchiveState<S> {
    stream: S,
    members: HashMap<ObjectId, MemberLocation>,
    /// Offset just past the last member's padding; the next header goes here.
    end_of_data: u64,
}

impl<S: Read + Seek> ArchiveState<S> {
    fn read_member(&mut self, location: MemberLocation) -> StoreResult<Vec<u8>> {
        let len = usize::try_from(location.len).map_err(|_| StoreError::ObjectTooLarge {
            size: location.len,
            max: usize::MAX as u64,
        })?;
        let mut data = vec![0u8; len];
        self.stream.seek(SeekFrom::Start(location.offset))?;
        self.stream.read_exact(&mut data)?;
        Ok(data)
    }
}

/// Blob store backed by a single ustar-style archive.
///
/// Generic over the underlying stream so tests can run against an in-memory
/// `Cursor<Vec<u8>>`; [`ArchiveBlobStore::open`] and
/// [`ArchiveBlobStore::open_read_only`] cover the file case.
pub struct ArchiveBlobStore<S = File> {
    state: Mutex<ArchiveState<S>>,
    writable: bool,
}

impl ArchiveBlobStore<File> {
    /// Open (or create) an archive file for reading and appending.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Self::from_stream(file, true)
    }

    /// Open an existing archive file without write access.
    ///
    /// Reads work as usual; `add_object` for new content fails with
    /// [`StoreError::ReadOnly`].
    pub fn open_read_only(path: impl AsRef<Path>) -> StoreResult<Self> {
        let file = File::open(path)?;
        Self::from_stream(file, false)
    }
}

impl<S: Read + Write + Seek + Send> ArchiveBlobStore<S> {
    /// Scan `stream` from byte 0 and build the member index.
    pub fn from_stream(mut stream: S, writable: bool) -> StoreResult<Self> {
        let (members, end_of_data) = scan(&mut stream)?;
        info!(members = members.len(), end_of_data, writable, "opened blob archive");
        Ok(Self {
            state: Mutex::new(ArchiveState {
                stream,
                members,
                end_of_data,
            }),
            writable,
        })
    }

    /// Whether new objects may be appended.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.members.len()).unwrap_or(0)
    }

    /// Returns `true` if the archive holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset at which the next member will be written.
    pub fn end_of_data(&self) -> StoreResult<u64> {
        let state = self.state.lock().map_err(|_| StoreError::poisoned())?;
        Ok(state.end_of_data)
    }

    /// Payload location of an object, if present.
    pub fn location(&self, id: &ObjectId) -> StoreResult<Option<MemberLocation>> {
        let state = self.state.lock().map_err(|_| StoreError::poisoned())?;
        Ok(state.members.get(id).copied())
    }

    /// Release the underlying stream.
    pub fn into_inner(self) -> StoreResult<S> {
        self.state
            .into_inner()
            .map(|s| s.stream)
            .map_err(|_| StoreError::poisoned())
    }
}

impl<S: Read + Write + Seek + Send> BlobStore for ArchiveBlobStore<S> {
    fn add_object(&self, data: &[u8]) -> StoreResult<ObjectId> {
        let id = ObjectId::compute(data);
        let mut state = self.state.lock().map_err(|_| StoreError::poisoned())?;

        if let Some(location) = state.members.get(&id).copied() {
            let existing = state.read_member(location)?;
            if existing != data {
                return Err(StoreError::Collision(id));
            }
            return Ok(id);
        }
        if !self.writable {
            return Err(StoreError::ReadOnly);
        }

        let len = data.len() as u64;
        let header = MemberHeader::for_object(&id, len).encode()?;
        let padding = (padded_len(len) - len) as usize;
        let offset = state.end_of_data;

        let stream = &mut state.stream;
        stream.seek(SeekFrom::Start(offset))?;
        stream.write_all(&header)?;
        stream.write_all(data)?;
        stream.write_all(&vec![0u8; padding])?;
        stream.write_all(&[0u8; 2 * BLOCK_SIZE])?;
        stream.flush()?;

        let payload_offset = offset + BLOCK_SIZE as u64;
        state.members.insert(
            id,
            MemberLocation {
                offset: payload_offset,
                len,
            },
        );
        state.end_of_data = payload_offset + padded_len(len);

        debug!(id = %id.short_hex(), offset, len, "appended archive member");
        Ok(id)
    }

    fn get_object(&self, id: &ObjectId) -> StoreResult<Bytes> {
        let mut state = self.state.lock().map_err(|_| StoreError::poisoned())?;
        let location = state
            .members
            .get(id)
            .copied()
            .ok_or(StoreError::NotFound(*id))?;
        state.read_member(location).map(Bytes::from)
    }

    fn contains(&self, id: &ObjectId) -> StoreResult<bool> {
        let state = self.state.lock().map_err(|_| StoreError::poisoned())?;
        Ok(state.members.contains_key(id))
    }

    fn object_ids(&self) -> StoreResult<Vec<ObjectId>> {
        let state = self.state.lock().map_err(|_| StoreError::poisoned())?;
        let mut ids: Vec<ObjectId> = state.members.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

impl<S> std::fmt::Debug for ArchiveBlobStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let members = self.state.lock().map(|s| s.members.len()).unwrap_or(0);
        f.debug_struct("ArchiveBlobStore")
            .field("members", &members)
            .field("writable", &self.writable)
            .finish()
    }
}

/// Walk the archive from byte 0, returning the member index and the offset
/// where the next member should be written.
fn scan<S: Read + Seek>(stream: &mut S) -> StoreResult<(HashMap<ObjectId, MemberLocation>, u64)> {
    let stream_len = stream.seek(SeekFrom::End(0))?;
    let mut members = HashMap::new();
    let mut block = [0u8; BLOCK_SIZE];
    let mut offset = 0u64;

    while offset < stream_len {
        if stream_len - offset < BLOCK_SIZE as u64 {
            return Err(StoreError::corruption(offset, "truncated header block"));
        }
        stream.seek(SeekFrom::Start(offset))?;
        stream.read_exact(&mut block)?;

        let Some(header) = MemberHeader::decode(&block, offset)? else {
            break;
        };
        let payload_offset = offset + BLOCK_SIZE as u64;
        if payload_offset + header.size > stream_len {
            let missing = payload_offset + header.size - stream_len;
            return Err(StoreError::corruption(
                offset,
                format!("member {} truncated: {missing} payload bytes missing", header.name),
            ));
        }

        match header.object_id() {
            Some(id) => {
                members.entry(id).or_insert(MemberLocation {
                    offset: payload_offset,
                    len: header.size,
                });
                debug!(id = %id.short_hex(), offset, len = header.size, "indexed archive member");
            }
            None => {
                warn!(name = %header.name, offset, "skipping non-object archive member");
            }
        }

        offset = payload_offset + padded_len(header.size);
    }

    Ok((members, offset))
}
