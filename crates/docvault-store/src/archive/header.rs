//! Restricted ustar header codec.
//!
//! Only the subset docvault writes is supported: regular-file members named
//! `ab/cdef…`, fixed mode/owner/mtime, no long-name extensions. Headers
//! written by other tools still decode as long as they carry the POSIX
//! `ustar\0` magic; members whose names are not object ids are skipped by
//! the archive scanner.
//!
//! ```text
//! offset  size  field
//!      0   100  name (NUL padded)
//!    100     8  mode      "0000644\0"
//!    108     8  uid       "0000000\0"
//!    116     8  gid       "0000000\0"
//!    124    12  size      11 octal digits + NUL
//!    136    12  mtime     11 octal digits + NUL
//!    148     8  chksum    6 octal digits + NUL + space
//!    156     1  typeflag  '0'
//!    157   100  linkname
//!    257     6  magic     "ustar\0"
//!    263     2  version   "00"
//!    265   247  uname, gname, devmajor, devminor, prefix, padding
//! ```

use std::ops::Range;

use docvault_types::ObjectId;

use crate::error::{StoreError, StoreResult};

/// Size of a tar block; headers occupy one block, payloads are padded to it.
pub const BLOCK_SIZE: usize = 512;

/// Largest payload the 11-digit octal size field can describe.
pub const MAX_MEMBER_SIZE: u64 = 0o777_7777_7777;

const NAME: Range<usize> = 0..100;
const MODE: Range<usize> = 100..108;
const UID: Range<usize> = 108..116;
const GID: Range<usize> = 116..124;
const SIZE: Range<usize> = 124..136;
const MTIME: Range<usize> = 136..148;
const CHKSUM: Range<usize> = 148..156;
const TYPEFLAG: usize = 156;
const MAGIC: Range<usize> = 257..263;
const VERSION: Range<usize> = 263..265;
const PREFIX: Range<usize> = 345..500;

const USTAR_MAGIC: &[u8; 6] = b"ustar\0";
const USTAR_VERSION: &[u8; 2] = b"00";
const FILE_MODE: u64 = 0o644;
const REGULAR_FILE: u8 = b'0';

/// A decoded member header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberHeader {
    /// Member path inside the archive.
    pub name: String,
    /// Payload length in bytes.
    pub size: u64,
    /// Raw ustar type flag.
    pub typeflag: u8,
}

impl MemberHeader {
    /// Header for a blob member.
    pub fn for_object(id: &ObjectId, size: u64) -> Self {
        Self {
            name: id.shard_name(),
            size,
            typeflag: REGULAR_FILE,
        }
    }

    /// The object id this member stores, if it is a regular file named
    /// like one.
    pub fn object_id(&self) -> Option<ObjectId> {
        if self.typeflag != REGULAR_FILE && self.typeflag != 0 {
            return None;
        }
        ObjectId::from_shard_name(&self.name).ok()
    }

    /// Encode into a 512-byte header block.
    pub fn encode(&self) -> StoreResult<[u8; BLOCK_SIZE]> {
        if self.size > MAX_MEMBER_SIZE {
            return Err(StoreError::ObjectTooLarge {
                size: self.size,
                max: MAX_MEMBER_SIZE,
            });
        }
        let name = self.name.as_bytes();
        if name.len() > NAME.len() {
            return Err(StoreError::corruption(
                0,
                format!("member name too long: {}", self.name),
            ));
        }

        let mut block = [0u8; BLOCK_SIZE];
        block[..name.len()].copy_from_slice(name);
        write_octal(&mut block[MODE], FILE_MODE);
        write_octal(&mut block[UID], 0);
        write_octal(&mut block[GID], 0);
        write_octal(&mut block[SIZE], self.size);
        write_octal(&mut block[MTIME], 0);
        block[TYPEFLAG] = self.typeflag;
        block[MAGIC].copy_from_slice(USTAR_MAGIC);
        block[VERSION].copy_from_slice(USTAR_VERSION);

        let sum = checksum(&block);
        let field = format!("{sum:06o}\0 ");
        block[CHKSUM].copy_from_slice(field.as_bytes());
        Ok(block)
    }

    /// Decode a header block read at archive offset `offset`.
    ///
    /// Returns `Ok(None)` for an end-of-archive block (all-zero name field).
    pub fn decode(block: &[u8; BLOCK_SIZE], offset: u64) -> StoreResult<Option<Self>> {
        if block[NAME].iter().all(|&b| b == 0) {
            return Ok(None);
        }
        if &block[MAGIC] != USTAR_MAGIC {
            return Err(StoreError::corruption(
                offset,
                format!(
                    "bad ustar magic {:?}",
                    String::from_utf8_lossy(&block[MAGIC])
                ),
            ));
        }

        let stored = parse_octal(&block[CHKSUM], offset, "checksum")?;
        let computed = u64::from(checksum(block));
        if stored != computed {
            return Err(StoreError::corruption(
                offset,
                format!("header checksum mismatch: stored {stored:o}, computed {computed:o}"),
            ));
        }

        let size = parse_octal(&block[SIZE], offset, "size")?;
        let mut name = field_str(&block[NAME]);
        let prefix = field_str(&block[PREFIX]);
        if !prefix.is_empty() {
            name = format!("{prefix}/{name}");
        }

        Ok(Some(Self {
            name,
            size,
            typeflag: block[TYPEFLAG],
        }))
    }
}

/// Payload length rounded up to a whole number of blocks.
pub fn padded_len(size: u64) -> u64 {
    let block = BLOCK_SIZE as u64;
    size.div_ceil(block) * block
}

/// Unsigned byte sum of the header with the checksum field read as spaces.
fn checksum(block: &[u8; BLOCK_SIZE]) -> u32 {
    block
        .iter()
        .enumerate()
        .map(|(i, &b)| if CHKSUM.contains(&i) { u32::from(b' ') } else { u32::from(b) })
        .sum()
}

/// Zero-padded octal digits filling all but the last byte, then NUL.
fn write_octal(field: &mut [u8], value: u64) {
    let digits = field.len() - 1;
    let text = format!("{value:0digits$o}");
    field[..digits].copy_from_slice(text.as_bytes());
    field[digits] = 0;
}

fn parse_octal(field: &[u8], offset: u64, what: &str) -> StoreResult<u64> {
    let text: &[u8] = {
        let end = field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(field.len());
        &field[..end]
    };
    let trimmed = String::from_utf8_lossy(text);
    let trimmed = trimmed.trim_matches(' ');
    if trimmed.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(trimmed, 8).map_err(|_| {
        StoreError::corruption(offset, format!("invalid octal {what} field {trimmed:?}"))
    })
}

fn field_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
