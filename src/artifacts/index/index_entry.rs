//! Index entry representation
//!
//! Each entry in the index represents a staged file with:
//! - File path
//! - Content hash (blob id)
//! - File metadata (mode, size, timestamps, device/inode, owner)
//! - Flags (stage, extended flags)
//!
//! ## Entry Format
//!
//! ```text
//! ctime s | ctime ns | mtime s | mtime ns | dev | ino | mode | uid | gid | size   (10 x u32)
//! oid (20 bytes) | flags (u16) | [extended flags (u16)] | path | 1..8 NUL
//! ```
//!
//! Timestamps are kept to the second. Nanosecond fields are written as 0 and
//! ignored on read.

use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{ErrorKind, Result};
use byteorder::{ByteOrder, WriteBytesExt};
use bytes::Bytes;
use is_executable::IsExecutable;
use std::fs::Metadata;
use std::io::Write;
use std::os::unix::prelude::MetadataExt;
use std::path::Path;

/// Block size for entry alignment (8 bytes)
pub const ENTRY_BLOCK: usize = 8;

/// Size of the fixed part of an entry, before any extended flags and the path
pub const ENTRY_FIXED_SIZE: usize = 62;

/// Name lengths at or above this value are stored as this value
pub const MAX_NAME_LENGTH: usize = 0xfff;

pub const FLAG_ASSUME_VALID: u16 = 0x8000;
pub const FLAG_EXTENDED: u16 = 0x4000;
const FLAG_STAGE_MASK: u16 = 0x3000;
const FLAG_STAGE_SHIFT: u16 = 12;

/// Highest merge stage (0 = normal, 1 = base, 2 = ours, 3 = theirs)
pub const MAX_STAGE: u8 = 3;

/// One staged path
///
/// `flags` holds the assume-valid bit and the merge stage; the name-length
/// bits and the extended bit are derived when the entry is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Status change time (seconds since Unix epoch)
    pub ctime: i64,
    /// Modification time (seconds since Unix epoch)
    pub mtime: i64,
    pub dev: u32,
    pub ino: u32,
    pub mode: EntryMode,
    pub uid: u32,
    pub gid: u32,
    pub file_size: u32,
    pub oid: ObjectId,
    pub flags: u16,
    pub flags_extended: u16,
    /// Slash-separated path relative to the work tree root
    pub path: String,
}

impl IndexEntry {
    pub fn new(path: impl Into<String>, oid: ObjectId, mode: EntryMode) -> Self {
        IndexEntry {
            ctime: 0,
            mtime: 0,
            dev: 0,
            ino: 0,
            mode,
            uid: 0,
            gid: 0,
            file_size: 0,
            oid,
            flags: 0,
            flags_extended: 0,
            path: path.into(),
        }
    }

    /// Build an entry for a work-tree file from its stat data
    pub fn from_metadata(
        path: impl Into<String>,
        oid: ObjectId,
        file_path: &Path,
        metadata: &Metadata,
    ) -> Self {
        let mode = if metadata.file_type().is_symlink() {
            EntryMode::File(FileMode::Symlink)
        } else if file_path.is_executable() {
            EntryMode::File(FileMode::Executable)
        } else {
            EntryMode::File(FileMode::Regular)
        };

        IndexEntry {
            ctime: metadata.ctime(),
            mtime: metadata.mtime(),
            dev: metadata.dev() as u32,
            ino: metadata.ino() as u32,
            mode,
            uid: metadata.uid(),
            gid: metadata.gid(),
            file_size: metadata.size() as u32,
            oid,
            flags: 0,
            flags_extended: 0,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Merge stage stored in bits 12-13 of the flags
    pub fn stage(&self) -> u8 {
        ((self.flags & FLAG_STAGE_MASK) >> FLAG_STAGE_SHIFT) as u8
    }

    pub fn set_stage(&mut self, stage: u8) {
        let stage = u16::from(stage.min(MAX_STAGE));
        self.flags = (self.flags & !FLAG_STAGE_MASK) | (stage << FLAG_STAGE_SHIFT);
    }

    pub fn is_extended(&self) -> bool {
        self.flags_extended != 0
    }

    /// Directories above this path, outermost first ("a/b/c" -> ["a", "a/b"])
    pub fn parent_dirs(&self) -> Vec<&str> {
        self.path
            .match_indices('/')
            .map(|(position, _)| &self.path[..position])
            .collect()
    }

    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// On-disk form, padded to the 8-byte block size
    pub(crate) fn serialize(&self) -> Result<Bytes> {
        let io_error = |e: std::io::Error| {
            ErrorKind::IndexIo {
                reason: e.to_string(),
            }
            .during("Index.write")
        };

        let name_length = self.path.len().min(MAX_NAME_LENGTH) as u16;
        let mut flags = (self.flags & (FLAG_ASSUME_VALID | FLAG_STAGE_MASK)) | name_length;
        if self.is_extended() {
            flags |= FLAG_EXTENDED;
        }

        let mut entry_bytes = Vec::with_capacity(ENTRY_FIXED_SIZE + self.path.len() + ENTRY_BLOCK);
        let words = [
            self.ctime as u32,
            0,
            self.mtime as u32,
            0,
            self.dev,
            self.ino,
            self.mode.as_u32(),
            self.uid,
            self.gid,
            self.file_size,
        ];
        for word in words {
            entry_bytes
                .write_u32::<byteorder::NetworkEndian>(word)
                .map_err(io_error)?;
        }
        self.oid.write_raw_to(&mut entry_bytes).map_err(io_error)?;
        entry_bytes
            .write_u16::<byteorder::NetworkEndian>(flags)
            .map_err(io_error)?;
        if self.is_extended() {
            entry_bytes
                .write_u16::<byteorder::NetworkEndian>(self.flags_extended)
                .map_err(io_error)?;
        }
        entry_bytes
            .write_all(self.path.as_bytes())
            .map_err(io_error)?;

        // At least one NUL terminates the path
        entry_bytes.push(0);
        while entry_bytes.len() % ENTRY_BLOCK != 0 {
            entry_bytes.push(0);
        }

        Ok(Bytes::from(entry_bytes))
    }

    /// Decode the fixed part of an entry; the path is filled in by the caller
    pub(crate) fn deserialize_fixed(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ENTRY_FIXED_SIZE {
            return Err(ErrorKind::IndexIo {
                reason: "truncated index entry".to_string(),
            }
            .during("Index.read"));
        }

        let word = |at: usize| byteorder::NetworkEndian::read_u32(&bytes[at..at + 4]);
        let mode = EntryMode::try_from(word(24)).map_err(|e| {
            ErrorKind::IndexIo {
                reason: e.into_kind().to_string(),
            }
            .during("Index.read")
        })?;
        let oid = ObjectId::from_raw(&bytes[40..60])?;

        Ok(IndexEntry {
            ctime: i64::from(word(0)),
            mtime: i64::from(word(8)),
            dev: word(16),
            ino: word(20),
            mode,
            uid: word(28),
            gid: word(32),
            file_size: word(36),
            oid,
            flags: byteorder::NetworkEndian::read_u16(&bytes[60..62]),
            flags_extended: 0,
            path: String::new(),
        })
    }

    /// Name length recorded in the flags, if it fits in 12 bits
    pub(crate) fn recorded_name_length(&self) -> Option<usize> {
        let length = usize::from(self.flags) & MAX_NAME_LENGTH;
        (length < MAX_NAME_LENGTH).then_some(length)
    }

    pub(crate) fn has_extended_flag(&self) -> bool {
        self.flags & FLAG_EXTENDED != 0
    }

    /// Keep only the bits callers own once the entry has been decoded
    pub(crate) fn normalize_flags(&mut self) {
        self.flags &= FLAG_ASSUME_VALID | FLAG_STAGE_MASK;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn oid() -> ObjectId {
        ObjectId::hash(b"test data")
    }

    #[rstest]
    fn parent_dirs_are_outermost_first(oid: ObjectId) {
        let entry = IndexEntry::new("a/b/c", oid, EntryMode::REGULAR);

        assert_eq!(entry.parent_dirs(), vec!["a", "a/b"]);
        assert_eq!(entry.basename(), "c");
    }

    #[rstest]
    fn top_level_entry_has_no_parents(oid: ObjectId) {
        let entry = IndexEntry::new("a", oid, EntryMode::REGULAR);

        assert!(entry.parent_dirs().is_empty());
        assert_eq!(entry.basename(), "a");
    }

    #[rstest]
    #[case("a", 64)]
    #[case("abc", 72)]
    #[case("twelve_chars", 80)]
    fn entries_are_padded_to_blocks(oid: ObjectId, #[case] path: &str, #[case] size: usize) {
        let entry = IndexEntry::new(path, oid, EntryMode::REGULAR);

        let bytes = entry.serialize().unwrap();

        assert_eq!(bytes.len(), size);
        assert_eq!(bytes[bytes.len() - 1], 0);
    }

    #[rstest]
    fn stage_lives_in_flag_bits(oid: ObjectId) {
        let mut entry = IndexEntry::new("conflicted", oid, EntryMode::REGULAR);

        entry.set_stage(2);
        let bytes = entry.serialize().unwrap();
        let flags = byteorder::NetworkEndian::read_u16(&bytes[60..62]);

        assert_eq!(entry.stage(), 2);
        assert_eq!(flags, 0x2000 | "conflicted".len() as u16);
    }

    #[rstest]
    fn fixed_part_decodes_seconds_only(oid: ObjectId) {
        let mut entry = IndexEntry::new("file", oid, EntryMode::EXECUTABLE);
        entry.ctime = 1_700_000_000;
        entry.mtime = 1_700_000_001;
        entry.file_size = 42;

        let bytes = entry.serialize().unwrap();
        let decoded = IndexEntry::deserialize_fixed(&bytes).unwrap();

        assert_eq!(decoded.ctime, 1_700_000_000);
        assert_eq!(decoded.mtime, 1_700_000_001);
        assert_eq!(decoded.mode, EntryMode::EXECUTABLE);
        assert_eq!(decoded.file_size, 42);
        assert_eq!(decoded.oid, oid);
        assert_eq!(decoded.recorded_name_length(), Some(4));
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
    }

    #[rstest]
    fn extended_entries_carry_two_more_bytes(oid: ObjectId) {
        let mut entry = IndexEntry::new("abc", oid, EntryMode::REGULAR);
        entry.flags_extended = 0x2000;

        let bytes = entry.serialize().unwrap();

        assert_eq!(bytes.len(), 72);
        assert!(IndexEntry::deserialize_fixed(&bytes).unwrap().has_extended_flag());
        assert_eq!(byteorder::NetworkEndian::read_u16(&bytes[62..64]), 0x2000);
    }
}
