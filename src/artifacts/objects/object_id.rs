//! Git object identifier (SHA-1 digest)
//!
//! Object IDs are the 20-byte SHA-1 digest of an object's canonical encoding,
//! header included. They uniquely identify every object in the store.
//!
//! ## Format
//!
//! - Raw: 20 bytes (as embedded in tree entries and the index)
//! - Hex: 40 lowercase hexadecimal characters
//! - Short: first 7 hex characters
//!
//! ## Storage
//!
//! Loose objects live in `objects/<first-2-chars>/<remaining-38-chars>`

use crate::artifacts::objects::{OBJECT_ID_HEX_LENGTH, OBJECT_ID_RAW_LENGTH};
use crate::errors::{ErrorKind, Result};
use sha1::{Digest, Sha1};
use std::io;
use std::path::PathBuf;

/// Git object identifier
///
/// There is deliberately no `Default`: an all-zero id is never handed out
/// in place of a real one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_RAW_LENGTH]);

impl ObjectId {
    /// Hash arbitrary bytes into an object id
    pub fn hash(bytes: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        ObjectId(hasher.finalize().into())
    }

    /// Parse and validate an object id from its 40-character hex form
    ///
    /// Fails with `MalformedId` if the length or alphabet is wrong.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let malformed = || {
            ErrorKind::MalformedId {
                input: hex.to_string(),
            }
            .during("ObjectId.from_hex")
        };

        if hex.len() != OBJECT_ID_HEX_LENGTH {
            return Err(malformed());
        }

        let mut raw = [0u8; OBJECT_ID_RAW_LENGTH];
        hex::decode_to_slice(hex, &mut raw).map_err(|_| malformed())?;

        Ok(ObjectId(raw))
    }

    /// Build an object id from a raw digest buffer
    ///
    /// Only the first 20 bytes are used. Fails with `CorruptInput` if the
    /// buffer is shorter than the digest width.
    pub fn from_raw(raw: &[u8]) -> Result<Self> {
        let digest = raw.get(..OBJECT_ID_RAW_LENGTH).ok_or_else(|| {
            ErrorKind::CorruptInput {
                expected: OBJECT_ID_RAW_LENGTH,
                actual: raw.len(),
            }
            .during("ObjectId.from_raw")
        })?;

        let mut bytes = [0u8; OBJECT_ID_RAW_LENGTH];
        bytes.copy_from_slice(digest);
        Ok(ObjectId(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_RAW_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Write the object id in binary format (20 bytes)
    ///
    /// Used when serializing tree entries and index entries.
    pub fn write_raw_to<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.0)
    }

    /// Read an object id from binary format (20 bytes)
    pub fn read_raw_from<R: io::Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let mut bytes = [0u8; OBJECT_ID_RAW_LENGTH];
        reader.read_exact(&mut bytes)?;
        Ok(ObjectId(bytes))
    }

    /// Convert to file system path for loose object storage
    ///
    /// Splits the hash as `XX/YYYYYY...` where XX is the first 2 chars.
    pub fn to_path(&self) -> PathBuf {
        let hex = self.to_hex();
        let (dir, file) = hex.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// First 7 characters of the hash (standard Git abbreviation)
    pub fn to_short_oid(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(7);
        hex
    }
}

impl std::str::FromStr for ObjectId {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self> {
        ObjectId::from_hex(s)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}
