use crate::artifacts::index::{EXTENDED_VERSION, HEADER_SIZE, SIGNATURE, VERSION};
use crate::errors::{ErrorKind, Result};
use byteorder::{ByteOrder, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct IndexHeader {
    pub(crate) version: u32,
    pub(crate) entries_count: u32,
}

impl IndexHeader {
    pub(crate) fn serialize(&self) -> std::io::Result<Bytes> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        bytes.write_all(SIGNATURE)?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.version)?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.entries_count)?;

        Ok(Bytes::from(bytes))
    }

    pub(crate) fn deserialize(bytes: &[u8]) -> Result<Self> {
        let invalid = |reason: String| ErrorKind::IndexIo { reason }.during("Index.read");

        if bytes.len() < HEADER_SIZE {
            return Err(invalid("truncated index header".to_string()));
        }
        if &bytes[0..4] != SIGNATURE {
            return Err(invalid("invalid index file signature".to_string()));
        }

        let version = byteorder::NetworkEndian::read_u32(&bytes[4..8]);
        if version != VERSION && version != EXTENDED_VERSION {
            return Err(invalid(format!("unsupported index file version {version}")));
        }
        let entries_count = byteorder::NetworkEndian::read_u32(&bytes[8..12]);

        Ok(IndexHeader {
            version,
            entries_count,
        })
    }
}
