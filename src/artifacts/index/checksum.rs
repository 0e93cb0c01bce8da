//! SHA-1 trailer over everything read from or written to the index file

use crate::artifacts::index::CHECKSUM_SIZE;
use crate::errors::{ErrorKind, Result};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::{Read, Write};

fn index_error(operation: &'static str, reason: impl Into<String>) -> crate::errors::Error {
    ErrorKind::IndexIo {
        reason: reason.into(),
    }
    .during(operation)
}

/// Hashing reader/writer over a (locked) index file
#[derive(Debug)]
pub struct Checksum<F> {
    file: F,
    digest: Sha1,
    /// Bytes passed through so far
    offset: u64,
}

impl<F> Checksum<F> {
    pub(crate) fn new(file: F) -> Self {
        Checksum {
            file,
            digest: Sha1::new(),
            offset: 0,
        }
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> F {
        self.file
    }
}

impl<F: Read> Checksum<F> {
    pub(crate) fn read(&mut self, size: usize) -> Result<Bytes> {
        let mut buffer = vec![0; size];
        self.file
            .read_exact(&mut buffer)
            .map_err(|_| index_error("Index.read", "unexpected end-of-file while reading index"))?;

        self.digest.update(&buffer);
        self.offset += size as u64;
        Ok(Bytes::from(buffer))
    }

    /// Read the stored trailer and compare it against everything read so far
    pub(crate) fn verify(&mut self) -> Result<()> {
        let mut expected_checksum = [0u8; CHECKSUM_SIZE];
        self.file
            .read_exact(&mut expected_checksum)
            .map_err(|_| index_error("Index.read", "missing index checksum"))?;

        let actual_checksum = self.digest.clone().finalize();
        if expected_checksum != actual_checksum.as_slice() {
            return Err(index_error(
                "Index.read",
                "checksum does not match value stored on disk",
            ));
        }

        Ok(())
    }
}

impl<F: Write> Checksum<F> {
    pub(crate) fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file
            .write_all(data)
            .map_err(|e| index_error("Index.write", e.to_string()))?;
        self.digest.update(data);
        self.offset += data.len() as u64;
        Ok(())
    }

    pub(crate) fn write_checksum(&mut self) -> Result<()> {
        let checksum = self.digest.clone().finalize();
        self.file
            .write_all(checksum.as_slice())
            .and_then(|_| self.file.flush())
            .map_err(|_| index_error("Index.write", "failed to write checksum to index file"))
    }
}
