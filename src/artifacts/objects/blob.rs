//! Git blob object
//!
//! Blobs store file content. They contain only the raw bytes, without any
//! metadata like filename or permissions (those are stored in trees).
//!
//! ## Format
//!
//! On disk: `blob <size>\0<content>`

use crate::areas::database::Database;
use crate::artifacts::objects::object::{AnyObject, Object, Packable, TypedObject, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::errors::{Result, ResultExt};
use bytes::Bytes;
use std::path::Path;

/// Git blob object representing file content
#[derive(Debug, Clone, Default)]
pub struct Blob {
    content: Bytes,
    id: Option<ObjectId>,
}

impl Blob {
    pub fn new(content: Bytes) -> Self {
        Blob { content, id: None }
    }

    /// Read a file's bytes into a new, unwritten blob
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut blob = Blob::default();
        blob.set_raw_content_from_file(path)?;
        Ok(blob)
    }

    /// Store the file at `path` as a blob, returning its id
    pub fn write_file(database: &Database, path: &Path) -> Result<ObjectId> {
        Blob::from_file(path)?.write(database)
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn raw_content(&self) -> &Bytes {
        &self.content
    }

    pub fn set_raw_content(&mut self, content: impl Into<Bytes>) {
        self.content = content.into();
        self.id = None;
    }

    pub fn set_raw_content_from_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read(path).during("Blob.set_raw_content_from_file")?;
        self.set_raw_content(content);
        Ok(())
    }

    pub fn write(&mut self, database: &Database) -> Result<ObjectId> {
        let id = database.write(&*self)?;
        self.id = Some(id);
        Ok(id)
    }

    pub(crate) fn assign_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content
    }
}

impl Eq for Blob {}

impl Packable for Blob {
    fn serialize_body(&self) -> Result<Bytes> {
        Ok(self.content.clone())
    }
}

impl Unpackable for Blob {
    fn deserialize(body: Bytes) -> Result<Self> {
        Ok(Blob::new(body))
    }
}

impl Object for Blob {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Blob
    }

    fn id(&self) -> Option<&ObjectId> {
        self.id.as_ref()
    }
}

impl TypedObject for Blob {
    const KIND: ObjectKind = ObjectKind::Blob;

    fn try_from_any(object: AnyObject) -> Result<Self> {
        match object {
            AnyObject::Blob(blob) => Ok(blob),
            other => Err(other.mismatch(Self::KIND)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_blob_has_well_known_id() {
        let blob = Blob::default();

        assert_eq!(blob.size(), 0);
        assert_eq!(
            blob.compute_id().unwrap().to_hex(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }

    #[test]
    fn setting_content_forgets_stored_id() {
        let mut blob = Blob::new(Bytes::from_static(b"one"));
        blob.assign_id(ObjectId::hash(b"blob 3\0one"));

        blob.set_raw_content("two");

        assert_eq!(blob.id(), None);
        assert_eq!(blob.raw_content(), &Bytes::from_static(b"two"));
    }

    #[test]
    fn binary_content_is_preserved() {
        let content = vec![0u8, 159, 146, 150, 255, b'\n'];
        let blob = Blob::new(Bytes::from(content.clone()));

        let encoded = blob.serialize().unwrap();

        assert_eq!(&encoded[..7], b"blob 6\0");
        assert_eq!(&encoded[7..], content.as_slice());
    }
}
