//! Object codec traits and the any-typed object handle
//!
//! Every object is encoded as `<type> <byte-length>\0<body>`; the object id
//! is the SHA-1 of exactly those bytes. Types only know how to produce and
//! consume their body, the header is added and checked here.

use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use crate::errors::{ErrorKind, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::io::Cursor;

pub trait Packable {
    /// Canonical body bytes, without the header
    fn serialize_body(&self) -> Result<Bytes>;
}

pub trait Unpackable {
    /// Decode a body whose header has already been consumed
    fn deserialize(body: Bytes) -> Result<Self>
    where
        Self: Sized;
}

pub trait Object: Packable {
    fn kind(&self) -> ObjectKind;

    /// Id of the stored form, if this value was read from or written to a database
    fn id(&self) -> Option<&ObjectId>;

    /// Full canonical encoding, header included
    fn serialize(&self) -> Result<Bytes> {
        let body = self.serialize_body()?;
        let header = self.kind().header(body.len());

        let mut object_bytes = BytesMut::with_capacity(header.len() + body.len());
        object_bytes.put_slice(header.as_bytes());
        object_bytes.put_slice(&body);

        Ok(object_bytes.freeze())
    }

    /// Hash the canonical encoding without storing it
    fn compute_id(&self) -> Result<ObjectId> {
        Ok(ObjectId::hash(&self.serialize()?))
    }

    /// Id of the stored form, or `UnwrittenObject` if there is none yet
    fn require_id(&self, operation: &'static str) -> Result<ObjectId> {
        self.id().copied().ok_or_else(|| {
            ErrorKind::UnwrittenObject { kind: self.kind() }.during(operation)
        })
    }
}

/// Statically typed objects, used for typed lookups.
pub trait TypedObject: Object + Sized {
    const KIND: ObjectKind;

    fn try_from_any(object: AnyObject) -> Result<Self>;
}

/// An object whose kind is only known at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyObject {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
    Tag(Tag),
}

impl AnyObject {
    /// Decode a full canonical encoding, checking header and length
    ///
    /// The decoded value carries the id computed from `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let id = ObjectId::hash(bytes);
        let mut reader = Cursor::new(bytes);
        let (kind, size) = ObjectKind::parse_header(&mut reader)?;

        let body = &bytes[reader.position() as usize..];
        if body.len() != size {
            return Err(ErrorKind::corrupt(format!(
                "{kind} header announces {size} bytes, body has {}",
                body.len()
            ))
            .during("Codec.decode"));
        }

        Self::decode_body(kind, Bytes::copy_from_slice(body), Some(id))
    }

    pub(crate) fn decode_body(kind: ObjectKind, body: Bytes, id: Option<ObjectId>) -> Result<Self> {
        let mut object = match kind {
            ObjectKind::Blob => AnyObject::Blob(Blob::deserialize(body)?),
            ObjectKind::Tree => AnyObject::Tree(Tree::deserialize(body)?),
            ObjectKind::Commit => AnyObject::Commit(Commit::deserialize(body)?),
            ObjectKind::Tag => AnyObject::Tag(Tag::deserialize(body)?),
        };

        if let Some(id) = id {
            object.assign_id(id);
        }

        Ok(object)
    }

    fn assign_id(&mut self, id: ObjectId) {
        match self {
            AnyObject::Blob(blob) => blob.assign_id(id),
            AnyObject::Tree(tree) => tree.assign_id(id),
            AnyObject::Commit(commit) => commit.assign_id(id),
            AnyObject::Tag(tag) => tag.assign_id(id),
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            AnyObject::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            AnyObject::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            AnyObject::Commit(commit) => Some(commit),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            AnyObject::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn into_typed<T: TypedObject>(self) -> Result<T> {
        T::try_from_any(self)
    }

    pub(crate) fn mismatch(&self, expected: ObjectKind) -> crate::errors::Error {
        ErrorKind::TypeMismatch {
            expected,
            actual: self.kind(),
        }
        .during("Object.lookup")
    }
}

impl Packable for AnyObject {
    fn serialize_body(&self) -> Result<Bytes> {
        match self {
            AnyObject::Blob(blob) => blob.serialize_body(),
            AnyObject::Tree(tree) => tree.serialize_body(),
            AnyObject::Commit(commit) => commit.serialize_body(),
            AnyObject::Tag(tag) => tag.serialize_body(),
        }
    }
}

impl Object for AnyObject {
    fn kind(&self) -> ObjectKind {
        match self {
            AnyObject::Blob(_) => ObjectKind::Blob,
            AnyObject::Tree(_) => ObjectKind::Tree,
            AnyObject::Commit(_) => ObjectKind::Commit,
            AnyObject::Tag(_) => ObjectKind::Tag,
        }
    }

    fn id(&self) -> Option<&ObjectId> {
        match self {
            AnyObject::Blob(blob) => blob.id(),
            AnyObject::Tree(tree) => tree.id(),
            AnyObject::Commit(commit) => commit.id(),
            AnyObject::Tag(tag) => tag.id(),
        }
    }
}

impl From<Blob> for AnyObject {
    fn from(blob: Blob) -> Self {
        AnyObject::Blob(blob)
    }
}

impl From<Tree> for AnyObject {
    fn from(tree: Tree) -> Self {
        AnyObject::Tree(tree)
    }
}

impl From<Commit> for AnyObject {
    fn from(commit: Commit) -> Self {
        AnyObject::Commit(commit)
    }
}

impl From<Tag> for AnyObject {
    fn from(tag: Tag) -> Self {
        AnyObject::Tag(tag)
    }
}
