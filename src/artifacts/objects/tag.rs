//! Git annotated tag object
//!
//! A tag names another object of any kind and records which kind it expects
//! that object to be. The annotation is checked whenever the target is read
//! or replaced.
//!
//! ## Format
//!
//! ```text
//! object <target-sha>
//! type <target-kind>
//! tag <name>
//! tagger <name> <email> <timestamp> <timezone>
//!
//! <message>
//! ```
//!
//! Tags created by very old git versions have no `tagger` line.

use crate::areas::database::Database;
use crate::artifacts::objects::commit::{push_extra_headers, split_headers};
use crate::artifacts::objects::object::{AnyObject, Object, Packable, TypedObject, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::signature::{Signature, SignatureRef};
use crate::errors::{ErrorKind, Result};
use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct Tag {
    name: String,
    target_oid: ObjectId,
    target_kind: ObjectKind,
    tagger: Option<Signature>,
    extra_headers: Vec<(String, String)>,
    message: String,
    id: Option<ObjectId>,
}

impl Tag {
    pub fn new(
        name: impl Into<String>,
        target_oid: ObjectId,
        target_kind: ObjectKind,
        tagger: Signature,
        message: impl Into<String>,
    ) -> Self {
        Tag {
            name: name.into(),
            target_oid,
            target_kind,
            tagger: Some(tagger),
            extra_headers: Vec::new(),
            message: message.into(),
            id: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind the target is annotated with
    pub fn target_kind(&self) -> ObjectKind {
        self.target_kind
    }

    pub fn target_id(&self) -> &ObjectId {
        &self.target_oid
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tagger(&self) -> Option<&Signature> {
        self.tagger.as_ref()
    }

    /// Load the target, checking it against the annotated kind
    pub fn target(&self, database: &Database) -> Result<AnyObject> {
        database.lookup_kind(&self.target_oid, Some(self.target_kind))
    }

    /// Point the tag at a stored object of the annotated kind
    ///
    /// On failure the tag is left untouched.
    pub fn set_target(&mut self, target: &impl Object) -> Result<()> {
        const OPERATION: &str = "Tag.set_target";

        if target.kind() != self.target_kind {
            return Err(ErrorKind::TypeMismatch {
                expected: self.target_kind,
                actual: target.kind(),
            }
            .during(OPERATION));
        }

        self.target_oid = target.require_id(OPERATION)?;
        self.id = None;
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.id = None;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.id = None;
    }

    pub fn set_tagger(&mut self, tagger: SignatureRef<'_>) {
        self.tagger = Some(tagger.to_signature());
        self.id = None;
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

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.target_oid == other.target_oid
            && self.target_kind == other.target_kind
            && self.tagger == other.tagger
            && self.extra_headers == other.extra_headers
            && self.message == other.message
    }
}

impl Eq for Tag {}

impl Packable for Tag {
    fn serialize_body(&self) -> Result<Bytes> {
        const OPERATION: &str = "Tag.encode";
        if self.name.contains('\n') || self.name.ends_with('\r') {
            return Err(ErrorKind::UnencodableField {
                field: "tag name",
                value: self.name.clone(),
            }
            .during(OPERATION));
        }
        if let Some(tagger) = &self.tagger {
            tagger.ensure_encodable(OPERATION)?;
        }

        let mut content = format!(
            "object {}\ntype {}\ntag {}\n",
            self.target_oid, self.target_kind, self.name
        );
        if let Some(tagger) = &self.tagger {
            content.push_str(&format!("tagger {}\n", tagger.encode()));
        }
        push_extra_headers(&mut content, &self.extra_headers);
        content.push('\n');
        content.push_str(&self.message);

        Ok(Bytes::from(content))
    }
}

impl Unpackable for Tag {
    fn deserialize(body: Bytes) -> Result<Self> {
        const OPERATION: &str = "Tag.decode";
        let corrupt = |reason: &str| ErrorKind::corrupt(reason).during(OPERATION);

        let content = std::str::from_utf8(&body).map_err(|_| corrupt("tag is not valid UTF-8"))?;
        let (headers, message) = split_headers(content, OPERATION)?;
        let mut headers = headers.into_iter().peekable();

        let target_oid = match headers.next() {
            Some(("object", value)) => ObjectId::from_hex(&value)?,
            _ => return Err(corrupt("missing object line")),
        };
        let target_kind = match headers.next() {
            Some(("type", value)) => ObjectKind::try_from(value.as_str())
                .map_err(|_| corrupt(&format!("unknown target type '{value}'")))?,
            _ => return Err(corrupt("missing type line")),
        };
        let name = match headers.next() {
            Some(("tag", value)) => value,
            _ => return Err(corrupt("missing tag line")),
        };

        let tagger = match headers.peek() {
            Some(("tagger", value)) => {
                let tagger = Signature::try_from(value.as_str())?;
                headers.next();
                Some(tagger)
            }
            _ => None,
        };

        let extra_headers = headers
            .map(|(key, value)| (key.to_string(), value))
            .collect();

        Ok(Tag {
            name,
            target_oid,
            target_kind,
            tagger,
            extra_headers,
            message: message.to_string(),
            id: None,
        })
    }
}

impl Object for Tag {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Tag
    }

    fn id(&self) -> Option<&ObjectId> {
        self.id.as_ref()
    }
}

impl TypedObject for Tag {
    const KIND: ObjectKind = ObjectKind::Tag;

    fn try_from_any(object: AnyObject) -> Result<Self> {
        match object {
            AnyObject::Tag(tag) => Ok(tag),
            other => Err(other.mismatch(Self::KIND)),
        }
    }
}
