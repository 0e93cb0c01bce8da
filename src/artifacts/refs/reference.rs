use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::refs::SYMREF_PREFIX;
use crate::artifacts::refs::ref_name::RefName;
use crate::errors::{ErrorKind, Result};
use bitflags::bitflags;

/// What a reference points at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefTarget {
    /// An object id
    Direct(ObjectId),
    /// Another reference, by name
    Symbolic(RefName),
}

impl RefTarget {
    /// Parse the content of a loose reference file
    pub fn parse(content: &str) -> Result<Self> {
        let content = content.trim();

        match content.strip_prefix(SYMREF_PREFIX) {
            Some(target) => Ok(RefTarget::Symbolic(RefName::try_parse(target)?)),
            None => ObjectId::from_hex(content)
                .map(RefTarget::Direct)
                .map_err(|_| {
                    ErrorKind::corrupt(format!("invalid reference content '{content}'"))
                        .during("References.lookup")
                }),
        }
    }

    /// Content written to a loose reference file
    pub fn encode(&self) -> String {
        match self {
            RefTarget::Direct(oid) => format!("{oid}\n"),
            RefTarget::Symbolic(name) => format!("{SYMREF_PREFIX}{name}\n"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Direct,
    Symbolic,
}

bitflags! {
    /// Categories selected by `RefStore::list_all`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RefFilter: u8 {
        const BRANCHES = 0b00001;
        const TAGS = 0b00010;
        const REMOTES = 0b00100;
        const SYMBOLIC = 0b01000;
        const PACKED = 0b10000;
        const ALL = Self::BRANCHES.bits()
            | Self::TAGS.bits()
            | Self::REMOTES.bits()
            | Self::SYMBOLIC.bits()
            | Self::PACKED.bits();
    }
}

/// A named pointer, as read from the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    name: RefName,
    target: RefTarget,
    packed: bool,
}

impl Reference {
    pub fn new(name: RefName, target: RefTarget) -> Self {
        Reference {
            name,
            target,
            packed: false,
        }
    }

    pub(crate) fn new_packed(name: RefName, oid: ObjectId) -> Self {
        Reference {
            name,
            target: RefTarget::Direct(oid),
            packed: true,
        }
    }

    pub fn name(&self) -> &RefName {
        &self.name
    }

    pub fn kind(&self) -> RefKind {
        match self.target {
            RefTarget::Direct(_) => RefKind::Direct,
            RefTarget::Symbolic(_) => RefKind::Symbolic,
        }
    }

    pub fn target(&self) -> &RefTarget {
        &self.target
    }

    pub fn target_id(&self) -> Option<&ObjectId> {
        match &self.target {
            RefTarget::Direct(oid) => Some(oid),
            RefTarget::Symbolic(_) => None,
        }
    }

    pub fn symbolic_target(&self) -> Option<&RefName> {
        match &self.target {
            RefTarget::Symbolic(name) => Some(name),
            RefTarget::Direct(_) => None,
        }
    }

    /// Read from `packed-refs` rather than a loose file
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    /// Listing categories this reference belongs to
    pub fn categories(&self) -> RefFilter {
        let mut categories = RefFilter::empty();
        categories.set(RefFilter::BRANCHES, self.name.is_branch());
        categories.set(RefFilter::TAGS, self.name.is_tag());
        categories.set(RefFilter::REMOTES, self.name.is_remote());
        categories.set(RefFilter::SYMBOLIC, self.kind() == RefKind::Symbolic);
        categories.set(RefFilter::PACKED, self.packed);
        categories
    }

    pub fn matches(&self, filter: RefFilter) -> bool {
        filter == RefFilter::ALL || self.categories().intersects(filter)
    }
}
