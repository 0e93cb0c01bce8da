//! Git tree object
//!
//! Trees represent directory snapshots. They contain entries for files
//! (blobs), subdirectories (other trees) and submodules (commits), along with
//! their names and modes.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <name>\0<20-byte-sha1>`
//!
//! Entries are kept in git's canonical order: byte-wise by name, where a
//! subtree sorts as if its name ended in `/`. Names are unique; adding an
//! entry under an existing name replaces it.

use crate::areas::database::Database;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object::{AnyObject, Object, Packable, TypedObject, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::errors::{ErrorKind, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::io::{BufRead, Cursor};

/// A named pointer from a tree to another object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeEntry {
    name: String,
    mode: EntryMode,
    oid: ObjectId,
}

impl TreeEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    pub fn id(&self) -> &ObjectId {
        &self.oid
    }

    /// Kind of object this entry points at, as implied by its mode
    pub fn kind(&self) -> ObjectKind {
        match self.mode {
            EntryMode::Directory => ObjectKind::Tree,
            EntryMode::Gitlink => ObjectKind::Commit,
            EntryMode::File(_) => ObjectKind::Blob,
        }
    }

    /// Load the object this entry points at
    pub fn to_object(&self, database: &Database) -> Result<AnyObject> {
        database.read(&self.oid)
    }

    fn canonical_cmp(&self, other: &TreeEntry) -> Ordering {
        Self::sort_key(&self.name, self.mode).cmp(Self::sort_key(&other.name, other.mode))
    }

    fn sort_key(name: &str, mode: EntryMode) -> impl Iterator<Item = &u8> {
        name.as_bytes()
            .iter()
            .chain(mode.is_tree().then_some(&b'/'))
    }
}

/// Git tree object representing a directory snapshot
///
/// Mutations only touch the in-memory entries; nothing reaches the
/// database until [`Tree::write`] is called.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    entries: Vec<TreeEntry>,
    id: Option<ObjectId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }

    /// Linear lookup by name; `None` when absent
    pub fn entry_by_name(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Positional lookup; `None` when out of range
    pub fn entry_by_index(&self, index: usize) -> Option<&TreeEntry> {
        self.entries.get(index)
    }

    /// Insert an entry, replacing any existing entry with the same name
    pub fn add_entry(
        &mut self,
        name: impl Into<String>,
        oid: ObjectId,
        mode: EntryMode,
    ) -> Result<&TreeEntry> {
        let name = name.into();
        Self::validate_name(&name)?;

        self.entries.retain(|entry| entry.name != name);

        let entry = TreeEntry { name, mode, oid };
        let position = self
            .entries
            .partition_point(|existing| existing.canonical_cmp(&entry) == Ordering::Less);
        self.entries.insert(position, entry);
        self.id = None;

        Ok(&self.entries[position])
    }

    pub fn remove_entry_by_name(&mut self, name: &str) -> Result<TreeEntry> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.name == name)
            .ok_or_else(|| {
                ErrorKind::EntryNotFound {
                    path: name.to_string(),
                }
                .during("Tree.remove_entry_by_name")
            })?;

        self.id = None;
        Ok(self.entries.remove(position))
    }

    pub fn remove_entry_by_index(&mut self, index: usize) -> Result<TreeEntry> {
        if index >= self.entries.len() {
            return Err(ErrorKind::OutOfRange {
                index,
                len: self.entries.len(),
            }
            .during("Tree.remove_entry_by_index"));
        }

        self.id = None;
        Ok(self.entries.remove(index))
    }

    pub fn clear_entries(&mut self) {
        self.entries.clear();
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

    fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
            return Err(ErrorKind::InvalidEntryName {
                name: name.to_string(),
            }
            .during("Tree.add_entry"));
        }

        Ok(())
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Tree {}

impl Packable for Tree {
    fn serialize_body(&self) -> Result<Bytes> {
        let mut content = BytesMut::new();

        for entry in &self.entries {
            content.put_slice(entry.mode.as_str().as_bytes());
            content.put_u8(b' ');
            content.put_slice(entry.name.as_bytes());
            content.put_u8(0);
            content.put_slice(entry.oid.as_bytes());
        }

        Ok(content.freeze())
    }
}

impl Unpackable for Tree {
    fn deserialize(body: Bytes) -> Result<Self> {
        const OPERATION: &str = "Tree.decode";
        let corrupt = |reason: &str| ErrorKind::corrupt(reason).during(OPERATION);

        let mut reader = Cursor::new(body);
        let mut entries: Vec<TreeEntry> = Vec::new();
        let mut names = HashSet::new();

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            // Read "mode " (space-delimited)
            let n = reader
                .read_until(b' ', &mut mode_bytes)
                .map_err(|_| corrupt("unreadable tree entry"))?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if mode_bytes.pop() != Some(b' ') {
                return Err(corrupt("unexpected EOF in mode"));
            }
            let mode_str =
                std::str::from_utf8(&mode_bytes).map_err(|_| corrupt("non-ascii entry mode"))?;
            let mode = EntryMode::from_octal_str(mode_str)?;

            // Read "name\0"
            name_bytes.clear();
            reader
                .read_until(b'\0', &mut name_bytes)
                .map_err(|_| corrupt("unreadable tree entry"))?;
            if name_bytes.pop() != Some(b'\0') {
                return Err(corrupt("unexpected EOF in name"));
            }
            let name = String::from_utf8(name_bytes.clone())
                .map_err(|_| corrupt("entry name is not valid UTF-8"))?;
            if name.is_empty() || name.contains('/') {
                return Err(corrupt("invalid entry name"));
            }

            let oid = ObjectId::read_raw_from(&mut reader)
                .map_err(|_| corrupt("unexpected EOF in object id"))?;

            if !names.insert(name.clone()) {
                return Err(corrupt("duplicate tree entry name"));
            }

            let entry = TreeEntry { name, mode, oid };
            if let Some(previous) = entries.last()
                && previous.canonical_cmp(&entry) != Ordering::Less
            {
                return Err(corrupt("tree entries are not in canonical order"));
            }
            entries.push(entry);
        }

        Ok(Tree { entries, id: None })
    }
}

impl Object for Tree {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Tree
    }

    fn id(&self) -> Option<&ObjectId> {
        self.id.as_ref()
    }
}

impl TypedObject for Tree {
    const KIND: ObjectKind = ObjectKind::Tree;

    fn try_from_any(object: AnyObject) -> Result<Self> {
        match object {
            AnyObject::Tree(tree) => Ok(tree),
            other => Err(other.mismatch(Self::KIND)),
        }
    }
}

/// Nested tree under construction from a flat list of paths
///
/// Directories are created on demand; trees are written children first,
/// since a parent needs its children's ids.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    entries: BTreeMap<String, BuilderNode>,
}

#[derive(Debug)]
enum BuilderNode {
    Leaf(EntryMode, ObjectId),
    Directory(TreeBuilder),
}

impl TreeBuilder {
    /// Place a leaf at `path` (components separated by `/`)
    pub(crate) fn insert(&mut self, path: &str, mode: EntryMode, oid: ObjectId) -> Result<()> {
        match path.split_once('/') {
            None => {
                self.entries
                    .insert(path.to_string(), BuilderNode::Leaf(mode, oid));
            }
            Some((parent, rest)) => {
                let node = self
                    .entries
                    .entry(parent.to_string())
                    .or_insert_with(|| BuilderNode::Directory(TreeBuilder::default()));

                if let BuilderNode::Leaf(..) = node {
                    *node = BuilderNode::Directory(TreeBuilder::default());
                }
                if let BuilderNode::Directory(tree) = node {
                    tree.insert(rest, mode, oid)?;
                }
            }
        }

        Ok(())
    }

    /// Write every tree, children before parents, returning the root id
    pub(crate) fn write(&self, database: &Database) -> Result<ObjectId> {
        let mut tree = Tree::new();

        for (name, node) in &self.entries {
            match node {
                BuilderNode::Leaf(mode, oid) => {
                    tree.add_entry(name.as_str(), *oid, *mode)?;
                }
                BuilderNode::Directory(subtree) => {
                    let oid = subtree.write(database)?;
                    tree.add_entry(name.as_str(), oid, EntryMode::Directory)?;
                }
            }
        }

        tree.write(database)
    }
}
