//! Git references (branches, HEAD, tags)
//!
//! References are human-readable names pointing to objects. They can be:
//! - Direct: containing an object SHA-1
//! - Symbolic: pointing to another reference (e.g., HEAD -> refs/heads/master)
//!
//! ## Storage
//!
//! Loose references are text files under the git directory containing either
//! a 40-character hex id or `ref: <name>`. `packed-refs` holds one
//! `<hex> <name>` line per reference; a loose file shadows a packed entry of
//! the same name.

use crate::areas::database::Database;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::refs::reference::{RefFilter, RefTarget, Reference};
use crate::artifacts::refs::ref_name::RefName;
use crate::artifacts::refs::{HEAD_REF_NAME, MAX_REF_NESTING};
use crate::errors::{ErrorKind, Result, ResultExt};
use file_guard::Lock;
use std::cell::Cell;
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::ops::DerefMut;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, trace};
use walkdir::WalkDir;

const PACKED_REFS_FILE: &str = "packed-refs";
const PACKED_REFS_HEADER: &str = "# pack-refs with: peeled fully-peeled sorted \n";

/// One `packed-refs` entry, with the `^<hex>` line that may follow it
#[derive(Debug, Clone, PartialEq, Eq)]
struct PackedRef {
    oid: ObjectId,
    peeled: Option<ObjectId>,
}

/// Reference store rooted at a git directory
///
/// Writes take an exclusive `file_guard` lock on the file being replaced.
/// A store opened alongside a database, and every clone of it, stops working
/// once that database is closed.
#[derive(Debug, Clone)]
pub struct RefStore {
    /// Path to the git directory (typically `.git`)
    path: Box<Path>,
    closed: Rc<Cell<bool>>,
}

impl RefStore {
    pub fn new(path: Box<Path>) -> Self {
        RefStore {
            path,
            closed: Rc::new(Cell::new(false)),
        }
    }

    /// A store that closes together with `database`
    pub(crate) fn bound_to(path: Box<Path>, database: &Database) -> Self {
        RefStore {
            path,
            closed: database.closed_flag(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    fn ensure_open(&self, operation: &'static str) -> Result<()> {
        if self.closed.get() {
            return Err(ErrorKind::UseAfterClose.during(operation));
        }
        Ok(())
    }

    /// Find a reference by full name, loose first, then packed
    pub fn lookup(&self, name: &str) -> Result<Reference> {
        const OPERATION: &str = "References.lookup";
        self.ensure_open(OPERATION)?;

        let name = RefName::try_parse(name)?;
        trace!(name = %name, "looking up reference");

        if let Some(target) = self.read_loose(&name, OPERATION)? {
            return Ok(Reference::new(name, target));
        }

        self.read_packed(OPERATION)?
            .remove(&name)
            .map(|packed| Reference::new_packed(name.clone(), packed.oid))
            .ok_or_else(|| {
                ErrorKind::RefNotFound {
                    name: name.to_string(),
                }
                .during(OPERATION)
            })
    }

    /// Follow symbolic references down to a direct one
    pub fn resolve(&self, reference: &Reference) -> Result<Reference> {
        let mut chain = self.resolve_chain(reference)?;
        chain.pop().ok_or_else(|| {
            ErrorKind::RefNotFound {
                name: reference.name().to_string(),
            }
            .during("References.resolve")
        })
    }

    /// Every reference visited while resolving, starting with `reference`
    ///
    /// At most `MAX_REF_NESTING` symbolic hops are followed. A cycle or a
    /// longer chain fails with `RefResolutionLoop`; a hop to a missing
    /// reference fails with `RefNotFound`.
    pub fn resolve_chain(&self, reference: &Reference) -> Result<Vec<Reference>> {
        const OPERATION: &str = "References.resolve";
        self.ensure_open(OPERATION)?;

        let mut visited = HashSet::from([reference.name().clone()]);
        let mut chain = vec![reference.clone()];

        loop {
            let current = &chain[chain.len() - 1];
            let next_name = match current.target() {
                RefTarget::Direct(_) => return Ok(chain),
                RefTarget::Symbolic(name) => name.clone(),
            };

            let hops = chain.len() - 1;
            if hops >= MAX_REF_NESTING || !visited.insert(next_name.clone()) {
                return Err(ErrorKind::RefResolutionLoop {
                    name: reference.name().to_string(),
                    hops: hops + 1,
                }
                .during(OPERATION));
            }

            trace!(from = %current.name(), to = %next_name, "following symbolic reference");
            let next = self
                .lookup(next_name.as_str())
                .map_err(|e| e.into_kind().during(OPERATION))?;
            chain.push(next);
        }
    }

    /// Look up `name` and resolve it to an object id
    pub fn resolve_name(&self, name: &str) -> Result<ObjectId> {
        let reference = self.resolve(&self.lookup(name)?)?;
        reference.target_id().copied().ok_or_else(|| {
            ErrorKind::RefNotFound {
                name: name.to_string(),
            }
            .during("References.resolve")
        })
    }

    pub fn head(&self) -> Result<Reference> {
        self.lookup(HEAD_REF_NAME)
    }

    /// All references in any selected category, sorted by name
    pub fn list_all(&self, filter: RefFilter) -> Result<Vec<Reference>> {
        const OPERATION: &str = "References.list_all";
        self.ensure_open(OPERATION)?;

        let mut references = BTreeMap::new();
        for (name, packed) in self.read_packed(OPERATION)? {
            references.insert(name.clone(), Reference::new_packed(name, packed.oid));
        }
        for name in self.list_loose(OPERATION)? {
            if let Some(target) = self.read_loose(&name, OPERATION)? {
                references.insert(name.clone(), Reference::new(name, target));
            }
        }

        Ok(references
            .into_values()
            .filter(|reference| reference.matches(filter))
            .collect())
    }

    /// Create or (with `force`) overwrite a direct reference
    pub fn create_direct(&self, name: &str, oid: ObjectId, force: bool) -> Result<Reference> {
        self.create(name, RefTarget::Direct(oid), force, "References.create_direct")
    }

    /// Create or (with `force`) overwrite a symbolic reference
    pub fn create_symbolic(&self, name: &str, target: &str, force: bool) -> Result<Reference> {
        let target = RefName::try_parse(target)?;
        self.create(name, RefTarget::Symbolic(target), force, "References.create_symbolic")
    }

    /// Remove a reference from both loose and packed storage
    pub fn delete(&self, name: &str) -> Result<()> {
        const OPERATION: &str = "References.delete";
        self.ensure_open(OPERATION)?;

        let name = RefName::try_parse(name)?;
        let loose_path = self.path.join(name.as_ref_path());
        let mut found = false;

        if loose_path.is_file() {
            std::fs::remove_file(&loose_path).during(OPERATION)?;
            self.prune_empty_parent_dirs(&loose_path)?;
            found = true;
        }

        let mut packed = self.read_packed(OPERATION)?;
        if packed.remove(&name).is_some() {
            self.write_packed(&packed, OPERATION)?;
            found = true;
        }

        if !found {
            return Err(ErrorKind::RefNotFound {
                name: name.to_string(),
            }
            .during(OPERATION));
        }

        debug!(name = %name, "deleted reference");
        Ok(())
    }

    pub fn refs_path(&self) -> Box<Path> {
        self.path.join("refs").into_boxed_path()
    }

    fn create(
        &self,
        name: &str,
        target: RefTarget,
        force: bool,
        operation: &'static str,
    ) -> Result<Reference> {
        self.ensure_open(operation)?;
        let name = RefName::try_parse(name)?;

        if !force && self.exists(&name, operation)? {
            return Err(ErrorKind::RefExists {
                name: name.to_string(),
            }
            .during(operation));
        }

        self.update_ref_file(&self.path.join(name.as_ref_path()), &target.encode())
            .during(operation)?;
        debug!(name = %name, target = %target.encode().trim_end(), "updated reference");

        Ok(Reference::new(name, target))
    }

    fn exists(&self, name: &RefName, operation: &'static str) -> Result<bool> {
        Ok(self.path.join(name.as_ref_path()).is_file()
            || self.read_packed(operation)?.contains_key(name))
    }

    fn read_loose(&self, name: &RefName, operation: &'static str) -> Result<Option<RefTarget>> {
        let path = self.path.join(name.as_ref_path());
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).during(operation)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        RefTarget::parse(&content).map(Some)
    }

    fn list_loose(&self, operation: &'static str) -> Result<Vec<RefName>> {
        let mut names = Vec::new();

        let head_path = self.path.join(HEAD_REF_NAME);
        if head_path.is_file() {
            names.push(RefName::try_parse(HEAD_REF_NAME)?);
        }

        let refs_path = self.refs_path();
        if !refs_path.is_dir() {
            return Ok(names);
        }

        for entry in WalkDir::new(&refs_path).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                ErrorKind::Io(std::io::Error::other(e.to_string())).during(operation)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative_path) = entry.path().strip_prefix(&self.path) else {
                continue;
            };
            let relative_name = relative_path
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            // lock files and other stray names are not references
            if let Ok(name) = RefName::try_parse(relative_name) {
                names.push(name);
            }
        }

        Ok(names)
    }

    fn read_packed(&self, operation: &'static str) -> Result<BTreeMap<RefName, PackedRef>> {
        let packed_path = self.path.join(PACKED_REFS_FILE);
        if !packed_path.is_file() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&packed_path).during(operation)?;
        let malformed = |line: &str| {
            ErrorKind::corrupt(format!("malformed packed-refs line '{line}'")).during(operation)
        };

        let mut packed: BTreeMap<RefName, PackedRef> = BTreeMap::new();
        let mut last_name: Option<RefName> = None;
        for line in content.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(peeled) = line.strip_prefix('^') {
                let entry = last_name
                    .as_ref()
                    .and_then(|name| packed.get_mut(name))
                    .ok_or_else(|| malformed(line))?;
                entry.peeled = Some(ObjectId::from_hex(peeled)?);
                continue;
            }

            let (oid, name) = line.split_once(' ').ok_or_else(|| malformed(line))?;
            let name = RefName::try_parse(name)?;
            packed.insert(
                name.clone(),
                PackedRef {
                    oid: ObjectId::from_hex(oid)?,
                    peeled: None,
                },
            );
            last_name = Some(name);
        }

        Ok(packed)
    }

    fn write_packed(
        &self,
        packed: &BTreeMap<RefName, PackedRef>,
        operation: &'static str,
    ) -> Result<()> {
        let mut content = String::from(PACKED_REFS_HEADER);
        for (name, entry) in packed {
            content.push_str(&format!("{} {name}\n", entry.oid));
            if let Some(peeled) = &entry.peeled {
                content.push_str(&format!("^{peeled}\n"));
            }
        }

        self.update_ref_file(&self.path.join(PACKED_REFS_FILE), &content)
            .during(operation)
    }

    fn update_ref_file(&self, path: &Path, raw_ref: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut ref_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(raw_ref.as_bytes())?;
        lock.deref_mut().sync_all()
    }

    /// Remove directories left empty below `refs/<namespace>/`
    fn prune_empty_parent_dirs(&self, path: &Path) -> Result<()> {
        let refs_path = self.refs_path();
        if let Some(parent) = path.parent()
            && let Ok(relative) = parent.strip_prefix(&refs_path)
            && relative.components().count() > 1
            && parent.read_dir().during("References.delete")?.next().is_none()
        {
            std::fs::remove_dir(parent).during("References.delete")?;
            self.prune_empty_parent_dirs(parent)?;
        }

        Ok(())
    }
}
