//! Git index (staging area)
//!
//! The index tracks which files should be included in the next tree. It is
//! an ordered, path-unique table of [`IndexEntry`] records kept in memory
//! until [`Index::write`] persists it.
//!
//! ## Index File Format
//!
//! The index file contains:
//! - Header: signature, version, and entry count
//! - Entries: sorted by path, each padded to 8 bytes
//! - Extensions: skipped on read, never written
//! - Checksum: SHA-1 of everything before it
//!
//! Only whole seconds of ctime/mtime are kept; nanoseconds are dropped on
//! write and ignored on read.

use crate::areas::database::Database;
use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::index_entry::{ENTRY_BLOCK, ENTRY_FIXED_SIZE, IndexEntry};
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::index::{CHECKSUM_SIZE, EXTENDED_VERSION, HEADER_SIZE, VERSION};
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::TreeBuilder;
use crate::errors::{ErrorKind, Result, ResultExt};
use byteorder::ByteOrder;
use std::io::Read;
use std::ops::DerefMut;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, trace};

/// Git index (staging area)
#[derive(Debug)]
pub struct Index {
    /// Path to the index file (typically `.git/index`)
    path: Box<Path>,
    /// Entries sorted by path, unique by path
    entries: Vec<IndexEntry>,
    /// Work tree files are added from; absent for a bare index
    workdir: Option<Box<Path>>,
    database: Option<Rc<Database>>,
    /// Flag indicating if the index has been modified since loading
    changed: bool,
}

fn index_error(operation: &'static str, reason: impl Into<String>) -> crate::errors::Error {
    ErrorKind::IndexIo {
        reason: reason.into(),
    }
    .during(operation)
}

impl Index {
    /// An index backed by a repository: it can stage work-tree files
    pub(crate) fn new(path: Box<Path>, workdir: Option<Box<Path>>, database: Rc<Database>) -> Self {
        Index {
            path,
            entries: Vec::new(),
            workdir,
            database: Some(database),
            changed: false,
        }
    }

    /// Open an index file with no repository attached
    ///
    /// A missing file yields an empty index. Such an index can read, edit
    /// and write entries, but cannot stage files with [`Index::add`].
    pub fn open_bare(path: impl Into<PathBuf>) -> Result<Self> {
        let mut index = Index {
            path: path.into().into_boxed_path(),
            entries: Vec::new(),
            workdir: None,
            database: None,
            changed: false,
        };
        index.read()?;
        Ok(index)
    }

    /// Get the path to the index file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_bare(&self) -> bool {
        self.workdir.is_none() || self.database.is_none()
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    fn ensure_open(&self, operation: &'static str) -> Result<()> {
        match &self.database {
            Some(database) if database.is_closed() => {
                Err(ErrorKind::UseAfterClose.during(operation))
            }
            _ => Ok(()),
        }
    }

    /// Reload the entries from disk, discarding in-memory changes
    ///
    /// # Locking
    ///
    /// Acquires a shared lock on the index file during reading.
    pub fn read(&mut self) -> Result<()> {
        const OPERATION: &str = "Index.read";
        self.ensure_open(OPERATION)?;

        self.entries.clear();
        self.changed = false;

        if !self.path.exists() {
            trace!(path = %self.path.display(), "no index file, starting empty");
            return Ok(());
        }

        let mut index_file = std::fs::OpenOptions::new()
            .read(true)
            .open(&self.path)
            .map_err(|e| index_error(OPERATION, e.to_string()))?;
        let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Shared, 0, 1)
            .map_err(|e| index_error(OPERATION, e.to_string()))?;

        let file_size = lock
            .deref_mut()
            .metadata()
            .map_err(|e| index_error(OPERATION, e.to_string()))?
            .len();
        if file_size == 0 {
            return Ok(());
        }

        let mut reader = Checksum::new(lock.deref_mut());
        let header = IndexHeader::deserialize(&reader.read(HEADER_SIZE)?)?;

        let mut entries =
            Vec::with_capacity((header.entries_count as usize).min(file_size as usize / ENTRY_FIXED_SIZE));
        for _ in 0..header.entries_count {
            entries.push(Self::parse_entry(&mut reader, header.version)?);
        }
        Self::skip_extensions(&mut reader, file_size)?;
        reader.verify()?;

        entries.sort_by(|a, b| a.path.as_bytes().cmp(b.path.as_bytes()));
        entries.dedup_by(|later, earlier| later.path == earlier.path);
        self.entries = entries;

        trace!(path = %self.path.display(), entries = self.entries.len(), "read index");
        Ok(())
    }

    /// Parse one entry, handling the variable-length path and padding
    fn parse_entry<R: Read>(reader: &mut Checksum<R>, version: u32) -> Result<IndexEntry> {
        const OPERATION: &str = "Index.read";

        let fixed = reader.read(ENTRY_FIXED_SIZE)?;
        let mut entry = IndexEntry::deserialize_fixed(&fixed)?;
        let mut entry_size = ENTRY_FIXED_SIZE;

        if entry.has_extended_flag() {
            if version < EXTENDED_VERSION {
                return Err(index_error(OPERATION, "extended flags in a version 2 index"));
            }
            entry.flags_extended = byteorder::NetworkEndian::read_u16(&reader.read(2)?);
            entry_size += 2;
        }

        // the path is followed by 1..=8 NULs that end the entry on a block boundary
        let (path_bytes, nul_read) = match entry.recorded_name_length() {
            Some(length) => (reader.read(length)?.to_vec(), 0),
            None => {
                let mut path_bytes = Vec::new();
                loop {
                    let byte = reader.read(1)?[0];
                    if byte == 0 {
                        break;
                    }
                    path_bytes.push(byte);
                }
                (path_bytes, 1)
            }
        };
        entry_size += path_bytes.len();
        entry.path = String::from_utf8(path_bytes)
            .map_err(|_| index_error(OPERATION, "invalid UTF-8 in entry path"))?;

        let padding = ENTRY_BLOCK - (entry_size % ENTRY_BLOCK) - nul_read;
        if reader.read(padding)?.iter().any(|&b| b != 0) {
            return Err(index_error(OPERATION, "invalid padding after entry path"));
        }

        entry.normalize_flags();
        Ok(entry)
    }

    /// Step over optional extensions between the last entry and the checksum
    fn skip_extensions<R: Read>(reader: &mut Checksum<R>, file_size: u64) -> Result<()> {
        let trailer = CHECKSUM_SIZE as u64;
        while reader.offset() + trailer < file_size {
            if file_size - reader.offset() - trailer < 8 {
                return Err(index_error("Index.read", "truncated index extension"));
            }
            let extension_header = reader.read(8)?;
            let size = byteorder::NetworkEndian::read_u32(&extension_header[4..8]) as u64;
            if reader.offset() + size + trailer > file_size {
                return Err(index_error("Index.read", "truncated index extension"));
            }
            reader.read(size as usize)?;
        }

        Ok(())
    }

    /// Persist the entries, replacing the index file
    ///
    /// # Locking
    ///
    /// Acquires an exclusive lock on the index file during writing.
    pub fn write(&mut self) -> Result<()> {
        const OPERATION: &str = "Index.write";
        self.ensure_open(OPERATION)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| index_error(OPERATION, e.to_string()))?;
        }

        let mut index_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| index_error(OPERATION, e.to_string()))?;
        let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Exclusive, 0, 1)
            .map_err(|e| index_error(OPERATION, e.to_string()))?;

        let version = if self.entries.iter().any(IndexEntry::is_extended) {
            EXTENDED_VERSION
        } else {
            VERSION
        };
        let header = IndexHeader::new(version, self.entries.len() as u32);

        let mut writer = Checksum::new(lock.deref_mut());
        writer.write(
            &header
                .serialize()
                .map_err(|e| index_error(OPERATION, e.to_string()))?,
        )?;
        for entry in &self.entries {
            writer.write(&entry.serialize()?)?;
        }
        writer.write_checksum()?;

        self.changed = false;
        debug!(path = %self.path.display(), entries = self.entries.len(), version, "wrote index");
        Ok(())
    }

    /// Position of the entry for `path`
    pub fn find(&self, path: &str) -> Result<usize> {
        self.search(path).map_err(|_| {
            ErrorKind::EntryNotFound {
                path: path.to_string(),
            }
            .during("Index.find")
        })
    }

    fn search(&self, path: &str) -> std::result::Result<usize, usize> {
        self.entries
            .binary_search_by(|entry| entry.path.as_bytes().cmp(path.as_bytes()))
    }

    pub fn get(&self, position: usize) -> Result<&IndexEntry> {
        self.entries.get(position).ok_or_else(|| {
            ErrorKind::OutOfRange {
                index: position,
                len: self.entries.len(),
            }
            .during("Index.get")
        })
    }

    pub fn entry_by_path(&self, path: &str) -> Option<&IndexEntry> {
        self.search(path).ok().map(|position| &self.entries[position])
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }

    /// Insert an entry, replacing any entry with the same path
    ///
    /// Returns the entry's position.
    pub fn insert(&mut self, entry: IndexEntry) -> usize {
        self.changed = true;
        match self.search(&entry.path) {
            Ok(position) => {
                self.entries[position] = entry;
                position
            }
            Err(position) => {
                self.entries.insert(position, entry);
                position
            }
        }
    }

    pub fn remove(&mut self, position: usize) -> Result<IndexEntry> {
        if position >= self.entries.len() {
            return Err(ErrorKind::OutOfRange {
                index: position,
                len: self.entries.len(),
            }
            .during("Index.remove"));
        }

        self.changed = true;
        Ok(self.entries.remove(position))
    }

    pub fn clear(&mut self) {
        self.changed = true;
        self.entries.clear();
    }

    /// Stage a work-tree file at the given merge stage
    ///
    /// The file is stored as a blob and its stat data recorded. Entries that
    /// would conflict with it as a directory or a file are dropped.
    pub fn add(&mut self, path: &str, stage: u8) -> Result<usize> {
        const OPERATION: &str = "Index.add";
        self.ensure_open(OPERATION)?;

        let (Some(workdir), Some(database)) = (&self.workdir, &self.database) else {
            return Err(ErrorKind::BareIndex.during(OPERATION));
        };

        let relative_path = Self::normalize_path(path).ok_or_else(|| {
            ErrorKind::InvalidEntryName {
                name: path.to_string(),
            }
            .during(OPERATION)
        })?;
        let file_path = workdir.join(&relative_path);
        let metadata = std::fs::symlink_metadata(&file_path).during(OPERATION)?;

        let oid = if metadata.file_type().is_symlink() {
            let target = std::fs::read_link(&file_path).during(OPERATION)?;
            let mut blob = Blob::default();
            blob.set_raw_content(target.to_string_lossy().into_owned().into_bytes());
            blob.write(database)?
        } else {
            Blob::write_file(database, &file_path)?
        };

        let mut entry = IndexEntry::from_metadata(relative_path, oid, &file_path, &metadata);
        entry.set_stage(stage);

        self.discard_conflicts(&entry);
        debug!(path = %entry.path, id = %oid, stage, "staged file");
        Ok(self.insert(entry))
    }

    /// Stage every file under the work tree, skipping the git directory
    pub fn add_all(&mut self) -> Result<usize> {
        const OPERATION: &str = "Index.add";

        let Some(workdir) = self.workdir.clone() else {
            return Err(ErrorKind::BareIndex.during(OPERATION));
        };

        let mut added = 0;
        let walker = walkdir::WalkDir::new(&workdir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != ".git");
        for entry in walker {
            let entry = entry.map_err(|e| {
                ErrorKind::Io(std::io::Error::other(e.to_string())).during(OPERATION)
            })?;
            if entry.file_type().is_dir() {
                continue;
            }

            let Ok(relative_path) = entry.path().strip_prefix(&workdir) else {
                continue;
            };
            self.add(&relative_path.to_string_lossy(), 0)?;
            added += 1;
        }

        Ok(added)
    }

    /// Write the staged entries out as nested trees, returning the root id
    pub fn write_tree(&self, database: &Database) -> Result<ObjectId> {
        let mut builder = TreeBuilder::default();
        for entry in self.entries.iter().filter(|entry| entry.stage() == 0) {
            builder.insert(&entry.path, entry.mode, entry.oid)?;
        }

        let root = builder.write(database)?;
        debug!(id = %root, entries = self.entries.len(), "wrote tree from index");
        Ok(root)
    }

    /// Drop entries for the parent directories of `entry` and for anything below it
    fn discard_conflicts(&mut self, entry: &IndexEntry) {
        let parents = entry.parent_dirs();
        let below = format!("{}/", entry.path);

        self.entries.retain(|existing| {
            !parents.contains(&existing.path.as_str()) && !existing.path.starts_with(&below)
        });
    }

    /// Slash-separated form of a relative path, or `None` if it escapes the work tree
    fn normalize_path(path: &str) -> Option<String> {
        let mut components = Vec::new();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(name) => components.push(name.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }

        (!components.is_empty()).then(|| components.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::EntryMode;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    struct Workspace {
        dir: TempDir,
        index: Index,
    }

    #[fixture]
    fn workspace() -> Workspace {
        let dir = TempDir::new().unwrap();
        let database = Rc::new(Database::new(
            dir.path().join(".git/objects").into_boxed_path(),
        ));
        let index = Index::new(
            dir.path().join(".git/index").into_boxed_path(),
            Some(dir.path().to_path_buf().into_boxed_path()),
            database,
        );
        Workspace { dir, index }
    }

    fn entry(path: &str, seed: &str) -> IndexEntry {
        IndexEntry::new(path, ObjectId::hash(seed.as_bytes()), EntryMode::REGULAR)
    }

    #[rstest]
    fn insert_replaces_by_path(mut workspace: Workspace) {
        let index = &mut workspace.index;
        index.insert(entry("b.txt", "one"));
        index.insert(entry("a.txt", "two"));

        index.insert(entry("b.txt", "three"));

        assert_eq!(index.entry_count(), 2);
        let position = index.find("b.txt").unwrap();
        assert_eq!(index.get(position).unwrap().oid, ObjectId::hash(b"three"));
        assert_eq!(index.find("a.txt").unwrap(), 0);
    }

    #[rstest]
    fn missing_path_is_reported(workspace: Workspace) {
        let err = workspace.index.find("nope").unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::EntryNotFound { path } if path == "nope"));
    }

    #[rstest]
    fn positions_are_range_checked(mut workspace: Workspace) {
        workspace.index.insert(entry("a", "a"));

        assert!(matches!(
            workspace.index.get(1).unwrap_err().kind(),
            ErrorKind::OutOfRange { index: 1, len: 1 }
        ));
        assert!(workspace.index.remove(3).is_err());
        assert_eq!(workspace.index.remove(0).unwrap().path, "a");
        assert_eq!(workspace.index.entry_count(), 0);
    }

    #[rstest]
    fn write_then_read_restores_entries(mut workspace: Workspace) {
        let mut extended = entry("dir/nested.txt", "nested");
        extended.flags_extended = 0x2000;
        extended.mtime = 1_700_000_000;
        workspace.index.insert(entry("top.txt", "top"));
        workspace.index.insert(extended.clone());
        workspace.index.write().unwrap();

        let reread = Index::open_bare(workspace.dir.path().join(".git/index")).unwrap();

        assert_eq!(reread.entry_count(), 2);
        assert_eq!(reread.entry_by_path("dir/nested.txt"), Some(&extended));
        assert_eq!(reread.get(1).unwrap().path, "top.txt");
    }

    #[rstest]
    fn corrupted_checksum_is_an_index_error(mut workspace: Workspace) {
        workspace.index.insert(entry("a.txt", "a"));
        workspace.index.write().unwrap();
        let index_path = workspace.dir.path().join(".git/index");
        let mut bytes = std::fs::read(&index_path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        std::fs::write(&index_path, bytes).unwrap();

        let err = Index::open_bare(&index_path).unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::IndexIo { .. }));
    }

    #[rstest]
    fn add_stages_work_tree_file(mut workspace: Workspace) {
        workspace.dir.child("src/main.rs").write_str("fn main() {}\n").unwrap();

        let position = workspace.index.add("src/main.rs", 0).unwrap();
        let staged = workspace.index.get(position).unwrap();

        assert_eq!(staged.path, "src/main.rs");
        assert_eq!(staged.file_size, 13);
        assert_eq!(staged.oid, ObjectId::hash(b"blob 13\0fn main() {}\n"));
        assert!(staged.mtime > 0);
    }

    #[rstest]
    fn add_discards_file_directory_conflicts(mut workspace: Workspace) {
        workspace.index.insert(entry("a", "file a"));
        workspace.index.insert(entry("b/c.txt", "nested"));
        workspace.dir.child("a/inner.txt").write_str("x").unwrap();
        workspace.dir.child("b").write_str("now a file").unwrap();

        workspace.index.add("a/inner.txt", 0).unwrap();
        workspace.index.add("b", 0).unwrap();

        let paths: Vec<_> = workspace.index.entries().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a/inner.txt", "b"]);
    }

    #[rstest]
    fn add_rejects_paths_outside_the_work_tree(mut workspace: Workspace) {
        let err = workspace.index.add("../escape", 0).unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::InvalidEntryName { .. }));
    }

    #[test]
    fn bare_index_cannot_add() {
        let dir = TempDir::new().unwrap();
        let mut index = Index::open_bare(dir.path().join("index")).unwrap();

        let err = index.add("file", 0).unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::BareIndex));
        assert!(index.is_bare());
    }

    #[rstest]
    fn closed_database_invalidates_index(mut workspace: Workspace) {
        workspace.index.database.as_ref().unwrap().close();

        assert!(matches!(
            workspace.index.write().unwrap_err().kind(),
            ErrorKind::UseAfterClose
        ));
        assert!(matches!(
            workspace.index.read().unwrap_err().kind(),
            ErrorKind::UseAfterClose
        ));
    }

    #[test]
    fn extensions_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index");
        let entry = entry("a.txt", "a");

        let mut writer = Checksum::new(Vec::new());
        writer.write(&IndexHeader::new(2, 1).serialize().unwrap()).unwrap();
        writer.write(&entry.serialize().unwrap()).unwrap();
        writer.write(b"TREE\0\0\0\x03abc").unwrap();
        writer.write_checksum().unwrap();
        let bytes = writer.into_inner();
        std::fs::write(&path, bytes).unwrap();

        let index = Index::open_bare(&path).unwrap();

        assert_eq!(index.entry_count(), 1);
        assert_eq!(index.get(0).unwrap(), &entry);
    }

    proptest! {
        #[test]
        fn inserts_keep_paths_unique_and_sorted(paths in proptest::collection::vec("[a-c]{1,3}", 0..24)) {
            let dir = TempDir::new().unwrap();
            let mut index = Index::open_bare(dir.path().join("index")).unwrap();

            for (i, path) in paths.iter().enumerate() {
                index.insert(entry(path, &i.to_string()));
            }

            let stored: Vec<_> = index.entries().map(|e| e.path.clone()).collect();
            let mut expected = paths.clone();
            expected.sort();
            expected.dedup();
            prop_assert_eq!(stored, expected);
        }
    }
}
