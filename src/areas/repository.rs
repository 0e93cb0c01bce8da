//! Repository aggregate
//!
//! A [`Repository`] owns the object database, the reference store and, once
//! first asked for, the index. Everything read through it is either an owned
//! value or a borrow of the repository, and [`Repository::free`] closes the
//! shared database so that an index or reference store still holding it
//! refuses further work.

use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::refs::RefStore;
use crate::artifacts::refs::reference::Reference;
use crate::artifacts::refs::{HEAD_REF_NAME, HEADS_PREFIX};
use crate::errors::{ErrorKind, Result, ResultExt};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

const GIT_DIR: &str = ".git";
const DEFAULT_BRANCH: &str = "master";

/// Where each part of a repository lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLayout {
    pub git_dir: PathBuf,
    pub object_dir: PathBuf,
    pub index_file: PathBuf,
    /// `None` for a bare repository
    pub workdir: Option<PathBuf>,
}

impl RepositoryLayout {
    /// Standard layout for a git directory, with an optional work tree
    pub fn from_git_dir(git_dir: impl Into<PathBuf>, workdir: Option<PathBuf>) -> Self {
        let git_dir = git_dir.into();
        RepositoryLayout {
            object_dir: git_dir.join("objects"),
            index_file: git_dir.join("index"),
            git_dir,
            workdir,
        }
    }
}

#[derive(Debug)]
pub struct Repository {
    layout: RepositoryLayout,
    database: Rc<Database>,
    index: Option<Index>,
    refs: RefStore,
}

impl Repository {
    /// Create the on-disk layout and open the new repository
    ///
    /// A non-bare repository keeps its git directory in `<path>/.git`; a bare
    /// one uses `path` itself.
    pub fn init(path: impl AsRef<Path>, bare: bool) -> Result<Self> {
        const OPERATION: &str = "Repository.init";

        let path = path.as_ref();
        fs::create_dir_all(path).during(OPERATION)?;
        let path = path.canonicalize().during(OPERATION)?;

        let layout = if bare {
            RepositoryLayout::from_git_dir(&path, None)
        } else {
            RepositoryLayout::from_git_dir(path.join(GIT_DIR), Some(path))
        };

        let head_path = layout.git_dir.join(HEAD_REF_NAME);
        if head_path.exists() {
            return Err(ErrorKind::AlreadyExists {
                path: layout.git_dir.clone(),
            }
            .during(OPERATION));
        }

        fs::create_dir_all(&layout.object_dir).during(OPERATION)?;
        fs::create_dir_all(layout.git_dir.join("refs").join("heads")).during(OPERATION)?;
        fs::create_dir_all(layout.git_dir.join("refs").join("tags")).during(OPERATION)?;
        fs::write(
            layout.git_dir.join("config"),
            format!(
                "[core]\n\trepositoryformatversion = 0\n\tfilemode = true\n\tbare = {bare}\n"
            ),
        )
        .during(OPERATION)?;
        fs::write(&head_path, format!("ref: {HEADS_PREFIX}{DEFAULT_BRANCH}\n"))
            .during(OPERATION)?;

        debug!(git_dir = %layout.git_dir.display(), bare, "initialized repository");
        Ok(Self::from_layout(layout))
    }

    /// Open the repository at `path`
    ///
    /// `path` is either a work tree containing `.git` or a bare git directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        const OPERATION: &str = "Repository.open";

        let path = path.as_ref();
        let not_a_repository = || {
            ErrorKind::NotAGitRepository {
                path: path.to_path_buf(),
            }
            .during(OPERATION)
        };

        let path = path.canonicalize().map_err(|_| not_a_repository())?;
        let layout = if Self::looks_like_git_dir(&path.join(GIT_DIR)) {
            RepositoryLayout::from_git_dir(path.join(GIT_DIR), Some(path))
        } else if Self::looks_like_git_dir(&path) {
            RepositoryLayout::from_git_dir(path, None)
        } else {
            return Err(not_a_repository());
        };

        debug!(git_dir = %layout.git_dir.display(), "opened repository");
        Ok(Self::from_layout(layout))
    }

    /// Open a repository whose parts live at explicit locations
    pub fn open_with(layout: RepositoryLayout) -> Result<Self> {
        if !layout.git_dir.join(HEAD_REF_NAME).is_file() || !layout.object_dir.is_dir() {
            return Err(ErrorKind::NotAGitRepository {
                path: layout.git_dir,
            }
            .during("Repository.open"));
        }

        debug!(
            git_dir = %layout.git_dir.display(),
            object_dir = %layout.object_dir.display(),
            index_file = %layout.index_file.display(),
            "opened repository with explicit layout"
        );
        Ok(Self::from_layout(layout))
    }

    fn from_layout(layout: RepositoryLayout) -> Self {
        let database = Database::new(layout.object_dir.clone().into_boxed_path());
        let refs = RefStore::bound_to(layout.git_dir.clone().into_boxed_path(), &database);

        Repository {
            layout,
            database: Rc::new(database),
            index: None,
            refs,
        }
    }

    fn looks_like_git_dir(path: &Path) -> bool {
        path.join(HEAD_REF_NAME).is_file() && path.join("objects").is_dir()
    }

    /// The git directory
    pub fn path(&self) -> &Path {
        &self.layout.git_dir
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.layout.workdir.as_deref()
    }

    pub fn is_bare(&self) -> bool {
        self.layout.workdir.is_none()
    }

    pub fn layout(&self) -> &RepositoryLayout {
        &self.layout
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub(crate) fn shared_database(&self) -> Rc<Database> {
        Rc::clone(&self.database)
    }

    /// The staging index, loaded from disk on first use
    pub fn index(&mut self) -> Result<&mut Index> {
        self.database.ensure_open("Repository.index")?;

        let index = match self.index.take() {
            Some(index) => index,
            None => {
                let mut index = Index::new(
                    self.layout.index_file.clone().into_boxed_path(),
                    self.layout.workdir.clone().map(PathBuf::into_boxed_path),
                    Rc::clone(&self.database),
                );
                index.read()?;
                index
            }
        };

        Ok(self.index.insert(index))
    }

    pub fn references(&self) -> &RefStore {
        &self.refs
    }

    /// The `HEAD` reference, unresolved
    pub fn head(&self) -> Result<Reference> {
        self.database.ensure_open("Repository.head")?;
        self.refs.head()
    }

    /// Release the repository and everything it handed out
    pub fn free(self) {
        self.database.close();
        debug!(git_dir = %self.layout.git_dir.display(), "freed repository");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::refs::reference::RefTarget;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn init_creates_layout_and_head() {
        let dir = TempDir::new().unwrap();

        let repository = Repository::init(dir.path(), false).unwrap();

        dir.child(".git/objects").assert(predicates::path::is_dir());
        dir.child(".git/refs/heads").assert(predicates::path::is_dir());
        dir.child(".git/refs/tags").assert(predicates::path::is_dir());
        dir.child(".git/HEAD").assert("ref: refs/heads/master\n");
        assert!(!repository.is_bare());
        assert_eq!(
            repository.workdir(),
            Some(dir.path().canonicalize().unwrap().as_path())
        );
    }

    #[test]
    fn bare_init_uses_path_as_git_dir() {
        let dir = TempDir::new().unwrap();

        let repository = Repository::init(dir.path(), true).unwrap();

        dir.child("HEAD").assert(predicates::path::is_file());
        dir.child("config")
            .assert(predicates::str::contains("bare = true"));
        assert!(repository.is_bare());
        assert_eq!(repository.workdir(), None);
    }

    #[test]
    fn init_twice_fails() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path(), false).unwrap();

        let err = Repository::init(dir.path(), false).unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::AlreadyExists { .. }));
    }

    #[test]
    fn open_finds_work_tree_and_bare_repositories() {
        let work = TempDir::new().unwrap();
        let bare = TempDir::new().unwrap();
        Repository::init(work.path(), false).unwrap();
        Repository::init(bare.path(), true).unwrap();

        assert!(!Repository::open(work.path()).unwrap().is_bare());
        assert!(Repository::open(bare.path()).unwrap().is_bare());
    }

    #[test]
    fn open_plain_directory_is_not_a_repository() {
        let dir = TempDir::new().unwrap();

        let err = Repository::open(dir.path()).unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::NotAGitRepository { .. }));
        assert_eq!(err.operation(), "Repository.open");
    }

    #[test]
    fn open_with_explicit_layout() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path(), false).unwrap();
        let git_dir = dir.path().join(".git");
        let layout = RepositoryLayout {
            object_dir: git_dir.join("objects"),
            index_file: dir.path().join("alt-index"),
            git_dir,
            workdir: Some(dir.path().to_path_buf()),
        };

        let mut repository = Repository::open_with(layout).unwrap();
        dir.child("a.txt").write_str("a").unwrap();
        let index = repository.index().unwrap();
        index.add("a.txt", 0).unwrap();
        index.write().unwrap();

        dir.child("alt-index").assert(predicates::path::is_file());
        dir.child(".git/index").assert(predicates::path::missing());
    }

    #[test]
    fn head_is_symbolic_to_default_branch() {
        let dir = TempDir::new().unwrap();
        let repository = Repository::init(dir.path(), false).unwrap();

        let head = repository.head().unwrap();

        assert!(matches!(head.target(), RefTarget::Symbolic(name) if name.as_str() == "refs/heads/master"));
    }

    #[test]
    fn index_is_created_lazily_and_empty() {
        let dir = TempDir::new().unwrap();
        let mut repository = Repository::init(dir.path(), false).unwrap();

        let index = repository.index().unwrap();

        assert_eq!(index.entry_count(), 0);
        assert!(!index.is_bare());
        dir.child(".git/index").assert(predicates::path::missing());
    }

    #[test]
    fn bare_repository_index_cannot_stage_files() {
        let dir = TempDir::new().unwrap();
        let mut repository = Repository::init(dir.path(), true).unwrap();

        let err = repository.index().unwrap().add("file", 0).unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::BareIndex));
    }

    #[test]
    fn cloned_reference_store_stops_working_after_free() {
        let dir = TempDir::new().unwrap();
        let repository = Repository::init(dir.path(), false).unwrap();
        let refs = repository.references().clone();
        let oid = crate::artifacts::objects::object_id::ObjectId::hash(b"tip");

        repository.free();

        assert!(refs.is_closed());
        let err = refs.lookup("HEAD").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UseAfterClose));
        assert_eq!(err.operation(), "References.lookup");
        let err = refs.create_direct("refs/heads/x", oid, false).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UseAfterClose));
        assert!(matches!(
            refs.list_all(crate::artifacts::refs::reference::RefFilter::ALL).unwrap_err().kind(),
            ErrorKind::UseAfterClose
        ));
        assert!(matches!(
            refs.delete("refs/heads/master").unwrap_err().kind(),
            ErrorKind::UseAfterClose
        ));
        dir.child(".git/refs/heads/x").assert(predicates::path::missing());
    }
}
