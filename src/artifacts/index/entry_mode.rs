//! File modes shared by tree entries and index entries
//!
//! Git only records a handful of modes: regular and executable files,
//! symbolic links, subdirectories (trees) and submodule commits (gitlinks).

use crate::errors::{ErrorKind, Result};

#[derive(Debug, Clone, Copy, Eq, Ord, Default, PartialEq, PartialOrd, Hash)]
pub enum FileMode {
    #[default]
    Regular,
    Executable,
    Symlink,
}

#[derive(Debug, Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub enum EntryMode {
    File(FileMode),
    Directory,
    Gitlink,
}

impl Default for EntryMode {
    fn default() -> Self {
        EntryMode::REGULAR
    }
}

impl EntryMode {
    pub const REGULAR: EntryMode = EntryMode::File(FileMode::Regular);
    pub const EXECUTABLE: EntryMode = EntryMode::File(FileMode::Executable);
    pub const SYMLINK: EntryMode = EntryMode::File(FileMode::Symlink);
    pub const DIRECTORY: EntryMode = EntryMode::Directory;
    pub const GITLINK: EntryMode = EntryMode::Gitlink;

    /// Octal form as written in tree objects (no leading zero)
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMode::File(FileMode::Regular) => "100644",
            EntryMode::File(FileMode::Executable) => "100755",
            EntryMode::File(FileMode::Symlink) => "120000",
            EntryMode::Directory => "40000",
            EntryMode::Gitlink => "160000",
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            EntryMode::File(FileMode::Regular) => 0o100644,
            EntryMode::File(FileMode::Executable) => 0o100755,
            EntryMode::File(FileMode::Symlink) => 0o120000,
            EntryMode::Directory => 0o40000,
            EntryMode::Gitlink => 0o160000,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    /// Parse the octal form used inside tree objects
    pub fn from_octal_str(mode: &str) -> Result<Self> {
        match mode {
            "100644" => Ok(EntryMode::File(FileMode::Regular)),
            "100755" => Ok(EntryMode::File(FileMode::Executable)),
            "120000" => Ok(EntryMode::File(FileMode::Symlink)),
            "40000" => Ok(EntryMode::Directory),
            "160000" => Ok(EntryMode::Gitlink),
            _ => Err(ErrorKind::corrupt(format!("invalid entry mode '{mode}'"))
                .during("EntryMode.parse")),
        }
    }
}

impl TryFrom<u32> for EntryMode {
    type Error = crate::errors::Error;

    fn try_from(mode: u32) -> Result<Self> {
        match mode {
            0o100644 => Ok(EntryMode::File(FileMode::Regular)),
            0o100755 => Ok(EntryMode::File(FileMode::Executable)),
            0o120000 => Ok(EntryMode::File(FileMode::Symlink)),
            0o40000 => Ok(EntryMode::Directory),
            0o160000 => Ok(EntryMode::Gitlink),
            _ => Err(ErrorKind::corrupt(format!("invalid entry mode {mode:o}"))
                .during("EntryMode.parse")),
        }
    }
}

impl From<EntryMode> for u32 {
    fn from(mode: EntryMode) -> Self {
        mode.as_u32()
    }
}

impl From<FileMode> for EntryMode {
    fn from(mode: FileMode) -> Self {
        EntryMode::File(mode)
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06o}", self.as_u32())
    }
}
