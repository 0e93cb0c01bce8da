//! Error types
//!
//! Every failure surfaces as an [`Error`], which pairs the name of the
//! operation that failed (e.g. `Database.read`) with an [`ErrorKind`]
//! describing the cause. Kinds fall into two classes:
//!
//! - [`ErrorClass::Input`]: bad user input or environment (malformed ids,
//!   corrupt objects, missing refs, index I/O failures). Callers are
//!   expected to recover.
//! - [`ErrorClass::Programming`]: contract violations (out-of-range
//!   positions, mis-typed tag targets, use after close, reference loops).

use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::object_id::ObjectId;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Which side of the API contract a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad user input; recoverable.
    Input,
    /// Invalid argument or API misuse.
    Programming,
}

/// An error raised by an operation of the store.
#[derive(Debug, Error)]
#[error("{operation}: {kind}")]
pub struct Error {
    operation: &'static str,
    kind: ErrorKind,
}

impl Error {
    pub fn new(operation: &'static str, kind: ErrorKind) -> Self {
        Error { operation, kind }
    }

    /// Name of the operation that failed, e.g. `Index.write`
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }
}

/// The underlying cause of an [`Error`].
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("malformed object id '{input}'")]
    MalformedId { input: String },

    #[error("corrupt argument: expected at least {expected} bytes, got {actual}")]
    CorruptInput { expected: usize, actual: usize },

    #[error("corrupt object: {reason}")]
    CorruptObject { reason: String },

    #[error("object {id} not found")]
    ObjectNotFound { id: ObjectId },

    #[error("not a git repository: {}", path.display())]
    NotAGitRepository { path: PathBuf },

    #[error("repository already exists at {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("reference '{name}' not found")]
    RefNotFound { name: String },

    #[error("reference '{name}' already exists")]
    RefExists { name: String },

    #[error("invalid reference name '{name}'")]
    InvalidRefName { name: String },

    #[error("no index entry for path '{path}'")]
    EntryNotFound { path: String },

    #[error("index file error: {reason}")]
    IndexIo { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("position {index} is out of range for {len} entries")]
    OutOfRange { index: usize, len: usize },

    #[error("expected a {expected} object, got a {actual}")]
    TypeMismatch {
        expected: ObjectKind,
        actual: ObjectKind,
    },

    #[error("handle used after its database was closed")]
    UseAfterClose,

    #[error("reference '{name}' did not resolve within {hops} hops")]
    RefResolutionLoop { name: String, hops: usize },

    #[error("{kind} object has not been written to the database yet")]
    UnwrittenObject { kind: ObjectKind },

    #[error("invalid tree entry name '{name}'")]
    InvalidEntryName { name: String },

    #[error("index has no work tree or object database attached")]
    BareIndex,

    #[error("{field} {value:?} cannot be encoded")]
    UnencodableField { field: &'static str, value: String },
}

impl ErrorKind {
    pub fn class(&self) -> ErrorClass {
        match self {
            ErrorKind::MalformedId { .. }
            | ErrorKind::CorruptInput { .. }
            | ErrorKind::CorruptObject { .. }
            | ErrorKind::ObjectNotFound { .. }
            | ErrorKind::NotAGitRepository { .. }
            | ErrorKind::AlreadyExists { .. }
            | ErrorKind::RefNotFound { .. }
            | ErrorKind::RefExists { .. }
            | ErrorKind::InvalidRefName { .. }
            | ErrorKind::EntryNotFound { .. }
            | ErrorKind::IndexIo { .. }
            | ErrorKind::Io(_) => ErrorClass::Input,
            ErrorKind::OutOfRange { .. }
            | ErrorKind::TypeMismatch { .. }
            | ErrorKind::UseAfterClose
            | ErrorKind::RefResolutionLoop { .. }
            | ErrorKind::UnwrittenObject { .. }
            | ErrorKind::InvalidEntryName { .. }
            | ErrorKind::BareIndex
            | ErrorKind::UnencodableField { .. } => ErrorClass::Programming,
        }
    }

    pub(crate) fn during(self, operation: &'static str) -> Error {
        Error::new(operation, self)
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        ErrorKind::CorruptObject {
            reason: reason.into(),
        }
    }
}

/// Attach an operation name to any result whose error converts into an [`ErrorKind`].
pub(crate) trait ResultExt<T> {
    fn during(self, operation: &'static str) -> Result<T>;
}

impl<T, E: Into<ErrorKind>> ResultExt<T> for std::result::Result<T, E> {
    fn during(self, operation: &'static str) -> Result<T> {
        self.map_err(|e| e.into().during(operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn message_names_operation_and_cause() {
        let err = ErrorKind::RefNotFound {
            name: "refs/heads/nope".to_string(),
        }
        .during("References.lookup");

        assert_eq!(
            err.to_string(),
            "References.lookup: reference 'refs/heads/nope' not found"
        );
        assert_eq!(err.class(), ErrorClass::Input);
    }

    #[test]
    fn contract_violations_are_programming_errors() {
        let kinds = [
            ErrorKind::OutOfRange { index: 3, len: 1 },
            ErrorKind::UseAfterClose,
            ErrorKind::TypeMismatch {
                expected: ObjectKind::Commit,
                actual: ObjectKind::Blob,
            },
            ErrorKind::RefResolutionLoop {
                name: "HEAD".to_string(),
                hops: 5,
            },
        ];

        for kind in kinds {
            assert_eq!(kind.class(), ErrorClass::Programming);
        }
    }

    #[test]
    fn io_errors_convert_with_operation() {
        let io: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk on fire"));
        let err = io.during("Database.write").unwrap_err();

        assert_eq!(err.operation(), "Database.write");
        assert!(matches!(err.kind(), ErrorKind::Io(_)));
        assert_eq!(err.to_string(), "Database.write: disk on fire");
    }
}
