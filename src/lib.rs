//! A content-addressable object store with git's on-disk layout
//!
//! - [`artifacts::objects`]: object codec and typed objects (blob, tree, commit, tag)
//! - [`artifacts::index`], [`artifacts::refs`]: index file format and reference values
//! - [`areas`]: the stateful stores (object database, index, references) and
//!   the [`Repository`] that owns them
//! - [`commands`]: plumbing commands used by the `bit-store` binary

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod errors;

pub use areas::database::Database;
pub use areas::index::Index;
pub use areas::refs::RefStore;
pub use areas::repository::{Repository, RepositoryLayout};
pub use artifacts::objects::object::{AnyObject, Object, TypedObject};
pub use artifacts::objects::object_id::ObjectId;
pub use artifacts::objects::object_kind::ObjectKind;
pub use errors::{Error, ErrorClass, ErrorKind, Result};
