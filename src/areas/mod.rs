//! Stateful repository components
//!
//! - `database`: Loose object database
//! - `index`: Staging area backed by the index file
//! - `refs`: Loose and packed references
//! - `repository`: The aggregate owning all of the above

pub mod database;
pub mod index;
pub mod refs;
pub mod repository;
