//! Git data structures
//!
//! - `index`: Index file format (entries, header, checksum, modes)
//! - `objects`: Object codec and the blob, tree, commit and tag types
//! - `refs`: Reference names and values

pub mod index;
pub mod objects;
pub mod refs;
