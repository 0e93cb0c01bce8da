//! Plumbing commands
//!
//! Low-level operations over the object database, the index and the
//! reference store. Each command writes its output to the writer it is
//! given, so the binary passes stdout and tests pass a buffer.
//!
//! ## Commands
//!
//! - `init`: Create a repository
//! - `hash-object`: Compute a blob id and optionally store the blob
//! - `cat-file`: Print an object's content, type or size
//! - `ls-tree`: List the entries of a tree
//! - `add`, `ls-files`, `write-tree`: Stage files and turn the index into trees
//! - `commit-tree`, `tag`: Create commit and tag objects
//! - `show-ref`, `update-ref`, `symbolic-ref`: Inspect and edit references

mod add;
pub mod cat_file;
mod commit_tree;
mod hash_object;
pub mod init;
mod ls_files;
mod ls_tree;
mod rev_parse;
mod show_ref;
mod tag;
mod update_ref;
mod write_tree;
