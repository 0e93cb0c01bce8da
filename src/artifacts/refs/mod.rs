//! Reference values
//!
//! - `ref_name`: validated reference names (`HEAD`, `refs/heads/main`, ...)
//! - `reference`: a named pointer, either direct (an object id) or
//!   symbolic (another reference name), plus the listing filter

pub mod ref_name;
pub mod reference;

/// Characters and sequences git forbids in reference names
pub const INVALID_REF_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\/\/|\.$|\.lock$|\.lock\/|@\{|^@$|[\x00-\x20\*:\?\[\\~\^\x7f]";

/// Prefix of a symbolic reference file's content
pub const SYMREF_PREFIX: &str = "ref: ";

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// Maximum number of symbolic hops followed while resolving a reference
pub const MAX_REF_NESTING: usize = 5;

pub const HEADS_PREFIX: &str = "refs/heads/";
pub const TAGS_PREFIX: &str = "refs/tags/";
pub const REMOTES_PREFIX: &str = "refs/remotes/";
