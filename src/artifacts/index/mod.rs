//! Git index file format
//!
//! The index (also called staging area or cache) is an ordered table of
//! staged file metadata, independent of any tree until it is written out.
//!
//! ## File Format (Version 2 and 3)
//!
//! ```text
//! Header (12 bytes):
//!   - Signature: "DIRC" (4 bytes)
//!   - Version: 2 or 3 (4 bytes)
//!   - Entry count (4 bytes)
//!
//! Entries (variable length):
//!   - Each entry padded with NULs to 8-byte alignment
//!   - Version 3 entries may carry 2 bytes of extended flags
//!
//! Extensions (optional, skipped on read)
//!
//! Checksum (20 bytes):
//!   - SHA-1 hash of all preceding bytes
//! ```

pub mod checksum;
pub mod entry_mode;
pub mod index_entry;
pub mod index_header;

/// Size of SHA-1 checksum in bytes
pub const CHECKSUM_SIZE: usize = 20;

/// Size of index header in bytes
pub const HEADER_SIZE: usize = 12; // 4 bytes for marker, 4 for version, 4 for entries_count

/// Magic signature identifying index files
pub const SIGNATURE: &[u8; 4] = b"DIRC";

/// Index format written when no entry needs extended flags
pub const VERSION: u32 = 2;

/// Index format written when some entry carries extended flags
pub const EXTENDED_VERSION: u32 = 3;
