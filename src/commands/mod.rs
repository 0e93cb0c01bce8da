//! Command implementations used by the `bit-store` binary
//!
//! Only plumbing is provided: commands that read and write objects, the
//! index and references directly.

pub mod plumbing;
