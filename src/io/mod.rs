//! Persistence helpers for triangulation state.
//!
//! Only flag vectors and user indices are persisted here; the mesh itself
//! is rebuilt by replaying creation and refinement, after which saved flags
//! can be loaded back onto the same active cells.

pub mod flags;

pub use flags::{FlagKind, read_flags, write_flags};
