// src/filesystem/mod.rs

//! Filesystem helpers for the install area
//!
//! - [`path`]: normalising archive entry paths and joining them under the
//!   install area root without escaping it
//! - [`relocate`]: the prefix relocation map applied to artifact contents

pub mod path;
pub mod relocate;

pub use path::{normalize_entry_path, safe_join};
pub use relocate::RelocationMap;
