//! Infrastructure layer
//!
//! Handles I/O with the outside world: git, build processes, the release
//! API, and platform directories.

pub mod builder;
pub mod dirs;
pub mod git;
pub mod releases;
