//! Core logic
//!
//! # Submodules
//!
//! - [`coordinator`] - Per-version build deduplication and the build worker
//! - [`artifact`] - Artifact and log path conventions
//! - [`release`] - Release filtering and exclusion
//! - [`config`] - `verforge.toml` loading

pub mod artifact;
pub mod config;
pub mod coordinator;
pub mod release;
