//! Error types for verforge
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Build operation errors
///
/// A build outcome is delivered to every caller waiting on the version, so
/// this type is `Clone` and carries its details as strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Failed to fetch the source for a version
    #[error("Failed to fetch source for '{version}': {error}")]
    Source { version: String, error: String },

    /// Build program could not be located or started
    #[error("Failed to start '{program}' for '{version}': {error}")]
    Spawn {
        version: String,
        program: String,
        error: String,
    },

    /// Build program exited unsuccessfully
    #[error("Build of '{version}' exited with {status}\n{output_tail}")]
    Command {
        version: String,
        status: String,
        output_tail: String,
    },

    /// Build succeeded but no artifact was produced
    #[error("Build of '{version}' produced no artifact at '{path}'")]
    ArtifactMissing { version: String, path: PathBuf },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },

    /// Version cannot be used as a file name
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// Build operation panicked
    #[error("Build of '{version}' panicked: {message}")]
    Panicked { version: String, message: String },

    /// Worker went away before delivering a result
    #[error("Build of '{version}' was abandoned before completing")]
    Abandoned { version: String },
}

/// Errors returned to callers of the coordinator
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Version cannot be used as a file name
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// Artifact existence check failed for a reason other than "not found"
    #[error("Failed to check artifact for '{version}' at '{path}': {error}")]
    PreCheck {
        version: String,
        path: PathBuf,
        error: String,
    },

    /// A requested version failed to build
    #[error("Failed to build '{version}': {source}")]
    Build {
        version: String,
        #[source]
        source: BuildError,
    },
}

impl CoordinatorError {
    /// Version the error refers to
    pub fn version(&self) -> &str {
        match self {
            Self::InvalidVersion { version, .. }
            | Self::PreCheck { version, .. }
            | Self::Build { version, .. } => version,
        }
    }
}
