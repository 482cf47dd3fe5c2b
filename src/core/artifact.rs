//! Artifact path conventions
//!
//! Every version builds to a deterministic location under the output
//! directory, so callers can tell whether a build is needed without asking
//! the coordinator.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Subdirectory of the output directory holding per-version build logs
pub const LOGS_SUBDIR: &str = "logs";

/// Why a version id cannot be used to name files
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionIdError {
    /// Empty string
    #[error("version is empty")]
    Empty,

    /// Would be read as an option by the build program or git
    #[error("version must not start with '-'")]
    LeadingDash,

    /// Hidden or relative path component (`.`, `..`, `.name`)
    #[error("version must not start with '.'")]
    LeadingDot,

    /// Would leave the directory it is joined onto
    #[error("version must not contain path separators")]
    PathSeparator,

    /// NUL or other control character
    #[error("version must not contain control characters")]
    ControlCharacter,
}

/// Check that `version` names a single file or directory entry
///
/// Versions are joined onto the output and checkout directories, so they
/// must stay inside them. This runs before anything touches the filesystem.
pub fn validate_version(version: &str) -> Result<(), VersionIdError> {
    if version.is_empty() {
        return Err(VersionIdError::Empty);
    }
    if version.starts_with('-') {
        return Err(VersionIdError::LeadingDash);
    }
    if version.starts_with('.') {
        return Err(VersionIdError::LeadingDot);
    }
    if version.contains(['/', '\\']) {
        return Err(VersionIdError::PathSeparator);
    }
    if version.chars().any(char::is_control) {
        return Err(VersionIdError::ControlCharacter);
    }
    Ok(())
}

/// Where built binaries and their logs live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    output_dir: PathBuf,
    binary_name: String,
}

impl ArtifactLayout {
    /// Create a layout rooted at `output_dir` for binaries named `binary_name`
    pub fn new(output_dir: impl Into<PathBuf>, binary_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            binary_name: binary_name.into(),
        }
    }

    /// Directory receiving the built binaries
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Base name of the built binaries
    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    /// Path of the binary built for `version`
    ///
    /// The layout is `<output_dir>/<binary_name>-<version>`.
    #[must_use]
    pub fn artifact_path(&self, version: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}-{version}", self.binary_name))
    }

    /// Path of the build log written for `version`
    #[must_use]
    pub fn log_path(&self, version: &str) -> PathBuf {
        self.output_dir
            .join(LOGS_SUBDIR)
            .join(format!("{version}.log"))
    }
}

/// Check whether an artifact exists
///
/// Returns `Ok(false)` when the path is absent and an error for anything
/// else that prevents answering (e.g. permission denied on a parent).
pub async fn artifact_exists(path: &Path) -> io::Result<bool> {
    tokio::fs::try_exists(path).await
}
