//! Git operations
//!
//! Produces a fresh shallow checkout of a repository at the ref named by a
//! version, using the gix crate.

use gix::remote::fetch::Shallow;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::release::is_release_tag;

/// Git operation errors
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to clone repository
    #[error("Failed to clone '{url}' at {reference}: {error}")]
    CloneFailed {
        url: String,
        reference: String,
        error: String,
    },

    /// Failed to resolve HEAD of the checkout
    #[error("Failed to resolve {reference} in '{path}': {error}")]
    ResolveFailed {
        path: PathBuf,
        reference: String,
        error: String,
    },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },
}

/// Git reference type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitRef {
    /// Git tag (e.g., "v1.0.0")
    Tag(String),
    /// Git branch (e.g., "master")
    Branch(String),
}

impl GitRef {
    /// Reference naming `version`
    ///
    /// Release-shaped versions are tags, anything else is a branch.
    pub fn for_version(version: &str) -> Self {
        if is_release_tag(version) {
            Self::Tag(version.to_string())
        } else {
            Self::Branch(version.to_string())
        }
    }

    /// Get the reference string
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tag(s) | Self::Branch(s) => s,
        }
    }
}

impl std::fmt::Display for GitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tag(s) => write!(f, "tag:{s}"),
            Self::Branch(s) => write!(f, "branch:{s}"),
        }
    }
}

/// Result of a checkout
#[derive(Debug, Clone)]
pub struct Checkout {
    /// Path to the working tree
    pub path: PathBuf,
    /// Commit SHA of HEAD
    pub commit_sha: String,
    /// The ref that was checked out
    pub git_ref: GitRef,
}

/// Clone `url` at `git_ref` into `dest`, replacing anything already there
///
/// Blocking; call from `spawn_blocking` in async code.
pub fn checkout(url: &str, git_ref: &GitRef, dest: &Path) -> Result<Checkout, GitError> {
    if dest.exists() {
        std::fs::remove_dir_all(dest).map_err(|e| GitError::IoError {
            path: dest.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GitError::IoError {
            path: parent.to_path_buf(),
            error: e.to_string(),
        })?;
    }

    let clone_failed = |error: String| GitError::CloneFailed {
        url: url.to_string(),
        reference: git_ref.to_string(),
        error,
    };

    let prepare = gix::prepare_clone(url, dest).map_err(|e| clone_failed(e.to_string()))?;
    let mut prepare = prepare
        .with_ref_name(Some(git_ref.as_str()))
        .map_err(|e| clone_failed(e.to_string()))?
        .with_shallow(Shallow::DepthAtRemote(NonZeroU32::MIN));

    let (mut pending, _outcome) = prepare
        .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
        .map_err(|e| clone_failed(e.to_string()))?;

    let (repo, _outcome) = pending
        .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
        .map_err(|e| clone_failed(e.to_string()))?;

    let commit_sha = repo
        .head_id()
        .map_err(|e| GitError::ResolveFailed {
            path: dest.to_path_buf(),
            reference: git_ref.to_string(),
            error: e.to_string(),
        })?
        .to_hex()
        .to_string();

    tracing::debug!("Checked out {git_ref} at {commit_sha} into {}", dest.display());
    Ok(Checkout {
        path: dest.to_path_buf(),
        commit_sha,
        git_ref: git_ref.clone(),
    })
}
