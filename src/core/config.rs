//! Configuration management
//!
//! Reads `verforge.toml`, which names the source repository, how to build it,
//! where binaries go, and which releases to consider.
//!
//! Lookup order: an explicit `--config` path, then `verforge.toml` in the
//! working directory, then `config.toml` in the user config directory. A
//! missing file yields the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{defaults, urls};
use crate::core::artifact::ArtifactLayout;
use crate::infra::builder::SourceSpec;
use crate::infra::dirs::VerforgeDirs;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },

    /// A required setting is absent
    #[error("Missing setting '{key}' in configuration")]
    Missing { key: String },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Source repository settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Release discovery settings
    #[serde(default)]
    pub releases: ReleasesConfig,
}

/// Source repository settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Git URL cloned for each version
    pub repo_url: Option<String>,

    /// Directory holding per-version checkouts
    pub checkout_dir: Option<PathBuf>,

    /// Build from this directory instead of cloning
    pub path: Option<PathBuf>,
}

/// Build settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Program run inside the checkout
    pub program: Option<String>,

    /// Arguments; `{output}`, `{output_dir}` and `{version}` are substituted
    #[serde(default)]
    pub args: Vec<String>,

    /// Base name of the produced binary
    pub binary_name: Option<String>,

    /// Directory receiving the binaries
    pub output_dir: Option<PathBuf>,
}

/// Release discovery settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleasesConfig {
    /// API base URL
    pub api_url: Option<String>,

    /// Repository owner
    pub owner: Option<String>,

    /// Repository name
    pub repo: Option<String>,

    /// Oldest release considered
    pub min_version: Option<String>,

    /// Versions never built (tagged variants included)
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ForgeConfig {
    /// Load configuration following the lookup order
    pub fn load(explicit: Option<&Path>, dirs: &VerforgeDirs) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::ReadError {
                    path: path.display().to_string(),
                    error: "file not found".to_string(),
                });
            }
            return Self::load_from_path(path);
        }

        let local = Path::new(defaults::CONFIG_FILE_NAME);
        if local.exists() {
            return Self::load_from_path(local);
        }

        Self::load_from_path(&dirs.global_config_path())
    }

    /// Load configuration from a specific path
    ///
    /// Returns the defaults when the file does not exist.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Source repository URL
    pub fn repo_url(&self) -> Result<&str, ConfigError> {
        self.source
            .repo_url
            .as_deref()
            .ok_or_else(|| ConfigError::Missing {
                key: "source.repo_url".to_string(),
            })
    }

    /// Effective checkout directory
    #[must_use]
    pub fn checkout_dir(&self, dirs: &VerforgeDirs) -> PathBuf {
        self.source
            .checkout_dir
            .clone()
            .unwrap_or_else(|| dirs.sources_dir())
    }

    /// Where build sources come from
    ///
    /// A local `source.path` wins over `source.repo_url`.
    pub fn source_spec(&self, dirs: &VerforgeDirs) -> Result<SourceSpec, ConfigError> {
        if let Some(path) = &self.source.path {
            return Ok(SourceSpec::Local(path.clone()));
        }
        Ok(SourceSpec::Git {
            url: self.repo_url()?.to_string(),
            checkout_dir: self.checkout_dir(dirs),
        })
    }

    /// Effective build program
    #[must_use]
    pub fn build_program(&self) -> &str {
        self.build
            .program
            .as_deref()
            .unwrap_or(defaults::DEFAULT_BUILD_PROGRAM)
    }

    /// Effective artifact layout
    #[must_use]
    pub fn layout(&self, dirs: &VerforgeDirs) -> ArtifactLayout {
        let output_dir = self
            .build
            .output_dir
            .clone()
            .unwrap_or_else(|| dirs.artifacts_dir());
        let binary_name = self
            .build
            .binary_name
            .as_deref()
            .unwrap_or(defaults::DEFAULT_BINARY_NAME);
        ArtifactLayout::new(output_dir, binary_name)
    }

    /// Effective release API URL
    #[must_use]
    pub fn api_url(&self) -> &str {
        self.releases.api_url.as_deref().unwrap_or(urls::GITHUB_API)
    }

    /// Release repository as `(owner, repo)`
    pub fn release_repo(&self) -> Result<(&str, &str), ConfigError> {
        let owner = self
            .releases
            .owner
            .as_deref()
            .ok_or_else(|| ConfigError::Missing {
                key: "releases.owner".to_string(),
            })?;
        let repo = self
            .releases
            .repo
            .as_deref()
            .ok_or_else(|| ConfigError::Missing {
                key: "releases.repo".to_string(),
            })?;
        Ok((owner, repo))
    }

    /// Effective minimum release
    #[must_use]
    pub fn min_version(&self) -> &str {
        self.releases
            .min_version
            .as_deref()
            .unwrap_or(defaults::DEFAULT_MIN_VERSION)
    }
}
