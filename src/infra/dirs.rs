//! Platform-specific directory management
//!
//! Provides the default locations for built artifacts, source checkouts and
//! the user configuration file. Follows the XDG Base Directory Specification
//! on Linux and standard locations on macOS.
//!
//! Environment variables can override default directories:
//! - `VERFORGE_CACHE_DIR` - Override cache directory
//! - `VERFORGE_CONFIG_DIR` - Override config directory

use std::env;
use std::path::PathBuf;

/// Environment variable names for directory overrides
pub const ENV_CACHE_DIR: &str = "VERFORGE_CACHE_DIR";
pub const ENV_CONFIG_DIR: &str = "VERFORGE_CONFIG_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "verforge";

/// Subdirectory names
const ARTIFACTS_SUBDIR: &str = "artifacts";
const SOURCES_SUBDIR: &str = "sources";

/// Platform-specific directory provider for verforge
#[derive(Debug, Clone)]
pub struct VerforgeDirs {
    cache_dir: PathBuf,
    config_dir: PathBuf,
}

impl VerforgeDirs {
    /// Create a new `VerforgeDirs` instance
    ///
    /// Checks environment variables first, then falls back to platform defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache_dir: Self::resolve(ENV_CACHE_DIR, dirs::cache_dir, ".cache"),
            config_dir: Self::resolve(ENV_CONFIG_DIR, dirs::config_dir, ".config"),
        }
    }

    /// Get the cache directory path
    ///
    /// - Linux: `$XDG_CACHE_HOME/verforge` or `~/.cache/verforge`
    /// - macOS: `~/Library/Caches/verforge`
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone()
    }

    /// Get the config directory path
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Default directory for built binaries
    #[must_use]
    pub fn artifacts_dir(&self) -> PathBuf {
        self.cache_dir.join(ARTIFACTS_SUBDIR)
    }

    /// Directory holding one source checkout per version
    #[must_use]
    pub fn sources_dir(&self) -> PathBuf {
        self.cache_dir.join(SOURCES_SUBDIR)
    }

    /// Path to the user-wide `config.toml`
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    fn resolve(var: &str, platform: fn() -> Option<PathBuf>, home_subdir: &str) -> PathBuf {
        if let Ok(path) = env::var(var) {
            return PathBuf::from(path);
        }

        platform().map(|p| p.join(APP_NAME)).unwrap_or_else(|| {
            // Fallback to home directory
            dirs::home_dir()
                .map(|h| h.join(home_subdir).join(APP_NAME))
                .unwrap_or_else(|| PathBuf::from(".").join(home_subdir).join(APP_NAME))
        })
    }
}

impl Default for VerforgeDirs {
    fn default() -> Self {
        Self::new()
    }
}
