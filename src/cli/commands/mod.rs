//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod list;
pub mod path;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::core::config::ForgeConfig;
use crate::infra::dirs::VerforgeDirs;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build binaries for the given versions
    Build {
        /// Versions to build (release tags or branch names)
        versions: Vec<String>,

        /// Rebuild even if an artifact already exists
        #[arg(short, long)]
        force: bool,

        /// Build every release at or above the minimum version
        #[arg(long, conflicts_with = "versions")]
        all: bool,

        /// Minimum release for --all (overrides the configuration)
        #[arg(long, requires = "all")]
        min: Option<String>,

        /// Additional versions to leave out of --all
        #[arg(long, requires = "all")]
        exclude: Vec<String>,
    },

    /// List releases that would be built by `build --all`
    List {
        /// Minimum release (overrides the configuration)
        #[arg(long)]
        min: Option<String>,

        /// Additional versions to leave out
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Print the artifact path for a version
    Path {
        /// Version to locate
        #[arg(id = "version_arg", value_name = "VERSION")]
        version: String,
    },
}

impl Commands {
    /// Execute the command
    pub async fn run(self, config_path: Option<&Path>) -> Result<()> {
        let dirs = VerforgeDirs::new();
        let config = ForgeConfig::load(config_path, &dirs)
            .with_context(|| "Failed to load configuration")?;

        match self {
            Self::Build {
                versions,
                force,
                all,
                min,
                exclude,
            } => {
                let options = build::BuildOptions {
                    versions,
                    force,
                    all,
                    min,
                    exclude,
                };
                build::execute(&config, &dirs, options).await
            }
            Self::List { min, exclude } => {
                list::execute(&config, min.as_deref(), &exclude).await
            }
            Self::Path { version } => path::execute(&config, &dirs, &version),
        }
    }
}
