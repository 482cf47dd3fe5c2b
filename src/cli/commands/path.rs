//! CLI implementation for `verforge path`

use anyhow::{Context, Result};

use crate::cli::output::OutputConfig;
use crate::core::artifact::validate_version;
use crate::core::config::ForgeConfig;
use crate::infra::dirs::VerforgeDirs;

/// Execute the path command
pub fn execute(config: &ForgeConfig, dirs: &VerforgeDirs, version: &str) -> Result<()> {
    validate_version(version).with_context(|| format!("Invalid version '{version}'"))?;
    let path = config.layout(dirs).artifact_path(version);

    if OutputConfig::current().json {
        let value = serde_json::json!({
            "version": version,
            "path": path,
            "exists": path.exists(),
        });
        println!("{value}");
    } else {
        println!("{}", path.display());
    }
    Ok(())
}
