//! CLI implementation for `verforge list`
//!
//! Prints the releases `build --all` would consider, after exclusions.

use anyhow::{Context, Result};

use crate::cli::output::OutputConfig;
use crate::core::config::ForgeConfig;
use crate::core::release::exclude;
use crate::infra::releases::ReleaseClient;

/// List releases at or above the minimum, minus configured and given exclusions
pub async fn select_releases(
    config: &ForgeConfig,
    min: Option<&str>,
    extra_exclude: &[String],
) -> Result<Vec<String>> {
    let (owner, repo) = config.release_repo()?;
    let min = min.unwrap_or_else(|| config.min_version());

    let client = ReleaseClient::new(config.api_url(), owner, repo);
    let releases = client
        .list_releases(min)
        .await
        .with_context(|| format!("Failed to list releases of {owner}/{repo}"))?;

    let mut excluded = config.releases.exclude.clone();
    excluded.extend(extra_exclude.iter().cloned());
    Ok(exclude(&releases, &excluded))
}

/// Execute the list command
pub async fn execute(config: &ForgeConfig, min: Option<&str>, extra_exclude: &[String]) -> Result<()> {
    let releases = select_releases(config, min, extra_exclude).await?;
    let output = OutputConfig::current();

    if output.json {
        println!("{}", serde_json::to_string(&releases)?);
    } else if releases.is_empty() {
        if !output.quiet {
            println!("No releases found");
        }
    } else {
        for release in &releases {
            println!("{release}");
        }
    }
    Ok(())
}
