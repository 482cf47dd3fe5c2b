//! CLI implementation for `verforge build`
//!
//! Every version is requested from its own task through one shared
//! coordinator, the same way concurrent test processes would use it.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::Instrument;

use crate::cli::commands::list::select_releases;
use crate::cli::output::{create_spinner, status, OutputConfig};
use crate::core::config::ForgeConfig;
use crate::core::coordinator::BuildCoordinator;
use crate::infra::builder::CommandBuilder;
use crate::infra::dirs::VerforgeDirs;

/// Build options
#[derive(Debug, Default)]
pub struct BuildOptions {
    /// Versions named on the command line
    pub versions: Vec<String>,
    /// Rebuild even if an artifact exists
    pub force: bool,
    /// Build every release from the API
    pub all: bool,
    /// Minimum release for `all`
    pub min: Option<String>,
    /// Extra exclusions for `all`
    pub exclude: Vec<String>,
}

/// Failure of one version
#[derive(Debug, Serialize)]
pub struct FailedVersion {
    /// Version that failed
    pub version: String,
    /// Error message
    pub error: String,
}

/// Per-version results of a build command
#[derive(Debug, Default, Serialize)]
pub struct BuildSummary {
    /// Versions built or served from this run's results
    pub built: Vec<String>,
    /// Versions whose artifact already existed
    pub skipped: Vec<String>,
    /// Versions that failed
    pub failed: Vec<FailedVersion>,
}

/// Execute the build command
pub async fn execute(config: &ForgeConfig, dirs: &VerforgeDirs, options: BuildOptions) -> Result<()> {
    let mut versions = if options.all {
        select_releases(config, options.min.as_deref(), &options.exclude).await?
    } else {
        options.versions
    };
    let mut seen = HashSet::new();
    versions.retain(|v| seen.insert(v.clone()));

    if versions.is_empty() {
        bail!("No versions to build. Name versions or pass --all.");
    }

    let builder = CommandBuilder::new(
        config.source_spec(dirs)?,
        config.build_program(),
        config.build.args.clone(),
    );
    let coordinator = BuildCoordinator::new(Arc::new(builder), config.layout(dirs));

    tracing::info!(
        "Building {} version(s) into {}",
        versions.len(),
        coordinator.layout().output_dir().display()
    );

    let output = OutputConfig::current();
    let spinner = output
        .show_progress()
        .then(|| create_spinner(&format!("Building {} version(s)...", versions.len())));

    let summary = build_versions(&coordinator, &versions, options.force).await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    print_summary(&summary, output)?;

    if let Some(first) = summary.failed.first() {
        bail!(
            "{} of {} version(s) failed, first: {}",
            summary.failed.len(),
            versions.len(),
            first.version
        );
    }
    Ok(())
}

/// Request each version concurrently and collect the outcomes
pub async fn build_versions(
    coordinator: &BuildCoordinator,
    versions: &[String],
    force: bool,
) -> BuildSummary {
    let tasks: Vec<_> = versions
        .iter()
        .map(|version| {
            let coordinator = coordinator.clone();
            let version = version.clone();
            let span = tracing::info_span!("request", version = %version);
            tokio::spawn(
                async move {
                    let result = coordinator.request_builds(&[version.as_str()], force).await;
                    (version, result)
                }
                .instrument(span),
            )
        })
        .collect();

    let mut summary = BuildSummary::default();
    for (task, version) in tasks.into_iter().zip(versions) {
        match task.await {
            Ok((_, Ok(report))) => {
                summary.built.extend(report.resolved);
                summary.skipped.extend(report.skipped);
            }
            Ok((version, Err(e))) => summary.failed.push(FailedVersion {
                version,
                error: e.to_string(),
            }),
            Err(e) => summary.failed.push(FailedVersion {
                version: version.clone(),
                error: e.to_string(),
            }),
        }
    }
    summary
}

fn print_summary(summary: &BuildSummary, output: OutputConfig) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string(summary)?);
        return Ok(());
    }

    for failed in &summary.failed {
        eprintln!("{} {}: {}", status::ERROR, failed.version, failed.error);
    }
    if output.quiet {
        return Ok(());
    }

    if !summary.built.is_empty() {
        println!("{} Built {} version(s):", status::SUCCESS, summary.built.len());
        for version in &summary.built {
            println!("    {version}");
        }
    }
    if !summary.skipped.is_empty() {
        println!(
            "  Skipped {} version(s) (already built)",
            summary.skipped.len()
        );
    }
    if summary.built.is_empty() && summary.skipped.is_empty() && summary.failed.is_empty() {
        println!("{} Nothing to build", status::WARNING);
    }
    Ok(())
}
