//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tempfile::TempDir;
use tokio::sync::Notify;
use verforge::core::coordinator::{BuildOutcome, BuildRequest, VersionBuilder};
use verforge::error::BuildError;

/// Test project context
///
/// Creates a temporary directory for test projects and provides
/// utilities for setting up test scenarios.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Directory the builds write binaries to
    pub fn bin_dir(&self) -> PathBuf {
        self.dir.path().join("bin")
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Write a `verforge.toml` that builds from the project directory with
    /// `sh -c <script>`
    pub fn write_shell_config(&self, script: &str) {
        let config = format!(
            r#"
[source]
path = "{source}"

[build]
program = "sh"
args = ["-c", {script:?}]
binary_name = "node"
output_dir = "{bin}"
"#,
            source = toml_path(&self.path()),
            bin = toml_path(&self.bin_dir()),
        );
        self.create_file("verforge.toml", &config);
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

fn toml_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// Build script writing a small file to the artifact path
pub const WRITE_ARTIFACT: &str = "echo built {version} > {output}";

/// Builder recording every build it runs
///
/// Writes the artifact on success. Versions registered with `gated` block
/// until `release` is called for them.
#[derive(Default)]
pub struct RecordingBuilder {
    order: Mutex<Vec<String>>,
    counts: Mutex<HashMap<String, usize>>,
    failing: HashSet<String>,
    gates: HashMap<String, Arc<Notify>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
    delay: Duration,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every build of `version`
    pub fn failing(mut self, version: &str) -> Self {
        self.failing.insert(version.to_string());
        self
    }

    /// Block builds of `version` until released
    pub fn gated(mut self, version: &str) -> Self {
        self.gates
            .insert(version.to_string(), Arc::new(Notify::new()));
        self
    }

    /// Sleep this long inside every build
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Let a gated build finish
    pub fn release(&self, version: &str) {
        if let Some(gate) = self.gates.get(version) {
            gate.notify_one();
        }
    }

    /// Versions in the order their builds started
    pub fn order(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }

    /// Number of builds started for `version`
    pub fn build_count(&self, version: &str) -> usize {
        self.counts.lock().unwrap().get(version).copied().unwrap_or(0)
    }

    /// Total builds started
    pub fn total_builds(&self) -> usize {
        self.counts.lock().unwrap().values().sum()
    }

    /// Highest number of builds observed running at once
    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    async fn run(&self, request: BuildRequest<'_>) -> BuildOutcome {
        let version = request.version.to_string();
        self.order.lock().unwrap().push(version.clone());
        *self.counts.lock().unwrap().entry(version.clone()).or_default() += 1;

        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(running, Ordering::SeqCst);

        if let Some(gate) = self.gates.get(&version) {
            gate.notified().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let outcome = if self.failing.contains(&version) {
            Err(BuildError::Command {
                version,
                status: "exit status: 1".to_string(),
                output_tail: "compile error".to_string(),
            })
        } else {
            std::fs::create_dir_all(request.layout.output_dir()).unwrap();
            std::fs::write(request.artifact_path, version.as_bytes()).unwrap();
            Ok(())
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

impl VersionBuilder for RecordingBuilder {
    fn build<'a>(&'a self, request: BuildRequest<'a>) -> BoxFuture<'a, BuildOutcome> {
        self.run(request).boxed()
    }
}

/// Poll `condition` until it holds, failing the test after a few seconds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "Timed out waiting for condition"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
