//! Build operation
//!
//! Turns a version into a binary: check out the source at that version, run
//! the configured build command inside the checkout, and confirm the binary
//! landed at its artifact path. Command output goes to a per-version log file
//! and to `tracing` at debug level.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::config::defaults;
use crate::core::artifact::validate_version;
use crate::core::coordinator::{BuildOutcome, BuildRequest, VersionBuilder};
use crate::error::BuildError;
use crate::infra::git::{self, GitRef};

/// Where the source comes from
#[derive(Debug, Clone)]
pub enum SourceSpec {
    /// Clone this git URL at the version's ref
    Git {
        /// Repository URL
        url: String,
        /// Directory holding one checkout per version
        checkout_dir: PathBuf,
    },
    /// Build in an existing directory, whatever the version
    Local(PathBuf),
}

/// Builds versions by running an external command
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    source: SourceSpec,
    program: String,
    args: Vec<String>,
}

impl CommandBuilder {
    /// Create a builder running `program` with `args` in the source checkout
    ///
    /// `args` may contain the placeholders `{output}`, `{output_dir}` and
    /// `{version}`.
    pub fn new(source: SourceSpec, program: &str, args: Vec<String>) -> Self {
        Self {
            source,
            program: program.to_string(),
            args,
        }
    }

    /// Arguments with placeholders substituted for one build
    pub fn expand_args(&self, request: &BuildRequest<'_>) -> Vec<String> {
        let output = request.artifact_path.display().to_string();
        let output_dir = request.layout.output_dir().display().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{output}", &output)
                    .replace("{output_dir}", &output_dir)
                    .replace("{version}", request.version)
            })
            .collect()
    }

    /// Working directory for the build and a description of what it holds
    async fn prepare_source(&self, version: &str) -> Result<(PathBuf, String), BuildError> {
        match &self.source {
            SourceSpec::Local(dir) => Ok((dir.clone(), format!("local {}", dir.display()))),
            SourceSpec::Git { url, checkout_dir } => {
                let url = url.clone();
                let dest = checkout_dir.join(version);
                let git_ref = GitRef::for_version(version);
                tracing::info!("Fetching {git_ref} from {url}");

                let checkout =
                    tokio::task::spawn_blocking(move || git::checkout(&url, &git_ref, &dest))
                        .await
                        .map_err(|e| BuildError::Source {
                            version: version.to_string(),
                            error: e.to_string(),
                        })?
                        .map_err(|e| BuildError::Source {
                            version: version.to_string(),
                            error: e.to_string(),
                        })?;
                let described = format!("{} at {}", checkout.git_ref, checkout.commit_sha);
                Ok((checkout.path, described))
            }
        }
    }

    async fn run(&self, request: BuildRequest<'_>) -> BuildOutcome {
        let version = request.version;
        validate_version(version).map_err(|e| BuildError::InvalidVersion {
            version: version.to_string(),
            reason: e.to_string(),
        })?;
        let (workdir, source) = self.prepare_source(version).await?;
        tracing::info!("Source for {version}: {source}");

        let program = which::which(&self.program).map_err(|e| BuildError::Spawn {
            version: version.to_string(),
            program: self.program.clone(),
            error: e.to_string(),
        })?;

        let output_dir = request.layout.output_dir();
        create_dir(output_dir).await?;
        let log_path = request.layout.log_path(version);
        if let Some(parent) = log_path.parent() {
            create_dir(parent).await?;
        }
        let mut log = File::create(&log_path).await.map_err(|e| io_error(&log_path, &e))?;
        log.write_all(format!("# {version}: {source}\n").as_bytes())
            .await
            .map_err(|e| io_error(&log_path, &e))?;

        let args = self.expand_args(&request);
        tracing::info!("Running {} {}", self.program, args.join(" "));

        let mut child = Command::new(&program)
            .args(&args)
            .current_dir(&workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BuildError::Spawn {
                version: version.to_string(),
                program: self.program.clone(),
                error: e.to_string(),
            })?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let mut tail = OutputTail::new(defaults::FAILURE_OUTPUT_LINES);
        while let Some(line) = rx.recv().await {
            tracing::debug!("{version}: {line}");
            log.write_all(line.as_bytes())
                .await
                .map_err(|e| io_error(&log_path, &e))?;
            log.write_all(b"\n")
                .await
                .map_err(|e| io_error(&log_path, &e))?;
            tail.push(line);
        }
        log.flush().await.map_err(|e| io_error(&log_path, &e))?;

        let status = child.wait().await.map_err(|e| BuildError::Spawn {
            version: version.to_string(),
            program: self.program.clone(),
            error: e.to_string(),
        })?;

        if !status.success() {
            return Err(BuildError::Command {
                version: version.to_string(),
                status: status.to_string(),
                output_tail: tail.joined(),
            });
        }

        match tokio::fs::try_exists(request.artifact_path).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(BuildError::ArtifactMissing {
                version: version.to_string(),
                path: request.artifact_path.to_path_buf(),
            }),
            Err(e) => Err(io_error(request.artifact_path, &e)),
        }
    }
}

impl VersionBuilder for CommandBuilder {
    fn build<'a>(&'a self, request: BuildRequest<'a>) -> BoxFuture<'a, BuildOutcome> {
        self.run(request).boxed()
    }
}

async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).is_err() {
            break;
        }
    }
}

async fn create_dir(path: &Path) -> Result<(), BuildError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| io_error(path, &e))
}

fn io_error(path: &Path, error: &std::io::Error) -> BuildError {
    BuildError::Io {
        path: path.to_path_buf(),
        error: error.to_string(),
    }
}

/// Last few lines of build output, kept for error reports
#[derive(Debug)]
struct OutputTail {
    lines: std::collections::VecDeque<String>,
    capacity: usize,
}

impl OutputTail {
    fn new(capacity: usize) -> Self {
        Self {
            lines: std::collections::VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn joined(&self) -> String {
        self.lines
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
