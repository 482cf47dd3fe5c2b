//! Version build coordinator
//!
//! Accepts build requests from any number of concurrent callers, deduplicates
//! them per version, and runs them on a single background worker task.
//!
//! # Model
//!
//! Each version has an entry holding the callers currently waiting on it and
//! the outcome of its most recent build. A lazily spawned worker repeatedly
//! picks the pending version with the most waiters (ties go to the
//! lexicographically smallest version), builds it with the lock released, then
//! delivers the outcome to every waiter and caches it.
//!
//! A version whose entry is resolved (outcome cached, nobody waiting) is
//! answered from the cache, even when the caller passed `force`. `force` only
//! bypasses the on-disk artifact check in [`BuildCoordinator::request_builds`].

use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{Instrument, Span};

use crate::core::artifact::{artifact_exists, validate_version, ArtifactLayout};
use crate::error::{BuildError, CoordinatorError};

/// Outcome of a single build attempt
pub type BuildOutcome = Result<(), BuildError>;

/// Everything the build operation needs to know about one attempt
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    /// Version being built
    pub version: &'a str,
    /// Directory receiving artifacts and logs
    pub layout: &'a ArtifactLayout,
    /// Where the artifact must be placed on success
    pub artifact_path: &'a Path,
}

/// The operation that turns a version into a binary
///
/// The returned future runs inside the tracing span of the first caller that
/// asked for the version, which is where its log output belongs.
pub trait VersionBuilder: Send + Sync {
    /// Build `request.version`, placing the binary at `request.artifact_path`
    fn build<'a>(&'a self, request: BuildRequest<'a>) -> BoxFuture<'a, BuildOutcome>;
}

/// Summary of a successful [`BuildCoordinator::request_builds`] call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Versions whose artifact already existed
    pub skipped: Vec<String>,
    /// Versions resolved through the coordinator
    pub resolved: Vec<String>,
}

/// Observable state of one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionState {
    /// Waiting to be built or being built
    Pending,
    /// Last build succeeded
    Succeeded,
    /// Last build failed with the given message
    Failed(String),
}

/// Point-in-time view of one version entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionStatus {
    /// Version identifier
    pub version: String,
    /// Number of callers currently waiting
    pub waiters: usize,
    /// Build state
    pub state: VersionState,
}

#[derive(Debug, Default)]
struct VersionEntry {
    waiters: Vec<oneshot::Sender<BuildOutcome>>,
    last_result: Option<BuildOutcome>,
    /// Span of the first waiter since the last resolution
    context: Option<Span>,
}

impl VersionEntry {
    fn is_resolved(&self) -> bool {
        self.waiters.is_empty() && self.last_result.is_some()
    }
}

#[derive(Debug, Default)]
struct CoordinatorState {
    versions: BTreeMap<String, VersionEntry>,
    worker_active: bool,
}

struct Shared {
    state: Mutex<CoordinatorState>,
    builder: Arc<dyn VersionBuilder>,
    layout: ArtifactLayout,
}

/// Handle to a build coordinator
///
/// Cloning is cheap and every clone talks to the same state.
#[derive(Clone)]
pub struct BuildCoordinator {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for BuildCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildCoordinator")
            .field("layout", &self.shared.layout)
            .finish_non_exhaustive()
    }
}

impl BuildCoordinator {
    /// Create a coordinator that builds with `builder` into `layout`
    pub fn new(builder: Arc<dyn VersionBuilder>, layout: ArtifactLayout) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(CoordinatorState::default()),
                builder,
                layout,
            }),
        }
    }

    /// Artifact layout used for existence checks and builds
    pub fn layout(&self) -> &ArtifactLayout {
        &self.shared.layout
    }

    /// Build every version in `versions` that is not already on disk
    ///
    /// Every version is validated first; one invalid id fails the whole call
    /// before anything is checked or queued. Versions whose artifact exists
    /// are skipped unless `force` is set. The
    /// remaining versions are queued and this call waits until each of them
    /// has reported. If any failed, the first failure in request order is
    /// returned.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn request_builds<S: AsRef<str>>(
        &self,
        versions: &[S],
        force: bool,
    ) -> Result<BuildReport, CoordinatorError> {
        for version in versions {
            let version = version.as_ref();
            validate_version(version).map_err(|e| CoordinatorError::InvalidVersion {
                version: version.to_string(),
                reason: e.to_string(),
            })?;
        }

        let mut report = BuildReport::default();
        let mut seen = BTreeSet::new();
        let mut queued = Vec::new();

        for version in versions {
            let version = version.as_ref();
            if !seen.insert(version) {
                continue;
            }

            let path = self.shared.layout.artifact_path(version);
            let exists = artifact_exists(&path)
                .await
                .map_err(|e| CoordinatorError::PreCheck {
                    version: version.to_string(),
                    path: path.clone(),
                    error: e.to_string(),
                })?;

            if exists && !force {
                tracing::debug!("{version} already built at {}, skipping", path.display());
                report.skipped.push(version.to_string());
                continue;
            }
            queued.push(version);
        }

        let handles: Vec<WaiterHandle> = queued.iter().map(|v| self.enqueue(v)).collect();
        let outcomes = join_all(handles.into_iter().map(WaiterHandle::wait)).await;

        let mut first_error = None;
        for (version, outcome) in queued.into_iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.resolved.push(version.to_string()),
                Err(source) => {
                    if first_error.is_none() {
                        first_error = Some(CoordinatorError::Build {
                            version: version.to_string(),
                            source,
                        });
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    /// Register interest in `version` and return a handle to its outcome
    ///
    /// Starts the worker if none is running.
    pub(crate) fn enqueue(&self, version: &str) -> WaiterHandle {
        let (handle, start_worker) = {
            let mut state = self.lock();
            let entry = state.versions.entry(version.to_string()).or_default();

            if entry.is_resolved() {
                if let Some(result) = &entry.last_result {
                    tracing::debug!("{version} already resolved, reusing cached outcome");
                    return WaiterHandle::resolved(version, result.clone());
                }
            }

            if entry.waiters.is_empty() {
                entry.context = Some(Span::current());
            }
            let (tx, rx) = oneshot::channel();
            entry.waiters.push(tx);
            tracing::debug!("{version} queued with {} waiter(s)", entry.waiters.len());

            let start_worker = !state.worker_active;
            if start_worker {
                state.worker_active = true;
            }
            (WaiterHandle::pending(version, rx), start_worker)
        };

        if start_worker {
            let coordinator = self.clone();
            tokio::spawn(async move { coordinator.run_worker().await });
        }
        handle
    }

    /// Consistent copy of every version entry, ordered by version
    pub fn snapshot(&self) -> Vec<VersionStatus> {
        let state = self.lock();
        state
            .versions
            .iter()
            .map(|(version, entry)| {
                let build_state = match (&entry.last_result, entry.waiters.is_empty()) {
                    (_, false) | (None, true) => VersionState::Pending,
                    (Some(Ok(())), true) => VersionState::Succeeded,
                    (Some(Err(e)), true) => VersionState::Failed(e.to_string()),
                };
                VersionStatus {
                    version: version.clone(),
                    waiters: entry.waiters.len(),
                    state: build_state,
                }
            })
            .collect()
    }

    /// Whether the build worker is currently running
    pub fn is_worker_active(&self) -> bool {
        self.lock().worker_active
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_worker(self) {
        tracing::debug!("Build worker started");
        let mut guard = WorkerGuard {
            coordinator: &self,
            retired: false,
        };
        while let Some((version, span)) = self.next_pending() {
            let outcome = self.build_version(&version).instrument(span).await;
            self.resolve(&version, outcome);
        }
        // next_pending cleared the flag under the lock
        guard.retired = true;
        tracing::debug!("Build worker idle, exiting");
    }

    /// Release the worker flag after the worker was dropped mid-run
    ///
    /// Everyone still waiting gets `BuildError::Abandoned`. Stored results are
    /// left untouched: a version that never finished has none, so the next
    /// request builds it again on a fresh worker.
    fn abandon_pending(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.worker_active = false;

        for (version, entry) in &mut state.versions {
            if entry.waiters.is_empty() {
                continue;
            }
            tracing::warn!(
                "Build worker stopped with {} waiter(s) on {version}",
                entry.waiters.len()
            );
            entry.context = None;
            for waiter in std::mem::take(&mut entry.waiters) {
                // Receiver gone means that caller stopped waiting
                let _ = waiter.send(Err(BuildError::Abandoned {
                    version: version.clone(),
                }));
            }
        }
    }

    /// Pick the version with the most waiters, or retire the worker
    fn next_pending(&self) -> Option<(String, Span)> {
        let mut state = self.lock();

        let selected = state
            .versions
            .iter()
            .filter(|(_, entry)| !entry.waiters.is_empty())
            .fold(None, |best: Option<(&String, usize)>, (version, entry)| {
                let count = entry.waiters.len();
                match best {
                    Some((_, top)) if top >= count => best,
                    _ => Some((version, count)),
                }
            })
            .map(|(version, _)| version.clone());

        let Some(version) = selected else {
            state.worker_active = false;
            return None;
        };

        let span = state
            .versions
            .get(&version)
            .and_then(|entry| entry.context.clone())
            .unwrap_or_else(Span::none);
        Some((version, span))
    }

    async fn build_version(&self, version: &str) -> BuildOutcome {
        let layout = &self.shared.layout;
        let artifact_path = layout.artifact_path(version);
        let request = BuildRequest {
            version,
            layout,
            artifact_path: &artifact_path,
        };

        tracing::info!("Building {version}");
        match AssertUnwindSafe(self.shared.builder.build(request))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => Err(BuildError::Panicked {
                version: version.to_string(),
                message: panic_message(panic.as_ref()),
            }),
        }
    }

    /// Deliver `outcome` to everyone waiting on `version` and cache it
    fn resolve(&self, version: &str, outcome: BuildOutcome) {
        let mut state = self.lock();
        let Some(entry) = state.versions.get_mut(version) else {
            return;
        };

        match &outcome {
            Ok(()) => tracing::info!("Built {version}"),
            Err(e) => tracing::warn!("Build of {version} failed: {e}"),
        }

        entry.context = None;
        for waiter in std::mem::take(&mut entry.waiters) {
            // Receiver gone means that caller stopped waiting
            let _ = waiter.send(outcome.clone());
        }
        entry.last_result = Some(outcome);
    }
}

/// Clears the worker flag if the worker future is dropped before retiring
///
/// Dropping happens when the runtime that spawned the worker shuts down.
struct WorkerGuard<'a> {
    coordinator: &'a BuildCoordinator,
    retired: bool,
}

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        if !self.retired {
            self.coordinator.abandon_pending();
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A caller's registration for one version's outcome
#[derive(Debug)]
pub struct WaiterHandle {
    version: String,
    state: WaiterState,
}

#[derive(Debug)]
enum WaiterState {
    Resolved(BuildOutcome),
    Pending(oneshot::Receiver<BuildOutcome>),
}

impl WaiterHandle {
    fn resolved(version: &str, outcome: BuildOutcome) -> Self {
        Self {
            version: version.to_string(),
            state: WaiterState::Resolved(outcome),
        }
    }

    fn pending(version: &str, rx: oneshot::Receiver<BuildOutcome>) -> Self {
        Self {
            version: version.to_string(),
            state: WaiterState::Pending(rx),
        }
    }

    /// Wait for the outcome
    pub async fn wait(self) -> BuildOutcome {
        let Self { version, state } = self;
        match state {
            WaiterState::Resolved(outcome) => outcome,
            WaiterState::Pending(rx) => rx
                .await
                .unwrap_or_else(|_| Err(BuildError::Abandoned { version })),
        }
    }
}
