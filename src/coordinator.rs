//! Coalescing rebuild coordinator.
//!
//! Turns a stream of "something changed" notifications into a minimal sequence
//! of build-then-copy cycles. At most one cycle runs at a time; a change that
//! arrives while a cycle is running is never dropped, it causes exactly one
//! more pass once the current one is done. Coalesced requests are last-write-wins.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::copier::CopySummary;
use crate::error::Result;

/// What to rebuild and where to copy it, captured when the change is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildRequest {
    /// Directory holding the library's package.json.
    pub package_root: PathBuf,
    /// Destination directory (already home-expanded and absolute).
    pub destination: PathBuf,
    /// Build command, or `None` to copy without building.
    pub build_command: Option<String>,
}

/// The two flags that make up the coordinator's state.
///
/// `needs_another_build` is only ever true while `is_running` is true or about
/// to become true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorState {
    pub is_running: bool,
    pub needs_another_build: bool,
}

/// What one call to the cycle driver did before going idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Build runs, including reruns for changes that arrived mid-build.
    pub builds: usize,
    /// Copy passes that completed.
    pub copies: usize,
    /// Totals from the last completed copy pass.
    pub copied: CopySummary,
}

/// The two halves of a cycle.
pub trait CycleSteps: Send + Sync + 'static {
    fn build(&self, request: &RebuildRequest) -> impl Future<Output = Result<()>> + Send;

    fn copy(&self, request: &RebuildRequest) -> impl Future<Output = Result<CopySummary>> + Send;
}

struct Inner {
    state: CoordinatorState,
    latest: Option<RebuildRequest>,
}

pub struct RebuildCoordinator<S> {
    steps: S,
    inner: Mutex<Inner>,
}

impl<S: CycleSteps> RebuildCoordinator<S> {
    pub fn new(steps: S) -> Arc<Self> {
        Arc::new(Self {
            steps,
            inner: Mutex::new(Inner {
                state: CoordinatorState::default(),
                latest: None,
            }),
        })
    }

    pub fn state(&self) -> CoordinatorState {
        self.lock().state
    }

    /// Report a qualifying change.
    ///
    /// Marks a rebuild as needed. If no cycle is running one is spawned and its
    /// handle returned; otherwise the running cycle picks the change up and
    /// `None` is returned.
    pub fn on_file_changed(
        self: &Arc<Self>,
        request: RebuildRequest,
    ) -> Option<JoinHandle<Result<CycleReport>>> {
        if !self.mark_pending(request) {
            debug!("cycle already running, change queued");
            return None;
        }

        let this = Arc::clone(self);
        Some(tokio::spawn(async move { this.drive().await }))
    }

    /// Run a cycle for `request` on the current task and wait for it.
    ///
    /// Returns `Ok(None)` if another cycle was already running; that cycle will
    /// include this request.
    pub async fn run_cycle(&self, request: RebuildRequest) -> Result<Option<CycleReport>> {
        if !self.mark_pending(request) {
            return Ok(None);
        }
        self.drive().await.map(Some)
    }

    /// Record the request and set the pending flag. Returns true if the caller
    /// now owns the running cycle.
    fn mark_pending(&self, request: RebuildRequest) -> bool {
        let mut inner = self.lock();
        inner.latest = Some(request);
        inner.state.needs_another_build = true;
        if inner.state.is_running {
            return false;
        }
        inner.state.is_running = true;
        true
    }

    async fn drive(&self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        loop {
            let request = match self.build_until_settled(&mut report).await {
                Ok(Some(request)) => request,
                Ok(None) => return Ok(report),
                Err(err) => {
                    error!("Build failed: {err}");
                    if self.finish_or_restart() {
                        continue;
                    }
                    return Err(err);
                }
            };

            match self.steps.copy(&request).await {
                Ok(copied) => {
                    report.copies += 1;
                    report.copied = copied;
                    info!(
                        "Copied {} file(s) into {}",
                        copied.files,
                        request.destination.display()
                    );
                }
                Err(err) => {
                    error!("Copy failed: {err}");
                    if self.finish_or_restart() {
                        continue;
                    }
                    return Err(err);
                }
            }

            if !self.finish_or_restart() {
                return Ok(report);
            }
        }
    }

    /// Build repeatedly until a build finishes with no new change pending.
    /// Returns the request the last build ran with.
    async fn build_until_settled(
        &self,
        report: &mut CycleReport,
    ) -> Result<Option<RebuildRequest>> {
        loop {
            let request = {
                let mut inner = self.lock();
                inner.state.needs_another_build = false;
                match inner.latest.clone() {
                    Some(request) => request,
                    None => {
                        inner.state.is_running = false;
                        return Ok(None);
                    }
                }
            };

            report.builds += 1;
            self.steps.build(&request).await?;

            let pending = self.lock().state.needs_another_build;
            if !pending {
                return Ok(Some(request));
            }
            debug!("changes arrived during build, rebuilding");
        }
    }

    /// Go idle unless a change arrived meanwhile. Returns true if the caller
    /// must run another cycle. Checked and cleared under one lock so a change
    /// reported concurrently is either seen here or starts its own cycle.
    fn finish_or_restart(&self) -> bool {
        let mut inner = self.lock();
        if inner.state.needs_another_build {
            info!("Files changed during the last cycle, running again");
            return true;
        }
        inner.state.is_running = false;
        false
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
