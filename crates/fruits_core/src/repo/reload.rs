//! Commit-and-reload scheduling shared by every repository.
//!
//! # Responsibility
//! - Stage a write, clear the caller's collections, then run commit and
//!   re-fetch as one spawned task.
//! - Publish progress through [`LoadState`].
//!
//! # Invariants
//! - Nothing is cleared or staged when the command cannot be scheduled.
//! - The reload only starts after the commit resolved successfully.
//! - A scheduled task always runs to completion; there is no timer and no
//!   cancellation.
//! - `Ready` is only published once no commit-and-reload is in flight, and
//!   synchronous loads are refused until then.

use crate::db::DbResult;
use crate::repo::{RepoError, RepoResult};
use crate::store::{SqliteStore, StoreManager};
use log::{error, info};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Progress of a repository's in-memory collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing loaded yet.
    Idle,
    /// Collections were cleared; a commit-and-reload is in flight.
    Reloading,
    /// Collections reflect the last successful fetch.
    Ready,
    /// Last load or commit failed; collections may be empty.
    Failed(String),
}

/// Completion handle for one scheduled commit-and-reload.
#[must_use = "dropping the handle does not cancel the reload, but hides its outcome"]
#[derive(Debug)]
pub struct ReloadHandle {
    operation: &'static str,
    task: JoinHandle<RepoResult<()>>,
}

impl ReloadHandle {
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the commit and the reload that follows it.
    pub async fn wait(self) -> RepoResult<()> {
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(RepoError::TaskFailed(err.to_string())),
        }
    }
}

/// Store handle plus the load state of one repository.
#[derive(Clone)]
pub(crate) struct Reloader {
    manager: StoreManager,
    state: Arc<watch::Sender<LoadState>>,
    in_flight: Arc<AtomicUsize>,
}

impl Reloader {
    pub(crate) fn new(manager: StoreManager) -> Self {
        let (state, _) = watch::channel(LoadState::Idle);
        Self {
            manager,
            state: Arc::new(state),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn manager(&self) -> &StoreManager {
        &self.manager
    }

    pub(crate) fn load_state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    pub(crate) fn set_state(&self, state: LoadState) {
        self.state.send_replace(state);
    }

    /// Number of scheduled commit-and-reload tasks that have not finished.
    pub(crate) fn pending_reloads(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Runs `load` against the store synchronously and records the outcome.
    ///
    /// Refused with `ReloadPending` while a commit-and-reload is in flight.
    pub(crate) fn load_now<T>(
        &self,
        operation: &'static str,
        load: impl FnOnce(&mut SqliteStore) -> DbResult<T>,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        let schema = self.manager.schema();

        let in_flight = self.pending_reloads();
        if in_flight > 0 {
            error!(
                "event=repo_load module=repo status=error operation={operation} store={schema} error_code=reload_pending in_flight={in_flight}"
            );
            return Err(RepoError::ReloadPending {
                operation,
                in_flight,
            });
        }

        match self.manager.with_store(load).and_then(|result| result) {
            Ok(value) => {
                self.set_state(LoadState::Ready);
                info!(
                    "event=repo_load module=repo status=ok operation={operation} store={schema} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                error!(
                    "event=repo_load module=repo status=error operation={operation} store={schema} duration_ms={} error_code=fetch_failed error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                self.set_state(LoadState::Failed(err.to_string()));
                Err(RepoError::Fetch(err))
            }
        }
    }

    /// Stages a write and schedules the commit-and-reload sequence.
    ///
    /// `stage` runs under the store lock before anything is cleared; `clear`
    /// empties the caller's collections; `reload` runs on a blocking worker
    /// once the commit succeeded.
    pub(crate) fn commit_and_reload<S, C, R>(
        &self,
        operation: &'static str,
        stage: S,
        clear: C,
        reload: R,
    ) -> RepoResult<ReloadHandle>
    where
        S: FnOnce(&mut SqliteStore) -> DbResult<()>,
        C: FnOnce(),
        R: FnOnce(&mut SqliteStore) -> DbResult<()> + Send + 'static,
    {
        let schema = self.manager.schema();
        let runtime = Handle::try_current().map_err(|_| {
            error!(
                "event=commit_reload module=repo status=error operation={operation} store={schema} error_code=no_runtime"
            );
            RepoError::NoRuntime
        })?;

        if let Err(err) = self.manager.with_store(stage).and_then(|result| result) {
            error!(
                "event=commit_reload module=repo status=error operation={operation} store={schema} error_code=staging_failed error={err}"
            );
            return Err(RepoError::Staging(err));
        }

        clear();
        self.set_state(LoadState::Reloading);
        info!("event=commit_reload module=repo status=start operation={operation} store={schema}");

        let manager = self.manager.clone();
        let state = Arc::clone(&self.state);
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.fetch_add(1, Ordering::AcqRel);
        let task = runtime.spawn(async move {
            let started_at = Instant::now();
            let outcome = commit_then_reload(&manager, reload).await;
            let remaining = in_flight.fetch_sub(1, Ordering::AcqRel).saturating_sub(1);
            let duration_ms = started_at.elapsed().as_millis();

            match &outcome {
                Ok(writes) => {
                    // Only the last in-flight task publishes Ready.
                    if remaining == 0 {
                        state.send_replace(LoadState::Ready);
                    }
                    info!(
                        "event=commit_reload module=repo status=ok operation={operation} store={schema} writes={writes} remaining={remaining} duration_ms={duration_ms}"
                    );
                }
                Err(err) => {
                    state.send_replace(LoadState::Failed(err.to_string()));
                    error!(
                        "event=commit_reload module=repo status=error operation={operation} store={schema} remaining={remaining} duration_ms={duration_ms} error_code={} error={err}",
                        err.code()
                    );
                }
            }
            outcome.map(|_| ())
        });

        Ok(ReloadHandle { operation, task })
    }
}

/// Commits staged writes, then runs `reload` once the commit resolved.
async fn commit_then_reload<R>(manager: &StoreManager, reload: R) -> RepoResult<usize>
where
    R: FnOnce(&mut SqliteStore) -> DbResult<()> + Send + 'static,
{
    let writes = manager.commit().await.map_err(RepoError::Persistence)?;
    manager.run_blocking(reload).await.map_err(RepoError::Fetch)?;
    Ok(writes)
}
