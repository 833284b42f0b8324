// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Bulk operation executor.
//!
//! ```text
//! execute(repos, request, options)
//!   results = {id: pending}            --> progress (start)
//!   for batch in repos.chunks(max_concurrency):
//!     cancelled? --> stop, rest stay pending
//!     JoinSet: per repo select! {
//!         cancelled    --> error (aborted)
//!         sleep(t)     --> error (timeout)
//!         backend call --> completed | error
//!     }
//!     join whole batch                 --> progress (batch)
//!     abort_on_error && batch failed   --> cancel
//!   remove run from active runs
//! ```
//!
//! Per-repository failures never fail the run; they are recorded in the
//! result map. Only invalid requests are returned as errors.

pub mod types;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{FleetResult, GitError};
use crate::git::backend::GitBackend;
use crate::git::operation::{Operation, OperationParams, OperationRequest, param};
use crate::git::types::{Repository, SyncStatus};

pub use types::{
    ABORTED_MESSAGE, BulkOptions, BulkOutcome, DEFAULT_MAX_CONCURRENCY, DEFAULT_TIMEOUT,
    FailureKind, InvalidRepository, OperationResult, ProgressCallback, ProgressSnapshot,
    ResultMap, RunStats, RunStatus, Validation, timeout_message,
};

/// How one backend call settled.
enum Settled {
    Finished(Result<serde_json::Value, GitError>),
    TimedOut,
    Aborted,
}

/// Removes a run from the active set when the run ends or its future is dropped.
struct ActiveRun<'a> {
    runs: &'a Mutex<HashMap<String, CancellationToken>>,
    run_id: String,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.run_id);
    }
}

/// Runs one operation across many repositories in bounded batches.
pub struct BulkExecutor {
    backend: Arc<dyn GitBackend>,
    active_runs: Mutex<HashMap<String, CancellationToken>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for BulkExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkExecutor")
            .field("active_runs", &self.list_active_runs())
            .finish_non_exhaustive()
    }
}

impl BulkExecutor {
    #[must_use]
    pub fn new(backend: Arc<dyn GitBackend>) -> Self {
        Self {
            backend,
            active_runs: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    fn next_run_id(&self, operation: Operation) -> String {
        let started_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{operation}-{started_ms}-{seq}")
    }

    /// Runs `request` against every repository in `repositories`.
    ///
    /// Repositories with an id already seen earlier in the list are skipped.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::MissingParameter` if the request lacks a
    /// required parameter. Backend failures, timeouts and cancellation are
    /// recorded per repository instead.
    pub async fn execute(
        &self,
        repositories: &[Repository],
        request: &OperationRequest,
        options: &BulkOptions,
    ) -> FleetResult<BulkOutcome> {
        request.validate()?;

        let operation = request.operation;
        let run_id = self.next_run_id(operation);
        let token = options
            .cancel_token
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);

        self.active_runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(run_id.clone(), token.clone());
        let _active = ActiveRun {
            runs: &self.active_runs,
            run_id: run_id.clone(),
        };

        let mut seen = HashSet::new();
        let targets: Vec<&Repository> = repositories
            .iter()
            .filter(|repo| {
                let first = seen.insert(repo.id.as_str());
                if !first {
                    warn!(run_id = %run_id, repository = %repo.id, "Skipping duplicate repository id");
                }
                first
            })
            .collect();

        let mut results: ResultMap = targets
            .iter()
            .map(|repo| (repo.id.clone(), OperationResult::pending(repo)))
            .collect();

        let batch_size = options.max_concurrency.max(1);
        info!(
            run_id = %run_id,
            operation = %operation,
            repositories = targets.len(),
            batch_size,
            "Starting bulk run"
        );
        emit(options, &run_id, operation, &results);

        for (index, batch) in targets.chunks(batch_size).enumerate() {
            if token.is_cancelled() {
                info!(run_id = %run_id, batch = index + 1, "Bulk run cancelled, skipping remaining batches");
                break;
            }

            debug!(run_id = %run_id, batch = index + 1, size = batch.len(), "Starting batch");
            let batch_failed = self
                .run_batch(batch, request, options.timeout, &token, &mut results)
                .await;
            emit(options, &run_id, operation, &results);

            if batch_failed && options.abort_on_error && !token.is_cancelled() {
                warn!(run_id = %run_id, batch = index + 1, "Batch failed, aborting remaining batches");
                token.cancel();
            }
        }

        let outcome = BulkOutcome {
            cancelled: token.is_cancelled(),
            run_id,
            operation,
            results,
        };
        let stats = outcome.stats();
        info!(
            run_id = %outcome.run_id,
            completed = stats.completed,
            failed = stats.failed,
            pending = stats.pending,
            "Bulk run finished"
        );
        Ok(outcome)
    }

    /// Runs one batch to completion. Returns whether any member failed.
    async fn run_batch(
        &self,
        batch: &[&Repository],
        request: &OperationRequest,
        timeout: Duration,
        token: &CancellationToken,
        results: &mut ResultMap,
    ) -> bool {
        let mut set = JoinSet::new();
        let mut members = HashMap::new();

        for repo in batch {
            if let Some(result) = results.get_mut(&repo.id) {
                result.start();
            }
            let handle = set.spawn(settle(
                Arc::clone(&self.backend),
                request.operation,
                repo.path.clone(),
                request.params.clone(),
                timeout,
                token.clone(),
            ));
            members.insert(handle.id(), repo.id.clone());
        }

        let mut failed = false;
        while let Some(joined) = set.join_next_with_id().await {
            let (task_id, settled) = match joined {
                Ok((id, settled)) => (id, settled),
                Err(e) => {
                    let id = e.id();
                    (
                        id,
                        Settled::Finished(Err(GitError::CommandFailed {
                            command: request.operation.to_string(),
                            message: format!("task failed: {e}"),
                        })),
                    )
                }
            };
            let Some(repo_id) = members.remove(&task_id) else {
                continue;
            };
            let Some(result) = results.get_mut(&repo_id) else {
                continue;
            };

            match settled {
                Settled::Finished(Ok(value)) => {
                    debug!(repository = %repo_id, "Operation completed");
                    result.complete(value);
                }
                Settled::Finished(Err(e)) => {
                    warn!(repository = %repo_id, error = %e, "Operation failed");
                    result.fail(FailureKind::Backend, e.to_string());
                    failed = true;
                }
                Settled::TimedOut => {
                    warn!(repository = %repo_id, timeout = ?timeout, "Operation timed out");
                    result.fail(FailureKind::Timeout, timeout_message(timeout));
                    failed = true;
                }
                Settled::Aborted => {
                    debug!(repository = %repo_id, "Operation aborted");
                    result.fail(FailureKind::Aborted, ABORTED_MESSAGE);
                    failed = true;
                }
            }
        }
        failed
    }

    /// Cancels the run with `run_id`. Returns `false` if no such run is active.
    pub fn abort(&self, run_id: &str) -> bool {
        let runs = self
            .active_runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match runs.get(run_id) {
            Some(token) => {
                info!(run_id, "Aborting bulk run");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Ids of runs that have not finished yet.
    #[must_use]
    pub fn list_active_runs(&self) -> Vec<String> {
        let mut runs: Vec<String> = self
            .active_runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        runs.sort();
        runs
    }

    // --- Convenience operations ---

    async fn run_op(
        &self,
        repositories: &[Repository],
        operation: Operation,
        params: OperationParams,
        options: &BulkOptions,
    ) -> FleetResult<BulkOutcome> {
        self.execute(
            repositories,
            &OperationRequest::new(operation, params),
            options,
        )
        .await
    }

    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn pull(
        &self,
        repositories: &[Repository],
        remote: Option<&str>,
        branch: Option<&str>,
        options: &BulkOptions,
    ) -> FleetResult<BulkOutcome> {
        let params = OperationParams::new()
            .with_opt(param::REMOTE, remote)
            .with_opt(param::BRANCH, branch);
        self.run_op(repositories, Operation::Pull, params, options)
            .await
    }

    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn push(
        &self,
        repositories: &[Repository],
        remote: Option<&str>,
        branch: Option<&str>,
        force: bool,
        options: &BulkOptions,
    ) -> FleetResult<BulkOutcome> {
        let params = OperationParams::new()
            .with_opt(param::REMOTE, remote)
            .with_opt(param::BRANCH, branch)
            .with(param::FORCE, force);
        self.run_op(repositories, Operation::Push, params, options)
            .await
    }

    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn fetch(
        &self,
        repositories: &[Repository],
        remote: Option<&str>,
        prune: bool,
        options: &BulkOptions,
    ) -> FleetResult<BulkOutcome> {
        let params = OperationParams::new()
            .with_opt(param::REMOTE, remote)
            .with(param::PRUNE, prune);
        self.run_op(repositories, Operation::Fetch, params, options)
            .await
    }

    /// # Errors
    ///
    /// Returns `OperationError::MissingParameter` if `branch` is empty.
    pub async fn checkout(
        &self,
        repositories: &[Repository],
        branch: &str,
        options: &BulkOptions,
    ) -> FleetResult<BulkOutcome> {
        let params = OperationParams::new().with(param::BRANCH, branch);
        self.run_op(repositories, Operation::Checkout, params, options)
            .await
    }

    /// Creates `branch` (from `target` or HEAD), optionally switching to it.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::MissingParameter` if `branch` is empty.
    pub async fn create_branch(
        &self,
        repositories: &[Repository],
        branch: &str,
        target: Option<&str>,
        checkout: bool,
        options: &BulkOptions,
    ) -> FleetResult<BulkOutcome> {
        let params = OperationParams::new()
            .with(param::BRANCH, branch)
            .with_opt(param::TARGET, target)
            .with(param::CHECKOUT, checkout);
        self.run_op(repositories, Operation::CreateBranch, params, options)
            .await
    }

    /// # Errors
    ///
    /// Returns `OperationError::MissingParameter` if `branch` is empty.
    pub async fn delete_branch(
        &self,
        repositories: &[Repository],
        branch: &str,
        force: bool,
        options: &BulkOptions,
    ) -> FleetResult<BulkOutcome> {
        let params = OperationParams::new()
            .with(param::BRANCH, branch)
            .with(param::FORCE, force);
        self.run_op(repositories, Operation::DeleteBranch, params, options)
            .await
    }

    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn status(
        &self,
        repositories: &[Repository],
        options: &BulkOptions,
    ) -> FleetResult<BulkOutcome> {
        self.run_op(
            repositories,
            Operation::Status,
            OperationParams::new(),
            options,
        )
        .await
    }

    /// Pull followed by push.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn sync(
        &self,
        repositories: &[Repository],
        options: &BulkOptions,
    ) -> FleetResult<BulkOutcome> {
        self.run_op(repositories, Operation::Sync, OperationParams::new(), options)
            .await
    }

    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn stash(
        &self,
        repositories: &[Repository],
        message: Option<&str>,
        include_untracked: bool,
        options: &BulkOptions,
    ) -> FleetResult<BulkOutcome> {
        let params = OperationParams::new()
            .with_opt(param::MESSAGE, message)
            .with(param::INCLUDE_UNTRACKED, include_untracked);
        self.run_op(repositories, Operation::Stash, params, options)
            .await
    }

    /// Hard reset to `target`, defaulting to `HEAD`.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn reset_hard(
        &self,
        repositories: &[Repository],
        target: Option<&str>,
        options: &BulkOptions,
    ) -> FleetResult<BulkOutcome> {
        let params = OperationParams::new().with(param::TARGET, target.unwrap_or("HEAD"));
        self.run_op(repositories, Operation::ResetHard, params, options)
            .await
    }

    /// Removes untracked files, and untracked directories when `directories` is set.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn clean(
        &self,
        repositories: &[Repository],
        directories: bool,
        options: &BulkOptions,
    ) -> FleetResult<BulkOutcome> {
        let params = OperationParams::new().with(param::DIRECTORIES, directories);
        self.run_op(repositories, Operation::Clean, params, options)
            .await
    }
}

/// Races one backend call against the timeout and the run's cancellation.
async fn settle(
    backend: Arc<dyn GitBackend>,
    operation: Operation,
    path: PathBuf,
    params: OperationParams,
    timeout: Duration,
    token: CancellationToken,
) -> Settled {
    tokio::select! {
        biased;
        () = token.cancelled() => Settled::Aborted,
        () = tokio::time::sleep(timeout) => Settled::TimedOut,
        result = backend.invoke(operation, &path, &params) => Settled::Finished(result),
    }
}

fn emit(options: &BulkOptions, run_id: &str, operation: Operation, results: &ResultMap) {
    if let Some(progress) = &options.progress {
        progress(&ProgressSnapshot::new(run_id, operation, results));
    }
}

/// Splits `repositories` into runnable and rejected ones.
///
/// A repository is rejected if its id or path is empty, its last sync
/// ended in error, or its id repeats an earlier entry.
#[must_use]
pub fn validate_repositories(repositories: &[Repository]) -> Validation {
    let mut validation = Validation::default();
    let mut seen = HashSet::new();

    for repo in repositories {
        let reason = if repo.id.trim().is_empty() {
            Some("repository id is empty")
        } else if repo.path.as_os_str().is_empty() {
            Some("repository path is empty")
        } else if repo.sync_status == SyncStatus::Error {
            Some("repository is in error state")
        } else if !seen.insert(repo.id.as_str()) {
            Some("duplicate repository id")
        } else {
            None
        };

        match reason {
            Some(reason) => validation.invalid.push(InvalidRepository {
                repository: repo.clone(),
                reason: reason.to_string(),
            }),
            None => validation.valid.push(repo.clone()),
        }
    }
    validation
}

/// Aggregate counts and timings of `results`.
#[must_use]
pub fn compute_stats(results: &ResultMap) -> RunStats {
    RunStats::from_results(results)
}
