// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Bulk run options, per-repository results and progress snapshots.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::git::operation::Operation;
use crate::git::types::Repository;

/// Default number of repositories processed concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// Default per-repository timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Receives a snapshot at run start and after every batch.
pub type ProgressCallback = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

/// Options of one bulk run.
#[derive(Clone, Builder)]
pub struct BulkOptions {
    /// Batch size
    #[builder(setters(name = with_max_concurrency), default = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,
    /// Per-repository timeout
    #[builder(setters(name = with_timeout), default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,
    /// Cancel the remaining batches after a batch with any error
    #[builder(setters(name = with_abort_on_error), default = false)]
    pub abort_on_error: bool,
    #[builder(setters(name = with_progress))]
    pub progress: Option<ProgressCallback>,
    /// Parent token; cancelling it aborts the run
    #[builder(setters(name = with_cancel_token))]
    pub cancel_token: Option<CancellationToken>,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for BulkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkOptions")
            .field("max_concurrency", &self.max_concurrency)
            .field("timeout", &self.timeout)
            .field("abort_on_error", &self.abort_on_error)
            .field("progress", &self.progress.is_some())
            .field("cancel_token", &self.cancel_token.is_some())
            .finish()
    }
}

/// Lifecycle state of one repository within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl RunStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a repository ended in [`RunStatus::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The backend reported an error (or its task panicked)
    Backend,
    /// The call did not settle within the timeout
    Timeout,
    /// The run was cancelled while the call was in flight
    Aborted,
}

/// Message recorded for an aborted call.
pub const ABORTED_MESSAGE: &str = "operation aborted";

/// Message recorded for a timed-out call.
#[must_use]
pub fn timeout_message(timeout: Duration) -> String {
    format!("operation timed out after {timeout:?}")
}

/// Outcome of the operation for one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub repository_id: String,
    pub repository_name: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    pub started_at: Option<SystemTime>,
    pub completed_at: Option<SystemTime>,
    pub duration: Option<Duration>,
}

impl OperationResult {
    #[must_use]
    pub fn pending(repository: &Repository) -> Self {
        Self {
            repository_id: repository.id.clone(),
            repository_name: repository.name.clone(),
            status: RunStatus::Pending,
            result: None,
            error: None,
            failure: None,
            started_at: None,
            completed_at: None,
            duration: None,
        }
    }

    pub(crate) fn start(&mut self) {
        if self.status == RunStatus::Pending {
            self.status = RunStatus::Running;
            self.started_at = Some(SystemTime::now());
        }
    }

    fn finish(&mut self, status: RunStatus) {
        let now = SystemTime::now();
        self.status = status;
        self.completed_at = Some(now);
        self.duration = self
            .started_at
            .and_then(|started| now.duration_since(started).ok());
    }

    pub(crate) fn complete(&mut self, value: Value) {
        if self.status.is_terminal() {
            return;
        }
        self.result = Some(value);
        self.finish(RunStatus::Completed);
    }

    pub(crate) fn fail(&mut self, kind: FailureKind, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.error = Some(message.into());
        self.failure = Some(kind);
        self.finish(RunStatus::Error);
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.status, RunStatus::Error)
    }
}

/// Per-repository results keyed by repository id.
pub type ResultMap = BTreeMap<String, OperationResult>;

/// Progress of a run, emitted at start and after every batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub run_id: String,
    pub operation_name: String,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub results: ResultMap,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn new(run_id: &str, operation: Operation, results: &ResultMap) -> Self {
        let stats = RunStats::from_results(results);
        Self {
            run_id: run_id.to_string(),
            operation_name: operation.as_str().to_string(),
            total: stats.total,
            completed: stats.completed,
            failed: stats.failed,
            pending: stats.total - stats.completed - stats.failed,
            results: results.clone(),
        }
    }

    /// Repositories that reached a terminal state.
    #[must_use]
    pub const fn settled(&self) -> usize {
        self.completed + self.failed
    }
}

/// Aggregate counts and timings of a result map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub running: usize,
    pub total_duration: Duration,
    /// Mean duration of settled results that recorded one
    pub average_duration: Option<Duration>,
}

impl RunStats {
    #[must_use]
    pub fn from_results(results: &ResultMap) -> Self {
        let mut stats = Self {
            total: results.len(),
            ..Self::default()
        };
        let mut timed = 0u32;

        for result in results.values() {
            match result.status {
                RunStatus::Pending => stats.pending += 1,
                RunStatus::Running => stats.running += 1,
                RunStatus::Completed => stats.completed += 1,
                RunStatus::Error => stats.failed += 1,
            }
            if let Some(duration) = result.duration {
                stats.total_duration += duration;
                timed += 1;
            }
        }

        if timed > 0 {
            stats.average_duration = Some(stats.total_duration / timed);
        }
        stats
    }
}

/// Final state of a bulk run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub run_id: String,
    pub operation: Operation,
    /// Whether the run was cancelled by `abort`, the parent token or `abort_on_error`
    pub cancelled: bool,
    pub results: ResultMap,
}

impl BulkOutcome {
    #[must_use]
    pub fn stats(&self) -> RunStats {
        RunStats::from_results(&self.results)
    }

    /// Ids of repositories whose operation was attempted (started).
    pub fn attempted(&self) -> impl Iterator<Item = &str> {
        self.results
            .values()
            .filter(|r| r.status != RunStatus::Pending)
            .map(|r| r.repository_id.as_str())
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.results.values().any(OperationResult::is_error)
    }
}

/// A repository rejected by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidRepository {
    pub repository: Repository,
    pub reason: String,
}

/// Repositories split into runnable and rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub valid: Vec<Repository>,
    pub invalid: Vec<InvalidRepository>,
}

impl Validation {
    #[must_use]
    pub const fn is_all_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}
