// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Orchestration of the bulk executor and the repository state cache.
//!
//! ```text
//! Fleet::run(repos, request)
//!   validate_repositories --> invalid (reported, skipped)
//!   BulkExecutor::execute(valid)
//!   request mutating? --> invalidate_repository(attempted ids)
//!
//! Fleet::status(repo)        (read-through)
//!   cache hit  --> value
//!   cache miss --> backend.invoke --> decode --> cache.set --> value
//! ```

#[cfg(test)]
mod tests;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::bulk::{BulkExecutor, BulkOptions, BulkOutcome, InvalidRepository, validate_repositories};
use crate::cache::RepositoryStateCache;
use crate::error::{FleetResult, GitError};
use crate::git::backend::GitBackend;
use crate::git::operation::{Operation, OperationParams, OperationRequest, param};
use crate::git::types::{BranchInfo, CommitInfo, RepoStatus, Repository, RepositoryInfo};

/// Result of [`Fleet::run`].
#[derive(Debug, Clone)]
pub struct FleetRun {
    /// Executor outcome for the valid repositories.
    pub outcome: BulkOutcome,
    /// Repositories rejected before execution.
    pub invalid: Vec<InvalidRepository>,
    /// Cache entries dropped after a mutating operation.
    pub invalidated: usize,
}

/// Executor, cache and backend wired together.
pub struct Fleet {
    backend: Arc<dyn GitBackend>,
    executor: BulkExecutor,
    cache: Arc<RepositoryStateCache>,
}

impl std::fmt::Debug for Fleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fleet")
            .field("executor", &self.executor)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Fleet {
    #[must_use]
    pub fn new(backend: Arc<dyn GitBackend>, cache: Arc<RepositoryStateCache>) -> Self {
        Self {
            executor: BulkExecutor::new(Arc::clone(&backend)),
            backend,
            cache,
        }
    }

    #[must_use]
    pub const fn executor(&self) -> &BulkExecutor {
        &self.executor
    }

    #[must_use]
    pub const fn cache(&self) -> &Arc<RepositoryStateCache> {
        &self.cache
    }

    /// Validates `repositories`, runs `request` on the valid ones and drops
    /// cached state of every attempted repository if the operation mutates.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is missing a required parameter.
    pub async fn run(
        &self,
        repositories: &[Repository],
        request: &OperationRequest,
        options: &BulkOptions,
    ) -> FleetResult<FleetRun> {
        let validation = validate_repositories(repositories);
        for rejected in &validation.invalid {
            info!(
                repository = %rejected.repository.id,
                reason = %rejected.reason,
                "Skipping invalid repository"
            );
        }

        let outcome = self
            .executor
            .execute(&validation.valid, request, options)
            .await?;

        let invalidated = if request.operation.is_mutating() {
            outcome
                .attempted()
                .map(|id| self.cache.invalidate_repository(id))
                .sum::<usize>()
        } else {
            0
        };
        debug!(run_id = %outcome.run_id, invalidated, "Run finished");

        Ok(FleetRun {
            outcome,
            invalid: validation.invalid,
            invalidated,
        })
    }

    /// Warms the cache for `repositories` in groups.
    pub async fn warm(&self, repositories: &[Repository]) -> usize {
        self.cache.preload(self.backend.as_ref(), repositories).await
    }

    /// Working tree status, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns the backend error on a miss that cannot be fetched.
    pub async fn status(&self, repo: &Repository) -> FleetResult<RepoStatus> {
        if let Some(status) = self.cache.get_status(&repo.id) {
            return Ok(status);
        }
        let status: RepoStatus = self
            .fetch(Operation::Status, repo, &OperationParams::new())
            .await?;
        self.cache.set_status(&repo.id, &status);
        Ok(status)
    }

    /// Commit log of `branch` (HEAD when `None`), served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns the backend error on a miss that cannot be fetched.
    pub async fn commits(
        &self,
        repo: &Repository,
        branch: Option<&str>,
        limit: Option<u64>,
    ) -> FleetResult<Vec<CommitInfo>> {
        if let Some(commits) = self.cache.get_commits(&repo.id, branch, limit) {
            return Ok(commits);
        }
        let mut params = OperationParams::new().with_opt(param::BRANCH, branch);
        if let Some(limit) = limit {
            params = params.with(param::LIMIT, limit);
        }
        let commits: Vec<CommitInfo> = self.fetch(Operation::Commits, repo, &params).await?;
        self.cache.set_commits(&repo.id, branch, limit, &commits);
        Ok(commits)
    }

    /// Local branches, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns the backend error on a miss that cannot be fetched.
    pub async fn branches(&self, repo: &Repository) -> FleetResult<Vec<BranchInfo>> {
        if let Some(branches) = self.cache.get_branches(&repo.id) {
            return Ok(branches);
        }
        let branches: Vec<BranchInfo> = self
            .fetch(Operation::Branches, repo, &OperationParams::new())
            .await?;
        self.cache.set_branches(&repo.id, &branches);
        Ok(branches)
    }

    /// Repository summary, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns the backend error on a miss that cannot be fetched.
    pub async fn repository_info(&self, repo: &Repository) -> FleetResult<RepositoryInfo> {
        if let Some(info) = self.cache.get_repository_info(&repo.id) {
            return Ok(info);
        }
        let info: RepositoryInfo = self
            .fetch(Operation::RepositoryInfo, repo, &OperationParams::new())
            .await?;
        self.cache.set_repository_info(&repo.id, &info);
        Ok(info)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: Operation,
        repo: &Repository,
        params: &OperationParams,
    ) -> FleetResult<T> {
        debug!(repository = %repo.id, operation = %operation, "Cache miss, querying backend");
        let value = self.backend.invoke(operation, &repo.path, params).await?;
        serde_json::from_value(value).map_err(|e| {
            GitError::InvalidOutput {
                command: operation.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }
}
