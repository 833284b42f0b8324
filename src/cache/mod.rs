// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository state cache.
//!
//! ```text
//!   typed get/set (info, commits, branches, status, files, diff, search, remote)
//!                        |
//!                   keys.rs ("category:seg:seg")
//!                        |
//!          Mutex<EntryStore> + PolicyTable (ttl, max entries)
//!                        |
//!      +-----------------+------------------+
//!      v                 v                  v
//!  sweep loop       persist loop       warm_up / preload
//!  (expired)      (SnapshotStore)      (GitBackend queries)
//! ```
//!
//! A value that fails to deserialize into the requested type is treated as
//! a miss. Persistence failures are logged; the in-memory cache keeps
//! working without them.

pub mod clock;
pub mod keys;
pub mod persist;
pub mod policy;
pub mod store;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bon::Builder;
use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::FleetResult;
use crate::git::backend::GitBackend;
use crate::git::operation::{Operation, OperationParams};
use crate::git::types::{
    BranchInfo, CommitInfo, FileChange, FileDiff, RemoteStatus, RepoStatus, Repository,
    RepositoryInfo, SearchHit,
};

pub use clock::{Clock, ManualClock, SystemClock};
pub use persist::{FileSnapshotStore, MemorySnapshotStore, Snapshot, SnapshotStore};
pub use policy::{Category, CategoryPolicy, PolicyTable};
pub use store::EntryStore;

/// Runtime settings of a [`RepositoryStateCache`].
#[derive(Debug, Clone, Builder)]
pub struct CacheOptions {
    /// Global memory budget in bytes
    #[builder(setters(name = with_memory_budget), default = 100 * 1024 * 1024)]
    pub memory_budget: usize,
    /// Period of the expired-entry sweep
    #[builder(setters(name = with_sweep_interval), default = Duration::from_secs(60))]
    pub sweep_interval: Duration,
    /// Period of background persistence
    #[builder(setters(name = with_persist_interval), default = Duration::from_secs(300))]
    pub persist_interval: Duration,
    /// Repositories warmed concurrently by `preload`
    #[builder(setters(name = with_warmup_group_size), default = 5)]
    pub warmup_group_size: usize,
    /// Pause between `preload` groups
    #[builder(setters(name = with_warmup_pause), default = Duration::from_millis(100))]
    pub warmup_pause: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Cache counters and occupancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub memory_bytes: usize,
    pub memory_budget: usize,
    pub hits: u64,
    pub misses: u64,
    /// Hits over lookups, 0.0 before the first lookup
    pub hit_rate: f64,
    pub categories: BTreeMap<Category, usize>,
}

/// Typed cache of derived git state.
pub struct RepositoryStateCache {
    store: Mutex<EntryStore>,
    policies: PolicyTable,
    options: CacheOptions,
    persistence: Option<Arc<dyn SnapshotStore>>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for RepositoryStateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryStateCache")
            .field("options", &self.options)
            .field("policies", &self.policies)
            .field("persistent", &self.persistence.is_some())
            .finish_non_exhaustive()
    }
}

impl RepositoryStateCache {
    #[must_use]
    pub fn new(options: CacheOptions, policies: PolicyTable) -> Self {
        Self {
            store: Mutex::new(EntryStore::new(options.memory_budget)),
            policies,
            options,
            persistence: None,
            clock: Arc::new(SystemClock),
            shutdown: CancellationToken::new(),
            background: Mutex::new(Vec::new()),
        }
    }

    /// Persists snapshots to `store`.
    #[must_use]
    pub fn with_persistence(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.persistence = Some(store);
        self
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    #[must_use]
    pub const fn options(&self) -> &CacheOptions {
        &self.options
    }

    fn lock(&self) -> MutexGuard<'_, EntryStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = self.clock.now_ms();
        let mut store = self.lock();
        let value = store.get(key, now)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                store.reclassify_hit_as_miss();
                debug!(key, error = %e, "Cached value has unexpected shape");
                None
            }
        }
    }

    fn set_as<T: Serialize + ?Sized>(&self, category: Category, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.set_raw(category, key, value);
            }
            Err(e) => warn!(key, error = %e, "Failed to encode cache value"),
        }
    }

    /// Stores `value` and trims its category. Returns `false` when the store
    /// rejected the value.
    fn set_raw(&self, category: Category, key: &str, value: Value) -> bool {
        let policy = self.policies.get(category);
        let now = self.clock.now_ms();
        let mut store = self.lock();
        let stored = store.set(key, value, policy.ttl_ms(), now);
        if stored {
            store.enforce_category_limit(category, policy.max_entries);
        }
        stored
    }

    // --- Typed accessors ---

    #[must_use]
    pub fn get_repository_info(&self, repo: &str) -> Option<RepositoryInfo> {
        self.get_as(&keys::repository(repo))
    }

    pub fn set_repository_info(&self, repo: &str, info: &RepositoryInfo) {
        self.set_as(Category::Repository, &keys::repository(repo), info);
    }

    #[must_use]
    pub fn get_commits(
        &self,
        repo: &str,
        branch: Option<&str>,
        limit: Option<u64>,
    ) -> Option<Vec<CommitInfo>> {
        self.get_as(&keys::commits(repo, branch, limit))
    }

    pub fn set_commits(
        &self,
        repo: &str,
        branch: Option<&str>,
        limit: Option<u64>,
        commits: &[CommitInfo],
    ) {
        self.set_as(
            Category::Commits,
            &keys::commits(repo, branch, limit),
            commits,
        );
    }

    #[must_use]
    pub fn get_branches(&self, repo: &str) -> Option<Vec<BranchInfo>> {
        self.get_as(&keys::branches(repo))
    }

    pub fn set_branches(&self, repo: &str, branches: &[BranchInfo]) {
        self.set_as(Category::Branches, &keys::branches(repo), branches);
    }

    #[must_use]
    pub fn get_status(&self, repo: &str) -> Option<RepoStatus> {
        self.get_as(&keys::status(repo))
    }

    pub fn set_status(&self, repo: &str, status: &RepoStatus) {
        self.set_as(Category::Status, &keys::status(repo), status);
    }

    /// File changes of `commit`, or of the working tree when `None`.
    #[must_use]
    pub fn get_file_changes(&self, repo: &str, commit: Option<&str>) -> Option<Vec<FileChange>> {
        self.get_as(&keys::files(repo, commit))
    }

    pub fn set_file_changes(&self, repo: &str, commit: Option<&str>, changes: &[FileChange]) {
        self.set_as(Category::Files, &keys::files(repo, commit), changes);
    }

    #[must_use]
    pub fn get_diff(&self, repo: &str, file: &str, commit: Option<&str>) -> Option<FileDiff> {
        self.get_as(&keys::diff(repo, file, commit))
    }

    pub fn set_diff(&self, repo: &str, file: &str, commit: Option<&str>, diff: &FileDiff) {
        self.set_as(Category::Diff, &keys::diff(repo, file, commit), diff);
    }

    /// Search results, scoped to one repository or global when `repo` is `None`.
    #[must_use]
    pub fn get_search_results(&self, query: &str, repo: Option<&str>) -> Option<Vec<SearchHit>> {
        self.get_as(&keys::search(query, repo))
    }

    pub fn set_search_results(&self, query: &str, repo: Option<&str>, hits: &[SearchHit]) {
        self.set_as(Category::Search, &keys::search(query, repo), hits);
    }

    #[must_use]
    pub fn get_remote_status(&self, repo: &str, remote: &str) -> Option<RemoteStatus> {
        self.get_as(&keys::remote(repo, remote))
    }

    pub fn set_remote_status(&self, repo: &str, remote: &str, status: &RemoteStatus) {
        self.set_as(Category::Remote, &keys::remote(repo, remote), status);
    }

    // --- Invalidation ---

    /// Removes every entry owned by `repo`, across all categories.
    pub fn invalidate_repository(&self, repo: &str) -> usize {
        let removed = self
            .lock()
            .delete_matching(|key| keys::belongs_to_repository(key, repo));
        debug!(repository = repo, removed, "Invalidated repository cache");
        removed
    }

    /// Removes every entry of `category`.
    pub fn invalidate_category(&self, category: Category) -> usize {
        let removed = self
            .lock()
            .delete_matching(|key| keys::in_category(key, category));
        debug!(category = %category, removed, "Invalidated cache category");
        removed
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Removes expired entries now.
    pub fn sweep(&self) -> usize {
        let removed = self.lock().sweep_expired(self.clock.now_ms());
        if removed > 0 {
            debug!(removed, "Swept expired cache entries");
        }
        removed
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let store = self.lock();
        let lookups = store.hits() + store.misses();
        #[expect(clippy::cast_precision_loss, reason = "ratio of counters")]
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            store.hits() as f64 / lookups as f64
        };
        CacheStats {
            entries: store.len(),
            memory_bytes: store.memory_bytes(),
            memory_budget: store.budget_bytes(),
            hits: store.hits(),
            misses: store.misses(),
            hit_rate,
            categories: store.category_counts(),
        }
    }

    // --- Persistence ---

    /// Loads the persisted snapshot, if any. Returns the number of entries loaded.
    ///
    /// Restored categories are trimmed to the current `max_entries`.
    /// Unreadable or corrupt snapshots are logged and leave the cache empty.
    pub fn load_persisted(&self) -> usize {
        let Some(persistence) = &self.persistence else {
            return 0;
        };

        let raw = match persistence.load() {
            Ok(Some(raw)) => raw,
            Ok(None) => return 0,
            Err(e) => {
                warn!(error = %e, "Failed to load cache snapshot, starting empty");
                return 0;
            }
        };

        match Snapshot::decode(&raw) {
            Ok(snapshot) => {
                let mut store = self.lock();
                let restored = store.restore(snapshot.entries, self.clock.now_ms());
                // Limits may have been lowered since the snapshot was written.
                let trimmed: usize = self
                    .policies
                    .iter()
                    .map(|(category, policy)| {
                        store.enforce_category_limit(category, policy.max_entries)
                    })
                    .sum();
                let loaded = restored.saturating_sub(trimmed);
                info!(loaded, trimmed, "Loaded persisted cache");
                loaded
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable cache snapshot");
                0
            }
        }
    }

    /// Writes a snapshot of the current entries.
    ///
    /// Entries are copied under the lock; encoding and I/O happen after it is released.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be encoded or written.
    pub fn persist_now(&self) -> FleetResult<()> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        let entries = self.lock().snapshot();
        let count = entries.len();
        let raw = Snapshot::new(self.clock.now_ms(), entries).encode()?;
        persistence.save(&raw)?;
        debug!(entries = count, "Persisted cache snapshot");
        Ok(())
    }

    /// Deletes the persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be removed.
    pub fn clear_persisted(&self) -> FleetResult<()> {
        match &self.persistence {
            Some(persistence) => persistence.clear(),
            None => Ok(()),
        }
    }

    fn persist_logged(&self) {
        if let Err(e) = self.persist_now() {
            warn!(error = %e, "Cache persistence failed");
        }
    }

    // --- Lifecycle ---

    /// Starts the sweep loop and, with persistence configured, the persist loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_background(self: &Arc<Self>) {
        let mut handles = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !handles.is_empty() {
            return;
        }

        let sweep = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let period = sweep.options.sweep_interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    () = sweep.shutdown.cancelled() => break,
                    _ = ticker.tick() => { sweep.sweep(); }
                }
            }
        }));

        if self.persistence.is_some() {
            let persist = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                let period = persist.options.persist_interval;
                let mut ticker = interval_at(Instant::now() + period, period);
                loop {
                    tokio::select! {
                        () = persist.shutdown.cancelled() => break,
                        _ = ticker.tick() => persist.persist_logged(),
                    }
                }
            }));
        }
        debug!(tasks = handles.len(), "Started cache background tasks");
    }

    /// Stops background tasks and flushes a final snapshot.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handles: Vec<_> = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Cache background task failed");
            }
        }
        self.persist_logged();
    }

    /// Fetches repository info, recent commits, branches and status for
    /// `repo` concurrently and caches whatever succeeds.
    ///
    /// Returns the number of entries stored; individual fetch failures are
    /// logged and skipped.
    pub async fn warm_up(&self, backend: &dyn GitBackend, repo: &Repository) -> usize {
        let params = OperationParams::new();
        let targets = [
            (
                Operation::RepositoryInfo,
                Category::Repository,
                keys::repository(&repo.id),
            ),
            (
                Operation::Commits,
                Category::Commits,
                keys::commits(&repo.id, None, None),
            ),
            (
                Operation::Branches,
                Category::Branches,
                keys::branches(&repo.id),
            ),
            (Operation::Status, Category::Status, keys::status(&repo.id)),
        ];

        let fetches = targets.into_iter().map(|(operation, category, key)| {
            let params = &params;
            async move {
                match backend.invoke(operation, &repo.path, params).await {
                    Ok(value) => self.set_raw(category, &key, value),
                    Err(e) => {
                        debug!(
                            repository = %repo.id,
                            operation = %operation,
                            error = %e,
                            "Warm-up fetch failed"
                        );
                        false
                    }
                }
            }
        });

        let stored = join_all(fetches).await.into_iter().filter(|ok| *ok).count();
        debug!(repository = %repo.id, stored, "Warmed up repository");
        stored
    }

    /// Warms up `repos` in groups, pausing between groups.
    ///
    /// Stops early after [`Self::shutdown`].
    pub async fn preload(&self, backend: &dyn GitBackend, repos: &[Repository]) -> usize {
        let group_size = self.options.warmup_group_size.max(1);
        let mut stored = 0;

        for (index, group) in repos.chunks(group_size).enumerate() {
            if self.shutdown.is_cancelled() {
                break;
            }
            if index > 0 && !self.options.warmup_pause.is_zero() {
                tokio::time::sleep(self.options.warmup_pause).await;
            }
            stored += join_all(group.iter().map(|repo| self.warm_up(backend, repo)))
                .await
                .into_iter()
                .sum::<usize>();
        }

        info!(repositories = repos.len(), entries = stored, "Preloaded cache");
        stored
    }
}

#[cfg(test)]
mod tests;
