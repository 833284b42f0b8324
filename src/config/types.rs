// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration section types.
//!
//! ```text
//! Config: GlobalConfig, BulkConfig, CacheConfig, [RepositoryConfig]
//! CacheConfig.policies: category name → PolicyOverride
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::bulk::{BulkOptions, DEFAULT_MAX_CONCURRENCY, DEFAULT_TIMEOUT};
use crate::cache::{CacheOptions, Category, CategoryPolicy, PolicyTable};
use crate::error::ConfigError;
use crate::git::types::{Repository, SyncStatus};
use crate::logging::LogLevel;

/// Global settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Log level for console output (0-6).
    pub output_log_level: LogLevel,
    /// Log level for file output (0-6).
    pub file_log_level: LogLevel,
    /// Path to log file. No file logging when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            output_log_level: LogLevel::INFO,
            file_log_level: LogLevel::DEBUG,
            log_file: None,
        }
    }
}

/// Bulk executor defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BulkConfig {
    /// Repositories processed concurrently per batch.
    pub max_concurrency: usize,
    /// Per-repository timeout in seconds.
    pub timeout_secs: u64,
    /// Stop after the first batch containing a failure.
    pub abort_on_error: bool,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            abort_on_error: false,
        }
    }
}

impl BulkConfig {
    /// Executor options without progress reporting or a parent token.
    #[must_use]
    pub fn to_options(&self) -> BulkOptions {
        BulkOptions::builder()
            .with_max_concurrency(self.max_concurrency)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_abort_on_error(self.abort_on_error)
            .build()
    }
}

/// Per-category policy override. Unset fields keep the built-in value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}

/// Repository state cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Global memory budget in MiB.
    pub memory_budget_mb: u64,
    /// Expired-entry sweep period in seconds.
    pub sweep_interval_secs: u64,
    /// Background persistence period in seconds.
    pub persist_interval_secs: u64,
    /// Snapshot file. The cache is memory-only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_path: Option<PathBuf>,
    /// Repositories warmed concurrently during preload.
    pub warmup_group_size: usize,
    /// Pause between preload groups in milliseconds.
    pub warmup_pause_ms: u64,
    /// Overrides keyed by category name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub policies: BTreeMap<String, PolicyOverride>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_budget_mb: 100,
            sweep_interval_secs: 60,
            persist_interval_secs: 300,
            persist_path: None,
            warmup_group_size: 5,
            warmup_pause_ms: 100,
            policies: BTreeMap::new(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn to_options(&self) -> CacheOptions {
        let budget = self.memory_budget_mb.saturating_mul(1024 * 1024);
        CacheOptions::builder()
            .with_memory_budget(usize::try_from(budget).unwrap_or(usize::MAX))
            .with_sweep_interval(Duration::from_secs(self.sweep_interval_secs))
            .with_persist_interval(Duration::from_secs(self.persist_interval_secs))
            .with_warmup_group_size(self.warmup_group_size)
            .with_warmup_pause(Duration::from_millis(self.warmup_pause_ms))
            .build()
    }

    /// Built-in policies with the configured overrides applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unknown category name.
    pub fn policy_table(&self) -> Result<PolicyTable, ConfigError> {
        let mut table = PolicyTable::default();
        for (name, policy) in &self.policies {
            let category: Category = name.parse().map_err(|_| ConfigError::InvalidValue {
                section: "cache.policies".to_string(),
                key: name.clone(),
                message: format!(
                    "unknown category, expected one of: {}",
                    Category::ALL.map(|c| c.as_str()).join(", ")
                ),
            })?;
            let current = table.get(category);
            table = table.with(
                category,
                CategoryPolicy::new(
                    policy
                        .ttl_secs
                        .map_or(current.ttl, Duration::from_secs),
                    policy.max_entries.unwrap_or(current.max_entries),
                ),
            );
        }
        Ok(table)
    }
}

/// A repository listed in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Defaults to the directory name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Defaults to the directory name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub path: PathBuf,
    #[serde(default)]
    pub sync_status: SyncStatus,
}

impl RepositoryConfig {
    #[must_use]
    pub fn to_repository(&self) -> Repository {
        let derived = Repository::from_path(self.path.clone());
        Repository::new(
            self.id.clone().unwrap_or(derived.id),
            self.name.clone().unwrap_or(derived.name),
            self.path.clone(),
        )
        .with_sync_status(self.sync_status)
    }
}
