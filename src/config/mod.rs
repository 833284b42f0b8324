// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration management for gitfleet.
//!
//! # Configuration Hierarchy
//!
//! ```text
//! Priority (low → high)
//! 1. defaults
//! 2. gitfleet.toml (cwd, optional)
//! 3. --config
//! 4. GITFLEET_* env vars
//! 5. --set overrides
//! ```
//!
//! # Environment Variable Mapping
//!
//! ```text
//! GITFLEET_BULK__MAX_CONCURRENCY=8      → bulk.max_concurrency = 8
//! GITFLEET_CACHE__PERSIST_PATH=/tmp/c   → cache.persist_path = "/tmp/c"
//! GITFLEET_GLOBAL__OUTPUT_LOG_LEVEL=4   → global.output_log_level = 4
//! ```
//!
//! # Example
//!
//! ```toml
//! [bulk]
//! max_concurrency = 4
//!
//! [cache.policies.status]
//! ttl_secs = 10
//!
//! [[repositories]]
//! path = "/work/api"
//! ```

pub mod loader;
pub mod types;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::git::types::Repository;

use loader::ConfigLoader;
use types::{BulkConfig, CacheConfig, GlobalConfig, RepositoryConfig};

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "gitfleet.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "GITFLEET";

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Global options.
    pub global: GlobalConfig,
    /// Bulk executor defaults.
    pub bulk: BulkConfig,
    /// Repository state cache.
    pub cache: CacheConfig,
    /// Managed repositories.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<RepositoryConfig>,
}

impl Config {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use gitfleet::config::Config;
    ///
    /// let config = Config::builder()
    ///     .add_toml_file_optional("gitfleet.toml")
    ///     .with_env_prefix("GITFLEET")
    ///     .build()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn builder() -> ConfigLoader {
        ConfigLoader::new()
    }

    /// Load configuration from a single TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML, or
    /// does not match the `Config` structure.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().add_toml_file(path).build()
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid TOML or does not match the
    /// `Config` structure.
    pub fn parse(content: &str) -> Result<Self> {
        Self::builder().add_toml_str(content).build()
    }

    /// Validate value ranges and cache policy names.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a zero concurrency, timeout,
    /// memory budget or warm-up group size, and for unknown or zero-valued
    /// cache policies.
    pub fn resolve_and_validate(&mut self) -> Result<()> {
        let invalid = |section: &str, key: &str, message: &str| ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            message: message.to_string(),
        };

        if self.bulk.max_concurrency == 0 {
            return Err(invalid("bulk", "max_concurrency", "must be at least 1").into());
        }
        if self.bulk.timeout_secs == 0 {
            return Err(invalid("bulk", "timeout_secs", "must be at least 1").into());
        }
        if self.cache.memory_budget_mb == 0 {
            return Err(invalid("cache", "memory_budget_mb", "must be at least 1").into());
        }
        if self.cache.warmup_group_size == 0 {
            return Err(invalid("cache", "warmup_group_size", "must be at least 1").into());
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(invalid("cache", "sweep_interval_secs", "must be at least 1").into());
        }
        if self.cache.persist_interval_secs == 0 {
            return Err(invalid("cache", "persist_interval_secs", "must be at least 1").into());
        }

        for (name, policy) in &self.cache.policies {
            if policy.ttl_secs == Some(0) {
                return Err(invalid("cache.policies", name.as_str(), "ttl_secs must be at least 1").into());
            }
            if policy.max_entries == Some(0) {
                return Err(
                    invalid("cache.policies", name.as_str(), "max_entries must be at least 1").into(),
                );
            }
        }
        self.cache.policy_table()?;
        Ok(())
    }

    /// Configured repositories with ids and names filled in.
    #[must_use]
    pub fn repositories(&self) -> Vec<Repository> {
        self.repositories
            .iter()
            .map(RepositoryConfig::to_repository)
            .collect()
    }

    /// Format configuration options for display.
    ///
    /// Output is deterministically ordered using `BTreeMap`.
    #[must_use]
    pub fn format_options(&self) -> Vec<String> {
        let mut options = BTreeMap::new();
        self.format_global_options(&mut options);
        self.format_bulk_options(&mut options);
        self.format_cache_options(&mut options);
        options.insert(
            "repositories".into(),
            self.repositories.len().to_string(),
        );

        let max_key_len = options.keys().map(String::len).max().unwrap_or(0);

        options
            .into_iter()
            .map(|(key, value)| format!("{key:<max_key_len$} = {value}"))
            .collect()
    }

    fn format_global_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert(
            "global.output_log_level".into(),
            self.global.output_log_level.as_u8().to_string(),
        );
        options.insert(
            "global.file_log_level".into(),
            self.global.file_log_level.as_u8().to_string(),
        );
        if let Some(log_file) = &self.global.log_file {
            options.insert("global.log_file".into(), log_file.display().to_string());
        }
    }

    fn format_bulk_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert(
            "bulk.max_concurrency".into(),
            self.bulk.max_concurrency.to_string(),
        );
        options.insert(
            "bulk.timeout_secs".into(),
            self.bulk.timeout_secs.to_string(),
        );
        options.insert(
            "bulk.abort_on_error".into(),
            self.bulk.abort_on_error.to_string(),
        );
    }

    fn format_cache_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert(
            "cache.memory_budget_mb".into(),
            self.cache.memory_budget_mb.to_string(),
        );
        options.insert(
            "cache.sweep_interval_secs".into(),
            self.cache.sweep_interval_secs.to_string(),
        );
        options.insert(
            "cache.persist_interval_secs".into(),
            self.cache.persist_interval_secs.to_string(),
        );
        if let Some(path) = &self.cache.persist_path {
            options.insert("cache.persist_path".into(), path.display().to_string());
        }
        options.insert(
            "cache.warmup_group_size".into(),
            self.cache.warmup_group_size.to_string(),
        );
        options.insert(
            "cache.warmup_pause_ms".into(),
            self.cache.warmup_pause_ms.to_string(),
        );

        if let Ok(table) = self.cache.policy_table() {
            for (category, policy) in table.iter() {
                options.insert(
                    format!("cache.policies.{category}"),
                    format!("ttl={}s max={}", policy.ttl.as_secs(), policy.max_entries),
                );
            }
        }
    }
}
