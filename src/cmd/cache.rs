// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cache command implementation.

use std::sync::Arc;

use crate::cache::{CacheStats, FileSnapshotStore, RepositoryStateCache};
use crate::cli::cache::{CacheArgs, CacheSubcommand};
use crate::config::Config;
use crate::error::Result;

/// Builds the cache described by `[cache]` and loads its snapshot.
///
/// # Errors
///
/// Returns an error if a policy override names an unknown category.
pub fn open_cache(config: &Config) -> Result<Arc<RepositoryStateCache>> {
    let mut cache = RepositoryStateCache::new(config.cache.to_options(), config.cache.policy_table()?);
    if let Some(path) = &config.cache.persist_path {
        cache = cache.with_persistence(Arc::new(FileSnapshotStore::new(path)));
    }
    cache.load_persisted();
    Ok(Arc::new(cache))
}

/// Main handler for cache command.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be removed.
pub fn run_cache_command(args: &CacheArgs, config: &Config) -> Result<()> {
    if config.cache.persist_path.is_none() {
        println!("No cache.persist_path configured, the cache is memory-only");
        return Ok(());
    }

    let cache = open_cache(config)?;
    match args.subcommand {
        CacheSubcommand::Stats => {
            for line in format_stats(&cache.stats()) {
                println!("{line}");
            }
        }
        CacheSubcommand::Clear => {
            cache.clear();
            cache.clear_persisted()?;
            println!("Cleared persisted cache");
        }
    }
    Ok(())
}

/// Human-readable cache statistics.
#[must_use]
pub fn format_stats(stats: &CacheStats) -> Vec<String> {
    let mut lines = vec![
        format!("entries  {}", stats.entries),
        format!(
            "memory   {} / {} bytes",
            stats.memory_bytes, stats.memory_budget
        ),
        format!(
            "lookups  {} hits, {} misses ({:.1}%)",
            stats.hits,
            stats.misses,
            stats.hit_rate * 100.0
        ),
    ];
    lines.extend(
        stats
            .categories
            .iter()
            .map(|(category, count)| format!("  {:<10} {count}", category.as_str())),
    );
    lines
}
