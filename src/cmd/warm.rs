// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Warm command implementation.

use std::sync::Arc;

use crate::bulk::validate_repositories;
use crate::cli::select::SelectArgs;
use crate::cmd::cache::{format_stats, open_cache};
use crate::cmd::select::select_repositories;
use crate::config::Config;
use crate::error::Result;
use crate::fleet::Fleet;
use crate::git::shell::ShellBackend;

/// Main handler for warm command.
///
/// Invalid repositories are skipped. The snapshot is written at the end when
/// `cache.persist_path` is set.
///
/// # Errors
///
/// Returns an error if an `--only` glob or a cache policy is invalid.
pub async fn run_warm_command(select: &SelectArgs, config: &Config) -> Result<()> {
    let validation = validate_repositories(&select_repositories(config, select)?);
    for rejected in &validation.invalid {
        println!("skipped {}: {}", rejected.repository.id, rejected.reason);
    }
    if validation.valid.is_empty() {
        println!("No repositories selected");
        return Ok(());
    }

    let cache = open_cache(config)?;
    cache.start_background();
    let fleet = Fleet::new(Arc::new(ShellBackend::new()), Arc::clone(&cache));

    let stored = fleet.warm(&validation.valid).await;
    cache.shutdown().await;

    println!(
        "Stored {stored} entries for {} repositories",
        validation.valid.len()
    );
    for line in format_stats(&cache.stats()) {
        println!("{line}");
    }
    Ok(())
}
