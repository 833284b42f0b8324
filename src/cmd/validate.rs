// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Validate command implementation.

use anyhow::anyhow;

use crate::bulk::validate_repositories;
use crate::cli::select::SelectArgs;
use crate::cmd::select::select_repositories;
use crate::config::Config;
use crate::error::Result;

/// Main handler for validate command.
///
/// # Errors
///
/// Returns an error if any selected repository is invalid.
pub fn run_validate_command(select: &SelectArgs, config: &Config) -> Result<()> {
    let repositories = select_repositories(config, select)?;
    let validation = validate_repositories(&repositories);

    for repo in &validation.valid {
        println!("ok       {:30} {}", repo.id, repo.path.display());
    }
    for rejected in &validation.invalid {
        println!(
            "invalid  {:30} {}",
            rejected.repository.id, rejected.reason
        );
    }

    if validation.is_all_valid() {
        Ok(())
    } else {
        Err(anyhow!(
            "{} of {} repositories are invalid",
            validation.invalid.len(),
            repositories.len()
        ))
    }
}
