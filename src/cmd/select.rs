// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository selection shared by run, validate and warm.

use anyhow::Context;
use wax::{Glob, Program};

use crate::cli::select::SelectArgs;
use crate::config::Config;
use crate::error::Result;
use crate::git::types::Repository;

/// `--repo` paths when given, otherwise the configured repositories, then
/// narrowed by the `--only` globs.
///
/// A repository is kept when any glob matches its name or its id.
///
/// # Errors
///
/// Returns an error if a glob pattern is invalid.
pub fn select_repositories(config: &Config, select: &SelectArgs) -> Result<Vec<Repository>> {
    let candidates = if select.repos.is_empty() {
        config.repositories()
    } else {
        select
            .repos
            .iter()
            .map(|path| Repository::from_path(path.clone()))
            .collect()
    };

    if select.only.is_empty() {
        return Ok(candidates);
    }

    let globs = select
        .only
        .iter()
        .map(|pattern| {
            Glob::new(pattern).with_context(|| format!("Invalid glob pattern: {pattern}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(candidates
        .into_iter()
        .filter(|repo| {
            globs
                .iter()
                .any(|glob| glob.is_match(repo.name.as_str()) || glob.is_match(repo.id.as_str()))
        })
        .collect())
}
