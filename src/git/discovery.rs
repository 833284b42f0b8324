// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Git repository discovery.
//!
//! ```text
//! root/
//!   api/            (included, id "api")
//!   libs/
//!     core/         (included, id "libs/core")
//!     .cache/       (skipped, hidden)
//!   node_modules/   (skipped)
//! ```
//!
//! Directories are walked in parallel with `ignore::WalkParallel`; a
//! directory containing a `.git` entry is confirmed with gix. Returns a list
//! sorted by id for deterministic ordering.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bon::Builder;
use flume::bounded;
use ignore::WalkBuilder;

use super::types::Repository;
use crate::error::Result;

/// Options for repository discovery.
#[derive(Debug, Clone, Builder)]
pub struct DiscoveryOptions {
    /// Maximum depth below the root (None = unlimited)
    #[builder(setters(name = with_max_depth))]
    max_depth: Option<usize>,
    /// Follow symbolic links
    #[builder(setters(name = with_follow_links), default = false)]
    follow_links: bool,
    /// Descend into repositories looking for nested ones
    #[builder(setters(name = with_nested), default = false)]
    nested: bool,
    /// Skip directories matching these names (exact match)
    #[builder(setters(name = with_skip_dirs), default = default_skip_dirs())]
    skip_dirs: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn default_skip_dirs() -> Vec<String> {
    ["node_modules", "target", "vendor", "__pycache__", "venv"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Check if path is the top level of a git work tree.
#[must_use]
pub fn is_git_repo(path: &Path) -> bool {
    path.join(".git").exists() && gix::discover(path).is_ok()
}

/// Get current branch name (None if HEAD is detached or unreadable).
#[must_use]
pub fn current_branch(path: &Path) -> Option<String> {
    let repo = gix::discover(path).ok()?;
    let head = repo.head_name().ok()??;
    Some(head.shorten().to_string())
}

/// Discover all git repositories below `root`.
///
/// The id of each repository is its path relative to `root` using `/`
/// separators; a root that is itself a repository gets its directory name.
///
/// # Errors
///
/// Returns an error if `root` does not exist.
pub fn discover_repositories(root: &Path, options: &DiscoveryOptions) -> Result<Vec<Repository>> {
    if !root.is_dir() {
        anyhow::bail!("root directory does not exist: {}", root.display());
    }

    let (tx, rx) = bounded::<PathBuf>(1000);
    let parallel = build_walker(root, options).build_parallel();
    let nested = options.nested;

    parallel.run(|| {
        let tx = tx.clone();
        Box::new(move |entry_result| {
            let Ok(entry) = entry_result else {
                return ignore::WalkState::Continue;
            };
            if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                return ignore::WalkState::Continue;
            }
            if is_git_repo(entry.path()) {
                let _ = tx.send(entry.path().to_path_buf());
                if !nested {
                    return ignore::WalkState::Skip;
                }
            }
            ignore::WalkState::Continue
        })
    });
    drop(tx);

    let mut repositories: Vec<Repository> = rx
        .iter()
        .map(|path| repository_for(root, path))
        .collect();
    repositories.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(repositories)
}

fn repository_for(root: &Path, path: PathBuf) -> Repository {
    let relative = path
        .strip_prefix(root)
        .ok()
        .filter(|r| !r.as_os_str().is_empty())
        .map(|r| {
            r.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        });
    let fallback = Repository::from_path(path.clone());
    match relative {
        Some(id) => Repository::new(id, fallback.name, path),
        None => fallback,
    }
}

fn build_walker(root: &Path, options: &DiscoveryOptions) -> WalkBuilder {
    let mut builder = WalkBuilder::new(root);

    if let Some(depth) = options.max_depth {
        builder.max_depth(Some(depth));
    }
    builder.follow_links(options.follow_links);
    builder.hidden(true);
    // Nested repositories are often listed in a parent's .gitignore
    builder.git_ignore(false);
    builder.git_global(false);
    builder.git_exclude(false);

    if !options.skip_dirs.is_empty() {
        let skip_dirs: Arc<Vec<String>> = Arc::new(options.skip_dirs.clone());
        builder.filter_entry(move |entry| {
            !(entry.file_type().is_some_and(|ft| ft.is_dir())
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| skip_dirs.iter().any(|skip| skip == name)))
        });
    }

    builder
}
