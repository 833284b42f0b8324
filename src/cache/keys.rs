// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cache key construction.
//!
//! ```text
//! repository:{repo}
//! commits:{repo}:{branch|all}:{limit}
//! branches:{repo}
//! status:{repo}
//! files:{repo}:{commit|working}
//! diff:{repo}:{file}:{commit|working}
//! search:{query}:{repo|global}
//! remote:{repo}:{remote}
//! ```
//!
//! Segments are escaped (`%` -> `%25`, `:` -> `%3A`) so a repository id or
//! file path containing `:` cannot shift the segments of a key.

use super::policy::Category;
use crate::git::shell::DEFAULT_COMMIT_LIMIT;

/// Qualifier for file changes and diffs without a commit.
pub const WORKING_TREE: &str = "working";

fn escape(segment: &str) -> String {
    segment.replace('%', "%25").replace(':', "%3A")
}

/// Builds `category:seg[:seg...]` from raw segments.
#[must_use]
pub fn build(category: Category, segments: &[&str]) -> String {
    let mut key = String::from(category.as_str());
    for segment in segments {
        key.push(':');
        key.push_str(&escape(segment));
    }
    key
}

#[must_use]
pub fn repository(repo: &str) -> String {
    build(Category::Repository, &[repo])
}

#[must_use]
pub fn commits(repo: &str, branch: Option<&str>, limit: Option<u64>) -> String {
    let limit = limit.unwrap_or(DEFAULT_COMMIT_LIMIT).to_string();
    build(Category::Commits, &[repo, branch.unwrap_or("all"), &limit])
}

#[must_use]
pub fn branches(repo: &str) -> String {
    build(Category::Branches, &[repo])
}

#[must_use]
pub fn status(repo: &str) -> String {
    build(Category::Status, &[repo])
}

#[must_use]
pub fn files(repo: &str, commit: Option<&str>) -> String {
    build(Category::Files, &[repo, commit.unwrap_or(WORKING_TREE)])
}

#[must_use]
pub fn diff(repo: &str, file: &str, commit: Option<&str>) -> String {
    build(Category::Diff, &[repo, file, commit.unwrap_or(WORKING_TREE)])
}

#[must_use]
pub fn search(query: &str, repo: Option<&str>) -> String {
    build(Category::Search, &[query, repo.unwrap_or("global")])
}

#[must_use]
pub fn remote(repo: &str, remote: &str) -> String {
    build(Category::Remote, &[repo, remote])
}

/// Whether `key` belongs to repository `repo`.
///
/// Only the repository segment is compared: the one right after the
/// category, or the scope segment of a `search` key. Branch, remote, file
/// and commit qualifiers never match.
#[must_use]
pub fn belongs_to_repository(key: &str, repo: &str) -> bool {
    let position = match Category::of_key(key) {
        Some(Category::Search) => 2,
        Some(_) => 1,
        None => return false,
    };
    key.split(':').nth(position) == Some(escape(repo).as_str())
}

/// Whether `key` belongs to `category`.
#[must_use]
pub fn in_category(key: &str, category: Category) -> bool {
    key.split(':').next() == Some(category.as_str())
}
