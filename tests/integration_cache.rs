// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration tests for the repository state cache.
//!
//! Exercises persistence through a real snapshot file and TTL behaviour with a
//! manual clock.

use std::sync::Arc;
use std::time::Duration;

use gitfleet::cache::{
    CacheOptions, Category, CategoryPolicy, FileSnapshotStore, ManualClock, PolicyTable,
    RepositoryStateCache, SnapshotStore,
};
use gitfleet::git::types::{BranchInfo, RepoStatus, RepositoryInfo};

const START_MS: u64 = 1_750_000_000_000;

fn status(branch: &str) -> RepoStatus {
    RepoStatus {
        branch: Some(branch.to_string()),
        ahead: 1,
        ..RepoStatus::default()
    }
}

fn cache_at(path: &std::path::Path, clock: &ManualClock) -> RepositoryStateCache {
    RepositoryStateCache::new(CacheOptions::default(), PolicyTable::default())
        .with_persistence(Arc::new(FileSnapshotStore::new(path)))
        .with_clock(Arc::new(clock.clone()))
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn cache_survives_restart_through_snapshot_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("cache.json");
    let clock = ManualClock::new(START_MS);

    let cache = cache_at(&path, &clock);
    cache.set_status("api", &status("main"));
    cache.set_repository_info(
        "api",
        &RepositoryInfo {
            path: "/work/api".into(),
            current_branch: Some("main".to_string()),
            ..RepositoryInfo::default()
        },
    );
    cache.set_branches("web", &[]);
    cache.persist_now().unwrap();
    assert!(path.exists());

    let restored = cache_at(&path, &clock);
    assert_eq!(restored.load_persisted(), 3);
    assert_eq!(restored.get_status("api"), Some(status("main")));
    assert_eq!(
        restored.get_repository_info("api").unwrap().current_branch.as_deref(),
        Some("main")
    );
    assert_eq!(restored.get_branches("web"), Some(Vec::<BranchInfo>::new()));
}

#[test]
fn expired_entries_are_not_restored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let clock = ManualClock::new(START_MS);

    let cache = cache_at(&path, &clock);
    cache.set_status("api", &status("main"));
    cache.set_branches("api", &[]);
    cache.persist_now().unwrap();

    // status lives 30s, branches 3m
    clock.advance(Duration::from_secs(60));
    let restored = cache_at(&path, &clock);

    assert_eq!(restored.load_persisted(), 1);
    assert!(restored.get_status("api").is_none());
    assert!(restored.get_branches("api").is_some());
}

#[test]
fn clearing_removes_snapshot_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let clock = ManualClock::new(START_MS);

    let cache = cache_at(&path, &clock);
    cache.set_status("api", &status("main"));
    cache.persist_now().unwrap();
    cache.clear_persisted().unwrap();

    assert!(!path.exists());
    assert_eq!(FileSnapshotStore::new(&path).load().unwrap(), None);
    // clearing twice is fine
    cache.clear_persisted().unwrap();
}

#[test]
fn corrupt_snapshot_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, "{ not json").unwrap();

    let cache = cache_at(&path, &ManualClock::new(START_MS));

    assert_eq!(cache.load_persisted(), 0);
    assert_eq!(cache.stats().entries, 0);
}

// =============================================================================
// Policies and budget
// =============================================================================

#[test]
fn custom_policy_and_memory_budget() {
    let clock = ManualClock::new(START_MS);
    let policies = PolicyTable::default().with(
        Category::Status,
        CategoryPolicy::new(Duration::from_secs(5), 2),
    );
    let cache = RepositoryStateCache::new(CacheOptions::default(), policies)
        .with_clock(Arc::new(clock.clone()));

    for repo in ["a", "b", "c"] {
        clock.advance(Duration::from_millis(10));
        cache.set_status(repo, &status("main"));
    }

    // limit of two keeps the newest entries
    assert!(cache.get_status("a").is_none());
    assert!(cache.get_status("b").is_some());
    assert!(cache.get_status("c").is_some());

    clock.advance(Duration::from_secs(6));
    assert!(cache.get_status("c").is_none());
    assert_eq!(cache.stats().categories.get(&Category::Status), Some(&1));
}

#[test]
fn memory_budget_evicts_oldest_entries() {
    let clock = ManualClock::new(START_MS);
    let options = CacheOptions::builder().with_memory_budget(400).build();
    let cache = RepositoryStateCache::new(options, PolicyTable::default())
        .with_clock(Arc::new(clock.clone()));

    for repo in ["one", "two", "three", "four"] {
        clock.advance(Duration::from_millis(5));
        cache.set_status(repo, &status("main"));
    }

    let stats = cache.stats();
    assert!(stats.memory_bytes <= 400);
    assert!(stats.entries < 4);
    assert!(cache.get_status("four").is_some());
    assert!(cache.get_status("one").is_none());
}
