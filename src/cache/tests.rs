// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::persist::{FileSnapshotStore, MemorySnapshotStore, Snapshot, SnapshotStore};
use super::policy::{Category, CategoryPolicy, PolicyTable};
use super::{CacheOptions, ManualClock, RepositoryStateCache, keys};
use crate::git::backend::{Reply, ScriptedBackend};
use crate::git::operation::Operation;
use crate::git::types::{
    BranchInfo, CommitInfo, FileDiff, RemoteStatus, RepoStatus, Repository, RepositoryInfo,
};

const START_MS: u64 = 1_700_000_000_000;

fn cache_with_clock() -> (RepositoryStateCache, ManualClock) {
    let clock = ManualClock::new(START_MS);
    let cache = RepositoryStateCache::new(CacheOptions::default(), PolicyTable::default())
        .with_clock(Arc::new(clock.clone()));
    (cache, clock)
}

fn status(branch: &str) -> RepoStatus {
    RepoStatus {
        branch: Some(branch.to_string()),
        ..RepoStatus::default()
    }
}

fn commit(id: &str) -> CommitInfo {
    CommitInfo {
        id: id.to_string(),
        short_id: id.chars().take(7).collect(),
        author: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        timestamp: 1_700_000_000,
        message: format!("commit {id}"),
    }
}

// --- Keys and policies ---

#[test]
fn test_key_formats() {
    insta::assert_debug_snapshot!(
        [
            keys::repository("api"),
            keys::commits("api", None, None),
            keys::commits("api", Some("main"), Some(10)),
            keys::files("api", None),
            keys::diff("api", "src/lib.rs", Some("abc123")),
            keys::search("fix", None),
            keys::remote("api", "origin"),
            keys::status("c:/work"),
        ],
        @r#"
    [
        "repository:api",
        "commits:api:all:50",
        "commits:api:main:10",
        "files:api:working",
        "diff:api:src/lib.rs:abc123",
        "search:fix:global",
        "remote:api:origin",
        "status:c%3A/work",
    ]
    "#
    );
}

#[test]
fn test_belongs_to_repository_reads_repository_segment() {
    assert!(keys::belongs_to_repository(&keys::status("api"), "api"));
    assert!(keys::belongs_to_repository(&keys::remote("api", "origin"), "api"));
    assert!(keys::belongs_to_repository(&keys::search("todo", Some("api")), "api"));
    assert!(!keys::belongs_to_repository(&keys::status("api-gateway"), "api"));
    assert!(!keys::belongs_to_repository(&keys::branches("web"), "api"));
    assert!(!keys::belongs_to_repository(&keys::remote("api", "origin"), "origin"));
    assert!(!keys::belongs_to_repository(&keys::commits("api", Some("main"), None), "main"));
    assert!(!keys::belongs_to_repository(&keys::diff("api", "web", None), "web"));
    assert!(!keys::belongs_to_repository(&keys::search("api", None), "api"));
    assert!(!keys::belongs_to_repository("unknown:api", "api"));
}

#[test]
fn test_category_parse() {
    assert_eq!("diff".parse::<Category>().unwrap(), Category::Diff);
    assert_eq!(Category::of_key("commits:a:all:50"), Some(Category::Commits));
    assert_eq!(Category::of_key("bogus:a"), None);

    let err = "tags".parse::<Category>().unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"unknown cache category 'tags'");
}

#[test]
fn test_default_policies() {
    let table = PolicyTable::default();
    let rendered: Vec<String> = table
        .iter()
        .map(|(category, policy)| {
            format!(
                "{category}: {}s/{}",
                policy.ttl.as_secs(),
                policy.max_entries
            )
        })
        .collect();
    insta::assert_snapshot!(rendered.join("\n"), @r"
    repository: 300s/1000
    commits: 600s/5000
    branches: 180s/2000
    status: 30s/1000
    files: 120s/3000
    diff: 300s/1000
    search: 600s/500
    remote: 900s/1000
    ");
}

// --- Typed accessors ---

#[test]
fn test_typed_round_trip() {
    let (cache, _clock) = cache_with_clock();

    let info = RepositoryInfo {
        current_branch: Some("main".to_string()),
        ..RepositoryInfo::default()
    };
    cache.set_repository_info("api", &info);
    cache.set_commits("api", Some("main"), Some(2), &[commit("a"), commit("b")]);
    cache.set_status("api", &status("main"));
    cache.set_diff("api", "README.md", None, &FileDiff::default());

    assert_eq!(cache.get_repository_info("api"), Some(info));
    assert_eq!(
        cache
            .get_commits("api", Some("main"), Some(2))
            .map(|c| c.len()),
        Some(2)
    );
    assert_eq!(cache.get_commits("api", None, Some(2)), None);
    assert_eq!(cache.get_status("api"), Some(status("main")));
    assert_eq!(
        cache.get_diff("api", "README.md", None),
        Some(FileDiff::default())
    );
    assert_eq!(cache.get_diff("api", "README.md", Some("abc")), None);
}

#[test]
fn test_entry_expires_after_category_ttl() {
    let (cache, clock) = cache_with_clock();
    cache.set_status("api", &status("main"));
    cache.set_branches("api", &[]);

    clock.advance(Duration::from_secs(31));

    assert_eq!(cache.get_status("api"), None);
    assert_eq!(cache.get_branches("api"), Some(Vec::<BranchInfo>::new()));
    assert_eq!(cache.stats().entries, 1);
}

#[test]
fn test_shape_mismatch_is_a_miss() {
    let (cache, _clock) = cache_with_clock();
    cache.set_raw(Category::Status, &keys::status("api"), json!("not a status"));

    assert_eq!(cache.get_status("api"), None);
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses), (0, 1));
    assert!(stats.hit_rate.abs() < f64::EPSILON);
}

#[test]
fn test_category_limit_applies_on_set() {
    let policies = PolicyTable::default().with(
        Category::Remote,
        CategoryPolicy::new(Duration::from_secs(60), 2),
    );
    let clock = ManualClock::new(START_MS);
    let cache = RepositoryStateCache::new(CacheOptions::default(), policies)
        .with_clock(Arc::new(clock.clone()));

    for repo in ["a", "b", "c"] {
        cache.set_remote_status(repo, "origin", &RemoteStatus::default());
        clock.advance(Duration::from_millis(1));
    }

    assert_eq!(cache.get_remote_status("a", "origin"), None);
    assert!(cache.get_remote_status("b", "origin").is_some());
    assert!(cache.get_remote_status("c", "origin").is_some());
}

// --- Invalidation ---

#[test]
fn test_invalidate_repository_spans_categories() {
    let (cache, _clock) = cache_with_clock();
    cache.set_status("api", &status("main"));
    cache.set_commits("api", None, None, &[commit("a")]);
    cache.set_remote_status("api", "origin", &RemoteStatus::default());
    cache.set_search_results("todo", Some("api"), &[]);
    cache.set_status("web", &status("main"));

    assert_eq!(cache.invalidate_repository("api"), 4);
    assert_eq!(cache.get_status("api"), None);
    assert_eq!(cache.get_status("web"), Some(status("main")));
}

#[test]
fn test_invalidate_repository_keeps_entries_of_other_repositories() {
    let (cache, _clock) = cache_with_clock();
    cache.set_remote_status("api", "upstream", &RemoteStatus::default());
    cache.set_commits("api", Some("main"), None, &[commit("a")]);
    cache.set_status("upstream", &status("main"));
    cache.set_status("main", &status("main"));

    assert_eq!(cache.invalidate_repository("upstream"), 1);
    assert!(cache.get_remote_status("api", "upstream").is_some());
    assert_eq!(cache.get_status("upstream"), None);

    assert_eq!(cache.invalidate_repository("main"), 1);
    assert_eq!(
        cache.get_commits("api", Some("main"), None),
        Some(vec![commit("a")])
    );
    assert_eq!(cache.get_status("main"), None);
}

#[test]
fn test_invalidate_category() {
    let (cache, _clock) = cache_with_clock();
    cache.set_status("api", &status("main"));
    cache.set_status("web", &status("dev"));
    cache.set_branches("api", &[]);

    assert_eq!(cache.invalidate_category(Category::Status), 2);
    assert_eq!(cache.stats().categories.get(&Category::Branches), Some(&1));
    assert_eq!(cache.stats().categories.get(&Category::Status), None);
}

#[test]
fn test_stats_counts_hits_and_misses() {
    let (cache, _clock) = cache_with_clock();
    cache.set_status("api", &status("main"));

    let _ = cache.get_status("api");
    let _ = cache.get_status("api");
    let _ = cache.get_status("web");

    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses), (2, 1));
    assert!((stats.hit_rate - 2.0 / 3.0).abs() < f64::EPSILON);
    assert_eq!(stats.memory_budget, 100 * 1024 * 1024);
}

// --- Persistence ---

#[test]
fn test_persist_and_reload_memory_store() {
    let persistence: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::new());
    let (cache, clock) = cache_with_clock();
    let cache = cache.with_persistence(Arc::clone(&persistence));
    cache.set_status("api", &status("main"));
    cache.set_commits("api", None, None, &[commit("a")]);
    cache.persist_now().unwrap();

    clock.advance(Duration::from_secs(60));
    let reloaded = RepositoryStateCache::new(CacheOptions::default(), PolicyTable::default())
        .with_clock(Arc::new(clock.clone()))
        .with_persistence(persistence);

    assert_eq!(reloaded.load_persisted(), 1);
    assert_eq!(reloaded.get_status("api"), None);
    assert_eq!(
        reloaded.get_commits("api", None, None),
        Some(vec![commit("a")])
    );
}

#[test]
fn test_load_trims_categories_to_current_limits() {
    let persistence: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::new());
    let (cache, clock) = cache_with_clock();
    let cache = cache.with_persistence(Arc::clone(&persistence));
    for repo in ["a", "b", "c", "d", "e"] {
        cache.set_status(repo, &status("main"));
        clock.advance(Duration::from_millis(1));
    }
    cache.set_branches("a", &[]);
    cache.persist_now().unwrap();

    let policies = PolicyTable::default().with(
        Category::Status,
        CategoryPolicy::new(Duration::from_secs(30), 2),
    );
    let reloaded = RepositoryStateCache::new(CacheOptions::default(), policies)
        .with_clock(Arc::new(clock.clone()))
        .with_persistence(persistence);

    assert_eq!(reloaded.load_persisted(), 3);
    let stats = reloaded.stats();
    assert_eq!(stats.categories.get(&Category::Status), Some(&2));
    assert_eq!(stats.categories.get(&Category::Branches), Some(&1));
    assert_eq!(reloaded.get_status("c"), None);
    assert!(reloaded.get_status("d").is_some());
    assert!(reloaded.get_status("e").is_some());
}

#[test]
fn test_load_corrupt_snapshot_starts_empty() {
    let persistence = Arc::new(MemorySnapshotStore::new());
    persistence.save("{not json").unwrap();
    let (cache, _clock) = cache_with_clock();
    let cache = cache.with_persistence(persistence);

    assert_eq!(cache.load_persisted(), 0);
    assert_eq!(cache.stats().entries, 0);
}

#[test]
fn test_file_snapshot_store_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(temp.path().join("nested").join("cache.json"));

    assert_eq!(store.load().unwrap(), None);
    store.save(r#"{"version":1}"#).unwrap();
    assert_eq!(store.load().unwrap().as_deref(), Some(r#"{"version":1}"#));
    store.clear().unwrap();
    assert_eq!(store.load().unwrap(), None);
    store.clear().unwrap();
}

#[test]
fn test_snapshot_decode_rejects_garbage() {
    assert!(Snapshot::decode("[]").is_err());
    let snapshot = Snapshot::decode(r#"{"version":1,"saved_at":5,"entries":[]}"#).unwrap();
    assert_eq!(snapshot.saved_at, 5);
}

// --- Lifecycle ---

#[tokio::test]
async fn test_warm_up_caches_successful_fetches() {
    let backend = ScriptedBackend::new()
        .with_operation_reply(
            Operation::RepositoryInfo,
            Reply::Succeed(json!({"path": "/repos/api", "current_branch": "main", "head": null, "remote_url": null, "is_dirty": false})),
        )
        .with_operation_reply(
            Operation::Commits,
            Reply::Succeed(serde_json::to_value(vec![commit("a")]).unwrap()),
        )
        .with_operation_reply(Operation::Branches, Reply::Fail("boom".to_string()))
        .with_operation_reply(
            Operation::Status,
            Reply::Succeed(serde_json::to_value(status("main")).unwrap()),
        );
    let (cache, _clock) = cache_with_clock();
    let repo = Repository::new("api", "api", "/repos/api");

    let stored = cache.warm_up(&backend, &repo).await;

    assert_eq!(stored, 3);
    assert_eq!(backend.calls().len(), 4);
    assert_eq!(cache.get_status("api"), Some(status("main")));
    assert_eq!(cache.get_commits("api", None, None), Some(vec![commit("a")]));
    assert_eq!(cache.get_branches("api"), None);
    assert_eq!(
        cache
            .get_repository_info("api")
            .and_then(|i| i.current_branch),
        Some("main".to_string())
    );
}

#[tokio::test]
async fn test_warm_up_skips_values_over_budget() {
    let backend = ScriptedBackend::new()
        .with_operation_reply(Operation::RepositoryInfo, Reply::Succeed(json!(1)))
        .with_operation_reply(Operation::Commits, Reply::Succeed(json!("x".repeat(64))))
        .with_operation_reply(Operation::Branches, Reply::Succeed(json!(2)))
        .with_operation_reply(Operation::Status, Reply::Succeed(json!(3)));
    let options = CacheOptions::builder().with_memory_budget(16).build();
    let cache = RepositoryStateCache::new(options, PolicyTable::default());
    let repo = Repository::new("api", "api", "/repos/api");

    let stored = cache.warm_up(&backend, &repo).await;

    assert_eq!(stored, 3);
    assert_eq!(cache.stats().entries, 3);
    assert_eq!(cache.stats().categories.get(&Category::Commits), None);
}

#[tokio::test]
async fn test_preload_visits_every_repository() {
    let backend = ScriptedBackend::new().with_reply("/repos/broken", Reply::Fail("gone".to_string()));
    let options = CacheOptions::builder()
        .with_warmup_group_size(2)
        .with_warmup_pause(Duration::from_millis(1))
        .build();
    let cache = RepositoryStateCache::new(options, PolicyTable::default());
    let repos = vec![
        Repository::new("a", "a", "/repos/a"),
        Repository::new("b", "b", "/repos/b"),
        Repository::new("broken", "broken", "/repos/broken"),
    ];

    let stored = cache.preload(&backend, &repos).await;

    assert_eq!(stored, 8);
    assert_eq!(backend.calls().len(), 12);
}

#[tokio::test]
async fn test_shutdown_flushes_snapshot() {
    let persistence = Arc::new(MemorySnapshotStore::new());
    let cache = Arc::new(
        RepositoryStateCache::new(CacheOptions::default(), PolicyTable::default())
            .with_persistence(persistence.clone()),
    );
    cache.start_background();
    cache.set_status("api", &status("main"));

    cache.shutdown().await;

    let raw = persistence.load().unwrap().unwrap();
    let snapshot = Snapshot::decode(&raw).unwrap();
    assert_eq!(snapshot.entries.len(), 1);
    assert_eq!(snapshot.entries[0].key, "status:api");
}

#[tokio::test(start_paused = true)]
async fn test_background_sweep_removes_expired_entries() {
    let clock = ManualClock::new(START_MS);
    let options = CacheOptions::builder()
        .with_sweep_interval(Duration::from_secs(1))
        .build();
    let cache = Arc::new(
        RepositoryStateCache::new(options, PolicyTable::default())
            .with_clock(Arc::new(clock.clone())),
    );
    cache.set_status("api", &status("main"));
    cache.start_background();

    clock.advance(Duration::from_secs(31));
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(cache.stats().entries, 0);
    cache.shutdown().await;
}
