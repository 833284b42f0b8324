// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use serde_json::json;

use super::{EntryStore, estimate_size};
use crate::cache::policy::Category;

const MINUTE: u64 = 60_000;

#[test]
fn test_get_after_set() {
    let mut store = EntryStore::new(1024);
    assert!(store.set("status:a", json!({"clean": true}), MINUTE, 0));

    assert_eq!(store.get("status:a", 10), Some(json!({"clean": true})));
    assert_eq!(store.get("status:b", 10), None);
    assert_eq!((store.hits(), store.misses()), (1, 1));
}

#[test]
fn test_reclassify_hit_as_miss() {
    let mut store = EntryStore::new(1024);
    store.set("status:a", json!(1), MINUTE, 0);
    assert!(store.get("status:a", 10).is_some());

    store.reclassify_hit_as_miss();
    assert_eq!((store.hits(), store.misses()), (0, 1));
    assert!(store.contains("status:a"));
}

#[test]
fn test_expired_entry_is_removed_on_get() {
    let mut store = EntryStore::new(1024);
    store.set("status:a", json!(1), MINUTE, 0);

    assert_eq!(store.get("status:a", MINUTE), Some(json!(1)));
    // The read above refreshed the timestamp to MINUTE
    assert_eq!(store.get("status:a", 2 * MINUTE + 1), None);
    assert!(!store.contains("status:a"));
    assert_eq!(store.memory_bytes(), 0);
}

#[test]
fn test_budget_evicts_oldest_first() {
    let value = json!("0123456789");
    let size = estimate_size(&value);
    let mut store = EntryStore::new(size * 3);

    store.set("commits:a", value.clone(), MINUTE, 1);
    store.set("commits:b", value.clone(), MINUTE, 2);
    store.set("commits:c", value.clone(), MINUTE, 3);
    // Touch "a" so that "b" becomes the oldest
    store.get("commits:a", 4);
    store.set("commits:d", value, MINUTE, 5);

    assert!(store.contains("commits:a"));
    assert!(!store.contains("commits:b"));
    assert!(store.contains("commits:c"));
    assert!(store.contains("commits:d"));
    assert!(store.memory_bytes() <= store.budget_bytes());
}

#[test]
fn test_equal_timestamps_evict_in_insertion_order() {
    let value = json!(12345);
    let size = estimate_size(&value);
    let mut store = EntryStore::new(size * 2);

    store.set("diff:first", value.clone(), MINUTE, 0);
    store.set("diff:second", value.clone(), MINUTE, 0);
    store.set("diff:third", value, MINUTE, 0);

    assert!(!store.contains("diff:first"));
    assert_eq!(store.len(), 2);
}

#[test]
fn test_oversized_value_is_rejected() {
    let mut store = EntryStore::new(8);
    store.set("search:q", json!(1), MINUTE, 0);

    assert!(!store.set("search:q", json!("far too long for the budget"), MINUTE, 0));
    assert!(!store.contains("search:q"));
    assert_eq!(store.memory_bytes(), 0);
}

#[test]
fn test_overwrite_replaces_memory_accounting() {
    let mut store = EntryStore::new(1024);
    store.set("status:a", json!("long value here"), MINUTE, 0);
    store.set("status:a", json!(1), MINUTE, 0);

    assert_eq!(store.len(), 1);
    assert_eq!(store.memory_bytes(), estimate_size(&json!(1)));
}

#[test]
fn test_delete_matching() {
    let mut store = EntryStore::new(1024);
    store.set("status:a", json!(1), MINUTE, 0);
    store.set("status:b", json!(2), MINUTE, 0);
    store.set("branches:a", json!(3), MINUTE, 0);

    let removed = store.delete_matching(|key| key.ends_with(":a"));

    assert_eq!(removed, 2);
    assert_eq!(store.len(), 1);
    assert_eq!(store.memory_bytes(), estimate_size(&json!(2)));
}

#[test]
fn test_sweep_expired() {
    let mut store = EntryStore::new(1024);
    store.set("status:a", json!(1), 1_000, 0);
    store.set("commits:a", json!(2), 10 * MINUTE, 0);

    assert_eq!(store.sweep_expired(1_001), 1);
    assert!(store.contains("commits:a"));
    assert_eq!(store.sweep_expired(1_002), 0);
}

#[test]
fn test_enforce_category_limit_keeps_newest() {
    let mut store = EntryStore::new(4096);
    for (i, repo) in ["a", "b", "c", "d"].iter().enumerate() {
        store.set(&format!("branches:{repo}"), json!(i), MINUTE, i as u64);
    }
    store.set("status:a", json!(0), MINUTE, 0);

    let removed = store.enforce_category_limit(Category::Branches, 2);

    assert_eq!(removed, 2);
    assert!(store.contains("branches:c"));
    assert!(store.contains("branches:d"));
    assert!(store.contains("status:a"));
    assert_eq!(store.enforce_category_limit(Category::Branches, 2), 0);
}

#[test]
fn test_snapshot_and_restore() {
    let mut store = EntryStore::new(1024);
    store.set("status:a", json!(1), 1_000, 0);
    store.set("commits:a:all:50", json!([1, 2]), 10 * MINUTE, 0);
    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].key, "commits:a:all:50");

    let mut fresh = EntryStore::new(1024);
    let loaded = fresh.restore(snapshot, 5_000);

    assert_eq!(loaded, 1);
    assert_eq!(fresh.get("commits:a:all:50", 5_000), Some(json!([1, 2])));
    assert_eq!(fresh.get("status:a", 5_000), None);
}

#[test]
fn test_category_counts() {
    let mut store = EntryStore::new(1024);
    store.set("status:a", json!(1), MINUTE, 0);
    store.set("status:b", json!(1), MINUTE, 0);
    store.set("remote:a:origin", json!(1), MINUTE, 0);

    insta::assert_debug_snapshot!(store.category_counts(), @r"
    {
        Status: 2,
        Remote: 1,
    }
    ");
}
