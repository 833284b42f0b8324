// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Keyed store of time-stamped JSON values.
//!
//! ```text
//! set(key, value, ttl)
//!   size = serialized length of value
//!   while used + size > budget: evict oldest (timestamp, seq)
//!   insert, used += size
//!
//! get(key)
//!   expired (now > timestamp + ttl) --> remove, miss
//!   otherwise                       --> timestamp = now, hit
//! ```
//!
//! The store does no locking and reads no clock; the caller passes `now`.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::persist::SnapshotEntry;
use super::policy::Category;

#[derive(Debug, Clone)]
struct Entry {
    data: Value,
    timestamp_ms: u64,
    ttl_ms: u64,
    size: usize,
    /// Access order, breaks ties between equal timestamps.
    seq: u64,
}

impl Entry {
    const fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.timestamp_ms.saturating_add(self.ttl_ms)
    }

    const fn age_key(&self) -> (u64, u64) {
        (self.timestamp_ms, self.seq)
    }
}

/// Estimated memory footprint of a value.
#[must_use]
pub fn estimate_size(value: &Value) -> usize {
    serde_json::to_vec(value).map_or(0, |bytes| bytes.len())
}

/// Entry store with a global memory budget.
#[derive(Debug)]
pub struct EntryStore {
    entries: HashMap<String, Entry>,
    memory_bytes: usize,
    budget_bytes: usize,
    seq: u64,
    hits: u64,
    misses: u64,
}

impl EntryStore {
    #[must_use]
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            memory_bytes: 0,
            budget_bytes,
            seq: 0,
            hits: 0,
            misses: 0,
        }
    }

    const fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Returns the value for `key`, refreshing its timestamp.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get(&mut self, key: &str, now_ms: u64) -> Option<Value> {
        let expired = match self.entries.get(key) {
            None => {
                self.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired(now_ms),
        };

        if expired {
            trace!(key, "Cache entry expired");
            self.remove(key);
            self.misses += 1;
            return None;
        }

        let seq = self.next_seq();
        self.hits += 1;
        self.entries.get_mut(key).map(|entry| {
            entry.timestamp_ms = now_ms;
            entry.seq = seq;
            entry.data.clone()
        })
    }

    /// Turns the last counted hit into a miss, for a value the caller could
    /// not use.
    pub const fn reclassify_hit_as_miss(&mut self) {
        self.hits = self.hits.saturating_sub(1);
        self.misses += 1;
    }

    /// Inserts or overwrites `key`, evicting oldest entries to stay within budget.
    ///
    /// Returns `false` when the value alone is larger than the whole budget;
    /// any previous value under `key` is dropped in that case.
    pub fn set(&mut self, key: &str, data: Value, ttl_ms: u64, now_ms: u64) -> bool {
        self.insert_at(key, data, ttl_ms, now_ms)
    }

    fn insert_at(&mut self, key: &str, data: Value, ttl_ms: u64, timestamp_ms: u64) -> bool {
        let size = estimate_size(&data);
        self.remove(key);

        if size > self.budget_bytes {
            warn!(
                key,
                size,
                budget = self.budget_bytes,
                "Value exceeds cache memory budget, not stored"
            );
            return false;
        }

        while self.memory_bytes + size > self.budget_bytes && !self.entries.is_empty() {
            self.evict_oldest();
        }

        let seq = self.next_seq();
        self.memory_bytes += size;
        self.entries.insert(
            key.to_string(),
            Entry {
                data,
                timestamp_ms,
                ttl_ms,
                size,
                seq,
            },
        );
        true
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.memory_bytes = self.memory_bytes.saturating_sub(entry.size);
                true
            }
            None => false,
        }
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.age_key())
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            debug!(key = %key, "Evicting cache entry under memory pressure");
            self.remove(&key);
        }
    }

    /// Removes every entry whose key satisfies `predicate`.
    pub fn delete_matching(&mut self, mut predicate: impl FnMut(&str) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        self.recompute_memory();
        before - self.entries.len()
    }

    /// Removes all expired entries.
    pub fn sweep_expired(&mut self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now_ms));
        self.recompute_memory();
        before - self.entries.len()
    }

    /// Drops the oldest entries of `category` beyond `max_entries`.
    pub fn enforce_category_limit(&mut self, category: Category, max_entries: usize) -> usize {
        let mut members: Vec<(u64, u64, String)> = self
            .entries
            .iter()
            .filter(|(key, _)| Category::of_key(key) == Some(category))
            .map(|(key, entry)| (entry.timestamp_ms, entry.seq, key.clone()))
            .collect();

        if members.len() <= max_entries {
            return 0;
        }

        members.sort_unstable();
        let excess = members.len() - max_entries;
        for (_, _, key) in members.into_iter().take(excess) {
            self.remove(&key);
        }
        debug!(category = %category, removed = excess, "Trimmed cache category");
        excess
    }

    fn recompute_memory(&mut self) {
        self.memory_bytes = self.entries.values().map(|e| e.size).sum();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.memory_bytes = 0;
    }

    /// Point-in-time copy of all entries, for persistence.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SnapshotEntry> {
        let mut entries: Vec<SnapshotEntry> = self
            .entries
            .iter()
            .map(|(key, entry)| SnapshotEntry {
                key: key.clone(),
                data: entry.data.clone(),
                timestamp_ms: entry.timestamp_ms,
                ttl_ms: entry.ttl_ms,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Loads persisted entries, skipping expired ones.
    ///
    /// Entries are inserted oldest first so that budget pressure evicts the
    /// oldest persisted values.
    pub fn restore(&mut self, mut entries: Vec<SnapshotEntry>, now_ms: u64) -> usize {
        entries.sort_by_key(|e| e.timestamp_ms);
        let mut loaded = 0;
        for entry in entries {
            if now_ms > entry.timestamp_ms.saturating_add(entry.ttl_ms) {
                continue;
            }
            if self.insert_at(&entry.key, entry.data, entry.ttl_ms, entry.timestamp_ms) {
                loaded += 1;
            }
        }
        loaded
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub const fn memory_bytes(&self) -> usize {
        self.memory_bytes
    }

    #[must_use]
    pub const fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }

    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.misses
    }

    /// Number of resident entries per category.
    #[must_use]
    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for key in self.entries.keys() {
            if let Some(category) = Category::of_key(key) {
                *counts.entry(category).or_insert(0) += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests;
