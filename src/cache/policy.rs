// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cache categories and their expiry/size policies.
//!
//! ```text
//! category     ttl     max entries
//! repository   5 min   1000
//! commits      10 min  5000
//! branches     3 min   2000
//! status       30 s    1000
//! files        2 min   3000
//! diff         5 min   1000
//! search       10 min  500
//! remote       15 min  1000
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// A named partition of the cache. The category is the key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Repository,
    Commits,
    Branches,
    Status,
    Files,
    Diff,
    Search,
    Remote,
}

impl Category {
    pub const ALL: [Self; 8] = [
        Self::Repository,
        Self::Commits,
        Self::Branches,
        Self::Status,
        Self::Files,
        Self::Diff,
        Self::Search,
        Self::Remote,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Repository => "repository",
            Self::Commits => "commits",
            Self::Branches => "branches",
            Self::Status => "status",
            Self::Files => "files",
            Self::Diff => "diff",
            Self::Search => "search",
            Self::Remote => "remote",
        }
    }

    /// Category of a cache key, read from its prefix.
    #[must_use]
    pub fn of_key(key: &str) -> Option<Self> {
        let prefix = key.split(':').next()?;
        prefix.parse().ok()
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CacheError::UnknownCategory(s.to_string()))
    }
}

/// Expiry and size limit of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryPolicy {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl CategoryPolicy {
    #[must_use]
    pub const fn new(ttl: Duration, max_entries: usize) -> Self {
        Self { ttl, max_entries }
    }

    #[must_use]
    pub fn ttl_ms(&self) -> u64 {
        u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Policy for every category. Read-only once the cache is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    policies: [CategoryPolicy; 8],
}

impl Default for PolicyTable {
    fn default() -> Self {
        const fn secs(n: u64) -> Duration {
            Duration::from_secs(n)
        }
        Self {
            policies: [
                CategoryPolicy::new(secs(5 * 60), 1000),
                CategoryPolicy::new(secs(10 * 60), 5000),
                CategoryPolicy::new(secs(3 * 60), 2000),
                CategoryPolicy::new(secs(30), 1000),
                CategoryPolicy::new(secs(2 * 60), 3000),
                CategoryPolicy::new(secs(5 * 60), 1000),
                CategoryPolicy::new(secs(10 * 60), 500),
                CategoryPolicy::new(secs(15 * 60), 1000),
            ],
        }
    }
}

impl PolicyTable {
    #[must_use]
    pub const fn get(&self, category: Category) -> CategoryPolicy {
        self.policies[category.index()]
    }

    /// Replaces the policy of one category.
    #[must_use]
    pub const fn with(mut self, category: Category, policy: CategoryPolicy) -> Self {
        self.policies[category.index()] = policy;
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, CategoryPolicy)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}
