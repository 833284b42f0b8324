// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Operation vocabulary understood by every [`GitBackend`](super::backend::GitBackend).
//!
//! ```text
//! mutating:  pull push fetch checkout create_branch delete_branch
//!            stash reset_hard clean sync
//! queries:   status repository_info commits branches remote_status
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OperationError;

/// Parameter keys shared between operations.
pub mod param {
    pub const BRANCH: &str = "branch";
    pub const REMOTE: &str = "remote";
    pub const TARGET: &str = "target";
    pub const FORCE: &str = "force";
    pub const MESSAGE: &str = "message";
    pub const LIMIT: &str = "limit";
    pub const PRUNE: &str = "prune";
    pub const CHECKOUT: &str = "checkout";
    pub const INCLUDE_UNTRACKED: &str = "include_untracked";
    pub const DIRECTORIES: &str = "directories";
    pub const ALL: &str = "all";
}

/// A named git operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Pull,
    Push,
    Fetch,
    Checkout,
    CreateBranch,
    DeleteBranch,
    Stash,
    ResetHard,
    Clean,
    Sync,
    Status,
    RepositoryInfo,
    Commits,
    Branches,
    RemoteStatus,
}

impl Operation {
    /// Returns all operations in declaration order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Pull,
            Self::Push,
            Self::Fetch,
            Self::Checkout,
            Self::CreateBranch,
            Self::DeleteBranch,
            Self::Stash,
            Self::ResetHard,
            Self::Clean,
            Self::Sync,
            Self::Status,
            Self::RepositoryInfo,
            Self::Commits,
            Self::Branches,
            Self::RemoteStatus,
        ]
    }

    /// Returns the wire name of this operation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Push => "push",
            Self::Fetch => "fetch",
            Self::Checkout => "checkout",
            Self::CreateBranch => "create_branch",
            Self::DeleteBranch => "delete_branch",
            Self::Stash => "stash",
            Self::ResetHard => "reset_hard",
            Self::Clean => "clean",
            Self::Sync => "sync",
            Self::Status => "status",
            Self::RepositoryInfo => "repository_info",
            Self::Commits => "commits",
            Self::Branches => "branches",
            Self::RemoteStatus => "remote_status",
        }
    }

    /// Whether the operation changes repository state, making cached
    /// state for the repository stale.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Self::Status
                | Self::RepositoryInfo
                | Self::Commits
                | Self::Branches
                | Self::RemoteStatus
        )
    }

    /// Parameters that must be present for this operation.
    #[must_use]
    pub const fn required_params(&self) -> &'static [&'static str] {
        match self {
            Self::Checkout | Self::CreateBranch | Self::DeleteBranch => &[param::BRANCH],
            _ => &[],
        }
    }

    /// Checks that `params` satisfies [`Self::required_params`].
    ///
    /// # Errors
    ///
    /// Returns `OperationError::MissingParameter` naming the first absent
    /// or empty parameter.
    pub fn validate(&self, params: &OperationParams) -> Result<(), OperationError> {
        for &parameter in self.required_params() {
            if params.get_str(parameter).is_none_or(str::is_empty) {
                return Err(OperationError::MissingParameter {
                    operation: self.as_str(),
                    parameter,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| OperationError::UnknownOperation(s.to_string()))
    }
}

/// Named operation parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationParams(BTreeMap<String, Value>);

impl OperationParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a parameter.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Adds a string parameter when `value` is present.
    #[must_use]
    pub fn with_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    /// Adds a parameter only if absent.
    #[must_use]
    pub fn with_default(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.entry(key.to_string()).or_insert_with(|| value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Boolean flag; absent or non-boolean values read as `false`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// An operation together with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub operation: Operation,
    #[serde(default)]
    pub params: OperationParams,
}

impl OperationRequest {
    #[must_use]
    pub const fn new(operation: Operation, params: OperationParams) -> Self {
        Self { operation, params }
    }

    /// Shorthand for a request without parameters.
    #[must_use]
    pub fn bare(operation: Operation) -> Self {
        Self::new(operation, OperationParams::new())
    }

    /// Validates required parameters.
    ///
    /// # Errors
    ///
    /// See [`Operation::validate`].
    pub fn validate(&self) -> Result<(), OperationError> {
        self.operation.validate(&self.params)
    }
}
