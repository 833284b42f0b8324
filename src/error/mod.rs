// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error handling module.
//!
//! ```text
//!            FleetError (~24 bytes)
//!                    |
//!   +--------+-------+--------+---------+
//!   |        |       |        |         |
//!   v        v       v        v         v
//!  Git     Cache   Config  Operation  Io/Other
//!  Box      Box     Box      Box      Box<str>
//!
//! Sub-errors (unboxed internally):
//!   Git        CommandFailed, Spawn, InvalidOutput, RepoNotFound
//!   Cache      Persistence, Snapshot, UnknownCategory
//!   Config     ParseError, InvalidValue, MissingKey
//!   Operation  UnknownOperation, MissingParameter
//! ```
//!
//! Cache misses are never errors. Per-repository failures during a bulk run
//! are recorded in the run's result map instead of being returned.

use thiserror::Error;

/// Convenience alias for `anyhow::Result`.
pub type Result<T> = anyhow::Result<T>;

/// Result type using [`FleetError`].
pub type FleetResult<T> = std::result::Result<T, FleetError>;

/// Top-level error type.
///
/// All sub-errors are boxed to keep this enum at ~24 bytes on the stack.
#[derive(Debug, Error)]
pub enum FleetError {
    /// Git backend failure.
    #[error("git error: {0}")]
    Git(#[from] Box<GitError>),

    /// Cache persistence or lookup error.
    #[error("cache error: {0}")]
    Cache(#[from] Box<CacheError>),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] Box<ConfigError>),

    /// Invalid operation request.
    #[error("operation error: {0}")]
    Operation(#[from] Box<OperationError>),

    /// I/O error.
    #[error("io error: {0}")]
    Io(Box<std::io::Error>),

    /// Generic error with message.
    #[error("{0}")]
    Other(Box<str>),
}

impl FleetError {
    /// Create a [`FleetError::Other`] from a message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into().into_boxed_str())
    }
}

/// Macro to generate `From` implementations that box the source error.
macro_rules! impl_from_boxed {
    ($($error:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$error> for FleetError {
                fn from(err: $error) -> Self {
                    FleetError::$variant(Box::new(err))
                }
            }
        )+
    };
}

impl_from_boxed! {
    GitError => Git,
    CacheError => Cache,
    ConfigError => Config,
    OperationError => Operation,
    std::io::Error => Io,
}

// --- Git Errors ---

/// Errors raised by a git backend.
#[derive(Debug, Error)]
pub enum GitError {
    /// Repository not found at the specified path.
    #[error("repository not found: {path}")]
    RepoNotFound { path: String },

    /// Git command exited unsuccessfully.
    #[error("git command failed: {command} - {message}")]
    CommandFailed { command: String, message: String },

    /// The git executable could not be started.
    #[error("failed to execute git: {0}")]
    Spawn(#[source] std::io::Error),

    /// Git produced output that could not be parsed.
    #[error("unexpected output from {command}: {message}")]
    InvalidOutput { command: String, message: String },
}

// --- Cache Errors ---

/// Cache errors. None of these stop in-memory operation.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The persistence medium is unavailable.
    #[error("persistence unavailable at '{path}': {source}")]
    Persistence {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A persisted snapshot could not be encoded or decoded.
    #[error("invalid cache snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// A category name outside the fixed vocabulary.
    #[error("unknown cache category '{0}'")]
    UnknownCategory(String),
}

// --- Config Errors ---

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration.
    #[error("failed to parse config '{path}': {message}")]
    ParseError { path: String, message: String },

    /// Missing required configuration key.
    #[error("missing required config key '{key}' in section '[{section}]'")]
    MissingKey { section: String, key: String },

    /// Invalid configuration value.
    #[error("invalid value for '{key}' in section '[{section}]': {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
}

// --- Operation Errors ---

/// Invalid bulk operation requests.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Operation name outside the fixed vocabulary.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// A required parameter was not supplied.
    #[error("operation '{operation}' requires parameter '{parameter}'")]
    MissingParameter {
        operation: &'static str,
        parameter: &'static str,
    },
}

#[cfg(test)]
mod tests;
