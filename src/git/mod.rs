// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Git collaborator module.
//!
//! ```text
//!          operation.rs (vocabulary + params)
//!                    |
//!                    v
//!      ,---------------------------,
//!      |  backend (GitBackend trait) |
//!      '--+---------------------+---'
//!         |                     |
//!         v                     v
//!   ShellBackend          ScriptedBackend
//!   git CLI + parse.rs    canned replies
//!
//!   discovery.rs   ignore walk + gix  --> Vec<Repository>
//!   types.rs       Repository, RepoStatus, CommitInfo, ...
//! ```

pub mod backend;
pub mod discovery;
pub mod operation;
pub mod parse;
pub mod shell;
pub mod types;

pub use backend::{BackendResult, GitBackend, Reply, ScriptedBackend};
pub use operation::{Operation, OperationParams, OperationRequest, param};
pub use shell::ShellBackend;
pub use types::{Repository, SyncStatus};
