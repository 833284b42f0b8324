// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Backend abstraction layer.
//!
//! ```text
//! GitBackend::invoke(operation, path, params) -> opaque JSON | GitError
//!     |                         |
//!     v                         v
//! ShellBackend (git CLI)   ScriptedBackend (canned replies, tests/demos)
//! ```
//!
//! The executor imposes its own timeout around `invoke`; backends do not
//! need to know about it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::{Value, json};

use super::operation::{Operation, OperationParams};
use crate::error::GitError;

/// Result of one backend invocation.
pub type BackendResult = Result<Value, GitError>;

/// A git engine invoked by operation name.
///
/// Methods return `BoxFuture` so that the trait stays object safe and the
/// executor can hold an `Arc<dyn GitBackend>`.
pub trait GitBackend: Send + Sync {
    /// Runs `operation` against the repository at `path`.
    fn invoke<'a>(
        &'a self,
        operation: Operation,
        path: &'a Path,
        params: &'a OperationParams,
    ) -> BoxFuture<'a, BackendResult>;
}

/// A canned reply for [`ScriptedBackend`].
#[derive(Debug, Clone)]
pub enum Reply {
    /// Succeed with the given payload.
    Succeed(Value),
    /// Fail with the given message.
    Fail(String),
    /// Wait, then apply the inner reply.
    Delay(Duration, Box<Self>),
    /// Never settle.
    Hang,
}

impl Reply {
    /// Shorthand for `Delay(duration, Succeed(payload))`.
    #[must_use]
    pub fn delayed(duration: Duration, reply: Self) -> Self {
        Self::Delay(duration, Box::new(reply))
    }
}

/// Backend returning scripted replies keyed by repository path.
///
/// Paths without a script succeed immediately with
/// `{"operation": ..., "path": ...}`. Every call is recorded and the peak
/// number of concurrently running calls is tracked.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: HashMap<PathBuf, Reply>,
    operation_replies: HashMap<Operation, Reply>,
    calls: Mutex<Vec<(Operation, PathBuf)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reply for one repository path.
    #[must_use]
    pub fn with_reply(mut self, path: impl Into<PathBuf>, reply: Reply) -> Self {
        self.replies.insert(path.into(), reply);
        self
    }

    /// Sets the reply for an operation on paths without their own script.
    #[must_use]
    pub fn with_operation_reply(mut self, operation: Operation, reply: Reply) -> Self {
        self.operation_replies.insert(operation, reply);
        self
    }

    /// Calls received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<(Operation, PathBuf)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Highest number of calls that were running at the same time.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn respond(reply: Reply) -> BackendResult {
        let mut reply = reply;
        loop {
            match reply {
                Reply::Succeed(value) => return Ok(value),
                Reply::Fail(message) => {
                    return Err(GitError::CommandFailed {
                        command: "scripted".to_string(),
                        message,
                    });
                }
                Reply::Delay(duration, inner) => {
                    tokio::time::sleep(duration).await;
                    reply = *inner;
                }
                Reply::Hang => std::future::pending::<()>().await,
            }
        }
    }
}

/// Decrements the in-flight counter even if the call is dropped mid-way.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl GitBackend for ScriptedBackend {
    fn invoke<'a>(
        &'a self,
        operation: Operation,
        path: &'a Path,
        _params: &'a OperationParams,
    ) -> BoxFuture<'a, BackendResult> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((operation, path.to_path_buf()));

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlight(&self.in_flight);

            let reply = self
                .replies
                .get(path)
                .or_else(|| self.operation_replies.get(&operation))
                .cloned()
                .unwrap_or_else(|| {
                    Reply::Succeed(json!({
                        "operation": operation.as_str(),
                        "path": path.display().to_string(),
                    }))
                });
            Self::respond(reply).await
        })
    }
}

#[cfg(test)]
mod tests;
