// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Git CLI backend.
//!
//! ```text
//! invoke(op) --> git <args> (tokio::process, kill_on_drop)
//!                  |
//!        mutations: {"output": stdout}
//!        queries:   parse.rs --> typed JSON
//! ```
//!
//! Child processes are killed when the invocation future is dropped, so a
//! timed-out or aborted call does not leave git running.

use std::path::Path;
use std::process::Stdio;

use futures_util::future::BoxFuture;
use serde_json::json;
use tokio::process::Command;
use tracing::{debug, trace};

use super::backend::{BackendResult, GitBackend};
use super::operation::{Operation, OperationParams, param};
use super::parse::{BRANCH_FORMAT, LOG_FORMAT, parse_branches, parse_log, parse_status};
use super::types::{RemoteStatus, RepositoryInfo};
use crate::error::GitError;

/// Default number of commits returned by [`Operation::Commits`].
pub const DEFAULT_COMMIT_LIMIT: u64 = 50;

const DEFAULT_REMOTE: &str = "origin";

/// Backend that shells out to the `git` executable.
#[derive(Debug, Clone)]
pub struct ShellBackend {
    program: String,
}

impl Default for ShellBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellBackend {
    /// Creates a backend that runs `git` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }

    /// Uses a different git executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Executes a git command and returns its trimmed stdout.
    /// ALWAYS sets `GCM_INTERACTIVE=never` and `GIT_TERMINAL_PROMPT=0`.
    ///
    /// # Errors
    ///
    /// Returns `GitError::Spawn` if git cannot be started and
    /// `GitError::CommandFailed` with its stderr on a non-zero exit.
    async fn git<S: AsRef<str> + std::fmt::Debug + Sync>(
        &self,
        args: &[S],
        cwd: &Path,
    ) -> Result<String, GitError> {
        trace!(cwd = %cwd.display(), args = ?args, "git");
        let output = Command::new(&self.program)
            .args(args.iter().map(AsRef::<str>::as_ref))
            .current_dir(cwd)
            .env("GCM_INTERACTIVE", "never")
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(GitError::Spawn)?;

        if !output.status.success() {
            let joined: Vec<&str> = args.iter().map(AsRef::<str>::as_ref).collect();
            return Err(GitError::CommandFailed {
                command: format!("git {}", joined.join(" ")),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    /// Executes a mutating command, wrapping stdout as `{"output": ...}`.
    async fn git_output(&self, args: &[String], cwd: &Path) -> BackendResult {
        let stdout = self.git(args, cwd).await?;
        Ok(json!({ "output": stdout }))
    }

    /// Dispatches `operation` against the repository at `path`.
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepoNotFound` if `path` is not a directory, a
    /// `GitError::CommandFailed` for a missing required parameter or a failing
    /// git command, and `GitError::InvalidOutput` if query output cannot be parsed.
    async fn run(&self, operation: Operation, path: &Path, params: &OperationParams) -> BackendResult {
        if !path.is_dir() {
            return Err(GitError::RepoNotFound {
                path: path.display().to_string(),
            });
        }
        debug!(operation = %operation, path = %path.display(), "Running git operation");

        match operation {
            Operation::Pull => self.git_output(&pull_args(params), path).await,
            Operation::Push => self.git_output(&push_args(params), path).await,
            Operation::Fetch => self.git_output(&fetch_args(params), path).await,
            Operation::Checkout => self.git_output(&checkout_args(params)?, path).await,
            Operation::CreateBranch => {
                self.git_output(&create_branch_args(params)?, path).await
            }
            Operation::DeleteBranch => {
                self.git_output(&delete_branch_args(params)?, path).await
            }
            Operation::Stash => self.git_output(&stash_args(params), path).await,
            Operation::ResetHard => self.git_output(&reset_hard_args(params), path).await,
            Operation::Clean => self.git_output(&clean_args(params), path).await,
            Operation::Sync => {
                let pulled = self.git(&pull_args(params), path).await?;
                let pushed = self.git(&sync_push_args(params), path).await?;
                Ok(json!({ "pull": pulled, "push": pushed }))
            }
            Operation::Status => {
                let output = self.git(&STATUS_ARGS, path).await?;
                to_json(&parse_status(&output))
            }
            Operation::RepositoryInfo => self.repository_info(path).await,
            Operation::Commits => {
                let output = self.git(&commits_args(params), path).await?;
                let commits = parse_log(&output).map_err(|message| GitError::InvalidOutput {
                    command: "git log".to_string(),
                    message,
                })?;
                to_json(&commits)
            }
            Operation::Branches => {
                let local = self.git(&["for-each-ref", BRANCH_FORMAT, "refs/heads"], path).await?;
                let mut branches = parse_branches(&local, false);
                if params.flag(param::ALL) {
                    let remote = self
                        .git(&["for-each-ref", BRANCH_FORMAT, "refs/remotes"], path)
                        .await?;
                    branches.extend(parse_branches(&remote, true));
                }
                to_json(&branches)
            }
            Operation::RemoteStatus => self.remote_status(path, params).await,
        }
    }

    /// Branch, head, `origin` URL and dirtiness. Only the dirtiness check is
    /// required to succeed; the rest is `None` on an empty or detached repository.
    async fn repository_info(&self, path: &Path) -> BackendResult {
        let current_branch = self.git(&["symbolic-ref", "--short", "HEAD"], path).await.ok();
        let head = self.git(&["rev-parse", "HEAD"], path).await.ok();
        let remote_url = self
            .git(&["remote", "get-url", DEFAULT_REMOTE], path)
            .await
            .ok();
        let porcelain = self.git(&["status", "--porcelain"], path).await?;
        to_json(&RepositoryInfo {
            path: path.to_path_buf(),
            current_branch,
            head,
            remote_url,
            is_dirty: !porcelain.trim().is_empty(),
        })
    }

    /// Ahead/behind counts against the upstream, reported only when the
    /// upstream lives on the requested remote (default `origin`).
    async fn remote_status(&self, path: &Path, params: &OperationParams) -> BackendResult {
        let remote = params.get_str(param::REMOTE).unwrap_or(DEFAULT_REMOTE);
        let url = self.git(&["remote", "get-url", remote], path).await.ok();
        let output = self.git(&STATUS_ARGS, path).await?;
        let status = parse_status(&output);
        let tracks_remote = status
            .upstream
            .as_deref()
            .is_some_and(|u| u.starts_with(&format!("{remote}/")));
        let (ahead, behind) = if tracks_remote {
            (status.ahead, status.behind)
        } else {
            (0, 0)
        };
        to_json(&RemoteStatus {
            remote: remote.to_string(),
            url,
            upstream: status.upstream.filter(|_| tracks_remote),
            ahead,
            behind,
        })
    }
}

impl GitBackend for ShellBackend {
    fn invoke<'a>(
        &'a self,
        operation: Operation,
        path: &'a Path,
        params: &'a OperationParams,
    ) -> BoxFuture<'a, BackendResult> {
        Box::pin(self.run(operation, path, params))
    }
}

const STATUS_ARGS: [&str; 3] = ["status", "--porcelain=v1", "--branch"];

// --- Argument builders ---

fn args(base: &[&str]) -> Vec<String> {
    base.iter().map(ToString::to_string).collect()
}

/// Appends `[remote] [branch]`. A branch without a remote gets `origin` in
/// front of it, since git reads a lone argument as the remote.
fn push_remote_branch(args: &mut Vec<String>, params: &OperationParams) {
    let branch = params.get_str(param::BRANCH);
    match (params.get_str(param::REMOTE), branch) {
        (Some(remote), branch) => {
            args.push(remote.to_string());
            args.extend(branch.map(str::to_string));
        }
        (None, Some(branch)) => args.extend([DEFAULT_REMOTE.to_string(), branch.to_string()]),
        (None, None) => {}
    }
}

/// `git pull --quiet [remote] [branch]`.
#[must_use]
pub fn pull_args(params: &OperationParams) -> Vec<String> {
    let mut argv = args(&["pull", "--quiet"]);
    push_remote_branch(&mut argv, params);
    argv
}

/// `git push --quiet [--force-with-lease] [remote] [branch]`.
///
/// `force` maps to `--force-with-lease`, never to a plain `--force`.
#[must_use]
pub fn push_args(params: &OperationParams) -> Vec<String> {
    let mut argv = args(&["push", "--quiet"]);
    if params.flag(param::FORCE) {
        argv.push("--force-with-lease".to_string());
    }
    push_remote_branch(&mut argv, params);
    argv
}

/// Push half of `sync`. Never forced.
fn sync_push_args(params: &OperationParams) -> Vec<String> {
    let mut argv = args(&["push", "--quiet"]);
    push_remote_branch(&mut argv, params);
    argv
}

/// `git fetch --quiet [--prune] <remote|--all>`.
#[must_use]
pub fn fetch_args(params: &OperationParams) -> Vec<String> {
    let mut argv = args(&["fetch", "--quiet"]);
    if params.flag(param::PRUNE) {
        argv.push("--prune".to_string());
    }
    argv.push(params.get_str(param::REMOTE).unwrap_or("--all").to_string());
    argv
}

/// `git checkout -q <branch>`, without the detached-head advice.
///
/// # Errors
///
/// Returns `GitError::CommandFailed` if `branch` is missing or empty.
pub fn checkout_args(params: &OperationParams) -> Result<Vec<String>, GitError> {
    let branch = required(Operation::Checkout, params, param::BRANCH)?;
    Ok(args(&["-c", "advice.detachedHead=false", "checkout", "-q", branch]))
}

/// `git branch <branch> [target]`, or `git checkout -q -b <branch> [target]`
/// when `checkout` is set.
///
/// # Errors
///
/// Returns `GitError::CommandFailed` if `branch` is missing or empty.
pub fn create_branch_args(params: &OperationParams) -> Result<Vec<String>, GitError> {
    let branch = required(Operation::CreateBranch, params, param::BRANCH)?;
    let mut argv = if params.flag(param::CHECKOUT) {
        args(&["checkout", "-q", "-b", branch])
    } else {
        args(&["branch", branch])
    };
    argv.extend(params.get_str(param::TARGET).map(str::to_string));
    Ok(argv)
}

/// `git branch -d <branch>`, or `-D` when `force` is set.
///
/// # Errors
///
/// Returns `GitError::CommandFailed` if `branch` is missing or empty.
pub fn delete_branch_args(params: &OperationParams) -> Result<Vec<String>, GitError> {
    let branch = required(Operation::DeleteBranch, params, param::BRANCH)?;
    let flag = if params.flag(param::FORCE) { "-D" } else { "-d" };
    Ok(args(&["branch", flag, branch]))
}

/// `git stash push --quiet [--include-untracked] [-m <message>]`.
#[must_use]
pub fn stash_args(params: &OperationParams) -> Vec<String> {
    let mut argv = args(&["stash", "push", "--quiet"]);
    if params.flag(param::INCLUDE_UNTRACKED) {
        argv.push("--include-untracked".to_string());
    }
    if let Some(message) = params.get_str(param::MESSAGE) {
        argv.extend(["-m".to_string(), message.to_string()]);
    }
    argv
}

/// `git reset --hard --quiet <target>`. The target defaults to `HEAD`.
#[must_use]
pub fn reset_hard_args(params: &OperationParams) -> Vec<String> {
    let target = params.get_str(param::TARGET).unwrap_or("HEAD");
    args(&["reset", "--hard", "--quiet", target])
}

/// `git clean -f --quiet [-d]`.
#[must_use]
pub fn clean_args(params: &OperationParams) -> Vec<String> {
    let mut argv = args(&["clean", "-f", "--quiet"]);
    if params.flag(param::DIRECTORIES) {
        argv.push("-d".to_string());
    }
    argv
}

/// `git log <format> -n <limit> [branch]`, with [`DEFAULT_COMMIT_LIMIT`]
/// when no limit is given.
#[must_use]
pub fn commits_args(params: &OperationParams) -> Vec<String> {
    let limit = params
        .get_u64(param::LIMIT)
        .unwrap_or(DEFAULT_COMMIT_LIMIT)
        .to_string();
    let mut argv = args(&["log", LOG_FORMAT, "-n", &limit]);
    argv.extend(params.get_str(param::BRANCH).map(str::to_string));
    argv
}

fn required<'a>(
    operation: Operation,
    params: &'a OperationParams,
    name: &'static str,
) -> Result<&'a str, GitError> {
    params
        .get_str(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GitError::CommandFailed {
            command: format!("git {operation}"),
            message: format!("missing parameter '{name}'"),
        })
}

fn to_json<T: serde::Serialize>(value: &T) -> BackendResult {
    serde_json::to_value(value).map_err(|e| GitError::InvalidOutput {
        command: "serialize".to_string(),
        message: e.to_string(),
    })
}
