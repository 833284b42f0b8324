// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Run command arguments.
//!
//! # Parameter Sources
//!
//! ```text
//! --remote/--branch/--target/--message/--limit   string and number params
//! --force/--prune/--checkout/--include-untracked
//! --directories/--all                             flags (only set when given)
//! --param KEY=VALUE                               anything else (can repeat)
//! ```
//!
//! Dedicated flags win over `--param` for the same key.

use clap::Args;
use serde_json::Value;

use crate::cli::select::SelectArgs;
use crate::git::operation::{Operation, OperationParams, OperationRequest, param};

/// Arguments for the `run` command.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Operation to run, such as 'pull', 'create-branch' or 'status'.
    #[arg(value_name = "OPERATION")]
    pub operation: Operation,

    #[command(flatten)]
    pub select: SelectArgs,

    /// Remote name.
    #[arg(long, value_name = "NAME")]
    pub remote: Option<String>,

    /// Branch name.
    #[arg(short = 'b', long, value_name = "NAME")]
    pub branch: Option<String>,

    /// Start point for create-branch, or the reset-hard target.
    #[arg(long, value_name = "REV")]
    pub target: Option<String>,

    /// Stash message.
    #[arg(short = 'm', long, value_name = "TEXT")]
    pub message: Option<String>,

    /// Number of commits for the commits operation.
    #[arg(long, value_name = "N")]
    pub limit: Option<u64>,

    /// Force push or force branch deletion.
    #[arg(long)]
    pub force: bool,

    /// Prune remote-tracking branches on fetch.
    #[arg(long)]
    pub prune: bool,

    /// Check out the branch after create-branch.
    #[arg(long)]
    pub checkout: bool,

    /// Include untracked files when stashing.
    #[arg(long = "include-untracked")]
    pub include_untracked: bool,

    /// Remove untracked directories on clean.
    #[arg(long)]
    pub directories: bool,

    /// Include remote-tracking branches.
    #[arg(long)]
    pub all: bool,

    /// Extra parameter as KEY=VALUE. Can be specified multiple times.
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value, action = clap::ArgAction::Append)]
    pub params: Vec<(String, String)>,

    /// Overrides bulk.max_concurrency.
    #[arg(short = 'j', long = "max-concurrency", value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_concurrency: Option<u64>,

    /// Overrides bulk.timeout_secs.
    #[arg(short = 't', long = "timeout", value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Stops after the first batch that contains a failure.
    #[arg(long = "abort-on-error")]
    pub abort_on_error: bool,
}

impl RunArgs {
    /// Builds the operation request from flags and `--param` values.
    #[must_use]
    pub fn to_request(&self) -> OperationRequest {
        let mut params = OperationParams::new();
        for (key, value) in &self.params {
            params = params.with(key, parse_param_value(value));
        }

        params = params
            .with_opt(param::REMOTE, self.remote.as_deref())
            .with_opt(param::BRANCH, self.branch.as_deref())
            .with_opt(param::TARGET, self.target.as_deref())
            .with_opt(param::MESSAGE, self.message.as_deref());
        if let Some(limit) = self.limit {
            params = params.with(param::LIMIT, limit);
        }

        for (key, enabled) in [
            (param::FORCE, self.force),
            (param::PRUNE, self.prune),
            (param::CHECKOUT, self.checkout),
            (param::INCLUDE_UNTRACKED, self.include_untracked),
            (param::DIRECTORIES, self.directories),
            (param::ALL, self.all),
        ] {
            if enabled {
                params = params.with(key, true);
            }
        }

        OperationRequest::new(self.operation, params)
    }
}

/// Splits `KEY=VALUE`.
///
/// # Errors
///
/// Returns a message when there is no `=` or the key is empty.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Booleans and unsigned integers are typed, everything else is a string.
fn parse_param_value(value: &str) -> Value {
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => value
            .parse::<u64>()
            .map_or_else(|_| Value::String(value.to_string()), Value::from),
    }
}
