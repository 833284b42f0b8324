// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Run command implementation.
//!
//! ```text
//! select repos --> Fleet::run --> results table --> persist cache
//!                     |
//!          progress snapshots --> indicatif bar
//!          Ctrl+C --> parent cancel token
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::anyhow;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::bulk::{BulkOptions, BulkOutcome, ProgressCallback, ProgressSnapshot, RunStatus};
use crate::cli::run::RunArgs;
use crate::cmd::cache::open_cache;
use crate::cmd::select::select_repositories;
use crate::config::Config;
use crate::error::Result;
use crate::fleet::Fleet;
use crate::git::shell::ShellBackend;

/// Pre-validated progress bar style for bulk runs.
fn bar_style() -> ProgressStyle {
    static STYLE: OnceLock<ProgressStyle> = OnceLock::new();
    STYLE
        .get_or_init(|| {
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
        })
        .clone()
}

fn to_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Executor options from `[bulk]`, command-line overrides, a progress bar
/// and the Ctrl+C token.
#[must_use]
pub fn bulk_options(
    args: &RunArgs,
    config: &Config,
    bar: Option<ProgressBar>,
    cancel_token: CancellationToken,
) -> BulkOptions {
    let base = config.bulk.to_options();
    let max_concurrency = args
        .max_concurrency
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(base.max_concurrency);
    let timeout = args
        .timeout_secs
        .map_or(base.timeout, Duration::from_secs);

    BulkOptions::builder()
        .with_max_concurrency(max_concurrency)
        .with_timeout(timeout)
        .with_abort_on_error(args.abort_on_error || base.abort_on_error)
        .with_cancel_token(cancel_token)
        .maybe_with_progress(bar.map(|bar| {
            Arc::new(move |snapshot: &ProgressSnapshot| {
                bar.set_position(to_u64(snapshot.settled()));
                if snapshot.failed > 0 {
                    bar.set_message(format!("{} failed", snapshot.failed));
                }
            }) as ProgressCallback
        }))
        .build()
}

/// Main handler for run command.
///
/// # Errors
///
/// Returns an error if the request is invalid, any repository failed, or the
/// run was interrupted.
pub async fn run_run_command(args: &RunArgs, config: &Config) -> Result<()> {
    let repositories = select_repositories(config, &args.select)?;
    if repositories.is_empty() {
        println!("No repositories selected");
        return Ok(());
    }

    let cache = open_cache(config)?;
    let fleet = Fleet::new(Arc::new(ShellBackend::new()), Arc::clone(&cache));
    let request = args.to_request();

    let cancel_token = CancellationToken::new();
    let interrupt = cancel_token.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received Ctrl+C, cancelling remaining repositories...");
            interrupt.cancel();
        }
    });

    let bar = ProgressBar::new(to_u64(repositories.len())).with_style(bar_style());
    let options = bulk_options(args, config, Some(bar.clone()), cancel_token);

    let run = fleet.run(&repositories, &request, &options).await;
    ctrl_c.abort();
    bar.finish_and_clear();
    let run = run?;

    for rejected in &run.invalid {
        println!(
            "skipped {} ({}): {}",
            rejected.repository.name,
            rejected.repository.path.display(),
            rejected.reason
        );
    }
    for line in format_results(&run.outcome) {
        println!("{line}");
    }
    println!("{}", format_summary(&run.outcome));

    if let Err(e) = cache.persist_now() {
        tracing::warn!(error = %e, "Cache persistence failed");
    }

    let stats = run.outcome.stats();
    if run.outcome.cancelled {
        Err(anyhow!(
            "run {} cancelled, {} repositories not attempted",
            run.outcome.run_id,
            stats.pending
        ))
    } else if stats.failed > 0 {
        Err(anyhow!(
            "{} of {} repositories failed",
            stats.failed,
            stats.total
        ))
    } else {
        Ok(())
    }
}

/// One line per repository: id, status, duration and error or query result.
#[must_use]
pub fn format_results(outcome: &BulkOutcome) -> Vec<String> {
    let width = outcome.results.keys().map(String::len).max().unwrap_or(0);
    let show_values = !outcome.operation.is_mutating();

    outcome
        .results
        .values()
        .map(|result| {
            let duration = result
                .duration
                .map_or_else(|| "-".to_string(), |d| format!("{:.2}s", d.as_secs_f64()));
            let detail = match (&result.status, &result.error, &result.result) {
                (RunStatus::Error, Some(error), _) => error.clone(),
                (RunStatus::Completed, _, Some(value)) if show_values => value.to_string(),
                _ => String::new(),
            };
            format!(
                "{:<width$}  {:<9}  {:>7}  {}",
                result.repository_id,
                result.status.as_str(),
                duration,
                detail
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

/// Counts line printed after the table.
#[must_use]
pub fn format_summary(outcome: &BulkOutcome) -> String {
    let stats = outcome.stats();
    let average = stats
        .average_duration
        .map_or_else(String::new, |d| format!(", average {:.2}s", d.as_secs_f64()));
    format!(
        "{}: {} total, {} completed, {} failed, {} pending{average}",
        outcome.operation, stats.total, stats.completed, stats.failed, stats.pending
    )
}
