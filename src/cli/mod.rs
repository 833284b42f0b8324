// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI module for gitfleet using clap derive.
//!
//! # Command Structure
//!
//! ```text
//! gitfleet [global options] <command>
//! version
//! options
//! sources
//! run <operation> [--remote/--branch/...] [--param K=V] [--repo PATH]... [--only GLOB]
//! validate [--repo PATH]... [--only GLOB]
//! discover <root> [--max-depth N]
//! warm [--repo PATH]... [--only GLOB]
//! cache {stats|clear}
//! ```

pub mod cache;
pub mod global;
pub mod run;
pub mod select;


use crate::cli::cache::CacheArgs;
use crate::cli::global::GlobalOptions;
use crate::cli::run::RunArgs;
use crate::cli::select::{DiscoverArgs, SelectArgs};
use clap::{Parser, Subcommand};

/// Bulk Git operations across many repositories.
#[derive(Debug, Parser)]
#[command(
    name = "gitfleet",
    author,
    version,
    about = "Bulk Git operations with a repository-state cache",
    long_about = "gitfleet Copyright (C) 2026 Romeo Ahmed\n\
                  This program comes with ABSOLUTELY NO WARRANTY\n\
                  This is free software, and you are welcome to redistribute it\n\
                  under certain conditions; see LICENSE for details.\n\n\
                  Runs one git operation across many repositories in bounded\n\
                  batches and keeps a cache of repository state. See\n\
                  `gitfleet <command> --help` for more information about a command.",
    after_help = "CONFIGURATION:\n\n\
                  gitfleet reads `gitfleet.toml` from the current directory if it\n\
                  exists, then every file given with --config, then GITFLEET_*\n\
                  environment variables (GITFLEET_BULK__MAX_CONCURRENCY=8), then\n\
                  --set overrides. Later sources win."
)]
pub struct Cli {
    /// Global options shared by all commands
    #[command(flatten)]
    pub global: GlobalOptions,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shows the version.
    #[command(visible_alias = "-v")]
    Version,

    /// Lists all options and their effective values.
    Options,

    /// Lists the configuration files that were loaded.
    Sources,

    /// Runs an operation across the selected repositories.
    Run(RunArgs),

    /// Checks the selected repositories without running anything.
    Validate(SelectArgs),

    /// Finds git repositories below a directory.
    Discover(DiscoverArgs),

    /// Fills the cache for the selected repositories.
    Warm(SelectArgs),

    /// Inspects or clears the persisted cache.
    Cache(CacheArgs),
}

/// Parses command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses command-line arguments from an iterator.
pub fn parse_from<I, T>(iter: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::parse_from(iter)
}

/// Tries to parse command-line arguments, returning an error on failure.
///
/// # Errors
///
/// Returns a `clap::Error` if the arguments are invalid or if help/version information
/// was requested.
pub fn try_parse() -> Result<Cli, clap::Error> {
    Cli::try_parse()
}
