// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository selection arguments.
//!
//! ```text
//! --repo PATH   ← use these paths instead of [[repositories]] (can repeat)
//! --only GLOB   ← keep repositories whose name or id matches (can repeat)
//! ```

use clap::Args;
use std::path::PathBuf;

/// Which repositories a command applies to.
#[derive(Debug, Clone, Default, Args)]
pub struct SelectArgs {
    /// Repository path. Replaces the configured list when given.
    #[arg(short = 'r', long = "repo", value_name = "PATH", action = clap::ArgAction::Append)]
    pub repos: Vec<PathBuf>,

    /// Glob over repository names and ids, such as 'api-*' or 'libs/**'.
    #[arg(short = 'o', long = "only", value_name = "GLOB", action = clap::ArgAction::Append)]
    pub only: Vec<String>,
}

/// Arguments for the `discover` command.
#[derive(Debug, Clone, Args)]
pub struct DiscoverArgs {
    /// Directory to scan.
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Maximum depth below the root.
    #[arg(short = 'd', long = "max-depth", value_name = "N")]
    pub max_depth: Option<usize>,

    /// Follows symbolic links.
    #[arg(long = "follow-links")]
    pub follow_links: bool,

    /// Prints a `[[repositories]]` TOML block instead of a table.
    #[arg(long)]
    pub toml: bool,
}
