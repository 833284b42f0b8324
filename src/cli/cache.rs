// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cache command arguments.

use clap::{Args, Subcommand};

/// Arguments for the `cache` command.
#[derive(Debug, Clone, Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub subcommand: CacheSubcommand,
}

/// Cache subcommands.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum CacheSubcommand {
    /// Loads the persisted snapshot and prints entry counts and memory usage.
    Stats,

    /// Deletes the persisted snapshot.
    Clear,
}
