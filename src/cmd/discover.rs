// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Discover command implementation.

use crate::cli::select::DiscoverArgs;
use crate::error::Result;
use crate::git::discovery::{DiscoveryOptions, discover_repositories};
use crate::git::types::Repository;

/// Main handler for discover command.
///
/// # Errors
///
/// Returns an error if the root cannot be scanned.
pub fn run_discover_command(args: &DiscoverArgs) -> Result<()> {
    let options = DiscoveryOptions::builder()
        .maybe_with_max_depth(args.max_depth)
        .with_follow_links(args.follow_links)
        .build();
    let repositories = discover_repositories(&args.root, &options)?;

    if repositories.is_empty() {
        println!("No repositories found");
        return Ok(());
    }

    if args.toml {
        print!("{}", format_toml(&repositories));
    } else {
        for repo in &repositories {
            println!("{:30} {}", repo.id, repo.path.display());
        }
    }
    Ok(())
}

/// `[[repositories]]` blocks ready to paste into `gitfleet.toml`.
#[must_use]
pub fn format_toml(repositories: &[Repository]) -> String {
    repositories
        .iter()
        .map(|repo| {
            format!(
                "[[repositories]]\nid = {:?}\nname = {:?}\npath = {:?}\n",
                repo.id,
                repo.name,
                repo.path.display().to_string()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
