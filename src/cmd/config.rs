// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Config-related commands and the CLI configuration pipeline.

use crate::cli::global::GlobalOptions;
use crate::cli::run::parse_key_value;
use crate::config::loader::ConfigLoader;
use crate::config::{Config, DEFAULT_CONFIG_FILE, ENV_PREFIX};
use crate::error::Result;
use anyhow::anyhow;

/// Layers defaults, `gitfleet.toml`, `--config` files, `GITFLEET_*` variables
/// and `--set` overrides, in that order.
///
/// # Errors
///
/// Returns an error if an override is not `KEY=VALUE`.
pub fn build_config_loader(global: &GlobalOptions) -> Result<ConfigLoader> {
    let mut loader = ConfigLoader::new();
    if !global.no_default_config {
        loader = loader.add_toml_file_optional(DEFAULT_CONFIG_FILE);
    }
    for path in &global.configs {
        loader = loader.add_toml_file(path);
    }
    loader = loader.with_env_prefix(ENV_PREFIX);

    for option in global.to_config_overrides() {
        let (key, value) = parse_key_value(&option).map_err(|e| anyhow!("invalid --set: {e}"))?;
        loader = loader.set(&key, value)?;
    }
    Ok(loader)
}

/// Builds the effective configuration for the command line.
///
/// # Errors
///
/// Returns an error if any source fails to load or validate.
pub fn load_config(global: &GlobalOptions) -> Result<Config> {
    build_config_loader(global)?.build()
}

/// Display current configuration options.
pub fn run_options_command(config: &Config) {
    for line in config.format_options() {
        println!("{line}");
    }
}

/// Display loaded configuration files.
pub fn run_sources_command(config_files: &[String]) {
    if config_files.is_empty() {
        println!("No configuration files loaded");
    } else {
        for line in config_files {
            println!("{line}");
        }
    }
}
