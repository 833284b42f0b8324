// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Entry point.
//!
//! ```text
//! cli::parse() --> Logging --> Command Dispatch
//!   Run | Validate | Discover | Warm | Cache | Options | Sources
//! ```

use std::process::ExitCode;

use gitfleet::cli::global::GlobalOptions;
use gitfleet::cli::{self, Command};
use gitfleet::cmd::cache::run_cache_command;
use gitfleet::cmd::config::{
    build_config_loader, load_config, run_options_command, run_sources_command,
};
use gitfleet::cmd::discover::run_discover_command;
use gitfleet::cmd::run::run_run_command;
use gitfleet::cmd::validate::run_validate_command;
use gitfleet::cmd::warm::run_warm_command;
use gitfleet::config::Config;
use gitfleet::logging::init_logging;
use gitfleet::logging::{LogConfig, LogLevel};

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::parse();

    let log_config = build_log_config(&cli.global);
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    dispatch_command(&cli).await
}

fn build_log_config(global: &GlobalOptions) -> LogConfig {
    let console_level = global
        .log_level
        .and_then(LogLevel::from_u8)
        .unwrap_or(LogLevel::INFO);

    let file_level = global
        .file_log_level
        .and_then(LogLevel::from_u8)
        .unwrap_or(console_level);

    LogConfig::builder()
        .with_console_level(console_level)
        .with_file_level(file_level)
        .maybe_with_log_file(global.log_file.as_ref().map(|p| p.display().to_string()))
        .build()
}

async fn dispatch_command(cli: &cli::Cli) -> ExitCode {
    let result = match &cli.command {
        Some(Command::Version) => {
            handle_version_command();
            Ok(())
        }
        Some(Command::Options) => {
            load(&cli.global).map(|config| run_options_command(&config))
        }
        Some(Command::Sources) => build_config_loader(&cli.global).map(|loader| {
            run_sources_command(&loader.format_loaded_files());
        }),
        Some(Command::Run(args)) => match load(&cli.global) {
            Ok(config) => run_run_command(args, &config).await,
            Err(e) => Err(e),
        },
        Some(Command::Validate(select)) => {
            load(&cli.global).and_then(|config| run_validate_command(select, &config))
        }
        Some(Command::Discover(args)) => run_discover_command(args),
        Some(Command::Warm(select)) => match load(&cli.global) {
            Ok(config) => run_warm_command(select, &config).await,
            Err(e) => Err(e),
        },
        Some(Command::Cache(args)) => {
            load(&cli.global).and_then(|config| run_cache_command(args, &config))
        }
        None => {
            eprintln!("No command specified. Use --help for usage information.");
            Err(anyhow::anyhow!("No command specified"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn handle_version_command() {
    println!("{}", env!("CARGO_PKG_VERSION"));
}

fn load(global: &GlobalOptions) -> gitfleet::error::Result<Config> {
    load_config(global).map_err(|e| {
        eprintln!("Failed to load config: {e}");
        e
    })
}
