// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command implementations.
//!
//! ```text
//! CLI args --> cmd::run_* handlers
//!   config (options, sources), run, validate, discover, warm, cache
//!
//! shared: select::select_repositories, cache::open_cache
//! ```

pub mod cache;
pub mod config;
pub mod discover;
pub mod run;
pub mod select;
pub mod validate;
pub mod warm;
