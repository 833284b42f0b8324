// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Library root.
//!
//! # Crate Architecture
//!
//! ```text
//!                        main.rs
//!                           |
//!                +----------+----------+
//!                v                     v
//!             cli (clap)          cmd (handlers)
//!                |        run / validate / discover / warm
//!                +----------+----------+
//!                           v
//!              ,---------------------------,
//!              |          config           |
//!              |   TOML, layered settings  |
//!              '-------------+-------------'
//!                            v
//!                          fleet
//!                 validate, run, invalidate,
//!                 read-through queries
//!                    |              |
//!                    v              v
//!                  bulk           cache
//!           batches, timeout,   TTL, LRU budget,
//!           cancel, progress    persistence, warm-up
//!                    |              |
//!                    +------+-------+
//!                           v
//!                          git
//!        GitBackend (ShellBackend | ScriptedBackend),
//!        operations, parsers, discovery
//!
//!   +-----------------------------------------+
//!   |  foundation   error, logging            |
//!   +-----------------------------------------+
//! ```

pub mod bulk;
pub mod cache;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod fleet;
pub mod git;
pub mod logging;
