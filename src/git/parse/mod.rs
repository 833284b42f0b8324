// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Parsers for git CLI output.
//!
//! ```text
//! log            %H %h %an %ae %at %s   (0x1f separated)
//! for-each-ref   %(HEAD) %(refname:short) %(objectname) %(upstream:short)
//! status         --porcelain=v1 --branch
//! ```

use super::types::{BranchInfo, CommitInfo, RepoStatus};

/// Field separator used in `--format` strings.
pub const FIELD_SEP: char = '\u{1f}';

/// Format string for [`parse_log`].
pub const LOG_FORMAT: &str = "--format=%H%x1f%h%x1f%an%x1f%ae%x1f%at%x1f%s";

/// Format string for [`parse_branches`].
pub const BRANCH_FORMAT: &str =
    "--format=%(HEAD)%1f%(refname:short)%1f%(objectname)%1f%(upstream:short)";

/// Parses `git log` output produced with [`LOG_FORMAT`].
///
/// # Errors
///
/// Returns a description of the first malformed line.
pub fn parse_log(output: &str) -> Result<Vec<CommitInfo>, String> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let fields: Vec<&str> = line.splitn(6, FIELD_SEP).collect();
            let [id, short_id, author, email, timestamp, message] = fields.as_slice() else {
                return Err(format!("expected 6 fields, got {}: {line:?}", fields.len()));
            };
            let timestamp = timestamp
                .parse::<i64>()
                .map_err(|e| format!("invalid timestamp {timestamp:?}: {e}"))?;
            Ok(CommitInfo {
                id: (*id).to_string(),
                short_id: (*short_id).to_string(),
                author: (*author).to_string(),
                email: (*email).to_string(),
                timestamp,
                message: (*message).to_string(),
            })
        })
        .collect()
}

/// Parses `git for-each-ref` output produced with [`BRANCH_FORMAT`].
///
/// Lines with fewer than three fields are skipped.
#[must_use]
pub fn parse_branches(output: &str, is_remote: bool) -> Vec<BranchInfo> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(FIELD_SEP);
            let head = fields.next()?;
            let name = fields.next()?;
            let commit = fields.next()?;
            let upstream = fields.next().filter(|u| !u.is_empty());
            // origin/HEAD is a symbolic alias, not a branch
            if is_remote && name.ends_with("/HEAD") {
                return None;
            }
            Some(BranchInfo {
                name: name.to_string(),
                commit: commit.to_string(),
                is_head: head.trim() == "*",
                is_remote,
                upstream: upstream.map(str::to_string),
            })
        })
        .collect()
}

/// Parses `git status --porcelain=v1 --branch`.
#[must_use]
pub fn parse_status(output: &str) -> RepoStatus {
    let mut status = RepoStatus::default();

    for line in output.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            parse_branch_header(header, &mut status);
            continue;
        }
        // The status code is two ASCII columns; anything else is skipped
        let (Some(code), Some(path)) = (line.get(..2), line.get(2..)) else {
            continue;
        };
        let &[x, y] = code.as_bytes() else {
            continue;
        };
        let path = path.trim_start();
        if !code.is_ascii() || path.is_empty() {
            continue;
        }
        // Renames are reported as "old -> new"
        let path = path.rsplit(" -> ").next().unwrap_or(path).to_string();

        match (x, y) {
            (b'?', b'?') => status.untracked.push(path),
            (b'!', b'!') => {}
            (b'U', _) | (_, b'U') | (b'A', b'A') | (b'D', b'D') => status.conflicted.push(path),
            _ => {
                if x != b' ' {
                    status.staged.push(path.clone());
                }
                if y != b' ' {
                    status.modified.push(path);
                }
            }
        }
    }

    status
}

fn parse_branch_header(header: &str, status: &mut RepoStatus) {
    if let Some(rest) = header.strip_prefix("No commits yet on ") {
        status.branch = Some(rest.trim().to_string());
        return;
    }
    if header.starts_with("HEAD (no branch)") {
        return;
    }

    let (refs, tracking) = match header.split_once(" [") {
        Some((refs, tracking)) => (refs, Some(tracking.trim_end_matches(']'))),
        None => (header, None),
    };

    match refs.split_once("...") {
        Some((branch, upstream)) => {
            status.branch = Some(branch.to_string());
            status.upstream = Some(upstream.to_string());
        }
        None => status.branch = Some(refs.trim().to_string()),
    }

    for part in tracking.into_iter().flat_map(|t| t.split(", ")) {
        if let Some(n) = part.strip_prefix("ahead ") {
            status.ahead = n.parse().unwrap_or(0);
        } else if let Some(n) = part.strip_prefix("behind ") {
            status.behind = n.parse().unwrap_or(0);
        }
    }
}
