// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::Fleet;
use crate::bulk::{BulkOptions, RunStatus};
use crate::cache::{CacheOptions, PolicyTable, RepositoryStateCache};
use crate::error::FleetError;
use crate::git::backend::{Reply, ScriptedBackend};
use crate::git::operation::{Operation, OperationParams, OperationRequest, param};
use crate::git::types::{BranchInfo, RepoStatus, Repository};

fn repos(n: usize) -> Vec<Repository> {
    (1..=n)
        .map(|i| Repository::new(format!("r{i}"), format!("repo-{i}"), format!("/repos/r{i}")))
        .collect()
}

fn fleet(backend: &Arc<ScriptedBackend>) -> Fleet {
    let cache = RepositoryStateCache::new(CacheOptions::default(), PolicyTable::default());
    Fleet::new(backend.clone(), Arc::new(cache))
}

fn clean_status() -> RepoStatus {
    RepoStatus {
        branch: Some("main".to_string()),
        ..RepoStatus::default()
    }
}

#[tokio::test]
async fn test_status_reads_through_cache() {
    let backend = Arc::new(ScriptedBackend::new().with_operation_reply(
        Operation::Status,
        Reply::Succeed(serde_json::to_value(clean_status()).unwrap()),
    ));
    let fleet = fleet(&backend);
    let repo = &repos(1)[0];

    let first = fleet.status(repo).await.unwrap();
    let second = fleet.status(repo).await.unwrap();

    assert_eq!(first, clean_status());
    assert_eq!(second, first);
    assert_eq!(backend.calls().len(), 1);
    assert_eq!(fleet.cache().stats().hits, 1);
}

#[tokio::test]
async fn test_branches_and_commits_read_through() {
    let branches = vec![BranchInfo {
        name: "main".to_string(),
        commit: "abc1234".to_string(),
        is_head: true,
        is_remote: false,
        upstream: None,
    }];
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_operation_reply(Operation::Branches, Reply::Succeed(json!(branches)))
            .with_operation_reply(Operation::Commits, Reply::Succeed(json!([]))),
    );
    let fleet = fleet(&backend);
    let repo = &repos(1)[0];

    assert_eq!(fleet.branches(repo).await.unwrap(), branches);
    assert_eq!(fleet.branches(repo).await.unwrap(), branches);
    assert!(fleet.commits(repo, Some("main"), Some(5)).await.unwrap().is_empty());
    assert!(fleet.commits(repo, Some("main"), Some(5)).await.unwrap().is_empty());
    // a different limit is a different key
    fleet.commits(repo, Some("main"), None).await.unwrap();

    assert_eq!(backend.calls().len(), 3);
}

#[tokio::test]
async fn test_undecodable_backend_value_is_an_error() {
    let backend = Arc::new(ScriptedBackend::new());
    let fleet = fleet(&backend);

    let err = fleet.repository_info(&repos(1)[0]).await.unwrap_err();

    assert!(matches!(err, FleetError::Git(_)));
    assert_eq!(fleet.cache().stats().entries, 0);
}

#[tokio::test]
async fn test_backend_failure_is_not_cached() {
    let backend = Arc::new(
        ScriptedBackend::new().with_reply("/repos/r1", Reply::Fail("not a repository".to_string())),
    );
    let fleet = fleet(&backend);
    let repo = &repos(1)[0];

    assert!(fleet.status(repo).await.is_err());
    assert!(fleet.status(repo).await.is_err());
    assert_eq!(backend.calls().len(), 2);
}

#[tokio::test]
async fn test_mutating_run_invalidates_attempted_repositories() {
    let backend = Arc::new(
        ScriptedBackend::new().with_reply("/repos/r2", Reply::Fail("conflict".to_string())),
    );
    let fleet = fleet(&backend);
    for id in ["r1", "r2", "r3"] {
        fleet.cache().set_status(id, &clean_status());
    }

    let request = OperationRequest::new(
        Operation::Pull,
        OperationParams::new().with(param::REMOTE, "origin"),
    );
    let run = fleet
        .run(&repos(2), &request, &BulkOptions::default())
        .await
        .unwrap();

    assert_eq!(run.invalidated, 2);
    assert_eq!(run.outcome.results["r2"].status, RunStatus::Error);
    assert!(fleet.cache().get_status("r1").is_none());
    assert!(fleet.cache().get_status("r2").is_none());
    assert!(fleet.cache().get_status("r3").is_some());
}

#[tokio::test]
async fn test_query_run_keeps_cache() {
    let backend = Arc::new(ScriptedBackend::new());
    let fleet = fleet(&backend);
    fleet.cache().set_status("r1", &clean_status());

    let run = fleet
        .run(
            &repos(1),
            &OperationRequest::bare(Operation::Status),
            &BulkOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(run.invalidated, 0);
    assert!(fleet.cache().get_status("r1").is_some());
}

#[tokio::test]
async fn test_cancelled_run_invalidates_nothing() {
    let backend = Arc::new(ScriptedBackend::new());
    let fleet = fleet(&backend);
    fleet.cache().set_status("r1", &clean_status());
    let token = CancellationToken::new();
    token.cancel();

    let run = fleet
        .run(
            &repos(1),
            &OperationRequest::bare(Operation::Fetch),
            &BulkOptions::builder().with_cancel_token(token).build(),
        )
        .await
        .unwrap();

    assert!(run.outcome.cancelled);
    assert_eq!(run.invalidated, 0);
    assert!(fleet.cache().get_status("r1").is_some());
}

#[tokio::test]
async fn test_invalid_repositories_are_skipped() {
    let backend = Arc::new(ScriptedBackend::new());
    let fleet = fleet(&backend);
    let mut targets = repos(1);
    targets.push(Repository::new("empty", "empty", PathBuf::new()));

    let run = fleet
        .run(
            &targets,
            &OperationRequest::bare(Operation::Status),
            &BulkOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(run.outcome.results.len(), 1);
    assert_eq!(run.invalid.len(), 1);
    assert_eq!(run.invalid[0].reason, "repository path is empty");
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn test_warm_fills_cache() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_operation_reply(Operation::Status, Reply::Succeed(json!(clean_status()))),
    );
    let fleet = fleet(&backend);

    let stored = fleet.warm(&repos(2)).await;

    assert_eq!(stored, 8);
    assert_eq!(fleet.status(&repos(1)[0]).await.unwrap(), clean_status());
    assert_eq!(backend.calls().len(), 8);
}
