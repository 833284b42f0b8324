// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;
use std::time::Duration;

use serde_json::json;

use super::{GitBackend, Reply, ScriptedBackend};
use crate::git::operation::{Operation, OperationParams};

#[tokio::test]
async fn test_scripted_default_reply() {
    let backend = ScriptedBackend::new();
    let params = OperationParams::new();

    let value = backend
        .invoke(Operation::Fetch, Path::new("/repos/a"), &params)
        .await
        .unwrap();

    assert_eq!(value, json!({"operation": "fetch", "path": "/repos/a"}));
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn test_scripted_failure_and_delay() {
    let backend = ScriptedBackend::new()
        .with_reply("/repos/bad", Reply::Fail("remote rejected".to_string()))
        .with_reply(
            "/repos/slow",
            Reply::delayed(Duration::from_millis(10), Reply::Succeed(json!(1))),
        );
    let params = OperationParams::new();

    let err = backend
        .invoke(Operation::Push, Path::new("/repos/bad"), &params)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("remote rejected"));

    let value = backend
        .invoke(Operation::Push, Path::new("/repos/slow"), &params)
        .await
        .unwrap();
    assert_eq!(value, json!(1));
}

#[tokio::test]
async fn test_scripted_operation_reply_applies_to_unscripted_paths() {
    let backend =
        ScriptedBackend::new().with_operation_reply(Operation::Status, Reply::Succeed(json!({})));
    let params = OperationParams::new();

    let value = backend
        .invoke(Operation::Status, Path::new("/any"), &params)
        .await
        .unwrap();
    assert_eq!(value, json!({}));
}

#[tokio::test]
async fn test_scripted_tracks_peak_concurrency() {
    let backend = ScriptedBackend::new().with_operation_reply(
        Operation::Pull,
        Reply::delayed(Duration::from_millis(20), Reply::Succeed(json!(null))),
    );
    let params = OperationParams::new();

    let a = backend.invoke(Operation::Pull, Path::new("/a"), &params);
    let b = backend.invoke(Operation::Pull, Path::new("/b"), &params);
    let (ra, rb) = tokio::join!(a, b);
    assert!(ra.is_ok() && rb.is_ok());
    assert_eq!(backend.peak_in_flight(), 2);
}
