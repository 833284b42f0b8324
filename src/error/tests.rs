// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{CacheError, ConfigError, FleetError, FleetResult, GitError, OperationError};

#[test]
fn test_config_error_display() {
    let err = ConfigError::MissingKey {
        section: "bulk".to_string(),
        key: "timeout_secs".to_string(),
    };
    insta::assert_snapshot!(err.to_string(), @"missing required config key 'timeout_secs' in section '[bulk]'");
}

#[test]
fn test_operation_error_display() {
    let err = OperationError::MissingParameter {
        operation: "checkout",
        parameter: "branch",
    };
    assert_eq!(
        err.to_string(),
        "operation 'checkout' requires parameter 'branch'"
    );
}

#[test]
fn test_boxed_conversion() {
    let err: FleetError = GitError::RepoNotFound {
        path: "/tmp/none".to_string(),
    }
    .into();
    assert!(matches!(err, FleetError::Git(_)));
    assert_eq!(err.to_string(), "git error: repository not found: /tmp/none");

    let err: FleetError = CacheError::UnknownCategory("blobs".to_string()).into();
    assert_eq!(err.to_string(), "cache error: unknown cache category 'blobs'");
}

#[test]
fn test_fleet_error_size() {
    let size = std::mem::size_of::<FleetError>();
    assert!(size <= 24, "FleetError is {size} bytes, expected <= 24");
}

#[test]
fn test_fleet_result_size() {
    let size = std::mem::size_of::<FleetResult<()>>();
    assert!(size <= 24, "FleetResult<()> is {size} bytes, expected <= 24");
}
