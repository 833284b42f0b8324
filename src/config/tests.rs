// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;
use std::time::Duration;

use super::{Config, ConfigLoader};
use crate::cache::Category;
use crate::git::types::SyncStatus;
use crate::logging::LogLevel;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(
        serde_json::to_value(&config).unwrap(),
        serde_json::json!({
            "global": {"output_log_level": 3, "file_log_level": 4},
            "bulk": {"max_concurrency": 3, "timeout_secs": 30, "abort_on_error": false},
            "cache": {
                "memory_budget_mb": 100,
                "sweep_interval_secs": 60,
                "persist_interval_secs": 300,
                "warmup_group_size": 5,
                "warmup_pause_ms": 100,
            },
        })
    );
}

#[test]
fn test_config_parse() {
    let toml = r#"
[global]
output_log_level = 4

[bulk]
max_concurrency = 8
abort_on_error = true

[cache]
persist_path = "/var/cache/gitfleet.json"

[cache.policies.status]
ttl_secs = 10

[[repositories]]
path = "/work/api"

[[repositories]]
id = "web-app"
name = "Web"
path = "/work/web"
sync_status = "error"
"#;

    let config = Config::parse(toml).unwrap();

    assert_eq!(config.global.output_log_level, LogLevel::DEBUG);
    assert_eq!(config.bulk.max_concurrency, 8);
    assert!(config.bulk.abort_on_error);
    assert_eq!(
        config.cache.persist_path,
        Some(PathBuf::from("/var/cache/gitfleet.json"))
    );

    let repos = config.repositories();
    assert_eq!(repos[0].id, "api");
    assert_eq!(repos[0].name, "api");
    assert_eq!(repos[1].id, "web-app");
    assert_eq!(repos[1].name, "Web");
    assert_eq!(repos[1].sync_status, SyncStatus::Error);
}

#[test]
fn test_policy_overrides() {
    let config = Config::parse(
        r"
[cache.policies.status]
ttl_secs = 10

[cache.policies.commits]
max_entries = 42
",
    )
    .unwrap();

    let table = config.cache.policy_table().unwrap();
    assert_eq!(table.get(Category::Status).ttl, Duration::from_secs(10));
    assert_eq!(table.get(Category::Status).max_entries, 1000);
    assert_eq!(table.get(Category::Commits).ttl, Duration::from_secs(600));
    assert_eq!(table.get(Category::Commits).max_entries, 42);
}

#[test]
fn test_unknown_policy_category_rejected() {
    let err = Config::parse("[cache.policies.tags]\nttl_secs = 10").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"invalid value for 'tags' in section '[cache.policies]': unknown category, expected one of: repository, commits, branches, status, files, diff, search, remote");
}

#[test]
fn test_zero_values_rejected() {
    for (toml, key) in [
        ("[bulk]\nmax_concurrency = 0", "max_concurrency"),
        ("[bulk]\ntimeout_secs = 0", "timeout_secs"),
        ("[cache]\nmemory_budget_mb = 0", "memory_budget_mb"),
        ("[cache]\nwarmup_group_size = 0", "warmup_group_size"),
        ("[cache.policies.diff]\nmax_entries = 0", "diff"),
    ] {
        let err = Config::parse(toml).unwrap_err().to_string();
        assert!(err.contains(key), "{toml}: {err}");
    }
}

#[test]
fn test_conversions() {
    let config = Config::parse(
        r"
[bulk]
max_concurrency = 5
timeout_secs = 12

[cache]
memory_budget_mb = 2
warmup_pause_ms = 0
",
    )
    .unwrap();

    let bulk = config.bulk.to_options();
    assert_eq!(bulk.max_concurrency, 5);
    assert_eq!(bulk.timeout, Duration::from_secs(12));
    assert!(bulk.progress.is_none());

    let cache = config.cache.to_options();
    assert_eq!(cache.memory_budget, 2 * 1024 * 1024);
    assert!(cache.warmup_pause.is_zero());
}

#[test]
fn test_format_options_deterministic() {
    let config = Config::parse("[global]\nlog_file = \"fleet.log\"").unwrap();

    let options = config.format_options();
    assert_eq!(options, config.format_options());
    insta::assert_snapshot!(options.join("\n"), @r"
    bulk.abort_on_error         = false
    bulk.max_concurrency        = 3
    bulk.timeout_secs           = 30
    cache.memory_budget_mb      = 100
    cache.persist_interval_secs = 300
    cache.policies.branches     = ttl=180s max=2000
    cache.policies.commits      = ttl=600s max=5000
    cache.policies.diff         = ttl=300s max=1000
    cache.policies.files        = ttl=120s max=3000
    cache.policies.remote       = ttl=900s max=1000
    cache.policies.repository   = ttl=300s max=1000
    cache.policies.search       = ttl=600s max=500
    cache.policies.status       = ttl=30s max=1000
    cache.sweep_interval_secs   = 60
    cache.warmup_group_size     = 5
    cache.warmup_pause_ms       = 100
    global.file_log_level       = 4
    global.log_file             = fleet.log
    global.output_log_level     = 3
    repositories                = 0
    ");
}

#[test]
fn test_deny_unknown_fields() {
    assert!(Config::parse("[bulk]\nparallel = 4").is_err());
    assert!(Config::parse("[unknown]\nkey = 1").is_err());
    assert!(Config::parse("[[repositories]]\nid = \"no-path\"").is_err());
}

#[test]
fn test_config_loader_tracks_files() {
    let loader = ConfigLoader::new()
        .add_toml_str("[bulk]\nmax_concurrency = 2")
        .add_toml_file_optional("/nonexistent/optional.toml");

    insta::assert_debug_snapshot!(loader.format_loaded_files(), @r#"
    [
        "1. [string] <string>",
    ]
    "#);
}

#[test]
fn test_config_loader_add_toml_file_success() {
    use std::io::Write;
    use tempfile::NamedTempFile;

    let mut file = NamedTempFile::new().expect("failed to create temp file");
    writeln!(
        file,
        r#"
[bulk]
timeout_secs = 90

[[repositories]]
path = "/repos/one"
"#
    )
    .expect("failed to write temp file");

    let config = ConfigLoader::new()
        .add_toml_file(file.path())
        .build()
        .expect("build should succeed");

    assert_eq!(config.bulk.timeout_secs, 90);
    assert_eq!(config.repositories.len(), 1);
}

#[test]
fn test_config_loader_add_toml_file_not_found() {
    let result = ConfigLoader::new()
        .add_toml_file("/nonexistent/path/to/gitfleet.toml")
        .build();
    assert!(result.is_err());
}

#[test]
fn test_config_loader_with_env_prefix() {
    // SAFETY: the variable name is unique to this test
    unsafe {
        std::env::set_var("FLEETUNIT_BULK__MAX_CONCURRENCY", "9");
    }

    let config = ConfigLoader::new()
        .add_toml_str("[bulk]\nmax_concurrency = 2")
        .with_env_prefix("FLEETUNIT")
        .build()
        .expect("build should succeed");

    assert_eq!(config.bulk.max_concurrency, 9, "env var should override TOML value");

    // SAFETY: Same as above
    unsafe {
        std::env::remove_var("FLEETUNIT_BULK__MAX_CONCURRENCY");
    }
}

#[test]
fn test_config_loader_set_override() {
    let config = ConfigLoader::new()
        .add_toml_str("[bulk]\nabort_on_error = false")
        .set("bulk.abort_on_error", true)
        .expect("set should succeed")
        .build()
        .expect("build should succeed");

    assert!(config.bulk.abort_on_error, "set override should take effect");
}

#[test]
fn test_config_loader_type_mismatch() {
    let err = ConfigLoader::new()
        .add_toml_str("[bulk]\nabort_on_error = \"sometimes\"")
        .build()
        .unwrap_err()
        .to_string();
    assert!(
        err.contains("abort_on_error") || err.contains("invalid type"),
        "error should mention the problematic field: {err}"
    );
}
