use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

use logpurge::config::Config;
use logpurge::group::{self, Mode};
use logpurge::identity::IdentityProvider;
use logpurge::run::RunError;
use logpurge::store::{StoreClient, StoreError};

fn touch_with_age(dir: &Path, name: &str, age_days: u64) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"payload").unwrap();
    let mtime = SystemTime::now() - std::time::Duration::from_secs(age_days * 86_400);
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
    path
}

fn config_with_action(dir: &Path, action: &str) -> Config {
    let yaml = format!(
        r#"
remote access key: test-access
remote secret key: test-secret
logs:
  path: {}
  files: "*.log"
  dateregex: '\d{{8}}'
  upto: 7 days
  action: [{action}]
  bucket: test-bucket
  dest: {}
"#,
        dir.display(),
        dir.join("archive").display(),
    );
    Config::from_yaml(&yaml).unwrap()
}

#[tokio::test]
async fn execute_deletes_only_the_aged_dated_file() {
    let tmp = TempDir::new().unwrap();
    let aged = touch_with_age(tmp.path(), "app-20200101.log", 40);
    let recent = touch_with_age(tmp.path(), "app-20231231.log", 2);
    let undated = touch_with_age(tmp.path(), "readme.log", 100);

    let cfg = config_with_action(tmp.path(), "delete");
    let store = StoreClient::from_config(&cfg).unwrap();

    let eligible = group::process(
        "logs",
        &cfg.groups["logs"],
        &store,
        "abc123",
        Mode::Execute { simulate: false },
    )
    .await;

    assert_eq!(eligible, vec![aged.clone()]);
    assert!(!aged.exists(), "aged dated file must be removed");
    assert!(recent.exists(), "recent file must survive");
    assert!(undated.exists(), "file without a date must survive");
}

#[tokio::test]
async fn unknown_action_leaves_files_untouched() {
    let tmp = TempDir::new().unwrap();
    let aged = touch_with_age(tmp.path(), "app-20200101.log", 40);

    let cfg = config_with_action(tmp.path(), "bogus");
    let store = StoreClient::from_config(&cfg).unwrap();

    group::process(
        "logs",
        &cfg.groups["logs"],
        &store,
        "abc123",
        Mode::Execute { simulate: false },
    )
    .await;

    assert!(aged.exists(), "an invalid action must not dispose of anything");
}

#[tokio::test]
async fn simulate_reports_without_disposing() {
    let tmp = TempDir::new().unwrap();
    let aged = touch_with_age(tmp.path(), "app-20200101.log", 40);

    let cfg = config_with_action(tmp.path(), "delete");
    let store = StoreClient::from_config(&cfg).unwrap();

    let eligible = group::process(
        "logs",
        &cfg.groups["logs"],
        &store,
        "abc123",
        Mode::Execute { simulate: true },
    )
    .await;

    assert_eq!(eligible, vec![aged.clone()]);
    assert!(aged.exists(), "simulate must not remove files");
}

#[tokio::test]
async fn move_action_relocates_into_dest() {
    let tmp = TempDir::new().unwrap();
    let aged = touch_with_age(tmp.path(), "app-20200101.log", 40);
    fs::create_dir(tmp.path().join("archive")).unwrap();

    let cfg = config_with_action(tmp.path(), "move");
    let store = StoreClient::from_config(&cfg).unwrap();

    group::process(
        "logs",
        &cfg.groups["logs"],
        &store,
        "abc123",
        Mode::Execute { simulate: false },
    )
    .await;

    assert!(!aged.exists());
    assert!(tmp.path().join("archive/app-20200101.log").exists());
}

#[tokio::test]
async fn duplicate_actions_run_in_configured_order() {
    let tmp = TempDir::new().unwrap();
    let aged = touch_with_age(tmp.path(), "app-20200101.log", 40);
    fs::create_dir(tmp.path().join("archive")).unwrap();

    // Move first, then delete: the delete pass sees an already-moved
    // source and records a failure, but the moved copy survives.
    let cfg = config_with_action(tmp.path(), "move, delete");
    let store = StoreClient::from_config(&cfg).unwrap();

    group::process(
        "logs",
        &cfg.groups["logs"],
        &store,
        "abc123",
        Mode::Execute { simulate: false },
    )
    .await;

    assert!(!aged.exists());
    assert!(tmp.path().join("archive/app-20200101.log").exists());
}

#[test]
fn fixed_identity_resolves_without_network() {
    let provider = IdentityProvider::fixed("abc123");
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    assert_eq!(rt.block_on(provider.host_id()).unwrap(), "abc123");
}

#[test]
fn preflight_failures_map_to_distinct_exit_codes() {
    let auth = RunError::Preflight(StoreError::Auth("HTTP 403".to_string()));
    let owned = RunError::Preflight(StoreError::OwnershipConflict {
        bucket: "abc123".to_string(),
    });
    let denied = RunError::Preflight(StoreError::PermissionDenied {
        bucket: "abc123".to_string(),
        reason: "AccessDenied".to_string(),
    });
    let unknown = RunError::Preflight(StoreError::Unknown("timeout".to_string()));

    assert_eq!(auth.exit_code(), 2);
    assert_eq!(owned.exit_code(), 3);
    assert_eq!(denied.exit_code(), 4);
    assert_eq!(unknown.exit_code(), 5);
    assert_eq!(RunError::UnknownGroup("nope".to_string()).exit_code(), 1);
}
