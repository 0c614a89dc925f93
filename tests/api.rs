mod common;

use std::time::Duration;

use common::Origin;
use gitbundle::{
    cli::command_handlers::BundleInfo, git::lock_path, model::BundleName, Bundle, BundleError,
    FileLock,
};
use pretty_assertions::assert_eq;

const SHORT: Duration = Duration::from_millis(200);

#[test]
fn builder_releases_lock_after_construction() {
    let origin = Origin::new();
    let first = origin.commit(&[("dags/dag.py", "one")], "first");
    let root = tempfile::tempdir().unwrap();

    let bundle = Bundle::builder()
        .root(root.path())
        .name("dags")
        .url(origin.url())
        .subdir("dags")
        .version(Some(first.to_string()))
        .try_build()
        .unwrap();

    let lock = lock_path(root.path(), &BundleName::new("dags").unwrap());
    assert_eq!(bundle.lock_path(), Some(lock.clone()));
    assert_eq!(bundle.current_version().unwrap(), first.to_string());
    assert!(bundle.path().join("dag.py").exists());

    FileLock::with_timeout(&lock, SHORT).unwrap();
}

#[test]
fn two_versions_of_one_bundle_are_alive_together() {
    let origin = Origin::new();
    let first = origin.commit(&[("dag.py", "one")], "first");
    let second = origin.commit(&[("dag.py", "two")], "second");
    let root = tempfile::tempdir().unwrap();

    let build = |version: String| {
        Bundle::builder()
            .root(root.path())
            .name("dags")
            .url(origin.url())
            .version(Some(version))
            .lock_timeout(SHORT)
            .try_build()
            .unwrap()
    };

    let old = build(first.to_string());
    let new = build(second.to_string());

    assert_eq!(old.current_version().unwrap(), first.to_string());
    assert_eq!(new.current_version().unwrap(), second.to_string());
    assert_ne!(old.path(), new.path());
}

#[test]
fn construction_waits_for_the_bundle_lock() {
    let origin = Origin::new();
    origin.commit(&[("dag.py", "one")], "first");
    let root = tempfile::tempdir().unwrap();
    let lock = lock_path(root.path(), &BundleName::new("dags").unwrap());

    let held = FileLock::new(&lock).unwrap();
    let result = Bundle::builder()
        .root(root.path())
        .name("dags")
        .url(origin.url())
        .lock_timeout(SHORT)
        .try_build();

    assert!(matches!(result, Err(BundleError::Lock(_))));
    assert!(!root.path().join("git").join("dags").exists());
    drop(held);
}

#[test]
fn refresh_takes_the_bundle_lock() {
    let origin = Origin::new();
    origin.commit(&[("dag.py", "one")], "first");
    let root = tempfile::tempdir().unwrap();

    let bundle = Bundle::builder()
        .root(root.path())
        .name("dags")
        .url(origin.url())
        .lock_timeout(SHORT)
        .try_build()
        .unwrap();
    let second = origin.commit(&[("dag.py", "two")], "second");

    let held = FileLock::new(&bundle.lock_path().unwrap()).unwrap();
    assert!(matches!(bundle.refresh(), Err(BundleError::Lock(_))));
    drop(held);

    bundle.refresh().unwrap();
    assert_eq!(bundle.current_version().unwrap(), second.to_string());
}

#[test]
fn builder_without_lock() {
    let origin = Origin::new();
    let first = origin.commit(&[("dag.py", "one")], "first");
    let root = tempfile::tempdir().unwrap();

    let bundle = Bundle::builder()
        .root(root.path())
        .name("dags")
        .url(origin.url())
        .lock(false)
        .try_build()
        .unwrap();

    assert_eq!(bundle.lock_path(), None);
    assert_eq!(bundle.current_version().unwrap(), first.to_string());
}

#[test]
fn builder_rejects_invalid_name() {
    let root = tempfile::tempdir().unwrap();

    let result = Bundle::builder()
        .root(root.path())
        .name("../escape")
        .url("https://github.com/org/repo")
        .try_build();

    assert!(matches!(result, Err(BundleError::Parse(_))));
    assert!(!root.path().join("git").exists());
}

#[test]
fn builder_rejects_pinned_version_escaping_the_storage_root() {
    let origin = Origin::new();
    origin.commit(&[("dag.py", "one")], "ab/cd/ef/escaped");
    let root = tempfile::tempdir().unwrap();

    let result = Bundle::builder()
        .root(root.path())
        .name("dags")
        .url(origin.url())
        .version(Some("main^{/../../../escaped}".to_owned()))
        .try_build();

    assert!(matches!(result, Err(BundleError::Parse(_))));
    assert!(!root.path().join("escaped").exists());
    assert!(!root.path().join("git").join("dags").exists());
}

#[test]
fn bundle_info_without_view_url_on_malformed_source() {
    let origin = Origin::new();
    let first = origin.commit(&[("dag.py", "one")], "first");
    let root = tempfile::tempdir().unwrap();
    let pinned = || {
        Bundle::builder()
            .root(root.path())
            .name("dags")
            .version(Some(first.to_string()))
            .lock(false)
    };
    pinned().url(origin.url()).try_build().unwrap();

    // Existing caches are reused without contacting the remote.
    let bundle = pinned().url("git@github.com/org/repo").try_build().unwrap();
    let info = BundleInfo::collect(&bundle).unwrap();

    assert_eq!(info.view_url, None);
    assert_eq!(info.current_version, first.to_string());
    assert_eq!(info.url, "git@github.com/org/repo");
}
