// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Integration tests for the Safety Guard.
//!
//! Covers edge cases beyond the guard module's own unit tests: symlinks,
//! missing paths, unicode paths, very long paths, and path traversal
//! attempts.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::PathBuf;

use tempfile::tempdir;
use tidymac_core::safety::SafetyGuard;

#[test]
fn symlink_escaping_home_into_system_is_denied() {
    let home = tempdir().unwrap();
    let link_path = home.path().join("escape");

    if symlink("/System", &link_path).is_ok() {
        let guard = SafetyGuard::with_home(home.path().to_path_buf());
        let decision = guard.is_deletable(&link_path);
        assert!(!decision.is_allow());
    }
}

#[test]
fn symlink_within_home_to_an_allowlisted_dir_is_allowed() {
    let home = tempdir().unwrap();
    let real_cache = home.path().join("Library/Caches/app/data");
    fs::create_dir_all(&real_cache).unwrap();

    let link_path = home.path().join("link_to_cache");
    symlink(&real_cache, &link_path).unwrap();

    let guard = SafetyGuard::with_home(home.path().to_path_buf());
    assert!(guard.is_deletable(&link_path).is_allow());
}

#[test]
fn missing_path_under_an_existing_allowlisted_parent_still_resolves() {
    let home = tempdir().unwrap();
    let cache_dir = home.path().join("Library/Caches/app");
    fs::create_dir_all(&cache_dir).unwrap();

    let missing = cache_dir.join("not-written-yet.tmp");
    let guard = SafetyGuard::with_home(home.path().to_path_buf());
    assert!(guard.is_deletable(&missing).is_allow());
}

#[test]
fn missing_path_with_missing_parent_is_denied() {
    let home = tempdir().unwrap();
    let guard = SafetyGuard::with_home(home.path().to_path_buf());
    let missing = home.path().join("Library/Caches/does/not/exist");
    assert!(!guard.is_deletable(&missing).is_allow());
}

#[test]
fn unicode_path_components_are_handled_without_panic() {
    let home = tempdir().unwrap();
    let cache_dir = home.path().join("Library/Caches/app/日本語-ファイル名-🍀");
    fs::create_dir_all(&cache_dir).unwrap();

    let guard = SafetyGuard::with_home(home.path().to_path_buf());
    assert!(guard.is_deletable(&cache_dir).is_allow());
}

#[test]
fn very_long_path_components_are_handled_without_panic() {
    let home = tempdir().unwrap();
    let long_name = "a".repeat(200);
    let cache_dir = home.path().join("Library/Caches/app").join(&long_name);
    fs::create_dir_all(&cache_dir).unwrap();

    let guard = SafetyGuard::with_home(home.path().to_path_buf());
    let decision = guard.is_deletable(&cache_dir);
    assert!(decision.is_allow());
}

#[test]
fn dot_dot_traversal_inside_an_allowed_path_resolves_via_canonicalization() {
    let home = tempdir().unwrap();
    let cache_dir = home.path().join("Library/Caches/app");
    fs::create_dir_all(&cache_dir).unwrap();

    let traversal = home
        .path()
        .join("Library/Caches/app/../app")
        .join("data.bin");
    fs::write(cache_dir.join("data.bin"), b"x").unwrap();

    let guard = SafetyGuard::with_home(home.path().to_path_buf());
    assert!(guard.is_deletable(&traversal).is_allow());
}

#[test]
fn dot_dot_traversal_escaping_into_blocklist_is_denied() {
    let home = tempdir().unwrap();
    fs::create_dir_all(home.path().join("Documents")).unwrap();
    let cache_dir = home.path().join("Library/Caches/app");
    fs::create_dir_all(&cache_dir).unwrap();

    let traversal = cache_dir.join("../../../../Documents");
    let guard = SafetyGuard::with_home(home.path().to_path_buf());
    assert!(!guard.is_deletable(&traversal).is_allow());
}

#[test]
fn home_directory_itself_is_never_deletable() {
    let home = tempdir().unwrap();
    let guard = SafetyGuard::with_home(home.path().to_path_buf());
    assert!(!guard.is_deletable(home.path()).is_allow());
}

#[test]
fn root_level_path_is_denied_by_depth_check() {
    let guard = SafetyGuard::with_home(PathBuf::from("/nonexistent-home-for-test"));
    assert!(!guard.is_deletable(&PathBuf::from("/tmp")).is_allow());
}

#[test]
fn large_batch_of_mixed_paths_classifies_without_panicking() {
    let home = tempdir().unwrap();
    fs::create_dir_all(home.path().join("Documents")).unwrap();
    fs::create_dir_all(home.path().join("Library/Caches/app")).unwrap();
    let guard = SafetyGuard::with_home(home.path().to_path_buf());

    let mut allowed = 0;
    let mut denied = 0;
    for i in 0..500 {
        let path = if i % 2 == 0 {
            home.path().join(format!("Library/Caches/app/file_{i}.tmp"))
        } else {
            home.path().join(format!("Documents/file_{i}.txt"))
        };
        if guard.is_deletable(&path).is_allow() {
            allowed += 1;
        } else {
            denied += 1;
        }
    }
    assert!(allowed > 0);
    assert!(denied > 0);
}
