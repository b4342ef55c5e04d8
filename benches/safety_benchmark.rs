// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Benchmark tests for the Safety Guard.
//!
//! Tests performance of path classification and deletability checks with
//! large numbers of paths.

use std::fs;
use std::path::{Path, PathBuf};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;

use tidymac_core::safety::SafetyGuard;

/// Build a home directory containing one real file per classification
/// bucket, so canonicalization never fails on a missing parent.
fn populate_home(home: &Path) -> Vec<PathBuf> {
    let dirs = [
        "Library/Caches/Google/Chrome/Default/Cache",
        "Library/Caches/com.example.app",
        "Library/Logs",
        "Library/Developer/Xcode/DerivedData/Project-A/Build",
        ".npm/_cacache/content-v2/sha512",
        "Documents",
    ];
    for d in dirs {
        fs::create_dir_all(home.join(d)).unwrap();
    }

    vec![
        home.join("Library/Caches/Google/Chrome/Default/Cache/data_0"),
        home.join("Library/Caches/com.example.app/entry_0"),
        home.join("Library/Logs/app_0.log"),
        home.join("Library/Developer/Xcode/DerivedData/Project-A/Build/out_0"),
        home.join(".npm/_cacache/content-v2/sha512/hash_0"),
        home.join("Documents/notes_0.txt"),
    ]
}

fn generate_test_paths(home: &Path, count: usize) -> Vec<PathBuf> {
    let templates = populate_home(home);
    (0..count)
        .map(|i| {
            let base = &templates[i % templates.len()];
            base.with_file_name(format!(
                "{}_{i}",
                base.file_name().unwrap().to_string_lossy()
            ))
        })
        .collect()
}

fn bench_classify_single(c: &mut Criterion) {
    let home = TempDir::new().unwrap();
    let paths = populate_home(home.path());
    let guard = SafetyGuard::with_home(home.path().to_path_buf());

    let names = ["browser_cache", "app_cache", "log", "dev_cache", "npm_cache", "documents"];

    let mut group = c.benchmark_group("classify_single");
    for (path, name) in paths.iter().zip(names) {
        group.bench_with_input(BenchmarkId::new("path", name), path, |b, path| {
            b.iter(|| guard.classify(black_box(path)))
        });
    }
    group.finish();
}

fn bench_is_deletable_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_deletable_batch");

    for size in [100, 1_000, 10_000].iter() {
        let home = TempDir::new().unwrap();
        let paths = generate_test_paths(home.path(), *size);
        let guard = SafetyGuard::with_home(home.path().to_path_buf());

        group.bench_with_input(BenchmarkId::new("paths", size), &paths, |b, paths| {
            b.iter(|| {
                for path in black_box(paths) {
                    let _ = guard.is_deletable(path);
                }
            })
        });
    }

    group.finish();
}

fn bench_is_deletable_protected(c: &mut Criterion) {
    let home = TempDir::new().unwrap();
    fs::create_dir_all(home.path().join("Documents")).unwrap();
    let guard = SafetyGuard::with_home(home.path().to_path_buf());

    let test_cases = [
        ("/System/Library/Frameworks", true),
        ("/usr/bin/ls", true),
    ];

    let mut group = c.benchmark_group("is_deletable_protected");
    for (path, expected) in test_cases {
        let name = if expected { "protected" } else { "not_protected" };
        group.bench_with_input(BenchmarkId::new("path", name), &path, |b, path| {
            b.iter(|| guard.is_deletable(black_box(Path::new(path))))
        });
    }
    group.finish();
}

fn bench_guard_creation(c: &mut Criterion) {
    let home = TempDir::new().unwrap();
    c.bench_function("guard_with_home", |b| {
        b.iter(|| SafetyGuard::with_home(black_box(home.path().to_path_buf())))
    });
}

fn bench_large_scale_classification(c: &mut Criterion) {
    let home = TempDir::new().unwrap();
    let paths = generate_test_paths(home.path(), 10_000);
    let guard = SafetyGuard::with_home(home.path().to_path_buf());

    c.bench_function("classify_10000_paths", |b| {
        b.iter(|| {
            for path in black_box(&paths) {
                let _ = guard.classify(path);
            }
        })
    });
}

criterion_group!(
    benches,
    bench_classify_single,
    bench_is_deletable_batch,
    bench_is_deletable_protected,
    bench_guard_creation,
    bench_large_scale_classification,
);

criterion_main!(benches);
