// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Benchmark tests for scanning and classification.
//!
//! Tests performance of the Walker + Classifier pipeline with varying file
//! counts, and of a soft clean over the resulting inventory.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;

use tidymac_core::catalog::ProfileResolver;
use tidymac_core::classifier::Classifier;
use tidymac_core::cleaner::{self, Selector};
use tidymac_core::manifest::Mode;
use tidymac_core::safety::SafetyGuard;
use tidymac_core::walker::ParallelWalker;

fn create_test_files(home: &Path, count: usize) {
    let cache_dir = home.join("Library/Caches/bench-app");
    fs::create_dir_all(&cache_dir).unwrap();

    for i in 0..count {
        let file_path = cache_dir.join(format!("cache_file_{i}.tmp"));
        let mut file = File::create(&file_path).unwrap();
        write!(file, "cache data for file {i}").unwrap();
    }
}

fn scan_once(home: &Path) {
    let guard = SafetyGuard::with_home(home.to_path_buf());
    let policy = ProfileResolver::resolve("quick", None).unwrap();
    let walk_results = ParallelWalker::new(&guard).walk(&policy.targets);
    let _inventory = Classifier::new(&guard).classify(walk_results, Vec::new(), &policy, SystemTime::now());
}

fn bench_scan_small_directory(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    create_test_files(temp.path(), 100);

    c.bench_function("scan_100_cache_files", |b| {
        b.iter(|| scan_once(black_box(temp.path())))
    });
}

fn bench_scan_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_scaling");

    for size in [100, 1_000, 10_000].iter() {
        let temp = TempDir::new().unwrap();
        create_test_files(temp.path(), *size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _size| {
            b.iter(|| scan_once(black_box(temp.path())));
        });
    }

    group.finish();
}

fn bench_soft_clean_parallel(c: &mut Criterion) {
    c.bench_function("soft_clean_1000_cache_files", |b| {
        b.iter_batched(
            || {
                let home = TempDir::new().unwrap();
                let state_dir = TempDir::new().unwrap();
                create_test_files(home.path(), 1000);
                (home, state_dir)
            },
            |(home, state_dir)| {
                let guard = SafetyGuard::with_home(home.path().to_path_buf());
                let policy = ProfileResolver::resolve("quick", None).unwrap();
                let walk_results = ParallelWalker::new(&guard).walk(&policy.targets);
                let inventory =
                    Classifier::new(&guard).classify(walk_results, Vec::new(), &policy, SystemTime::now());
                let _ = cleaner::clean(
                    state_dir.path(),
                    &guard,
                    &inventory,
                    Selector::All,
                    Mode::Soft,
                    false,
                    false,
                    |_| {},
                );
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_scan_small_directory,
    bench_scan_scaling,
    bench_soft_clean_parallel
);

criterion_main!(benches);
