// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Parallel Walker: bounded-parallel directory traversal producing sized
//! file records grouped by the target that owns them.

use std::collections::HashSet;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

use log::warn;
use rayon::prelude::*;

use crate::catalog::ScanTarget;
use crate::safety::SafetyGuard;

const DEFAULT_TARGET_BUDGET: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    Other,
}

#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub mtime: SystemTime,
    pub kind: FileKind,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("root not found: {0}")]
    RootNotFound(String),
    #[error("target `{0}` truncated after exceeding its time budget")]
    Truncated(String),
}

/// Per-target outcome of a walk: the records found, any non-fatal warnings,
/// and whether the time budget cut the traversal short.
#[derive(Debug, Default, Clone)]
pub struct TargetWalkResult {
    pub target_name: String,
    pub records: Vec<FileRecord>,
    pub errors: Vec<String>,
    pub truncated: bool,
}

pub struct ParallelWalker<'a> {
    guard: &'a SafetyGuard,
    target_budget: Duration,
}

impl<'a> ParallelWalker<'a> {
    pub fn new(guard: &'a SafetyGuard) -> Self {
        Self {
            guard,
            target_budget: DEFAULT_TARGET_BUDGET,
        }
    }

    pub fn with_target_budget(mut self, budget: Duration) -> Self {
        self.target_budget = budget;
        self
    }

    /// Walk every resolved root of every target, in parallel across roots,
    /// depth-first within each root.
    pub fn walk(&self, targets: &[ScanTarget]) -> Vec<TargetWalkResult> {
        targets
            .par_iter()
            .map(|target| self.walk_target(target))
            .collect()
    }

    fn walk_target(&self, target: &ScanTarget) -> TargetWalkResult {
        let roots = target.kind.resolve(self.guard.home());
        let mut result = TargetWalkResult {
            target_name: target.name.to_string(),
            ..Default::default()
        };

        for root in roots {
            if !root.exists() {
                continue;
            }
            let (records, errors, truncated) = self.walk_root(&root);
            result.records.extend(records);
            result.errors.extend(errors);
            result.truncated |= truncated;
        }

        if result.truncated {
            warn!("walker: target `{}` truncated by time budget", target.name);
        }

        result
    }

    fn walk_root(&self, root: &Path) -> (Vec<FileRecord>, Vec<String>, bool) {
        let visited: Mutex<HashSet<(u64, u64)>> = Mutex::new(HashSet::new());
        let start = Instant::now();
        let mut records = Vec::new();
        let mut errors = Vec::new();
        let mut truncated = false;

        let walker = walkdir::WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.path() == root || !self.guard.blocks_descent(entry.path())
            });

        for entry in walker {
            if start.elapsed() > self.target_budget {
                truncated = true;
                break;
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    errors.push(format!("{e}"));
                    continue;
                }
            };

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    errors.push(format!("{}: {e}", entry.path().display()));
                    continue;
                }
            };

            let key = (metadata.dev(), metadata.ino());
            if metadata.is_dir() {
                let mut seen = visited.lock().unwrap();
                if !seen.insert(key) {
                    continue; // cycle via a directory hard link or bind mount
                }
                continue; // directories themselves are not recorded, only their files
            }

            let file_type = entry.file_type();
            let kind = if file_type.is_symlink() {
                FileKind::Symlink
            } else if file_type.is_file() {
                FileKind::Regular
            } else {
                FileKind::Other
            };

            if kind == FileKind::Symlink {
                let target = std::fs::read_link(entry.path()).ok();
                let resolves_within_root = target
                    .as_ref()
                    .map(|t| entry.path().parent().unwrap_or(root).join(t).starts_with(root))
                    .unwrap_or(false);
                if !resolves_within_root {
                    records.push(FileRecord {
                        path: entry.path().to_path_buf(),
                        size: metadata.len(),
                        mtime: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                        kind: FileKind::Symlink,
                    });
                    continue;
                }
            }

            records.push(FileRecord {
                path: entry.path().to_path_buf(),
                size: metadata.len(),
                mtime: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                kind,
            });
        }

        (records, errors, truncated)
    }
}
