// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Classifier / Inventory: folds walker output and detected dev-tool
//! projects into named InventoryItems.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::catalog::profile::ActivePolicy;
use crate::devtool::DetectedProject;
use crate::safety::{SafetyGuard, SafetyLabel, SafetyLevel};
use crate::walker::TargetWalkResult;

/// Items below this sum are dropped entirely (§4.5).
pub const MIN_ITEM_BYTES: u64 = 1024 * 1024;

/// The size and mtime each path had at scan time, kept alongside the
/// public item so the Cleaner can detect "changed since scan" without a
/// second walk. Not part of the public schema (§6 Inventory JSON).
#[derive(Debug, Clone, Copy)]
pub struct PathStat {
    pub size: u64,
    pub mtime: SystemTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub category: String,
    pub paths: Vec<PathBuf>,
    pub bytes: u64,
    pub file_count: u64,
    pub safety: SafetyLabel,
    pub reason: String,
    #[serde(skip)]
    pub path_stats: Vec<PathStat>,
}

impl InventoryItem {
    /// The scan-time (size, mtime) recorded for `path`, if any.
    pub fn stat_for(&self, path: &std::path::Path) -> Option<PathStat> {
        self.paths
            .iter()
            .position(|p| p == path)
            .and_then(|i| self.path_stats.get(i))
            .copied()
    }
}

impl InventoryItem {
    pub fn bytes_formatted(&self) -> String {
        crate::fmt::format_bytes(self.bytes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    pub profile_name: String,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub items: Vec<InventoryItem>,
    pub total_reclaimable_bytes: u64,
    pub total_files: u64,
    pub errors: Vec<String>,
}

mod duration_millis {
    use serde::{Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_millis())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

pub struct Classifier<'a> {
    guard: &'a SafetyGuard,
}

impl<'a> Classifier<'a> {
    pub fn new(guard: &'a SafetyGuard) -> Self {
        Self { guard }
    }

    /// Build the Inventory from raw walk results (one per catalog target)
    /// and dev-tool-detected projects, applying the Guard, the minimum-size
    /// drop, per-target staleness exclusion, and the final ordering rule.
    pub fn classify(
        &self,
        walk_results: Vec<TargetWalkResult>,
        detected: Vec<DetectedProject>,
        policy: &ActivePolicy,
        start: SystemTime,
    ) -> Inventory {
        let mut items = Vec::new();
        let mut errors = Vec::new();

        for result in walk_results {
            errors.extend(result.errors.iter().map(|e| format!("{}: {e}", result.target_name)));

            let target = policy.targets.iter().find(|t| t.name == result.target_name);
            let stale_days = target.and_then(|t| t.min_staleness_days);
            let min_size = target.and_then(|t| t.min_size_bytes);

            let now = SystemTime::now();
            let mut bytes = 0u64;
            let mut file_count = 0u64;
            let mut paths = Vec::new();
            let mut path_stats = Vec::new();
            let mut guard_rejected = false;

            for record in &result.records {
                if let Some(min) = min_size {
                    if record.size < min {
                        continue;
                    }
                }

                if let Some(days) = stale_days {
                    let age = now.duration_since(record.mtime).unwrap_or_default();
                    if age < Duration::from_secs(u64::from(days) * 86_400) {
                        continue;
                    }
                }

                if !self.guard.is_deletable(&record.path).is_allow() {
                    guard_rejected = true;
                    break;
                }

                bytes += record.size;
                file_count += 1;
                paths.push(record.path.clone());
                path_stats.push(PathStat {
                    size: record.size,
                    mtime: record.mtime,
                });
            }

            if guard_rejected || bytes < MIN_ITEM_BYTES {
                continue;
            }

            if let Some(target) = target {
                items.push(InventoryItem {
                    name: target.name.to_string(),
                    category: target.category.to_string(),
                    paths,
                    bytes,
                    file_count,
                    safety: target.default_safety.to_label(),
                    reason: target.reason.to_string(),
                    path_stats,
                });
            }
        }

        for project in detected {
            if !self.guard.is_deletable(&project.path).is_allow() {
                continue;
            }
            if project.size < MIN_ITEM_BYTES {
                continue;
            }

            let now_for_detected = SystemTime::now();
            let mut safety = SafetyLevel::Caution;
            if let Some(mtime) = project.most_recent_source_mtime {
                let age = SystemTime::now().duration_since(mtime).unwrap_or_default();
                if age >= Duration::from_secs(u64::from(policy.stale_days) * 86_400) {
                    safety = SafetyLevel::Safe;
                }
            }

            items.push(InventoryItem {
                name: project.kind.target_name().to_string(),
                category: "Dev".to_string(),
                paths: vec![project.path.clone()],
                bytes: project.size,
                file_count: 1,
                safety: safety.to_label(),
                reason: "Developer tool working directory, recreated on next build".to_string(),
                path_stats: vec![PathStat {
                    size: project.size,
                    mtime: project.most_recent_source_mtime.unwrap_or(now_for_detected),
                }],
            });
        }

        items.sort_by(|a, b| {
            rank(a.safety)
                .cmp(&rank(b.safety))
                .then(b.bytes.cmp(&a.bytes))
                .then(a.name.cmp(&b.name))
        });

        let total_reclaimable_bytes = items.iter().map(|i| i.bytes).sum();
        let total_files = items.iter().map(|i| i.file_count).sum();

        Inventory {
            profile_name: policy.profile_name.clone(),
            duration: SystemTime::now().duration_since(start).unwrap_or_default(),
            items,
            total_reclaimable_bytes,
            total_files,
            errors,
        }
    }
}

fn rank(label: SafetyLabel) -> u8 {
    match label {
        SafetyLabel::Safe => 0,
        SafetyLabel::Caution => 1,
        SafetyLabel::Dangerous => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::profile::Aggression;
    use crate::catalog::{catalog, ScanTarget, TargetKind};
    use crate::walker::{FileKind, FileRecord};
    use tempfile::tempdir;

    fn policy_for(targets: Vec<ScanTarget>) -> ActivePolicy {
        ActivePolicy {
            profile_name: "test".to_string(),
            targets,
            stale_days: 30,
            large_file_threshold_mb: 500,
            include_dangerous: false,
            aggression: Aggression::Medium,
        }
    }

    #[test]
    fn sums_bytes_and_counts_and_drops_small_items() {
        let dir = tempdir().unwrap();
        let cache_dir = dir.path().join("Library/Caches/pip");
        std::fs::create_dir_all(&cache_dir).unwrap();

        let target = catalog()
            .into_iter()
            .find(|t| t.name == "pip cache")
            .unwrap();

        let mut records = Vec::new();
        for i in 0..100 {
            let p = cache_dir.join(format!("f{i}.bin"));
            records.push(FileRecord {
                path: p,
                size: 100 * 1024,
                mtime: SystemTime::now(),
                kind: FileKind::Regular,
            });
        }

        let result = TargetWalkResult {
            target_name: "pip cache".to_string(),
            records,
            errors: Vec::new(),
            truncated: false,
        };

        let guard = SafetyGuard::with_home(dir.path().to_path_buf());
        let policy = policy_for(vec![target]);
        let inventory = Classifier::new(&guard).classify(vec![result], Vec::new(), &policy, SystemTime::now());

        assert_eq!(inventory.items.len(), 1);
        assert_eq!(inventory.items[0].file_count, 100);
        assert_eq!(inventory.items[0].bytes, 100 * 100 * 1024);
        assert_eq!(inventory.items[0].bytes_formatted(), "9.77 MiB");
        assert_eq!(inventory.total_reclaimable_bytes, inventory.items[0].bytes);
        assert_eq!(inventory.total_files, 100);
    }

    #[test]
    fn drops_item_when_any_path_rejected_by_guard() {
        let dir = tempdir().unwrap();
        let target = ScanTarget {
            name: "suspicious",
            category: "Cache",
            kind: TargetKind::Literal("~"),
            default_safety: SafetyLevel::Caution,
            reason: "test",
            min_size_bytes: None,
            min_staleness_days: None,
        };

        let records = vec![FileRecord {
            path: dir.path().join("Documents/secret.txt"),
            size: 2 * 1024 * 1024,
            mtime: SystemTime::now(),
            kind: FileKind::Regular,
        }];

        let result = TargetWalkResult {
            target_name: "suspicious".to_string(),
            records,
            errors: Vec::new(),
            truncated: false,
        };

        let guard = SafetyGuard::with_home(dir.path().to_path_buf());
        let policy = policy_for(vec![target]);
        let inventory = Classifier::new(&guard).classify(vec![result], Vec::new(), &policy, SystemTime::now());
        assert!(inventory.items.is_empty());
    }

    #[test]
    fn orders_safe_before_caution_before_dangerous() {
        let dir = tempdir().unwrap();
        let guard = SafetyGuard::with_home(dir.path().to_path_buf());
        let policy = policy_for(Vec::new());

        let mut items = vec![
            InventoryItem {
                name: "b-caution".to_string(),
                category: "Cache".to_string(),
                paths: vec![],
                bytes: 5 * MIN_ITEM_BYTES,
                file_count: 1,
                safety: SafetyLabel::Caution,
                reason: String::new(),
                path_stats: Vec::new(),
            },
            InventoryItem {
                name: "a-safe".to_string(),
                category: "Cache".to_string(),
                paths: vec![],
                bytes: MIN_ITEM_BYTES,
                file_count: 1,
                safety: SafetyLabel::Safe,
                reason: String::new(),
                path_stats: Vec::new(),
            },
        ];
        items.sort_by(|a, b| rank(a.safety).cmp(&rank(b.safety)).then(b.bytes.cmp(&a.bytes)).then(a.name.cmp(&b.name)));
        assert_eq!(items[0].name, "a-safe");
        let _ = (&guard, &policy);
    }
}
