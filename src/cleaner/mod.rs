// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Cleaner Orchestrator (§4.9): turns an Inventory plus a subset
//! selector into filesystem mutation, in preview, soft, or hard mode.

use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::classifier::{Inventory, InventoryItem};
use crate::config;
use crate::logging::{log_removal, RemovalOutcome};
use crate::manifest::{Manifest, Mode, RemovalRecord};
use crate::safety::SafetyGuard;
use crate::staging::StagingStore;

/// Minimum interval between progress callbacks (§4.9: "bounded cadence").
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    #[error("no item named {0} in the inventory")]
    UnknownItem(String),

    #[error(transparent)]
    Staging(#[from] crate::staging::StagingError),

    #[error(transparent)]
    Manifest(#[from] crate::manifest::ManifestError),

    #[error("failed to create session lock: {0}")]
    LockHeld(String),
}

#[derive(Debug, Clone, Copy)]
pub enum Selector<'a> {
    All,
    Named(&'a [String]),
}

impl Selector<'_> {
    fn matches(&self, item: &InventoryItem) -> bool {
        match self {
            Selector::All => true,
            Selector::Named(names) => names.iter().any(|n| n == &item.name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanResult {
    pub files_removed: u64,
    pub bytes_freed: u64,
    pub session_id: Option<String>,
    pub errors: Vec<String>,
}

/// Bytes-processed progress, emitted at a bounded cadence during soft/hard
/// cleaning. Consumers use this for UI progress bars.
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    pub bytes_processed: u64,
    pub bytes_total: u64,
    pub files_processed: u64,
}

/// Clean the items in `inventory` matching `selector`, in `mode`.
///
/// `force` bypasses the "file changed since scan" skip. `verify` enables
/// SHA-256 verification during staging (soft mode only). `on_progress` is
/// called at most once per `PROGRESS_INTERVAL`.
#[allow(clippy::too_many_arguments)]
pub fn clean(
    state_dir: &Path,
    guard: &SafetyGuard,
    inventory: &Inventory,
    selector: Selector,
    mode: Mode,
    force: bool,
    verify: bool,
    mut on_progress: impl FnMut(ProgressUpdate),
) -> Result<CleanResult, CleanError> {
    let selected: Vec<&InventoryItem> = inventory.items.iter().filter(|i| selector.matches(i)).collect();

    if mode == Mode::Preview {
        let bytes_freed = selected.iter().map(|i| i.bytes).sum();
        let files_removed = selected.iter().map(|i| i.file_count).sum();
        return Ok(CleanResult {
            files_removed,
            bytes_freed,
            session_id: None,
            errors: Vec::new(),
        });
    }

    let session_id = session_id_now();
    let mut manifest = Manifest::new(&session_id, &inventory.profile_name, mode);
    manifest.retention_days = config::effective_retention_days();
    let staging = if mode == Mode::Soft {
        Some(StagingStore::create(state_dir, &session_id, verify)?)
    } else {
        None
    };

    let mut result = CleanResult {
        files_removed: 0,
        bytes_freed: 0,
        session_id: Some(session_id.clone()),
        errors: Vec::new(),
    };

    let bytes_total: u64 = selected.iter().map(|i| i.bytes).sum();
    let mut bytes_processed = 0u64;
    let mut last_emit = Instant::now();

    for item in &selected {
        for path in &item.paths {
            // TOCTOU re-check: the Inventory reflects the state at scan
            // time, not now.
            let decision = guard.is_deletable(path);
            if !decision.is_allow() {
                result.errors.push(format!("{}: safety_refused", path.display()));
                log_removal(path.display().to_string(), item.safety, RemovalOutcome::Skipped, 0, Some("safety_refused".to_string()));
                continue;
            }

            let metadata = match std::fs::symlink_metadata(path) {
                Ok(m) => m,
                Err(e) => {
                    result.errors.push(format!("{}: {e}", path.display()));
                    continue;
                }
            };

            if !force {
                if let Some(scanned) = item.stat_for(path) {
                    let current_mtime = metadata.modified().ok();
                    let changed = scanned.size != metadata.len()
                        || current_mtime.map_or(false, |m| m != scanned.mtime);
                    if changed {
                        result
                            .errors
                            .push(format!("{}: changed since scan, skipped", path.display()));
                        log_removal(path.display().to_string(), item.safety, RemovalOutcome::Skipped, 0, Some("changed since scan".to_string()));
                        continue;
                    }
                }
            }

            let size = metadata.len();
            let remove_outcome = match mode {
                Mode::Soft => {
                    let store = staging.as_ref().expect("soft mode always has a staging store");
                    store.stage(path).map(|staged| {
                        manifest.push(RemovalRecord {
                            original_path: path.clone(),
                            staged_path: Some(staged.staged_path),
                            size_bytes: staged.size_bytes,
                            mtime: metadata
                                .modified()
                                .map(chrono::DateTime::<Utc>::from)
                                .unwrap_or_else(|_| Utc::now()),
                            content_sha256: staged.content_sha256,
                            item_name: item.name.clone(),
                            removed_at: Utc::now(),
                        });
                    })
                    .map_err(CleanError::from)
                }
                Mode::Hard => {
                    let remove = if metadata.is_dir() {
                        std::fs::remove_dir_all(path)
                    } else {
                        std::fs::remove_file(path)
                    };
                    remove
                        .map(|()| {
                            manifest.push(RemovalRecord {
                                original_path: path.clone(),
                                staged_path: None,
                                size_bytes: size,
                                mtime: metadata
                                    .modified()
                                    .map(chrono::DateTime::<Utc>::from)
                                    .unwrap_or_else(|_| Utc::now()),
                                content_sha256: None,
                                item_name: item.name.clone(),
                                removed_at: Utc::now(),
                            });
                        })
                        .map_err(|e| CleanError::Staging(crate::staging::StagingError::Stage {
                            path: path.display().to_string(),
                            source: e,
                        }))
                }
                Mode::Preview => unreachable!("preview returns earlier"),
            };

            match remove_outcome {
                Ok(()) => {
                    result.files_removed += 1;
                    result.bytes_freed += size;
                    bytes_processed += size;
                    log_removal(path.display().to_string(), item.safety, RemovalOutcome::Success, size, None);
                }
                Err(e) => {
                    result.errors.push(format!("{}: {e}", path.display()));
                    log_removal(path.display().to_string(), item.safety, RemovalOutcome::Failed, 0, Some(e.to_string()));
                }
            }

            if last_emit.elapsed() >= PROGRESS_INTERVAL {
                on_progress(ProgressUpdate {
                    bytes_processed,
                    bytes_total,
                    files_processed: result.files_removed,
                });
                last_emit = Instant::now();
            }
        }
    }

    on_progress(ProgressUpdate {
        bytes_processed,
        bytes_total,
        files_processed: result.files_removed,
    });

    if let Err(e) = manifest.save(state_dir) {
        if let Some(store) = &staging {
            rollback_staged(&manifest, store);
        }
        return Err(CleanError::Manifest(e));
    }

    Ok(result)
}

fn rollback_staged(manifest: &Manifest, _store: &StagingStore) {
    for record in &manifest.items {
        if let Some(staged_path) = &record.staged_path {
            if staged_path.exists() {
                if let Some(parent) = record.original_path.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                let _ = std::fs::rename(staged_path, &record.original_path);
            }
        }
    }
}

fn session_id_now() -> String {
    let now = SystemTime::now();
    let datetime: chrono::DateTime<Utc> = now.into();
    datetime.format("%Y-%m-%dT%H-%M-%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::SafetyLabel;
    use tempfile::tempdir;

    fn inventory_with_file(name: &str, path: std::path::PathBuf, bytes: u64) -> Inventory {
        Inventory {
            profile_name: "developer".to_string(),
            duration: Duration::from_millis(1),
            items: vec![InventoryItem {
                name: name.to_string(),
                category: "Cache".to_string(),
                paths: vec![path],
                bytes,
                file_count: 1,
                safety: SafetyLabel::Safe,
                reason: "test".to_string(),
                path_stats: Vec::new(),
            }],
            total_reclaimable_bytes: bytes,
            total_files: 1,
            errors: Vec::new(),
        }
    }

    #[test]
    fn preview_mode_mutates_nothing() {
        let home = tempdir().unwrap();
        let state_dir = tempdir().unwrap();
        let cache_file = home.path().join("Library/Caches/app/data.bin");
        std::fs::create_dir_all(cache_file.parent().unwrap()).unwrap();
        std::fs::write(&cache_file, vec![0u8; 2048]).unwrap();

        let guard = SafetyGuard::with_home(home.path().to_path_buf());
        let inventory = inventory_with_file("app cache", cache_file.clone(), 2048);

        let result = clean(
            state_dir.path(),
            &guard,
            &inventory,
            Selector::All,
            Mode::Preview,
            false,
            false,
            |_| {},
        )
        .unwrap();

        assert_eq!(result.bytes_freed, 2048);
        assert!(result.session_id.is_none());
        assert!(cache_file.exists());
    }

    #[test]
    fn soft_mode_stages_file_and_writes_manifest() {
        let home = tempdir().unwrap();
        let state_dir = tempdir().unwrap();
        let cache_file = home.path().join("Library/Caches/app/data.bin");
        std::fs::create_dir_all(cache_file.parent().unwrap()).unwrap();
        std::fs::write(&cache_file, vec![0u8; 2048]).unwrap();

        let guard = SafetyGuard::with_home(home.path().to_path_buf());
        let inventory = inventory_with_file("app cache", cache_file.clone(), 2048);

        let result = clean(
            state_dir.path(),
            &guard,
            &inventory,
            Selector::All,
            Mode::Soft,
            false,
            true,
            |_| {},
        )
        .unwrap();

        assert_eq!(result.files_removed, 1);
        assert_eq!(result.bytes_freed, 2048);
        assert!(!cache_file.exists());
        let session_id = result.session_id.unwrap();
        assert!(Manifest::load(state_dir.path(), &session_id).is_ok());
    }

    #[test]
    fn safety_guard_refusal_is_recorded_not_fatal() {
        let home = tempdir().unwrap();
        let state_dir = tempdir().unwrap();
        let documents = home.path().join("Documents");
        std::fs::create_dir_all(&documents).unwrap();

        let guard = SafetyGuard::with_home(home.path().to_path_buf());
        let inventory = inventory_with_file("documents", documents.clone(), 4096);

        let result = clean(
            state_dir.path(),
            &guard,
            &inventory,
            Selector::All,
            Mode::Hard,
            false,
            false,
            |_| {},
        )
        .unwrap();

        assert_eq!(result.files_removed, 0);
        assert!(result.errors.iter().any(|e| e.contains("safety_refused")));
        assert!(documents.exists());
    }
}
