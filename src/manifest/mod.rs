// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Manifest & Undo (§4.8): the durable, self-describing record of a
//! session's removals, and the reverse operation that replays it.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::staging::{hash_file, StagingStore};

pub const SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write manifest {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("manifest {path} is not valid JSON: {source}")]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("session {0} has already been restored")]
    AlreadyRestored(String),

    #[error("session {0} is expired")]
    SessionExpired(String),

    #[error("session {0} not found")]
    NotFound(String),

    #[error("refusing to purge non-expired session {0} without --force")]
    NotExpired(String),

    #[error("undo is not supported for hard-mode sessions ({0})")]
    HardModeUndo(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Preview,
    Soft,
    Hard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalRecord {
    pub original_path: PathBuf,
    pub staged_path: Option<PathBuf>,
    pub size_bytes: u64,
    pub mtime: DateTime<Utc>,
    pub content_sha256: Option<String>,
    pub item_name: String,
    pub removed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub session_id: String,
    pub profile: String,
    pub mode: Mode,
    pub created_at: DateTime<Utc>,
    pub restored: bool,
    pub retention_days: u32,
    pub total_bytes: u64,
    pub total_files: u64,
    pub items: Vec<RemovalRecord>,
}

impl Manifest {
    pub fn new(session_id: impl Into<String>, profile: impl Into<String>, mode: Mode) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            session_id: session_id.into(),
            profile: profile.into(),
            mode,
            created_at: Utc::now(),
            restored: false,
            retention_days: DEFAULT_RETENTION_DAYS,
            total_bytes: 0,
            total_files: 0,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, record: RemovalRecord) {
        self.total_bytes += record.size_bytes;
        self.total_files += 1;
        self.items.push(record);
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let window = Duration::from_secs(u64::from(self.retention_days) * 86_400);
        match (now - self.created_at).to_std() {
            Ok(age) => age > window,
            Err(_) => false, // created_at is in the future; never expired
        }
    }

    fn path_in(state_dir: &Path, session_id: &str) -> PathBuf {
        state_dir.join("sessions").join(format!("{session_id}.json"))
    }

    /// Serialize to `<state-dir>/sessions/<session-id>.json` via
    /// write-to-tempfile + atomic rename.
    pub fn save(&self, state_dir: &Path) -> Result<(), ManifestError> {
        let sessions_dir = state_dir.join("sessions");
        fs::create_dir_all(&sessions_dir).map_err(|e| ManifestError::Write {
            path: sessions_dir.display().to_string(),
            source: e,
        })?;

        let final_path = Self::path_in(state_dir, &self.session_id);
        let tmp_path = sessions_dir.join(format!(".{}.tmp", self.session_id));

        let json = serde_json::to_vec_pretty(self).map_err(|e| ManifestError::InvalidJson {
            path: final_path.display().to_string(),
            source: e,
        })?;

        {
            let mut tmp_file = File::create(&tmp_path).map_err(|e| ManifestError::Write {
                path: tmp_path.display().to_string(),
                source: e,
            })?;
            tmp_file.write_all(&json).map_err(|e| ManifestError::Write {
                path: tmp_path.display().to_string(),
                source: e,
            })?;
            tmp_file.sync_all().map_err(|e| ManifestError::Write {
                path: tmp_path.display().to_string(),
                source: e,
            })?;
        }

        fs::rename(&tmp_path, &final_path).map_err(|e| ManifestError::Write {
            path: final_path.display().to_string(),
            source: e,
        })
    }

    pub fn load(state_dir: &Path, session_id: &str) -> Result<Self, ManifestError> {
        let path = Self::path_in(state_dir, session_id);
        let bytes = fs::read(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ManifestError::NotFound(session_id.to_string())
            } else {
                ManifestError::Read {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|e| ManifestError::InvalidJson {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn list(state_dir: &Path) -> Vec<Manifest> {
        let sessions_dir = state_dir.join("sessions");
        let Ok(entries) = fs::read_dir(&sessions_dir) else {
            return Vec::new();
        };

        let mut manifests: Vec<Manifest> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("json"))
            .filter_map(|e| fs::read(e.path()).ok())
            .filter_map(|bytes| serde_json::from_slice(&bytes).ok())
            .collect();

        manifests.sort_by(|a: &Manifest, b: &Manifest| a.session_id.cmp(&b.session_id));
        manifests
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RestoreResult {
    pub restored_count: u64,
    pub restored_bytes: u64,
    pub errors: Vec<String>,
}

/// Restore every RemovalRecord in `manifest`, in reverse order, verifying
/// staged content against its recorded SHA-256 where one was captured.
/// `now` is threaded in rather than read internally so expiry is
/// deterministic to test.
pub fn undo(
    state_dir: &Path,
    manifest: &mut Manifest,
    now: DateTime<Utc>,
) -> Result<RestoreResult, ManifestError> {
    if manifest.mode == Mode::Hard {
        return Err(ManifestError::HardModeUndo(manifest.session_id.clone()));
    }
    if manifest.restored {
        return Err(ManifestError::AlreadyRestored(manifest.session_id.clone()));
    }
    if manifest.is_expired(now) {
        return Err(ManifestError::SessionExpired(manifest.session_id.clone()));
    }

    let mut result = RestoreResult::default();
    let mut any_failure = false;

    for record in manifest.items.iter().rev() {
        let Some(staged_path) = &record.staged_path else {
            result
                .errors
                .push(format!("{}: no staged path recorded", record.original_path.display()));
            any_failure = true;
            continue;
        };

        if !staged_path.exists() {
            result
                .errors
                .push(format!("{}: staged file missing", staged_path.display()));
            any_failure = true;
            continue;
        }

        if let Some(expected) = &record.content_sha256 {
            match hash_file(staged_path) {
                Ok(actual) if &actual == expected => {}
                Ok(_) => {
                    result
                        .errors
                        .push(format!("{}: content hash mismatch", staged_path.display()));
                    any_failure = true;
                    continue;
                }
                Err(e) => {
                    result
                        .errors
                        .push(format!("{}: failed to verify: {e}", staged_path.display()));
                    any_failure = true;
                    continue;
                }
            }
        }

        if let Some(parent) = record.original_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                result
                    .errors
                    .push(format!("{}: failed to recreate parent: {e}", record.original_path.display()));
                any_failure = true;
                continue;
            }
        }

        match fs::rename(staged_path, &record.original_path) {
            Ok(()) => {
                result.restored_count += 1;
                result.restored_bytes += record.size_bytes;
            }
            Err(e) => {
                result
                    .errors
                    .push(format!("{}: failed to restore: {e}", record.original_path.display()));
                any_failure = true;
            }
        }
    }

    if !any_failure {
        manifest.restored = true;
        let staging_root = state_dir.join("staging").join(&manifest.session_id);
        let _ = remove_empty_dirs(&staging_root);
        manifest.save(state_dir)?;
    }

    Ok(result)
}

fn remove_empty_dirs(root: &Path) -> io::Result<()> {
    if !root.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            let _ = remove_empty_dirs(&entry.path());
        }
    }
    if fs::read_dir(root)?.next().is_none() {
        fs::remove_dir(root)?;
    }
    Ok(())
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PurgeResult {
    pub sessions_purged: u64,
    pub bytes_freed: u64,
}

pub enum PurgePolicy {
    Expired,
    All { force: bool },
}

/// Remove staging directories and manifests of sessions past the
/// retention window. `purge(expired); purge(expired)` must be idempotent:
/// the second call always reports zero sessions purged (§8 invariant 4).
pub fn purge(state_dir: &Path, policy: &PurgePolicy, now: DateTime<Utc>) -> PurgeResult {
    let mut result = PurgeResult::default();

    for manifest in Manifest::list(state_dir) {
        let eligible = match policy {
            PurgePolicy::Expired => manifest.is_expired(now),
            PurgePolicy::All { force } => *force || manifest.is_expired(now),
        };
        if !eligible {
            continue;
        }

        let staging_root = state_dir.join("staging").join(&manifest.session_id);
        let bytes_here = dir_size(&staging_root);
        let _ = fs::remove_dir_all(&staging_root);

        let manifest_path = state_dir.join("sessions").join(format!("{}.json", manifest.session_id));
        if fs::remove_file(&manifest_path).is_ok() {
            result.sessions_purged += 1;
            result.bytes_freed += bytes_here;
        }
    }

    result
}

fn dir_size(path: &Path) -> u64 {
    if !path.exists() {
        return 0;
    }
    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}
