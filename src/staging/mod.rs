// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Staging Store (§4.7): reversible removal via a session-scoped
//! quarantine directory that preserves each file's original relative
//! path beneath the staging root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("failed to create staging root {path}: {source}")]
    RootCreation {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to stage {path}: {source}")]
    Stage {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("copy verification failed for {path}: size or hash mismatch after cross-device copy")]
    VerificationFailed { path: String },
}

/// A single staged file or directory, ready to be recorded in the Manifest.
#[derive(Debug, Clone)]
pub struct StagedEntry {
    pub original_path: PathBuf,
    pub staged_path: PathBuf,
    pub size_bytes: u64,
    pub content_sha256: Option<String>,
}

/// Creates `<state-dir>/staging/<session-id>/` at mode 0700 and relocates
/// files into it, preserving their original path structure underneath.
pub struct StagingStore {
    root: PathBuf,
    verify: bool,
}

impl StagingStore {
    /// Create the staging root for `session_id` under `state_dir`.
    pub fn create(state_dir: &Path, session_id: &str, verify: bool) -> Result<Self, StagingError> {
        let root = state_dir.join("staging").join(session_id);
        fs::create_dir_all(&root).map_err(|e| StagingError::RootCreation {
            path: root.display().to_string(),
            source: e,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o700);
            fs::set_permissions(&root, perms).map_err(|e| StagingError::RootCreation {
                path: root.display().to_string(),
                source: e,
            })?;
        }

        Ok(Self { root, verify })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compute the staging destination for `original`, preserving its full
    /// path beneath the staging root (so `/Users/alice/.cache/foo` becomes
    /// `<staging>/Users/alice/.cache/foo`).
    pub fn destination_for(&self, original: &Path) -> PathBuf {
        let relative = original
            .strip_prefix("/")
            .unwrap_or(original);
        self.root.join(relative)
    }

    /// Stage a single file or directory, moving it into the staging root.
    /// Directories are moved with a single rename, never walked.
    pub fn stage(&self, original: &Path) -> Result<StagedEntry, StagingError> {
        let metadata = fs::symlink_metadata(original).map_err(|e| StagingError::Stage {
            path: original.display().to_string(),
            source: e,
        })?;
        let size_bytes = metadata.len();

        let destination = self.destination_for(original);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| StagingError::Stage {
                path: original.display().to_string(),
                source: e,
            })?;
        }

        let content_sha256 = if self.verify && metadata.is_file() {
            Some(hash_file(original).map_err(|e| StagingError::Stage {
                path: original.display().to_string(),
                source: e,
            })?)
        } else {
            None
        };

        match fs::rename(original, &destination) {
            Ok(()) => {}
            Err(e) if is_cross_device(&e) => {
                self.copy_then_unlink(original, &destination, &metadata, content_sha256.as_deref())?;
            }
            Err(e) => {
                return Err(StagingError::Stage {
                    path: original.display().to_string(),
                    source: e,
                })
            }
        }

        Ok(StagedEntry {
            original_path: original.to_path_buf(),
            staged_path: destination,
            size_bytes,
            content_sha256,
        })
    }

    fn copy_then_unlink(
        &self,
        original: &Path,
        destination: &Path,
        metadata: &fs::Metadata,
        expected_sha256: Option<&str>,
    ) -> Result<(), StagingError> {
        if metadata.is_dir() {
            copy_dir_recursive(original, destination).map_err(|e| StagingError::Stage {
                path: original.display().to_string(),
                source: e,
            })?;
        } else {
            fs::copy(original, destination).map_err(|e| StagingError::Stage {
                path: original.display().to_string(),
                source: e,
            })?;
            restore_mtime(original, destination);
        }

        let copied_size = fs::metadata(destination)
            .map(|m| m.len())
            .unwrap_or_default();
        if copied_size != metadata.len() {
            let _ = fs::remove_file(destination).or_else(|_| fs::remove_dir_all(destination));
            return Err(StagingError::VerificationFailed {
                path: original.display().to_string(),
            });
        }

        if let Some(expected) = expected_sha256 {
            let actual = hash_file(destination).map_err(|e| StagingError::Stage {
                path: original.display().to_string(),
                source: e,
            })?;
            if actual != expected {
                let _ = fs::remove_file(destination);
                return Err(StagingError::VerificationFailed {
                    path: original.display().to_string(),
                });
            }
        }

        if metadata.is_dir() {
            fs::remove_dir_all(original)
        } else {
            fs::remove_file(original)
        }
        .map_err(|e| StagingError::Stage {
            path: original.display().to_string(),
            source: e,
        })
    }

    /// Remove this staging root if it is empty (called after a successful
    /// undo, once every staged file has been moved back).
    pub fn remove_if_empty(&self) -> io::Result<()> {
        if fs::read_dir(&self.root)?.next().is_none() {
            fs::remove_dir(&self.root)?;
        }
        Ok(())
    }
}

/// EXDEV, the errno rename() raises when source and destination are on
/// different filesystems. Stable across the unix targets this crate
/// supports (macOS, Linux); avoided pulling in `libc` for one constant.
#[cfg(unix)]
const EXDEV: i32 = 18;

fn is_cross_device(e: &io::Error) -> bool {
    #[cfg(unix)]
    {
        e.raw_os_error() == Some(EXDEV)
    }
    #[cfg(not(unix))]
    {
        let _ = e;
        false
    }
}

fn copy_dir_recursive(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
            restore_mtime(&entry.path(), &dest);
        }
    }
    Ok(())
}

fn restore_mtime(original: &Path, copied: &Path) {
    if let Ok(metadata) = fs::metadata(original) {
        if let Ok(mtime) = metadata.modified() {
            let _ = filetime_set(copied, mtime);
        }
    }
}

fn filetime_set(path: &Path, mtime: std::time::SystemTime) -> io::Result<()> {
    let file = fs::OpenOptions::new().write(true).open(path)?;
    file.set_modified(mtime)
}

pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
