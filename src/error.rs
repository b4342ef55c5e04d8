// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Crate-wide error type
//!
//! Each component defines its own narrow `thiserror` enum; this type wraps
//! them for the operations in `crate::api` that span more than one component.

use crate::cleaner::CleanError;
use crate::dedupe::DedupeError;
use crate::manifest::ManifestError;
use crate::safety::GuardError;
use crate::staging::StagingError;
use crate::walker::ScanError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Dedupe(#[from] DedupeError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Clean(#[from] CleanError),

    #[error("invalid profile {name}: {reason}")]
    InvalidProfile { name: String, reason: String },

    #[error("session lock held by another process (pid {0})")]
    SessionLocked(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
