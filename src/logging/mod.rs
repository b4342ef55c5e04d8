// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Structured logging for removal operations (§10.1): a bounded
//! in-memory ring buffer alongside the standard `log` facade, so a
//! collaborator can pull recent deletion history without re-parsing
//! stderr.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::safety::SafetyLabel;

/// Maximum number of entries kept in memory.
const MAX_MEMORY_LOG_ENTRIES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalOutcome {
    Success,
    Failed,
    Skipped,
    DryRun,
}

impl std::fmt::Display for RemovalOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemovalOutcome::Success => write!(f, "SUCCESS"),
            RemovalOutcome::Failed => write!(f, "FAILED"),
            RemovalOutcome::Skipped => write!(f, "SKIPPED"),
            RemovalOutcome::DryRun => write!(f, "DRY_RUN"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalLogEntry {
    pub timestamp: String,
    pub path: String,
    pub safety: SafetyLabel,
    pub outcome: RemovalOutcome,
    pub bytes_freed: u64,
    pub error_message: Option<String>,
}

impl RemovalLogEntry {
    pub fn new(
        path: impl Into<String>,
        safety: SafetyLabel,
        outcome: RemovalOutcome,
        bytes_freed: u64,
        error_message: Option<String>,
    ) -> Self {
        let now: DateTime<Local> = Local::now();
        Self {
            timestamp: now.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            path: path.into(),
            safety,
            outcome,
            bytes_freed,
            error_message,
        }
    }
}

/// Ring-buffer logger for removal operations. Standard `log` crate output
/// (info/warn/error) happens alongside every call; the memory buffer
/// additionally lets a caller query recent activity without a log parser.
pub struct RemovalLogger {
    memory_log: Mutex<VecDeque<RemovalLogEntry>>,
}

impl Default for RemovalLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl RemovalLogger {
    pub fn new() -> Self {
        Self {
            memory_log: Mutex::new(VecDeque::with_capacity(MAX_MEMORY_LOG_ENTRIES)),
        }
    }

    pub fn log(
        &self,
        path: impl Into<String>,
        safety: SafetyLabel,
        outcome: RemovalOutcome,
        bytes_freed: u64,
        error_message: Option<String>,
    ) {
        let entry = RemovalLogEntry::new(path, safety, outcome, bytes_freed, error_message);

        match entry.outcome {
            RemovalOutcome::Success => {
                log::info!("removed {} ({} bytes) [{}]", entry.path, bytes_freed, safety);
            }
            RemovalOutcome::Failed => {
                log::error!(
                    "failed to remove {} [{}]: {}",
                    entry.path,
                    safety,
                    entry.error_message.as_deref().unwrap_or("unknown error")
                );
            }
            RemovalOutcome::Skipped => {
                log::warn!(
                    "skipped {} [{}]: {}",
                    entry.path,
                    safety,
                    entry.error_message.as_deref().unwrap_or("no reason given")
                );
            }
            RemovalOutcome::DryRun => {
                log::info!("(dry run) would remove {} ({} bytes) [{}]", entry.path, bytes_freed, safety);
            }
        }

        if let Ok(mut log) = self.memory_log.lock() {
            if log.len() >= MAX_MEMORY_LOG_ENTRIES {
                log.pop_front();
            }
            log.push_back(entry);
        }
    }

    pub fn recent(&self) -> Vec<RemovalLogEntry> {
        self.memory_log
            .lock()
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut log) = self.memory_log.lock() {
            log.clear();
        }
    }
}

static GLOBAL_LOGGER: std::sync::OnceLock<RemovalLogger> = std::sync::OnceLock::new();

pub fn global_logger() -> &'static RemovalLogger {
    GLOBAL_LOGGER.get_or_init(RemovalLogger::new)
}

pub fn log_removal(
    path: impl Into<String>,
    safety: SafetyLabel,
    outcome: RemovalOutcome,
    bytes_freed: u64,
    error_message: Option<String>,
) {
    global_logger().log(path, safety, outcome, bytes_freed, error_message);
}

/// Install the `env_logger` backend. Safe to call more than once; later
/// calls are no-ops, matching `env_logger`'s own idempotent `try_init`.
pub fn init() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}
