// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Consumer API (§6): the synchronous, JSON-serializable operations a
//! CLI or GUI collaborator calls. `anyhow::Context` is used only here,
//! at the outermost layer — every component below propagates its own
//! narrow `thiserror` type (§10.2).

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::catalog::profile::{PartialProfile, Profile, ProfileResolver};
use crate::classifier::Classifier;
use crate::cleaner::{self, ProgressUpdate, Selector};
use crate::config::{self, SessionLock};
use crate::dedupe::{self, DuplicateGroup};
use crate::devtool::DevToolDetector;
use crate::diskusage::{all_disk_usage, DiskUsage};
use crate::manifest::{self, Manifest, Mode, PurgePolicy, RestoreResult};
use crate::safety::SafetyGuard;
use crate::walker::ParallelWalker;
use crate::classifier::Inventory;

/// Conventional locations developers keep project checkouts, searched by
/// the dev-tool detector in addition to the literal catalog targets. Not
/// part of the public schema; an implementation detail of `scan`.
const DEV_PROJECT_ROOTS: &[&str] = &[
    "~/Developer",
    "~/Projects",
    "~/dev",
    "~/code",
    "~/src",
    "~/git",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub name: String,
    pub description: String,
    pub aggression: crate::catalog::profile::Aggression,
}

pub fn list_profiles() -> Vec<ProfileSummary> {
    ProfileResolver::list_built_ins()
        .into_iter()
        .map(|p| ProfileSummary {
            name: p.name,
            description: p.description,
            aggression: p.aggression,
        })
        .collect()
}

/// Run a scan under `profile_name`, optionally merged with a caller-supplied
/// override, against `home` (defaults to the process's home directory).
pub fn scan(profile_name: &str, custom: Option<&PartialProfile>, home: Option<PathBuf>) -> Result<Inventory> {
    let home = home.unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")));
    let mut policy = ProfileResolver::resolve(profile_name, custom)
        .with_context(|| format!("unknown profile `{profile_name}`"))?;

    let threshold_mb = config::effective_large_file_threshold_mb(policy.large_file_threshold_mb);
    for target in &mut policy.targets {
        if target.name == "Large files" {
            target.min_size_bytes = Some(threshold_mb * 1024 * 1024);
        }
    }

    let guard = SafetyGuard::with_home(home.clone());
    let start = SystemTime::now();

    let walker = ParallelWalker::new(&guard);
    let walk_results = walker.walk(&policy.targets);

    let roots: Vec<PathBuf> = DEV_PROJECT_ROOTS
        .iter()
        .map(|r| crate::fmt::expand_home(&r.replace("~/", &format!("{}/", home.display()))))
        .filter(|p| p.is_dir())
        .collect();
    let detector = DevToolDetector::new(&guard);
    let detected = detector.scan(&roots);

    let inventory = Classifier::new(&guard).classify(walk_results, detected, &policy, start);
    Ok(inventory)
}

pub fn disk_usage() -> Vec<DiskUsage> {
    all_disk_usage()
}

/// Whether a caller's own user interface should default to preview mode
/// absent an explicit flag, per `config.toml`'s `dry_run_default` (§10.3).
pub fn dry_run_default() -> bool {
    config::dry_run_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanMode {
    Preview,
    Soft,
    Hard,
}

impl From<CleanMode> for Mode {
    fn from(m: CleanMode) -> Self {
        match m {
            CleanMode::Preview => Mode::Preview,
            CleanMode::Soft => Mode::Soft,
            CleanMode::Hard => Mode::Hard,
        }
    }
}

/// Clean the items named in `item_names` (empty means "all") from
/// `inventory`, under `mode`. Acquires the process-wide session lock for
/// the duration of the call when `mode` mutates the filesystem.
pub fn clean(
    home: &Path,
    inventory: &Inventory,
    mode: CleanMode,
    item_names: &[String],
    force: bool,
    verify: bool,
) -> Result<cleaner::CleanResult> {
    let state_dir = config::state_dir();
    config::ensure_layout(&state_dir).context("failed to initialize state directory")?;

    let guard = SafetyGuard::with_home(home.to_path_buf());
    let selector = if item_names.is_empty() {
        Selector::All
    } else {
        Selector::Named(item_names)
    };

    let _lock = if mode == CleanMode::Preview {
        None
    } else {
        Some(SessionLock::acquire(&state_dir).context("another cleaner session is active")?)
    };

    cleaner::clean(&state_dir, &guard, inventory, selector, mode.into(), force, verify, |_progress: ProgressUpdate| {})
        .context("clean operation failed")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub profile: String,
    pub mode: Mode,
    pub created_at: chrono::DateTime<Utc>,
    pub restored: bool,
    pub total_bytes: u64,
    pub total_files: u64,
}

pub fn list_sessions() -> Vec<SessionSummary> {
    let state_dir = config::state_dir();
    Manifest::list(&state_dir)
        .into_iter()
        .map(|m| SessionSummary {
            session_id: m.session_id,
            profile: m.profile,
            mode: m.mode,
            created_at: m.created_at,
            restored: m.restored,
            total_bytes: m.total_bytes,
            total_files: m.total_files,
        })
        .collect()
}

pub fn restore(session_id: &str) -> Result<RestoreResult> {
    let state_dir = config::state_dir();
    let mut loaded = Manifest::load(&state_dir, session_id)
        .with_context(|| format!("failed to load session {session_id}"))?;
    manifest::undo(&state_dir, &mut loaded, Utc::now()).context("undo failed")
}

pub fn find_duplicates(root: &Path, perceptual: bool) -> Result<Vec<DuplicateGroup>> {
    let candidates: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();

    dedupe::find_duplicates(&candidates, perceptual).context("duplicate scan failed")
}

#[derive(Debug, Clone, Copy)]
pub enum PurgeRequest {
    Expired,
    All { force: bool },
}

pub fn purge(policy: PurgeRequest) -> manifest::PurgeResult {
    let state_dir = config::state_dir();
    let policy = match policy {
        PurgeRequest::Expired => PurgePolicy::Expired,
        PurgeRequest::All { force } => PurgePolicy::All { force },
    };
    manifest::purge(&state_dir, &policy, Utc::now())
}

/// A user-defined profile loaded from `<state-dir>/profiles/<name>.toml`.
pub fn load_user_profile(name: &str) -> Result<Profile> {
    let state_dir = config::state_dir();
    let path = state_dir.join("profiles").join(format!("{name}.toml"));
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read profile {}", path.display()))?;
    let partial = PartialProfile::parse(&text).with_context(|| format!("invalid profile {name}"))?;
    let base = ProfileResolver::resolve("quick", None)
        .expect("built-in `quick` profile always resolves");
    Ok(Profile {
        name: partial.name.clone().unwrap_or_else(|| name.to_string()),
        description: partial.description.clone().unwrap_or_default(),
        aggression: partial.aggression.unwrap_or(base.aggression),
        targets: partial.targets.clone().unwrap_or(base.targets.iter().map(|t| t.name.to_string()).collect()),
        stale_days: partial.stale_days.unwrap_or(base.stale_days),
        large_file_threshold_mb: partial.large_file_threshold_mb.unwrap_or(base.large_file_threshold_mb),
        include_dangerous: partial.include_dangerous.unwrap_or(base.include_dangerous),
    })
}
