// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! State-directory layout, `config.toml` (§10.3), and the process-wide
//! session lockfile (§6, §9 "Global mutable state").

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::fmt::expand_home;

const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level overrides read from `config.toml` at the default state
/// directory root. Every field is optional; an absent file or an absent
/// field means the engine default applies. The engine never writes this
/// file, only reads it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    pub state_dir: Option<String>,
    pub retention_days: Option<u32>,
    pub large_file_threshold_mb: Option<u64>,
    pub dry_run_default: Option<bool>,
}

/// The state directory before any `config.toml` override is applied:
/// `TIDYMAC_HOME` if set, otherwise `$HOME/.tidymac`. `config.toml` itself
/// always lives here, since its own `state_dir` field can only redirect
/// *other* engine state, not its own location.
fn default_base_dir() -> PathBuf {
    if let Ok(over_ride) = std::env::var("TIDYMAC_HOME") {
        return PathBuf::from(over_ride);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tidymac")
}

/// Read `config.toml` from `base_dir`. A missing file is not an error. A
/// malformed file is logged at `warn` and treated as absent, so a typo
/// never blocks the engine from running with defaults.
fn load_engine_config_from(base_dir: &Path) -> EngineConfig {
    let path = base_dir.join(CONFIG_FILE_NAME);
    let text = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(_) => return EngineConfig::default(),
    };
    match toml::from_str(&text) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{}: ignoring malformed config.toml: {e}", path.display());
            EngineConfig::default()
        }
    }
}

/// Read `config.toml` from the default base directory
/// (`TIDYMAC_HOME`/`$HOME/.tidymac`).
pub fn load_engine_config() -> EngineConfig {
    load_engine_config_from(&default_base_dir())
}

/// Resolve the state directory: `config.toml`'s `state_dir` override if
/// present, otherwise `TIDYMAC_HOME`/`$HOME/.tidymac`.
pub fn state_dir() -> PathBuf {
    let base = default_base_dir();
    match load_engine_config_from(&base).state_dir {
        Some(over_ride) => expand_home(&over_ride),
        None => base,
    }
}

/// The retention window new sessions are created with, honoring
/// `config.toml`'s `retention_days` override.
pub fn effective_retention_days() -> u32 {
    load_engine_config()
        .retention_days
        .unwrap_or(crate::manifest::DEFAULT_RETENTION_DAYS)
}

/// The large-file threshold (in MB) a profile falls back to when
/// `config.toml` overrides it; `profile_default` is the profile's own
/// value, used when no override is configured.
pub fn effective_large_file_threshold_mb(profile_default: u64) -> u64 {
    apply_large_file_threshold_override(load_engine_config().large_file_threshold_mb, profile_default)
}

fn apply_large_file_threshold_override(over_ride: Option<u64>, profile_default: u64) -> u64 {
    over_ride.unwrap_or(profile_default)
}

/// The dry-run default a front-end collaborator should assume absent an
/// explicit flag from its own user, honoring `config.toml`'s
/// `dry_run_default` override.
pub fn dry_run_default() -> bool {
    load_engine_config().dry_run_default.unwrap_or(false)
}

pub fn ensure_layout(state_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(state_dir)?;
    fs::create_dir_all(state_dir.join("profiles"))?;
    fs::create_dir_all(state_dir.join("staging"))?;
    fs::create_dir_all(state_dir.join("sessions"))?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("session lock held by another process (pid {0})")]
    Held(u32),

    #[error("failed to access lockfile {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// A held session lock. Dropping it releases the lock by deleting the
/// lockfile; only one may be outstanding per state directory at a time.
pub struct SessionLock {
    path: PathBuf,
}

impl SessionLock {
    /// Acquire the lockfile at `<state-dir>/tidymac.lock`. If a lockfile
    /// already exists, its PID is checked for liveness; a stale lock (owner
    /// process gone) is reclaimed with a warning rather than refused.
    pub fn acquire(state_dir: &Path) -> Result<Self, LockError> {
        ensure_layout(state_dir).map_err(|e| LockError::Io {
            path: state_dir.display().to_string(),
            source: e,
        })?;

        let path = state_dir.join("tidymac.lock");

        if let Some(existing_pid) = read_lock_pid(&path) {
            if process_is_alive(existing_pid) {
                return Err(LockError::Held(existing_pid));
            }
            log::warn!("reclaiming stale session lock held by dead pid {existing_pid}");
        }

        let pid = std::process::id();
        let mut file = fs::File::create(&path).map_err(|e| LockError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        write!(file, "{pid}").map_err(|e| LockError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Ok(Self { path })
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn read_lock_pid(path: &Path) -> Option<u32> {
    let mut contents = String::new();
    fs::File::open(path).ok()?.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

fn process_is_alive(pid: u32) -> bool {
    use sysinfo::{Pid, System};
    let mut system = System::new();
    system.refresh_processes();
    system.process(Pid::from_u32(pid)).is_some()
}
