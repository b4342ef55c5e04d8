// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! The Safety Guard: the single gatekeeper consulted before any path is
//! inspected or deleted.
//!
//! Fails closed: canonicalization errors, symlink escapes, and paths that
//! match neither the blocklist nor the allowlist are all denied. There is no
//! permissive fallback classification for unrecognized locations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::warn;

use super::level::SafetyLevel;
use super::paths::{matches_any, path_component_depth, ALLOWLIST, BLOCKLIST};

/// A pluggable rule consulted before the built-in tables. Lets a profile or
/// caller extend the Guard without touching its core logic.
pub trait SafetyRule: Send + Sync {
    fn name(&self) -> &str;
    fn evaluate(&self, path: &Path) -> Option<SafetyLevel>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GuardError {
    #[error("failed to canonicalize {path}: {reason}")]
    CanonicalizeFailed { path: String, reason: String },

    #[error("{path} resolves outside the home directory via a symlink")]
    SymlinkEscape { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

pub struct SafetyGuard {
    home: PathBuf,
    custom_rules: Vec<Arc<dyn SafetyRule>>,
}

impl SafetyGuard {
    pub fn new() -> Self {
        Self::with_home(dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")))
    }

    pub fn with_home(home: PathBuf) -> Self {
        let mut guard = Self {
            home,
            custom_rules: Vec::new(),
        };
        guard.add_rule(Arc::new(super::dev_rule::DevArtifactRule));
        guard
    }

    pub fn add_rule(&mut self, rule: Arc<dyn SafetyRule>) {
        self.custom_rules.push(rule);
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Internal four-value classification, used by rules that need to
    /// distinguish Caution from Warning. Unlike `is_deletable`, this never
    /// fails closed on its own — callers that need the fail-closed contract
    /// must use `is_deletable`.
    pub fn classify(&self, path: &Path) -> SafetyLevel {
        for rule in &self.custom_rules {
            if let Some(level) = rule.evaluate(path) {
                return level;
            }
        }

        if matches_any(path, BLOCKLIST, &self.home) {
            return SafetyLevel::Danger;
        }

        if matches_any(path, ALLOWLIST, &self.home) {
            return SafetyLevel::Safe;
        }

        // Unrecognized: classify as Danger so `is_deletable` denies it.
        // There is deliberately no permissive characteristics-based fallback.
        SafetyLevel::Danger
    }

    /// True when `path` falls under a blocklisted prefix and traversal must
    /// not descend into it. Unlike `is_deletable`, this does not also
    /// require allowlist membership — it is used by the Walker to decide
    /// whether to keep recursing into a directory it is already inside
    /// (e.g. scanning the home directory for oversized files must not wander
    /// into `~/Documents`), not whether that directory may be deleted.
    pub fn blocks_descent(&self, path: &Path) -> bool {
        matches_any(path, BLOCKLIST, &self.home) && path != self.home
    }

    /// `is_deletable(path) -> allow | deny(reason)`, per §4.1.
    pub fn is_deletable(&self, path: &Path) -> Decision {
        let canonical = match self.canonicalize(path) {
            Ok(p) => p,
            Err(e) => {
                warn!("safety guard: denying {}: {e}", path.display());
                return Decision::Deny(e.to_string());
            }
        };

        if path_component_depth(&canonical) <= 2 {
            return Decision::Deny("path too close to filesystem root".to_string());
        }

        if canonical == self.home {
            return Decision::Deny("refusing to operate on the home directory".to_string());
        }

        if matches_any(&canonical, BLOCKLIST, &self.home) {
            return Decision::Deny("protected path".to_string());
        }

        for rule in &self.custom_rules {
            if let Some(level) = rule.evaluate(&canonical) {
                return if level.is_deletable() {
                    Decision::Allow
                } else {
                    Decision::Deny(format!("custom rule `{}` denied this path", rule.name()))
                };
            }
        }

        if matches_any(&canonical, ALLOWLIST, &self.home) {
            return Decision::Allow;
        }

        Decision::Deny("unrecognized location".to_string())
    }

    /// Canonicalize `path`, rejecting any resolution that escapes the home
    /// directory into a blocklisted area. Non-existent paths (common during
    /// a scan racing deletion elsewhere) canonicalize via their existing
    /// parent instead of failing outright.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, GuardError> {
        let canonical = if path.exists() {
            std::fs::canonicalize(path).map_err(|e| GuardError::CanonicalizeFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        } else {
            let parent = path.parent().unwrap_or(path);
            let canon_parent =
                std::fs::canonicalize(parent).map_err(|e| GuardError::CanonicalizeFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            match path.file_name() {
                Some(name) => canon_parent.join(name),
                None => canon_parent,
            }
        };

        if matches_any(&canonical, BLOCKLIST, &self.home) && !matches_any(path, BLOCKLIST, &self.home) {
            return Err(GuardError::SymlinkEscape {
                path: path.display().to_string(),
            });
        }

        Ok(canonical)
    }
}

impl Default for SafetyGuard {
    fn default() -> Self {
        Self::new()
    }
}
