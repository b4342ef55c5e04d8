// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Target Catalog: the declarative table of scan targets.
//!
//! Target resolution is polymorphic over {literal path, glob, shell-resolved
//! path, detector rule} — a single tagged enum with one `resolve` method, so
//! the Walker never needs to match on target kind.

pub mod profile;

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::fmt::expand_home;
use crate::safety::SafetyLevel;

pub use profile::{Aggression, Profile, ProfileResolver};

/// How a target's member paths are discovered.
#[derive(Debug, Clone)]
pub enum TargetKind {
    /// A single `~`-expandable path.
    Literal(&'static str),
    /// A glob pattern, expanded against home before matching.
    Glob(&'static str),
    /// Resolved by shelling out to a command whose trimmed stdout is a path
    /// (e.g. `brew --cache`). Silently yields nothing if the command is
    /// unavailable or fails — package-manager caches are opportunistic.
    ShellPath {
        command: &'static str,
        args: &'static [&'static str],
    },
    /// Not path-resolved here at all; the Dev-Tool Detector recognizes
    /// matching subtrees during traversal and reports them under this
    /// target's name.
    Detector,
}

impl TargetKind {
    pub fn resolve(&self, home: &Path) -> Vec<PathBuf> {
        match self {
            TargetKind::Literal(p) => vec![expand_home_str(p, home)],
            TargetKind::Glob(pattern) => {
                let expanded = expand_home_str(pattern, home);
                glob::glob(&expanded.to_string_lossy())
                    .map(|entries| entries.filter_map(Result::ok).collect())
                    .unwrap_or_default()
            }
            TargetKind::ShellPath { command, args } => Command::new(command)
                .args(*args)
                .output()
                .ok()
                .filter(|o| o.status.success())
                .map(|o| {
                    let path = String::from_utf8_lossy(&o.stdout).trim().to_string();
                    vec![PathBuf::from(path)]
                })
                .unwrap_or_default(),
            TargetKind::Detector => Vec::new(),
        }
    }
}

fn expand_home_str(p: &str, home: &Path) -> PathBuf {
    if let Some(rest) = p.strip_prefix("~/") {
        home.join(rest)
    } else if p == "~" {
        home.to_path_buf()
    } else {
        expand_home(p)
    }
}

/// A declarative scan target: everything needed to discover and classify one
/// named slice of disk usage.
#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub name: &'static str,
    pub category: &'static str,
    pub kind: TargetKind,
    pub default_safety: SafetyLevel,
    pub reason: &'static str,
    pub min_size_bytes: Option<u64>,
    pub min_staleness_days: Option<u32>,
}

/// The full catalog, assembled fresh on each call (construction is cheap —
/// no filesystem access happens until a target is resolved).
pub fn catalog() -> Vec<ScanTarget> {
    use SafetyLevel::*;
    vec![
        ScanTarget {
            name: "User application caches",
            category: "Cache",
            kind: TargetKind::Literal("~/Library/Caches"),
            default_safety: Caution,
            reason: "Per-application caches, regenerated on demand",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "XDG cache directory",
            category: "Cache",
            kind: TargetKind::Literal("~/.cache"),
            default_safety: Caution,
            reason: "XDG-convention cache directory",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "User logs",
            category: "Log",
            kind: TargetKind::Literal("~/Library/Logs"),
            default_safety: Caution,
            reason: "Application and diagnostic logs",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "System temporary files",
            category: "Temp",
            kind: TargetKind::Literal("/tmp"),
            default_safety: Safe,
            reason: "Scratch space cleared by the OS on reboot",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Trash",
            category: "Trash",
            kind: TargetKind::Literal("~/.Trash"),
            default_safety: Safe,
            reason: "Already marked for deletion by the user",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Crash reporter dumps",
            category: "Crash",
            kind: TargetKind::Literal("~/Library/Logs/DiagnosticReports"),
            default_safety: Caution,
            reason: "Crash and hang reports, useful only for debugging",
            min_size_bytes: None,
            min_staleness_days: Some(7),
        },
        ScanTarget {
            name: "QuickLook thumbnail cache",
            category: "Cache",
            kind: TargetKind::Literal("~/Library/Caches/com.apple.QuickLook.thumbnailcache"),
            default_safety: Safe,
            reason: "Regenerated automatically when previews are requested",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Creative app media cache",
            category: "Cache",
            kind: TargetKind::Literal("~/Library/Application Support/Adobe/Common/Media Cache Files"),
            default_safety: Caution,
            reason: "Video/audio preview and render cache, rebuilt on next project open",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Xcode derived data",
            category: "Dev: Xcode",
            kind: TargetKind::Literal("~/Library/Developer/Xcode/DerivedData"),
            default_safety: Warning,
            reason: "Build indexes and intermediates, rebuilt on next build",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Xcode archives",
            category: "Dev: Xcode",
            kind: TargetKind::Literal("~/Library/Developer/Xcode/Archives"),
            default_safety: Warning,
            reason: "Exported app archives, not re-creatable without source",
            min_size_bytes: None,
            min_staleness_days: Some(30),
        },
        ScanTarget {
            name: "iOS device support",
            category: "Dev: Xcode",
            kind: TargetKind::Literal("~/Library/Developer/Xcode/iOS DeviceSupport"),
            default_safety: Warning,
            reason: "Per-device debug symbols, re-downloaded on next connect",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "watchOS device support",
            category: "Dev: Xcode",
            kind: TargetKind::Literal("~/Library/Developer/Xcode/watchOS DeviceSupport"),
            default_safety: Warning,
            reason: "Per-device debug symbols, re-downloaded on next connect",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Simulator caches",
            category: "Dev: Xcode",
            kind: TargetKind::Literal("~/Library/Developer/CoreSimulator/Caches"),
            default_safety: Warning,
            reason: "Simulator runtime caches, rebuilt on next launch",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Docker data root",
            category: "Dev: Docker",
            kind: TargetKind::Literal("~/Library/Containers/com.docker.docker/Data/vms/0/data"),
            default_safety: Warning,
            reason: "Images, containers, and volumes; requires re-pulling images",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "npm cache",
            category: "Dev: Node",
            kind: TargetKind::Literal("~/.npm"),
            default_safety: Caution,
            reason: "Package tarball cache, re-downloaded on next install",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Yarn cache",
            category: "Dev: Node",
            kind: TargetKind::Literal("~/Library/Caches/Yarn"),
            default_safety: Caution,
            reason: "Package cache, re-downloaded on next install",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "pnpm store",
            category: "Dev: Node",
            kind: TargetKind::Literal("~/Library/pnpm/store"),
            default_safety: Caution,
            reason: "Content-addressed package store, re-populated on next install",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "pip cache",
            category: "Dev: Python",
            kind: TargetKind::Literal("~/Library/Caches/pip"),
            default_safety: Safe,
            reason: "Wheel and source cache, re-downloaded on next install",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Cargo registry cache",
            category: "Dev: Rust",
            kind: TargetKind::Glob("~/.cargo/registry/cache/*"),
            default_safety: Caution,
            reason: "Downloaded crate archives, re-fetched on next build",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Cargo registry sources",
            category: "Dev: Rust",
            kind: TargetKind::Glob("~/.cargo/registry/src/*"),
            default_safety: Caution,
            reason: "Extracted crate sources, re-extracted on next build",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Gradle caches",
            category: "Dev: Gradle",
            kind: TargetKind::Literal("~/.gradle/caches"),
            default_safety: Caution,
            reason: "Dependency and build cache, re-populated on next build",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "CocoaPods cache",
            category: "Dev: CocoaPods",
            kind: TargetKind::Literal("~/Library/Caches/CocoaPods"),
            default_safety: Caution,
            reason: "Pod spec and source cache, re-fetched on next install",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Maven repository",
            category: "Dev: Maven",
            kind: TargetKind::Literal("~/.m2/repository"),
            default_safety: Caution,
            reason: "Resolved dependency jars, re-downloaded on next build",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Homebrew cache",
            category: "Dev: Homebrew",
            kind: TargetKind::ShellPath {
                command: "brew",
                args: &["--cache"],
            },
            default_safety: Caution,
            reason: "Downloaded formula/cask archives, re-fetched on next install",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Go build cache",
            category: "Dev: Go",
            kind: TargetKind::Literal("~/Library/Caches/go-build"),
            default_safety: Caution,
            reason: "Compiler build cache, rebuilt on next build",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Node dependencies",
            category: "Dev: Node",
            kind: TargetKind::Detector,
            default_safety: Caution,
            reason: "node_modules tree, reinstallable from package.json",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Node build artifacts",
            category: "Dev: Node",
            kind: TargetKind::Detector,
            default_safety: Caution,
            reason: "Bundler output, regenerated by the next build",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Rust build artifacts",
            category: "Dev: Rust",
            kind: TargetKind::Detector,
            default_safety: Caution,
            reason: "cargo target/ directory, regenerated by the next build",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Python virtual environment",
            category: "Dev: Python",
            kind: TargetKind::Detector,
            default_safety: Caution,
            reason: "Virtualenv, recreated from requirements",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Gradle project cache",
            category: "Dev: Gradle",
            kind: TargetKind::Detector,
            default_safety: Caution,
            reason: "Per-project .gradle directory, regenerated on next build",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "CocoaPods checkout",
            category: "Dev: CocoaPods",
            kind: TargetKind::Detector,
            default_safety: Caution,
            reason: "Pods/ directory, reinstallable via `pod install`",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Xcode project derived data",
            category: "Dev: Xcode",
            kind: TargetKind::Detector,
            default_safety: Caution,
            reason: "DerivedData under a workspace root, rebuilt on next build",
            min_size_bytes: None,
            min_staleness_days: None,
        },
        ScanTarget {
            name: "Large files",
            category: "Large",
            kind: TargetKind::Literal("~"),
            default_safety: Caution,
            reason: "Large file under a user-writable root, above the configured threshold",
            min_size_bytes: None, // filled in from the active profile's large_file_threshold
            min_staleness_days: None,
        },
    ]
}

/// Look up a catalog entry by name.
pub fn find<'a>(entries: &'a [ScanTarget], name: &str) -> Option<&'a ScanTarget> {
    entries.iter().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_roughly_thirty_targets() {
        let entries = catalog();
        assert!(entries.len() >= 25 && entries.len() <= 35);
    }

    #[test]
    fn catalog_names_are_unique() {
        let entries = catalog();
        let mut names: Vec<_> = entries.iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), entries.len());
    }

    #[test]
    fn literal_target_resolves_under_home() {
        let home = Path::new("/Users/alice");
        let resolved = TargetKind::Literal("~/Library/Caches").resolve(home);
        assert_eq!(resolved, vec![PathBuf::from("/Users/alice/Library/Caches")]);
    }

    #[test]
    fn detector_targets_resolve_to_nothing_directly() {
        let home = Path::new("/Users/alice");
        assert!(TargetKind::Detector.resolve(home).is_empty());
    }
}
