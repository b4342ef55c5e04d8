// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Dev-Tool Detector: recognizes developer working directories by signature
//! file, aggregating the matched subtree as a single inventory item rather
//! than descending into it file by file.
//!
//! Rules are tested in order, first match wins. On nested monorepos (a
//! `Cargo.toml` found inside a `node_modules` tree) the *outermost* match
//! wins: once a directory matches, its subtree is not searched further.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::safety::SafetyGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevToolKind {
    NodeDependencies,
    NodeBuildArtifacts,
    RustBuildArtifacts,
    PythonVirtualEnv,
    GradleCache,
    CocoaPods,
    XcodeDerivedData,
}

impl DevToolKind {
    pub fn target_name(&self) -> &'static str {
        match self {
            DevToolKind::NodeDependencies => "Node dependencies",
            DevToolKind::NodeBuildArtifacts => "Node build artifacts",
            DevToolKind::RustBuildArtifacts => "Rust build artifacts",
            DevToolKind::PythonVirtualEnv => "Python virtual environment",
            DevToolKind::GradleCache => "Gradle project cache",
            DevToolKind::CocoaPods => "CocoaPods checkout",
            DevToolKind::XcodeDerivedData => "Xcode project derived data",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectedProject {
    pub kind: DevToolKind,
    /// The matched subtree: what would be staged/deleted as a unit.
    pub path: PathBuf,
    pub size: u64,
    pub most_recent_source_mtime: Option<SystemTime>,
}

pub struct DevToolDetector<'a> {
    guard: &'a SafetyGuard,
}

impl<'a> DevToolDetector<'a> {
    pub fn new(guard: &'a SafetyGuard) -> Self {
        Self { guard }
    }

    /// Scan each root for developer working directories, recursing
    /// depth-first and halting descent at the first matching directory.
    pub fn scan(&self, roots: &[PathBuf]) -> Vec<DetectedProject> {
        let mut found = Vec::new();
        for root in roots {
            self.scan_dir(root, &mut found);
        }
        found
    }

    fn scan_dir(&self, dir: &Path, found: &mut Vec<DetectedProject>) {
        if !dir.is_dir() || self.guard.blocks_descent(dir) {
            return;
        }

        if let Some(project) = self.match_signature(dir) {
            found.push(project);
            return; // outermost signature wins; do not recurse further
        }

        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                self.scan_dir(&path, found);
            }
        }
    }

    /// Apply the seven ordered signature rules to `dir`. Returns the first
    /// match, or `None` if no rule applies.
    fn match_signature(&self, dir: &Path) -> Option<DetectedProject> {
        let node_modules = dir.join("node_modules");
        if node_modules.is_dir() {
            return Some(self.build_project(DevToolKind::NodeDependencies, &node_modules, dir));
        }

        if dir.join("package.json").is_file() {
            for artifact in [".next", "dist", "build"] {
                let artifact_dir = dir.join(artifact);
                if artifact_dir.is_dir() {
                    return Some(self.build_project(DevToolKind::NodeBuildArtifacts, &artifact_dir, dir));
                }
            }
        }

        let target_dir = dir.join("target");
        if dir.join("Cargo.toml").is_file() && target_dir.is_dir() {
            return Some(self.build_project(DevToolKind::RustBuildArtifacts, &target_dir, dir));
        }

        if dir.join("pyvenv.cfg").is_file() || dir.join("bin/activate").is_file() {
            if has_python_lib_dir(dir) {
                return Some(self.build_project(DevToolKind::PythonVirtualEnv, dir, dir));
            }
        }

        let gradle_dir = dir.join(".gradle");
        if gradle_dir.is_dir() {
            return Some(self.build_project(DevToolKind::GradleCache, &gradle_dir, dir));
        }

        let pods_dir = dir.join("Pods");
        if pods_dir.is_dir() && dir.join("Podfile").is_file() {
            return Some(self.build_project(DevToolKind::CocoaPods, &pods_dir, dir));
        }

        let derived_data = dir.join("DerivedData");
        if derived_data.is_dir() && is_xcode_workspace_root(dir) {
            return Some(self.build_project(DevToolKind::XcodeDerivedData, &derived_data, dir));
        }

        None
    }

    fn build_project(&self, kind: DevToolKind, subtree: &Path, project_root: &Path) -> DetectedProject {
        DetectedProject {
            kind,
            path: subtree.to_path_buf(),
            size: dir_size(subtree),
            most_recent_source_mtime: most_recent_top_level_mtime(project_root, subtree),
        }
    }
}

fn has_python_lib_dir(dir: &Path) -> bool {
    let lib = dir.join("lib");
    if !lib.is_dir() {
        return false;
    }
    fs::read_dir(&lib)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.file_name().to_string_lossy().starts_with("python"))
        })
        .unwrap_or(false)
}

/// True when `dir` contains an `.xcodeproj` or `.xcworkspace` entry.
/// `pub(crate)` so `safety::DevArtifactRule` can require the same signature
/// before granting `DerivedData` a non-`Danger` classification.
pub(crate) fn is_xcode_workspace_root(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(|e| e.ok()).any(|e| {
                let name = e.file_name();
                let name = name.to_string_lossy();
                name.ends_with(".xcodeproj") || name.ends_with(".xcworkspace")
            })
        })
        .unwrap_or(false)
}

fn dir_size(path: &Path) -> u64 {
    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}

/// Most recent modification time among files directly in `project_root`,
/// excluding the matched artifact subtree itself — used to decide whether a
/// stale project's artifacts can be upgraded from Caution to Safe.
fn most_recent_top_level_mtime(project_root: &Path, exclude: &Path) -> Option<SystemTime> {
    fs::read_dir(project_root)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.path() != exclude)
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .filter_map(|m| m.modified().ok())
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn detects_node_modules() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("proj/node_modules/left-pad")).unwrap();
        std::fs::write(dir.path().join("proj/node_modules/left-pad/index.js"), b"x").unwrap();

        let guard = SafetyGuard::with_home(dir.path().to_path_buf());
        let detector = DevToolDetector::new(&guard);
        let found = detector.scan(&[dir.path().join("proj")]);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DevToolKind::NodeDependencies);
    }

    #[test]
    fn outermost_signature_wins_over_nested_cargo_toml() {
        let dir = tempdir().unwrap();
        let proj = dir.path().join("proj");
        std::fs::create_dir_all(proj.join("node_modules/some-crate-wrapper")).unwrap();
        // A nested Cargo.toml + target/ inside node_modules must not be detected separately.
        std::fs::create_dir_all(proj.join("node_modules/some-crate-wrapper/target")).unwrap();
        std::fs::write(proj.join("node_modules/some-crate-wrapper/Cargo.toml"), b"[package]").unwrap();

        let guard = SafetyGuard::with_home(dir.path().to_path_buf());
        let detector = DevToolDetector::new(&guard);
        let found = detector.scan(&[proj]);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DevToolKind::NodeDependencies);
    }

    #[test]
    fn detects_rust_build_artifacts() {
        let dir = tempdir().unwrap();
        let proj = dir.path().join("crate");
        std::fs::create_dir_all(proj.join("target/debug")).unwrap();
        std::fs::write(proj.join("Cargo.toml"), b"[package]\nname=\"x\"").unwrap();

        let guard = SafetyGuard::with_home(dir.path().to_path_buf());
        let detector = DevToolDetector::new(&guard);
        let found = detector.scan(&[proj]);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DevToolKind::RustBuildArtifacts);
    }

    #[test]
    fn no_match_when_signature_incomplete() {
        let dir = tempdir().unwrap();
        let proj = dir.path().join("crate");
        std::fs::create_dir_all(&proj).unwrap();
        std::fs::write(proj.join("Cargo.toml"), b"[package]").unwrap();
        // no target/ directory yet

        let guard = SafetyGuard::with_home(dir.path().to_path_buf());
        let detector = DevToolDetector::new(&guard);
        let found = detector.scan(&[proj]);
        assert!(found.is_empty());
    }
}
