// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Built-in `SafetyRule` that recognizes developer-tool artifact
//! directories by the same signature the Dev-Tool Detector requires
//! (§4.4), not by basename alone.
//!
//! A bare basename match (a user's own `~/Projects/house-plans/build`
//! folder) would grant `Caution` to a directory that isn't a build
//! artifact at all. This rule re-checks the sibling signature file the
//! Detector looks for — `Cargo.toml` next to `target`, `package.json` next
//! to `dist`/`build`/`.next`, `Podfile` next to `Pods`, an `.xcodeproj`/
//! `.xcworkspace` next to `DerivedData` — before granting anything.
//! `node_modules` and `.gradle` are confirmed by the Detector on directory
//! presence alone, so this rule does the same for them.

use std::path::Path;

use crate::devtool::is_xcode_workspace_root;

use super::guard::SafetyRule;
use super::level::SafetyLevel;

pub struct DevArtifactRule;

impl SafetyRule for DevArtifactRule {
    fn name(&self) -> &str {
        "dev-artifact-directory"
    }

    fn evaluate(&self, path: &Path) -> Option<SafetyLevel> {
        let name = path.file_name()?.to_str()?;
        let parent = path.parent()?;

        let confirmed = match name {
            "node_modules" | ".gradle" => path.is_dir(),
            "target" => path.is_dir() && parent.join("Cargo.toml").is_file(),
            "dist" | "build" | ".next" => path.is_dir() && parent.join("package.json").is_file(),
            "Pods" => path.is_dir() && parent.join("Podfile").is_file(),
            "DerivedData" => path.is_dir() && is_xcode_workspace_root(parent),
            _ => false,
        };

        if confirmed {
            Some(SafetyLevel::Caution)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn recognizes_node_modules_by_presence_alone() {
        let dir = tempdir().unwrap();
        let node_modules = dir.path().join("node_modules");
        std::fs::create_dir_all(&node_modules).unwrap();

        let rule = DevArtifactRule;
        assert_eq!(rule.evaluate(&node_modules), Some(SafetyLevel::Caution));
    }

    #[test]
    fn rejects_target_directory_without_sibling_cargo_toml() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("house-plans/build");
        std::fs::create_dir_all(&target).unwrap();
        // no Cargo.toml and no package.json next to it

        let rule = DevArtifactRule;
        assert_eq!(rule.evaluate(&target), None);
    }

    #[test]
    fn recognizes_target_directory_with_sibling_cargo_toml() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("crate/target");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(dir.path().join("crate/Cargo.toml"), b"[package]").unwrap();

        let rule = DevArtifactRule;
        assert_eq!(rule.evaluate(&target), Some(SafetyLevel::Caution));
    }

    #[test]
    fn recognizes_build_directory_with_sibling_package_json() {
        let dir = tempdir().unwrap();
        let build = dir.path().join("app/build");
        std::fs::create_dir_all(&build).unwrap();
        std::fs::write(dir.path().join("app/package.json"), b"{}").unwrap();

        let rule = DevArtifactRule;
        assert_eq!(rule.evaluate(&build), Some(SafetyLevel::Caution));
    }

    #[test]
    fn rejects_pods_directory_without_sibling_podfile() {
        let dir = tempdir().unwrap();
        let pods = dir.path().join("app/Pods");
        std::fs::create_dir_all(&pods).unwrap();

        let rule = DevArtifactRule;
        assert_eq!(rule.evaluate(&pods), None);
    }

    #[test]
    fn ignores_unrelated_directory_names() {
        let dir = tempdir().unwrap();
        let movies = dir.path().join("Movies");
        std::fs::create_dir_all(&movies).unwrap();

        let rule = DevArtifactRule;
        assert_eq!(rule.evaluate(&movies), None);
    }
}
