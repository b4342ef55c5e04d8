// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Profile Resolver: combines built-in and user profiles into an active
//! target set plus policy knobs.

use log::warn;
use serde::{Deserialize, Serialize};

use super::{catalog, ScanTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggression {
    Low,
    Medium,
    High,
}

/// Configuration data with an enumerated field set (§9): any TOML field not
/// represented here is dropped with a warning during deserialization rather
/// than silently retained, via `#[serde(deny_unknown_fields)]` paired with a
/// permissive parse wrapper (`parse_lenient`) that downgrades unknown-field
/// errors to a logged warning plus best-effort partial parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub description: String,
    pub aggression: Aggression,
    pub targets: Vec<String>,
    pub stale_days: u32,
    pub large_file_threshold_mb: u64,
    pub include_dangerous: bool,
}

impl Profile {
    /// Merge `override_profile` on top of `self`: present scalar fields win,
    /// the `targets` list is replaced wholesale (never unioned), per §4.2.
    pub fn merged_with(&self, override_profile: &PartialProfile) -> Profile {
        Profile {
            name: override_profile.name.clone().unwrap_or_else(|| self.name.clone()),
            description: override_profile
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            aggression: override_profile.aggression.unwrap_or(self.aggression),
            targets: override_profile
                .targets
                .clone()
                .unwrap_or_else(|| self.targets.clone()),
            stale_days: override_profile.stale_days.unwrap_or(self.stale_days),
            large_file_threshold_mb: override_profile
                .large_file_threshold_mb
                .unwrap_or(self.large_file_threshold_mb),
            include_dangerous: override_profile
                .include_dangerous
                .unwrap_or(self.include_dangerous),
        }
    }
}

/// A custom profile as read from `profiles/<name>.toml`: every field is
/// optional so only the fields the user actually set override the built-in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialProfile {
    pub name: Option<String>,
    pub description: Option<String>,
    pub aggression: Option<Aggression>,
    pub targets: Option<Vec<String>>,
    pub stale_days: Option<u32>,
    pub large_file_threshold_mb: Option<u64>,
    pub include_dangerous: Option<bool>,
}

impl PartialProfile {
    /// Parse TOML text, logging (never silently storing) any field not in
    /// the enumerated schema above.
    pub fn parse(toml_text: &str) -> Result<Self, toml::de::Error> {
        let raw: toml::Value = toml::from_str(toml_text)?;
        if let toml::Value::Table(table) = &raw {
            const KNOWN: &[&str] = &[
                "name",
                "description",
                "aggression",
                "targets",
                "stale_days",
                "large_file_threshold_mb",
                "include_dangerous",
            ];
            for key in table.keys() {
                if !KNOWN.contains(&key.as_str()) {
                    warn!("profile: ignoring unknown field `{key}`");
                }
            }
        }
        raw.try_into()
    }
}

const NODE_TARGETS: &[&str] = &[
    "npm cache",
    "Yarn cache",
    "pnpm store",
    "Node dependencies",
    "Node build artifacts",
];
const RUST_TARGETS: &[&str] = &["Cargo registry cache", "Cargo registry sources", "Rust build artifacts"];
const PYTHON_TARGETS: &[&str] = &["pip cache", "Python virtual environment"];
const XCODE_TARGETS: &[&str] = &[
    "Xcode derived data",
    "Xcode archives",
    "iOS device support",
    "watchOS device support",
    "Simulator caches",
    "Xcode project derived data",
];
const OTHER_DEV_TARGETS: &[&str] = &[
    "Docker data root",
    "Gradle caches",
    "Gradle project cache",
    "CocoaPods cache",
    "CocoaPods checkout",
    "Maven repository",
    "Homebrew cache",
    "Go build cache",
];

fn quick_targets() -> Vec<String> {
    ["User application caches", "XDG cache directory", "System temporary files", "Trash"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn developer_targets() -> Vec<String> {
    let mut targets = quick_targets();
    for group in [NODE_TARGETS, RUST_TARGETS, PYTHON_TARGETS, XCODE_TARGETS, OTHER_DEV_TARGETS] {
        targets.extend(group.iter().map(|s| s.to_string()));
    }
    targets
}

fn all_target_names() -> Vec<String> {
    catalog().iter().map(|t| t.name.to_string()).collect()
}

/// Built-in profiles, per §4.2.
pub fn built_in(name: &str) -> Option<Profile> {
    match name {
        "quick" => Some(Profile {
            name: "quick".to_string(),
            description: "Caches, temp files, and trash".to_string(),
            aggression: Aggression::Low,
            targets: quick_targets(),
            stale_days: 30,
            large_file_threshold_mb: 500,
            include_dangerous: false,
        }),
        "developer" => Some(Profile {
            name: "developer".to_string(),
            description: "Everything in quick, plus developer tool byproducts".to_string(),
            aggression: Aggression::Medium,
            targets: developer_targets(),
            stale_days: 30,
            large_file_threshold_mb: 500,
            include_dangerous: false,
        }),
        "creative" => Some(Profile {
            name: "creative".to_string(),
            description: "Caches, temp, trash, and media preview/render caches".to_string(),
            aggression: Aggression::Medium,
            targets: {
                let mut targets = quick_targets();
                targets.push("QuickLook thumbnail cache".to_string());
                targets.push("Crash reporter dumps".to_string());
                targets.push("Creative app media cache".to_string());
                targets
            },
            stale_days: 30,
            large_file_threshold_mb: 500,
            include_dangerous: false,
        }),
        "deep" => Some(Profile {
            name: "deep".to_string(),
            description: "Every catalog target, including large files".to_string(),
            aggression: Aggression::High,
            targets: all_target_names(),
            stale_days: 14,
            large_file_threshold_mb: 250,
            include_dangerous: false,
        }),
        _ => None,
    }
}

pub const BUILT_IN_NAMES: &[&str] = &["quick", "developer", "creative", "deep"];

/// Resolved policy + active targets handed to the Walker.
pub struct ActivePolicy {
    pub profile_name: String,
    pub targets: Vec<ScanTarget>,
    pub stale_days: u32,
    pub large_file_threshold_mb: u64,
    pub include_dangerous: bool,
    pub aggression: Aggression,
}

pub struct ProfileResolver;

impl ProfileResolver {
    /// Resolve a named built-in profile, optionally overridden by `custom`,
    /// into an active target list + policy.
    pub fn resolve(profile_name: &str, custom: Option<&PartialProfile>) -> Option<ActivePolicy> {
        let base = built_in(profile_name)?;
        let effective = match custom {
            Some(c) => base.merged_with(c),
            None => base,
        };

        let full_catalog = catalog();
        let mut targets: Vec<ScanTarget> = effective
            .targets
            .iter()
            .filter_map(|name| full_catalog.iter().find(|t| &t.name == name))
            .cloned()
            .collect();

        if !effective.include_dangerous {
            targets.retain(|t| t.default_safety != crate::safety::SafetyLevel::Danger);
        }

        for target in &mut targets {
            if target.name == "Large files" {
                target.min_size_bytes = Some(effective.large_file_threshold_mb * 1024 * 1024);
            }
        }

        Some(ActivePolicy {
            profile_name: effective.name,
            targets,
            stale_days: effective.stale_days,
            large_file_threshold_mb: effective.large_file_threshold_mb,
            include_dangerous: effective.include_dangerous,
            aggression: effective.aggression,
        })
    }

    pub fn list_built_ins() -> Vec<Profile> {
        BUILT_IN_NAMES.iter().filter_map(|n| built_in(n)).collect()
    }
}
