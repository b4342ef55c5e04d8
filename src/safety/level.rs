// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Safety level and safety label definitions.
//!
//! `SafetyLevel` is the internal four-value lattice the Guard's rules are
//! expressed in. `SafetyLabel` is the coarser tri-valued vocabulary every
//! other component (Inventory, Cleaner, manifests) actually reports.

use std::fmt;

/// Internal classification lattice, ordered from least to most dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SafetyLevel {
    /// Auto-regenerates, routinely removed (browser cache, trash).
    Safe = 1,
    /// Deletable but worth a second look (user caches, old logs).
    Caution = 2,
    /// Deletable but expensive to rebuild or re-download (dev caches, Docker images).
    Warning = 3,
    /// Never delete.
    Danger = 4,
}

impl SafetyLevel {
    pub fn is_deletable(&self) -> bool {
        !matches!(self, SafetyLevel::Danger)
    }

    /// Collapse to the public tri-valued label used in the Inventory.
    pub fn to_label(self) -> SafetyLabel {
        match self {
            SafetyLevel::Safe => SafetyLabel::Safe,
            SafetyLevel::Caution | SafetyLevel::Warning => SafetyLabel::Caution,
            SafetyLevel::Danger => SafetyLabel::Dangerous,
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SafetyLevel::Safe => "safe",
            SafetyLevel::Caution => "caution",
            SafetyLevel::Warning => "warning",
            SafetyLevel::Danger => "danger",
        };
        write!(f, "{name}")
    }
}

/// User-facing judgment attached to every InventoryItem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLabel {
    Safe,
    Caution,
    Dangerous,
}

impl fmt::Display for SafetyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SafetyLabel::Safe => "Safe",
            SafetyLabel::Caution => "Caution",
            SafetyLabel::Dangerous => "Dangerous",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(SafetyLevel::Safe < SafetyLevel::Caution);
        assert!(SafetyLevel::Caution < SafetyLevel::Warning);
        assert!(SafetyLevel::Warning < SafetyLevel::Danger);
    }

    #[test]
    fn deletable() {
        assert!(SafetyLevel::Safe.is_deletable());
        assert!(SafetyLevel::Warning.is_deletable());
        assert!(!SafetyLevel::Danger.is_deletable());
    }

    #[test]
    fn collapses_to_label() {
        assert_eq!(SafetyLevel::Safe.to_label(), SafetyLabel::Safe);
        assert_eq!(SafetyLevel::Caution.to_label(), SafetyLabel::Caution);
        assert_eq!(SafetyLevel::Warning.to_label(), SafetyLabel::Caution);
        assert_eq!(SafetyLevel::Danger.to_label(), SafetyLabel::Dangerous);
    }
}
