// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Safety Guard: path classification and the fail-closed deletion gate.

pub mod dev_rule;
pub mod guard;
pub mod level;
pub mod paths;

pub use dev_rule::DevArtifactRule;
pub use guard::{Decision, GuardError, SafetyGuard, SafetyRule};
pub use level::{SafetyLabel, SafetyLevel};
