// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Size, path, and duration formatting shared by every reporting surface.

use std::path::{Path, PathBuf};
use std::time::Duration;

const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
const STEP: f64 = 1024.0;

/// Render a byte count using binary (IEC) units, e.g. `9.77 MiB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= STEP && unit_index < UNITS.len() - 1 {
        size /= STEP;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{bytes} {}", UNITS[unit_index])
    } else {
        format!("{size:.2} {}", UNITS[unit_index])
    }
}

/// Render a duration the way progress reports and session summaries do:
/// sub-second as milliseconds, otherwise whole seconds with one decimal.
pub fn format_duration(d: Duration) -> String {
    if d.as_secs() == 0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// Expand a leading `~` to the home directory. Paths without a leading `~`
/// are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Render a path relative to the home directory with a leading `~`, falling
/// back to the absolute path when it isn't under home.
pub fn display_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rel) = path.strip_prefix(&home) {
            if rel.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~/{}", rel.display());
        }
    }
    path.display().to_string()
}
