// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Cleanup Engine core
//!
//! This crate provides the core functionality for a disk-cleanup tool:
//! - Target catalog and profile resolution
//! - Fail-closed safety classification
//! - Parallel filesystem scanning and dev-tool detection
//! - Duplicate file discovery, exact and perceptual
//! - Reversible removal via a staging store and session manifests
//!
//! It has no CLI or GUI of its own; `api` exposes the synchronous,
//! JSON-serializable operations a front-end collaborator consumes.

pub mod api;
pub mod catalog;
pub mod classifier;
pub mod cleaner;
pub mod config;
pub mod dedupe;
pub mod devtool;
pub mod diskusage;
pub mod error;
pub mod fmt;
pub mod logging;
pub mod manifest;
pub mod safety;
pub mod staging;
pub mod walker;

pub use error::{EngineError, EngineResult};
