// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Duplicate Pipeline (§4.6): a four-stage funnel that narrows a candidate
//! file set down to confirmed duplicate groups without hashing everything
//! up front.
//!
//! 1. Partition by exact size.
//! 2. Within a size bucket, hash the first 4 KiB of each file and
//!    re-partition.
//! 3. Within a prefix bucket with more than one member, hash the full
//!    file content (SHA-256) and group by digest.
//! 4. Optionally, group visually similar images via perceptual
//!    difference-hashing and a BK-tree, independent of byte-exact content.

pub mod phash;

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use self::phash::{dhash, sniff_image_format, BkTree};

const PREFIX_LEN: usize = 4096;
/// Images whose dHash Hamming distance is at or below this are considered
/// visually duplicate (stage 4).
const PHASH_MAX_DISTANCE: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum DedupeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateKind {
    /// Byte-for-byte identical content.
    Exact,
    /// Visually similar images, not byte-identical (stage 4 only).
    Perceptual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub kind: DuplicateKind,
    pub paths: Vec<PathBuf>,
    pub size_bytes: u64,
    /// The member selected to be kept when the rest are removed.
    pub keep_candidate: PathBuf,
    pub reclaimable_bytes: u64,
}

struct Candidate {
    path: PathBuf,
    size: u64,
    mtime: SystemTime,
}

/// Run stages 1-3 (exact duplicates) over `candidates`, then optionally
/// stage 4 (perceptual, images only) over files stage 3 left ungrouped.
pub fn find_duplicates(
    candidates: &[PathBuf],
    include_perceptual: bool,
) -> Result<Vec<DuplicateGroup>, DedupeError> {
    let all_paths: Vec<PathBuf> = candidates.to_vec();
    let stats = stat_all(candidates)?;

    let size_buckets = partition_by_size(stats);

    let prefix_buckets: Vec<Vec<Candidate>> = size_buckets
        .into_par_iter()
        .filter(|bucket| bucket.len() > 1)
        .flat_map(|bucket| partition_by_prefix(bucket))
        .filter(|bucket| bucket.len() > 1)
        .collect();

    let mut exact_groups: Vec<DuplicateGroup> = prefix_buckets
        .into_par_iter()
        .flat_map(|bucket| partition_by_full_hash(bucket))
        .filter(|bucket| bucket.len() > 1)
        .map(build_group)
        .collect();

    exact_groups.sort_by(|a, b| a.paths[0].cmp(&b.paths[0]));

    if include_perceptual {
        let grouped: std::collections::HashSet<&PathBuf> =
            exact_groups.iter().flat_map(|g| g.paths.iter()).collect();
        let ungrouped: Vec<PathBuf> = all_paths
            .into_iter()
            .filter(|p| !grouped.contains(p))
            .collect();
        let mut perceptual = find_perceptual_duplicates(&ungrouped);
        perceptual.sort_by(|a, b| a.paths[0].cmp(&b.paths[0]));
        exact_groups.extend(perceptual);
    }

    Ok(exact_groups)
}

fn stat_all(paths: &[PathBuf]) -> Result<Vec<Candidate>, DedupeError> {
    paths
        .iter()
        .map(|path| {
            let meta = std::fs::metadata(path).map_err(|e| DedupeError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
            Ok(Candidate {
                path: path.clone(),
                size: meta.len(),
                mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            })
        })
        .collect()
}

fn partition_by_size(candidates: Vec<Candidate>) -> Vec<Vec<Candidate>> {
    let mut buckets: HashMap<u64, Vec<Candidate>> = HashMap::new();
    for c in candidates {
        if c.size == 0 {
            continue;
        }
        buckets.entry(c.size).or_default().push(c);
    }
    buckets.into_values().collect()
}

fn partition_by_prefix(bucket: Vec<Candidate>) -> Vec<Vec<Candidate>> {
    let mut buckets: HashMap<[u8; 32], Vec<Candidate>> = HashMap::new();
    for c in bucket {
        match hash_prefix(&c.path) {
            Ok(digest) => buckets.entry(digest).or_default().push(c),
            Err(_) => continue,
        }
    }
    buckets.into_values().collect()
}

fn hash_prefix(path: &Path) -> std::io::Result<[u8; 32]> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; PREFIX_LEN];
    file.seek(SeekFrom::Start(0))?;
    let n = file.read(&mut buf)?;
    let mut hasher = Sha256::new();
    hasher.update(&buf[..n]);
    Ok(hasher.finalize().into())
}

fn partition_by_full_hash(bucket: Vec<Candidate>) -> Vec<Vec<Candidate>> {
    let mut buckets: HashMap<[u8; 32], Vec<Candidate>> = HashMap::new();
    for c in bucket {
        match hash_full(&c.path) {
            Ok(digest) => buckets.entry(digest).or_default().push(c),
            Err(_) => continue,
        }
    }
    buckets.into_values().collect()
}

fn hash_full(path: &Path) -> std::io::Result<[u8; 32]> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().into())
}

fn build_group(mut bucket: Vec<Candidate>) -> DuplicateGroup {
    bucket.sort_by(|a, b| {
        a.mtime
            .cmp(&b.mtime)
            .then(a.path.as_os_str().len().cmp(&b.path.as_os_str().len()))
            .then(a.path.cmp(&b.path))
    });
    let size = bucket[0].size;
    let keep_candidate = bucket[0].path.clone();
    let paths: Vec<PathBuf> = bucket.into_iter().map(|c| c.path).collect();
    let reclaimable_bytes = size * (paths.len() as u64 - 1);

    DuplicateGroup {
        kind: DuplicateKind::Exact,
        paths,
        size_bytes: size,
        keep_candidate,
        reclaimable_bytes,
    }
}

fn find_perceptual_duplicates(paths: &[PathBuf]) -> Vec<DuplicateGroup> {
    let image_paths: Vec<&PathBuf> = paths.iter().filter(|p| looks_like_image(p)).collect();

    let hashes: Vec<(PathBuf, u64, u64, SystemTime)> = image_paths
        .par_iter()
        .filter_map(|p| {
            let hash = dhash(p)?;
            let meta = std::fs::metadata(p).ok()?;
            Some(((*p).clone(), hash, meta.len(), meta.modified().unwrap_or(SystemTime::UNIX_EPOCH)))
        })
        .collect();

    let mut tree: BkTree<usize> = BkTree::new();
    for (i, (_, hash, _, _)) in hashes.iter().enumerate() {
        tree.insert(*hash, i);
    }

    let mut visited = vec![false; hashes.len()];
    let mut groups = Vec::new();

    for i in 0..hashes.len() {
        if visited[i] {
            continue;
        }
        let (_, hash, _, _) = &hashes[i];
        let neighbors = tree.find_within(*hash, PHASH_MAX_DISTANCE);
        let mut members: Vec<usize> = neighbors
            .into_iter()
            .map(|(_, idx)| *idx)
            .filter(|idx| !visited[*idx])
            .collect();
        if members.len() < 2 {
            continue;
        }
        // Keep-candidate selection mirrors `build_group`: earliest mtime,
        // then shortest path, then lexicographic path.
        members.sort_by(|&a, &b| {
            hashes[a]
                .3
                .cmp(&hashes[b].3)
                .then(hashes[a].0.as_os_str().len().cmp(&hashes[b].0.as_os_str().len()))
                .then(hashes[a].0.cmp(&hashes[b].0))
        });
        for &idx in &members {
            visited[idx] = true;
        }

        let candidate_paths: Vec<PathBuf> = members.iter().map(|&idx| hashes[idx].0.clone()).collect();
        let sizes: Vec<u64> = members.iter().map(|&idx| hashes[idx].2).collect();
        let keep_candidate = candidate_paths[0].clone();
        let size_bytes = sizes[0];
        let reclaimable_bytes = sizes.iter().skip(1).sum();

        groups.push(DuplicateGroup {
            kind: DuplicateKind::Perceptual,
            paths: candidate_paths,
            size_bytes,
            keep_candidate,
            reclaimable_bytes,
        });
    }

    groups
}

fn looks_like_image(path: &Path) -> bool {
    let mut buf = [0u8; 12];
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let Ok(n) = file.read(&mut buf) else {
        return false;
    };
    sniff_image_format(&buf[..n]).is_some()
}
