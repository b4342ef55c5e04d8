// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2021-2025, 🍀☀🌕🌥 🌊

//! Perceptual difference-hash (dHash) and a BK-tree for sublinear
//! Hamming-distance lookups (§4.6 stage 4).

use std::path::Path;

use image::imageops::FilterType;
use image::GenericImageView;

const HASH_WIDTH: u32 = 9;
const HASH_HEIGHT: u32 = 8;

/// Magic-byte sniffing for the formats stage 4 supports, independent of
/// file extension.
pub fn sniff_image_format(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpeg")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("gif")
    } else if bytes.starts_with(b"BM") {
        Some("bmp")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

/// Compute the 64-bit difference hash of the image at `path`.
pub fn dhash(path: &Path) -> Option<u64> {
    let img = image::open(path).ok()?;
    let gray = img
        .resize_exact(HASH_WIDTH, HASH_HEIGHT, FilterType::Triangle)
        .grayscale();

    let mut hash: u64 = 0;
    let mut bit = 0;
    for y in 0..HASH_HEIGHT {
        for x in 0..HASH_WIDTH - 1 {
            let left = gray.get_pixel(x, y).0[0];
            let right = gray.get_pixel(x + 1, y).0[0];
            if left > right {
                hash |= 1 << bit;
            }
            bit += 1;
        }
    }
    Some(hash)
}

pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Minimal BK-tree keyed by Hamming distance over 64-bit hashes, used so
/// "find everything within distance 10" doesn't require an O(n^2) scan.
pub struct BkTree<T> {
    root: Option<Box<Node<T>>>,
}

struct Node<T> {
    hash: u64,
    items: Vec<T>,
    children: Vec<(u32, Node<T>)>,
}

impl<T> BkTree<T> {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn insert(&mut self, hash: u64, item: T) {
        match &mut self.root {
            None => {
                self.root = Some(Box::new(Node {
                    hash,
                    items: vec![item],
                    children: Vec::new(),
                }));
            }
            Some(root) => insert_into(root, hash, item),
        }
    }

    /// All items within `max_distance` of `hash`, as (distance, &item) pairs.
    pub fn find_within(&self, hash: u64, max_distance: u32) -> Vec<(u32, &T)> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            search(root, hash, max_distance, &mut out);
        }
        out
    }
}

impl<T> Default for BkTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_into<T>(node: &mut Node<T>, hash: u64, item: T) {
    if hash == node.hash {
        node.items.push(item);
        return;
    }
    let distance = hamming_distance(hash, node.hash);
    for (d, child) in node.children.iter_mut() {
        if *d == distance {
            insert_into(child, hash, item);
            return;
        }
    }
    node.children.push((
        distance,
        Node {
            hash,
            items: vec![item],
            children: Vec::new(),
        },
    ));
}

fn search<'a, T>(node: &'a Node<T>, hash: u64, max_distance: u32, out: &mut Vec<(u32, &'a T)>) {
    let distance = hamming_distance(hash, node.hash);
    if distance <= max_distance {
        out.extend(node.items.iter().map(|item| (distance, item)));
    }
    let lo = distance.saturating_sub(max_distance);
    let hi = distance + max_distance;
    for (d, child) in &node.children {
        if *d >= lo && *d <= hi {
            search(child, hash, max_distance, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_png_magic_bytes() {
        let bytes = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(sniff_image_format(&bytes), Some("png"));
    }

    #[test]
    fn sniffs_jpeg_magic_bytes() {
        let bytes = [0xFF, 0xD8, 0xFF, 0xE0];
        assert_eq!(sniff_image_format(&bytes), Some("jpeg"));
    }

    #[test]
    fn rejects_unknown_bytes() {
        assert_eq!(sniff_image_format(b"not an image"), None);
    }

    #[test]
    fn hamming_distance_of_identical_hashes_is_zero() {
        assert_eq!(hamming_distance(0xABCD, 0xABCD), 0);
    }

    #[test]
    fn bktree_finds_nearby_hashes() {
        let mut tree = BkTree::new();
        tree.insert(0b0000_0000, "a");
        tree.insert(0b0000_0011, "b"); // distance 2 from a
        tree.insert(0xFFFF_FFFF_FFFF_FFFF, "c"); // far away

        let found = tree.find_within(0, 3);
        let labels: Vec<_> = found.iter().map(|(_, item)| **item).collect();
        assert!(labels.contains(&"a"));
        assert!(labels.contains(&"b"));
        assert!(!labels.contains(&"c"));
    }
}
