//! Collision-free destination naming.
//!
//! A name is tried as `base.ext`, then `base_1.ext`, `base_2.ext` and so on
//! until [`SharedState::try_reserve`] accepts one. Past
//! [`MAX_SUFFIX_ATTEMPTS`] a random token replaces the counter.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::state::SharedState;

/// Longest base name kept after sanitization, in characters.
pub const MAX_BASE_NAME_LEN: usize = 200;

/// Numbered suffixes tried before falling back to a random token.
pub const MAX_SUFFIX_ATTEMPTS: u32 = 9_999;

/// Substituted when sanitization leaves nothing.
pub const DEFAULT_BASE_NAME: &str = "untitled";

const ILLEGAL_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Strips characters that are illegal in file names, trims surrounding
/// whitespace and leading dots, and truncates to [`MAX_BASE_NAME_LEN`].
pub fn sanitize_base_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() && !ILLEGAL_CHARS.contains(c))
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.').trim();
    let truncated: String = trimmed.chars().take(MAX_BASE_NAME_LEN).collect();
    let truncated = truncated.trim_end();

    if truncated.is_empty() {
        DEFAULT_BASE_NAME.to_string()
    } else {
        truncated.to_string()
    }
}

fn sanitize_extension(raw: &str) -> String {
    raw.trim_start_matches('.')
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

fn file_name(base: &str, suffix: Option<&str>, ext: &str) -> String {
    let stem = match suffix {
        Some(s) => format!("{base}_{s}"),
        None => base.to_string(),
    };
    if ext.is_empty() {
        stem
    } else {
        format!("{stem}.{ext}")
    }
}

/// Reserves a destination path in `folder` for `base_name.extension` that
/// no other caller in this run has claimed and that does not exist on disk.
///
/// Safe to call concurrently: every attempt goes through the run's single
/// reservation set, so concurrent callers sharing a base name always get
/// distinct paths.
pub fn reserve(state: &SharedState, folder: &Path, base_name: &str, extension: &str) -> PathBuf {
    let base = sanitize_base_name(base_name);
    let ext = sanitize_extension(extension);

    let first = folder.join(file_name(&base, None, &ext));
    if state.try_reserve(&first) {
        return first;
    }

    for n in 1..=MAX_SUFFIX_ATTEMPTS {
        let candidate = folder.join(file_name(&base, Some(&n.to_string()), &ext));
        if state.try_reserve(&candidate) {
            return candidate;
        }
    }

    tracing::warn!(
        folder = %folder.display(),
        base = %base,
        "Exhausted numbered suffixes, falling back to a random name"
    );
    loop {
        let token = Uuid::new_v4().simple().to_string();
        let candidate = folder.join(file_name(&base, Some(&token), &ext));
        if state.try_reserve(&candidate) {
            return candidate;
        }
    }
}
