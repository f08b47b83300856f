// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Slash-separated path helpers.
//!
//! Filesystem paths are plain strings rather than `std::path::Path`: they name
//! keys in a remote repository, so host separators and prefixes never apply.

use crate::error::{Error, Result};

pub const SEPARATOR: char = '/';

/// Normalize a path into its absolute form.
///
/// `.` components and repeated or trailing separators are dropped, `..` pops
/// the previous component. A `..` that would climb above the root, or a NUL
/// character anywhere, is rejected.
pub fn normalize<S: AsRef<str>>(path: S) -> Result<String> {
    let path = path.as_ref();
    if path.contains('\0') {
        return Err(Error::invalid_path(path));
    }

    let mut components: Vec<&str> = Vec::new();
    for component in path.split(SEPARATOR) {
        match component {
            "" | "." => {}
            ".." => {
                if components.pop().is_none() {
                    return Err(Error::invalid_path(path));
                }
            }
            name => components.push(name),
        }
    }

    Ok(format!("{SEPARATOR}{}", components.join("/")))
}

/// Strips the root separator from a path, if present
#[must_use]
pub fn strip_root(path: &str) -> &str {
    path.trim_start_matches(SEPARATOR)
}

/// Final component of a normalized path, or `""` for the root.
#[must_use]
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches(SEPARATOR);
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Parent of a normalized path. The parent of `/` is `/`.
#[must_use]
pub fn dirname(path: &str) -> &str {
    let trimmed = path.trim_end_matches(SEPARATOR);
    match trimmed.rfind(SEPARATOR) {
        Some(0) | None => "/",
        Some(idx) => &trimmed[..idx],
    }
}

/// Join two paths; an absolute `child` replaces `base`.
#[must_use]
pub fn join(base: &str, child: &str) -> String {
    if child.starts_with(SEPARATOR) {
        return child.to_string();
    }
    let base = base.trim_end_matches(SEPARATOR);
    if child.is_empty() {
        return if base.is_empty() { "/".to_string() } else { base.to_string() };
    }
    format!("{base}{SEPARATOR}{child}")
}

/// Append a trailing separator unless the path already ends in one.
#[must_use]
pub fn forcedir(path: &str) -> String {
    if path.ends_with(SEPARATOR) {
        path.to_string()
    } else {
        format!("{path}{SEPARATOR}")
    }
}

#[must_use]
pub fn is_root(path: &str) -> bool {
    path.trim_matches(SEPARATOR).is_empty()
}
