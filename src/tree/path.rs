//! Dot-separated path addressing.
//!
//! A path is a sequence of segments joined by `.`. Under an object a segment
//! is a child key, under an array it is a base-10 index. The empty path is
//! the root.

use crate::error::PathError;

/// Split a path into segments. The empty path yields no segments.
pub fn split_path(path: &str) -> Result<Vec<&str>, PathError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(PathError::Malformed(path.to_string()));
    }
    Ok(segments)
}

/// Whether `key` can name an object child reachable by a path.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains('.')
}

/// Join a parent path and a child segment.
pub fn join_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", parent, segment)
    }
}

/// Split off the last segment: `"a.b.c"` -> `("a.b", "c")`.
pub fn parent_and_key(path: &str) -> Option<(&str, &str)> {
    if path.is_empty() {
        return None;
    }
    match path.rfind('.') {
        Some(idx) => Some((&path[..idx], &path[idx + 1..])),
        None => Some(("", path)),
    }
}

/// Parse an array segment. Only plain ASCII digits are accepted.
pub fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}
