//! Prefix and key validation shared by every backend.
//!
//! Prefixes are single path segments made of lowercase ASCII letters, digits,
//! `-` and `_`. Keys may contain `/`-separated segments of ASCII
//! alphanumerics, `-`, `_`, `.` and `+`; no segment may be empty or start
//! with `.`. Names starting with `.` are reserved for backend bookkeeping.

use crate::error::{StoreError, StoreResult};

/// Marker object written by `ensure_container` on backends without native
/// containers. Hidden from listings.
pub(crate) const CONTAINER_MARKER: &str = ".container";

pub fn validate_prefix(prefix: &str) -> StoreResult<()> {
    let invalid = |reason: &str| StoreError::InvalidName {
        what: "prefix",
        value: prefix.to_string(),
        reason: reason.to_string(),
    };
    if prefix.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if !prefix
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(invalid("only [a-z0-9_-] allowed"));
    }
    Ok(())
}

pub fn validate_key(key: &str) -> StoreResult<()> {
    let invalid = |reason: String| StoreError::InvalidName {
        what: "key",
        value: key.to_string(),
        reason,
    };
    if key.is_empty() {
        return Err(invalid("must not be empty".into()));
    }
    for segment in key.split('/') {
        if segment.is_empty() {
            return Err(invalid("segments must not be empty".into()));
        }
        if segment.starts_with('.') {
            return Err(invalid(format!("segment must not start with '.': {segment:?}")));
        }
        if let Some(ch) = segment
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+')))
        {
            return Err(invalid(format!("contains forbidden character: {ch:?}")));
        }
    }
    Ok(())
}
