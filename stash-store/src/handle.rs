//! Blob handle generation.
//!
//! Handles look like `{timestamp_ms}-{name}-{suffix}.{ext}`. The millisecond
//! timestamp plus an 8 character random suffix keeps concurrent imports of
//! identically named files apart without any coordination.

use rand::distributions::Alphanumeric;
use rand::Rng;

const MAX_NAME_LEN: usize = 48;
const MAX_EXT_LEN: usize = 10;
const SUFFIX_LEN: usize = 8;

/// Reduce a filename stem to `[A-Za-z0-9_-]`, at most 48 characters.
///
/// Anything else becomes `_`; an empty result becomes `file`.
pub fn sanitize_name_hint(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Split a name hint into a sanitized stem and extension.
fn split_hint(name_hint: &str) -> (String, String) {
    let (stem, ext) = match name_hint.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext),
        _ => (name_hint, ""),
    };

    let ext: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_EXT_LEN)
        .collect::<String>()
        .to_ascii_lowercase();
    let ext = if ext.is_empty() { "bin".to_string() } else { ext };

    (sanitize_name_hint(stem), ext)
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

/// Generate a fresh handle for content named `name_hint`.
pub fn generate_handle(name_hint: &str, timestamp_ms: i64) -> String {
    let (stem, ext) = split_hint(name_hint);
    format!("{}-{}-{}.{}", timestamp_ms, stem, random_suffix(), ext)
}

/// Whether a handle can be safely used as a single path component.
pub(crate) fn is_valid_handle(handle: &str) -> bool {
    !handle.is_empty()
        && handle != "."
        && handle != ".."
        && !handle.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
}
