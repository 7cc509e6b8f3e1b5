//! Text normalization shared by sheet ingestion and view filtering.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Collapses every run of whitespace (newlines included) to one space and
/// strips combining accents.
pub fn normalize_text(s: &str) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Comparison form: normalized and lower-cased.
pub fn fold(s: &str) -> String {
    normalize_text(s).to_lowercase()
}
