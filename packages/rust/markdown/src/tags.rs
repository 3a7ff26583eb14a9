//! Tag cleanup for generated tag lists and publishing.

use std::sync::LazyLock;

use regex::Regex;

/// Normalize a generated tag list into a comma-joined string.
///
/// Splits on newlines and commas, lowercases, turns spaces into hyphens and
/// drops anything outside `[a-z0-9-]`. Tags left empty are dropped.
pub fn clean_tag_output(raw: &str) -> String {
    static SPLIT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\n,]+").expect("valid regex"));
    static INVALID_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^a-z0-9\-]").expect("valid regex"));

    SPLIT_RE
        .split(raw)
        .map(|tag| tag.trim().to_lowercase().replace(' ', "-"))
        .map(|tag| INVALID_RE.replace_all(&tag, "").into_owned())
        .filter(|tag| !tag.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Collapse a tag into the single-word form publishing services accept.
pub fn clean_tag(tag: &str) -> String {
    tag.to_lowercase().replace(['-', ' '], "")
}
