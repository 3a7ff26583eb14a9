//! Removal of reasoning traces that some models leave in their replies.

use std::sync::LazyLock;

use regex::Regex;

/// Strip `<think>` blocks, inline reasoning markers and stray lowercase tags.
///
/// Runs of three or more newlines collapse to one blank line and the result
/// is trimmed.
pub fn strip_reasoning(text: &str) -> String {
    static THINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));
    static NOTE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)\(internal note:.*?\)").expect("valid regex"));
    static THINKING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)\[thinking:.*?\]").expect("valid regex"));
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"</?[a-z]+>").expect("valid regex"));
    static BLANKS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let cleaned = THINK_RE.replace_all(text, "");
    let cleaned = NOTE_RE.replace_all(&cleaned, "");
    let cleaned = THINKING_RE.replace_all(&cleaned, "");
    let cleaned = TAG_RE.replace_all(&cleaned, "");
    let cleaned = BLANKS_RE.replace_all(&cleaned, "\n\n");

    cleaned.trim().to_string()
}
