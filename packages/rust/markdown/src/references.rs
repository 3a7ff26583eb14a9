//! Footnote reference extraction from finished blog Markdown.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use postcraft_shared::Reference;

static DEFINITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\^(\d+)\]:\s?(.*)$").expect("valid regex"));

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s\]]+").expect("valid regex"));

/// Collect `[^N]: …` footnote definitions in document order.
///
/// A definition owns every following line up to the next definition, so
/// multi-line references stay whole. The first URL becomes `source_url` and
/// all URLs are removed from `text`.
pub fn parse_references(markdown: &str) -> Vec<Reference> {
    let mut definitions: Vec<(String, Vec<&str>)> = Vec::new();

    for line in markdown.lines() {
        if let Some(caps) = DEFINITION_RE.captures(line) {
            let first = caps.get(2).map_or("", |m| m.as_str());
            definitions.push((caps[1].to_string(), vec![first]));
        } else if let Some((_, lines)) = definitions.last_mut() {
            lines.push(line);
        }
    }

    let references: Vec<Reference> = definitions
        .into_iter()
        .map(|(id, lines)| build_reference(id, &lines.join("\n")))
        .collect();

    debug!(count = references.len(), "parsed footnote references");
    references
}

fn build_reference(id: String, content: &str) -> Reference {
    let content = content.trim();
    let source_url = URL_RE.find(content).map(|m| m.as_str().to_string());
    let text = URL_RE.replace_all(content, "").trim().to_string();

    Reference {
        id,
        text,
        source_url,
    }
}
