//! Text cleanup for generated blog content.
//!
//! Normalizes escaping artifacts in generated Markdown, strips reasoning
//! traces from prose, extracts footnote references and cleans tag lists.

mod normalize;
mod reasoning;
mod references;
mod tags;

use tracing::instrument;

pub use reasoning::strip_reasoning;
pub use references::parse_references;
pub use tags::{clean_tag, clean_tag_output};

/// Undo escaping artifacts in generated Markdown.
///
/// Passes, in order: HTML entities, backslash-escaped emoji shortcodes,
/// leftover `&#xHHHH;` references, literal `\n` / `\t` / quote escapes.
#[instrument(skip_all, fields(len = markdown.len()))]
pub fn normalize_generated_markdown(markdown: &str) -> String {
    normalize::run_pipeline(markdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_newline_becomes_newline() {
        assert_eq!(normalize_generated_markdown(r"a\nb"), "a\nb");
    }

    #[test]
    fn hex_reference_becomes_emoji() {
        assert_eq!(normalize_generated_markdown("&#x1F600;"), "\u{1F600}");
    }
}
