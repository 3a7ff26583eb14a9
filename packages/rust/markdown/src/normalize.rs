//! Post-generation normalizer for blog Markdown.
//!
//! Each pass is a function `&str -> String` applied in sequence. The passes
//! undo escaping artifacts that language models put into their output; they
//! do not validate the Markdown itself.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

/// Run the full normalization pipeline on generated Markdown.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = md.to_string();

    result = decode_entities(&result);
    result = unescape_shortcodes(&result);
    result = decode_hex_references(&result);
    result = expand_literal_escapes(&result);

    debug!(input_len = md.len(), output_len = result.len(), "normalized markdown");
    result
}

// ---------------------------------------------------------------------------
// Pass 1: Decode HTML entities
// ---------------------------------------------------------------------------

/// Decode named and numeric HTML entities (`&amp;`, `&#128512;`, `&#x1F600;`).
fn decode_entities(md: &str) -> String {
    html_escape::decode_html_entities(md).into_owned()
}

// ---------------------------------------------------------------------------
// Pass 2: Un-escape emoji shortcodes
// ---------------------------------------------------------------------------

/// `\:rocket:` becomes `:rocket:`.
fn unescape_shortcodes(md: &str) -> String {
    static SHORTCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\\:([a-z0-9_+\-]+):").expect("valid regex")
    });

    SHORTCODE_RE.replace_all(md, ":$1:").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Decode leftover hex character references
// ---------------------------------------------------------------------------

/// Decode `&#xHHHH;` references that survived pass 1, such as ones that were
/// double-encoded. References to invalid code points are left as written.
fn decode_hex_references(md: &str) -> String {
    static HEX_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"&#[xX]([0-9A-Fa-f]+);").expect("valid regex")
    });

    HEX_REF_RE
        .replace_all(md, |caps: &Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map_or_else(|| caps[0].to_string(), String::from)
        })
        .to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: Expand literal escape sequences
// ---------------------------------------------------------------------------

/// Turn literal `\n`, `\t`, `\"` and `\'` into the characters they name.
fn expand_literal_escapes(md: &str) -> String {
    md.replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\\"", "\"")
        .replace("\\'", "'")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
