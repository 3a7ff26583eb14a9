//! Defensive extraction of a [`ResearchRecord`] from generator output.
//!
//! Generator replies are unreliable: the JSON may be wrapped in a code
//! fence or in prose, findings may use alternate field names, and some
//! models group findings per category with a nested list of sources.
//! Each known shape is decoded into its own variant and normalized into
//! the canonical [`Finding`].
//!
//! Failures never escape as errors: callers get a [`ResearchFailure`]
//! carrying a bounded excerpt of the raw reply.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use postcraft_shared::{Credibility, Finding, ResearchFailure, ResearchRecord};

/// Summary used when the reply carries none.
pub const SUMMARY_PLACEHOLDER: &str = "Research summary not available";

/// Maximum number of raw-output characters kept on a failure.
const RAW_EXCERPT_CHARS: usize = 500;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Values backfilled into findings whose fields are missing entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindingDefaults {
    pub fact: &'static str,
    pub supporting_evidence: &'static str,
    pub source_url: &'static str,
    pub source_credibility: Credibility,
}

impl FindingDefaults {
    /// Defaults for findings produced by automated web research.
    pub const AUTOMATED: Self = Self {
        fact: "No fact provided",
        supporting_evidence: "No evidence provided",
        source_url: "Unknown source",
        source_credibility: Credibility::Medium,
    };

    /// Defaults for findings extracted from the user's own notes.
    pub const USER: Self = Self {
        fact: "No fact provided",
        supporting_evidence: "No evidence provided",
        source_url: "User Provided",
        source_credibility: Credibility::UserProvided,
    };
}

impl Default for FindingDefaults {
    fn default() -> Self {
        Self::AUTOMATED
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse automated research output with the automated-research defaults.
pub fn parse_research_output(raw: &str) -> Result<ResearchRecord, ResearchFailure> {
    parse_with_defaults(raw, &FindingDefaults::AUTOMATED)
}

/// Parse research output, backfilling missing finding fields from `defaults`.
pub fn parse_with_defaults(
    raw: &str,
    defaults: &FindingDefaults,
) -> Result<ResearchRecord, ResearchFailure> {
    match decode_record(raw, defaults) {
        Ok(record) => {
            debug!(
                topic = %record.topic,
                findings = record.key_findings.len(),
                "parsed research output"
            );
            Ok(record)
        }
        Err(reason) => {
            warn!(%reason, raw_len = raw.len(), "failed to parse research output");
            Err(ResearchFailure {
                error: format!("Research parsing failed: {reason}"),
                topic: None,
                raw_output: Some(excerpt(raw)),
            })
        }
    }
}

fn decode_record(raw: &str, defaults: &FindingDefaults) -> Result<ResearchRecord, String> {
    let value = decode_json(raw)?;

    let Value::Object(mut root) = value else {
        return Err("top-level value is not an object".into());
    };

    let findings = root
        .remove("key_findings")
        .ok_or("Missing key_findings in research output")?;
    let key_findings = UpstreamShape::decode(findings)?.into_findings(defaults);

    let topic = root.get("topic").and_then(scalar_text).unwrap_or_default();
    let summary = root
        .get("summary")
        .and_then(scalar_text)
        .unwrap_or_else(|| SUMMARY_PLACEHOLDER.to_string());

    Ok(ResearchRecord {
        topic,
        key_findings,
        summary,
        sources: None,
    })
}

// ---------------------------------------------------------------------------
// Payload extraction
// ---------------------------------------------------------------------------

/// Strip a code fence that wraps the whole reply, if any.
///
/// Fences inside the payload (e.g. a code sample in a string value) are
/// left alone.
fn strip_fence(trimmed: &str) -> &str {
    static WRAPPED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\A```[A-Za-z0-9_-]*[ \t]*\r?\n(.*)```\z").expect("valid regex")
    });

    if let Some(body) = WRAPPED_RE.captures(trimmed).and_then(|caps| caps.get(1)) {
        return body.as_str().trim();
    }

    // Unterminated fence (reply cut off before the closing marker)
    match trimmed.strip_prefix("```") {
        Some(rest) => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()).trim(),
        None => trimmed,
    }
}

/// Decode JSON from a reply.
///
/// Tries the unfenced payload, then the reply as-is, then the outermost
/// `{ … }` span of each when prose surrounds the object. The reported
/// error is the one from the unfenced payload.
fn decode_json(raw: &str) -> Result<Value, String> {
    let trimmed = raw.trim();
    let payload = strip_fence(trimmed);

    let first_err = match serde_json::from_str(payload) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    [Some(trimmed), outermost_object(payload), outermost_object(trimmed)]
        .into_iter()
        .flatten()
        .filter(|candidate| *candidate != payload)
        .find_map(|candidate| serde_json::from_str(candidate).ok())
        .ok_or(first_err)
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// First [`RAW_EXCERPT_CHARS`] characters of `raw`, with `...` when cut.
fn excerpt(raw: &str) -> String {
    match raw.char_indices().nth(RAW_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &raw[..cut]),
        None => raw.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Upstream shapes
// ---------------------------------------------------------------------------

/// Known layouts of the `key_findings` array.
enum UpstreamShape {
    /// One object per finding.
    Flat(Vec<FlatFinding>),
    /// Categories, each holding a `sources` list of per-source records.
    Grouped(Vec<Category>),
}

/// A flat finding, canonical and alternate field names side by side.
#[derive(Debug, Default, Deserialize)]
struct FlatFinding {
    fact: Option<Value>,
    claim: Option<Value>,
    supporting_evidence: Option<Value>,
    evidence: Option<Value>,
    source_url: Option<Value>,
    url: Option<Value>,
    source_credibility: Option<Value>,
    credibility: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Category {
    sources: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct SourceEntry {
    claim: Option<Value>,
    evidence: Option<Value>,
    url: Option<Value>,
    credibility: Option<Value>,
}

impl UpstreamShape {
    fn decode(value: Value) -> Result<Self, String> {
        let Value::Array(items) = value else {
            return Err("key_findings should be a list".into());
        };

        let grouped = items
            .first()
            .and_then(|first| first.get("sources"))
            .is_some_and(Value::is_array);

        if grouped {
            debug!(categories = items.len(), "flattening grouped findings");
            Ok(Self::Grouped(decode_entries(items, "category")))
        } else {
            Ok(Self::Flat(decode_entries(items, "finding")))
        }
    }

    fn into_findings(self, defaults: &FindingDefaults) -> Vec<Finding> {
        match self {
            Self::Flat(findings) => findings
                .into_iter()
                .map(|f| f.normalize(defaults))
                .collect(),
            Self::Grouped(categories) => categories
                .into_iter()
                .flat_map(|category| decode_entries::<SourceEntry>(category.sources, "source"))
                .map(|source| source.normalize(defaults))
                .collect(),
        }
    }
}

/// Decode each entry, skipping the ones that do not fit `T`.
fn decode_entries<T: for<'de> Deserialize<'de>>(items: Vec<Value>, kind: &str) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(kind, index, error = %e, "skipping malformed research entry");
                None
            }
        })
        .collect()
}

impl FlatFinding {
    fn normalize(self, defaults: &FindingDefaults) -> Finding {
        Finding {
            fact: first_text(&[&self.fact, &self.claim])
                .unwrap_or_else(|| defaults.fact.to_string()),
            supporting_evidence: first_text(&[&self.supporting_evidence, &self.evidence])
                .unwrap_or_else(|| defaults.supporting_evidence.to_string()),
            source_url: first_text(&[&self.source_url, &self.url])
                .unwrap_or_else(|| defaults.source_url.to_string()),
            source_credibility: first_text(&[&self.source_credibility, &self.credibility])
                .map(|label| Credibility::from_label(&label))
                .unwrap_or(defaults.source_credibility),
        }
    }
}

impl SourceEntry {
    fn normalize(self, defaults: &FindingDefaults) -> Finding {
        Finding {
            fact: first_text(&[&self.claim]).unwrap_or_default(),
            supporting_evidence: first_text(&[&self.evidence]).unwrap_or_default(),
            source_url: first_text(&[&self.url])
                .unwrap_or_else(|| defaults.source_url.to_string()),
            source_credibility: first_text(&[&self.credibility])
                .map(|label| Credibility::from_label(&label))
                .unwrap_or(defaults.source_credibility),
        }
    }
}

/// Text of the first present scalar among `candidates`.
fn first_text(candidates: &[&Option<Value>]) -> Option<String> {
    candidates
        .iter()
        .find_map(|candidate| candidate.as_ref().and_then(scalar_text))
}

/// Strings as-is, numbers and booleans stringified; null and containers are absent.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{
        "topic": "Rust async",
        "key_findings": [
            {
                "fact": "Tokio is the most used async runtime",
                "supporting_evidence": "crates.io download counts",
                "source_url": "https://crates.io/crates/tokio",
                "source_credibility": "High"
            },
            {
                "fact": "async fn in traits stabilized in 1.75",
                "supporting_evidence": "release notes",
                "source_url": "https://blog.rust-lang.org",
                "source_credibility": "Medium"
            }
        ],
        "summary": "Async Rust is maturing."
    }"#;

    #[test]
    fn well_formed_payload_is_unchanged() {
        let record = parse_research_output(WELL_FORMED).expect("parse");
        assert_eq!(record.topic, "Rust async");
        assert_eq!(record.summary, "Async Rust is maturing.");
        assert_eq!(record.key_findings.len(), 2);

        let first = &record.key_findings[0];
        assert_eq!(first.fact, "Tokio is the most used async runtime");
        assert_eq!(first.supporting_evidence, "crates.io download counts");
        assert_eq!(first.source_url, "https://crates.io/crates/tokio");
        assert_eq!(first.source_credibility, Credibility::High);

        // Only the four canonical keys survive
        let json = serde_json::to_value(first).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        for alternate in ["claim", "evidence", "url", "credibility"] {
            assert!(json.get(alternate).is_none());
        }
    }

    #[test]
    fn fenced_payload_is_unwrapped() {
        let raw = format!("Here is the research:\n```json\n{WELL_FORMED}\n```\nLet me know!");
        let record = parse_research_output(&raw).expect("parse");
        assert_eq!(record.key_findings.len(), 2);
    }

    #[test]
    fn unterminated_fence_is_unwrapped() {
        let raw = format!("```json\n{WELL_FORMED}");
        let record = parse_research_output(&raw).expect("parse");
        assert_eq!(record.topic, "Rust async");
    }

    const INLINE_FENCE: &str = r#"{"topic":"Rust","key_findings":[{"fact":"Closures capture by reference","supporting_evidence":"Example: ```let f = || x + 1;``` borrows x","source_url":"https://doc.rust-lang.org/book/ch13-01-closures.html","source_credibility":"High"}]}"#;

    #[test]
    fn inline_fence_in_string_value_is_kept() {
        let record = parse_research_output(INLINE_FENCE).expect("parse");
        assert_eq!(record.topic, "Rust");
        assert_eq!(
            record.key_findings[0].supporting_evidence,
            "Example: ```let f = || x + 1;``` borrows x"
        );
    }

    #[test]
    fn inline_fence_inside_wrapping_fence_is_kept() {
        let raw = format!("```json\n{INLINE_FENCE}\n```");
        let record = parse_research_output(&raw).expect("parse");
        assert_eq!(record.key_findings.len(), 1);
        assert_eq!(
            record.key_findings[0].supporting_evidence,
            "Example: ```let f = || x + 1;``` borrows x"
        );
    }

    #[test]
    fn prose_around_object_is_tolerated() {
        let raw = format!("Sure! {WELL_FORMED} Hope this helps.");
        let record = parse_research_output(&raw).expect("parse");
        assert_eq!(record.key_findings.len(), 2);
    }

    #[test]
    fn grouped_shape_is_flattened() {
        let raw = r#"{
            "topic": "WebAssembly",
            "key_findings": [
                {
                    "category": "Performance",
                    "sources": [
                        {"claim": "Wasm runs near native speed", "evidence": "benchmarks", "url": "https://a.dev", "credibility": "High"},
                        {"claim": "Startup is fast", "evidence": "streaming compilation"}
                    ]
                },
                {
                    "category": "Adoption",
                    "sources": [
                        {"claim": "All major browsers support Wasm", "url": "https://caniuse.com", "credibility": "low"}
                    ]
                }
            ]
        }"#;

        let record = parse_research_output(raw).expect("parse");
        let facts: Vec<_> = record.key_findings.iter().map(|f| f.fact.as_str()).collect();
        assert_eq!(
            facts,
            vec![
                "Wasm runs near native speed",
                "Startup is fast",
                "All major browsers support Wasm",
            ]
        );

        let second = &record.key_findings[1];
        assert_eq!(second.supporting_evidence, "streaming compilation");
        assert_eq!(second.source_url, "Unknown source");
        assert_eq!(second.source_credibility, Credibility::Medium);

        let third = &record.key_findings[2];
        assert_eq!(third.supporting_evidence, "");
        assert_eq!(third.source_credibility, Credibility::Low);
    }

    #[test]
    fn alternate_names_are_backfilled() {
        let raw = r#"{"key_findings": [
            {"claim": "Zig has comptime", "evidence": "docs", "url": "https://ziglang.org", "credibility": "High"}
        ]}"#;

        let record = parse_research_output(raw).expect("parse");
        let finding = &record.key_findings[0];
        assert_eq!(finding.fact, "Zig has comptime");
        assert_eq!(finding.supporting_evidence, "docs");
        assert_eq!(finding.source_url, "https://ziglang.org");
        assert_eq!(finding.source_credibility, Credibility::High);
    }

    #[test]
    fn canonical_name_wins_over_alternate() {
        let raw = r#"{"key_findings": [
            {"fact": "canonical", "claim": "alternate", "source_url": "https://one", "url": "https://two"}
        ]}"#;

        let record = parse_research_output(raw).expect("parse");
        assert_eq!(record.key_findings[0].fact, "canonical");
        assert_eq!(record.key_findings[0].source_url, "https://one");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let raw = r#"{"topic": "t", "key_findings": [{}]}"#;
        let record = parse_research_output(raw).expect("parse");

        let finding = &record.key_findings[0];
        assert_eq!(finding.fact, "No fact provided");
        assert_eq!(finding.supporting_evidence, "No evidence provided");
        assert_eq!(finding.source_url, "Unknown source");
        assert_eq!(finding.source_credibility, Credibility::Medium);
        assert_eq!(record.summary, SUMMARY_PLACEHOLDER);
    }

    #[test]
    fn user_defaults_mark_user_provenance() {
        let raw = r#"{"topic": "t", "key_findings": [{"fact": "my note"}]}"#;
        let record = parse_with_defaults(raw, &FindingDefaults::USER).expect("parse");

        let finding = &record.key_findings[0];
        assert_eq!(finding.source_url, "User Provided");
        assert_eq!(finding.source_credibility, Credibility::UserProvided);
    }

    #[test]
    fn non_string_scalars_are_stringified() {
        let raw = r#"{"key_findings": [{"fact": 42, "supporting_evidence": true, "source_url": null}]}"#;
        let record = parse_research_output(raw).expect("parse");

        let finding = &record.key_findings[0];
        assert_eq!(finding.fact, "42");
        assert_eq!(finding.supporting_evidence, "true");
        assert_eq!(finding.source_url, "Unknown source");
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let raw = r#"{"key_findings": ["just a string", {"fact": "kept"}, 7]}"#;
        let record = parse_research_output(raw).expect("parse");
        assert_eq!(record.key_findings.len(), 1);
        assert_eq!(record.key_findings[0].fact, "kept");
    }

    #[test]
    fn not_json_returns_failure_record() {
        let failure = parse_research_output("not json").unwrap_err();
        assert!(failure.error.starts_with("Research parsing failed"));
        assert_eq!(failure.raw_output.as_deref(), Some("not json"));
    }

    #[test]
    fn missing_key_findings_is_a_failure() {
        let failure = parse_research_output(r#"{"topic": "t"}"#).unwrap_err();
        assert!(failure.error.contains("Missing key_findings"));
    }

    #[test]
    fn key_findings_must_be_a_list() {
        let failure = parse_research_output(r#"{"key_findings": {"fact": "x"}}"#).unwrap_err();
        assert!(failure.error.contains("should be a list"));
    }

    #[test]
    fn top_level_array_is_a_failure() {
        let failure = parse_research_output("[1, 2, 3]").unwrap_err();
        assert!(failure.error.contains("not an object"));
    }

    #[test]
    fn failure_excerpt_is_bounded() {
        let raw = "é".repeat(800);
        let failure = parse_research_output(&raw).unwrap_err();
        let excerpt = failure.raw_output.expect("excerpt");
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.chars().count(), RAW_EXCERPT_CHARS + 3);
    }

    #[test]
    fn empty_findings_list_is_valid() {
        let record = parse_research_output(r#"{"topic": "t", "key_findings": []}"#).expect("parse");
        assert!(record.key_findings.is_empty());
    }
}
