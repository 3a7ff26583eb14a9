//! Near-duplicate removal over research findings.
//!
//! Every incoming fact is compared against every fact kept so far, so the
//! cost is O(n²) similarity calls. Runs produce tens of findings; larger
//! inputs would need blocking or bucketing before this pass.

use tracing::debug;

use postcraft_shared::Finding;

use crate::similarity::{DEDUP_THRESHOLD, similarity};

/// Remove near-duplicate findings using the default threshold.
pub fn dedup(findings: Vec<Finding>) -> Vec<Finding> {
    dedup_with_threshold(findings, DEDUP_THRESHOLD)
}

/// Remove findings whose normalized fact scores at least `threshold`
/// against a fact already kept.
///
/// The earlier finding always survives, whatever the credibility of the
/// later one. Relative order of survivors is preserved.
pub fn dedup_with_threshold(findings: Vec<Finding>, threshold: f64) -> Vec<Finding> {
    let input_len = findings.len();
    let mut seen: Vec<String> = Vec::with_capacity(input_len);
    let mut unique = Vec::with_capacity(input_len);

    for finding in findings {
        let fact = normalize_fact(&finding.fact);

        let duplicate_of = seen
            .iter()
            .map(|kept| (kept, similarity(&fact, kept)))
            .find(|(_, score)| *score >= threshold);

        match duplicate_of {
            Some((kept, score)) => {
                debug!(dropped = %fact, kept = %kept, score, "dropping near-duplicate finding");
            }
            None => {
                seen.push(fact);
                unique.push(finding);
            }
        }
    }

    debug!(
        input = input_len,
        kept = unique.len(),
        threshold,
        "deduplicated findings"
    );

    unique
}

/// Comparison key for a fact: lowercased and trimmed.
fn normalize_fact(fact: &str) -> String {
    fact.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use postcraft_shared::Credibility;

    fn finding(fact: &str, credibility: Credibility) -> Finding {
        Finding {
            fact: fact.into(),
            supporting_evidence: format!("evidence for {fact}"),
            source_url: "https://example.com".into(),
            source_credibility: credibility,
        }
    }

    #[test]
    fn empty_input() {
        assert!(dedup(vec![]).is_empty());
    }

    #[test]
    fn first_seen_wins_regardless_of_credibility() {
        let low = finding("Tokio is an async runtime", Credibility::Low);
        let high = finding("Tokio is an asynchronous runtime", Credibility::High);

        let result = dedup(vec![low.clone(), high]);
        assert_eq!(result, vec![low]);
    }

    #[test]
    fn comparison_ignores_case_and_padding() {
        let a = finding("WASM runs in the browser", Credibility::Medium);
        let b = finding("   wasm runs in the browser  ", Credibility::High);

        let result = dedup(vec![a.clone(), b]);
        assert_eq!(result, vec![a]);
    }

    #[test]
    fn distinct_facts_keep_order() {
        let input = vec![
            finding("Rust has no garbage collector", Credibility::High),
            finding("Cargo is the Rust build tool", Credibility::Medium),
            finding("Rust has no garbage collector.", Credibility::Low),
            finding("Clippy is a linter", Credibility::Medium),
        ];

        let result = dedup(input);
        let facts: Vec<_> = result.iter().map(|f| f.fact.as_str()).collect();
        assert_eq!(
            facts,
            vec![
                "Rust has no garbage collector",
                "Cargo is the Rust build tool",
                "Clippy is a linter",
            ]
        );
    }

    #[test]
    fn output_never_longer_than_input() {
        let input: Vec<_> = (0..12)
            .map(|i| finding(&format!("fact number {}", i % 5), Credibility::Medium))
            .collect();
        let len = input.len();
        let result = dedup(input);
        assert!(result.len() <= len);
        assert!(!result.is_empty());
    }

    #[test]
    fn threshold_is_inclusive() {
        // "abcd" / "bcde" score exactly 0.75
        let a = finding("abcd", Credibility::Medium);
        let b = finding("bcde", Credibility::Medium);

        assert_eq!(dedup_with_threshold(vec![a.clone(), b.clone()], 0.75).len(), 1);
        assert_eq!(dedup_with_threshold(vec![a, b], 0.76).len(), 2);
    }
}
