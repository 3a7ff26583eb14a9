//! Combining user-provided research with automated research.

use tracing::{info, warn};

use postcraft_shared::{ResearchFailure, ResearchRecord, SourceCounts};

use crate::dedup::dedup_with_threshold;
use crate::similarity::DEDUP_THRESHOLD;

/// Topic used when neither input names one.
const UNKNOWN_TOPIC: &str = "Unknown Topic";

/// Merge user research with automated research using the default threshold.
pub fn merge(
    user: ResearchRecord,
    auto: &Result<ResearchRecord, ResearchFailure>,
) -> ResearchRecord {
    merge_with_threshold(user, auto, DEDUP_THRESHOLD)
}

/// Merge user research with automated research.
///
/// User findings come first, so a user fact survives deduplication against
/// an automated paraphrase of it. When automated research failed, the user
/// record is returned unchanged. `sources` counts the inputs before
/// deduplication. The merged summary is left empty for the summary step.
pub fn merge_with_threshold(
    user: ResearchRecord,
    auto: &Result<ResearchRecord, ResearchFailure>,
    threshold: f64,
) -> ResearchRecord {
    let auto = match auto {
        Ok(record) => record,
        Err(failure) => {
            warn!(error = %failure, "automated research failed, keeping user research only");
            return user;
        }
    };

    let topic = [auto.topic.as_str(), user.topic.as_str()]
        .into_iter()
        .find(|t| !t.trim().is_empty())
        .unwrap_or(UNKNOWN_TOPIC)
        .to_string();

    let counts = SourceCounts {
        user: user.key_findings.len(),
        auto: auto.key_findings.len(),
    };

    let combined = user
        .key_findings
        .into_iter()
        .chain(auto.key_findings.iter().cloned())
        .collect();
    let key_findings = dedup_with_threshold(combined, threshold);

    info!(
        %topic,
        user = counts.user,
        auto = counts.auto,
        merged = key_findings.len(),
        "merged research"
    );

    ResearchRecord {
        topic,
        key_findings,
        summary: String::new(),
        sources: Some(counts),
    }
}
