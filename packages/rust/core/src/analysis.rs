//! Research analysis: user notes, automated web research, merge and summary.

use tracing::{error, info, instrument, warn};

use postcraft_markdown::strip_reasoning;
use postcraft_providers::{SearchDocument, TextGenerator, WebSearch};
use postcraft_research::{FindingDefaults, merge_with_threshold, parse_research_output, parse_with_defaults};
use postcraft_shared::{
    PostcraftError, ResearchFailure, ResearchRecord, Result, Stage, StageFailure,
};

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

const RESEARCH_INSTRUCTIONS: &[&str] = &[
    "You are a professional research assistant specialized in technical topics.",
    "Analyze the search results to identify key information and credible sources.",
    "For each key finding provide a clear fact, brief supporting evidence, the source URL and a source credibility rating of High, Medium or Low.",
    "Output valid JSON with exactly this structure:",
    r#"{"topic": "Research topic", "key_findings": [{"fact": "Specific fact or claim", "supporting_evidence": "Supporting details", "source_url": "Full source URL", "source_credibility": "High/Medium/Low"}], "summary": "Brief research summary"}"#,
    "Do not group findings into categories. Each finding carries its own source.",
];

const NOTES_INSTRUCTIONS: &[&str] = &[
    "You are a research analysis specialist.",
    "Convert unstructured research notes into structured JSON.",
    "Extract key facts with their supporting evidence and sources.",
    "For each finding include fact, supporting_evidence, source_url and source_credibility.",
    "Use 'User Provided' for missing URLs and credibility.",
    "Output ONLY valid JSON with the requested structure.",
];

const SUMMARY_INSTRUCTIONS: &[&str] = &[
    "You are a research synthesis expert.",
    "Combine findings from multiple sources into a comprehensive summary.",
    "Keep a neutral, professional tone.",
    "Structure: Overview, Key Insights, Conclusion.",
    "Cover all key points without redundancy.",
    "Do not include any thinking process or internal tags.",
];

// ---------------------------------------------------------------------------
// ResearchAnalyst
// ---------------------------------------------------------------------------

/// Produces the merged research record for a topic.
pub struct ResearchAnalyst<'a> {
    generator: &'a dyn TextGenerator,
    search: &'a dyn WebSearch,
    dedup_threshold: f64,
}

impl<'a> ResearchAnalyst<'a> {
    pub fn new(
        generator: &'a dyn TextGenerator,
        search: &'a dyn WebSearch,
        dedup_threshold: f64,
    ) -> Self {
        Self {
            generator,
            search,
            dedup_threshold,
        }
    }

    /// Search the web for `topic` and turn the results into findings.
    #[instrument(skip_all, fields(topic = %topic))]
    pub async fn research_topic(&self, topic: &str) -> std::result::Result<ResearchRecord, ResearchFailure> {
        let process_failure = |e: PostcraftError| {
            error!(error = %e, "automated research failed");
            ResearchFailure::new(format!("Research process failed: {e}")).with_topic(topic)
        };

        let documents = self.search.search(topic).await.map_err(process_failure)?;
        let prompt = research_prompt(topic, &documents);
        let raw = self
            .generator
            .generate(&prompt, RESEARCH_INSTRUCTIONS)
            .await
            .map_err(process_failure)?;

        let record = parse_research_output(&raw)
            .map(|record| with_topic_fallback(record, topic))
            .map_err(|failure| failure.with_topic(topic))?;

        info!(findings = record.key_findings.len(), "automated research complete");
        Ok(record)
    }

    /// Structure the user's notes. Empty notes skip generation.
    ///
    /// Notes that cannot be parsed degrade to an empty record; only a
    /// generation failure is an error.
    #[instrument(skip_all, fields(topic = %topic, notes_len = notes.len()))]
    pub async fn parse_user_notes(&self, topic: &str, notes: &str) -> Result<ResearchRecord> {
        if notes.trim().is_empty() {
            return Ok(ResearchRecord::empty(topic));
        }

        let prompt = notes_prompt(topic, notes);
        let raw = self.generator.generate(&prompt, NOTES_INSTRUCTIONS).await?;

        match parse_with_defaults(&raw, &FindingDefaults::USER) {
            Ok(record) => {
                let record = with_topic_fallback(record, topic);
                info!(findings = record.key_findings.len(), "user notes structured");
                Ok(record)
            }
            Err(failure) => {
                warn!(error = %failure, "user notes could not be structured, continuing without them");
                Ok(ResearchRecord::empty(topic))
            }
        }
    }

    /// Write a prose summary of `record`, cleaned of reasoning traces.
    #[instrument(skip_all, fields(topic = %record.topic, findings = record.key_findings.len()))]
    pub async fn summarize(&self, record: &ResearchRecord) -> Result<String> {
        let prompt = summary_prompt(record);
        let raw = self.generator.generate(&prompt, SUMMARY_INSTRUCTIONS).await?;
        Ok(strip_reasoning(&raw))
    }

    /// Notes, automated research, merge, summary.
    ///
    /// A failed automated search is absorbed by the merge; a generation
    /// failure while structuring notes or summarizing aborts the stage.
    #[instrument(skip_all, fields(topic = %topic))]
    pub async fn analyse_research(
        &self,
        topic: &str,
        notes: Option<&str>,
    ) -> std::result::Result<ResearchRecord, StageFailure> {
        let merge_failure = |e: PostcraftError| {
            error!(error = %e, "research analysis failed");
            StageFailure::new(Stage::Research, format!("Research merge failed: {e}"))
        };

        let user = self
            .parse_user_notes(topic, notes.unwrap_or_default())
            .await
            .map_err(merge_failure)?;
        let auto = self.research_topic(topic).await;

        let mut merged = merge_with_threshold(user, &auto, self.dedup_threshold);
        merged.summary = self.summarize(&merged).await.map_err(merge_failure)?;

        info!(
            findings = merged.key_findings.len(),
            summary_len = merged.summary.len(),
            "research analysis complete"
        );
        Ok(merged)
    }
}

fn with_topic_fallback(mut record: ResearchRecord, topic: &str) -> ResearchRecord {
    if record.topic.trim().is_empty() {
        record.topic = topic.to_string();
    }
    record
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

fn research_prompt(topic: &str, documents: &[SearchDocument]) -> String {
    let results = if documents.is_empty() {
        "(no search results)".to_string()
    } else {
        documents
            .iter()
            .enumerate()
            .map(|(i, d)| format!("{}. {}\n   URL: {}\n   {}", i + 1, d.title, d.url, d.snippet))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "**Topic**: {topic}\n\n**Search Results**:\n{results}\n\n\
         **Task**: Research the topic using the search results and provide findings in JSON format."
    )
}

fn notes_prompt(topic: &str, notes: &str) -> String {
    format!(
        "**Topic**: {topic}\n\n**User Research**:\n{notes}\n\n\
         **Required Output Structure**:\n\
         {{\"topic\": \"Research topic\", \"key_findings\": [{{\"fact\": \"Specific fact or claim\", \
         \"supporting_evidence\": \"Brief supporting details\", \"source_url\": \"Source URL or 'User Provided'\", \
         \"source_credibility\": \"High/Medium/Low/User Provided\"}}]}}"
    )
}

fn summary_prompt(record: &ResearchRecord) -> String {
    let findings = record
        .key_findings
        .iter()
        .map(|f| format!("- {} (Source: {})", f.fact, f.source_url))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "**Topic**: {}\n\n**Key Findings**:\n{findings}\n\n\
         **Task**: Write a research summary of roughly 300-500 words that gives an overview of the topic, \
         highlights key insights from all sources, identifies relationships between findings and \
         concludes with significant implications.",
        record.topic
    )
}
