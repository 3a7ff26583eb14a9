//! Core domain types for Postcraft research and blog runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the run manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

/// How much a finding's source can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Credibility {
    High,
    #[default]
    Medium,
    Low,
    #[serde(rename = "User Provided")]
    UserProvided,
}

impl Credibility {
    /// Display label, as it appears in generator output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::UserProvided => "User Provided",
        }
    }

    /// Map a free-form label onto a credibility level.
    ///
    /// Unknown labels map to [`Credibility::Medium`].
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "high" => Self::High,
            "medium" | "med" | "moderate" => Self::Medium,
            "low" => Self::Low,
            "user" | "user provided" => Self::UserProvided,
            _ => Self::Medium,
        }
    }
}

impl std::fmt::Display for Credibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single fact with its evidence and provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// The claim itself.
    pub fact: String,
    /// Brief supporting details.
    pub supporting_evidence: String,
    /// Where the claim came from.
    pub source_url: String,
    /// Trust level of the source.
    pub source_credibility: Credibility,
}

/// Input volume per provenance, counted before deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub user: usize,
    pub auto: usize,
}

// ---------------------------------------------------------------------------
// ResearchRecord / ResearchFailure
// ---------------------------------------------------------------------------

/// Structured research for one topic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResearchRecord {
    /// Research topic.
    #[serde(default)]
    pub topic: String,
    /// Findings in priority order, near-duplicates removed once merged.
    #[serde(default)]
    pub key_findings: Vec<Finding>,
    /// Prose summary; empty until the summary step runs.
    #[serde(default)]
    pub summary: String,
    /// Provenance counts, present only on merged records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<SourceCounts>,
}

impl ResearchRecord {
    /// An empty record for `topic`.
    pub fn empty(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }
}

/// Explicit error record returned in place of a [`ResearchRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchFailure {
    /// What went wrong.
    pub error: String,
    /// Topic being researched, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Bounded excerpt of the generator output that failed to parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl ResearchFailure {
    /// A failure with only a message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            topic: None,
            raw_output: None,
        }
    }

    /// Attach the topic being researched.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

impl std::fmt::Display for ResearchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error)
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// A pipeline stage that can fail on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Research,
    Outline,
    Draft,
    Polish,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Outline => "outline",
            Self::Draft => "draft",
            Self::Polish => "polish",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage that failed, returned instead of a partial result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: String,
}

impl StageFailure {
    pub fn new(stage: Stage, error: impl Into<String>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.error)
    }
}

// ---------------------------------------------------------------------------
// BlogState / Reference
// ---------------------------------------------------------------------------

/// A finished blog post and its edit history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogState {
    /// Topic of the research the post was written from.
    pub research_topic: String,
    /// Final markdown.
    #[serde(rename = "final")]
    pub final_markdown: String,
    /// Instructions of the last applied edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_edits: Option<String>,
    /// Error of the last failed edit; `final_markdown` is the last good content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BlogState {
    pub fn new(research_topic: impl Into<String>, final_markdown: impl Into<String>) -> Self {
        Self {
            research_topic: research_topic.into(),
            final_markdown: final_markdown.into(),
            user_edits: None,
            error: None,
        }
    }
}

/// A footnote reference extracted from blog markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Footnote number, as written (`1` for `[^1]`).
    pub id: String,
    /// Reference text with URLs removed.
    pub text: String,
    /// First URL found in the reference, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl Reference {
    /// Heuristic trust level from the reference's URL and text.
    pub fn credibility(&self) -> Credibility {
        const HIGH_MARKERS: [&str; 4] = [".edu", ".gov", "academic", "research"];
        const LOW_MARKERS: [&str; 3] = ["blog", "medium.com", "wordpress"];

        if self.text.contains(Credibility::UserProvided.as_str()) {
            return Credibility::UserProvided;
        }

        let url = self
            .source_url
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();

        if HIGH_MARKERS.iter().any(|m| url.contains(m)) {
            Credibility::High
        } else if LOW_MARKERS.iter().any(|m| url.contains(m)) {
            Credibility::Low
        } else {
            Credibility::Medium
        }
    }
}

// ---------------------------------------------------------------------------
// RunManifest
// ---------------------------------------------------------------------------

/// The `manifest.json` structure stored at the root of each run directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Unique identifier for this run.
    pub id: RunId,
    /// Topic the run was started with.
    pub topic: String,
    /// Tool version that created this run.
    pub tool_version: String,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// When the run directory was last written.
    pub updated_at: DateTime<Utc>,
    /// Keyword used for the banner search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_keyword: Option<String>,
    /// Comma-separated tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    /// Local banner image path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_path: Option<String>,
    /// Whether research produced a record.
    pub research_ok: bool,
    /// Whether a blog post was produced.
    pub blog_ok: bool,
    /// Publication path returned by the publishing service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_path: Option<String>,
}
