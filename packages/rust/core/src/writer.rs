//! Staged blog writing (outline, draft, polish) and edit application.

use tracing::{error, info, instrument, warn};

use postcraft_markdown::normalize_generated_markdown;
use postcraft_providers::TextGenerator;
use postcraft_shared::{BlogState, Finding, ResearchRecord, Stage, StageFailure};

/// Findings fed to the outline stage.
const OUTLINE_FINDINGS: usize = 5;

/// Summary characters fed to the draft stage.
const DRAFT_SUMMARY_CHARS: usize = 300;

/// Post characters sent along with an edit request.
const EDIT_CONTEXT_CHARS: usize = 3000;

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

const ARCHITECT_INSTRUCTIONS: &[&str] = &[
    "You are a content architect who designs blog structure.",
    "Create comprehensive blog outlines from research data.",
    "Structure: Title, Introduction, 3-5 main sections with subheadings, Conclusion.",
    "For each section include 2-3 key points to cover.",
    "Output ONLY a markdown-formatted outline.",
];

const WRITER_INSTRUCTIONS: &[&str] = &[
    "You are a technical writer drafting blog content from an outline.",
    "Use nested bullet points for complex ideas and Markdown tables for comparisons.",
    "Add blockquotes for important insights and section dividers (---) between major sections.",
    "Use bold and italic for key terms and build hierarchy with H2/H3 headers.",
    "Use emojis sparingly for visual breaks.",
    "Open with an engaging hook and close with a call to action.",
    "Output ONLY markdown content.",
];

const EDITOR_INSTRUCTIONS: &[&str] = &[
    "You are a technical editor polishing blog content for dev.to.",
    "Ensure proper markdown formatting: headers, emphasis, blockquotes, inline code and fenced code blocks.",
    "Never output a literal \\n; use real line breaks.",
    "Add citations using [^1] notation and a references section at the end.",
    "Polish technical accuracy, grammar and flow.",
    "Preserve emojis exactly as written and do not escape them.",
    "Output ONLY the final markdown without any confirmation text.",
];

// ---------------------------------------------------------------------------
// BlogWriter
// ---------------------------------------------------------------------------

/// Turns a research record into a finished post, one stage at a time.
pub struct BlogWriter<'a> {
    generator: &'a dyn TextGenerator,
}

impl<'a> BlogWriter<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self { generator }
    }

    /// Outline, draft and polish, then normalize the result.
    ///
    /// The first failing stage ends the run; later stages are not invoked.
    #[instrument(skip_all, fields(topic = %research.topic))]
    pub async fn write_blog(&self, research: &ResearchRecord) -> Result<BlogState, StageFailure> {
        let outline = self
            .run_stage(Stage::Outline, &outline_prompt(research), ARCHITECT_INSTRUCTIONS)
            .await?;
        let draft = self
            .run_stage(Stage::Draft, &draft_prompt(research, &outline), WRITER_INSTRUCTIONS)
            .await?;
        let polished = self
            .run_stage(Stage::Polish, &polish_prompt(research, &draft), EDITOR_INSTRUCTIONS)
            .await?;

        let final_markdown = normalize_generated_markdown(&polished);
        info!(len = final_markdown.len(), "blog post complete");

        Ok(BlogState::new(research.topic.clone(), final_markdown))
    }

    /// Apply user-requested changes to a finished post.
    ///
    /// On failure the previous content is kept and `error` is set.
    #[instrument(skip_all, fields(topic = %state.research_topic))]
    pub async fn apply_edits(&self, mut state: BlogState, instructions: &str) -> BlogState {
        let prompt = edit_prompt(&state.final_markdown, instructions);

        match self.generator.generate(&prompt, EDITOR_INSTRUCTIONS).await {
            Ok(reply) => {
                state.final_markdown = normalize_generated_markdown(reply.trim());
                state.user_edits = Some(instructions.to_string());
                state.error = None;
                info!(len = state.final_markdown.len(), "edits applied");
            }
            Err(e) => {
                warn!(error = %e, "edit failed, keeping previous content");
                state.error = Some(format!("Edit failed: {e}"));
            }
        }

        state
    }

    async fn run_stage(
        &self,
        stage: Stage,
        prompt: &str,
        instructions: &[&str],
    ) -> Result<String, StageFailure> {
        info!(%stage, "running writing stage");

        match self.generator.generate(prompt, instructions).await {
            Ok(reply) => Ok(reply.trim().to_string()),
            Err(e) => {
                error!(%stage, error = %e, "writing stage failed");
                Err(StageFailure::new(stage, format!("Blog creation failed: {e}")))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

fn outline_prompt(research: &ResearchRecord) -> String {
    let findings = research
        .key_findings
        .iter()
        .take(OUTLINE_FINDINGS)
        .map(|f| format!("- {}", f.fact))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "**Research Topic**: {}\n\n**Key Findings**:\n{findings}\n\n\
         **Task**: Create a detailed blog outline with section key points.",
        research.topic
    )
}

fn draft_prompt(research: &ResearchRecord, outline: &str) -> String {
    format!(
        "**Topic**: {}\n\n**Outline**:\n{outline}\n\n**Research Summary**:\n{}\n\n\
         **Task**: Write full blog content based on the outline.",
        research.topic,
        truncate_chars(&research.summary, DRAFT_SUMMARY_CHARS)
    )
}

fn polish_prompt(research: &ResearchRecord, draft: &str) -> String {
    format!(
        "**Blog Content**:\n{draft}\n\n**Research Sources**:\n{}\n\n\
         **Task**:\n\
         - Add citations where needed using [^number] notation\n\
         - Create a references section at the end\n\
         - Polish grammar and flow\n\
         - Output ONLY the final markdown content",
        source_list(&research.key_findings)
    )
}

fn edit_prompt(current: &str, instructions: &str) -> String {
    format!(
        "**Current Blog**:\n{}\n\n**Requested Changes**:\n{instructions}\n\n\
         **Task**: Implement the changes while preserving:\n\
         - Technical accuracy\n\
         - Citation format\n\
         - Professional tone\n\
         - Output ONLY the modified markdown",
        truncate_chars(current, EDIT_CONTEXT_CHARS)
    )
}

/// Unique source URLs in first-seen order, as `- url` bullets.
fn source_list(findings: &[Finding]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for finding in findings {
        if !seen.contains(&finding.source_url.as_str()) {
            seen.push(&finding.source_url);
        }
    }

    seen.iter()
        .map(|url| format!("- {url}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}
