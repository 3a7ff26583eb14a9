//! End-to-end `write` pipeline: topic → research → blog, with banner and tags alongside.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use postcraft_providers::{BannerSource, TextGenerator, WebSearch};
use postcraft_research::DEDUP_THRESHOLD;
use postcraft_shared::{BlogState, ResearchRecord, Result, RunId, StageFailure};

use crate::analysis::ResearchAnalyst;
use crate::assets::{generate_image_keyword, generate_tags};
use crate::writer::BlogWriter;

/// Configuration for the `write_post` pipeline.
#[derive(Debug, Clone)]
pub struct PostConfig {
    /// Topic to research and write about.
    pub topic: String,
    /// The user's own research notes, unstructured.
    pub notes: Option<String>,
    /// Similarity at or above which two findings count as one.
    pub dedup_threshold: f64,
}

impl PostConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            notes: None,
            dedup_threshold: DEDUP_THRESHOLD,
        }
    }
}

/// The remote capabilities a run talks to, one generator per role.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Research, notes structuring and summaries.
    pub researcher: &'a dyn TextGenerator,
    /// Outline, draft, polish and edits.
    pub writer: &'a dyn TextGenerator,
    /// Image keyword and tags.
    pub assistant: &'a dyn TextGenerator,
    pub search: &'a dyn WebSearch,
    pub banners: &'a dyn BannerSource,
}

/// Everything one run produced.
#[derive(Debug)]
pub struct PostRun {
    pub run_id: RunId,
    pub topic: String,
    pub research: std::result::Result<ResearchRecord, StageFailure>,
    /// `None` when research failed and writing never started.
    pub blog: Option<std::result::Result<BlogState, StageFailure>>,
    pub image_keyword: Option<String>,
    /// Comma-joined tags.
    pub tags: Option<String>,
    pub banner_path: PathBuf,
    pub elapsed: Duration,
}

impl PostRun {
    /// The finished post, if writing succeeded.
    pub fn blog_state(&self) -> Option<&BlogState> {
        self.blog.as_ref().and_then(|blog| blog.as_ref().ok())
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, run: &PostRun);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _run: &PostRun) {}
}

/// Run the full `write` pipeline.
///
/// Research then writing runs as one sequential chain. Image keyword with
/// banner fetch, and tag generation, run concurrently with it. Stage
/// failures are reported inside [`PostRun`]; keyword and tag failures are
/// logged and leave their fields empty.
#[instrument(skip_all, fields(topic = %config.topic))]
pub async fn write_post(
    config: &PostConfig,
    collaborators: Collaborators<'_>,
    progress: &dyn ProgressReporter,
) -> Result<PostRun> {
    let start = Instant::now();
    let run_id = RunId::new();
    let topic = config.topic.as_str();

    info!(%run_id, "starting write pipeline");

    let content = async {
        progress.phase("Researching");
        let analyst = ResearchAnalyst::new(
            collaborators.researcher,
            collaborators.search,
            config.dedup_threshold,
        );
        let research = analyst
            .analyse_research(topic, config.notes.as_deref())
            .await;

        let blog = match &research {
            Ok(record) => {
                progress.phase("Writing");
                Some(BlogWriter::new(collaborators.writer).write_blog(record).await)
            }
            Err(failure) => {
                warn!(error = %failure, "research failed, skipping blog writing");
                None
            }
        };

        (research, blog)
    };

    let banner = async {
        progress.phase("Choosing banner");
        let keyword = match generate_image_keyword(collaborators.assistant, topic).await {
            Ok(keyword) => Some(keyword),
            Err(e) => {
                warn!(error = %e, "image keyword generation failed, searching by topic");
                None
            }
        };
        let path = collaborators
            .banners
            .fetch_banner(keyword.as_deref().unwrap_or(topic))
            .await;
        (keyword, path)
    };

    let tags = async {
        progress.phase("Generating tags");
        match generate_tags(collaborators.assistant, topic).await {
            Ok(tags) => Some(tags),
            Err(e) => {
                warn!(error = %e, "tag generation failed");
                None
            }
        }
    };

    let ((research, blog), (image_keyword, banner_path), tags) =
        tokio::join!(content, banner, tags);

    let run = PostRun {
        run_id,
        topic: topic.to_string(),
        research,
        blog,
        image_keyword,
        tags,
        banner_path,
        elapsed: start.elapsed(),
    };

    info!(
        research_ok = run.research.is_ok(),
        blog_ok = run.blog_state().is_some(),
        elapsed_ms = run.elapsed.as_millis() as u64,
        "write pipeline complete"
    );

    progress.done(&run);
    Ok(run)
}
