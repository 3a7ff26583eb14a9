//! Run directory writer and reader.
//!
//! Layout:
//! ```text
//! <output_root>/<run_id>/
//! ├── manifest.json
//! ├── research.json   (research record, or the failure)
//! ├── blog.json       (blog state, or the failure; absent if writing never ran)
//! └── post.md         (final markdown, when a post exists)
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use postcraft_shared::{
    BlogState, CURRENT_SCHEMA_VERSION, PostcraftError, ResearchRecord, Result, RunManifest,
    StageFailure,
};

use crate::pipeline::PostRun;

const MANIFEST_FILE: &str = "manifest.json";
const RESEARCH_FILE: &str = "research.json";
const BLOG_FILE: &str = "blog.json";
const POST_FILE: &str = "post.md";

/// Stage output as stored on disk: the value, or why it is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Stored<T> {
    // Tried first: a value never carries a `stage` key.
    Failed(StageFailure),
    Done(T),
}

impl<T> From<Stored<T>> for std::result::Result<T, StageFailure> {
    fn from(stored: Stored<T>) -> Self {
        match stored {
            Stored::Done(value) => Ok(value),
            Stored::Failed(failure) => Err(failure),
        }
    }
}

impl<T: Clone> From<&std::result::Result<T, StageFailure>> for Stored<T> {
    fn from(result: &std::result::Result<T, StageFailure>) -> Self {
        match result {
            Ok(value) => Stored::Done(value.clone()),
            Err(failure) => Stored::Failed(failure.clone()),
        }
    }
}

/// A run directory read back from disk.
#[derive(Debug)]
pub struct LoadedRun {
    pub dir: PathBuf,
    pub manifest: RunManifest,
    pub research: std::result::Result<ResearchRecord, StageFailure>,
    pub blog: Option<std::result::Result<BlogState, StageFailure>>,
}

impl LoadedRun {
    /// The finished post, or a validation error explaining why there is none.
    pub fn require_blog(&self) -> Result<&BlogState> {
        match &self.blog {
            Some(Ok(state)) => Ok(state),
            Some(Err(failure)) => Err(PostcraftError::validation(format!(
                "run {} has no post: {failure}",
                self.manifest.id
            ))),
            None => Err(PostcraftError::validation(format!(
                "run {} has no post: writing never ran",
                self.manifest.id
            ))),
        }
    }

    /// Tags from the manifest, split and trimmed.
    pub fn tags(&self) -> Vec<String> {
        self.manifest
            .tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(String::from)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

/// Write a run to `<output_root>/<run_id>/` and return that directory.
#[instrument(skip_all, fields(run_id = %run.run_id))]
pub fn write_run(output_root: &Path, run: &PostRun) -> Result<PathBuf> {
    let dir = output_root.join(run.run_id.to_string());
    std::fs::create_dir_all(&dir).map_err(|e| PostcraftError::io(&dir, e))?;

    info!(path = %dir.display(), "writing run directory");

    let manifest = build_manifest(run);
    write_json(&dir.join(MANIFEST_FILE), &manifest)?;
    write_json(&dir.join(RESEARCH_FILE), &Stored::from(&run.research))?;

    if let Some(blog) = &run.blog {
        write_json(&dir.join(BLOG_FILE), &Stored::from(blog))?;
    }
    if let Some(state) = run.blog_state() {
        write_text(&dir.join(POST_FILE), &state.final_markdown)?;
    }

    info!(path = %dir.display(), blog_ok = manifest.blog_ok, "run directory written");
    Ok(dir)
}

/// Replace the stored post after an edit.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn save_blog(dir: &Path, state: &BlogState) -> Result<()> {
    write_json(&dir.join(BLOG_FILE), &Stored::Done(state.clone()))?;
    write_text(&dir.join(POST_FILE), &state.final_markdown)?;
    update_manifest(dir, |manifest| manifest.blog_ok = true)
}

/// Record where the post was published.
pub fn record_publication(dir: &Path, published_path: &str) -> Result<()> {
    update_manifest(dir, |manifest| {
        manifest.published_path = Some(published_path.to_string());
    })
}

/// Record a newly fetched banner.
pub fn record_banner(dir: &Path, keyword: Option<&str>, banner_path: &Path) -> Result<()> {
    update_manifest(dir, |manifest| {
        if let Some(keyword) = keyword {
            manifest.image_keyword = Some(keyword.to_string());
        }
        manifest.banner_path = Some(banner_path.display().to_string());
    })
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// Read a run directory written by [`write_run`].
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_run(dir: &Path) -> Result<LoadedRun> {
    let manifest: RunManifest = read_json(&dir.join(MANIFEST_FILE))?;
    if manifest.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(PostcraftError::validation(format!(
            "run schema version {} is newer than supported version {CURRENT_SCHEMA_VERSION}",
            manifest.schema_version
        )));
    }

    let research: Stored<ResearchRecord> = read_json(&dir.join(RESEARCH_FILE))?;

    let blog_path = dir.join(BLOG_FILE);
    let blog = if blog_path.exists() {
        let stored: Stored<BlogState> = read_json(&blog_path)?;
        Some(stored.into())
    } else {
        None
    };

    debug!(run_id = %manifest.id, "run loaded");
    Ok(LoadedRun {
        dir: dir.to_path_buf(),
        manifest,
        research: research.into(),
        blog,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_manifest(run: &PostRun) -> RunManifest {
    let now = Utc::now();
    RunManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        id: run.run_id.clone(),
        topic: run.topic.clone(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        created_at: now,
        updated_at: now,
        image_keyword: run.image_keyword.clone(),
        tags: run.tags.clone(),
        banner_path: Some(run.banner_path.display().to_string()),
        research_ok: run.research.is_ok(),
        blog_ok: run.blog_state().is_some(),
        published_path: None,
    }
}

fn update_manifest(dir: &Path, apply: impl FnOnce(&mut RunManifest)) -> Result<()> {
    let path = dir.join(MANIFEST_FILE);
    let mut manifest: RunManifest = read_json(&path)?;
    apply(&mut manifest);
    manifest.updated_at = Utc::now();
    write_json(&path, &manifest)?;
    debug!("manifest updated");
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| PostcraftError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        PostcraftError::validation(format!("invalid {}: {e}", path.display()))
    })
}

/// Write a JSON file (pretty-printed).
fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(|e| {
        PostcraftError::validation(format!("JSON serialization failed: {e}"))
    })?;
    write_text(path, &json)
}

/// Write through a temp file and rename, so readers never see half a file.
fn write_text(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| PostcraftError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| PostcraftError::io(path, e))?;

    debug!(path = %path.display(), size = content.len(), "wrote file");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use postcraft_shared::{Credibility, Finding, RunId, SourceCounts, Stage};

    fn research() -> ResearchRecord {
        ResearchRecord {
            topic: "Rust".into(),
            key_findings: vec![Finding {
                fact: "Rust has no GC".into(),
                supporting_evidence: "docs".into(),
                source_url: "https://www.rust-lang.org/".into(),
                source_credibility: Credibility::High,
            }],
            summary: "Summary.".into(),
            sources: Some(SourceCounts { user: 0, auto: 1 }),
        }
    }

    fn run_with(
        research: std::result::Result<ResearchRecord, StageFailure>,
        blog: Option<std::result::Result<BlogState, StageFailure>>,
    ) -> PostRun {
        PostRun {
            run_id: RunId::new(),
            topic: "Rust".into(),
            research,
            blog,
            image_keyword: Some("rust".into()),
            tags: Some("rust, systems ,".into()),
            banner_path: PathBuf::from("outputs/images/rust-1234abcd.jpg"),
            elapsed: Duration::from_secs(3),
        }
    }

    #[test]
    fn write_and_load_successful_run() {
        let tmp = tempfile::tempdir().unwrap();
        let run = run_with(Ok(research()), Some(Ok(BlogState::new("Rust", "# Rust\n"))));

        let dir = write_run(tmp.path(), &run).unwrap();
        assert_eq!(dir, tmp.path().join(run.run_id.to_string()));
        assert_eq!(std::fs::read_to_string(dir.join(POST_FILE)).unwrap(), "# Rust\n");

        let loaded = load_run(&dir).unwrap();
        assert_eq!(loaded.manifest.id, run.run_id);
        assert!(loaded.manifest.research_ok);
        assert!(loaded.manifest.blog_ok);
        assert_eq!(loaded.research.as_ref().unwrap(), &research());
        assert_eq!(loaded.require_blog().unwrap().final_markdown, "# Rust\n");
        assert_eq!(loaded.tags(), vec!["rust", "systems"]);
    }

    #[test]
    fn failures_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let run = run_with(
            Ok(research()),
            Some(Err(StageFailure::new(Stage::Draft, "Blog creation failed: boom"))),
        );

        let dir = write_run(tmp.path(), &run).unwrap();
        assert!(!dir.join(POST_FILE).exists());

        let loaded = load_run(&dir).unwrap();
        assert!(!loaded.manifest.blog_ok);
        match &loaded.blog {
            Some(Err(failure)) => assert_eq!(failure.stage, Stage::Draft),
            other => panic!("expected stored failure, got {other:?}"),
        }
        assert!(loaded.require_blog().is_err());
    }

    #[test]
    fn research_failure_has_no_blog_file() {
        let tmp = tempfile::tempdir().unwrap();
        let run = run_with(
            Err(StageFailure::new(Stage::Research, "Research merge failed: x")),
            None,
        );

        let dir = write_run(tmp.path(), &run).unwrap();
        assert!(!dir.join(BLOG_FILE).exists());

        let loaded = load_run(&dir).unwrap();
        assert!(loaded.research.is_err());
        assert!(loaded.blog.is_none());
    }

    #[test]
    fn save_blog_updates_post_and_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let run = run_with(Ok(research()), Some(Ok(BlogState::new("Rust", "# Old"))));
        let dir = write_run(tmp.path(), &run).unwrap();

        let mut edited = BlogState::new("Rust", "# New");
        edited.user_edits = Some("rename".into());
        save_blog(&dir, &edited).unwrap();

        let loaded = load_run(&dir).unwrap();
        assert_eq!(loaded.require_blog().unwrap(), &edited);
        assert_eq!(std::fs::read_to_string(dir.join(POST_FILE)).unwrap(), "# New");
        assert!(loaded.manifest.updated_at >= loaded.manifest.created_at);
    }

    #[test]
    fn publication_and_banner_are_recorded() {
        let tmp = tempfile::tempdir().unwrap();
        let run = run_with(Ok(research()), Some(Ok(BlogState::new("Rust", "# Rust"))));
        let dir = write_run(tmp.path(), &run).unwrap();

        record_publication(&dir, "/someone/rust-1a2b").unwrap();
        record_banner(&dir, Some("crab"), Path::new("outputs/images/crab.jpg")).unwrap();

        let manifest = load_run(&dir).unwrap().manifest;
        assert_eq!(manifest.published_path.as_deref(), Some("/someone/rust-1a2b"));
        assert_eq!(manifest.image_keyword.as_deref(), Some("crab"));
        assert_eq!(manifest.banner_path.as_deref(), Some("outputs/images/crab.jpg"));
    }

    #[test]
    fn no_temp_files_left_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let run = run_with(Ok(research()), Some(Ok(BlogState::new("Rust", "# Rust"))));
        let dir = write_run(tmp.path(), &run).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_run(tmp.path()).unwrap_err();
        assert!(matches!(err, PostcraftError::Io { .. }));
    }
}
