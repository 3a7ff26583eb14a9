//! In-memory capability fakes for pipeline tests.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use postcraft_providers::{BannerSource, SearchDocument, TextGenerator, WebSearch};
use postcraft_shared::{PostcraftError, Result};

/// Replies with scripted results in order and records every prompt.
pub(crate) struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub(crate) fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A generator whose every scripted reply succeeds.
    pub(crate) fn replying(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _instructions: &[&str]) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PostcraftError::Upstream("no scripted reply left".into())))
    }
}

/// Search that returns fixed documents, or fails.
pub(crate) struct FixedSearch {
    pub(crate) documents: Option<Vec<SearchDocument>>,
}

impl FixedSearch {
    pub(crate) fn with_documents() -> Self {
        Self {
            documents: Some(vec![SearchDocument {
                title: "Rust Programming Language".into(),
                url: "https://www.rust-lang.org/".into(),
                snippet: "A language empowering everyone.".into(),
            }]),
        }
    }

    pub(crate) fn failing() -> Self {
        Self { documents: None }
    }
}

#[async_trait]
impl WebSearch for FixedSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchDocument>> {
        self.documents
            .clone()
            .ok_or_else(|| PostcraftError::Network("search unreachable".into()))
    }
}

/// Banner source that records the keyword and returns a fixed path.
pub(crate) struct FixedBanner {
    pub(crate) keywords: Mutex<Vec<String>>,
}

impl FixedBanner {
    pub(crate) fn new() -> Self {
        Self {
            keywords: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BannerSource for FixedBanner {
    async fn fetch_banner(&self, keyword: &str) -> PathBuf {
        self.keywords.lock().unwrap().push(keyword.to_string());
        PathBuf::from(format!("outputs/images/{keyword}.jpg"))
    }
}

/// A generator reply in the research JSON contract.
pub(crate) fn research_json(topic: &str, facts: &[(&str, &str)]) -> String {
    let findings: Vec<_> = facts
        .iter()
        .map(|(fact, url)| {
            serde_json::json!({
                "fact": fact,
                "supporting_evidence": "evidence",
                "source_url": url,
                "source_credibility": "High",
            })
        })
        .collect();

    serde_json::json!({"topic": topic, "key_findings": findings, "summary": "s"}).to_string()
}
