//! Article publishing to dev.to, with optional banner hosting on imgbb.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, instrument, warn};

use postcraft_markdown::clean_tag;
use postcraft_shared::{Credentials, PostcraftError, PublishingConfig, Result};

use crate::{DEFAULT_TIMEOUT_SECS, build_client, endpoint};

/// Maximum number of tags dev.to accepts per article.
pub const MAX_TAGS: usize = 4;

/// Title used when the research topic is empty.
const FALLBACK_TITLE: &str = "AI Blog";

/// What to publish.
#[derive(Debug, Clone, Default)]
pub struct PublishRequest {
    /// Research topic, used as the article title.
    pub topic: String,
    pub body_markdown: String,
    /// Raw tags; cleaned and capped before sending.
    pub tags: Vec<String>,
    /// Local banner to upload as the main image.
    pub banner_path: Option<PathBuf>,
    /// Publish immediately instead of saving a draft.
    pub published: bool,
    /// Overrides the configured API key.
    pub api_key: Option<String>,
}

/// Location of a created article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Published {
    pub path: String,
    pub url: String,
}

/// Client for the dev.to articles API.
#[derive(Clone)]
pub struct DevToClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    image_host_url: String,
    image_host_key: Option<String>,
}

impl std::fmt::Debug for DevToClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevToClient")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("has_image_host_key", &self.image_host_key.is_some())
            .finish_non_exhaustive()
    }
}

impl DevToClient {
    pub fn new(config: &PublishingConfig, credentials: &Credentials) -> Result<Self> {
        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT_SECS)?,
            base_url: config.base_url.clone(),
            api_key: credentials.devto_api_key.clone(),
            image_host_url: config.image_host_url.clone(),
            image_host_key: credentials.image_host_key.clone(),
        })
    }

    /// Create an article. Drafts unless `request.published` is set.
    ///
    /// Fails with a config error before any request when no API key is
    /// available. A banner that cannot be hosted is left out.
    #[instrument(skip_all, fields(topic = %request.topic, published = request.published))]
    pub async fn publish(&self, request: &PublishRequest) -> Result<Published> {
        let api_key = request
            .api_key
            .as_deref()
            .or(self.api_key.as_deref())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PostcraftError::config("API key is required for publishing"))?;

        let main_image = match &request.banner_path {
            Some(path) => self.upload_banner(path).await,
            None => None,
        };

        let title = match request.topic.trim() {
            "" => FALLBACK_TITLE,
            topic => topic,
        };
        let tags = publish_tags(&request.tags);

        let body = json!({
            "article": {
                "title": title,
                "body_markdown": request.body_markdown.trim(),
                "published": request.published,
                "tags": tags,
                "main_image": main_image,
            }
        });

        let url = endpoint(&self.base_url, "articles");
        let response = self
            .client
            .post(&url)
            .header("api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PostcraftError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let text = response.text().await.unwrap_or_default();
            error!(%status, "publish request failed");
            return Err(PostcraftError::Upstream(format!(
                "Failed to publish to dev.to: {status} - {text}"
            )));
        }

        let published: Published = response
            .json()
            .await
            .map_err(|e| PostcraftError::parse(format!("invalid dev.to response: {e}")))?;

        info!(path = %published.path, url = %published.url, "article created");
        Ok(published)
    }

    /// Upload the banner to the image host; `None` when skipped or failed.
    async fn upload_banner(&self, path: &Path) -> Option<String> {
        let Some(key) = self.image_host_key.as_deref() else {
            warn!("image host key not configured, publishing without banner");
            return None;
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "banner not readable, publishing without it");
                return None;
            }
        };

        let encoded = BASE64.encode(&bytes);
        let response = self
            .client
            .post(&self.image_host_url)
            .query(&[("key", key)])
            .form(&[("image", encoded.as_str())])
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(status = %r.status(), "banner upload rejected");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "banner upload failed");
                return None;
            }
        };

        match response.json::<Value>().await {
            Ok(data) => data["data"]["url"].as_str().map(str::to_string),
            Err(e) => {
                warn!(error = %e, "banner upload returned invalid JSON");
                None
            }
        }
    }
}

/// Clean, de-empty and cap tags for the articles API.
fn publish_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| clean_tag(tag.trim()))
        .filter(|tag| !tag.is_empty())
        .take(MAX_TAGS)
        .collect()
}
