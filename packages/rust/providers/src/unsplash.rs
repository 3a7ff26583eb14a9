//! Banner images from Unsplash.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use postcraft_shared::{ImagesConfig, PostcraftError, Result};

use crate::{BannerSource, DEFAULT_TIMEOUT_SECS, build_client, endpoint};

/// Fetches a random landscape photo per keyword and stores it locally.
#[derive(Clone)]
pub struct UnsplashClient {
    client: Client,
    base_url: String,
    access_key: Option<String>,
    output_dir: PathBuf,
    default_banner: PathBuf,
}

impl std::fmt::Debug for UnsplashClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsplashClient")
            .field("base_url", &self.base_url)
            .field("has_access_key", &self.access_key.is_some())
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl UnsplashClient {
    pub fn new(config: &ImagesConfig, access_key: Option<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT_SECS)?,
            base_url: config.base_url.clone(),
            access_key,
            output_dir: PathBuf::from(&config.output_dir),
            default_banner: PathBuf::from(&config.default_banner),
        })
    }

    /// Path returned whenever a fetch fails.
    pub fn default_banner(&self) -> &Path {
        &self.default_banner
    }

    async fn try_fetch(&self, keyword: &str) -> Result<PathBuf> {
        let access_key = self
            .access_key
            .as_deref()
            .ok_or_else(|| PostcraftError::config("Unsplash access key not configured"))?;

        let url = endpoint(&self.base_url, "photos/random");
        let response = self
            .client
            .get(&url)
            .query(&[("query", keyword), ("orientation", "landscape")])
            .header("Accept-Version", "v1")
            .header("Authorization", format!("Client-ID {access_key}"))
            .send()
            .await
            .map_err(|e| PostcraftError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PostcraftError::Upstream(format!(
                "Unsplash search failed: HTTP {status}"
            )));
        }

        let photo: Value = response
            .json()
            .await
            .map_err(|e| PostcraftError::parse(format!("invalid Unsplash response: {e}")))?;
        let image_url = photo["urls"]["regular"]
            .as_str()
            .ok_or_else(|| PostcraftError::Upstream("Unsplash photo has no image URL".into()))?;
        let author = photo["user"]["name"].as_str().unwrap_or("unknown");

        let image = self
            .client
            .get(image_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PostcraftError::Network(format!("{image_url}: {e}")))?
            .bytes()
            .await
            .map_err(|e| PostcraftError::Network(format!("image body read failed: {e}")))?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| PostcraftError::io(&self.output_dir, e))?;

        let path = self.output_dir.join(banner_file_name(keyword, &image));
        tokio::fs::write(&path, &image)
            .await
            .map_err(|e| PostcraftError::io(&path, e))?;

        info!(path = %path.display(), %author, "banner saved");
        Ok(path)
    }
}

#[async_trait]
impl BannerSource for UnsplashClient {
    #[instrument(skip_all, fields(keyword = %keyword))]
    async fn fetch_banner(&self, keyword: &str) -> PathBuf {
        match self.try_fetch(keyword).await {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, default = %self.default_banner.display(), "banner fetch failed, using default");
                self.default_banner.clone()
            }
        }
    }
}

/// `<slug>-<hash8>.jpg`, hashed over the image bytes.
fn banner_file_name(keyword: &str, image: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image);
    let digest = format!("{:x}", hasher.finalize());
    format!("{}-{}.jpg", slugify(keyword), &digest[..8])
}

fn slugify(keyword: &str) -> String {
    let slug = keyword
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "banner".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, dir: &Path) -> ImagesConfig {
        ImagesConfig {
            base_url: server.uri(),
            output_dir: dir.join("images").display().to_string(),
            default_banner: "assets/default_banner.png".into(),
            ..ImagesConfig::default()
        }
    }

    #[test]
    fn slugify_keywords() {
        assert_eq!(slugify("Rust Async!"), "rust-async");
        assert_eq!(slugify("  C++ / WASM  "), "c-wasm");
        assert_eq!(slugify("***"), "banner");
    }

    #[test]
    fn banner_file_name_shape() {
        let name = banner_file_name("Rust", b"jpeg bytes");
        assert!(name.starts_with("rust-"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), "rust-".len() + 8 + ".jpg".len());
    }

    #[tokio::test]
    async fn fetch_banner_saves_image() {
        let server = MockServer::start().await;
        let tmp = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/photos/random"))
            .and(query_param("query", "ferris crab"))
            .and(query_param("orientation", "landscape"))
            .and(header("Accept-Version", "v1"))
            .and(header("Authorization", "Client-ID test-access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "urls": {"regular": format!("{}/img/photo.jpg", server.uri())},
                "user": {"name": "Ferris"}
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/img/photo.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-jpeg".to_vec()))
            .mount(&server)
            .await;

        let client =
            UnsplashClient::new(&config_for(&server, tmp.path()), Some("test-access".into()))
                .unwrap();
        let saved = client.fetch_banner("ferris crab").await;

        assert_ne!(saved, client.default_banner());
        assert!(saved.starts_with(tmp.path()));
        assert_eq!(std::fs::read(&saved).unwrap(), b"fake-jpeg");
    }

    #[tokio::test]
    async fn missing_key_returns_default_without_request() {
        let server = MockServer::start().await;
        let tmp = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = UnsplashClient::new(&config_for(&server, tmp.path()), None).unwrap();
        let saved = client.fetch_banner("rust").await;
        assert_eq!(saved, PathBuf::from("assets/default_banner.png"));
    }

    #[tokio::test]
    async fn upstream_failure_returns_default() {
        let server = MockServer::start().await;
        let tmp = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/photos/random"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Rate Limit Exceeded"))
            .mount(&server)
            .await;

        let client =
            UnsplashClient::new(&config_for(&server, tmp.path()), Some("k".into())).unwrap();
        let saved = client.fetch_banner("rust").await;
        assert_eq!(saved, client.default_banner());
    }
}
