//! Clients for the remote capabilities Postcraft depends on.
//!
//! - [`TextGenerator`]: prompt + instructions in, text out ([`OpenRouterClient`])
//! - [`WebSearch`]: query in, result documents out ([`DuckDuckGoSearch`])
//! - [`BannerSource`]: keyword in, local image path out ([`UnsplashClient`])
//! - [`DevToClient`]: article publishing
//!
//! Pipeline code depends on the traits only, so tests can script replies.

pub mod devto;
pub mod openrouter;
pub mod search;
pub mod unsplash;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use postcraft_shared::{PostcraftError, Result};

pub use devto::{DevToClient, PublishRequest, Published};
pub use openrouter::OpenRouterClient;
pub use search::DuckDuckGoSearch;
pub use unsplash::UnsplashClient;

/// User-Agent string for all outgoing requests.
pub(crate) const USER_AGENT: &str = concat!("Postcraft/", env!("CARGO_PKG_VERSION"));

/// Timeout for requests other than text generation.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// A text generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply to `prompt`, steered by the `instructions` lines.
    async fn generate(&self, prompt: &str, instructions: &[&str]) -> Result<String>;
}

/// A web search capability.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Search the web for `query`.
    async fn search(&self, query: &str) -> Result<Vec<SearchDocument>>;
}

/// A banner image source.
#[async_trait]
pub trait BannerSource: Send + Sync {
    /// Fetch a banner for `keyword`. Falls back to a default asset instead of failing.
    async fn fetch_banner(&self, keyword: &str) -> PathBuf;
}

/// One web search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

// ---------------------------------------------------------------------------
// Shared HTTP helpers
// ---------------------------------------------------------------------------

pub(crate) fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PostcraftError::Network(format!("failed to build HTTP client: {e}")))
}

/// Join a base URL and a path without doubling the slash.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
