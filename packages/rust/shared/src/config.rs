//! Application configuration for Postcraft.
//!
//! User config lives at `~/.postcraft/postcraft.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets are never stored in the file: each section names the
//! environment variable that holds its key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PostcraftError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "postcraft.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".postcraft";

// ---------------------------------------------------------------------------
// Config structs (matching postcraft.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenRouter (text generation) settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Research and deduplication settings.
    #[serde(default)]
    pub research: ResearchConfig,

    /// Banner image settings.
    #[serde(default)]
    pub images: ImagesConfig,

    /// Publishing settings.
    #[serde(default)]
    pub publishing: PublishingConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root directory for run output.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "outputs/runs".into()
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_openrouter_key_env")]
    pub api_key_env: String,

    /// API base URL (OpenAI-compatible).
    #[serde(default = "default_openrouter_base_url")]
    pub base_url: String,

    /// Model used when no role-specific override is set.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Model for web research, notes parsing, and summaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_model: Option<String>,

    /// Model for outline, draft, polish, and edits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer_model: Option<String>,

    /// Model for image keywords and tags.
    #[serde(default = "default_assist_model")]
    pub assist_model: String,

    /// Request timeout for generation calls.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl OpenRouterConfig {
    /// Resolved model for the research role.
    pub fn research_model(&self) -> &str {
        self.research_model.as_deref().unwrap_or(&self.default_model)
    }

    /// Resolved model for the writer role.
    pub fn writer_model(&self) -> &str {
        self.writer_model.as_deref().unwrap_or(&self.default_model)
    }
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openrouter_key_env(),
            base_url: default_openrouter_base_url(),
            default_model: default_model(),
            research_model: None,
            writer_model: None,
            assist_model: default_assist_model(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_openrouter_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_openrouter_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "google/gemini-2.0-flash-001".into()
}
fn default_assist_model() -> String {
    "google/gemini-2.0-flash-lite-001".into()
}
fn default_generation_timeout() -> u64 {
    120
}

/// `[research]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Fact-similarity ratio at or above which two findings are the same.
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f64,

    /// Maximum number of search documents fed to the research prompt.
    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,

    /// Web search endpoint (DuckDuckGo HTML results page).
    #[serde(default = "default_search_base_url")]
    pub search_base_url: String,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            dedup_threshold: default_dedup_threshold(),
            max_search_results: default_max_search_results(),
            search_base_url: default_search_base_url(),
        }
    }
}

fn default_dedup_threshold() -> f64 {
    0.8
}
fn default_max_search_results() -> usize {
    8
}
fn default_search_base_url() -> String {
    "https://html.duckduckgo.com/html/".into()
}

/// `[images]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Name of the env var holding the Unsplash access key.
    #[serde(default = "default_unsplash_key_env")]
    pub access_key_env: String,

    /// Unsplash API base URL.
    #[serde(default = "default_unsplash_base_url")]
    pub base_url: String,

    /// Directory fetched banners are written to.
    #[serde(default = "default_images_dir")]
    pub output_dir: String,

    /// Banner returned whenever a fetch fails.
    #[serde(default = "default_banner")]
    pub default_banner: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            access_key_env: default_unsplash_key_env(),
            base_url: default_unsplash_base_url(),
            output_dir: default_images_dir(),
            default_banner: default_banner(),
        }
    }
}

fn default_unsplash_key_env() -> String {
    "UNSPLASH_ACCESS_KEY".into()
}
fn default_unsplash_base_url() -> String {
    "https://api.unsplash.com".into()
}
fn default_images_dir() -> String {
    "outputs/images".into()
}
fn default_banner() -> String {
    "assets/default_banner.png".into()
}

/// `[publishing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishingConfig {
    /// Name of the env var holding the DEV.to API key.
    #[serde(default = "default_devto_key_env")]
    pub api_key_env: String,

    /// DEV.to API base URL.
    #[serde(default = "default_devto_base_url")]
    pub base_url: String,

    /// Name of the env var holding the imgbb key used for banner uploads.
    #[serde(default = "default_image_host_key_env")]
    pub image_host_key_env: String,

    /// imgbb upload endpoint.
    #[serde(default = "default_image_host_url")]
    pub image_host_url: String,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_devto_key_env(),
            base_url: default_devto_base_url(),
            image_host_key_env: default_image_host_key_env(),
            image_host_url: default_image_host_url(),
        }
    }
}

fn default_devto_key_env() -> String {
    "DEV_TO_API_KEY".into()
}
fn default_devto_base_url() -> String {
    "https://dev.to/api".into()
}
fn default_image_host_key_env() -> String {
    "IMGBB_API_KEY".into()
}
fn default_image_host_url() -> String {
    "https://api.imgbb.com/1/upload".into()
}

// ---------------------------------------------------------------------------
// Credentials (resolved once at startup, passed by reference)
// ---------------------------------------------------------------------------

/// API keys resolved from the environment variables named in [`AppConfig`].
///
/// The generation key is required; the others only disable the
/// feature that needs them.
#[derive(Clone, Default)]
pub struct Credentials {
    pub openrouter_api_key: String,
    pub unsplash_access_key: Option<String>,
    pub devto_api_key: Option<String>,
    pub image_host_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openrouter_api_key", &"<redacted>")
            .field("unsplash_access_key", &self.unsplash_access_key.as_ref().map(|_| "<redacted>"))
            .field("devto_api_key", &self.devto_api_key.as_ref().map(|_| "<redacted>"))
            .field("image_host_key", &self.image_host_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Resolve every credential named in the config.
    ///
    /// Fails when the generation key is missing; logs a warning for each
    /// missing optional key.
    pub fn resolve(config: &AppConfig) -> Result<Self> {
        let openrouter_api_key = read_env(&config.openrouter.api_key_env).ok_or_else(|| {
            PostcraftError::config(format!(
                "OpenRouter API key not found. Set the {} environment variable.\n\
                 Get a key at https://openrouter.ai/keys",
                config.openrouter.api_key_env
            ))
        })?;

        Ok(Self {
            openrouter_api_key,
            ..Self::optional(config)
        })
    }

    /// Resolve only the optional credentials, for commands that never
    /// generate text. The generation key is left empty.
    pub fn optional(config: &AppConfig) -> Self {
        Self {
            openrouter_api_key: String::new(),
            unsplash_access_key: optional_env(
                &config.images.access_key_env,
                "banner images will fall back to the default asset",
            ),
            devto_api_key: optional_env(
                &config.publishing.api_key_env,
                "publishing needs an explicit --api-key",
            ),
            image_host_key: optional_env(
                &config.publishing.image_host_key_env,
                "banners will not be uploaded when publishing",
            ),
        }
    }
}

/// Read a non-empty env var.
fn read_env(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(val) if !val.trim().is_empty() => Some(val),
        _ => None,
    }
}

fn optional_env(name: &str, consequence: &str) -> Option<String> {
    let value = read_env(name);
    if value.is_none() {
        warn!(env_var = name, "{name} not set; {consequence}");
    }
    value
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.postcraft/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PostcraftError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.postcraft/postcraft.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PostcraftError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        PostcraftError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    validate(&config)?;
    Ok(config)
}

/// Check value ranges that serde cannot express.
fn validate(config: &AppConfig) -> Result<()> {
    let threshold = config.research.dedup_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(PostcraftError::config(format!(
            "research.dedup_threshold must be within 0.0..=1.0 (got {threshold})"
        )));
    }

    for (key, value) in [
        ("openrouter.base_url", &config.openrouter.base_url),
        ("research.search_base_url", &config.research.search_base_url),
        ("images.base_url", &config.images.base_url),
        ("publishing.base_url", &config.publishing.base_url),
        ("publishing.image_host_url", &config.publishing.image_host_url),
    ] {
        url::Url::parse(value)
            .map_err(|e| PostcraftError::config(format!("{key} is not a valid URL: {e}")))?;
    }

    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PostcraftError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PostcraftError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PostcraftError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
