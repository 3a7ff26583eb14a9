//! Shared types, error model, and configuration for Postcraft.
//!
//! This crate is the foundation depended on by all other Postcraft crates.
//! It provides:
//! - [`PostcraftError`]: the unified error type
//! - Domain types ([`Finding`], [`ResearchRecord`], [`BlogState`], [`RunId`])
//! - Configuration ([`AppConfig`], [`Credentials`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, Credentials, DefaultsConfig, ImagesConfig, OpenRouterConfig, PublishingConfig,
    ResearchConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{PostcraftError, Result};
pub use types::{
    BlogState, CURRENT_SCHEMA_VERSION, Credibility, Finding, Reference, ResearchFailure,
    ResearchRecord, RunId, RunManifest, SourceCounts, Stage, StageFailure,
};
