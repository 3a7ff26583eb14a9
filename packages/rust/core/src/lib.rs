//! Core pipeline orchestration and domain logic for Postcraft.
//!
//! This crate ties research analysis, staged blog writing, image keyword
//! and tag generation, and run directory storage into the end-to-end
//! `write` workflow.

pub mod analysis;
pub mod assets;
pub mod output;
pub mod pipeline;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use analysis::ResearchAnalyst;
pub use assets::{generate_image_keyword, generate_tags};
pub use output::{LoadedRun, load_run, record_banner, record_publication, save_blog, write_run};
pub use pipeline::{
    Collaborators, PostConfig, PostRun, ProgressReporter, SilentProgress, write_post,
};
pub use writer::BlogWriter;
