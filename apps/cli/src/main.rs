//! Postcraft CLI: researched technical blog posts from a topic.
//!
//! Researches a topic, writes and polishes a post, picks a banner and tags,
//! and optionally publishes the result as a dev.to article.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // A missing .env is fine; keys may come from the real environment.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
