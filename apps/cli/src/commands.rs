//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use postcraft_core::{
    BlogWriter, Collaborators, PostConfig, PostRun, ProgressReporter, ResearchAnalyst,
    generate_image_keyword, load_run, record_banner, record_publication, save_blog, write_post,
    write_run,
};
use postcraft_markdown::parse_references;
use postcraft_providers::{
    BannerSource, DevToClient, DuckDuckGoSearch, OpenRouterClient, PublishRequest, UnsplashClient,
};
use postcraft_shared::{AppConfig, Credentials, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Postcraft: research a topic and turn it into a publishable blog post.
#[derive(Parser)]
#[command(
    name = "postcraft",
    version,
    about = "Research a topic, write a cited technical blog post, and publish it to dev.to.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Research a topic and write a full post, with banner and tags.
    Write {
        /// Topic to write about.
        topic: String,

        /// File with your own research notes.
        #[arg(long)]
        notes: Option<PathBuf>,

        /// Root directory for run output (defaults to `defaults.output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Run research only and print the merged record as JSON.
    Research {
        /// Topic to research.
        topic: String,

        /// File with your own research notes.
        #[arg(long)]
        notes: Option<PathBuf>,
    },

    /// Revise the post of an existing run.
    Edit {
        /// Run directory.
        #[arg(long)]
        run: PathBuf,

        /// What to change, in plain words.
        instructions: String,
    },

    /// List the footnote references of a run's post.
    References {
        /// Run directory.
        #[arg(long)]
        run: PathBuf,
    },

    /// Fetch a new banner image for a run.
    Banner {
        /// Run directory.
        #[arg(long)]
        run: PathBuf,

        /// Image search keyword (generated from the topic when omitted).
        #[arg(long)]
        keyword: Option<String>,
    },

    /// Publish a run's post to dev.to (as a draft unless --live).
    Publish {
        /// Run directory.
        #[arg(long)]
        run: PathBuf,

        /// Publish immediately instead of saving a draft.
        #[arg(long)]
        live: bool,

        /// dev.to API key (overrides the configured environment variable).
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr so command output on stdout stays pipeable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "postcraft=info",
        1 => "postcraft=debug",
        _ => "postcraft=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Write { topic, notes, out } => {
            cmd_write(&topic, notes.as_deref(), out.as_deref()).await
        }
        Command::Research { topic, notes } => cmd_research(&topic, notes.as_deref()).await,
        Command::Edit { run, instructions } => cmd_edit(&run, &instructions).await,
        Command::References { run } => cmd_references(&run),
        Command::Banner { run, keyword } => cmd_banner(&run, keyword).await,
        Command::Publish { run, live, api_key } => cmd_publish(&run, live, api_key).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

/// One OpenRouter client per role, all sharing the same key.
struct Generators {
    researcher: OpenRouterClient,
    writer: OpenRouterClient,
    assistant: OpenRouterClient,
}

impl Generators {
    fn new(config: &AppConfig, credentials: &Credentials) -> Result<Self> {
        let openrouter = &config.openrouter;
        let key = credentials.openrouter_api_key.as_str();
        Ok(Self {
            researcher: OpenRouterClient::new(openrouter, key, openrouter.research_model())?,
            writer: OpenRouterClient::new(openrouter, key, openrouter.writer_model())?,
            assistant: OpenRouterClient::new(openrouter, key, openrouter.assist_model.as_str())?,
        })
    }
}

fn read_notes(path: Option<&Path>) -> Result<Option<String>> {
    path.map(|p| {
        std::fs::read_to_string(p).wrap_err_with(|| format!("cannot read notes file {}", p.display()))
    })
    .transpose()
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_write(topic: &str, notes: Option<&Path>, out: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let credentials = Credentials::resolve(&config)?;
    let notes = read_notes(notes)?;

    let generators = Generators::new(&config, &credentials)?;
    let search = DuckDuckGoSearch::new(&config.research)?;
    let banners = UnsplashClient::new(&config.images, credentials.unsplash_access_key.clone())?;

    let post_config = PostConfig {
        notes,
        dedup_threshold: config.research.dedup_threshold,
        ..PostConfig::new(topic)
    };
    let collaborators = Collaborators {
        researcher: &generators.researcher,
        writer: &generators.writer,
        assistant: &generators.assistant,
        search: &search,
        banners: &banners,
    };

    info!(topic, "writing post");

    let reporter = CliProgress::new();
    let run = write_post(&post_config, collaborators, &reporter).await?;

    let output_root = out.map_or_else(|| PathBuf::from(&config.defaults.output_dir), Path::to_path_buf);
    let run_dir = write_run(&output_root, &run)?;

    println!();
    match &run.blog {
        Some(Ok(_)) => println!("  Post written successfully!"),
        Some(Err(failure)) => println!("  Post not written: {failure}"),
        None => println!("  Post not written: research did not complete"),
    }
    if let Err(failure) = &run.research {
        println!("  Research: {failure}");
    }
    println!("  ID:      {}", run.run_id);
    println!("  Topic:   {}", run.topic);
    println!("  Tags:    {}", run.tags.as_deref().unwrap_or("-"));
    println!("  Banner:  {}", run.banner_path.display());
    println!("  Path:    {}", run_dir.display());
    println!("  Time:    {:.1}s", run.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_research(topic: &str, notes: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let credentials = Credentials::resolve(&config)?;
    let notes = read_notes(notes)?;

    let generators = Generators::new(&config, &credentials)?;
    let search = DuckDuckGoSearch::new(&config.research)?;
    let analyst = ResearchAnalyst::new(
        &generators.researcher,
        &search,
        config.research.dedup_threshold,
    );

    let spinner = CliProgress::new();
    spinner.phase("Researching");
    let research = analyst.analyse_research(topic, notes.as_deref()).await;
    spinner.finish();

    let record = research.map_err(|failure| eyre!("{failure}"))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn cmd_edit(run_dir: &Path, instructions: &str) -> Result<()> {
    let config = load_config()?;
    let credentials = Credentials::resolve(&config)?;
    let loaded = load_run(run_dir)?;
    let state = loaded.require_blog()?.clone();

    let generators = Generators::new(&config, &credentials)?;

    let spinner = CliProgress::new();
    spinner.phase("Applying edits");
    let edited = BlogWriter::new(&generators.writer)
        .apply_edits(state, instructions)
        .await;
    spinner.finish();

    if let Some(error) = &edited.error {
        return Err(eyre!("{error}"));
    }

    save_blog(&loaded.dir, &edited)?;
    println!("Post updated: {}", loaded.dir.display());
    Ok(())
}

fn cmd_references(run_dir: &Path) -> Result<()> {
    let loaded = load_run(run_dir)?;
    let blog = loaded.require_blog()?;
    let references = parse_references(&blog.final_markdown);

    if references.is_empty() {
        println!("No references found.");
        return Ok(());
    }

    for reference in &references {
        println!("[^{}] {}", reference.id, reference.text);
        if let Some(url) = &reference.source_url {
            println!("      {url}");
        }
        println!("      credibility: {}", reference.credibility().as_str());
    }
    Ok(())
}

async fn cmd_banner(run_dir: &Path, keyword: Option<String>) -> Result<()> {
    let config = load_config()?;
    let loaded = load_run(run_dir)?;
    let topic = loaded.manifest.topic.as_str();

    let (keyword, credentials) = match keyword {
        Some(keyword) => (keyword, Credentials::optional(&config)),
        None => {
            let credentials = Credentials::resolve(&config)?;
            let generators = Generators::new(&config, &credentials)?;
            let keyword = match generate_image_keyword(&generators.assistant, topic).await {
                Ok(keyword) => keyword,
                Err(e) => {
                    warn!(error = %e, "image keyword generation failed, searching by topic");
                    topic.to_string()
                }
            };
            (keyword, credentials)
        }
    };

    let banners = UnsplashClient::new(&config.images, credentials.unsplash_access_key)?;
    let path = banners.fetch_banner(&keyword).await;
    record_banner(&loaded.dir, Some(&keyword), &path)?;

    println!("Banner ({keyword}): {}", path.display());
    Ok(())
}

async fn cmd_publish(run_dir: &Path, live: bool, api_key: Option<String>) -> Result<()> {
    let config = load_config()?;
    let credentials = Credentials::optional(&config);
    let loaded = load_run(run_dir)?;
    let blog = loaded.require_blog()?;

    let client = DevToClient::new(&config.publishing, &credentials)?;
    let request = PublishRequest {
        topic: loaded.manifest.topic.clone(),
        body_markdown: blog.final_markdown.clone(),
        tags: loaded.tags(),
        banner_path: loaded.manifest.banner_path.as_ref().map(PathBuf::from),
        published: live,
        api_key,
    };

    info!(run = %loaded.manifest.id, live, "publishing post");

    let spinner = CliProgress::new();
    spinner.phase("Publishing to dev.to");
    let published = client.publish(&request).await;
    spinner.finish();
    let published = published?;

    record_publication(&loaded.dir, &published.path)?;

    let state = if live { "Published" } else { "Draft saved" };
    println!("{state}: {}", published.url);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _run: &PostRun) {
        self.finish();
    }
}
