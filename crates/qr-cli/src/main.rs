use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qr_core::{PageFetcher, Provider, SearchClient};
use qr_providers::GeminiProvider;
use qr_research::{Pipeline, PipelineRequest, NO_RESULTS};
use qr_web::{BraveSearchClient, BraveSearchConfig, HttpPageFetcher, PageFetchConfig};

mod config;
mod setup;

use config::{mask_secret, Config, MODEL_KEY_ENV};

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Most verbose: request and response payloads
    Trace,
    /// Verbose: model calls, per-page fetches, stage durations
    Debug,
    /// Standard: stage transitions and summaries of each stage
    Info,
    /// Quiet: failed fetches and searches
    Warn,
    /// Minimal: only errors
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "qr")]
#[command(author, version, about = "Quick-research: search the web and summarize what it says", long_about = None)]
pub struct Cli {
    /// Task text to research (read from stdin when omitted and piped)
    pub task: Option<String>,

    /// Request the wider result set instead of the single top hit
    #[arg(short, long)]
    pub wide: bool,

    /// Print the full outcome (query, results, timings) as JSON
    #[arg(long)]
    pub json: bool,

    /// Correlation id attached to log lines
    #[arg(long, default_value_t = 1)]
    pub task_id: u64,

    /// Model to use for both model calls (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Config file (default: <config dir>/qr/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Enable debug logging (shorthand for --log-level debug)
    #[arg(short, long)]
    pub debug: bool,

    /// Write logs to file (JSON-lines format)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the search provider and list the hits
    Search {
        query: String,

        /// Number of hits to request
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },
    /// Fetch a page and print its cleaned text
    Fetch { url: String },
    /// Show the resolved configuration
    Config,
    /// Write a configuration template
    Setup {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let log_level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };
    init_logging(log_level, cli.log_file.as_ref())?;

    let load_config = || -> Result<Config> {
        Ok(Config::load(cli.config.as_deref())?.with_model_override(cli.model.as_deref()))
    };

    match &cli.command {
        Some(Commands::Setup { force }) => setup_mode(&cli, *force),
        Some(Commands::Search { query, count }) => search_mode(&load_config()?, query, *count).await,
        Some(Commands::Fetch { url }) => fetch_mode(&load_config()?, url).await,
        Some(Commands::Config) => show_config(&load_config()?),
        None => {
            let config = load_config()?;
            let task = read_task(cli.task.as_deref())?;
            research_mode(&cli, &config, &task).await
        }
    }
}

/// Writes the template without reading any existing config, so it works on a
/// fresh machine and with an explicit `--config` path that does not exist yet.
fn setup_mode(cli: &Cli, force: bool) -> Result<()> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    setup::run(&path, force)
}

fn init_logging(level: LogLevel, log_file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::new(level.as_filter());

    if let Some(log_path) = log_file {
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .init();
    } else {
        // Logs go to stderr so stdout carries only the answer
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn read_task(arg: Option<&str>) -> Result<String> {
    let task = match arg {
        Some(task) => task.to_string(),
        None if !std::io::stdin().is_terminal() => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read task text from stdin")?;
            buf
        }
        None => anyhow::bail!("No task text given. Usage: qr \"<what to research>\""),
    };

    if task.trim().is_empty() {
        anyhow::bail!("Task text is empty");
    }
    Ok(task)
}

fn build_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let api_key = config.model_api_key().with_context(|| {
        format!(
            "Model API key not found. Set {} or [provider].api_key in the config file",
            MODEL_KEY_ENV
        )
    })?;

    let mut provider = GeminiProvider::new(api_key);
    if let Some(model) = &config.provider.default_model {
        provider = provider.with_default_model(model);
    }
    if let Some(url) = &config.provider.base_url {
        provider = provider.with_base_url(url);
    }
    Ok(Arc::new(provider))
}

fn build_search_client(config: &Config) -> Arc<dyn SearchClient> {
    let api_key = config.search_api_key();
    if api_key.is_none() {
        tracing::warn!("No search provider credential configured; searches will return no results");
    }

    let mut search_config = BraveSearchConfig::new(api_key)
        .with_timeout(std::time::Duration::from_secs(config.search.timeout_secs));
    if let Some(endpoint) = &config.search.endpoint {
        search_config = search_config.with_endpoint(endpoint);
    }
    Arc::new(BraveSearchClient::new(search_config))
}

fn build_page_fetcher(config: &Config) -> Arc<dyn PageFetcher> {
    Arc::new(HttpPageFetcher::new(
        PageFetchConfig::default().with_timeout(config.research.fetch_timeout()),
    ))
}

async fn research_mode(cli: &Cli, config: &Config, task: &str) -> Result<()> {
    let pipeline = Pipeline::new(
        build_provider(config)?,
        build_search_client(config),
        build_page_fetcher(config),
        config.research.clone(),
    );

    let request = PipelineRequest::new(task)
        .with_fast_mode(!cli.wide)
        .with_task_id(cli.task_id);

    let outcome = match pipeline.run(&request).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_auth_error() => anyhow::bail!(
            "{}\nCheck {} or [provider].api_key in the config file",
            e,
            MODEL_KEY_ENV
        ),
        Err(e) => return Err(e).context("Research pipeline failed"),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.summary);
        if outcome.summary != NO_RESULTS && !outcome.results.is_empty() {
            println!("\nSources:");
            for result in &outcome.results {
                println!("- {} <{}>", result.title(), result.url());
            }
        }
    }
    Ok(())
}

async fn search_mode(config: &Config, query: &str, count: usize) -> Result<()> {
    let client = build_search_client(config);
    let hits = client.try_search(query, count).await?;

    if hits.is_empty() {
        println!("{}", NO_RESULTS);
        return Ok(());
    }
    for (i, hit) in hits.iter().enumerate() {
        println!("{}. {}\n   {}\n   {}\n", i + 1, hit.title, hit.url, hit.description);
    }
    Ok(())
}

async fn fetch_mode(config: &Config, url: &str) -> Result<()> {
    let fetcher = build_page_fetcher(config);
    let text = fetcher.try_fetch(url).await?;
    println!("{}", text);
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    println!("Config file: {}", Config::config_path()?.display());
    println!();
    println!("[provider]");
    println!("  api_key       = {}", mask_secret(config.model_api_key().as_deref()));
    println!(
        "  base_url      = {}",
        config.provider.base_url.as_deref().unwrap_or("(default)")
    );
    println!();
    println!("[search]");
    println!("  api_key       = {}", mask_secret(config.search_api_key().as_deref()));
    println!(
        "  endpoint      = {}",
        config.search.endpoint.as_deref().unwrap_or(qr_web::brave::DEFAULT_ENDPOINT)
    );
    println!("  timeout_secs  = {}", config.search.timeout_secs);
    println!();
    println!("[research]");
    print!("{}", toml::to_string(&config.research)?);
    Ok(())
}
