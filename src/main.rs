//! Web Content Analyzer main entry point
//!
//! This is the command-line interface for the scraping pipeline. Results go to
//! stdout (or `--output`), logs go to stderr.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use web_content_analyzer::config::{load_config_with_hash, Config};
use web_content_analyzer::output::{render, write_report, OutputFormat};
use web_content_analyzer::pipeline::{parse_request_url, Pipeline, ScrapeRequest};

/// Web Content Analyzer: fetch, crawl, extract and analyze web pages
///
/// Fetches a URL, optionally follows its links breadth-first within depth, page
/// and byte budgets, extracts structured content from HTML or RSS/Atom, and can
/// ask a language model for a JSON analysis of the result.
#[derive(Parser, Debug)]
#[command(name = "web-content-analyzer")]
#[command(version)]
#[command(about = "Scrape, crawl and analyze web content", long_about = None)]
struct Cli {
    /// URL to scrape
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Link depth to crawl (0 scrapes only the given page)
    #[arg(short, long, default_value_t = 0)]
    depth: u32,

    /// Pages to fetch in addition to the root
    #[arg(short = 'p', long, default_value_t = 5)]
    max_pages: usize,

    /// Follow links to other domains
    #[arg(long)]
    all_domains: bool,

    /// Run language-model analysis on the result
    #[arg(short, long)]
    analyze: bool,

    /// Also produce a stopword-free variant of the normalized text
    #[arg(long)]
    remove_stopwords: bool,

    /// Output format (json or markdown)
    #[arg(short, long, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Emit single-line JSON
    #[arg(long)]
    compact: bool,

    /// Write the result to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and request, show what would be scraped, and exit
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if cli.remove_stopwords {
        config.normalize.remove_stopwords = true;
    }

    let request = ScrapeRequest {
        url: cli.url.clone(),
        depth: cli.depth,
        same_domain_only: !cli.all_domains,
        max_pages: cli.max_pages,
        run_analysis: cli.analyze,
    };

    if cli.dry_run {
        return handle_dry_run(&config, &request);
    }

    handle_scrape(config, &request, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("web_content_analyzer=info,warn"),
            1 => EnvFilter::new("web_content_analyzer=debug,info"),
            2 => EnvFilter::new("web_content_analyzer=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates everything and prints the plan
fn handle_dry_run(config: &Config, request: &ScrapeRequest) -> anyhow::Result<()> {
    web_content_analyzer::config::validate(config)?;
    let url = parse_request_url(&request.url)?;

    println!("=== Web Content Analyzer Dry Run ===\n");

    println!("Request:");
    println!("  URL: {}", url);
    println!("  Depth: {}", request.depth);
    println!("  Max pages: {}", request.max_pages);
    println!("  Same domain only: {}", request.same_domain_only);
    println!("  Analysis: {}", request.run_analysis);

    println!("\nFetch:");
    println!("  Attempts: {}", config.fetch.max_attempts);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  Max page bytes: {}", config.fetch.max_page_bytes);
    println!("  User agents: {}", config.fetch.user_agents.len());

    println!("\nCrawl:");
    println!("  Concurrency: {}", config.crawl.concurrency);
    println!("  Max total bytes: {}", config.crawl.max_total_bytes);
    match config.crawl.max_duration_secs {
        Some(secs) => println!("  Deadline: {}s", secs),
        None => println!("  Deadline: none"),
    }
    println!("  Respect robots.txt: {}", config.crawl.respect_robots_txt);
    println!("  Excluded domains ({}):", config.crawl.exclude_domains.len());
    for pattern in &config.crawl.exclude_domains {
        println!("  - {}", pattern);
    }

    if request.run_analysis {
        println!("\nAnalysis:");
        println!("  Endpoint: {}", config.analysis.api_base_url);
        println!("  Model: {}", config.analysis.model);
        let key_present = std::env::var(&config.analysis.api_key_env).is_ok();
        println!(
            "  API key (${}): {}",
            config.analysis.api_key_env,
            if key_present { "set" } else { "missing" }
        );
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main scrape operation
async fn handle_scrape(config: Config, request: &ScrapeRequest, cli: &Cli) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config)?;

    let scraped = match pipeline.scrape(request).await {
        Ok(scraped) => scraped,
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            return Err(e.into());
        }
    };

    for warning in &scraped.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::info!(
        "Scrape finished: {} page(s) visited, status {:?}",
        scraped.crawl.visited.len(),
        scraped.status
    );

    let rendered = render(&scraped, cli.format, !cli.compact)?;
    match &cli.output {
        Some(path) => write_report(path, &rendered)?,
        None => println!("{}", rendered),
    }

    Ok(())
}
