//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest page scraper.

use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_harvest::config::{load_config_with_hash, Config};
use sumi_harvest::crawler::Coordinator;
use sumi_harvest::output::{
    compute_stats, print_json, print_records, print_results, print_statistics,
};
use sumi_harvest::storage::{now_millis, ScrapeStore, SqliteStore, DEFAULT_LIST_LIMIT};
use sumi_harvest::validate_url;
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: A polite structured-record harvester
///
/// Sumi-Harvest scrapes web pages at bounded concurrency, retries transient
/// failures with exponential backoff, and keeps exactly one up-to-date record
/// per URL in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite structured-record harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URLs to scrape
    #[arg(value_name = "URLS")]
    urls: Vec<String>,

    /// Read additional URLs from a file, one per line
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,

    /// Validate config and show what would be scraped without scraping
    #[arg(long, conflicts_with_all = ["stats", "list"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "list"])]
    stats: bool,

    /// List stored records and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    list: bool,

    /// With --list, show only the record for this exact URL
    #[arg(long, requires = "list")]
    url: Option<String>,

    /// With --list, maximum records shown
    #[arg(long, requires = "list", default_value_t = DEFAULT_LIST_LIMIT)]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.stats {
        handle_stats(&config, cli.json)?;
    } else if cli.list {
        handle_list(&config, cli.url.as_deref(), cli.limit, cli.json)?;
    } else {
        let urls = collect_urls(&cli.urls, cli.input.as_deref())?;
        if cli.dry_run {
            handle_dry_run(&config, &urls);
        } else {
            handle_scrape(&config, &urls, cli.json).await?;
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Positional URLs followed by those in the input file
fn collect_urls(
    positional: &[String],
    input: Option<&Path>,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut urls = positional.to_vec();

    if let Some(path) = input {
        let contents = std::fs::read_to_string(path)?;
        urls.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }

    Ok(urls)
}

/// Handles the --dry-run mode: validates config and shows what would be scraped
fn handle_dry_run(config: &Config, urls: &[String]) {
    let scraper = &config.scraper;

    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Scraper Configuration:");
    println!("  Max concurrent requests: {}", scraper.max_concurrent_requests);
    println!("  Request delay: {}ms", scraper.request_delay);
    println!("  Retry attempts: {}", scraper.retry_attempts);
    println!("  Timeout: {}ms", scraper.timeout);
    println!(
        "  User agent: {}",
        scraper
            .user_agent
            .as_deref()
            .unwrap_or("random browser agent per attempt")
    );
    println!("  Headless: {}", scraper.headless);
    println!("  Drain timeout: {}ms", scraper.drain_timeout);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    let mut valid = 0;
    println!("\nURLs ({}):", urls.len());
    for url in urls {
        match validate_url(url) {
            Ok(()) => {
                valid += 1;
                println!("  - {}", url);
            }
            Err(e) => println!("  - {} (invalid: {})", url, e),
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would scrape {} of {} URLs", valid, urls.len());
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::new(Path::new(&config.storage.database_path))?;
    let stats = compute_stats(&store, now_millis())?;

    if json {
        print_json(&stats)?;
    } else {
        println!("Database: {}\n", config.storage.database_path);
        print_statistics(&stats);
    }

    Ok(())
}

/// Handles the --list mode: shows stored records
fn handle_list(
    config: &Config,
    url: Option<&str>,
    limit: usize,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::new(Path::new(&config.storage.database_path))?;
    let records = store.list_records(url, limit)?;

    if json {
        print_json(&records)?;
    } else {
        print_records(&records);
    }

    Ok(())
}

/// Handles the main scrape operation
///
/// Ctrl-C stops admission of queued work but lets in-flight scrapes finish
/// before the process exits.
async fn handle_scrape(
    config: &Config,
    urls: &[String],
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if urls.is_empty() {
        tracing::warn!("No URLs given; pass them as arguments or with --input");
        return Ok(());
    }

    let coordinator = Coordinator::from_config(config)?;

    let batch = coordinator.scrape_many(urls);
    tokio::pin!(batch);

    let (results, shutdown) = tokio::select! {
        results = &mut batch => (results, coordinator.shutdown().await),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupt received, finishing in-flight scrapes");
            tokio::join!(batch, coordinator.shutdown())
        }
    };

    if let Err(e) = shutdown {
        tracing::error!("Shutdown did not complete cleanly: {}", e);
    }

    let stats = coordinator.get_stats()?;

    if json {
        print_json(&serde_json::json!({ "results": results, "stats": stats }))?;
    } else {
        print_results(urls, &results);
        println!();
        print_statistics(&stats);
    }

    Ok(())
}
