//! Listing-Harvest main entry point
//!
//! This is the command-line interface for the Listing-Harvest crawler.

use anyhow::Context;
use clap::Parser;
use listing_harvest::config::{load_config_with_hash, validate, Config};
use listing_harvest::crawler::{harvest, ShutdownSignal};
use listing_harvest::model::{ItemCondition, SearchFilters, SearchQuery, SortOrder};
use listing_harvest::output::{output_path, print_summary, report_path, ExportFormat};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Listing-Harvest: a polite product listing crawler
///
/// Runs a search, walks the result pages, extracts every listing found and
/// writes the records as CSV, JSON and/or XLSX.
#[derive(Parser, Debug)]
#[command(name = "listing-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite product listing crawler", long_about = None)]
struct Cli {
    /// Search terms
    #[arg(value_name = "QUERY", required = true, num_args = 1..)]
    query: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Category id to search in
    #[arg(long, value_name = "ID")]
    category: Option<String>,

    /// Lowest price to include
    #[arg(long, value_name = "AMOUNT")]
    min_price: Option<f64>,

    /// Highest price to include
    #[arg(long, value_name = "AMOUNT")]
    max_price: Option<f64>,

    /// Item condition filter
    #[arg(long, value_enum)]
    condition: Option<ItemCondition>,

    /// Result ordering
    #[arg(long, value_enum, value_name = "ORDER")]
    sort: Option<SortOrder>,

    /// Maximum number of search result pages
    #[arg(short = 'p', long, value_name = "N")]
    max_pages: Option<u32>,

    /// Maximum number of listings to attempt
    #[arg(short = 'l', long, value_name = "N")]
    max_listings: Option<u64>,

    /// Export format (repeatable)
    #[arg(short = 'f', long = "format", value_enum)]
    formats: Vec<ExportFormat>,

    /// Output file prefix
    #[arg(short = 'o', long = "output", value_name = "PREFIX")]
    output: Option<String>,

    /// Output directory
    #[arg(short = 'd', long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Minimum delay between requests in milliseconds
    #[arg(long, value_name = "MS")]
    min_delay_ms: Option<u64>,

    /// Maximum delay between requests in milliseconds
    #[arg(long, value_name = "MS")]
    max_delay_ms: Option<u64>,

    /// Proxy URL, credentials included
    #[arg(long, value_name = "URL", env = "LISTING_HARVEST_PROXY", hide_env_values = true)]
    proxy: Option<String>,

    /// Fetch and obey robots.txt
    #[arg(long)]
    respect_robots: bool,

    /// Also write a markdown summary report
    #[arg(long)]
    report: bool,

    /// Validate config and show what would be fetched without fetching
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
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
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid configuration")?;

    let query = build_query(&cli, &config).context("Invalid search")?;

    if cli.dry_run {
        return handle_dry_run(&config, &query);
    }

    let summary = harvest(&config, query, ShutdownSignal::on_ctrl_c()).await?;
    print_summary(&summary);

    if summary.interrupted {
        tracing::warn!("Run was interrupted; exported records are partial");
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
            0 => EnvFilter::new("listing_harvest=info,warn"),
            1 => EnvFilter::new("listing_harvest=debug,info"),
            2 => EnvFilter::new("listing_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Layers command-line flags over the file configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if cli.max_listings.is_some() {
        config.crawler.max_listings = cli.max_listings;
    }
    if let Some(min) = cli.min_delay_ms {
        config.crawler.min_delay_ms = min;
        // A lone minimum above the configured maximum means a fixed delay
        if cli.max_delay_ms.is_none() && config.crawler.max_delay_ms < min {
            config.crawler.max_delay_ms = min;
        }
    }
    if let Some(max) = cli.max_delay_ms {
        config.crawler.max_delay_ms = max;
    }
    if cli.respect_robots {
        config.crawler.respect_robots_txt = true;
    }
    if let Some(proxy) = &cli.proxy {
        config.proxy.url = Some(proxy.clone());
    }
    if !cli.formats.is_empty() {
        config.output.formats = cli.formats.clone();
    }
    if let Some(prefix) = &cli.output {
        config.output.prefix = prefix.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.clone();
    }
    if cli.report {
        config.output.summary_report = true;
    }
}

fn build_query(cli: &Cli, config: &Config) -> anyhow::Result<SearchQuery> {
    let query = SearchQuery::new(&cli.query.join(" "), config.crawler.max_pages)?
        .with_category(cli.category.clone())
        .with_filters(SearchFilters {
            min_price: cli.min_price,
            max_price: cli.max_price,
            condition: cli.condition,
        })?
        .with_sort(cli.sort.unwrap_or(config.search.sort_order));
    Ok(query)
}

/// Handles the --dry-run mode: shows the plan without any network traffic
fn handle_dry_run(config: &Config, query: &SearchQuery) -> anyhow::Result<()> {
    let base = Url::parse(&config.search.base_url)?;
    let first_url = query.first_page_url(&base, &config.search.search_path)?;

    println!("=== Listing-Harvest Dry Run ===\n");

    println!("Search:");
    println!("  Terms: {}", query.terms());
    if let Some(category) = query.category() {
        println!("  Category: {}", category);
    }
    println!("  Sort: {:?}", query.sort());
    println!("  First page: {}", first_url);

    println!("\nCrawler Configuration:");
    println!("  Max pages: {}", query.max_pages());
    match config.crawler.max_listings {
        Some(max) => println!("  Max listings: {}", max),
        None => println!("  Max listings: unlimited"),
    }
    println!(
        "  Delay: {}-{}ms",
        config.crawler.min_delay_ms, config.crawler.max_delay_ms
    );
    println!(
        "  Retries: {} (backoff {}ms, capped at {}ms)",
        config.crawler.max_retries, config.crawler.backoff_base_ms, config.crawler.backoff_max_ms
    );
    println!("  Respect robots.txt: {}", config.crawler.respect_robots_txt);
    println!("  Proxy: {}", if config.proxy.url.is_some() { "configured" } else { "none" });

    println!("\nUser Agents:");
    println!("  Rotation: {:?}", config.user_agent.rotation);
    if config.user_agent.agents.is_empty() {
        println!("  Pool: built-in");
    } else {
        println!("  Pool: {} custom agent(s)", config.user_agent.agents.len());
    }

    let base_path = config.output.base_path();
    println!("\nOutput:");
    for format in &config.output.formats {
        println!("  [{}] {}", format, output_path(&base_path, *format).display());
    }
    if config.output.summary_report {
        println!("  [report] {}", report_path(&base_path).display());
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}
