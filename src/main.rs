//! Sumi-Sieve main entry point
//!
//! This is the command-line interface for the Sumi-Sieve classifieds harvester.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_sieve::config::{load_config_with_hash, Config, BUILTIN_CONFIG};
use sumi_sieve::crawler::{Coordinator, LinkOverrides};
use sumi_sieve::output::{
    print_statistics, read_links, render_listing, render_listing_json, write_links,
    DEFAULT_LINKS_FILE,
};
use sumi_sieve::url::{listing_id, validate_marketplace_url};
use tracing_subscriber::EnvFilter;

/// Sumi-Sieve: a resilient classifieds harvester
///
/// Given a search URL, Sumi-Sieve collects every listing link across the
/// result pages. Given a listing URL, it extracts the listing's fields,
/// reporting which strategy produced each value.
#[derive(Parser, Debug)]
#[command(name = "sumi-sieve")]
#[command(version)]
#[command(about = "A resilient classifieds harvester", long_about = None)]
struct Cli {
    /// Search or listing URL
    #[arg(value_name = "URL", required_unless_present_any = ["from_file", "print_config"])]
    url: Option<String>,

    /// Path to a TOML configuration file replacing the built-in one
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Collect listing links even if the URL looks like a listing
    #[arg(long)]
    links: bool,

    /// Scrape every listing URL in a link file
    #[arg(long, value_name = "FILE", conflicts_with_all = ["url", "links"])]
    from_file: Option<PathBuf>,

    /// Exact number of result pages to visit
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pages: Option<u32>,

    /// Number of concurrent workers
    #[arg(long, value_name = "N")]
    concurrency: Option<u32>,

    /// Last page incremental pagination may visit
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Output file (link file in link mode, rendered records otherwise)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,

    /// Validate the configuration and input without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Print the active configuration file and exit
    #[arg(long, conflicts_with = "dry_run")]
    print_config: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if cli.print_config {
        return print_config(cli.config.as_deref());
    }

    match &cli.config {
        Some(path) => tracing::info!("Loading configuration from: {}", path.display()),
        None => tracing::info!("Using built-in configuration"),
    }
    let (mut config, hash) =
        load_config_with_hash(cli.config.as_deref()).context("Failed to load configuration")?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        return handle_dry_run(&config, &cli);
    }

    let coordinator = Coordinator::new(config)?;

    if let Some(path) = &cli.from_file {
        return handle_batch(&coordinator, path, &cli).await;
    }

    let url = cli.url.as_deref().unwrap_or_default();
    if cli.links || listing_id(url).is_none() {
        handle_links(&coordinator, url, &cli).await
    } else {
        handle_listing(&coordinator, url, &cli).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_sieve=info,warn"),
            1 => EnvFilter::new("sumi_sieve=debug,info"),
            2 => EnvFilter::new("sumi_sieve=trace,debug"),
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

fn print_config(path: Option<&Path>) -> Result<()> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => BUILTIN_CONFIG.to_string(),
    };
    print!("{}", content);
    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(concurrency) = cli.concurrency {
        config.crawler.concurrency = concurrency;
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    config.validate().context("Invalid command-line override")?;
    Ok(())
}

/// Handles the --dry-run mode: validates config and input, shows what would run
fn handle_dry_run(config: &Config, cli: &Cli) -> Result<()> {
    println!("=== Sumi-Sieve Dry Run ===\n");

    println!("Marketplace: {} (page parameter '{}')", config.marketplace.domain, config.marketplace.page_param);
    println!("\nCrawler Configuration:");
    println!("  Workers: {}", config.crawler.concurrency);
    println!("  Results per page: {}", config.crawler.per_page);
    println!("  Safety cap: {} pages", config.crawler.safety_cap);
    println!("  Max pages (incremental): {}", config.crawler.max_pages);
    println!(
        "  Delay: {}ms + {}ms jitter step",
        config.crawler.request_delay_ms, config.crawler.jitter_ms
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    println!("\nLink strategies ({}):", config.links.strategies.len());
    for strategy in &config.links.strategies {
        println!("  - {}", strategy.name);
    }

    println!("\nFields ({}):", config.fields.len());
    for field in &config.fields {
        let required = if field.required { " (required)" } else { "" };
        println!("  - {}{}: {} strategies", field.name, required, field.strategies.len());
    }

    if let Some(url) = &cli.url {
        let url = validate_marketplace_url(url, &config.marketplace.domain)?;
        let mode = if cli.links || listing_id(url.as_str()).is_none() {
            "link collection"
        } else {
            "listing scrape"
        };
        println!("\n✓ Input URL is valid: {} ({})", url, mode);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Collects listing links and writes the link file
async fn handle_links(coordinator: &Coordinator, url: &str, cli: &Cli) -> Result<()> {
    let overrides = LinkOverrides { pages: cli.pages };
    let report = coordinator
        .collect_links(url, overrides)
        .await
        .with_context(|| format!("Link collection failed for {}", url))?;

    let path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LINKS_FILE));
    let written = write_links(&path, report.links())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let stats = report.statistics();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else if !cli.quiet {
        print_statistics(&stats, "links");
        println!("  Links written to: {} ({})", path.display(), written);
    }

    Ok(())
}

/// Scrapes one listing and prints its fields
async fn handle_listing(coordinator: &Coordinator, url: &str, cli: &Cli) -> Result<()> {
    let record = coordinator
        .scrape_listing(url)
        .await
        .with_context(|| format!("Failed to scrape {}", url))?;

    let rendered = if cli.json {
        render_listing_json(&record)?
    } else {
        render_listing(&record, &coordinator.config().fields)
    };
    emit(&rendered, cli.output.as_deref())
}

/// Scrapes every listing of a link file
async fn handle_batch(coordinator: &Coordinator, path: &Path, cli: &Cli) -> Result<()> {
    let urls = read_links(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if urls.is_empty() {
        bail!("No listing URLs in {}", path.display());
    }

    let report = coordinator.scrape_listings(&urls).await;

    let rendered = if cli.json {
        serde_json::to_string_pretty(&report.state)?
    } else {
        let mut out = String::new();
        for (_, record) in report.state.iter() {
            out.push_str(&render_listing(record, &coordinator.config().fields));
            out.push('\n');
        }
        if !report.rejected.is_empty() {
            out.push_str(&format!("Rejected inputs ({}):\n", report.rejected.len()));
            for url in &report.rejected {
                out.push_str(&format!("  - {}\n", url));
            }
        }
        out
    };
    emit(&rendered, cli.output.as_deref())?;

    if !cli.quiet && !cli.json {
        print_statistics(&report.statistics(), "listings");
    }
    Ok(())
}

fn emit(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Output written to: {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
