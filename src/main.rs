//! Bizcrawl main entry point
//!
//! This is the command-line interface for the Bizcrawl business harvester.

use bizcrawl::config::{load_config_with_hash, load_proxy_list, validate, Config};
use bizcrawl::crawler::run_crawl;
use bizcrawl::output::{load_progress, print_progress, print_report};
use bizcrawl::storage::Checkpoint;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Proxy list picked up from the working directory when none is configured
const DEFAULT_PROXY_FILE: &str = "proxies_list.txt";

/// Bizcrawl: a resumable business-listing harvester
///
/// Bizcrawl discovers businesses through a listing site's paginated search,
/// then fetches and extracts every business detail page into a line-delimited
/// JSON file. Interrupted runs resume where they stopped.
#[derive(Parser, Debug)]
#[command(name = "bizcrawl")]
#[command(version = "1.0.0")]
#[command(about = "A resumable business-listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Search description, e.g. "Restaurants"
    #[arg(short, long)]
    description: Option<String>,

    /// Search location, e.g. "Las Vegas"
    #[arg(short, long)]
    location: Option<String>,

    /// Proxy list file, one proxy per line
    #[arg(long, value_name = "FILE")]
    proxies: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Delete the discovery checkpoint and rediscover from scratch
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show progress from the checkpoint and output files and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(description) = cli.description.clone() {
        config.search.description = description;
    }
    if let Some(location) = cli.location.clone() {
        config.search.location = location;
    }
    validate(&config)?;

    let proxy_file = resolve_proxy_file(cli.proxies.as_deref(), &config);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, proxy_file.as_deref())?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, proxy_file.as_deref(), cli.fresh).await?;
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
            0 => EnvFilter::new("bizcrawl=info,warn"),
            1 => EnvFilter::new("bizcrawl=debug,info"),
            2 => EnvFilter::new("bizcrawl=trace,debug"),
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

/// The CLI flag wins over the config key; the working-directory default is
/// used only if it exists.
fn resolve_proxy_file(cli: Option<&Path>, config: &Config) -> Option<PathBuf> {
    if let Some(path) = cli {
        return Some(path.to_path_buf());
    }
    if let Some(path) = &config.identity.proxies_file {
        return Some(path.clone());
    }
    let fallback = Path::new(DEFAULT_PROXY_FILE);
    fallback.exists().then(|| fallback.to_path_buf())
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(
    config: &Config,
    proxy_file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Bizcrawl Dry Run ===\n");

    println!("Search:");
    println!("  Description: {}", config.search.description);
    println!("  Location: {}", config.search.location);
    println!("  Pages per round: {}", config.search.batch_size);
    match config.search.max_rounds {
        Some(max) => println!("  Max rounds: {}", max),
        None => println!("  Max rounds: until end of results"),
    }

    println!("\nCrawler:");
    println!("  Detail concurrency: {}", config.crawler.concurrency);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Max attempts: {}", config.crawler.max_attempts);
    let backoff = config.crawler.retry_backoff;
    println!("  Retry backoff: {}-{}ms", backoff.min_ms, backoff.max_ms);
    let challenge = config.crawler.effective_challenge_backoff();
    println!("  Challenge backoff: {}-{}ms", challenge.min_ms, challenge.max_ms);

    println!("\nIdentity:");
    println!("  User agents: {}", config.identity.user_agents.len());
    println!("  Static headers: {}", config.identity.headers.len());
    match proxy_file {
        Some(path) => {
            let proxies = load_proxy_list(path)?;
            println!("  Proxies: {} (from {})", proxies.len(), path.display());
        }
        None => println!("  Proxies: none (direct connection)"),
    }

    println!("\nSite:");
    println!("  Origin: {}", config.site.origin);

    println!("\nOutput:");
    println!("  Checkpoint: {}", config.output.checkpoint_path.display());
    println!("  Output: {}", config.output.output_path.display());

    println!("\n✓ Configuration is valid");
    if Checkpoint::exists(&config.output.checkpoint_path) {
        println!("✓ Would resume the detail phase from the existing checkpoint");
    } else {
        println!("✓ Would start with discovery");
    }

    Ok(())
}

/// Handles the --stats mode: shows progress from the files on disk
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Checkpoint: {}", config.output.checkpoint_path.display());
    println!("Output: {}\n", config.output.output_path.display());

    let stats = load_progress(&config.output.checkpoint_path, &config.output.output_path)?;
    print_progress(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_crawl(
    config: Config,
    proxy_file: Option<&Path>,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh && Checkpoint::remove(&config.output.checkpoint_path)? {
        tracing::info!(
            "Removed checkpoint {}, rediscovering from scratch",
            config.output.checkpoint_path.display()
        );
    }

    let proxies = match proxy_file {
        Some(path) => {
            let proxies = load_proxy_list(path)?;
            tracing::info!("Loaded {} proxies from {}", proxies.len(), path.display());
            proxies
        }
        None => {
            tracing::info!("No proxy list, connecting directly");
            Vec::new()
        }
    };

    let checkpoint_path = config.output.checkpoint_path.clone();
    let output_path = config.output.output_path.clone();

    // Run the harvester
    match run_crawl(config, proxies).await {
        Ok(report) => {
            if let Ok(stats) = load_progress(&checkpoint_path, &output_path) {
                tracing::info!(
                    "Progress: {} of {} businesses scraped, {} remaining",
                    stats.scraped,
                    stats.unique_discovered,
                    stats.remaining
                );
            }
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
