//! Games-Scraper main entry point
//!
//! This is the command-line interface for the three crawl tasks.

use clap::{Parser, Subcommand};
use games_scraper::config::{load_config_with_hash, load_targets, Config};
use games_scraper::crawler::{
    build_http_client, discover_categories, load_ids, BrowserlessRenderer, DetailCrawler,
    HttpRenderer, ListingRun, ListingSettings, Orchestrator, PageRenderer, PoliteRenderer,
};
use games_scraper::output::{open_details_sink, open_items_sink, print_report};
use games_scraper::robots::{fetch_robots, RobotsRules};
use games_scraper::state::{CrawlState, DetailState, StateGuard, StateStore};
use games_scraper::url::parse_address;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Games-Scraper: an incremental storefront catalog crawler
///
/// Run `categories` once to discover the store's categories, `listings`
/// repeatedly to page through them a few pages per run, and `details` to
/// fetch the full page of every game seen so far.
#[derive(Parser, Debug)]
#[command(name = "games-scraper")]
#[command(version = "1.0.0")]
#[command(about = "An incremental storefront catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    task: Task,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Discard saved progress for the task before running it
    #[arg(long, global = true)]
    fresh: bool,

    /// Validate config and show what would be crawled without fetching anything
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Task {
    /// Discover category names and addresses from the store index page
    Categories,
    /// Page through category listings, resuming where the last run stopped
    Listings,
    /// Fetch the detail page of every game found by the listing crawl
    Details,
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

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let result = match cli.task {
        Task::Categories => handle_categories(&config, cli.dry_run).await,
        Task::Listings => handle_listings(&config, cli.fresh, cli.dry_run, cancel).await,
        Task::Details => handle_details(&config, cli.fresh, cli.dry_run, cancel).await,
    };

    if let Err(e) = &result {
        tracing::error!("{:?} task failed: {}", cli.task, e);
    }
    result
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("games_scraper=info,warn"),
            1 => EnvFilter::new("games_scraper=debug,info"),
            2 => EnvFilter::new("games_scraper=trace,debug"),
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

/// Cancels the token on the first ctrl-c so running tasks stop and save
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, saving progress and stopping");
            cancel.cancel();
        }
    });
}

/// Wraps a renderer with the configured delay and the site's robots.txt
async fn polite<R: PageRenderer>(
    inner: R,
    config: &Config,
    client: &Client,
) -> Result<PoliteRenderer<R>, Box<dyn std::error::Error>> {
    let robots = if config.crawler.obey_robots {
        let site = parse_address(&config.site.index_url)?;
        match fetch_robots(client, &site).await {
            Ok(robots) => robots,
            Err(e) => {
                tracing::warn!("Could not fetch robots.txt, proceeding without it: {}", e);
                RobotsRules::allow_all()
            }
        }
    } else {
        tracing::info!("robots.txt obedience disabled");
        RobotsRules::allow_all()
    };

    Ok(PoliteRenderer::new(
        inner,
        Duration::from_millis(config.crawler.request_delay),
        robots,
        config.user_agent.user_agent.clone(),
    ))
}

/// Handles the `categories` task
async fn handle_categories(config: &Config, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let index = parse_address(&config.site.index_url)?;
    let output = Path::new(&config.output.categories_path);

    let client = build_http_client(&config.user_agent, false)?;
    let renderer = polite(HttpRenderer::new(client.clone()), config, &client).await?;

    let outcome = discover_categories(&renderer, &index, (!dry_run).then_some(output)).await?;

    println!("Categories ({}):", outcome.categories.len());
    for (name, address) in &outcome.categories {
        println!("  - {}: {}", name, address);
    }
    println!();
    print_report(&outcome.report);

    Ok(())
}

/// Handles the `listings` task
async fn handle_listings(
    config: &Config,
    fresh: bool,
    dry_run: bool,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let targets = load_targets(config)?;
    let store = StateStore::new(&config.output.state_path).with_ids_export(&config.output.ids_path);

    if fresh && !dry_run {
        tracing::info!("Starting fresh listing crawl (ignoring previous state)");
        store.reset()?;
    }

    // An unreadable snapshot stops the task before anything is fetched
    let state: CrawlState = store.load()?;

    if dry_run {
        return handle_listings_dry_run(config, &targets, &state);
    }

    let client = build_http_client(&config.user_agent, false)?;
    let renderer = polite(
        BrowserlessRenderer::new(&config.renderer, &config.user_agent),
        config,
        &client,
    )
    .await?;

    let mut sink = open_items_sink(&config.output)?;
    let orchestrator = Orchestrator::new(
        renderer,
        ListingSettings::from_config(&config.crawler),
        cancel,
    )?;

    let ListingRun { mut items, handle } = orchestrator.run(targets, StateGuard::new(state, store));

    let mut sink_error = None;
    while let Some(item) = items.recv().await {
        if let Err(e) = sink.write_item(&item) {
            tracing::error!("Failed to write item {}: {}", item.id, e);
            sink_error = Some(e);
            break;
        }
    }
    // Dropping the stream stops the crawl; items not written stay unseen
    drop(items);

    let outcome = handle.await??;
    sink.finish()?;
    print_report(&outcome.report);

    match sink_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Shows what the next listing run would request
fn handle_listings_dry_run(
    config: &Config,
    targets: &[games_scraper::config::CategoryTarget],
    state: &CrawlState,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Games-Scraper Dry Run: listings ===\n");

    println!("Crawler Configuration:");
    println!("  Pages per category: {}", config.crawler.max_pages_per_category);
    println!("  Page size: {}", config.crawler.page_size);
    println!("  Request delay: {}ms", config.crawler.request_delay);
    println!("  Wait timeout: {}s", config.crawler.wait_timeout);
    println!("  Renderer: {}", config.renderer.endpoint);
    println!("  Obey robots.txt: {}", config.crawler.obey_robots);

    println!("\nState: {}", config.output.state_path);
    println!("  Seen ids: {}", state.seen_ids().len());
    if let Some(saved_at) = state.saved_at() {
        println!("  Last saved: {}", saved_at.to_rfc3339());
    }

    println!("\nCategories ({}):", targets.len());
    for target in targets {
        println!(
            "  - {} [next page: {}] {}",
            target.name,
            state.cursor(&target.name),
            target.base_address
        );
    }

    let pending = targets
        .iter()
        .filter(|t| !state.cursor(&t.name).is_exhausted())
        .count();
    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} of {} categories", pending, targets.len());

    Ok(())
}

/// Handles the `details` task
async fn handle_details(
    config: &Config,
    fresh: bool,
    dry_run: bool,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let ids = load_ids(Path::new(&config.output.ids_path))?;
    let store = StateStore::new(&config.output.detail_state_path);

    if fresh && !dry_run {
        tracing::info!("Starting fresh detail crawl (ignoring previous state)");
        store.reset()?;
    }
    let state: DetailState = store.load()?;

    if dry_run {
        let pending = ids.iter().filter(|id| !state.is_crawled(**id)).count();
        println!("=== Games-Scraper Dry Run: details ===\n");
        println!("  Ids in {}: {}", config.output.ids_path, ids.len());
        println!("  Already crawled: {}", ids.len() - pending);
        println!("\n✓ Would fetch {} detail pages", pending);
        return Ok(());
    }

    let detail_base = parse_address(&config.site.detail_base_url)?;
    let client = build_http_client(&config.user_agent, true)?;
    let renderer = polite(HttpRenderer::new(client.clone()), config, &client).await?;

    let mut sink = open_details_sink(&config.output)?;
    let crawler = DetailCrawler::new(renderer, detail_base, cancel)?;
    let report = crawler
        .crawl(&ids, StateGuard::new(state, store), sink.as_mut())
        .await?;
    print_report(&report);

    Ok(())
}
