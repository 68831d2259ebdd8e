use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use venue_extract::config::{AppConfig, VenueConfig, VenueRegistry};
use venue_extract::infra::http_client::{PageFetcher, ReqwestFetcher};
use venue_extract::logging;
use venue_extract::pipeline::processing::dedupe::DedupPolicy;
use venue_extract::pipeline::ExtractionPipeline;
use venue_extract::storage::{EventSink, InMemorySink, JsonLinesSink};
use venue_extract::tasks::{run_venues, VenueStatus};
use venue_extract::VenueRef;

#[derive(Parser)]
#[command(name = "venue_extract")]
#[command(about = "Extracts event listings from venue and city calendar pages")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to config.toml (defaults to $VENUE_EXTRACT_CONFIG or ./config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract events from one page and print them as JSON
    Extract {
        /// Venue config file supplying venue metadata, selectors and policy
        #[arg(long)]
        venue: Option<PathBuf>,
        /// Read HTML from a local file instead of fetching
        #[arg(long)]
        file: Option<PathBuf>,
        /// Page URL; fetched unless --file is given, always used as the link base
        #[arg(long)]
        url: Option<String>,
        /// Venue name when no venue config is given
        #[arg(long)]
        name: Option<String>,
        /// Reference time for year inference, e.g. 2026-03-01T12:00:00
        #[arg(long)]
        now: Option<String>,
        /// Print the full report, including rejections
        #[arg(long)]
        report: bool,
    },
    /// Run every enabled venue in the venues directory
    Run {
        /// Directory of venue TOML files
        #[arg(long)]
        venues: Option<PathBuf>,
        /// JSON-lines output file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Only these venue ids (comma-separated)
        #[arg(long)]
        only: Option<String>,
        /// Maximum venues processed at once
        #[arg(long)]
        concurrency: Option<usize>,
        /// Expose Prometheus metrics on this port while running
        #[arg(long)]
        metrics_port: Option<u16>,
        /// Keep results in memory instead of writing the output file
        #[arg(long)]
        dry_run: bool,
    },
}

fn reference_now(arg: Option<&str>) -> Result<NaiveDateTime> {
    match arg {
        Some(text) => NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
            .with_context(|| format!("Invalid --now '{}'", text)),
        None => Ok(Local::now().naive_local()),
    }
}

fn load_app_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    config.context("Failed to load configuration")
}

#[allow(clippy::too_many_arguments)]
async fn extract(
    app: &AppConfig,
    venue: Option<PathBuf>,
    file: Option<PathBuf>,
    url: Option<String>,
    name: Option<String>,
    now: Option<String>,
    report: bool,
) -> Result<()> {
    let venue_config = match &venue {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Some(VenueConfig::from_toml_str(&content)?)
        }
        None => None,
    };

    let pipeline = match &venue_config {
        Some(config) => ExtractionPipeline::from_config(config)?,
        None => {
            let name = name.unwrap_or_else(|| "Unknown venue".to_string());
            ExtractionPipeline::new(VenueRef::new(name, "", ""), DedupPolicy::HighestScore)
        }
    };

    let Some(page_url) = url.or_else(|| venue_config.as_ref().map(|c| c.venue.url.clone())) else {
        bail!("A page URL is required: pass --url or a --venue config");
    };

    let (html, page_url) = match file {
        Some(path) => {
            let html = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            (html, page_url)
        }
        None => {
            let fetcher = ReqwestFetcher::new(&app.fetch)?;
            let page = fetcher
                .fetch(&page_url)
                .await
                .with_context(|| format!("Failed to fetch {}", page_url))?;
            (page.body, page.url)
        }
    };

    let result = pipeline.run(&html, &page_url, reference_now(now.as_deref())?)?;
    if result.events.is_empty() {
        warn!("No events extracted from {}", page_url);
    }

    let output = if report {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string_pretty(&result.events)?
    };
    println!("{}", output);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run(
    app: &AppConfig,
    venues: Option<PathBuf>,
    output: Option<PathBuf>,
    only: Option<String>,
    concurrency: Option<usize>,
    metrics_port: Option<u16>,
    dry_run: bool,
) -> Result<()> {
    if let Some(port) = metrics_port {
        venue_extract::metrics::init_metrics(port);
    }

    let venues_dir = venues.unwrap_or_else(|| app.run.venues_dir.clone());
    let registry = VenueRegistry::load_from_directory(&venues_dir)
        .with_context(|| format!("Failed to load venues from {}", venues_dir.display()))?;

    let selected: Option<Vec<String>> =
        only.map(|list| list.split(',').map(|s| s.trim().to_string()).collect());
    let configs: Vec<VenueConfig> = registry
        .enabled()
        .filter(|c| {
            selected
                .as_ref()
                .map_or(true, |ids| ids.iter().any(|id| id == c.id()))
        })
        .cloned()
        .collect();
    if configs.is_empty() {
        bail!("No enabled venues selected in {}", venues_dir.display());
    }

    let output = output.unwrap_or_else(|| app.run.output.clone());
    let sink: Arc<dyn EventSink> = if dry_run {
        Arc::new(InMemorySink::new())
    } else {
        Arc::new(JsonLinesSink::new(&output))
    };
    let fetcher: Arc<dyn PageFetcher> = Arc::new(ReqwestFetcher::new(&app.fetch)?);

    info!("Running {} venues", configs.len());
    let outcomes = run_venues(
        configs,
        fetcher,
        sink,
        concurrency.unwrap_or(app.run.max_concurrency),
        Local::now().naive_local(),
    )
    .await;

    let mut total_events = 0;
    for outcome in &outcomes {
        match &outcome.status {
            VenueStatus::Extracted { events, stored, .. } => {
                total_events += events;
                println!("✅ {}: {} events ({} new)", outcome.venue_id, events, stored);
            }
            VenueStatus::Empty { rejected } => {
                println!("⚠️  {}: no events ({} candidates rejected)", outcome.venue_id, rejected);
            }
            VenueStatus::FetchFailed { error } => {
                println!("❌ {}: fetch failed: {}", outcome.venue_id, error);
            }
            VenueStatus::Failed { error } => {
                println!("❌ {}: {}", outcome.venue_id, error);
            }
        }
    }
    println!("\n📊 {} events from {} venues", total_events, outcomes.len());
    if !dry_run {
        println!("   Output file: {}", output.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let app = load_app_config(cli.config.as_ref())?;
    let _log_guard = logging::init_logging(&app.log);

    match cli.command {
        Commands::Extract {
            venue,
            file,
            url,
            name,
            now,
            report,
        } => extract(&app, venue, file, url, name, now, report).await,
        Commands::Run {
            venues,
            output,
            only,
            concurrency,
            metrics_port,
            dry_run,
        } => run(&app, venues, output, only, concurrency, metrics_port, dry_run).await,
    }
}
