//! CLI entry point for the marketplace statistics tool.
//!
//! Loads an order snapshot from a file or URL, reduces it into revenue,
//! status and leaderboard figures, and renders the result.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use market_stats::analyzers::catalog::CatalogCounts;
use market_stats::analyzers::window::WindowBounds;
use market_stats::config::{Settings, parse_utc_offset};
use market_stats::fetch::load_source;
use market_stats::model::OrderRecord;
use market_stats::output::{
    ReportDocument, SummaryRow, append_record, print_json, print_pretty, render_report,
};
use market_stats::parser::{limit_to_latest, parse_catalog, parse_orders};
use market_stats::stats::{StatisticsSummary, reduce};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "market_stats")]
#[command(about = "Roll up marketplace orders into revenue and leaderboard statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize an order snapshot from a file or URL
    Summarize(SummarizeArgs),
    /// Print the day/week/month window cutoffs
    Windows(ClockArgs),
}

#[derive(Args)]
struct ClockArgs {
    /// Evaluate windows as of this RFC 3339 instant instead of the current time
    #[arg(long)]
    now: Option<String>,

    /// Compute windows in this UTC offset (e.g. "+05:00") instead of the local zone
    #[arg(long, allow_hyphen_values = true)]
    utc_offset: Option<String>,
}

#[derive(Args)]
struct SummarizeArgs {
    /// Path to a JSON (or gzipped JSON) snapshot, or a URL to fetch
    #[arg(value_name = "FILE_OR_URL")]
    source: String,

    /// Catalog counters JSON (users, stores, products) to add to the report
    #[arg(short, long)]
    catalog: Option<String>,

    #[command(flatten)]
    clock: ClockArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// CSV file to append a summary row to
    #[arg(long)]
    csv: Option<String>,

    /// Keep only the N newest orders (default: MARKET_STATS_SNAPSHOT_LIMIT or 1000)
    #[arg(short, long)]
    limit: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file
    let settings = Settings::from_env()?;

    // Logging setup: colored stderr + JSON rolling log file
    let log_dir = Path::new(&settings.log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&settings.log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("market_stats.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Summarize(args) => summarize(args, &settings).await?,
        Commands::Windows(clock) => {
            let instant = resolve_instant(clock.now.as_deref())?;
            let offset = resolve_offset(clock.utc_offset.as_deref(), &settings)?;
            let bounds = match offset {
                Some(offset) => WindowBounds::from_now(&instant.with_timezone(&offset)),
                None => WindowBounds::from_now(&instant.with_timezone(&Local)),
            };
            print_json(&bounds)?;
        }
    }

    Ok(())
}

/// Loads, bounds and reduces a snapshot, then renders and records the result.
#[tracing::instrument(skip_all, fields(source = %args.source))]
async fn summarize(args: SummarizeArgs, settings: &Settings) -> Result<()> {
    let api_key = settings.api_key.as_deref();
    let limit = args.limit.unwrap_or(settings.snapshot_limit);

    let bytes = load_source(&args.source, api_key).await?;
    let orders = parse_orders(&bytes)?;
    let fetched = orders.len();
    let orders = limit_to_latest(orders, limit);
    info!(fetched, kept = orders.len(), limit, "Order snapshot ready");

    let catalog = match &args.catalog {
        Some(path) => {
            let bytes = load_source(path, api_key).await?;
            Some(CatalogCounts::from_snapshot(&parse_catalog(&bytes)?))
        }
        None => None,
    };

    let instant = resolve_instant(args.clock.now.as_deref())?;
    let offset = resolve_offset(args.clock.utc_offset.as_deref(), settings)?;
    let summary = reduce_at(&orders, instant, offset);

    print_pretty(&summary);
    if summary.is_poisoned() {
        warn!("Summary contains non-numeric figures; check line item quantity and price upstream");
    }

    match args.format {
        Format::Text => print!("{}", render_report(&summary, catalog.as_ref())),
        Format::Json => print_json(&ReportDocument {
            summary: &summary,
            catalog: catalog.as_ref(),
        })?,
    }

    if let Some(path) = &args.csv {
        append_record(path, &SummaryRow::from(&summary))?;
        info!(path = %path, "Summary row appended");
    }

    info!(
        total_orders = summary.total.order_count,
        stores = summary.top_stores.len(),
        products = summary.top_products.len(),
        "Statistics summarized"
    );
    Ok(())
}

/// Windows follow `offset` when given, the host's local zone otherwise.
fn reduce_at(
    orders: &[OrderRecord],
    instant: DateTime<Utc>,
    offset: Option<FixedOffset>,
) -> StatisticsSummary {
    match offset {
        Some(offset) => reduce(orders, &instant.with_timezone(&offset)),
        None => reduce(orders, &instant.with_timezone(&Local)),
    }
}

fn resolve_instant(now: Option<&str>) -> Result<DateTime<Utc>> {
    match now {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("--now is not an RFC 3339 timestamp: '{raw}'"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn resolve_offset(flag: Option<&str>, settings: &Settings) -> Result<Option<FixedOffset>> {
    match flag {
        Some(raw) => parse_utc_offset(raw).map(Some),
        None => Ok(settings.utc_offset),
    }
}
