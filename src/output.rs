//! Output formatting and persistence for statistics summaries.
//!
//! Supports a plain-text report, JSON serialization, and CSV history append.

use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::analyzers::catalog::CatalogCounts;
use crate::model::OrderStatus;
use crate::stats::StatisticsSummary;

const CURRENCY_SUFFIX: &str = " so'm";
const GROUP_SEPARATOR: char = '\u{a0}';

/// Formats an amount as whole currency units with grouped thousands,
/// e.g. `1 234 567 so'm`. Halves round up.
pub fn format_currency(amount: f64) -> String {
    if amount.is_nan() {
        return format!("NaN{CURRENCY_SUFFIX}");
    }
    if amount.is_infinite() {
        let sign = if amount < 0.0 { "-" } else { "" };
        return format!("{sign}∞{CURRENCY_SUFFIX}");
    }

    let rounded = round_half_up(amount);
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(c);
    }

    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}{CURRENCY_SUFFIX}")
}

/// Nearest integer, with halves going toward positive infinity (-2.5 -> -2).
fn round_half_up(amount: f64) -> f64 {
    let r = amount.round();
    if amount < 0.0 && amount - r == 0.5 {
        r + 1.0
    } else {
        r
    }
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Plain-text rendering of a summary, optionally with catalog counters.
pub struct Report<'a> {
    pub summary: &'a StatisticsSummary,
    pub catalog: Option<&'a CatalogCounts>,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary;

        writeln!(f, "Market statistics (generated {})", timestamp(&s.generated_at))?;
        writeln!(f, "  Total revenue: {}", format_currency(s.total.revenue))?;
        writeln!(f, "  Total orders:  {}", s.total.order_count)?;
        writeln!(f)?;

        writeln!(f, "Revenue by period")?;
        let periods = [
            ("Today", &s.today, &s.windows.day_start),
            ("Week", &s.week, &s.windows.week_start),
            ("Month", &s.month, &s.windows.month_start),
        ];
        for (label, totals, since) in periods {
            writeln!(
                f,
                "  {:<6} since {}  {:>18}  ({} orders)",
                label,
                timestamp(since),
                format_currency(totals.revenue),
                totals.order_count
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Orders by status")?;
        for status in OrderStatus::ALL {
            writeln!(f, "  {:<12}{:>6}", status.as_str(), s.status_counts.get(status))?;
        }

        if let Some(catalog) = self.catalog {
            writeln!(f)?;
            writeln!(f, "Catalog")?;
            writeln!(f, "  Users:             {}", catalog.total_users)?;
            writeln!(f, "  Stores:            {}", catalog.total_stores)?;
            writeln!(f, "  Products:          {}", catalog.total_products)?;
            writeln!(f, "  Active products:   {}", catalog.active_products)?;
            writeln!(f, "  Inactive products: {}", catalog.inactive_products())?;
        }

        if !s.top_stores.is_empty() {
            writeln!(f)?;
            writeln!(f, "Top stores by revenue")?;
            writeln!(f, "  {:<4}{:<28}{:>8}{:>20}", "#", "Store", "Orders", "Revenue")?;
            for (rank, store) in s.top_stores.iter().enumerate() {
                writeln!(
                    f,
                    "  {:<4}{:<28}{:>8}{:>20}",
                    rank + 1,
                    store.store_name,
                    store.order_count,
                    format_currency(store.revenue)
                )?;
            }
        }

        if !s.top_products.is_empty() {
            writeln!(f)?;
            writeln!(f, "Top products by revenue")?;
            writeln!(f, "  {:<4}{:<28}{:>8}{:>20}", "#", "Product", "Sold", "Revenue")?;
            for (rank, product) in s.top_products.iter().enumerate() {
                writeln!(
                    f,
                    "  {:<4}{:<28}{:>8}{:>20}",
                    rank + 1,
                    product.name,
                    product.quantity_sold,
                    format_currency(product.revenue)
                )?;
            }
        }

        Ok(())
    }
}

pub fn render_report(summary: &StatisticsSummary, catalog: Option<&CatalogCounts>) -> String {
    Report { summary, catalog }.to_string()
}

/// Logs a summary using Rust's debug pretty-print format.
pub fn print_pretty(summary: &StatisticsSummary) {
    debug!("{:#?}", summary);
}

/// JSON form of a report: the summary fields with the catalog counters
/// alongside when they were loaded.
#[derive(Serialize)]
pub struct ReportDocument<'a> {
    #[serde(flatten)]
    pub summary: &'a StatisticsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<&'a CatalogCounts>,
}

/// Writes a value to stdout as pretty-printed JSON. Non-finite figures
/// serialize as `null`.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One CSV history line per reduction.
#[derive(Debug, Serialize)]
pub struct SummaryRow {
    pub generated_at: DateTime<Utc>,
    pub total_revenue: f64,
    pub total_orders: usize,
    pub today_revenue: f64,
    pub today_orders: usize,
    pub week_revenue: f64,
    pub week_orders: usize,
    pub month_revenue: f64,
    pub month_orders: usize,
    pub pending_orders: usize,
    pub processing_orders: usize,
    pub delivering_orders: usize,
    pub completed_orders: usize,
    pub cancelled_orders: usize,
    pub top_store: Option<String>,
    pub top_product: Option<String>,
}

impl From<&StatisticsSummary> for SummaryRow {
    fn from(s: &StatisticsSummary) -> Self {
        SummaryRow {
            generated_at: s.generated_at,
            total_revenue: s.total.revenue,
            total_orders: s.total.order_count,
            today_revenue: s.today.revenue,
            today_orders: s.today.order_count,
            week_revenue: s.week.revenue,
            week_orders: s.week.order_count,
            month_revenue: s.month.revenue,
            month_orders: s.month.order_count,
            pending_orders: s.status_counts.pending,
            processing_orders: s.status_counts.processing,
            delivering_orders: s.status_counts.delivering,
            completed_orders: s.status_counts.completed,
            cancelled_orders: s.status_counts.cancelled,
            top_store: s.top_stores.first().map(|st| st.store_name.clone()),
            top_product: s.top_products.first().map(|p| p.name.clone()),
        }
    }
}

/// Appends a [`SummaryRow`] to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, row: &SummaryRow) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer.serialize(row)?;
    writer.flush()?;

    Ok(())
}
