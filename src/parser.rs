//! Decoder for order-graph snapshots.
//!
//! The backend's nested select returns loosely typed JSON: amounts may be
//! numbers or numeric strings, references may be `null`. This module maps
//! that payload onto [`crate::model`], coercing fields the way the storefront
//! always has instead of rejecting rows.

use std::borrow::Cow;
use std::io::Read;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::analyzers::catalog::CatalogSnapshot;
use crate::model::{LineItem, OrderRecord, OrderStatus, ProductRef};

/// Upper bound the statistics screen has always queried with.
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 1000;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Deserialize)]
struct OrderRow {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    total_amount: Value,
    #[serde(default)]
    status: Value,
    #[serde(default)]
    created_at: Value,
    #[serde(default)]
    order_items: Value,
}

impl OrderRow {
    fn into_record(self) -> OrderRecord {
        let id = id_string(&self.id);

        let status = self.status.as_str().and_then(OrderStatus::parse);
        if status.is_none() {
            debug!(order_id = %id, status = %self.status, "Order status not recognized");
        }

        let total_amount = match lenient_float(&self.total_amount) {
            t if t.is_nan() => 0.0,
            t => t,
        };

        // anything but an array carries no line items
        let items: Vec<LineItem> = match &self.order_items {
            Value::Array(rows) => rows.iter().map(line_item).collect(),
            _ => Vec::new(),
        };

        if items
            .iter()
            .any(|i| i.quantity.is_nan() || i.unit_price.is_nan())
        {
            warn!(order_id = %id, "Line item quantity or price is not numeric");
        }

        OrderRecord {
            created_at: parse_timestamp(&self.created_at),
            id,
            total_amount,
            status,
            items,
        }
    }
}

fn line_item(row: &Value) -> LineItem {
    LineItem {
        quantity: lenient_int(&row["quantity"]),
        unit_price: lenient_float(&row["price"]),
        product: product_ref(&row["products"]),
    }
}

/// Only an object counts as a product reference.
fn product_ref(row: &Value) -> Option<ProductRef> {
    if !row.is_object() {
        return None;
    }

    let store_id = Some(id_string(&row["store_id"])).filter(|s| !s.is_empty());
    Some(ProductRef {
        id: id_string(&row["id"]),
        name: text(&row["name"]),
        store_id,
        store_name: text(&row["stores"]["name"]),
    })
}

fn text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Decodes an order snapshot, plain or gzip-compressed JSON.
///
/// # Errors
///
/// Returns an error if the bytes are not a JSON array of order objects.
pub fn parse_orders(bytes: &[u8]) -> Result<Vec<OrderRecord>> {
    let json = decompress(bytes)?;
    let rows: Vec<OrderRow> =
        serde_json::from_slice(&json).context("order snapshot is not a JSON array of orders")?;

    Ok(rows.into_iter().map(OrderRow::into_record).collect())
}

/// Decodes the catalog counters document, plain or gzip-compressed JSON.
pub fn parse_catalog(bytes: &[u8]) -> Result<CatalogSnapshot> {
    let json = decompress(bytes)?;
    serde_json::from_slice(&json).context("catalog snapshot is not a valid JSON object")
}

/// Keeps the `limit` newest orders, newest first. Orders without a
/// timestamp sort after every dated one.
pub fn limit_to_latest(mut orders: Vec<OrderRecord>, limit: usize) -> Vec<OrderRecord> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders.truncate(limit);
    orders
}

fn decompress(bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(bytes));
    }

    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .context("failed to decompress gzip snapshot")?;
    debug!(compressed = bytes.len(), decompressed = out.len(), "Snapshot decompressed");
    Ok(Cow::Owned(out))
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// RFC 3339, or a bare `YYYY-MM-DDTHH:MM:SS[.f]` read as UTC.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|t| t.and_utc())
}

/// Leading-integer read of a number or string. Fractions truncate toward
/// zero; anything without leading digits is NaN.
pub fn lenient_int(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().map_or(f64::NAN, f64::trunc),
        Value::String(s) => int_prefix(s),
        _ => f64::NAN,
    }
}

/// Leading-decimal read of a number or string; NaN when nothing parses.
pub fn lenient_float(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => float_prefix(s),
        _ => f64::NAN,
    }
}

fn int_prefix(s: &str) -> f64 {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1.0, &s[1..]),
        Some(b'+') => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return f64::NAN;
    }
    rest[..digits].parse::<f64>().map_or(f64::NAN, |v| sign * v)
}

fn float_prefix(s: &str) -> f64 {
    let s = s.trim_start();
    let candidate = s
        .bytes()
        .take_while(|b| b.is_ascii_digit() || matches!(*b, b'+' | b'-' | b'.' | b'e' | b'E'))
        .count();

    (1..=candidate)
        .rev()
        .find_map(|end| s[..end].parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}
