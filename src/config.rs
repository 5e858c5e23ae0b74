//! Runtime settings read from the environment (after `.env` is loaded).

use anyhow::{Context, Result, bail};
use chrono::FixedOffset;

use crate::parser::DEFAULT_SNAPSHOT_LIMIT;

pub const DEFAULT_LOG_FILE: &str = "logs/market_stats.log";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub log_file_path: String,
    /// Key for the backend's REST endpoint, used only for remote sources.
    pub api_key: Option<String>,
    /// Zone the windows are computed in; `None` means the host's local zone.
    pub utc_offset: Option<FixedOffset>,
    pub snapshot_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            log_file_path: DEFAULT_LOG_FILE.to_string(),
            api_key: None,
            utc_offset: None,
            snapshot_limit: DEFAULT_SNAPSHOT_LIMIT,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup. Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Settings::default();

        let utc_offset = get("MARKET_STATS_UTC_OFFSET")
            .map(|raw| parse_utc_offset(&raw))
            .transpose()?;

        let snapshot_limit = match get("MARKET_STATS_SNAPSHOT_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("MARKET_STATS_SNAPSHOT_LIMIT is not a count: '{raw}'"))?,
            None => defaults.snapshot_limit,
        };

        Ok(Settings {
            log_file_path: get("LOG_FILE_PATH").unwrap_or(defaults.log_file_path),
            api_key: get("MARKET_STATS_API_KEY"),
            utc_offset,
            snapshot_limit,
        })
    }
}

/// Parses `+HH:MM`, `-HH:MM`, `+HHMM`, `+HH` or `Z`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).context("zero offset");
    }

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => bail!("UTC offset must start with '+' or '-': '{raw}'"),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        bail!("UTC offset must look like +HH:MM: '{raw}'");
    }
    let (hours, minutes) = match digits.len() {
        2 => (&digits[..2], "0"),
        4 => (&digits[..2], &digits[2..]),
        _ => bail!("UTC offset must look like +HH:MM: '{raw}'"),
    };

    let hours: i32 = hours
        .parse()
        .with_context(|| format!("invalid hours in UTC offset '{raw}'"))?;
    let minutes: i32 = minutes
        .parse()
        .with_context(|| format!("invalid minutes in UTC offset '{raw}'"))?;
    if minutes >= 60 {
        bail!("invalid minutes in UTC offset '{raw}'");
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .with_context(|| format!("UTC offset out of range: '{raw}'"))
}
