//! Snapshot loading from a local path or an HTTP(S) endpoint.

mod basic;
mod client;
pub mod auth;

pub use auth::ApiKey;
pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use tracing::debug;

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("snapshot request to {url} returned status {status}");
    }
    Ok(resp.bytes().await?.to_vec())
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Reads `source` from disk, or fetches it when it is an HTTP(S) URL.
/// `api_key`, when given, authenticates the request against the backend.
#[tracing::instrument(skip(api_key), fields(source = %source))]
pub async fn load_source(source: &str, api_key: Option<&str>) -> Result<Vec<u8>> {
    let bytes = if is_remote(source) {
        match api_key {
            Some(key) => fetch_bytes(&ApiKey::new(BasicClient::new(), key)?, source).await?,
            None => fetch_bytes(&BasicClient::new(), source).await?,
        }
    } else {
        tokio::fs::read(source)
            .await
            .with_context(|| format!("failed to read snapshot file '{source}'"))?
    };

    debug!(bytes = bytes.len(), "Snapshot loaded");
    Ok(bytes)
}
