use crate::fetch::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that authenticates against the hosted backend's
/// REST endpoint.
///
/// The key goes out twice: as the `apikey` header the gateway checks, and as
/// `Authorization: Bearer <key>` for row-level authorization.
pub struct ApiKey<C> {
    inner: C,
    key: HeaderValue,
    bearer: HeaderValue,
}

impl<C> ApiKey<C> {
    /// Fails when `key` cannot be sent as a header value.
    pub fn new(inner: C, key: &str) -> Result<Self> {
        let mut key_value =
            HeaderValue::from_str(key).context("API key is not a valid header value")?;
        key_value.set_sensitive(true);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .context("API key is not a valid header value")?;
        bearer.set_sensitive(true);

        Ok(Self {
            inner,
            key: key_value,
            bearer,
        })
    }

    fn apply(&self, req: &mut reqwest::Request) {
        let headers = req.headers_mut();
        headers.insert(HeaderName::from_static("apikey"), self.key.clone());
        headers.insert(AUTHORIZATION, self.bearer.clone());
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.apply(&mut req);
        self.inner.execute(req).await
    }
}
