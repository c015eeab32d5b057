//! reqwest-backed [`PageFetcher`].
//!
//! Centralizes connector networking defaults: connect timeout, user-agent,
//! gzip, and a per-instance cookie store.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use super::{FetchError, PageFetcher};
use crate::user_agent;

/// HTTP fetcher used for search pages, wiki pages, and cover images.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    /// Builds a fetcher with the given connect timeout.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error when TLS or client construction fails.
    pub fn new(connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(user_agent::default_user_agent())
            .cookie_store(true)
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    #[instrument(skip(self), fields(url = %url, timeout_ms = timeout.as_millis()))]
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        if Url::parse(url).is_err() {
            return Err(FetchError::invalid_url(url));
        }

        let response = self
            .client
            .get(url)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/*;q=0.8,*/*;q=0.5",
            )
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, &e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::not_found(url));
        }
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        let body = read_body(response)
            .await
            .map_err(|e| map_reqwest_error(url, &e))?;
        debug!(bytes = body.len(), "fetched");
        Ok(body)
    }
}

/// Markup is transcoded to UTF-8 from the declared charset; anything else
/// (cover images) is returned untouched.
async fn read_body(response: Response) -> Result<Vec<u8>, reqwest::Error> {
    if is_markup(response.headers()) {
        Ok(response.text().await?.into_bytes())
    } else {
        Ok(response.bytes().await?.to_vec())
    }
}

fn is_markup(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_ascii_lowercase)
        .is_some_and(|mime| {
            mime.starts_with("text/") || mime.contains("html") || mime.contains("xml")
        })
}

fn map_reqwest_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::timeout(url)
    } else {
        FetchError::transport(url, error.to_string())
    }
}
