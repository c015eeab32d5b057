//! Page fetching: the [`PageFetcher`] seam, its reqwest implementation, and
//! cancellation-aware fetching.
//!
//! Every network read in the connector goes through [`fetch_with_cancel`], so
//! the abort signal is observed at each suspension point rather than only
//! between steps.

mod error;
mod http_client;

pub use error::{FailureKind, FetchError};
pub use http_client::HttpPageFetcher;

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Fetches raw bytes for a URL under a timeout.
///
/// Implementations must be stateless per call and safe to share across
/// concurrently running workers.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns the response body, or a classified failure.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError>;
}

/// Runs `fetcher.fetch` unless `cancel` fires first.
///
/// Returns [`FetchError::Cancelled`] without issuing a request when the token
/// is already cancelled.
///
/// # Errors
///
/// Propagates the fetcher's error, or [`FetchError::Cancelled`].
pub async fn fetch_with_cancel(
    fetcher: &dyn PageFetcher,
    url: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, FetchError> {
    if cancel.is_cancelled() {
        return Err(FetchError::cancelled(url));
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(FetchError::cancelled(url)),
        result = fetcher.fetch(url, timeout) => result,
    }
}
