//! Candidate Worker: fetch, extract, and publish one candidate page.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::cache::CoverUrlCache;
use crate::extract::{PageError, PageExtractor};
use crate::fetch::{FailureKind, FetchError, PageFetcher, fetch_with_cancel};
use crate::record::{CandidateUrl, ExtractedRecord};

/// Reason a worker finished without publishing.
#[derive(Debug, Error)]
pub enum CandidateError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Page(#[from] PageError),

    /// The abort signal was set before the record could be published.
    #[error("abandoned {url}: abort signal set")]
    Abandoned { url: String },

    /// The receiving half of the output channel is gone.
    #[error("output channel closed before publishing {url}")]
    ChannelClosed { url: String },
}

impl CandidateError {
    /// True when the worker stopped because of the abort signal rather than a failure.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        match self {
            Self::Fetch(e) => e.kind() == FailureKind::Cancelled,
            Self::Abandoned { .. } => true,
            Self::Page(_) | Self::ChannelClosed { .. } => false,
        }
    }
}

/// Shared, cheaply cloneable state every worker task runs with.
#[derive(Clone)]
pub struct CandidateWorker {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<PageExtractor>,
    cache: Arc<dyn CoverUrlCache>,
    page_timeout: Duration,
}

impl std::fmt::Debug for CandidateWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateWorker")
            .field("page_timeout", &self.page_timeout)
            .finish_non_exhaustive()
    }
}

impl CandidateWorker {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<PageExtractor>,
        cache: Arc<dyn CoverUrlCache>,
        page_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            cache,
            page_timeout,
        }
    }

    /// Processes one candidate and publishes at most one record to `sink`.
    ///
    /// Field failures are logged and leave the field unset; they never stop
    /// publication once the page itself parses.
    ///
    /// # Errors
    ///
    /// Returns [`CandidateError`] when the page could not be fetched or
    /// parsed, when `cancel` fired first, or when `sink` is closed. The
    /// caller only uses this for accounting.
    #[instrument(skip(self, candidate, sink, cancel), fields(url = %candidate.url, relevance = candidate.relevance))]
    pub async fn run(
        &self,
        candidate: CandidateUrl,
        sink: &UnboundedSender<ExtractedRecord>,
        cancel: &CancellationToken,
    ) -> Result<(), CandidateError> {
        let body = fetch_with_cancel(
            self.fetcher.as_ref(),
            &candidate.url,
            self.page_timeout,
            cancel,
        )
        .await?;

        // The parsed document is not Send; it must not outlive this call.
        let extraction = self
            .extractor
            .extract(&candidate.url, candidate.relevance, &body)?;

        for failure in &extraction.failures {
            debug!(field = ?failure.field(), error = %failure, "field rule failed");
        }

        let record = extraction.record;
        if let (Some(isbn), Some(cover_url)) = (&record.isbn, &record.cover_url) {
            self.cache.set_cover_url(isbn, cover_url);
        }

        if cancel.is_cancelled() {
            return Err(CandidateError::Abandoned { url: candidate.url });
        }

        info!(
            title = ?record.title,
            isbn = ?record.isbn,
            failed_fields = extraction.failures.len(),
            "publishing record"
        );
        sink.send(record)
            .map_err(|_| CandidateError::ChannelClosed { url: candidate.url })
    }
}
