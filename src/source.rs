//! [`ComicWikiSource`]: the entry point a host application talks to.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cache::{CoverUrlCache, InMemoryCoverCache};
use crate::config::{ConfigError, ConnectorConfig};
use crate::cover;
use crate::extract::{ExtractionError, PageExtractor, SiteRules};
use crate::fetch::{HttpPageFetcher, PageFetcher};
use crate::identify::{Coordinator, IdentifyStats};
use crate::record::{
    BookUrl, COMICWIKI_ID, CoverImage, ExtractedRecord, Identifiers, Query, SOURCE_NAME,
    TOUCHED_FIELDS,
};

/// Errors raised while constructing a source. Lookups themselves never fail.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid extraction rules: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Metadata source for ComicWiki.dk.
///
/// Cheap to clone; clones share the HTTP client and the cover cache.
#[derive(Debug, Clone)]
pub struct ComicWikiSource {
    coordinator: Coordinator,
}

impl ComicWikiSource {
    /// Creates a source with the reqwest fetcher and an in-memory cover cache.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when `config` is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: ConnectorConfig) -> Result<Self, SourceError> {
        config.validate()?;
        let fetcher = HttpPageFetcher::new(config.connect_timeout())?;
        Self::with_parts(config, Arc::new(fetcher), Arc::new(InMemoryCoverCache::new()))
    }

    /// Creates a source over host-supplied collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when `config` is invalid or the site origin
    /// does not parse.
    pub fn with_parts(
        config: ConnectorConfig,
        fetcher: Arc<dyn PageFetcher>,
        cache: Arc<dyn CoverUrlCache>,
    ) -> Result<Self, SourceError> {
        config.validate()?;
        let extractor = PageExtractor::new(&SiteRules::comicwiki(config.site_origin.clone()))?;
        debug!(origin = %config.site_origin, "comicwiki source ready");
        Ok(Self {
            coordinator: Coordinator::new(fetcher, Arc::new(extractor), cache, Arc::new(config)),
        })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    #[must_use]
    pub fn touched_fields(&self) -> &'static [&'static str] {
        &TOUCHED_FIELDS
    }

    #[must_use]
    pub fn config(&self) -> &ConnectorConfig {
        self.coordinator.config()
    }

    /// Looks up candidate records for `query`, delivering them to `sink`.
    pub async fn identify(
        &self,
        query: &Query,
        sink: &UnboundedSender<ExtractedRecord>,
        cancel: &CancellationToken,
    ) -> IdentifyStats {
        self.coordinator.identify(query, sink, cancel).await
    }

    /// Finds and downloads a cover for `query`. Returns whether one was delivered.
    pub async fn download_cover(
        &self,
        query: &Query,
        sink: &UnboundedSender<CoverImage>,
        cancel: &CancellationToken,
    ) -> bool {
        cover::download_cover(&self.coordinator, query, sink, cancel).await
    }

    /// Page reference for a pre-supplied `comicwiki` identifier.
    #[must_use]
    pub fn book_url(&self, identifiers: &Identifiers) -> Option<BookUrl> {
        let id = identifiers
            .get(COMICWIKI_ID)
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())?;
        Some(BookUrl {
            source: SOURCE_NAME,
            id: id.to_string(),
            url: id.to_string(),
        })
    }

    /// Cover URL cached for the `isbn` identifier.
    #[must_use]
    pub fn cached_cover_url(&self, identifiers: &Identifiers) -> Option<String> {
        cover::cached_cover_url(self.coordinator.cache(), identifiers)
    }
}
