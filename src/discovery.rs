//! Discovery stage: search-query construction and candidate harvesting.
//!
//! Up to two searches are issued against the configured search endpoint,
//! restricted to the wiki domain: title-only first, then first author plus
//! title. Each batch fails independently; a failed batch contributes no
//! links and is only logged.

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::ConnectorConfig;
use crate::extract::{PageError, PageExtractor};
use crate::fetch::{FailureKind, FetchError, PageFetcher, fetch_with_cancel};
use crate::record::{CandidateUrl, Query};

/// Failure of one search batch.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Page(#[from] PageError),
}

/// Joins search terms with `+`, splitting on whitespace and hyphens.
///
/// Each token is percent-encoded.
#[must_use]
pub fn search_terms(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|part| part.split(|c: char| c.is_whitespace() || c == '-'))
        .filter(|token| !token.is_empty())
        .map(|token| urlencoding::encode(token).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

/// Search URLs for `query`, title-only first. Empty when the query has no title.
#[must_use]
pub fn build_search_urls(config: &ConnectorConfig, query: &Query) -> Vec<String> {
    let Some(title) = query.search_title() else {
        return Vec::new();
    };

    let mut urls = vec![search_url(config, &search_terms(&[title]))];
    if let Some(author) = query.first_author() {
        urls.push(search_url(config, &search_terms(&[author, title])));
    }
    urls
}

fn search_url(config: &ConnectorConfig, terms: &str) -> String {
    format!(
        "{}?q=site:{}+{terms}",
        config.search_endpoint.trim_end_matches('?'),
        config.site_domain.trim()
    )
}

/// Produces the ordered candidate list for `query`.
///
/// A pre-supplied ComicWiki identifier comes first with relevance 0; search
/// links equal to it are dropped. Links from the two batches are not
/// deduplicated against each other. Returns an empty list when `cancel`
/// fires before the searches complete.
#[instrument(skip_all, fields(title = ?query.search_title(), author = ?query.first_author()))]
pub async fn discover(
    fetcher: &dyn PageFetcher,
    extractor: &PageExtractor,
    config: &ConnectorConfig,
    query: &Query,
    cancel: &CancellationToken,
) -> Vec<CandidateUrl> {
    let preset = query.comicwiki_id();
    let mut urls: Vec<String> = preset.map(str::to_string).into_iter().collect();

    let searches = build_search_urls(config, query);
    if cancel.is_cancelled() {
        debug!("abort set before search; no candidates");
        return Vec::new();
    }

    let timeout = query.timeout_or(config.default_timeout_secs);
    for search in &searches {
        match search_batch(fetcher, extractor, config, search, timeout, cancel).await {
            Ok(links) => {
                debug!(search = %search, links = links.len(), "search batch harvested");
                urls.extend(links.into_iter().filter(|link| Some(link.as_str()) != preset));
            }
            Err(SearchError::Fetch(e)) if e.kind() == FailureKind::Cancelled => {
                debug!(search = %search, "search batch cancelled");
            }
            Err(e) => warn!(search = %search, error = %e, "search batch failed"),
        }
    }

    if cancel.is_cancelled() {
        debug!("abort set after search; dropping candidates");
        return Vec::new();
    }

    info!(candidates = urls.len(), matches = ?urls, "discovery complete");
    urls.into_iter()
        .enumerate()
        .map(|(rank, url)| CandidateUrl::new(url, rank))
        .collect()
}

async fn search_batch(
    fetcher: &dyn PageFetcher,
    extractor: &PageExtractor,
    config: &ConnectorConfig,
    search: &str,
    timeout: std::time::Duration,
    cancel: &CancellationToken,
) -> Result<Vec<String>, SearchError> {
    let body = fetch_with_cancel(fetcher, search, timeout, cancel).await?;
    Ok(extractor.harvest_links(search, &body, config.max_links_per_search)?)
}
