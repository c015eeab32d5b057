//! Cover Resolution: pick a cover URL for a query and fetch its bytes.
//!
//! A cached URL keyed on the query's ISBN wins. Otherwise a full identify
//! run feeds the cache as a side effect, its records are ranked, and the
//! first record whose ISBN now resolves in the cache supplies the URL.
//! Nothing here ever returns an error to the caller.

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::CoverUrlCache;
use crate::extract::normalize::normalize_isbn;
use crate::fetch::fetch_with_cancel;
use crate::identify::{Coordinator, collect_ranked};
use crate::ranking::rank_records;
use crate::record::{CoverImage, ISBN_ID, Identifiers, Query, SOURCE_NAME};

/// Cover URL cached for the `isbn` identifier, if any.
#[must_use]
pub fn cached_cover_url(cache: &dyn CoverUrlCache, identifiers: &Identifiers) -> Option<String> {
    let isbn = normalize_isbn(identifiers.get(ISBN_ID)?);
    if isbn.is_empty() {
        return None;
    }
    cache.get_cover_url(&isbn)
}

/// Resolves and downloads a cover for `query`, delivering it to `sink`.
///
/// Returns whether an image was delivered. Every failure, including the
/// abort signal, ends the attempt silently after logging.
#[instrument(skip_all, fields(title = ?query.search_title(), isbn = ?query.isbn()))]
pub async fn download_cover(
    coordinator: &Coordinator,
    query: &Query,
    sink: &UnboundedSender<CoverImage>,
    cancel: &CancellationToken,
) -> bool {
    let cached = cached_cover_url(coordinator.cache(), &query.identifiers);
    let url = match cached {
        Some(url) => {
            debug!(url = %url, "using cached cover url");
            Some(url)
        }
        None => resolve_through_identify(coordinator, query, cancel).await,
    };

    let Some(url) = url else {
        info!("no cover url found");
        return false;
    };
    if cancel.is_cancelled() {
        debug!("abort set before cover fetch");
        return false;
    }

    let timeout = query.timeout_or(coordinator.config().default_timeout_secs);
    let bytes = match fetch_with_cancel(coordinator.fetcher(), &url, timeout, cancel).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(url = %url, error = %e, "failed to download cover");
            return false;
        }
    };

    if cancel.is_cancelled() {
        debug!(url = %url, "abort set after cover fetch; discarding");
        return false;
    }

    info!(url = %url, bytes = bytes.len(), "cover downloaded");
    sink.send(CoverImage {
        source: SOURCE_NAME,
        url,
        bytes,
    })
    .is_ok()
}

async fn resolve_through_identify(
    coordinator: &Coordinator,
    query: &Query,
    cancel: &CancellationToken,
) -> Option<String> {
    if cancel.is_cancelled() {
        return None;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    coordinator.identify(query, &tx, cancel).await;
    drop(tx);

    if cancel.is_cancelled() {
        debug!("abort set after identify; skipping cover scan");
        return None;
    }

    let mut records = collect_ranked(&mut rx);
    rank_records(&mut records, query);

    records.iter().find_map(|record| {
        let isbn = record.isbn.as_deref()?;
        let url = coordinator.cache().get_cover_url(isbn)?;
        debug!(source = %record.source_identifier, url = %url, "cover url resolved from identify");
        Some(url)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::cache::InMemoryCoverCache;
    use crate::config::ConnectorConfig;
    use crate::discovery::build_search_urls;
    use crate::extract::{PageExtractor, SiteRules};
    use crate::fetch::{FetchError, PageFetcher};

    #[derive(Default)]
    struct FakeSite {
        pages: HashMap<String, Vec<u8>>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeSite {
        fn page(mut self, url: impl Into<String>, body: impl AsRef<[u8]>) -> Self {
            self.pages.insert(url.into(), body.as_ref().to_vec());
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for FakeSite {
        async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::not_found(url))
        }
    }

    fn coordinator(site: Arc<FakeSite>, cache: Arc<InMemoryCoverCache>) -> Coordinator {
        let config = ConnectorConfig {
            spawn_stagger_ms: 0,
            ..ConnectorConfig::default()
        };
        let extractor = PageExtractor::new(&SiteRules::comicwiki(&config.site_origin)).unwrap();
        Coordinator::new(site, Arc::new(extractor), cache, Arc::new(config))
    }

    fn detail_page(title: &str, isbn: &str, image: &str) -> String {
        format!(
            r#"<html><body><h1 class="firstHeading">{title}</h1>
<a class="mw-magiclink-isbn" href="/isbn">ISBN {isbn}</a>
<div class="aib-image"><img src="{image}"></div></body></html>"#
        )
    }

    #[tokio::test]
    async fn test_cached_url_skips_identify() {
        let cache = Arc::new(InMemoryCoverCache::new());
        cache.set_cover_url("9788711222222", "https://comicwiki.dk/images/Klo.jpg");
        let site = Arc::new(FakeSite::default().page("https://comicwiki.dk/images/Klo.jpg", b"JPEG"));
        let coordinator = coordinator(Arc::clone(&site), cache);
        let query = Query::with_title("Klo").identifier(ISBN_ID, "978-87-11-22222-2");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let delivered = download_cover(&coordinator, &query, &tx, &CancellationToken::new()).await;

        assert!(delivered);
        assert_eq!(site.requests(), vec!["https://comicwiki.dk/images/Klo.jpg"]);
        let image = rx.try_recv().unwrap();
        assert_eq!(image.source, "ComicWiki");
        assert_eq!(image.bytes, b"JPEG");
    }

    #[tokio::test]
    async fn test_identify_feeds_cache_then_best_ranked_cover_is_fetched() {
        let cache = Arc::new(InMemoryCoverCache::new());
        let query = Query::with_title("Klo");
        let search = build_search_urls(&ConnectorConfig::default(), &query).remove(0);
        let results = r#"<div class="g"><a href="https://comicwiki.dk/wiki/Asterix">a</a></div>
<div class="g"><a href="https://comicwiki.dk/wiki/Klo">k</a></div>"#;
        let site = Arc::new(
            FakeSite::default()
                .page(search, results)
                .page(
                    "https://comicwiki.dk/wiki/Asterix",
                    detail_page("Asterix", "978-87-00-00000-1", "/images/Asterix.jpg"),
                )
                .page(
                    "https://comicwiki.dk/wiki/Klo",
                    detail_page("Klo", "978-87-11-22222-2", "/images/Klo.jpg"),
                )
                .page("https://comicwiki.dk/images/Klo.jpg", b"KLO"),
        );
        let coordinator = coordinator(Arc::clone(&site), Arc::clone(&cache));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let delivered = download_cover(&coordinator, &query, &tx, &CancellationToken::new()).await;

        assert!(delivered);
        assert_eq!(cache.len(), 2);
        let image = rx.try_recv().unwrap();
        assert_eq!(image.url, "https://comicwiki.dk/images/Klo.jpg");
        assert_eq!(image.bytes, b"KLO");
    }

    #[tokio::test]
    async fn test_no_candidates_means_no_cover() {
        let site = Arc::new(FakeSite::default());
        let coordinator = coordinator(site, Arc::new(InMemoryCoverCache::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let delivered =
            download_cover(&coordinator, &Query::with_title("Klo"), &tx, &CancellationToken::new())
                .await;

        assert!(!delivered);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_image_fetch_is_swallowed() {
        let cache = Arc::new(InMemoryCoverCache::new());
        cache.set_cover_url("9788711222222", "https://comicwiki.dk/images/gone.jpg");
        let coordinator = coordinator(Arc::new(FakeSite::default()), cache);
        let query = Query::default().identifier(ISBN_ID, "9788711222222");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let delivered = download_cover(&coordinator, &query, &tx, &CancellationToken::new()).await;

        assert!(!delivered);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch_delivers_nothing() {
        let cache = Arc::new(InMemoryCoverCache::new());
        cache.set_cover_url("9788711222222", "https://comicwiki.dk/images/Klo.jpg");
        let site = Arc::new(FakeSite::default().page("https://comicwiki.dk/images/Klo.jpg", b"JPEG"));
        let coordinator = coordinator(Arc::clone(&site), cache);
        let query = Query::default().identifier(ISBN_ID, "9788711222222");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let delivered = download_cover(&coordinator, &query, &tx, &cancel).await;

        assert!(!delivered);
        assert!(site.requests().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cached_cover_url_normalizes_isbn() {
        let cache = InMemoryCoverCache::new();
        cache.set_cover_url("9788711222222", "https://comicwiki.dk/images/Klo.jpg");

        let query = Query::default().identifier(ISBN_ID, "ISBN 978-87-11-22222-2");
        assert_eq!(
            cached_cover_url(&cache, &query.identifiers).as_deref(),
            Some("https://comicwiki.dk/images/Klo.jpg")
        );
        assert_eq!(cached_cover_url(&cache, &Identifiers::new()), None);
    }
}
