//! Outbound link harvesting from a search-results page.

use url::Url;

use super::PageError;
use super::normalize::absolutize_url;
use super::page::{PageExtractor, decode_body};

/// Result-link placeholder anchors that never lead to a page.
const PLACEHOLDER_HREF: &str = "#";

impl PageExtractor {
    /// First `limit` result links of a search-results page, in page order.
    ///
    /// Placeholder anchors and links without `href` are skipped before the
    /// limit applies. Relative links are qualified against `url`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] when the body is empty.
    pub fn harvest_links(
        &self,
        url: &str,
        body: &[u8],
        limit: usize,
    ) -> Result<Vec<String>, PageError> {
        let markup = decode_body(url, body)?;
        let document = scraper::Html::parse_document(&markup);
        let base = Url::parse(url).unwrap_or_else(|_| self.origin().clone());

        Ok(document
            .select(&self.rules.search_result_link)
            .filter_map(|link| link.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty() && *href != PLACEHOLDER_HREF)
            .filter_map(|href| absolutize_url(href, &base))
            .take(limit)
            .collect())
    }
}
