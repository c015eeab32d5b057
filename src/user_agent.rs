//! Shared User-Agent string for search, page, and cover requests.

/// Product token identifying the connector.
const PRODUCT: &str = "comicwiki";

/// Default User-Agent for every request made by the connector.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (metadata-lookup)")
}
