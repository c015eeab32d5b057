//! Identifier → cover URL cache.
//!
//! The host owns the real cache; [`InMemoryCoverCache`] is the default used
//! when none is supplied. Writes are best-effort and last-writer-wins.

use dashmap::DashMap;
use tracing::debug;

/// Key/value store mapping an identifier (normally an ISBN) to a cover URL.
pub trait CoverUrlCache: Send + Sync {
    /// Returns the cached cover URL for `identifier`.
    fn get_cover_url(&self, identifier: &str) -> Option<String>;

    /// Records `url` as the cover for `identifier`, replacing any previous value.
    fn set_cover_url(&self, identifier: &str, url: &str);
}

/// Process-local [`CoverUrlCache`] backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryCoverCache {
    entries: DashMap<String, String>,
}

impl InMemoryCoverCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CoverUrlCache for InMemoryCoverCache {
    fn get_cover_url(&self, identifier: &str) -> Option<String> {
        self.entries
            .get(identifier.trim())
            .map(|entry| entry.value().clone())
    }

    fn set_cover_url(&self, identifier: &str, url: &str) {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return;
        }
        debug!(identifier, url, "caching cover url");
        self.entries.insert(identifier.to_string(), url.to_string());
    }
}
