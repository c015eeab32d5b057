//! Query and result types shared by discovery, workers, and cover resolution.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Display name of this metadata source.
pub const SOURCE_NAME: &str = "ComicWiki";

/// Identifier kind carrying a ComicWiki page URL.
pub const COMICWIKI_ID: &str = "comicwiki";

/// Identifier kind carrying a normalized ISBN.
pub const ISBN_ID: &str = "isbn";

/// Tags attached to every record regardless of page content.
pub const RECORD_TAGS: [&str; 2] = ["Comic", "Graphic Novel"];

/// Metadata fields this source can populate.
pub const TOUCHED_FIELDS: [&str; 9] = [
    "identifier:comicwiki",
    "identifier:isbn",
    "title",
    "authors",
    "series",
    "tags",
    "comments",
    "publisher",
    "pubdate",
];

/// Identifier kind to value mapping supplied by the host.
pub type Identifiers = BTreeMap<String, String>;

/// Lookup request supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Book title, if known.
    pub title: Option<String>,
    /// Authors in host order; only the first is used for searching.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Known identifiers (`comicwiki`, `isbn`, ...).
    #[serde(default)]
    pub identifiers: Identifiers,
    /// Overall network timeout in seconds; falls back to the configured default.
    pub timeout_secs: Option<u64>,
}

impl Query {
    /// Creates a title-only query.
    #[must_use]
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Adds an author.
    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    /// Adds an identifier.
    #[must_use]
    pub fn identifier(mut self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        self.identifiers.insert(kind.into(), value.into());
        self
    }

    /// Sets the network timeout.
    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Title with surrounding whitespace removed, or `None` when blank.
    #[must_use]
    pub fn search_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }

    /// First non-blank author.
    #[must_use]
    pub fn first_author(&self) -> Option<&str> {
        self.authors
            .first()
            .map(|author| author.trim())
            .filter(|author| !author.is_empty())
    }

    /// Pre-supplied ComicWiki identifier, if any.
    #[must_use]
    pub fn comicwiki_id(&self) -> Option<&str> {
        non_blank(self.identifiers.get(COMICWIKI_ID))
    }

    /// Pre-supplied ISBN, if any.
    #[must_use]
    pub fn isbn(&self) -> Option<&str> {
        non_blank(self.identifiers.get(ISBN_ID))
    }

    /// Query timeout, or `default_secs` when unset.
    #[must_use]
    pub fn timeout_or(&self, default_secs: u64) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(default_secs))
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// A page URL suspected to describe the queried book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUrl {
    /// Absolute page URL.
    pub url: String,
    /// Position among discovered candidates, 0 = most relevant.
    pub relevance: usize,
}

impl CandidateUrl {
    #[must_use]
    pub fn new(url: impl Into<String>, relevance: usize) -> Self {
        Self {
            url: url.into(),
            relevance,
        }
    }
}

/// Bibliographic fields extracted from one candidate page.
///
/// Every field is independently optional; partial records are expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub title: Option<String>,
    /// Unique names in first-seen order.
    pub authors: Vec<String>,
    /// Digits only (plus a trailing `X` check digit when present).
    pub isbn: Option<String>,
    /// Escaped HTML text.
    pub comments: Option<String>,
    pub cover_url: Option<String>,
    pub publisher: Option<String>,
    pub series: Option<String>,
    pub series_index: Option<String>,
    /// January 1st of the earliest release year.
    pub pubdate: Option<NaiveDate>,
    pub tags: Vec<String>,
    /// URL of the page the record was extracted from.
    pub source_identifier: String,
    /// Discovery rank of the candidate; never renumbered.
    pub relevance: usize,
}

impl ExtractedRecord {
    /// Creates an empty record for `source_identifier` carrying the constant tag set.
    #[must_use]
    pub fn new(source_identifier: impl Into<String>, relevance: usize) -> Self {
        Self {
            title: None,
            authors: Vec::new(),
            isbn: None,
            comments: None,
            cover_url: None,
            publisher: None,
            series: None,
            series_index: None,
            pubdate: None,
            tags: RECORD_TAGS.iter().map(ToString::to_string).collect(),
            source_identifier: source_identifier.into(),
            relevance,
        }
    }

    /// Identifiers the host should attach to this record.
    #[must_use]
    pub fn identifiers(&self) -> Identifiers {
        let mut identifiers = Identifiers::new();
        identifiers.insert(COMICWIKI_ID.to_string(), self.source_identifier.clone());
        if let Some(isbn) = &self.isbn {
            identifiers.insert(ISBN_ID.to_string(), isbn.clone());
        }
        identifiers
    }
}

/// Page reference for a pre-supplied ComicWiki identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookUrl {
    pub source: &'static str,
    pub id: String,
    pub url: String,
}

/// Downloaded cover image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    /// Name of the source that produced the image.
    pub source: &'static str,
    /// URL the bytes were fetched from.
    pub url: String,
    pub bytes: Vec<u8>,
}
