//! ComicWiki Core Library
//!
//! Metadata lookup against the Danish comics wiki ComicWiki.dk. A query
//! (title, authors, identifiers) is turned into site-restricted web
//! searches; each result page is fetched and scraped concurrently into a
//! partial bibliographic record. A cover image can be resolved from the
//! same pipeline.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`record`] - Query and record types, identifier kinds
//! - [`config`] - Connector tunables with validation
//! - [`fetch`] - HTTP fetching behind the [`PageFetcher`] seam, cancellation-aware
//! - [`extract`] - Declarative site rules and per-field page extraction
//! - [`cache`] - Identifier to cover URL cache
//! - [`discovery`] - Search-query construction and candidate harvesting
//! - [`worker`] - One fetch-extract-publish unit per candidate
//! - [`identify`] - Bounded, cancellable fan-out over candidates
//! - [`ranking`] - Result ordering against the query
//! - [`cover`] - Cover URL resolution and download
//! - [`source`] - [`ComicWikiSource`], the host-facing entry point

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod cover;
pub mod discovery;
pub mod extract;
pub mod fetch;
pub mod identify;
pub mod ranking;
pub mod record;
pub mod source;
mod user_agent;
pub mod worker;

// Re-export commonly used types
pub use cache::{CoverUrlCache, InMemoryCoverCache};
pub use config::{ConfigError, ConnectorConfig};
pub use extract::{ExtractionError, Field, PageError, PageExtraction, PageExtractor, SiteRules};
pub use fetch::{FailureKind, FetchError, HttpPageFetcher, PageFetcher, fetch_with_cancel};
pub use identify::{Coordinator, IdentifyStats, collect_ranked};
pub use ranking::{RankingKey, rank_records};
pub use record::{
    BookUrl, COMICWIKI_ID, CandidateUrl, CoverImage, ExtractedRecord, ISBN_ID, Identifiers, Query,
    RECORD_TAGS, SOURCE_NAME,
};
pub use source::{ComicWikiSource, SourceError};
pub use worker::{CandidateError, CandidateWorker};
