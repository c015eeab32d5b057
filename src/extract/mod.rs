//! Site-specific markup extraction.
//!
//! # Architecture
//!
//! - [`SiteRules`] - Declarative field → query table for the wiki templates
//! - [`PageExtractor`] - Compiled rules; per-field extraction and search-link harvesting
//! - [`PageExtraction`] - Partial record plus the list of failed field rules
//! - [`normalize`] - Text, ISBN, year, and URL post-processing
//!
//! The heuristics are deliberately brittle: a template change degrades
//! individual fields instead of failing the page.

mod error;
mod links;
pub mod normalize;
mod page;
mod rules;

pub use error::{ExtractionError, Field, PageError};
pub use page::{PageExtraction, PageExtractor};
pub use rules::{CommentAnchor, SiteRules};
