//! Ranking of identify results against the query that produced them.
//!
//! Records sort by ISBN agreement, then title similarity, then cover
//! availability, then discovery relevance. Lower keys rank first.

use std::cmp::Ordering;

use crate::extract::normalize::normalize_isbn;
use crate::record::{ExtractedRecord, Query};

/// Minimum normalized Levenshtein similarity for a title to count as close.
const SIMILAR_TITLE_THRESHOLD: f64 = 0.7;

/// How closely a record's title matches the queried title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TitleMatch {
    Exact,
    Similar,
    Distant,
}

/// Sort key for one record. Derived ordering is field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RankingKey {
    pub isbn_mismatch: bool,
    pub title: TitleMatch,
    pub missing_cover: bool,
    pub relevance: usize,
}

impl RankingKey {
    #[must_use]
    pub fn for_record(record: &ExtractedRecord, query: &Query) -> Self {
        let isbn_mismatch = match (query.isbn(), record.isbn.as_deref()) {
            (Some(wanted), Some(found)) => normalize_isbn(wanted) != found,
            _ => true,
        };
        Self {
            isbn_mismatch,
            title: title_match(query.search_title(), record.title.as_deref()),
            missing_cover: record.cover_url.is_none(),
            relevance: record.relevance,
        }
    }
}

fn title_match(wanted: Option<&str>, found: Option<&str>) -> TitleMatch {
    let (Some(wanted), Some(found)) = (wanted, found) else {
        return TitleMatch::Distant;
    };
    let wanted = comparable_title(wanted);
    let found = comparable_title(found);
    if wanted == found {
        TitleMatch::Exact
    } else if strsim::normalized_levenshtein(&wanted, &found) >= SIMILAR_TITLE_THRESHOLD {
        TitleMatch::Similar
    } else {
        TitleMatch::Distant
    }
}

fn comparable_title(title: &str) -> String {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sorts `records` best-first for `query`. Stable for equal keys.
pub fn rank_records(records: &mut [ExtractedRecord], query: &Query) {
    records.sort_by(|a, b| compare(a, b, query));
}

fn compare(a: &ExtractedRecord, b: &ExtractedRecord, query: &Query) -> Ordering {
    RankingKey::for_record(a, query).cmp(&RankingKey::for_record(b, query))
}
