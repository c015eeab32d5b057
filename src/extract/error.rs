//! Error types for page parsing and per-field extraction.

use std::fmt;

use thiserror::Error;

/// Bibliographic field produced by one extraction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Authors,
    Isbn,
    Comments,
    CoverUrl,
    Publisher,
    Series,
    SeriesIndex,
    PubDate,
}

impl Field {
    /// Stable lowercase label used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Authors => "authors",
            Self::Isbn => "isbn",
            Self::Comments => "comments",
            Self::CoverUrl => "cover_url",
            Self::Publisher => "publisher",
            Self::Series => "series",
            Self::SeriesIndex => "series_index",
            Self::PubDate => "pubdate",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single field rule. Never aborts extraction of other fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// The rule's query matched nothing on the page.
    #[error("no match for {field}")]
    NoMatch {
        /// Field whose rule found nothing.
        field: Field,
    },

    /// The rule matched, but the content could not be used.
    #[error("malformed {field}: {reason}")]
    Malformed {
        /// Field whose content was unusable.
        field: Field,
        /// What was wrong with the content.
        reason: String,
    },

    /// A selector in the rule table does not parse.
    #[error("invalid selector for rule `{rule}`: '{selector}'")]
    InvalidSelector {
        /// Name of the rule holding the selector.
        rule: &'static str,
        /// The selector text.
        selector: String,
    },

    /// A URL in the rule table does not parse.
    #[error("invalid origin URL in extraction rules: '{origin}'")]
    InvalidOrigin {
        /// The origin text.
        origin: String,
    },
}

impl ExtractionError {
    #[must_use]
    pub fn no_match(field: Field) -> Self {
        Self::NoMatch { field }
    }

    #[must_use]
    pub fn malformed(field: Field, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            reason: reason.into(),
        }
    }

    /// Field this error belongs to, if it is a per-field failure.
    #[must_use]
    pub fn field(&self) -> Option<Field> {
        match self {
            Self::NoMatch { field } | Self::Malformed { field, .. } => Some(*field),
            Self::InvalidSelector { .. } | Self::InvalidOrigin { .. } => None,
        }
    }
}

/// Failure to turn a response body into a traversable document.
///
/// Any of these abandons the owning worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    /// The body carries the wiki's not-found title marker.
    #[error("page reports not found: {url}")]
    NotFoundMarker {
        /// Page URL.
        url: String,
    },

    /// The body is empty after trimming.
    #[error("page is empty: {url}")]
    EmptyDocument {
        /// Page URL.
        url: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_display_names_field() {
        let err = ExtractionError::no_match(Field::SeriesIndex);
        assert_eq!(err.to_string(), "no match for series_index");
        assert_eq!(err.field(), Some(Field::SeriesIndex));

        let err = ExtractionError::malformed(Field::PubDate, "no numeric tokens");
        assert!(err.to_string().contains("pubdate"));
        assert!(err.to_string().contains("no numeric tokens"));
    }

    #[test]
    fn test_rule_table_errors_have_no_field() {
        let err = ExtractionError::InvalidSelector {
            rule: "title",
            selector: "h1[".to_string(),
        };
        assert_eq!(err.field(), None);
        assert!(err.to_string().contains("h1["));
    }
}
