//! Per-field extraction from one wiki detail page.
//!
//! Every field is computed by an independent rule returning
//! `Result<T, ExtractionError>`. A failing rule leaves its field unset and is
//! reported in [`PageExtraction::failures`]; the remaining rules still run.

use std::borrow::Cow;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::normalize::{
    absolutize_url, collapse_whitespace, earliest_year, escape_html, january_first,
    normalize_isbn,
};
use super::rules::{CommentAnchor, CompiledRules, SiteRules};
use super::{ExtractionError, Field, PageError};
use crate::record::ExtractedRecord;

/// Applies a [`SiteRules`] table to page markup.
#[derive(Debug)]
pub struct PageExtractor {
    pub(super) rules: CompiledRules,
}

/// Partial record plus the field rules that failed while building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageExtraction {
    pub record: ExtractedRecord,
    pub failures: Vec<ExtractionError>,
}

impl PageExtractor {
    /// Compiles `rules` into an extractor.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::InvalidSelector`] or
    /// [`ExtractionError::InvalidOrigin`] when the table does not compile.
    pub fn new(rules: &SiteRules) -> Result<Self, ExtractionError> {
        Ok(Self {
            rules: CompiledRules::compile(rules)?,
        })
    }

    /// Origin relative links are qualified against.
    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.rules.origin
    }

    /// Decodes a response body into a document, rejecting not-found pages.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] when the body is empty or carries the not-found
    /// marker. Bytes that are not UTF-8 are replaced, never rejected.
    pub fn parse_page(&self, url: &str, body: &[u8]) -> Result<Html, PageError> {
        let markup = decode_body(url, body)?;
        if !self.rules.not_found_marker.is_empty() && markup.contains(&self.rules.not_found_marker)
        {
            return Err(PageError::NotFoundMarker {
                url: url.to_string(),
            });
        }
        Ok(Html::parse_document(&markup))
    }

    /// Parses `body` and runs every field rule against it.
    ///
    /// The result depends only on the markup, the URL, and the relevance.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] when the page cannot be parsed at all.
    pub fn extract(
        &self,
        url: &str,
        relevance: usize,
        body: &[u8],
    ) -> Result<PageExtraction, PageError> {
        let document = self.parse_page(url, body)?;
        Ok(self.extract_document(&document, url, relevance))
    }

    /// Runs every field rule against an already parsed document.
    #[must_use]
    pub fn extract_document(&self, document: &Html, url: &str, relevance: usize) -> PageExtraction {
        let mut failures = Vec::new();
        let mut record = ExtractedRecord::new(url, relevance);

        record.title = keep(&mut failures, self.title(document));
        record.authors = keep(&mut failures, self.authors(document)).unwrap_or_default();
        record.isbn = keep(&mut failures, self.isbn(document));
        record.comments = keep(&mut failures, self.comments(document));
        record.cover_url = keep(&mut failures, self.cover_url(document));
        record.publisher = keep(&mut failures, self.publisher(document));
        record.series = keep(&mut failures, self.series(document));
        record.series_index = keep(&mut failures, self.series_index(document));
        record.pubdate = keep(&mut failures, self.pubdate(document));

        PageExtraction { record, failures }
    }

    /// Text of the primary heading.
    ///
    /// # Errors
    ///
    /// [`ExtractionError`] when the heading is missing or blank.
    pub fn title(&self, document: &Html) -> Result<String, ExtractionError> {
        first_text(document, &self.rules.title, Field::Title)
    }

    /// Names linked from the author and illustrator rows, unique, in row order.
    ///
    /// # Errors
    ///
    /// [`ExtractionError::NoMatch`] when no credit row yields a name.
    pub fn authors(&self, document: &Html) -> Result<Vec<String>, ExtractionError> {
        let mut names: Vec<String> = Vec::new();
        for label in &self.rules.credit_labels {
            let labelled_cells = document
                .select(&self.rules.credit_cell)
                .filter(|cell| own_text(*cell).contains(label.as_str()));
            for cell in labelled_cells {
                let value_cells = following_elements(cell).filter(|el| el.value().name() == "td");
                for value_cell in value_cells {
                    for link in value_cell.select(&self.rules.credit_link) {
                        let name = element_text(link);
                        if !name.is_empty() && !names.contains(&name) {
                            names.push(name);
                        }
                    }
                }
            }
        }

        if names.is_empty() {
            Err(ExtractionError::no_match(Field::Authors))
        } else {
            Ok(names)
        }
    }

    /// First ISBN magic link, stripped to its digits.
    ///
    /// # Errors
    ///
    /// [`ExtractionError`] when no ISBN link exists or it normalizes to nothing.
    pub fn isbn(&self, document: &Html) -> Result<String, ExtractionError> {
        let raw = first_text(document, &self.rules.isbn, Field::Isbn)?;
        let isbn = normalize_isbn(&raw);
        if isbn.is_empty() {
            return Err(ExtractionError::malformed(Field::Isbn, format!("'{raw}'")));
        }
        Ok(isbn)
    }

    /// Summary blocks under any comment anchor, space-joined and escaped.
    ///
    /// # Errors
    ///
    /// [`ExtractionError::NoMatch`] when no anchored block has text.
    pub fn comments(&self, document: &Html) -> Result<String, ExtractionError> {
        let blocks: Vec<String> = document
            .select(&self.rules.comment_blocks)
            .filter(|block| self.is_comment_block(*block))
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect();

        if blocks.is_empty() {
            return Err(ExtractionError::no_match(Field::Comments));
        }
        Ok(escape_html(&collapse_whitespace(&blocks.join(" "))))
    }

    /// First cover image source, qualified against the site origin.
    ///
    /// # Errors
    ///
    /// [`ExtractionError`] when there is no cover image or its `src` is unusable.
    pub fn cover_url(&self, document: &Html) -> Result<String, ExtractionError> {
        let image = document
            .select(&self.rules.cover_image)
            .next()
            .ok_or_else(|| ExtractionError::no_match(Field::CoverUrl))?;
        let src = image
            .value()
            .attr("src")
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .ok_or_else(|| ExtractionError::malformed(Field::CoverUrl, "image has no src"))?;
        absolutize_url(src, &self.rules.origin).ok_or_else(|| {
            ExtractionError::malformed(Field::CoverUrl, format!("unresolvable src '{src}'"))
        })
    }

    /// First link text in the releases table.
    ///
    /// # Errors
    ///
    /// [`ExtractionError`] when the releases table has no link text.
    pub fn publisher(&self, document: &Html) -> Result<String, ExtractionError> {
        first_text(document, &self.rules.publisher, Field::Publisher)
    }

    /// # Errors
    ///
    /// [`ExtractionError`] when the navigation header has no series link.
    pub fn series(&self, document: &Html) -> Result<String, ExtractionError> {
        first_text(document, &self.rules.series, Field::Series)
    }

    /// # Errors
    ///
    /// [`ExtractionError`] when no index marker is present.
    pub fn series_index(&self, document: &Html) -> Result<String, ExtractionError> {
        first_text(document, &self.rules.series_index, Field::SeriesIndex)
    }

    /// January 1st of the smallest integer found in the release items.
    ///
    /// Only the text leading each item (before any nested element) is scanned.
    ///
    /// # Errors
    ///
    /// [`ExtractionError`] when there are no release items or none carries an integer.
    pub fn pubdate(&self, document: &Html) -> Result<NaiveDate, ExtractionError> {
        let lines: Vec<String> = document
            .select(&self.rules.release_items)
            .map(leading_text)
            .collect();
        if lines.is_empty() {
            return Err(ExtractionError::no_match(Field::PubDate));
        }

        let year = earliest_year(lines.iter().map(String::as_str)).ok_or_else(|| {
            ExtractionError::malformed(Field::PubDate, "no numeric tokens in release items")
        })?;
        january_first(year).ok_or_else(|| {
            ExtractionError::malformed(Field::PubDate, format!("year {year} out of range"))
        })
    }

    fn is_comment_block(&self, block: ElementRef<'_>) -> bool {
        let anchors = &self.rules.comment_anchors;
        match block.value().name() {
            "p" => preceding_elements(block).any(|sibling| {
                anchors.iter().any(|anchor| match anchor {
                    CommentAnchor::ParagraphsAfterBlock { tag, classes } => {
                        sibling.value().name() == tag.as_str()
                            && classes.iter().all(|class| {
                                sibling.value().classes().any(|c| c == class.as_str())
                            })
                    }
                    CommentAnchor::ParagraphsAfterHeading { span_id } => {
                        is_heading_with_span(sibling, span_id)
                    }
                    CommentAnchor::ListItemsAfterHeading { .. } => false,
                })
            }),
            "li" => block
                .parent()
                .and_then(ElementRef::wrap)
                .filter(|list| matches!(list.value().name(), "ul" | "ol"))
                .is_some_and(|list| {
                    preceding_elements(list).any(|sibling| {
                        anchors.iter().any(|anchor| match anchor {
                            CommentAnchor::ListItemsAfterHeading { span_id } => {
                                is_heading_with_span(sibling, span_id)
                            }
                            _ => false,
                        })
                    })
                }),
            _ => false,
        }
    }
}

fn keep<T>(failures: &mut Vec<ExtractionError>, result: Result<T, ExtractionError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            failures.push(error);
            None
        }
    }
}

pub(super) fn decode_body<'a>(url: &str, body: &'a [u8]) -> Result<Cow<'a, str>, PageError> {
    let markup = String::from_utf8_lossy(body);
    if markup.trim().is_empty() {
        return Err(PageError::EmptyDocument {
            url: url.to_string(),
        });
    }
    Ok(markup)
}

fn first_text(document: &Html, selector: &Selector, field: Field) -> Result<String, ExtractionError> {
    let element = document
        .select(selector)
        .next()
        .ok_or_else(|| ExtractionError::no_match(field))?;
    let text = element_text(element);
    if text.is_empty() {
        return Err(ExtractionError::malformed(field, "empty text"));
    }
    Ok(text)
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Text nodes that are direct children of `element`.
fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|child| child.value().as_text().map(|text| &**text))
        .collect()
}

/// Direct text preceding the first child element or comment.
fn leading_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .map_while(|child| child.value().as_text().map(|text| &**text))
        .collect()
}

fn preceding_elements(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.prev_siblings().filter_map(ElementRef::wrap)
}

fn following_elements(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.next_siblings().filter_map(ElementRef::wrap)
}

fn is_heading_with_span(element: ElementRef<'_>, span_id: &str) -> bool {
    element.value().name() == "h2"
        && element
            .children()
            .filter_map(ElementRef::wrap)
            .any(|child| child.value().name() == "span" && child.value().id() == Some(span_id))
}
