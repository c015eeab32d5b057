//! Declarative extraction-rule table.
//!
//! Each field maps to a CSS query against the wiki's page templates plus the
//! post-processing applied in [`super::page`]. The table is a versioned
//! contract with an external site: when the templates change, swap the table
//! rather than the orchestration code.

use scraper::Selector;
use url::Url;

use super::ExtractionError;

/// Block whose following content contributes to the comments field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentAnchor {
    /// Paragraphs that follow a sibling `tag` element carrying all `classes`.
    ParagraphsAfterBlock { tag: String, classes: Vec<String> },
    /// Paragraphs that follow a sibling `h2` whose child `span` has `span_id`.
    ParagraphsAfterHeading { span_id: String },
    /// Items of lists that follow a sibling `h2` whose child `span` has `span_id`.
    ListItemsAfterHeading { span_id: String },
}

/// Field queries for one wiki site and its search surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRules {
    /// Origin relative links are qualified against.
    pub origin: String,
    /// Raw body substring marking a not-found page.
    pub not_found_marker: String,
    pub title: String,
    /// Table cells whose own text may carry a credit label.
    pub credit_cell: String,
    /// Labels of the credit rows, in output order (author, illustrator).
    pub credit_labels: Vec<String>,
    /// Links holding names inside the cells following a credit label.
    pub credit_link: String,
    pub isbn: String,
    pub comment_anchors: Vec<CommentAnchor>,
    pub cover_image: String,
    pub publisher: String,
    /// Release list items scanned for the publication year.
    pub release_items: String,
    pub series: String,
    pub series_index: String,
    /// Outbound result links on the search-results page.
    pub search_result_link: String,
}

impl SiteRules {
    /// Rules for the ComicWiki.dk MediaWiki templates.
    #[must_use]
    pub fn comicwiki(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            not_found_marker: "<title>404 - ".to_string(),
            title: "h1.firstHeading".to_string(),
            credit_cell: "td".to_string(),
            credit_labels: vec!["Forfatter:".to_string(), "Tegner:".to_string()],
            credit_link: "a".to_string(),
            isbn: "a.mw-magiclink-isbn".to_string(),
            comment_anchors: vec![
                CommentAnchor::ParagraphsAfterBlock {
                    tag: "div".to_string(),
                    classes: vec!["notice".to_string(), "metadata".to_string()],
                },
                CommentAnchor::ParagraphsAfterHeading {
                    span_id: "Forlagets_resumé".to_string(),
                },
                CommentAnchor::ParagraphsAfterHeading {
                    span_id: "Bibliotekernes_resumé".to_string(),
                },
                CommentAnchor::ListItemsAfterHeading {
                    span_id: "Indhold".to_string(),
                },
            ],
            cover_image: "div.aib-image img".to_string(),
            publisher: r#"table[id*="udgivelser"] li a"#.to_string(),
            release_items: r#"table[id*="udgivelser"] li"#.to_string(),
            series: "div.NavHead > a".to_string(),
            series_index: "span.nr".to_string(),
            search_result_link: "div.g a".to_string(),
        }
    }
}

/// [`SiteRules`] with every selector parsed once.
#[derive(Debug)]
pub(crate) struct CompiledRules {
    pub(crate) origin: Url,
    pub(crate) not_found_marker: String,
    pub(crate) title: Selector,
    pub(crate) credit_cell: Selector,
    pub(crate) credit_labels: Vec<String>,
    pub(crate) credit_link: Selector,
    pub(crate) isbn: Selector,
    pub(crate) comment_anchors: Vec<CommentAnchor>,
    pub(crate) comment_blocks: Selector,
    pub(crate) cover_image: Selector,
    pub(crate) publisher: Selector,
    pub(crate) release_items: Selector,
    pub(crate) series: Selector,
    pub(crate) series_index: Selector,
    pub(crate) search_result_link: Selector,
}

impl CompiledRules {
    pub(crate) fn compile(rules: &SiteRules) -> Result<Self, ExtractionError> {
        let origin = Url::parse(&rules.origin).map_err(|_| ExtractionError::InvalidOrigin {
            origin: rules.origin.clone(),
        })?;

        Ok(Self {
            origin,
            not_found_marker: rules.not_found_marker.clone(),
            title: compile_selector("title", &rules.title)?,
            credit_cell: compile_selector("credit_cell", &rules.credit_cell)?,
            credit_labels: rules.credit_labels.clone(),
            credit_link: compile_selector("credit_link", &rules.credit_link)?,
            isbn: compile_selector("isbn", &rules.isbn)?,
            comment_anchors: rules.comment_anchors.clone(),
            comment_blocks: compile_selector("comment_blocks", "p, li")?,
            cover_image: compile_selector("cover_image", &rules.cover_image)?,
            publisher: compile_selector("publisher", &rules.publisher)?,
            release_items: compile_selector("release_items", &rules.release_items)?,
            series: compile_selector("series", &rules.series)?,
            series_index: compile_selector("series_index", &rules.series_index)?,
            search_result_link: compile_selector(
                "search_result_link",
                &rules.search_result_link,
            )?,
        })
    }
}

fn compile_selector(rule: &'static str, selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|_| ExtractionError::InvalidSelector {
        rule,
        selector: selector.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_comicwiki_rules_compile() {
        let compiled = CompiledRules::compile(&SiteRules::comicwiki("https://comicwiki.dk")).unwrap();
        assert_eq!(compiled.origin.as_str(), "https://comicwiki.dk/");
        assert_eq!(compiled.credit_labels, vec!["Forfatter:", "Tegner:"]);
        assert_eq!(compiled.comment_anchors.len(), 4);
    }

    #[test]
    fn test_invalid_selector_names_rule() {
        let mut rules = SiteRules::comicwiki("https://comicwiki.dk");
        rules.series = "div[".to_string();
        let err = CompiledRules::compile(&rules).unwrap_err();
        assert_eq!(
            err,
            ExtractionError::InvalidSelector {
                rule: "series",
                selector: "div[".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_origin_rejected() {
        let err = CompiledRules::compile(&SiteRules::comicwiki("comicwiki")).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidOrigin { .. }));
    }
}
