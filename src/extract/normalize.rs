//! Text and URL post-processing applied to matched page content.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
pub fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static WHITESPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"\s+"));

/// Collapses every whitespace run to a single space and trims the ends.
#[must_use]
pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RUN_RE.replace_all(value.trim(), " ").into_owned()
}

/// Strips spaces, hyphens, and the literal `ISBN` from an ISBN link text.
#[must_use]
pub fn normalize_isbn(value: &str) -> String {
    value
        .trim()
        .replace(' ', "")
        .replace("ISBN", "")
        .replace('-', "")
}

/// Escapes text for safe inclusion in an HTML comments field.
#[must_use]
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Integer tokens of one release line, after dropping colons and commas.
///
/// Non-numeric tokens are skipped. Any integer counts, including prices or
/// page numbers sitting in the same line.
pub fn integer_tokens(value: &str) -> impl Iterator<Item = i32> + '_ {
    value
        .split_whitespace()
        .map(|token| token.replace([':', ','], ""))
        .filter_map(|token| token.parse::<i32>().ok())
}

/// Smallest integer token across all release lines.
#[must_use]
pub fn earliest_year<'a>(lines: impl IntoIterator<Item = &'a str>) -> Option<i32> {
    lines.into_iter().flat_map(integer_tokens).min()
}

/// January 1st of `year`, or `None` when the year is out of calendar range.
#[must_use]
pub fn january_first(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
}

/// Resolves a possibly relative URL string against a base URL.
///
/// Returns the value as-is if it already starts with `http://` or `https://`;
/// normalizes `//...` to `https:...`; otherwise joins with `base_url`.
#[must_use]
pub fn absolutize_url(value: &str, base_url: &Url) -> Option<String> {
    let value = value.trim();
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("https:{value}"));
    }
    base_url.join(value).ok().map(|url| url.to_string())
}
