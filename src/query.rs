use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::category::FileCategory;
use crate::date_filter::{DateSpec, relative_keyword};
use crate::{Error, Result};

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!(?:"(?:\\"|[^"])*"|'(?:\\'|[^'])*')|"(?:\\"|[^"])*"|'(?:\\'|[^'])*'|\S+"#)
        .expect("valid query token regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFilter {
    Category(FileCategory),
    Bookmarks,
}

/// One parsed unit of a search string. Terms are ANDed left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTerm {
    /// Empty input: keep the working set as is.
    MatchAll,
    /// Case-insensitive regex source tested against the free-text fields.
    Text(String),
    Exclude(Box<QueryTerm>),
    DateFilter(DateSpec),
    TypeFilter(TypeFilter),
    /// An `@keyword` nothing recognizes; matches no file.
    UnknownKeyword(String),
}

pub fn parse_query(raw: &str) -> Vec<QueryTerm> {
    let terms: Vec<QueryTerm> = TOKEN
        .find_iter(raw.trim())
        .map(|m| parse_term(m.as_str()))
        .collect();
    if terms.is_empty() {
        return vec![QueryTerm::MatchAll];
    }
    terms
}

fn parse_term(token: &str) -> QueryTerm {
    if let Some(inner) = token.strip_prefix('!').filter(|rest| !rest.is_empty()) {
        return QueryTerm::Exclude(Box::new(parse_term(inner)));
    }
    if let Some(unquoted) = strip_quotes(token) {
        return QueryTerm::Text(unquoted.to_string());
    }
    if let Some(keyword) = token.strip_prefix('@').filter(|rest| !rest.is_empty()) {
        return parse_keyword(keyword);
    }
    if token.starts_with('.') {
        return QueryTerm::Text(format!("\\{token}$"));
    }
    if token == "/" {
        return QueryTerm::Text("^/$".to_string());
    }
    QueryTerm::Text(token.to_string())
}

fn strip_quotes(token: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|q| {
        token
            .strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
    })
}

fn parse_keyword(keyword: &str) -> QueryTerm {
    let lower = keyword.to_lowercase();

    for prefix in ["d(", "date("] {
        if let Some(inner) = lower.strip_prefix(prefix).and_then(|r| r.strip_suffix(')')) {
            return QueryTerm::DateFilter(DateSpec::Range(inner.to_string()));
        }
    }
    if let Some(rel) = relative_keyword(&lower) {
        return QueryTerm::DateFilter(DateSpec::Relative(rel));
    }

    let filter = match lower.as_str() {
        "n" | "notes" => TypeFilter::Category(FileCategory::Notes),
        "i" | "images" => TypeFilter::Category(FileCategory::Images),
        "c" | "canvas" | "canvases" => TypeFilter::Category(FileCategory::Canvas),
        "a" | "audio" | "audios" => TypeFilter::Category(FileCategory::Audio),
        "v" | "video" | "videos" => TypeFilter::Category(FileCategory::Video),
        "p" | "pdf" | "pdfs" => TypeFilter::Category(FileCategory::Pdf),
        "o" | "other" | "others" => TypeFilter::Category(FileCategory::Other),
        "bb" | "bases" => TypeFilter::Category(FileCategory::Bases),
        "bm" | "bookmarks" => TypeFilter::Bookmarks,
        _ => return QueryTerm::UnknownKeyword(lower),
    };
    QueryTerm::TypeFilter(filter)
}

/// Builds the free-text matcher; the evaluator skips the term on `Err`.
pub fn compile_search_pattern(raw: &str) -> Result<Regex> {
    RegexBuilder::new(raw)
        .case_insensitive(true)
        .unicode(true)
        .build()
        .map_err(Error::from)
}
