use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate};
use regex::Regex;
use tracing::debug;

use crate::date_filter::{DateRange, DateSpec, RelativeDate, local_day};
use crate::format::DateFormat;
use crate::index::FileRecord;
use crate::query::{QueryTerm, TypeFilter, compile_search_pattern};

pub const INVALID_RANGE_LABEL: &str = "invalid date range";

/// Everything a query run reads besides the files themselves.
#[derive(Debug, Clone)]
pub struct EvalContext {
    now: DateTime<Local>,
    date_format: DateFormat,
    bookmarks: HashSet<String>,
}

impl EvalContext {
    pub fn new(date_format: &str) -> Self {
        Self {
            now: Local::now(),
            date_format: DateFormat::new(date_format),
            bookmarks: HashSet::new(),
        }
    }

    /// Pins "now" for relative and open-ended date filters.
    pub fn at(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    pub fn with_bookmarks<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bookmarks = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub fn date_format(&self) -> &DateFormat {
        &self.date_format
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub files: Vec<Arc<FileRecord>>,
    /// Describes the `@d(...)` window of the last evaluated term; empty otherwise.
    pub date_label: String,
}

enum Matcher {
    All,
    Pattern(Regex),
    Relative(RelativeDate),
    Range(Option<DateRange>),
    Type(TypeFilter),
    Nothing,
    Not(Box<Matcher>),
}

impl Matcher {
    /// `None` when the term should be skipped (unparseable free text).
    fn compile(term: &QueryTerm, ctx: &EvalContext) -> Option<Self> {
        let m = match term {
            QueryTerm::MatchAll => Self::All,
            QueryTerm::Text(pattern) => match compile_search_pattern(pattern) {
                Ok(re) => Self::Pattern(re),
                Err(err) => {
                    debug!(pattern = %pattern, error = %err, "search term skipped");
                    return None;
                }
            },
            QueryTerm::Exclude(inner) => Self::Not(Box::new(Self::compile(inner, ctx)?)),
            QueryTerm::DateFilter(DateSpec::Relative(rel)) => Self::Relative(*rel),
            QueryTerm::DateFilter(DateSpec::Range(raw)) => {
                Self::Range(DateRange::parse(raw, ctx.today()))
            }
            QueryTerm::TypeFilter(filter) => Self::Type(*filter),
            QueryTerm::UnknownKeyword(keyword) => {
                debug!(keyword = %keyword, "unknown filter keyword");
                Self::Nothing
            }
        };
        Some(m)
    }

    fn label(&self) -> String {
        match self {
            Self::Range(Some(range)) => range.label(),
            Self::Range(None) => INVALID_RANGE_LABEL.to_string(),
            Self::Not(inner) => inner.label(),
            _ => String::new(),
        }
    }

    fn matches(&self, file: &FileRecord, ctx: &EvalContext) -> bool {
        match self {
            Self::All => true,
            Self::Pattern(re) => matches_free_text(re, file, ctx),
            Self::Relative(rel) => file
                .modified_ms
                .and_then(local_day)
                .is_some_and(|day| rel.matches(day, ctx.today())),
            Self::Range(Some(range)) => file
                .modified_ms
                .and_then(local_day)
                .is_some_and(|day| range.contains(day)),
            Self::Range(None) | Self::Nothing => false,
            Self::Type(TypeFilter::Category(c)) => file.category == *c,
            Self::Type(TypeFilter::Bookmarks) => ctx.bookmarks.contains(&file.path),
            Self::Not(inner) => !inner.matches(file, ctx),
        }
    }
}

fn matches_free_text(re: &Regex, file: &FileRecord, ctx: &EvalContext) -> bool {
    re.is_match(&file.name)
        || re.is_match(&file.folder())
        || file
            .modified_ms
            .and_then(|ms| ctx.date_format.format_ms(ms))
            .is_some_and(|date| re.is_match(&date))
        || re.is_match(&file.tag_text())
        || re.is_match(&file.props_text())
}

/// Applies `terms` in order, each narrowing the previous term's output.
pub fn evaluate(
    terms: &[QueryTerm],
    initial: &[Arc<FileRecord>],
    ctx: &EvalContext,
) -> QueryOutcome {
    let mut files = initial.to_vec();
    let mut date_label = String::new();

    for term in terms {
        let Some(matcher) = Matcher::compile(term, ctx) else {
            date_label.clear();
            continue;
        };
        date_label = matcher.label();
        files.retain(|f| matcher.matches(f, ctx));
    }

    QueryOutcome { files, date_label }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::query::parse_query;

    fn local_ms(y: i32, m: u32, d: u32, h: u32) -> i64 {
        Local
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .single()
            .unwrap()
            .timestamp_millis()
    }

    fn rec(path: &str, modified: i64, tags: &[&str]) -> Arc<FileRecord> {
        let meta = crate::snapshot::FileMetadata::with_tags(tags.iter().copied());
        Arc::new(FileRecord::from_parts(
            path,
            1,
            Some(modified),
            Some(modified),
            Some(&meta),
        ))
    }

    fn ctx() -> EvalContext {
        let now = Local.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).single().unwrap();
        EvalContext::new("YYYY-MM-DD HH:mm").at(now)
    }

    fn run(q: &str, files: &[Arc<FileRecord>]) -> Vec<String> {
        evaluate(&parse_query(q), files, &ctx())
            .files
            .iter()
            .map(|f| f.path.clone())
            .collect()
    }

    #[test]
    fn terms_chain_as_and() {
        let files = vec![
            rec("work/a.md", 0, &["#work", "#pending"]),
            rec("work/b.md", 0, &["#work", "#pending", "#urgent"]),
            rec("c.md", 0, &["#work"]),
        ];
        assert_eq!(run("#work #pending !#urgent", &files), vec!["work/a.md"]);
        assert_eq!(run("work", &files).len(), 3);
        assert_eq!(run("/", &files), vec!["c.md"]);
    }

    #[test]
    fn invalid_pattern_leaves_working_set_unchanged() {
        let files = vec![rec("a.md", 0, &[]), rec("b.png", 0, &[])];
        assert_eq!(run("(oops", &files).len(), 2);
        assert_eq!(run("(oops .png", &files), vec!["b.png"]);
    }

    #[test]
    fn unknown_keyword_matches_nothing() {
        let files = vec![rec("a.md", 0, &[])];
        assert!(run("@someday", &files).is_empty());
    }

    #[test]
    fn range_label_follows_last_term() {
        let files = vec![rec("a.md", local_ms(2025, 10, 15, 9), &[])];
        let out = evaluate(&parse_query("@d(2025-10)"), &files, &ctx());
        assert_eq!(out.files.len(), 1);
        assert_eq!(out.date_label, "2025-10-01 to 2025-10-31");

        let out = evaluate(&parse_query("@d(2025-10) a"), &files, &ctx());
        assert_eq!(out.date_label, "");

        let out = evaluate(&parse_query("@d(2024..2025..2026)"), &files, &ctx());
        assert!(out.files.is_empty());
        assert_eq!(out.date_label, INVALID_RANGE_LABEL);
    }

    #[test]
    fn relative_filters_use_pinned_now() {
        let files = vec![
            rec("today.md", local_ms(2026, 1, 15, 8), &[]),
            rec("three.md", local_ms(2026, 1, 12, 0), &[]),
            rec("old.md", local_ms(2025, 12, 1, 0), &[]),
        ];
        assert_eq!(run("@today", &files), vec!["today.md"]);
        assert_eq!(run("@d-3", &files), vec!["today.md", "three.md"]);
        assert_eq!(run("@m-1", &files).len(), 3);
        assert_eq!(run("@y", &files), vec!["today.md", "three.md"]);
    }

    #[test]
    fn exclusion_is_the_complement() {
        let files = vec![
            rec("a.md", local_ms(2025, 10, 15, 9), &["#x"]),
            rec("b.png", local_ms(2024, 1, 1, 9), &[]),
            rec("c/d.pdf", local_ms(2025, 11, 1, 9), &["#y"]),
        ];
        for q in ["#x", ".png", "@d(2025)", "@pdf", "2025-10", "@bogus"] {
            let inc = run(q, &files);
            let exc = run(&format!("!{q}"), &files);
            assert_eq!(inc.len() + exc.len(), files.len(), "{q}");
            assert!(inc.iter().all(|p| !exc.contains(p)), "{q}");
        }
    }

    #[test]
    fn free_text_searches_formatted_date_and_properties() {
        let meta = crate::snapshot::FileMetadata::default().frontmatter_yaml("status: Draft\n");
        let with_props = Arc::new(FileRecord::from_parts(
            "p.md",
            1,
            None,
            Some(local_ms(2025, 3, 2, 14)),
            Some(&meta),
        ));
        let files = vec![with_props];
        assert_eq!(run("2025-03-02", &files).len(), 1);
        assert_eq!(run("status:.draft", &files).len(), 1);
        assert!(run("2024-", &files).is_empty());
    }

    #[test]
    fn free_text_ignores_case_on_both_sides() {
        let files = vec![
            rec("Projects/README.md", 0, &["#Work"]),
            rec("notes/readme.md", 0, &["#home"]),
        ];
        assert_eq!(run("^readme", &files).len(), 2);
        assert_eq!(run("#WORK", &files), vec!["Projects/README.md"]);
        assert_eq!(run("/projects/", &files), vec!["Projects/README.md"]);
        assert_eq!(run("[A-Z]+\\.MD$", &files).len(), 2);
    }
}
