//! Tag co-occurrence search, the tag sidebar, and tag editing helpers for the query box.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::format::collate;
use crate::index::{CategorizedIndex, FileRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGroup {
    /// Lowercase `#tag`.
    pub tag: String,
    /// Most recently modified first.
    pub files: Vec<Arc<FileRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSearch {
    pub primary: Vec<String>,
    pub excluded: Vec<String>,
    pub primary_matches: Vec<Arc<FileRecord>>,
    /// Tags co-occurring on the matches, ordered by tag name.
    pub secondary_groups: Vec<TagGroup>,
}

/// Lowercase, `#`-prefixed form; `None` for an empty tag.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let body = raw.trim().trim_start_matches('#');
    if body.is_empty() {
        return None;
    }
    Some(format!("#{}", body.to_lowercase()))
}

/// Space-separated tags, `!` marking exclusions. Files must carry every primary tag.
pub fn search_tags(query: &str, notes: &[Arc<FileRecord>]) -> TagSearch {
    let mut out = TagSearch::default();
    for token in query.split_whitespace() {
        let (list, raw) = match token.strip_prefix('!') {
            Some(rest) => (&mut out.excluded, rest),
            None => (&mut out.primary, token),
        };
        if let Some(tag) = normalize_tag(raw) {
            if !list.contains(&tag) {
                list.push(tag);
            }
        }
    }
    if out.primary.is_empty() {
        return out;
    }

    let mut groups: BTreeMap<String, Vec<Arc<FileRecord>>> = BTreeMap::new();
    for note in notes {
        let matches = out.primary.iter().all(|t| note.has_tag(t))
            && !out.excluded.iter().any(|t| note.has_tag(t));
        if !matches {
            continue;
        }
        out.primary_matches.push(Arc::clone(note));
        for tag in &note.tags {
            if out.primary.contains(tag) || out.excluded.contains(tag) {
                continue;
            }
            groups.entry(tag.clone()).or_default().push(Arc::clone(note));
        }
    }

    sort_recent_first(&mut out.primary_matches);
    let mut groups: Vec<TagGroup> = groups
        .into_iter()
        .map(|(tag, mut files)| {
            sort_recent_first(&mut files);
            TagGroup { tag, files }
        })
        .collect();
    groups.sort_by(|a, b| collate(&a.tag, &b.tag));
    out.secondary_groups = groups;
    out
}

fn sort_recent_first(files: &mut [Arc<FileRecord>]) {
    files.sort_by(|a, b| b.modified().cmp(&a.modified()));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagOrder {
    #[default]
    Name,
    Count,
}

impl FromStr for TagOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "count" | "frequency" => Ok(Self::Count),
            other => Err(format!("unknown tag order: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// The sidebar shown for an empty tag query.
pub fn tag_summary(index: &CategorizedIndex, order: TagOrder) -> Vec<TagCount> {
    let mut out: Vec<TagCount> = index
        .tag_index()
        .iter()
        .map(|(tag, files)| TagCount {
            tag: tag.clone(),
            count: files.len(),
        })
        .collect();
    match order {
        TagOrder::Name => out.sort_by(|a, b| collate(&a.tag, &b.tag)),
        TagOrder::Count => out.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| collate(&a.tag, &b.tag))
        }),
    }
    out
}

/// The `#`/`!#` word ending at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTag<'a> {
    pub prefix: &'static str,
    pub typed: &'a str,
    /// Byte offset where the word starts.
    pub start: usize,
}

pub fn active_tag(query: &str, cursor: usize) -> Option<ActiveTag<'_>> {
    let cursor = floor_char_boundary(query, cursor);
    let before = &query[..cursor];
    let start = before.rfind(' ').map_or(0, |i| i + 1);
    let word = &before[start..];
    let (prefix, typed) = if let Some(rest) = word.strip_prefix("!#") {
        ("!#", rest)
    } else if let Some(rest) = word.strip_prefix('#') {
        ("#", rest)
    } else {
        return None;
    };
    Some(ActiveTag {
        prefix,
        typed,
        start,
    })
}

/// Known tags (without `#`) starting with the typed text, case-insensitively.
pub fn suggest_tags(query: &str, cursor: usize, tag_names: &[String]) -> Vec<String> {
    let Some(active) = active_tag(query, cursor) else {
        return Vec::new();
    };
    if active.typed.is_empty() {
        return Vec::new();
    }
    let typed = active.typed.to_lowercase();
    tag_names
        .iter()
        .map(|t| t.strip_prefix('#').unwrap_or(t))
        .filter(|t| t.to_lowercase().starts_with(&typed))
        .map(str::to_string)
        .collect()
}

/// Replaces the word at the cursor with the chosen tag; returns the new text and cursor.
pub fn apply_suggestion(query: &str, cursor: usize, tag: &str) -> (String, usize) {
    let cursor = floor_char_boundary(query, cursor);
    let Some(active) = active_tag(query, cursor) else {
        return (query.to_string(), cursor);
    };
    let head = &query[..active.start];
    let tail = &query[cursor..];
    let text = format!("{head}{}{tag} {tail}", active.prefix);
    let new_cursor = head.len() + active.prefix.len() + tag.len() + 1;
    (text, new_cursor)
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Adds `#tag` (or `!#tag`) to the query, or removes it when present.
/// Adding one form drops the opposite form.
pub fn toggle_tag_in_query(query: &str, tag: &str, exclude: bool) -> String {
    let Some(tag) = normalize_tag(tag) else {
        return query.to_string();
    };
    let negated = format!("!{tag}");
    let (target, opposite) = if exclude {
        (negated.as_str(), tag.as_str())
    } else {
        (tag.as_str(), negated.as_str())
    };

    let words: Vec<&str> = query.split_whitespace().collect();
    let present = words.iter().any(|w| w.eq_ignore_ascii_case(target));
    let mut kept: Vec<&str> = words
        .into_iter()
        .filter(|w| !w.eq_ignore_ascii_case(target) && !w.eq_ignore_ascii_case(opposite))
        .collect();
    if !present {
        kept.push(target);
    }
    kept.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::FileMetadata;

    fn note(path: &str, modified: i64, tags: &[&str]) -> Arc<FileRecord> {
        let meta = FileMetadata::with_tags(tags.iter().copied());
        Arc::new(FileRecord::from_parts(path, 1, None, Some(modified), Some(&meta)))
    }

    fn paths(files: &[Arc<FileRecord>]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn secondary_groups_collect_co_occurring_tags() {
        let notes = vec![
            note("A.md", 2, &["#proj", "#wip"]),
            note("B.md", 3, &["#proj", "#done"]),
            note("C.md", 1, &["#other"]),
        ];
        let res = search_tags("#proj", &notes);
        assert_eq!(paths(&res.primary_matches), vec!["B.md", "A.md"]);
        let groups: Vec<(&str, Vec<&str>)> = res
            .secondary_groups
            .iter()
            .map(|g| (g.tag.as_str(), paths(&g.files)))
            .collect();
        assert_eq!(groups, vec![("#done", vec!["B.md"]), ("#wip", vec!["A.md"])]);
    }

    #[test]
    fn exclusions_and_case_are_normalized() {
        let notes = vec![
            note("a.md", 1, &["#Work", "#pending"]),
            note("b.md", 2, &["#work", "#pending", "#urgent"]),
            note("c.md", 3, &["#work"]),
        ];
        let res = search_tags("work #PENDING !urgent", &notes);
        assert_eq!(res.primary, vec!["#work", "#pending"]);
        assert_eq!(res.excluded, vec!["#urgent"]);
        assert_eq!(paths(&res.primary_matches), vec!["a.md"]);
        assert!(res.secondary_groups.is_empty());
    }

    #[test]
    fn differently_cased_tags_share_a_group() {
        let notes = vec![
            note("a.md", 1, &["#p", "#Idea"]),
            note("b.md", 2, &["#p", "#idea"]),
        ];
        let res = search_tags("#p", &notes);
        assert_eq!(res.secondary_groups.len(), 1);
        assert_eq!(res.secondary_groups[0].files.len(), 2);
    }

    #[test]
    fn secondary_groups_follow_locale_order() {
        let notes = vec![
            note("a.md", 1, &["#p", "#zeta"]),
            note("b.md", 2, &["#p", "#été"]),
        ];
        let res = search_tags("#p", &notes);
        let tags: Vec<&str> = res.secondary_groups.iter().map(|g| g.tag.as_str()).collect();
        assert_eq!(tags, vec!["#été", "#zeta"]);
    }

    #[test]
    fn exclusion_only_queries_match_nothing() {
        let notes = vec![note("a.md", 1, &["#x"])];
        let res = search_tags("!#y", &notes);
        assert!(res.primary_matches.is_empty());
        assert_eq!(res.excluded, vec!["#y"]);
        assert!(search_tags("  ", &notes).primary_matches.is_empty());
    }

    #[test]
    fn suggestions_follow_the_word_at_the_cursor() {
        let tags: Vec<String> = ["#project", "#Productivity", "#home"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            suggest_tags("foo #PRO", 8, &tags),
            vec!["project", "Productivity"]
        );
        assert_eq!(suggest_tags("!#ho", 4, &tags), vec!["home"]);
        assert!(suggest_tags("#", 1, &tags).is_empty());
        assert!(suggest_tags("pro", 3, &tags).is_empty());
        assert!(suggest_tags("#pro bar", 8, &tags).is_empty());
    }

    #[test]
    fn applying_a_suggestion_keeps_the_prefix() {
        let (text, cursor) = apply_suggestion("a !#pr rest", 6, "project");
        assert_eq!(text, "a !#project  rest");
        assert_eq!(cursor, 12);
    }

    #[test]
    fn toggling_adds_removes_and_swaps_forms() {
        assert_eq!(toggle_tag_in_query("foo", "#Work", false), "foo #work");
        assert_eq!(toggle_tag_in_query("foo #work", "work", false), "foo");
        assert_eq!(toggle_tag_in_query("foo #work", "work", true), "foo !#work");
        assert_eq!(toggle_tag_in_query("!#work bar", "#work", true), "bar");
    }
}
