use std::collections::HashSet;

use tracing::debug;

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct BookmarksJson {
    #[serde(default)]
    items: Vec<BookmarkItem>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct BookmarkItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    items: Vec<BookmarkItem>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct WorkspaceJson {
    #[serde(default, rename = "lastOpenFiles")]
    last_open_files: Vec<String>,
}

/// Flattens the host's bookmark tree into file paths, depth-first, first occurrence kept.
///
/// Invalid JSON yields an empty list.
pub fn parse_bookmarks(json: &str) -> Vec<String> {
    let parsed: BookmarksJson = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(err) => {
            debug!(error = %err, "bookmarks json ignored");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut stack: Vec<&BookmarkItem> = parsed.items.iter().rev().collect();
    while let Some(item) = stack.pop() {
        match (item.kind.as_str(), &item.path) {
            ("file", Some(path)) => {
                if seen.insert(path.as_str()) {
                    out.push(path.clone());
                }
            }
            ("group", _) => stack.extend(item.items.iter().rev()),
            _ => {}
        }
    }
    out
}

/// Most-recently-opened paths recorded by the host workspace, newest first.
pub fn parse_last_opened(json: &str) -> Vec<String> {
    match serde_json::from_str::<WorkspaceJson>(json) {
        Ok(ws) => ws.last_open_files,
        Err(err) => {
            debug!(error = %err, "workspace json ignored");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_groups_are_flattened_depth_first() {
        let json = r#"{
            "items": [
                {"type": "file", "ctime": 1, "path": "a.md"},
                {"type": "group", "ctime": 2, "title": "g", "items": [
                    {"type": "file", "ctime": 3, "path": "g/b.md"},
                    {"type": "group", "ctime": 4, "items": [
                        {"type": "file", "ctime": 5, "path": "g/h/c.md"}
                    ]},
                    {"type": "file", "ctime": 6, "path": "a.md"}
                ]},
                {"type": "search", "ctime": 7, "query": "x"},
                {"type": "file", "ctime": 8, "path": "d.md"}
            ]
        }"#;
        assert_eq!(
            parse_bookmarks(json),
            vec!["a.md", "g/b.md", "g/h/c.md", "d.md"]
        );
    }

    #[test]
    fn invalid_bookmarks_are_empty() {
        assert!(parse_bookmarks("not json").is_empty());
        assert!(parse_bookmarks("{}").is_empty());
    }

    #[test]
    fn last_open_files_are_read_from_workspace() {
        let json = r#"{"main": {}, "lastOpenFiles": ["b.md", "a.md"]}"#;
        assert_eq!(parse_last_opened(json), vec!["b.md", "a.md"]);
        assert!(parse_last_opened("[]").is_empty());
    }
}
