use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::format::{collate, folder_structure};
use crate::index::FileRecord;
use crate::links::LinkGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortColumn {
    Name,
    Extension,
    /// Folder structure, not the full path.
    Path,
    Size,
    Modified,
    Backlinks,
    Outgoing,
}

impl SortColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Extension => "ext",
            Self::Path => "path",
            Self::Size => "size",
            Self::Modified => "modified",
            Self::Backlinks => "backlinks",
            Self::Outgoing => "outgoing",
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "ext" | "extension" => Ok(Self::Extension),
            "path" | "folder" => Ok(Self::Path),
            "size" => Ok(Self::Size),
            "modified" | "date" => Ok(Self::Modified),
            "backlinks" => Ok(Self::Backlinks),
            "outgoing" => Ok(Self::Outgoing),
            other => Err(format!("unknown sort column: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: SortColumn,
    pub dir: SortDir,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            column: SortColumn::Modified,
            dir: SortDir::Desc,
        }
    }
}

impl SortState {
    /// Same column flips direction; a new column starts descending.
    pub fn toggle(self, column: SortColumn) -> Self {
        if self.column == column {
            Self {
                column,
                dir: self.dir.flipped(),
            }
        } else {
            Self {
                column,
                dir: SortDir::Desc,
            }
        }
    }
}

/// Stable in-place sort. Link counts are looked up in `links` on every call.
pub fn sort_files(files: &mut [Arc<FileRecord>], state: SortState, links: &LinkGraph) {
    let cmp = |a: &Arc<FileRecord>, b: &Arc<FileRecord>| -> Ordering {
        match state.column {
            SortColumn::Name => collate(&a.name, &b.name),
            SortColumn::Extension => collate(&a.extension, &b.extension),
            SortColumn::Path => collate(&folder_structure(&a.path), &folder_structure(&b.path)),
            SortColumn::Size => a.size.cmp(&b.size),
            SortColumn::Modified => a.modified().cmp(&b.modified()),
            SortColumn::Backlinks => links
                .backlink_count(&a.path)
                .cmp(&links.backlink_count(&b.path)),
            SortColumn::Outgoing => links
                .outgoing_count(&a.path)
                .cmp(&links.outgoing_count(&b.path)),
        }
    };
    match state.dir {
        SortDir::Asc => files.sort_by(cmp),
        SortDir::Desc => files.sort_by(|a, b| cmp(b, a)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn rec(path: &str, size: u64, modified: i64) -> Arc<FileRecord> {
        Arc::new(FileRecord::from_parts(path, size, None, Some(modified), None))
    }

    fn paths(files: &[Arc<FileRecord>]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn toggle_flips_same_column_and_resets_new_one() {
        let s = SortState::default();
        let s = s.toggle(SortColumn::Modified);
        assert_eq!(s.dir, SortDir::Asc);
        let s = s.toggle(SortColumn::Name);
        assert_eq!(s, SortState { column: SortColumn::Name, dir: SortDir::Desc });
        assert_eq!(s.toggle(SortColumn::Name).dir, SortDir::Asc);
    }

    #[test]
    fn names_sort_case_insensitively() {
        let mut files = vec![rec("b.md", 1, 1), rec("A.md", 1, 1), rec("c.md", 1, 1)];
        let asc = SortState { column: SortColumn::Name, dir: SortDir::Asc };
        sort_files(&mut files, asc, &LinkGraph::default());
        assert_eq!(paths(&files), vec!["A.md", "b.md", "c.md"]);
    }

    #[test]
    fn accented_names_collate_and_case_ties_stay_stable() {
        let mut files = vec![
            rec("b/a.md", 1, 1),
            rec("c/A.md", 1, 1),
            rec("Zoo.md", 1, 1),
            rec("Éclair.md", 1, 1),
        ];
        let asc = SortState { column: SortColumn::Name, dir: SortDir::Asc };
        sort_files(&mut files, asc, &LinkGraph::default());
        assert_eq!(paths(&files), vec!["b/a.md", "c/A.md", "Éclair.md", "Zoo.md"]);

        let desc = SortState { column: SortColumn::Name, dir: SortDir::Desc };
        sort_files(&mut files, desc, &LinkGraph::default());
        assert_eq!(paths(&files), vec!["Zoo.md", "Éclair.md", "b/a.md", "c/A.md"]);
    }

    #[test]
    fn numeric_ties_keep_input_order() {
        let mut files = vec![rec("x.md", 5, 1), rec("y.md", 9, 1), rec("z.md", 5, 1)];
        let desc = SortState { column: SortColumn::Size, dir: SortDir::Desc };
        sort_files(&mut files, desc, &LinkGraph::default());
        assert_eq!(paths(&files), vec!["y.md", "x.md", "z.md"]);
    }

    #[test]
    fn backlink_counts_come_from_the_graph() {
        let mut resolved: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        for src in ["a.md", "b.md"] {
            resolved.entry(src.into()).or_default().insert("hub.md".into(), 1);
        }
        resolved.entry("a.md".into()).or_default().insert("leaf.md".into(), 1);
        let graph = LinkGraph::from_resolved(resolved);

        let mut files = vec![rec("leaf.md", 1, 1), rec("a.md", 1, 1), rec("hub.md", 1, 1)];
        let by_backlinks = SortState { column: SortColumn::Backlinks, dir: SortDir::Desc };
        sort_files(&mut files, by_backlinks, &graph);
        assert_eq!(paths(&files), vec!["hub.md", "leaf.md", "a.md"]);

        let by_outgoing = SortState { column: SortColumn::Outgoing, dir: SortDir::Desc };
        sort_files(&mut files, by_outgoing, &graph);
        assert_eq!(files[0].path, "a.md");
    }

    #[test]
    fn columns_parse_from_cli_names() {
        assert_eq!("ext".parse::<SortColumn>().unwrap(), SortColumn::Extension);
        assert_eq!("Modified".parse::<SortColumn>().unwrap(), SortColumn::Modified);
        assert!("color".parse::<SortColumn>().is_err());
    }
}
