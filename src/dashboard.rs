use std::sync::Arc;

use crate::category::FileCategory;
use crate::index::{CategorizedIndex, FileRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Count {
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentSection {
    pub title: &'static str,
    pub files: Vec<Arc<FileRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dashboard {
    pub counts: Vec<Count>,
    pub sections: Vec<RecentSection>,
}

const SECTIONS: [(&str, FileCategory); 8] = [
    ("Recent notes", FileCategory::Notes),
    ("Recent canvases", FileCategory::Canvas),
    ("Recent images", FileCategory::Images),
    ("Recent audio files", FileCategory::Audio),
    ("Recent videos", FileCategory::Video),
    ("Recent PDFs", FileCategory::Pdf),
    ("Recent bases", FileCategory::Bases),
    ("Recent other files", FileCategory::Other),
];

/// Category counts plus the `limit` most recent files per section.
///
/// Bookmarked and last-opened paths that are missing or excluded are dropped.
pub fn build_dashboard(
    index: &CategorizedIndex,
    bookmarks: &[String],
    last_opened: &[String],
    limit: usize,
) -> Dashboard {
    let bookmarked: Vec<Arc<FileRecord>> = resolve(index, bookmarks);

    let mut counts = vec![Count {
        label: "files",
        count: index.filtered_files().len(),
    }];
    counts.extend(FileCategory::ALL.iter().map(|c| Count {
        label: c.as_str(),
        count: index.files_in(*c).len(),
    }));
    counts.push(Count {
        label: "folders",
        count: index.folders().len(),
    });
    counts.push(Count {
        label: "tags",
        count: index.tag_names().len(),
    });
    counts.push(Count {
        label: "bookmarks",
        count: bookmarked.len(),
    });

    let mut opened = resolve(index, last_opened);
    opened.truncate(limit);

    let mut sections = vec![
        RecentSection {
            title: "Recently opened",
            files: opened,
        },
        RecentSection {
            title: "Recent files",
            files: most_recent(index.filtered_files(), limit),
        },
    ];
    sections.extend(SECTIONS.iter().map(|&(title, category)| RecentSection {
        title,
        files: most_recent(index.files_in(category), limit),
    }));
    sections.push(RecentSection {
        title: "Bookmarks",
        files: most_recent(&bookmarked, limit),
    });

    Dashboard { counts, sections }
}

fn resolve(index: &CategorizedIndex, paths: &[String]) -> Vec<Arc<FileRecord>> {
    paths
        .iter()
        .filter_map(|p| index.record(p).cloned())
        .collect()
}

fn most_recent(files: &[Arc<FileRecord>], limit: usize) -> Vec<Arc<FileRecord>> {
    let mut out = files.to_vec();
    out.sort_by(|a, b| b.modified().cmp(&a.modified()));
    out.truncate(limit);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ExclusionConfig, classify};
    use crate::snapshot::{FileStat, VaultSnapshot};

    fn index() -> CategorizedIndex {
        let snap = VaultSnapshot::builder()
            .file("n/a.md", FileStat::at(1, 10))
            .file("n/b.md", FileStat::at(1, 30))
            .file("n/c.md", FileStat::at(1, 20))
            .file("img/x.png", FileStat::at(1, 5))
            .file("secret/s.md", FileStat::at(1, 99))
            .build();
        classify(&snap, &ExclusionConfig::new(Vec::<String>::new(), ["secret"]))
    }

    fn section<'a>(d: &'a Dashboard, title: &str) -> Vec<&'a str> {
        d.sections
            .iter()
            .find(|s| s.title == title)
            .map(|s| s.files.iter().map(|f| f.path.as_str()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn recent_sections_are_newest_first_and_limited() {
        let d = build_dashboard(&index(), &[], &[], 2);
        assert_eq!(section(&d, "Recent files"), vec!["n/b.md", "n/c.md"]);
        assert_eq!(section(&d, "Recent images"), vec!["img/x.png"]);
        assert!(section(&d, "Recent PDFs").is_empty());
    }

    #[test]
    fn excluded_and_missing_paths_are_dropped() {
        let bookmarks = vec!["secret/s.md".to_string(), "n/a.md".into(), "gone.md".into()];
        let opened = vec!["n/c.md".to_string(), "secret/s.md".into(), "n/a.md".into()];
        let d = build_dashboard(&index(), &bookmarks, &opened, 5);
        assert_eq!(section(&d, "Bookmarks"), vec!["n/a.md"]);
        assert_eq!(section(&d, "Recently opened"), vec!["n/c.md", "n/a.md"]);
        let bm = d.counts.iter().find(|c| c.label == "bookmarks").unwrap();
        assert_eq!(bm.count, 1);
    }

    #[test]
    fn counts_cover_categories_and_folders() {
        let d = build_dashboard(&index(), &[], &[], 5);
        let get = |label: &str| d.counts.iter().find(|c| c.label == label).unwrap().count;
        assert_eq!(get("files"), 4);
        assert_eq!(get("notes"), 3);
        assert_eq!(get("images"), 1);
        assert_eq!(get("folders"), 3);
    }
}
