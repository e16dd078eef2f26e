use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::category::{FileCategory, extension_to_category};
use crate::format::{collate, folder_structure};
use crate::links::LinkGraph;
use crate::snapshot::{FileMetadata, SnapshotEntry, VaultSnapshot};

/// One vault file as seen by the query pipeline. Built fresh on every index rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub name: String,
    pub basename: String,
    /// Lowercase, no leading dot; empty when the name has none.
    pub extension: String,
    pub size: u64,
    pub created_ms: Option<i64>,
    pub modified_ms: Option<i64>,
    /// Tags as written (inline first, then frontmatter), `#`-prefixed.
    pub display_tags: Vec<String>,
    /// Lowercase `#tags`, deduplicated.
    pub tags: Vec<String>,
    pub frontmatter_properties: Vec<(String, String)>,
    pub category: FileCategory,
}

impl FileRecord {
    pub fn from_parts(
        path: &str,
        size: u64,
        created_ms: Option<i64>,
        modified_ms: Option<i64>,
        meta: Option<&FileMetadata>,
    ) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        let (basename, extension) = split_name(&name);
        let display_tags = meta.map(collect_display_tags).unwrap_or_default();

        let mut seen = HashSet::new();
        let tags = display_tags
            .iter()
            .map(|t| t.to_lowercase())
            .filter(|t| seen.insert(t.clone()))
            .collect();

        let frontmatter_properties = meta
            .and_then(|m| m.frontmatter.as_ref())
            .map(|fm| {
                fm.iter()
                    .map(|(k, v)| (yaml_display(k), yaml_display(v)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            path: path.to_string(),
            category: extension_to_category(&extension),
            name,
            basename,
            extension,
            size,
            created_ms,
            modified_ms,
            display_tags,
            tags,
            frontmatter_properties,
        }
    }

    /// Modification time used for ordering; missing stats sort as the epoch.
    pub fn modified(&self) -> i64 {
        self.modified_ms.unwrap_or(0)
    }

    /// `/a/b/` for `a/b/file.md`, `/` at the root.
    pub fn folder(&self) -> String {
        folder_structure(&self.path)
    }

    pub fn has_tag(&self, normalized: &str) -> bool {
        self.tags.iter().any(|t| t == normalized)
    }

    /// Space-joined tags, the form free-text terms search.
    pub fn tag_text(&self) -> String {
        self.display_tags.join(" ")
    }

    /// `'key: value'` entries joined by ` \n`.
    pub fn props_text(&self) -> String {
        self.frontmatter_properties
            .iter()
            .map(|(k, v)| format!("'{k}: {v}'"))
            .collect::<Vec<_>>()
            .join(" \n")
    }
}

fn split_name(name: &str) -> (String, String) {
    match name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => (base.to_string(), ext.to_lowercase()),
        _ => (name.to_string(), String::new()),
    }
}

fn collect_display_tags(meta: &FileMetadata) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |tag: &str| {
        let tag = tag.trim();
        if tag.is_empty() || tag == "#" {
            return;
        }
        let tag = if tag.starts_with('#') {
            tag.to_string()
        } else {
            format!("#{tag}")
        };
        if !out.contains(&tag) {
            out.push(tag);
        }
    };

    for tag in &meta.tags {
        push(tag);
    }

    let fm_tags = meta
        .frontmatter
        .as_ref()
        .and_then(|fm| fm.get(serde_yaml::Value::String("tags".into())));
    match fm_tags {
        Some(serde_yaml::Value::String(s)) => push(s),
        Some(serde_yaml::Value::Sequence(items)) => {
            for item in items {
                // Non-string members are skipped.
                if let serde_yaml::Value::String(s) = item {
                    push(s);
                }
            }
        }
        _ => {}
    }

    out
}

fn yaml_display(v: &serde_yaml::Value) -> String {
    match v {
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Sequence(seq) => {
            seq.iter().map(yaml_display).collect::<Vec<_>>().join(",")
        }
        serde_yaml::Value::Mapping(_) => serde_json::to_string(v).unwrap_or_default(),
        serde_yaml::Value::Tagged(tagged) => yaml_display(&tagged.value),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRecord {
    pub path: String,
}

/// Extensions and folder prefixes hidden from every view.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExclusionConfig {
    excluded_extensions: BTreeSet<String>,
    excluded_folders: BTreeSet<String>,
}

impl ExclusionConfig {
    pub fn new<E, F>(extensions: E, folders: F) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: AsRef<str>,
    {
        Self {
            excluded_extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            excluded_folders: folders
                .into_iter()
                .map(|f| f.as_ref().to_string())
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }

    pub fn excluded_extensions(&self) -> &BTreeSet<String> {
        &self.excluded_extensions
    }

    pub fn excluded_folders(&self) -> &BTreeSet<String> {
        &self.excluded_folders
    }

    pub fn is_extension_excluded(&self, ext: &str) -> bool {
        self.excluded_extensions.contains(&ext.to_lowercase())
    }

    pub fn is_excluded(&self, file: &FileRecord) -> bool {
        self.is_extension_excluded(&file.extension)
            || self
                .excluded_folders
                .iter()
                .any(|prefix| file.path.starts_with(prefix.as_str()))
    }
}

/// Snapshot-scoped aggregate of classified files and the tag index.
#[derive(Debug, Clone, Default)]
pub struct CategorizedIndex {
    all_files: Vec<Arc<FileRecord>>,
    folders: Vec<FolderRecord>,
    filtered_files: Vec<Arc<FileRecord>>,
    by_category: BTreeMap<FileCategory, Vec<Arc<FileRecord>>>,
    tag_index: BTreeMap<String, Vec<Arc<FileRecord>>>,
    tag_names: Vec<String>,
    by_path: HashMap<String, Arc<FileRecord>>,
}

impl CategorizedIndex {
    pub fn all_files(&self) -> &[Arc<FileRecord>] {
        &self.all_files
    }

    pub fn folders(&self) -> &[FolderRecord] {
        &self.folders
    }

    /// Files surviving the exclusion rules, in snapshot order.
    pub fn filtered_files(&self) -> &[Arc<FileRecord>] {
        &self.filtered_files
    }

    pub fn files_in(&self, category: FileCategory) -> &[Arc<FileRecord>] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn notes(&self) -> &[Arc<FileRecord>] {
        self.files_in(FileCategory::Notes)
    }

    /// Lowercase tag -> files carrying it. `tag_names` holds the display order.
    pub fn tag_index(&self) -> &BTreeMap<String, Vec<Arc<FileRecord>>> {
        &self.tag_index
    }

    pub fn tag_names(&self) -> &[String] {
        &self.tag_names
    }

    /// Looks up a filtered file by path.
    pub fn record(&self, path: &str) -> Option<&Arc<FileRecord>> {
        self.by_path.get(path)
    }

    /// Filtered files linking to `path`, recomputed from the graph on each call.
    pub fn backlinks(&self, path: &str, links: &LinkGraph) -> Vec<Arc<FileRecord>> {
        self.resolve_paths(links.backlinks(path))
    }

    pub fn outgoing_links(&self, path: &str, links: &LinkGraph) -> Vec<Arc<FileRecord>> {
        self.resolve_paths(links.outgoing(path))
    }

    fn resolve_paths<'a>(&self, paths: impl Iterator<Item = &'a str>) -> Vec<Arc<FileRecord>> {
        paths.filter_map(|p| self.by_path.get(p).cloned()).collect()
    }
}

/// Partitions the snapshot into folders and exclusion-filtered, categorized files.
pub fn classify(snapshot: &VaultSnapshot, exclusion: &ExclusionConfig) -> CategorizedIndex {
    let mut idx = CategorizedIndex::default();
    for category in FileCategory::ALL {
        idx.by_category.insert(category, Vec::new());
    }

    for entry in snapshot.entries() {
        match entry {
            SnapshotEntry::Folder { path } => {
                if path.is_empty() || path == "/" {
                    continue;
                }
                idx.folders.push(FolderRecord { path: path.clone() });
            }
            SnapshotEntry::File { path, stat } => {
                let record = Arc::new(FileRecord::from_parts(
                    path,
                    stat.size,
                    stat.created_ms,
                    stat.modified_ms,
                    snapshot.metadata(path),
                ));
                idx.all_files.push(record);
            }
        }
    }

    for record in &idx.all_files {
        if exclusion.is_excluded(record) {
            continue;
        }
        idx.filtered_files.push(Arc::clone(record));
        idx.by_path.insert(record.path.clone(), Arc::clone(record));
        idx.by_category
            .entry(record.category)
            .or_default()
            .push(Arc::clone(record));
        for tag in &record.tags {
            idx.tag_index
                .entry(tag.clone())
                .or_default()
                .push(Arc::clone(record));
        }
    }
    idx.tag_names = idx.tag_index.keys().cloned().collect();
    idx.tag_names.sort_by(|a, b| collate(a, b));

    debug!(
        files = idx.all_files.len(),
        filtered = idx.filtered_files.len(),
        folders = idx.folders.len(),
        tags = idx.tag_names.len(),
        "vault classified"
    );
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::FileStat;

    fn snapshot() -> VaultSnapshot {
        VaultSnapshot::builder()
            .note(
                "notes/a.md",
                FileStat::at(10, 1),
                FileMetadata::with_tags(["#Work", "#work"])
                    .frontmatter_yaml("tags: [pending, 3]\nstatus: open\n"),
            )
            .file("notes/pic.PNG", FileStat::at(20, 2))
            .file("archive/old.md", FileStat::at(5, 3))
            .file("song.mp3", FileStat::at(1, 4))
            .file("Makefile", FileStat::at(1, 5))
            .file("board.canvas", FileStat::at(1, 6))
            .build()
    }

    #[test]
    fn every_filtered_file_lands_in_exactly_one_category() {
        let idx = classify(&snapshot(), &ExclusionConfig::default());
        for f in idx.filtered_files() {
            let hits = FileCategory::ALL
                .iter()
                .filter(|c| idx.files_in(**c).iter().any(|r| r.path == f.path))
                .count();
            assert_eq!(hits, 1, "{}", f.path);
        }
        assert_eq!(idx.files_in(FileCategory::Images)[0].path, "notes/pic.PNG");
        assert_eq!(idx.files_in(FileCategory::Other)[0].path, "Makefile");
    }

    #[test]
    fn exclusion_drops_extensions_and_prefixes() {
        let ex = ExclusionConfig::new(["png"], ["archive"]);
        let idx = classify(&snapshot(), &ex);
        assert_eq!(idx.all_files().len(), 6);
        let paths: Vec<_> = idx.filtered_files().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["notes/a.md", "song.mp3", "Makefile", "board.canvas"]
        );
        assert!(idx.record("archive/old.md").is_none());
    }

    #[test]
    fn tag_index_lowercases_and_merges_frontmatter() {
        let idx = classify(&snapshot(), &ExclusionConfig::default());
        assert_eq!(idx.tag_names(), ["#pending", "#work"]);
        assert_eq!(idx.tag_index()["#work"].len(), 1);

        let a = idx.record("notes/a.md").unwrap();
        assert_eq!(a.display_tags, vec!["#Work", "#work", "#pending"]);
        assert_eq!(a.tag_text(), "#Work #work #pending");
        assert_eq!(a.props_text(), "'tags: pending,3' \n'status: open'");
    }

    #[test]
    fn tag_names_use_locale_order() {
        let snap = VaultSnapshot::builder()
            .note("a.md", FileStat::at(1, 1), FileMetadata::with_tags(["#zeta", "#p"]))
            .note("b.md", FileStat::at(1, 2), FileMetadata::with_tags(["#Été"]))
            .build();
        let idx = classify(&snap, &ExclusionConfig::default());
        assert_eq!(idx.tag_names(), ["#été", "#p", "#zeta"]);
    }

    #[test]
    fn names_split_into_basename_and_lowercase_extension() {
        let r = FileRecord::from_parts("x/Photo.Final.JPG", 1, None, None, None);
        assert_eq!(r.name, "Photo.Final.JPG");
        assert_eq!(r.basename, "Photo.Final");
        assert_eq!(r.extension, "jpg");
        assert_eq!(r.category, FileCategory::Images);
        assert_eq!(r.modified(), 0);

        let dot = FileRecord::from_parts(".gitignore", 1, None, None, None);
        assert_eq!(dot.extension, "");
    }

    #[test]
    fn link_lookups_resolve_to_filtered_records() {
        let snap = VaultSnapshot::builder()
            .file("a.md", FileStat::at(1, 1))
            .file("b.md", FileStat::at(1, 2))
            .file("secret/c.md", FileStat::at(1, 3))
            .link("a.md", "b.md")
            .link("secret/c.md", "b.md")
            .link("b.md", "a.md")
            .build();
        let idx = classify(&snap, &ExclusionConfig::new(Vec::<String>::new(), ["secret"]));
        let back: Vec<_> = idx
            .backlinks("b.md", snap.link_graph())
            .iter()
            .map(|f| f.path.clone())
            .collect();
        assert_eq!(back, vec!["a.md"]);
        assert_eq!(idx.outgoing_links("b.md", snap.link_graph())[0].path, "a.md");
        assert!(idx.outgoing_links("c.md", snap.link_graph()).is_empty());
    }
}
