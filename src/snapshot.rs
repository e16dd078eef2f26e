use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::bookmarks::{parse_bookmarks, parse_last_opened};
use crate::links::{LinkGraph, LinkResolver};
use crate::parse::parse_markdown_note;
use crate::{NavigatorConfig, Result, Vault};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    /// Epoch milliseconds.
    pub created_ms: Option<i64>,
    /// Epoch milliseconds.
    pub modified_ms: Option<i64>,
}

impl FileStat {
    /// Stat with both timestamps set to `ms`.
    pub fn at(size: u64, ms: i64) -> Self {
        Self {
            size,
            created_ms: Some(ms),
            modified_ms: Some(ms),
        }
    }
}

/// Host-extracted metadata for one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMetadata {
    /// Inline tags, `#`-prefixed, as written.
    pub tags: Vec<String>,
    pub frontmatter: Option<serde_yaml::Mapping>,
}

impl FileMetadata {
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            frontmatter: None,
        }
    }

    /// Attaches frontmatter parsed from YAML text; non-mapping or broken YAML is dropped.
    pub fn frontmatter_yaml(mut self, yaml: &str) -> Self {
        self.frontmatter = match serde_yaml::from_str::<serde_yaml::Value>(yaml) {
            Ok(serde_yaml::Value::Mapping(map)) => Some(map),
            _ => None,
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotEntry {
    File { path: String, stat: FileStat },
    Folder { path: String },
}

impl SnapshotEntry {
    pub fn path(&self) -> &str {
        match self {
            Self::File { path, .. } | Self::Folder { path } => path,
        }
    }
}

/// Read-only view of the vault as the host sees it at one point in time.
#[derive(Debug, Clone, Default)]
pub struct VaultSnapshot {
    entries: Vec<SnapshotEntry>,
    metadata: HashMap<String, FileMetadata>,
    links: LinkGraph,
    bookmarks: Vec<String>,
    last_opened: Vec<String>,
}

impl VaultSnapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// Enumerates the vault on disk, parsing markdown notes and host config files.
    pub fn load(vault: &Vault, config: &NavigatorConfig) -> Result<Self> {
        let mut builder = Self::builder();
        let mut raw_links: Vec<(String, Vec<String>)> = Vec::new();

        for entry in walkdir::WalkDir::new(vault.root())
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !vault.is_ignored_rel(
                        e.path().strip_prefix(vault.root()).unwrap_or(e.path()),
                        &config.ignore_dirs,
                    )
            })
            .filter_map(|e| e.ok())
        {
            if entry.depth() == 0 {
                continue;
            }
            let rel = match vault.relative(entry.path()) {
                Ok(r) => r.into_string(),
                Err(err) => {
                    debug!(path = %entry.path().display(), error = %err, "entry skipped");
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                builder = builder.folder(rel);
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }

            let stat = match entry.metadata() {
                Ok(meta) => FileStat {
                    size: meta.len(),
                    created_ms: meta.created().ok().and_then(epoch_ms),
                    modified_ms: meta.modified().ok().and_then(epoch_ms),
                },
                Err(err) => {
                    warn!(path = %rel, error = %err, "stat failed");
                    FileStat::default()
                }
            };

            if rel.to_lowercase().ends_with(".md") {
                match std::fs::read_to_string(entry.path()) {
                    Ok(content) => {
                        let note = parse_markdown_note(&content);
                        raw_links.push((rel.clone(), note.links));
                        builder = builder.note(
                            rel,
                            stat,
                            FileMetadata {
                                tags: note.inline_tags,
                                frontmatter: note.frontmatter,
                            },
                        );
                    }
                    Err(err) => {
                        warn!(path = %rel, error = %err, "note unreadable; metadata skipped");
                        builder = builder.file(rel, stat);
                    }
                }
            } else {
                builder = builder.file(rel, stat);
            }
        }

        let resolver = LinkResolver::new(builder.file_paths());
        for (source, links) in &raw_links {
            for link in links {
                if let Some(target) = resolver.resolve(link, source) {
                    builder = builder.link(source.clone(), target);
                }
            }
        }

        let config_dir = vault.root().join(&config.config_dir);
        if let Some(json) = read_host_file(&config_dir.join("bookmarks.json")) {
            for path in parse_bookmarks(&json) {
                builder = builder.bookmark(path);
            }
        }
        if let Some(json) = read_host_file(&config_dir.join("workspace.json")) {
            for path in parse_last_opened(&json) {
                builder = builder.last_opened(path);
            }
        }

        let snapshot = builder.build();
        info!(
            root = %vault.root().display(),
            entries = snapshot.entries.len(),
            "vault snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Files and folders in host enumeration order.
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn metadata(&self, path: &str) -> Option<&FileMetadata> {
        self.metadata.get(path)
    }

    pub fn link_graph(&self) -> &LinkGraph {
        &self.links
    }

    /// Bookmarked file paths, depth-first order, deduplicated.
    pub fn bookmarks(&self) -> &[String] {
        &self.bookmarks
    }

    pub fn last_opened(&self) -> &[String] {
        &self.last_opened
    }
}

fn read_host_file(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "host file unavailable");
            None
        }
    }
}

fn epoch_ms(t: SystemTime) -> Option<i64> {
    let d = t.duration_since(SystemTime::UNIX_EPOCH).ok()?;
    i64::try_from(d.as_millis()).ok()
}

/// In-memory snapshot construction. Parent folders of added files are implied.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    entries: Vec<SnapshotEntry>,
    seen_folders: HashSet<String>,
    metadata: HashMap<String, FileMetadata>,
    links: BTreeMap<String, BTreeMap<String, usize>>,
    bookmarks: Vec<String>,
    bookmark_set: BTreeSet<String>,
    last_opened: Vec<String>,
}

impl SnapshotBuilder {
    pub fn folder(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.push_folder_chain(&path);
        self
    }

    pub fn file(mut self, path: impl Into<String>, stat: FileStat) -> Self {
        let path = path.into();
        if let Some((parent, _)) = path.rsplit_once('/') {
            self.push_folder_chain(parent);
        }
        self.entries.push(SnapshotEntry::File { path, stat });
        self
    }

    pub fn note(self, path: impl Into<String>, stat: FileStat, metadata: FileMetadata) -> Self {
        let path = path.into();
        let mut out = self.file(path.clone(), stat);
        out.metadata.insert(path, metadata);
        out
    }

    /// Records one resolved link occurrence from `source` to `target`.
    pub fn link(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        *self
            .links
            .entry(source.into())
            .or_default()
            .entry(target.into())
            .or_default() += 1;
        self
    }

    pub fn bookmark(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if self.bookmark_set.insert(path.clone()) {
            self.bookmarks.push(path);
        }
        self
    }

    pub fn last_opened(mut self, path: impl Into<String>) -> Self {
        self.last_opened.push(path.into());
        self
    }

    pub fn build(self) -> VaultSnapshot {
        VaultSnapshot {
            entries: self.entries,
            metadata: self.metadata,
            links: LinkGraph::from_resolved(self.links),
            bookmarks: self.bookmarks,
            last_opened: self.last_opened,
        }
    }

    fn file_paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match e {
            SnapshotEntry::File { path, .. } => Some(path.as_str()),
            SnapshotEntry::Folder { .. } => None,
        })
    }

    fn push_folder_chain(&mut self, path: &str) {
        let mut prefix = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            if self.seen_folders.insert(prefix.clone()) {
                self.entries.push(SnapshotEntry::Folder {
                    path: prefix.clone(),
                });
            }
        }
    }
}
