use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info};

use crate::{Error, ExclusionConfig, Result};

const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD HH:mm";

static FOLDER_TRIM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/|/$|\.\.").expect("valid folder trim regex"));

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct SavedSearch {
    pub id: String,
    pub query: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Comma-separated file extensions hidden from every view.
    pub excluded_ext: String,
    /// Comma-separated folder path prefixes hidden from every view.
    pub excluded_path: String,
    /// Moment-style display format used for dates (and matched by free-text terms).
    pub date_format: String,
    /// Navigator page size.
    pub files_per_page: usize,
    /// Entries per dashboard "recent files" section.
    pub num_recent_files: usize,
    /// Quiet window before interactive query input triggers a run.
    pub query_debounce_ms: u64,
    /// Quiet window for filesystem events while watching.
    pub watch_debounce_ms: u64,
    /// Directory names never enumerated.
    pub ignore_dirs: Vec<String>,
    /// Host configuration directory (bookmarks, workspace), relative to the vault root.
    pub config_dir: PathBuf,
    pub saved_searches: Vec<SavedSearch>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            excluded_ext: String::new(),
            excluded_path: String::new(),
            date_format: DEFAULT_DATE_FORMAT.into(),
            files_per_page: 20,
            num_recent_files: 5,
            query_debounce_ms: 300,
            watch_debounce_ms: 400,
            ignore_dirs: vec![".obsidian".into(), ".git".into(), ".trash".into()],
            config_dir: PathBuf::from(".obsidian"),
            saved_searches: Vec::new(),
        }
    }
}

impl NavigatorConfig {
    /// Default config location inside a vault.
    pub fn default_path(vault_root: &Path) -> PathBuf {
        vault_root.join(".obsidian/vault-navigator/config.toml")
    }

    /// Loads a TOML config; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config not found; using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(Error::io(path, err)),
        };
        let cfg = Self::from_toml(&text)?;
        info!(path = %path.display(), "config loaded");
        Ok(cfg)
    }

    pub fn from_toml(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|err| Error::ConfigToml(err.to_string()))
    }

    pub fn exclusion(&self) -> ExclusionConfig {
        ExclusionConfig::new(
            parse_excluded_extensions(&self.excluded_ext),
            parse_excluded_folders(&self.excluded_path),
        )
    }

    pub fn query_debounce(&self) -> Duration {
        Duration::from_millis(self.query_debounce_ms)
    }

    pub fn watch_debounce(&self) -> Duration {
        Duration::from_millis(self.watch_debounce_ms)
    }

    /// Saved searches whose query or description contains `needle` (case-insensitive).
    pub fn saved_searches_matching(&self, needle: &str) -> Vec<&SavedSearch> {
        let needle = needle.trim().to_lowercase();
        self.saved_searches
            .iter()
            .filter(|s| {
                needle.is_empty()
                    || s.query.to_lowercase().contains(&needle)
                    || s.description.to_lowercase().contains(&needle)
            })
            .collect()
    }
}

pub fn parse_excluded_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

pub fn parse_excluded_folders(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|folder| FOLDER_TRIM.replace_all(folder.trim(), "").into_owned())
        .filter(|folder| !folder.is_empty())
        .collect()
}
