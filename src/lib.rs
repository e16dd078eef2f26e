mod bookmarks;
mod cache;
mod category;
mod config;
mod dashboard;
pub mod debounce;
mod date_filter;
mod error;
mod eval;
mod format;
mod index;
mod links;
mod pagination;
mod parse;
mod query;
mod service;
mod snapshot;
mod sort;
mod state;
mod tags;
mod vault;

pub use crate::bookmarks::{parse_bookmarks, parse_last_opened};
pub use crate::cache::{CacheFingerprint, IndexCache};
pub use crate::category::{FileCategory, extension_to_category};
pub use crate::config::{
    NavigatorConfig, SavedSearch, parse_excluded_extensions, parse_excluded_folders,
};
pub use crate::dashboard::{Count, Dashboard, RecentSection, build_dashboard};
pub use crate::date_filter::{DateRange, DateSpec, RelativeDate, local_day, relative_keyword};
pub use crate::error::{Error, Result};
pub use crate::eval::{EvalContext, INVALID_RANGE_LABEL, QueryOutcome, evaluate};
pub use crate::format::{
    DateFormat, collate, folder_structure, format_file_size, moment_to_strftime,
};
pub use crate::index::{
    CategorizedIndex, ExclusionConfig, FileRecord, FolderRecord, classify,
};
pub use crate::links::LinkGraph;
pub use crate::pagination::{Page, paginate};
pub use crate::query::{QueryTerm, TypeFilter, compile_search_pattern, parse_query};
pub use crate::service::{NavigatorEvent, NavigatorService};
pub use crate::snapshot::{
    FileMetadata, FileStat, SnapshotBuilder, SnapshotEntry, VaultSnapshot,
};
pub use crate::sort::{SortColumn, SortDir, SortState, sort_files};
pub use crate::state::{Navigator, QueryInputs, QueryResult, QueryState, execute};
pub use crate::tags::{
    ActiveTag, TagCount, TagGroup, TagOrder, TagSearch, active_tag, apply_suggestion,
    normalize_tag, search_tags, suggest_tags, tag_summary, toggle_tag_in_query,
};
pub use crate::vault::{Vault, VaultPath};
