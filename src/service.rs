use std::path::{Component, Path};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use notify::{EventKind, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::cache::IndexCache;
use crate::dashboard::{Dashboard, build_dashboard};
use crate::eval::EvalContext;
use crate::index::{CategorizedIndex, FileRecord};
use crate::snapshot::VaultSnapshot;
use crate::state::{QueryInputs, QueryResult, QueryState, execute};
use crate::tags::{TagCount, TagOrder, TagSearch, search_tags, tag_summary};
use crate::{Error, NavigatorConfig, Result, SavedSearch, Vault};

const HOST_FILES: [&str; 2] = ["bookmarks.json", "workspace.json"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigatorEvent {
    /// The snapshot was reloaded after vault changes; `rebuilt` is false when
    /// the fingerprint was unchanged and the cached index was reused.
    SnapshotReloaded { rebuilt: bool, files: usize },
    Error { error: String },
}

/// Owns the current snapshot and index cache for one vault.
pub struct NavigatorService {
    vault: Vault,
    config: Arc<NavigatorConfig>,
    snapshot: Arc<RwLock<Arc<VaultSnapshot>>>,
    cache: Arc<IndexCache>,
    events: broadcast::Sender<NavigatorEvent>,
    shutdown_tx: watch::Sender<bool>,
    watcher: Option<notify::RecommendedWatcher>,
    watch_task: Option<tokio::task::JoinHandle<()>>,
}

impl NavigatorService {
    pub fn new(vault: Vault, config: NavigatorConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            vault,
            config: Arc::new(config),
            snapshot: Arc::new(RwLock::new(Arc::new(VaultSnapshot::default()))),
            cache: Arc::new(IndexCache::new()),
            events,
            shutdown_tx,
            watcher: None,
            watch_task: None,
        }
    }

    /// Opens the vault, loads its config (default location when `config_path` is `None`)
    /// and takes the first snapshot.
    pub async fn open(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        let vault = Vault::open(root)?;
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| NavigatorConfig::default_path(vault.root()));
        let config = NavigatorConfig::load(&path)?;
        let service = Self::new(vault, config);
        service.reload().await?;
        Ok(service)
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigatorEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Arc<VaultSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Re-reads the vault; returns whether the index had to be rebuilt.
    pub async fn reload(&self) -> Result<bool> {
        let (snapshot, rebuilt) =
            reload_snapshot(&self.vault, &self.config, &self.snapshot, &self.cache).await?;
        debug!(entries = snapshot.entries().len(), rebuilt, "service reloaded");
        Ok(rebuilt)
    }

    pub fn index(&self) -> Arc<CategorizedIndex> {
        let snapshot = self.snapshot();
        self.cache.get_index(&snapshot, &self.config.exclusion())
    }

    pub fn rebuild_count(&self) -> u64 {
        self.cache.rebuild_count()
    }

    pub fn eval_context(&self) -> EvalContext {
        self.context_for(&self.snapshot())
    }

    fn context_for(&self, snapshot: &VaultSnapshot) -> EvalContext {
        EvalContext::new(&self.config.date_format)
            .with_bookmarks(snapshot.bookmarks().iter().cloned())
    }

    pub fn run_query(&self, state: &QueryState) -> Result<QueryResult> {
        self.run_query_paged(state, self.config.files_per_page)
    }

    pub fn run_query_paged(&self, state: &QueryState, page_size: usize) -> Result<QueryResult> {
        let snapshot = self.snapshot();
        let index = self.cache.get_index(&snapshot, &self.config.exclusion());
        let ctx = self.context_for(&snapshot);
        let inputs = QueryInputs {
            index: &index,
            links: snapshot.link_graph(),
            ctx: &ctx,
        };
        execute(state, inputs, page_size)
    }

    pub fn search_tags(&self, query: &str) -> TagSearch {
        search_tags(query, self.index().notes())
    }

    pub fn tag_summary(&self, order: TagOrder) -> Vec<TagCount> {
        tag_summary(&self.index(), order)
    }

    pub fn dashboard(&self) -> Dashboard {
        let snapshot = self.snapshot();
        let index = self.cache.get_index(&snapshot, &self.config.exclusion());
        build_dashboard(
            &index,
            snapshot.bookmarks(),
            snapshot.last_opened(),
            self.config.num_recent_files,
        )
    }

    pub fn backlinks(&self, path: &str) -> Vec<Arc<FileRecord>> {
        let snapshot = self.snapshot();
        self.cache
            .get_index(&snapshot, &self.config.exclusion())
            .backlinks(path, snapshot.link_graph())
    }

    pub fn outgoing_links(&self, path: &str) -> Vec<Arc<FileRecord>> {
        let snapshot = self.snapshot();
        self.cache
            .get_index(&snapshot, &self.config.exclusion())
            .outgoing_links(path, snapshot.link_graph())
    }

    pub fn saved_searches(&self, filter: &str) -> Vec<SavedSearch> {
        self.config
            .saved_searches_matching(filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn start_watching(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }

        let (raw_tx, raw_rx) =
            mpsc::unbounded_channel::<std::result::Result<notify::Event, notify::Error>>();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = raw_tx.send(res);
        })?;
        watcher.watch(self.vault.root(), RecursiveMode::Recursive)?;

        let ctx = WatchContext {
            vault: self.vault.clone(),
            config: Arc::clone(&self.config),
            snapshot: Arc::clone(&self.snapshot),
            cache: Arc::clone(&self.cache),
            events: self.events.clone(),
        };
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let debounce = self.config.watch_debounce();
        self.watch_task = Some(tokio::spawn(async move {
            watch_loop(ctx, raw_rx, &mut shutdown_rx, debounce).await;
        }));
        self.watcher = Some(watcher);
        info!(root = %self.vault.root().display(), "watching vault");

        Ok(())
    }

    pub async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);
        self.watcher.take();
        if let Some(handle) = self.watch_task.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for NavigatorService {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn reload_snapshot(
    vault: &Vault,
    config: &Arc<NavigatorConfig>,
    slot: &RwLock<Arc<VaultSnapshot>>,
    cache: &IndexCache,
) -> Result<(Arc<VaultSnapshot>, bool)> {
    let vault2 = vault.clone();
    let config2 = Arc::clone(config);
    let loaded = tokio::task::spawn_blocking(move || VaultSnapshot::load(&vault2, &config2))
        .await
        .map_err(|e| Error::Task(format!("snapshot load failed: {e}")))??;
    let loaded = Arc::new(loaded);

    let (_, rebuilt) = cache.get_index_tracked(&loaded, &config.exclusion());
    let mut guard = slot.write().unwrap_or_else(|e| e.into_inner());
    *guard = Arc::clone(&loaded);
    Ok((loaded, rebuilt))
}

struct WatchContext {
    vault: Vault,
    config: Arc<NavigatorConfig>,
    snapshot: Arc<RwLock<Arc<VaultSnapshot>>>,
    cache: Arc<IndexCache>,
    events: broadcast::Sender<NavigatorEvent>,
}

async fn watch_loop(
    ctx: WatchContext,
    mut raw_rx: mpsc::UnboundedReceiver<std::result::Result<notify::Event, notify::Error>>,
    shutdown_rx: &mut watch::Receiver<bool>,
    debounce: Duration,
) {
    let mut dirty = false;
    let debounce_timer = tokio::time::sleep(Duration::from_secs(60 * 60 * 24 * 365 * 10));
    tokio::pin!(debounce_timer);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }

            maybe = raw_rx.recv() => {
                let Some(res) = maybe else { break; };
                match res {
                    Ok(ev) if is_relevant(&ctx.vault, &ctx.config, &ev) => {
                        dirty = true;
                        debounce_timer
                            .as_mut()
                            .reset(tokio::time::Instant::now() + debounce);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "watch error");
                        let _ = ctx.events.send(NavigatorEvent::Error { error: err.to_string() });
                    }
                }
            }

            _ = &mut debounce_timer, if dirty => {
                dirty = false;
                match reload_snapshot(&ctx.vault, &ctx.config, &ctx.snapshot, &ctx.cache).await {
                    Ok((snapshot, rebuilt)) => {
                        let files = snapshot.entries().len();
                        info!(rebuilt, entries = files, "vault change applied");
                        let _ = ctx.events.send(NavigatorEvent::SnapshotReloaded { rebuilt, files });
                    }
                    Err(err) => {
                        let _ = ctx.events.send(NavigatorEvent::Error { error: err.to_string() });
                    }
                }
            }
        }
    }
}

/// Access and metadata-only events are noise; files under ignored directories
/// only count when they are the host's bookmark or workspace files.
fn is_relevant(vault: &Vault, config: &NavigatorConfig, ev: &notify::Event) -> bool {
    match &ev.kind {
        EventKind::Access(_) => return false,
        EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => return false,
        _ => {}
    }
    ev.paths.iter().any(|abs| {
        let Ok(rel) = abs.strip_prefix(vault.root()) else {
            return false;
        };
        if rel.as_os_str().is_empty() {
            return false;
        }
        if !vault.is_ignored_rel(rel, &config.ignore_dirs) {
            return true;
        }
        is_host_file(rel, &config.config_dir)
    })
}

fn is_host_file(rel: &Path, config_dir: &Path) -> bool {
    let Ok(inside) = rel.strip_prefix(config_dir) else {
        return false;
    };
    let mut parts = inside.components();
    match (parts.next(), parts.next()) {
        (Some(Component::Normal(name)), None) => {
            HOST_FILES.iter().any(|h| name.to_str() == Some(*h))
        }
        _ => false,
    }
}
