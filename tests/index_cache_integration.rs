use std::sync::Arc;

use vault_navigator::{
    CacheFingerprint, ExclusionConfig, FileCategory, FileStat, IndexCache, NavigatorConfig,
    Vault, VaultSnapshot,
};

fn write(root: &std::path::Path, rel: &str, body: &str) -> anyhow::Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, body)?;
    Ok(())
}

#[test]
fn loaded_vault_is_classified_and_cached() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    write(&root, "notes/a.md", "---\ntags: [Work]\n---\nSee [[b]] #Todo\n")?;
    write(&root, "notes/b.md", "plain\n")?;
    write(&root, "img/pic.PNG", "png")?;
    write(&root, "archive/old.md", "old\n")?;
    write(&root, ".obsidian/app.json", "{}")?;
    write(
        &root,
        ".obsidian/bookmarks.json",
        r#"{"items":[{"type":"file","path":"notes/b.md"}]}"#,
    )?;

    let vault = Vault::open(&root)?;
    let config = NavigatorConfig {
        excluded_path: "archive".into(),
        ..NavigatorConfig::default()
    };
    let snapshot = VaultSnapshot::load(&vault, &config)?;
    assert_eq!(snapshot.bookmarks(), ["notes/b.md".to_string()]);
    assert_eq!(snapshot.link_graph().backlink_count("notes/b.md"), 1);

    let cache = IndexCache::new();
    let index = cache.get_index(&snapshot, &config.exclusion());
    assert_eq!(index.all_files().len(), 4);
    assert_eq!(index.filtered_files().len(), 3);
    assert_eq!(index.files_in(FileCategory::Images).len(), 1);
    assert!(index.record("archive/old.md").is_none());
    assert!(index.all_files().iter().all(|f| !f.path.starts_with(".obsidian")));

    let a = index.record("notes/a.md").expect("a.md indexed");
    assert_eq!(a.tags, vec!["#todo", "#work"]);

    let again = cache.get_index(&snapshot, &config.exclusion());
    assert!(Arc::ptr_eq(&index, &again));
    assert_eq!(cache.rebuild_count(), 1);
    Ok(())
}

#[test]
fn fingerprint_tracks_mtime_and_exclusions() {
    let base = VaultSnapshot::builder()
        .file("a.md", FileStat::at(1, 100))
        .build();
    let touched = VaultSnapshot::builder()
        .file("a.md", FileStat::at(1, 101))
        .build();
    let resized = VaultSnapshot::builder()
        .file("a.md", FileStat::at(99, 100))
        .build();
    let none = ExclusionConfig::default();
    let png = ExclusionConfig::new(["png"], Vec::<String>::new());

    let fp = CacheFingerprint::compute(&base, &none);
    assert_eq!(fp, CacheFingerprint::compute(&base, &none));
    assert_ne!(fp, CacheFingerprint::compute(&touched, &none));
    assert_ne!(fp, CacheFingerprint::compute(&base, &png));
    // Size alone does not invalidate.
    assert_eq!(fp, CacheFingerprint::compute(&resized, &none));

    let cache = IndexCache::new();
    let (_, rebuilt) = cache.get_index_tracked(&base, &none);
    assert!(rebuilt);
    let (_, rebuilt) = cache.get_index_tracked(&resized, &none);
    assert!(!rebuilt);
    let (_, rebuilt) = cache.get_index_tracked(&base, &png);
    assert!(rebuilt);
}
