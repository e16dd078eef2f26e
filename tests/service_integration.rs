use std::time::Duration;

use vault_navigator::{
    NavigatorConfig, NavigatorEvent, NavigatorService, QueryState, TagOrder, Vault,
};

#[tokio::test]
async fn service_reuses_index_until_the_vault_changes() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let vault_root = temp.path().join("vault");
    std::fs::create_dir_all(vault_root.join("notes"))?;
    std::fs::write(vault_root.join("notes/a.md"), "Body #proj #wip\n")?;
    std::fs::write(vault_root.join("notes/b.md"), "Body #proj #done\n")?;

    let config = NavigatorConfig {
        watch_debounce_ms: 100,
        ..NavigatorConfig::default()
    };
    let mut service = NavigatorService::new(Vault::open(&vault_root)?, config);
    assert!(service.reload().await?);
    assert!(!service.reload().await?);
    assert_eq!(service.rebuild_count(), 1);

    let tags = service.tag_summary(TagOrder::Count);
    assert_eq!(tags[0].tag, "#proj");
    assert_eq!(tags[0].count, 2);

    let res = service.search_tags("#proj !#done");
    assert_eq!(res.primary_matches.len(), 1);
    assert_eq!(res.primary_matches[0].path, "notes/a.md");

    let mut rx = service.subscribe();
    service.start_watching().await?;

    std::fs::write(vault_root.join("notes/c.md"), "New #proj\n")?;

    let mut saw_rebuild = false;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while let Ok(Ok(ev)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        if let NavigatorEvent::SnapshotReloaded { rebuilt: true, .. } = ev {
            if service.index().record("notes/c.md").is_some() {
                saw_rebuild = true;
                break;
            }
        }
    }
    assert!(saw_rebuild, "expected a rebuild that includes notes/c.md");

    let result = service.run_query(&QueryState::new("#proj"))?;
    assert_eq!(result.files.len(), 3);

    service.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn open_reads_config_and_bookmarks() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path();
    std::fs::create_dir_all(root.join(".obsidian/vault-navigator"))?;
    std::fs::write(
        root.join(".obsidian/vault-navigator/config.toml"),
        "files_per_page = 1\nexcluded_ext = \"png\"\n",
    )?;
    std::fs::write(
        root.join(".obsidian/bookmarks.json"),
        r#"{"items":[{"type":"group","items":[{"type":"file","path":"b.md"}]}]}"#,
    )?;
    std::fs::write(root.join("a.md"), "a")?;
    std::fs::write(root.join("b.md"), "b")?;
    std::fs::write(root.join("c.png"), "c")?;

    let service = NavigatorService::open(root, None).await?;
    assert_eq!(service.config().files_per_page, 1);

    let all = service.run_query(&QueryState::new(""))?;
    assert_eq!(all.page.total_items, 2);
    assert_eq!(all.page.items.len(), 1);
    assert_eq!(all.page.total_pages, 2);

    let bookmarked = service.run_query(&QueryState::new("@bm"))?;
    assert_eq!(bookmarked.page.items[0].path, "b.md");

    let dashboard = service.dashboard();
    let bookmarks = dashboard
        .sections
        .iter()
        .find(|s| s.title == "Bookmarks")
        .expect("bookmarks section");
    assert_eq!(bookmarks.files.len(), 1);
    Ok(())
}
