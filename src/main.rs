use std::io::BufRead;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use vault_navigator::{
    DateFormat, FileRecord, NavigatorEvent, NavigatorService, QueryResult, QueryState,
    SortColumn, SortDir, SortState, TagOrder, debounce, format_file_size, suggest_tags,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Ext,
    Path,
    Size,
    Modified,
    Backlinks,
    Outgoing,
}

impl From<SortArg> for SortColumn {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Name => SortColumn::Name,
            SortArg::Ext => SortColumn::Extension,
            SortArg::Path => SortColumn::Path,
            SortArg::Size => SortColumn::Size,
            SortArg::Modified => SortColumn::Modified,
            SortArg::Backlinks => SortColumn::Backlinks,
            SortArg::Outgoing => SortColumn::Outgoing,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TagOrderArg {
    Name,
    Count,
}

impl From<TagOrderArg> for TagOrder {
    fn from(value: TagOrderArg) -> Self {
        match value {
            TagOrderArg::Name => TagOrder::Name,
            TagOrderArg::Count => TagOrder::Count,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "vnav",
    version,
    about = "Browse and search an Obsidian vault from the terminal"
)]
struct Cli {
    /// Path to the Obsidian vault.
    #[arg(long, env = "OBSIDIAN_VAULT", global = true)]
    vault: Option<PathBuf>,

    /// Navigator config file (defaults to .obsidian/vault-navigator/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Counts and recent files per category.
    Dashboard,
    /// Run a navigator query (text, regex, `@` filters, `!` exclusions).
    Search(SearchArgs),
    /// Tag co-occurrence search, or the tag list when no query is given.
    Tags {
        query: Vec<String>,
        #[arg(long, value_enum, default_value = "name")]
        by: TagOrderArg,
    },
    /// Complete the `#tag` word ending at the cursor.
    Suggest {
        query: String,
        /// Byte offset of the cursor (defaults to the end).
        #[arg(long)]
        cursor: Option<usize>,
    },
    /// Backlinks and outgoing links of one file.
    Links { path: String },
    /// List saved searches, or run one.
    Saved {
        /// Case-insensitive filter on query and description.
        #[arg(long, default_value = "")]
        filter: String,
        /// Id of the saved search to run.
        #[arg(long)]
        run: Option<String>,
    },
    /// Keep a query live: re-run on vault changes and on new query lines from stdin.
    Watch(SearchArgs),
}

#[derive(Debug, Clone, clap::Args)]
struct SearchArgs {
    query: Vec<String>,
    #[arg(long, value_enum)]
    sort: Option<SortArg>,
    #[arg(long, conflicts_with = "desc")]
    asc: bool,
    #[arg(long)]
    desc: bool,
    #[arg(long, default_value_t = 1)]
    page: usize,
    /// Overrides `files_per_page` from the config.
    #[arg(long)]
    per_page: Option<usize>,
    /// Print the page as JSON.
    #[arg(long)]
    json: bool,
}

impl SearchArgs {
    fn state(&self) -> QueryState {
        let mut sort = SortState::default();
        if let Some(col) = self.sort {
            sort.column = col.into();
        }
        if self.asc {
            sort.dir = SortDir::Asc;
        } else if self.desc {
            sort.dir = SortDir::Desc;
        }
        QueryState::new(&self.query.join(" "))
            .with_sort(sort)
            .with_page(self.page)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let vault = require_vault(cli.vault)?;
    let mut service = NavigatorService::open(&vault, cli.config.as_deref()).await?;

    match cli.command {
        Command::Dashboard => handle_dashboard(&service),
        Command::Search(args) => handle_search(&service, &args)?,
        Command::Tags { query, by } => handle_tags(&service, &query.join(" "), by.into()),
        Command::Suggest { query, cursor } => {
            let cursor = cursor.unwrap_or(query.len());
            for tag in suggest_tags(&query, cursor, service.index().tag_names()) {
                println!("{tag}");
            }
        }
        Command::Links { path } => {
            println!("backlinks:");
            for file in service.backlinks(&path) {
                println!("- {}", file.path);
            }
            println!("outgoing:");
            for file in service.outgoing_links(&path) {
                println!("- {}", file.path);
            }
        }
        Command::Saved { filter, run } => handle_saved(&service, &filter, run.as_deref())?,
        Command::Watch(args) => handle_watch(&mut service, args).await?,
    }

    Ok(())
}

fn handle_dashboard(service: &NavigatorService) {
    let fmt = DateFormat::new(&service.config().date_format);
    let dashboard = service.dashboard();

    println!("vault");
    for count in &dashboard.counts {
        println!("  {}: {}", count.label, count.count);
    }
    for section in &dashboard.sections {
        if section.files.is_empty() {
            continue;
        }
        println!("\n{}:", section.title);
        for file in &section.files {
            println!("- {}\t{}", file.path, modified_text(&fmt, file));
        }
    }
}

fn handle_search(service: &NavigatorService, args: &SearchArgs) -> anyhow::Result<()> {
    let state = args.state();
    let page_size = args.per_page.unwrap_or(service.config().files_per_page);
    let result = service.run_query_paged(&state, page_size)?;
    if args.json {
        print_json(service, &state, &result)?;
    } else {
        print_result(service, &state, &result);
    }
    Ok(())
}

fn handle_tags(service: &NavigatorService, query: &str, order: TagOrder) {
    if query.trim().is_empty() {
        for row in service.tag_summary(order) {
            println!("{}\t{}", row.count, row.tag);
        }
        return;
    }

    let res = service.search_tags(query);
    if res.primary.is_empty() {
        println!("(no tags to search for)");
        return;
    }
    println!("{}: {} files", res.primary.join(" "), res.primary_matches.len());
    for file in &res.primary_matches {
        println!("- {}", file.path);
    }
    for group in &res.secondary_groups {
        println!("\n{} ({})", group.tag, group.files.len());
        for file in &group.files {
            println!("- {}", file.path);
        }
    }
}

fn handle_saved(service: &NavigatorService, filter: &str, run: Option<&str>) -> anyhow::Result<()> {
    let searches = service.saved_searches(filter);
    let Some(id) = run else {
        for s in &searches {
            println!("{}\t{}\t{}", s.id, s.query, s.description);
        }
        return Ok(());
    };

    let search = searches
        .iter()
        .find(|s| s.id == id)
        .ok_or_else(|| anyhow::anyhow!("no saved search with id {id:?}"))?;
    let state = QueryState::new(&search.query);
    let result = service.run_query(&state)?;
    print_result(service, &state, &result);
    Ok(())
}

async fn handle_watch(service: &mut NavigatorService, args: SearchArgs) -> anyhow::Result<()> {
    let page_size = args.per_page.unwrap_or(service.config().files_per_page);
    let mut state = args.state();
    let mut events = service.subscribe();
    service.start_watching().await?;

    let (query_tx, mut query_rx) = debounce::spawn::<String>(service.config().query_debounce());
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if query_tx.send(line).is_err() {
                break;
            }
        }
    });

    print_result(service, &state, &service.run_query_paged(&state, page_size)?);
    println!("watching... (type a new query, Ctrl-C to stop)");

    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            query = query_rx.recv(), if stdin_open => {
                match query {
                    Some(raw) => {
                        state = state.with_query(&raw);
                        print_result(service, &state, &service.run_query_paged(&state, page_size)?);
                    }
                    None => stdin_open = false,
                }
            }
            ev = events.recv() => {
                match ev {
                    Ok(NavigatorEvent::SnapshotReloaded { rebuilt: true, .. }) => {
                        print_result(service, &state, &service.run_query_paged(&state, page_size)?);
                    }
                    Ok(NavigatorEvent::SnapshotReloaded { rebuilt: false, .. }) => {}
                    Ok(NavigatorEvent::Error { error }) => eprintln!("watch error: {error}"),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        eprintln!("(lagged {n} events)");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    service.shutdown().await;
    Ok(())
}

fn print_result(service: &NavigatorService, state: &QueryState, result: &QueryResult) {
    let fmt = DateFormat::new(&service.config().date_format);
    let page = &result.page;

    let mut header = format!(
        "{} files, sorted by {} {}",
        page.total_items,
        state.sort.column,
        match state.sort.dir {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    );
    if !result.date_label.is_empty() {
        header.push_str(&format!(" [{}]", result.date_label));
    }
    println!("{header}");

    for file in &page.items {
        println!(
            "{}\t{}\t{}",
            file.path,
            format_file_size(file.size),
            modified_text(&fmt, file)
        );
    }
    if page.total_pages > 1 {
        println!("page {}/{}", page.number, page.total_pages);
    }
}

fn print_json(
    service: &NavigatorService,
    state: &QueryState,
    result: &QueryResult,
) -> anyhow::Result<()> {
    let snapshot = service.snapshot();
    let links = snapshot.link_graph();
    let files: Vec<serde_json::Value> = result
        .page
        .items
        .iter()
        .map(|f| {
            serde_json::json!({
                "path": f.path,
                "category": f.category,
                "size": f.size,
                "modified_ms": f.modified_ms,
                "tags": f.display_tags,
                "backlinks": links.backlink_count(&f.path),
                "outgoing": links.outgoing_count(&f.path),
            })
        })
        .collect();
    let out = serde_json::json!({
        "query": state.raw,
        "sort": { "column": state.sort.column.as_str(), "asc": state.sort.dir == SortDir::Asc },
        "date_label": result.date_label,
        "page": result.page.number,
        "total_pages": result.page.total_pages,
        "total_items": result.page.total_items,
        "files": files,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn modified_text(fmt: &DateFormat, file: &FileRecord) -> String {
    file.modified_ms
        .and_then(|ms| fmt.format_ms(ms))
        .unwrap_or_default()
}

fn require_vault(vault: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    vault.ok_or_else(|| anyhow::anyhow!("--vault is required (or set OBSIDIAN_VAULT)"))
}
