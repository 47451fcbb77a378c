use anyhow::{anyhow, bail, Result};
use std::env;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing_subscriber::EnvFilter;

use quotedeck::{
    export_to_file, import_file, render_list, render_random, AppConfig, Catalog, HttpQuoteFeed,
    QuoteFilter, QuoteStore, Reconciler, SyncScheduler, DEFAULT_EXPORT_FILE,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env();
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("show") => cmd_show(&config, args.get(2).map(String::as_str)),
        Some("list") => cmd_list(&config, args.get(2).map(String::as_str)),
        Some("add") => cmd_add(&config, &args[2..]),
        Some("categories") => cmd_categories(&config),
        Some("import") => cmd_import(&config, args.get(2).map(String::as_str)),
        Some("export") => cmd_export(&config, args.get(2).map(String::as_str)),
        Some("sync") => cmd_sync(&config),
        Some("watch") => cmd_watch(&config),
        Some("help") | Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        Some(other) => {
            print_usage();
            bail!("unknown command: {other}")
        }
        None => run_tui_mode(&config),
    }
}

fn print_usage() {
    println!("quotedeck {}", quotedeck::VERSION);
    println!();
    println!("Usage: quotedeck [command]");
    println!();
    println!("Commands:");
    println!("  (none)              interactive terminal UI");
    println!("  show [category]     print one random quote");
    println!("  list [category]     print every matching quote");
    println!("  add <text> <cat>    add a quote");
    println!("  categories          print the known categories");
    println!("  import <file>       append quotes from a JSON file");
    println!("  export [file]       write the collection to a JSON file");
    println!("  sync                reconcile with the remote source once");
    println!("  watch               sync periodically until Ctrl-C");
}

fn open_store(config: &AppConfig) -> Result<QuoteStore> {
    QuoteStore::open(&config.db_path)
}

fn build_reconciler(config: &AppConfig) -> Reconciler {
    Reconciler::new(Box::new(HttpQuoteFeed::new(config.remote_url.clone())))
        .with_policy(config.conflict_policy)
        .with_fetch_limit(config.fetch_limit)
        .with_push(config.push_after_merge)
}

/// An explicit category argument wins and is persisted as the new
/// selection; otherwise the stored filter is restored.
fn resolve_filter(store: &QuoteStore, arg: Option<&str>) -> Result<QuoteFilter> {
    match arg {
        Some(raw) => {
            let filter = QuoteFilter::parse(raw);
            store.save_filter(filter.as_str())?;
            Ok(filter)
        }
        None => Ok(store
            .load_filter()?
            .map(|raw| QuoteFilter::parse(&raw))
            .unwrap_or(QuoteFilter::All)),
    }
}

fn cmd_show(config: &AppConfig, category: Option<&str>) -> Result<()> {
    let store = open_store(config)?;
    let catalog = Catalog::load(&store, config.filter)?;
    let filter = resolve_filter(&store, category)?;

    println!("{}", render_random(&catalog.filter(&filter)));
    Ok(())
}

fn cmd_list(config: &AppConfig, category: Option<&str>) -> Result<()> {
    let store = open_store(config)?;
    let catalog = Catalog::load(&store, config.filter)?;
    let filter = resolve_filter(&store, category)?;

    println!("{}", render_list(&catalog.filter(&filter)));
    Ok(())
}

fn cmd_add(config: &AppConfig, args: &[String]) -> Result<()> {
    let (text, category) = match args {
        [text, category] => (text, category),
        _ => bail!("usage: quotedeck add <text> <category>"),
    };

    let store = open_store(config)?;
    let mut catalog = Catalog::load(&store, config.filter)?;

    let quote = catalog.add(text, category).map_err(|error| anyhow!(error))?;
    store.save_quotes(catalog.quotes())?;

    println!("✓ Quote added successfully under \"{}\"", quote.category);
    Ok(())
}

fn cmd_categories(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;
    let catalog = Catalog::load(&store, config.filter)?;

    for category in catalog.categories() {
        println!("{category}");
    }
    Ok(())
}

fn cmd_import(config: &AppConfig, path: Option<&str>) -> Result<()> {
    let Some(path) = path else {
        bail!("usage: quotedeck import <file>");
    };

    let store = open_store(config)?;
    let mut catalog = Catalog::load(&store, config.filter)?;

    let count = import_file(&mut catalog, Path::new(path))?;
    store.save_quotes(catalog.quotes())?;

    println!("✓ Imported {} quotes ({} total)", count, catalog.len());
    Ok(())
}

fn cmd_export(config: &AppConfig, path: Option<&str>) -> Result<()> {
    let store = open_store(config)?;
    let catalog = Catalog::load(&store, config.filter)?;

    let path = Path::new(path.unwrap_or(DEFAULT_EXPORT_FILE));
    export_to_file(&catalog, path)?;

    println!("✓ Exported {} quotes to {}", catalog.len(), path.display());
    Ok(())
}

fn cmd_sync(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;
    let mut catalog = Catalog::load(&store, config.filter)?;
    let reconciler = build_reconciler(config);

    let runtime = tokio::runtime::Runtime::new()?;
    match runtime.block_on(reconciler.sync(&mut catalog)) {
        Ok(report) => {
            store.save_quotes(catalog.quotes())?;
            println!("{}", report.summary());
            for conflict in &report.conflicts {
                println!(
                    "  conflict: \"{}\" local [{}] vs server [{}] -> {}",
                    conflict.text,
                    conflict.local_category,
                    conflict.remote_category,
                    if conflict.resolved {
                        "server kept"
                    } else {
                        "local kept"
                    }
                );
            }
            Ok(())
        }
        Err(error) => bail!("Failed to sync with server: {error:#}"),
    }
}

fn cmd_watch(config: &AppConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;

    let store = open_store(config)?;
    let catalog = Catalog::load(&store, config.filter)?;

    let catalog = Arc::new(Mutex::new(catalog));
    let store = Arc::new(Mutex::new(store));
    let reconciler = Arc::new(build_reconciler(config));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = {
        let _guard = runtime.enter();
        SyncScheduler::new(config.sync_interval).spawn(reconciler, catalog, store, tx)
    };

    println!(
        "Syncing every {}s against {} (Ctrl-C to stop)",
        config.sync_interval.as_secs(),
        config.remote_url
    );

    runtime.block_on(async {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = rx.recv() => match event {
                    Some(event) => println!("{}", event.message()),
                    None => break,
                }
            }
        }
    });

    runtime.block_on(handle.shutdown());
    println!("✓ Watch stopped");
    Ok(())
}

#[cfg(feature = "tui")]
fn run_tui_mode(config: &AppConfig) -> Result<()> {
    use quotedeck::ui;

    let runtime = tokio::runtime::Runtime::new()?;

    let store = open_store(config)?;
    let catalog = Catalog::load(&store, config.filter)?;
    let filter = store
        .load_filter()?
        .map(|raw| QuoteFilter::parse(&raw))
        .unwrap_or(QuoteFilter::All);

    let catalog = Arc::new(Mutex::new(catalog));
    let store = Arc::new(Mutex::new(store));
    let reconciler = Arc::new(build_reconciler(config));
    let (tx, rx) = mpsc::unbounded_channel();

    let handle = {
        let _guard = runtime.enter();
        SyncScheduler::new(config.sync_interval).spawn(
            Arc::clone(&reconciler),
            Arc::clone(&catalog),
            Arc::clone(&store),
            tx.clone(),
        )
    };

    let mut app = ui::App::new(
        catalog,
        store,
        reconciler,
        runtime.handle().clone(),
        tx,
        rx,
        quotedeck::SessionCache::new(),
        filter,
    );
    ui::run_ui(&mut app)?;

    runtime.block_on(handle.shutdown());
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_tui_mode(_config: &AppConfig) -> Result<()> {
    eprintln!("TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or run a command: quotedeck help");
    std::process::exit(1);
}
