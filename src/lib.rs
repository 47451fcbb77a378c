// Quotedeck - Core Library
// Exposes all modules for use in the CLI, the TUI, and tests

pub mod catalog;
pub mod config;
pub mod reconciler;
pub mod render;
pub mod scheduler;
pub mod store;
pub mod transfer;

#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use catalog::{Catalog, FilterOptions, Quote, QuoteFilter, ValidationError};
pub use config::{AppConfig, DEFAULT_FETCH_LIMIT, DEFAULT_REMOTE_URL};
pub use reconciler::{
    merge_snapshot, Conflict, ConflictPolicy, HttpQuoteFeed, MergeOutcome, QuoteFeed,
    Reconciler, RemotePost, SyncReport, SERVER_CATEGORY,
};
pub use render::{
    pick_random, render_list, render_quote, render_random, NO_QUOTES_PLACEHOLDER,
    NO_RESULTS_PLACEHOLDER,
};
pub use scheduler::{
    run_cycle, SchedulerHandle, SyncEvent, SyncScheduler, DEFAULT_SYNC_INTERVAL,
};
pub use store::{QuoteStore, SessionCache, KEY_LAST_FILTER, KEY_LAST_QUOTE, KEY_QUOTES};
pub use transfer::{
    export_json, export_to_file, import_file, import_str, ImportError, DEFAULT_EXPORT_FILE,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
