// Persistent key-value store backed by SQLite, plus the session-scoped
// cache for the last displayed quote.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

use crate::catalog::Quote;

/// Key holding the JSON-encoded quote collection.
pub const KEY_QUOTES: &str = "quotes";

/// Key holding the last selected category filter.
pub const KEY_LAST_FILTER: &str = "lastFilter";

/// Session-only key holding the last displayed quote.
pub const KEY_LAST_QUOTE: &str = "lastQuote";

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

// ============================================================================
// QUOTE STORE (persistent)
// ============================================================================

pub struct QuoteStore {
    conn: Connection,
}

impl QuoteStore {
    /// Open (or create) the store at `path`, creating parent directories as
    /// needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("could not create data directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("could not open quote store at {}", path.display()))?;
        setup_database(&conn)?;

        Ok(QuoteStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(QuoteStore { conn })
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read the persisted collection. An absent key is a normal case and
    /// returns `None`; a present but unreadable value is an error.
    pub fn load_quotes(&self) -> Result<Option<Vec<Quote>>> {
        match self.get(KEY_QUOTES)? {
            Some(raw) => {
                let quotes = serde_json::from_str(&raw)
                    .context("stored quote collection is not valid JSON")?;
                Ok(Some(quotes))
            }
            None => Ok(None),
        }
    }

    pub fn save_quotes(&self, quotes: &[Quote]) -> Result<()> {
        let encoded = serde_json::to_string(quotes)?;
        self.put(KEY_QUOTES, &encoded)
    }

    pub fn load_filter(&self) -> Result<Option<String>> {
        self.get(KEY_LAST_FILTER)
    }

    pub fn save_filter(&self, filter: &str) -> Result<()> {
        self.put(KEY_LAST_FILTER, filter)
    }
}

// ============================================================================
// SESSION CACHE (in-memory, dies with the process)
// ============================================================================

/// Session-scoped key-value area. Values are JSON-encoded like the
/// persistent store's, but live only as long as the process.
#[derive(Debug, Default)]
pub struct SessionCache {
    values: HashMap<String, String>,
}

impl SessionCache {
    pub fn new() -> Self {
        SessionCache::default()
    }

    pub fn set_last_quote(&mut self, quote: &Quote) {
        if let Ok(encoded) = serde_json::to_string(quote) {
            self.values.insert(KEY_LAST_QUOTE.to_string(), encoded);
        }
    }

    pub fn last_quote(&self) -> Option<Quote> {
        let raw = self.values.get(KEY_LAST_QUOTE)?;
        serde_json::from_str(raw).ok()
    }
}

// ============================================================================
// TESTS
// ============================================================================
