//! Persistent store for sources and items
//!
//! SQLite-backed, single writer. Item uniqueness is enforced by a UNIQUE
//! index on the URL fingerprint: inserting a URL that already exists is a
//! successful no-op, which is the system's sole deduplication mechanism.
//! The ingest path never touches summary fields; the summarize path never
//! touches source rows.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};
use crate::fetch::Validators;
use crate::models::{Item, ItemDraft, ItemStatus, Source, SourceKind};
use crate::sources::SourceEntry;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    source_url TEXT NOT NULL,
    feed_url TEXT,
    type TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    last_fetch_at TEXT,
    etag TEXT,
    last_modified TEXT
);

CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY,
    source_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    guid TEXT,
    published_at TEXT,
    fetched_at TEXT NOT NULL,
    content_text TEXT,
    url_hash TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'new',
    summary_json TEXT,
    model_used TEXT,
    FOREIGN KEY (source_id) REFERENCES sources(id)
);

CREATE INDEX IF NOT EXISTS idx_items_status ON items(status);
CREATE INDEX IF NOT EXISTS idx_items_url_hash ON items(url_hash);
CREATE INDEX IF NOT EXISTS idx_items_published_at ON items(published_at);
"#;

/// Outcome of an item insertion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was created
    Inserted(i64),

    /// The URL fingerprint already exists; nothing was written
    AlreadyPresent,
}

/// Store-wide counts for operator visibility
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub sources_total: usize,
    pub sources_active: usize,
    pub items_total: usize,
    pub items_new: usize,
    pub items_summarized: usize,
}

/// SQLite-backed store for sources and items
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL keeps readers unblocked and leaves writer serialization
        // to SQLite itself
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self { conn };
        store.create_schema()?;

        info!(path = %path.display(), "Store opened");
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------

    /// Create or update a source keyed by its canonical URL
    ///
    /// Never creates a second row for the same URL. An explicit `feed_url`
    /// in the entry overwrites the stored one and reactivates the source;
    /// that is the operator's correction path for a deactivated source.
    pub fn upsert_source(&self, entry: &SourceEntry) -> Result<Source> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM sources WHERE source_url = ?1",
                params![entry.url],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => {
                self.conn.execute(
                    "UPDATE sources SET name = ?1, type = ?2 WHERE id = ?3",
                    params![entry.name, entry.kind.as_str(), id],
                )?;
                if let Some(feed_url) = &entry.feed_url {
                    self.conn.execute(
                        "UPDATE sources SET feed_url = ?1, active = 1 WHERE id = ?2",
                        params![feed_url, id],
                    )?;
                }
                id
            }
            None => {
                self.conn.execute(
                    "INSERT INTO sources (name, source_url, feed_url, type, active)
                     VALUES (?1, ?2, ?3, ?4, 1)",
                    params![entry.name, entry.url, entry.feed_url, entry.kind.as_str()],
                )?;
                self.conn.last_insert_rowid()
            }
        };

        self.get_source(id)?
            .ok_or_else(|| Error::invariant(format!("source {id} vanished after upsert")))
    }

    /// Fetch a source row by id
    pub fn get_source(&self, id: i64) -> Result<Option<Source>> {
        let source = self
            .conn
            .query_row(
                "SELECT id, name, source_url, feed_url, type, active,
                        last_fetch_at, etag, last_modified
                 FROM sources WHERE id = ?1",
                params![id],
                row_to_source,
            )
            .optional()?;
        Ok(source)
    }

    /// Record the resolved feed location and mark the source active
    pub fn set_feed_url(&self, source_id: i64, feed_url: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE sources SET feed_url = ?1, active = 1 WHERE id = ?2",
            params![feed_url, source_id],
        )?;
        Ok(())
    }

    /// Deactivate a source; it stays inactive until manually corrected
    pub fn deactivate_source(&self, source_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE sources SET active = 0 WHERE id = ?1",
            params![source_id],
        )?;
        Ok(())
    }

    /// Persist fresh cache validators and stamp the fetch time
    pub fn update_validators(&self, source_id: i64, validators: &Validators) -> Result<()> {
        self.conn.execute(
            "UPDATE sources SET etag = ?1, last_modified = ?2, last_fetch_at = ?3
             WHERE id = ?4",
            params![
                validators.etag,
                validators.last_modified,
                Utc::now().to_rfc3339(),
                source_id
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Check whether an item with this URL is already stored
    ///
    /// Used to skip page fetches for known entries; [`Store::insert_item`]
    /// remains the dedup authority either way.
    pub fn contains_url(&self, url: &str) -> Result<bool> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM items WHERE url_hash = ?1",
                params![crate::models::url_fingerprint(url)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    /// Insert an item draft, deduplicating on the URL fingerprint
    ///
    /// Re-insertion of an existing fingerprint is a successful no-op,
    /// never an error and never a duplicate row.
    pub fn insert_item(&self, draft: &ItemDraft) -> Result<InsertOutcome> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO items
             (source_id, title, url, guid, published_at, fetched_at,
              content_text, url_hash, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'new')",
            params![
                draft.source_id,
                draft.title,
                draft.url,
                draft.guid,
                draft.published_at.map(|dt| dt.to_rfc3339()),
                Utc::now().to_rfc3339(),
                draft.content_text,
                draft.url_hash(),
            ],
        )?;

        if changed == 0 {
            Ok(InsertOutcome::AlreadyPresent)
        } else {
            Ok(InsertOutcome::Inserted(self.conn.last_insert_rowid()))
        }
    }

    /// Select up to `limit` items still awaiting summarization
    pub fn select_pending(&self, limit: usize) -> Result<Vec<Item>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source_id, title, url, guid, published_at, fetched_at,
                    content_text, url_hash, status, summary_json, model_used
             FROM items WHERE status = 'new'
             ORDER BY published_at DESC
             LIMIT ?1",
        )?;

        let items = stmt
            .query_map(params![limit as i64], row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Atomic transition from `new` to `summarized`
    ///
    /// Calling this on an item that is not `new` is an invariant
    /// violation: it means the single-writer sequential ordering was
    /// broken somewhere.
    pub fn mark_summarized(
        &self,
        item_id: i64,
        summary_json: &str,
        model_used: &str,
    ) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE items SET summary_json = ?1, model_used = ?2, status = 'summarized'
             WHERE id = ?3 AND status = 'new'",
            params![summary_json, model_used, item_id],
        )?;

        if updated == 1 {
            return Ok(());
        }

        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM items WHERE id = ?1",
                params![item_id],
                |row| row.get(0),
            )
            .optional()?;

        match status {
            Some(status) => Err(Error::invariant(format!(
                "item {item_id} is '{status}', expected 'new'"
            ))),
            None => Err(Error::invariant(format!("item {item_id} does not exist"))),
        }
    }

    /// Most recent summarized items with their source names, newest first
    pub fn recent_summarized(&self, limit: usize) -> Result<Vec<(Item, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT items.id, items.source_id, items.title, items.url, items.guid,
                    items.published_at, items.fetched_at, items.content_text,
                    items.url_hash, items.status, items.summary_json, items.model_used,
                    sources.name
             FROM items
             JOIN sources ON items.source_id = sources.id
             WHERE items.status = 'summarized'
             ORDER BY items.published_at DESC
             LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row_to_item(row)?, row.get::<_, String>(12)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Store-wide counts
    pub fn stats(&self) -> Result<StoreStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(StoreStats {
            sources_total: count("SELECT COUNT(*) FROM sources")?,
            sources_active: count("SELECT COUNT(*) FROM sources WHERE active = 1")?,
            items_total: count("SELECT COUNT(*) FROM items")?,
            items_new: count("SELECT COUNT(*) FROM items WHERE status = 'new'")?,
            items_summarized: count("SELECT COUNT(*) FROM items WHERE status = 'summarized'")?,
        })
    }
}

fn row_to_source(row: &Row<'_>) -> rusqlite::Result<Source> {
    let kind_str: String = row.get(4)?;
    let kind = SourceKind::parse(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown source kind: {kind_str}").into(),
        )
    })?;

    Ok(Source {
        id: row.get(0)?,
        name: row.get(1)?,
        source_url: row.get(2)?,
        feed_url: row.get(3)?,
        kind,
        active: row.get::<_, i64>(5)? != 0,
        last_fetch_at: parse_timestamp(row, 6)?,
        etag: row.get(7)?,
        last_modified: row.get(8)?,
    })
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    let status_str: String = row.get(9)?;
    let status = ItemStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            9,
            rusqlite::types::Type::Text,
            format!("unknown item status: {status_str}").into(),
        )
    })?;

    Ok(Item {
        id: row.get(0)?,
        source_id: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        guid: row.get(4)?,
        published_at: parse_timestamp(row, 5)?,
        fetched_at: parse_timestamp(row, 6)?.ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Text,
                "fetched_at is required".into(),
            )
        })?,
        content_text: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        url_hash: row.get(8)?,
        status,
        summary_json: row.get(10)?,
        model_used: row.get(11)?,
    })
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            }),
    }
}
