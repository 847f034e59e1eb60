//! Document store used to persist scan snapshots.
//!
//! Documents are JSON objects grouped into named collections. The loader only
//! needs a handful of operations: clear the `latest` flag across a collection
//! (the start of a snapshot), insert, upsert by `_id`, delete documents from
//! older runs, and simple reads for inspection.
//!
//! [`SqliteDocumentStore`] keeps each document's JSON body alongside indexed
//! `collection`, `doc_id`, `domain`, `latest` and `scan_date` columns lifted
//! from the body. [`MemoryDocumentStore`] keeps everything in a `Vec`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open document store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to create document store directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document store query failed: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Document JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document has no string '_id' field")]
    MissingId,

    #[error("A snapshot of '{0}' is already in progress")]
    SnapshotInProgress(String),
}

/// Selects documents for [`DocumentStore::find`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    /// Match the document's `domain` (or `_id` when it has no `domain`).
    pub domain: Option<String>,
    /// Only documents currently flagged `latest = true`.
    pub latest_only: bool,
}

impl DocumentFilter {
    pub fn latest() -> Self {
        Self {
            domain: None,
            latest_only: true,
        }
    }

    pub fn for_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    fn matches(&self, fields: &IndexedFields) -> bool {
        if self.latest_only && fields.latest != Some(true) {
            return false;
        }
        match &self.domain {
            Some(domain) => fields.domain.as_deref() == Some(domain.as_str()),
            None => true,
        }
    }
}

/// Generic document store the snapshot writer talks to.
pub trait DocumentStore {
    /// Human readable location, used in run narration.
    fn describe(&self) -> String;

    /// Start a snapshot of `collection`: every document with `latest = true`
    /// gets `latest = false`. Returns how many documents were changed.
    ///
    /// Implementations that support transactions may hold one open from here
    /// until [`finish_snapshot`](Self::finish_snapshot) so readers never see
    /// a collection without current documents.
    fn begin_snapshot(&mut self, collection: &str) -> Result<usize, StoreError>;

    fn insert_one(&mut self, collection: &str, document: &Value) -> Result<(), StoreError>;

    /// Make the snapshot started by `begin_snapshot` durable.
    fn finish_snapshot(&mut self, collection: &str) -> Result<(), StoreError>;

    /// Give up on a snapshot after a failure. Non-transactional stores keep
    /// whatever was already written.
    fn abort_snapshot(&mut self, collection: &str) -> Result<(), StoreError>;

    /// Insert or replace the document whose `_id` matches `document["_id"]`.
    fn upsert_by_id(&mut self, collection: &str, document: &Value) -> Result<(), StoreError>;

    /// Delete every document of `collection` whose `scan_date` is not `keep_scan_date`.
    fn delete_stale(&mut self, collection: &str, keep_scan_date: &str) -> Result<usize, StoreError>;

    fn find(&self, collection: &str, filter: &DocumentFilter) -> Result<Vec<Value>, StoreError>;
}

/// Columns lifted out of a document body for filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct IndexedFields {
    doc_id: Option<String>,
    domain: Option<String>,
    latest: Option<bool>,
    scan_date: Option<String>,
}

impl IndexedFields {
    fn of(document: &Value) -> Self {
        let doc_id = document.get("_id").and_then(Value::as_str).map(str::to_string);
        let domain = document
            .get("domain")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| doc_id.clone());
        Self {
            doc_id,
            domain,
            latest: document.get("latest").and_then(Value::as_bool),
            scan_date: document.get("scan_date").and_then(Value::as_str).map(str::to_string),
        }
    }
}

// ============================================================================
// SQLite
// ============================================================================

/// Options for [`SqliteDocumentStore::open`].
#[derive(Debug, Clone)]
pub struct SqliteStoreOptions {
    /// Logical database name shown in logs.
    pub name: String,
    /// Run each snapshot (rotation plus inserts) in a single transaction.
    pub atomic_snapshot: bool,
    pub busy_timeout_ms: u64,
}

impl Default for SqliteStoreOptions {
    fn default() -> Self {
        Self {
            name: "scan".to_string(),
            atomic_snapshot: false,
            busy_timeout_ms: 5_000,
        }
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
  seq INTEGER PRIMARY KEY AUTOINCREMENT,
  collection TEXT NOT NULL,
  doc_id TEXT NULL,
  domain TEXT NULL,
  latest INTEGER NULL,
  scan_date TEXT NULL,
  body TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS documents_doc_id_idx ON documents(collection, doc_id);
CREATE INDEX IF NOT EXISTS documents_latest_idx ON documents(collection, latest);
CREATE INDEX IF NOT EXISTS documents_domain_idx ON documents(collection, domain);
"#;

pub struct SqliteDocumentStore {
    conn: Connection,
    path: PathBuf,
    options: SqliteStoreOptions,
    open_snapshot: Option<String>,
}

impl SqliteDocumentStore {
    /// Open (creating if needed) the store file at `path`.
    pub fn open(path: &Path, options: SqliteStoreOptions) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
        conn.execute_batch(SCHEMA)?;

        debug!("Opened document store {} (atomic snapshots: {})", path.display(), options.atomic_snapshot);
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            options,
            open_snapshot: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_atomic(&self) -> bool {
        self.options.atomic_snapshot
    }

    fn decode(body: String, latest: Option<i64>) -> Result<Value, StoreError> {
        let mut document: Value = serde_json::from_str(&body)?;
        if let (Some(latest), Some(object)) = (latest, document.as_object_mut()) {
            object.insert("latest".to_string(), Value::Bool(latest != 0));
        }
        Ok(document)
    }

    /// Number of documents in a collection, regardless of flags.
    pub fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Fetch a single document by `_id`.
    pub fn get_by_id(&self, collection: &str, doc_id: &str) -> Result<Option<Value>, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT body, latest FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![collection, doc_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?)),
            )
            .optional()?;
        found.map(|(body, latest)| Self::decode(body, latest)).transpose()
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn describe(&self) -> String {
        format!("\"{}\" database at {}", self.options.name, self.path.display())
    }

    fn begin_snapshot(&mut self, collection: &str) -> Result<usize, StoreError> {
        if let Some(open) = &self.open_snapshot {
            return Err(StoreError::SnapshotInProgress(open.clone()));
        }
        if self.options.atomic_snapshot {
            self.conn.execute_batch("BEGIN IMMEDIATE")?;
            self.open_snapshot = Some(collection.to_string());
        }

        let cleared = self.conn.execute(
            "UPDATE documents SET latest = 0 WHERE collection = ?1 AND latest = 1",
            params![collection],
        )?;
        info!("Cleared latest flag on {} documents in {}", cleared, collection);
        Ok(cleared)
    }

    fn insert_one(&mut self, collection: &str, document: &Value) -> Result<(), StoreError> {
        let fields = IndexedFields::of(document);
        self.conn.execute(
            "INSERT INTO documents (collection, doc_id, domain, latest, scan_date, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                collection,
                fields.doc_id,
                fields.domain,
                fields.latest,
                fields.scan_date,
                serde_json::to_string(document)?,
            ],
        )?;
        Ok(())
    }

    fn finish_snapshot(&mut self, collection: &str) -> Result<(), StoreError> {
        if self.open_snapshot.take().is_some() {
            self.conn.execute_batch("COMMIT")?;
            debug!("Committed snapshot of {}", collection);
        }
        Ok(())
    }

    fn abort_snapshot(&mut self, collection: &str) -> Result<(), StoreError> {
        if self.open_snapshot.take().is_some() {
            self.conn.execute_batch("ROLLBACK")?;
            info!("Rolled back snapshot of {}", collection);
        }
        Ok(())
    }

    fn upsert_by_id(&mut self, collection: &str, document: &Value) -> Result<(), StoreError> {
        let fields = IndexedFields::of(document);
        let doc_id = fields.doc_id.as_deref().ok_or(StoreError::MissingId)?;
        self.conn.execute(
            "INSERT INTO documents (collection, doc_id, domain, latest, scan_date, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(collection, doc_id) DO UPDATE SET
               domain = excluded.domain,
               latest = excluded.latest,
               scan_date = excluded.scan_date,
               body = excluded.body",
            params![
                collection,
                doc_id,
                fields.domain,
                fields.latest,
                fields.scan_date,
                serde_json::to_string(document)?,
            ],
        )?;
        Ok(())
    }

    fn delete_stale(&mut self, collection: &str, keep_scan_date: &str) -> Result<usize, StoreError> {
        let deleted = self.conn.execute(
            "DELETE FROM documents
             WHERE collection = ?1 AND (scan_date IS NULL OR scan_date != ?2)",
            params![collection, keep_scan_date],
        )?;
        Ok(deleted)
    }

    fn find(&self, collection: &str, filter: &DocumentFilter) -> Result<Vec<Value>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT body, latest FROM documents
             WHERE collection = ?1
               AND (?2 = 0 OR latest = 1)
               AND (?3 IS NULL OR domain = ?3)
             ORDER BY seq",
        )?;
        let rows = stmt.query_map(
            params![collection, filter.latest_only, filter.domain],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?)),
        )?;

        let mut documents = Vec::new();
        for row in rows {
            let (body, latest) = row?;
            documents.push(Self::decode(body, latest)?);
        }
        Ok(documents)
    }
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Clone)]
struct StoredDocument {
    collection: String,
    fields: IndexedFields,
    body: Value,
}

/// Non-transactional store kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    documents: Vec<StoredDocument>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn describe(&self) -> String {
        "in-memory document store".to_string()
    }

    fn begin_snapshot(&mut self, collection: &str) -> Result<usize, StoreError> {
        let mut cleared = 0;
        for stored in self
            .documents
            .iter_mut()
            .filter(|d| d.collection == collection && d.fields.latest == Some(true))
        {
            stored.fields.latest = Some(false);
            if let Some(object) = stored.body.as_object_mut() {
                object.insert("latest".to_string(), Value::Bool(false));
            }
            cleared += 1;
        }
        Ok(cleared)
    }

    fn insert_one(&mut self, collection: &str, document: &Value) -> Result<(), StoreError> {
        self.documents.push(StoredDocument {
            collection: collection.to_string(),
            fields: IndexedFields::of(document),
            body: document.clone(),
        });
        Ok(())
    }

    fn finish_snapshot(&mut self, _collection: &str) -> Result<(), StoreError> {
        Ok(())
    }

    fn abort_snapshot(&mut self, _collection: &str) -> Result<(), StoreError> {
        Ok(())
    }

    fn upsert_by_id(&mut self, collection: &str, document: &Value) -> Result<(), StoreError> {
        let fields = IndexedFields::of(document);
        if fields.doc_id.is_none() {
            return Err(StoreError::MissingId);
        }
        let existing = self
            .documents
            .iter_mut()
            .find(|d| d.collection == collection && d.fields.doc_id == fields.doc_id);
        match existing {
            Some(stored) => {
                stored.fields = fields;
                stored.body = document.clone();
            }
            None => self.documents.push(StoredDocument {
                collection: collection.to_string(),
                fields,
                body: document.clone(),
            }),
        }
        Ok(())
    }

    fn delete_stale(&mut self, collection: &str, keep_scan_date: &str) -> Result<usize, StoreError> {
        let before = self.documents.len();
        self.documents.retain(|d| {
            d.collection != collection || d.fields.scan_date.as_deref() == Some(keep_scan_date)
        });
        Ok(before - self.documents.len())
    }

    fn find(&self, collection: &str, filter: &DocumentFilter) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .documents
            .iter()
            .filter(|d| d.collection == collection && filter.matches(&d.fields))
            .map(|d| d.body.clone())
            .collect())
    }
}
