//! SQLite archive with keyed upserts.
//!
//! All playlists share one table keyed by `(archive_key, id)`. Saving
//! inserts unseen items and, for items already present, refreshes `status`
//! plus the configured [`UpsertField`]. Rows are never deleted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tracing::debug;

use super::{ArchiveStore, StoreError, UpsertField};
use crate::domain::{Item, Snapshot, Status};

/// Database file name inside the archives directory
pub const DATABASE_FILE: &str = "archive.sqlite3";

/// Busy timeout for archive connections
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS archive_items (
    archive_key TEXT NOT NULL,
    id          TEXT NOT NULL,
    url         TEXT NOT NULL,
    title       TEXT NOT NULL,
    status      TEXT NOT NULL,
    PRIMARY KEY (archive_key, id)
);
";

/// One playlist's archive inside the shared database
pub struct SqliteArchive {
    db_path: PathBuf,
    key: String,
    upsert_field: UpsertField,
}

impl SqliteArchive {
    pub fn new(db_path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            key: key.into(),
            upsert_field: UpsertField::default(),
        }
    }

    /// Choose which column an upsert refreshes on conflict
    pub fn with_upsert_field(mut self, field: UpsertField) -> Self {
        self.upsert_field = field;
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// Open (or create) the database and ensure the schema exists
fn open_connection(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

fn load_rows(path: &Path, key: &str) -> Result<Snapshot, StoreError> {
    let conn = open_connection(path)?;
    let mut stmt = conn.prepare(
        "SELECT id, url, title, status FROM archive_items
         WHERE archive_key = ?1
         ORDER BY rowid",
    )?;

    let rows = stmt.query_map([key], |row| {
        Ok(Item {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            status: Status::from(row.get::<_, String>(3)?),
        })
    })?;

    let snapshot = rows.collect::<Result<Snapshot, _>>()?;
    Ok(snapshot)
}

/// `SET` list for an existing row: status always, plus the extra field
fn conflict_updates(field: UpsertField) -> String {
    match field {
        UpsertField::Status => "status = excluded.status".to_string(),
        other => format!(
            "status = excluded.status, {column} = excluded.{column}",
            column = other.column()
        ),
    }
}

fn upsert_rows(
    path: &Path,
    key: &str,
    field: UpsertField,
    snapshot: &Snapshot,
) -> Result<usize, StoreError> {
    let mut conn = open_connection(path)?;
    let tx = conn.transaction()?;

    let sql = format!(
        "INSERT INTO archive_items (archive_key, id, url, title, status)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(archive_key, id) DO UPDATE SET {}",
        conflict_updates(field)
    );

    let mut written = 0;
    {
        let mut stmt = tx.prepare(&sql)?;
        for item in snapshot {
            written += stmt.execute(params![
                key,
                item.id,
                item.url,
                item.title,
                item.status.as_str()
            ])?;
        }
    }
    tx.commit()?;

    Ok(written)
}

#[async_trait]
impl ArchiveStore for SqliteArchive {
    fn location(&self) -> String {
        format!("{} [{}]", self.db_path.display(), self.key)
    }

    async fn load(&self) -> Result<Snapshot, StoreError> {
        let path = self.db_path.clone();
        let key = self.key.clone();

        let snapshot = tokio::task::spawn_blocking(move || load_rows(&path, &key)).await??;
        snapshot.validate()?;
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        snapshot.validate()?;

        let path = self.db_path.clone();
        let key = self.key.clone();
        let field = self.upsert_field;
        let snapshot = snapshot.clone();

        let written =
            tokio::task::spawn_blocking(move || upsert_rows(&path, &key, field, &snapshot)).await??;
        debug!(key = %self.key, written, field = field.column(), "Upserted archive rows");
        Ok(())
    }
}
