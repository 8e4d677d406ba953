//! Archive persistence.
//!
//! Two backends keep the same snapshot contract:
//! - `json`: one record-list file per playlist (`archive_<key>.json`)
//! - `sqlite`: one shared database with a keyed upsert per item
//!
//! Loaded snapshots are validated before they reach the reconciler.

pub mod json;
pub mod sqlite;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{RecordError, Snapshot};

pub use json::JsonArchive;
pub use sqlite::SqliteArchive;

/// Errors that can occur while loading or saving an archive
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unsupported archive format: expected a list of records, found {found}")]
    UnsupportedFormat { found: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid archive: {0}")]
    Record(#[from] RecordError),

    #[error("Storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Keyed snapshot storage
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Where the archive lives (for display)
    fn location(&self) -> String;

    /// Load the archived snapshot (empty if nothing was saved yet)
    async fn load(&self) -> Result<Snapshot, StoreError>;

    /// Persist a snapshot
    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Json => write!(f, "json"),
            StorageBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(StorageBackend::Json),
            "sqlite" | "db" => Ok(StorageBackend::Sqlite),
            _ => anyhow::bail!("Unknown storage backend: {}", s),
        }
    }
}

/// Column refreshed alongside `status` when an upserted row already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertField {
    #[default]
    Status,
    Title,
    Url,
}

impl UpsertField {
    /// Column name in the archive table
    pub fn column(&self) -> &'static str {
        match self {
            UpsertField::Status => "status",
            UpsertField::Title => "title",
            UpsertField::Url => "url",
        }
    }
}

/// Derive a filesystem- and table-safe key from a playlist title.
///
/// Path separators and control characters become `_`; an empty result
/// falls back to `playlist`.
pub fn archive_key(title: &str) -> String {
    let key: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if key.is_empty() || key.chars().all(|c| c == '.') {
        "playlist".to_string()
    } else {
        key
    }
}

/// Backend choice plus where archives live
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub backend: StorageBackend,
    pub archives_dir: PathBuf,
    pub upsert_field: UpsertField,
}

impl StoreSettings {
    /// Open the archive for one playlist key
    pub fn open(&self, key: &str) -> Box<dyn ArchiveStore> {
        match self.backend {
            StorageBackend::Json => Box::new(JsonArchive::in_dir(&self.archives_dir, key)),
            StorageBackend::Sqlite => Box::new(
                SqliteArchive::new(self.archives_dir.join(sqlite::DATABASE_FILE), key)
                    .with_upsert_field(self.upsert_field),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_key_sanitizes_separators() {
        assert_eq!(archive_key("Music / Live: 2024"), "Music _ Live_ 2024");
        assert_eq!(archive_key("  Watch later "), "Watch later");
        assert_eq!(archive_key(""), "playlist");
        assert_eq!(archive_key(".."), "playlist");
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("json".parse::<StorageBackend>().unwrap(), StorageBackend::Json);
        assert_eq!("SQLite".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert!("csv".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_settings_open_location() {
        let settings = StoreSettings {
            backend: StorageBackend::Json,
            archives_dir: PathBuf::from("/data"),
            upsert_field: UpsertField::Status,
        };
        assert_eq!(settings.open("Mix").location(), "/data/archive_Mix.json");

        let settings = StoreSettings {
            backend: StorageBackend::Sqlite,
            ..settings
        };
        assert_eq!(
            settings.open("Mix").location(),
            "/data/archive.sqlite3 [Mix]"
        );
    }

    #[test]
    fn test_upsert_columns() {
        assert_eq!(UpsertField::default().column(), "status");
        assert_eq!(UpsertField::Title.column(), "title");
    }
}
