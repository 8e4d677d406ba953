//! JSON record-list archive.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{ArchiveStore, StoreError};
use crate::domain::Snapshot;

/// Archive stored as a pretty-printed JSON array of records
pub struct JsonArchive {
    path: PathBuf,
}

impl JsonArchive {
    /// Archive at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Archive `archive_<key>.json` inside a directory
    pub fn in_dir(dir: &Path, key: &str) -> Self {
        Self::new(dir.join(format!("archive_{}.json", key)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse archive text, rejecting anything that is not a record list
pub fn parse_archive(content: &str) -> Result<Snapshot, StoreError> {
    let value: serde_json::Value = serde_json::from_str(content)?;

    let found = match &value {
        serde_json::Value::Array(_) => None,
        serde_json::Value::Object(_) => Some("object"),
        serde_json::Value::String(_) => Some("string"),
        serde_json::Value::Number(_) => Some("number"),
        serde_json::Value::Bool(_) => Some("boolean"),
        serde_json::Value::Null => Some("null"),
    };
    if let Some(found) = found {
        return Err(StoreError::UnsupportedFormat {
            found: found.to_string(),
        });
    }

    let snapshot: Snapshot = serde_json::from_value(value)?;
    snapshot.validate()?;
    Ok(snapshot)
}

#[async_trait]
impl ArchiveStore for JsonArchive {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<Snapshot, StoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No archive yet");
            return Ok(Snapshot::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        parse_archive(&content)
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(snapshot)?;

        // Replace atomically; a failed write leaves the previous archive in place
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &self.path).await?;

        debug!(path = %self.path.display(), items = snapshot.len(), "Saved archive");
        Ok(())
    }
}
