//! Append-only log of archive runs.
//!
//! Each successful run appends one JSON line to `history.jsonl`, so the
//! archive's evolution can be inspected without diffing old archive files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::core::ChangeCounts;

/// One archive run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique identifier for this run
    pub id: Uuid,

    /// Playlist identifier
    pub playlist_id: String,

    /// Playlist title used as the archive key
    pub playlist_title: String,

    /// When the run finished
    pub checked_at: DateTime<Utc>,

    /// Items in the archive after the run
    pub total_items: usize,

    /// Items archived for the first time
    pub added: usize,

    /// Status transitions applied
    pub counts: ChangeCounts,
}

/// JSONL run history
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a run to the log
    pub async fn append(&self, record: &RunRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open history file: {}", self.path.display()))?;

        let json = serde_json::to_string(record).context("Failed to serialize run record")?;
        file.write_all(format!("{}\n", json).as_bytes())
            .await
            .context("Failed to write run record")?;
        file.flush().await.context("Failed to flush run record")?;

        Ok(())
    }

    /// Replay all runs in order
    pub async fn replay(&self) -> Result<Vec<RunRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open history file: {}", self.path.display()))?;

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut records = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let record: RunRecord = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse run record: {}", line))?;
            records.push(record);
        }

        Ok(records)
    }

    /// Most recent runs first
    pub async fn recent(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let mut records = self.replay().await?;
        records.sort_by(|a, b| b.checked_at.cmp(&a.checked_at));
        records.truncate(limit);
        Ok(records)
    }
}
