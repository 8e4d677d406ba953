//! Cache of the last full playlist listing.
//!
//! Listing a large playlist costs one API call per 50 items. The cache keeps
//! the item URLs from the last listing so that, within the freshness window,
//! a run can re-fetch the same videos by id instead.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::debug;

use crate::domain::{parse_identifier, VIDEO_URL_STEM};

/// Default freshness window (one day)
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24);

/// File-based cache of playlist item URLs
#[derive(Debug, Clone)]
pub struct UrlCache {
    dir: PathBuf,
    max_age: Duration,
}

impl UrlCache {
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            dir: dir.into(),
            max_age,
        }
    }

    /// Path of the cache file for a playlist key
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("cached_urls_{}.json", key))
    }

    /// Load cached URLs if the cache file is younger than the freshness window
    pub async fn load_fresh(&self, key: &str) -> Result<Option<Vec<String>>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        if !self.is_fresh(&path).await? {
            debug!(path = %path.display(), "Cache is stale");
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read cache: {}", path.display()))?;
        let urls: Vec<String> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cache: {}", path.display()))?;

        Ok(Some(urls))
    }

    /// Store URLs for a playlist key
    pub async fn store(&self, key: &str, urls: &[String]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create cache directory: {}", self.dir.display()))?;

        let path = self.path_for(key);
        let content = serde_json::to_string_pretty(urls)?;
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write cache: {}", path.display()))?;

        Ok(())
    }

    async fn is_fresh(&self, path: &Path) -> Result<bool> {
        let modified = fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat cache: {}", path.display()))?
            .modified()?;

        // A modification time in the future counts as fresh
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);

        Ok(age < self.max_age)
    }
}

/// Turn cached URLs back into bare video ids, dropping extra parameters
pub fn ids_from_urls(urls: &[String]) -> Result<Vec<String>> {
    urls.iter()
        .map(|url| {
            parse_identifier(url, VIDEO_URL_STEM)
                .map(|parsed| parsed.id)
                .with_context(|| format!("Invalid cached URL: {}", url))
        })
        .collect()
}
