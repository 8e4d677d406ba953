//! Archive run orchestration.
//!
//! One run: resolve the playlist, fetch its current items, load the
//! archive, reconcile, save the merged snapshot and log the run.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::adapters::PlaylistSource;
use crate::cache::{ids_from_urls, UrlCache};
use crate::domain::{parse_identifier, Snapshot, PLAYLIST_URL_STEM};
use crate::history::{History, RunRecord};
use crate::storage::{archive_key, StoreSettings};

use super::reconcile::{reconcile, Reconciliation};

/// What to archive
#[derive(Debug, Clone, Default)]
pub struct ArchiveRequest {
    /// Playlist id or URL
    pub playlist: String,

    /// Archive under this title instead of the playlist's own
    pub title: Option<String>,

    /// Fetch exactly these videos instead of listing the playlist
    pub item_urls: Vec<String>,
}

impl ArchiveRequest {
    pub fn new(playlist: impl Into<String>) -> Self {
        Self {
            playlist: playlist.into(),
            ..Default::default()
        }
    }
}

/// Outcome of one archive run
#[derive(Debug, Clone)]
pub struct ArchiveReport {
    pub run_id: Uuid,
    pub playlist_id: String,
    pub playlist_title: String,
    pub archive_location: String,
    pub reconciliation: Reconciliation,
}

/// Where the current snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    ExplicitUrls,
    Cache,
    Playlist,
}

/// Runs archive updates against a playlist source
pub struct Archiver<S: PlaylistSource> {
    source: S,
    store: StoreSettings,
    cache: UrlCache,
    history: History,
    use_cache: bool,
}

impl<S: PlaylistSource> Archiver<S> {
    pub fn new(source: S, store: StoreSettings, cache: UrlCache, history: History) -> Self {
        Self {
            source,
            store,
            cache,
            history,
            use_cache: false,
        }
    }

    /// Reuse a fresh listing from the URL cache, and refresh it after listing
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Execute one archive run
    #[instrument(skip(self, request), fields(playlist = %request.playlist, source = self.source.name()))]
    pub async fn run(&self, request: ArchiveRequest) -> Result<ArchiveReport> {
        let run_id = Uuid::new_v4();
        let playlist = parse_identifier(&request.playlist, PLAYLIST_URL_STEM)
            .context("Invalid playlist identifier")?;

        let playlist_title = match request.title {
            Some(title) => title,
            None => self
                .source
                .playlist_title(&playlist.id)
                .await
                .with_context(|| format!("Failed to fetch playlist {}", playlist.id))?,
        };
        let key = archive_key(&playlist_title);
        info!(%run_id, playlist_id = %playlist.id, title = %playlist_title, "Starting archive run");

        let (current, origin) = self
            .current_items(&playlist.id, &key, &request.item_urls)
            .await?;
        info!(count = current.len(), ?origin, "Fetched current items");

        let store = self.store.open(&key);
        let archived = store
            .load()
            .await
            .with_context(|| format!("Failed to load archive: {}", store.location()))?;

        let reconciliation =
            reconcile(archived, current).context("Failed to reconcile archive")?;

        store
            .save(&reconciliation.merged)
            .await
            .with_context(|| format!("Failed to save archive: {}", store.location()))?;

        let record = RunRecord {
            id: run_id,
            playlist_id: playlist.id.clone(),
            playlist_title: playlist_title.clone(),
            checked_at: Utc::now(),
            total_items: reconciliation.merged.len(),
            added: reconciliation.added.len(),
            counts: reconciliation.counts,
        };
        self.history.append(&record).await?;

        info!(%run_id, location = %store.location(), "Archive run completed");

        Ok(ArchiveReport {
            run_id,
            playlist_id: playlist.id,
            playlist_title,
            archive_location: store.location(),
            reconciliation,
        })
    }

    /// Fetch the current snapshot from explicit URLs, the cache or the playlist
    async fn current_items(
        &self,
        playlist_id: &str,
        key: &str,
        item_urls: &[String],
    ) -> Result<(Snapshot, FetchOrigin)> {
        if !item_urls.is_empty() {
            let ids = ids_from_urls(item_urls)?;
            let snapshot = self.source.items_by_ids(&ids).await?;
            return Ok((collapse_repeats(snapshot), FetchOrigin::ExplicitUrls));
        }

        if self.use_cache {
            if let Some(urls) = self.cache.load_fresh(key).await? {
                info!(count = urls.len(), "Using cached playlist listing");
                let ids = ids_from_urls(&urls)?;
                let snapshot = self.source.items_by_ids(&ids).await?;
                return Ok((collapse_repeats(snapshot), FetchOrigin::Cache));
            }
        }

        let snapshot = collapse_repeats(self.source.playlist_items(playlist_id).await?);
        if self.use_cache {
            self.cache.store(key, &snapshot.urls()).await?;
        }

        Ok((snapshot, FetchOrigin::Playlist))
    }
}

/// A playlist can hold the same video more than once; keep the first entry
fn collapse_repeats(mut snapshot: Snapshot) -> Snapshot {
    let dropped = snapshot.dedup();
    if !dropped.is_empty() {
        warn!(count = dropped.len(), ids = ?dropped, "Dropped repeated videos from fetch");
    }
    snapshot
}
