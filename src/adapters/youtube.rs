//! YouTube Data API v3 client.
//!
//! Uses the `playlists`, `playlistItems` and `videos` list endpoints with an
//! API key. The key is passed in through [`YouTubeConfig`]; there is no
//! process-wide client.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::retry::RetryPolicy;
use super::PlaylistSource;
use crate::domain::{normalize_status, Item, RecordError, Snapshot, Status, RAW_UNSPECIFIED};

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Page size limit imposed by the API
pub const MAX_RESULTS: u32 = 50;

const KIND_VIDEO: &str = "youtube#video";

/// Errors from the YouTube API
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YouTube API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unsupported resource kind: {kind}")]
    UnsupportedResource { kind: String },

    #[error("Playlist not found: {playlist_id}")]
    PlaylistNotFound { playlist_id: String },

    #[error(transparent)]
    Record(#[from] RecordError),
}

impl AdapterError {
    /// Whether a retry might succeed
    fn is_transient(&self) -> bool {
        match self {
            AdapterError::Http(_) => true,
            AdapterError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Configuration for the YouTube client
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    /// API key (developer key)
    pub api_key: String,

    /// API root, overridable for testing
    pub base_url: String,

    /// Page size for list requests (capped at 50)
    pub max_results: u32,

    /// Maximum concurrent batch requests
    pub concurrency: usize,

    /// Retry policy for transient failures
    pub retry: RetryPolicy,
}

impl YouTubeConfig {
    /// Create a config with defaults for everything but the key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_results: MAX_RESULTS,
            concurrency: 10,
            retry: RetryPolicy::default(),
        }
    }
}

/// One page of a list response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    total_results: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// A `youtube#video` or `youtube#playlistItem` resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default)]
    pub kind: String,
    pub id: Option<String>,
    pub snippet: Option<Snippet>,
    pub status: Option<ResourceStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    pub resource_id: Option<ResourceId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    #[serde(default)]
    pub kind: String,
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    pub privacy_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistResource {
    snippet: Option<Snippet>,
}

impl Resource {
    /// Video id of either resource shape
    fn video_id(&self) -> Result<&str, AdapterError> {
        if self.kind == KIND_VIDEO {
            if let Some(id) = self.id.as_deref() {
                return Ok(id);
            }
        }

        let resource_id = self.snippet.as_ref().and_then(|s| s.resource_id.as_ref());
        match resource_id {
            Some(rid) if rid.kind == KIND_VIDEO => {
                rid.video_id.as_deref().ok_or_else(|| AdapterError::UnsupportedResource {
                    kind: format!("{} without videoId", rid.kind),
                })
            }
            Some(rid) => Err(AdapterError::UnsupportedResource {
                kind: rid.kind.clone(),
            }),
            None => Err(AdapterError::UnsupportedResource {
                kind: self.kind.clone(),
            }),
        }
    }

    /// Convert to an archive item with a normalized status
    pub fn to_item(&self) -> Result<Item, AdapterError> {
        let id = self.video_id()?;
        let title = self
            .snippet
            .as_ref()
            .map(|s| s.title.clone())
            .unwrap_or_default();
        let raw_status = self
            .status
            .as_ref()
            .and_then(|s| s.privacy_status.as_deref())
            .unwrap_or(RAW_UNSPECIFIED);

        let status = normalize_status(raw_status, &title);
        Ok(Item::from_identifier(id, title, status)?)
    }
}

/// YouTube Data API client
#[derive(Clone)]
pub struct YouTubeClient {
    config: Arc<YouTubeConfig>,
    client: reqwest::Client,
}

impl YouTubeClient {
    /// Create a new client
    pub fn new(config: YouTubeConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
        }
    }

    /// Build API URL
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    fn page_size(&self) -> u32 {
        self.config.max_results.clamp(1, MAX_RESULTS)
    }

    /// Single GET with retries on transient failures
    async fn get_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<ListResponse<T>, AdapterError> {
        let url = self.api_url(endpoint);
        let mut delays = self.config.retry.delays();
        let mut attempt = 1u32;

        loop {
            match self.try_get_page(&url, query).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() => match delays.next() {
                    Some(delay) => {
                        warn!(
                            endpoint,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_get_page<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<ListResponse<T>, AdapterError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AdapterError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Follow `nextPageToken` until the listing is exhausted
    async fn list_all<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        page_size: u32,
    ) -> Result<Vec<T>, AdapterError> {
        let mut items = Vec::new();
        let mut total_results: Option<usize> = None;
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = params.to_vec();
            query.push(("maxResults", page_size.to_string()));
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let page: ListResponse<T> = self.get_page(endpoint, &query).await?;

            if total_results.is_none() {
                total_results = page.page_info.as_ref().and_then(|p| p.total_results);
            }
            items.extend(page.items);
            debug!(endpoint, fetched = items.len(), total = ?total_results, "Fetched page");

            page_token = next_page_token(page.next_page_token, items.len(), total_results);
            if page_token.is_none() {
                break;
            }
        }

        Ok(items)
    }

    /// Fetch one batch of up to `max_results` video ids
    async fn fetch_video_batch(&self, ids: &[String]) -> Result<Vec<Item>, AdapterError> {
        let params = [
            ("part", "snippet,status".to_string()),
            ("id", ids.join(",")),
        ];
        let resources: Vec<Resource> = self.list_all("videos", &params, self.page_size()).await?;
        resources.iter().map(Resource::to_item).collect()
    }

    /// Fetch ids in concurrent batches, keeping request order
    async fn fetch_videos(&self, ids: &[String]) -> Result<Snapshot, AdapterError> {
        let requested = unique_ids(ids);
        let batch_size = self.page_size() as usize;
        let total_batches = requested.len().div_ceil(batch_size);

        let chunks: Vec<Vec<String>> = requested.chunks(batch_size).map(<[String]>::to_vec).collect();

        let batches: Vec<Vec<Item>> = stream::iter(chunks.into_iter().enumerate())
            .map(|(index, batch)| async move {
                debug!(batch = index + 1, total = total_batches, "Fetching video batch");
                let found = self.fetch_video_batch(&batch).await?;
                Ok::<_, AdapterError>(in_request_order(&batch, found))
            })
            .buffered(self.config.concurrency.max(1))
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }
}

/// Token for the next page, or `None` once the listing is complete
fn next_page_token(
    token: Option<String>,
    fetched: usize,
    total_results: Option<usize>,
) -> Option<String> {
    match total_results {
        Some(total) if fetched >= total => None,
        _ => token,
    }
}

/// Requested ids without repeats, first occurrence wins
fn unique_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Put a batch response back in request order.
///
/// The API silently skips videos it no longer knows; those come back as
/// `unavailable` placeholders.
fn in_request_order(batch: &[String], found: Vec<Item>) -> Vec<Item> {
    let mut by_id: HashMap<String, Item> =
        found.into_iter().map(|item| (item.id.clone(), item)).collect();

    batch
        .iter()
        .map(|id| {
            by_id.remove(id).unwrap_or_else(|| {
                debug!(%id, "Video not returned by API, marking unavailable");
                Item::new(id.clone(), "", Status::Unavailable)
            })
        })
        .collect()
}

#[async_trait]
impl PlaylistSource for YouTubeClient {
    fn name(&self) -> &str {
        "youtube"
    }

    #[instrument(skip(self))]
    async fn playlist_title(&self, playlist_id: &str) -> anyhow::Result<String> {
        let params = [
            ("part", "snippet".to_string()),
            ("id", playlist_id.to_string()),
        ];
        let playlists: Vec<PlaylistResource> = self.list_all("playlists", &params, 1).await?;

        let title = playlists
            .into_iter()
            .next()
            .and_then(|p| p.snippet)
            .map(|s| s.title)
            .ok_or_else(|| AdapterError::PlaylistNotFound {
                playlist_id: playlist_id.to_string(),
            })?;

        Ok(title)
    }

    #[instrument(skip(self))]
    async fn playlist_items(&self, playlist_id: &str) -> anyhow::Result<Snapshot> {
        let params = [
            ("part", "snippet,status".to_string()),
            ("playlistId", playlist_id.to_string()),
        ];
        let resources: Vec<Resource> = self
            .list_all("playlistItems", &params, self.page_size())
            .await?;

        let mut snapshot = resources
            .iter()
            .map(Resource::to_item)
            .collect::<Result<Snapshot, _>>()?;

        let repeated = snapshot.dedup();
        if !repeated.is_empty() {
            warn!(ids = ?repeated, "Playlist lists some videos more than once");
        }

        info!(count = snapshot.len(), "Fetched playlist items");
        Ok(snapshot)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn items_by_ids(&self, ids: &[String]) -> anyhow::Result<Snapshot> {
        let snapshot = self.fetch_videos(ids).await?;
        info!(count = snapshot.len(), "Fetched videos by id");
        Ok(snapshot)
    }
}

impl std::fmt::Debug for YouTubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTubeClient")
            .field("base_url", &self.config.base_url)
            .field("concurrency", &self.config.concurrency)
            .finish_non_exhaustive()
    }
}
