//! Adapter interfaces for playlist sources.
//!
//! The archive only needs two things from a source: the ordered items of a
//! playlist, and the current records for a list of ids.

pub mod retry;
pub mod youtube;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::Snapshot;

pub use retry::RetryPolicy;
pub use youtube::{AdapterError, YouTubeClient, YouTubeConfig};

/// Trait for remote playlist sources
///
/// Snapshots returned by a source carry normalized statuses.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Human-readable source name
    fn name(&self) -> &str;

    /// Title of a playlist
    async fn playlist_title(&self, playlist_id: &str) -> Result<String>;

    /// Current items of a playlist, in playlist order
    async fn playlist_items(&self, playlist_id: &str) -> Result<Snapshot>;

    /// Current records for the given video ids, in request order.
    ///
    /// Ids the source no longer knows come back as `unavailable`.
    async fn items_by_ids(&self, ids: &[String]) -> Result<Snapshot>;
}
