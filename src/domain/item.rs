//! Archived playlist item.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::identifier::{parse_identifier, video_url, VIDEO_URL_STEM};
use super::status::Status;

/// Errors for records that cannot be used as merge input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("Duplicate identifier in snapshot: {id}")]
    DuplicateIdentifier { id: String },

    #[error("Malformed record: {reason}")]
    MalformedRecord { reason: String },
}

/// A single video in a playlist archive.
///
/// Identity is the `id` alone: two items are equal when their ids match,
/// whatever their title, url or status. Use [`Item::same_record`] to
/// compare every field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Stable video identifier (merge key)
    #[serde(default)]
    pub id: String,

    /// Canonical watch URL, derived from the id
    #[serde(default)]
    pub url: String,

    /// Display title; may drift to placeholders like "Deleted video"
    #[serde(default)]
    pub title: String,

    /// Availability status
    pub status: Status,
}

/// Partial update applied onto an existing item.
///
/// There is deliberately no `id` field: patching never changes identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub status: Option<Status>,
}

impl ItemPatch {
    /// Patch that only sets the status
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

impl Item {
    /// Create an item from a bare id
    pub fn new(id: impl Into<String>, title: impl Into<String>, status: Status) -> Self {
        let id = id.into();
        Self {
            url: video_url(&id),
            id,
            title: title.into(),
            status,
        }
    }

    /// Create an item from an id or watch URL, normalizing the identifier
    pub fn from_identifier(
        id_or_url: &str,
        title: impl Into<String>,
        status: Status,
    ) -> Result<Self, RecordError> {
        let parsed = parse_identifier(id_or_url, VIDEO_URL_STEM)?;
        Ok(Self {
            id: parsed.id,
            url: parsed.url,
            title: title.into(),
            status,
        })
    }

    /// Apply a partial update, keeping identity
    pub fn apply(&mut self, patch: ItemPatch) -> &mut Self {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self
    }

    /// Return the item with its status normalized against its title
    pub fn normalized(mut self) -> Self {
        self.status = self.status.normalized(&self.title);
        self
    }

    /// Compare every field, not just identity
    pub fn same_record(&self, other: &Item) -> bool {
        self.id == other.id
            && self.url == other.url
            && self.title == other.title
            && self.status == other.status
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
