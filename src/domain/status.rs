//! Availability status of an archived item.
//!
//! The archive tracks a small lattice:
//! `available` → `private` / `unavailable` → `removed`.
//! `removed` is never reported by the source; it is inferred when an
//! item drops out of the playlist.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Title the source substitutes for videos that were deleted by their owner
pub const DELETED_VIDEO_TITLE: &str = "Deleted video";

/// Raw status the source reports for deleted videos
pub const RAW_UNSPECIFIED: &str = "privacyStatusUnspecified";

/// Status of an item in the archive
///
/// Anything outside the lattice is kept verbatim in `Raw` so that new
/// source vocabulary is never silently misclassified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    /// Publicly viewable (public or unlisted at the source)
    Available,

    /// Made private by the uploader
    Private,

    /// Deleted or otherwise unplayable
    Unavailable,

    /// No longer listed in the playlist
    Removed,

    /// Source vocabulary that has not been normalized
    Raw(String),
}

impl Status {
    /// Whether the reconciler may overwrite an archived status with this one
    pub fn is_restrictive(&self) -> bool {
        matches!(self, Status::Private | Status::Unavailable)
    }

    /// Get the text form
    pub fn as_str(&self) -> &str {
        match self {
            Status::Available => "available",
            Status::Private => "private",
            Status::Unavailable => "unavailable",
            Status::Removed => "removed",
            Status::Raw(raw) => raw,
        }
    }

    /// Normalize this status against the item's title.
    ///
    /// Lattice values are already normal; only `Raw` can change.
    pub fn normalized(&self, title: &str) -> Status {
        match self {
            Status::Raw(raw) => normalize_status(raw, title),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        match s {
            "available" => Status::Available,
            "private" => Status::Private,
            "unavailable" => Status::Unavailable,
            "removed" => Status::Removed,
            other => Status::Raw(other.to_string()),
        }
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        match Status::from(s.as_str()) {
            Status::Raw(_) => Status::Raw(s),
            status => status,
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Raw(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

/// Map a source-reported privacy status onto the archive lattice.
///
/// Rules, in order:
/// 1. `public` and `unlisted` are `available`
/// 2. `privacyStatusUnspecified` with the title `Deleted video` is `unavailable`
/// 3. anything else passes through unchanged
pub fn normalize_status(raw: &str, title: &str) -> Status {
    match raw {
        "public" | "unlisted" => Status::Available,
        RAW_UNSPECIFIED if title == DELETED_VIDEO_TITLE => Status::Unavailable,
        other => Status::from(other),
    }
}
