//! Domain types for the playlist archive.
//!
//! This module contains the record model:
//! - Item: one archived video, equal by id
//! - Snapshot: an ordered list of items
//! - Status: the availability lattice and its normalizer
//! - Identifier: id/URL normalization used for merge keys

pub mod identifier;
pub mod item;
pub mod snapshot;
pub mod status;

// Re-export commonly used types
pub use identifier::{parse_identifier, video_url, ParsedIdentifier, PLAYLIST_URL_STEM, VIDEO_URL_STEM};
pub use item::{Item, ItemPatch, RecordError};
pub use snapshot::Snapshot;
pub use status::{normalize_status, Status, DELETED_VIDEO_TITLE, RAW_UNSPECIFIED};
