//! playlist-archive - track playlist contents over time
//!
//! Keeps an archive of every video that has ever been in a playlist and
//! records when a video turns private, gets deleted, or is dropped from
//! the playlist.
//!
//! # Architecture
//!
//! Each run is a reconciliation:
//! - the current playlist is fetched (or re-fetched by id from a cache)
//! - the stored archive is loaded
//! - the two snapshots are merged by video id
//! - the merged archive is saved and the run is logged
//!
//! # Modules
//!
//! - `domain`: Data structures (Item, Snapshot, Status)
//! - `core`: Reconciliation and run orchestration
//! - `adapters`: Playlist sources (YouTube Data API)
//! - `storage`: Archive backends (JSON, SQLite)
//! - `cache`: Cached playlist listings
//! - `history`: Run log
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Archive a playlist
//! plarchive archive "https://www.youtube.com/playlist?list=PL..."
//!
//! # Show videos that went private
//! plarchive show "My playlist" --status private
//!
//! # List past runs
//! plarchive history
//! ```

pub mod adapters;
pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod history;
pub mod storage;

// Re-export main types at crate root for convenience
pub use crate::core::{reconcile, Archiver, ChangeCounts, Reconciliation};
pub use crate::domain::{normalize_status, parse_identifier, Item, ItemPatch, RecordError, Snapshot, Status};
pub use crate::storage::{ArchiveStore, StoreError};
