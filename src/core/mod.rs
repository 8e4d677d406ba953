//! Core archive logic.
//!
//! This module contains:
//! - reconcile: merge an archived snapshot with a fresh fetch
//! - archiver: run orchestration around the reconciler

pub mod archiver;
pub mod reconcile;

// Re-export commonly used types
pub use archiver::{ArchiveReport, ArchiveRequest, Archiver, FetchOrigin};
pub use reconcile::{reconcile, ChangeCounts, Reconciliation, StatusChange};
