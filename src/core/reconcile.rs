//! Reconciliation of an archived snapshot against a fresh fetch.
//!
//! Rules:
//! - items are matched by id only
//! - an archived item takes a fresh status only if that status is
//!   restrictive (`private` / `unavailable`) and differs
//! - items that are new to the archive are appended as fetched
//! - archived items missing from the fetch become `removed`
//!
//! A fresh `available` never overwrites an archived `private` or
//! `unavailable`: once restricted, the record keeps that history.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{Item, ItemPatch, RecordError, Snapshot, Status};

/// Number of status transitions applied by one reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCounts {
    pub available: usize,
    pub removed: usize,
    pub private: usize,
    pub unavailable: usize,
}

impl ChangeCounts {
    /// Counter for a lattice status (`Raw` values have none)
    pub fn get(&self, status: &Status) -> Option<usize> {
        match status {
            Status::Available => Some(self.available),
            Status::Removed => Some(self.removed),
            Status::Private => Some(self.private),
            Status::Unavailable => Some(self.unavailable),
            Status::Raw(_) => None,
        }
    }

    fn increment(&mut self, status: &Status) {
        match status {
            Status::Available => self.available += 1,
            Status::Removed => self.removed += 1,
            Status::Private => self.private += 1,
            Status::Unavailable => self.unavailable += 1,
            Status::Raw(_) => {}
        }
    }

    /// Total number of transitions
    pub fn total(&self) -> usize {
        self.available + self.removed + self.private + self.unavailable
    }

    /// Counters as `(name, value)` pairs in display order
    pub fn entries(&self) -> [(&'static str, usize); 4] {
        [
            ("available", self.available),
            ("removed", self.removed),
            ("private", self.private),
            ("unavailable", self.unavailable),
        ]
    }
}

impl fmt::Display for ChangeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.entries().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}

/// A single status transition applied to an archived item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: String,
    pub title: String,
    pub from: Status,
    pub to: Status,
}

/// Result of reconciling two snapshots
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Archived items (with transitions applied) followed by new items
    pub merged: Snapshot,

    /// Transition counters
    pub counts: ChangeCounts,

    /// Transitions in the order they were applied
    pub changes: Vec<StatusChange>,

    /// Ids appended to the archive for the first time
    pub added: Vec<String>,
}

/// Merge a fresh snapshot into the archive.
///
/// Both snapshots are validated first; a missing id fails with
/// `MalformedRecord` and a repeated id with `DuplicateIdentifier`.
/// Output order is the archive order, then new items in fetch order.
pub fn reconcile(old: Snapshot, new: Snapshot) -> Result<Reconciliation, RecordError> {
    old.validate()?;
    new.validate()?;

    let mut merged: Vec<Item> = old.into_iter().collect();
    let archived: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(idx, item)| (item.id.clone(), idx))
        .collect();

    let mut counts = ChangeCounts::default();
    let mut changes = Vec::new();
    let mut added = Vec::new();
    let mut appended = Vec::new();
    let mut fetched: HashSet<String> = HashSet::with_capacity(new.len());

    for fresh in new {
        let fresh = fresh.normalized();
        fetched.insert(fresh.id.clone());

        match archived.get(&fresh.id) {
            Some(&idx) => {
                let existing = &mut merged[idx];
                if existing.status != fresh.status && fresh.status.is_restrictive() {
                    debug!(id = %existing.id, from = %existing.status, to = %fresh.status, "Status changed");
                    changes.push(StatusChange {
                        id: existing.id.clone(),
                        title: existing.title.clone(),
                        from: existing.status.clone(),
                        to: fresh.status.clone(),
                    });
                    counts.increment(&fresh.status);
                    existing.apply(ItemPatch::status(fresh.status));
                }
            }
            None => {
                debug!(id = %fresh.id, status = %fresh.status, "New item");
                added.push(fresh.id.clone());
                appended.push(fresh);
            }
        }
    }

    for existing in merged.iter_mut() {
        if fetched.contains(&existing.id) || existing.status == Status::Removed {
            continue;
        }
        debug!(id = %existing.id, from = %existing.status, "Removed from playlist");
        changes.push(StatusChange {
            id: existing.id.clone(),
            title: existing.title.clone(),
            from: existing.status.clone(),
            to: Status::Removed,
        });
        counts.increment(&Status::Removed);
        existing.apply(ItemPatch::status(Status::Removed));
    }

    merged.extend(appended);

    info!(
        total = merged.len(),
        added = added.len(),
        removed = counts.removed,
        private = counts.private,
        unavailable = counts.unavailable,
        "Reconciled archive"
    );

    Ok(Reconciliation {
        merged: merged.into(),
        counts,
        changes,
        added,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, status: Status) -> Item {
        Item::new(id, format!("Video {}", id), status)
    }

    #[test]
    fn test_counts_display_order() {
        let counts = ChangeCounts {
            available: 0,
            removed: 2,
            private: 1,
            unavailable: 0,
        };
        assert_eq!(
            counts.to_string(),
            "available: 0\nremoved: 2\nprivate: 1\nunavailable: 0"
        );
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.get(&Status::Raw("x".into())), None);
    }

    #[test]
    fn test_new_items_are_appended_after_archive() {
        let old: Snapshot = vec![item("a", Status::Available)].into();
        let new: Snapshot = vec![
            Item::new("b", "B", Status::from("public")),
            item("a", Status::from("public")),
        ]
        .into();

        let result = reconcile(old, new).unwrap();
        assert_eq!(result.merged.ids(), vec!["a", "b"]);
        assert_eq!(result.added, vec!["b".to_string()]);
        assert_eq!(result.merged.get("b").unwrap().status, Status::Available);
        assert_eq!(result.counts.total(), 0);
    }

    #[test]
    fn test_unavailable_to_private_is_recorded() {
        let old: Snapshot = vec![item("a", Status::Unavailable)].into();
        let new: Snapshot = vec![item("a", Status::from("private"))].into();

        let result = reconcile(old, new).unwrap();
        assert_eq!(result.merged.get("a").unwrap().status, Status::Private);
        assert_eq!(result.counts.private, 1);
        assert_eq!(
            result.changes,
            vec![StatusChange {
                id: "a".to_string(),
                title: "Video a".to_string(),
                from: Status::Unavailable,
                to: Status::Private,
            }]
        );
    }

    #[test]
    fn test_removed_item_reappearing_stays_removed_unless_restricted() {
        let old: Snapshot = vec![
            item("a", Status::Removed),
            item("b", Status::Removed),
        ]
        .into();
        let new: Snapshot = vec![
            item("a", Status::from("public")),
            Item::new("b", "Deleted video", Status::from("privacyStatusUnspecified")),
        ]
        .into();

        let result = reconcile(old, new).unwrap();
        assert_eq!(result.merged.get("a").unwrap().status, Status::Removed);
        assert_eq!(result.merged.get("b").unwrap().status, Status::Unavailable);
        assert_eq!(result.counts.unavailable, 1);
    }

    #[test]
    fn test_title_drift_is_not_propagated() {
        let old: Snapshot = vec![Item::new("a", "Original title", Status::Available)].into();
        let new: Snapshot = vec![Item::new("a", "Deleted video", Status::from("privacyStatusUnspecified"))].into();

        let result = reconcile(old, new).unwrap();
        let merged = result.merged.get("a").unwrap();
        assert_eq!(merged.title, "Original title");
        assert_eq!(merged.status, Status::Unavailable);
    }
}
