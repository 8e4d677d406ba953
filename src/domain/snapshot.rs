//! Ordered collection of items from one fetch or one archive read.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::item::{Item, RecordError};
use super::status::Status;

/// An ordered snapshot of a playlist.
///
/// Serializes as a plain JSON array of records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    items: Vec<Item>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that every item has an id and no id repeats
    pub fn validate(&self) -> Result<(), RecordError> {
        let mut seen = HashSet::with_capacity(self.items.len());

        for (position, item) in self.items.iter().enumerate() {
            if item.id.is_empty() {
                return Err(RecordError::MalformedRecord {
                    reason: format!("item at position {} has no id", position),
                });
            }
            if !seen.insert(item.id.as_str()) {
                return Err(RecordError::DuplicateIdentifier {
                    id: item.id.clone(),
                });
            }
        }

        Ok(())
    }

    /// Drop repeated ids, keeping each first occurrence.
    ///
    /// Returns the ids that were dropped, once per dropped record.
    pub fn dedup(&mut self) -> Vec<String> {
        let mut seen = HashSet::with_capacity(self.items.len());
        let mut dropped = Vec::new();

        self.items.retain(|item| {
            if seen.insert(item.id.clone()) {
                true
            } else {
                dropped.push(item.id.clone());
                false
            }
        });

        dropped
    }

    /// Append an item
    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Get an item by id
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Identifiers in snapshot order
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.id.as_str()).collect()
    }

    /// Watch URLs in snapshot order
    pub fn urls(&self) -> Vec<String> {
        self.items.iter().map(|i| i.url.clone()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items per status
    pub fn count_by_status(&self) -> BTreeMap<Status, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            *counts.entry(item.status.clone()).or_insert(0) += 1;
        }
        counts
    }
}

impl From<Vec<Item>> for Snapshot {
    fn from(items: Vec<Item>) -> Self {
        Self { items }
    }
}

impl FromIterator<Item> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Snapshot {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
