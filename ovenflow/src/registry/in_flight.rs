//! Concurrent registry of items currently in the oven.

use crate::core::{Item, ItemId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Tracks the items that are currently executing the Bake stage.
///
/// An id is present exactly while its item is baking. Access is sharded, so
/// pipelines of unrelated items never contend on a single lock; operations on
/// one id are atomic with respect to each other.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    entries: DashMap<ItemId, Item>,
    insertions: AtomicU64,
    removals: AtomicU64,
}

impl InFlightRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an item, returning the previous entry for the same id if any.
    pub fn add(&self, id: ItemId, item: Item) -> Option<Item> {
        self.insertions.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(id, item)
    }

    /// Removes an item.
    ///
    /// Returns `None` if the id is absent, including when an earlier call
    /// already removed it, so cleanup paths may call this unconditionally.
    pub fn remove(&self, id: &ItemId) -> Option<Item> {
        let removed = self.entries.remove(id).map(|(_, item)| item);
        if removed.is_some() {
            self.removals.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Returns true if the id is currently registered.
    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.entries.contains_key(id)
    }

    /// Returns a clone of the registered item, if present.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<Item> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    /// Returns the number of items currently baking.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is baking.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a snapshot of the registered ids.
    #[must_use]
    pub fn ids(&self) -> Vec<ItemId> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }

    /// Lifetime count of `add` calls.
    #[must_use]
    pub fn insertions(&self) -> u64 {
        self.insertions.load(Ordering::Relaxed)
    }

    /// Lifetime count of `remove` calls that actually removed an entry.
    #[must_use]
    pub fn removals(&self) -> u64 {
        self.removals.load(Ordering::Relaxed)
    }
}
