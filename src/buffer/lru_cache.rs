use linked_hash_map::LinkedHashMap;

use crate::common::PageId;

/// Recency-ordered page map.
///
/// Iteration runs from the least recently touched page to the most recently
/// touched one. `get` and `insert` both count as a touch.
pub struct LruCache<V> {
    entries: LinkedHashMap<PageId, V>,
}

impl<V> LruCache<V> {
    pub fn new() -> Self {
        Self {
            entries: LinkedHashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, page_id: &PageId) -> bool {
        self.entries.contains_key(page_id)
    }

    /// Looks up a page and marks it most recently used.
    pub fn get(&mut self, page_id: &PageId) -> Option<&mut V> {
        self.entries.get_refresh(page_id)
    }

    /// Looks up a page without changing its position.
    pub fn peek(&self, page_id: &PageId) -> Option<&V> {
        self.entries.get(page_id)
    }

    /// Inserts or replaces a page; either way it becomes most recently used.
    pub fn insert(&mut self, page_id: PageId, value: V) -> Option<V> {
        let previous = self.entries.remove(&page_id);
        self.entries.insert(page_id, value);
        previous
    }

    pub fn remove(&mut self, page_id: &PageId) -> Option<V> {
        self.entries.remove(page_id)
    }

    /// Entries from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = (&PageId, &V)> {
        self.entries.iter()
    }

    /// Page ids from least to most recently used.
    pub fn page_ids(&self) -> Vec<PageId> {
        self.entries.keys().copied().collect()
    }
}

impl<V> Default for LruCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
