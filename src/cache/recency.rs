//! Recency Index Module
//!
//! Key lookup plus an arena-backed doubly linked chain ordered from most
//! recently used (head) to least recently used (tail).

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use super::entry::Entry;

// == Recency Index ==
/// Tracks entries and their access order.
///
/// Entries live in `slots` and link to each other by slot index, so every
/// relink is O(1) and no entry is ever referenced after its slot is freed:
/// - `head` = Most recently used
/// - `tail` = Least recently used
#[derive(Debug)]
pub(crate) struct RecencyIndex<K, V, X> {
    /// Entry arena, `None` marks a free slot
    slots: Vec<Option<Entry<K, V, X>>>,
    /// Recycled slot indices
    free: Vec<usize>,
    /// Key to slot mapping
    lookup: HashMap<K, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K, V, X> RecencyIndex<K, V, X>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates a new empty index.
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            lookup: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    // == Length ==
    pub(crate) fn len(&self) -> usize {
        self.lookup.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    // == Lookup ==
    /// Returns the slot holding `key`.
    pub(crate) fn index_of<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lookup.get(key).copied()
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&Entry<K, V, X>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index_of(key).map(|idx| self.entry(idx))
    }

    /// Entry in slot `idx`.
    ///
    /// Slot indices only come from `lookup` and the chain links, and both are
    /// cleared in `remove_at` before a slot is freed, so the slot is always
    /// occupied here and in `entry_mut`.
    pub(crate) fn entry(&self, idx: usize) -> &Entry<K, V, X> {
        self.slots[idx]
            .as_ref()
            .expect("recency slot referenced after being freed")
    }

    pub(crate) fn entry_mut(&mut self, idx: usize) -> &mut Entry<K, V, X> {
        self.slots[idx]
            .as_mut()
            .expect("recency slot referenced after being freed")
    }

    // == Insert ==
    /// Stores a new entry at the head and returns its slot.
    ///
    /// The key must not already be present.
    pub(crate) fn insert(&mut self, entry: Entry<K, V, X>) -> usize {
        debug_assert!(!self.lookup.contains_key(&entry.key));

        let key = entry.key.clone();
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(entry);
                idx
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };

        self.insert_at_head(idx);
        self.lookup.insert(key, idx);
        idx
    }

    // == Remove ==
    /// Unlinks and returns the entry for `key`.
    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<Entry<K, V, X>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.index_of(key)?;
        Some(self.remove_at(idx))
    }

    /// Unlinks the entry in `idx`, frees the slot and drops its lookup key.
    pub(crate) fn remove_at(&mut self, idx: usize) -> Entry<K, V, X> {
        self.unlink(idx);
        // Occupied, see `entry`
        let mut entry = self.slots[idx]
            .take()
            .expect("recency slot referenced after being freed");
        self.free.push(idx);
        self.lookup.remove(&entry.key);
        entry.prev = None;
        entry.next = None;
        entry
    }

    // == Pop Tail ==
    /// Removes and returns the least recently used entry.
    pub(crate) fn pop_tail(&mut self) -> Option<Entry<K, V, X>> {
        let idx = self.tail?;
        Some(self.remove_at(idx))
    }

    // == Move To Head ==
    /// Marks the entry in `idx` as most recently used.
    pub(crate) fn move_to_head(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.insert_at_head(idx);
    }

    /// Removes every entry matching `predicate`, returning them.
    pub(crate) fn drain_where<F>(&mut self, mut predicate: F) -> Vec<Entry<K, V, X>>
    where
        F: FnMut(&Entry<K, V, X>) -> bool,
    {
        let doomed: Vec<usize> = self
            .lookup
            .values()
            .copied()
            .filter(|&idx| predicate(self.entry(idx)))
            .collect();

        doomed.into_iter().map(|idx| self.remove_at(idx)).collect()
    }

    /// Drops every entry and resets the arena.
    pub(crate) fn clear(&mut self) -> Vec<Entry<K, V, X>> {
        let drained = self.slots.drain(..).flatten().collect();
        self.free.clear();
        self.lookup.clear();
        self.head = None;
        self.tail = None;
        drained
    }

    // == Iteration ==
    /// Entries in lookup (hash) order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Entry<K, V, X>> + '_ {
        self.lookup.values().map(move |&idx| self.entry(idx))
    }

    /// Entries from head (most recent) to tail (least recent).
    pub(crate) fn iter_recency(&self) -> RecencyIter<'_, K, V, X> {
        RecencyIter {
            index: self,
            cursor: self.head,
        }
    }

    #[cfg(test)]
    pub(crate) fn head_key(&self) -> Option<&K> {
        self.head.map(|idx| &self.entry(idx).key)
    }

    #[cfg(test)]
    pub(crate) fn tail_key(&self) -> Option<&K> {
        self.tail.map(|idx| &self.entry(idx).key)
    }

    // == Links ==
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let entry = self.entry(idx);
            (entry.prev, entry.next)
        };

        match prev {
            Some(p) => self.entry_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.entry_mut(n).prev = prev,
            None => self.tail = prev,
        }

        let entry = self.entry_mut(idx);
        entry.prev = None;
        entry.next = None;
    }

    fn insert_at_head(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let entry = self.entry_mut(idx);
            entry.prev = None;
            entry.next = old_head;
        }
        match old_head {
            Some(h) => self.entry_mut(h).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    /// Panics when the chain and the lookup table disagree.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let mut count = 0;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let entry = self.entry(idx);
            assert_eq!(entry.prev, prev, "broken back link at slot {}", idx);
            assert_eq!(self.lookup.get(&entry.key), Some(&idx), "lookup mismatch");
            prev = Some(idx);
            cursor = entry.next;
            count += 1;
            assert!(count <= self.lookup.len(), "cycle in recency chain");
        }
        assert_eq!(self.tail, prev, "tail does not end the chain");
        assert_eq!(count, self.lookup.len(), "chain length != lookup size");
    }
}

// == Recency Iterator ==
/// Head-to-tail walk over the chain.
pub(crate) struct RecencyIter<'a, K, V, X> {
    index: &'a RecencyIndex<K, V, X>,
    cursor: Option<usize>,
}

impl<'a, K, V, X> Iterator for RecencyIter<'a, K, V, X>
where
    K: Hash + Eq + Clone,
{
    type Item = &'a Entry<K, V, X>;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let entry = self.index.entry(idx);
        self.cursor = entry.next;
        Some(entry)
    }
}
