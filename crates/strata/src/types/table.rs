//! Hash index shared by dict and set storage.
//!
//! Entries live in a dense vector in insertion order; a hashbrown
//! `HashTable<usize>` maps each stored hash to its entry's position. Removed
//! entries leave a hole so positions stay stable for open iterators, and the
//! holes are compacted away only when they outnumber the live entries at
//! insertion time. Compaction and `clear` move positions, so they advance
//! [`ProbeTable::layout`], which iterators compare between steps.
//!
//! The table never compares keys itself beyond the caller's closure: key
//! equality may run user code, so callers pull [`ProbeTable::candidates`]
//! out, compare with no lock held, and come back with a position.

use hashbrown::HashTable;
use smallvec::SmallVec;

use crate::value::Value;

/// Keys sharing one probe sequence; almost always zero or one.
pub(crate) type Candidates = SmallVec<[(usize, Value); 2]>;

#[derive(Debug, Clone)]
pub(crate) struct Entry<V> {
    pub hash: u64,
    pub key: Value,
    pub value: V,
}

#[derive(Debug, Clone)]
pub(crate) struct ProbeTable<V> {
    indices: HashTable<usize>,
    entries: Vec<Option<Entry<V>>>,
    live: usize,
    layout: u64,
}

impl<V> Default for ProbeTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ProbeTable<V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: HashTable::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
            live: 0,
            layout: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Advances whenever existing entries change position.
    pub fn layout(&self) -> u64 {
        self.layout
    }

    /// One past the highest position an iterator may visit.
    pub fn end(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, position: usize) -> Option<&Entry<V>> {
        self.entries.get(position).and_then(Option::as_ref)
    }

    /// First live entry at or after `position`.
    pub fn next_from(&self, position: usize) -> Option<(usize, &Entry<V>)> {
        self.entries
            .get(position..)?
            .iter()
            .enumerate()
            .find_map(|(offset, slot)| slot.as_ref().map(|e| (position + offset, e)))
    }

    /// Live entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry<V>> {
        self.entries.iter().filter_map(Option::as_ref)
    }

    /// Positions and keys of every entry stored under `hash`.
    pub fn candidates(&self, hash: u64) -> Candidates {
        self.indices
            .iter_hash(hash)
            .filter_map(|&position| {
                let entry = self.entry(position)?;
                (entry.hash == hash).then(|| (position, entry.key.clone()))
            })
            .collect()
    }

    /// Position of the entry under `hash` whose key satisfies `matches`.
    ///
    /// Only for comparisons that cannot run user code.
    pub fn find(&self, hash: u64, mut matches: impl FnMut(&Value) -> bool) -> Option<usize> {
        self.indices
            .find(hash, |&position| self.entry(position).is_some_and(|e| e.hash == hash && matches(&e.key)))
            .copied()
    }

    /// Appends a key known to be absent and returns its position.
    pub fn insert_new(&mut self, hash: u64, key: Value, value: V) -> usize {
        if self.entries.len() >= 8 && self.entries.len() - self.live > self.live {
            self.compact();
        }
        let position = self.entries.len();
        self.entries.push(Some(Entry { hash, key, value }));
        let entries = &self.entries;
        self.indices
            .insert_unique(hash, position, |&p| entries[p].as_ref().map_or(0, |e| e.hash));
        self.live += 1;
        position
    }

    pub fn value_mut(&mut self, position: usize) -> Option<&mut V> {
        self.entries.get_mut(position).and_then(Option::as_mut).map(|e| &mut e.value)
    }

    /// Removes the entry at `position`, leaving a hole.
    pub fn remove(&mut self, position: usize) -> Option<Entry<V>> {
        let entry = self.entries.get_mut(position)?.take()?;
        if let Ok(found) = self.indices.find_entry(entry.hash, |&p| p == position) {
            found.remove();
        }
        self.live -= 1;
        while matches!(self.entries.last(), Some(None)) {
            self.entries.pop();
        }
        Some(entry)
    }

    /// Removes the most recently inserted entry.
    pub fn pop_last(&mut self) -> Option<Entry<V>> {
        let position = self.entries.iter().rposition(Option::is_some)?;
        self.remove(position)
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.layout = self.layout.wrapping_add(1);
        }
        self.indices.clear();
        self.entries.clear();
        self.live = 0;
    }

    /// Drops the holes and rebuilds the index.
    fn compact(&mut self) {
        self.entries.retain(Option::is_some);
        self.layout = self.layout.wrapping_add(1);
        self.indices.clear();
        let entries = &self.entries;
        for (position, entry) in entries.iter().enumerate() {
            if let Some(entry) = entry {
                self.indices
                    .insert_unique(entry.hash, position, |&p| entries[p].as_ref().map_or(0, |e| e.hash));
            }
        }
    }
}
