//! Bounded, order-preserving LRU tracker.
//!
//! A classic slab-backed doubly linked list: `index` maps a key to its slot
//! in `nodes`, and `prev`/`next` links thread the recency order through the
//! slab so `move_to_front` and eviction are O(1) amortized (no shifting a
//! `Vec`), matching spec.md §4.5's complexity note.

use rustc_hash::FxHashMap;
use std::hash::Hash;

struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Bounded LRU order over keys of type `K`. Holds no values itself — callers
/// pair it with their own `name -> value` map (see [`crate::methylome_set::MethylomeSet`]).
pub struct LruTracker<K> {
    capacity: usize,
    nodes: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    index: FxHashMap<K, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K: Eq + Hash + Clone> LruTracker<K> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            nodes: Vec::new(),
            free: Vec::new(),
            index: FxHashMap::default(),
            head: None,
            tail: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.index.len()
    }

    pub fn full(&self) -> bool {
        self.size() >= self.capacity
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// The least recently used key, if any.
    pub fn back(&self) -> Option<&K> {
        self.tail.and_then(|i| self.nodes[i].as_ref()).map(|n| &n.key)
    }

    /// The most recently used key, if any.
    pub fn front(&self) -> Option<&K> {
        self.head.and_then(|i| self.nodes[i].as_ref()).map(|n| &n.key)
    }

    /// Walk tracked keys from least to most recently used. Used by callers
    /// that need to scan past a pinned back entry for the next eviction
    /// candidate (see [`crate::methylome_set::MethylomeSet`]).
    pub fn iter_back_to_front(&self) -> impl Iterator<Item = &K> {
        let mut cursor = self.tail;
        std::iter::from_fn(move || {
            let slot = cursor?;
            let node = self.nodes[slot].as_ref().unwrap();
            cursor = node.prev;
            Some(&node.key)
        })
    }

    /// Insert `key` as most recently used. If `key` is already tracked this
    /// is equivalent to [`Self::move_to_front`]. If the tracker is full and
    /// `key` is new, the current back is evicted first and returned.
    pub fn push(&mut self, key: K) -> Option<K> {
        if self.contains(&key) {
            self.move_to_front(&key);
            return None;
        }

        let evicted = if self.full() {
            self.evict_back()
        } else {
            None
        };

        let slot = self.alloc(Node {
            key: key.clone(),
            prev: None,
            next: self.head,
        });
        if let Some(old_head) = self.head {
            self.nodes[old_head].as_mut().unwrap().prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
        self.index.insert(key, slot);

        evicted
    }

    /// Move an already-tracked key to the front. No-op if `key` is absent.
    pub fn move_to_front(&mut self, key: &K) {
        let Some(&slot) = self.index.get(key) else {
            return;
        };
        if self.head == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.nodes[slot].as_mut().unwrap().prev = None;
        self.nodes[slot].as_mut().unwrap().next = self.head;
        if let Some(old_head) = self.head {
            self.nodes[old_head].as_mut().unwrap().prev = Some(slot);
        }
        self.head = Some(slot);
    }

    /// Remove `key` from the tracker entirely (used when a value it tracks
    /// is dropped for a reason other than LRU pressure).
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(slot) = self.index.remove(key) else {
            return false;
        };
        self.unlink(slot);
        self.nodes[slot] = None;
        self.free.push(slot);
        true
    }

    fn evict_back(&mut self) -> Option<K> {
        let slot = self.tail?;
        let key = self.nodes[slot].as_ref().unwrap().key.clone();
        self.unlink(slot);
        self.nodes[slot] = None;
        self.free.push(slot);
        self.index.remove(&key);
        Some(key)
    }

    fn alloc(&mut self, node: Node<K>) -> usize {
        if let Some(slot) = self.free.pop() {
            self.nodes[slot] = Some(node);
            slot
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    /// Splice `slot` out of the linked list, fixing up head/tail and
    /// neighboring links. Does not touch `index` or free the slot.
    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let node = self.nodes[slot].as_ref().unwrap();
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }
}
