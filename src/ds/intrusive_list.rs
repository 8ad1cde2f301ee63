//! Arena-backed doubly linked list.
//!
//! Nodes live in a [`SlotArena`] and link to each other by [`SlotId`], so a
//! caller can keep the handle returned by an insert and later unlink that
//! node in O(1) without walking the list. The LRU victim policy uses this to
//! drop an entry from the idle order the moment it is pinned again.
//!
//! ```text
//!   head (most recent)                         tail (least recent)
//!     │                                              │
//!     ▼                                              ▼
//!   [n3] ◄──► [n1] ◄──► [n7] ◄──► ... ◄──► [n2]
//! ```
//!
//! | Operation        | Cost |
//! |------------------|------|
//! | `push_front`     | O(1) |
//! | `remove(id)`     | O(1) |
//! | `move_to_front`  | O(1) |
//! | `iter_rev`       | O(n) |
use crate::ds::slot_arena::{SlotArena, SlotId};

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

/// Doubly linked list whose nodes are addressed by stable [`SlotId`]s.
#[derive(Debug)]
pub struct IntrusiveList<T> {
    arena: SlotArena<Node<T>>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
}

impl<T> IntrusiveList<T> {
    pub fn new() -> Self {
        Self {
            arena: SlotArena::new(),
            head: None,
            tail: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: SlotArena::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Value at the tail, i.e. the node pushed or moved to the front
    /// longest ago.
    pub fn back(&self) -> Option<&T> {
        self.get(self.tail?)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.arena.get(id).map(|node| &node.value)
    }

    /// Iterates from front to back.
    #[cfg(test)]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: self.head,
            forward: true,
        }
    }

    /// Iterates from back to front.
    pub fn iter_rev(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: self.tail,
            forward: false,
        }
    }

    /// Inserts `value` at the front and returns the handle of its node.
    pub fn push_front(&mut self, value: T) -> SlotId {
        let id = self.arena.insert(Node {
            value,
            prev: None,
            next: None,
        });
        self.link_front(id);
        id
    }

    /// Unlinks node `id` and returns its value.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        self.unlink(id)?;
        self.arena.remove(id).map(|node| node.value)
    }

    /// Moves node `id` to the front; returns `false` if it is not in the list.
    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        if !self.arena.contains(id) {
            return false;
        }
        if self.head == Some(id) {
            return true;
        }
        self.unlink(id);
        self.link_front(id);
        true
    }

    pub fn clear(&mut self) {
        self.arena.drain();
        self.head = None;
        self.tail = None;
    }

    fn unlink(&mut self, id: SlotId) -> Option<()> {
        let node = self.arena.get_mut(id)?;
        let (prev, next) = (node.prev.take(), node.next.take());
        self.set_next(prev, next);
        self.set_prev(next, prev);
        Some(())
    }

    fn link_front(&mut self, id: SlotId) {
        let old_head = self.head;
        let Some(node) = self.arena.get_mut(id) else {
            return;
        };
        node.next = old_head;
        self.set_prev(old_head, Some(id));
        self.head = Some(id);
    }

    /// Points `at`'s forward link (or the head, when `at` is the front) to
    /// `to`.
    fn set_next(&mut self, at: Option<SlotId>, to: Option<SlotId>) {
        match at.and_then(|at| self.arena.get_mut(at)) {
            Some(node) => node.next = to,
            None => self.head = to,
        }
    }

    /// Points `at`'s backward link (or the tail, when `at` is past the end)
    /// to `to`.
    fn set_prev(&mut self, at: Option<SlotId>, to: Option<SlotId>) {
        match at.and_then(|at| self.arena.get_mut(at)) {
            Some(node) => node.prev = to,
            None => self.tail = to,
        }
    }

    /// Walks the links from head to tail and panics on any broken back
    /// pointer, cycle, or node count mismatch.
    #[cfg(any(test, debug_assertions))]
    pub fn assert_well_linked(&self) {
        let mut walked = 0usize;
        let mut behind = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let Some(node) = self.arena.get(id) else {
                panic!("node {id} is linked but not allocated");
            };
            assert_eq!(node.prev, behind, "node {id} has a stale back link");
            walked += 1;
            assert!(walked <= self.len(), "cycle through node {id}");
            behind = Some(id);
            cursor = node.next;
        }
        assert_eq!(self.tail, behind, "tail does not match last node");
        assert_eq!(walked, self.len(), "unreachable nodes in arena");
    }
}

impl<T> Default for IntrusiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over list values in either direction.
pub struct Iter<'a, T> {
    list: &'a IntrusiveList<T>,
    current: Option<SlotId>,
    forward: bool,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.list.arena.get(id)?;
        self.current = if self.forward { node.next } else { node.prev };
        Some(&node.value)
    }
}
