//! # Least Recently Idle victim policy
//!
//! Orders idle entries by the moment they became idle: when they were first
//! constructed without a holder, or when their last lease was released. The
//! victim is always the entry that has been idle the longest.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          LruVictimPolicy                             │
//!   │                                                                      │
//!   │   ┌──────────────────────────────────────────────────────────────┐   │
//!   │   │  FxHashMap<EntryId, SlotId>  (entry -> list node)            │   │
//!   │   └───────────────────────────────┬──────────────────────────────┘   │
//!   │                                   │ O(1) unlink on re-pin            │
//!   │                                   ▼                                  │
//!   │   ┌──────────────────────────────────────────────────────────────┐   │
//!   │   │  IntrusiveList<EntryId>  (idle order)                        │   │
//!   │   │                                                              │   │
//!   │   │  head ──► [e7] ◄──► [e2] ◄──► [e5] ◄── tail                  │   │
//!   │   │         newest idle            oldest idle = victim          │   │
//!   │   └──────────────────────────────────────────────────────────────┘   │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Flow
//!
//! ```text
//!   on_idle(e)      push e at head (or move it there if already tracked)
//!   on_pinned(e)    unlink e; pinned entries are never candidates
//!   on_removed(e)   unlink e
//!   select_victim() peek tail
//! ```
//!
//! | Operation       | Cost |
//! |-----------------|------|
//! | `on_idle`       | O(1) |
//! | `on_pinned`     | O(1) |
//! | `on_removed`    | O(1) |
//! | `select_victim` | O(1) |
//!
//! The policy only sees entry handles. Keys, values and weights stay in the
//! registry, so the policy never has to be told about construction state.

use rustc_hash::FxHashMap;

use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::slot_arena::SlotId;
use crate::entry::EntryId;
use crate::traits::VictimPolicy;

/// LRU eviction order over idle entries.
#[derive(Debug, Default)]
pub struct LruVictimPolicy {
    order: IntrusiveList<EntryId>,
    index: FxHashMap<EntryId, SlotId>,
}

impl LruVictimPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: IntrusiveList::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Idle entries from oldest to newest.
    pub fn idle_order(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.order.iter_rev().copied()
    }

    fn unlink(&mut self, id: EntryId) {
        if let Some(node) = self.index.remove(&id) {
            self.order.remove(node);
        }
        self.validate_invariants();
    }

    fn validate_invariants(&self) {
        #[cfg(debug_assertions)]
        {
            debug_assert_eq!(self.order.len(), self.index.len());
            for (entry, node) in &self.index {
                debug_assert_eq!(self.order.get(*node), Some(entry));
            }
            debug_assert!(self.idle_order().all(|id| self.index.contains_key(&id)));
        }
    }
}

impl VictimPolicy for LruVictimPolicy {
    fn on_idle(&mut self, id: EntryId) {
        match self.index.get(&id) {
            Some(&node) => {
                self.order.move_to_front(node);
            },
            None => {
                let node = self.order.push_front(id);
                self.index.insert(id, node);
            },
        }
        self.validate_invariants();
    }

    fn on_pinned(&mut self, id: EntryId) {
        self.unlink(id);
    }

    fn on_removed(&mut self, id: EntryId) {
        self.unlink(id);
    }

    fn select_victim(&mut self) -> Option<EntryId> {
        self.order.back().copied()
    }

    fn candidate_count(&self) -> usize {
        self.index.len()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }

    fn is_candidate(&self, id: EntryId) -> bool {
        self.index.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ds::slot_arena::SlotArena;

    fn ids(n: usize) -> Vec<EntryId> {
        let mut arena = SlotArena::new();
        (0..n).map(|_| arena.insert(())).collect()
    }

    // ==============================================
    // Selection order
    // ==============================================

    mod selection {
        use super::*;

        #[test]
        fn empty_policy_selects_nothing() {
            let mut policy = LruVictimPolicy::new();
            assert_eq!(policy.select_victim(), None);
            assert_eq!(policy.candidate_count(), 0);
        }

        #[test]
        fn oldest_idle_is_selected_first() {
            let e = ids(3);
            let mut policy = LruVictimPolicy::new();
            for id in &e {
                policy.on_idle(*id);
            }
            assert_eq!(policy.select_victim(), Some(e[0]));
            assert_eq!(policy.idle_order().collect::<Vec<_>>(), e);
        }

        #[test]
        fn select_does_not_remove() {
            let e = ids(2);
            let mut policy = LruVictimPolicy::new();
            policy.on_idle(e[0]);
            policy.on_idle(e[1]);
            assert_eq!(policy.select_victim(), Some(e[0]));
            assert_eq!(policy.select_victim(), Some(e[0]));
            assert_eq!(policy.candidate_count(), 2);
        }

        #[test]
        fn repin_then_release_makes_entry_newest() {
            let e = ids(3);
            let mut policy = LruVictimPolicy::new();
            for id in &e {
                policy.on_idle(*id);
            }

            policy.on_pinned(e[0]);
            assert!(!policy.is_candidate(e[0]));
            assert_eq!(policy.select_victim(), Some(e[1]));

            policy.on_idle(e[0]);
            assert_eq!(
                policy.idle_order().collect::<Vec<_>>(),
                vec![e[1], e[2], e[0]]
            );
        }

        #[test]
        fn duplicate_idle_refreshes_position() {
            let e = ids(2);
            let mut policy = LruVictimPolicy::with_capacity(2);
            policy.on_idle(e[0]);
            policy.on_idle(e[1]);
            policy.on_idle(e[0]);
            assert_eq!(policy.candidate_count(), 2);
            assert_eq!(policy.select_victim(), Some(e[1]));
        }
    }

    // ==============================================
    // Removal
    // ==============================================

    mod removal {
        use super::*;

        #[test]
        fn removed_entry_is_never_selected() {
            let e = ids(2);
            let mut policy = LruVictimPolicy::new();
            policy.on_idle(e[0]);
            policy.on_idle(e[1]);
            policy.on_removed(e[0]);
            assert_eq!(policy.select_victim(), Some(e[1]));
            policy.on_removed(e[1]);
            assert_eq!(policy.select_victim(), None);
        }

        #[test]
        fn removing_untracked_entry_is_noop() {
            let e = ids(2);
            let mut policy = LruVictimPolicy::new();
            policy.on_idle(e[0]);
            policy.on_removed(e[1]);
            policy.on_pinned(e[1]);
            assert_eq!(policy.candidate_count(), 1);
        }

        #[test]
        fn clear_forgets_everything() {
            let e = ids(4);
            let mut policy = LruVictimPolicy::new();
            for id in &e {
                policy.on_idle(*id);
            }
            policy.clear();
            assert_eq!(policy.candidate_count(), 0);
            assert_eq!(policy.select_victim(), None);
            assert!(!policy.is_candidate(e[2]));
        }
    }
}
