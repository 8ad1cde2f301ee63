//! Cache entries and the construction handshake.
//!
//! A factory receives an [`UninitializedEntry`] on every cache miss and must
//! turn it into an [`InitializedEntry`] by calling
//! [`initialize`](UninitializedEntry::initialize) exactly once. Both types are
//! move-only and `initialize` consumes the builder, so calling it twice or
//! keeping the builder after returning does not compile.
//!
//! ## Entry lifecycle
//!
//! ```text
//!   pin() miss ──► Reserved ──(factory Ok)──► Ready ──► idle ⇄ pinned
//!                     │                         │
//!                     └─(factory Err/panic)─► removed        evicted / discarded
//! ```
//!
//! `Reserved` covers the whole time the factory runs without the registry
//! lock. A failed construction never becomes an entry: its placeholder is
//! removed and no weight is charged.

use std::fmt;
use std::sync::Arc;

use crate::ds::slot_arena::SlotId;

/// Stable handle to an entry in an [`ObjectCache`](crate::cache::ObjectCache).
///
/// Handles are generational: once the entry is evicted the handle never
/// refers to another entry, even if the registry reuses its slot.
pub type EntryId = SlotId;

/// Builder handed to [`CachedObjectFactory::initialize_entry`](crate::traits::CachedObjectFactory::initialize_entry).
pub struct UninitializedEntry<V> {
    _value: std::marker::PhantomData<fn() -> V>,
}

impl<V> UninitializedEntry<V> {
    pub(crate) fn new() -> Self {
        Self {
            _value: std::marker::PhantomData,
        }
    }

    /// Supplies the constructed value.
    ///
    /// `weight` is the value's charge against the cache's byte budget and is
    /// fixed for the entry's lifetime. `sharable` allows concurrent
    /// non-exclusive leases to reference this one value.
    pub fn initialize(self, value: V, weight: u64, sharable: bool) -> InitializedEntry<V> {
        InitializedEntry {
            value,
            weight,
            sharable,
        }
    }
}

impl<V> fmt::Debug for UninitializedEntry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UninitializedEntry")
    }
}

/// A constructed value together with its weight and sharing mode.
pub struct InitializedEntry<V> {
    pub(crate) value: V,
    pub(crate) weight: u64,
    pub(crate) sharable: bool,
}

impl<V> InitializedEntry<V> {
    pub fn weight(&self) -> u64 {
        self.weight
    }

    pub fn is_sharable(&self) -> bool {
        self.sharable
    }

    pub fn value(&self) -> &V {
        &self.value
    }
}

impl<V: fmt::Debug> fmt::Debug for InitializedEntry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitializedEntry")
            .field("value", &self.value)
            .field("weight", &self.weight)
            .field("sharable", &self.sharable)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryState {
    /// Placeholder while the factory runs unlocked.
    Reserved,
    Ready,
}

/// Registry-side record of one entry. Only touched under the registry lock.
#[derive(Debug)]
pub(crate) struct EntrySlot<K, V> {
    pub(crate) key: K,
    /// `None` while reserved and while checked out by a sole holder.
    pub(crate) value: Option<Arc<V>>,
    pub(crate) weight: u64,
    pub(crate) pin_count: u32,
    pub(crate) sharable: bool,
    /// Held by exactly one lease; no lookup may return it.
    pub(crate) checked_out: bool,
    /// Flagged by `discard` while pinned; evicted on its next pin attempt.
    pub(crate) stale: bool,
    pub(crate) state: EntryState,
}

impl<K, V> EntrySlot<K, V> {
    pub(crate) fn reserved(key: K) -> Self {
        Self {
            key,
            value: None,
            weight: 0,
            pin_count: 1,
            sharable: false,
            checked_out: true,
            stale: false,
            state: EntryState::Reserved,
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.state == EntryState::Ready
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.is_ready() && self.pin_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_carries_weight_and_sharing() {
        let built = UninitializedEntry::new().initialize("sedan", 4, true);
        assert_eq!(built.weight(), 4);
        assert!(built.is_sharable());
        assert_eq!(*built.value(), "sedan");
    }

    #[test]
    fn reserved_slot_counts_as_pinned_and_not_ready() {
        let slot: EntrySlot<&str, u32> = EntrySlot::reserved("k");
        assert_eq!(slot.pin_count, 1);
        assert!(!slot.is_ready());
        assert!(!slot.is_idle());
        assert!(slot.value.is_none());
    }
}
