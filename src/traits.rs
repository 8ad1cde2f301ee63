//! # Cache Collaborator Traits
//!
//! The object cache talks to two pluggable collaborators:
//!
//! ```text
//!   ┌──────────────────────────────────────┐     ┌──────────────────────────────┐
//!   │   CachedObjectFactory<K, V>          │     │   VictimPolicy               │
//!   │   (implemented by cache clients)     │     │   (eviction strategy)        │
//!   │                                      │     │                              │
//!   │  initialize_entry(&K, builder)       │     │  on_idle(EntryId)            │
//!   │      → Result<InitializedEntry, E>   │     │  on_pinned(EntryId)          │
//!   │  is_stale(&V) → Result<bool, E>      │     │  on_removed(EntryId)         │
//!   └──────────────────┬───────────────────┘     │  select_victim() → EntryId?  │
//!                      │                         │  candidate_count() → usize   │
//!                      │  called WITHOUT the     │  is_candidate(EntryId)       │
//!                      │  registry lock          │  clear()                     │
//!                      │                         └──────────────┬───────────────┘
//!                      ▼                                        │ called WITH the
//!            ┌──────────────────────────────────────────────────┴───┐ registry lock
//!            │                 ObjectCache<K, V, P>                 │
//!            └──────────────────────────────────────────────────────┘
//! ```
//!
//! The factory runs client code, so the cache never holds its lock while
//! calling it; a factory may pin other entries from the same cache while it
//! builds a value. The victim policy is pure bookkeeping and runs entirely
//! under the lock.

use crate::entry::{EntryId, InitializedEntry, UninitializedEntry};

/// Builds values on a cache miss and judges whether cached values are stale.
///
/// # Contract
///
/// - [`initialize_entry`](Self::initialize_entry) either returns the result of
///   [`UninitializedEntry::initialize`] or an error. If it fails after
///   allocating a resource, that resource must already be released (dropped)
///   when the error is returned.
/// - [`is_stale`](Self::is_stale) must not change the value in a way other
///   holders of a shared lease could observe.
/// - Both methods may call back into the same cache.
///
/// # Example
///
/// ```
/// use std::convert::Infallible;
/// use pincache::prelude::*;
///
/// struct Squares;
///
/// impl CachedObjectFactory<u64, u64> for Squares {
///     type Error = Infallible;
///
///     fn initialize_entry(
///         &self,
///         key: &u64,
///         entry: UninitializedEntry<u64>,
///     ) -> Result<InitializedEntry<u64>, Infallible> {
///         Ok(entry.initialize(key * key, 8, true))
///     }
/// }
///
/// let cache: ObjectCache<u64, u64> = ObjectCache::new(64);
/// let lease = cache.pin(7, &Squares, false).unwrap();
/// assert_eq!(*lease, 49);
/// assert_eq!(cache.bytes_cached(), 8);
/// ```
pub trait CachedObjectFactory<K, V> {
    /// Error produced when a value cannot be built or checked.
    type Error;

    /// Builds the value for `key`.
    ///
    /// Runs without the registry lock held.
    fn initialize_entry(
        &self,
        key: &K,
        entry: UninitializedEntry<V>,
    ) -> Result<InitializedEntry<V>, Self::Error>;

    /// Returns `true` if `value` must not be reused.
    ///
    /// Checked lazily on each pin that would reuse an existing entry. A stale
    /// idle entry is evicted and a replacement is built. Returning an error
    /// abandons the pin and leaves the entry cached.
    fn is_stale(&self, value: &V) -> Result<bool, Self::Error> {
        let _ = value;
        Ok(false)
    }
}

/// Chooses which idle entry to evict under capacity pressure.
///
/// The cache reports every transition of an entry into and out of the idle
/// (unpinned, fully constructed) set. The policy's tracked set is therefore
/// exactly the eviction candidates, and
/// [`select_victim`](Self::select_victim) must return one of them or `None`
/// when the set is empty. Selection does not remove: the cache follows up
/// with [`on_removed`](Self::on_removed) once it evicts the entry.
///
/// # Example
///
/// ```
/// use pincache::policy::lru::LruVictimPolicy;
/// use pincache::traits::VictimPolicy;
/// use pincache::ds::SlotArena;
///
/// let mut ids = SlotArena::new();
/// let (a, b) = (ids.insert(()), ids.insert(()));
///
/// let mut policy = LruVictimPolicy::new();
/// policy.on_idle(a);
/// policy.on_idle(b);
/// assert_eq!(policy.select_victim(), Some(a));
///
/// policy.on_pinned(a);
/// assert_eq!(policy.select_victim(), Some(b));
/// ```
pub trait VictimPolicy {
    /// `id` became idle: newly constructed with no holders, or its last
    /// lease was released.
    fn on_idle(&mut self, id: EntryId);

    /// `id` left the idle set because it was pinned again.
    fn on_pinned(&mut self, id: EntryId);

    /// `id` left the registry.
    fn on_removed(&mut self, id: EntryId);

    /// Picks the next entry to evict among the idle set.
    fn select_victim(&mut self) -> Option<EntryId>;

    /// Number of entries currently eligible for eviction.
    fn candidate_count(&self) -> usize;

    /// Forgets every tracked entry.
    fn clear(&mut self);

    /// Returns `true` if `id` is tracked as an eviction candidate.
    fn is_candidate(&self, id: EntryId) -> bool;
}
