//! Pinned entry handles.
//!
//! A [`Lease`] keeps its entry pinned, and therefore safe from eviction, for
//! as long as it lives. Dropping it unpins the entry, which stays cached for
//! the next `pin`. Because release happens exactly once in `Drop`, a lease can
//! never be unpinned twice.

use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::Arc;

use crate::cache::ObjectCache;
use crate::entry::EntryId;
use crate::policy::lru::LruVictimPolicy;
use crate::traits::VictimPolicy;

/// A pinned entry returned by [`ObjectCache::pin`].
///
/// Dereferences to the cached value.
pub struct Lease<'c, K, V, P = LruVictimPolicy>
where
    K: Eq + Hash + Clone,
    P: VictimPolicy,
{
    cache: &'c ObjectCache<K, V, P>,
    id: EntryId,
    key: K,
    /// Present from creation until the lease is released or disarmed.
    value: Option<Arc<V>>,
    /// The registry holds no handle to the value while this is set.
    checked_out: bool,
}

impl<'c, K, V, P> Lease<'c, K, V, P>
where
    K: Eq + Hash + Clone,
    P: VictimPolicy,
{
    pub(crate) fn new(
        cache: &'c ObjectCache<K, V, P>,
        id: EntryId,
        key: K,
        value: Arc<V>,
        checked_out: bool,
    ) -> Self {
        Self {
            cache,
            id,
            key,
            value: Some(value),
            checked_out,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Handle of the leased entry. Two leases on the same shared entry
    /// report the same id.
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Returns `true` if no other lease can reach this entry's value.
    ///
    /// Holds for exclusive pins and for every pin of a non-sharable entry.
    pub fn is_exclusive(&self) -> bool {
        self.checked_out
    }

    /// Mutable access to the value, available only while the lease is the
    /// value's sole holder.
    pub fn get_mut(&mut self) -> Option<&mut V> {
        if self.checked_out {
            self.value.as_mut().and_then(Arc::get_mut)
        } else {
            None
        }
    }

    pub(crate) fn cache(&self) -> &'c ObjectCache<K, V, P> {
        self.cache
    }

    /// Consumes the lease without unpinning, handing its bookkeeping to the
    /// caller.
    pub(crate) fn disarm(mut self) -> (EntryId, Arc<V>, bool) {
        match self.value.take() {
            Some(value) => (self.id, value, self.checked_out),
            None => unreachable!("lease {} disarmed twice", self.id),
        }
    }
}

impl<K, V, P> Deref for Lease<'_, K, V, P>
where
    K: Eq + Hash + Clone,
    P: VictimPolicy,
{
    type Target = V;

    fn deref(&self) -> &V {
        match &self.value {
            Some(value) => value,
            None => unreachable!("lease {} used after release", self.id),
        }
    }
}

impl<K, V, P> Drop for Lease<'_, K, V, P>
where
    K: Eq + Hash + Clone,
    P: VictimPolicy,
{
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.cache.release(self.id, value, self.checked_out);
        }
    }
}

impl<K, V, P> fmt::Debug for Lease<'_, K, V, P>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: fmt::Debug,
    P: VictimPolicy,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("value", &self.value)
            .field("exclusive", &self.checked_out)
            .finish()
    }
}
