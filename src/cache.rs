//! # Shared object cache
//!
//! A keyed registry of pinned, weight-bounded entries. Clients
//! [`pin`](ObjectCache::pin) a key and receive a [`Lease`]; on a miss the
//! caller's [`CachedObjectFactory`] builds the value. Dropping the lease unpins
//! the entry, which stays cached until a victim policy evicts it, a staleness
//! check retires it, or [`discard_all`](ObjectCache::discard_all) clears the
//! registry.
//!
//! ## Architecture
//!
//! ```text
//!   ┌────────────────────────────────────────────────────────────────────────┐
//!   │                        ObjectCache<K, V, P>                            │
//!   │                                                                        │
//!   │   Mutex<Registry>                                                      │
//!   │   ┌────────────────────────────────────────────────────────────────┐   │
//!   │   │  by_key: FxHashMap<K, Vec<EntryId>>   several entries per key  │   │
//!   │   │                                                                │   │
//!   │   │  entries: SlotArena<EntrySlot>                                 │   │
//!   │   │    EntrySlot { key, value: Option<Arc<V>>, weight,             │   │
//!   │   │                pin_count, sharable, checked_out, stale, state }│   │
//!   │   │                                                                │   │
//!   │   │  bytes_cached / bytes_max                                      │   │
//!   │   │  policy: P   (tracks exactly the idle Ready entries)           │   │
//!   │   └────────────────────────────────────────────────────────────────┘   │
//!   └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pin protocol
//!
//! ```text
//!   pin(key, factory, exclusive)
//!     │
//!     ├─ lock ─► scan entries for key ─► reusable?  ──yes──► pin it, unlock
//!     │                                      │                   │
//!     │                                      no          is_stale(value)? (unlocked)
//!     │                                      │             │          │
//!     │                                      │            no         yes ─► unpin + evict,
//!     │                                      │             │                 start over
//!     │                                      │          return lease
//!     │                                      ▼
//!     ├─ lock ─► insert Reserved placeholder ─► unlock
//!     │
//!     ├─ factory.initialize_entry(key, builder)          (no lock held)
//!     │
//!     └─ lock ─► Ready, charge weight, evict while over budget ─► unlock
//!                 (on failure: remove placeholder, charge nothing)
//! ```
//!
//! A reusable entry is Ready, not stale, and not checked out. Exclusive pins
//! additionally require the entry to be idle. Exclusive leases and leases on
//! non-sharable entries check the value out of the registry so no other
//! lookup can reach it until the lease is released.
//!
//! Values of evicted entries are dropped after the lock is released, so a
//! value's `Drop` may call back into the cache.
//!
//! ## Example
//!
//! ```
//! use std::convert::Infallible;
//! use pincache::prelude::*;
//!
//! struct Plans;
//!
//! impl CachedObjectFactory<String, String> for Plans {
//!     type Error = Infallible;
//!
//!     fn initialize_entry(
//!         &self,
//!         sql: &String,
//!         entry: UninitializedEntry<String>,
//!     ) -> Result<InitializedEntry<String>, Infallible> {
//!         let plan = format!("plan({sql})");
//!         let weight = plan.len() as u64;
//!         Ok(entry.initialize(plan, weight, true))
//!     }
//! }
//!
//! let cache: ObjectCache<String, String> = ObjectCache::new(1024);
//! let first = cache.pin("select 1".to_string(), &Plans, false).unwrap();
//! let second = cache.pin("select 1".to_string(), &Plans, false).unwrap();
//! assert_eq!(first.id(), second.id());
//! assert_eq!(cache.bytes_cached(), "plan(select 1)".len() as u64);
//! drop((first, second));
//! assert_eq!(cache.pinned_count(), 0);
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::ds::slot_arena::SlotArena;
use crate::entry::{EntryId, EntrySlot, EntryState, InitializedEntry, UninitializedEntry};
use crate::error::{InvariantError, PinError};
use crate::lease::Lease;
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::ObjectCacheMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::ObjectCacheMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{MetricsSnapshotProvider, ObjectCacheMetricsRecorder};
use crate::policy::lru::LruVictimPolicy;
use crate::traits::{CachedObjectFactory, VictimPolicy};

/// Values whose entries left the registry; dropped once the lock is released.
type Doomed<V> = Vec<Arc<V>>;

/// Why an entry is being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Capacity,
    Stale,
    Discard,
}

struct Registry<K, V, P> {
    entries: SlotArena<EntrySlot<K, V>>,
    by_key: FxHashMap<K, Vec<EntryId>>,
    bytes_cached: u64,
    bytes_max: u64,
    policy: P,
    #[cfg(feature = "metrics")]
    metrics: ObjectCacheMetrics,
}

/// Weight-bounded cache of pinned, reusable objects.
///
/// Shared by reference (`&ObjectCache`) across threads; all registry state
/// sits behind one mutex that is never held while client code runs.
pub struct ObjectCache<K, V, P = LruVictimPolicy> {
    registry: Mutex<Registry<K, V, P>>,
}

impl<K, V> ObjectCache<K, V, LruVictimPolicy>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache with an LRU victim policy and a budget of `bytes_max`.
    pub fn new(bytes_max: u64) -> Self {
        Self::with_policy(bytes_max, LruVictimPolicy::new())
    }
}

impl<K, V, P> ObjectCache<K, V, P>
where
    K: Eq + Hash + Clone,
    P: VictimPolicy,
{
    pub fn with_policy(bytes_max: u64, policy: P) -> Self {
        Self::with_policy_and_capacity(bytes_max, policy, 0)
    }

    pub(crate) fn with_policy_and_capacity(bytes_max: u64, policy: P, expected: usize) -> Self {
        Self {
            registry: Mutex::new(Registry {
                entries: SlotArena::with_capacity(expected),
                by_key: FxHashMap::with_capacity_and_hasher(expected, Default::default()),
                bytes_cached: 0,
                bytes_max,
                policy,
                #[cfg(feature = "metrics")]
                metrics: ObjectCacheMetrics::default(),
            }),
        }
    }

    /// Pins an entry for `key`, building one with `factory` if none is
    /// reusable.
    ///
    /// With `exclusive == false` the lease may share an entry that other
    /// holders already use, provided the factory declared it sharable. With
    /// `exclusive == true` the caller is the entry's only holder for the
    /// lifetime of the lease.
    ///
    /// The factory is called without the registry lock held, so it may pin
    /// other entries of this cache. Capacity pressure never fails a pin: if
    /// every entry is pinned the cache temporarily exceeds its budget.
    ///
    /// # Errors
    ///
    /// [`PinError::Construction`] if the factory could not build the value;
    /// the registry is left as it was. [`PinError::StalenessCheck`] if the
    /// factory's staleness check failed; the entry stays cached and unpinned.
    ///
    /// # Panics
    ///
    /// If the new entry's weight would overflow the cache's total weight. The
    /// registry is left as it was.
    pub fn pin<F>(
        &self,
        key: K,
        factory: &F,
        exclusive: bool,
    ) -> Result<Lease<'_, K, V, P>, PinError<F::Error>>
    where
        F: CachedObjectFactory<K, V> + ?Sized,
    {
        loop {
            let Some(lease) = self.checkout(&key, exclusive) else {
                return self.construct(key, factory, exclusive);
            };
            match factory.is_stale(&lease) {
                Ok(false) => return Ok(lease),
                Ok(true) => self.retire_stale(lease),
                Err(err) => {
                    tracing::warn!(entry = %lease.id(), "object_cache.stale_check.failed");
                    return Err(PinError::StalenessCheck(err));
                },
            }
        }
    }

    /// Releases a lease. Equivalent to dropping it.
    pub fn unpin(&self, lease: Lease<'_, K, V, P>) {
        debug_assert!(
            std::ptr::eq(lease.cache(), self),
            "lease unpinned through a different cache"
        );
        drop(lease);
    }

    /// Removes the leased entry from the registry and returns its value.
    ///
    /// The entry's weight is refunded and the value is no longer the cache's
    /// to release.
    ///
    /// # Panics
    ///
    /// If any other lease on the entry is outstanding.
    pub fn detach(&self, lease: Lease<'_, K, V, P>) -> V {
        assert!(
            std::ptr::eq(lease.cache(), self),
            "lease detached through a different cache"
        );
        let (id, value, checked_out) = lease.disarm();
        let registry_handle = {
            let mut registry = self.registry.lock();
            registry.detach(id, checked_out)
        };
        drop(registry_handle);
        match Arc::try_unwrap(value) {
            Ok(value) => value,
            Err(_) => unreachable!("detached entry {id} still has other owners"),
        }
    }

    /// Evicts every idle entry for `key` and marks pinned ones stale so they
    /// are retired on their next pin attempt.
    ///
    /// Returns the number of entries evicted immediately.
    pub fn discard(&self, key: &K) -> usize {
        let mut doomed = Doomed::new();
        let evicted = {
            let mut registry = self.registry.lock();
            registry.discard(key, &mut doomed)
        };
        drop(doomed);
        evicted
    }

    /// Releases every cached value and resets the weight to zero.
    ///
    /// # Panics
    ///
    /// If any entry is pinned or under construction.
    pub fn discard_all(&self) {
        let doomed = {
            let mut registry = self.registry.lock();
            registry.discard_all()
        };
        drop(doomed);
    }

    /// Total weight of all constructed entries.
    pub fn bytes_cached(&self) -> u64 {
        self.registry.lock().bytes_cached
    }

    pub fn bytes_max(&self) -> u64 {
        self.registry.lock().bytes_max
    }

    /// Changes the budget and evicts idle entries until it is respected or
    /// nothing evictable is left.
    pub fn set_max_bytes(&self, bytes_max: u64) {
        let mut doomed = Doomed::new();
        {
            let mut registry = self.registry.lock();
            registry.bytes_max = bytes_max;
            registry.evict_to_fit(&mut doomed);
            tracing::debug!(
                bytes_max,
                bytes_cached = registry.bytes_cached,
                evicted = doomed.len(),
                "object_cache.set_max_bytes"
            );
        }
        drop(doomed);
    }

    /// Number of constructed entries.
    pub fn len(&self) -> usize {
        let registry = self.registry.lock();
        registry.entries.iter().filter(|(_, slot)| slot.is_ready()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of constructed entries with at least one outstanding lease.
    pub fn pinned_count(&self) -> usize {
        let registry = self.registry.lock();
        registry.pinned_count()
    }

    /// Verifies registry bookkeeping.
    ///
    /// Checks that the charged weight matches the constructed entries, that the
    /// key index and the entry table agree, and that the victim policy tracks
    /// exactly the idle entries.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.registry.lock().check_invariants()
    }

    fn checkout(&self, key: &K, exclusive: bool) -> Option<Lease<'_, K, V, P>> {
        let mut doomed = Doomed::new();
        let hit = {
            let mut registry = self.registry.lock();
            registry.checkout(key, exclusive, &mut doomed)
        };
        drop(doomed);
        let (id, value, checked_out) = hit?;
        Some(Lease::new(self, id, key.clone(), value, checked_out))
    }

    fn retire_stale(&self, lease: Lease<'_, K, V, P>) {
        let (id, value, checked_out) = lease.disarm();
        let mut doomed = Doomed::new();
        {
            let mut registry = self.registry.lock();
            registry.unpin(id, value, checked_out);
            registry.mark_stale(id, Removal::Stale, &mut doomed);
        }
        drop(doomed);
    }

    fn construct<F>(
        &self,
        key: K,
        factory: &F,
        exclusive: bool,
    ) -> Result<Lease<'_, K, V, P>, PinError<F::Error>>
    where
        F: CachedObjectFactory<K, V> + ?Sized,
    {
        let reservation = self.reserve(key.clone());
        match factory.initialize_entry(&key, UninitializedEntry::new()) {
            Ok(built) => {
                let (id, value, checked_out) = reservation.commit(built, exclusive);
                Ok(Lease::new(self, id, key, value, checked_out))
            },
            Err(err) => {
                tracing::warn!(entry = %reservation.id, "object_cache.construct.failed");
                drop(reservation);
                Err(PinError::Construction(err))
            },
        }
    }

    fn reserve(&self, key: K) -> Reservation<'_, K, V, P> {
        let id = self.registry.lock().reserve(key);
        tracing::debug!(entry = %id, "object_cache.pin.miss");
        Reservation {
            cache: self,
            id,
            armed: true,
        }
    }

    /// Unpins on behalf of a dropped lease.
    pub(crate) fn release(&self, id: EntryId, value: Arc<V>, checked_out: bool) {
        self.registry.lock().unpin(id, value, checked_out);
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> ObjectCacheMetricsSnapshot {
        let registry = self.registry.lock();
        let ready = registry.entries.iter().filter(|(_, slot)| slot.is_ready()).count();
        ObjectCacheMetricsSnapshot {
            pin_calls: registry.metrics.pin_calls,
            pin_hits: registry.metrics.pin_hits,
            pin_misses: registry.metrics.pin_misses,
            constructions: registry.metrics.constructions,
            construction_failures: registry.metrics.construction_failures,
            stale_evictions: registry.metrics.stale_evictions,
            capacity_evictions: registry.metrics.capacity_evictions,
            unpins: registry.metrics.unpins,
            discards: registry.metrics.discards,
            detaches: registry.metrics.detaches,
            bytes_cached: registry.bytes_cached,
            bytes_max: registry.bytes_max,
            entries: ready,
            pinned_entries: registry.pinned_count(),
        }
    }
}

#[cfg(feature = "metrics")]
impl<K, V, P> MetricsSnapshotProvider<ObjectCacheMetricsSnapshot> for ObjectCache<K, V, P>
where
    K: Eq + Hash + Clone,
    P: VictimPolicy,
{
    fn snapshot(&self) -> ObjectCacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}

impl<K, V, P> fmt::Debug for ObjectCache<K, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("ObjectCache");
        match self.registry.try_lock() {
            Some(registry) => out
                .field("entries", &registry.entries.len())
                .field("bytes_cached", &registry.bytes_cached)
                .field("bytes_max", &registry.bytes_max)
                .finish(),
            None => out.finish_non_exhaustive(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reservation
// ---------------------------------------------------------------------------

/// Placeholder for an entry whose value is being built without the lock.
///
/// Dropping an armed reservation removes the placeholder, so a factory that
/// fails or panics leaves the registry untouched.
struct Reservation<'c, K, V, P>
where
    K: Eq + Hash + Clone,
    P: VictimPolicy,
{
    cache: &'c ObjectCache<K, V, P>,
    id: EntryId,
    armed: bool,
}

impl<K, V, P> Reservation<'_, K, V, P>
where
    K: Eq + Hash + Clone,
    P: VictimPolicy,
{
    /// Publishes the built value and charges its weight.
    ///
    /// # Panics
    ///
    /// If the weight would overflow the cache's total. The rejected value is
    /// dropped without the lock and the placeholder is abandoned.
    fn commit(mut self, built: InitializedEntry<V>, exclusive: bool) -> (EntryId, Arc<V>, bool) {
        let mut doomed = Doomed::new();
        let committed = {
            let mut registry = self.cache.registry.lock();
            registry.commit(self.id, built, exclusive, &mut doomed)
        };
        drop(doomed);
        match committed {
            Ok((value, checked_out)) => {
                self.armed = false;
                (self.id, value, checked_out)
            },
            Err(rejected) => {
                let weight = rejected.weight;
                drop(rejected);
                panic!(
                    "entry {} of weight {weight} overflows the cache's total weight",
                    self.id
                );
            },
        }
    }
}

impl<K, V, P> Drop for Reservation<'_, K, V, P>
where
    K: Eq + Hash + Clone,
    P: VictimPolicy,
{
    fn drop(&mut self) {
        if self.armed {
            self.cache.registry.lock().abandon(self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

impl<K, V, P> Registry<K, V, P>
where
    K: Eq + Hash + Clone,
    P: VictimPolicy,
{
    /// Finds and pins a reusable entry for `key`. Idle entries flagged stale
    /// are evicted along the way.
    fn checkout(
        &mut self,
        key: &K,
        exclusive: bool,
        doomed: &mut Doomed<V>,
    ) -> Option<(EntryId, Arc<V>, bool)> {
        let mut stale_idle = Vec::new();
        let mut found = None;
        if let Some(ids) = self.by_key.get(key) {
            for &id in ids {
                let Some(slot) = self.entries.get(id) else {
                    continue;
                };
                if !slot.is_ready() || slot.checked_out {
                    continue;
                }
                if slot.stale {
                    if slot.pin_count == 0 {
                        stale_idle.push(id);
                    }
                    continue;
                }
                if exclusive && slot.pin_count > 0 {
                    continue;
                }
                found = Some(id);
                break;
            }
        }
        for id in stale_idle {
            self.remove_entry(id, Removal::Stale, doomed);
        }

        let Some(id) = found else {
            #[cfg(feature = "metrics")]
            self.metrics.record_pin_miss();
            return None;
        };
        let slot = self.entries.get_mut(id)?;
        let check_out = exclusive || !slot.sharable;
        let value = if check_out {
            slot.value.take()?
        } else {
            Arc::clone(slot.value.as_ref()?)
        };
        let was_idle = slot.pin_count == 0;
        slot.pin_count += 1;
        slot.checked_out = check_out;
        let pin_count = slot.pin_count;
        if was_idle {
            self.policy.on_pinned(id);
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_pin_hit();
        tracing::debug!(entry = %id, pin_count, exclusive, "object_cache.pin.hit");
        Some((id, value, check_out))
    }

    fn reserve(&mut self, key: K) -> EntryId {
        let id = self.entries.insert(EntrySlot::reserved(key.clone()));
        self.by_key.entry(key).or_default().push(id);
        id
    }

    fn commit(
        &mut self,
        id: EntryId,
        built: InitializedEntry<V>,
        exclusive: bool,
        doomed: &mut Doomed<V>,
    ) -> Result<(Arc<V>, bool), InitializedEntry<V>> {
        let Some(bytes_cached) = self.bytes_cached.checked_add(built.weight) else {
            return Err(built);
        };
        let Some(slot) = self.entries.get_mut(id) else {
            panic!("reserved entry {id} vanished before construction finished");
        };
        debug_assert_eq!(slot.state, EntryState::Reserved);
        let InitializedEntry {
            value,
            weight,
            sharable,
        } = built;
        let value = Arc::new(value);
        let check_out = exclusive || !sharable;
        slot.value = if check_out {
            None
        } else {
            Some(Arc::clone(&value))
        };
        slot.weight = weight;
        slot.sharable = sharable;
        slot.checked_out = check_out;
        slot.state = EntryState::Ready;
        self.bytes_cached = bytes_cached;

        #[cfg(feature = "metrics")]
        self.metrics.record_construction();
        tracing::debug!(
            entry = %id,
            weight,
            sharable,
            bytes_cached = self.bytes_cached,
            "object_cache.construct.commit"
        );
        self.evict_to_fit(doomed);
        Ok((value, check_out))
    }

    fn abandon(&mut self, id: EntryId) {
        #[cfg(feature = "metrics")]
        self.metrics.record_construction_failure();
        let mut nothing = Doomed::new();
        self.remove_entry(id, Removal::Discard, &mut nothing);
        debug_assert!(nothing.is_empty());
    }

    /// Returns the lease's value to the entry.
    ///
    /// A shared lease's handle is dropped here, under the lock, so that the
    /// next sole holder never observes it. The entry still owns the value, so
    /// this never runs the value's destructor.
    fn unpin(&mut self, id: EntryId, value: Arc<V>, checked_out: bool) {
        let Some(slot) = self.entries.get_mut(id) else {
            panic!("unpin of entry {id} that is not in the cache");
        };
        assert!(slot.pin_count > 0, "unpin of entry {id} with zero pin count");
        if checked_out {
            slot.value = Some(value);
            slot.checked_out = false;
        } else {
            debug_assert!(Arc::strong_count(&value) > 1);
            drop(value);
        }
        slot.pin_count -= 1;
        if slot.pin_count == 0 {
            self.policy.on_idle(id);
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_unpin();
    }

    /// Flags `id` stale, evicting it at once if it is idle.
    fn mark_stale(&mut self, id: EntryId, reason: Removal, doomed: &mut Doomed<V>) -> bool {
        let Some(slot) = self.entries.get_mut(id) else {
            return false;
        };
        if slot.is_idle() {
            self.remove_entry(id, reason, doomed);
            true
        } else {
            slot.stale = true;
            tracing::debug!(entry = %id, pin_count = slot.pin_count, "object_cache.stale");
            false
        }
    }

    fn detach(&mut self, id: EntryId, checked_out: bool) -> Option<Arc<V>> {
        let Some(slot) = self.entries.get(id) else {
            panic!("detach of entry {id} that is not in the cache");
        };
        assert!(
            slot.pin_count == 1,
            "detach of entry {id} requires its only lease, found {} pins",
            slot.pin_count
        );
        debug_assert_eq!(slot.checked_out, checked_out);
        let slot = self.unlink(id)?;
        self.bytes_cached -= slot.weight;

        #[cfg(feature = "metrics")]
        self.metrics.record_detach();
        tracing::debug!(entry = %id, weight = slot.weight, "object_cache.detach");
        slot.value
    }

    fn discard(&mut self, key: &K, doomed: &mut Doomed<V>) -> usize {
        let ids = self.by_key.get(key).cloned().unwrap_or_default();
        let mut evicted = 0;
        for id in ids {
            if self.mark_stale(id, Removal::Discard, doomed) {
                evicted += 1;
            }
        }
        tracing::debug!(evicted, "object_cache.discard");
        evicted
    }

    fn discard_all(&mut self) -> Doomed<V> {
        if let Some((id, slot)) = self.entries.iter().find(|(_, slot)| slot.pin_count > 0) {
            panic!(
                "discard_all called while entry {id} has {} outstanding pins",
                slot.pin_count
            );
        }
        let released = self.entries.len();
        let doomed: Doomed<V> = self
            .entries
            .drain()
            .into_iter()
            .filter_map(|slot| slot.value)
            .collect();
        self.by_key.clear();
        self.policy.clear();
        self.bytes_cached = 0;

        #[cfg(feature = "metrics")]
        for _ in 0..released {
            self.metrics.record_discard();
        }
        tracing::debug!(released, "object_cache.discard_all");
        doomed
    }

    /// Evicts policy victims while the budget is exceeded.
    fn evict_to_fit(&mut self, doomed: &mut Doomed<V>) {
        while self.bytes_cached > self.bytes_max {
            let Some(victim) = self.policy.select_victim() else {
                tracing::warn!(
                    bytes_cached = self.bytes_cached,
                    bytes_max = self.bytes_max,
                    "object_cache.over_capacity"
                );
                break;
            };
            if !self.entries.get(victim).is_some_and(|slot| slot.is_idle()) {
                tracing::warn!(entry = %victim, "object_cache.evict.rejected_victim");
                self.policy.on_removed(victim);
                continue;
            }
            self.remove_entry(victim, Removal::Capacity, doomed);
        }
    }

    fn remove_entry(&mut self, id: EntryId, reason: Removal, doomed: &mut Doomed<V>) {
        let Some(slot) = self.unlink(id) else {
            return;
        };
        if slot.is_ready() {
            self.bytes_cached -= slot.weight;
        }

        #[cfg(feature = "metrics")]
        match reason {
            Removal::Capacity => self.metrics.record_capacity_eviction(),
            Removal::Stale => self.metrics.record_stale_eviction(),
            Removal::Discard if slot.is_ready() => self.metrics.record_discard(),
            Removal::Discard => {},
        }
        tracing::debug!(
            entry = %id,
            ?reason,
            weight = slot.weight,
            bytes_cached = self.bytes_cached,
            "object_cache.evict"
        );
        doomed.extend(slot.value);
    }

    /// Takes `id` out of the entry table, the key index and the policy.
    fn unlink(&mut self, id: EntryId) -> Option<EntrySlot<K, V>> {
        let slot = self.entries.remove(id)?;
        if let Some(ids) = self.by_key.get_mut(&slot.key) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_key.remove(&slot.key);
            }
        }
        self.policy.on_removed(id);
        Some(slot)
    }

    fn pinned_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, slot)| slot.is_ready() && slot.pin_count > 0)
            .count()
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut weight = 0u64;
        let mut idle = 0usize;
        for (id, slot) in self.entries.iter() {
            let indexed = self
                .by_key
                .get(&slot.key)
                .is_some_and(|ids| ids.contains(&id));
            if !indexed {
                return Err(InvariantError::new(format!(
                    "entry {id} missing from key index"
                )));
            }
            match slot.state {
                EntryState::Reserved => {
                    if slot.pin_count != 1 || slot.value.is_some() {
                        return Err(InvariantError::new(format!(
                            "reserved entry {id} must have one pin and no value"
                        )));
                    }
                },
                EntryState::Ready => {
                    weight += slot.weight;
                    if slot.checked_out == slot.value.is_some() {
                        return Err(InvariantError::new(format!(
                            "entry {id} checked_out={} disagrees with value presence",
                            slot.checked_out
                        )));
                    }
                    if slot.checked_out && slot.pin_count == 0 {
                        return Err(InvariantError::new(format!(
                            "entry {id} checked out without a pin"
                        )));
                    }
                },
            }
            let candidate = self.policy.is_candidate(id);
            if slot.is_idle() != candidate {
                return Err(InvariantError::new(format!(
                    "entry {id} idle={} but victim candidate={candidate}",
                    slot.is_idle()
                )));
            }
            if slot.is_idle() {
                idle += 1;
            }
        }
        if weight != self.bytes_cached {
            return Err(InvariantError::new(format!(
                "bytes_cached {} != sum of entry weights {weight}",
                self.bytes_cached
            )));
        }
        if idle != self.policy.candidate_count() {
            return Err(InvariantError::new(format!(
                "{idle} idle entries but policy tracks {}",
                self.policy.candidate_count()
            )));
        }
        let indexed: usize = self.by_key.values().map(Vec::len).sum();
        if indexed != self.entries.len() {
            return Err(InvariantError::new(format!(
                "key index holds {indexed} ids for {} entries",
                self.entries.len()
            )));
        }
        Ok(())
    }
}
