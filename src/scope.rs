//! Session-private view over a shared [`ObjectCache`].
//!
//! A [`PinScope`] remembers the leases one session has taken so that repeated
//! lookups of the same key inside the session are answered locally, without
//! touching the shared registry or running a staleness check again. Every
//! lease is released when the scope is cleared or dropped.
//!
//! ```text
//!   session ──► PinScope { key -> Lease } ──miss──► ObjectCache::pin
//!                    │                                   │
//!                    └──────── hit: &V ◄─────────────────┘
//! ```

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::cache::ObjectCache;
use crate::error::PinError;
use crate::lease::Lease;
use crate::policy::lru::LruVictimPolicy;
use crate::traits::{CachedObjectFactory, VictimPolicy};

/// Per-session set of leases on a shared cache, at most one per key.
pub struct PinScope<'c, K, V, P = LruVictimPolicy>
where
    K: Eq + Hash + Clone,
    P: VictimPolicy,
{
    cache: &'c ObjectCache<K, V, P>,
    leases: FxHashMap<K, Lease<'c, K, V, P>>,
}

impl<'c, K, V, P> PinScope<'c, K, V, P>
where
    K: Eq + Hash + Clone,
    P: VictimPolicy,
{
    pub fn new(cache: &'c ObjectCache<K, V, P>) -> Self {
        Self {
            cache,
            leases: FxHashMap::default(),
        }
    }

    /// Returns the session's value for `key`, pinning it in the shared cache
    /// on first use.
    ///
    /// `exclusive` only applies to that first pin.
    pub fn get_or_pin<F>(
        &mut self,
        key: K,
        factory: &F,
        exclusive: bool,
    ) -> Result<&V, PinError<F::Error>>
    where
        F: CachedObjectFactory<K, V> + ?Sized,
    {
        use std::collections::hash_map::Entry;

        match self.leases.entry(key) {
            Entry::Occupied(held) => Ok(&**held.into_mut()),
            Entry::Vacant(slot) => {
                let lease = self.cache.pin(slot.key().clone(), factory, exclusive)?;
                Ok(&**slot.insert(lease))
            },
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.leases.get(key).map(|lease| &**lease)
    }

    /// Mutable access to a value the session holds exclusively.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.leases.get_mut(key).and_then(Lease::get_mut)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.leases.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.leases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }

    /// Unpins the session's lease on `key`; returns `false` if it held none.
    pub fn release(&mut self, key: &K) -> bool {
        self.leases.remove(key).is_some()
    }

    /// Unpins every lease held by the session.
    pub fn clear(&mut self) {
        self.leases.clear();
    }

    pub fn cache(&self) -> &'c ObjectCache<K, V, P> {
        self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{InitializedEntry, UninitializedEntry};
    use std::cell::Cell;
    use std::convert::Infallible;

    struct Counting {
        built: Cell<u32>,
        sharable: bool,
    }

    impl CachedObjectFactory<&'static str, String> for Counting {
        type Error = Infallible;

        fn initialize_entry(
            &self,
            key: &&'static str,
            entry: UninitializedEntry<String>,
        ) -> Result<InitializedEntry<String>, Infallible> {
            self.built.set(self.built.get() + 1);
            Ok(entry.initialize(key.to_uppercase(), 2, self.sharable))
        }
    }

    fn factory(sharable: bool) -> Counting {
        Counting {
            built: Cell::new(0),
            sharable,
        }
    }

    #[test]
    fn repeated_lookup_reuses_session_lease() {
        let cache: ObjectCache<&'static str, String> = ObjectCache::new(100);
        let f = factory(false);
        let mut scope = PinScope::new(&cache);

        assert_eq!(scope.get_or_pin("emp", &f, false).unwrap(), "EMP");
        assert_eq!(scope.get_or_pin("emp", &f, false).unwrap(), "EMP");
        assert_eq!(f.built.get(), 1);
        assert_eq!(scope.len(), 1);
        assert_eq!(cache.pinned_count(), 1);
    }

    #[test]
    fn drop_unpins_everything() {
        let cache: ObjectCache<&'static str, String> = ObjectCache::new(100);
        let f = factory(true);
        {
            let mut scope = PinScope::new(&cache);
            scope.get_or_pin("emp", &f, false).unwrap();
            scope.get_or_pin("dept", &f, false).unwrap();
            assert_eq!(cache.pinned_count(), 2);
        }
        assert_eq!(cache.pinned_count(), 0);
        assert_eq!(cache.len(), 2);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn release_and_clear() {
        let cache: ObjectCache<&'static str, String> = ObjectCache::new(100);
        let f = factory(true);
        let mut scope = PinScope::new(&cache);
        scope.get_or_pin("a", &f, false).unwrap();
        scope.get_or_pin("b", &f, false).unwrap();

        assert!(scope.release(&"a"));
        assert!(!scope.release(&"a"));
        assert!(!scope.contains(&"a"));
        assert_eq!(scope.get(&"b").map(String::as_str), Some("B"));
        assert_eq!(cache.pinned_count(), 1);

        scope.clear();
        assert!(scope.is_empty());
        assert_eq!(cache.pinned_count(), 0);
    }

    #[test]
    fn two_sessions_share_a_sharable_entry() {
        let cache: ObjectCache<&'static str, String> = ObjectCache::new(100);
        let f = factory(true);
        let mut left = PinScope::new(&cache);
        let mut right = PinScope::new(&cache);

        left.get_or_pin("emp", &f, false).unwrap();
        right.get_or_pin("emp", &f, false).unwrap();
        assert_eq!(f.built.get(), 1);
        assert_eq!(cache.bytes_cached(), 2);
        assert!(left.get_mut(&"emp").is_none());
    }

    #[test]
    fn exclusive_session_value_is_mutable() {
        let cache: ObjectCache<&'static str, String> = ObjectCache::new(100);
        let f = factory(true);
        let mut scope = PinScope::new(&cache);
        scope.get_or_pin("emp", &f, true).unwrap();
        scope.get_mut(&"emp").unwrap().push_str("_LOCAL");
        assert_eq!(scope.get(&"emp").unwrap(), "EMP_LOCAL");
        assert!(std::ptr::eq(scope.cache(), &cache));
    }
}
