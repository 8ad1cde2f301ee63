//! Builder for [`ObjectCache`].
//!
//! ## Example
//!
//! ```rust
//! use pincache::builder::ObjectCacheBuilder;
//!
//! let cache = ObjectCacheBuilder::new(4096)
//!     .expected_entries(128)
//!     .build::<String, Vec<u8>>();
//! assert_eq!(cache.bytes_max(), 4096);
//! assert_eq!(cache.bytes_cached(), 0);
//! ```

use std::hash::Hash;

use crate::cache::ObjectCache;
use crate::error::ConfigError;
use crate::policy::lru::LruVictimPolicy;
use crate::traits::VictimPolicy;

/// Configures the byte budget and initial sizing of an [`ObjectCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectCacheBuilder {
    bytes_max: u64,
    expected_entries: usize,
}

impl ObjectCacheBuilder {
    /// Starts a builder for a cache whose entries may weigh at most
    /// `bytes_max` in total.
    pub fn new(bytes_max: u64) -> Self {
        Self {
            bytes_max,
            expected_entries: 0,
        }
    }

    /// Pre-sizes the registry for roughly `n` live entries.
    pub fn expected_entries(mut self, n: usize) -> Self {
        self.expected_entries = n;
        self
    }

    /// Builds an LRU cache. A zero budget is accepted; every unpinned entry
    /// is then evicted as soon as another is constructed.
    pub fn build<K, V>(self) -> ObjectCache<K, V, LruVictimPolicy>
    where
        K: Eq + Hash + Clone,
    {
        self.build_with_policy(LruVictimPolicy::with_capacity(self.expected_entries))
    }

    pub fn build_with_policy<K, V, P>(self, policy: P) -> ObjectCache<K, V, P>
    where
        K: Eq + Hash + Clone,
        P: VictimPolicy,
    {
        ObjectCache::with_policy_and_capacity(self.bytes_max, policy, self.expected_entries)
    }

    /// Builds an LRU cache, rejecting a zero budget.
    pub fn try_build<K, V>(self) -> Result<ObjectCache<K, V, LruVictimPolicy>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        self.validate()?;
        Ok(self.build())
    }

    pub fn try_build_with_policy<K, V, P>(self, policy: P) -> Result<ObjectCache<K, V, P>, ConfigError>
    where
        K: Eq + Hash + Clone,
        P: VictimPolicy,
    {
        self.validate()?;
        Ok(self.build_with_policy(policy))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bytes_max == 0 {
            return Err(ConfigError::new("bytes_max must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_build_rejects_zero_budget() {
        let err = ObjectCacheBuilder::new(0)
            .try_build::<u32, u32>()
            .unwrap_err();
        assert_eq!(err.message(), "bytes_max must be > 0");
    }

    #[test]
    fn try_build_with_policy_accepts_positive_budget() {
        let cache = ObjectCacheBuilder::new(10)
            .expected_entries(4)
            .try_build_with_policy::<u32, u32, _>(LruVictimPolicy::new())
            .unwrap();
        assert_eq!(cache.bytes_max(), 10);
        assert!(cache.is_empty());
    }

    #[test]
    fn build_accepts_zero_budget() {
        let cache = ObjectCacheBuilder::new(0).build::<u32, u32>();
        assert_eq!(cache.bytes_max(), 0);
    }
}
