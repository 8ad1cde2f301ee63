//! pincache: a weight-bounded shared object cache with pinned leases.
//!
//! Clients pin a key and get back a [`Lease`](lease::Lease) on a cached
//! value, built on demand by a [`CachedObjectFactory`](traits::CachedObjectFactory)
//! when nothing reusable is cached. Pinned entries are never evicted; idle
//! entries stay cached until an LRU victim policy reclaims them under byte
//! budget pressure or the factory reports them stale. The registry lock is
//! never held while a factory or a value's destructor runs, so construction
//! may pin other entries of the same cache.
//!
//! See [`cache`] for the pin protocol and its invariants.

pub mod builder;
pub mod cache;
pub mod ds;
pub mod entry;
pub mod error;
pub mod lease;
pub mod policy;
pub mod scope;
pub mod traits;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
