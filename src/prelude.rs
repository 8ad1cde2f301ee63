pub use crate::builder::ObjectCacheBuilder;
pub use crate::cache::ObjectCache;
pub use crate::entry::{EntryId, InitializedEntry, UninitializedEntry};
pub use crate::error::{ConfigError, InvariantError, PinError};
pub use crate::lease::Lease;
pub use crate::policy::lru::LruVictimPolicy;
pub use crate::scope::PinScope;
pub use crate::traits::{CachedObjectFactory, VictimPolicy};
