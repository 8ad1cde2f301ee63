//! Victim policies for choosing which idle entry to evict.
//!
//! [`lru::LruVictimPolicy`] is the default. Custom policies implement
//! [`VictimPolicy`](crate::traits::VictimPolicy).

pub mod lru;
