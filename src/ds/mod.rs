//! Internal data structures backing the registry and the victim policy.

pub mod intrusive_list;
pub mod slot_arena;

pub use intrusive_list::IntrusiveList;
pub use slot_arena::{SlotArena, SlotId};
