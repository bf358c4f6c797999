//! Minimal entity store used by the simulation crates.
//!
//! Entities are generation-checked handles handed out by an
//! [`EntityRegistry`]. Component data lives in per-type
//! [`ComponentStorage`] columns indexed by the entity slot, so a stale handle
//! can never observe the data of an entity that later reused its slot.

mod entity;
mod registry;
mod storage;

pub use entity::Entity;
pub use registry::EntityRegistry;
pub use storage::ComponentStorage;
