//! Entity handle with generational index
//!
//! Entities are lightweight handles (8 bytes) that reference data in a
//! component store. The generation counter prevents use-after-free bugs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity handle (generation-indexed for safety)
///
/// - Index: slot in the registry and in every component column
/// - Generation: bumped when the slot is freed, so old handles stop resolving
///
/// Handles order by index first, which gives every pass that sorts
/// entities a stable, allocation-order iteration.
///
/// Example:
/// ```ignore
/// let entity = registry.spawn();
/// registry.despawn(entity);
/// assert!(!registry.is_alive(entity)); // generation mismatch
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}
