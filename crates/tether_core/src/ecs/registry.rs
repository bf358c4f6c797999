// registry.rs - entity allocation with slot reuse

use super::Entity;

/// Hands out entity handles and tracks which of them are alive.
///
/// Despawned slots are pushed to a free list and reused by later spawns with
/// an incremented generation, which invalidates any handle still pointing at
/// the old occupant.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new entity, reusing a freed slot when one is available.
    pub fn spawn(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return Entity::new(index, self.generations[slot]);
        }

        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        Entity::new(index, 0)
    }

    /// Free the entity's slot. Returns `false` for stale or unknown handles.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            tracing::trace!(?entity, "ignoring despawn of stale entity");
            return false;
        }

        let slot = entity.index() as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(entity.index());
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        let slot = entity.index() as usize;
        self.alive.get(slot).copied().unwrap_or(false)
            && self.generations[slot] == entity.generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn despawn_invalidates_handle() {
        let mut registry = EntityRegistry::new();
        let e = registry.spawn();
        assert!(registry.is_alive(e));
        assert!(registry.despawn(e));
        assert!(!registry.is_alive(e));
        assert!(!registry.despawn(e), "double despawn must be rejected");
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut registry = EntityRegistry::new();
        let first = registry.spawn();
        registry.despawn(first);
        let second = registry.spawn();

        assert_eq!(first.index(), second.index());
        assert_ne!(first.generation(), second.generation());
        assert!(!registry.is_alive(first));
        assert!(registry.is_alive(second));
    }

    #[test]
    fn fresh_slots_are_allocated_in_order() {
        let mut registry = EntityRegistry::new();
        let a = registry.spawn();
        let b = registry.spawn();
        assert_eq!((a.index(), b.index()), (0, 1));
        assert!(!registry.is_alive(Entity::new(5, 0)));
    }
}
