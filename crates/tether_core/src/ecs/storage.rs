// storage.rs - sparse, generation-checked component column

use super::Entity;

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: T,
}

/// One component column indexed by entity slot.
///
/// Every access validates the handle's generation, so lookups through a
/// handle whose entity was destroyed (or whose slot was reused) return
/// `None` instead of someone else's data.
#[derive(Debug, Clone)]
pub struct ComponentStorage<T> {
    slots: Vec<Option<Slot<T>>>,
    len: usize,
}

impl<T> ComponentStorage<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
        }
    }

    /// Insert or replace the component for `entity`, returning the previous
    /// value held by the same entity.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        let slot = entity.index() as usize;
        if slot >= self.slots.len() {
            self.slots.resize_with(slot + 1, || None);
        }

        let previous = self.slots[slot].take();
        self.slots[slot] = Some(Slot {
            generation: entity.generation(),
            value,
        });

        match previous {
            Some(old) if old.generation == entity.generation() => Some(old.value),
            Some(_) => None,
            None => {
                self.len += 1;
                None
            }
        }
    }

    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let slot = self.slots.get_mut(entity.index() as usize)?;
        if slot.as_ref()?.generation != entity.generation() {
            return None;
        }
        self.len -= 1;
        slot.take().map(|s| s.value)
    }

    #[inline]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        match self.slots.get(entity.index() as usize)? {
            Some(slot) if slot.generation == entity.generation() => Some(&slot.value),
            _ => None,
        }
    }

    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        match self.slots.get_mut(entity.index() as usize)? {
            Some(slot) if slot.generation == entity.generation() => Some(&mut slot.value),
            _ => None,
        }
    }

    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.get(entity).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.len = 0;
    }

    /// Iterate `(entity, component)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|s| (Entity::new(index as u32, s.generation), &s.value))
        })
    }

    /// Mutable iteration in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            slot.as_mut()
                .map(|s| (Entity::new(index as u32, s.generation), &mut s.value))
        })
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.slots.iter_mut().flatten().map(|s| &mut s.value)
    }
}

impl<T> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::EntityRegistry;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Mass(f32);

    #[test]
    fn insert_get_remove() {
        let mut registry = EntityRegistry::new();
        let mut masses = ComponentStorage::new();
        let e = registry.spawn();

        assert_eq!(masses.insert(e, Mass(1.0)), None);
        assert_eq!(masses.insert(e, Mass(2.0)), Some(Mass(1.0)));
        assert_eq!(masses.len(), 1);
        assert_eq!(masses.get(e), Some(&Mass(2.0)));

        assert_eq!(masses.remove(e), Some(Mass(2.0)));
        assert!(masses.is_empty());
        assert_eq!(masses.get(e), None);
    }

    #[test]
    fn stale_handle_cannot_see_new_occupant() {
        let mut registry = EntityRegistry::new();
        let mut masses = ComponentStorage::new();

        let old = registry.spawn();
        masses.insert(old, Mass(1.0));
        masses.remove(old);
        registry.despawn(old);

        let new = registry.spawn();
        masses.insert(new, Mass(5.0));

        assert_eq!(old.index(), new.index());
        assert_eq!(masses.get(old), None);
        assert!(masses.get_mut(old).is_none());
        assert_eq!(masses.remove(old), None);
        assert_eq!(masses.get(new), Some(&Mass(5.0)));
    }

    #[test]
    fn overwrite_of_stale_slot_keeps_count() {
        let mut registry = EntityRegistry::new();
        let mut masses = ComponentStorage::new();

        let old = registry.spawn();
        masses.insert(old, Mass(1.0));
        registry.despawn(old);
        let new = registry.spawn();

        // Slot still holds the old generation's value; replacing it must not
        // double count.
        assert_eq!(masses.insert(new, Mass(3.0)), None);
        assert_eq!(masses.len(), 1);
    }

    #[test]
    fn iteration_is_in_slot_order() {
        let mut registry = EntityRegistry::new();
        let mut masses = ComponentStorage::new();
        let a = registry.spawn();
        let b = registry.spawn();
        let c = registry.spawn();
        masses.insert(c, Mass(3.0));
        masses.insert(a, Mass(1.0));
        masses.insert(b, Mass(2.0));

        let order: Vec<_> = masses.iter().map(|(e, _)| e).collect();
        assert_eq!(order, vec![a, b, c]);

        for (_, mass) in masses.iter_mut() {
            mass.0 *= 2.0;
        }
        assert_eq!(masses.get(b), Some(&Mass(4.0)));
    }
}
