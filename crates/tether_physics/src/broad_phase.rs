//! Candidate-pair acceleration for collision detection.
//!
//! A broad-phase is rebuilt from scratch every substep: cleared, then fed
//! every collider's bounds, then queried once per collider.

use tether_core::ecs::Entity;
use tether_core::math::Aabb;

/// Accelerator that returns a superset of the entities whose bounds overlap
/// a query box.
pub trait BroadPhase: Send + Sync {
    fn clear(&mut self);

    fn insert(&mut self, entity: Entity, bounds: Aabb);

    /// Append candidates overlapping `bounds` to `out`, without duplicates.
    fn query(&self, bounds: &Aabb, out: &mut Vec<Entity>);

    fn name(&self) -> &'static str;
}

/// Exhaustive reference accelerator; exact but O(n) per query.
#[derive(Debug, Default)]
pub struct BruteForce {
    entries: Vec<(Entity, Aabb)>,
}

impl BruteForce {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BroadPhase for BruteForce {
    fn clear(&mut self) {
        self.entries.clear();
    }

    fn insert(&mut self, entity: Entity, bounds: Aabb) {
        self.entries.push((entity, bounds));
    }

    fn query(&self, bounds: &Aabb, out: &mut Vec<Entity>) {
        out.extend(
            self.entries
                .iter()
                .filter(|(_, other)| other.overlaps(bounds))
                .map(|(entity, _)| *entity),
        );
    }

    fn name(&self) -> &'static str {
        "brute_force"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::ecs::EntityRegistry;
    use tether_core::math::Vec3;

    #[test]
    fn brute_force_returns_only_overlaps() {
        let mut registry = EntityRegistry::new();
        let (a, b) = (registry.spawn(), registry.spawn());
        let mut phase = BruteForce::new();
        phase.insert(a, Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE));
        phase.insert(b, Aabb::from_center_half_extents(Vec3::splat(10.0), Vec3::ONE));

        let mut out = Vec::new();
        phase.query(&Aabb::from_center_half_extents(Vec3::X, Vec3::ONE), &mut out);
        assert_eq!(out, vec![a]);

        phase.clear();
        assert!(phase.is_empty());
    }
}
