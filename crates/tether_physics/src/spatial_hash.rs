//! Uniform-grid broad-phase.
//!
//! Each entity is registered in every cell its bounds touch. Cell buckets
//! are kept between rebuilds so steady-state substeps do not allocate.

use crate::broad_phase::BroadPhase;
use std::collections::HashMap;
use tether_core::ecs::Entity;
use tether_core::math::{Aabb, Vec3};
use tracing::warn;

pub const DEFAULT_CELL_SIZE: f32 = 2.0;

/// Integer grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellKey {
    x: i32,
    y: i32,
    z: i32,
}

#[derive(Debug)]
pub struct SpatialHash {
    cell_size: f32,
    inv_cell_size: f32,
    cells: HashMap<CellKey, Vec<Entity>>,
    /// Cells holding at least one entry since the last clear.
    occupied: Vec<CellKey>,
}

impl SpatialHash {
    /// Non-positive or non-finite sizes fall back to the default.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            warn!(cell_size, "invalid spatial hash cell size, using default");
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
            occupied: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.occupied.len()
    }

    /// Entity registrations across all cells; an entity spanning several
    /// cells counts once per cell.
    pub fn total_entries(&self) -> usize {
        self.occupied
            .iter()
            .filter_map(|key| self.cells.get(key))
            .map(Vec::len)
            .sum()
    }

    fn cell_of(&self, point: Vec3) -> CellKey {
        let scaled = (point * self.inv_cell_size).floor();
        CellKey {
            x: scaled.x as i32,
            y: scaled.y as i32,
            z: scaled.z as i32,
        }
    }

    /// Inclusive corner cells of `bounds`.
    fn cell_range(&self, bounds: &Aabb) -> (CellKey, CellKey) {
        (self.cell_of(bounds.min), self.cell_of(bounds.max))
    }
}

fn for_each_cell((lo, hi): (CellKey, CellKey), mut f: impl FnMut(CellKey)) {
    for x in lo.x..=hi.x {
        for y in lo.y..=hi.y {
            for z in lo.z..=hi.z {
                f(CellKey { x, y, z });
            }
        }
    }
}

impl Default for SpatialHash {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl BroadPhase for SpatialHash {
    fn clear(&mut self) {
        for key in self.occupied.drain(..) {
            if let Some(bucket) = self.cells.get_mut(&key) {
                bucket.clear();
            }
        }
    }

    fn insert(&mut self, entity: Entity, bounds: Aabb) {
        if !(bounds.min.is_finite() && bounds.max.is_finite()) {
            warn!(?entity, "skipping non-finite bounds in spatial hash");
            return;
        }
        let range = self.cell_range(&bounds);
        let Self {
            cells, occupied, ..
        } = self;
        for_each_cell(range, |key| {
            let bucket = cells.entry(key).or_default();
            if bucket.is_empty() {
                occupied.push(key);
            }
            bucket.push(entity);
        });
    }

    fn query(&self, bounds: &Aabb, out: &mut Vec<Entity>) {
        if !(bounds.min.is_finite() && bounds.max.is_finite()) {
            return;
        }
        let start = out.len();
        for_each_cell(self.cell_range(bounds), |key| {
            if let Some(bucket) = self.cells.get(&key) {
                out.extend_from_slice(bucket);
            }
        });
        out[start..].sort_unstable();
        let mut write = start;
        for read in start..out.len() {
            if write == start || out[read] != out[write - 1] {
                out[write] = out[read];
                write += 1;
            }
        }
        out.truncate(write);
    }

    fn name(&self) -> &'static str {
        "spatial_hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::ecs::EntityRegistry;

    fn boxed(center: Vec3, half: f32) -> Aabb {
        Aabb::from_center_half_extents(center, Vec3::splat(half))
    }

    #[test]
    fn invalid_cell_size_falls_back() {
        assert_eq!(SpatialHash::new(0.0).cell_size(), DEFAULT_CELL_SIZE);
        assert_eq!(SpatialHash::new(f32::NAN).cell_size(), DEFAULT_CELL_SIZE);
        assert_eq!(SpatialHash::new(0.5).cell_size(), 0.5);
    }

    #[test]
    fn spanning_entity_is_reported_once() {
        let mut registry = EntityRegistry::new();
        let big = registry.spawn();
        let mut hash = SpatialHash::new(1.0);
        hash.insert(big, boxed(Vec3::ZERO, 1.5));
        assert!(hash.cell_count() > 1);
        assert_eq!(hash.total_entries(), hash.cell_count());

        let mut out = Vec::new();
        hash.query(&boxed(Vec3::ZERO, 1.5), &mut out);
        assert_eq!(out, vec![big]);
    }

    #[test]
    fn distant_entities_are_not_candidates() {
        let mut registry = EntityRegistry::new();
        let (a, b) = (registry.spawn(), registry.spawn());
        let mut hash = SpatialHash::default();
        hash.insert(a, boxed(Vec3::ZERO, 0.5));
        hash.insert(b, boxed(Vec3::new(20.0, 0.0, 0.0), 0.5));

        let mut out = Vec::new();
        hash.query(&boxed(Vec3::ZERO, 0.5), &mut out);
        assert_eq!(out, vec![a]);
    }

    #[test]
    fn negative_coordinates_use_floor() {
        let mut registry = EntityRegistry::new();
        let a = registry.spawn();
        let mut hash = SpatialHash::new(1.0);
        hash.insert(a, boxed(Vec3::splat(-0.5), 0.1));
        assert_eq!(hash.cell_count(), 1);

        let mut out = Vec::new();
        hash.query(&boxed(Vec3::splat(0.5), 0.1), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn point_bounds_occupy_one_cell() {
        let mut registry = EntityRegistry::new();
        let (inside, on_edge) = (registry.spawn(), registry.spawn());
        let mut hash = SpatialHash::new(1.0);

        hash.insert(inside, Aabb::new(Vec3::splat(0.5), Vec3::splat(0.5)));
        assert_eq!(hash.cell_count(), 1);
        assert_eq!(hash.total_entries(), 1);

        // Exactly on a cell corner: floor puts it in the upper cell only.
        let corner = Vec3::new(1.0, 2.0, -3.0);
        hash.insert(on_edge, Aabb::new(corner, corner));
        assert_eq!(hash.cell_count(), 2);
        assert_eq!(hash.total_entries(), 2);

        let mut out = Vec::new();
        hash.query(&Aabb::new(Vec3::new(1.5, 2.5, -2.5), Vec3::new(1.5, 2.5, -2.5)), &mut out);
        assert_eq!(out, vec![on_edge]);
        out.clear();
        hash.query(&Aabb::new(Vec3::new(0.5, 1.5, -3.5), Vec3::new(0.5, 1.5, -3.5)), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn clear_keeps_buckets_but_empties_them() {
        let mut registry = EntityRegistry::new();
        let a = registry.spawn();
        let mut hash = SpatialHash::default();
        hash.insert(a, boxed(Vec3::ZERO, 0.5));
        hash.clear();
        assert_eq!(hash.cell_count(), 0);
        assert_eq!(hash.total_entries(), 0);

        let mut out = Vec::new();
        hash.query(&boxed(Vec3::ZERO, 0.5), &mut out);
        assert!(out.is_empty());
    }
}
