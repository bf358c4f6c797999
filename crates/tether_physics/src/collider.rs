//! Collision shapes attached to particles.
//!
//! Shapes are centred on their particle's position plus `offset`. Particles
//! carry no orientation, so boxes are axis-aligned and capsules stand along
//! the Y axis.

use crate::material::PhysicsMaterial;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use tether_core::math::{Aabb, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    Box { half_extents: Vec3, offset: Vec3 },
    Sphere { radius: f32, offset: Vec3 },
    /// `height` is the length of the inner segment, excluding the caps.
    Capsule { radius: f32, height: f32, offset: Vec3 },
}

impl ColliderShape {
    pub fn offset(&self) -> Vec3 {
        match *self {
            ColliderShape::Box { offset, .. }
            | ColliderShape::Sphere { offset, .. }
            | ColliderShape::Capsule { offset, .. } => offset,
        }
    }

    /// Half extents of the shape's bounding box.
    pub fn bounding_half_extents(&self) -> Vec3 {
        match *self {
            ColliderShape::Box { half_extents, .. } => half_extents.abs(),
            ColliderShape::Sphere { radius, .. } => Vec3::splat(radius.abs()),
            ColliderShape::Capsule { radius, height, .. } => {
                let r = radius.abs();
                Vec3::new(r, height.abs() * 0.5 + r, r)
            }
        }
    }

    pub fn volume(&self) -> f32 {
        match *self {
            ColliderShape::Box { half_extents, .. } => {
                let size = half_extents.abs() * 2.0;
                size.x * size.y * size.z
            }
            ColliderShape::Sphere { radius, .. } => 4.0 / 3.0 * PI * radius.abs().powi(3),
            ColliderShape::Capsule { radius, height, .. } => {
                let r = radius.abs();
                PI * r * r * height.abs() + 4.0 / 3.0 * PI * r.powi(3)
            }
        }
    }
}

/// Read-only collision input for the narrow-phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub shape: ColliderShape,
    pub friction: f32,
    /// Restitution.
    pub bounciness: f32,
    /// Contact softness; summed with the partner's like material compliance.
    pub compliance: f32,
    /// Reports overlaps without producing a physical response.
    pub is_trigger: bool,
}

impl Collider {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            friction: 0.5,
            bounciness: 0.3,
            compliance: 0.0,
            is_trigger: false,
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::new(ColliderShape::Sphere {
            radius,
            offset: Vec3::ZERO,
        })
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(ColliderShape::Box {
            half_extents,
            offset: Vec3::ZERO,
        })
    }

    pub fn capsule(radius: f32, height: f32) -> Self {
        Self::new(ColliderShape::Capsule {
            radius,
            height,
            offset: Vec3::ZERO,
        })
    }

    /// Take surface properties from a material.
    pub fn with_material(mut self, material: &PhysicsMaterial) -> Self {
        self.friction = material.dynamic_friction;
        self.bounciness = material.restitution;
        self.compliance = material.compliance;
        self
    }

    pub fn as_trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }

    /// World-space bounds for a particle at `position`.
    pub fn aabb(&self, position: Vec3) -> Aabb {
        Aabb::from_center_half_extents(
            position + self.shape.offset(),
            self.shape.bounding_half_extents(),
        )
    }

    pub fn volume(&self) -> f32 {
        self.shape.volume()
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self::cuboid(Vec3::splat(0.5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_includes_offset_and_caps() {
        let capsule = Collider::new(ColliderShape::Capsule {
            radius: 0.5,
            height: 2.0,
            offset: Vec3::new(0.0, 1.0, 0.0),
        });
        let aabb = capsule.aabb(Vec3::ZERO);
        assert_eq!(aabb.min, Vec3::new(-0.5, -0.5, -0.5));
        assert_eq!(aabb.max, Vec3::new(0.5, 2.5, 0.5));
    }

    #[test]
    fn volumes() {
        assert_eq!(Collider::cuboid(Vec3::splat(0.5)).volume(), 1.0);
        let sphere = Collider::sphere(1.0).volume();
        assert!((sphere - 4.0 / 3.0 * PI).abs() < 1e-5);
    }

    #[test]
    fn material_sets_surface_properties() {
        let collider = Collider::sphere(0.5).with_material(&PhysicsMaterial::rubber());
        assert_eq!(collider.friction, 0.8);
        assert_eq!(collider.bounciness, 0.9);
        assert_eq!(collider.compliance, 0.001);
    }
}
