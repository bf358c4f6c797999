//! The closed set of constraint kinds understood by the solver.
//!
//! Every constraint references its particles through entity handles and
//! never owns them. A handle whose entity was destroyed makes the
//! constraint inert rather than invalid.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use tether_core::ecs::Entity;
use tether_core::math::Vec3;

/// Compliance, warm-start multiplier and activity flag shared by every kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Inverse stiffness; 0 is perfectly rigid.
    pub compliance: f32,
    /// Accumulated Lagrange multiplier, kept across frames for warm-starting.
    pub lambda: f32,
    pub active: bool,
    pub kind: ConstraintKind,
}

impl Constraint {
    pub fn new(kind: impl Into<ConstraintKind>) -> Self {
        Self {
            compliance: 0.0,
            lambda: 0.0,
            active: true,
            kind: kind.into(),
        }
    }

    pub fn with_compliance(mut self, compliance: f32) -> Self {
        self.compliance = compliance.max(0.0);
        self
    }

    /// Zero every multiplier this constraint carries.
    pub fn reset_multipliers(&mut self) {
        self.lambda = 0.0;
        if let ConstraintKind::BallSocket(joint) = &mut self.kind {
            joint.axis_lambda = Vec3::ZERO;
        }
    }

    pub fn as_contact(&self) -> Option<&ContactConstraint> {
        match &self.kind {
            ConstraintKind::Contact(contact) => Some(contact),
            _ => None,
        }
    }

    /// Every particle the constraint couples, in declaration order.
    pub fn particles(&self) -> Vec<Entity> {
        let mut out = Vec::new();
        self.for_each_particle(|e| out.push(e));
        out
    }

    /// Visit every referenced particle without allocating.
    pub fn for_each_particle(&self, mut f: impl FnMut(Entity)) {
        match &self.kind {
            ConstraintKind::Distance(c) => [c.a, c.b].into_iter().for_each(f),
            ConstraintKind::Contact(c) => [c.a, c.b].into_iter().for_each(f),
            ConstraintKind::Bending(c) => c.particles.into_iter().for_each(f),
            ConstraintKind::Volume(c) => c.particles.into_iter().for_each(f),
            ConstraintKind::ShapeMatching(c) => {
                for &e in &c.particles {
                    f(e);
                }
            }
            ConstraintKind::BallSocket(c) => [c.a, c.b].into_iter().for_each(f),
            ConstraintKind::Hinge(c) => [c.a, c.b].into_iter().for_each(f),
            ConstraintKind::Slider(c) => [c.a, c.b].into_iter().for_each(f),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ConstraintKind::Distance(_) => "distance",
            ConstraintKind::Contact(_) => "contact",
            ConstraintKind::Bending(_) => "bending",
            ConstraintKind::Volume(_) => "volume",
            ConstraintKind::ShapeMatching(_) => "shape_matching",
            ConstraintKind::BallSocket(_) => "ball_socket",
            ConstraintKind::Hinge(_) => "hinge",
            ConstraintKind::Slider(_) => "slider",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstraintKind {
    Distance(DistanceConstraint),
    Contact(ContactConstraint),
    Bending(BendingConstraint),
    Volume(VolumeConstraint),
    ShapeMatching(ShapeMatchingConstraint),
    BallSocket(BallSocketConstraint),
    Hinge(HingeConstraint),
    Slider(SliderConstraint),
}

macro_rules! impl_into_kind {
    ($($ty:ident => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for ConstraintKind {
                fn from(value: $ty) -> Self {
                    ConstraintKind::$variant(value)
                }
            }
        )+
    };
}

impl_into_kind! {
    DistanceConstraint => Distance,
    ContactConstraint => Contact,
    BendingConstraint => Bending,
    VolumeConstraint => Volume,
    ShapeMatchingConstraint => ShapeMatching,
    BallSocketConstraint => BallSocket,
    HingeConstraint => Hinge,
    SliderConstraint => Slider,
}

/// `C = |a - b| - rest_length`. Ropes only resist stretching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceConstraint {
    pub a: Entity,
    pub b: Entity,
    pub rest_length: f32,
    pub is_rope: bool,
}

impl DistanceConstraint {
    pub fn new(a: Entity, b: Entity, rest_length: f32) -> Self {
        Self {
            a,
            b,
            rest_length,
            is_rope: false,
        }
    }

    pub fn rope(a: Entity, b: Entity, rest_length: f32) -> Self {
        Self {
            is_rope: true,
            ..Self::new(a, b, rest_length)
        }
    }
}

/// Non-penetration between two colliding particles.
///
/// `normal` points from `a` towards `b`. `separation` is the distance along
/// the normal at which the shapes just touch, so
/// `C = dot(b - a, normal) - separation` equals `-penetration` when the
/// contact is generated. A negative `penetration` marks a speculative
/// contact that does nothing until the gap closes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactConstraint {
    pub a: Entity,
    pub b: Entity,
    pub normal: Vec3,
    pub penetration: f32,
    pub separation: f32,
    pub contact_point: Vec3,
    pub friction: f32,
    pub restitution: f32,
}

/// Dihedral angle across the edge shared by triangles (p0, p1, p2) and
/// (p0, p1, p3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BendingConstraint {
    pub particles: [Entity; 4],
    /// Radians, in the convention of [`dihedral_angle`]; a flat pair is `PI`.
    pub rest_angle: f32,
}

impl BendingConstraint {
    pub fn new(particles: [Entity; 4], rest_angle: f32) -> Self {
        Self {
            particles,
            rest_angle,
        }
    }

    /// Rest angle measured from the given positions; degenerate triangles
    /// fall back to flat.
    pub fn from_positions(particles: [Entity; 4], positions: [Vec3; 4]) -> Self {
        let rest_angle = dihedral_angle(positions).map_or(PI, |(angle, _, _)| angle);
        Self::new(particles, rest_angle)
    }
}

/// Angle between the normals of (p0, p1, p2) and (p0, p1, p3), with the unit
/// normals. `None` if either triangle is degenerate.
pub fn dihedral_angle(positions: [Vec3; 4]) -> Option<(f32, Vec3, Vec3)> {
    let [p0, p1, p2, p3] = positions;
    let edge = p1 - p0;
    let n1 = edge.cross(p2 - p0);
    let n2 = edge.cross(p3 - p0);
    let len1 = n1.length();
    let len2 = n2.length();
    if len1 < crate::EPSILON || len2 < crate::EPSILON {
        return None;
    }
    let n1 = n1 / len1;
    let n2 = n2 / len2;
    let angle = n1.dot(n2).clamp(-1.0, 1.0).acos();
    Some((angle, n1, n2))
}

/// Signed volume of the tetrahedron (p0, p1, p2, p3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeConstraint {
    pub particles: [Entity; 4],
    pub rest_volume: f32,
}

impl VolumeConstraint {
    pub fn new(particles: [Entity; 4], rest_volume: f32) -> Self {
        Self {
            particles,
            rest_volume,
        }
    }

    pub fn from_positions(particles: [Entity; 4], positions: [Vec3; 4]) -> Self {
        Self::new(particles, tetrahedron_volume(positions))
    }
}

pub fn tetrahedron_volume(positions: [Vec3; 4]) -> f32 {
    let [p0, p1, p2, p3] = positions;
    (p1 - p0).dot((p2 - p0).cross(p3 - p0)) / 6.0
}

/// Pulls a cluster of particles towards its rest layout around the current
/// centre of mass. Rotation of the cluster is not matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeMatchingConstraint {
    pub particles: Vec<Entity>,
    /// Rest offsets relative to the rest centre of mass, one per particle.
    pub rest_positions: Vec<Vec3>,
    pub rest_center_of_mass: Vec3,
}

impl ShapeMatchingConstraint {
    /// Capture the rest layout of `particles` from `(position, mass)` pairs.
    /// Zero total mass falls back to the unweighted centroid.
    pub fn from_positions(particles: Vec<Entity>, bodies: &[(Vec3, f32)]) -> Self {
        let total_mass: f32 = bodies.iter().map(|(_, m)| *m).sum();
        let rest_center_of_mass = if total_mass > crate::EPSILON {
            bodies.iter().map(|(p, m)| *p * *m).sum::<Vec3>() / total_mass
        } else if bodies.is_empty() {
            Vec3::ZERO
        } else {
            bodies.iter().map(|(p, _)| *p).sum::<Vec3>() / bodies.len() as f32
        };
        let rest_positions = bodies
            .iter()
            .map(|(p, _)| *p - rest_center_of_mass)
            .collect();
        Self {
            particles,
            rest_positions,
            rest_center_of_mass,
        }
    }
}

/// Keeps two anchor points coincident. Anchors are offsets from the particle
/// positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSocketConstraint {
    pub a: Entity,
    pub b: Entity,
    pub local_anchor_a: Vec3,
    pub local_anchor_b: Vec3,
    /// Per-axis multipliers; the joint is three scalar constraints.
    pub axis_lambda: Vec3,
}

impl BallSocketConstraint {
    pub fn new(a: Entity, b: Entity) -> Self {
        Self {
            a,
            b,
            local_anchor_a: Vec3::ZERO,
            local_anchor_b: Vec3::ZERO,
            axis_lambda: Vec3::ZERO,
        }
    }

    pub fn with_anchors(mut self, local_anchor_a: Vec3, local_anchor_b: Vec3) -> Self {
        self.local_anchor_a = local_anchor_a;
        self.local_anchor_b = local_anchor_b;
        self
    }
}

/// Angular limits of a hinge, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleLimits {
    pub enabled: bool,
    pub min: f32,
    pub max: f32,
}

impl Default for AngleLimits {
    fn default() -> Self {
        Self {
            enabled: false,
            min: -PI,
            max: PI,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HingeMotor {
    pub enabled: bool,
    pub target_velocity: f32,
    pub max_force: f32,
}

impl Default for HingeMotor {
    fn default() -> Self {
        Self {
            enabled: false,
            target_velocity: 0.0,
            max_force: 100.0,
        }
    }
}

/// Hinge joint. Only the anchor coincidence is solved; `axis`, `limits` and
/// `motor` are carried for hosts but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HingeConstraint {
    pub a: Entity,
    pub b: Entity,
    pub local_anchor_a: Vec3,
    pub local_anchor_b: Vec3,
    pub axis: Vec3,
    pub limits: AngleLimits,
    pub motor: HingeMotor,
}

impl HingeConstraint {
    pub fn new(a: Entity, b: Entity, axis: Vec3) -> Self {
        Self {
            a,
            b,
            local_anchor_a: Vec3::ZERO,
            local_anchor_b: Vec3::ZERO,
            axis,
            limits: AngleLimits::default(),
            motor: HingeMotor::default(),
        }
    }
}

/// Travel limits along a slider axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlideLimits {
    pub enabled: bool,
    pub min: f32,
    pub max: f32,
}

impl Default for SlideLimits {
    fn default() -> Self {
        Self {
            enabled: false,
            min: -10.0,
            max: 10.0,
        }
    }
}

/// Prismatic joint: removes relative offset perpendicular to `axis`.
/// `limits` are carried but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliderConstraint {
    pub a: Entity,
    pub b: Entity,
    pub axis: Vec3,
    pub limits: SlideLimits,
}

impl SliderConstraint {
    pub fn new(a: Entity, b: Entity, axis: Vec3) -> Self {
        Self {
            a,
            b,
            axis,
            limits: SlideLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::ecs::EntityRegistry;

    fn handles<const N: usize>() -> [Entity; N] {
        let mut registry = EntityRegistry::new();
        std::array::from_fn(|_| registry.spawn())
    }

    #[test]
    fn flat_pair_has_rest_angle_pi() {
        let positions = [
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(0.5, 0.0, 1.0),
            Vec3::new(0.5, 0.0, -1.0),
        ];
        let bending = BendingConstraint::from_positions(handles::<4>(), positions);
        assert!((bending.rest_angle - PI).abs() < 1e-4);
    }

    #[test]
    fn unit_tetrahedron_volume() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        assert!((tetrahedron_volume(positions) - 1.0 / 6.0).abs() < 1e-6);
        let volume = VolumeConstraint::from_positions(handles::<4>(), positions);
        assert!((volume.rest_volume - 1.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn shape_matching_offsets_are_relative_to_mass_center() {
        let [a, b] = handles::<2>();
        let shape = ShapeMatchingConstraint::from_positions(
            vec![a, b],
            &[(Vec3::ZERO, 3.0), (Vec3::new(4.0, 0.0, 0.0), 1.0)],
        );
        assert_eq!(shape.rest_center_of_mass, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(shape.rest_positions, vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)]);
    }

    #[test]
    fn reset_clears_joint_axis_multipliers() {
        let [a, b] = handles::<2>();
        let mut joint = Constraint::new(BallSocketConstraint::new(a, b));
        joint.lambda = 2.0;
        if let ConstraintKind::BallSocket(j) = &mut joint.kind {
            j.axis_lambda = Vec3::ONE;
        }
        joint.reset_multipliers();
        assert_eq!(joint.lambda, 0.0);
        assert_eq!(joint.kind, ConstraintKind::from(BallSocketConstraint::new(a, b)));
        assert_eq!(joint.particles(), vec![a, b]);
        assert_eq!(joint.kind_name(), "ball_socket");
    }
}
