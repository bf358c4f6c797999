//! Tether Physics
//!
//! Extended Position-Based Dynamics (XPBD) for point masses:
//! - Particles integrated with substepping and derived velocities
//! - Compliance-based constraints (distance, bending, volume, shape
//!   matching, joints) with warm-started Lagrange multipliers
//! - Spatial-hash broad-phase and analytic narrow-phase contacts
//! - Sleeping for particles that have come to rest

pub mod broad_phase;
pub mod collider;
pub mod config;
pub mod constraint;
pub mod error;
pub mod material;
pub mod narrow_phase;
pub mod particle;
pub mod scene;
pub mod solver;
pub mod spatial_hash;

pub use broad_phase::{BroadPhase, BruteForce};
pub use collider::{Collider, ColliderShape};
pub use config::{BroadPhaseConfig, SolverConfig};
pub use constraint::{
    BallSocketConstraint, BendingConstraint, Constraint, ConstraintKind, ContactConstraint,
    DistanceConstraint, HingeConstraint, ShapeMatchingConstraint, SliderConstraint,
    VolumeConstraint,
};
pub use error::{ConfigError, SceneError};
pub use material::PhysicsMaterial;
pub use narrow_phase::ContactManifold;
pub use particle::Particle;
pub use scene::Scene;
pub use solver::{SolverStats, TriggerOverlap, XpbdSolver};
pub use spatial_hash::SpatialHash;

pub use tether_core::ecs::Entity;

/// Threshold below which lengths and denominators count as degenerate.
pub const EPSILON: f32 = 1e-6;
