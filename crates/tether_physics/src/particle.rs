//! Point masses advanced by the solver.

use serde::{Deserialize, Serialize};
use tether_core::math::Vec3;

/// Simulation state of one point mass.
///
/// `inverse_mass == 0` marks a static pin: integration and constraint
/// solving never move it, although the host may reposition it directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub position: Vec3,
    pub previous_position: Vec3,
    pub velocity: Vec3,
    pub inverse_mass: f32,
    /// Cleared every substep after integration.
    pub external_force: Vec3,
    pub is_sleeping: bool,
    pub sleep_timer: f32,
}

impl Particle {
    pub fn new(position: Vec3, mass: f32) -> Self {
        let mut particle = Self {
            position,
            previous_position: position,
            velocity: Vec3::ZERO,
            inverse_mass: 0.0,
            external_force: Vec3::ZERO,
            is_sleeping: false,
            sleep_timer: 0.0,
        };
        particle.set_mass(mass);
        particle
    }

    /// Infinite-mass particle pinned at `position`.
    pub fn fixed(position: Vec3) -> Self {
        Self::new(position, 0.0)
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn mass(&self) -> f32 {
        if self.inverse_mass > 0.0 {
            1.0 / self.inverse_mass
        } else {
            0.0
        }
    }

    /// Non-positive or non-finite masses make the particle static.
    pub fn set_mass(&mut self, mass: f32) {
        self.inverse_mass = if mass > 0.0 && mass.is_finite() {
            1.0 / mass
        } else {
            0.0
        };
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.inverse_mass == 0.0
    }

    /// Inverse mass as seen by the constraint solver: sleeping particles act
    /// as pins until something wakes them.
    #[inline]
    pub fn effective_inverse_mass(&self) -> f32 {
        if self.is_sleeping {
            0.0
        } else {
            self.inverse_mass
        }
    }

    /// Accumulate a force for the next substep. Pushing a particle wakes it.
    pub fn add_force(&mut self, force: Vec3) {
        self.external_force += force;
        self.wake();
    }

    pub fn wake(&mut self) {
        self.is_sleeping = false;
        self.sleep_timer = 0.0;
    }

    pub fn put_to_sleep(&mut self) {
        self.is_sleeping = true;
        self.velocity = Vec3::ZERO;
    }
}

impl Default for Particle {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 1.0)
    }
}
