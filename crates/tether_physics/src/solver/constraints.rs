//! Position-level projection for each constraint kind.
//!
//! All kinds share one update rule. For a scalar constraint `C` with
//! gradients `grad_i`:
//!
//! ```text
//! alpha        = compliance / dt²
//! delta_lambda = (-C - alpha * lambda) / (sum_i w_i |grad_i|² + alpha)
//! lambda      += delta_lambda
//! x_i         += w_i * grad_i * delta_lambda
//! ```
//!
//! `w_i` is the particle's effective inverse mass, so static and sleeping
//! particles never move. Missing particles make the whole constraint a
//! no-op for this pass.

use crate::constraint::{
    dihedral_angle, BallSocketConstraint, BendingConstraint, Constraint, ConstraintKind,
    ContactConstraint, DistanceConstraint, HingeConstraint, ShapeMatchingConstraint,
    SliderConstraint, VolumeConstraint,
};
use crate::particle::Particle;
use crate::EPSILON;
use tether_core::ecs::{ComponentStorage, Entity};
use tether_core::math::Vec3;

/// Project one constraint. `dt` is the substep length.
pub(crate) fn solve(constraint: &mut Constraint, particles: &mut ComponentStorage<Particle>, dt: f32) {
    let Constraint {
        compliance,
        lambda,
        kind,
        ..
    } = constraint;
    let alpha = *compliance / (dt * dt);
    match kind {
        ConstraintKind::Distance(c) => solve_distance(c, lambda, alpha, particles),
        ConstraintKind::Contact(c) => solve_contact(c, lambda, alpha, particles),
        ConstraintKind::Bending(c) => solve_bending(c, lambda, alpha, particles),
        ConstraintKind::Volume(c) => solve_volume(c, lambda, alpha, particles),
        ConstraintKind::ShapeMatching(c) => solve_shape_matching(c, alpha, particles),
        ConstraintKind::BallSocket(c) => solve_ball_socket(c, lambda, alpha, particles),
        ConstraintKind::Hinge(c) => solve_hinge(c, lambda, alpha, particles),
        ConstraintKind::Slider(c) => solve_slider(c, lambda, alpha, particles),
    }
}

#[inline]
fn body(particles: &ComponentStorage<Particle>, entity: Entity) -> Option<(Vec3, f32)> {
    particles
        .get(entity)
        .map(|p| (p.position, p.effective_inverse_mass()))
}

fn bodies<const N: usize>(
    particles: &ComponentStorage<Particle>,
    entities: &[Entity; N],
) -> Option<[(Vec3, f32); N]> {
    let mut out = [(Vec3::ZERO, 0.0); N];
    for (slot, &entity) in out.iter_mut().zip(entities) {
        *slot = body(particles, entity)?;
    }
    Some(out)
}

#[inline]
fn nudge(particles: &mut ComponentStorage<Particle>, entity: Entity, delta: Vec3) {
    if let Some(p) = particles.get_mut(entity) {
        p.position += delta;
    }
}

/// `None` when nothing can move or the system is singular.
#[inline]
fn delta_lambda(c: f32, lambda: f32, alpha: f32, w: f32) -> Option<f32> {
    if w < EPSILON || w + alpha < EPSILON {
        return None;
    }
    Some((-c - alpha * lambda) / (w + alpha))
}

fn solve_distance(
    c: &DistanceConstraint,
    lambda: &mut f32,
    alpha: f32,
    particles: &mut ComponentStorage<Particle>,
) {
    let Some([(pa, wa), (pb, wb)]) = bodies(particles, &[c.a, c.b]) else {
        return;
    };
    let delta = pa - pb;
    let length = delta.length();
    if length < EPSILON {
        return;
    }
    let err = length - c.rest_length;
    if c.is_rope && err < 0.0 {
        return;
    }
    let grad = delta / length;
    let Some(dl) = delta_lambda(err, *lambda, alpha, wa + wb) else {
        return;
    };
    *lambda += dl;
    nudge(particles, c.a, grad * (wa * dl));
    nudge(particles, c.b, -grad * (wb * dl));
}

/// `C = dot(b - a, n) - separation`, enforced only while negative, with
/// the multiplier kept non-negative so contacts push but never pull.
fn solve_contact(
    c: &ContactConstraint,
    lambda: &mut f32,
    alpha: f32,
    particles: &mut ComponentStorage<Particle>,
) {
    let Some([(pa, wa), (pb, wb)]) = bodies(particles, &[c.a, c.b]) else {
        return;
    };
    let err = (pb - pa).dot(c.normal) - c.separation;
    if err >= 0.0 {
        return;
    }
    let Some(dl) = delta_lambda(err, *lambda, alpha, wa + wb) else {
        return;
    };
    let clamped = (*lambda + dl).max(0.0);
    let dl = clamped - *lambda;
    *lambda = clamped;
    nudge(particles, c.a, -c.normal * (wa * dl));
    nudge(particles, c.b, c.normal * (wb * dl));
}

/// The correction is split evenly along `n1 x n2` instead of using the exact
/// dihedral gradients.
fn solve_bending(
    c: &BendingConstraint,
    lambda: &mut f32,
    alpha: f32,
    particles: &mut ComponentStorage<Particle>,
) {
    let Some(state) = bodies(particles, &c.particles) else {
        return;
    };
    let Some((angle, n1, n2)) = dihedral_angle(state.map(|(p, _)| p)) else {
        return;
    };
    let w: f32 = state.iter().map(|(_, w)| w).sum();
    let Some(dl) = delta_lambda(angle - c.rest_angle, *lambda, alpha, w) else {
        return;
    };
    *lambda += dl;
    let correction = n1.cross(n2) * (dl * 0.25);
    for (i, (&entity, (_, w))) in c.particles.iter().zip(state).enumerate() {
        let sign = if i < 2 { 1.0 } else { -1.0 };
        nudge(particles, entity, correction * (w * sign));
    }
}

fn solve_volume(
    c: &VolumeConstraint,
    lambda: &mut f32,
    alpha: f32,
    particles: &mut ComponentStorage<Particle>,
) {
    let Some(state) = bodies(particles, &c.particles) else {
        return;
    };
    let [p0, p1, p2, p3] = state.map(|(p, _)| p);
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let e3 = p3 - p0;
    let volume = e1.dot(e2.cross(e3)) / 6.0;

    let g1 = e2.cross(e3) / 6.0;
    let g2 = e3.cross(e1) / 6.0;
    let g3 = e1.cross(e2) / 6.0;
    let grads = [-(g1 + g2 + g3), g1, g2, g3];

    let w: f32 = state
        .iter()
        .zip(&grads)
        .map(|((_, w), g)| w * g.length_squared())
        .sum();
    let Some(dl) = delta_lambda(volume - c.rest_volume, *lambda, alpha, w) else {
        return;
    };
    *lambda += dl;
    for ((&entity, (_, w)), grad) in c.particles.iter().zip(state).zip(grads) {
        nudge(particles, entity, grad * (w * dl));
    }
}

/// Each particle is pulled independently towards `com + rest_offset`.
fn solve_shape_matching(
    c: &ShapeMatchingConstraint,
    alpha: f32,
    particles: &mut ComponentStorage<Particle>,
) {
    let mut center = Vec3::ZERO;
    let mut total_mass = 0.0;
    for p in c.particles.iter().filter_map(|&e| particles.get(e)) {
        let mass = p.mass();
        center += p.position * mass;
        total_mass += mass;
    }
    if total_mass < EPSILON {
        return;
    }
    center /= total_mass;

    for (&entity, &rest_offset) in c.particles.iter().zip(&c.rest_positions) {
        let Some((position, w)) = body(particles, entity) else {
            continue;
        };
        if w < EPSILON {
            continue;
        }
        let delta = center + rest_offset - position;
        let distance = delta.length();
        if distance < EPSILON {
            continue;
        }
        let dl = distance / (w + alpha);
        nudge(particles, entity, delta / distance * (dl * w));
    }
}

/// Three independent scalar constraints, one per world axis.
fn solve_ball_socket(
    c: &mut BallSocketConstraint,
    lambda: &mut f32,
    alpha: f32,
    particles: &mut ComponentStorage<Particle>,
) {
    let Some([(pa, wa), (pb, wb)]) = bodies(particles, &[c.a, c.b]) else {
        return;
    };
    let err = (pa + c.local_anchor_a) - (pb + c.local_anchor_b);
    for axis in 0..3 {
        let Some(dl) = delta_lambda(err[axis], c.axis_lambda[axis], alpha, wa + wb) else {
            return;
        };
        c.axis_lambda[axis] += dl;
        let mut correction = Vec3::ZERO;
        correction[axis] = dl;
        nudge(particles, c.a, correction * wa);
        nudge(particles, c.b, -correction * wb);
    }
    *lambda = c.axis_lambda.length();
}

/// Scalar constraint on the length of `offset`, driving it to zero.
fn solve_offset(
    a: Entity,
    b: Entity,
    (wa, wb): (f32, f32),
    offset: Vec3,
    lambda: &mut f32,
    alpha: f32,
    particles: &mut ComponentStorage<Particle>,
) {
    let magnitude = offset.length();
    if magnitude < EPSILON {
        return;
    }
    let grad = offset / magnitude;
    let Some(dl) = delta_lambda(magnitude, *lambda, alpha, wa + wb) else {
        return;
    };
    *lambda += dl;
    nudge(particles, a, grad * (wa * dl));
    nudge(particles, b, -grad * (wb * dl));
}

/// Only the anchor points are joined; the hinge axis is not enforced.
fn solve_hinge(
    c: &HingeConstraint,
    lambda: &mut f32,
    alpha: f32,
    particles: &mut ComponentStorage<Particle>,
) {
    let Some([(pa, wa), (pb, wb)]) = bodies(particles, &[c.a, c.b]) else {
        return;
    };
    let offset = (pa + c.local_anchor_a) - (pb + c.local_anchor_b);
    solve_offset(c.a, c.b, (wa, wb), offset, lambda, alpha, particles);
}

/// Removes the part of `a - b` perpendicular to the slide axis.
fn solve_slider(
    c: &SliderConstraint,
    lambda: &mut f32,
    alpha: f32,
    particles: &mut ComponentStorage<Particle>,
) {
    let Some([(pa, wa), (pb, wb)]) = bodies(particles, &[c.a, c.b]) else {
        return;
    };
    let axis = c.axis.normalize_or_zero();
    if axis == Vec3::ZERO {
        return;
    }
    let delta = pa - pb;
    let perpendicular = delta - axis * delta.dot(axis);
    solve_offset(c.a, c.b, (wa, wb), perpendicular, lambda, alpha, particles);
}
