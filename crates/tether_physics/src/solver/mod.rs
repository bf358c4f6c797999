//! Extended Position-Based Dynamics solver.
//!
//! One call to [`XpbdSolver::step`] advances a [`Scene`] by a frame:
//!
//! ```text
//! for each substep:
//!     predict -> detect contacts -> Gauss-Seidel sweeps
//!             -> derive velocities -> friction
//! sleep update -> transform writeback
//! ```
//!
//! Contacts are transient: rebuilt from scratch each substep and never
//! stored in the scene. Pairs closer than `contact_margin` get a speculative
//! contact so resting stacks keep the same contact set from one substep to
//! the next.

mod constraints;

use crate::broad_phase::BroadPhase;
use crate::collider::Collider;
use crate::config::SolverConfig;
use crate::constraint::{Constraint, ContactConstraint};
use crate::material::PhysicsMaterial;
use crate::narrow_phase;
use crate::scene::Scene;
use crate::EPSILON;
use tether_core::ecs::Entity;
use tether_core::math::{Aabb, Vec3};
use tether_metrics::Stopwatch;
use tracing::{debug, info, trace, warn};

/// Per-step counters, replaced at the end of every [`XpbdSolver::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolverStats {
    /// Awake particles with finite mass.
    pub active_particles: usize,
    pub sleeping_particles: usize,
    /// Active persistent constraints plus contacts.
    pub active_constraints: usize,
    pub contact_constraints: usize,
    /// Summed over all substeps.
    pub solve_time_ms: f32,
    pub collision_time_ms: f32,
}

/// A trigger collider overlapping another collider during the last substep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerOverlap {
    pub trigger: Entity,
    pub other: Entity,
}

/// Snapshot of a collider taken at the start of contact generation.
#[derive(Debug, Clone, Copy)]
struct ColliderProxy {
    entity: Entity,
    position: Vec3,
    bounds: Aabb,
    collider: Collider,
    /// Sleeping or static: cannot move this substep.
    inert: bool,
}

pub struct XpbdSolver {
    config: SolverConfig,
    broad_phase: Box<dyn BroadPhase>,
    contacts: Vec<Constraint>,
    trigger_overlaps: Vec<TriggerOverlap>,
    proxies: Vec<ColliderProxy>,
    candidates: Vec<Entity>,
    stats: SolverStats,
}

impl XpbdSolver {
    pub fn new(config: SolverConfig) -> Self {
        let broad_phase = config.broad_phase.build();
        info!(
            sub_steps = config.effective_sub_steps(),
            iterations = config.effective_iterations(),
            broad_phase = broad_phase.name(),
            "XPBD solver initialized"
        );
        Self {
            config,
            broad_phase,
            contacts: Vec::new(),
            trigger_overlaps: Vec::new(),
            proxies: Vec::new(),
            candidates: Vec::new(),
            stats: SolverStats::default(),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    /// Contacts generated during the last substep of the last step.
    pub fn contacts(&self) -> &[Constraint] {
        &self.contacts
    }

    pub fn trigger_overlaps(&self) -> &[TriggerOverlap] {
        &self.trigger_overlaps
    }

    /// Advance the scene by `dt` seconds.
    pub fn step(&mut self, scene: &mut Scene, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            warn!(dt, "skipping physics step with invalid timestep");
            return;
        }
        let sub_steps = self.config.effective_sub_steps();
        let iterations = self.config.effective_iterations();
        let dt_sub = dt / sub_steps as f32;

        let mut solve_time_ms = 0.0;
        let mut collision_time_ms = 0.0;
        for _ in 0..sub_steps {
            if !self.config.enable_warm_starting {
                for constraint in &mut scene.constraints {
                    constraint.reset_multipliers();
                }
            }
            self.predict_positions(scene, dt_sub);

            let watch = Stopwatch::start();
            self.generate_contacts(scene);
            collision_time_ms += watch.elapsed_ms();

            let watch = Stopwatch::start();
            self.solve_constraints(scene, iterations, dt_sub);
            solve_time_ms += watch.elapsed_ms();

            self.update_velocities(scene, dt_sub);
            self.apply_friction(scene, dt_sub);
            if self.config.enable_sleeping {
                self.wake_partners(scene);
            }
        }

        self.update_sleeping(scene, dt);
        write_back_transforms(scene);

        self.stats = self.collect_stats(scene, solve_time_ms, collision_time_ms);
        debug!(
            dt,
            active = self.stats.active_particles,
            sleeping = self.stats.sleeping_particles,
            constraints = self.stats.active_constraints,
            contacts = self.stats.contact_constraints,
            "physics step"
        );
    }

    /// Explicit Euler prediction for awake, dynamic particles.
    pub fn predict_positions(&self, scene: &mut Scene, dt: f32) {
        let gravity = self.config.gravity;
        for particle in scene.particles.values_mut() {
            if particle.is_sleeping || particle.is_static() {
                continue;
            }
            particle.previous_position = particle.position;
            particle.external_force += gravity * particle.mass();
            particle.velocity += particle.external_force * (particle.inverse_mass * dt);
            particle.position += particle.velocity * dt;
            particle.external_force = Vec3::ZERO;
        }
    }

    /// Derive velocities from the positional change of this substep.
    pub fn update_velocities(&self, scene: &mut Scene, dt: f32) {
        for particle in scene.particles.values_mut() {
            if particle.is_sleeping || particle.is_static() {
                continue;
            }
            particle.velocity = (particle.position - particle.previous_position) / dt;
        }
    }

    /// Put particles that stayed slow for `sleep_time` to sleep; wake any
    /// that moved faster than `sleep_threshold`. With sleeping disabled
    /// every particle is woken.
    pub fn update_sleeping(&self, scene: &mut Scene, dt: f32) {
        if !self.config.enable_sleeping {
            for particle in scene.particles.values_mut() {
                if particle.is_sleeping {
                    particle.wake();
                }
            }
            return;
        }
        let threshold = self.config.sleep_threshold;
        let sleep_time = self.config.sleep_time;
        for particle in scene.particles.values_mut() {
            if particle.is_static() {
                continue;
            }
            if particle.velocity.length() < threshold {
                particle.sleep_timer += dt;
                if particle.sleep_timer > sleep_time {
                    particle.put_to_sleep();
                }
            } else {
                particle.wake();
            }
        }
    }

    fn generate_contacts(&mut self, scene: &Scene) {
        let Self {
            config,
            broad_phase,
            contacts,
            trigger_overlaps,
            proxies,
            candidates,
            ..
        } = self;
        contacts.clear();
        trigger_overlaps.clear();
        proxies.clear();
        broad_phase.clear();
        let margin = config.contact_margin.max(0.0);

        for (entity, collider) in scene.colliders.iter() {
            let Some(particle) = scene.particles.get(entity) else {
                continue;
            };
            // Half the margin on each side: bounds meet once the gap is
            // under the full margin.
            let bounds = collider.aabb(particle.position).expanded(margin * 0.5);
            broad_phase.insert(entity, bounds);
            proxies.push(ColliderProxy {
                entity,
                position: particle.position,
                bounds,
                collider: *collider,
                inert: particle.is_sleeping || particle.is_static(),
            });
        }
        proxies.sort_unstable_by_key(|proxy| proxy.entity);

        for index in 0..proxies.len() {
            let a = proxies[index];
            candidates.clear();
            broad_phase.query(&a.bounds, candidates);

            for &other in candidates.iter() {
                if other <= a.entity {
                    continue;
                }
                let Ok(slot) = proxies.binary_search_by_key(&other, |proxy| proxy.entity) else {
                    continue;
                };
                let b = proxies[slot];
                if a.inert && b.inert {
                    continue;
                }
                let Some(manifold) = narrow_phase::collide_within(
                    a.position,
                    &a.collider.shape,
                    b.position,
                    &b.collider.shape,
                    margin,
                ) else {
                    continue;
                };

                if a.collider.is_trigger || b.collider.is_trigger {
                    if manifold.penetration <= 0.0 {
                        continue;
                    }
                    let (trigger, other) = if a.collider.is_trigger {
                        (a.entity, b.entity)
                    } else {
                        (b.entity, a.entity)
                    };
                    trigger_overlaps.push(TriggerOverlap { trigger, other });
                    continue;
                }

                trace!(
                    a = ?a.entity,
                    b = ?b.entity,
                    penetration = manifold.penetration,
                    "contact"
                );
                let normal = manifold.normal;
                let contact = ContactConstraint {
                    a: a.entity,
                    b: b.entity,
                    normal,
                    penetration: manifold.penetration,
                    separation: (b.position - a.position).dot(normal) + manifold.penetration,
                    contact_point: manifold.point,
                    friction: PhysicsMaterial::combine_dynamic_friction(
                        a.collider.friction,
                        b.collider.friction,
                    ),
                    restitution: PhysicsMaterial::combine_restitution(
                        a.collider.bounciness,
                        b.collider.bounciness,
                    ),
                };
                contacts.push(Constraint::new(contact).with_compliance(
                    PhysicsMaterial::combine_compliance(a.collider.compliance, b.collider.compliance),
                ));
            }
        }
    }

    fn solve_constraints(&mut self, scene: &mut Scene, iterations: u32, dt: f32) {
        let Scene {
            particles,
            constraints: persistent,
            ..
        } = scene;
        for _ in 0..iterations {
            for constraint in persistent.iter_mut().filter(|c| c.active) {
                constraints::solve(constraint, particles, dt);
            }
            for contact in &mut self.contacts {
                constraints::solve(contact, particles, dt);
            }
        }
    }

    /// Coulomb friction on the velocities derived this substep.
    fn apply_friction(&self, scene: &mut Scene, dt: f32) {
        for contact in &self.contacts {
            let Some(c) = contact.as_contact() else {
                continue;
            };
            let (Some(pa), Some(pb)) = (scene.particles.get(c.a), scene.particles.get(c.b)) else {
                continue;
            };
            let wa = pa.effective_inverse_mass();
            let wb = pb.effective_inverse_mass();
            let w = wa + wb;
            if w < EPSILON {
                continue;
            }

            let relative = pa.velocity - pb.velocity;
            let tangential = relative - c.normal * relative.dot(c.normal);
            let speed = tangential.length();
            if speed < EPSILON {
                continue;
            }
            let normal_force = contact.lambda / (dt * dt);
            let impulse = speed.min(c.friction * normal_force * dt);
            let delta = tangential / speed * impulse;

            if let Some(p) = scene.particles.get_mut(c.a) {
                p.velocity -= delta * (wa / w);
            }
            if let Some(p) = scene.particles.get_mut(c.b) {
                p.velocity += delta * (wb / w);
            }
        }
    }

    /// Wake sleeping particles that share a contact or an active constraint
    /// with an awake particle moving faster than `sleep_threshold`. Runs on
    /// the velocities derived this substep, so a body resting on a sleeper
    /// leaves it asleep.
    fn wake_partners(&self, scene: &mut Scene) {
        let threshold = self.config.sleep_threshold;
        let Scene {
            particles,
            constraints,
            ..
        } = scene;
        let persistent = constraints.iter().filter(|c| c.active);
        for constraint in persistent.chain(&self.contacts) {
            let mut moving = false;
            let mut sleeping = false;
            constraint.for_each_particle(|e| {
                if let Some(p) = particles.get(e) {
                    sleeping |= p.is_sleeping;
                    moving |= !p.is_sleeping && !p.is_static() && p.velocity.length() > threshold;
                }
            });
            if !(moving && sleeping) {
                continue;
            }
            constraint.for_each_particle(|e| {
                if let Some(p) = particles.get_mut(e) {
                    if p.is_sleeping {
                        p.wake();
                        p.previous_position = p.position;
                        trace!(entity = ?e, kind = constraint.kind_name(), "woken by partner");
                    }
                }
            });
        }
    }

    fn collect_stats(&self, scene: &Scene, solve_time_ms: f32, collision_time_ms: f32) -> SolverStats {
        let mut stats = SolverStats {
            solve_time_ms,
            collision_time_ms,
            contact_constraints: self.contacts.len(),
            ..SolverStats::default()
        };
        for (_, particle) in scene.particles.iter() {
            if particle.is_sleeping {
                stats.sleeping_particles += 1;
            } else if !particle.is_static() {
                stats.active_particles += 1;
            }
        }
        stats.active_constraints =
            scene.constraints.iter().filter(|c| c.active).count() + self.contacts.len();
        stats
    }
}

impl Default for XpbdSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

fn write_back_transforms(scene: &mut Scene) {
    let Scene {
        transforms,
        particles,
        ..
    } = scene;
    for (entity, transform) in transforms.iter_mut() {
        if let Some(particle) = particles.get(entity) {
            transform.translation = particle.position;
        }
    }
}
