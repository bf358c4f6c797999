//! Entity store the solver operates on.
//!
//! A `Scene` is a generational entity registry plus one sparse storage per
//! component type. Constraints live in a flat list and refer to particles
//! by handle, so despawning an entity leaves its constraints inert rather
//! than dangling.

use crate::collider::Collider;
use crate::constraint::{Constraint, DistanceConstraint};
use crate::error::SceneError;
use crate::material::PhysicsMaterial;
use crate::particle::Particle;
use tether_core::ecs::{ComponentStorage, Entity, EntityRegistry};
use tether_core::math::Vec3;
use tether_core::Transform;
use tracing::trace;

#[derive(Default)]
pub struct Scene {
    pub(crate) entities: EntityRegistry,
    pub(crate) transforms: ComponentStorage<Transform>,
    pub(crate) particles: ComponentStorage<Particle>,
    pub(crate) colliders: ComponentStorage<Collider>,
    pub(crate) constraints: Vec<Constraint>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> Entity {
        self.entities.spawn()
    }

    /// Destroy an entity and all of its components. Constraints referencing
    /// it stay in the scene and are skipped by the solver.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.entities.despawn(entity) {
            return false;
        }
        self.transforms.remove(entity);
        self.particles.remove(entity);
        self.colliders.remove(entity);
        trace!(?entity, "despawned");
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    fn ensure_alive(&self, entity: Entity) -> Result<(), SceneError> {
        if self.entities.is_alive(entity) {
            Ok(())
        } else {
            Err(SceneError::DeadEntity { entity })
        }
    }

    /// Attach a particle, returning the one it replaced.
    pub fn insert_particle(
        &mut self,
        entity: Entity,
        particle: Particle,
    ) -> Result<Option<Particle>, SceneError> {
        self.ensure_alive(entity)?;
        Ok(self.particles.insert(entity, particle))
    }

    pub fn insert_collider(
        &mut self,
        entity: Entity,
        collider: Collider,
    ) -> Result<Option<Collider>, SceneError> {
        self.ensure_alive(entity)?;
        Ok(self.colliders.insert(entity, collider))
    }

    pub fn insert_transform(
        &mut self,
        entity: Entity,
        transform: Transform,
    ) -> Result<Option<Transform>, SceneError> {
        self.ensure_alive(entity)?;
        Ok(self.transforms.insert(entity, transform))
    }

    pub fn remove_particle(&mut self, entity: Entity) -> Option<Particle> {
        self.particles.remove(entity)
    }

    pub fn remove_collider(&mut self, entity: Entity) -> Option<Collider> {
        self.colliders.remove(entity)
    }

    pub fn particle(&self, entity: Entity) -> Option<&Particle> {
        self.particles.get(entity)
    }

    pub fn particle_mut(&mut self, entity: Entity) -> Option<&mut Particle> {
        self.particles.get_mut(entity)
    }

    pub fn collider(&self, entity: Entity) -> Option<&Collider> {
        self.colliders.get(entity)
    }

    pub fn transform(&self, entity: Entity) -> Option<&Transform> {
        self.transforms.get(entity)
    }

    pub fn has_particle(&self, entity: Entity) -> bool {
        self.particles.contains(entity)
    }

    pub fn has_collider(&self, entity: Entity) -> bool {
        self.colliders.contains(entity)
    }

    pub fn position(&self, entity: Entity) -> Option<Vec3> {
        self.particles.get(entity).map(|p| p.position)
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn for_each_particle(&self, mut f: impl FnMut(Entity, &Particle)) {
        for (entity, particle) in self.particles.iter() {
            f(entity, particle);
        }
    }

    pub fn for_each_constraint(&self, mut f: impl FnMut(&Constraint)) {
        for constraint in &self.constraints {
            f(constraint);
        }
    }

    /// Add a persistent constraint and return its index.
    pub fn add_constraint(&mut self, constraint: Constraint) -> usize {
        self.constraints.push(constraint);
        self.constraints.len() - 1
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint_mut(&mut self, index: usize) -> Option<&mut Constraint> {
        self.constraints.get_mut(index)
    }

    /// Drop constraints that reference a despawned particle.
    pub fn prune_constraints(&mut self) -> usize {
        let before = self.constraints.len();
        let particles = &self.particles;
        self.constraints
            .retain(|c| c.particles().into_iter().all(|e| particles.contains(e)));
        before - self.constraints.len()
    }

    /// Spawn an entity with a transform and a particle.
    pub fn spawn_particle(&mut self, particle: Particle) -> Entity {
        let entity = self.spawn();
        self.transforms
            .insert(entity, Transform::from_translation(particle.position));
        self.particles.insert(entity, particle);
        entity
    }

    /// Spawn a particle with a collider whose mass comes from the material
    /// density. Zero density gives a static body.
    pub fn spawn_body(
        &mut self,
        position: Vec3,
        collider: Collider,
        material: &PhysicsMaterial,
    ) -> Entity {
        let mass = material.density * collider.volume();
        let entity = self.spawn_particle(Particle::new(position, mass));
        self.colliders
            .insert(entity, collider.with_material(material));
        entity
    }

    pub fn spawn_sphere(&mut self, position: Vec3, radius: f32, material: &PhysicsMaterial) -> Entity {
        self.spawn_body(position, Collider::sphere(radius), material)
    }

    pub fn spawn_box(
        &mut self,
        position: Vec3,
        half_extents: Vec3,
        material: &PhysicsMaterial,
    ) -> Entity {
        self.spawn_body(position, Collider::cuboid(half_extents), material)
    }

    /// Static, immovable box.
    pub fn spawn_static_box(
        &mut self,
        position: Vec3,
        half_extents: Vec3,
        material: &PhysicsMaterial,
    ) -> Entity {
        let entity = self.spawn_particle(Particle::fixed(position));
        self.colliders
            .insert(entity, Collider::cuboid(half_extents).with_material(material));
        entity
    }

    /// Distance constraint whose rest length is the current separation.
    pub fn connect_distance(
        &mut self,
        a: Entity,
        b: Entity,
        compliance: f32,
    ) -> Result<usize, SceneError> {
        let rest_length = self.require_position(a)?.distance(self.require_position(b)?);
        Ok(self.add_constraint(
            Constraint::new(DistanceConstraint::new(a, b, rest_length)).with_compliance(compliance),
        ))
    }

    /// One-sided variant of [`connect_distance`](Self::connect_distance).
    pub fn connect_rope(
        &mut self,
        a: Entity,
        b: Entity,
        compliance: f32,
    ) -> Result<usize, SceneError> {
        let rest_length = self.require_position(a)?.distance(self.require_position(b)?);
        Ok(self.add_constraint(
            Constraint::new(DistanceConstraint::rope(a, b, rest_length)).with_compliance(compliance),
        ))
    }

    pub fn require_position(&self, entity: Entity) -> Result<Vec3, SceneError> {
        self.ensure_alive(entity)?;
        self.position(entity)
            .ok_or(SceneError::MissingParticle { entity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_on_dead_entity_fails() {
        let mut scene = Scene::new();
        let e = scene.spawn();
        assert!(scene.despawn(e));
        assert_eq!(
            scene.insert_particle(e, Particle::default()),
            Err(SceneError::DeadEntity { entity: e })
        );
        assert!(!scene.despawn(e));
    }

    #[test]
    fn despawn_removes_components_but_keeps_constraints() {
        let mut scene = Scene::new();
        let a = scene.spawn_particle(Particle::new(Vec3::ZERO, 1.0));
        let b = scene.spawn_particle(Particle::new(Vec3::X, 1.0));
        scene.connect_distance(a, b, 0.0).expect("both particles exist");

        scene.despawn(b);
        assert!(!scene.has_particle(b));
        assert!(scene.transform(b).is_none());
        assert_eq!(scene.constraints().len(), 1);

        assert_eq!(scene.prune_constraints(), 1);
        assert!(scene.constraints().is_empty());
    }

    #[test]
    fn connect_distance_uses_current_separation() {
        let mut scene = Scene::new();
        let a = scene.spawn_particle(Particle::new(Vec3::ZERO, 1.0));
        let b = scene.spawn_particle(Particle::new(Vec3::new(0.0, 3.0, 4.0), 1.0));
        let index = scene.connect_distance(a, b, 0.0).expect("both particles exist");
        match &scene.constraints()[index].kind {
            crate::ConstraintKind::Distance(d) => assert!((d.rest_length - 5.0).abs() < 1e-6),
            other => panic!("unexpected constraint {other:?}"),
        }

        let bare = scene.spawn();
        assert_eq!(
            scene.connect_distance(a, bare, 0.0),
            Err(SceneError::MissingParticle { entity: bare })
        );
    }

    #[test]
    fn body_mass_follows_density() {
        let mut scene = Scene::new();
        let material = PhysicsMaterial {
            density: 2.0,
            ..PhysicsMaterial::default()
        };
        let body = scene.spawn_box(Vec3::ZERO, Vec3::splat(0.5), &material);
        let particle = scene.particle(body).expect("spawned with particle");
        assert!((particle.mass() - 2.0).abs() < 1e-6);
        assert!(scene.has_collider(body));

        let ground = scene.spawn_static_box(Vec3::ZERO, Vec3::ONE, &material);
        assert!(scene.particle(ground).is_some_and(Particle::is_static));
    }

    #[test]
    fn for_each_particle_visits_all() {
        let mut scene = Scene::new();
        for i in 0..3 {
            scene.spawn_particle(Particle::new(Vec3::splat(i as f32), 1.0));
        }
        let mut count = 0;
        scene.for_each_particle(|_, _| count += 1);
        assert_eq!(count, 3);
        assert_eq!(scene.particle_count(), 3);
    }
}
