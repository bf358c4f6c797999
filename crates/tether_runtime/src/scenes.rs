//! Demo scenes for the headless runtime.
//!
//! Every scene shares one static ground slab whose top face sits at
//! `y = -1`. `all` builds every scene into the same world; their layouts
//! do not overlap.

use anyhow::{bail, Result};
use tether_core::math::{DeterministicRng, Vec3};
use tether_physics::{
    BendingConstraint, Collider, Constraint, Entity, Particle, PhysicsMaterial, Scene,
    SceneError, ShapeMatchingConstraint, VolumeConstraint,
};

type Builder = fn(&mut Scene) -> Result<(), SceneError>;

pub const SCENES: &[(&str, Builder)] = &[
    ("stacking", stacking),
    ("domino", domino),
    ("cradle", newtons_cradle),
    ("rope", rope),
    ("chain", chain),
    ("cloth", cloth_flag),
    ("soft-cube", soft_cube),
    ("stress", stress),
];

pub const DEFAULT_SCENE: &str = "stacking";

pub fn names() -> impl Iterator<Item = &'static str> {
    SCENES.iter().map(|(name, _)| *name).chain(std::iter::once("all"))
}

pub fn build(name: &str) -> Result<Scene> {
    let mut scene = Scene::new();
    scene.spawn_static_box(
        Vec3::new(0.0, -2.0, 0.0),
        Vec3::new(25.0, 1.0, 25.0),
        &PhysicsMaterial::rigid(),
    );

    if name == "all" {
        for (_, builder) in SCENES {
            builder(&mut scene)?;
        }
        return Ok(scene);
    }
    match SCENES.iter().find(|(scene_name, _)| *scene_name == name) {
        Some((_, builder)) => builder(&mut scene)?,
        None => bail!(
            "unknown scene '{name}', expected one of: {}",
            names().collect::<Vec<_>>().join(", ")
        ),
    }
    Ok(scene)
}

/// Particle with an explicit mass and a collider surfaced by `material`.
fn body(
    scene: &mut Scene,
    position: Vec3,
    collider: Collider,
    mass: f32,
    material: &PhysicsMaterial,
) -> Result<Entity, SceneError> {
    let entity = scene.spawn_particle(Particle::new(position, mass));
    scene.insert_collider(entity, collider.with_material(material))?;
    Ok(entity)
}

fn positions_of<const N: usize>(scene: &Scene, entities: [Entity; N]) -> Result<[Vec3; N], SceneError> {
    let mut out = [Vec3::ZERO; N];
    for (slot, entity) in out.iter_mut().zip(entities) {
        *slot = scene.require_position(entity)?;
    }
    Ok(out)
}

fn stacking(scene: &mut Scene) -> Result<(), SceneError> {
    let material = PhysicsMaterial::rigid();
    for y in [2.0, 4.0, 6.0] {
        body(scene, Vec3::new(0.0, y, 0.0), Collider::cuboid(Vec3::splat(0.5)), 1.0, &material)?;
    }
    Ok(())
}

fn domino(scene: &mut Scene) -> Result<(), SceneError> {
    const COUNT: usize = 15;
    const SPACING: f32 = 1.5;
    let start = Vec3::new(10.0, 1.5, -10.0);
    let wood = PhysicsMaterial::wood();

    for i in 0..COUNT {
        let position = start + Vec3::new(0.0, 0.0, i as f32 * SPACING);
        body(scene, position, Collider::cuboid(Vec3::new(0.05, 0.75, 0.25)), 0.5, &wood)?;
    }

    let ball = body(
        scene,
        Vec3::new(start.x - 5.0, 1.0, start.z),
        Collider::sphere(0.5),
        2.0,
        &PhysicsMaterial::metal(),
    )?;
    if let Some(p) = scene.particle_mut(ball) {
        p.velocity = Vec3::new(8.0, 0.0, 0.0);
    }
    Ok(())
}

fn newtons_cradle(scene: &mut Scene) -> Result<(), SceneError> {
    const BALLS: usize = 5;
    const SPACING: f32 = 1.1;
    const STRING: f32 = 5.0;
    let first_anchor = Vec3::new(-5.0, 10.0, 10.0);
    let metal = PhysicsMaterial::metal();

    let mut balls = Vec::with_capacity(BALLS);
    for i in 0..BALLS {
        let anchor_pos = first_anchor + Vec3::new(i as f32 * SPACING, 0.0, 0.0);
        let anchor = scene.spawn_particle(Particle::fixed(anchor_pos));
        scene.insert_collider(anchor, Collider::cuboid(Vec3::splat(0.05)))?;
        let ball = body(
            scene,
            anchor_pos - Vec3::new(0.0, STRING, 0.0),
            Collider::sphere(0.5),
            1.0,
            &metal,
        )?;
        scene.connect_distance(anchor, ball, 0.0)?;
        balls.push(ball);
    }

    // Pull the first ball back; the string snaps it onto its arc.
    if let Some(p) = balls.first().and_then(|&b| scene.particle_mut(b)) {
        p.position += Vec3::new(-3.0, 2.0, 0.0);
    }
    Ok(())
}

/// Hanging line of spheres from `start` to `end`, pinned at `start`.
fn hanging_line(
    scene: &mut Scene,
    start: Vec3,
    end: Vec3,
    segments: usize,
    compliance: f32,
    one_sided: bool,
) -> Result<(), SceneError> {
    let material = PhysicsMaterial::default();
    let mut previous: Option<Entity> = None;
    for i in 0..=segments {
        let position = start.lerp(end, i as f32 / segments as f32);
        let mass = if i == 0 { 0.0 } else { 0.2 };
        let link = body(scene, position, Collider::sphere(0.15), mass, &material)?;
        if let Some(prev) = previous {
            if one_sided {
                scene.connect_rope(prev, link, compliance)?;
            } else {
                scene.connect_distance(prev, link, compliance)?;
            }
        }
        previous = Some(link);
    }
    Ok(())
}

fn rope(scene: &mut Scene) -> Result<(), SceneError> {
    hanging_line(
        scene,
        Vec3::new(-15.0, 8.0, -10.0),
        Vec3::new(-5.0, 8.0, -10.0),
        20,
        0.001,
        true,
    )
}

fn chain(scene: &mut Scene) -> Result<(), SceneError> {
    hanging_line(
        scene,
        Vec3::new(0.0, 15.0, -10.0),
        Vec3::new(0.0, 5.0, -10.0),
        15,
        0.0001,
        false,
    )
}

fn cloth_flag(scene: &mut Scene) -> Result<(), SceneError> {
    const WIDTH: usize = 10;
    const HEIGHT: usize = 8;
    const SPACING: f32 = 0.3;
    let origin = Vec3::new(5.0, 10.0, 5.0);
    let cloth = PhysicsMaterial::cloth();

    let mut grid = Vec::with_capacity(WIDTH * HEIGHT);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let position = origin + Vec3::new(x as f32 * SPACING, -(y as f32) * SPACING, 0.0);
            // Top row is pinned.
            let mass = if y == 0 { 0.0 } else { 0.1 };
            grid.push(body(scene, position, Collider::cuboid(Vec3::splat(0.05)), mass, &cloth)?);
        }
    }
    let at = |x: usize, y: usize| grid[y * WIDTH + x];

    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            if x + 1 < WIDTH {
                scene.connect_distance(at(x, y), at(x + 1, y), 0.01)?;
            }
            if y + 1 < HEIGHT {
                scene.connect_distance(at(x, y), at(x, y + 1), 0.01)?;
            }
            if x + 2 < WIDTH {
                scene.connect_distance(at(x, y), at(x + 2, y), 0.1)?;
            }
            if y + 2 < HEIGHT {
                scene.connect_distance(at(x, y), at(x, y + 2), 0.1)?;
            }
        }
    }

    // Each quad is two triangles hinged on its (x+1, y)-(x, y+1) diagonal.
    for y in 0..HEIGHT - 1 {
        for x in 0..WIDTH - 1 {
            let quad = [at(x + 1, y), at(x, y + 1), at(x, y), at(x + 1, y + 1)];
            let positions = positions_of(scene, quad)?;
            scene.add_constraint(
                Constraint::new(BendingConstraint::from_positions(quad, positions)).with_compliance(0.1),
            );
        }
    }
    Ok(())
}

fn soft_cube(scene: &mut Scene) -> Result<(), SceneError> {
    let center = Vec3::new(0.0, 5.0, 5.0);
    let half = 1.0;
    let soft = PhysicsMaterial::soft();

    // Corner `i` sits at +x if bit 0 is set, +y for bit 1, +z for bit 2.
    let mut corners = Vec::with_capacity(8);
    for i in 0..8usize {
        let sign = |bit: usize| if i & bit != 0 { 1.0 } else { -1.0 };
        let position = center + Vec3::new(sign(1), sign(2), sign(4)) * half;
        corners.push(body(scene, position, Collider::sphere(0.2), 0.5, &soft)?);
    }

    for i in 0..8 {
        for bit in [1, 2, 4] {
            if i & bit == 0 {
                scene.connect_distance(corners[i], corners[i | bit], 0.05)?;
            }
        }
    }
    for i in 0..4 {
        scene.connect_distance(corners[i], corners[7 - i], 0.05)?;
    }

    // Five-tetrahedron split: one per alternating corner plus the core.
    const TETRAHEDRA: [[usize; 4]; 5] = [
        [1, 0, 3, 5],
        [2, 3, 0, 6],
        [4, 0, 5, 6],
        [7, 6, 5, 3],
        [0, 3, 5, 6],
    ];
    for tet in TETRAHEDRA {
        let particles = tet.map(|i| corners[i]);
        let positions = positions_of(scene, particles)?;
        scene.add_constraint(
            Constraint::new(VolumeConstraint::from_positions(particles, positions)).with_compliance(0.001),
        );
    }

    let mut bodies = Vec::with_capacity(corners.len());
    for &corner in &corners {
        let mass = scene.particle(corner).map_or(0.0, Particle::mass);
        bodies.push((scene.require_position(corner)?, mass));
    }
    scene.add_constraint(
        Constraint::new(ShapeMatchingConstraint::from_positions(corners, &bodies))
            .with_compliance(0.01),
    );
    Ok(())
}

fn stress(scene: &mut Scene) -> Result<(), SceneError> {
    const COUNT: usize = 500;
    let material = PhysicsMaterial::rigid();
    let mut rng = DeterministicRng::new(0x7e7_4e2);
    for i in 0..COUNT {
        let x = (i % 25) as f32 * 2.0 - 25.0 + rng.range_f32(-0.2, 0.2);
        let z = (i / 25) as f32 * 2.0 - 25.0 + rng.range_f32(-0.2, 0.2);
        let y = 20.0 + (i % 5) as f32 * 2.0;
        body(scene, Vec3::new(x, y, z), Collider::cuboid(Vec3::splat(0.4)), 1.0, &material)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_physics::{SolverConfig, XpbdSolver};

    #[test]
    fn every_named_scene_builds() {
        for name in names() {
            let scene = build(name).unwrap_or_else(|e| panic!("{name}: {e}"));
            assert!(scene.particle_count() > 1, "{name} is empty");
        }
    }

    #[test]
    fn unknown_scene_is_rejected() {
        let err = build("pinball").err().expect("unknown scene");
        assert!(err.to_string().contains("stacking"));
    }

    #[test]
    fn soft_cube_has_every_constraint_kind_it_needs() {
        let scene = build("soft-cube").expect("builds");
        let mut kinds = std::collections::BTreeMap::new();
        scene.for_each_constraint(|c| *kinds.entry(c.kind_name()).or_insert(0) += 1);
        assert_eq!(kinds.get("distance"), Some(&16));
        assert_eq!(kinds.get("volume"), Some(&5));
        assert_eq!(kinds.get("shape_matching"), Some(&1));
    }

    #[test]
    fn demo_scenes_stay_finite() {
        for name in ["cradle", "cloth", "soft-cube", "rope"] {
            let mut scene = build(name).expect("builds");
            let mut solver = XpbdSolver::new(SolverConfig::default());
            for _ in 0..120 {
                solver.step(&mut scene, 1.0 / 60.0);
            }
            scene.for_each_particle(|e, p| {
                assert!(p.position.is_finite(), "{name}: {e:?} at {}", p.position);
            });
        }
    }

    #[test]
    fn cradle_strings_keep_their_length() {
        let mut scene = build("cradle").expect("builds");
        let mut solver = XpbdSolver::new(SolverConfig::default());
        for _ in 0..60 {
            solver.step(&mut scene, 1.0 / 60.0);
        }
        scene.for_each_constraint(|c| {
            let [anchor, ball] = [c.particles()[0], c.particles()[1]];
            let length = scene
                .position(anchor)
                .zip(scene.position(ball))
                .map_or(f32::NAN, |(a, b)| a.distance(b));
            assert!((length - 5.0).abs() < 0.05, "string length {length}");
        });
    }
}
