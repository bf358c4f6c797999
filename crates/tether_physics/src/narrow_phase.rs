//! Analytic contact generation between pairs of collider shapes.
//!
//! All shapes are axis-aligned (particles have no orientation), which keeps
//! every test closed-form. Manifolds are single-point.
//!
//! [`collide_within`] also reports pairs that are separated by less than a
//! margin. Those speculative manifolds carry a negative penetration equal to
//! minus the gap.

use crate::collider::ColliderShape;
use crate::EPSILON;
use tether_core::math::Vec3;

/// Fallback normal for coincident centres.
const FALLBACK_NORMAL: Vec3 = Vec3::Y;

/// Single-point contact between shape `a` and shape `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactManifold {
    /// Unit normal pointing from `a` towards `b`.
    pub normal: Vec3,
    /// Overlap depth along `normal`; negative for a speculative gap.
    pub penetration: f32,
    /// World-space point midway through the overlap.
    pub point: Vec3,
}

impl ContactManifold {
    fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// Test two shapes placed at particle positions `pos_a` and `pos_b`.
/// Only strictly overlapping shapes produce a manifold.
pub fn collide(
    pos_a: Vec3,
    shape_a: &ColliderShape,
    pos_b: Vec3,
    shape_b: &ColliderShape,
) -> Option<ContactManifold> {
    collide_within(pos_a, shape_a, pos_b, shape_b, 0.0)
}

/// Like [`collide`], but shapes closer than `margin` also produce a
/// manifold.
pub fn collide_within(
    pos_a: Vec3,
    shape_a: &ColliderShape,
    pos_b: Vec3,
    shape_b: &ColliderShape,
    margin: f32,
) -> Option<ContactManifold> {
    let margin = margin.max(0.0);
    let ca = pos_a + shape_a.offset();
    let cb = pos_b + shape_b.offset();
    match (*shape_a, *shape_b) {
        (ColliderShape::Sphere { radius: ra, .. }, ColliderShape::Sphere { radius: rb, .. }) => {
            sphere_sphere(ca, ra, cb, rb, margin)
        }
        (
            ColliderShape::Box { half_extents: ha, .. },
            ColliderShape::Box { half_extents: hb, .. },
        ) => box_box(ca, ha.abs(), cb, hb.abs(), margin),
        (ColliderShape::Sphere { radius, .. }, ColliderShape::Box { half_extents, .. }) => {
            box_sphere(cb, half_extents.abs(), ca, radius, margin).map(ContactManifold::flipped)
        }
        (ColliderShape::Box { half_extents, .. }, ColliderShape::Sphere { radius, .. }) => {
            box_sphere(ca, half_extents.abs(), cb, radius, margin)
        }
        (
            ColliderShape::Capsule {
                radius: ra,
                height: h,
                ..
            },
            ColliderShape::Sphere { radius: rb, .. },
        ) => {
            let on_axis = closest_point_on_segment(cb, capsule_segment(ca, h));
            sphere_sphere(on_axis, ra, cb, rb, margin)
        }
        (
            ColliderShape::Sphere { radius: ra, .. },
            ColliderShape::Capsule {
                radius: rb,
                height: h,
                ..
            },
        ) => {
            let on_axis = closest_point_on_segment(ca, capsule_segment(cb, h));
            sphere_sphere(ca, ra, on_axis, rb, margin)
        }
        (
            ColliderShape::Capsule {
                radius: ra,
                height: ha,
                ..
            },
            ColliderShape::Capsule {
                radius: rb,
                height: hb,
                ..
            },
        ) => {
            let (pa, pb) =
                closest_points_between_segments(capsule_segment(ca, ha), capsule_segment(cb, hb));
            sphere_sphere(pa, ra, pb, rb, margin)
        }
        (
            ColliderShape::Capsule { radius, height, .. },
            ColliderShape::Box { half_extents, .. },
        ) => {
            let core = capsule_core_towards_box(ca, height, cb);
            box_sphere(cb, half_extents.abs(), core, radius, margin).map(ContactManifold::flipped)
        }
        (
            ColliderShape::Box { half_extents, .. },
            ColliderShape::Capsule { radius, height, .. },
        ) => {
            let core = capsule_core_towards_box(cb, height, ca);
            box_sphere(ca, half_extents.abs(), core, radius, margin)
        }
    }
}

fn sphere_sphere(ca: Vec3, ra: f32, cb: Vec3, rb: f32, margin: f32) -> Option<ContactManifold> {
    let delta = cb - ca;
    let distance = delta.length();
    let reach = ra.abs() + rb.abs();
    if distance >= reach + margin {
        return None;
    }
    let normal = if distance > EPSILON {
        delta / distance
    } else {
        FALLBACK_NORMAL
    };
    let penetration = reach - distance;
    Some(ContactManifold {
        normal,
        penetration,
        point: ca + normal * (ra.abs() - penetration * 0.5),
    })
}

/// Axis of least overlap between two AABBs.
fn box_box(ca: Vec3, ha: Vec3, cb: Vec3, hb: Vec3, margin: f32) -> Option<ContactManifold> {
    let delta = cb - ca;
    let overlap = (ha + hb) - delta.abs();
    if overlap.min_element() <= -margin {
        return None;
    }
    let axis = if overlap.x <= overlap.y && overlap.x <= overlap.z {
        0
    } else if overlap.y <= overlap.z {
        1
    } else {
        2
    };
    let mut normal = Vec3::ZERO;
    normal[axis] = if delta[axis] < 0.0 { -1.0 } else { 1.0 };

    let lo = (ca - ha).max(cb - hb);
    let hi = (ca + ha).min(cb + hb);
    Some(ContactManifold {
        normal,
        penetration: overlap[axis],
        point: (lo + hi) * 0.5,
    })
}

/// Normal points from the box towards the sphere.
fn box_sphere(
    box_center: Vec3,
    half: Vec3,
    sphere_center: Vec3,
    radius: f32,
    margin: f32,
) -> Option<ContactManifold> {
    let radius = radius.abs();
    let local = sphere_center - box_center;
    let clamped = local.clamp(-half, half);

    if clamped != local {
        let delta = local - clamped;
        let distance = delta.length();
        if distance >= radius + margin {
            return None;
        }
        let normal = delta / distance;
        let penetration = radius - distance;
        return Some(ContactManifold {
            normal,
            penetration,
            point: box_center + clamped + normal * (penetration * -0.5),
        });
    }

    // Centre inside the box: leave through the nearest face.
    let to_face = half - local.abs();
    let axis = if to_face.x <= to_face.y && to_face.x <= to_face.z {
        0
    } else if to_face.y <= to_face.z {
        1
    } else {
        2
    };
    let mut normal = Vec3::ZERO;
    normal[axis] = if local[axis] < 0.0 { -1.0 } else { 1.0 };
    let penetration = radius + to_face[axis];
    Some(ContactManifold {
        normal,
        penetration,
        point: sphere_center + normal * (to_face[axis] - penetration * 0.5),
    })
}

/// Inner segment of a Y-aligned capsule centred at `center`.
fn capsule_segment(center: Vec3, height: f32) -> (Vec3, Vec3) {
    let half = Vec3::new(0.0, height.abs() * 0.5, 0.0);
    (center - half, center + half)
}

/// Point on the capsule's axis level with the box centre, clamped to the
/// segment. Approximates the capsule by one sphere for the box test.
fn capsule_core_towards_box(center: Vec3, height: f32, box_center: Vec3) -> Vec3 {
    let half = height.abs() * 0.5;
    let y = box_center.y.clamp(center.y - half, center.y + half);
    Vec3::new(center.x, y, center.z)
}

fn closest_point_on_segment(point: Vec3, (start, end): (Vec3, Vec3)) -> Vec3 {
    let seg = end - start;
    let len_sq = seg.length_squared();
    if len_sq < EPSILON {
        return start;
    }
    let t = ((point - start).dot(seg) / len_sq).clamp(0.0, 1.0);
    start + seg * t
}

/// Closest pair of points between two segments.
fn closest_points_between_segments(
    (p1, q1): (Vec3, Vec3),
    (p2, q2): (Vec3, Vec3),
) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a < EPSILON && e < EPSILON {
        return (p1, p2);
    }
    let (s, t) = if a < EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e < EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s = if denom > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                // Parallel: any s works, pick the midpoint of the overlap.
                let t_mid = ((p1 + q1) * 0.5 - p2).dot(d2) / e;
                let anchor = p2 + d2 * t_mid.clamp(0.0, 1.0);
                ((anchor - p1).dot(d1) / a).clamp(0.0, 1.0)
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };
    (p1 + d1 * s, p2 + d2 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(radius: f32) -> ColliderShape {
        ColliderShape::Sphere {
            radius,
            offset: Vec3::ZERO,
        }
    }

    fn cuboid(half: f32) -> ColliderShape {
        ColliderShape::Box {
            half_extents: Vec3::splat(half),
            offset: Vec3::ZERO,
        }
    }

    fn capsule(radius: f32, height: f32) -> ColliderShape {
        ColliderShape::Capsule {
            radius,
            height,
            offset: Vec3::ZERO,
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn overlapping_spheres_point_from_a_to_b() {
        let m = collide(Vec3::ZERO, &sphere(0.5), Vec3::new(0.8, 0.0, 0.0), &sphere(0.5))
            .expect("overlap");
        assert_eq!(m.normal, Vec3::X);
        assert!(approx(m.penetration, 0.2));
        assert!(approx(m.point.x, 0.4));
    }

    #[test]
    fn separated_spheres_do_not_collide() {
        assert!(collide(Vec3::ZERO, &sphere(0.5), Vec3::new(1.0, 0.0, 0.0), &sphere(0.5)).is_none());
    }

    #[test]
    fn coincident_spheres_use_fallback_normal() {
        let m = collide(Vec3::ONE, &sphere(0.5), Vec3::ONE, &sphere(0.5)).expect("overlap");
        assert_eq!(m.normal, Vec3::Y);
        assert!(approx(m.penetration, 1.0));
    }

    #[test]
    fn margin_reports_near_misses_with_negative_depth() {
        let gap = Vec3::new(1.01, 0.0, 0.0);
        assert!(collide(Vec3::ZERO, &sphere(0.5), gap, &sphere(0.5)).is_none());
        let m = collide_within(Vec3::ZERO, &sphere(0.5), gap, &sphere(0.5), 0.02)
            .expect("within margin");
        assert_eq!(m.normal, Vec3::X);
        assert!(approx(m.penetration, -0.01));
        assert!(collide_within(Vec3::ZERO, &sphere(0.5), gap, &sphere(0.5), 0.005).is_none());

        let resting = collide_within(Vec3::ZERO, &cuboid(0.5), Vec3::new(0.0, 1.0, 0.0), &cuboid(0.5), 0.02)
            .expect("touching boxes within margin");
        assert_eq!(resting.normal, Vec3::Y);
        assert!(approx(resting.penetration, 0.0));

        let hover = collide_within(Vec3::new(0.0, 1.01, 0.0), &sphere(0.5), Vec3::ZERO, &cuboid(0.5), 0.02)
            .expect("sphere just above box");
        assert_eq!(hover.normal, -Vec3::Y);
        assert!(approx(hover.penetration, -0.01));
    }

    #[test]
    fn offsets_move_the_shape() {
        let shifted = ColliderShape::Sphere {
            radius: 0.5,
            offset: Vec3::new(5.0, 0.0, 0.0),
        };
        assert!(collide(Vec3::ZERO, &sphere(0.5), Vec3::ZERO, &shifted).is_none());
    }

    #[test]
    fn stacked_boxes_resolve_along_y() {
        let m = collide(Vec3::ZERO, &cuboid(0.5), Vec3::new(0.1, 0.9, 0.0), &cuboid(0.5))
            .expect("overlap");
        assert_eq!(m.normal, Vec3::Y);
        assert!(approx(m.penetration, 0.1));

        let below = collide(Vec3::new(0.0, 0.9, 0.0), &cuboid(0.5), Vec3::ZERO, &cuboid(0.5))
            .expect("overlap");
        assert_eq!(below.normal, -Vec3::Y);
    }

    #[test]
    fn sphere_resting_on_box() {
        let m = collide(Vec3::new(0.0, 0.9, 0.0), &sphere(0.5), Vec3::ZERO, &cuboid(0.5))
            .expect("overlap");
        assert_eq!(m.normal, -Vec3::Y);
        assert!(approx(m.penetration, 0.1));

        let flipped = collide(Vec3::ZERO, &cuboid(0.5), Vec3::new(0.0, 0.9, 0.0), &sphere(0.5))
            .expect("overlap");
        assert_eq!(flipped.normal, Vec3::Y);
    }

    #[test]
    fn sphere_centre_inside_box_exits_nearest_face() {
        let m = collide(Vec3::ZERO, &cuboid(1.0), Vec3::new(0.0, 0.0, 0.8), &sphere(0.25))
            .expect("overlap");
        assert_eq!(m.normal, Vec3::Z);
        assert!(approx(m.penetration, 0.45));
    }

    #[test]
    fn capsule_side_hits_sphere() {
        let m = collide(Vec3::ZERO, &capsule(0.5, 2.0), Vec3::new(0.9, 0.7, 0.0), &sphere(0.5))
            .expect("overlap");
        assert!(approx(m.normal.x, 1.0));
        assert!(approx(m.penetration, 0.1));
    }

    #[test]
    fn parallel_capsules_collide_sideways() {
        let m = collide(Vec3::ZERO, &capsule(0.5, 2.0), Vec3::new(0.8, 0.5, 0.0), &capsule(0.5, 2.0))
            .expect("overlap");
        assert!(approx(m.normal.x, 1.0));
        assert!(approx(m.penetration, 0.2));
    }

    #[test]
    fn stacked_capsules_touch_at_caps() {
        let m = collide(Vec3::ZERO, &capsule(0.5, 1.0), Vec3::new(0.0, 1.9, 0.0), &capsule(0.5, 1.0))
            .expect("overlap");
        assert!(approx(m.normal.y, 1.0));
        assert!(approx(m.penetration, 0.1));
    }

    #[test]
    fn capsule_standing_on_box() {
        let m = collide(Vec3::new(0.0, 1.9, 0.0), &capsule(0.5, 2.0), Vec3::ZERO, &cuboid(0.5))
            .expect("overlap");
        assert_eq!(m.normal, -Vec3::Y);
        assert!(approx(m.penetration, 0.1));
    }
}
