use nalgebra as na;
use rapier3d::parry::{
    query::{self, Ray, ShapeCastOptions},
    shape::Shape,
};

use super::types::{Iso, Vec3};
use super::world::WorldBody;

/// Raw narrow-phase contact against a single body, before filtering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyHit {
    /// Distance travelled along the unit direction.
    pub distance: f32,
    /// World-space point on the body surface.
    pub point: Vec3,
    /// World-space surface normal, opposing the cast direction.
    pub normal: Vec3,
}

/// Cast `shape` from `shape_iso` along unit `dir` for at most `max_distance` against `body`.
///
/// - The moving shape travels with velocity `dir`, so the time of impact equals the distance.
/// - The surface normal is taken on the body (`normal2`), rotated to world space and flipped
///   if needed so it always opposes the motion.
pub fn cast_shape_against_body(
    shape_iso: &Iso,
    shape: &dyn Shape,
    dir: &Vec3,
    max_distance: f32,
    body: &WorldBody,
) -> Option<BodyHit> {
    // parry3d: use builder to set maximum time of impact and pass options by value.
    let mut opts = ShapeCastOptions::with_max_time_of_impact(max_distance);
    opts.stop_at_penetration = true;
    match query::cast_shapes(
        shape_iso,
        dir,
        shape,
        &body.iso,
        &na::Vector3::zeros(),
        &*body.shape,
        opts,
    ) {
        Ok(Some(hit)) => {
            let mut normal = body.iso.rotation * hit.normal2.into_inner();
            if normal.dot(dir) > 0.0 {
                normal = -normal;
            }
            let point = body.iso * hit.witness2;
            Some(BodyHit {
                distance: hit.time_of_impact,
                point: point.coords,
                normal,
            })
        }
        _ => None,
    }
}

/// Cast a ray from `origin` along unit `dir` for at most `max_distance` against `body`.
///
/// Solid casts: a ray starting inside a body reports a zero distance.
pub fn cast_ray_against_body(
    origin: &Vec3,
    dir: &Vec3,
    max_distance: f32,
    body: &WorldBody,
) -> Option<BodyHit> {
    let ray = Ray::new(na::Point3::from(*origin), *dir);
    body.shape
        .cast_ray_and_get_normal(&body.iso, &ray, max_distance, true)
        .map(|hit| {
            let mut normal = hit.normal;
            if normal.dot(dir) > 0.0 {
                normal = -normal;
            }
            BodyHit {
                distance: hit.time_of_impact,
                point: ray.point_at(hit.time_of_impact).coords,
                normal,
            }
        })
}

/// Static intersection test between `shape` at `shape_iso` and `body`.
pub fn intersects_body(shape_iso: &Iso, shape: &dyn Shape, body: &WorldBody) -> bool {
    query::intersection_test(shape_iso, shape, &body.iso, &*body.shape).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::types::{BodyId, BodyKind};
    use crate::collision::world::{BodyDef, ColliderShapeDef};
    use approx::assert_relative_eq;
    use rapier3d::parry::shape::Ball;

    fn floor() -> WorldBody {
        WorldBody::from_def(BodyDef::fixed(
            1,
            Vec3::zeros(),
            na::UnitQuaternion::identity(),
            ColliderShapeDef::Plane {
                offset_along_normal: 0.0,
            },
        ))
    }

    #[test]
    fn ball_cast_onto_floor_reports_distance_and_upward_normal() {
        let body = floor();
        let iso = Iso::translation(0.0, 2.0, 0.0);
        let hit = cast_shape_against_body(&iso, &Ball::new(0.5), &-Vec3::y(), 5.0, &body)
            .expect("ball should hit the floor");
        assert_relative_eq!(hit.distance, 1.5, epsilon = 1e-4);
        assert_relative_eq!(hit.normal, Vec3::y(), epsilon = 1e-4);
        assert_relative_eq!(hit.point.y, 0.0, epsilon = 1e-4);
        assert_eq!(body.id, BodyId(1));
        assert_eq!(body.kind, BodyKind::Static);
    }

    #[test]
    fn ball_cast_out_of_range_misses() {
        let body = floor();
        let iso = Iso::translation(0.0, 2.0, 0.0);
        assert!(cast_shape_against_body(&iso, &Ball::new(0.5), &-Vec3::y(), 1.0, &body).is_none());
    }

    #[test]
    fn ray_hits_rotated_cuboid_face() {
        let body = WorldBody::from_def(BodyDef::fixed(
            2,
            Vec3::new(3.0, 0.0, 0.0),
            na::UnitQuaternion::identity(),
            ColliderShapeDef::Cuboid {
                half_extents: Vec3::new(0.5, 0.5, 0.5),
            },
        ));
        let hit = cast_ray_against_body(&Vec3::zeros(), &Vec3::x(), 10.0, &body)
            .expect("ray should hit the box");
        assert_relative_eq!(hit.distance, 2.5, epsilon = 1e-4);
        assert_relative_eq!(hit.normal, -Vec3::x(), epsilon = 1e-4);
    }

    #[test]
    fn overlap_detects_penetration() {
        let body = floor();
        assert!(intersects_body(&Iso::translation(0.0, 0.2, 0.0), &Ball::new(0.5), &body));
        assert!(!intersects_body(&Iso::translation(0.0, 0.8, 0.0), &Ball::new(0.5), &body));
    }
}
