/*!
Body sweeps and ground casts.

Every query the controller runs against the world goes through this module:
- `cast_body`: sweep the capsule along a displacement.
- `check_for_ground`: sphere cast down from the (optionally lifted) bottom sphere.
- `check_for_ground_ray`: straight-down ray from the same origin.
- `body_fits`: static overlap test for a prospective body size.

Notes
- Casts use the skin-shrunk radius, so a body resting in contact never starts overlapping.
- The displacement returned with a hit is the safe motion to apply; callers never recompute it.
*/

use crate::character::body::{BodyShape, BodySize};
use crate::character::stability::{EdgeInfo, slope_angle};
use crate::collision::caster::ShapeCaster;
use crate::collision::types::{HitFilter, HitInfo, Vec3};
use crate::constants::{
    CONTACT_OFFSET, DIST_EPS, EDGE_RAYS_CAST_DISTANCE, EDGE_RAYS_SEPARATION, MIN_EDGE_ANGLE,
    SKIN_WIDTH,
};
use crate::utils::project_on_plane;

/// Result of a body sweep or ground cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionInfo {
    pub hit: HitInfo,
    /// Safe displacement for the body.
    pub displacement: Vec3,
    /// Angle between up and the raw hit normal (degrees).
    pub contact_slope_angle: f32,
    pub edge: Option<EdgeInfo>,
}

/// Sweep the capsule from `position` along `displacement`.
///
/// `bottom_offset` lifts the bottom sphere (step offset while walking, zero for a full-body sweep).
/// The safe displacement stops `CONTACT_OFFSET` short of the hit.
pub fn cast_body(
    caster: &dyn ShapeCaster,
    shape: &BodyShape,
    position: &Vec3,
    displacement: &Vec3,
    bottom_offset: f32,
    filter: &HitFilter,
) -> Option<CollisionInfo> {
    let length = displacement.norm();
    if length <= DIST_EPS {
        return None;
    }
    let dir = displacement / length;
    let bottom = shape.bottom_center(position, bottom_offset);
    let top = shape.top_center(position);
    let hit = caster.capsule_cast(
        bottom,
        top,
        shape.cast_radius(),
        dir * (length + CONTACT_OFFSET),
        filter,
    )?;
    let travel = (hit.distance - CONTACT_OFFSET).clamp(0.0, length);
    Some(CollisionInfo {
        displacement: dir * travel,
        contact_slope_angle: slope_angle(&hit.normal, &shape.up),
        edge: None,
        hit,
    })
}

/// Sphere cast down from the bottom sphere lifted by `step_offset`.
///
/// The offset is clamped to the capsule's lift range. The cast covers
/// `step_offset + SKIN_WIDTH + step_down_distance`. The returned displacement
/// puts the feet exactly on the surface found: negative along up when the ground is below,
/// positive when it lies within the step offset above the feet.
pub fn check_for_ground(
    caster: &dyn ShapeCaster,
    shape: &BodyShape,
    position: &Vec3,
    step_offset: f32,
    step_down_distance: f32,
    filter: &HitFilter,
) -> Option<CollisionInfo> {
    let up = shape.up;
    let step_offset = step_offset.clamp(0.0, shape.max_bottom_offset());
    let origin = shape.bottom_center(position, step_offset);
    let radius = shape.cast_radius();
    let cast_distance = step_offset + SKIN_WIDTH + step_down_distance;
    let hit = caster.sphere_cast(origin, radius, -up * cast_distance, filter)?;

    let sphere_center = origin - up * hit.distance;
    let edge = detect_edge(caster, &up, &hit, &sphere_center, filter);
    Some(CollisionInfo {
        displacement: -up * (hit.distance - step_offset - SKIN_WIDTH),
        contact_slope_angle: slope_angle(&hit.normal, &up),
        edge,
        hit,
    })
}

/// Straight-down ray from the bottom sphere center lifted by `step_offset`.
pub fn check_for_ground_ray(
    caster: &dyn ShapeCaster,
    shape: &BodyShape,
    position: &Vec3,
    step_offset: f32,
    step_down_distance: f32,
    filter: &HitFilter,
) -> Option<CollisionInfo> {
    let up = shape.up;
    let step_offset = step_offset.clamp(0.0, shape.max_bottom_offset());
    let origin = shape.bottom_center(position, step_offset);
    let lift = shape.radius() + step_offset;
    let hit = caster.raycast(
        origin,
        -up * (lift + SKIN_WIDTH + step_down_distance),
        filter,
    )?;
    Some(CollisionInfo {
        displacement: -up * (hit.distance - lift),
        contact_slope_angle: slope_angle(&hit.normal, &up),
        edge: None,
        hit,
    })
}

/// True if a body of `size` placed at `position` overlaps nothing.
pub fn body_fits(
    caster: &dyn ShapeCaster,
    size: BodySize,
    up: &Vec3,
    position: &Vec3,
    filter: &HitFilter,
) -> bool {
    let shape = BodyShape::new(size, *up);
    !caster.overlap_capsule(
        shape.bottom_center(position, 0.0),
        shape.top_center(position),
        shape.cast_radius(),
        filter,
    )
}

/// Probe the two faces around an off-center ground contact.
///
/// Algorithm
/// - Aim both rays from the sphere side toward the contact point.
/// - Offset one ray toward up (upper face) and one away from it (lower face),
///   both perpendicular to the aim direction.
/// - An edge needs both rays to hit and their normals to differ by more than `MIN_EDGE_ANGLE`.
fn detect_edge(
    caster: &dyn ShapeCaster,
    up: &Vec3,
    hit: &HitInfo,
    sphere_center: &Vec3,
    filter: &HitFilter,
) -> Option<EdgeInfo> {
    let lateral = project_on_plane(&(sphere_center - hit.point), up);
    if lateral.norm() <= EDGE_RAYS_SEPARATION * 0.1 {
        return None;
    }
    let aim = (hit.point - sphere_center).try_normalize(DIST_EPS)?;
    let side = (up - aim * up.dot(&aim)).try_normalize(DIST_EPS)?;

    let base = hit.point - aim * EDGE_RAYS_SEPARATION;
    let cast = aim * EDGE_RAYS_CAST_DISTANCE;
    let upper = caster.raycast(base + side * EDGE_RAYS_SEPARATION, cast, filter)?;
    let lower = caster.raycast(base - side * EDGE_RAYS_SEPARATION, cast, filter)?;

    let edge = EdgeInfo::new(upper.normal, lower.normal, up);
    (edge.edge_angle > MIN_EDGE_ANGLE).then_some(edge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::types::{BodyId, Quat};
    use crate::collision::{CollisionWorld, cuboid_from_pose, plane_from_pose};
    use approx::assert_relative_eq;

    fn shape() -> BodyShape {
        BodyShape::new(BodySize::new(1.0, 2.0), Vec3::y())
    }

    fn floor_world() -> CollisionWorld {
        CollisionWorld::build(vec![plane_from_pose(1, Quat::identity(), Vec3::zeros())])
    }

    /// Ledge: box top at y = 0 for x < 0, nothing below within reach.
    fn ledge_world() -> CollisionWorld {
        CollisionWorld::build(vec![cuboid_from_pose(
            1,
            Vec3::new(5.0, 2.0, 5.0),
            Vec3::new(-5.0, -2.0, 0.0),
            Quat::identity(),
        )])
    }

    #[test]
    fn ground_below_feet_snaps_down() {
        let world = floor_world();
        let filter = HitFilter::default();
        let info = check_for_ground(&world, &shape(), &Vec3::new(0.0, 0.3, 0.0), 0.1, 0.5, &filter)
            .expect("floor within step down");
        assert_eq!(info.hit.body, BodyId(1));
        assert_relative_eq!(info.displacement, Vec3::new(0.0, -0.3, 0.0), epsilon = 1e-4);
        assert!(info.edge.is_none());
    }

    #[test]
    fn ground_beyond_step_down_is_missed() {
        let world = floor_world();
        let filter = HitFilter::default();
        assert!(
            check_for_ground(&world, &shape(), &Vec3::new(0.0, 0.7, 0.0), 0.1, 0.5, &filter)
                .is_none()
        );
    }

    #[test]
    fn ray_ground_check_measures_from_feet() {
        let world = floor_world();
        let filter = HitFilter::default();
        let info =
            check_for_ground_ray(&world, &shape(), &Vec3::new(0.0, 0.2, 0.0), 0.1, 0.5, &filter)
                .expect("floor below");
        assert_relative_eq!(info.displacement, Vec3::new(0.0, -0.2, 0.0), epsilon = 1e-4);
    }

    #[test]
    fn body_sweep_stops_short_of_wall() {
        let world = CollisionWorld::build(vec![cuboid_from_pose(
            1,
            Vec3::new(0.5, 2.0, 2.0),
            Vec3::new(2.5, 2.0, 0.0),
            Quat::identity(),
        )]);
        let filter = HitFilter::default();
        let info = cast_body(
            &world,
            &shape(),
            &Vec3::new(0.0, 0.1, 0.0),
            &Vec3::new(3.0, 0.0, 0.0),
            0.0,
            &filter,
        )
        .expect("wall ahead");
        // Wall face at x = 2, shrunk radius 0.495, contact offset 0.01.
        assert_relative_eq!(info.displacement.x, 2.0 - 0.495 - 0.01, epsilon = 1e-3);
        assert_relative_eq!(info.contact_slope_angle, 90.0, epsilon = 1e-2);
    }

    #[test]
    fn ledge_contact_is_an_edge_with_walkable_upper_face() {
        let world = ledge_world();
        let filter = HitFilter::default();
        let info = check_for_ground(&world, &shape(), &Vec3::new(0.45, 0.0, 0.0), 0.1, 0.5, &filter)
            .expect("ledge corner below");
        let edge = info.edge.expect("corner contact should be an edge");
        assert_relative_eq!(edge.upper_normal, Vec3::y(), epsilon = 1e-3);
        assert_relative_eq!(edge.lower_normal, Vec3::x(), epsilon = 1e-3);
        assert!(edge.is_stable(60.0));
        // Raw corner normal is steeper than the limit.
        assert!(info.contact_slope_angle > 60.0);
    }

    #[test]
    fn body_fits_rejects_overlap() {
        let world = CollisionWorld::build(vec![cuboid_from_pose(
            1,
            Vec3::new(2.0, 0.5, 2.0),
            Vec3::new(0.0, 2.5, 0.0),
            Quat::identity(),
        )]);
        let filter = HitFilter::default();
        assert!(body_fits(&world, BodySize::new(1.0, 1.5), &Vec3::y(), &Vec3::zeros(), &filter));
        assert!(!body_fits(&world, BodySize::new(1.0, 2.5), &Vec3::y(), &Vec3::zeros(), &filter));
    }
}
