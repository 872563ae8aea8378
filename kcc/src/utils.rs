use crate::collision::types::{Quat, Vec3};
use crate::constants::DIST_EPS;
use nalgebra::Unit;

/// Unsigned angle between two vectors in degrees. Zero vectors give 0.
pub fn angle_between(a: &Vec3, b: &Vec3) -> f32 {
    let denom = a.norm() * b.norm();
    if denom <= DIST_EPS {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Component of `v` along `axis`.
pub fn project_on(v: &Vec3, axis: &Vec3) -> Vec3 {
    let len_sq = axis.norm_squared();
    if len_sq <= DIST_EPS * DIST_EPS {
        return Vec3::zeros();
    }
    axis * (v.dot(axis) / len_sq)
}

/// `v` with its component along `normal` removed.
pub fn project_on_plane(v: &Vec3, normal: &Vec3) -> Vec3 {
    v - project_on(v, normal)
}

/// Redirect `v` along the plane with `plane_normal`, keeping its magnitude.
///
/// The result stays in the vertical plane spanned by `v` and `up`, so walking up a slope
/// never drifts sideways. Vectors parallel to `up` have no tangent and give zero.
pub fn project_on_tangent(v: &Vec3, plane_normal: &Vec3, up: &Vec3) -> Vec3 {
    let magnitude = v.norm();
    if magnitude <= DIST_EPS {
        return Vec3::zeros();
    }
    let Some(axis) = v.cross(up).try_normalize(DIST_EPS) else {
        return Vec3::zeros();
    };
    match plane_normal.cross(&axis).try_normalize(DIST_EPS) {
        Some(tangent) => tangent * magnitude,
        None => Vec3::zeros(),
    }
}

/// Keep the part of `v` running along the crease between two planes.
///
/// Parallel planes have no crease; `v` is then projected on the second plane.
pub fn deflect(v: &Vec3, ground_normal: &Vec3, plane_normal: &Vec3) -> Vec3 {
    match ground_normal.cross(plane_normal).try_normalize(DIST_EPS) {
        Some(crease) => crease * v.dot(&crease),
        None => project_on_plane(v, plane_normal),
    }
}

/// Shortest rotation taking direction `from` onto `to`. Identity for degenerate input.
///
/// Opposite directions turn half a revolution about any axis perpendicular to `from`.
pub fn shortest_arc(from: &Vec3, to: &Vec3) -> Quat {
    if let Some(rotation) = Quat::rotation_between(from, to) {
        return rotation;
    }
    if from.dot(to) >= 0.0 {
        return Quat::identity();
    }
    from.cross(&Vec3::x())
        .try_normalize(DIST_EPS)
        .or_else(|| from.cross(&Vec3::z()).try_normalize(DIST_EPS))
        .map(|axis| Quat::from_axis_angle(&Unit::new_unchecked(axis), std::f32::consts::PI))
        .unwrap_or_else(Quat::identity)
}

/// Rotation looking along `forward` with `up` kept as the local +Y axis.
///
/// Returns `None` when `forward` has no component perpendicular to `up`.
pub fn look_rotation(forward: &Vec3, up: &Vec3) -> Option<Quat> {
    let planar = project_on_plane(forward, up).try_normalize(DIST_EPS)?;
    Some(Quat::face_towards(&planar, up))
}

/// Yaw `rotation` by the part of `delta` about `up`, leaving the up axis untouched.
pub fn yaw_only_forward(rotation: &Quat, delta: &Quat, up: &Vec3) -> Quat {
    let forward = rotation * Vec3::z();
    let turned = delta * forward;
    look_rotation(&turned, up).unwrap_or(*rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn angle_between_basic_cases() {
        assert_relative_eq!(angle_between(&Vec3::y(), &Vec3::x()), 90.0, epsilon = 1e-4);
        assert_relative_eq!(angle_between(&Vec3::y(), &-Vec3::y()), 180.0, epsilon = 1e-4);
        assert_eq!(angle_between(&Vec3::zeros(), &Vec3::x()), 0.0);
    }

    #[test]
    fn tangent_projection_follows_slope_and_keeps_magnitude() {
        let theta = 30f32.to_radians();
        let normal = Vec3::new(-theta.sin(), theta.cos(), 0.0);
        let out = project_on_tangent(&Vec3::new(2.0, 0.0, 0.0), &normal, &Vec3::y());
        assert_relative_eq!(out, Vec3::new(theta.cos(), theta.sin(), 0.0) * 2.0, epsilon = 1e-5);
    }

    #[test]
    fn tangent_projection_of_vertical_vector_is_zero() {
        let out = project_on_tangent(&Vec3::new(0.0, -1.0, 0.0), &Vec3::y(), &Vec3::y());
        assert_eq!(out, Vec3::zeros());
    }

    #[test]
    fn deflect_runs_along_crease() {
        // Flat ground and a wall facing -X: the crease is the Z axis.
        let out = deflect(&Vec3::new(1.0, 0.0, 1.0), &Vec3::y(), &-Vec3::x());
        assert_relative_eq!(out, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn yaw_only_forward_ignores_tilt() {
        let delta = Quat::from_axis_angle(&Vec3::z_axis(), 0.3)
            * Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2);
        let out = yaw_only_forward(&Quat::identity(), &delta, &Vec3::y());
        assert_relative_eq!(out * Vec3::y(), Vec3::y(), epsilon = 1e-5);
        let forward = out * Vec3::z();
        assert_relative_eq!(forward.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn shortest_arc_flips_opposite_directions() {
        let flip = shortest_arc(&Vec3::y(), &-Vec3::y());
        assert_relative_eq!(flip * Vec3::y(), -Vec3::y(), epsilon = 1e-5);
        let quarter = shortest_arc(&Vec3::y(), &Vec3::x());
        assert_relative_eq!(quarter * Vec3::y(), Vec3::x(), epsilon = 1e-5);
        assert_eq!(shortest_arc(&Vec3::zeros(), &Vec3::x()), Quat::identity());
    }
}
