use super::types::{HitFilter, HitInfo, Vec3};

/// Swept-shape and overlap queries consumed by the character controller.
///
/// Implementations return the nearest blocking surface along the displacement, or `None`.
///
/// Contract
/// - `displacement` carries both direction and length; zero-length casts return `None`.
/// - Hits at distance zero (shapes that start overlapping) are not reported.
/// - Hits on `filter.exclude` are never reported.
/// - Reported normals face against the cast direction.
pub trait ShapeCaster {
    fn raycast(&self, origin: Vec3, displacement: Vec3, filter: &HitFilter) -> Option<HitInfo>;

    fn sphere_cast(
        &self,
        center: Vec3,
        radius: f32,
        displacement: Vec3,
        filter: &HitFilter,
    ) -> Option<HitInfo>;

    /// Cast a capsule defined by its two segment endpoints.
    fn capsule_cast(
        &self,
        bottom: Vec3,
        top: Vec3,
        radius: f32,
        displacement: Vec3,
        filter: &HitFilter,
    ) -> Option<HitInfo>;

    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: &HitFilter) -> bool;

    fn overlap_capsule(&self, bottom: Vec3, top: Vec3, radius: f32, filter: &HitFilter) -> bool;
}
