use nalgebra as na;
use rapier3d::parry::{
    bounding_volume::Aabb,
    partitioning::{Bvh, BvhBuildStrategy},
    shape::Shape,
};

use super::types::{Iso, Vec3};
use super::world::WorldBody;

/// Acceleration structure for broad-phase queries over the world bodies.
///
/// Notes:
/// - Finite shapes are stored as world-space AABBs inside a BVH.
/// - Half-spaces are infinite and are kept aside in `plane_indices`; every query reports them.
/// - `finite_indices` maps each BVH leaf back to its index in the body slice.
pub struct WorldAccel {
    /// BVH over finite body shapes (AABBs).
    pub bvh: Bvh,
    /// Indices into the body slice for the BVH leaves above.
    pub finite_indices: Vec<usize>,
    /// Indices into the body slice for half-spaces.
    pub plane_indices: Vec<usize>,
}

impl WorldAccel {
    /// Return true if this accelerator has no entries at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.finite_indices.is_empty() && self.plane_indices.is_empty()
    }

    /// Number of finite entries (AABBs) in this accelerator.
    #[inline]
    pub fn len(&self) -> usize {
        self.finite_indices.len()
    }

    /// Body indices whose AABB intersects `region`, half-spaces first.
    ///
    /// The returned indices are sorted so query results stay deterministic when two
    /// bodies report the same distance.
    pub fn candidates(&self, region: &Aabb) -> Vec<usize> {
        let mut out: Vec<usize> = self.plane_indices.clone();
        if !self.finite_indices.is_empty() {
            out.extend(
                self.bvh
                    .intersect_aabb(region)
                    .map(|leaf| self.finite_indices[leaf as usize]),
            );
        }
        out.sort_unstable();
        out
    }
}

/// Build the broad-phase accelerator over the given bodies.
///
/// - Finite shapes get a world-space AABB and are indexed.
/// - Half-spaces are kept in `plane_indices` and tested by every query.
pub fn build_world_accel(bodies: &[WorldBody]) -> WorldAccel {
    let mut aabbs: Vec<Aabb> = Vec::with_capacity(bodies.len());
    let mut finite_indices: Vec<usize> = Vec::with_capacity(bodies.len());
    let mut plane_indices: Vec<usize> = Vec::new();

    for (i, body) in bodies.iter().enumerate() {
        if body.is_plane() {
            plane_indices.push(i);
        } else {
            aabbs.push(body.shape.compute_aabb(&body.iso));
            finite_indices.push(i);
        }
    }

    WorldAccel {
        bvh: Bvh::from_leaves(BvhBuildStrategy::Binned, &aabbs),
        finite_indices,
        plane_indices,
    }
}

/// Compute a swept AABB for `shape` moving from `iso` by `displacement`.
///
/// The resulting AABB is inflated by `margin` to conservatively include near misses.
pub fn swept_shape_aabb(shape: &dyn Shape, iso: &Iso, displacement: &Vec3, margin: f32) -> Aabb {
    let start = shape.compute_aabb(iso);
    let mut end_iso = *iso;
    end_iso.translation.vector += displacement;
    let end = shape.compute_aabb(&end_iso);
    aabb_inflate(&aabb_union(&start, &end), margin)
}

/// AABB enclosing the segment `start -> start + displacement`, inflated by `margin`.
pub fn segment_aabb(start: &Vec3, displacement: &Vec3, margin: f32) -> Aabb {
    let a = na::Point3::from(*start);
    let b = na::Point3::from(*start + *displacement);
    aabb_inflate(&aabb_union(&Aabb::new(a, a), &Aabb::new(b, b)), margin)
}

/// Compute the union of two AABBs.
fn aabb_union(a: &Aabb, b: &Aabb) -> Aabb {
    let min = na::Point3::new(
        a.mins.x.min(b.mins.x),
        a.mins.y.min(b.mins.y),
        a.mins.z.min(b.mins.z),
    );
    let max = na::Point3::new(
        a.maxs.x.max(b.maxs.x),
        a.maxs.y.max(b.maxs.y),
        a.maxs.z.max(b.maxs.z),
    );
    Aabb {
        mins: min,
        maxs: max,
    }
}

/// Inflate an AABB by `margin` on all sides.
fn aabb_inflate(a: &Aabb, margin: f32) -> Aabb {
    if margin <= 0.0 {
        return *a;
    }
    let delta = na::Vector3::new(margin, margin, margin);
    Aabb {
        mins: a.mins - delta,
        maxs: a.maxs + delta,
    }
}
