/*!
Collision root module.

Everything the character controller needs to ask the world about geometry,
using parry3d (through `rapier3d::parry`) for narrow-phase queries and a BVH
for broad-phase culling. The code is split for clarity:

- types:        shared data types (BodyId, BodyKind, HitFilter, HitInfo, etc.)
- caster:       the `ShapeCaster` query trait consumed by the controller
- broad:        broad-phase helpers (BVH, swept AABBs, candidate queries)
- narrow_phase: thin wrappers over parry3d queries (TOI, rays, intersections)
- world:        `CollisionWorld`, the concrete query world
*/

pub mod broad;
pub mod caster;
pub mod narrow_phase;
pub mod types;
pub mod world;

// Re-export commonly used types.
pub use caster::ShapeCaster;
pub use types::{BodyId, BodyKind, HitFilter, HitInfo, Iso, LayerMask, Quat, Vec3};
pub use world::{BodyDef, ColliderShapeDef, CollisionWorld, WorldBody};

/// Convenience: a static infinite floor through `translation` with normal `rotation * +Y`.
#[inline]
pub fn plane_from_pose(id: u32, rotation: Quat, translation: Vec3) -> BodyDef {
    BodyDef::fixed(
        id,
        translation,
        rotation,
        ColliderShapeDef::Plane {
            offset_along_normal: 0.0,
        },
    )
}

/// Convenience: a static cuboid with given half extents and pose.
#[inline]
pub fn cuboid_from_pose(id: u32, half_extents: Vec3, translation: Vec3, rotation: Quat) -> BodyDef {
    BodyDef::fixed(
        id,
        translation,
        rotation,
        ColliderShapeDef::Cuboid { half_extents },
    )
}
