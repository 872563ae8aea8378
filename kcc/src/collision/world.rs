//! In-memory query world over caller-defined collision bodies.
//!
//! Design goals
//! - Deterministic: given the same inputs (sorted by `id`), build identical in-memory sets.
//! - Query-focused: implements [`ShapeCaster`] for the character controller and
//!   [`GroundMotionProvider`] for moving-ground reconciliation.
//! - Bodies only move through explicit calls (`set_pose`, kinematic targets, rigid-body sync);
//!   the broad phase is rebuilt after each change.

use std::collections::BTreeMap;

use nalgebra as na;
use rapier3d::dynamics::RigidBody;
use rapier3d::parry::shape::{Capsule, Shape, ShapeType, SharedShape};

use super::broad::{WorldAccel, build_world_accel, segment_aabb, swept_shape_aabb};
use super::caster::ShapeCaster;
use super::narrow_phase::{BodyHit, cast_ray_against_body, cast_shape_against_body, intersects_body};
use super::types::{BodyId, BodyKind, HitFilter, HitInfo, Iso, Quat, Vec3};
use crate::character::platform::{GroundMotion, GroundMotionProvider};
use crate::constants::DIST_EPS;

/// Broad-phase inflation applied to every query region.
const QUERY_MARGIN: f32 = 0.01;

/// Canonical, schema-agnostic definition of a collision body.
///
/// Conventions
/// - Units are meters.
/// - Rotation is a unit quaternion.
/// - For planes, we use a pose-derived normal: `normal = rotation * +Y`,
///   and compute `dist = dot(normal, translation) + offset_along_normal`.
#[derive(Clone, Debug)]
pub struct BodyDef {
    /// Stable unique identifier used to ensure deterministic insertion order.
    pub id: u32,
    /// World-space translation.
    pub translation: Vec3,
    /// World-space rotation (unit quaternion).
    pub rotation: Quat,
    /// Collider shape parameters.
    pub shape: ColliderShapeDef,
    /// Collision layer index (`0..32`).
    pub layer: u8,
    pub kind: BodyKind,
    /// Trigger bodies report overlaps only and are skipped by filters with `ignore_triggers`.
    pub is_trigger: bool,
}

impl BodyDef {
    /// Static body on layer 0.
    pub fn fixed(id: u32, translation: Vec3, rotation: Quat, shape: ColliderShapeDef) -> Self {
        Self {
            id,
            translation,
            rotation,
            shape,
            layer: 0,
            kind: BodyKind::Static,
            is_trigger: false,
        }
    }

    pub fn kinematic(id: u32, translation: Vec3, rotation: Quat, shape: ColliderShapeDef) -> Self {
        Self {
            kind: BodyKind::Kinematic,
            ..Self::fixed(id, translation, rotation, shape)
        }
    }

    pub fn dynamic(id: u32, translation: Vec3, rotation: Quat, shape: ColliderShapeDef) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            ..Self::fixed(id, translation, rotation, shape)
        }
    }

    pub fn with_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }

    pub fn as_trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }
}

/// Supported collider shapes.
///
/// Keep this intentionally small and deterministic. Extend as needed.
#[derive(Clone, Debug)]
pub enum ColliderShapeDef {
    /// Infinite plane (half-space).
    ///
    /// This is represented by an offset along the plane normal.
    /// The plane normal is derived from the pose as `rotation * +Y`.
    Plane {
        /// Offset along the plane normal (meters).
        offset_along_normal: f32,
    },

    /// Oriented cuboid with given half-extents (meters).
    Cuboid { half_extents: Vec3 },

    /// Sphere/ball (meters).
    Sphere { radius: f32 },

    /// Y-aligned capsule (meters).
    CapsuleY { radius: f32, half_height: f32 },

    /// Y-aligned cylinder (meters).
    CylinderY { radius: f32, half_height: f32 },

    /// Y-aligned cone (meters).
    ConeY { radius: f32, half_height: f32 },

    /// Rounded cuboid (meters).
    ///
    /// `border_radius` rounds all edges/corners.
    RoundCuboid {
        half_extents: Vec3,
        border_radius: f32,
    },

    /// Y-aligned rounded cylinder (meters).
    RoundCylinderY {
        radius: f32,
        half_height: f32,
        border_radius: f32,
    },

    /// Y-aligned rounded cone (meters).
    RoundConeY {
        radius: f32,
        half_height: f32,
        border_radius: f32,
    },
}

/// Build the parry shape and world pose for a body definition.
fn shape_from_def(def: &BodyDef) -> (SharedShape, Iso) {
    let iso = Iso::from_parts(na::Translation3::from(def.translation), def.rotation);
    let shape = match &def.shape {
        ColliderShapeDef::Plane {
            offset_along_normal,
        } => {
            // Plane `n ⋅ x = dist`: half-space with world normal placed at `n * dist`.
            let n = def.rotation * Vec3::y();
            let dist = n.dot(&def.translation) + *offset_along_normal;
            let unit_n = na::Unit::new_normalize(n);
            return (
                SharedShape::halfspace(unit_n),
                Iso::translation(n.x * dist, n.y * dist, n.z * dist),
            );
        }
        ColliderShapeDef::Cuboid { half_extents } => {
            SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
        ColliderShapeDef::Sphere { radius } => SharedShape::ball(*radius),
        ColliderShapeDef::CapsuleY {
            radius,
            half_height,
        } => SharedShape::capsule_y(*half_height, *radius),
        ColliderShapeDef::CylinderY {
            radius,
            half_height,
        } => SharedShape::cylinder(*half_height, *radius),
        ColliderShapeDef::ConeY {
            radius,
            half_height,
        } => SharedShape::cone(*half_height, *radius),
        ColliderShapeDef::RoundCuboid {
            half_extents,
            border_radius,
        } => SharedShape::round_cuboid(
            half_extents.x,
            half_extents.y,
            half_extents.z,
            *border_radius,
        ),
        ColliderShapeDef::RoundCylinderY {
            radius,
            half_height,
            border_radius,
        } => SharedShape::round_cylinder(*half_height, *radius, *border_radius),
        ColliderShapeDef::RoundConeY {
            radius,
            half_height,
            border_radius,
        } => SharedShape::round_cone(*half_height, *radius, *border_radius),
    };
    (shape, iso)
}

/// A body stored in the [`CollisionWorld`].
#[derive(Clone)]
pub struct WorldBody {
    pub id: BodyId,
    pub iso: Iso,
    pub shape: SharedShape,
    pub layer: u8,
    pub kind: BodyKind,
    pub is_trigger: bool,
    /// Pose a kinematic body will reach at the end of the current tick.
    pub next_iso: Option<Iso>,
    pub linvel: Vec3,
    pub angvel: Vec3,
}

impl WorldBody {
    pub fn from_def(def: BodyDef) -> Self {
        let (shape, iso) = shape_from_def(&def);
        Self {
            id: BodyId(def.id),
            iso,
            shape,
            layer: def.layer,
            kind: def.kind,
            is_trigger: def.is_trigger,
            next_iso: None,
            linvel: Vec3::zeros(),
            angvel: Vec3::zeros(),
        }
    }

    #[inline]
    pub fn is_plane(&self) -> bool {
        self.shape.shape_type() == ShapeType::HalfSpace
    }

    fn passes(&self, filter: &HitFilter) -> bool {
        filter.layer_mask.contains(self.layer)
            && !(filter.ignore_rigid_bodies && self.kind.is_rigid_body())
            && !(filter.ignore_triggers && self.is_trigger)
            && filter.exclude != Some(self.id)
    }

    fn hit_info(&self, hit: BodyHit, direction: Vec3) -> HitInfo {
        HitInfo {
            point: hit.point,
            normal: hit.normal,
            distance: hit.distance,
            direction,
            body: self.id,
            kind: self.kind,
            layer: self.layer,
        }
    }

    /// Motion source for moving-ground reconciliation, `None` for static bodies.
    pub fn motion(&self) -> Option<GroundMotion> {
        match self.kind {
            BodyKind::Static => None,
            BodyKind::Kinematic => Some(GroundMotion::Kinematic {
                current: self.iso,
                next: self.next_iso.unwrap_or(self.iso),
            }),
            BodyKind::Dynamic => Some(GroundMotion::Rigid {
                center: self.iso.translation.vector,
                linvel: self.linvel,
                angvel: self.angvel,
            }),
        }
    }
}

/// Query world: bodies sorted by id plus a broad-phase accelerator.
pub struct CollisionWorld {
    bodies: Vec<WorldBody>,
    index: BTreeMap<BodyId, usize>,
    accel: WorldAccel,
}

impl CollisionWorld {
    /// Build a world from a list of body definitions.
    ///
    /// Determinism
    /// - The input is sorted by `id` before insertion.
    /// - Duplicate ids keep the first definition.
    pub fn build(mut defs: Vec<BodyDef>) -> Self {
        defs.sort_by_key(|d| d.id);

        let mut bodies: Vec<WorldBody> = Vec::with_capacity(defs.len());
        let mut index = BTreeMap::new();
        for def in defs {
            let id = BodyId(def.id);
            if index.contains_key(&id) {
                tracing::warn!(id = def.id, "duplicate body id ignored");
                continue;
            }
            index.insert(id, bodies.len());
            bodies.push(WorldBody::from_def(def));
        }

        let accel = build_world_accel(&bodies);
        Self {
            bodies,
            index,
            accel,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    #[inline]
    pub fn bodies(&self) -> &[WorldBody] {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> Option<&WorldBody> {
        self.index.get(&id).map(|&i| &self.bodies[i])
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut WorldBody> {
        let i = *self.index.get(&id)?;
        self.bodies.get_mut(i)
    }

    fn rebuild_accel(&mut self) {
        self.accel = build_world_accel(&self.bodies);
    }

    /// Teleport a body to `iso`. Returns false for unknown ids.
    pub fn set_pose(&mut self, id: BodyId, iso: Iso) -> bool {
        let Some(body) = self.body_mut(id) else {
            return false;
        };
        body.iso = iso;
        body.next_iso = None;
        self.rebuild_accel();
        true
    }

    /// Record the pose a kinematic body reaches at the end of this tick.
    ///
    /// Queries keep seeing the current pose until [`commit_kinematic_targets`](Self::commit_kinematic_targets).
    pub fn set_kinematic_target(&mut self, id: BodyId, target: Iso) -> bool {
        match self.body_mut(id) {
            Some(body) if body.kind == BodyKind::Kinematic => {
                body.next_iso = Some(target);
                true
            }
            _ => false,
        }
    }

    /// Move every kinematic body to its recorded target.
    pub fn commit_kinematic_targets(&mut self) {
        let mut moved = false;
        for body in &mut self.bodies {
            if let Some(next) = body.next_iso.take() {
                body.iso = next;
                moved = true;
            }
        }
        if moved {
            self.rebuild_accel();
        }
    }

    /// Set the sampled velocities of a dynamic body.
    pub fn set_rigid_velocity(&mut self, id: BodyId, linvel: Vec3, angvel: Vec3) -> bool {
        match self.body_mut(id) {
            Some(body) if body.kind == BodyKind::Dynamic => {
                body.linvel = linvel;
                body.angvel = angvel;
                true
            }
            _ => false,
        }
    }

    /// Mirror the pose and velocities of a rapier rigid body onto a moving world body.
    ///
    /// Static bodies are left untouched and report `false`.
    pub fn sync_rigid_body(&mut self, id: BodyId, rb: &RigidBody) -> bool {
        let Some(body) = self.body_mut(id).filter(|b| b.kind != BodyKind::Static) else {
            return false;
        };
        body.iso = *rb.position();
        body.linvel = *rb.linvel();
        body.angvel = *rb.angvel();
        body.next_iso = rb.is_kinematic().then(|| *rb.next_position());
        self.rebuild_accel();
        true
    }

    /// Nearest filtered hit of `shape` swept from `iso` by `displacement`.
    fn cast_shape(
        &self,
        shape: &dyn Shape,
        iso: &Iso,
        displacement: &Vec3,
        filter: &HitFilter,
    ) -> Option<HitInfo> {
        let length = displacement.norm();
        if !length.is_finite() || length <= DIST_EPS {
            return None;
        }
        let dir = displacement / length;
        let region = swept_shape_aabb(shape, iso, displacement, QUERY_MARGIN);

        let mut best: Option<HitInfo> = None;
        for i in self.accel.candidates(&region) {
            let body = &self.bodies[i];
            if !body.passes(filter) {
                continue;
            }
            let Some(hit) = cast_shape_against_body(iso, shape, &dir, length, body) else {
                continue;
            };
            if hit.distance <= 0.0 || !filter.accepts_distance(hit.distance) {
                continue;
            }
            if best.as_ref().is_none_or(|b| hit.distance < b.distance) {
                best = Some(body.hit_info(hit, dir));
            }
        }
        best
    }

    fn overlaps(&self, shape: &dyn Shape, iso: &Iso, filter: &HitFilter) -> bool {
        let region = swept_shape_aabb(shape, iso, &Vec3::zeros(), QUERY_MARGIN);
        self.accel
            .candidates(&region)
            .into_iter()
            .map(|i| &self.bodies[i])
            .filter(|body| body.passes(filter))
            .any(|body| intersects_body(iso, shape, body))
    }
}

/// Capsule shape centered at the segment midpoint, plus its world pose.
fn capsule_between(bottom: Vec3, top: Vec3, radius: f32) -> (Capsule, Iso) {
    let mid = (bottom + top) * 0.5;
    let capsule = Capsule::new(
        na::Point3::from(bottom - mid),
        na::Point3::from(top - mid),
        radius,
    );
    (capsule, Iso::translation(mid.x, mid.y, mid.z))
}

impl ShapeCaster for CollisionWorld {
    fn raycast(&self, origin: Vec3, displacement: Vec3, filter: &HitFilter) -> Option<HitInfo> {
        let length = displacement.norm();
        if !length.is_finite() || length <= DIST_EPS {
            return None;
        }
        let dir = displacement / length;
        let region = segment_aabb(&origin, &displacement, QUERY_MARGIN);

        let mut best: Option<HitInfo> = None;
        for i in self.accel.candidates(&region) {
            let body = &self.bodies[i];
            if !body.passes(filter) {
                continue;
            }
            let Some(hit) = cast_ray_against_body(&origin, &dir, length, body) else {
                continue;
            };
            if hit.distance <= 0.0 || !filter.accepts_distance(hit.distance) {
                continue;
            }
            if best.as_ref().is_none_or(|b| hit.distance < b.distance) {
                best = Some(body.hit_info(hit, dir));
            }
        }
        best
    }

    fn sphere_cast(
        &self,
        center: Vec3,
        radius: f32,
        displacement: Vec3,
        filter: &HitFilter,
    ) -> Option<HitInfo> {
        let ball = rapier3d::parry::shape::Ball::new(radius);
        let iso = Iso::translation(center.x, center.y, center.z);
        self.cast_shape(&ball, &iso, &displacement, filter)
    }

    fn capsule_cast(
        &self,
        bottom: Vec3,
        top: Vec3,
        radius: f32,
        displacement: Vec3,
        filter: &HitFilter,
    ) -> Option<HitInfo> {
        let (capsule, iso) = capsule_between(bottom, top, radius);
        self.cast_shape(&capsule, &iso, &displacement, filter)
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: &HitFilter) -> bool {
        let ball = rapier3d::parry::shape::Ball::new(radius);
        self.overlaps(&ball, &Iso::translation(center.x, center.y, center.z), filter)
    }

    fn overlap_capsule(&self, bottom: Vec3, top: Vec3, radius: f32, filter: &HitFilter) -> bool {
        let (capsule, iso) = capsule_between(bottom, top, radius);
        self.overlaps(&capsule, &iso, filter)
    }
}

impl GroundMotionProvider for CollisionWorld {
    fn ground_motion(&self, body: BodyId) -> Option<GroundMotion> {
        self.body(body).and_then(WorldBody::motion)
    }
}
