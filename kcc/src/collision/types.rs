/*!
Core collision types and math aliases shared by the collision submodules.

This module intentionally contains no algorithms. It defines the data types
exchanged between:
- broad (world acceleration structure and candidate queries)
- narrow_phase (parry3d time-of-impact, ray and intersection queries)
- world (the concrete shape-cast provider)
- the character controller (slide solver, ground prober, reconciler)

Notes
- Body identities are opaque handles chosen by the caller. The controller only ever
  compares them; it never holds a reference to the body itself.
- A cast result always carries the identity, motion class and layer of the body that
  was hit so the controller can decide how to react (push, ride, slide) without a
  second lookup.
*/

use nalgebra as na;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

/// Opaque identity of a collision body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

/// How a body moves, as seen by the character controller.
///
/// - `Static`: never moves.
/// - `Kinematic`: moved by its owner through explicit target poses.
/// - `Dynamic`: simulated; its motion is sampled through its velocities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BodyKind {
    #[default]
    Static,
    Kinematic,
    Dynamic,
}

impl BodyKind {
    /// True for anything backed by a rigid body (kinematic or dynamic).
    #[inline]
    pub fn is_rigid_body(self) -> bool {
        !matches!(self, BodyKind::Static)
    }

    #[inline]
    pub fn is_dynamic(self) -> bool {
        matches!(self, BodyKind::Dynamic)
    }
}

/// A 32-bit collision layer mask. Layer indices are `0..32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    pub const NONE: LayerMask = LayerMask(0);

    /// Mask containing a single layer. Out-of-range layers produce an empty mask.
    #[inline]
    pub const fn from_layer(layer: u8) -> Self {
        if layer < 32 {
            LayerMask(1 << layer)
        } else {
            LayerMask::NONE
        }
    }

    #[inline]
    pub const fn with(self, layer: u8) -> Self {
        LayerMask(self.0 | LayerMask::from_layer(layer).0)
    }

    #[inline]
    pub const fn without(self, layer: u8) -> Self {
        LayerMask(self.0 & !LayerMask::from_layer(layer).0)
    }

    #[inline]
    pub const fn contains(self, layer: u8) -> bool {
        layer < 32 && (self.0 & (1 << layer)) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

/// Filter applied to every cast and overlap query.
///
/// - `layer_mask`: only bodies on these layers are considered.
/// - `ignore_rigid_bodies`: skip kinematic and dynamic bodies.
/// - `ignore_triggers`: skip trigger (sensor) bodies.
/// - `min_distance` / `max_distance`: hits outside this range are discarded.
/// - `exclude`: a body that is never reported (usually the caster's own body).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitFilter {
    pub layer_mask: LayerMask,
    pub ignore_rigid_bodies: bool,
    pub ignore_triggers: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    pub exclude: Option<BodyId>,
}

impl HitFilter {
    #[inline]
    pub fn new(layer_mask: LayerMask, ignore_rigid_bodies: bool, ignore_triggers: bool) -> Self {
        Self {
            layer_mask,
            ignore_rigid_bodies,
            ignore_triggers,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            exclude: None,
        }
    }

    #[inline]
    pub fn with_distance_range(mut self, min_distance: f32, max_distance: f32) -> Self {
        self.min_distance = min_distance;
        self.max_distance = max_distance;
        self
    }

    #[inline]
    pub fn excluding(mut self, body: Option<BodyId>) -> Self {
        self.exclude = body;
        self
    }

    #[inline]
    pub fn accepts_distance(&self, distance: f32) -> bool {
        distance >= self.min_distance && distance <= self.max_distance
    }
}

impl Default for HitFilter {
    fn default() -> Self {
        Self::new(LayerMask::ALL, false, true)
    }
}

/// Nearest blocking surface reported by a cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitInfo {
    /// World-space contact point on the surface that was hit.
    pub point: Vec3,
    /// World-space unit normal of the surface, facing against the cast direction.
    pub normal: Vec3,
    /// Distance travelled along the cast direction before the hit (meters).
    pub distance: f32,
    /// Unit cast direction.
    pub direction: Vec3,
    pub body: BodyId,
    pub kind: BodyKind,
    pub layer: u8,
}
