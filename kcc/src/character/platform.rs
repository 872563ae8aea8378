/*!
Moving-ground reconciliation.

Ground that moves contributes a displacement (and a rotation) to whatever stands
on it. Two motion sources are supported behind one sampling interface:

- Kinematic: the body's current pose and the pose it reaches at the end of the tick.
  The point is carried rigidly from one pose to the other.
- Rigid: a simulated body's velocities. The point moves with the body's velocity
  at that point; the rotation is the shortest arc the point swept around the center.

Bindings cache, per body identity, whether that body has a motion source. The
current binding follows the actor's ground and is dropped when the ground changes
or stops being stable.
*/

use std::collections::BTreeMap;

use rapier3d::dynamics::RigidBody;

use crate::collision::types::{BodyId, Iso, Quat, Vec3};
use crate::utils::shortest_arc;

/// Motion source of a body that can carry an actor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GroundMotion {
    Kinematic { current: Iso, next: Iso },
    Rigid { center: Vec3, linvel: Vec3, angvel: Vec3 },
}

/// What a ground point does over one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSample {
    pub displacement: Vec3,
    pub delta_rotation: Quat,
}

impl MotionSample {
    pub fn still() -> Self {
        Self {
            displacement: Vec3::zeros(),
            delta_rotation: Quat::identity(),
        }
    }
}

impl GroundMotion {
    /// Adapt a rapier rigid body. Fixed bodies have no motion.
    pub fn from_rigid_body(body: &RigidBody) -> Option<Self> {
        if body.is_fixed() {
            return None;
        }
        if body.is_kinematic() {
            return Some(GroundMotion::Kinematic {
                current: *body.position(),
                next: *body.next_position(),
            });
        }
        Some(GroundMotion::Rigid {
            center: body.center_of_mass().coords,
            linvel: *body.linvel(),
            angvel: *body.angvel(),
        })
    }

    /// Motion of `point` over `dt` seconds.
    pub fn sample_motion(&self, point: &Vec3, dt: f32) -> MotionSample {
        match self {
            GroundMotion::Kinematic { current, next } => {
                let delta_rotation = next.rotation * current.rotation.inverse();
                let local = point - current.translation.vector;
                let carried = next.translation.vector + delta_rotation * local;
                MotionSample {
                    displacement: carried - point,
                    delta_rotation,
                }
            }
            GroundMotion::Rigid {
                center,
                linvel,
                angvel,
            } => {
                let arm = point - center;
                let velocity = linvel + angvel.cross(&arm);
                let displacement = velocity * dt;
                MotionSample {
                    displacement,
                    delta_rotation: shortest_arc(&arm, &(arm + displacement)),
                }
            }
        }
    }
}

/// Source of moving-ground motion, queried by body identity.
pub trait GroundMotionProvider {
    fn ground_motion(&self, body: BodyId) -> Option<GroundMotion>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroundBinding {
    pub body: BodyId,
    /// The body had a motion source when first seen.
    pub is_dynamic: bool,
}

/// Per-actor cache of ground bindings keyed by body.
///
/// Holds at most one entry per body of the world the actor walks on, since a
/// `CollisionWorld` never removes bodies. `clear` empties it (teleport).
#[derive(Clone, Debug, Default)]
pub struct GroundBindings {
    known: BTreeMap<BodyId, GroundBinding>,
    current: Option<GroundBinding>,
}

impl GroundBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `body` the current ground, creating its binding on first contact.
    pub fn observe<P>(&mut self, body: BodyId, provider: &P) -> GroundBinding
    where
        P: GroundMotionProvider + ?Sized,
    {
        if let Some(current) = self.current.filter(|c| c.body == body) {
            return current;
        }
        let binding = *self.known.entry(body).or_insert_with(|| {
            let binding = GroundBinding {
                body,
                is_dynamic: provider.ground_motion(body).is_some(),
            };
            tracing::trace!(body = body.0, dynamic = binding.is_dynamic, "ground binding created");
            binding
        });
        self.current = Some(binding);
        binding
    }

    #[inline]
    pub fn current(&self) -> Option<GroundBinding> {
        self.current
    }

    #[inline]
    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// Number of bodies with a cached binding.
    #[inline]
    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    pub fn clear(&mut self) {
        self.known.clear();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra as na;
    use rapier3d::dynamics::RigidBodyBuilder;
    use std::cell::Cell;

    #[test]
    fn kinematic_translation_moves_point_rigidly() {
        let motion = GroundMotion::Kinematic {
            current: Iso::identity(),
            next: Iso::translation(0.5, 0.0, -0.25),
        };
        let sample = motion.sample_motion(&Vec3::new(3.0, 1.0, 2.0), 0.02);
        assert_relative_eq!(sample.displacement, Vec3::new(0.5, 0.0, -0.25), epsilon = 1e-6);
        assert_relative_eq!(sample.delta_rotation.angle(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn kinematic_rotation_carries_point_around_pivot() {
        let quarter = Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2);
        let motion = GroundMotion::Kinematic {
            current: Iso::identity(),
            next: Iso::from_parts(na::Translation3::identity(), quarter),
        };
        let sample = motion.sample_motion(&Vec3::new(1.0, 0.0, 0.0), 0.02);
        // +X rotated a quarter turn about +Y lands on -Z.
        assert_relative_eq!(sample.displacement, Vec3::new(-1.0, 0.0, -1.0), epsilon = 1e-5);
        assert_relative_eq!(sample.delta_rotation.angle(), std::f32::consts::FRAC_PI_2, epsilon = 1e-5);
    }

    #[test]
    fn rigid_sampling_uses_point_velocity() {
        let motion = GroundMotion::Rigid {
            center: Vec3::zeros(),
            linvel: Vec3::new(1.0, 0.0, 0.0),
            angvel: Vec3::new(0.0, 2.0, 0.0),
        };
        let sample = motion.sample_motion(&Vec3::new(0.0, 0.0, 1.0), 0.1);
        // v = linvel + w x r = (1,0,0) + (2,0,0).
        assert_relative_eq!(sample.displacement, Vec3::new(0.3, 0.0, 0.0), epsilon = 1e-6);
        assert!(sample.delta_rotation.angle() > 0.0);
    }

    #[test]
    fn rapier_bodies_adapt_to_motion_sources() {
        let fixed = RigidBodyBuilder::fixed().build();
        assert!(GroundMotion::from_rigid_body(&fixed).is_none());

        let dynamic = RigidBodyBuilder::dynamic()
            .linvel(na::Vector3::new(2.0, 0.0, 0.0))
            .build();
        let sample = GroundMotion::from_rigid_body(&dynamic)
            .expect("dynamic body moves")
            .sample_motion(&Vec3::zeros(), 0.5);
        assert_relative_eq!(sample.displacement, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);

        let mut kinematic = RigidBodyBuilder::kinematic_position_based().build();
        kinematic.set_next_kinematic_translation(na::Vector3::new(0.0, 0.0, 3.0));
        let sample = GroundMotion::from_rigid_body(&kinematic)
            .expect("kinematic body moves")
            .sample_motion(&Vec3::new(1.0, 0.0, 0.0), 0.5);
        assert_relative_eq!(sample.displacement, Vec3::new(0.0, 0.0, 3.0), epsilon = 1e-6);
    }

    struct CountingProvider {
        calls: Cell<u32>,
    }

    impl GroundMotionProvider for CountingProvider {
        fn ground_motion(&self, body: BodyId) -> Option<GroundMotion> {
            self.calls.set(self.calls.get() + 1);
            (body.0 == 2).then_some(GroundMotion::Rigid {
                center: Vec3::zeros(),
                linvel: Vec3::zeros(),
                angvel: Vec3::zeros(),
            })
        }
    }

    #[test]
    fn bindings_are_created_once_per_identity() {
        let provider = CountingProvider {
            calls: Cell::new(0),
        };
        let mut bindings = GroundBindings::new();
        assert!(!bindings.observe(BodyId(1), &provider).is_dynamic);
        assert!(bindings.observe(BodyId(2), &provider).is_dynamic);
        bindings.observe(BodyId(2), &provider);
        bindings.observe(BodyId(1), &provider);
        assert_eq!(provider.calls.get(), 2);
        assert_eq!(bindings.known_len(), 2);
        assert_eq!(bindings.current().map(|b| b.body), Some(BodyId(1)));

        bindings.clear_current();
        assert!(bindings.current().is_none());
        assert_eq!(bindings.known_len(), 2);
    }

    #[test]
    fn switching_grounds_does_not_grow_the_cache() {
        let provider = CountingProvider {
            calls: Cell::new(0),
        };
        let mut bindings = GroundBindings::new();
        for step in 0..100u32 {
            bindings.observe(BodyId(1 + step % 2), &provider);
            bindings.clear_current();
        }
        assert_eq!(bindings.known_len(), 2);
        assert_eq!(provider.calls.get(), 2);

        bindings.clear();
        assert_eq!(bindings.known_len(), 0);
    }
}
