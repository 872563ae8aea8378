//! The actor's own body: pose, velocity and the advisory move/rotate targets.

use crate::collision::types::{Quat, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActorBody {
    position: Vec3,
    rotation: Quat,
    velocity: Vec3,
    is_kinematic: bool,
    target_position: Option<Vec3>,
    target_rotation: Option<Quat>,
}

impl ActorBody {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            velocity: Vec3::zeros(),
            is_kinematic: false,
            target_position: None,
            target_rotation: None,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    #[inline]
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    #[inline]
    pub fn is_kinematic(&self) -> bool {
        self.is_kinematic
    }

    #[inline]
    pub fn set_kinematic(&mut self, is_kinematic: bool) {
        self.is_kinematic = is_kinematic;
    }

    /// Place the body immediately, dropping any pending target.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.target_position = None;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.target_rotation = None;
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::y()
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::z()
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::x()
    }

    /// Reach `target` over the next commit instead of teleporting.
    pub fn move_to(&mut self, target: Vec3) {
        self.target_position = Some(target);
    }

    pub fn rotate_to(&mut self, target: Quat) {
        self.target_rotation = Some(target);
    }

    #[inline]
    pub fn target_position(&self) -> Option<Vec3> {
        self.target_position
    }

    #[inline]
    pub fn target_rotation(&self) -> Option<Quat> {
        self.target_rotation
    }

    /// Apply pending targets. Moving sets the velocity that covers the distance in `dt`.
    pub fn commit(&mut self, dt: f32) {
        if let Some(target) = self.target_position.take() {
            if dt > 0.0 {
                self.velocity = (target - self.position) / dt;
            }
            self.position = target;
        }
        if let Some(target) = self.target_rotation.take() {
            self.rotation = target;
        }
    }
}
