//! Capsule body description and the geometry derived from it.

use crate::collision::types::Vec3;
use crate::constants::{
    COLLIDER_MIN_BOTTOM_OFFSET, MAX_STEP_HEIGHT_FRACTION, SKIN_WIDTH,
};
use crate::error::SettingsError;

/// Capsule dimensions: `width` is the diameter, `height` the full length (meters).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodySize {
    pub width: f32,
    pub height: f32,
}

impl BodySize {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.width * 0.5
    }

    /// Width must be positive and at least twice the skin; height must cover both hemispheres.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite()
            && self.height.is_finite()
            && self.width > 2.0 * SKIN_WIDTH
            && self.height >= self.width
    }

    /// Linear interpolation toward `target`, `t` clamped to `[0, 1]`.
    pub fn lerp(&self, target: &BodySize, t: f32) -> BodySize {
        let t = t.clamp(0.0, 1.0);
        BodySize {
            width: self.width + (target.width - self.width) * t,
            height: self.height + (target.height - self.height) * t,
        }
    }
}

impl Default for BodySize {
    fn default() -> Self {
        Self::new(1.0, 2.0)
    }
}

/// Physical description of an actor's body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CharacterBody {
    pub size: BodySize,
    /// Kilograms. Scales push reactions and ground weight.
    pub mass: f32,
}

impl CharacterBody {
    pub fn new(size: BodySize, mass: f32) -> Self {
        Self { size, mass }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.size.is_valid() {
            return Err(SettingsError::InvalidBodySize {
                width: self.size.width,
                height: self.size.height,
            });
        }
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(SettingsError::InvalidMass(self.mass));
        }
        Ok(())
    }
}

impl Default for CharacterBody {
    fn default() -> Self {
        Self::new(BodySize::default(), 50.0)
    }
}

/// Capsule geometry for one size and up axis.
///
/// Positions passed in are the actor's origin: the bottom-center of the capsule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyShape {
    pub size: BodySize,
    pub up: Vec3,
}

impl BodyShape {
    #[inline]
    pub fn new(size: BodySize, up: Vec3) -> Self {
        Self { size, up }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.size.radius()
    }

    /// Radius used by every cast, shrunk by the skin.
    #[inline]
    pub fn cast_radius(&self) -> f32 {
        (self.radius() - SKIN_WIDTH).max(0.0)
    }

    #[inline]
    pub fn center(&self, position: &Vec3) -> Vec3 {
        position + self.up * (self.size.height * 0.5)
    }

    /// Highest lift of the bottom hemisphere: it meets the top one.
    #[inline]
    pub fn max_bottom_offset(&self) -> f32 {
        (self.size.height - self.size.width).max(0.0)
    }

    /// Center of the bottom hemisphere, lifted by `bottom_offset`.
    ///
    /// Never rises above the top hemisphere center.
    #[inline]
    pub fn bottom_center(&self, position: &Vec3, bottom_offset: f32) -> Vec3 {
        position + self.up * (self.radius() + bottom_offset.clamp(0.0, self.max_bottom_offset()))
    }

    #[inline]
    pub fn top_center(&self, position: &Vec3) -> Vec3 {
        position + self.up * (self.size.height - self.radius())
    }

    /// Height the bottom sphere is lifted while stepping.
    ///
    /// Derived from the step-up distance and clamped to `[COLLIDER_MIN_BOTTOM_OFFSET,
    /// MAX_STEP_HEIGHT_FRACTION * height - radius]`.
    pub fn step_offset(&self, step_up_distance: f32) -> f32 {
        let max = (MAX_STEP_HEIGHT_FRACTION * self.size.height - self.radius())
            .max(COLLIDER_MIN_BOTTOM_OFFSET);
        (step_up_distance - self.radius()).clamp(COLLIDER_MIN_BOTTOM_OFFSET, max)
    }
}
