/*!
Per-actor controller settings.

Defaults mirror a typical humanoid tuning. Every actor carries its own copy, so
different actors can walk different slopes or step different heights.
*/

use crate::collision::types::{LayerMask, Vec3};
use crate::constants::{DEFAULT_GRAVITY, MAX_SLOPE_LIMIT, MIN_SLOPE_LIMIT};
use crate::error::SettingsError;

/// Which velocity survives the post-tick bookkeeping.
///
/// - `InputVelocity`: the velocity requested by the caller before the tick.
/// - `PreSimulationVelocity`: the velocity the pipeline actually produced.
/// - `PostSimulationVelocity`: the produced velocity with ground and probe motion removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CharacterVelocityMode {
    InputVelocity,
    PreSimulationVelocity,
    #[default]
    PostSimulationVelocity,
}

/// Which way the up axis points relative to an [`UpReference`] point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpReferenceMode {
    /// Up points at the reference (standing on the inside of a shell).
    Towards,
    /// Up points away from the reference (walking around a planet).
    #[default]
    Away,
}

/// A point the constrained up axis is aimed at, or away from, every tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpReference {
    pub point: Vec3,
    pub mode: UpReferenceMode,
}

impl UpReference {
    pub fn new(point: Vec3, mode: UpReferenceMode) -> Self {
        Self { point, mode }
    }

    /// Up axis for a body at `position`; `None` when the body sits on the point.
    pub fn up_at(&self, position: &Vec3) -> Option<Vec3> {
        let towards = (self.point - position).try_normalize(f32::EPSILON)?;
        Some(match self.mode {
            UpReferenceMode::Towards => towards,
            UpReferenceMode::Away => -towards,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActorSettings {
    /// Steepest walkable slope (degrees, `[1, 85]`).
    pub slope_limit: f32,
    /// Highest step the actor walks onto (meters).
    pub step_up_distance: f32,
    /// Deepest drop the actor follows while staying grounded (meters).
    pub step_down_distance: f32,
    /// Snap the feet to the contact height when standing on a stable edge.
    pub edge_compensation: bool,
    /// Re-slide from the committed position when the probe lands on an unstable step.
    pub prevent_bad_steps: bool,
    /// Stop at walls instead of sliding along them.
    pub slide_on_walls: bool,
    /// Follow moving and rotating ground.
    pub support_dynamic_ground: bool,
    /// Yaw the actor with rotating ground.
    pub rotate_forward_direction: bool,
    /// Keep the actor's up axis aligned with `up_direction`.
    pub constrain_rotation: bool,
    pub up_direction: Vec3,
    /// Replaces `up_direction` with the direction to or from a point, looked up at the
    /// position the actor is heading to this tick.
    pub up_reference: Option<UpReference>,
    /// Per-second rate at which the body size approaches its target.
    pub size_lerp_speed: f32,
    /// Walk through dynamic bodies on `pushable_layers` instead of sliding on them.
    pub push_dynamic_bodies: bool,
    pub pushable_layers: LayerMask,
    /// Layers the actor collides with.
    pub collision_layers: LayerMask,
    /// Press on dynamic ground with the actor's weight.
    pub apply_weight_to_ground: bool,
    pub weight_gravity: f32,
    /// Never re-ground (for flying or swimming states).
    pub always_not_grounded: bool,
    /// Snap to ground when the actor is spawned into a world.
    pub force_grounded_at_start: bool,
    pub stable_velocity_mode: CharacterVelocityMode,
    pub unstable_velocity_mode: CharacterVelocityMode,
}

impl Default for ActorSettings {
    fn default() -> Self {
        Self {
            slope_limit: 60.0,
            step_up_distance: 0.5,
            step_down_distance: 0.5,
            edge_compensation: false,
            prevent_bad_steps: true,
            slide_on_walls: true,
            support_dynamic_ground: true,
            rotate_forward_direction: true,
            constrain_rotation: true,
            up_direction: Vec3::y(),
            up_reference: None,
            size_lerp_speed: 8.0,
            push_dynamic_bodies: true,
            pushable_layers: LayerMask::ALL,
            collision_layers: LayerMask::ALL,
            apply_weight_to_ground: true,
            weight_gravity: DEFAULT_GRAVITY,
            always_not_grounded: false,
            force_grounded_at_start: true,
            stable_velocity_mode: CharacterVelocityMode::PostSimulationVelocity,
            unstable_velocity_mode: CharacterVelocityMode::PostSimulationVelocity,
        }
    }
}

impl ActorSettings {
    /// Check the settings before an actor is built from them.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(MIN_SLOPE_LIMIT..=MAX_SLOPE_LIMIT).contains(&self.slope_limit) {
            return Err(SettingsError::SlopeLimitOutOfRange {
                value: self.slope_limit,
                min: MIN_SLOPE_LIMIT,
                max: MAX_SLOPE_LIMIT,
            });
        }
        check_distance("step_up_distance", self.step_up_distance)?;
        check_distance("step_down_distance", self.step_down_distance)?;
        check_distance("weight_gravity", self.weight_gravity)?;
        if !self.size_lerp_speed.is_finite() || self.size_lerp_speed < 0.0 {
            return Err(SettingsError::InvalidLerpSpeed(self.size_lerp_speed));
        }
        let up_len = self.up_direction.norm();
        if !up_len.is_finite() || up_len <= f32::EPSILON {
            return Err(SettingsError::InvalidUpDirection);
        }
        if self
            .up_reference
            .is_some_and(|reference| !reference.point.iter().all(|c| c.is_finite()))
        {
            return Err(SettingsError::InvalidUpReference);
        }
        Ok(())
    }

    /// Unit up direction.
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.up_direction.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y)
    }
}

fn check_distance(name: &'static str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SettingsError::InvalidDistance { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(ActorSettings::default().validate(), Ok(()));
    }

    #[test]
    fn slope_limit_outside_range_is_rejected() {
        let settings = ActorSettings {
            slope_limit: 89.0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::SlopeLimitOutOfRange { .. })
        ));
    }

    #[test]
    fn negative_step_distance_is_rejected() {
        let settings = ActorSettings {
            step_down_distance: -0.1,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::InvalidDistance {
                name: "step_down_distance",
                value: -0.1
            })
        );
    }

    #[test]
    fn zero_up_direction_is_rejected() {
        let settings = ActorSettings {
            up_direction: Vec3::zeros(),
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::InvalidUpDirection));
        assert_eq!(settings.up(), Vec3::y());
    }

    #[test]
    fn up_reference_aims_toward_or_away_from_its_point() {
        let center = Vec3::new(0.0, -10.0, 0.0);
        let position = Vec3::new(10.0, 0.0, 0.0);
        let diagonal = Vec3::new(1.0, 1.0, 0.0).normalize();

        let away = UpReference::new(center, UpReferenceMode::Away);
        let up = away.up_at(&position).expect("distinct points");
        assert_relative_eq!(up, diagonal, epsilon = 1e-6);

        let towards = UpReference::new(center, UpReferenceMode::Towards);
        let up = towards.up_at(&position).expect("distinct points");
        assert_relative_eq!(up, -diagonal, epsilon = 1e-6);

        assert!(away.up_at(&center).is_none());
    }

    #[test]
    fn non_finite_up_reference_is_rejected() {
        let settings = ActorSettings {
            up_reference: Some(UpReference::new(
                Vec3::new(f32::NAN, 0.0, 0.0),
                UpReferenceMode::Away,
            )),
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::InvalidUpReference));
    }
}
