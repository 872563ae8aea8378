use thiserror::Error;

/// Rejected actor configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("slope limit {value}° is outside the supported range [{min}°, {max}°]")]
    SlopeLimitOutOfRange { value: f32, min: f32, max: f32 },

    #[error("{name} must be a finite, non-negative distance (got {value})")]
    InvalidDistance { name: &'static str, value: f32 },

    #[error("body size {width}x{height} is invalid: width must be positive and height at least width")]
    InvalidBodySize { width: f32, height: f32 },

    #[error("mass must be positive (got {0})")]
    InvalidMass(f32),

    #[error("size lerp speed must be non-negative (got {0})")]
    InvalidLerpSpeed(f32),

    #[error("up direction must be a non-zero finite vector")]
    InvalidUpDirection,

    #[error("up reference point must be finite")]
    InvalidUpReference,
}
