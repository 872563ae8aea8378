/*!
Character controller tolerances and fixed tuning values.

These constants centralize the parameters used by the slide solver, the ground
prober and the contact classifier. Per-actor tuning lives in
[`ActorSettings`](crate::settings::ActorSettings); the values here are shared by
every actor.

Notes
- Distances are in meters, angles in degrees, time in seconds.
- Favor practical world-space tolerances over machine epsilon for robust behavior.
*/

/// Shell kept between the capsule and any surface (meters).
/// Casts use a radius shrunk by this amount so a resting body never starts overlapping.
pub const SKIN_WIDTH: f32 = 0.005;

/// Distance backed off from every swept hit before advancing (meters).
pub const CONTACT_OFFSET: f32 = 0.01;

/// Maximum number of slide iterations per solver call.
/// Any displacement left after the last iteration is dropped.
pub const MAX_SLIDE_ITERATIONS: u32 = 5;

/// Minimum squared movement threshold to consider a step meaningful (m^2).
/// Movements below this are treated as zero to avoid tiny oscillations.
pub const MIN_MOVE_SQ: f32 = 1.0e-8;

/// Practical small distance for comparisons (meters).
/// Use for dot-product guards, equality checks in world space, etc.
pub const DIST_EPS: f32 = 1.0e-6;

/// A predicted ground closer than this is accepted as ground by the airborne pipeline (meters).
pub const GROUND_CHECK_DISTANCE: f32 = 0.05;

/// Lookahead of the airborne ground prediction cast (meters).
pub const GROUND_PREDICTION_DISTANCE: f32 = 10.0;

/// A contact is a wall when its slope angle is within this tolerance of 90° (degrees).
pub const WALL_CONTACT_ANGLE_TOLERANCE: f32 = 3.0;

/// A contact is a head contact when its slope angle reaches this value (degrees).
pub const MIN_HEAD_CONTACT_ANGLE: f32 = 150.0;

/// Lower bound for the step offset, the height the bottom sphere is lifted when stepping (meters).
pub const COLLIDER_MIN_BOTTOM_OFFSET: f32 = 0.1;

/// Upper bound for the step offset as a fraction of the body height.
pub const MAX_STEP_HEIGHT_FRACTION: f32 = 0.75;

/// Lateral offset of the two edge-detection rays from the contact point (meters).
pub const EDGE_RAYS_SEPARATION: f32 = 0.01;

/// Length of the edge-detection rays (meters).
pub const EDGE_RAYS_CAST_DISTANCE: f32 = 0.25;

/// Upper and lower edge normals must differ by more than this to form an edge (degrees).
pub const MIN_EDGE_ANGLE: f32 = 0.5;

/// Gravity magnitude used for ground weight (meters per second squared).
pub const DEFAULT_GRAVITY: f32 = 9.8;

/// `force_grounded` searches from this fraction of the body height above the feet.
pub const FORCE_GROUNDED_HEIGHT_FRACTION: f32 = 0.8;

/// Ticks `force_not_grounded` suppresses re-grounding for when no count is given.
pub const DEFAULT_FORCE_NOT_GROUNDED_TICKS: u32 = 3;

/// Supported slope limit range (degrees).
pub const MIN_SLOPE_LIMIT: f32 = 1.0;
pub const MAX_SLOPE_LIMIT: f32 = 85.0;
