/*!
Stability classification.

Pure functions deciding whether a surface can be stood on, whether a contact is
a wall or a head contact, and which normal to trust when the body rests on an
edge between two faces.

Notes
- All angles are in degrees and measured against the actor's up direction.
- A slope exactly at the limit is stable.
*/

use crate::character::contact::{Contact, ContactTag};
use crate::collision::types::Vec3;
use crate::constants::{MIN_HEAD_CONTACT_ANGLE, WALL_CONTACT_ANGLE_TOLERANCE};
use crate::utils::angle_between;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stability {
    Stable,
    Unstable,
}

/// Angle between a surface normal and up (degrees).
#[inline]
pub fn slope_angle(normal: &Vec3, up: &Vec3) -> f32 {
    angle_between(up, normal)
}

pub fn classify(normal: &Vec3, up: &Vec3, slope_limit: f32) -> Stability {
    if slope_angle(normal, up) <= slope_limit {
        Stability::Stable
    } else {
        Stability::Unstable
    }
}

#[inline]
pub fn is_wall(angle: f32) -> bool {
    (angle - 90.0).abs() <= WALL_CONTACT_ANGLE_TOLERANCE
}

#[inline]
pub fn is_head(angle: f32) -> bool {
    angle >= MIN_HEAD_CONTACT_ANGLE
}

pub fn contact_tag(angle: f32, slope_limit: f32) -> ContactTag {
    if is_wall(angle) {
        ContactTag::Wall
    } else if is_head(angle) {
        ContactTag::Head
    } else if angle <= slope_limit {
        ContactTag::Ground
    } else {
        ContactTag::None
    }
}

/// Two faces meeting under a ground contact.
///
/// `upper` is the face on the body's side of the contact, `lower` the face beyond it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeInfo {
    pub upper_normal: Vec3,
    pub lower_normal: Vec3,
    pub upper_slope_angle: f32,
    pub lower_slope_angle: f32,
    /// Angle between the two face normals (degrees).
    pub edge_angle: f32,
}

impl EdgeInfo {
    pub fn new(upper_normal: Vec3, lower_normal: Vec3, up: &Vec3) -> Self {
        Self {
            upper_normal,
            lower_normal,
            upper_slope_angle: slope_angle(&upper_normal, up),
            lower_slope_angle: slope_angle(&lower_normal, up),
            edge_angle: angle_between(&upper_normal, &lower_normal),
        }
    }

    /// The face the body stands on is walkable.
    #[inline]
    pub fn is_stable(&self, slope_limit: f32) -> bool {
        self.upper_slope_angle <= slope_limit
    }
}

/// Normal used for stability when the contact may be an edge.
///
/// Algorithm
/// - No edge: the raw hit normal.
/// - Both faces walkable: up.
/// - Otherwise the first walkable face, upper before lower.
/// - Neither walkable: the raw hit normal.
pub fn resolve_stable_normal(
    normal: &Vec3,
    edge: Option<&EdgeInfo>,
    up: &Vec3,
    slope_limit: f32,
) -> Vec3 {
    let Some(edge) = edge else {
        return *normal;
    };
    let upper_ok = edge.upper_slope_angle <= slope_limit;
    let lower_ok = edge.lower_slope_angle <= slope_limit;
    match (upper_ok, lower_ok) {
        (true, true) => *up,
        (true, false) => edge.upper_normal,
        (false, true) => edge.lower_normal,
        (false, false) => *normal,
    }
}

/// First wall contact and first head contact of a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContactSummary {
    pub wall: Option<Contact>,
    pub head: Option<Contact>,
}

impl ContactSummary {
    pub fn from_contacts(contacts: &[Contact]) -> Self {
        Self {
            wall: contacts.iter().find(|c| is_wall(c.slope_angle)).copied(),
            head: contacts.iter().find(|c| is_head(c.slope_angle)).copied(),
        }
    }
}
