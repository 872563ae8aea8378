/*!
Ground probing.

After the grounded slide, the prober looks below the feet to decide what the actor
stands on:

- Stable ground: snap onto it (up or down within the step tolerances), optionally
  compensating for edges.
- Unstable ground close to the feet: keep contact but, if the actor was grounded,
  replay the move from the committed position as a full-body slide so steep steps
  cannot be climbed. The result is re-probed with a straight-down ray.
- Unstable ground farther away, or nothing: airborne, and the actor is told to stop
  re-grounding for a few ticks.
*/

use crate::character::sweep::{CollisionInfo, check_for_ground, check_for_ground_ray};
use crate::character::slide::{MotionContext, SlideSolver};
use crate::character::stability::{EdgeInfo, resolve_stable_normal, slope_angle};
use crate::collision::types::{BodyId, BodyKind, HitInfo, Vec3};
use crate::constants::SKIN_WIDTH;
use crate::utils::project_on;

/// What the actor stands on. `body == None` means airborne.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroundInfo {
    pub body: Option<BodyId>,
    pub kind: BodyKind,
    pub contact_point: Vec3,
    pub contact_normal: Vec3,
    /// Normal used for stability, after edge resolution.
    pub stable_normal: Vec3,
    /// Angle between up and `stable_normal` (degrees).
    pub slope_angle: f32,
    /// Angle between up and `contact_normal` (degrees).
    pub contact_slope_angle: f32,
    pub is_stable: bool,
    pub edge: Option<EdgeInfo>,
}

impl GroundInfo {
    pub fn from_collision(collision: &CollisionInfo, up: &Vec3, slope_limit: f32) -> Self {
        let hit = &collision.hit;
        let stable_normal = resolve_stable_normal(&hit.normal, collision.edge.as_ref(), up, slope_limit);
        let angle = slope_angle(&stable_normal, up);
        Self {
            body: Some(hit.body),
            kind: hit.kind,
            contact_point: hit.point,
            contact_normal: hit.normal,
            stable_normal,
            slope_angle: angle,
            contact_slope_angle: collision.contact_slope_angle,
            is_stable: angle <= slope_limit,
            edge: collision.edge,
        }
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.body.is_some()
    }

    #[inline]
    pub fn is_on_edge(&self) -> bool {
        self.edge.is_some()
    }

    /// The stable normal, or `up` when not standing on stable ground.
    #[inline]
    pub fn stable_normal_or(&self, up: &Vec3) -> Vec3 {
        if self.is_stable { self.stable_normal } else { *up }
    }
}

/// Inputs of one probe besides the position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbeRequest {
    pub step_down_distance: f32,
    pub was_grounded: bool,
    /// Position at the start of the tick, used to replay bad steps.
    pub committed_position: Vec3,
    /// The grounded displacement requested this tick.
    pub stable_displacement: Vec3,
    /// Ground plane the replayed slide starts from.
    pub ground_normal: Vec3,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProbeOutcome {
    pub position: Vec3,
    /// `None` means airborne.
    pub ground: Option<GroundInfo>,
    /// Nothing usable below: no hit, or unstable ground beyond the step tolerance.
    /// The actor suppresses re-grounding for a few ticks when this is set.
    pub lost_ground: bool,
    /// Position change made by the probe itself.
    pub probe_displacement: Vec3,
    /// Hits met while replaying a bad step.
    pub hits: Vec<HitInfo>,
}

pub struct GroundProber<'a> {
    ctx: MotionContext<'a>,
}

impl<'a> GroundProber<'a> {
    pub fn new(ctx: MotionContext<'a>) -> Self {
        Self { ctx }
    }

    /// Classify the ground below `position` and place the actor on it.
    pub fn probe(&self, position: Vec3, request: &ProbeRequest) -> ProbeOutcome {
        let ctx = &self.ctx;
        let up = ctx.shape.up;
        let settings = ctx.settings;
        let mut out = ProbeOutcome {
            position,
            ground: None,
            lost_ground: false,
            probe_displacement: Vec3::zeros(),
            hits: Vec::new(),
        };

        let Some(collision) = check_for_ground(
            ctx.caster,
            &ctx.shape,
            &position,
            ctx.step_offset,
            request.step_down_distance,
            &ctx.filter,
        ) else {
            out.lost_ground = true;
            return out;
        };
        let ground = GroundInfo::from_collision(&collision, &up, settings.slope_limit);

        if ground.is_stable {
            let mut snapped = position + collision.displacement;
            if settings.edge_compensation
                && collision
                    .edge
                    .is_some_and(|edge| edge.is_stable(settings.slope_limit))
            {
                snapped += project_on(&(collision.hit.point - snapped), &up);
            }
            out.position = snapped;
            out.probe_displacement = snapped - position;
            out.ground = Some(ground);
            return out;
        }

        if collision.hit.distance > ctx.step_offset + 2.0 * SKIN_WIDTH {
            out.lost_ground = true;
            return out;
        }

        let mut probe_position = position;
        if settings.prevent_bad_steps && request.was_grounded {
            let replay = SlideSolver::new(self.ctx)
                .with_ground_normal(request.ground_normal)
                .resolve(request.committed_position, request.stable_displacement, 0.0);
            probe_position = replay.position;
            out.hits = replay.hits;
            tracing::trace!(?probe_position, "unstable step replayed as full-body slide");
        }

        out.ground = check_for_ground_ray(
            ctx.caster,
            &ctx.shape,
            &probe_position,
            ctx.step_offset,
            request.step_down_distance,
            &ctx.filter,
        )
        .map(|collision| GroundInfo::from_collision(&collision, &up, settings.slope_limit));
        out.position = probe_position;
        out.probe_displacement = probe_position - position;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::body::{BodyShape, BodySize};
    use crate::collision::types::{HitFilter, Quat};
    use crate::collision::{CollisionWorld, cuboid_from_pose, plane_from_pose};
    use crate::settings::ActorSettings;
    use approx::assert_relative_eq;

    const R: f32 = 0.5;

    fn ctx<'a>(world: &'a CollisionWorld, settings: &'a ActorSettings) -> MotionContext<'a> {
        MotionContext::new(
            world,
            BodyShape::new(BodySize::new(2.0 * R, 2.0), Vec3::y()),
            settings,
            50.0,
            0.02,
            HitFilter::default(),
        )
    }

    fn request(position: Vec3, was_grounded: bool) -> ProbeRequest {
        ProbeRequest {
            step_down_distance: 0.5,
            was_grounded,
            committed_position: position,
            stable_displacement: Vec3::zeros(),
            ground_normal: Vec3::y(),
        }
    }

    /// Half-space through the origin rising toward +X at `deg`.
    fn slope(deg: f32) -> CollisionWorld {
        let rotation = Quat::from_axis_angle(&Vec3::z_axis(), deg.to_radians());
        CollisionWorld::build(vec![plane_from_pose(1, rotation, Vec3::zeros())])
    }

    /// Feet height above the slope surface at which the shrunk sphere rests on it.
    fn resting_offset(deg: f32) -> f32 {
        (R - SKIN_WIDTH) / deg.to_radians().cos() + SKIN_WIDTH - R
    }

    #[test]
    fn empty_world_is_not_grounded() {
        let world = CollisionWorld::build(vec![]);
        let settings = ActorSettings::default();
        let out = GroundProber::new(ctx(&world, &settings)).probe(Vec3::zeros(), &request(Vec3::zeros(), true));
        assert!(out.ground.is_none());
        assert!(out.lost_ground);
        assert_eq!(out.position, Vec3::zeros());
    }

    #[test]
    fn stable_ground_is_snapped_onto() {
        let world = CollisionWorld::build(vec![plane_from_pose(1, Quat::identity(), Vec3::zeros())]);
        let settings = ActorSettings::default();
        let start = Vec3::new(0.0, 0.25, 0.0);
        let out = GroundProber::new(ctx(&world, &settings)).probe(start, &request(start, true));
        let ground = out.ground.expect("floor is stable ground");
        assert!(ground.is_stable);
        assert_relative_eq!(out.position.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(out.probe_displacement.y, -0.25, epsilon = 1e-4);
    }

    #[test]
    fn slope_is_followed_at_resting_height() {
        let deg = 20.0;
        let world = slope(deg);
        let settings = ActorSettings::default();
        let x = 1.0;
        let surface = x * deg.to_radians().tan();
        let start = Vec3::new(x, surface + resting_offset(deg) + 0.1, 0.0);
        let out = GroundProber::new(ctx(&world, &settings)).probe(start, &request(start, true));
        let ground = out.ground.expect("walkable slope");
        assert!(ground.is_stable);
        assert_relative_eq!(ground.slope_angle, deg, epsilon = 1e-2);
        assert_relative_eq!(out.position.y, surface + resting_offset(deg), epsilon = 1e-3);
    }

    #[test]
    fn far_unstable_ground_is_airborne_even_when_grounded_before() {
        let deg = 70.0;
        let world = slope(deg);
        let settings = ActorSettings::default();
        let start = Vec3::new(0.0, resting_offset(deg) + 0.2, 0.0);
        let out = GroundProber::new(ctx(&world, &settings)).probe(start, &request(start, true));
        assert!(out.ground.is_none());
        assert!(out.lost_ground);
        assert_eq!(out.position, start);
    }

    #[test]
    fn squat_capsule_measures_unstable_distance_without_lift() {
        let deg = 70.0;
        let world = slope(deg);
        let settings = ActorSettings::default();
        let ctx = MotionContext::new(
            &world,
            BodyShape::new(BodySize::new(2.0 * R, 2.0 * R), Vec3::y()),
            &settings,
            50.0,
            0.02,
            HitFilter::default(),
        );
        assert_eq!(ctx.step_offset, 0.0);
        // Within the stepping threshold of a lifted capsule, beyond it for an unlifted one.
        let start = Vec3::new(0.0, resting_offset(deg) + 0.06, 0.0);
        let out = GroundProber::new(ctx).probe(start, &request(start, true));
        assert!(out.ground.is_none());
        assert!(out.lost_ground);
        assert_eq!(out.position, start);
    }

    #[test]
    fn near_unstable_ground_is_kept_as_unstable_contact() {
        let deg = 45.0;
        let world = slope(deg);
        let settings = ActorSettings {
            slope_limit: 30.0,
            ..Default::default()
        };
        let start = Vec3::new(0.0, resting_offset(deg), 0.0);
        let out = GroundProber::new(ctx(&world, &settings)).probe(start, &request(start, false));
        let ground = out.ground.expect("ray lands on the steep slope");
        assert!(!ground.is_stable);
        assert!(!out.lost_ground);
        assert_eq!(ground.body, Some(BodyId(1)));
    }

    #[test]
    fn bad_step_is_replayed_from_committed_position() {
        let deg = 45.0;
        let world = slope(deg);
        let settings = ActorSettings {
            slope_limit: 30.0,
            ..Default::default()
        };
        let committed = Vec3::new(0.0, resting_offset(deg), 0.0);
        // The grounded slide stepped up onto the steep face.
        let stepped = committed + Vec3::new(0.1, 0.1, 0.0);
        let req = ProbeRequest {
            stable_displacement: Vec3::new(0.1, 0.0, 0.0),
            ..request(committed, true)
        };
        let out = GroundProber::new(ctx(&world, &settings)).probe(stepped, &req);
        assert!(!out.hits.is_empty());
        assert!(out.position.x < committed.x + 0.02);
        assert!(out.ground.is_some_and(|g| !g.is_stable));
    }

    #[test]
    fn edge_with_walkable_top_is_stable_and_compensated() {
        // Box top at y = 0 for x < 0.
        let world = CollisionWorld::build(vec![cuboid_from_pose(
            1,
            Vec3::new(5.0, 2.0, 5.0),
            Vec3::new(-5.0, -2.0, 0.0),
            Quat::identity(),
        )]);
        let settings = ActorSettings {
            edge_compensation: true,
            ..Default::default()
        };
        let start = Vec3::new(0.45, 0.0, 0.0);
        let out = GroundProber::new(ctx(&world, &settings)).probe(start, &request(start, true));
        let ground = out.ground.expect("ledge corner");
        assert!(ground.is_on_edge());
        assert!(ground.is_stable);
        assert_relative_eq!(ground.stable_normal, Vec3::y(), epsilon = 1e-3);
        assert!(ground.contact_slope_angle > settings.slope_limit);
        // Compensation puts the feet at the corner height.
        assert_relative_eq!(out.position.y, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn stable_normal_defaults_to_up_when_unstable() {
        let info = GroundInfo {
            stable_normal: Vec3::x(),
            is_stable: false,
            ..Default::default()
        };
        assert_eq!(info.stable_normal_or(&Vec3::y()), Vec3::y());
        assert!(!info.is_grounded());
    }
}
