/*!
Collide-and-slide.

Two solvers share one sweep loop shape:

- `resolve` (grounded): displacement runs along the ground. Walkable hits become the
  new ground plane; non-walkable hits are slid along the crease they form with the
  ground, and a second non-walkable hit facing the first ends the motion.
- `resolve_unstable` (airborne or on steep ground): plain clip-and-slide against every
  hit, reactive forces on dynamic bodies, then an optional ground prediction cast.

Both stop after `MAX_SLIDE_ITERATIONS`; whatever displacement is left is dropped.
*/

use crate::character::body::BodyShape;
use crate::character::events::BodyForce;
use crate::character::sweep::{CollisionInfo, cast_body, check_for_ground};
use crate::collision::caster::ShapeCaster;
use crate::collision::types::{HitFilter, HitInfo, Vec3};
use crate::constants::{GROUND_PREDICTION_DISTANCE, MAX_SLIDE_ITERATIONS, MIN_MOVE_SQ};
use crate::settings::ActorSettings;
use crate::utils::{deflect, project_on_plane, project_on_tangent};

/// Everything a solver or prober call needs to query the world for one actor.
#[derive(Clone, Copy)]
pub struct MotionContext<'a> {
    pub caster: &'a dyn ShapeCaster,
    pub shape: BodyShape,
    pub settings: &'a ActorSettings,
    pub mass: f32,
    pub dt: f32,
    pub filter: HitFilter,
    /// Height the bottom sphere is lifted while stepping, within the capsule's lift range.
    pub step_offset: f32,
}

impl<'a> MotionContext<'a> {
    pub fn new(
        caster: &'a dyn ShapeCaster,
        shape: BodyShape,
        settings: &'a ActorSettings,
        mass: f32,
        dt: f32,
        filter: HitFilter,
    ) -> Self {
        Self {
            caster,
            shape,
            settings,
            mass,
            dt,
            filter,
            step_offset: shape
                .step_offset(settings.step_up_distance)
                .min(shape.max_bottom_offset()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SlideOutcome {
    pub position: Vec3,
    /// Every blocking hit, in the order met.
    pub hits: Vec<HitInfo>,
    pub forces: Vec<BodyForce>,
}

impl SlideOutcome {
    fn at(position: Vec3) -> Self {
        Self {
            position,
            hits: Vec::new(),
            forces: Vec::new(),
        }
    }
}

/// Ground found by the airborne prediction cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GroundPrediction {
    /// Re-grounding is suppressed; no cast was made.
    Skipped,
    /// Nothing within the lookahead.
    Nothing,
    /// `distance` is how far the feet are from the surface found.
    Found {
        collision: CollisionInfo,
        distance: f32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnstableOutcome {
    pub slide: SlideOutcome,
    pub prediction: GroundPrediction,
}

/// Constraint planes of one grounded slide.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SlidePlanes {
    pub ground: Vec3,
    pub sliding: Option<Vec3>,
}

impl SlidePlanes {
    /// Redirect the remaining displacement after a hit with `normal`.
    pub(crate) fn redirect(
        &mut self,
        displacement: &Vec3,
        normal: &Vec3,
        slope_angle: f32,
        up: &Vec3,
        slope_limit: f32,
    ) -> Vec3 {
        if slope_angle > slope_limit {
            let out = match self.sliding {
                Some(previous) if normal.dot(&previous) <= 0.0 => Vec3::zeros(),
                _ => deflect(displacement, &self.ground, normal),
            };
            self.sliding = Some(*normal);
            out
        } else {
            self.ground = *normal;
            self.sliding = None;
            project_on_tangent(displacement, normal, up)
        }
    }
}

pub struct SlideSolver<'a> {
    ctx: MotionContext<'a>,
    ground_normal: Vec3,
    wall_collision: bool,
}

impl<'a> SlideSolver<'a> {
    pub fn new(ctx: MotionContext<'a>) -> Self {
        Self {
            ground_normal: ctx.shape.up,
            wall_collision: false,
            ctx,
        }
    }

    /// Initial ground plane (the actor's stable normal).
    pub fn with_ground_normal(mut self, normal: Vec3) -> Self {
        self.ground_normal = normal;
        self
    }

    /// A wall contact was flagged on the previous tick (used when wall sliding is off).
    pub fn with_wall_collision(mut self, wall_collision: bool) -> Self {
        self.wall_collision = wall_collision;
        self
    }

    fn is_pushable(&self, hit: &HitInfo) -> bool {
        let settings = self.ctx.settings;
        settings.push_dynamic_bodies
            && hit.kind.is_dynamic()
            && settings.pushable_layers.contains(hit.layer)
    }

    /// Grounded collide-and-slide.
    ///
    /// `bottom_offset` lifts the bottom sphere: the step offset while walking, zero for a
    /// full-body sweep.
    pub fn resolve(&self, position: Vec3, displacement: Vec3, bottom_offset: f32) -> SlideOutcome {
        let ctx = &self.ctx;
        let up = ctx.shape.up;
        let slope_limit = ctx.settings.slope_limit;

        let mut out = SlideOutcome::at(position);
        let mut remaining = displacement;
        let mut planes = SlidePlanes {
            ground: self.ground_normal,
            sliding: None,
        };

        for _ in 0..MAX_SLIDE_ITERATIONS {
            if remaining.norm_squared() <= MIN_MOVE_SQ {
                break;
            }

            let Some(collision) = cast_body(
                ctx.caster,
                &ctx.shape,
                &out.position,
                &remaining,
                bottom_offset,
                &ctx.filter,
            ) else {
                // No hit → move fully and finish.
                out.position += remaining;
                remaining = Vec3::zeros();
                break;
            };
            out.hits.push(collision.hit);

            if self.is_pushable(&collision.hit) {
                out.position += remaining;
                remaining = Vec3::zeros();
                break;
            }

            if !ctx.settings.slide_on_walls {
                if !self.wall_collision {
                    out.position += collision.displacement;
                }
                remaining = Vec3::zeros();
                break;
            }

            out.position += collision.displacement;
            remaining -= collision.displacement;
            remaining = planes.redirect(
                &remaining,
                &collision.hit.normal,
                collision.contact_slope_angle,
                &up,
                slope_limit,
            );
        }

        if remaining.norm_squared() > MIN_MOVE_SQ {
            tracing::trace!(remaining = ?remaining, "slide truncated at iteration cap");
        }
        out
    }

    /// Airborne collide-and-slide with reactive forces and ground prediction.
    ///
    /// With `predict_ground` off the prediction is [`GroundPrediction::Skipped`].
    pub fn resolve_unstable(
        &self,
        position: Vec3,
        displacement: Vec3,
        predict_ground: bool,
    ) -> UnstableOutcome {
        let ctx = &self.ctx;
        let mut out = SlideOutcome::at(position);
        let mut remaining = displacement;

        for _ in 0..MAX_SLIDE_ITERATIONS {
            if remaining.norm_squared() <= MIN_MOVE_SQ {
                break;
            }

            let Some(collision) =
                cast_body(ctx.caster, &ctx.shape, &out.position, &remaining, 0.0, &ctx.filter)
            else {
                out.position += remaining;
                break;
            };
            out.hits.push(collision.hit);

            out.position += collision.displacement;
            remaining -= collision.displacement;

            if self.is_pushable(&collision.hit) && ctx.dt > 0.0 {
                out.forces.push(BodyForce {
                    body: collision.hit.body,
                    force: remaining * (ctx.mass / ctx.dt),
                    point: out.position,
                });
            }

            remaining = project_on_plane(&remaining, &collision.hit.normal);
        }

        let prediction = if predict_ground {
            match check_for_ground(
                ctx.caster,
                &ctx.shape,
                &out.position,
                ctx.step_offset,
                GROUND_PREDICTION_DISTANCE,
                &ctx.filter,
            ) {
                Some(collision) => GroundPrediction::Found {
                    distance: collision.displacement.norm(),
                    collision,
                },
                None => GroundPrediction::Nothing,
            }
        } else {
            GroundPrediction::Skipped
        };

        UnstableOutcome {
            slide: out,
            prediction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::body::BodySize;
    use crate::collision::types::{BodyId, LayerMask, Quat};
    use crate::collision::{BodyDef, ColliderShapeDef, CollisionWorld, cuboid_from_pose, plane_from_pose};
    use crate::constants::GROUND_CHECK_DISTANCE;
    use approx::assert_relative_eq;

    const DT: f32 = 0.02;

    fn ctx<'a>(world: &'a CollisionWorld, settings: &'a ActorSettings) -> MotionContext<'a> {
        MotionContext::new(
            world,
            BodyShape::new(BodySize::new(1.0, 2.0), Vec3::y()),
            settings,
            50.0,
            DT,
            HitFilter::default(),
        )
    }

    fn floor() -> BodyDef {
        plane_from_pose(1, Quat::identity(), Vec3::zeros())
    }

    /// Wall whose face lies on x = 1, facing -X.
    fn wall_x(id: u32) -> BodyDef {
        cuboid_from_pose(
            id,
            Vec3::new(0.5, 5.0, 50.0),
            Vec3::new(1.5, 0.0, 0.0),
            Quat::identity(),
        )
    }

    /// Wall whose face lies on z = 1, facing -Z.
    fn wall_z(id: u32) -> BodyDef {
        cuboid_from_pose(
            id,
            Vec3::new(50.0, 5.0, 0.5),
            Vec3::new(0.0, 0.0, 1.5),
            Quat::identity(),
        )
    }

    #[test]
    fn sliding_along_single_wall_keeps_parallel_component() {
        let world = CollisionWorld::build(vec![floor(), wall_x(2)]);
        let settings = ActorSettings::default();
        let solver = SlideSolver::new(ctx(&world, &settings));
        let start = Vec3::new(0.5, 0.0, 0.0);
        let out = solver.resolve(start, Vec3::new(0.3, 0.0, 0.4), 0.1);
        assert_relative_eq!(out.position - start, Vec3::new(0.0, 0.0, 0.4), epsilon = 1e-3);
        assert_eq!(out.hits.first().map(|h| h.body), Some(BodyId(2)));
    }

    #[test]
    fn zero_displacement_is_idempotent() {
        let world = CollisionWorld::build(vec![floor(), wall_x(2)]);
        let settings = ActorSettings::default();
        let solver = SlideSolver::new(ctx(&world, &settings));
        let start = Vec3::new(0.5, 0.0, 0.0);
        let out = solver.resolve(start, Vec3::zeros(), 0.1);
        assert_eq!(out.position, start);
        assert!(out.hits.is_empty());
    }

    #[test]
    fn right_angle_corner_traps_motion() {
        let world = CollisionWorld::build(vec![floor(), wall_x(2), wall_z(3)]);
        let settings = ActorSettings::default();
        let solver = SlideSolver::new(ctx(&world, &settings));
        let start = Vec3::new(0.5, 0.0, 0.5);
        let out = solver.resolve(start, Vec3::new(0.3, 0.0, 0.3), 0.1);
        assert_relative_eq!(out.position, start, epsilon = 1e-3);
        assert_eq!(out.hits.len(), 2);
    }

    #[test]
    fn opposing_non_walkable_planes_zero_the_displacement() {
        let mut planes = SlidePlanes {
            ground: Vec3::y(),
            sliding: None,
        };
        let up = Vec3::y();
        let first = planes.redirect(&Vec3::new(1.0, 0.0, 1.0), &-Vec3::x(), 90.0, &up, 60.0);
        assert_relative_eq!(first, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-6);

        // Second wall leaning back toward the first: normals face each other.
        let facing = Vec3::new(0.6, 0.0, -0.8);
        let second = planes.redirect(&first, &facing, 90.0, &up, 60.0);
        assert_eq!(second, Vec3::zeros());
        assert_eq!(planes.sliding, Some(facing));
    }

    #[test]
    fn correlated_planes_deflect_along_crease() {
        let up = Vec3::y();
        let mut planes = SlidePlanes {
            ground: up,
            sliding: Some(-Vec3::x()),
        };
        let n = Vec3::new(-0.8, 0.0, -0.6);
        let out = planes.redirect(&Vec3::new(0.0, 0.0, 1.0), &n, 90.0, &up, 60.0);
        // Crease of the ground and the new wall is horizontal and tangent to the wall.
        assert_relative_eq!(out.dot(&n), 0.0, epsilon = 1e-6);
        assert_relative_eq!(out.y, 0.0, epsilon = 1e-6);
        assert!(out.norm() > 0.0);
    }

    #[test]
    fn walkable_hit_becomes_ground_plane() {
        let up = Vec3::y();
        let mut planes = SlidePlanes {
            ground: up,
            sliding: Some(-Vec3::x()),
        };
        let theta = 20f32.to_radians();
        let n = Vec3::new(-theta.sin(), theta.cos(), 0.0);
        let out = planes.redirect(&Vec3::new(1.0, 0.0, 0.0), &n, 20.0, &up, 60.0);
        assert_relative_eq!(out, Vec3::new(theta.cos(), theta.sin(), 0.0), epsilon = 1e-5);
        assert_eq!(planes.ground, n);
        assert!(planes.sliding.is_none());
    }

    fn dynamic_box(layer: u8) -> BodyDef {
        BodyDef::dynamic(
            5,
            Vec3::new(1.5, 0.5, 0.0),
            Quat::identity(),
            ColliderShapeDef::Cuboid {
                half_extents: Vec3::new(0.5, 0.5, 0.5),
            },
        )
        .with_layer(layer)
    }

    #[test]
    fn pushable_dynamic_bodies_do_not_block() {
        let world = CollisionWorld::build(vec![floor(), dynamic_box(3)]);
        let settings = ActorSettings::default();
        let solver = SlideSolver::new(ctx(&world, &settings));
        let start = Vec3::new(0.0, 0.0, 0.0);
        let out = solver.resolve(start, Vec3::new(1.0, 0.0, 0.0), 0.1);
        assert_relative_eq!(out.position, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
        assert_eq!(out.hits.len(), 1);

        let blocked_settings = ActorSettings {
            pushable_layers: LayerMask::ALL.without(3),
            ..Default::default()
        };
        let solver = SlideSolver::new(ctx(&world, &blocked_settings));
        let out = solver.resolve(start, Vec3::new(1.0, 0.0, 0.0), 0.1);
        assert!(out.position.x < 0.51);
    }

    #[test]
    fn disabled_wall_sliding_stops_at_first_hit() {
        let world = CollisionWorld::build(vec![floor(), wall_x(2)]);
        let settings = ActorSettings {
            slide_on_walls: false,
            ..Default::default()
        };
        let start = Vec3::new(0.0, 0.0, 0.0);
        let out = SlideSolver::new(ctx(&world, &settings)).resolve(start, Vec3::new(1.0, 0.0, 1.0), 0.1);
        assert_relative_eq!(out.position.z, out.position.x, epsilon = 1e-4);
        assert!(out.position.x > 0.4 && out.position.x < 0.5);

        let out = SlideSolver::new(ctx(&world, &settings))
            .with_wall_collision(true)
            .resolve(start, Vec3::new(1.0, 0.0, 1.0), 0.1);
        assert_eq!(out.position, start);
    }

    #[test]
    fn unstable_fall_lands_and_predicts_ground() {
        let world = CollisionWorld::build(vec![floor()]);
        let settings = ActorSettings::default();
        let solver = SlideSolver::new(ctx(&world, &settings));
        let out = solver.resolve_unstable(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -2.0, 0.0), true);
        assert_relative_eq!(out.slide.position.y, 0.005, epsilon = 1e-3);
        match out.prediction {
            GroundPrediction::Found { distance, collision } => {
                assert!(distance <= GROUND_CHECK_DISTANCE);
                assert_eq!(collision.hit.body, BodyId(1));
            }
            other => panic!("expected ground, got {other:?}"),
        }

        let skipped = solver.resolve_unstable(Vec3::new(0.0, 1.0, 0.0), Vec3::zeros(), false);
        assert_eq!(skipped.prediction, GroundPrediction::Skipped);
    }

    #[test]
    fn unstable_prediction_reports_nothing_over_void() {
        let world = CollisionWorld::build(vec![]);
        let settings = ActorSettings::default();
        let out = SlideSolver::new(ctx(&world, &settings))
            .resolve_unstable(Vec3::zeros(), Vec3::new(0.0, -0.1, 0.0), true);
        assert_relative_eq!(out.slide.position, Vec3::new(0.0, -0.1, 0.0));
        assert_eq!(out.prediction, GroundPrediction::Nothing);
    }

    #[test]
    fn unstable_hit_on_dynamic_body_emits_reaction_force() {
        let world = CollisionWorld::build(vec![dynamic_box(0)]);
        let settings = ActorSettings::default();
        let solver = SlideSolver::new(ctx(&world, &settings));
        let out = solver.resolve_unstable(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), false);
        let force = out.slide.forces.first().expect("push reaction");
        assert_eq!(force.body, BodyId(5));
        assert!(force.force.x > 0.0);
        assert_relative_eq!(force.force.y, 0.0, epsilon = 1e-4);
        // Box face at x = 1; the body stops short of it.
        assert!(out.slide.position.x < 0.5);
    }
}
