/*!
Character actor: the per-tick state machine.

One `tick` runs, in order:
1. Classify the contacts gathered since the last tick (wall/head, hit events).
2. Lerp the body size toward its target.
3. Position pipeline:
   - stable: grounded slide, ground probe, moving-ground reconciliation;
   - unstable: airborne slide with ground prediction;
   - kinematic actors skip both and only apply a pending `move_to`.
4. Rotation: pending `rotate_to`, then the up-axis constraint.
5. Commit the pose, update timers and grounded events.
6. Post-tick velocity bookkeeping per the configured velocity modes.

The world is only read during a tick. Forces the actor wants applied to other bodies
are queued and drained by the caller.
*/

use crate::character::body::{BodyShape, BodySize, CharacterBody};
use crate::character::contact::{Contact, ContactList};
use crate::character::events::{ActorEvent, BodyForce};
use crate::character::ground::{GroundInfo, GroundProber, ProbeRequest};
use crate::character::platform::{GroundBindings, GroundMotionProvider};
use crate::character::rigid_body::ActorBody;
use crate::character::slide::{GroundPrediction, MotionContext, SlideSolver};
use crate::character::stability::ContactSummary;
use crate::character::sweep::{body_fits, check_for_ground};
use crate::collision::caster::ShapeCaster;
use crate::collision::types::{BodyId, BodyKind, HitFilter, HitInfo, Quat, Vec3};
use crate::constants::{
    DEFAULT_FORCE_NOT_GROUNDED_TICKS, DIST_EPS, FORCE_GROUNDED_HEIGHT_FRACTION,
    GROUND_CHECK_DISTANCE,
};
use crate::error::SettingsError;
use crate::settings::{ActorSettings, CharacterVelocityMode};
use crate::utils::{
    look_rotation, project_on, project_on_plane, project_on_tangent, shortest_arc,
    yaw_only_forward,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorState {
    NotGrounded,
    StableGrounded,
    UnstableGrounded,
}

/// Ground found by the last airborne prediction cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PredictedGround {
    pub body: BodyId,
    /// Distance from the feet to the surface (meters).
    pub distance: f32,
}

/// Seconds spent in each grounded state; reset when the state is left.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct StateTimers {
    grounded: f32,
    not_grounded: f32,
    stable: f32,
    unstable: f32,
}

/// A capsule character driven by velocity requests.
#[derive(Debug)]
pub struct CharacterActor {
    settings: ActorSettings,
    body: CharacterBody,
    rigid: ActorBody,
    size: BodySize,
    target_size: BodySize,
    /// World body representing the actor itself, excluded from every query.
    self_body: Option<BodyId>,
    /// Up axis enforced while rotation is constrained.
    constraint_up: Vec3,

    ground: GroundInfo,
    was_grounded: bool,
    was_stable: bool,
    wall: Option<Contact>,
    head: Option<Contact>,
    contacts: ContactList,
    bindings: GroundBindings,
    force_not_grounded_ticks: u32,
    predicted_ground: Option<PredictedGround>,

    ground_velocity: Vec3,
    stable_probe_velocity: Vec3,
    input_velocity: Vec3,
    pre_simulation_velocity: Vec3,
    post_simulation_velocity: Vec3,
    last_grounded_velocity: Vec3,
    timers: StateTimers,

    previous_pose: (Vec3, Quat),
    events: Vec<ActorEvent>,
    forces: Vec<BodyForce>,
}

impl CharacterActor {
    /// Build an airborne actor at the given pose.
    pub fn new(
        settings: ActorSettings,
        body: CharacterBody,
        position: Vec3,
        rotation: Quat,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        body.validate()?;
        Ok(Self {
            settings,
            body,
            rigid: ActorBody::new(position, rotation),
            size: body.size,
            target_size: body.size,
            self_body: None,
            constraint_up: settings.up(),
            ground: GroundInfo::default(),
            was_grounded: false,
            was_stable: false,
            wall: None,
            head: None,
            contacts: ContactList::new(),
            bindings: GroundBindings::new(),
            force_not_grounded_ticks: 0,
            predicted_ground: None,
            ground_velocity: Vec3::zeros(),
            stable_probe_velocity: Vec3::zeros(),
            input_velocity: Vec3::zeros(),
            pre_simulation_velocity: Vec3::zeros(),
            post_simulation_velocity: Vec3::zeros(),
            last_grounded_velocity: Vec3::zeros(),
            timers: StateTimers::default(),
            previous_pose: (position, rotation),
            events: Vec::new(),
            forces: Vec::new(),
        })
    }

    /// Build an actor and, when configured, snap it onto the ground below.
    pub fn spawn<W>(
        world: &W,
        settings: ActorSettings,
        body: CharacterBody,
        position: Vec3,
        rotation: Quat,
    ) -> Result<Self, SettingsError>
    where
        W: ShapeCaster + GroundMotionProvider,
    {
        let mut actor = Self::new(settings, body, position, rotation)?;
        if settings.force_grounded_at_start && !settings.always_not_grounded {
            actor.force_grounded(world);
        }
        actor.was_grounded = actor.is_grounded();
        actor.was_stable = actor.is_stable();
        actor.previous_pose = (actor.position(), actor.rotation());
        Ok(actor)
    }

    /// Exclude the world body that represents this actor from its queries.
    pub fn with_self_body(mut self, body: BodyId) -> Self {
        self.self_body = Some(body);
        self
    }

    #[inline]
    pub fn settings(&self) -> &ActorSettings {
        &self.settings
    }

    /// Replace the settings, keeping the old ones if the new ones are invalid.
    pub fn set_settings(&mut self, settings: ActorSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.settings = settings;
        if settings.up_reference.is_none() {
            self.constraint_up = settings.up();
        }
        Ok(())
    }

    #[inline]
    pub fn character_body(&self) -> &CharacterBody {
        &self.body
    }

    pub fn set_kinematic(&mut self, is_kinematic: bool) {
        self.rigid.set_kinematic(is_kinematic);
    }

    #[inline]
    pub fn is_kinematic(&self) -> bool {
        self.rigid.is_kinematic()
    }

    // Pose ------------------------------------------------------------------

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.rigid.position()
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        self.rigid.rotation()
    }

    /// Up axis used by the pipeline: the enforced one while rotation is constrained.
    pub fn up(&self) -> Vec3 {
        if self.settings.constrain_rotation {
            self.constraint_up
        } else {
            self.rigid.up()
        }
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rigid.forward()
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rigid.right()
    }

    /// Turn the actor to face `forward` projected on the ground plane of up.
    pub fn set_forward(&mut self, forward: &Vec3) {
        if let Some(rotation) = look_rotation(forward, &self.up()) {
            self.rigid.set_rotation(rotation);
        }
    }

    /// Request a position reached over the next tick.
    ///
    /// Kinematic actors jump there; others turn it into the velocity requested for that tick.
    pub fn move_to(&mut self, position: Vec3) {
        self.rigid.move_to(position);
    }

    /// Request a rotation applied on the next tick (still subject to the up constraint).
    pub fn rotate_to(&mut self, rotation: Quat) {
        self.rigid.rotate_to(rotation);
    }

    pub fn teleport(&mut self, position: Vec3) {
        let rotation = self.rotation();
        self.teleport_with_rotation(position, rotation);
    }

    /// Place the actor immediately, resetting velocity, ground and contact state.
    pub fn teleport_with_rotation(&mut self, position: Vec3, rotation: Quat) {
        self.rigid.set_position(position);
        self.rigid.set_rotation(rotation);
        self.rigid.set_velocity(Vec3::zeros());
        self.ground_velocity = Vec3::zeros();
        self.stable_probe_velocity = Vec3::zeros();
        self.ground = GroundInfo::default();
        self.was_grounded = false;
        self.was_stable = false;
        self.bindings.clear();
        self.contacts.clear();
        self.wall = None;
        self.head = None;
        self.predicted_ground = None;
        self.previous_pose = (position, rotation);
        self.events.push(ActorEvent::Teleport { position, rotation });
        tracing::debug!(?position, "actor teleported");
    }

    /// Pose between the previous and the current tick, for presentation.
    pub fn interpolated_pose(&self, alpha: f32) -> (Vec3, Quat) {
        let alpha = alpha.clamp(0.0, 1.0);
        let (previous_position, previous_rotation) = self.previous_pose;
        (
            previous_position.lerp(&self.position(), alpha),
            previous_rotation.slerp(&self.rotation(), alpha),
        )
    }

    // Size ------------------------------------------------------------------

    #[inline]
    pub fn body_size(&self) -> BodySize {
        self.size
    }

    #[inline]
    pub fn target_body_size(&self) -> BodySize {
        self.target_size
    }

    /// Start growing or shrinking toward `size`.
    ///
    /// Rejected when the size is invalid or the full target capsule would overlap geometry.
    pub fn set_body_size<C>(&mut self, caster: &C, size: BodySize) -> bool
    where
        C: ShapeCaster,
    {
        if !size.is_valid() {
            tracing::debug!(?size, "body size rejected: invalid");
            return false;
        }
        let filter = HitFilter::new(self.settings.collision_layers, true, true)
            .excluding(self.self_body);
        if !body_fits(caster, size, &self.up(), &self.position(), &filter) {
            tracing::debug!(?size, "body size rejected: overlaps geometry");
            return false;
        }
        self.target_size = size;
        true
    }

    // Ground ----------------------------------------------------------------

    pub fn state(&self) -> ActorState {
        if !self.is_grounded() {
            ActorState::NotGrounded
        } else if self.is_stable() {
            ActorState::StableGrounded
        } else {
            ActorState::UnstableGrounded
        }
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.ground.is_grounded()
    }

    #[inline]
    pub fn is_stable(&self) -> bool {
        self.ground.is_grounded() && self.ground.is_stable
    }

    #[inline]
    pub fn ground(&self) -> &GroundInfo {
        &self.ground
    }

    #[inline]
    pub fn wall_contact(&self) -> Option<&Contact> {
        self.wall.as_ref()
    }

    #[inline]
    pub fn head_contact(&self) -> Option<&Contact> {
        self.head.as_ref()
    }

    #[inline]
    pub fn predicted_ground(&self) -> Option<PredictedGround> {
        self.predicted_ground
    }

    /// Contacts gathered during the last tick.
    #[inline]
    pub fn contacts(&self) -> &[Contact] {
        self.contacts.contacts()
    }

    /// Bodies touched two ticks ago but not during the previous one.
    #[inline]
    pub fn contact_exits(&self) -> &[Contact] {
        self.contacts.exits()
    }

    /// Add a contact reported by an outside collision source for the next classification.
    pub fn report_contact(&mut self, point: Vec3, normal: Vec3, body: BodyId, kind: BodyKind) {
        let up = self.up();
        self.contacts
            .record(point, normal, body, kind, &up, self.settings.slope_limit);
    }

    /// Snap onto stable ground searched from high inside the body.
    ///
    /// Returns false, leaving the actor untouched, when nothing stable is found.
    pub fn force_grounded<W>(&mut self, world: &W) -> bool
    where
        W: ShapeCaster + GroundMotionProvider,
    {
        let settings = self.settings;
        let ctx = self.motion_context(world, &settings, 0.0);
        let Some(collision) = check_for_ground(
            ctx.caster,
            &ctx.shape,
            &self.position(),
            FORCE_GROUNDED_HEIGHT_FRACTION * self.size.height,
            settings.step_down_distance,
            &ctx.filter,
        ) else {
            return false;
        };
        let ground = GroundInfo::from_collision(&collision, &ctx.shape.up, settings.slope_limit);
        if !ground.is_stable {
            return false;
        }
        self.bindings.observe(collision.hit.body, world);
        self.ground = ground;
        self.force_not_grounded_ticks = 0;
        let position = self.position() + collision.displacement;
        self.rigid.set_position(position);
        tracing::debug!(?position, body = collision.hit.body.0, "forced grounded");
        true
    }

    /// Drop the ground and keep the actor airborne for `ticks` ticks.
    pub fn force_not_grounded(&mut self, ticks: u32) {
        self.force_not_grounded_ticks = ticks;
        self.clear_ground();
        tracing::trace!(ticks, "forced not grounded");
    }

    #[inline]
    pub fn force_not_grounded_ticks(&self) -> u32 {
        self.force_not_grounded_ticks
    }

    // Timers ----------------------------------------------------------------

    #[inline]
    pub fn grounded_time(&self) -> f32 {
        self.timers.grounded
    }

    #[inline]
    pub fn not_grounded_time(&self) -> f32 {
        self.timers.not_grounded
    }

    #[inline]
    pub fn stable_grounded_time(&self) -> f32 {
        self.timers.stable
    }

    #[inline]
    pub fn unstable_grounded_time(&self) -> f32 {
        self.timers.unstable
    }

    // Velocity --------------------------------------------------------------

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.rigid.velocity()
    }

    #[inline]
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.rigid.set_velocity(velocity);
    }

    pub fn planar_velocity(&self) -> Vec3 {
        project_on_plane(&self.velocity(), &self.up())
    }

    /// Replace the planar part, keeping the vertical part.
    pub fn set_planar_velocity(&mut self, planar: Vec3) {
        let up = self.up();
        let vertical = project_on(&self.velocity(), &up);
        self.set_velocity(project_on_plane(&planar, &up) + vertical);
    }

    pub fn vertical_velocity(&self) -> Vec3 {
        project_on(&self.velocity(), &self.up())
    }

    /// Replace the vertical part, keeping the planar part.
    pub fn set_vertical_velocity(&mut self, vertical: Vec3) {
        let up = self.up();
        let planar = project_on_plane(&self.velocity(), &up);
        self.set_velocity(planar + project_on(&vertical, &up));
    }

    /// Velocity as the grounded pipeline applies it: along the stable ground plane.
    pub fn stable_velocity(&self) -> Vec3 {
        let up = self.up();
        project_on_tangent(&self.velocity(), &self.ground.stable_normal_or(&up), &up)
    }

    /// Set a velocity that runs along the stable ground plane.
    pub fn set_stable_velocity(&mut self, velocity: Vec3) {
        let up = self.up();
        let along = project_on_tangent(&velocity, &self.ground.stable_normal_or(&up), &up);
        self.set_velocity(along);
    }

    pub fn local_velocity(&self) -> Vec3 {
        self.rotation().inverse_transform_vector(&self.velocity())
    }

    pub fn set_local_velocity(&mut self, local: Vec3) {
        self.set_velocity(self.rotation() * local);
    }

    /// Local velocity without its local vertical component.
    pub fn local_planar_velocity(&self) -> Vec3 {
        let mut local = self.local_velocity();
        local.y = 0.0;
        local
    }

    /// Replace the planar part with a local-space vector, keeping the vertical part.
    pub fn set_local_planar_velocity(&mut self, local: Vec3) {
        let planar = self.rotation() * Vec3::new(local.x, 0.0, local.z);
        self.set_planar_velocity(planar);
    }

    pub fn is_falling(&self) -> bool {
        self.velocity().dot(&self.up()) < 0.0
    }

    pub fn is_ascending(&self) -> bool {
        self.velocity().dot(&self.up()) > 0.0
    }

    /// Velocity requested before the last tick.
    #[inline]
    pub fn input_velocity(&self) -> Vec3 {
        self.input_velocity
    }

    /// Velocity produced by the last position pipeline.
    #[inline]
    pub fn pre_simulation_velocity(&self) -> Vec3 {
        self.pre_simulation_velocity
    }

    /// Produced velocity with ground and probe motion removed.
    #[inline]
    pub fn post_simulation_velocity(&self) -> Vec3 {
        self.post_simulation_velocity
    }

    #[inline]
    pub fn last_grounded_velocity(&self) -> Vec3 {
        self.last_grounded_velocity
    }

    /// Velocity contributed by moving ground during the last tick.
    #[inline]
    pub fn ground_velocity(&self) -> Vec3 {
        self.ground_velocity
    }

    // Outputs ---------------------------------------------------------------

    pub fn drain_events(&mut self) -> Vec<ActorEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn drain_body_forces(&mut self) -> Vec<BodyForce> {
        std::mem::take(&mut self.forces)
    }

    // Tick ------------------------------------------------------------------

    /// Advance the actor by `dt` seconds. Non-positive or non-finite steps are ignored.
    pub fn tick<W>(&mut self, world: &W, dt: f32)
    where
        W: ShapeCaster + GroundMotionProvider,
    {
        if dt <= 0.0 || !dt.is_finite() {
            return;
        }
        self.previous_pose = (self.position(), self.rotation());

        self.classify_contacts();
        self.input_velocity = self.velocity();

        self.handle_size(dt);
        self.handle_position(world, dt);
        self.handle_rotation(dt);

        self.rigid.commit(dt);
        self.pre_simulation_velocity = self.velocity();

        self.update_timers(dt);
        self.force_not_grounded_ticks = self.force_not_grounded_ticks.saturating_sub(1);
        self.finish_velocity();

        self.was_grounded = self.is_grounded();
        self.was_stable = self.is_stable();
    }

    fn motion_context<'a>(
        &self,
        caster: &'a dyn ShapeCaster,
        settings: &'a ActorSettings,
        dt: f32,
    ) -> MotionContext<'a> {
        let filter =
            HitFilter::new(settings.collision_layers, false, true).excluding(self.self_body);
        MotionContext::new(
            caster,
            BodyShape::new(self.size, self.up()),
            settings,
            self.body.mass,
            dt,
            filter,
        )
    }

    fn clear_ground(&mut self) {
        self.ground = GroundInfo::default();
        self.bindings.clear_current();
        self.ground_velocity = Vec3::zeros();
    }

    fn record_hits(&mut self, hits: &[HitInfo]) {
        let up = self.up();
        for hit in hits {
            self.contacts.record_hit(hit, &up, self.settings.slope_limit);
        }
    }

    fn classify_contacts(&mut self) {
        let summary = ContactSummary::from_contacts(self.contacts.contacts());
        if let Some(wall) = summary.wall.filter(|_| self.wall.is_none()) {
            self.events.push(ActorEvent::WallHit(wall));
        }
        if let Some(head) = summary.head.filter(|_| self.head.is_none()) {
            self.events.push(ActorEvent::HeadHit(head));
        }
        self.wall = summary.wall;
        self.head = summary.head;
        self.contacts.roll_over();
    }

    fn handle_size(&mut self, dt: f32) {
        if self.size == self.target_size {
            return;
        }
        let speed = self.settings.size_lerp_speed;
        let t = if speed > 0.0 { speed * dt } else { 1.0 };
        self.size = self.size.lerp(&self.target_size, t);
    }

    fn handle_position<W>(&mut self, world: &W, dt: f32)
    where
        W: ShapeCaster + GroundMotionProvider,
    {
        if self.settings.always_not_grounded {
            self.force_not_grounded(DEFAULT_FORCE_NOT_GROUNDED_TICKS);
        }
        if self.rigid.is_kinematic() {
            self.ground_velocity = Vec3::zeros();
            self.stable_probe_velocity = Vec3::zeros();
            return;
        }

        let mut position = self.position();
        if let Some(target) = self.rigid.target_position() {
            self.rigid.set_velocity((target - position) / dt);
        }

        let settings = self.settings;
        let ctx = self.motion_context(world, &settings, dt);
        let up = ctx.shape.up;

        if self.is_stable() {
            self.set_vertical_velocity(Vec3::zeros());
            self.apply_weight(&up);

            let ground_normal = self.ground.stable_normal_or(&up);
            let displacement = project_on_tangent(&(self.velocity() * dt), &ground_normal, &up);
            let slide = SlideSolver::new(ctx)
                .with_ground_normal(ground_normal)
                .with_wall_collision(self.wall.is_some())
                .resolve(position, displacement, ctx.step_offset);
            self.record_hits(&slide.hits);
            position = slide.position;

            let request = ProbeRequest {
                step_down_distance: settings.step_down_distance,
                was_grounded: self.was_grounded,
                committed_position: self.position(),
                stable_displacement: displacement,
                ground_normal,
            };
            let probe = GroundProber::new(ctx).probe(position, &request);
            self.record_hits(&probe.hits);
            position = probe.position;
            self.stable_probe_velocity = probe.probe_displacement / dt;
            match probe.ground {
                Some(ground) => {
                    if let Some(body) = ground.body {
                        self.bindings.observe(body, world);
                    }
                    self.ground = ground;
                }
                None if probe.lost_ground => {
                    self.force_not_grounded(DEFAULT_FORCE_NOT_GROUNDED_TICKS)
                }
                None => self.clear_ground(),
            }

            self.follow_dynamic_ground(world, &mut position, dt);
            if !self.is_stable() {
                self.bindings.clear_current();
            }
        } else {
            let predict = !settings.always_not_grounded && self.force_not_grounded_ticks == 0;
            let outcome = SlideSolver::new(ctx).resolve_unstable(
                position,
                self.velocity() * dt,
                predict,
            );
            self.record_hits(&outcome.slide.hits);
            self.forces.extend(outcome.slide.forces);
            position = outcome.slide.position;
            self.stable_probe_velocity = Vec3::zeros();
            self.ground_velocity = Vec3::zeros();

            match outcome.prediction {
                GroundPrediction::Skipped => {}
                GroundPrediction::Nothing => {
                    self.predicted_ground = None;
                    self.clear_ground();
                }
                GroundPrediction::Found {
                    collision,
                    distance,
                } => {
                    self.predicted_ground = Some(PredictedGround {
                        body: collision.hit.body,
                        distance,
                    });
                    if distance <= GROUND_CHECK_DISTANCE {
                        self.bindings.observe(collision.hit.body, world);
                        self.ground =
                            GroundInfo::from_collision(&collision, &up, settings.slope_limit);
                    } else {
                        self.clear_ground();
                    }
                }
            }
        }

        self.rigid.move_to(position);
    }

    /// Press on dynamic ground with the actor's weight.
    fn apply_weight(&mut self, up: &Vec3) {
        if !self.settings.apply_weight_to_ground || !self.ground.kind.is_dynamic() {
            return;
        }
        let Some(body) = self.ground.body else {
            return;
        };
        self.forces.push(BodyForce {
            body,
            force: -up * (self.body.mass * self.settings.weight_gravity),
            point: self.ground.contact_point,
        });
    }

    /// Carry the actor with the motion of its current ground.
    fn follow_dynamic_ground<P>(&mut self, provider: &P, position: &mut Vec3, dt: f32)
    where
        P: GroundMotionProvider + ?Sized,
    {
        self.ground_velocity = Vec3::zeros();
        if !self.settings.support_dynamic_ground || !self.is_stable() {
            return;
        }
        let Some(binding) = self.bindings.current().filter(|b| b.is_dynamic) else {
            return;
        };
        let Some(motion) = provider.ground_motion(binding.body) else {
            return;
        };
        let sample = motion.sample_motion(position, dt);
        if self.settings.rotate_forward_direction {
            let rotated = yaw_only_forward(&self.rotation(), &sample.delta_rotation, &self.up());
            self.rigid.set_rotation(rotated);
        }
        self.ground_velocity = sample.displacement / dt;
        *position += sample.displacement;
    }

    fn handle_rotation(&mut self, dt: f32) {
        if let Some(target) = self.rigid.target_rotation() {
            self.rigid.set_rotation(target);
        }
        if !self.settings.constrain_rotation {
            return;
        }
        if let Some(reference) = self.settings.up_reference {
            let heading_to = self.position() + self.velocity() * dt;
            if let Some(up) = reference.up_at(&heading_to) {
                self.constraint_up = up;
            }
        }
        let up = self.constraint_up;
        let current = self.rigid.up();
        if current.dot(&up) < 1.0 - DIST_EPS {
            let aligned = shortest_arc(&current, &up) * self.rotation();
            self.rigid.set_rotation(aligned);
        }
    }

    fn update_timers(&mut self, dt: f32) {
        if self.is_grounded() {
            self.timers.not_grounded = 0.0;
            self.timers.grounded += dt;
            if self.is_stable() {
                self.timers.stable += dt;
                self.timers.unstable = 0.0;
            } else {
                self.timers.stable = 0.0;
                self.timers.unstable += dt;
            }
            self.last_grounded_velocity = self.velocity();
            if !self.was_grounded {
                let local_velocity = self.local_velocity();
                tracing::debug!(?local_velocity, "grounded enter");
                self.events.push(ActorEvent::GroundedEnter { local_velocity });
            }
        } else {
            self.timers = StateTimers {
                not_grounded: self.timers.not_grounded + dt,
                ..StateTimers::default()
            };
            if self.was_grounded {
                tracing::debug!("grounded exit");
                self.events.push(ActorEvent::GroundedExit);
            }
        }
    }

    fn finish_velocity(&mut self) {
        let produced = self.velocity() - self.ground_velocity - self.stable_probe_velocity;
        self.post_simulation_velocity = produced;

        let stable = self.is_stable();
        let mode = if stable {
            self.settings.stable_velocity_mode
        } else {
            self.settings.unstable_velocity_mode
        };
        let velocity = match mode {
            CharacterVelocityMode::InputVelocity => self.input_velocity,
            CharacterVelocityMode::PreSimulationVelocity => self.pre_simulation_velocity,
            CharacterVelocityMode::PostSimulationVelocity => produced,
        };
        self.set_velocity(velocity);

        // Slopes bend the produced velocity; keep its speed on the planar heading.
        if stable && self.was_stable && mode != CharacterVelocityMode::InputVelocity {
            if let Some(heading) = self.planar_velocity().try_normalize(DIST_EPS) {
                self.set_planar_velocity(heading * velocity.norm());
            }
        }
    }
}
