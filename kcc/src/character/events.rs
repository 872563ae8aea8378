use crate::character::contact::Contact;
use crate::collision::types::{BodyId, Quat, Vec3};

/// Notifications produced by an actor during a tick, drained by the caller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActorEvent {
    /// A wall contact appeared after a tick without one.
    WallHit(Contact),
    /// A head contact appeared after a tick without one.
    HeadHit(Contact),
    /// The actor became grounded. Carries the local-space velocity at landing.
    GroundedEnter { local_velocity: Vec3 },
    GroundedExit,
    Teleport { position: Vec3, rotation: Quat },
}

/// Force the actor wants applied to another body (push reactions, ground weight).
///
/// The actor never mutates other bodies; the caller applies these to its own simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyForce {
    pub body: BodyId,
    /// Newtons, world space.
    pub force: Vec3,
    /// World-space application point.
    pub point: Vec3,
}
