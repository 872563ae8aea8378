/*!
Character root module.

The kinematic movement core built on top of [`crate::collision`]:

- body:       capsule size, mass and derived geometry
- rigid_body: the actor's own pose, velocity and move/rotate targets
- sweep:      body sweeps, ground casts and edge detection
- stability:  slope, wall/head and edge classification
- contact:    per-tick contact list with Enter/Stay/Exit phases
- slide:      grounded and airborne collide-and-slide
- ground:     ground probing and snapping
- platform:   moving-ground motion sources and bindings
- events:     events and body forces emitted by an actor
- actor:      `CharacterActor`, the per-tick state machine
*/

pub mod actor;
pub mod body;
pub mod contact;
pub mod events;
pub mod ground;
pub mod platform;
pub mod rigid_body;
pub mod slide;
pub mod stability;
pub mod sweep;

pub use actor::{ActorState, CharacterActor, PredictedGround};
pub use body::{BodyShape, BodySize, CharacterBody};
pub use contact::{Contact, ContactList, ContactPhase, ContactTag};
pub use events::{ActorEvent, BodyForce};
pub use ground::{GroundInfo, GroundProber, ProbeOutcome, ProbeRequest};
pub use platform::{GroundBinding, GroundBindings, GroundMotion, GroundMotionProvider, MotionSample};
pub use slide::{GroundPrediction, MotionContext, SlideOutcome, SlideSolver, UnstableOutcome};
pub use stability::{ContactSummary, EdgeInfo, Stability};
pub use sweep::CollisionInfo;
