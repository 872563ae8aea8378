pub mod character;
pub mod collision;
pub mod constants;
pub mod error;
pub mod settings;
pub mod utils;

pub use character::{
    ActorEvent, ActorState, BodyForce, BodySize, CharacterActor, CharacterBody, Contact,
    ContactTag, GroundInfo, GroundMotion, GroundMotionProvider,
};
pub use collision::{
    BodyDef, BodyId, BodyKind, ColliderShapeDef, CollisionWorld, HitFilter, HitInfo, LayerMask,
    ShapeCaster,
};
pub use constants::{CONTACT_OFFSET, MAX_SLIDE_ITERATIONS, SKIN_WIDTH};
pub use error::SettingsError;
pub use settings::{ActorSettings, CharacterVelocityMode, UpReference, UpReferenceMode};
