//! Drives one actor through a small scene and logs what happens.

use kcc::collision::{Iso, Quat, Vec3, cuboid_from_pose, plane_from_pose};
use kcc::{
    ActorEvent, ActorSettings, BodyDef, BodyId, CharacterActor, CharacterBody, ColliderShapeDef,
    CollisionWorld,
};

const DT: f32 = 1.0 / 60.0;
const TICKS: u32 = 300;
const WALK_SPEED: f32 = 3.0;
const JUMP_SPEED: f32 = 5.0;
const JUMP_TICK: u32 = 120;
const GRAVITY: f32 = 9.8;
const PLATFORM: BodyId = BodyId(4);

fn build_scene() -> CollisionWorld {
    let ramp_rotation = Quat::from_axis_angle(&Vec3::z_axis(), 20f32.to_radians());
    CollisionWorld::build(vec![
        plane_from_pose(1, Quat::identity(), Vec3::zeros()),
        cuboid_from_pose(
            2,
            Vec3::new(2.0, 0.2, 2.0),
            Vec3::new(4.0, 0.3, 0.0),
            ramp_rotation,
        ),
        cuboid_from_pose(
            3,
            Vec3::new(0.5, 2.0, 4.0),
            Vec3::new(12.0, 2.0, 0.0),
            Quat::identity(),
        ),
        BodyDef::kinematic(
            PLATFORM.0,
            Vec3::new(8.0, 0.1, 0.0),
            Quat::identity(),
            ColliderShapeDef::Cuboid {
                half_extents: Vec3::new(1.5, 0.1, 1.5),
            },
        ),
    ])
}

fn platform_pose(time: f32) -> Iso {
    Iso::translation(8.0, 0.1, 1.5 * (time * 0.8).sin())
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut world = build_scene();
    let actor = CharacterActor::spawn(
        &world,
        ActorSettings::default(),
        CharacterBody::default(),
        Vec3::new(0.0, 0.2, 0.0),
        Quat::identity(),
    );
    let mut actor = match actor {
        Ok(actor) => actor,
        Err(err) => {
            tracing::error!(%err, "invalid actor configuration");
            return;
        }
    };
    tracing::info!(state = ?actor.state(), position = ?actor.position(), "actor spawned");

    for tick in 0..TICKS {
        let time = (tick + 1) as f32 * DT;
        world.set_kinematic_target(PLATFORM, platform_pose(time));

        let mut planar = Vec3::new(WALK_SPEED, 0.0, 0.0);
        if actor.is_grounded() {
            actor.set_planar_velocity(planar);
        } else {
            planar = actor.planar_velocity();
            let falling = actor.vertical_velocity() - Vec3::y() * GRAVITY * DT;
            actor.set_vertical_velocity(falling);
        }
        if tick == JUMP_TICK && actor.is_stable() {
            actor.force_not_grounded(3);
            actor.set_vertical_velocity(Vec3::y() * JUMP_SPEED);
        }
        tracing::trace!(tick, ?planar, "input");

        actor.tick(&world, DT);
        world.commit_kinematic_targets();

        for event in actor.drain_events() {
            match event {
                ActorEvent::WallHit(contact) => {
                    tracing::info!(tick, body = contact.body.0, "wall hit")
                }
                ActorEvent::HeadHit(contact) => {
                    tracing::info!(tick, body = contact.body.0, "head hit")
                }
                ActorEvent::GroundedEnter { local_velocity } => {
                    tracing::info!(tick, ?local_velocity, "landed")
                }
                ActorEvent::GroundedExit => tracing::info!(tick, "left the ground"),
                ActorEvent::Teleport { position, .. } => {
                    tracing::info!(tick, ?position, "teleported")
                }
            }
        }
        for force in actor.drain_body_forces() {
            tracing::debug!(tick, body = force.body.0, force = ?force.force, "body force");
        }

        if tick % 30 == 0 {
            tracing::info!(
                tick,
                state = ?actor.state(),
                position = ?actor.position(),
                ground = ?actor.ground().body,
                "actor"
            );
        }
    }

    tracing::info!(
        state = ?actor.state(),
        position = ?actor.position(),
        grounded_time = actor.grounded_time(),
        "done"
    );
}
