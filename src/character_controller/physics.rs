use avian2d::math::Scalar;
use avian2d::prelude::{GravityScale, LinearVelocity, Rotation, ShapeHitData, ShapeHits};
use bevy::prelude::*;

use crate::character_controller::components::*;
use crate::character_controller::input::PlayerInput;
use crate::motion::MotionState;
use crate::physics::is_standable;

/// Whether any of the ground caster's hits is a surface to stand on.
///
/// Hit normals are in the caster's local space and point out of the cast
/// shape, so they are flipped and rotated into world space first.
pub fn stands_on<'a>(
    hits: impl IntoIterator<Item = &'a ShapeHitData>,
    rotation: Rotation,
    min_up: Scalar,
) -> bool {
    hits.into_iter()
        .any(|hit| is_standable(rotation * -hit.normal2, min_up))
}

/// Refreshes the grounded window from the ground caster's hits.
///
/// No hits (or no caster at all) simply means airborne.
pub fn update_grounded(
    mut query: Query<
        (
            &MovementConfig,
            &mut GroundContact,
            &LinearVelocity,
            Option<&ShapeHits>,
            &Rotation,
        ),
        With<CharacterController>,
    >,
) {
    for (config, mut contact, velocity, hits, rotation) in &mut query {
        let standing = match hits {
            Some(hits) => stands_on(hits.iter(), *rotation, config.min_ground_normal_y),
            None => false,
        };
        contact.sense(standing, velocity.y, config.coyote_time);
    }
}

/// Smooths horizontal velocity towards the input target.
pub fn movement(
    time: Res<Time>,
    mut controllers: Query<
        (&MovementConfig, &PlayerInput, &mut MotionState, &mut LinearVelocity),
        With<CharacterController>,
    >,
) {
    let delta = time.delta_secs();

    for (config, input, mut motion, mut linear_velocity) in &mut controllers {
        let target = input.movement.x * config.move_speed;
        linear_velocity.x = motion.smooth_horizontal(
            linear_velocity.x,
            target,
            config.acceleration_time,
            config.deceleration_time,
            delta,
        );
    }
}

/// Custom gravity system for improved jump feel
pub fn enhanced_gravity(
    mut controllers: Query<
        (&MovementConfig, &GroundContact, &PlayerInput, &LinearVelocity, &mut GravityScale),
        With<CharacterController>,
    >,
) {
    for (config, contact, input, linear_velocity, mut gravity_scale) in &mut controllers {
        let multiplier = config.gravity.multiplier(
            linear_velocity.y,
            input.jump_held,
            contact.airborne(),
        );
        gravity_scale.0 = config.base_gravity_scale * multiplier;
    }
}
