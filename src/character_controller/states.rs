use avian2d::prelude::LinearVelocity;
use bevy::prelude::*;

use crate::character_controller::components::*;
use crate::character_controller::input::PlayerInput;
use crate::motion::Facing;

const FACING_INPUT_THRESHOLD: f32 = 0.01;

/// Logic-pass jump handling: consumes the press edge, applies the jump if the
/// grounded window and arming allow it, then decays the grounded window.
pub fn update_jump_state(
    time: Res<Time>,
    mut controllers: Query<
        (Entity, &MovementConfig, &mut GroundContact, &mut PlayerInput, &mut LinearVelocity),
        With<CharacterController>,
    >,
) {
    let delta = time.delta_secs();

    for (entity, config, mut contact, mut input, mut linear_velocity) in &mut controllers {
        if input.take_jump() {
            if let Some(vy) = contact.try_jump(linear_velocity.y, config.jump_speed) {
                linear_velocity.y = vy;
                debug!("{entity}: jump, vy={vy}");
            }
        }

        contact.tick(delta);
    }
}

/// Turns characters towards their horizontal input.
pub fn update_facing_from_input(
    mut controllers: Query<(&PlayerInput, &mut Facing), With<CharacterController>>,
) {
    for (input, mut facing) in &mut controllers {
        facing.follow(input.movement.x, FACING_INPUT_THRESHOLD);
    }
}
