//! Player locomotion: horizontal smoothing, coyote-time jumping with arming,
//! variable jump height and ground-contact tracking.
//!
//! Jump arming and the grounded window decay run in the logic pass, once per
//! rendered frame. Ground sensing, horizontal smoothing and gravity shaping run
//! in the fixed physics pass.

use bevy::app::RunFixedMainLoop;
use bevy::prelude::*;

use crate::SimulationSet;

pub mod components;
pub mod input;
pub mod physics;
pub mod states;

pub use components::{CharacterController, GroundContact, MovementConfig};
pub use input::PlayerInput;

pub struct CharacterControllerPlugin;

impl Plugin for CharacterControllerPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<MovementConfig>()
            .register_type::<GroundContact>()
            .register_type::<PlayerInput>()
            .add_systems(
                RunFixedMainLoop,
                (input::keyboard_input, input::gamepad_input)
                    .chain()
                    .in_set(SimulationSet::Input),
            )
            .add_systems(
                RunFixedMainLoop,
                (states::update_jump_state, states::update_facing_from_input)
                    .in_set(SimulationSet::Logic),
            )
            .add_systems(
                FixedUpdate,
                physics::update_grounded.in_set(SimulationSet::Sensors),
            )
            .add_systems(
                FixedUpdate,
                (physics::movement, physics::enhanced_gravity)
                    .chain()
                    .in_set(SimulationSet::Steering),
            );
    }
}
