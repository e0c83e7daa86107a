use avian2d::math::{Scalar, Vector2};
use bevy::input::ButtonInput;
use bevy::prelude::*;

/// Per-actor input snapshot.
///
/// Levels (`movement`, `aim`, `jump_held`, `pointer`) are overwritten by the
/// samplers every frame. Edges (`jump_pressed`, `attack_pressed`) accumulate
/// until the logic pass consumes them, so a press is never lost between
/// samples. Anything can drive this component; the samplers below are only
/// the default keyboard and gamepad bindings.
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct PlayerInput {
    pub movement: Vector2,
    pub aim: Vector2,
    pub jump_pressed: bool,
    pub jump_held: bool,
    pub attack_pressed: bool,
    /// World-space pointer position, when a pointer is available.
    pub pointer: Option<Vector2>,
}

impl PlayerInput {
    pub fn take_jump(&mut self) -> bool {
        std::mem::take(&mut self.jump_pressed)
    }

    pub fn take_attack(&mut self) -> bool {
        std::mem::take(&mut self.attack_pressed)
    }
}

/// Samples keyboard state into [`PlayerInput`].
pub fn keyboard_input(
    keyboard_input: Option<Res<ButtonInput<KeyCode>>>,
    mut inputs: Query<&mut PlayerInput>,
) {
    let Some(keyboard_input) = keyboard_input else {
        return;
    };

    // Basic movement
    let up = keyboard_input.any_pressed([KeyCode::KeyW, KeyCode::ArrowUp]);
    let down = keyboard_input.any_pressed([KeyCode::KeyS, KeyCode::ArrowDown]);
    let left = keyboard_input.any_pressed([KeyCode::KeyA, KeyCode::ArrowLeft]);
    let right = keyboard_input.any_pressed([KeyCode::KeyD, KeyCode::ArrowRight]);

    let horizontal = right as i8 - left as i8;
    let vertical = up as i8 - down as i8;
    let direction =
        Vector2::new(horizontal as Scalar, vertical as Scalar).clamp_length_max(1.0);

    for mut input in &mut inputs {
        input.movement = direction;
        // Holding up/down while attacking aims the slash.
        input.aim = Vector2::new(0.0, vertical as Scalar);
        input.jump_held = keyboard_input.any_pressed([KeyCode::Space, KeyCode::KeyK]);
        input.jump_pressed |= keyboard_input.any_just_pressed([KeyCode::Space, KeyCode::KeyK]);
        input.attack_pressed |= keyboard_input.any_just_pressed([KeyCode::KeyJ, KeyCode::KeyX]);
    }
}

/// Merges gamepad state into [`PlayerInput`]. Runs after [`keyboard_input`].
pub fn gamepad_input(gamepads: Query<&Gamepad>, mut inputs: Query<&mut PlayerInput>) {
    for gamepad in gamepads.iter() {
        let stick = Vector2::new(
            gamepad.get(GamepadAxis::LeftStickX).unwrap_or(0.0),
            gamepad.get(GamepadAxis::LeftStickY).unwrap_or(0.0),
        )
        .clamp_length_max(1.0);
        let aim = Vector2::new(
            gamepad.get(GamepadAxis::RightStickX).unwrap_or(0.0),
            gamepad.get(GamepadAxis::RightStickY).unwrap_or(0.0),
        )
        .clamp_length_max(1.0);

        for mut input in &mut inputs {
            if stick.length_squared() > input.movement.length_squared() {
                input.movement = stick;
            }
            if aim.length_squared() > input.aim.length_squared() {
                input.aim = aim;
            }
            input.jump_held |= gamepad.pressed(GamepadButton::South);
            input.jump_pressed |= gamepad.just_pressed(GamepadButton::South);
            input.attack_pressed |= gamepad.just_pressed(GamepadButton::West);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    #[test]
    fn edges_are_consumed_once() {
        let mut input = PlayerInput {
            jump_pressed: true,
            attack_pressed: true,
            ..default()
        };
        assert!(input.take_jump());
        assert!(!input.take_jump());
        assert!(input.take_attack());
        assert!(!input.take_attack());
    }

    #[test]
    fn keyboard_sampling_sets_levels_and_accumulates_edges() {
        let mut world = World::new();
        let mut keys = ButtonInput::<KeyCode>::default();
        keys.press(KeyCode::KeyA);
        keys.press(KeyCode::Space);
        world.insert_resource(keys);
        let entity = world.spawn(PlayerInput::default()).id();

        world.run_system_once(keyboard_input).unwrap();

        let input = world.get::<PlayerInput>(entity).unwrap();
        assert_eq!(input.movement, Vector2::new(-1.0, 0.0));
        assert!(input.jump_held);
        assert!(input.jump_pressed);
        assert!(!input.attack_pressed);
    }

    #[test]
    fn missing_keyboard_leaves_input_untouched() {
        let mut world = World::new();
        let entity = world
            .spawn(PlayerInput {
                movement: Vector2::X,
                ..default()
            })
            .id();

        world.run_system_once(keyboard_input).unwrap();

        let input = world.get::<PlayerInput>(entity).unwrap();
        assert_eq!(input.movement, Vector2::X);
    }
}
