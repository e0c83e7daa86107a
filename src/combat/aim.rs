//! Attack direction: pick a raw aim from the available sources, snap it to
//! one of four directions, then apply the grounded/air-down rules.

use bevy::prelude::*;

use crate::motion::Facing;

/// The only four directions a slash can travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum AttackDirection {
    Up,
    Down,
    Left,
    Right,
}

impl AttackDirection {
    pub fn horizontal(facing: Facing) -> Self {
        match facing {
            Facing::Right => AttackDirection::Right,
            Facing::Left => AttackDirection::Left,
        }
    }

    pub fn vector(self) -> Vec2 {
        match self {
            AttackDirection::Up => Vec2::Y,
            AttackDirection::Down => Vec2::NEG_Y,
            AttackDirection::Left => Vec2::NEG_X,
            AttackDirection::Right => Vec2::X,
        }
    }

    pub fn is_down(self) -> bool {
        self == AttackDirection::Down
    }

    pub fn facing(self) -> Option<Facing> {
        match self {
            AttackDirection::Left => Some(Facing::Left),
            AttackDirection::Right => Some(Facing::Right),
            AttackDirection::Up | AttackDirection::Down => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct AimSnapping {
    /// Aim-axis readings shorter than this are ignored.
    pub deadzone: f32,
    /// Vertical dominates when `|y|` reaches this.
    pub vertical_snap: f32,
    /// Otherwise snap to left/right when `|x|` reaches this.
    pub horizontal_snap: f32,
}

impl Default for AimSnapping {
    fn default() -> Self {
        Self {
            deadzone: 0.2,
            vertical_snap: 0.6,
            horizontal_snap: 0.2,
        }
    }
}

const MIN_POINTER_DISTANCE_SQUARED: f32 = 0.001;
const MOVEMENT_FACING_THRESHOLD: f32 = 0.01;

/// Everything the aim can be read from. Absent sources are `None`/zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct AimSources {
    pub aim_axis: Vec2,
    /// World-space pointer position.
    pub pointer: Option<Vec2>,
    /// Horizontal movement input, when a movement source exists.
    pub movement_x: Option<f32>,
}

/// Raw (unsnapped) aim. Never zero.
pub fn raw_aim(
    sources: &AimSources,
    actor_position: Vec2,
    facing: Facing,
    snapping: &AimSnapping,
) -> Vec2 {
    if sources.aim_axis.length_squared() > snapping.deadzone * snapping.deadzone {
        return sources.aim_axis.normalize();
    }

    if let Some(pointer) = sources.pointer {
        let to_pointer = pointer - actor_position;
        if to_pointer.length_squared() > MIN_POINTER_DISTANCE_SQUARED {
            return to_pointer.normalize();
        }
    }

    match sources.movement_x {
        Some(x) if x.abs() >= MOVEMENT_FACING_THRESHOLD => Vec2::new(x.signum(), 0.0),
        _ => Vec2::new(facing.sign(), 0.0),
    }
}

/// Collapses a raw direction onto up/down/left/right. Weak aims keep the
/// last facing, or right when there is none.
pub fn snap_aim(raw: Vec2, facing: Option<Facing>, snapping: &AimSnapping) -> AttackDirection {
    if raw.y.abs() >= snapping.vertical_snap {
        return if raw.y > 0.0 {
            AttackDirection::Up
        } else {
            AttackDirection::Down
        };
    }
    if raw.x.abs() >= snapping.horizontal_snap {
        return AttackDirection::horizontal(Facing::from_sign(raw.x));
    }
    AttackDirection::horizontal(facing.unwrap_or_default())
}

/// Grounded down-attacks, and air down-attacks when they are disabled, are
/// redirected horizontally along `facing`.
pub fn restrict_down_attack(
    direction: AttackDirection,
    grounded: bool,
    allow_air_down_attack: bool,
    facing: Facing,
) -> AttackDirection {
    if direction.is_down() && (grounded || !allow_air_down_attack) {
        AttackDirection::horizontal(facing)
    } else {
        direction
    }
}
