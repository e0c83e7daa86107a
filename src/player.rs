//! The player actor: a dynamic capsule driven by the character controller,
//! armed with the four-way slash.

use avian2d::prelude::*;
use bevy::prelude::*;

use crate::character_controller::*;
use crate::combat::{AttackConfig, AttackState};
use crate::health::Health;
use crate::physics::GameLayer;

/// Marks the entity enemies chase. There is at most one.
#[derive(Component, Debug, Default)]
#[require(AttackConfig, AttackState)]
pub struct Player;

/// Capsule radius and straight length; the body is one unit tall with its feet
/// half a unit below the origin.
const BODY_RADIUS: f32 = 0.3;
const BODY_LENGTH: f32 = 0.4;

pub fn player_bundle(position: Vec2) -> impl Bundle {
    player_bundle_with(position, MovementConfig::default())
}

pub fn player_bundle_with(position: Vec2, movement: MovementConfig) -> impl Bundle {
    (
        Name::new("Player"),
        Player,
        Transform::from_translation(position.extend(0.0)),
        CharacterController::with_movement(Collider::capsule(BODY_RADIUS, BODY_LENGTH), movement),
        Health::new(100),
        CollisionLayers::new(
            GameLayer::Player,
            [
                GameLayer::Default,
                GameLayer::Ground,
                GameLayer::Wall,
                GameLayer::Enemy,
            ],
        ),
        Friction::ZERO.with_combine_rule(CoefficientCombine::Min),
        Restitution::ZERO.with_combine_rule(CoefficientCombine::Min),
    )
}
