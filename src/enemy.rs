//! Patrolling and chasing ground enemies, plus the damage their bodies deal
//! on contact.

use avian2d::prelude::*;
use bevy::app::RunFixedMainLoop;
use bevy::prelude::*;

use crate::SimulationSet;
use crate::health::{DespawnOnDeath, Health, Knockback};
use crate::physics::GameLayer;

pub mod ai;
pub mod contact_damage;

pub use ai::{AggroState, AiState, AiTarget, EnemyAi};
pub use contact_damage::ContactDamage;

pub struct EnemyPlugin;

impl Plugin for EnemyPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<EnemyAi>()
            .register_type::<AiState>()
            .register_type::<ContactDamage>()
            .add_systems(
                RunFixedMainLoop,
                ai::resolve_ai_targets.in_set(SimulationSet::Logic),
            )
            .add_systems(
                FixedUpdate,
                ai::enemy_steering.in_set(SimulationSet::Steering),
            )
            .add_systems(
                FixedUpdate,
                contact_damage::contact_damage.in_set(SimulationSet::Combat),
            );
    }
}

/// A standard melee grunt at `position`.
pub fn enemy_bundle(position: Vec2) -> impl Bundle {
    (
        Name::new("Enemy"),
        EnemyAi::default(),
        ContactDamage::default(),
        Health::new(3).with_invulnerability(0.15),
        Knockback::default(),
        DespawnOnDeath,
        RigidBody::Dynamic,
        Collider::capsule(0.3, 0.4),
        LockedAxes::ROTATION_LOCKED,
        CollisionLayers::new(
            GameLayer::Enemy,
            [
                GameLayer::Default,
                GameLayer::Ground,
                GameLayer::Wall,
                GameLayer::Player,
            ],
        ),
        Friction::ZERO.with_combine_rule(CoefficientCombine::Min),
        Transform::from_translation(position.extend(0.0)),
    )
}
