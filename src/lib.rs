//! Simulation core of a 2D action platformer: player locomotion with coyote
//! time and variable jump height, four-way melee with a pogo bounce, hit points
//! with invulnerability and knockback, and patrolling/chasing enemies.
//!
//! Add [`SimulationPlugin`] to an app that already has Bevy's time and
//! transform plugins (`DefaultPlugins`, or `MinimalPlugins` plus
//! `TransformPlugin` for headless use), then spawn actors with
//! [`player::player_bundle`] and [`enemy::enemy_bundle`].

use bevy::app::{RunFixedMainLoop, RunFixedMainLoopSystem};
use bevy::prelude::*;

pub mod character_controller;
pub mod combat;
pub mod enemy;
pub mod health;
pub mod motion;
pub mod physics;
pub mod player;

use character_controller::CharacterControllerPlugin;
use combat::CombatPlugin;
use enemy::EnemyPlugin;
use health::HealthPlugin;
use physics::PhysicsPlugin;

/// Ordering of the simulation.
///
/// `Input` and `Logic` run once per rendered frame, before any fixed step of
/// that frame. The remaining sets run in `FixedUpdate`, ahead of the physics
/// step.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Device sampling into `PlayerInput`.
    Input,
    /// Timers, jump arming, attack requests, target resolution.
    Logic,
    /// Ground contact from the previous physics step.
    Sensors,
    /// Player movement, gravity shaping and enemy steering.
    Steering,
    /// Hitbox and contact-damage overlaps.
    Combat,
    /// Damage, healing, knockback and death.
    Reactions,
}

pub struct SimulationPlugin {
    pub fixed_hz: f64,
    pub gravity: Vec2,
}

impl Default for SimulationPlugin {
    fn default() -> Self {
        Self {
            fixed_hz: 64.0,
            gravity: Vec2::new(0.0, -9.81),
        }
    }
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_hz(self.fixed_hz))
            .configure_sets(
                RunFixedMainLoop,
                (SimulationSet::Input, SimulationSet::Logic)
                    .chain()
                    .in_set(RunFixedMainLoopSystem::BeforeFixedMainLoop),
            )
            .configure_sets(
                FixedUpdate,
                (
                    SimulationSet::Sensors,
                    SimulationSet::Steering,
                    SimulationSet::Combat,
                    SimulationSet::Reactions,
                )
                    .chain(),
            )
            .add_plugins((
                PhysicsPlugin {
                    gravity: self.gravity,
                },
                CharacterControllerPlugin,
                HealthPlugin,
                CombatPlugin,
                EnemyPlugin,
            ));
    }
}
