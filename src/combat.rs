//! Four-way melee: aim resolution, slash hitboxes and the pogo bounce.
//!
//! Attacks are started from the logic pass, where the edge-triggered attack
//! input is consumed. A horizontal slash turns its attacker, overriding the
//! facing taken from movement input that frame. The resulting hitbox is
//! checked for overlaps after every physics step, and hits become
//! [`DamageEvent`](crate::health::DamageEvent)s plus a [`HitLanded`] for the
//! attacker to react to.

use bevy::app::RunFixedMainLoop;
use bevy::prelude::*;

use crate::SimulationSet;
use crate::character_controller::states;

pub mod aim;
pub mod attack;
pub mod hitbox;
pub mod pogo;

pub use aim::AttackDirection;
pub use attack::{AttackConfig, AttackState};
pub use hitbox::{DamageableLink, Damageables, HitLanded, Hitbox};

pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<AttackConfig>()
            .register_type::<AttackState>()
            .add_event::<HitLanded>()
            .add_systems(
                RunFixedMainLoop,
                (
                    hitbox::link_damageables,
                    attack::player_attack.after(states::update_facing_from_input),
                    hitbox::tick_hitboxes,
                )
                    .chain()
                    .in_set(SimulationSet::Logic),
            )
            .add_systems(
                FixedUpdate,
                (hitbox::resolve_hitboxes, pogo::apply_pogo)
                    .chain()
                    .in_set(SimulationSet::Combat),
            );
    }
}
