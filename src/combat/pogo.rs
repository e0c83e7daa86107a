use avian2d::prelude::{LinearVelocity, SpatialQuery};
use bevy::prelude::*;

use crate::combat::attack::AttackConfig;
use crate::combat::hitbox::{HitLanded, OnHit};

/// Upward bounce after an airborne down-slash connects.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct PogoConfig {
    pub up_velocity: f32,
    /// Upward speed at or above which the bounce only tops up to `up_velocity`.
    pub min_replace_y: f32,
    /// Zero horizontal velocity on bounce.
    pub lock_horizontal: bool,
}

impl Default for PogoConfig {
    fn default() -> Self {
        Self {
            up_velocity: 12.0,
            min_replace_y: 6.0,
            lock_horizontal: true,
        }
    }
}

impl PogoConfig {
    pub fn bounce(&self, velocity: Vec2) -> Vec2 {
        let y = if velocity.y < self.min_replace_y {
            self.up_velocity
        } else {
            velocity.y.max(self.up_velocity)
        };
        let x = if self.lock_horizontal {
            0.0
        } else {
            velocity.x
        };
        Vec2::new(x, y)
    }
}

/// Bounces attackers whose pogo slash landed while they were off the ground.
pub fn apply_pogo(
    mut hits: EventReader<HitLanded>,
    spatial_query: SpatialQuery,
    mut attackers: Query<(&Transform, &AttackConfig, &mut LinearVelocity)>,
) {
    for hit in hits.read() {
        if hit.on_hit != Some(OnHit::Pogo) || !hit.direction.is_down() {
            continue;
        }
        let Some(attacker) = hit.attacker else {
            continue;
        };
        let Ok((transform, config, mut velocity)) = attackers.get_mut(attacker) else {
            continue;
        };
        if config.grounded(&spatial_query, transform.translation.truncate()) {
            continue;
        }

        velocity.0 = config.pogo.bounce(velocity.0);
        debug!("{attacker} pogo bounce to {:?}", velocity.0);
    }
}
