use avian2d::prelude::{LayerMask, SpatialQuery};
use bevy::prelude::*;

use crate::combat::Damageables;
use crate::health::DamageEvent;
use crate::physics::{GameLayer, GeometryQuery};

/// Damages whatever in `target_layers` touches the body, at most once per
/// `cooldown` for this source.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct ContactDamage {
    pub damage: i32,
    pub cooldown: f32,
    pub radius: f32,
    pub target_layers: LayerMask,
    next_allowed: f32,
}

impl Default for ContactDamage {
    fn default() -> Self {
        Self {
            damage: 10,
            cooldown: 0.6,
            radius: 0.55,
            target_layers: GameLayer::Player.into(),
            next_allowed: 0.0,
        }
    }
}

impl ContactDamage {
    pub fn with_damage(mut self, damage: i32, cooldown: f32) -> Self {
        self.damage = damage;
        self.cooldown = cooldown;
        self
    }

    pub fn ready(&self, now: f32) -> bool {
        now >= self.next_allowed
    }

    pub fn start_cooldown(&mut self, now: f32) {
        self.next_allowed = now + self.cooldown;
    }

    /// Picks the first damageable among `overlaps` if the cooldown allows it.
    pub fn strike(
        &mut self,
        now: f32,
        overlaps: &[Entity],
        mut damageable: impl FnMut(Entity) -> Option<Entity>,
    ) -> Option<Entity> {
        if !self.ready(now) {
            return None;
        }
        let target = overlaps.iter().find_map(|&collider| damageable(collider))?;
        self.start_cooldown(now);
        Some(target)
    }
}

pub fn contact_damage(
    time: Res<Time>,
    spatial_query: SpatialQuery,
    damageables: Damageables,
    mut hazards: Query<(Entity, &Transform, &mut ContactDamage)>,
    mut damage: EventWriter<DamageEvent>,
) {
    let now = time.elapsed_secs();

    for (entity, transform, mut hazard) in &mut hazards {
        if !hazard.ready(now) {
            continue;
        }
        let overlaps = spatial_query.circle_overlaps(
            transform.translation.truncate(),
            hazard.radius,
            hazard.target_layers,
        );
        let Some(target) =
            hazard.strike(now, &overlaps, |collider| damageables.resolve(collider))
        else {
            continue;
        };

        debug!("{entity} touched {target} for {}", hazard.damage);
        damage.write(DamageEvent {
            target,
            amount: hazard.damage,
            source: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::Health;
    use crate::physics::testing::{spawn_collider, sync_spatial_queries};
    use avian2d::prelude::Collider;
    use bevy::ecs::system::RunSystemOnce;
    use std::time::Duration;

    #[test]
    fn one_strike_per_cooldown() {
        let mut world = World::new();
        let player = world.spawn_empty().id();
        let mut hazard = ContactDamage::default();

        assert_eq!(hazard.strike(1.0, &[player], Some), Some(player));
        assert_eq!(hazard.strike(1.3, &[player], Some), None);
        assert_eq!(hazard.strike(1.7, &[player], Some), Some(player));
    }

    #[test]
    fn cooldown_only_starts_on_a_hit() {
        let mut world = World::new();
        let [wall, player] = std::array::from_fn(|_| world.spawn_empty().id());
        let mut hazard = ContactDamage::default();

        assert_eq!(hazard.strike(1.0, &[wall], |_| None), None);
        assert!(hazard.ready(1.0));
        let only_player = |collider: Entity| (collider == player).then_some(player);
        let target = hazard.strike(1.0, &[wall, player], only_player);
        assert_eq!(target, Some(player));
        assert!(!hazard.ready(1.5));
    }

    fn advance(world: &mut World, seconds: f32) {
        world
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(seconds));
    }

    fn damage_sent(world: &World) -> Vec<DamageEvent> {
        world
            .resource::<Events<DamageEvent>>()
            .iter_current_update_events()
            .copied()
            .collect()
    }

    #[test]
    fn touching_hazard_damages_on_cooldown() {
        let mut world = World::new();
        world.insert_resource(Time::<()>::default());
        world.init_resource::<Events<DamageEvent>>();
        let player = spawn_collider(
            &mut world,
            Vec2::new(0.5, 0.0),
            Collider::capsule(0.3, 0.4),
            GameLayer::Player,
        );
        world.entity_mut(player).insert(Health::new(100));
        let bystander = spawn_collider(
            &mut world,
            Vec2::new(-0.5, 0.0),
            Collider::capsule(0.3, 0.4),
            GameLayer::Enemy,
        );
        world.entity_mut(bystander).insert(Health::new(3));
        sync_spatial_queries(&mut world);
        world.spawn((Transform::default(), ContactDamage::default()));

        advance(&mut world, 1.0);
        world.run_system_once(contact_damage).unwrap();
        let sent = damage_sent(&world);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target, player);
        assert_eq!(sent[0].amount, 10);
        assert!(sent[0].source.is_none());

        advance(&mut world, 0.3);
        world.run_system_once(contact_damage).unwrap();
        assert_eq!(damage_sent(&world).len(), 1);

        advance(&mut world, 0.4);
        world.run_system_once(contact_damage).unwrap();
        assert_eq!(damage_sent(&world).len(), 2);
    }
}
