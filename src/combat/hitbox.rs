//! Short-lived damage volumes.
//!
//! A hitbox lives in two passes: its lifetime and forward lunge advance in the
//! logic pass, while overlap resolution runs after every physics step against
//! the colliders in its target layers.

use std::time::Duration;

use avian2d::prelude::*;
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::combat::aim::AttackDirection;
use crate::health::{DamageEvent, Health};
use crate::physics::{GameLayer, GeometryQuery};

/// Reaction requested from whoever spawned the hitbox once it connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum OnHit {
    Pogo,
}

/// Whether the collider was already overlapping on the previous resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Entered,
    Sustained,
}

/// Values a new [`Hitbox`] is stamped from.
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct HitboxTemplate {
    pub damage: i32,
    pub lifetime: f32,
    pub radius: f32,
    pub destroy_on_hit: bool,
    /// Travel speed along the attack direction.
    pub forward_speed: f32,
    pub target_layers: LayerMask,
}

impl Default for HitboxTemplate {
    fn default() -> Self {
        Self {
            damage: 1,
            lifetime: 0.12,
            radius: 0.5,
            destroy_on_hit: true,
            forward_speed: 0.0,
            target_layers: GameLayer::Enemy.into(),
        }
    }
}

#[derive(Component, Debug, Clone)]
#[require(Transform)]
pub struct Hitbox {
    pub direction: AttackDirection,
    pub damage: i32,
    pub radius: f32,
    pub target_layers: LayerMask,
    pub destroy_on_hit: bool,
    pub forward_speed: f32,
    pub owner: Option<Entity>,
    pub on_hit: Option<OnHit>,
    lifetime: Timer,
    retired: bool,
    contacts: Vec<Entity>,
}

/// One damaging contact found by [`Hitbox::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub collider: Entity,
    pub target: Entity,
    pub contact: ContactPhase,
}

impl Hitbox {
    pub fn new(template: &HitboxTemplate, direction: AttackDirection) -> Self {
        Self {
            direction,
            damage: template.damage,
            radius: template.radius,
            target_layers: template.target_layers,
            destroy_on_hit: template.destroy_on_hit,
            forward_speed: template.forward_speed,
            owner: None,
            on_hit: None,
            lifetime: Timer::from_seconds(template.lifetime.max(0.0), TimerMode::Once),
            retired: false,
            contacts: Vec::new(),
        }
    }

    pub fn with_owner(mut self, owner: Entity) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_on_hit(mut self, on_hit: OnHit) -> Self {
        self.on_hit = Some(on_hit);
        self
    }

    /// A retired hitbox has delivered its single hit and never hits again.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Advances the lifetime. Returns `true` once it has run out.
    pub fn tick(&mut self, delta: Duration) -> bool {
        self.lifetime.tick(delta);
        self.lifetime.finished()
    }

    /// Turns this pass's overlapping colliders into hits.
    ///
    /// `damageable` maps a collider to the entity carrying its [`Health`];
    /// colliders without one are skipped. Both new and sustained contacts
    /// deal damage. A destroy-on-hit hitbox stops at the first hit and
    /// retires.
    pub fn resolve(
        &mut self,
        overlaps: &[Entity],
        mut damageable: impl FnMut(Entity) -> Option<Entity>,
    ) -> Vec<Hit> {
        if self.retired {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for &collider in overlaps {
            let contact = if self.contacts.contains(&collider) {
                ContactPhase::Sustained
            } else {
                ContactPhase::Entered
            };
            let Some(target) = damageable(collider) else {
                continue;
            };
            hits.push(Hit {
                collider,
                target,
                contact,
            });
            if self.destroy_on_hit {
                self.retired = true;
                break;
            }
        }

        self.contacts.clear();
        self.contacts.extend_from_slice(overlaps);
        hits
    }
}

/// Sent for every hit a hitbox lands, including ones absorbed by
/// invulnerability.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct HitLanded {
    pub hitbox: Entity,
    pub attacker: Option<Entity>,
    pub target: Entity,
    pub collider: Entity,
    pub direction: AttackDirection,
    pub contact: ContactPhase,
    pub on_hit: Option<OnHit>,
}

/// Cached result of searching a collider's hierarchy for [`Health`].
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageableLink(pub Option<Entity>);

/// Finds the entity that takes damage for `collider`: the collider itself,
/// then its ancestors nearest first, then its descendants depth-first.
pub fn find_damageable(
    collider: Entity,
    is_damageable: impl Fn(Entity) -> bool,
    parent_of: impl Fn(Entity) -> Option<Entity>,
    children_of: impl Fn(Entity) -> Vec<Entity>,
) -> Option<Entity> {
    if is_damageable(collider) {
        return Some(collider);
    }

    let mut ancestor = parent_of(collider);
    while let Some(entity) = ancestor {
        if is_damageable(entity) {
            return Some(entity);
        }
        ancestor = parent_of(entity);
    }

    let mut stack = children_of(collider);
    stack.reverse();
    while let Some(entity) = stack.pop() {
        if is_damageable(entity) {
            return Some(entity);
        }
        let mut children = children_of(entity);
        children.reverse();
        stack.extend(children);
    }
    None
}

/// Collider to damageable lookup, preferring the cached [`DamageableLink`].
#[derive(SystemParam)]
pub struct Damageables<'w, 's> {
    links: Query<'w, 's, &'static DamageableLink>,
    healths: Query<'w, 's, (), With<Health>>,
    parents: Query<'w, 's, &'static ChildOf>,
    children: Query<'w, 's, &'static Children>,
}

impl Damageables<'_, '_> {
    pub fn resolve(&self, collider: Entity) -> Option<Entity> {
        match self.links.get(collider) {
            // The cached target may have died since.
            Ok(link) => link.0.filter(|&target| self.healths.contains(target)),
            Err(_) => self.search(collider),
        }
    }

    fn search(&self, collider: Entity) -> Option<Entity> {
        find_damageable(
            collider,
            |entity| self.healths.contains(entity),
            |entity| self.parents.get(entity).ok().map(ChildOf::parent),
            |entity| {
                self.children
                    .get(entity)
                    .map(|children| children.to_vec())
                    .unwrap_or_default()
            },
        )
    }
}

/// Resolves each new collider's damageable once and caches it.
pub fn link_damageables(
    mut commands: Commands,
    unlinked: Query<Entity, (With<Collider>, Without<DamageableLink>)>,
    damageables: Damageables,
) {
    for collider in &unlinked {
        let target = damageables.search(collider);
        commands.entity(collider).insert(DamageableLink(target));
    }
}

pub fn tick_hitboxes(
    mut commands: Commands,
    time: Res<Time>,
    mut hitboxes: Query<(Entity, &mut Hitbox, &mut Transform)>,
) {
    for (entity, mut hitbox, mut transform) in &mut hitboxes {
        if hitbox.forward_speed != 0.0 {
            let step = hitbox.direction.vector() * hitbox.forward_speed * time.delta_secs();
            transform.translation += step.extend(0.0);
        }
        if hitbox.tick(time.delta()) {
            commands.entity(entity).try_despawn();
        }
    }
}

pub fn resolve_hitboxes(
    mut commands: Commands,
    spatial_query: SpatialQuery,
    damageables: Damageables,
    mut hitboxes: Query<(Entity, &mut Hitbox, &Transform)>,
    mut damage: EventWriter<DamageEvent>,
    mut landed: EventWriter<HitLanded>,
) {
    for (entity, mut hitbox, transform) in &mut hitboxes {
        if hitbox.is_retired() {
            continue;
        }
        let position = transform.translation.truncate();
        let overlaps = spatial_query.circle_overlaps(position, hitbox.radius, hitbox.target_layers);

        for hit in hitbox.resolve(&overlaps, |collider| damageables.resolve(collider)) {
            debug!("{entity} hit {} ({:?})", hit.target, hit.contact);
            damage.write(DamageEvent {
                target: hit.target,
                amount: hitbox.damage,
                source: Some(position),
            });
            landed.write(HitLanded {
                hitbox: entity,
                attacker: hitbox.owner,
                target: hit.target,
                collider: hit.collider,
                direction: hitbox.direction,
                contact: hit.contact,
                on_hit: hitbox.on_hit,
            });
        }

        if hitbox.is_retired() {
            commands.entity(entity).try_despawn();
        }
    }
}
