//! Hit points, invulnerability windows, knockback and death.
//!
//! Damage and healing arrive as events ([`DamageEvent`], [`HealEvent`]) from
//! combat and contact hazards and are applied in one place, after all hit
//! detection for the physics step has run. Presentation listens to
//! [`HealthChanged`] and [`Died`].

use avian2d::prelude::LinearVelocity;
use bevy::app::RunFixedMainLoop;
use bevy::prelude::*;

use crate::SimulationSet;

pub struct HealthPlugin;

impl Plugin for HealthPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<Health>()
            .register_type::<Knockback>()
            .add_event::<DamageEvent>()
            .add_event::<HealEvent>()
            .add_event::<SetHealth>()
            .add_event::<HealthChanged>()
            .add_event::<Died>()
            .add_systems(
                RunFixedMainLoop,
                (announce_new_health, tick_invulnerability).in_set(SimulationSet::Logic),
            )
            .add_systems(
                FixedUpdate,
                (apply_damage, apply_healing, apply_set_health)
                    .chain()
                    .in_set(SimulationSet::Reactions),
            );
    }
}

/// Hit points bounded to `[0, max]` plus an invulnerability window.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Health {
    current: i32,
    max: i32,
    /// How long damage is ignored after a hit lands.
    pub invulnerability: f32,
    invulnerable_timer: f32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Non-positive amount or an active invulnerability window.
    Ignored,
    Damaged { remaining: i32 },
    /// This hit took the last hit point.
    Killed,
}

impl Health {
    pub fn new(max: i32) -> Self {
        let max = max.max(0);
        Self {
            current: max,
            max,
            invulnerability: 0.0,
            invulnerable_timer: 0.0,
        }
    }

    pub fn with_invulnerability(mut self, seconds: f32) -> Self {
        self.invulnerability = seconds.max(0.0);
        self
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0 {
            0.0
        } else {
            self.current as f32 / self.max as f32
        }
    }

    pub fn is_dead(&self) -> bool {
        self.current == 0
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_timer > 0.0
    }

    pub fn take_damage(&mut self, amount: i32) -> DamageOutcome {
        if amount <= 0 || self.is_invulnerable() {
            return DamageOutcome::Ignored;
        }
        let was_alive = self.current > 0;
        self.current = (self.current - amount).max(0);
        self.invulnerable_timer = self.invulnerability;

        if was_alive && self.current == 0 {
            DamageOutcome::Killed
        } else {
            DamageOutcome::Damaged {
                remaining: self.current,
            }
        }
    }

    /// Returns `false` for a non-positive amount, which changes nothing.
    pub fn heal(&mut self, amount: i32) -> bool {
        if amount <= 0 {
            return false;
        }
        self.current = self.current.saturating_add(amount).min(self.max);
        true
    }

    pub fn set(&mut self, value: i32) {
        self.current = value.clamp(0, self.max);
    }

    pub fn tick(&mut self, dt: f32) {
        if self.invulnerable_timer > 0.0 {
            self.invulnerable_timer -= dt;
        }
    }
}

/// Velocity impulse applied away from a damage source.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Knockback {
    pub force: f32,
    /// Per-axis shape; only magnitudes matter, signs come from the hit direction.
    pub shape: Vec2,
}

impl Default for Knockback {
    fn default() -> Self {
        Self {
            force: 6.0,
            shape: Vec2::new(1.0, 0.4),
        }
    }
}

impl Knockback {
    /// Velocity after being hit from `source`: horizontal is replaced,
    /// vertical is raised to at least the knockback's vertical component.
    pub fn apply(&self, velocity: Vec2, source: Vec2, target: Vec2) -> Vec2 {
        let away = (target - source).normalize_or_zero();
        let impulse = Vec2::new(
            away.x.signum() * self.shape.x.abs(),
            away.y.signum() * self.shape.y.abs(),
        )
        .normalize_or_zero()
            * self.force;

        Vec2::new(impulse.x, velocity.y.max(impulse.y))
    }
}

/// Removes the entity once its health reaches zero. Actors without it (the
/// player) stay around at zero HP.
#[derive(Component, Debug, Default)]
pub struct DespawnOnDeath;

/// Request to damage `target`, with knockback when `source` is given.
#[derive(Event, Debug, Clone, Copy)]
pub struct DamageEvent {
    pub target: Entity,
    pub amount: i32,
    pub source: Option<Vec2>,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct HealEvent {
    pub target: Entity,
    pub amount: i32,
}

/// Overwrites `target`'s HP, clamped into range.
#[derive(Event, Debug, Clone, Copy)]
pub struct SetHealth {
    pub target: Entity,
    pub value: i32,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthChanged {
    pub entity: Entity,
    pub current: i32,
    pub max: i32,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Died {
    pub entity: Entity,
}

/// Broadcasts the starting value of every freshly added [`Health`].
pub fn announce_new_health(
    added: Query<(Entity, &Health), Added<Health>>,
    mut changed: EventWriter<HealthChanged>,
) {
    for (entity, health) in &added {
        changed.write(HealthChanged {
            entity,
            current: health.current(),
            max: health.max(),
        });
    }
}

pub fn tick_invulnerability(time: Res<Time>, mut healths: Query<&mut Health>) {
    let delta = time.delta_secs();
    for mut health in &mut healths {
        health.tick(delta);
    }
}

pub fn apply_damage(
    mut commands: Commands,
    mut damage_events: EventReader<DamageEvent>,
    mut targets: Query<(
        &mut Health,
        &Transform,
        Option<&Knockback>,
        Option<&mut LinearVelocity>,
        Has<DespawnOnDeath>,
    )>,
    mut changed: EventWriter<HealthChanged>,
    mut died: EventWriter<Died>,
) {
    for event in damage_events.read() {
        // Target may already be gone.
        let Ok((mut health, transform, knockback, velocity, despawn_on_death)) =
            targets.get_mut(event.target)
        else {
            continue;
        };

        let outcome = health.take_damage(event.amount);
        if outcome != DamageOutcome::Ignored {
            changed.write(HealthChanged {
                entity: event.target,
                current: health.current(),
                max: health.max(),
            });
        }

        if let (Some(source), Some(knockback), Some(mut velocity)) =
            (event.source, knockback, velocity)
        {
            velocity.0 = knockback.apply(velocity.0, source, transform.translation.truncate());
        }

        if outcome == DamageOutcome::Killed {
            info!("{} died", event.target);
            died.write(Died {
                entity: event.target,
            });
            if despawn_on_death {
                commands.entity(event.target).try_despawn();
            }
        }
    }
}

pub fn apply_healing(
    mut heal_events: EventReader<HealEvent>,
    mut targets: Query<&mut Health>,
    mut changed: EventWriter<HealthChanged>,
) {
    for event in heal_events.read() {
        let Ok(mut health) = targets.get_mut(event.target) else {
            continue;
        };
        if health.heal(event.amount) {
            changed.write(HealthChanged {
                entity: event.target,
                current: health.current(),
                max: health.max(),
            });
        }
    }
}

pub fn apply_set_health(
    mut set_events: EventReader<SetHealth>,
    mut targets: Query<&mut Health>,
    mut changed: EventWriter<HealthChanged>,
) {
    for event in set_events.read() {
        let Ok(mut health) = targets.get_mut(event.target) else {
            continue;
        };
        health.set(event.value);
        changed.write(HealthChanged {
            entity: event.target,
            current: health.current(),
            max: health.max(),
        });
    }
}
