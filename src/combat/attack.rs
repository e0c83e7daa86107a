use avian2d::prelude::{LayerMask, SpatialQuery};
use bevy::prelude::*;

use crate::character_controller::PlayerInput;
use crate::combat::aim::{
    AimSnapping, AimSources, AttackDirection, raw_aim, restrict_down_attack, snap_aim,
};
use crate::combat::hitbox::{Hitbox, HitboxTemplate, OnHit};
use crate::combat::pogo::PogoConfig;
use crate::motion::Facing;
use crate::physics::{GameLayer, GeometryQuery};

/// Melee tuning for an attacking actor.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct AttackConfig {
    /// Distance from the actor at which the slash spawns.
    pub slash_offset: f32,
    pub cooldown: f32,
    pub snapping: AimSnapping,
    pub allow_air_down_attack: bool,
    /// Feet overlap used to decide whether the actor is grounded.
    pub ground_check_offset: Vec2,
    pub ground_check_radius: f32,
    pub ground_layers: LayerMask,
    pub hitbox: HitboxTemplate,
    pub pogo: PogoConfig,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            slash_offset: 0.6,
            cooldown: 0.15,
            snapping: AimSnapping::default(),
            allow_air_down_attack: true,
            ground_check_offset: Vec2::new(0.0, -0.5),
            ground_check_radius: 0.2,
            ground_layers: GameLayer::Ground.into(),
            hitbox: HitboxTemplate::default(),
            pogo: PogoConfig::default(),
        }
    }
}

impl AttackConfig {
    pub fn grounded(&self, geometry: &impl GeometryQuery, position: Vec2) -> bool {
        geometry.overlap_circle(
            position + self.ground_check_offset,
            self.ground_check_radius,
            self.ground_layers,
        )
    }

    /// Final slash direction for the given aim sources.
    pub fn direction(
        &self,
        sources: &AimSources,
        position: Vec2,
        facing: Facing,
        grounded: bool,
    ) -> AttackDirection {
        let raw = raw_aim(sources, position, facing, &self.snapping);
        let snapped = snap_aim(raw, Some(facing), &self.snapping);
        restrict_down_attack(snapped, grounded, self.allow_air_down_attack, facing)
    }

    pub fn slash_position(&self, position: Vec2, direction: AttackDirection) -> Vec2 {
        position + direction.vector() * self.slash_offset
    }
}

#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct AttackState {
    last_attack: Option<f32>,
}

impl AttackState {
    /// Starts an attack at `now` unless the previous one is still cooling down.
    pub fn try_begin(&mut self, now: f32, cooldown: f32) -> bool {
        if self.last_attack.is_some_and(|last| now - last < cooldown) {
            return false;
        }
        self.last_attack = Some(now);
        true
    }
}

pub fn player_attack(
    mut commands: Commands,
    time: Res<Time>,
    spatial_query: SpatialQuery,
    mut attackers: Query<(
        Entity,
        &Transform,
        &AttackConfig,
        &mut AttackState,
        &mut PlayerInput,
        &mut Facing,
    )>,
) {
    let now = time.elapsed_secs();

    for (entity, transform, config, mut state, mut input, mut facing) in &mut attackers {
        if !input.take_attack() {
            continue;
        }
        if !state.try_begin(now, config.cooldown) {
            trace!("{entity} attack on cooldown");
            continue;
        }

        let position = transform.translation.truncate();
        let sources = AimSources {
            aim_axis: input.aim,
            pointer: input.pointer,
            movement_x: Some(input.movement.x),
        };
        let grounded = config.grounded(&spatial_query, position);
        let direction = config.direction(&sources, position, *facing, grounded);
        if let Some(new_facing) = direction.facing() {
            *facing = new_facing;
        }

        let mut hitbox = Hitbox::new(&config.hitbox, direction).with_owner(entity);
        if direction.is_down() {
            hitbox = hitbox.with_on_hit(OnHit::Pogo);
        }
        debug!("{entity} slashes {direction:?} (grounded: {grounded})");
        commands.spawn((
            Name::new("Slash"),
            hitbox,
            Transform::from_translation(config.slash_position(position, direction).extend(0.0)),
        ));
    }
}
