use avian2d::prelude::{LayerMask, LinearVelocity, SpatialQuery};
use bevy::prelude::*;

use crate::motion::{Facing, MotionState};
use crate::physics::{GameLayer, GeometryQuery};
use crate::player::Player;

const MIN_SMOOTH_TIME: f32 = 0.0001;
/// Speed above which the sprite turns to face its motion.
const FACING_THRESHOLD: f32 = 0.02;
/// Gap forced between the radii when they are configured the wrong way round.
const MIN_HYSTERESIS: f32 = 0.5;

/// Ground enemy that patrols between walls and ledges and chases the player
/// once it comes close.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(AiState, AiTarget, MotionState, Facing, LinearVelocity)]
pub struct EnemyAi {
    pub move_speed: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    /// Horizontal distance at which a chase stops closing in.
    pub stop_distance: f32,
    pub aggro_radius: f32,
    pub deaggro_radius: f32,
    pub avoid_cliffs_while_chasing: bool,
    pub rays: TerrainRays,
}

impl Default for EnemyAi {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            acceleration: 12.0,
            deceleration: 14.0,
            stop_distance: 0.2,
            aggro_radius: 6.0,
            deaggro_radius: 8.0,
            avoid_cliffs_while_chasing: true,
            rays: TerrainRays::default(),
        }
    }
}

/// Wall and ledge rays, mirrored by the heading.
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct TerrainRays {
    pub wall_offset: Vec2,
    pub wall_distance: f32,
    pub wall_layers: LayerMask,
    pub ledge_offset: Vec2,
    pub ledge_depth: f32,
    pub ground_layers: LayerMask,
}

impl Default for TerrainRays {
    fn default() -> Self {
        Self {
            wall_offset: Vec2::new(0.2, 0.1),
            wall_distance: 0.4,
            wall_layers: GameLayer::Wall.into(),
            ledge_offset: Vec2::new(0.25, 0.05),
            ledge_depth: 0.7,
            ground_layers: GameLayer::Ground.into(),
        }
    }
}

impl TerrainRays {
    pub fn wall_ahead(&self, geometry: &impl GeometryQuery, position: Vec2, heading: f32) -> bool {
        let origin = position + Vec2::new(self.wall_offset.x * heading, self.wall_offset.y);
        let direction = if heading < 0.0 { Dir2::NEG_X } else { Dir2::X };
        geometry.raycast(origin, direction, self.wall_distance, self.wall_layers)
    }

    pub fn ground_ahead(
        &self,
        geometry: &impl GeometryQuery,
        position: Vec2,
        heading: f32,
    ) -> bool {
        let origin = position + Vec2::new(self.ledge_offset.x * heading, self.ledge_offset.y);
        geometry.raycast(origin, Dir2::NEG_Y, self.ledge_depth, self.ground_layers)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub enum AggroState {
    #[default]
    Patrolling,
    Chasing,
}

impl AggroState {
    /// Hysteresis: start chasing inside `aggro_radius`, give up only beyond
    /// `deaggro_radius`.
    pub fn next(self, distance: f32, aggro_radius: f32, deaggro_radius: f32) -> Self {
        match self {
            AggroState::Patrolling if distance <= aggro_radius => AggroState::Chasing,
            AggroState::Chasing if distance >= deaggro_radius => AggroState::Patrolling,
            state => state,
        }
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct AiState {
    pub aggro: AggroState,
    /// Patrol/chase direction, +1 or -1. Independent of the sprite facing.
    pub heading: f32,
}

impl Default for AiState {
    fn default() -> Self {
        Self {
            aggro: AggroState::Patrolling,
            heading: 1.0,
        }
    }
}

/// The entity an enemy chases, resolved once when the AI is added.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AiTarget(pub Option<Entity>);

/// What the enemy knows this step.
#[derive(Debug, Clone, Copy)]
pub struct Perception {
    pub position: Vec2,
    pub velocity_x: f32,
    pub target: Option<Vec2>,
    pub dt: f32,
}

impl EnemyAi {
    pub fn with_radii(mut self, aggro_radius: f32, deaggro_radius: f32) -> Self {
        self.aggro_radius = aggro_radius;
        self.deaggro_radius = deaggro_radius;
        self
    }

    pub fn with_speed(mut self, move_speed: f32) -> Self {
        self.move_speed = move_speed;
        self
    }

    /// Returns `false` if the radii had to be repaired.
    pub fn validate(&mut self) -> bool {
        if self.aggro_radius < self.deaggro_radius {
            return true;
        }
        self.deaggro_radius = self.aggro_radius + MIN_HYSTERESIS;
        false
    }

    fn acceleration_time(&self) -> f32 {
        1.0 / self.acceleration.max(MIN_SMOOTH_TIME)
    }

    fn deceleration_time(&self) -> f32 {
        1.0 / self.deceleration.max(MIN_SMOOTH_TIME)
    }

    /// One steering step. Returns the new horizontal velocity.
    pub fn steer(
        &self,
        state: &mut AiState,
        motion: &mut MotionState,
        geometry: &impl GeometryQuery,
        perception: Perception,
    ) -> f32 {
        if let Some(target) = perception.target {
            let distance = perception.position.distance(target);
            state.aggro = state.aggro.next(distance, self.aggro_radius, self.deaggro_radius);
            if state.aggro == AggroState::Chasing {
                return self.chase(state, motion, geometry, perception, target);
            }
        }
        self.patrol(state, motion, geometry, perception)
    }

    fn patrol(
        &self,
        state: &mut AiState,
        motion: &mut MotionState,
        geometry: &impl GeometryQuery,
        perception: Perception,
    ) -> f32 {
        let position = perception.position;
        if self.rays.wall_ahead(geometry, position, state.heading)
            || !self.rays.ground_ahead(geometry, position, state.heading)
        {
            state.heading = -state.heading;
        }
        motion.smooth_horizontal(
            perception.velocity_x,
            state.heading * self.move_speed,
            self.acceleration_time(),
            self.deceleration_time(),
            perception.dt,
        )
    }

    fn chase(
        &self,
        state: &mut AiState,
        motion: &mut MotionState,
        geometry: &impl GeometryQuery,
        perception: Perception,
        target: Vec2,
    ) -> f32 {
        let dx = target.x - perception.position.x;
        let brake = |motion: &mut MotionState| {
            motion.horizontal.step(
                perception.velocity_x,
                0.0,
                self.deceleration_time(),
                perception.dt,
            )
        };

        if dx.abs() <= self.stop_distance {
            return brake(motion);
        }

        state.heading = dx.signum();
        if self.avoid_cliffs_while_chasing
            && !self.rays.ground_ahead(geometry, perception.position, state.heading)
        {
            return brake(motion);
        }

        motion.horizontal.step(
            perception.velocity_x,
            state.heading * self.move_speed,
            self.acceleration_time(),
            perception.dt,
        )
    }
}

/// Validates new enemies and points them at the player.
pub fn resolve_ai_targets(
    mut added: Query<(Entity, &mut EnemyAi, &mut AiTarget), Added<EnemyAi>>,
    players: Query<Entity, With<Player>>,
) {
    for (entity, mut ai, mut target) in &mut added {
        if !ai.validate() {
            warn!(
                "{entity}: aggro radius {} is not below deaggro radius, using {} instead",
                ai.aggro_radius, ai.deaggro_radius
            );
        }
        target.0 = players.single().ok();
        if target.0.is_none() {
            debug!("{entity} has no player to chase");
        }
    }
}

pub fn enemy_steering(
    time: Res<Time>,
    spatial_query: SpatialQuery,
    targets: Query<&Transform>,
    mut enemies: Query<(
        Entity,
        &EnemyAi,
        &AiTarget,
        &Transform,
        &mut AiState,
        &mut MotionState,
        &mut LinearVelocity,
        &mut Facing,
    )>,
) {
    let dt = time.delta_secs();

    for (entity, ai, target, transform, mut state, mut motion, mut velocity, mut facing) in
        &mut enemies
    {
        let perception = Perception {
            position: transform.translation.truncate(),
            velocity_x: velocity.x,
            target: target
                .0
                .and_then(|target| targets.get(target).ok())
                .map(|target| target.translation.truncate()),
            dt,
        };

        let previous = state.aggro;
        velocity.x = ai.steer(&mut state, &mut motion, &spatial_query, perception);
        if state.aggro != previous {
            debug!("{entity} is now {:?}", state.aggro);
        }
        facing.follow(velocity.x, FACING_THRESHOLD);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::testing::{TestGeometry, spawn_collider, sync_spatial_queries};
    use avian2d::prelude::Collider;
    use bevy::ecs::system::RunSystemOnce;
    use std::time::Duration;

    const DT: f32 = 1.0 / 64.0;

    fn perceive(position: Vec2, target: Option<Vec2>) -> Perception {
        Perception {
            position,
            velocity_x: 0.0,
            target,
            dt: DT,
        }
    }

    #[test]
    fn aggro_hysteresis_scenario() {
        let mut state = AggroState::Patrolling;
        state = state.next(5.0, 6.0, 8.0);
        assert_eq!(state, AggroState::Chasing);
        state = state.next(7.0, 6.0, 8.0);
        assert_eq!(state, AggroState::Chasing);
        state = state.next(9.0, 6.0, 8.0);
        assert_eq!(state, AggroState::Patrolling);
    }

    #[test]
    fn no_flapping_in_dead_band() {
        for distance in [6.5, 7.0, 7.9] {
            assert_eq!(
                AggroState::Patrolling.next(distance, 6.0, 8.0),
                AggroState::Patrolling
            );
            assert_eq!(
                AggroState::Chasing.next(distance, 6.0, 8.0),
                AggroState::Chasing
            );
        }
    }

    #[test]
    fn inverted_radii_are_repaired() {
        let mut ai = EnemyAi::default().with_radii(8.0, 6.0);
        assert!(!ai.validate());
        assert!(ai.aggro_radius < ai.deaggro_radius);
        assert!(EnemyAi::default().validate());
    }

    #[test]
    fn patrol_turns_at_wall() {
        let ai = EnemyAi::default();
        let geometry = TestGeometry::default()
            .with_floor(0.0, -10.0, 10.0)
            .with_wall(0.7);
        let mut state = AiState::default();
        let mut motion = MotionState::default();

        let vx = ai.steer(
            &mut state,
            &mut motion,
            &geometry,
            perceive(Vec2::new(0.2, 0.5), None),
        );

        assert_eq!(state.heading, -1.0);
        assert!(vx < 0.0);
    }

    #[test]
    fn patrol_turns_at_ledge() {
        let ai = EnemyAi::default();
        let geometry = TestGeometry::default().with_floor(0.0, -10.0, 1.0);
        let mut state = AiState::default();
        let mut motion = MotionState::default();

        let inland = perceive(Vec2::new(0.0, 0.5), None);
        ai.steer(&mut state, &mut motion, &geometry, inland);
        assert_eq!(state.heading, 1.0);

        let at_edge = perceive(Vec2::new(0.9, 0.5), None);
        ai.steer(&mut state, &mut motion, &geometry, at_edge);
        assert_eq!(state.heading, -1.0);
    }

    #[test]
    fn chase_heads_towards_target() {
        let ai = EnemyAi::default();
        let geometry = TestGeometry::default().with_floor(0.0, -10.0, 10.0);
        let mut state = AiState::default();
        let mut motion = MotionState::default();

        let vx = ai.steer(
            &mut state,
            &mut motion,
            &geometry,
            perceive(Vec2::new(0.0, 0.5), Some(Vec2::new(-4.0, 0.5))),
        );

        assert_eq!(state.aggro, AggroState::Chasing);
        assert_eq!(state.heading, -1.0);
        assert!(vx < 0.0);
    }

    #[test]
    fn chase_brakes_at_cliff_and_when_close() {
        let ai = EnemyAi::default();
        let geometry = TestGeometry::default().with_floor(0.0, -1.0, 1.0);
        let mut motion = MotionState::default();

        let mut state = AiState::default();
        let moving = Perception {
            velocity_x: 3.0,
            ..perceive(Vec2::new(0.9, 0.5), Some(Vec2::new(4.0, 0.5)))
        };
        let vx = ai.steer(&mut state, &mut motion, &geometry, moving);
        assert_eq!(state.aggro, AggroState::Chasing);
        assert!(vx < 3.0);

        let mut state = AiState::default();
        let mut motion = MotionState::default();
        let close = Perception {
            velocity_x: 3.0,
            ..perceive(Vec2::new(0.0, 0.5), Some(Vec2::new(0.1, 2.0)))
        };
        let vx = ai.steer(&mut state, &mut motion, &geometry, close);
        assert!(vx < 3.0 && vx >= 0.0);
    }

    #[test]
    fn far_target_means_patrol() {
        let ai = EnemyAi::default();
        let geometry = TestGeometry::default().with_floor(0.0, -10.0, 10.0);
        let mut state = AiState::default();
        let mut motion = MotionState::default();

        let vx = ai.steer(
            &mut state,
            &mut motion,
            &geometry,
            perceive(Vec2::new(0.0, 0.5), Some(Vec2::new(-20.0, 0.5))),
        );

        assert_eq!(state.aggro, AggroState::Patrolling);
        assert!(vx > 0.0);
    }

    #[test]
    fn targets_resolve_to_the_player() {
        let mut world = World::new();
        let player = world.spawn(Player).id();
        let enemy = world.spawn(EnemyAi::default().with_radii(9.0, 3.0)).id();

        world.run_system_once(resolve_ai_targets).unwrap();

        assert_eq!(world.get::<AiTarget>(enemy), Some(&AiTarget(Some(player))));
        let ai = world.get::<EnemyAi>(enemy).unwrap();
        assert!(ai.aggro_radius < ai.deaggro_radius);
    }

    /// A long floor with its top at `y = 0`, stepped at the fixed rate.
    fn level() -> World {
        let mut world = World::new();
        let mut time = Time::<()>::default();
        time.advance_by(Duration::from_secs_f32(DT));
        world.insert_resource(time);
        spawn_collider(
            &mut world,
            Vec2::new(0.0, -0.5),
            Collider::rectangle(20.0, 1.0),
            GameLayer::Ground,
        );
        world
    }

    #[test]
    fn steering_chases_a_nearby_player() {
        let mut world = level();
        sync_spatial_queries(&mut world);
        let player = world
            .spawn((Player, Transform::from_xyz(-3.0, 0.5, 0.0)))
            .id();
        let enemy = world
            .spawn((
                EnemyAi::default(),
                AiTarget(Some(player)),
                Transform::from_xyz(0.0, 0.5, 0.0),
            ))
            .id();

        world.run_system_once(enemy_steering).unwrap();

        let state = world.get::<AiState>(enemy).unwrap();
        assert_eq!(state.aggro, AggroState::Chasing);
        assert!(world.get::<LinearVelocity>(enemy).unwrap().x < 0.0);
        assert_eq!(*world.get::<Facing>(enemy).unwrap(), Facing::Left);
    }

    #[test]
    fn steering_patrols_away_from_walls() {
        let mut world = level();
        spawn_collider(
            &mut world,
            Vec2::new(0.8, 1.0),
            Collider::rectangle(0.2, 2.0),
            GameLayer::Wall,
        );
        sync_spatial_queries(&mut world);
        let enemy = world
            .spawn((EnemyAi::default(), Transform::from_xyz(0.2, 0.5, 0.0)))
            .id();

        world.run_system_once(enemy_steering).unwrap();

        assert_eq!(world.get::<AiState>(enemy).unwrap().heading, -1.0);
        assert!(world.get::<LinearVelocity>(enemy).unwrap().x < 0.0);
        assert_eq!(*world.get::<Facing>(enemy).unwrap(), Facing::Left);
    }

    #[test]
    fn slow_enemies_keep_their_facing() {
        let mut world = level();
        sync_spatial_queries(&mut world);
        let enemy = world
            .spawn((
                EnemyAi::default().with_speed(0.3),
                Facing::Left,
                Transform::from_xyz(0.0, 0.5, 0.0),
            ))
            .id();

        world.run_system_once(enemy_steering).unwrap();

        let vx = world.get::<LinearVelocity>(enemy).unwrap().x;
        assert!(vx > 0.0 && vx <= FACING_THRESHOLD);
        assert_eq!(*world.get::<Facing>(enemy).unwrap(), Facing::Left);
    }
}
