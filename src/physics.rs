//! Avian 2D wiring and the geometry queries the simulation relies on.
//!
//! The core never owns collision geometry. Ground sensing, wall/ledge checks
//! and hitbox overlaps all go through [`GeometryQuery`], which is implemented
//! for Avian's [`SpatialQuery`] and can be faked in tests.

use avian2d::prelude::*;
use bevy::prelude::*;

pub(crate) struct PhysicsPlugin {
    pub gravity: Vec2,
}

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PhysicsPlugins::default())
            .insert_resource(Gravity(self.gravity));
    }
}

/// Collision categories. Filters are sets of these.
#[derive(PhysicsLayer, Clone, Copy, Debug, Default)]
pub enum GameLayer {
    #[default]
    Default,
    /// Surfaces that can be stood on.
    Ground,
    /// Surfaces that turn patrolling enemies around.
    Wall,
    Player,
    Enemy,
}

/// Synchronous, bounded-cost queries against world geometry.
pub trait GeometryQuery {
    /// Whether a ray from `origin` hits anything in `layers` within `max_distance`.
    fn raycast(
        &self,
        origin: Vec2,
        direction: Dir2,
        max_distance: f32,
        layers: LayerMask,
    ) -> bool;

    /// Whether a circle overlaps anything in `layers`.
    fn overlap_circle(&self, center: Vec2, radius: f32, layers: LayerMask) -> bool {
        !self.circle_overlaps(center, radius, layers).is_empty()
    }

    /// Every collider entity in `layers` overlapping the circle.
    fn circle_overlaps(&self, center: Vec2, radius: f32, layers: LayerMask) -> Vec<Entity>;
}

impl GeometryQuery for SpatialQuery<'_, '_> {
    fn raycast(&self, origin: Vec2, direction: Dir2, max_distance: f32, layers: LayerMask) -> bool {
        self.cast_ray(
            origin,
            direction,
            max_distance,
            true,
            &SpatialQueryFilter::from_mask(layers),
        )
        .is_some()
    }

    fn circle_overlaps(&self, center: Vec2, radius: f32, layers: LayerMask) -> Vec<Entity> {
        if radius <= 0.0 {
            return Vec::new();
        }
        self.shape_intersections(
            &Collider::circle(radius),
            center,
            0.0,
            &SpatialQueryFilter::from_mask(layers),
        )
    }
}

/// A contact normal counts as ground when it faces up enough to stand on.
pub fn is_standable(normal: Vec2, min_up: f32) -> bool {
    normal.y > min_up
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory geometry made of horizontal floors, vertical walls and
    //! circular bodies, plus helpers for running systems that take a real
    //! [`SpatialQuery`] on a bare `World`.

    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    /// A collider at `position` that belongs to `layer`.
    pub fn spawn_collider(
        world: &mut World,
        position: Vec2,
        collider: Collider,
        layer: GameLayer,
    ) -> Entity {
        world
            .spawn((
                collider,
                Position(position),
                Rotation::default(),
                CollisionLayers::new(layer, LayerMask::ALL),
            ))
            .id()
    }

    /// Rebuilds the spatial query pipeline from the colliders in `world`.
    pub fn sync_spatial_queries(world: &mut World) {
        world.init_resource::<SpatialQueryPipeline>();
        world
            .run_system_once(|mut query: SpatialQuery| query.update_pipeline())
            .unwrap();
    }

    pub struct Floor {
        pub y: f32,
        pub min_x: f32,
        pub max_x: f32,
    }

    pub struct Body {
        pub entity: Entity,
        pub center: Vec2,
        pub radius: f32,
        pub layer: GameLayer,
    }

    #[derive(Default)]
    pub struct TestGeometry {
        pub floors: Vec<Floor>,
        pub walls: Vec<f32>,
        pub bodies: Vec<Body>,
    }

    impl TestGeometry {
        pub fn with_floor(mut self, y: f32, min_x: f32, max_x: f32) -> Self {
            self.floors.push(Floor { y, min_x, max_x });
            self
        }

        pub fn with_wall(mut self, x: f32) -> Self {
            self.walls.push(x);
            self
        }

        pub fn with_body(
            mut self,
            entity: Entity,
            center: Vec2,
            radius: f32,
            layer: GameLayer,
        ) -> Self {
            self.bodies.push(Body {
                entity,
                center,
                radius,
                layer,
            });
            self
        }
    }

    fn in_mask(layer: GameLayer, layers: LayerMask) -> bool {
        (LayerMask::from(layer) & layers) != LayerMask::NONE
    }

    impl GeometryQuery for TestGeometry {
        fn raycast(
            &self,
            origin: Vec2,
            direction: Dir2,
            max_distance: f32,
            layers: LayerMask,
        ) -> bool {
            let end = origin + *direction * max_distance;
            let hits_floor = in_mask(GameLayer::Ground, layers)
                && self.floors.iter().any(|floor| {
                    let (lo, hi) = (origin.y.min(end.y), origin.y.max(end.y));
                    if floor.y < lo || floor.y > hi || (end.y - origin.y).abs() < f32::EPSILON {
                        return false;
                    }
                    let t = (floor.y - origin.y) / (end.y - origin.y);
                    let x = origin.x + (end.x - origin.x) * t;
                    x >= floor.min_x && x <= floor.max_x
                });
            let hits_wall = in_mask(GameLayer::Wall, layers)
                && self.walls.iter().any(|&wall| {
                    let (lo, hi) = (origin.x.min(end.x), origin.x.max(end.x));
                    wall >= lo && wall <= hi
                });
            hits_floor || hits_wall
        }

        fn circle_overlaps(&self, center: Vec2, radius: f32, layers: LayerMask) -> Vec<Entity> {
            self.bodies
                .iter()
                .filter(|body| in_mask(body.layer, layers))
                .filter(|body| body.center.distance(center) <= body.radius + radius)
                .map(|body| body.entity)
                .collect()
        }

        fn overlap_circle(&self, center: Vec2, radius: f32, layers: LayerMask) -> bool {
            let on_floor = in_mask(GameLayer::Ground, layers)
                && self.floors.iter().any(|floor| {
                    center.x >= floor.min_x
                        && center.x <= floor.max_x
                        && (center.y - floor.y).abs() <= radius
                });
            on_floor || !self.circle_overlaps(center, radius, layers).is_empty()
        }
    }
}
