use avian2d::prelude::*;
use bevy::app::RunFixedMainLoop;
use bevy::math::StableInterpolate;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_inspector_egui::quick::WorldInspectorPlugin;

use pogo_knight::SimulationPlugin;
use pogo_knight::SimulationSet;
use pogo_knight::character_controller::PlayerInput;
use pogo_knight::enemy::enemy_bundle;
use pogo_knight::health::{Died, HealthChanged};
use pogo_knight::motion::Facing;
use pogo_knight::physics::GameLayer;
use pogo_knight::player::{Player, player_bundle};

/// World units per screen pixel.
const CAMERA_SCALE: f32 = 1.0 / 48.0;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Pogo knight".into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(WorldInspectorPlugin::new())
        .add_plugins(SimulationPlugin::default())
        .add_plugins(PhysicsDebugPlugin::default())
        .add_systems(Startup, (spawn_camera, spawn_level, spawn_actors))
        .add_systems(
            RunFixedMainLoop,
            pointer_input.in_set(SimulationSet::Input),
        )
        .add_systems(Update, (follow_player, flip_sprites, report_health))
        .run();
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        Projection::Orthographic(OrthographicProjection {
            scale: CAMERA_SCALE,
            ..OrthographicProjection::default_2d()
        }),
        Transform::from_xyz(0.0, 2.0, 0.0),
    ));
}

fn platform(center: Vec2, size: Vec2, layer: GameLayer, color: Color) -> impl Bundle {
    (
        Name::new(format!("{layer:?}")),
        RigidBody::Static,
        Collider::rectangle(size.x, size.y),
        CollisionLayers::new(layer, [GameLayer::Player, GameLayer::Enemy]),
        Sprite::from_color(color, size),
        Transform::from_translation(center.extend(0.0)),
    )
}

fn spawn_level(mut commands: Commands) {
    let ground = Color::srgb(0.35, 0.3, 0.25);
    let wall = Color::srgb(0.25, 0.25, 0.3);

    let floors = [
        (Vec2::new(0.0, -0.5), Vec2::new(24.0, 1.0)),
        (Vec2::new(6.0, 2.5), Vec2::new(5.0, 0.5)),
        (Vec2::new(-7.0, 3.5), Vec2::new(4.0, 0.5)),
    ];
    for (center, size) in floors {
        commands.spawn(platform(center, size, GameLayer::Ground, ground));
    }

    let wall_size = Vec2::new(1.0, 10.0);
    for x in [-12.5, 12.5] {
        let center = Vec2::new(x, 4.0);
        commands.spawn(platform(center, wall_size, GameLayer::Wall, wall));
    }
}

fn spawn_actors(mut commands: Commands) {
    commands.spawn((
        player_bundle(Vec2::new(0.0, 1.0)),
        Sprite::from_color(Color::srgb(0.9, 0.85, 0.7), Vec2::new(0.6, 1.0)),
    ));

    for position in [Vec2::new(-6.0, 1.0), Vec2::new(6.0, 3.5)] {
        commands.spawn((
            enemy_bundle(position),
            Sprite::from_color(Color::srgb(0.8, 0.25, 0.25), Vec2::new(0.6, 1.0)),
        ));
    }
}

/// Mouse position in world space, for pointer aiming.
fn pointer_input(
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform)>,
    mut inputs: Query<&mut PlayerInput>,
) {
    let pointer = windows
        .single()
        .ok()
        .and_then(Window::cursor_position)
        .zip(cameras.single().ok())
        .and_then(|(cursor, (camera, transform))| {
            camera.viewport_to_world_2d(transform, cursor).ok()
        });

    for mut input in &mut inputs {
        input.pointer = pointer;
    }
}

fn follow_player(
    time: Res<Time>,
    player: Query<&Transform, (With<Player>, Without<Camera2d>)>,
    mut camera: Query<&mut Transform, With<Camera2d>>,
) {
    let (Ok(player), Ok(mut camera)) = (player.single(), camera.single_mut()) else {
        return;
    };
    let target = player.translation.with_z(camera.translation.z) + Vec3::Y;
    camera.translation.smooth_nudge(&target, 4.0, time.delta_secs());
}

fn flip_sprites(mut sprites: Query<(&Facing, &mut Sprite), Changed<Facing>>) {
    for (facing, mut sprite) in &mut sprites {
        sprite.flip_x = *facing == Facing::Left;
    }
}

fn report_health(mut changed: EventReader<HealthChanged>, mut died: EventReader<Died>) {
    for event in changed.read() {
        info!("{}: {}/{} hp", event.entity, event.current, event.max);
    }
    for event in died.read() {
        info!("{} is dead", event.entity);
    }
}
