use crate::config::GameConfig;
use bevy::app::AppExit;
use bevy::prelude::*;

pub const LANDING_CAMERA_DISTANCE: f32 = 20.0;
pub const LANDING_FOV_DEGREES: f32 = 50.0;

#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum AppState {
    #[default]
    Boot,
    Landing,
    Driving,
}

pub struct AppStatePlugin;

impl Plugin for AppStatePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(Color::srgb(0.96, 0.95, 0.93)))
            .add_systems(Startup, setup_camera_and_light)
            .add_systems(OnEnter(AppState::Boot), enter_boot)
            .add_systems(
                Update,
                boot_to_first_scene
                    .run_if(in_state(AppState::Boot))
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(OnEnter(AppState::Landing), enter_landing)
            .add_systems(OnExit(AppState::Landing), cleanup_landing_screen)
            .add_systems(Update, landing_controls.run_if(in_state(AppState::Landing)))
            .add_systems(OnEnter(AppState::Driving), enter_driving)
            .add_systems(Update, driving_controls.run_if(in_state(AppState::Driving)));
    }
}

/// The single 3D camera. Landing frames the ambient field head-on; driving hands it to the chase camera.
#[derive(Component)]
pub struct MainCamera;

#[derive(Component)]
struct LandingScreenRoot;

fn landing_camera_transform() -> Transform {
    Transform::from_xyz(0.0, 0.0, LANDING_CAMERA_DISTANCE).looking_at(Vec3::ZERO, Vec3::Y)
}

fn setup_camera_and_light(mut commands: Commands) {
    commands.spawn((
        Name::new("MainCamera"),
        MainCamera,
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: LANDING_FOV_DEGREES.to_radians(),
            ..default()
        }),
        landing_camera_transform(),
    ));

    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            illuminance: 12_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(20.0, 40.0, 15.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn enter_boot() {
    info!("Entered state: Boot");
}

fn boot_to_first_scene(config: Res<GameConfig>, mut next_state: ResMut<NextState<AppState>>) {
    if config.game.app.start_in_driving {
        next_state.set(AppState::Driving);
    } else {
        next_state.set(AppState::Landing);
    }
}

fn enter_landing(mut commands: Commands, mut camera_query: Query<&mut Transform, With<MainCamera>>) {
    if let Ok(mut transform) = camera_query.single_mut() {
        *transform = landing_camera_transform();
    }

    commands
        .spawn((
            Name::new("LandingOverlay"),
            LandingScreenRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
        ))
        .with_children(|parent| {
            parent
                .spawn(Node {
                    flex_direction: FlexDirection::Column,
                    align_items: AlignItems::Center,
                    row_gap: Val::Px(12.0),
                    ..default()
                })
                .with_children(|panel| {
                    panel.spawn((
                        Text::new("Village Drift"),
                        TextFont {
                            font_size: 56.0,
                            ..default()
                        },
                        TextColor(Color::srgb(0.18, 0.18, 0.22)),
                    ));
                    panel.spawn((
                        Text::new("Enter / G - Drive\nQ - Quit"),
                        TextFont {
                            font_size: 22.0,
                            ..default()
                        },
                        TextColor(Color::srgb(0.35, 0.35, 0.40)),
                    ));
                });
        });

    info!("Entered state: Landing");
}

fn cleanup_landing_screen(
    mut commands: Commands,
    landing_screen_query: Query<Entity, With<LandingScreenRoot>>,
) {
    for entity in &landing_screen_query {
        commands.entity(entity).try_despawn();
    }
}

fn landing_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<AppState>>,
    mut exit: MessageWriter<AppExit>,
) {
    if keyboard.any_just_pressed([KeyCode::Enter, KeyCode::KeyG]) {
        next_state.set(AppState::Driving);
    }

    if keyboard.just_pressed(KeyCode::KeyQ) {
        exit.write(AppExit::Success);
    }
}

fn enter_driving() {
    info!("Entered state: Driving");
}

fn driving_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        next_state.set(AppState::Landing);
    }
}
