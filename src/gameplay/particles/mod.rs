use crate::config::{AmbientConfig, ConstellationConfig, DustConfig, GameConfig};
use crate::gameplay::rng::SeededRng;
use crate::gameplay::vehicle::VehicleState;
use crate::states::{AppState, LANDING_CAMERA_DISTANCE, LANDING_FOV_DEGREES};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

pub mod ambient;
pub mod dust;

pub use ambient::{AmbientField, Constellation};
pub use dust::DustTrail;

const DUST_SEED: u64 = 0xD057_7A11;
const AMBIENT_SEED: u64 = 0xA4B1_E47F;
const CONSTELLATION_SEED: u64 = 0xC0A5_7E11;
const AMBIENT_PARTICLE_RADIUS: f32 = 0.06;
const CONSTELLATION_NODE_RADIUS: f32 = 0.08;

pub struct ParticleGameplayPlugin;

impl Plugin for ParticleGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DustTrail>()
            .init_resource::<AmbientField>()
            .init_resource::<Constellation>()
            .init_resource::<AmbientPointer>()
            .add_systems(OnEnter(AppState::Driving), spawn_dust_pool)
            .add_systems(OnExit(AppState::Driving), clear_dust_pool)
            .add_systems(
                Update,
                resize_dust_pool_on_reload
                    .run_if(in_state(AppState::Driving))
                    .run_if(resource_exists_and_changed::<GameConfig>),
            )
            .add_systems(OnEnter(AppState::Landing), spawn_ambient_background)
            .add_systems(OnExit(AppState::Landing), despawn_ambient_background)
            .add_systems(
                Update,
                (
                    track_ambient_pointer,
                    step_ambient_background,
                    sync_ambient_visuals,
                    draw_constellation,
                )
                    .chain()
                    .run_if(in_state(AppState::Landing))
                    .run_if(resource_exists::<GameConfig>),
            );
    }
}

#[derive(Component)]
pub(crate) struct DustSlot(usize);

#[derive(Component)]
pub(crate) struct AmbientSlot(usize);

/// Pointer position on the landing field plane, `None` when the cursor is outside the window.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct AmbientPointer(pub Option<Vec2>);

fn spawn_dust_pool(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<GameConfig>,
    mut trail: ResMut<DustTrail>,
    existing: Query<Entity, With<DustSlot>>,
) {
    rebuild_dust_pool(
        &mut commands,
        &mut meshes,
        &mut materials,
        &config.particles.dust,
        &mut trail,
        &existing,
    );
}

fn resize_dust_pool_on_reload(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<GameConfig>,
    mut trail: ResMut<DustTrail>,
    existing: Query<Entity, With<DustSlot>>,
) {
    if trail.fits(&config.particles.dust) {
        return;
    }
    rebuild_dust_pool(
        &mut commands,
        &mut meshes,
        &mut materials,
        &config.particles.dust,
        &mut trail,
        &existing,
    );
}

fn rebuild_dust_pool(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    tuning: &DustConfig,
    trail: &mut DustTrail,
    existing: &Query<Entity, With<DustSlot>>,
) {
    trail.clear(tuning);

    for entity in existing {
        commands.entity(entity).despawn();
    }

    let mesh = Sphere::new(0.6)
        .mesh()
        .ico(0)
        .unwrap_or_else(|_| Sphere::new(0.6).mesh().uv(8, 6));
    let mesh = meshes.add(mesh);
    let material = materials.add(StandardMaterial {
        base_color: Color::srgba_u8(0xd4, 0xa5, 0x74, 217),
        alpha_mode: AlphaMode::Blend,
        perceptual_roughness: 1.0,
        ..default()
    });

    for slot in 0..trail.capacity() {
        let Some(sample) = trail.sample(slot, tuning) else {
            continue;
        };
        commands.spawn((
            DustSlot(slot),
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_translation(sample.position).with_scale(Vec3::splat(sample.scale)),
        ));
    }

    debug!("Spawned dust pool with {} slots.", trail.capacity());
}

fn clear_dust_pool(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut trail: ResMut<DustTrail>,
    slots: Query<Entity, With<DustSlot>>,
) {
    trail.clear(&config.particles.dust);
    for entity in &slots {
        commands.entity(entity).despawn();
    }
}

pub(crate) fn emit_dust_trail(
    time: Res<Time>,
    config: Res<GameConfig>,
    car: Res<VehicleState>,
    mut trail: ResMut<DustTrail>,
) {
    trail.emit(&car, &config.particles.dust, time.delta_secs());
}

pub(crate) fn update_dust_particles(
    time: Res<Time>,
    config: Res<GameConfig>,
    mut trail: ResMut<DustTrail>,
) {
    trail.integrate(&config.particles.dust, time.delta_secs());
}

pub(crate) fn sync_dust_visuals(
    config: Res<GameConfig>,
    trail: Res<DustTrail>,
    mut slots: Query<(&DustSlot, &mut Transform)>,
) {
    let tuning = &config.particles.dust;
    for (slot, mut transform) in &mut slots {
        let Some(sample) = trail.sample(slot.0, tuning) else {
            transform.translation.y = tuning.park_height;
            continue;
        };
        transform.translation = sample.position;
        transform.scale = Vec3::splat(sample.scale);
    }
}

fn spawn_ambient_background(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<GameConfig>,
    mut field: ResMut<AmbientField>,
    mut constellation: ResMut<Constellation>,
) {
    let mut rng = SeededRng::from_clock(AMBIENT_SEED);
    *field = AmbientField::scatter(&config.particles.ambient, &mut rng);
    *constellation = Constellation::scatter(
        &config.particles.constellation,
        CONSTELLATION_SEED ^ u64::from(rng.next_unit().to_bits()),
    );

    let mesh = meshes.add(Sphere::new(AMBIENT_PARTICLE_RADIUS).mesh().uv(6, 4));
    let material = materials.add(StandardMaterial {
        base_color: Color::srgba(0.667, 0.667, 0.667, 0.5),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..default()
    });

    for (index, particle) in field.particles().iter().enumerate() {
        commands.spawn((
            AmbientSlot(index),
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_translation(particle.position),
        ));
    }

    info!(
        "Landing background: {} ambient particles, {} constellation nodes.",
        field.particles().len(),
        constellation.nodes().len()
    );
}

fn despawn_ambient_background(
    mut commands: Commands,
    mut field: ResMut<AmbientField>,
    mut constellation: ResMut<Constellation>,
    slots: Query<Entity, With<AmbientSlot>>,
) {
    for entity in &slots {
        commands.entity(entity).despawn();
    }
    *field = AmbientField::default();
    *constellation = Constellation::default();
}

fn track_ambient_pointer(
    windows: Query<&Window, With<PrimaryWindow>>,
    mut pointer: ResMut<AmbientPointer>,
) {
    let Ok(window) = windows.single() else {
        pointer.0 = None;
        return;
    };
    pointer.0 = window.cursor_position().and_then(|cursor| {
        ambient::cursor_to_field(
            cursor,
            window.size(),
            LANDING_CAMERA_DISTANCE,
            LANDING_FOV_DEGREES.to_radians(),
        )
    });
}

fn step_ambient_background(
    time: Res<Time>,
    config: Res<GameConfig>,
    pointer: Res<AmbientPointer>,
    mut field: ResMut<AmbientField>,
    mut constellation: ResMut<Constellation>,
) {
    field.step(&config.particles.ambient, pointer.0, time.elapsed_secs());
    constellation.step(&config.particles.constellation, pointer.0);
}

fn sync_ambient_visuals(field: Res<AmbientField>, mut slots: Query<(&AmbientSlot, &mut Transform)>) {
    let particles = field.particles();
    for (slot, mut transform) in &mut slots {
        if let Some(particle) = particles.get(slot.0) {
            transform.translation = particle.position;
        }
    }
}

fn draw_constellation(constellation: Res<Constellation>, mut gizmos: Gizmos) {
    let line_color = Color::srgba(0.533, 0.533, 0.533, 0.2);
    let node_color = Color::srgba(0.6, 0.6, 0.6, 0.6);

    for (start, end) in constellation.connections() {
        gizmos.line(*start, *end, line_color);
    }
    for node in constellation.nodes() {
        gizmos.sphere(
            Isometry3d::from_translation(node.position),
            CONSTELLATION_NODE_RADIUS,
            node_color,
        );
    }
}
