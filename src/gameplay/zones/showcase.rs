use super::*;
use std::f32::consts::{FRAC_PI_2, TAU};

const COMPLETED_PLATFORM_COLOR: Color = Color::srgba(0.596, 0.831, 0.627, 0.5);
const COMPLETED_RING_COLOR: Color = Color::srgba(0.396, 0.749, 0.439, 0.8);
const IDLE_RING_COLOR: Color = Color::srgba(0.91, 0.647, 0.784, 0.8);
const PROGRESS_RING_COLOR: Color = Color::srgb(1.0, 0.667, 0.267);
const MARKER_SPIN_RATE: f32 = 2.0;
const MARKER_BASE_HEIGHT: f32 = 0.8;
const MARKER_BOB_RATE: f32 = 3.0;
const MARKER_BOB_AMPLITUDE: f32 = 0.1;
const MARKER_PROGRESS_LIFT: f32 = 0.3;

/// Per-zone visit progress as seen by the showcase layer.
#[derive(Resource, Debug, Clone, Default)]
pub struct ShowcaseProgress {
    progress: HashMap<String, f32>,
    completed: HashSet<String>,
    last_completed: Option<String>,
    mounted: Vec<ShowcaseZoneConfig>,
}

impl ShowcaseProgress {
    /// Folds one detector event in. Returns `true` when the event was a dwell completion.
    pub fn apply(&mut self, event: &ZoneEvent, dwell_seconds: f32) -> bool {
        match event {
            ZoneEvent::Entered { .. } => false,
            ZoneEvent::DwellProgress {
                zone_id,
                time_in_area,
            } => {
                let fraction = if dwell_seconds > 0.0 {
                    (*time_in_area as f32 / dwell_seconds).min(1.0)
                } else {
                    1.0
                };
                self.progress.insert(zone_id.clone(), fraction);
                false
            }
            ZoneEvent::Exited { zone_id } => {
                self.progress.insert(zone_id.clone(), 0.0);
                false
            }
            ZoneEvent::DwellCompleted { zone_id } => {
                self.completed.insert(zone_id.clone());
                self.last_completed = Some(zone_id.clone());
                true
            }
        }
    }

    pub fn progress(&self, zone_id: &str) -> f32 {
        self.progress.get(zone_id).copied().unwrap_or(0.0)
    }

    pub fn is_completed(&self, zone_id: &str) -> bool {
        self.completed.contains(zone_id)
    }

    /// Partway through a visit that has not completed yet.
    pub fn is_active(&self, zone_id: &str) -> bool {
        self.progress(zone_id) > 0.0 && !self.is_completed(zone_id)
    }

    pub fn countdown(&self, zone_id: &str, dwell_seconds: f32) -> f32 {
        dwell_seconds * (1.0 - self.progress(zone_id))
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn last_completed(&self) -> Option<&str> {
        self.last_completed.as_deref()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

pub fn marker_height(elapsed_secs: f32, progress: f32) -> f32 {
    MARKER_BASE_HEIGHT
        + (elapsed_secs * MARKER_BOB_RATE).sin() * MARKER_BOB_AMPLITUDE
        + progress * MARKER_PROGRESS_LIFT
}

#[derive(Component)]
pub(crate) struct ShowcaseZoneVisual;

#[derive(Component)]
pub(crate) struct ShowcasePlatform {
    zone_id: String,
    idle_color: Color,
    shows_completed: bool,
}

#[derive(Component)]
pub(crate) struct ShowcaseRing {
    zone_id: String,
    shows_completed: bool,
}

#[derive(Component)]
pub(crate) struct ShowcaseMarker {
    zone_id: String,
}

#[derive(Component)]
pub(crate) struct ShowcaseBanner;

fn zone_color(zone: &ShowcaseZoneConfig) -> Color {
    let [r, g, b] = zone.color;
    Color::srgb(r, g, b)
}

fn register_zones(detector: &mut ZoneDetector, zones: &[ShowcaseZoneConfig]) {
    for zone in zones {
        if detector.register_zone(zone_definition(zone)).is_some() {
            debug!("Replaced showcase zone `{}`", zone.id);
        }
        if let Err(error) = detector.register_dwell_completion(&zone.id, zone.dwell_seconds.into())
        {
            warn!("Skipping dwell completion for `{}`: {error}", zone.id);
        }
    }
}

fn spawn_zone_visuals(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    zones: &[ShowcaseZoneConfig],
) {
    let lay_flat = Quat::from_rotation_x(-FRAC_PI_2);
    let marker_mesh = meshes.add(Sphere::new(0.5).mesh().uv(4, 2));

    for zone in zones {
        let idle_color = zone_color(zone).with_alpha(0.5);
        commands
            .spawn((
                Name::new(format!("ShowcaseZone {}", zone.id)),
                ShowcaseZoneVisual,
                Transform::from_translation(Vec3::from_array(zone.center)),
                Visibility::default(),
            ))
            .with_children(|parent| {
                parent.spawn((
                    ShowcasePlatform {
                        zone_id: zone.id.clone(),
                        idle_color,
                        shows_completed: false,
                    },
                    Mesh3d(meshes.add(Circle::new(zone.radius).mesh().resolution(24))),
                    MeshMaterial3d(materials.add(StandardMaterial {
                        base_color: idle_color,
                        alpha_mode: AlphaMode::Blend,
                        ..default()
                    })),
                    Transform::from_xyz(0.0, 0.02, 0.0).with_rotation(lay_flat),
                ));
                parent.spawn((
                    ShowcaseRing {
                        zone_id: zone.id.clone(),
                        shows_completed: false,
                    },
                    Mesh3d(meshes.add(
                        Annulus::new((zone.radius - 0.3).max(0.0), zone.radius)
                            .mesh()
                            .resolution(32),
                    )),
                    MeshMaterial3d(materials.add(StandardMaterial {
                        base_color: IDLE_RING_COLOR,
                        alpha_mode: AlphaMode::Blend,
                        ..default()
                    })),
                    Transform::from_xyz(0.0, 0.03, 0.0).with_rotation(lay_flat),
                ));
                parent.spawn((
                    ShowcaseMarker {
                        zone_id: zone.id.clone(),
                    },
                    Mesh3d(marker_mesh.clone()),
                    MeshMaterial3d(materials.add(StandardMaterial {
                        base_color: zone_color(zone),
                        ..default()
                    })),
                    Transform::from_xyz(0.0, MARKER_BASE_HEIGHT, 0.0),
                ));
            });
    }
}

pub(super) fn mount_showcase_zones(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<GameConfig>,
    mut detector: ResMut<ZoneDetector>,
    mut progress: ResMut<ShowcaseProgress>,
) {
    let zones = &config.zones.zones;
    register_zones(&mut detector, zones);
    spawn_zone_visuals(&mut commands, &mut meshes, &mut materials, zones);
    progress.mounted = zones.clone();

    commands.spawn((
        Name::new("ShowcaseBanner"),
        ShowcaseBanner,
        Text::new(""),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        TextColor(Color::srgb(0.2, 0.2, 0.25)),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(16.0),
            left: Val::Px(16.0),
            ..default()
        },
    ));

    info!("Registered {} showcase zones.", detector.len());
}

pub(super) fn unmount_showcase_zones(
    mut commands: Commands,
    mut detector: ResMut<ZoneDetector>,
    mut progress: ResMut<ShowcaseProgress>,
    visuals: Query<Entity, Or<(With<ShowcaseZoneVisual>, With<ShowcaseBanner>)>>,
) {
    let zone_ids: Vec<String> = detector.zones().map(|zone| zone.id.clone()).collect();
    for zone_id in &zone_ids {
        detector.unregister_zone(zone_id);
    }
    progress.clear();

    for entity in &visuals {
        commands.entity(entity).despawn();
    }

    info!("Deregistered {} showcase zones.", zone_ids.len());
}

pub(super) fn resync_showcase_zones_on_reload(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<GameConfig>,
    mut detector: ResMut<ZoneDetector>,
    mut progress: ResMut<ShowcaseProgress>,
    visuals: Query<Entity, With<ShowcaseZoneVisual>>,
) {
    let zones = &config.zones.zones;
    if *zones == progress.mounted {
        return;
    }

    let stale: Vec<String> = detector
        .zones()
        .filter(|zone| !config.zones_by_id.contains_key(&zone.id))
        .map(|zone| zone.id.clone())
        .collect();
    for zone_id in &stale {
        detector.unregister_zone(zone_id);
        progress.progress.remove(zone_id);
        progress.completed.remove(zone_id);
    }
    register_zones(&mut detector, zones);

    for entity in &visuals {
        commands.entity(entity).despawn();
    }
    spawn_zone_visuals(&mut commands, &mut meshes, &mut materials, zones);
    progress.mounted = zones.clone();

    info!(
        "Re-synced showcase zones after config reload: {} registered, {} removed.",
        detector.len(),
        stale.len()
    );
}

pub(crate) fn apply_showcase_events(
    config: Res<GameConfig>,
    mut zone_events: MessageReader<ZoneEvent>,
    mut progress: ResMut<ShowcaseProgress>,
) {
    for event in zone_events.read() {
        let Some(zone) = config.zones_by_id.get(event.zone_id()) else {
            continue;
        };
        if progress.apply(event, zone.dwell_seconds) {
            info!("Showcase zone `{}` completed ({})", zone.id, zone.title);
        }
    }
}

#[allow(clippy::type_complexity)]
pub(crate) fn animate_showcase_zones(
    time: Res<Time>,
    config: Res<GameConfig>,
    progress: Res<ShowcaseProgress>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut markers: Query<(&ShowcaseMarker, &mut Transform)>,
    mut platforms: Query<(
        &mut ShowcasePlatform,
        &MeshMaterial3d<StandardMaterial>,
        &GlobalTransform,
    )>,
    mut rings: Query<(&mut ShowcaseRing, &MeshMaterial3d<StandardMaterial>)>,
    mut banner: Query<&mut Text, With<ShowcaseBanner>>,
    mut gizmos: Gizmos,
) {
    let elapsed = time.elapsed_secs();

    for (marker, mut transform) in &mut markers {
        transform.rotation = Quat::from_rotation_y(elapsed * MARKER_SPIN_RATE);
        transform.translation.y = marker_height(elapsed, progress.progress(&marker.zone_id));
    }

    for (mut platform, material, global_transform) in &mut platforms {
        let completed = progress.is_completed(&platform.zone_id);
        if completed != platform.shows_completed {
            if let Some(material) = materials.get_mut(&material.0) {
                material.base_color = if completed {
                    COMPLETED_PLATFORM_COLOR
                } else {
                    platform.idle_color
                };
            }
            platform.shows_completed = completed;
        }

        if progress.is_active(&platform.zone_id) {
            let Some(zone) = config.zones_by_id.get(&platform.zone_id) else {
                continue;
            };
            let center = global_transform.translation() + Vec3::Y * 0.02;
            gizmos.arc_3d(
                TAU * progress.progress(&zone.id),
                zone.radius,
                Isometry3d::from_translation(center),
                PROGRESS_RING_COLOR,
            );
        }
    }

    for (mut ring, material) in &mut rings {
        let completed = progress.is_completed(&ring.zone_id);
        if completed == ring.shows_completed {
            continue;
        }
        if let Some(material) = materials.get_mut(&material.0) {
            material.base_color = if completed {
                COMPLETED_RING_COLOR
            } else {
                IDLE_RING_COLOR
            };
        }
        ring.shows_completed = completed;
    }

    let Ok(mut text) = banner.single_mut() else {
        return;
    };
    let active = config
        .zones
        .zones
        .iter()
        .find(|zone| progress.is_active(&zone.id));
    text.0 = if let Some(zone) = active {
        format!(
            "{}: hold for {:.1}s",
            zone.title,
            progress.countdown(&zone.id, zone.dwell_seconds)
        )
    } else if let Some(zone) = progress
        .last_completed()
        .and_then(|zone_id| config.zones_by_id.get(zone_id))
    {
        format!("{}\n{}\n{}", zone.title, zone.description, zone.link)
    } else {
        String::new()
    };
}
