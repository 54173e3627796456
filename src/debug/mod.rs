use crate::config::{ChaseCameraConfig, DriveConfig, GameConfig};
use crate::gameplay::input::ControlVector;
use crate::gameplay::particles::DustTrail;
use crate::gameplay::vehicle::VehicleState;
use crate::gameplay::zones::{ShowcaseProgress, ZoneDetector};
use crate::states::AppState;
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use serde::Serialize;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

pub struct DebugOverlayPlugin;

impl Plugin for DebugOverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<KeybindOverlayState>()
            .init_resource::<DriveTuningPanelState>()
            .add_systems(Update, spawn_debug_overlay)
            .add_systems(Update, toggle_keybind_overlay)
            .add_systems(Update, toggle_drive_tuning_panel)
            .add_systems(Update, sync_keybind_overlay_visibility)
            .add_systems(OnExit(AppState::Driving), clear_debug_overlay_text)
            .add_systems(
                Update,
                (update_debug_overlay_text, log_state_snapshot_hotkey)
                    .run_if(in_state(AppState::Driving))
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(
                EguiPrimaryContextPass,
                drive_tuning_panel_ui
                    .run_if(in_state(AppState::Driving))
                    .run_if(resource_exists::<GameConfig>),
            );
    }
}

#[derive(Component)]
struct DebugOverlayText;

#[derive(Component)]
struct KeybindOverlayText;

#[derive(Resource, Debug, Clone, Default)]
struct KeybindOverlayState {
    visible: bool,
}

#[derive(Resource, Debug, Default)]
struct DriveTuningPanelState {
    visible: bool,
    drive: Option<DriveConfig>,
    camera: Option<ChaseCameraConfig>,
    status: String,
}

fn spawn_debug_overlay(
    mut commands: Commands,
    keybind_overlay: Res<KeybindOverlayState>,
    config: Option<Res<GameConfig>>,
    existing_overlay: Query<Entity, With<DebugOverlayText>>,
) {
    if !existing_overlay.is_empty() {
        return;
    }

    let Some(config) = config else {
        return;
    };

    if !config.game.app.debug_overlay {
        return;
    }

    commands.spawn((
        DebugOverlayText,
        Text::new(""),
        TextFont {
            font_size: 16.0,
            ..default()
        },
        TextColor(Color::srgb(0.16, 0.18, 0.22)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(12.0),
            top: Val::Px(12.0),
            ..default()
        },
        ZIndex(100),
    ));

    commands.spawn((
        KeybindOverlayText,
        Text::new(keybind_overlay_text()),
        TextFont {
            font_size: 15.0,
            ..default()
        },
        TextColor(Color::srgb(0.90, 0.94, 0.97)),
        BackgroundColor(Color::srgba(0.06, 0.08, 0.10, 0.82)),
        BorderColor::all(Color::srgba(0.60, 0.68, 0.74, 0.9)),
        Node {
            position_type: PositionType::Absolute,
            right: Val::Px(12.0),
            top: Val::Px(12.0),
            padding: UiRect::axes(Val::Px(10.0), Val::Px(8.0)),
            border: UiRect::all(Val::Px(1.0)),
            ..default()
        },
        if keybind_overlay.visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        },
        ZIndex(100),
    ));
}

fn clear_debug_overlay_text(mut overlay_query: Query<&mut Text, With<DebugOverlayText>>) {
    for mut text in &mut overlay_query {
        text.0.clear();
    }
}

#[allow(clippy::too_many_arguments)]
fn update_debug_overlay_text(
    real_time: Res<Time<Real>>,
    diagnostics: Res<DiagnosticsStore>,
    car: Res<VehicleState>,
    controls: Res<ControlVector>,
    detector: Res<ZoneDetector>,
    showcase: Res<ShowcaseProgress>,
    trail: Res<DustTrail>,
    mut overlay_query: Query<&mut Text, With<DebugOverlayText>>,
) {
    let Ok(mut text) = overlay_query.single_mut() else {
        return;
    };

    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|value| value.smoothed())
        .unwrap_or(0.0);

    let now = real_time.elapsed_secs_f64();
    let active_zones = detector
        .active_zones()
        .iter()
        .map(|zone_id| format!("{zone_id} ({:.1}s)", detector.time_in_zone(zone_id, now)))
        .collect::<Vec<_>>();
    let active_zones = if active_zones.is_empty() {
        "none".to_string()
    } else {
        active_zones.join(", ")
    };

    let held = |held: bool, label: &'static str| if held { label } else { "-" };

    *text = Text::new(format!(
        "FPS: {fps:>5.1}\nPosition: ({x:>6.1}, {z:>6.1}) | Heading: {heading:>6.2} rad\nSpeed: {speed:>5.1} (forward {forward:>5.1})\nDrift: {drift} | Intensity: {intensity:.2}\nInput: {up} {down} {left} {right} {brake}\nZones: {active_zones} | Completed: {completed}/{total}\nDust: {live}/{capacity} live\nHotkeys: H help | V drive tune | F9 snapshot | F5 reload config",
        x = car.position.x,
        z = car.position.z,
        heading = car.heading,
        speed = car.planar_speed(),
        forward = car.forward_speed,
        drift = if car.is_drifting { "yes" } else { "no" },
        intensity = car.drift_intensity,
        up = held(controls.forward, "W"),
        down = held(controls.backward, "S"),
        left = held(controls.left, "A"),
        right = held(controls.right, "D"),
        brake = held(controls.brake, "Space"),
        completed = showcase.completed_count(),
        total = detector.len(),
        live = trail.live_count(),
        capacity = trail.capacity(),
    ));
}

fn toggle_keybind_overlay(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut state: ResMut<KeybindOverlayState>,
    config: Option<Res<GameConfig>>,
) {
    let Some(config) = config else {
        return;
    };

    if !config.game.app.debug_overlay {
        return;
    }

    if keyboard.just_pressed(KeyCode::KeyH) {
        state.visible = !state.visible;
        info!(
            "Debug keybind panel {}.",
            if state.visible { "shown" } else { "hidden" }
        );
    }
}

fn sync_keybind_overlay_visibility(
    state: Res<KeybindOverlayState>,
    mut query: Query<&mut Visibility, With<KeybindOverlayText>>,
) {
    if !state.is_changed() {
        return;
    }

    let next_visibility = if state.visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };

    for mut visibility in &mut query {
        *visibility = next_visibility;
    }
}

fn toggle_drive_tuning_panel(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut panel_state: ResMut<DriveTuningPanelState>,
    config: Option<Res<GameConfig>>,
) {
    if !keyboard.just_pressed(KeyCode::KeyV) {
        return;
    }

    panel_state.visible = !panel_state.visible;
    if panel_state.visible {
        if let Some(config) = config {
            sync_panel_state_from_config(&mut panel_state, &config);
        }
        info!("Drive tuning panel shown.");
    } else {
        info!("Drive tuning panel hidden.");
    }
}

struct TuningRow<'a> {
    key: &'static str,
    value: &'a mut f32,
    range: RangeInclusive<f32>,
    drag_speed: f32,
}

fn row<'a>(
    key: &'static str,
    value: &'a mut f32,
    range: RangeInclusive<f32>,
    drag_speed: f32,
) -> TuningRow<'a> {
    TuningRow {
        key,
        value,
        range,
        drag_speed,
    }
}

fn drive_tuning_rows(drive: &mut DriveConfig) -> Vec<TuningRow<'_>> {
    vec![
        row("engine_power", &mut drive.engine_power, 0.0..=100.0, 0.1),
        row("reverse_power_factor", &mut drive.reverse_power_factor, 0.0..=1.0, 0.01),
        row("brake_power", &mut drive.brake_power, 0.0..=10.0, 0.01),
        row("brake_factor", &mut drive.brake_factor, 0.0..=1.0, 0.01),
        row("drift_brake_factor", &mut drive.drift_brake_factor, 0.0..=1.0, 0.01),
        row("max_speed", &mut drive.max_speed, 1.0..=60.0, 0.1),
        row("friction", &mut drive.friction, 0.0..=1.0, 0.005),
        row("drift_friction", &mut drive.drift_friction, 0.0..=1.0, 0.005),
        row("turn_speed", &mut drive.turn_speed, 0.0..=5.0, 0.01),
        row("drift_turn_speed", &mut drive.drift_turn_speed, 0.0..=5.0, 0.01),
        row("grip_recovery", &mut drive.grip_recovery, 0.0..=20.0, 0.05),
        row("min_speed_to_turn", &mut drive.min_speed_to_turn, 0.0..=5.0, 0.01),
        row("drift_speed_threshold", &mut drive.drift_speed_threshold, 0.0..=20.0, 0.1),
        row("steer_lerp", &mut drive.steer_lerp, 0.0..=1.0, 0.005),
        row("drift_steer_lerp", &mut drive.drift_steer_lerp, 0.0..=1.0, 0.005),
        row("angular_decay", &mut drive.angular_decay, 0.0..=1.0, 0.005),
        row("speed_factor_cap", &mut drive.speed_factor_cap, 0.0..=3.0, 0.01),
        row("drift_kick", &mut drive.drift_kick, 0.0..=2.0, 0.01),
        row("wall_bounce", &mut drive.wall_bounce, -1.0..=0.0, 0.01),
        row("tilt_factor", &mut drive.tilt_factor, 0.0..=1.0, 0.005),
        row("drift_tilt_factor", &mut drive.drift_tilt_factor, 0.0..=1.0, 0.005),
        row("tilt_lerp_rate", &mut drive.tilt_lerp_rate, 0.0..=30.0, 0.1),
        row("wheel_spin_factor", &mut drive.wheel_spin_factor, 0.0..=10.0, 0.05),
    ]
}

fn camera_tuning_rows(camera: &mut ChaseCameraConfig) -> Vec<TuningRow<'_>> {
    vec![
        row("distance", &mut camera.distance, 1.0..=100.0, 0.1),
        row("offset_factor", &mut camera.offset_factor, 0.0..=2.0, 0.01),
        row("height", &mut camera.height, 1.0..=100.0, 0.1),
        row("position_lerp", &mut camera.position_lerp, 0.001..=1.0, 0.001),
        row("look_at_lerp", &mut camera.look_at_lerp, 0.001..=1.0, 0.001),
    ]
}

fn drive_tuning_panel_ui(
    mut egui_contexts: EguiContexts,
    mut panel_state: ResMut<DriveTuningPanelState>,
    mut config: ResMut<GameConfig>,
) {
    if !panel_state.visible {
        return;
    }

    if panel_state.drive.is_none() || panel_state.camera.is_none() {
        sync_panel_state_from_config(&mut panel_state, &config);
    }

    let (Some(mut drive), Some(mut camera)) =
        (panel_state.drive.clone(), panel_state.camera.clone())
    else {
        return;
    };

    let mut window_open = panel_state.visible;
    let mut params_changed = false;
    let mut reload_clicked = false;
    let mut apply_clicked = false;
    let status = panel_state.status.clone();

    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };
    egui::Window::new("Drive Tuning")
        .open(&mut window_open)
        .resizable(true)
        .default_width(520.0)
        .show(ctx, |ui| {
            ui.label("Each row has a slider plus a free-form float value.");
            ui.separator();

            ui.collapsing("Drift Integrator", |ui| {
                for row in drive_tuning_rows(&mut drive) {
                    params_changed |= tuning_slider_row(ui, row);
                }
            });

            ui.collapsing("Chase Camera", |ui| {
                for row in camera_tuning_rows(&mut camera) {
                    params_changed |= tuning_slider_row(ui, row);
                }
            });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Reload From Config").clicked() {
                    reload_clicked = true;
                }
                if ui.button("Apply To drive.toml").clicked() {
                    apply_clicked = true;
                }
            });

            if !status.is_empty() {
                ui.separator();
                ui.label(status);
            }
        });

    panel_state.visible = window_open;

    if reload_clicked {
        sync_panel_state_from_config(&mut panel_state, &config);
        panel_state.status = "Reloaded values from current config.".to_string();
        return;
    }

    panel_state.drive = Some(drive.clone());
    panel_state.camera = Some(camera.clone());

    if params_changed {
        config.drive.drive = drive.clone();
        config.drive.camera = camera.clone();
        panel_state.status = "Live-tuning active (in-memory config updated).".to_string();
    }

    if apply_clicked {
        match persist_drive_tuning_and_reload(&mut config, &drive, &camera) {
            Ok(message) => {
                panel_state.status = message;
                sync_panel_state_from_config(&mut panel_state, &config);
            }
            Err(error) => panel_state.status = error,
        }
    }
}

fn tuning_slider_row(ui: &mut egui::Ui, row: TuningRow<'_>) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(row.key);
        changed |= ui
            .add(egui::Slider::new(&mut *row.value, row.range).show_value(false))
            .changed();
        changed |= ui
            .add(egui::DragValue::new(row.value).speed(row.drag_speed as f64))
            .changed();
    });
    changed
}

fn sync_panel_state_from_config(panel_state: &mut DriveTuningPanelState, config: &GameConfig) {
    panel_state.drive = Some(config.drive.drive.clone());
    panel_state.camera = Some(config.drive.camera.clone());
}

fn persist_drive_tuning_and_reload(
    config: &mut GameConfig,
    drive: &DriveConfig,
    camera: &ChaseCameraConfig,
) -> Result<String, String> {
    let path = Path::new("config").join("drive.toml");
    let original_raw = fs::read_to_string(&path)
        .map_err(|error| format!("Failed reading `{}`: {error}", path.display()))?;
    let mut root: toml::Value = toml::from_str(&original_raw)
        .map_err(|error| format!("Failed parsing `{}`: {error}", path.display()))?;

    write_rows_to_toml_table(&mut root, "drive", drive_tuning_rows(&mut drive.clone()))?;
    write_rows_to_toml_table(&mut root, "camera", camera_tuning_rows(&mut camera.clone()))?;

    let updated_raw = toml::to_string_pretty(&root)
        .map_err(|error| format!("Failed serializing drive TOML: {error}"))?;
    fs::write(&path, updated_raw)
        .map_err(|error| format!("Failed writing `{}`: {error}", path.display()))?;

    match GameConfig::load_from_dir(Path::new("config")) {
        Ok(new_config) => {
            *config = new_config;
            Ok(format!(
                "Applied tuning and saved to {}.",
                path.to_string_lossy()
            ))
        }
        Err(error) => {
            if !restore_file(&path, &original_raw) {
                return Err(format!(
                    "Apply failed validation: {error}. Could not revert `{}`.",
                    path.display()
                ));
            }
            if let Ok(restored) = GameConfig::load_from_dir(Path::new("config")) {
                *config = restored;
            }
            Err(format!(
                "Apply failed validation: {error}. Reverted `{}`.",
                path.display()
            ))
        }
    }
}

fn restore_file(path: &Path, raw: &str) -> bool {
    match fs::write(path, raw) {
        Ok(()) => true,
        Err(error) => {
            error!("Failed restoring `{}`: {error}", path.display());
            false
        }
    }
}

fn write_rows_to_toml_table(
    root: &mut toml::Value,
    table_name: &str,
    rows: Vec<TuningRow<'_>>,
) -> Result<(), String> {
    let Some(root_table) = root.as_table_mut() else {
        return Err("drive.toml: root is not a table".to_string());
    };
    let table = root_table
        .entry(table_name.to_string())
        .or_insert(toml::Value::Table(toml::map::Map::new()));
    let Some(table) = table.as_table_mut() else {
        return Err(format!("drive.toml: `{table_name}` is not a table"));
    };

    for row in rows {
        set_toml_float(table, row.key, *row.value)?;
    }
    Ok(())
}

fn set_toml_float(
    table: &mut toml::map::Map<String, toml::Value>,
    key: &str,
    value: f32,
) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!("`{key}` is not a finite number"));
    }

    table.insert(key.to_string(), toml::Value::Float(value as f64));
    Ok(())
}

#[derive(Debug, Serialize)]
struct ZoneSnapshot {
    id: String,
    inside: bool,
    time_in_zone: f64,
    progress: f32,
    completed: bool,
}

#[derive(Debug, Serialize)]
struct StateSnapshot {
    position: [f32; 3],
    velocity: [f32; 3],
    heading: f32,
    forward_speed: f32,
    is_moving: bool,
    is_drifting: bool,
    drift_intensity: f32,
    wheel_rotation: f32,
    controls: [bool; 5],
    zones: Vec<ZoneSnapshot>,
    dust_live: usize,
    dust_spawned_total: u64,
}

impl StateSnapshot {
    fn capture(
        car: &VehicleState,
        controls: &ControlVector,
        detector: &ZoneDetector,
        showcase: &ShowcaseProgress,
        trail: &DustTrail,
        now_secs: f64,
    ) -> Self {
        Self {
            position: car.position.to_array(),
            velocity: car.velocity.to_array(),
            heading: car.heading,
            forward_speed: car.forward_speed,
            is_moving: car.is_moving,
            is_drifting: car.is_drifting,
            drift_intensity: car.drift_intensity,
            wheel_rotation: car.wheel_rotation,
            controls: [
                controls.forward,
                controls.backward,
                controls.left,
                controls.right,
                controls.brake,
            ],
            zones: detector
                .zones()
                .map(|zone| ZoneSnapshot {
                    id: zone.id.clone(),
                    inside: detector.is_in_zone(&zone.id),
                    time_in_zone: detector.time_in_zone(&zone.id, now_secs),
                    progress: showcase.progress(&zone.id),
                    completed: showcase.is_completed(&zone.id),
                })
                .collect(),
            dust_live: trail.live_count(),
            dust_spawned_total: trail.spawned_total(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn log_state_snapshot_hotkey(
    keyboard: Res<ButtonInput<KeyCode>>,
    real_time: Res<Time<Real>>,
    car: Res<VehicleState>,
    controls: Res<ControlVector>,
    detector: Res<ZoneDetector>,
    showcase: Res<ShowcaseProgress>,
    trail: Res<DustTrail>,
) {
    if !keyboard.just_pressed(KeyCode::F9) {
        return;
    }

    let snapshot = StateSnapshot::capture(
        &car,
        &controls,
        &detector,
        &showcase,
        &trail,
        real_time.elapsed_secs_f64(),
    );
    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => info!("State snapshot:\n{json}"),
        Err(error) => error!("Failed to serialize state snapshot: {error}"),
    }
}

fn keybind_overlay_text() -> &'static str {
    "Keybinds\n\
H - Toggle this panel\n\
V - Toggle drive tuning panel\n\
F5 - Hot-reload config\n\
F9 - Log state snapshot\n\
W / Up - Accelerate\n\
S / Down - Reverse\n\
A / Left - Steer left\n\
D / Right - Steer right\n\
Space - Brake (hold while turning to drift)\n\
Esc - Back to landing\n\
Enter / G - Landing -> drive"
}
