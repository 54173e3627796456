use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "config";

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, load_game_config)
            .add_systems(Update, reload_game_config_hotkey);
    }
}

fn load_game_config(mut commands: Commands) {
    let config = GameConfig::load_from_dir(Path::new(CONFIG_DIR)).unwrap_or_else(|error| {
        panic!("failed to load configuration from `{CONFIG_DIR}`: {error}");
    });

    log_config_summary("Loaded", &config);
    info!("Press F5 to hot-reload config files from `{CONFIG_DIR}`.");

    commands.insert_resource(config);
}

fn reload_game_config_hotkey(
    keyboard: Res<ButtonInput<KeyCode>>,
    game_config: Option<ResMut<GameConfig>>,
) {
    if !keyboard.just_pressed(KeyCode::F5) {
        return;
    }

    let Some(mut current_config) = game_config else {
        warn!("Config hot-reload requested, but `GameConfig` resource is not initialized yet.");
        return;
    };

    match GameConfig::load_from_dir(Path::new(CONFIG_DIR)) {
        Ok(new_config) => {
            *current_config = new_config;
            log_config_summary("Hot-reloaded", &current_config);
        }
        Err(error) => {
            error!("Config hot-reload failed; keeping previous config: {error}");
        }
    }
}

fn log_config_summary(prefix: &str, config: &GameConfig) {
    info!(
        "{prefix} config: {} showcase zones, dust pool of {}, {} ambient particles, world {:.0}x{:.0}.",
        config.zones.zones.len(),
        config.particles.dust.capacity,
        config.particles.ambient.count,
        config.game.world.max_x - config.game.world.min_x,
        config.game.world.max_z - config.game.world.min_z,
    );
}

#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    pub game: GameFile,
    pub drive: DriveFile,
    pub particles: ParticlesFile,
    pub zones: ZonesFile,
    pub zones_by_id: HashMap<String, ShowcaseZoneConfig>,
}

impl GameConfig {
    pub fn load_from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let game: GameFile = read_toml(&config_dir.join("game.toml"))?;
        let drive: DriveFile = read_toml(&config_dir.join("drive.toml"))?;
        let particles: ParticlesFile = read_toml(&config_dir.join("particles.toml"))?;
        let zones: ZonesFile = read_toml(&config_dir.join("zones.toml"))?;

        let config = Self {
            zones_by_id: to_index("zones.toml::zones", &zones.zones)?,
            game,
            drive,
            particles,
            zones,
        };

        config.validate_references()?;
        Ok(config)
    }

    fn validate_references(&self) -> Result<(), ConfigError> {
        let world = &self.game.world;
        if world.min_x >= world.max_x || world.min_z >= world.max_z {
            return Err(ConfigError::Validation(
                "game.toml::world bounds are inverted (min must be < max)".to_string(),
            ));
        }

        let drive = &self.drive.drive;
        if drive.max_speed <= 0.0 {
            return Err(ConfigError::Validation(
                "drive.toml::drive.max_speed must be > 0".to_string(),
            ));
        }
        if drive.max_delta_secs <= 0.0 {
            return Err(ConfigError::Validation(
                "drive.toml::drive.max_delta_secs must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&drive.friction) || !(0.0..=1.0).contains(&drive.drift_friction) {
            return Err(ConfigError::Validation(
                "drive.toml::drive friction multipliers must be in [0, 1]".to_string(),
            ));
        }
        if drive.drift_intensity_divisor <= 0.0 || drive.speed_factor_divisor <= 0.0 {
            return Err(ConfigError::Validation(
                "drive.toml::drive divisors must be > 0".to_string(),
            ));
        }

        let dust = &self.particles.dust;
        if dust.capacity == 0 {
            return Err(ConfigError::Validation(
                "particles.toml::dust.capacity must be >= 1".to_string(),
            ));
        }
        if dust.max_delta_secs <= 0.0 {
            return Err(ConfigError::Validation(
                "particles.toml::dust.max_delta_secs must be > 0".to_string(),
            ));
        }
        if dust.wheel_offsets.is_empty() {
            return Err(ConfigError::Validation(
                "particles.toml::dust.wheel_offsets must contain at least one offset".to_string(),
            ));
        }
        for (index, wheel) in dust.wheel_offsets.iter().enumerate() {
            if wheel.weight < 0.0 || wheel.drift_weight < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "particles.toml::dust.wheel_offsets[{index}] weights must be >= 0"
                )));
            }
        }
        let total_weight: f32 = dust.wheel_offsets.iter().map(|wheel| wheel.weight).sum();
        let total_drift_weight: f32 = dust
            .wheel_offsets
            .iter()
            .map(|wheel| wheel.drift_weight)
            .sum();
        if total_weight <= 0.0 || total_drift_weight <= 0.0 {
            return Err(ConfigError::Validation(
                "particles.toml::dust.wheel_offsets weights must not sum to zero".to_string(),
            ));
        }
        if dust.lifetime_secs <= 0.0 || dust.drift_lifetime_secs <= 0.0 {
            return Err(ConfigError::Validation(
                "particles.toml::dust lifetimes must be > 0".to_string(),
            ));
        }

        let constellation = &self.particles.constellation;
        if constellation.connection_distance <= 0.0 {
            return Err(ConfigError::Validation(
                "particles.toml::constellation.connection_distance must be > 0".to_string(),
            ));
        }

        for (index, zone) in self.zones.zones.iter().enumerate() {
            if zone.radius <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "zones.toml::zones[{index}].radius must be > 0"
                )));
            }
            if zone.dwell_seconds <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "zones.toml::zones[{index}].dwell_seconds must be > 0"
                )));
            }
            if !world.contains_planar(zone.center[0], zone.center[2]) {
                return Err(ConfigError::Validation(format!(
                    "zones.toml::zones[{index}] `{}` has its center outside game.toml::world bounds",
                    zone.id
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

fn to_index<T>(label: &str, rows: &[T]) -> Result<HashMap<String, T>, ConfigError>
where
    T: HasId + Clone,
{
    let mut map = HashMap::new();

    for row in rows {
        let id = row.id();
        if id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{label} contains an empty id"
            )));
        }

        if map.insert(id.to_string(), row.clone()).is_some() {
            return Err(ConfigError::Validation(format!(
                "{label} contains duplicate id `{id}`"
            )));
        }
    }

    Ok(map)
}

trait HasId {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameFile {
    pub app: AppConfig,
    #[serde(default)]
    pub world: WorldBounds,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub debug_overlay: bool,
    #[serde(default)]
    pub start_in_driving: bool,
}

/// Square drivable region on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WorldBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            min_x: -53.0,
            max_x: 53.0,
            min_z: -53.0,
            max_z: 53.0,
        }
    }
}

impl WorldBounds {
    pub fn contains_planar(&self, x: f32, z: f32) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_z..=self.max_z).contains(&z)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriveFile {
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub camera: ChaseCameraConfig,
}

/// Tuning for the planar drift integrator. Units are world units and seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub engine_power: f32,
    pub reverse_power_factor: f32,
    pub brake_power: f32,
    pub brake_factor: f32,
    pub drift_brake_factor: f32,
    pub max_speed: f32,
    pub friction: f32,
    pub drift_friction: f32,
    pub turn_speed: f32,
    pub drift_turn_speed: f32,
    pub grip_recovery: f32,
    pub min_speed_to_turn: f32,
    pub drift_speed_threshold: f32,
    pub steer_lerp: f32,
    pub drift_steer_lerp: f32,
    pub angular_decay: f32,
    pub speed_factor_divisor: f32,
    pub speed_factor_cap: f32,
    pub drift_kick: f32,
    pub wall_bounce: f32,
    pub tilt_factor: f32,
    pub drift_tilt_factor: f32,
    pub tilt_lerp_rate: f32,
    pub wheel_spin_factor: f32,
    pub moving_threshold: f32,
    pub drift_intensity_divisor: f32,
    pub drift_intensity_floor: f32,
    pub max_delta_secs: f32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            engine_power: 28.0,
            reverse_power_factor: 0.6,
            brake_power: 1.0,
            brake_factor: 0.8,
            drift_brake_factor: 0.4,
            max_speed: 22.0,
            friction: 0.85,
            drift_friction: 0.94,
            turn_speed: 0.9,
            drift_turn_speed: 1.2,
            grip_recovery: 2.5,
            min_speed_to_turn: 0.5,
            drift_speed_threshold: 6.0,
            steer_lerp: 0.08,
            drift_steer_lerp: 0.2,
            angular_decay: 0.9,
            speed_factor_divisor: 10.0,
            speed_factor_cap: 1.2,
            drift_kick: 0.15,
            wall_bounce: -0.5,
            tilt_factor: 0.05,
            drift_tilt_factor: 0.25,
            tilt_lerp_rate: 8.0,
            wheel_spin_factor: 3.0,
            moving_threshold: 0.5,
            drift_intensity_divisor: 8.0,
            drift_intensity_floor: 0.5,
            max_delta_secs: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChaseCameraConfig {
    pub distance: f32,
    pub offset_factor: f32,
    pub height: f32,
    pub position_lerp: f32,
    pub look_at_lerp: f32,
    pub initial_position: [f32; 3],
}

impl Default for ChaseCameraConfig {
    fn default() -> Self {
        Self {
            distance: 30.0,
            offset_factor: 0.7,
            height: 35.0,
            position_lerp: 0.02,
            look_at_lerp: 0.04,
            initial_position: [40.0, 35.0, 40.0],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticlesFile {
    #[serde(default)]
    pub dust: DustConfig,
    #[serde(default)]
    pub ambient: AmbientConfig,
    #[serde(default)]
    pub constellation: ConstellationConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WheelOffsetConfig {
    pub x: f32,
    pub z: f32,
    pub weight: f32,
    pub drift_weight: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DustConfig {
    pub capacity: usize,
    pub max_delta_secs: f32,
    pub min_speed: f32,
    pub rate_per_speed: f32,
    pub drift_bonus_rate: f32,
    pub wheel_offsets: Vec<WheelOffsetConfig>,
    pub spawn_jitter: f32,
    pub spawn_height: f32,
    pub spawn_height_jitter: f32,
    pub spread: f32,
    pub drift_spread: f32,
    pub up_speed: f32,
    pub drift_up_speed: f32,
    pub base_up_speed: f32,
    pub velocity_inheritance: f32,
    pub gravity: f32,
    pub air_drag: f32,
    pub floor_height: f32,
    pub ground_bounce: f32,
    pub ground_friction: f32,
    pub lifetime_secs: f32,
    pub drift_lifetime_secs: f32,
    pub scale_min: f32,
    pub scale_jitter: f32,
    pub drift_scale_min: f32,
    pub drift_scale_jitter: f32,
    pub fade_exponent: f32,
    pub min_render_scale: f32,
    pub park_height: f32,
}

impl Default for DustConfig {
    fn default() -> Self {
        Self {
            capacity: 800,
            max_delta_secs: 0.03,
            min_speed: 0.05,
            rate_per_speed: 25.0,
            drift_bonus_rate: 350.0,
            wheel_offsets: vec![
                WheelOffsetConfig {
                    x: 0.7,
                    z: -0.9,
                    weight: 0.3,
                    drift_weight: 0.4,
                },
                WheelOffsetConfig {
                    x: -0.7,
                    z: -0.9,
                    weight: 0.3,
                    drift_weight: 0.4,
                },
                WheelOffsetConfig {
                    x: 0.7,
                    z: 0.7,
                    weight: 0.15,
                    drift_weight: 0.15,
                },
                WheelOffsetConfig {
                    x: -0.7,
                    z: 0.7,
                    weight: 0.15,
                    drift_weight: 0.15,
                },
            ],
            spawn_jitter: 0.4,
            spawn_height: 0.05,
            spawn_height_jitter: 0.15,
            spread: 5.0,
            drift_spread: 10.0,
            up_speed: 4.0,
            drift_up_speed: 6.0,
            base_up_speed: 2.0,
            velocity_inheritance: 0.4,
            gravity: 1.5,
            air_drag: 0.99,
            floor_height: 0.1,
            ground_bounce: -0.05,
            ground_friction: 0.3,
            lifetime_secs: 3.0,
            drift_lifetime_secs: 4.0,
            scale_min: 0.8,
            scale_jitter: 0.6,
            drift_scale_min: 1.5,
            drift_scale_jitter: 1.0,
            fade_exponent: 0.3,
            min_render_scale: 0.01,
            park_height: -100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    pub count: usize,
    pub spread: [f32; 3],
    pub interaction_radius: f32,
    pub interaction_force: f32,
    pub min_interaction_distance: f32,
    pub spring: [f32; 3],
    pub damping: f32,
    pub sway_frequency: f32,
    pub sway_phase_step: f32,
    pub sway_amplitude: f32,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            count: 2000,
            spread: [30.0, 50.0, 10.0],
            interaction_radius: 3.0,
            interaction_force: 0.03,
            min_interaction_distance: 0.1,
            spring: [0.003, 0.003, 0.002],
            damping: 0.92,
            sway_frequency: 0.08,
            sway_phase_step: 0.05,
            sway_amplitude: 0.0003,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConstellationConfig {
    pub count: usize,
    pub spread: [f32; 3],
    pub z_offset: f32,
    pub initial_speed: [f32; 3],
    pub interaction_radius: f32,
    pub interaction_force: f32,
    pub damping: f32,
    pub jitter: f32,
    pub bounds: [f32; 3],
    pub bounce: f32,
    pub connection_distance: f32,
    pub max_connections: usize,
}

impl Default for ConstellationConfig {
    fn default() -> Self {
        Self {
            count: 40,
            spread: [25.0, 35.0, 8.0],
            z_offset: -2.0,
            initial_speed: [0.002, 0.002, 0.001],
            interaction_radius: 3.0,
            interaction_force: 0.008,
            damping: 0.985,
            jitter: 0.0002,
            bounds: [15.0, 20.0, 6.0],
            bounce: -0.8,
            connection_distance: 4.0,
            max_connections: 200,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZonesFile {
    #[serde(default)]
    pub zones: Vec<ShowcaseZoneConfig>,
}

/// A project showcase geofence placed in the village.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShowcaseZoneConfig {
    pub id: String,
    pub center: [f32; 3],
    pub radius: f32,
    pub dwell_seconds: f32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    pub color: [f32; 3],
}

impl HasId for ShowcaseZoneConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn showcase_zone(id: &str, center: [f32; 3]) -> ShowcaseZoneConfig {
        ShowcaseZoneConfig {
            id: id.to_string(),
            center,
            radius: 5.0,
            dwell_seconds: 3.0,
            title: "Portfolio".to_string(),
            description: "My personal portfolio website".to_string(),
            link: "https://portfolio.example.com".to_string(),
            color: [0.97, 0.71, 0.77],
        }
    }

    fn config_with_zones(zones: Vec<ShowcaseZoneConfig>) -> GameConfig {
        GameConfig {
            game: GameFile {
                app: AppConfig {
                    debug_overlay: true,
                    start_in_driving: false,
                },
                world: WorldBounds::default(),
            },
            drive: DriveFile::default(),
            particles: ParticlesFile::default(),
            zones_by_id: zones
                .iter()
                .map(|zone| (zone.id.clone(), zone.clone()))
                .collect(),
            zones: ZonesFile { zones },
        }
    }

    #[test]
    fn validation_accepts_default_tuning() {
        let config = config_with_zones(vec![showcase_zone("zone-1", [25.0, 0.0, 25.0])]);
        assert!(config.validate_references().is_ok());
    }

    #[test]
    fn validation_fails_for_zone_outside_world() {
        let config = config_with_zones(vec![showcase_zone("far-away", [80.0, 0.0, 0.0])]);

        let error = config
            .validate_references()
            .expect_err("validation should fail");
        let message = error.to_string();

        assert!(message.contains("far-away"));
        assert!(message.contains("outside"));
    }

    #[test]
    fn validation_fails_for_non_positive_dwell() {
        let mut zone = showcase_zone("zone-1", [0.0, 0.0, 0.0]);
        zone.dwell_seconds = 0.0;
        let config = config_with_zones(vec![zone]);

        let error = config
            .validate_references()
            .expect_err("validation should fail");
        assert!(error.to_string().contains("dwell_seconds"));
    }

    #[test]
    fn validation_fails_for_zero_weight_wheels() {
        let mut config = config_with_zones(Vec::new());
        for wheel in &mut config.particles.dust.wheel_offsets {
            wheel.weight = 0.0;
        }

        let error = config
            .validate_references()
            .expect_err("validation should fail");
        assert!(error.to_string().contains("sum to zero"));
    }

    #[test]
    fn index_rejects_duplicate_zone_ids() {
        let zones = vec![
            showcase_zone("zone-1", [0.0, 0.0, 0.0]),
            showcase_zone("zone-1", [10.0, 0.0, 0.0]),
        ];

        let error = to_index("zones.toml::zones", &zones).expect_err("duplicate id");
        assert!(error.to_string().contains("duplicate id `zone-1`"));
    }

    #[test]
    fn partial_drive_file_falls_back_to_defaults() {
        let drive: DriveFile = toml::from_str("[drive]\nmax_speed = 30.0\n").expect("parse");

        assert_eq!(drive.drive.max_speed, 30.0);
        assert_eq!(drive.drive.engine_power, DriveConfig::default().engine_power);
        assert_eq!(drive.camera, ChaseCameraConfig::default());
    }

    #[test]
    fn shipped_config_directory_loads() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join(CONFIG_DIR);
        let config = GameConfig::load_from_dir(&dir).expect("shipped config should be valid");

        assert_eq!(config.zones.zones.len(), 4);
        assert_eq!(config.particles.dust.capacity, 800);
        assert_eq!(config.drive.drive, DriveConfig::default());
        assert!(config.zones_by_id.contains_key("zone-3"));
    }
}
