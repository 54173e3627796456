pub mod input;
pub mod particles;
pub mod rng;
pub mod vehicle;
pub mod zones;

use crate::config::GameConfig;
use crate::states::AppState;
use bevy::prelude::*;
use input::DriveInputPlugin;
use particles::ParticleGameplayPlugin;
use vehicle::VehicleGameplayPlugin;
use zones::ZoneGameplayPlugin;

pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(DriveInputPlugin)
            .add_plugins(VehicleGameplayPlugin)
            .add_plugins(ZoneGameplayPlugin)
            .add_plugins(ParticleGameplayPlugin)
            .add_systems(
                Update,
                (
                    (
                        input::sample_drive_input,
                        vehicle::integrate_vehicle,
                        zones::update_zone_detector,
                        zones::apply_showcase_events,
                        particles::emit_dust_trail,
                        particles::update_dust_particles,
                    )
                        .chain(),
                    (
                        vehicle::sync_vehicle_visuals,
                        particles::sync_dust_visuals,
                        zones::animate_showcase_zones,
                        vehicle::follow_vehicle_camera,
                    )
                        .chain(),
                )
                    .chain()
                    .run_if(in_state(AppState::Driving))
                    .run_if(resource_exists::<GameConfig>),
            );
    }
}
