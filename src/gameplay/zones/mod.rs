use crate::config::{GameConfig, ShowcaseZoneConfig};
use crate::gameplay::vehicle::VehicleState;
use crate::states::AppState;
use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

pub mod detector;
mod showcase;

pub use detector::{ZoneDefinition, ZoneDetector, ZoneError, ZoneEvent};
pub use showcase::ShowcaseProgress;

pub(crate) use showcase::{animate_showcase_zones, apply_showcase_events};

pub struct ZoneGameplayPlugin;

impl Plugin for ZoneGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ZoneEvent>()
            .init_resource::<ZoneDetector>()
            .init_resource::<ShowcaseProgress>()
            .add_systems(OnEnter(AppState::Driving), showcase::mount_showcase_zones)
            .add_systems(OnExit(AppState::Driving), showcase::unmount_showcase_zones)
            .add_systems(
                Update,
                showcase::resync_showcase_zones_on_reload
                    .run_if(in_state(AppState::Driving))
                    .run_if(resource_exists_and_changed::<GameConfig>),
            );
    }
}

/// Feeds the integrated car position into the detector. Dwell timing uses real elapsed time.
pub(crate) fn update_zone_detector(
    time: Res<Time<Real>>,
    state: Res<VehicleState>,
    mut detector: ResMut<ZoneDetector>,
    mut zone_events: MessageWriter<ZoneEvent>,
) {
    detector.update(state.position, time.elapsed_secs_f64(), |event| {
        match &event {
            ZoneEvent::Entered { zone_id } => debug!("Entered zone `{zone_id}`"),
            ZoneEvent::Exited { zone_id } => debug!("Left zone `{zone_id}`"),
            _ => {}
        }
        zone_events.write(event);
    });
}

fn zone_definition(zone: &ShowcaseZoneConfig) -> ZoneDefinition {
    ZoneDefinition::new(zone.id.clone(), Vec3::from_array(zone.center), zone.radius)
}
