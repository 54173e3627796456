use crate::config::GameConfig;
use crate::gameplay::input::ControlVector;
use crate::states::{AppState, MainCamera};
use bevy::prelude::*;

mod camera;
pub mod physics;
mod scene;

pub(crate) use camera::follow_vehicle_camera;
pub(crate) use scene::sync_vehicle_visuals;

pub use camera::ChaseCamera;

/// Resting height of the car body origin above the ground plane.
pub const RIDE_HEIGHT: f32 = 0.25;

pub struct VehicleGameplayPlugin;

impl Plugin for VehicleGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<VehicleState>()
            .init_resource::<VehicleDynamics>()
            .init_resource::<ChaseCamera>()
            .add_systems(
                OnEnter(AppState::Driving),
                (
                    reset_vehicle_state,
                    camera::reset_chase_camera,
                    scene::spawn_vehicle_scene,
                )
                    .chain(),
            )
            .add_systems(
                OnExit(AppState::Driving),
                (reset_vehicle_state, scene::cleanup_vehicle_scene),
            );
    }
}

/// Per-frame snapshot of the car. Written only by [`integrate_vehicle`]; everything else reads it.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub heading: f32,
    pub forward_speed: f32,
    pub is_moving: bool,
    pub is_drifting: bool,
    pub drift_intensity: f32,
    pub wheel_rotation: f32,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, RIDE_HEIGHT, 0.0),
            velocity: Vec3::ZERO,
            heading: 0.0,
            forward_speed: 0.0,
            is_moving: false,
            is_drifting: false,
            drift_intensity: 0.0,
            wheel_rotation: 0.0,
        }
    }
}

impl VehicleState {
    pub fn planar_speed(&self) -> f32 {
        Vec2::new(self.velocity.x, self.velocity.z).length()
    }
}

/// Integrator-private carry-over between frames.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleDynamics {
    pub angular_velocity: f32,
    /// Visual roll in radians, rendering only.
    pub body_tilt: f32,
}

fn reset_vehicle_state(mut state: ResMut<VehicleState>, mut dynamics: ResMut<VehicleDynamics>) {
    *state = VehicleState::default();
    *dynamics = VehicleDynamics::default();
}

pub(crate) fn integrate_vehicle(
    time: Res<Time>,
    config: Res<GameConfig>,
    controls: Res<ControlVector>,
    mut state: ResMut<VehicleState>,
    mut dynamics: ResMut<VehicleDynamics>,
) {
    let was_drifting = state.is_drifting;
    physics::step_vehicle(
        &mut state,
        &mut dynamics,
        &controls,
        &config.drive.drive,
        &config.game.world,
        time.delta_secs(),
    );

    if state.is_drifting != was_drifting {
        debug!(
            "Drift {} at forward speed {:.1}",
            if state.is_drifting { "started" } else { "ended" },
            state.forward_speed
        );
    }
}
