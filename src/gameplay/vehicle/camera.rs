use super::*;
use crate::config::ChaseCameraConfig;

/// Smoothed isometric chase camera. Both points ease toward their targets by a fixed
/// fraction per frame, so the look-at settles faster than the eye.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct ChaseCamera {
    pub position: Vec3,
    pub look_at: Vec3,
}

impl Default for ChaseCamera {
    fn default() -> Self {
        Self::new(&ChaseCameraConfig::default())
    }
}

impl ChaseCamera {
    pub fn new(tuning: &ChaseCameraConfig) -> Self {
        Self {
            position: Vec3::from_array(tuning.initial_position),
            look_at: Vec3::ZERO,
        }
    }

    pub fn target_position(tuning: &ChaseCameraConfig, car_position: Vec3) -> Vec3 {
        let offset = tuning.distance * tuning.offset_factor;
        Vec3::new(
            car_position.x + offset,
            tuning.height,
            car_position.z + offset,
        )
    }

    pub fn advance(&mut self, tuning: &ChaseCameraConfig, car_position: Vec3) {
        let target = Self::target_position(tuning, car_position);
        let look_target = Vec3::new(car_position.x, 0.0, car_position.z);
        self.position = self.position.lerp(target, tuning.position_lerp);
        self.look_at = self.look_at.lerp(look_target, tuning.look_at_lerp);
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.position).looking_at(self.look_at, Vec3::Y)
    }
}

pub(super) fn reset_chase_camera(
    config: Res<GameConfig>,
    mut chase: ResMut<ChaseCamera>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    *chase = ChaseCamera::new(&config.drive.camera);
    if let Ok(mut transform) = camera_query.single_mut() {
        *transform = chase.transform();
    }
}

pub(crate) fn follow_vehicle_camera(
    config: Res<GameConfig>,
    state: Res<VehicleState>,
    mut chase: ResMut<ChaseCamera>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    chase.advance(&config.drive.camera, state.position);

    let Ok(mut transform) = camera_query.single_mut() else {
        return;
    };
    *transform = chase.transform();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_trails_behind_and_above_the_car() {
        let tuning = ChaseCameraConfig::default();
        let target = ChaseCamera::target_position(&tuning, Vec3::new(10.0, 0.25, -4.0));

        assert_eq!(target.y, tuning.height);
        assert!((target.x - (10.0 + 21.0)).abs() < 1e-4);
        assert!((target.z - (-4.0 + 21.0)).abs() < 1e-4);
    }

    #[test]
    fn look_at_converges_faster_than_position() {
        let tuning = ChaseCameraConfig::default();
        let mut chase = ChaseCamera::new(&tuning);
        let car = Vec3::new(20.0, 0.25, 20.0);
        let target = ChaseCamera::target_position(&tuning, car);
        let look_target = Vec3::new(car.x, 0.0, car.z);

        let start_position_gap = chase.position.distance(target);
        let start_look_gap = chase.look_at.distance(look_target);
        chase.advance(&tuning, car);

        let position_ratio = chase.position.distance(target) / start_position_gap;
        let look_ratio = chase.look_at.distance(look_target) / start_look_gap;
        assert!((position_ratio - 0.98).abs() < 1e-4);
        assert!((look_ratio - 0.96).abs() < 1e-4);
    }

    #[test]
    fn parked_car_settles_camera_on_target() {
        let tuning = ChaseCameraConfig::default();
        let mut chase = ChaseCamera::new(&tuning);
        let car = Vec3::new(-12.0, 0.25, 6.0);

        for _ in 0..2_000 {
            chase.advance(&tuning, car);
        }

        assert!(chase.position.distance(ChaseCamera::target_position(&tuning, car)) < 1e-3);
        assert!(chase.look_at.distance(Vec3::new(car.x, 0.0, car.z)) < 1e-3);
    }
}
