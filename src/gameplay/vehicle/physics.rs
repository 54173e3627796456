use super::{VehicleDynamics, VehicleState};
use crate::config::{DriveConfig, WorldBounds};
use crate::gameplay::input::ControlVector;
use bevy::prelude::*;

/// Unit vector the car faces on the ground plane for a given heading.
pub fn heading_forward(heading: f32) -> Vec2 {
    Vec2::new(heading.sin(), heading.cos())
}

/// Splits a planar velocity into (forward, sideways) components relative to the heading.
pub fn decompose_velocity(velocity: Vec2, heading: f32) -> (f32, f32) {
    let forward = heading_forward(heading);
    let forward_speed = velocity.x * forward.x + velocity.y * forward.y;
    let sideways_speed = velocity.x * forward.y - velocity.y * forward.x;
    (forward_speed, sideways_speed)
}

pub fn is_drift_engaged(controls: &ControlVector, forward_speed: f32, tuning: &DriveConfig) -> bool {
    controls.brake && forward_speed.abs() > tuning.drift_speed_threshold && controls.is_turning()
}

/// Advances the car by one frame. `delta_secs` is clamped to `tuning.max_delta_secs`.
///
/// Planar state lives in x/z; the y component of `state.velocity` is always written as zero.
pub fn step_vehicle(
    state: &mut VehicleState,
    dynamics: &mut VehicleDynamics,
    controls: &ControlVector,
    tuning: &DriveConfig,
    bounds: &WorldBounds,
    delta_secs: f32,
) {
    let dt = delta_secs.clamp(0.0, tuning.max_delta_secs);
    let forward = heading_forward(state.heading);
    let mut velocity = Vec2::new(state.velocity.x, state.velocity.z);

    let (forward_speed, sideways_speed) = decompose_velocity(velocity, state.heading);
    let is_drifting = is_drift_engaged(controls, forward_speed, tuning);
    let drift_intensity = (sideways_speed.abs() / tuning.drift_intensity_divisor).min(1.0);

    if controls.forward {
        velocity += forward * tuning.engine_power * dt;
    }
    if controls.backward {
        velocity -= forward * tuning.engine_power * tuning.reverse_power_factor * dt;
    }

    if controls.brake {
        let brake_amount = tuning.brake_power * dt;
        let braked_speed = if forward_speed > 0.0 {
            (forward_speed - brake_amount).max(0.0)
        } else {
            (forward_speed + brake_amount).min(0.0)
        };
        let brake_factor = if is_drifting {
            tuning.drift_brake_factor
        } else {
            tuning.brake_factor
        };
        velocity += forward * ((braked_speed - forward_speed) * brake_factor);
    }

    let current_speed = velocity.length();
    if current_speed > tuning.min_speed_to_turn {
        let speed_factor = (current_speed / tuning.speed_factor_divisor).min(tuning.speed_factor_cap);
        let direction = if forward_speed >= 0.0 { 1.0 } else { -1.0 };
        let turn_speed = if is_drifting {
            tuning.drift_turn_speed
        } else {
            tuning.turn_speed
        };
        let target = controls.steer_input() * turn_speed * speed_factor * direction;
        let steer_lerp = if is_drifting {
            tuning.drift_steer_lerp
        } else {
            tuning.steer_lerp
        };
        dynamics.angular_velocity = lerp(dynamics.angular_velocity, target, steer_lerp);
    } else {
        dynamics.angular_velocity *= tuning.angular_decay;
    }

    state.heading += dynamics.angular_velocity * dt;

    let friction = if is_drifting {
        tuning.drift_friction
    } else {
        tuning.friction
    };
    if !is_drifting && !controls.brake {
        // Grip pulls the slide back onto the pre-rotation forward axis.
        let target = forward * forward_speed * friction;
        velocity = velocity.lerp(target, tuning.grip_recovery * dt);
    } else {
        velocity *= friction;

        if is_drifting && controls.is_turning() {
            let kick_direction = if controls.left { -1.0 } else { 1.0 };
            let kick_strength = tuning.drift_kick * forward_speed * dt;
            velocity.x += forward.y * kick_direction * kick_strength;
            velocity.y -= forward.x * kick_direction * kick_strength;
        }
    }

    let speed = velocity.length();
    if speed > tuning.max_speed {
        velocity *= tuning.max_speed / speed;
    }

    let mut next_x = state.position.x + velocity.x * dt;
    let mut next_z = state.position.z + velocity.y * dt;

    if next_x < bounds.min_x {
        next_x = bounds.min_x;
        velocity.x *= tuning.wall_bounce;
    } else if next_x > bounds.max_x {
        next_x = bounds.max_x;
        velocity.x *= tuning.wall_bounce;
    }

    if next_z < bounds.min_z {
        next_z = bounds.min_z;
        velocity.y *= tuning.wall_bounce;
    } else if next_z > bounds.max_z {
        next_z = bounds.max_z;
        velocity.y *= tuning.wall_bounce;
    }

    let tilt_factor = if is_drifting {
        tuning.drift_tilt_factor
    } else {
        tuning.tilt_factor
    };
    let target_tilt = -dynamics.angular_velocity * tilt_factor;
    dynamics.body_tilt = lerp(
        dynamics.body_tilt,
        target_tilt,
        (tuning.tilt_lerp_rate * dt).min(1.0),
    );

    state.wheel_rotation += forward_speed * dt * tuning.wheel_spin_factor;

    state.position.x = next_x;
    state.position.z = next_z;
    state.velocity = Vec3::new(velocity.x, 0.0, velocity.y);
    state.forward_speed = forward_speed;
    state.is_moving = current_speed > tuning.moving_threshold;
    state.is_drifting = is_drifting;
    state.drift_intensity = if is_drifting {
        drift_intensity.max(tuning.drift_intensity_floor)
    } else {
        drift_intensity
    };
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + ((b - a) * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f32 = 1.0 / 60.0;

    fn planar_speed(state: &VehicleState) -> f32 {
        Vec2::new(state.velocity.x, state.velocity.z).length()
    }

    fn run(
        state: &mut VehicleState,
        dynamics: &mut VehicleDynamics,
        controls: &ControlVector,
        frames: usize,
    ) {
        let tuning = DriveConfig::default();
        let bounds = WorldBounds::default();
        for _ in 0..frames {
            step_vehicle(state, dynamics, controls, &tuning, &bounds, FRAME);
        }
    }

    #[test]
    fn idle_car_stays_put() {
        let mut state = VehicleState::default();
        let mut dynamics = VehicleDynamics::default();
        let start = state.position;

        run(&mut state, &mut dynamics, &ControlVector::default(), 600);

        assert_eq!(state.velocity, Vec3::ZERO);
        assert_eq!(state.position, start);
        assert!(!state.is_moving);
        assert!(!state.is_drifting);
    }

    #[test]
    fn forward_throttle_never_exceeds_max_speed() {
        let tuning = DriveConfig::default();
        let bounds = WorldBounds {
            min_x: -10_000.0,
            max_x: 10_000.0,
            min_z: -10_000.0,
            max_z: 10_000.0,
        };
        let mut state = VehicleState::default();
        let mut dynamics = VehicleDynamics::default();
        let controls = ControlVector {
            forward: true,
            ..default()
        };

        let mut top_speed: f32 = 0.0;
        for frame in 0..2_000 {
            let steering = ControlVector {
                left: frame % 200 < 50,
                ..controls
            };
            step_vehicle(&mut state, &mut dynamics, &steering, &tuning, &bounds, 0.5);
            let speed = planar_speed(&state);
            assert!(speed <= tuning.max_speed + 1e-3, "speed {speed} over cap");
            top_speed = top_speed.max(speed);
        }
        assert!(top_speed > 10.0);
    }

    #[test]
    fn wall_pins_position_and_reverses_velocity() {
        let tuning = DriveConfig::default();
        let bounds = WorldBounds::default();
        let mut state = VehicleState::default();
        let mut dynamics = VehicleDynamics::default();
        let controls = ControlVector {
            forward: true,
            ..default()
        };

        let mut hit_wall = false;
        for _ in 0..3_000 {
            let before = state.position.z;
            step_vehicle(&mut state, &mut dynamics, &controls, &tuning, &bounds, FRAME);
            assert!(state.position.z <= bounds.max_z);
            assert!(state.position.x >= bounds.min_x && state.position.x <= bounds.max_x);
            if !hit_wall && before < bounds.max_z && state.position.z == bounds.max_z {
                hit_wall = true;
                assert!(state.velocity.z < 0.0, "bounce should flip velocity");
            }
        }
        assert!(hit_wall);
    }

    #[test]
    fn drift_requires_brake_speed_and_turn() {
        let tuning = DriveConfig::default();
        for speed in [10.0_f32, 3.0] {
            for brake in [false, true] {
                for left in [false, true] {
                    for right in [false, true] {
                        let controls = ControlVector {
                            brake,
                            left,
                            right,
                            ..default()
                        };
                        let mut state = VehicleState {
                            velocity: Vec3::new(0.0, 0.0, speed),
                            ..default()
                        };
                        let mut dynamics = VehicleDynamics::default();
                        step_vehicle(
                            &mut state,
                            &mut dynamics,
                            &controls,
                            &tuning,
                            &WorldBounds::default(),
                            FRAME,
                        );

                        let expected = speed > tuning.drift_speed_threshold && brake && (left || right);
                        assert_eq!(
                            state.is_drifting, expected,
                            "speed={speed} brake={brake} left={left} right={right}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn drifting_floors_intensity() {
        let tuning = DriveConfig::default();
        let mut state = VehicleState {
            velocity: Vec3::new(0.0, 0.0, 15.0),
            ..default()
        };
        let mut dynamics = VehicleDynamics::default();
        let controls = ControlVector {
            brake: true,
            left: true,
            ..default()
        };

        step_vehicle(
            &mut state,
            &mut dynamics,
            &controls,
            &tuning,
            &WorldBounds::default(),
            FRAME,
        );

        assert!(state.is_drifting);
        assert!(state.drift_intensity >= tuning.drift_intensity_floor);
        assert!(state.drift_intensity <= 1.0);
    }

    #[test]
    fn long_frames_are_clamped() {
        let tuning = DriveConfig::default();
        let mut state = VehicleState {
            velocity: Vec3::new(0.0, 0.0, 10.0),
            ..default()
        };
        let mut dynamics = VehicleDynamics::default();

        step_vehicle(
            &mut state,
            &mut dynamics,
            &ControlVector::default(),
            &tuning,
            &WorldBounds::default(),
            5.0,
        );

        let travelled = state.position.z;
        assert!(travelled > 0.0);
        assert!(travelled <= 10.0 * tuning.max_delta_secs + 1e-4);
    }

    #[test]
    fn steering_in_reverse_flips_turn_direction() {
        let mut forward_state = VehicleState {
            velocity: Vec3::new(0.0, 0.0, 8.0),
            ..default()
        };
        let mut reverse_state = VehicleState {
            velocity: Vec3::new(0.0, 0.0, -8.0),
            ..default()
        };
        let controls = ControlVector {
            left: true,
            ..default()
        };

        run(&mut forward_state, &mut VehicleDynamics::default(), &controls, 10);
        run(&mut reverse_state, &mut VehicleDynamics::default(), &controls, 10);

        assert!(forward_state.heading > 0.0);
        assert!(reverse_state.heading < 0.0);
    }

    #[test]
    fn wheels_spin_with_forward_speed() {
        let mut state = VehicleState {
            velocity: Vec3::new(0.0, 0.0, 5.0),
            ..default()
        };
        run(
            &mut state,
            &mut VehicleDynamics::default(),
            &ControlVector::default(),
            1,
        );
        assert!(state.wheel_rotation > 0.0);
    }

    fn single_step(velocity: Vec3, controls: &ControlVector) -> VehicleState {
        let mut state = VehicleState {
            velocity,
            ..default()
        };
        let mut dynamics = VehicleDynamics::default();
        step_vehicle(
            &mut state,
            &mut dynamics,
            controls,
            &DriveConfig::default(),
            &WorldBounds::default(),
            FRAME,
        );
        state
    }

    #[test]
    fn brake_decay_is_weaker_while_drifting() {
        let tuning = DriveConfig::default();
        let brake_amount = tuning.brake_power * FRAME;

        let braking = single_step(
            Vec3::new(0.0, 0.0, 10.0),
            &ControlVector {
                brake: true,
                ..default()
            },
        );
        assert!(!braking.is_drifting);
        let expected = (10.0 - brake_amount * tuning.brake_factor) * tuning.friction;
        assert!((braking.velocity.z - expected).abs() < 1e-4);

        // Heading 0 faces +z and the drift kick only acts along x.
        let drifting = single_step(
            Vec3::new(0.0, 0.0, 10.0),
            &ControlVector {
                brake: true,
                left: true,
                ..default()
            },
        );
        assert!(drifting.is_drifting);
        let expected = (10.0 - brake_amount * tuning.drift_brake_factor) * tuning.drift_friction;
        assert!((drifting.velocity.z - expected).abs() < 1e-4);
    }

    #[test]
    fn grip_removes_sideways_slip() {
        let mut state = VehicleState {
            velocity: Vec3::new(4.0, 0.0, 0.0),
            ..default()
        };
        let mut dynamics = VehicleDynamics::default();
        let controls = ControlVector::default();

        let mut previous = 4.0_f32;
        for _ in 0..120 {
            run(&mut state, &mut dynamics, &controls, 1);
            let (_, sideways) = decompose_velocity(
                Vec2::new(state.velocity.x, state.velocity.z),
                state.heading,
            );
            assert!(sideways.abs() < previous);
            previous = sideways.abs();
        }
        assert!(previous < 0.1);
    }

    #[test]
    fn drift_kick_follows_steering_side() {
        let left = single_step(
            Vec3::new(0.0, 0.0, 15.0),
            &ControlVector {
                brake: true,
                left: true,
                ..default()
            },
        );
        let right = single_step(
            Vec3::new(0.0, 0.0, 15.0),
            &ControlVector {
                brake: true,
                right: true,
                ..default()
            },
        );

        assert!(left.is_drifting && right.is_drifting);
        assert!(left.velocity.x < 0.0);
        assert!(right.velocity.x > 0.0);
        assert!((left.velocity.x + right.velocity.x).abs() < 1e-5);
    }

    #[test]
    fn decomposition_matches_heading() {
        let (forward, sideways) = decompose_velocity(Vec2::new(0.0, 4.0), 0.0);
        assert!((forward - 4.0).abs() < 1e-6);
        assert!(sideways.abs() < 1e-6);

        let (forward, sideways) =
            decompose_velocity(Vec2::new(3.0, 0.0), std::f32::consts::FRAC_PI_2);
        assert!((forward - 3.0).abs() < 1e-5);
        assert!(sideways.abs() < 1e-5);
    }
}
