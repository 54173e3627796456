use super::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DustParticle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub remaining_lifetime: f32,
    pub total_lifetime: f32,
    pub scale: f32,
    /// Monotonic spawn counter value of the request that last filled this slot.
    pub spawn_index: u64,
}

impl DustParticle {
    fn parked(park_height: f32) -> Self {
        Self {
            position: Vec3::new(0.0, park_height, 0.0),
            velocity: Vec3::ZERO,
            remaining_lifetime: 0.0,
            total_lifetime: 1.0,
            scale: 1.0,
            spawn_index: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.remaining_lifetime > 0.0
    }

    /// `(remaining / total)^exponent`, front-loaded so puffs stay visible until late in life.
    pub fn fade_factor(&self, fade_exponent: f32) -> f32 {
        if self.total_lifetime <= 0.0 {
            return 0.0;
        }
        (self.remaining_lifetime / self.total_lifetime)
            .clamp(0.0, 1.0)
            .powf(fade_exponent)
    }
}

/// What the renderer needs for one pool slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DustSample {
    pub position: Vec3,
    pub scale: f32,
}

/// Fixed-capacity dust pool. Spawns overwrite slots round-robin whether or not the previous
/// occupant has expired; the pool never grows after construction.
#[derive(Resource, Debug, Clone)]
pub struct DustTrail {
    particles: Vec<DustParticle>,
    next_slot: usize,
    spawn_accumulator: f32,
    spawned_total: u64,
    rng: SeededRng,
}

impl Default for DustTrail {
    fn default() -> Self {
        Self::new(&DustConfig::default(), DUST_SEED)
    }
}

impl DustTrail {
    pub fn new(tuning: &DustConfig, seed: u64) -> Self {
        let capacity = tuning.capacity.max(1);
        Self {
            particles: vec![DustParticle::parked(tuning.park_height); capacity],
            next_slot: 0,
            spawn_accumulator: 0.0,
            spawned_total: 0,
            rng: SeededRng::new(seed),
        }
    }

    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    /// Whether the pool is sized for `tuning`. A reloaded capacity needs a fresh pool.
    pub fn fits(&self, tuning: &DustConfig) -> bool {
        self.capacity() == tuning.capacity.max(1)
    }

    pub fn particles(&self) -> &[DustParticle] {
        &self.particles
    }

    pub fn live_count(&self) -> usize {
        self.particles.iter().filter(|particle| particle.is_alive()).count()
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawned_total
    }

    /// Accumulates the speed-driven spawn budget and spends every whole unit. Returns the number of
    /// particles spawned this frame.
    pub fn emit(&mut self, car: &VehicleState, tuning: &DustConfig, delta_secs: f32) -> usize {
        let dt = delta_secs.clamp(0.0, tuning.max_delta_secs);
        let speed = car.forward_speed.abs();
        if speed <= tuning.min_speed {
            return 0;
        }

        let drift_bonus = if car.is_drifting {
            tuning.drift_bonus_rate
        } else {
            0.0
        };
        self.spawn_accumulator += (speed * tuning.rate_per_speed + drift_bonus) * dt;

        let mut spawned = 0;
        while self.spawn_accumulator >= 1.0 {
            self.spawn_accumulator -= 1.0;
            self.spawn(car, tuning);
            spawned += 1;
        }
        spawned
    }

    pub fn spawn(&mut self, car: &VehicleState, tuning: &DustConfig) {
        let wheel = self.pick_wheel(tuning, car.is_drifting);
        let jitter_x = self.rng.next_centered() * tuning.spawn_jitter;
        let jitter_z = self.rng.next_centered() * tuning.spawn_jitter;
        let local_x = wheel.x + jitter_x;
        let local_z = wheel.y + jitter_z;
        let (sin, cos) = car.heading.sin_cos();

        let position = Vec3::new(
            car.position.x + local_x * cos - local_z * sin,
            tuning.spawn_height + self.rng.next_unit() * tuning.spawn_height_jitter,
            car.position.z + local_x * sin + local_z * cos,
        );

        let (spread, up_speed, lifetime) = if car.is_drifting {
            (
                tuning.drift_spread,
                tuning.drift_up_speed,
                tuning.drift_lifetime_secs,
            )
        } else {
            (tuning.spread, tuning.up_speed, tuning.lifetime_secs)
        };
        let velocity = Vec3::new(
            self.rng.next_centered() * spread - car.velocity.x * tuning.velocity_inheritance,
            self.rng.next_unit() * up_speed + tuning.base_up_speed,
            self.rng.next_centered() * spread - car.velocity.z * tuning.velocity_inheritance,
        );

        let scale = if car.is_drifting {
            tuning.drift_scale_min + self.rng.next_unit() * tuning.drift_scale_jitter
        } else {
            tuning.scale_min + self.rng.next_unit() * tuning.scale_jitter
        };

        self.spawned_total += 1;
        let slot = self.next_slot;
        self.next_slot = (self.next_slot + 1) % self.particles.len();
        self.particles[slot] = DustParticle {
            position,
            velocity,
            remaining_lifetime: lifetime,
            total_lifetime: lifetime,
            scale,
            spawn_index: self.spawned_total,
        };
    }

    /// Ballistic step for every live slot: gravity, horizontal drag, and a damped floor bounce.
    pub fn integrate(&mut self, tuning: &DustConfig, delta_secs: f32) {
        let dt = delta_secs.clamp(0.0, tuning.max_delta_secs);
        for particle in self.particles.iter_mut().filter(|particle| particle.is_alive()) {
            particle.position += particle.velocity * dt;
            particle.velocity.y -= tuning.gravity * dt;
            particle.velocity.x *= tuning.air_drag;
            particle.velocity.z *= tuning.air_drag;

            if particle.position.y < tuning.floor_height {
                particle.position.y = tuning.floor_height;
                particle.velocity.y *= tuning.ground_bounce;
                particle.velocity.x *= tuning.ground_friction;
                particle.velocity.z *= tuning.ground_friction;
            }

            particle.remaining_lifetime -= dt;
        }
    }

    /// Expired slots are parked off-screen at negligible scale instead of being removed.
    pub fn sample(&self, slot: usize, tuning: &DustConfig) -> Option<DustSample> {
        let particle = self.particles.get(slot)?;
        if !particle.is_alive() {
            return Some(DustSample {
                position: Vec3::new(0.0, tuning.park_height, 0.0),
                scale: tuning.min_render_scale,
            });
        }

        Some(DustSample {
            position: particle.position,
            scale: (particle.scale * particle.fade_factor(tuning.fade_exponent))
                .max(tuning.min_render_scale),
        })
    }

    pub fn clear(&mut self, tuning: &DustConfig) {
        *self = Self {
            rng: SeededRng::from_clock(DUST_SEED),
            ..Self::new(tuning, DUST_SEED)
        };
    }

    /// Walks cumulative weights with an un-normalised roll; falls back to the first wheel.
    fn pick_wheel(&mut self, tuning: &DustConfig, drifting: bool) -> Vec2 {
        let roll = self.rng.next_unit();
        let mut cumulative = 0.0;
        for wheel in &tuning.wheel_offsets {
            cumulative += if drifting {
                wheel.drift_weight
            } else {
                wheel.weight
            };
            if roll < cumulative {
                return Vec2::new(wheel.x, wheel.z);
            }
        }

        tuning
            .wheel_offsets
            .first()
            .map_or(Vec2::ZERO, |wheel| Vec2::new(wheel.x, wheel.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moving_car(forward_speed: f32, is_drifting: bool) -> VehicleState {
        VehicleState {
            velocity: Vec3::new(0.0, 0.0, forward_speed),
            forward_speed,
            is_moving: true,
            is_drifting,
            ..default()
        }
    }

    #[test]
    fn pool_recycles_oldest_slots_without_growing() {
        let tuning = DustConfig::default();
        let mut trail = DustTrail::new(&tuning, 7);
        let car = moving_car(10.0, false);

        for _ in 0..1_000 {
            trail.spawn(&car, &tuning);
            assert_eq!(trail.capacity(), 800);
        }

        let mut indices: Vec<u64> = trail.particles().iter().map(|p| p.spawn_index).collect();
        indices.sort_unstable();
        let expected: Vec<u64> = (201..=1_000).collect();
        assert_eq!(indices, expected);
        assert_eq!(trail.particles()[0].spawn_index, 801);
        assert_eq!(trail.particles()[199].spawn_index, 1_000);
        assert_eq!(trail.particles()[200].spawn_index, 201);
    }

    #[test]
    fn spawn_budget_accumulates_across_frames() {
        let tuning = DustConfig::default();
        let mut trail = DustTrail::new(&tuning, 11);
        let car = moving_car(2.0, false);

        // 2 * 25 = 50 particles per second.
        let spawned: usize = (0..60)
            .map(|_| trail.emit(&car, &tuning, 1.0 / 60.0))
            .sum();
        assert!((49..=50).contains(&spawned));
    }

    #[test]
    fn drifting_adds_bonus_rate_and_long_frames_are_clamped() {
        let tuning = DustConfig::default();
        let mut trail = DustTrail::new(&tuning, 3);

        // (10 * 25 + 350) * 0.03 = 18 spawns even though a full second elapsed.
        let spawned = trail.emit(&moving_car(10.0, true), &tuning, 1.0);
        assert!((17..=18).contains(&spawned));
    }

    #[test]
    fn parked_car_spawns_nothing() {
        let tuning = DustConfig::default();
        let mut trail = DustTrail::new(&tuning, 5);
        assert_eq!(trail.emit(&moving_car(0.0, false), &tuning, 0.03), 0);
        assert_eq!(trail.live_count(), 0);
    }

    #[test]
    fn fade_is_monotonic_as_lifetime_runs_out() {
        let tuning = DustConfig::default();
        let mut trail = DustTrail::new(&tuning, 13);
        trail.spawn(&moving_car(10.0, false), &tuning);

        let mut previous = f32::INFINITY;
        while trail.particles()[0].is_alive() {
            let fade = trail.particles()[0].fade_factor(tuning.fade_exponent);
            assert!(fade <= previous);
            previous = fade;
            trail.integrate(&tuning, 0.03);
        }
        assert_eq!(trail.live_count(), 0);
    }

    #[test]
    fn particles_settle_on_the_floor() {
        let tuning = DustConfig::default();
        let mut trail = DustTrail::new(&tuning, 17);
        trail.spawn(&moving_car(10.0, true), &tuning);

        for _ in 0..100 {
            trail.integrate(&tuning, 0.03);
            let particle = trail.particles()[0];
            if particle.is_alive() {
                assert!(particle.position.y >= tuning.floor_height);
            }
        }
    }

    #[test]
    fn expired_slots_render_parked() {
        let tuning = DustConfig::default();
        let trail = DustTrail::new(&tuning, 19);
        let sample = trail.sample(0, &tuning).expect("slot 0 exists");

        assert_eq!(sample.position.y, tuning.park_height);
        assert_eq!(sample.scale, tuning.min_render_scale);
        assert!(trail.sample(tuning.capacity, &tuning).is_none());
    }

    #[test]
    fn spawns_land_near_a_wheel() {
        let tuning = DustConfig::default();
        let mut trail = DustTrail::new(&tuning, 23);
        let car = moving_car(10.0, false);

        for _ in 0..200 {
            trail.spawn(&car, &tuning);
        }

        let reach = tuning
            .wheel_offsets
            .iter()
            .map(|wheel| Vec2::new(wheel.x, wheel.z).length())
            .fold(0.0, f32::max)
            + tuning.spawn_jitter;
        for particle in trail.particles().iter().filter(|p| p.is_alive()) {
            let planar = Vec2::new(particle.position.x, particle.position.z);
            assert!(planar.length() <= reach + 1e-4);
        }
    }

    #[test]
    fn clearing_resizes_to_reloaded_capacity() {
        let mut tuning = DustConfig::default();
        let mut trail = DustTrail::new(&tuning, 7);
        assert!(trail.fits(&tuning));

        tuning.capacity = 300;
        assert!(!trail.fits(&tuning));

        trail.clear(&tuning);
        assert!(trail.fits(&tuning));
        assert_eq!(trail.capacity(), 300);
        assert_eq!(trail.live_count(), 0);
    }
}
