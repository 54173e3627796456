use super::*;

const CONSTELLATION_MIN_POINTER_DISTANCE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientParticle {
    pub position: Vec3,
    pub origin: Vec3,
    pub velocity: Vec3,
}

/// Decorative landing-page field. Stepped once per rendered frame: pointer repulsion, a spring
/// back to each particle's origin, damping, then a slow vertical sway.
#[derive(Resource, Debug, Clone, Default)]
pub struct AmbientField {
    particles: Vec<AmbientParticle>,
}

impl AmbientField {
    pub fn scatter(tuning: &AmbientConfig, rng: &mut SeededRng) -> Self {
        let spread = Vec3::from_array(tuning.spread);
        let particles = (0..tuning.count)
            .map(|_| {
                let origin = Vec3::new(
                    rng.next_centered(),
                    rng.next_centered(),
                    rng.next_centered(),
                ) * spread;
                AmbientParticle {
                    position: origin,
                    origin,
                    velocity: Vec3::ZERO,
                }
            })
            .collect();
        Self { particles }
    }

    pub fn from_particles(particles: Vec<AmbientParticle>) -> Self {
        Self { particles }
    }

    pub fn particles(&self) -> &[AmbientParticle] {
        &self.particles
    }

    pub fn step(&mut self, tuning: &AmbientConfig, pointer: Option<Vec2>, elapsed_secs: f32) {
        let spring = Vec3::from_array(tuning.spring);
        for (index, particle) in self.particles.iter_mut().enumerate() {
            let push = pointer_push(
                particle.position,
                pointer,
                tuning.interaction_radius,
                tuning.interaction_force,
                tuning.min_interaction_distance,
            );
            particle.velocity.x += push.x;
            particle.velocity.y += push.y;

            particle.velocity += (particle.origin - particle.position) * spring;
            particle.velocity *= tuning.damping;
            particle.position += particle.velocity;

            let phase = elapsed_secs * tuning.sway_frequency + index as f32 * tuning.sway_phase_step;
            particle.position.y += phase.sin() * tuning.sway_amplitude;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstellationNode {
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Sparse drifting nodes joined by line segments when close enough.
#[derive(Resource, Debug, Clone)]
pub struct Constellation {
    nodes: Vec<ConstellationNode>,
    connections: Vec<(Vec3, Vec3)>,
    rng: SeededRng,
}

impl Default for Constellation {
    fn default() -> Self {
        Self::from_nodes(Vec::new(), CONSTELLATION_SEED)
    }
}

impl Constellation {
    pub fn scatter(tuning: &ConstellationConfig, seed: u64) -> Self {
        let mut rng = SeededRng::new(seed);
        let spread = Vec3::from_array(tuning.spread);
        let initial_speed = Vec3::from_array(tuning.initial_speed);
        let nodes = (0..tuning.count)
            .map(|_| {
                let mut position = Vec3::new(
                    rng.next_centered(),
                    rng.next_centered(),
                    rng.next_centered(),
                ) * spread;
                position.z += tuning.z_offset;
                let velocity = Vec3::new(
                    rng.next_centered(),
                    rng.next_centered(),
                    rng.next_centered(),
                ) * initial_speed;
                ConstellationNode { position, velocity }
            })
            .collect();
        Self {
            nodes,
            connections: Vec::new(),
            rng,
        }
    }

    pub fn from_nodes(nodes: Vec<ConstellationNode>, seed: u64) -> Self {
        Self {
            nodes,
            connections: Vec::new(),
            rng: SeededRng::new(seed),
        }
    }

    pub fn nodes(&self) -> &[ConstellationNode] {
        &self.nodes
    }

    pub fn connections(&self) -> &[(Vec3, Vec3)] {
        &self.connections
    }

    pub fn step(&mut self, tuning: &ConstellationConfig, pointer: Option<Vec2>) {
        let bounds = Vec3::from_array(tuning.bounds);
        for node in &mut self.nodes {
            let push = pointer_push(
                node.position,
                pointer,
                tuning.interaction_radius,
                tuning.interaction_force,
                CONSTELLATION_MIN_POINTER_DISTANCE,
            );
            node.velocity.x += push.x;
            node.velocity.y += push.y;

            node.position += node.velocity;
            node.velocity *= tuning.damping;
            node.velocity.x += self.rng.next_centered() * tuning.jitter;
            node.velocity.y += self.rng.next_centered() * tuning.jitter;

            // Past the box the velocity flips but position is left alone, so nodes ease back in.
            if node.position.x.abs() > bounds.x {
                node.velocity.x *= tuning.bounce;
            }
            if node.position.y.abs() > bounds.y {
                node.velocity.y *= tuning.bounce;
            }
            if node.position.z.abs() > bounds.z {
                node.velocity.z *= tuning.bounce;
            }
        }

        self.rebuild_connections(tuning);
    }

    /// Pairs closer than the connection distance, scanned in index order and capped.
    pub fn rebuild_connections(&mut self, tuning: &ConstellationConfig) {
        self.connections.clear();
        'outer: for (i, a) in self.nodes.iter().enumerate() {
            for b in &self.nodes[i + 1..] {
                if self.connections.len() >= tuning.max_connections {
                    break 'outer;
                }
                if a.position.distance(b.position) < tuning.connection_distance {
                    self.connections.push((a.position, b.position));
                }
            }
        }
    }
}

/// Planar push away from the pointer, falling off linearly to zero at `radius`. Nothing inside
/// `min_distance` so the normalisation never divides by ~0.
pub fn pointer_push(
    position: Vec3,
    pointer: Option<Vec2>,
    radius: f32,
    force: f32,
    min_distance: f32,
) -> Vec2 {
    let Some(pointer) = pointer else {
        return Vec2::ZERO;
    };
    let offset = position.truncate() - pointer;
    let distance = offset.length();
    if distance >= radius || distance <= min_distance {
        return Vec2::ZERO;
    }
    offset / distance * ((1.0 - distance / radius) * force)
}

/// Maps a window cursor position onto the z = 0 plane seen by the landing camera.
pub fn cursor_to_field(
    cursor: Vec2,
    window_size: Vec2,
    camera_distance: f32,
    vertical_fov_radians: f32,
) -> Option<Vec2> {
    if window_size.x <= 0.0 || window_size.y <= 0.0 {
        return None;
    }
    let ndc = Vec2::new(
        cursor.x / window_size.x * 2.0 - 1.0,
        -(cursor.y / window_size.y) * 2.0 + 1.0,
    );
    let view_height = 2.0 * camera_distance * (vertical_fov_radians * 0.5).tan();
    let view_width = view_height * (window_size.x / window_size.y);
    Some(Vec2::new(ndc.x * view_width * 0.5, ndc.y * view_height * 0.5))
}
