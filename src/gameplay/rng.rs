use std::time::{SystemTime, UNIX_EPOCH};

/// Small LCG shared by the particle spawners. Cheap, seedable, and good enough for visual noise.
#[derive(Debug, Clone, Copy)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn from_clock(seed: u64) -> Self {
        Self::new(seed ^ unix_timestamp_seconds())
    }

    /// Uniform sample in `[0, 1]`.
    pub fn next_unit(&mut self) -> f32 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.state >> 32) as u32) as f32 / u32::MAX as f32
    }

    /// Uniform sample in `[-0.5, 0.5]`.
    pub fn next_centered(&mut self) -> f32 {
        self.next_unit() - 0.5
    }
}

fn unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_in_range() {
        let mut rng = SeededRng::new(0x5EED);
        for _ in 0..10_000 {
            let unit = rng.next_unit();
            let centered = rng.next_centered();
            assert!((0.0..=1.0).contains(&unit));
            assert!((-0.5..=0.5).contains(&centered));
        }
    }

    #[test]
    fn same_seed_repeats_sequence() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        for _ in 0..32 {
            assert_eq!(a.next_unit().to_bits(), b.next_unit().to_bits());
        }
    }
}
