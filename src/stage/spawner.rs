//! Periodic introduction of falling targets.

use rand::Rng;

use crate::config::{ModeTuning, StageConfig};
use crate::roster::Character;

use super::motion::FallingTarget;

/// Uniform random numbers for spawning and toast selection.
pub trait RandomSource {
    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform index in `0..len`; `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize {
        ((self.unit() * len as f64) as usize).min(len - 1)
    }
}

/// Adapter for any `rand` generator.
pub struct RngSource<R>(pub R);

impl<R: Rng> RandomSource for RngSource<R> {
    fn unit(&mut self) -> f64 {
        self.0.gen_range(0.0..1.0)
    }
}

pub struct Spawner {
    next_id: u64,
}

impl Spawner {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// One spawn attempt. Pushes onto `alive` unless the cap is reached or the
    /// roster is empty. Returns whether a target was added.
    pub fn attempt(
        &mut self,
        alive: &mut Vec<FallingTarget>,
        roster: &[Character],
        tuning: &ModeTuning,
        cfg: &StageConfig,
        rng: &mut dyn RandomSource,
    ) -> bool {
        if roster.is_empty() || alive.len() >= cfg.max_falling {
            return false;
        }
        let character = roster[rng.index(roster.len())].clone();
        let x_pct = (rng.unit() * cfg.spawn_span_pct).floor() + cfg.spawn_inset_pct;
        let speed = tuning.base_speed + rng.unit() * tuning.speed_jitter;
        alive.push(FallingTarget {
            id: self.next_id,
            character,
            x_pct,
            y_px: cfg.spawn_y_px,
            speed,
        });
        self.next_id += 1;
        true
    }
}

impl Default for Spawner {
    fn default() -> Self {
        Self::new()
    }
}
