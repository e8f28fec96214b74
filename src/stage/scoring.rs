//! Points and streak bookkeeping.

use crate::config::StageConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Scoring {
    pub score: u64,
    pub caught: u64,
    pub streak: u32,
}

impl Scoring {
    /// Points for a catch that brings the streak to `streak`. A catch with
    /// no chain before it pays exactly `base_points`.
    pub fn points_for(streak: u32, cfg: &StageConfig) -> u64 {
        let chain = streak.clamp(1, cfg.streak_cap.max(1)) - 1;
        cfg.base_points + chain as u64 * cfg.streak_bonus
    }

    /// Register a catch and return the points awarded.
    pub fn on_catch(&mut self, cfg: &StageConfig) -> u64 {
        self.streak = (self.streak + 1).min(cfg.streak_cap.max(1));
        let pts = Self::points_for(self.streak, cfg);
        self.score += pts;
        self.caught += 1;
        pts
    }

    pub fn on_miss(&mut self) {
        self.streak = 0;
    }
}
