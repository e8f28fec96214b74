//! Tuning knobs for the catch stage.
//!
//! Every number the stage uses lives here so a host page can override a subset
//! through JSON (`StageConfig::from_json`) without touching the engine.

use serde::Deserialize;

use crate::stage::Mode;

/// Per-mode spawn pacing and fall speed. Timed runs are tuned faster.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModeTuning {
    pub spawn_period_ms: u32,
    /// Slowest fall speed in px/s.
    pub base_speed: f64,
    /// Random extra speed added on top of `base_speed`, drawn from `[0, jitter)`.
    pub speed_jitter: f64,
}

impl Default for ModeTuning {
    fn default() -> Self {
        Self::UNTIMED
    }
}

impl ModeTuning {
    pub const TIMED: ModeTuning = ModeTuning {
        spawn_period_ms: 1350,
        base_speed: 120.0,
        speed_jitter: 55.0,
    };
    pub const UNTIMED: ModeTuning = ModeTuning {
        spawn_period_ms: 1550,
        base_speed: 105.0,
        speed_jitter: 55.0,
    };
}

/// Complete stage configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StageConfig {
    /// Maximum number of targets alive at once.
    pub max_falling: usize,
    /// Horizontal spawn inset from the left edge, in percent of field width.
    pub spawn_inset_pct: f64,
    /// Width of the spawn window, in percent. Spawn x lands in `[inset, inset + span)`.
    pub spawn_span_pct: f64,
    /// Vertical spawn position (negative = above the visible field).
    pub spawn_y_px: f64,

    /// Distance of the catch line above the field bottom.
    pub catch_line_offset_px: f64,
    pub band_above_px: f64,
    pub band_below_px: f64,
    /// A target is missed once it is this far below the field bottom.
    pub exit_margin_px: f64,
    /// Max horizontal distance (percentage points) between target and catcher.
    pub catch_tolerance_pct: f64,
    /// Field height used while the play surface cannot be measured.
    pub fallback_field_height_px: f64,
    /// Longest simulated sub-step; larger frame deltas are split.
    pub max_step_secs: f64,

    pub key_step_pct: f64,
    /// Fraction of the remaining distance the catcher covers per 60 Hz frame.
    pub smoothing: f64,

    pub base_points: u64,
    pub streak_bonus: u64,
    pub streak_cap: u32,

    pub timed_seconds: u32,
    pub toast_ms: f64,

    pub timed: ModeTuning,
    pub untimed: ModeTuning,

    /// Where the browser runtime navigates when a timed run ends.
    pub end_url: String,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            max_falling: 2,
            spawn_inset_pct: 15.0,
            spawn_span_pct: 70.0,
            spawn_y_px: -88.0,
            catch_line_offset_px: 230.0,
            band_above_px: 30.0,
            band_below_px: 44.0,
            exit_margin_px: 120.0,
            catch_tolerance_pct: 10.0,
            fallback_field_height_px: 700.0,
            max_step_secs: 1.0 / 30.0,
            key_step_pct: 6.0,
            smoothing: 0.22,
            base_points: 14,
            streak_bonus: 2,
            streak_cap: 10,
            timed_seconds: 60,
            toast_ms: 900.0,
            timed: ModeTuning::TIMED,
            untimed: ModeTuning::UNTIMED,
            end_url: "/end".to_string(),
        }
    }
}

impl StageConfig {
    /// Parse a (possibly partial) JSON override. Missing fields keep defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn tuning(&self, mode: Mode) -> &ModeTuning {
        match mode {
            Mode::Timed => &self.timed,
            Mode::Untimed => &self.untimed,
        }
    }
}
