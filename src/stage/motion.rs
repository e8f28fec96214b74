//! Falling-target motion and catch/miss resolution.
//!
//! [`advance`] is a pure function of elapsed time, catcher position and the
//! alive targets, so it can be driven without any display loop.

use crate::config::StageConfig;
use crate::roster::Character;

#[derive(Clone, Debug, PartialEq)]
pub struct FallingTarget {
    pub id: u64,
    pub character: Character,
    /// Horizontal centre in percent of field width; fixed at spawn.
    pub x_pct: f64,
    pub y_px: f64,
    /// px per second.
    pub speed: f64,
}

/// Catch/miss geometry for one field height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    pub band_top: f64,
    pub band_bottom: f64,
    pub exit_y: f64,
    pub tolerance_pct: f64,
}

impl Geometry {
    /// `field_height` of zero or less (field not mounted) uses the configured fallback.
    pub fn new(cfg: &StageConfig, field_height: f64) -> Self {
        let h = if field_height > 0.0 { field_height } else { cfg.fallback_field_height_px };
        let catch_y = h - cfg.catch_line_offset_px;
        Self {
            band_top: catch_y - cfg.band_above_px,
            band_bottom: catch_y + cfg.band_below_px,
            exit_y: h + cfg.exit_margin_px,
            tolerance_pct: cfg.catch_tolerance_pct,
        }
    }

    pub fn in_band(&self, y: f64) -> bool {
        y >= self.band_top && y <= self.band_bottom
    }

    pub fn near(&self, x_pct: f64, catcher_x: f64) -> bool {
        (x_pct - catcher_x).abs() < self.tolerance_pct
    }

    pub fn exited(&self, y: f64) -> bool {
        y > self.exit_y
    }
}

/// What happened to a target that left play during a step.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    Caught(FallingTarget),
    Missed(FallingTarget),
}

#[derive(Debug, Default)]
pub struct StepOutcome {
    pub survivors: Vec<FallingTarget>,
    /// Catches and misses in target (spawn) order.
    pub resolved: Vec<Resolution>,
}

impl StepOutcome {
    pub fn caught(&self) -> impl Iterator<Item = &FallingTarget> {
        self.resolved.iter().filter_map(|r| match r {
            Resolution::Caught(t) => Some(t),
            Resolution::Missed(_) => None,
        })
    }

    pub fn missed(&self) -> impl Iterator<Item = &FallingTarget> {
        self.resolved.iter().filter_map(|r| match r {
            Resolution::Missed(t) => Some(t),
            Resolution::Caught(_) => None,
        })
    }
}

/// Advance every target by `dt` seconds and sort them into survivors and
/// resolutions. Every target that is catchable this step is caught.
pub fn advance(targets: Vec<FallingTarget>, dt: f64, catcher_x: f64, geo: &Geometry) -> StepOutcome {
    let mut out = StepOutcome { survivors: Vec::with_capacity(targets.len()), ..Default::default() };
    for mut t in targets {
        t.y_px += t.speed * dt;
        if geo.in_band(t.y_px) && geo.near(t.x_pct, catcher_x) {
            out.resolved.push(Resolution::Caught(t));
        } else if geo.exited(t.y_px) {
            out.resolved.push(Resolution::Missed(t));
        } else {
            out.survivors.push(t);
        }
    }
    out
}

/// Split a frame delta into sub-steps no longer than `max_step`.
pub fn substeps(dt: f64, max_step: f64) -> impl Iterator<Item = f64> {
    let dt = dt.max(0.0);
    let n = if max_step > 0.0 && dt > max_step { (dt / max_step).ceil() as usize } else { 1 };
    let step = dt / n as f64;
    std::iter::repeat(step).take(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::spawner::tests::character;

    fn target(x_pct: f64, y_px: f64, speed: f64) -> FallingTarget {
        FallingTarget { id: 1, character: character("a1", "leo"), x_pct, y_px, speed }
    }

    fn geo() -> Geometry {
        Geometry::new(&StageConfig::default(), 700.0)
    }

    #[test]
    fn geometry_matches_field() {
        let g = geo();
        assert_eq!(g.band_top, 440.0);
        assert_eq!(g.band_bottom, 514.0);
        assert_eq!(g.exit_y, 820.0);
        assert_eq!(Geometry::new(&StageConfig::default(), 0.0), g);
    }

    #[test]
    fn one_long_step_equals_ten_short_steps() {
        let g = geo();
        let long = advance(vec![target(50.0, 0.0, 137.0)], 1.0, 0.0, &g);
        let mut short = vec![target(50.0, 0.0, 137.0)];
        for _ in 0..10 {
            short = advance(short, 0.1, 0.0, &g).survivors;
        }
        assert!((long.survivors[0].y_px - short[0].y_px).abs() < 1e-9);
    }

    #[test]
    fn catch_needs_band_and_tolerance() {
        let g = geo();
        let out = advance(vec![target(50.0, 450.0, 0.0)], 0.0, 55.0, &g);
        assert_eq!(out.caught().count(), 1);
        let out = advance(vec![target(50.0, 450.0, 0.0)], 0.0, 60.0, &g);
        assert_eq!(out.survivors.len(), 1, "tolerance is strict");
        let out = advance(vec![target(50.0, 400.0, 0.0)], 0.0, 50.0, &g);
        assert_eq!(out.survivors.len(), 1, "above band");
    }

    #[test]
    fn all_catchable_targets_are_caught() {
        let g = geo();
        let mut b = target(45.0, 500.0, 0.0);
        b.id = 2;
        let out = advance(vec![target(50.0, 450.0, 0.0), b], 0.0, 48.0, &g);
        assert_eq!(out.caught().count(), 2);
        assert!(out.survivors.is_empty());
    }

    #[test]
    fn miss_only_after_exit_margin() {
        let g = geo();
        let out = advance(vec![target(50.0, 800.0, 20.0)], 1.0, 0.0, &g);
        assert_eq!(out.survivors.len(), 1, "820 is not past the margin");
        let out = advance(vec![target(50.0, 800.0, 21.0)], 1.0, 0.0, &g);
        assert_eq!(out.missed().count(), 1);
    }

    #[test]
    fn resolutions_keep_target_order() {
        let g = geo();
        let mut newer = target(50.0, 440.0, 100.0);
        newer.id = 2;
        let older = target(15.0, 815.0, 100.0);
        let out = advance(vec![older, newer], 0.1, 50.0, &g);
        let order: Vec<_> = out
            .resolved
            .iter()
            .map(|r| match r {
                Resolution::Caught(t) => ("caught", t.id),
                Resolution::Missed(t) => ("missed", t.id),
            })
            .collect();
        assert_eq!(order, [("missed", 1), ("caught", 2)]);
    }

    #[test]
    fn substeps_cover_dt_exactly() {
        let steps: Vec<f64> = substeps(0.25, 1.0 / 30.0).collect();
        assert_eq!(steps.len(), 8);
        assert!((steps.iter().sum::<f64>() - 0.25).abs() < 1e-12);
        assert_eq!(substeps(0.01, 1.0 / 30.0).count(), 1);
        assert_eq!(substeps(-1.0, 1.0 / 30.0).collect::<Vec<_>>(), [0.0]);
    }
}
