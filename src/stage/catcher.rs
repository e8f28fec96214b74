//! Player input → catcher position.

/// Horizontal direction of a discrete nudge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nudge {
    Left,
    Right,
}

impl Nudge {
    /// Arrow keys and A/D (any case).
    pub fn from_key(key: &str) -> Option<Nudge> {
        match key {
            "ArrowLeft" => Some(Nudge::Left),
            "ArrowRight" => Some(Nudge::Right),
            k if k.eq_ignore_ascii_case("a") => Some(Nudge::Left),
            k if k.eq_ignore_ascii_case("d") => Some(Nudge::Right),
            _ => None,
        }
    }
}

/// Catcher state: `target_x` follows input instantly, `rendered_x` eases
/// toward it and is what collisions are tested against. Both in `[0, 100]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Catcher {
    pub target_x: f64,
    pub rendered_x: f64,
}

impl Default for Catcher {
    fn default() -> Self {
        Self { target_x: 50.0, rendered_x: 50.0 }
    }
}

impl Catcher {
    pub fn nudge(&mut self, dir: Nudge, step: f64) {
        let delta = match dir {
            Nudge::Left => -step,
            Nudge::Right => step,
        };
        self.target_x = (self.target_x + delta).clamp(0.0, 100.0);
    }

    /// Pointer-down: jump the target to the pointer. Ignored while the field
    /// has no measurable width.
    pub fn pointer_down(&mut self, client_x: f64, field_left: f64, field_width: f64) {
        if let Some(pct) = pointer_pct(client_x, field_left, field_width) {
            self.target_x = pct;
        }
    }

    /// Pointer-move only steers while a button is held.
    pub fn pointer_move(&mut self, client_x: f64, buttons: u16, field_left: f64, field_width: f64) {
        if buttons == 0 {
            return;
        }
        self.pointer_down(client_x, field_left, field_width);
    }

    /// Ease `rendered_x` toward `target_x`. `smoothing` is the fraction covered
    /// per 60 Hz frame; other frame rates cover the equivalent amount.
    pub fn ease(&mut self, dt: f64, smoothing: f64) {
        let per_frame = smoothing.clamp(0.0, 1.0);
        let k = 1.0 - (1.0 - per_frame).powf(dt.max(0.0) * 60.0);
        self.rendered_x += (self.target_x - self.rendered_x) * k;
    }
}

fn pointer_pct(client_x: f64, field_left: f64, field_width: f64) -> Option<f64> {
    if field_width <= 0.0 || !field_width.is_finite() {
        return None;
    }
    Some(((client_x - field_left) / field_width * 100.0).clamp(0.0, 100.0))
}
