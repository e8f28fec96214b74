//! Catch stage: the play session.
//!
//! [`Stage`] owns one run: the falling targets, the catcher, the score and the
//! countdown. It does not schedule anything itself. The host calls
//! [`Stage::frame`] once per display refresh, [`Stage::spawn_tick`] on the
//! mode's spawn period and [`Stage::countdown_tick`] once per second; the
//! browser wiring for that lives in `crate::web`.
//!
//! Progress (unlocked cards, caught actresses, run results) goes through the
//! injected [`ProgressStore`], randomness through the injected
//! [`RandomSource`].

pub mod catcher;
pub mod motion;
pub mod scoring;
pub mod spawner;
pub mod toast;

use std::collections::BTreeSet;

use log::{debug, info};

use crate::config::StageConfig;
use crate::progress::{Progress, ProgressStore, Tone};
use crate::roster::Roster;

pub use catcher::{Catcher, Nudge};
pub use motion::{FallingTarget, Geometry, Resolution, StepOutcome, advance};
pub use scoring::Scoring;
pub use spawner::{RandomSource, RngSource, Spawner};
pub use toast::Toast;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Free play: no countdown, no terminal state.
    Untimed,
    /// Countdown run ending in `Phase::Ended`.
    Timed,
}

impl Mode {
    pub fn parse(raw: &str) -> Option<Mode> {
        match raw {
            "timed" => Some(Mode::Timed),
            "free" | "untimed" => Some(Mode::Untimed),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running(Mode),
    Ended,
}

/// Per-run counters. Reset by every `start`.
#[derive(Clone, Debug, PartialEq)]
pub struct RunState {
    pub mode: Mode,
    /// `None` in free play.
    pub seconds_remaining: Option<u32>,
    pub scoring: Scoring,
    pub caught_ids: BTreeSet<String>,
}

impl RunState {
    fn new(mode: Mode, cfg: &StageConfig) -> Self {
        Self {
            mode,
            seconds_remaining: (mode == Mode::Timed).then_some(cfg.timed_seconds),
            scoring: Scoring::default(),
            caught_ids: BTreeSet::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunResult {
    pub score: u64,
    pub caught: u64,
    pub caught_ids: BTreeSet<String>,
    pub new_best: bool,
}

/// Things the HUD / host may want to react to. Drained with
/// [`Stage::drain_events`].
#[derive(Clone, Debug, PartialEq)]
pub enum StageEvent {
    Spawned { target_id: u64 },
    Caught {
        target_id: u64,
        character_id: String,
        star_sign_id: String,
        points: u64,
        newly_unlocked: bool,
    },
    Missed { target_id: u64, character_id: String },
    /// Timed run finished; results are already persisted.
    RunEnded(RunResult),
}

pub struct Stage<S: ProgressStore, R: RandomSource> {
    cfg: StageConfig,
    roster: Roster,
    progress: Progress<S>,
    rng: R,
    phase: Phase,
    run: RunState,
    targets: Vec<FallingTarget>,
    spawner: Spawner,
    catcher: Catcher,
    field_height: f64,
    last_frame_ms: Option<f64>,
    toast: Option<Toast>,
    events: Vec<StageEvent>,
}

impl<S: ProgressStore, R: RandomSource> Stage<S, R> {
    /// Build an idle stage. Stored progress is read here and only here.
    pub fn new(cfg: StageConfig, roster: Roster, store: S, rng: R) -> Self {
        let run = RunState::new(Mode::Untimed, &cfg);
        Self {
            cfg,
            roster,
            progress: Progress::load(store),
            rng,
            phase: Phase::Idle,
            run,
            targets: Vec::new(),
            spawner: Spawner::new(),
            catcher: Catcher::default(),
            field_height: 0.0,
            last_frame_ms: None,
            toast: None,
            events: Vec::new(),
        }
    }

    // --- Session control -----------------------------------------------------

    /// Begin a fresh run in `mode`, discarding any targets in flight and any
    /// undrained events. The catcher keeps its position across restarts.
    pub fn start(&mut self, mode: Mode) {
        self.run = RunState::new(mode, &self.cfg);
        self.targets.clear();
        self.events.clear();
        self.toast = None;
        self.last_frame_ms = None;
        self.phase = Phase::Running(mode);
        info!("run started: {mode:?} ({} actresses)", self.roster.characters().len());
        self.spawn_tick();
    }

    /// Mode switch always restarts.
    pub fn switch_mode(&mut self, mode: Mode) {
        self.start(mode);
    }

    /// Spawn timer callback.
    pub fn spawn_tick(&mut self) {
        let Phase::Running(mode) = self.phase else { return };
        let tuning = *self.cfg.tuning(mode);
        let spawned = self.spawner.attempt(
            &mut self.targets,
            self.roster.characters(),
            &tuning,
            &self.cfg,
            &mut self.rng,
        );
        if let (true, Some(t)) = (spawned, self.targets.last()) {
            self.events.push(StageEvent::Spawned { target_id: t.id });
        }
    }

    /// One-second timer callback. Ends a timed run at zero.
    pub fn countdown_tick(&mut self) {
        if self.phase != Phase::Running(Mode::Timed) {
            return;
        }
        let left = self.run.seconds_remaining.unwrap_or(0).saturating_sub(1);
        self.run.seconds_remaining = Some(left);
        if left == 0 {
            self.end_run();
        }
    }

    fn end_run(&mut self) {
        self.phase = Phase::Ended;
        self.targets.clear();
        let s = self.run.scoring;
        let new_best = self.progress.record_run(s.score, s.caught, &self.run.caught_ids);
        info!("run ended: score {} caught {} (new best: {new_best})", s.score, s.caught);
        self.events.push(StageEvent::RunEnded(RunResult {
            score: s.score,
            caught: s.caught,
            caught_ids: self.run.caught_ids.clone(),
            new_best,
        }));
    }

    // --- Simulation ----------------------------------------------------------

    /// Frame callback with a monotonically increasing timestamp in ms.
    pub fn frame(&mut self, now_ms: f64) {
        if !matches!(self.phase, Phase::Running(_)) {
            return;
        }
        let dt = self.last_frame_ms.map_or(0.0, |last| (now_ms - last) / 1000.0);
        self.last_frame_ms = Some(now_ms);

        if self.toast.as_ref().is_some_and(|t| now_ms >= t.expires_at_ms) {
            self.toast = None;
        }

        let geo = Geometry::new(&self.cfg, self.field_height);
        for step in motion::substeps(dt, self.cfg.max_step_secs) {
            self.catcher.ease(step, self.cfg.smoothing);
            let outcome = advance(std::mem::take(&mut self.targets), step, self.catcher.rendered_x, &geo);
            self.targets = outcome.survivors;
            for resolution in outcome.resolved {
                match resolution {
                    Resolution::Caught(t) => self.on_catch(t, now_ms),
                    Resolution::Missed(t) => self.on_miss(t),
                }
            }
        }
    }

    fn on_catch(&mut self, t: FallingTarget, now_ms: f64) {
        let points = self.run.scoring.on_catch(&self.cfg);
        let c = &t.character;
        let newly_unlocked = self.progress.record_catch(&c.id, &c.star_sign_id);
        self.run.caught_ids.insert(c.id.clone());

        let text = toast::catch_line(self.progress.tone(), c, &mut self.rng);
        self.toast = Some(Toast { text, expires_at_ms: now_ms + self.cfg.toast_ms });

        debug!("caught {} ({}) +{points}, streak {}", c.id, c.star_sign_id, self.run.scoring.streak);
        self.events.push(StageEvent::Caught {
            target_id: t.id,
            character_id: c.id.clone(),
            star_sign_id: c.star_sign_id.clone(),
            points,
            newly_unlocked,
        });
    }

    fn on_miss(&mut self, t: FallingTarget) {
        self.run.scoring.on_miss();
        debug!("missed {}", t.character.id);
        self.events.push(StageEvent::Missed { target_id: t.id, character_id: t.character.id });
    }

    // --- Input ---------------------------------------------------------------

    /// Returns true when the key steers the catcher.
    pub fn key_down(&mut self, key: &str) -> bool {
        match Nudge::from_key(key) {
            Some(dir) => {
                self.catcher.nudge(dir, self.cfg.key_step_pct);
                true
            }
            None => false,
        }
    }

    pub fn pointer_down(&mut self, client_x: f64, field_left: f64, field_width: f64) {
        self.catcher.pointer_down(client_x, field_left, field_width);
    }

    pub fn pointer_move(&mut self, client_x: f64, buttons: u16, field_left: f64, field_width: f64) {
        self.catcher.pointer_move(client_x, buttons, field_left, field_width);
    }

    /// Measured play-field height in px; zero or less means "not mounted".
    pub fn set_field_height(&mut self, px: f64) {
        self.field_height = px;
    }

    // --- Accessors -----------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn run(&self) -> &RunState {
        &self.run
    }

    pub fn score(&self) -> u64 {
        self.run.scoring.score
    }

    pub fn caught(&self) -> u64 {
        self.run.scoring.caught
    }

    pub fn streak(&self) -> u32 {
        self.run.scoring.streak
    }

    pub fn targets(&self) -> &[FallingTarget] {
        &self.targets
    }

    pub fn catcher(&self) -> &Catcher {
        &self.catcher
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn config(&self) -> &StageConfig {
        &self.cfg
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn progress(&self) -> &Progress<S> {
        &self.progress
    }

    pub fn set_tone(&mut self, tone: Tone) {
        self.progress.set_tone(tone);
    }

    /// Explicit, player-confirmed wipe of the zodiac collection.
    pub fn clear_collection(&mut self) {
        info!("zodiac collection cleared");
        self.progress.clear_collection();
    }

    /// Spawn period for the current (or default) mode, for the timer host.
    pub fn spawn_period_ms(&self) -> u32 {
        let mode = match self.phase {
            Phase::Running(m) => m,
            _ => self.run.mode,
        };
        self.cfg.tuning(mode).spawn_period_ms
    }

    pub fn drain_events(&mut self) -> Vec<StageEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemoryStore;
    use crate::roster::ZodiacCard;
    use crate::stage::spawner::tests::{Scripted, character};

    fn stage(cap: usize) -> Stage<MemoryStore, Scripted> {
        let cfg = StageConfig { max_falling: cap, ..StageConfig::default() };
        let roster = Roster::new(vec![character("a1", "leo")], ZodiacCard::builtin()).unwrap();
        Stage::new(cfg, roster, MemoryStore::new(), Scripted::new(&[0.5]))
    }

    #[test]
    fn idle_stage_ignores_ticks() {
        let mut s = stage(2);
        s.spawn_tick();
        s.countdown_tick();
        s.frame(0.0);
        s.frame(1000.0);
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.targets().is_empty());
        assert!(s.drain_events().is_empty());
    }

    #[test]
    fn start_spawns_immediately_and_resets() {
        let mut s = stage(2);
        s.start(Mode::Timed);
        assert_eq!(s.targets().len(), 1);
        assert_eq!(s.run().seconds_remaining, Some(60));
        s.spawn_tick();
        assert_eq!(s.targets().len(), 2);
        s.switch_mode(Mode::Untimed);
        assert_eq!(s.phase(), Phase::Running(Mode::Untimed));
        assert_eq!(s.targets().len(), 1, "in-flight targets are discarded");
        assert_eq!(s.run().seconds_remaining, None);
        assert_eq!(s.spawn_period_ms(), 1550);
    }

    #[test]
    fn countdown_only_in_timed_mode() {
        let mut s = stage(1);
        s.start(Mode::Untimed);
        for _ in 0..100 {
            s.countdown_tick();
        }
        assert_eq!(s.phase(), Phase::Running(Mode::Untimed));
    }

    #[test]
    fn first_frame_does_not_move_targets() {
        let mut s = stage(1);
        s.start(Mode::Untimed);
        let y0 = s.targets()[0].y_px;
        s.frame(5_000.0);
        assert_eq!(s.targets()[0].y_px, y0);
        s.frame(5_100.0);
        assert!(s.targets()[0].y_px > y0);
    }

    #[test]
    fn toast_expires_after_lifetime() {
        let mut s = stage(1);
        s.set_field_height(700.0);
        s.start(Mode::Untimed);
        // x = floor(0.5 * 70) + 15 = 50: right under the default catcher.
        s.frame(0.0);
        let mut now = 0.0;
        while s.caught() == 0 {
            now += 16.0;
            s.frame(now);
            assert!(now < 10_000.0, "target never caught");
        }
        let toast = s.toast().cloned().unwrap();
        assert_eq!(toast.expires_at_ms, now + 900.0);
        s.frame(now + 899.0);
        assert!(s.toast().is_some());
        s.frame(now + 900.0);
        assert!(s.toast().is_none());
    }

    fn falling(id: u64, x_pct: f64, y_px: f64) -> FallingTarget {
        FallingTarget { id, character: character(&format!("a{id}"), "leo"), x_pct, y_px, speed: 100.0 }
    }

    #[test]
    fn same_step_resolutions_apply_in_target_order() {
        let mut s = stage(2);
        s.set_field_height(700.0);
        s.start(Mode::Untimed);
        s.drain_events();
        // 30 ms at 100 px/s: the older target exits (818 -> 821 > 820) in
        // the same sub-step the newer one enters the band (438 -> 441).
        s.targets = vec![falling(1, 15.0, 818.0), falling(2, 50.0, 438.0)];
        s.frame(0.0);
        s.frame(30.0);

        assert_eq!(s.streak(), 1, "the catch after the miss keeps its streak");
        assert_eq!(s.score(), 14);
        let order: Vec<_> = s
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                StageEvent::Missed { target_id, .. } => Some(("missed", target_id)),
                StageEvent::Caught { target_id, .. } => Some(("caught", target_id)),
                _ => None,
            })
            .collect();
        assert_eq!(order, [("missed", 1), ("caught", 2)]);
    }

    #[test]
    fn collision_uses_rendered_catcher_position() {
        let mut s = stage(1);
        s.set_field_height(700.0);
        s.start(Mode::Untimed);
        s.targets = vec![falling(1, 80.0, 438.0)];
        s.pointer_down(80.0, 0.0, 100.0);
        assert_eq!(s.catcher().target_x, 80.0);
        s.frame(0.0);
        s.frame(30.0);

        // Target is in the band right under target_x, but rendered_x has
        // only eased to about 61.
        assert!(s.catcher().rendered_x < 70.0);
        assert_eq!(s.caught(), 0);
        assert_eq!(s.targets().len(), 1);
    }

    #[test]
    fn restart_drops_queued_events_and_keeps_catcher() {
        let mut s = stage(1);
        s.start(Mode::Untimed);
        s.key_down("ArrowLeft");
        s.frame(0.0);
        s.frame(1000.0);
        let catcher = *s.catcher();
        let old = s.targets()[0].id;

        // The first run's spawn event is still queued.
        s.switch_mode(Mode::Timed);
        assert_eq!(s.catcher(), &catcher);
        let new = s.targets()[0].id;
        assert_ne!(new, old);
        assert_eq!(s.drain_events(), [StageEvent::Spawned { target_id: new }]);
    }

    #[test]
    fn tone_is_persisted() {
        let mut s = stage(1);
        s.set_tone(Tone::Savage);
        assert_eq!(s.progress().store().get(crate::progress::KEY_TONE).as_deref(), Some("savage"));
    }
}
