//! Browser runtime for the catch stage.
//!
//! Owns the canvas, the requestAnimationFrame loop, the spawn and countdown
//! intervals and the input listeners. Everything lives in thread-locals and is
//! torn down by [`stop`] (navigation away) or, for timers only, when a timed
//! run ends.

use std::cell::RefCell;
use std::rc::Rc;

use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Element, HtmlCanvasElement, KeyboardEvent, PointerEvent, window};

use crate::config::StageConfig;
use crate::progress::{ProgressStore, Tone};
use crate::roster::Roster;
use crate::stage::{Mode, Phase, RngSource, Stage, StageEvent};

type WebStage = Stage<Box<dyn ProgressStore>, RngSource<SmallRng>>;
type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

const CANVAS_ID: &str = "mami-stage";
const HUD_ID: &str = "mami-hud";
const TOAST_ID: &str = "mami-toast";
/// Catcher sprite sits this far above the field bottom.
const CATCHER_BOTTOM_PX: f64 = 90.0;

struct Runtime {
    stage: WebStage,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    raf_id: Option<i32>,
    spawn_id: Option<i32>,
    countdown_id: Option<i32>,
    /// Nodes injected by `start`; removed again by `stop`.
    created: Vec<Element>,
    /// False once the run has ended or the page is being torn down.
    active: bool,
}

/// JS callbacks kept alive for as long as the stage is mounted.
struct Callbacks {
    frame: FrameCallback,
    spawn: Closure<dyn FnMut()>,
    countdown: Closure<dyn FnMut()>,
    keydown: Closure<dyn FnMut(KeyboardEvent)>,
    pointerdown: Closure<dyn FnMut(PointerEvent)>,
    pointermove: Closure<dyn FnMut(PointerEvent)>,
}

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = const { RefCell::new(None) };
    static CALLBACKS: RefCell<Option<Callbacks>> = const { RefCell::new(None) };
}

pub(crate) fn start(mode: Mode, roster: Roster, cfg: StageConfig) -> Result<(), JsValue> {
    stop();
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win.document().ok_or_else(|| JsValue::from_str("no document"))?;

    let mut created: Vec<Element> = Vec::new();
    let canvas: HtmlCanvasElement = if let Some(el) = doc.get_element_by_id(CANVAS_ID) {
        el.dyn_into()?
    } else {
        let c: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into()?;
        c.set_id(CANVAS_ID);
        c.set_attribute("style", "display:block; width:100%; height:100%; touch-action:none; user-select:none;")
            .ok();
        doc.body().ok_or_else(|| JsValue::from_str("no body"))?.append_child(&c)?;
        created.push(c.clone().into());
        c
    };
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;

    for (id, style) in [
        (HUD_ID, "position:fixed; top:10px; left:50%; transform:translateX(-50%); font-family:sans-serif; font-size:14px; font-weight:900; padding:8px 12px; background:rgba(255,255,255,0.68); border:1px solid rgba(0,0,0,0.08); border-radius:999px; z-index:40;"),
        (TOAST_ID, "position:fixed; top:56px; left:50%; transform:translateX(-50%); font-family:sans-serif; font-weight:950; padding:10px 14px; background:rgba(255,255,255,0.74); border:1px solid rgba(0,0,0,0.10); border-radius:999px; z-index:41; display:none;"),
    ] {
        if doc.get_element_by_id(id).is_none() {
            if let Some(body) = doc.body() {
                let div = doc.create_element("div")?;
                div.set_id(id);
                div.set_attribute("style", style).ok();
                body.append_child(&div)?;
                created.push(div);
            }
        }
    }

    let rng = RngSource(SmallRng::from_entropy());
    let mut stage = Stage::new(cfg, roster, crate::open_store(), rng);
    stage.start(mode);

    RUNTIME.with(|r| {
        r.replace(Some(Runtime {
            stage,
            canvas: canvas.clone(),
            ctx,
            raf_id: None,
            spawn_id: None,
            countdown_id: None,
            created,
            active: true,
        }))
    });

    let callbacks = make_callbacks();
    doc.add_event_listener_with_callback("keydown", callbacks.keydown.as_ref().unchecked_ref())?;
    canvas.add_event_listener_with_callback("pointerdown", callbacks.pointerdown.as_ref().unchecked_ref())?;
    canvas.add_event_listener_with_callback("pointermove", callbacks.pointermove.as_ref().unchecked_ref())?;
    CALLBACKS.with(|c| c.replace(Some(callbacks)));

    schedule_timers()?;
    request_frame();
    info!("stage mounted in {mode:?} mode");
    Ok(())
}

pub(crate) fn switch_mode(mode: Mode) -> Result<(), JsValue> {
    let mounted = with_runtime(|rt| {
        rt.stage.switch_mode(mode);
        rt.active = true;
    });
    if mounted.is_none() {
        return Err(JsValue::from_str("stage not started"));
    }
    info!("switched to {mode:?}");
    schedule_timers()?;
    let raf_pending = RUNTIME.with(|r| r.borrow().as_ref().is_some_and(|rt| rt.raf_id.is_some()));
    if !raf_pending {
        request_frame();
    }
    Ok(())
}

/// Cancel everything the stage registered with the browser and drop it.
pub(crate) fn stop() {
    let Some(win) = window() else { return };
    if let Some(mut rt) = RUNTIME.with(|r| r.borrow_mut().take()) {
        rt.active = false;
        cancel_timers(&win, &mut rt);
        if let Some(cb) = CALLBACKS.with(|c| c.borrow_mut().take()) {
            if let Some(doc) = win.document() {
                doc.remove_event_listener_with_callback("keydown", cb.keydown.as_ref().unchecked_ref()).ok();
            }
            rt.canvas
                .remove_event_listener_with_callback("pointerdown", cb.pointerdown.as_ref().unchecked_ref())
                .ok();
            rt.canvas
                .remove_event_listener_with_callback("pointermove", cb.pointermove.as_ref().unchecked_ref())
                .ok();
            // Break the frame closure's self-reference.
            cb.frame.borrow_mut().take();
        }
        for el in rt.created.drain(..) {
            el.remove();
        }
        info!("stage unmounted");
    }
}

pub(crate) fn set_tone(tone: Tone) -> bool {
    with_runtime(|rt| rt.stage.set_tone(tone)).is_some()
}

pub(crate) fn clear_collection() -> bool {
    with_runtime(|rt| rt.stage.clear_collection()).is_some()
}

fn with_runtime<T>(f: impl FnOnce(&mut Runtime) -> T) -> Option<T> {
    RUNTIME.with(|r| r.borrow_mut().as_mut().map(f))
}

fn make_callbacks() -> Callbacks {
    let frame: FrameCallback = Rc::new(RefCell::new(None));
    let again = frame.clone();
    *frame.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        let keep_going = with_runtime(|rt| {
            rt.raf_id = None;
            rt.on_frame(ts);
            rt.active
        })
        .unwrap_or(false);
        if keep_going {
            if let (Some(w), Some(cb)) = (window(), again.borrow().as_ref()) {
                let id = w.request_animation_frame(cb.as_ref().unchecked_ref()).ok();
                with_runtime(|rt| rt.raf_id = id);
            }
        }
    }) as Box<dyn FnMut(f64)>));

    let spawn = Closure::wrap(Box::new(move || {
        with_runtime(|rt| {
            rt.stage.spawn_tick();
            rt.pump_events();
        });
    }) as Box<dyn FnMut()>);

    let countdown = Closure::wrap(Box::new(move || {
        with_runtime(|rt| {
            rt.stage.countdown_tick();
            rt.pump_events();
        });
    }) as Box<dyn FnMut()>);

    let keydown = Closure::wrap(Box::new(move |evt: KeyboardEvent| {
        with_runtime(|rt| {
            if rt.stage.key_down(&evt.key()) {
                evt.prevent_default();
            }
        });
    }) as Box<dyn FnMut(_)>);

    let pointerdown = Closure::wrap(Box::new(move |evt: PointerEvent| {
        with_runtime(|rt| {
            let rect = rt.canvas.get_bounding_client_rect();
            rt.stage.pointer_down(evt.client_x() as f64, rect.left(), rect.width());
        });
    }) as Box<dyn FnMut(_)>);

    let pointermove = Closure::wrap(Box::new(move |evt: PointerEvent| {
        with_runtime(|rt| {
            let rect = rt.canvas.get_bounding_client_rect();
            rt.stage.pointer_move(evt.client_x() as f64, evt.buttons(), rect.left(), rect.width());
        });
    }) as Box<dyn FnMut(_)>);

    Callbacks { frame, spawn, countdown, keydown, pointerdown, pointermove }
}

/// (Re)register spawn and countdown intervals for the current mode.
fn schedule_timers() -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let ids = CALLBACKS.with(|c| -> Result<Option<(i32, i32)>, JsValue> {
        let cb = c.borrow();
        let Some(cb) = cb.as_ref() else { return Ok(None) };
        let period = with_runtime(|rt| {
            cancel_intervals(&win, rt);
            rt.stage.spawn_period_ms()
        })
        .unwrap_or(StageConfig::default().untimed.spawn_period_ms);
        let spawn = win.set_interval_with_callback_and_timeout_and_arguments_0(
            cb.spawn.as_ref().unchecked_ref(),
            period as i32,
        )?;
        let countdown = win.set_interval_with_callback_and_timeout_and_arguments_0(
            cb.countdown.as_ref().unchecked_ref(),
            1000,
        )?;
        Ok(Some((spawn, countdown)))
    })?;
    if let Some((spawn, countdown)) = ids {
        with_runtime(|rt| {
            rt.spawn_id = Some(spawn);
            rt.countdown_id = Some(countdown);
        });
    }
    Ok(())
}

fn request_frame() {
    let Some(win) = window() else { return };
    let id = CALLBACKS.with(|c| {
        let cb = c.borrow();
        let frame = cb.as_ref()?.frame.borrow();
        win.request_animation_frame(frame.as_ref()?.as_ref().unchecked_ref()).ok()
    });
    with_runtime(|rt| rt.raf_id = id);
}

fn cancel_intervals(win: &web_sys::Window, rt: &mut Runtime) {
    for id in [rt.spawn_id.take(), rt.countdown_id.take()].into_iter().flatten() {
        win.clear_interval_with_handle(id);
    }
}

fn cancel_timers(win: &web_sys::Window, rt: &mut Runtime) {
    cancel_intervals(win, rt);
    if let Some(id) = rt.raf_id.take() {
        win.cancel_animation_frame(id).ok();
    }
}

impl Runtime {
    fn on_frame(&mut self, ts: f64) {
        // Keep the backing store in sync with the laid-out size.
        let (w, h) = (self.canvas.client_width().max(0) as u32, self.canvas.client_height().max(0) as u32);
        if w > 0 && h > 0 && (self.canvas.width() != w || self.canvas.height() != h) {
            self.canvas.set_width(w);
            self.canvas.set_height(h);
        }
        self.stage.set_field_height(h as f64);
        self.stage.frame(ts);
        self.pump_events();
        self.render();
    }

    fn pump_events(&mut self) {
        for event in self.stage.drain_events() {
            if let StageEvent::RunEnded(result) = event {
                self.active = false;
                if let Some(win) = window() {
                    cancel_timers(&win, self);
                    info!("run over with {} points, leaving for summary", result.score);
                    if let Err(e) = win.location().set_href(&self.stage.config().end_url) {
                        warn!("navigation to end page failed: {e:?}");
                    }
                }
            }
        }
    }

    fn render(&self) {
        let ctx = &self.ctx;
        let w = self.canvas.width() as f64;
        let h = self.canvas.height() as f64;
        ctx.set_fill_style_str("#f8f2e7");
        ctx.fill_rect(0.0, 0.0, w, h);

        // Catch band hint.
        let geo = crate::stage::Geometry::new(self.stage.config(), h);
        ctx.set_fill_style_str("rgba(212,175,55,0.10)");
        ctx.fill_rect(0.0, geo.band_top, w, geo.band_bottom - geo.band_top);

        ctx.set_font("bold 15px sans-serif");
        ctx.set_text_align("center");
        for t in self.stage.targets() {
            let label = format!("✦ {} • {}", t.character.short_name(), t.character.star_sign);
            let cx = t.x_pct / 100.0 * w;
            let tw = ctx.measure_text(&label).map(|m| m.width()).unwrap_or(120.0) + 28.0;
            ctx.set_fill_style_str("rgba(255,255,255,0.85)");
            ctx.fill_rect(cx - tw / 2.0, t.y_px, tw, 36.0);
            ctx.set_fill_style_str("#1e1e1e");
            ctx.fill_text(&label, cx, t.y_px + 23.0).ok();
        }

        let cx = self.stage.catcher().rendered_x / 100.0 * w;
        ctx.set_fill_style_str("#d4af37");
        ctx.begin_path();
        ctx.arc(cx, h - CATCHER_BOTTOM_PX, 28.0, 0.0, std::f64::consts::TAU).ok();
        ctx.fill();

        let Some(doc) = window().and_then(|w| w.document()) else { return };
        if let Some(hud) = doc.get_element_by_id(HUD_ID) {
            let clock = match (self.stage.phase(), self.stage.run().seconds_remaining) {
                (Phase::Running(Mode::Timed), Some(s)) | (Phase::Ended, Some(s)) => format!("Time {s}"),
                _ => "Free play".to_string(),
            };
            hud.set_text_content(Some(&format!(
                "Score {} · Streak {} · Cards {}/{} · {clock}",
                self.stage.score(),
                self.stage.streak(),
                self.stage.progress().collected().len(),
                self.stage.roster().cards().len(),
            )));
        }
        if let Some(el) = doc.get_element_by_id(TOAST_ID) {
            let display = match self.stage.toast() {
                Some(t) => {
                    el.set_text_content(Some(&t.text));
                    "block"
                }
                None => "none",
            };
            if let Some(el) = el.dyn_ref::<web_sys::HtmlElement>() {
                el.style().set_property("display", display).ok();
            }
        }
    }
}
