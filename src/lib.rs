//! Mami of GL core crate.
//!
//! Catch falling GL stars to unlock zodiac cards. The play session itself is
//! [`stage::Stage`], a headless engine driven by frame / spawn / countdown
//! ticks; [`web`] wires it to the browser (canvas, timers, input listeners,
//! `localStorage`). Roster data arrives as JSON from the host page.

use wasm_bindgen::prelude::*;

pub mod config;
pub mod progress;
pub mod roster;
pub mod stage;
mod web;

use progress::{LocalStore, MemoryStore, Progress, ProgressStore, RunSummary, Tone};
use roster::{CardState, Element, Rarity, Roster, ZodiacCard};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

// -----------------------------------------------------------------------------
// Zodiac dataset: (card id, display name, symbol, element).
// Card ids are the `starSignId` values used by the actress roster.
// -----------------------------------------------------------------------------

pub const ZODIAC_SIGNS: &[(&str, &str, &str, Element)] = &[
    ("aries", "Aries", "♈", Element::Fire),
    ("taurus", "Taurus", "♉", Element::Earth),
    ("gemini", "Gemini", "♊", Element::Air),
    ("cancer", "Cancer", "♋", Element::Water),
    ("leo", "Leo", "♌", Element::Fire),
    ("virgo", "Virgo", "♍", Element::Earth),
    ("libra", "Libra", "♎", Element::Air),
    ("scorpio", "Scorpio", "♏", Element::Water),
    ("sagittarius", "Sagittarius", "♐", Element::Fire),
    ("capricorn", "Capricorn", "♑", Element::Earth),
    ("aquarius", "Aquarius", "♒", Element::Air),
    ("pisces", "Pisces", "♓", Element::Water),
];

// -----------------------------------------------------------------------------
// JS entrypoints
// -----------------------------------------------------------------------------

/// Start (or restart) the play page. `mode` is "timed" or "free";
/// `cards_json` and `config_json` may be empty to use built-in defaults.
#[wasm_bindgen]
pub fn start_game(
    mode: &str,
    actresses_json: &str,
    cards_json: &str,
    config_json: &str,
) -> Result<(), JsValue> {
    let mode = stage::Mode::parse(mode).ok_or_else(|| JsValue::from_str("unknown mode"))?;
    let roster = roster::Roster::from_json(actresses_json, cards_json).map_err(to_js)?;
    let cfg = if config_json.trim().is_empty() {
        config::StageConfig::default()
    } else {
        config::StageConfig::from_json(config_json).map_err(to_js)?
    };
    web::start(mode, roster, cfg)
}

#[wasm_bindgen]
pub fn switch_mode(mode: &str) -> Result<(), JsValue> {
    let mode = stage::Mode::parse(mode).ok_or_else(|| JsValue::from_str("unknown mode"))?;
    web::switch_mode(mode)
}

/// Tear down the play page: frame loop, timers and listeners.
#[wasm_bindgen]
pub fn stop_game() {
    web::stop();
}

#[wasm_bindgen]
pub fn set_tone(tone: &str) {
    let tone = Tone::parse(tone);
    if !web::set_tone(tone) {
        Progress::load(open_store()).set_tone(tone);
    }
}

/// Clear the zodiac collection. The page asks the player to confirm first.
#[wasm_bindgen]
pub fn clear_progress() {
    if !web::clear_collection() {
        Progress::load(open_store()).clear_collection();
    }
}

#[wasm_bindgen]
pub fn cards_collected() -> u32 {
    Progress::load(open_store()).collected().len() as u32
}

#[wasm_bindgen]
pub fn best_score() -> f64 {
    Progress::load(open_store()).best_score() as f64
}

/// Summary for the end page as JSON (`score`, `caught`, `cards`, `best`, `title`).
#[wasm_bindgen]
pub fn end_summary_json() -> String {
    let mut store = open_store();
    summary_json(&RunSummary::load(&mut store))
}

/// Every card with its unlock state, flavour text and actresses, for the
/// collection grid. Empty `cards_json` means the built-in deck.
#[wasm_bindgen]
pub fn collection_json(actresses_json: &str, cards_json: &str) -> Result<String, JsValue> {
    let roster = Roster::from_json(actresses_json, cards_json).map_err(to_js)?;
    let progress = Progress::load(open_store());
    let cards: Vec<_> = roster.cards().iter().map(|c| card_view(&roster, &progress, c)).collect();
    Ok(serde_json::Value::Array(cards).to_string())
}

/// One card for the collection detail modal; `None` for an unknown id.
#[wasm_bindgen]
pub fn card_json(actresses_json: &str, cards_json: &str, id: &str) -> Result<Option<String>, JsValue> {
    let roster = Roster::from_json(actresses_json, cards_json).map_err(to_js)?;
    let progress = Progress::load(open_store());
    Ok(roster.card(id).map(|c| card_view(&roster, &progress, c).to_string()))
}

fn card_view<S: ProgressStore>(roster: &Roster, progress: &Progress<S>, card: &ZodiacCard) -> serde_json::Value {
    let state = progress.card_state(&card.id);
    let rarity = match state {
        CardState::PartnerBoosted => Rarity::Partner,
        _ => card.rarity,
    };
    let actresses: Vec<_> = roster
        .characters_for_sign(&card.id)
        .into_iter()
        .map(|a| serde_json::json!({ "id": a.id, "name": a.short_name(), "caught": progress.caught().contains(&a.id) }))
        .collect();
    serde_json::json!({
        "id": card.id,
        "starSign": card.star_sign,
        "symbol": card.symbol,
        "element": card.element,
        "energy": card.energy,
        "rarity": rarity,
        "colourTheme": card.colour_theme,
        "state": state,
        "text": card.flavor_text(state),
        "actresses": actresses,
    })
}

fn summary_json(summary: &RunSummary) -> String {
    serde_json::json!({
        "score": summary.score,
        "caught": summary.caught,
        "cards": summary.cards,
        "best": summary.best,
        "title": summary.title(),
    })
    .to_string()
}

/// `localStorage`, or an in-memory stand-in when the browser refuses it.
pub(crate) fn open_store() -> Box<dyn ProgressStore> {
    match LocalStore::open() {
        Ok(s) => Box::new(s),
        Err(e) => {
            log::warn!("{e}; progress will not survive this page");
            Box::new(MemoryStore::new())
        }
    }
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}
