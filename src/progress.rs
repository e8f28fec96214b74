//! Persisted player progress.
//!
//! The engine never touches `localStorage` directly: it is handed a
//! [`ProgressStore`] and goes through [`Progress`], which owns the key names
//! and the (de)serialization of id sets. Anything unreadable in the store is
//! treated as empty / zero.

use std::collections::{BTreeSet, HashMap};

use log::warn;
use thiserror::Error;

use crate::roster::CardState;

pub const KEY_COLLECTED_ZODIAC_IDS: &str = "mamiCollectedZodiacIds";
pub const KEY_PARTNER_BOOSTED_IDS: &str = "mamiPartnerBoostedZodiacIds";
pub const KEY_CAUGHT_ACTRESS_IDS: &str = "mamiCaughtActressIds";
pub const KEY_CARDS_COLLECTED: &str = "mamiCardsCollected";
pub const KEY_LAST_SCORE: &str = "mamiLastScore";
pub const KEY_LAST_CAUGHT: &str = "mamiLastCaught";
pub const KEY_LAST_CAUGHT_IDS: &str = "mamiLastCaughtIds";
pub const KEY_BEST_SCORE: &str = "mamiBestScore";
pub const KEY_TONE: &str = "mamiTone";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable")]
    Unavailable,
    #[error("storage rejected write to '{key}': {reason}")]
    Rejected { key: String, reason: String },
}

/// Key/value string store surviving across sessions.
pub trait ProgressStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-process store (tests, and fallback when the browser denies storage).
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl ProgressStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// `window.localStorage` backend.
pub struct LocalStore {
    storage: web_sys::Storage,
}

impl LocalStore {
    pub fn open() -> Result<Self, StoreError> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or(StoreError::Unavailable)?;
        Ok(Self { storage })
    }
}

impl ProgressStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage.set_item(key, value).map_err(|e| StoreError::Rejected {
            key: key.to_string(),
            reason: format!("{e:?}"),
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.storage.remove_item(key).map_err(|e| StoreError::Rejected {
            key: key.to_string(),
            reason: format!("{e:?}"),
        })
    }
}

impl<S: ProgressStore + ?Sized> ProgressStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Flavour-text style for catch toasts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tone {
    #[default]
    Cute,
    Savage,
}

impl Tone {
    /// Anything other than "savage" reads as cute.
    pub fn parse(raw: &str) -> Tone {
        if raw == "savage" { Tone::Savage } else { Tone::Cute }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Cute => "cute",
            Tone::Savage => "savage",
        }
    }
}

/// Decode a JSON array of strings; non-strings are dropped, anything else is empty.
pub fn parse_id_set(raw: Option<&str>) -> BTreeSet<String> {
    let Some(raw) = raw else { return BTreeSet::new() };
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Ok(_) => {
            warn!("stored id set is not an array; treating as empty");
            BTreeSet::new()
        }
        Err(e) => {
            warn!("stored id set is not valid json ({e}); treating as empty");
            BTreeSet::new()
        }
    }
}

/// Decode a stored non-negative integer; unparseable or missing reads as 0.
pub fn parse_number(raw: Option<&str>) -> u64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else { return 0 };
    if let Ok(n) = raw.parse::<u64>() {
        return n;
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 => f as u64,
        _ => {
            warn!("stored number '{raw}' is malformed; treating as 0");
            0
        }
    }
}

fn encode_id_set(ids: &BTreeSet<String>) -> String {
    // Serializing a set of strings cannot fail.
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

/// Progress view over a store. Id sets are read once on construction and
/// written through on every change.
pub struct Progress<S: ProgressStore> {
    store: S,
    collected: BTreeSet<String>,
    partner_boosted: BTreeSet<String>,
    caught: BTreeSet<String>,
    tone: Tone,
}

impl<S: ProgressStore> Progress<S> {
    pub fn load(store: S) -> Self {
        let collected = parse_id_set(store.get(KEY_COLLECTED_ZODIAC_IDS).as_deref());
        let partner_boosted = parse_id_set(store.get(KEY_PARTNER_BOOSTED_IDS).as_deref());
        let caught = parse_id_set(store.get(KEY_CAUGHT_ACTRESS_IDS).as_deref());
        let tone = store.get(KEY_TONE).map(|t| Tone::parse(&t)).unwrap_or_default();
        Self { store, collected, partner_boosted, caught, tone }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn set_tone(&mut self, tone: Tone) {
        self.tone = tone;
        self.write(KEY_TONE, tone.as_str());
    }

    pub fn collected(&self) -> &BTreeSet<String> {
        &self.collected
    }

    pub fn caught(&self) -> &BTreeSet<String> {
        &self.caught
    }

    /// Partner boost outranks a plain unlock.
    pub fn card_state(&self, card_id: &str) -> CardState {
        if self.partner_boosted.contains(card_id) {
            CardState::PartnerBoosted
        } else if self.collected.contains(card_id) {
            CardState::Unlocked
        } else {
            CardState::Locked
        }
    }

    pub fn best_score(&self) -> u64 {
        parse_number(self.store.get(KEY_BEST_SCORE).as_deref())
    }

    /// Record a catch: unlock the star sign's card and remember the actress.
    /// Returns true when the card was newly unlocked.
    pub fn record_catch(&mut self, character_id: &str, star_sign_id: &str) -> bool {
        let newly = self.collected.insert(star_sign_id.to_string());
        let encoded = encode_id_set(&self.collected);
        self.write(KEY_COLLECTED_ZODIAC_IDS, &encoded);
        self.write(KEY_CARDS_COLLECTED, &self.collected.len().to_string());

        if self.caught.insert(character_id.to_string()) {
            let encoded = encode_id_set(&self.caught);
            self.write(KEY_CAUGHT_ACTRESS_IDS, &encoded);
        }
        newly
    }

    /// Persist the result of a finished run. Returns true on a new best score.
    pub fn record_run(&mut self, score: u64, caught: u64, run_ids: &BTreeSet<String>) -> bool {
        self.write(KEY_LAST_SCORE, &score.to_string());
        self.write(KEY_LAST_CAUGHT, &caught.to_string());
        self.write(KEY_LAST_CAUGHT_IDS, &encode_id_set(run_ids));
        if score > self.best_score() {
            self.write(KEY_BEST_SCORE, &score.to_string());
            return true;
        }
        false
    }

    /// Wipe the zodiac collection. Confirmation is the caller's job.
    pub fn clear_collection(&mut self) {
        self.collected.clear();
        self.partner_boosted.clear();
        for key in [KEY_COLLECTED_ZODIAC_IDS, KEY_PARTNER_BOOSTED_IDS] {
            if let Err(e) = self.store.remove(key) {
                warn!("{e}");
            }
        }
        self.write(KEY_CARDS_COLLECTED, "0");
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            warn!("{e}");
        }
    }
}

/// Titles earned by catch count, ascending.
pub const TITLE_TIERS: &[(u64, &str)] = &[
    (0, "First Walk"),
    (5, "Rising Presence"),
    (10, "Runway Guardian"),
    (15, "Mami of GL"),
];

pub fn title_for(caught: u64) -> &'static str {
    TITLE_TIERS
        .iter()
        .rev()
        .find(|(min, _)| caught >= *min)
        .map(|(_, t)| *t)
        .unwrap_or(TITLE_TIERS[0].1)
}

/// What the end-of-run page shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub score: u64,
    pub caught: u64,
    pub cards: u64,
    pub best: u64,
}

impl RunSummary {
    /// Read the last run from the store, promoting it to best score if higher.
    pub fn load<S: ProgressStore>(store: &mut S) -> Self {
        let score = parse_number(store.get(KEY_LAST_SCORE).as_deref());
        let caught = parse_number(store.get(KEY_LAST_CAUGHT).as_deref());
        let cards = parse_number(store.get(KEY_CARDS_COLLECTED).as_deref());
        let mut best = parse_number(store.get(KEY_BEST_SCORE).as_deref());
        if score > best {
            best = score;
            if let Err(e) = store.set(KEY_BEST_SCORE, &score.to_string()) {
                warn!("{e}");
            }
        }
        Self { score, caught, cards, best }
    }

    pub fn title(&self) -> &'static str {
        title_for(self.caught)
    }
}
