//! Actress roster and zodiac card set.
//!
//! Both lists arrive as JSON from the host page (`actresses.json`,
//! `zodiacCards.json`). When no card JSON is given the built-in
//! [`ZODIAC_SIGNS`](crate::ZODIAC_SIGNS) table is used.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ZODIAC_SIGNS;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("roster json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },
}

/// A collectible actress. `star_sign_id` keys into the zodiac card set.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,
    /// Human readable, e.g. "Gemini".
    pub star_sign: String,
    /// Card id, e.g. "gemini".
    pub star_sign_id: String,
    #[serde(default)]
    pub chinese_zodiac: String,
    #[serde(default)]
    pub birthdate: Option<String>,
}

impl Character {
    /// Compact label for toasts: whole name up to two words, else "First L.".
    pub fn short_name(&self) -> String {
        let parts: Vec<&str> = self.name.split_whitespace().collect();
        if parts.len() <= 2 {
            return parts.join(" ");
        }
        let first = parts[0];
        let last_initial = parts[parts.len() - 1].chars().next().map(String::from).unwrap_or_default();
        format!("{first} {last_initial}.")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Element {
    Fire,
    Earth,
    Air,
    Water,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Rare,
    Partner,
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ColourTheme {
    pub primary: String,
    pub accent: String,
}

/// Display state of a card in the collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CardState {
    Locked,
    Unlocked,
    PartnerBoosted,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZodiacCard {
    pub id: String,
    pub star_sign: String,
    pub symbol: String,
    pub element: Element,
    #[serde(default)]
    pub energy: String,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub colour_theme: ColourTheme,
    #[serde(default)]
    pub locked_text: String,
    #[serde(default)]
    pub unlock_text: String,
    #[serde(default)]
    pub partner_boosted_text: String,
}

impl ZodiacCard {
    /// Cards for the twelve western signs, without flavour text.
    pub fn builtin() -> Vec<ZodiacCard> {
        ZODIAC_SIGNS
            .iter()
            .map(|&(id, star_sign, symbol, element)| ZodiacCard {
                id: id.to_string(),
                star_sign: star_sign.to_string(),
                symbol: symbol.to_string(),
                element,
                energy: String::new(),
                rarity: Rarity::Common,
                colour_theme: ColourTheme::default(),
                locked_text: format!("Catch a {star_sign} star to unlock"),
                unlock_text: format!("{star_sign} energy unlocked"),
                partner_boosted_text: format!("{star_sign} energy, partner boosted"),
            })
            .collect()
    }

    pub fn flavor_text(&self, state: CardState) -> &str {
        match state {
            CardState::Locked => &self.locked_text,
            CardState::Unlocked => &self.unlock_text,
            CardState::PartnerBoosted => &self.partner_boosted_text,
        }
    }
}

#[derive(Deserialize)]
struct ActressesFile {
    #[serde(default)]
    actresses: Vec<Character>,
}

#[derive(Deserialize)]
struct CardsFile {
    #[serde(default)]
    cards: Vec<ZodiacCard>,
}

/// Immutable roster for one session.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    characters: Vec<Character>,
    cards: Vec<ZodiacCard>,
}

impl Roster {
    pub fn new(characters: Vec<Character>, cards: Vec<ZodiacCard>) -> Result<Self, RosterError> {
        check_unique("actress", characters.iter().map(|c| c.id.as_str()))?;
        check_unique("card", cards.iter().map(|c| c.id.as_str()))?;
        Ok(Self { characters, cards })
    }

    /// Parse `{ "actresses": [...] }` and `{ "cards": [...] }` documents.
    /// An empty `cards_json` selects the built-in card set.
    pub fn from_json(actresses_json: &str, cards_json: &str) -> Result<Self, RosterError> {
        let actresses: ActressesFile = serde_json::from_str(actresses_json)?;
        let cards = if cards_json.trim().is_empty() {
            ZodiacCard::builtin()
        } else {
            serde_json::from_str::<CardsFile>(cards_json)?.cards
        };
        Self::new(actresses.actresses, cards)
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn cards(&self) -> &[ZodiacCard] {
        &self.cards
    }

    pub fn card(&self, id: &str) -> Option<&ZodiacCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Actresses sharing a star sign, sorted by name (collection detail view).
    pub fn characters_for_sign(&self, star_sign_id: &str) -> Vec<&Character> {
        let mut out: Vec<&Character> =
            self.characters.iter().filter(|c| c.star_sign_id == star_sign_id).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

fn check_unique<'a>(kind: &'static str, ids: impl Iterator<Item = &'a str>) -> Result<(), RosterError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(RosterError::DuplicateId { kind, id: id.to_string() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(id: &str, name: &str, sign_id: &str) -> Character {
        Character {
            id: id.into(),
            name: name.into(),
            star_sign: sign_id.into(),
            star_sign_id: sign_id.into(),
            chinese_zodiac: String::new(),
            birthdate: None,
        }
    }

    #[test]
    fn short_name_abbreviates_long_names() {
        assert_eq!(character("a", "  Freen  ", "leo").short_name(), "Freen");
        assert_eq!(character("a", "Freen Sarocha", "leo").short_name(), "Freen Sarocha");
        assert_eq!(character("a", "Rebecca Patricia Armstrong", "leo").short_name(), "Rebecca A.");
    }

    #[test]
    fn parses_actresses_with_builtin_cards() {
        let json = r#"{
            "meta": { "version": "1" },
            "actresses": [
                { "id": "a1", "name": "Ann Example", "starSign": "Leo", "starSignId": "leo",
                  "chineseZodiac": "Rat", "birthdate": "2000-08-01" }
            ]
        }"#;
        let roster = Roster::from_json(json, "").unwrap();
        assert_eq!(roster.characters().len(), 1);
        assert_eq!(roster.cards().len(), 12);
        assert!(roster.card("leo").is_some());
    }

    #[test]
    fn parses_card_document() {
        let cards = r##"{
            "meta": { "version": "1", "totalCards": 1, "rarityTypes": ["common", "rare", "partner"] },
            "cards": [
                { "id": "leo", "starSign": "Leo", "symbol": "♌", "element": "Fire", "energy": "bold",
                  "rarity": "rare", "colourTheme": { "primary": "#f90", "accent": "#fff" },
                  "unlockText": "roar", "partnerBoostedText": "double roar" }
            ]
        }"##;
        let roster = Roster::from_json(r#"{ "actresses": [] }"#, cards).unwrap();
        let leo = roster.card("leo").unwrap();
        assert_eq!(leo.rarity, Rarity::Rare);
        assert_eq!(leo.element, Element::Fire);
        assert_eq!(leo.flavor_text(CardState::PartnerBoosted), "double roar");
        assert_eq!(leo.flavor_text(CardState::Locked), "");
        assert!(roster.is_empty());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Roster::new(vec![character("a1", "A", "leo"), character("a1", "B", "leo")], vec![])
            .unwrap_err();
        assert!(matches!(err, RosterError::DuplicateId { kind: "actress", .. }));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(Roster::from_json("not json", ""), Err(RosterError::Json(_))));
    }

    #[test]
    fn characters_for_sign_sorted_by_name() {
        let roster = Roster::new(
            vec![character("b", "Zoe", "leo"), character("a", "Amy", "leo"), character("c", "Cat", "aries")],
            ZodiacCard::builtin(),
        )
        .unwrap();
        let names: Vec<&str> = roster.characters_for_sign("leo").iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Amy", "Zoe"]);
    }
}
