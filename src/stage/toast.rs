//! Celebration lines shown after a catch.

use crate::progress::Tone;
use crate::roster::Character;

use super::spawner::RandomSource;

const CUTE_LINES: [&str; 4] = [
    "Caught {name}, {sign} energy secured",
    "{name} spotted, destiny says yes",
    "Soft catch, big vibes, hello {name}",
    "{name} collected, runway blessed",
];

const SAVAGE_LINES: [&str; 4] = [
    "Caught {name}, runway cleared",
    "{name} secured, {sign} power unlocked",
    "No excuses, only catches, hi {name}",
    "{name} tried to pass, I said not today",
];

#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
    pub text: String,
    /// Frame timestamp (ms) after which the toast is dismissed.
    pub expires_at_ms: f64,
}

pub fn catch_line(tone: Tone, character: &Character, rng: &mut dyn RandomSource) -> String {
    let pool = match tone {
        Tone::Cute => &CUTE_LINES,
        Tone::Savage => &SAVAGE_LINES,
    };
    pool[rng.index(pool.len())]
        .replace("{name}", &character.short_name())
        .replace("{sign}", &character.star_sign)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::spawner::tests::{Scripted, character};

    #[test]
    fn lines_follow_tone() {
        let c = character("a1", "Leo");
        let mut rng = Scripted::new(&[0.0]);
        assert_eq!(catch_line(Tone::Cute, &c, &mut rng), "Caught Star a1, Leo energy secured");
        let mut rng = Scripted::new(&[0.3]);
        assert_eq!(catch_line(Tone::Savage, &c, &mut rng), "Star a1 secured, Leo power unlocked");
    }

    #[test]
    fn every_line_names_the_star() {
        let c = character("a1", "leo");
        for i in 0..4 {
            let u = i as f64 / 4.0;
            for tone in [Tone::Cute, Tone::Savage] {
                let line = catch_line(tone, &c, &mut Scripted::new(&[u]));
                assert!(line.contains("Star a1"), "{line}");
                assert!(!line.contains('{'), "{line}");
            }
        }
    }
}
