// This library is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this library.  If not, see <http://www.gnu.org/licenses/>.
//! Display effects.
//!
//! Each effect is a pure function of the milliseconds since it started, so
//! the only state kept between frames is the start stamp.

use crate::glyph::{
    encode, Glyphs, BLANK, SEG_BOTTOM, SEG_LOWER_LEFT, SEG_LOWER_RIGHT, SEG_TOP, SEG_UPPER_LEFT,
    SEG_UPPER_RIGHT,
};
use crate::DISPLAY_COUNT;

const SPIRAL_STEP_MS: u32 = 60;
const SPIRAL_REVOLUTIONS: u32 = 2;

const DATE_STEP_MS: u32 = 150;
const DATE_TOTAL_MS: u32 = 3000;

const PHRASE_STEP_MS: u32 = 250;

// Outer segments in clockwise order.
const OUTER: [u8; 6] = [
    SEG_TOP,
    SEG_UPPER_RIGHT,
    SEG_LOWER_RIGHT,
    SEG_BOTTOM,
    SEG_LOWER_LEFT,
    SEG_UPPER_LEFT,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    #[default]
    None,
    Spiral,
    Date,
    Phrase,
}

impl Effect {
    const ALL: [Effect; 4] = [Effect::None, Effect::Spiral, Effect::Date, Effect::Phrase];

    /// Stored form.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Effect> {
        Effect::ALL.get(usize::from(code)).copied()
    }

    /// Step through the effects, wrapping at either end.
    pub fn step(self, delta: i8) -> Effect {
        let n = Effect::ALL.len() as i16;
        let i = (i16::from(self.code()) + i16::from(delta)).rem_euclid(n);
        Effect::ALL[i as usize]
    }
}

/// Outer segments chasing around every tube.
pub fn spiral(elapsed_ms: u32) -> Option<Glyphs> {
    let step = elapsed_ms / SPIRAL_STEP_MS;
    if step >= SPIRAL_REVOLUTIONS * OUTER.len() as u32 {
        return None;
    }
    let mut glyphs = BLANK;
    for (tube, g) in glyphs.iter_mut().enumerate() {
        *g = OUTER[(step as usize + tube) % OUTER.len()];
    }
    Some(glyphs)
}

/// `date` uncovered from the left one tube at a time, then held.
pub fn date_reveal(elapsed_ms: u32, date: &Glyphs) -> Option<Glyphs> {
    if elapsed_ms >= DATE_TOTAL_MS {
        return None;
    }
    let shown = (elapsed_ms / DATE_STEP_MS + 1) as usize;
    let mut glyphs = BLANK;
    for (i, g) in glyphs.iter_mut().enumerate().take(shown) {
        *g = date[i];
    }
    Some(glyphs)
}

/// `phrase` scrolling in from the right and out to the left. With `looping`
/// it comes round again forever, otherwise it ends after one pass.
pub fn phrase_scroll(elapsed_ms: u32, phrase: &[u8; DISPLAY_COUNT], looping: bool) -> Option<Glyphs> {
    // the phrase preceded by one screen of blanks
    let period = 2 * DISPLAY_COUNT;
    let mut column = (elapsed_ms / PHRASE_STEP_MS) as usize;
    if looping {
        column %= period;
    } else if column >= period - 1 {
        return None;
    }
    let mut glyphs = BLANK;
    for (tube, g) in glyphs.iter_mut().enumerate() {
        let index = (column + 1 + tube) % period;
        if index >= DISPLAY_COUNT {
            *g = encode(phrase[index - DISPLAY_COUNT]);
        }
    }
    Some(glyphs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Running {
    effect: Effect,
    started_ms: u32,
    looping: bool,
}

/// The effect currently on the tubes, if any.
#[derive(Debug, Default)]
pub struct EffectPlayer {
    running: Option<Running>,
}

impl EffectPlayer {
    pub const fn new() -> Self {
        EffectPlayer { running: None }
    }

    /// Start `effect` from the beginning, replacing whatever was playing.
    pub fn start(&mut self, effect: Effect, now_ms: u32, looping: bool) {
        self.running = match effect {
            Effect::None => None,
            effect => Some(Running {
                effect,
                started_ms: now_ms,
                looping,
            }),
        };
    }

    pub fn stop(&mut self) {
        self.running = None;
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    /// Glyphs for `now_ms`, or `None` once the effect has finished.
    pub fn frame(
        &mut self,
        now_ms: u32,
        date: &Glyphs,
        phrase: &[u8; DISPLAY_COUNT],
    ) -> Option<Glyphs> {
        let running = self.running?;
        let elapsed = now_ms.wrapping_sub(running.started_ms);
        let glyphs = match running.effect {
            Effect::None => None,
            Effect::Spiral => spiral(elapsed),
            Effect::Date => date_reveal(elapsed, date),
            Effect::Phrase => phrase_scroll(elapsed, phrase, running.looping),
        };
        if glyphs.is_none() {
            self.running = None;
        }
        glyphs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::encode_text;

    #[test]
    fn codes() {
        for effect in Effect::ALL {
            assert_eq!(Effect::from_code(effect.code()), Some(effect));
        }
        assert_eq!(Effect::from_code(4), None);
        assert_eq!(Effect::Phrase.step(1), Effect::None);
        assert_eq!(Effect::None.step(-1), Effect::Phrase);
    }

    #[test]
    fn spiral_offsets_adjacent_tubes() {
        let first = spiral(0).unwrap();
        assert_eq!(first, [SEG_TOP, SEG_UPPER_RIGHT, SEG_LOWER_RIGHT, SEG_BOTTOM, SEG_LOWER_LEFT, SEG_UPPER_LEFT]);
        let next = spiral(SPIRAL_STEP_MS).unwrap();
        assert_eq!(next[0], first[1]);
        assert_eq!(next[5], first[0]);
        // two full turns then done
        assert!(spiral(12 * SPIRAL_STEP_MS - 1).is_some());
        assert!(spiral(12 * SPIRAL_STEP_MS).is_none());
    }

    #[test]
    fn date_reveals_from_the_left() {
        let date = encode_text(b"311224");
        let g = date_reveal(0, &date).unwrap();
        assert_eq!(g[0], date[0]);
        assert!(g[1..].iter().all(|&s| s == 0));
        let g = date_reveal(2 * DATE_STEP_MS, &date).unwrap();
        assert_eq!(&g[..3], &date[..3]);
        assert_eq!(g[3], 0);
        assert_eq!(date_reveal(2000, &date), Some(date));
        assert_eq!(date_reveal(DATE_TOTAL_MS, &date), None);
    }

    #[test]
    fn phrase_scrolls_right_to_left() {
        let phrase = *b"Photon";
        let g = phrase_scroll(0, &phrase, false).unwrap();
        assert_eq!(g, [0, 0, 0, 0, 0, encode(b'P')]);
        let g = phrase_scroll(5 * PHRASE_STEP_MS, &phrase, false).unwrap();
        assert_eq!(g, encode_text(b"Photon"));
        let g = phrase_scroll(10 * PHRASE_STEP_MS, &phrase, false).unwrap();
        assert_eq!(g, [encode(b'n'), 0, 0, 0, 0, 0]);
        assert_eq!(phrase_scroll(11 * PHRASE_STEP_MS, &phrase, false), None);
    }

    #[test]
    fn looping_phrase_comes_round_again() {
        let phrase = *b"Photon";
        let once = phrase_scroll(3 * PHRASE_STEP_MS, &phrase, true);
        let again = phrase_scroll(15 * PHRASE_STEP_MS, &phrase, true);
        assert_eq!(once, again);
        assert!(phrase_scroll(11 * PHRASE_STEP_MS, &phrase, true).is_some());
    }

    #[test]
    fn player_finishes_and_restarts() {
        let date = encode_text(b"010124");
        let phrase = *b"Photon";
        let mut player = EffectPlayer::new();
        assert_eq!(player.frame(0, &date, &phrase), None);

        player.start(Effect::Spiral, 1_000, false);
        assert!(player.frame(1_000, &date, &phrase).is_some());
        assert_eq!(player.frame(5_000, &date, &phrase), None);
        assert!(!player.is_active());

        player.start(Effect::Spiral, 6_000, false);
        assert_eq!(player.frame(6_000, &date, &phrase), spiral(0));

        player.start(Effect::None, 7_000, false);
        assert!(!player.is_active());
    }
}
