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
//! Rotary encoder and button gestures.

use core::convert::Infallible;

/// Quadrature counts per encoder detent.
pub const COUNTS_PER_DETENT: i16 = 4;

/// Button level must be stable this long to count.
pub const DEBOUNCE_MS: u32 = 20;

/// Holding the button this long is an update instead of a select.
pub const LONG_PRESS_MS: u32 = 1000;

/// Raw input signals.
pub trait InputSource {
    /// Quadrature counts since the last call, clockwise positive.
    fn encoder_delta(&mut self) -> i8;

    /// Current button level, not debounced.
    fn button_pressed(&mut self) -> bool;
}

/// Counts for one transition of the encoder lines, each state packed as
/// `a << 1 | b`. A jump where both lines changed is lost and counts zero.
pub fn quadrature_step(previous: u8, current: u8) -> i8 {
    const STEPS: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];
    STEPS[usize::from((previous & 0b11) << 2 | (current & 0b11))]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Whole detents turned, negative counterclockwise.
    Increment(i8),
    /// Short press.
    Select,
    /// Long press.
    Update,
}

/// Turns raw signals into [`Gesture`]s. Needs polling at least every few
/// milliseconds for the debounce to work.
#[derive(Debug, Default)]
pub struct Dispatcher {
    counts: i16,
    raw: bool,
    changed_ms: u32,
    pressed: bool,
    pressed_ms: u32,
    held: bool,
}

impl Dispatcher {
    pub const fn new() -> Self {
        Dispatcher {
            counts: 0,
            raw: false,
            changed_ms: 0,
            pressed: false,
            pressed_ms: 0,
            held: false,
        }
    }

    /// Next gesture, or `WouldBlock` if nothing happened.
    pub fn poll<S: InputSource>(
        &mut self,
        source: &mut S,
        now_ms: u32,
    ) -> nb::Result<Gesture, Infallible> {
        self.counts = self.counts.saturating_add(i16::from(source.encoder_delta()));

        if let Some(gesture) = self.button(source.button_pressed(), now_ms) {
            return Ok(gesture);
        }

        // partial detents stay in the accumulator
        let detents = self.counts / COUNTS_PER_DETENT;
        if detents != 0 {
            self.counts -= detents * COUNTS_PER_DETENT;
            let detents = detents.clamp(i16::from(i8::MIN), i16::from(i8::MAX)) as i8;
            return Ok(Gesture::Increment(detents));
        }
        Err(nb::Error::WouldBlock)
    }

    fn button(&mut self, raw: bool, now_ms: u32) -> Option<Gesture> {
        if raw != self.raw {
            self.raw = raw;
            self.changed_ms = now_ms;
        }
        if self.raw != self.pressed && now_ms.wrapping_sub(self.changed_ms) >= DEBOUNCE_MS {
            self.pressed = self.raw;
            if self.pressed {
                self.pressed_ms = now_ms;
                self.held = false;
            } else if !self.held {
                return Some(Gesture::Select);
            }
        }
        if self.pressed && !self.held && now_ms.wrapping_sub(self.pressed_ms) >= LONG_PRESS_MS {
            self.held = true;
            return Some(Gesture::Update);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeInput;

    /// Poll every millisecond from `from` to `to`, collecting gestures.
    fn run(d: &mut Dispatcher, input: &mut FakeInput, from: u32, to: u32) -> Vec<Gesture> {
        (from..to).filter_map(|ms| d.poll(input, ms).ok()).collect()
    }

    #[test]
    fn quadrature_detent() {
        let clockwise = [0b00, 0b10, 0b11, 0b01, 0b00];
        let counts: i8 = clockwise.windows(2).map(|w| quadrature_step(w[0], w[1])).sum();
        assert_eq!(i16::from(counts), COUNTS_PER_DETENT);
        let back: i8 = clockwise.windows(2).map(|w| quadrature_step(w[1], w[0])).sum();
        assert_eq!(i16::from(back), -COUNTS_PER_DETENT);
        assert_eq!(quadrature_step(0b00, 0b11), 0);
        assert_eq!(quadrature_step(0b01, 0b01), 0);
    }

    #[test]
    fn idle_would_block() {
        let mut d = Dispatcher::new();
        let mut input = FakeInput::default();
        assert_eq!(d.poll(&mut input, 0), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn whole_detents_only() {
        let mut d = Dispatcher::new();
        let mut input = FakeInput::default();
        input.counts = 3;
        assert_eq!(d.poll(&mut input, 0), Err(nb::Error::WouldBlock));
        input.counts = 1;
        assert_eq!(d.poll(&mut input, 1), Ok(Gesture::Increment(1)));
        input.counts = -9;
        assert_eq!(d.poll(&mut input, 2), Ok(Gesture::Increment(-2)));
        // the odd count is kept: one more back makes a detent
        input.counts = -3;
        assert_eq!(d.poll(&mut input, 3), Ok(Gesture::Increment(-1)));
        assert_eq!(d.poll(&mut input, 4), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn jitter_back_and_forth_is_ignored() {
        let mut d = Dispatcher::new();
        let mut input = FakeInput::default();
        for (ms, delta) in [2, -2, 3, -3, 1, -1].into_iter().enumerate() {
            input.counts = delta;
            assert_eq!(d.poll(&mut input, ms as u32), Err(nb::Error::WouldBlock));
        }
    }

    #[test]
    fn short_press_selects_on_release() {
        let mut d = Dispatcher::new();
        let mut input = FakeInput::default();
        input.pressed = true;
        assert!(run(&mut d, &mut input, 0, 300).is_empty());
        input.pressed = false;
        assert_eq!(run(&mut d, &mut input, 300, 400), vec![Gesture::Select]);
    }

    #[test]
    fn bounce_is_filtered() {
        let mut d = Dispatcher::new();
        let mut input = FakeInput::default();
        for ms in 0..10 {
            input.pressed = ms % 2 == 0;
            assert_eq!(d.poll(&mut input, ms), Err(nb::Error::WouldBlock));
        }
        input.pressed = false;
        assert!(run(&mut d, &mut input, 10, 100).is_empty());
    }

    #[test]
    fn long_press_updates_once() {
        let mut d = Dispatcher::new();
        let mut input = FakeInput::default();
        input.pressed = true;
        let gestures = run(&mut d, &mut input, 0, 3000);
        assert_eq!(gestures, vec![Gesture::Update]);
        input.pressed = false;
        assert!(run(&mut d, &mut input, 3000, 3100).is_empty());
    }

    #[test]
    fn press_while_turning() {
        let mut d = Dispatcher::new();
        let mut input = FakeInput::default();
        input.pressed = true;
        run(&mut d, &mut input, 0, 100);
        input.pressed = false;
        input.counts = 4;
        let mut gestures = run(&mut d, &mut input, 100, 200);
        gestures.sort_by_key(|g| matches!(g, Gesture::Select));
        assert_eq!(gestures, vec![Gesture::Increment(1), Gesture::Select]);
    }
}
