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
//! Tube multiplexing.
//!
//! The tubes share one segment bus, so only one tube is lit at a time. A
//! timer interrupt calls [`Multiplexer::tick`] at a fixed rate; every tick
//! moves one position through `tube x brightness sub-step`. The first sub-step
//! of a tube shifts its segments out, then the tube stays energized for
//! `level` sub-steps and dark for the rest, which dims it by duty cycle.
//!
//! The main loop never touches the driver. It builds a whole [`Frame`] and
//! hands it over through [`DisplayBuffer`], and the interrupt picks up the
//! latest frame on its next tick.

use core::cell::Cell;
use core::convert::Infallible;

use critical_section::Mutex;
use embedded_hal::digital::{OutputPin, PinState};

use crate::glyph::{Glyphs, BLANK};
use crate::state::State;
use crate::DISPLAY_COUNT;

/// Brightness sub-steps per tube, which is also the brightest level.
pub const LEVELS: u8 = 8;

/// Positions in one full scan of the display.
pub const POSITIONS: u8 = DISPLAY_COUNT as u8 * LEVELS;

// Timer2 compare values, with the timer clocked at 16MHz / 128.
//
// 16MHz / (60Hz * 6 tubes * 8 levels * 128 prescale) = 43
pub const INTERRUPT_FAST: u8 = 43;
pub const INTERRUPT_SLOW: u8 = 255;

/// Everything the interrupt needs to drive the tubes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub glyphs: Glyphs,
    pub level: u8,
    pub display: State,
}

impl Frame {
    pub const fn blank() -> Self {
        Frame {
            glyphs: BLANK,
            level: 0,
            display: State::Disable,
        }
    }

    /// Number of energized sub-steps per tube.
    pub fn duty(&self) -> u8 {
        match self.display {
            State::Enable => self.level.min(LEVELS),
            State::Disable => 0,
        }
    }

    /// Timer compare value to scan this frame with. A dark display does not
    /// need a flicker free refresh.
    pub fn interrupt_speed(&self) -> u8 {
        if self.duty() == 0 {
            INTERRUPT_SLOW
        } else {
            INTERRUPT_FAST
        }
    }
}

impl Default for Frame {
    fn default() -> Self {
        Frame::blank()
    }
}

/// Frame hand-off between the main loop and the multiplex interrupt.
pub struct DisplayBuffer(Mutex<Cell<Frame>>);

impl DisplayBuffer {
    pub const fn new() -> Self {
        DisplayBuffer(Mutex::new(Cell::new(Frame::blank())))
    }

    /// Replace the frame in one critical section, so the interrupt never sees
    /// half of an update.
    pub fn publish(&self, frame: Frame) {
        critical_section::with(|cs| self.0.borrow(cs).set(frame));
    }

    pub fn snapshot(&self) -> Frame {
        critical_section::with(|cs| self.0.borrow(cs).get())
    }
}

impl Default for DisplayBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Hardware that actually lights the tubes.
pub trait TubeDriver {
    /// Route `segments` to `tube`. The tube stays dark until energized.
    fn show(&mut self, tube: usize, segments: u8);

    /// Switch the currently shown tube on or off.
    fn energize(&mut self, on: bool);
}

/// Scan state, owned by the interrupt.
#[derive(Debug, Default)]
pub struct Multiplexer {
    position: u8,
}

impl Multiplexer {
    pub const fn new() -> Self {
        Multiplexer { position: 0 }
    }

    /// Tube currently being scanned.
    pub fn tube(&self) -> usize {
        usize::from(self.position / LEVELS)
    }

    /// Advance one position. Cheap, never blocks, never allocates.
    pub fn tick<D: TubeDriver>(&mut self, frame: &Frame, driver: &mut D) {
        let tube = self.tube();
        let step = self.position % LEVELS;
        if step == 0 {
            driver.show(tube, frame.glyphs[tube]);
        }
        driver.energize(step < frame.duty());
        self.position = (self.position + 1) % POSITIONS;
    }
}

/// Serial-in, parallel-out VFD driver: 8 segment lines followed by one grid
/// line per tube, a latch and an active high blanking input.
pub struct ShiftRegisterDriver<CLK, DATA, LATCH, BLANK> {
    clock: CLK,
    data: DATA,
    latch: LATCH,
    blank: BLANK,
}

fn set<P: OutputPin<Error = Infallible>>(pin: &mut P, high: bool) {
    pin.set_state(PinState::from(high)).unwrap_or_else(|e| match e {});
}

impl<CLK, DATA, LATCH, BLANK> ShiftRegisterDriver<CLK, DATA, LATCH, BLANK>
where
    CLK: OutputPin<Error = Infallible>,
    DATA: OutputPin<Error = Infallible>,
    LATCH: OutputPin<Error = Infallible>,
    BLANK: OutputPin<Error = Infallible>,
{
    pub fn new(clock: CLK, data: DATA, latch: LATCH, blank: BLANK) -> Self {
        let mut driver = ShiftRegisterDriver {
            clock,
            data,
            latch,
            blank,
        };
        set(&mut driver.clock, false);
        set(&mut driver.latch, false);
        set(&mut driver.blank, true);
        driver
    }

    fn shift(&mut self, bit: bool) {
        set(&mut self.data, bit);
        set(&mut self.clock, true);
        set(&mut self.clock, false);
    }
}

impl<CLK, DATA, LATCH, BLANK> TubeDriver for ShiftRegisterDriver<CLK, DATA, LATCH, BLANK>
where
    CLK: OutputPin<Error = Infallible>,
    DATA: OutputPin<Error = Infallible>,
    LATCH: OutputPin<Error = Infallible>,
    BLANK: OutputPin<Error = Infallible>,
{
    fn show(&mut self, tube: usize, segments: u8) {
        // Blank while shifting so the previous tube does not ghost.
        set(&mut self.blank, true);
        for bit in (0..8).rev() {
            self.shift(segments & (1 << bit) != 0);
        }
        for grid in 0..DISPLAY_COUNT {
            self.shift(grid == tube);
        }
        set(&mut self.latch, true);
        set(&mut self.latch, false);
    }

    fn energize(&mut self, on: bool) {
        set(&mut self.blank, !on);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::encode_text;
    use crate::test_support::{FakePin, PinLog};

    #[derive(Default)]
    struct Recorder {
        shown: Vec<(usize, u8)>,
        energized: Vec<bool>,
    }

    impl TubeDriver for Recorder {
        fn show(&mut self, tube: usize, segments: u8) {
            self.shown.push((tube, segments));
        }

        fn energize(&mut self, on: bool) {
            self.energized.push(on);
        }
    }

    fn scan(frame: &Frame, cycles: usize) -> Recorder {
        let mut mux = Multiplexer::new();
        let mut recorder = Recorder::default();
        for _ in 0..cycles * usize::from(POSITIONS) {
            mux.tick(frame, &mut recorder);
        }
        recorder
    }

    fn frame(level: u8) -> Frame {
        Frame {
            glyphs: encode_text(b"123456"),
            level,
            display: State::Enable,
        }
    }

    #[test]
    fn level_zero_never_energizes() {
        let recorder = scan(&frame(0), 3);
        assert!(recorder.energized.iter().all(|on| !on));
        // the scan keeps running even though nothing is lit
        assert_eq!(recorder.shown.len(), 3 * DISPLAY_COUNT);
    }

    #[test]
    fn max_level_energizes_every_sub_step() {
        let recorder = scan(&frame(LEVELS), 2);
        assert_eq!(recorder.energized.len(), 2 * usize::from(POSITIONS));
        assert!(recorder.energized.iter().all(|on| *on));
    }

    #[test]
    fn duty_cycle_follows_level() {
        let recorder = scan(&frame(3), 1);
        for slice in recorder.energized.chunks(usize::from(LEVELS)) {
            assert_eq!(slice, [true, true, true, false, false, false, false, false]);
        }
    }

    #[test]
    fn disabled_display_is_dark_and_slow() {
        let mut dark = frame(LEVELS);
        dark.display = State::Disable;
        assert!(scan(&dark, 1).energized.iter().all(|on| !on));
        assert_eq!(dark.interrupt_speed(), INTERRUPT_SLOW);
        assert_eq!(frame(1).interrupt_speed(), INTERRUPT_FAST);
    }

    #[test]
    fn each_tube_gets_its_own_glyph() {
        let f = frame(4);
        let recorder = scan(&f, 1);
        let expected: Vec<_> = f.glyphs.iter().copied().enumerate().collect();
        assert_eq!(recorder.shown, expected);
    }

    #[test]
    fn buffer_hands_over_whole_frames() {
        let buffer = DisplayBuffer::new();
        assert_eq!(buffer.snapshot(), Frame::blank());
        buffer.publish(frame(5));
        assert_eq!(buffer.snapshot(), frame(5));
    }

    #[test]
    fn shift_register_sequence() {
        let log = PinLog::default();
        let mut driver = ShiftRegisterDriver::new(
            FakePin::new('c', &log),
            FakePin::new('d', &log),
            FakePin::new('l', &log),
            FakePin::new('b', &log),
        );
        log.clear();
        driver.show(2, 0b1010_0101);

        // sample the data line on every rising clock edge
        let mut data = false;
        let mut bits = Vec::new();
        for (pin, high) in log.entries() {
            match pin {
                'd' => data = high,
                'c' if high => bits.push(data),
                _ => {}
            }
        }
        let expected = [
            true, false, true, false, false, true, false, true, // segments
            false, false, true, false, false, false, // grids
        ];
        assert_eq!(bits, expected);
        assert_eq!(log.last('b'), Some(true));
        assert_eq!(log.last('l'), Some(false));

        driver.energize(true);
        assert_eq!(log.last('b'), Some(false));
    }
}
