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
//! Alarm melodies for the piezo transducer.
//!
//! The transducer is driven straight from a pin, so tones are made by
//! toggling it from a fixed rate timer interrupt. [`Tune::tick`] runs once
//! per interrupt and says which level the pin should have.

use crate::alarm::MELODY_COUNT;

/// Rate [`Tune::tick`] must be called at.
pub const TICK_HZ: u32 = 8000;

/// A tone, or a rest when `hz` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub hz: u16,
    pub ms: u16,
}

const fn n(hz: u16, ms: u16) -> Note {
    Note { hz, ms }
}

const REST: u16 = 0;
const C5: u16 = 523;
const D5: u16 = 587;
const E5: u16 = 659;
const F5: u16 = 698;
const G5: u16 = 784;
const C6: u16 = 1047;
const BEEP: u16 = 2000;

static BEEPS: [Note; 8] = [
    n(BEEP, 100),
    n(REST, 100),
    n(BEEP, 100),
    n(REST, 100),
    n(BEEP, 100),
    n(REST, 100),
    n(BEEP, 100),
    n(REST, 600),
];

static RISING: [Note; 5] = [
    n(C5, 150),
    n(E5, 150),
    n(G5, 150),
    n(C6, 300),
    n(REST, 750),
];

static CHIMES: [Note; 9] = [
    n(E5, 400),
    n(C5, 400),
    n(D5, 400),
    n(G5, 800),
    n(REST, 200),
    n(G5, 400),
    n(D5, 400),
    n(E5, 400),
    n(C5, 1200),
];

static JOY: [Note; 16] = [
    n(E5, 250),
    n(E5, 250),
    n(F5, 250),
    n(G5, 250),
    n(G5, 250),
    n(F5, 250),
    n(E5, 250),
    n(D5, 250),
    n(C5, 250),
    n(C5, 250),
    n(D5, 250),
    n(E5, 250),
    n(E5, 375),
    n(D5, 125),
    n(D5, 500),
    n(REST, 500),
];

/// Melodies by index, as stored in an alarm.
pub static MELODIES: [&[Note]; MELODY_COUNT as usize] = [&BEEPS, &RISING, &CHIMES, &JOY];

/// Input feedback tick.
pub static CLICK: [Note; 1] = [n(4000, 4)];

/// Playback position in a melody.
#[derive(Debug, Clone)]
pub struct Tune {
    notes: &'static [Note],
    index: usize,
    elapsed: u32,
    phase: u32,
    level: bool,
}

impl Tune {
    pub fn new(notes: &'static [Note]) -> Self {
        Tune {
            notes,
            index: 0,
            elapsed: 0,
            phase: 0,
            level: false,
        }
    }

    /// `MELODIES[index]`, or the first melody for an unknown index.
    pub fn melody(index: u8) -> Self {
        Tune::new(MELODIES.get(usize::from(index)).copied().unwrap_or(MELODIES[0]))
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.notes.len()
    }

    /// Advance by one tick, returning the transducer level, or `None` once
    /// the last note has played.
    pub fn tick(&mut self) -> Option<bool> {
        let note = *self.notes.get(self.index)?;
        if note.hz == REST {
            self.level = false;
        } else {
            // two edges per period
            self.phase += 2 * u32::from(note.hz);
            if self.phase >= TICK_HZ {
                self.phase -= TICK_HZ;
                self.level = !self.level;
            }
        }
        self.elapsed += 1;
        if self.elapsed >= u32::from(note.ms) * TICK_HZ / 1000 {
            self.index += 1;
            self.elapsed = 0;
            self.phase = 0;
        }
        Some(self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(tune: &mut Tune, ticks: u32) -> u32 {
        let mut last = false;
        let mut count = 0;
        for _ in 0..ticks {
            let level = tune.tick().unwrap();
            if level != last {
                count += 1;
                last = level;
            }
        }
        count
    }

    #[test]
    fn beep_frequency() {
        // 100 ms of 2 kHz is 200 periods
        let mut tune = Tune::new(&BEEPS);
        assert_eq!(edges(&mut tune, TICK_HZ / 10), 400);
        // then silence
        assert_eq!(edges(&mut tune, TICK_HZ / 10), 0);
    }

    #[test]
    fn finishes_after_all_notes() {
        let mut tune = Tune::new(&CLICK);
        let ticks = 4 * TICK_HZ / 1000;
        for _ in 0..ticks {
            assert!(tune.tick().is_some());
        }
        assert!(tune.is_finished());
        assert_eq!(tune.tick(), None);
    }

    #[test]
    fn melodies_fit_the_tick_rate() {
        for melody in MELODIES {
            assert!(!melody.is_empty());
            for note in melody {
                assert!(u32::from(note.hz) * 2 <= TICK_HZ);
            }
        }
        assert!(Tune::melody(MELODY_COUNT).notes == MELODIES[0]);
    }
}
