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
//! Countdown timer: runs down on the tubes, then flashes zeros until the
//! ringing is acknowledged.

use ufmt::uwrite;

use crate::glyph::{Glyphs, BLANK, DECIMAL_POINT};
use crate::text::{ScreenText, ToGlyphs, TwoDigits};
use crate::time::split_seconds;

/// Longest countdown the tubes can show.
pub const COUNTDOWN_MAX: u32 = 24 * 3600 - 1;

/// Half period of the expiry flash.
pub const FLASH_MS: u32 = 500;

/// Melody played on expiry.
pub const COUNTDOWN_MELODY: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Idle,
    Running { start_ms: u32, duration_ms: u32 },
    Expired { since_ms: u32 },
}

#[derive(Debug, Default)]
pub struct Countdown {
    phase: Phase,
}

/// `seconds` as `HHMMSS`.
pub fn format_countdown(seconds: u32) -> ScreenText {
    let (hour, minute, second) = split_seconds(seconds.min(COUNTDOWN_MAX));
    let mut text = ScreenText::new();
    uwrite!(
        &mut text,
        "{}{}{}",
        TwoDigits(hour),
        TwoDigits(minute),
        TwoDigits(second)
    )
    .ok();
    text
}

impl Countdown {
    pub const fn new() -> Self {
        Countdown { phase: Phase::Idle }
    }

    pub fn start(&mut self, seconds: u32, now_ms: u32) {
        self.phase = Phase::Running {
            start_ms: now_ms,
            duration_ms: seconds.min(COUNTDOWN_MAX) * 1000,
        };
    }

    /// Back to idle, from running or expired.
    pub fn clear(&mut self) {
        self.phase = Phase::Idle;
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.phase, Phase::Expired { .. })
    }

    /// Whole seconds left, rounded up. Zero unless running.
    pub fn remaining(&self, now_ms: u32) -> u32 {
        match self.phase {
            Phase::Running {
                start_ms,
                duration_ms,
            } => duration_ms
                .saturating_sub(now_ms.wrapping_sub(start_ms))
                .div_ceil(1000),
            _ => 0,
        }
    }

    /// True exactly once, on the poll where the time runs out.
    pub fn expire(&mut self, now_ms: u32) -> bool {
        if self.is_running() && self.remaining(now_ms) == 0 {
            self.phase = Phase::Expired { since_ms: now_ms };
            return true;
        }
        false
    }

    /// Tube contents, `None` when idle.
    pub fn frame(&self, now_ms: u32) -> Option<Glyphs> {
        match self.phase {
            Phase::Idle => None,
            Phase::Running { .. } => Some(format_countdown(self.remaining(now_ms)).glyphs()),
            Phase::Expired { since_ms } => {
                if (now_ms.wrapping_sub(since_ms) / FLASH_MS) % 2 == 0 {
                    let mut glyphs = format_countdown(0).glyphs();
                    for g in &mut glyphs {
                        *g |= DECIMAL_POINT;
                    }
                    Some(glyphs)
                } else {
                    Some(BLANK)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::encode_text;

    #[test]
    fn counts_down_by_whole_seconds() {
        let mut countdown = Countdown::new();
        assert_eq!(countdown.frame(0), None);
        countdown.start(90, 1_000);
        assert_eq!(countdown.remaining(1_000), 90);
        assert_eq!(countdown.remaining(1_001), 90);
        assert_eq!(countdown.remaining(2_000), 89);
        assert_eq!(countdown.frame(31_000), Some(encode_text(b"000100")));
        assert!(!countdown.expire(90_999));
        assert_eq!(countdown.remaining(90_999), 1);
    }

    #[test]
    fn expires_once_then_flashes() {
        let mut countdown = Countdown::new();
        countdown.start(2, 0);
        assert!(countdown.expire(2_000));
        assert!(!countdown.expire(2_100));
        assert!(countdown.is_expired());
        assert_eq!(countdown.remaining(2_100), 0);

        let lit = countdown.frame(2_000).unwrap();
        assert!(lit.iter().all(|g| g & DECIMAL_POINT != 0));
        assert_eq!(countdown.frame(2_000 + FLASH_MS), Some(BLANK));
        assert_eq!(countdown.frame(2_000 + 2 * FLASH_MS), Some(lit));

        countdown.clear();
        assert_eq!(countdown.frame(5_000), None);
    }

    #[test]
    fn survives_millisecond_wrap() {
        let mut countdown = Countdown::new();
        countdown.start(10, u32::MAX - 499);
        assert_eq!(countdown.remaining(500), 9);
        assert!(countdown.expire(9_500));
    }

    #[test]
    fn long_durations_are_capped() {
        let mut countdown = Countdown::new();
        countdown.start(u32::MAX, 0);
        assert_eq!(countdown.remaining(0), COUNTDOWN_MAX);
        assert_eq!(format_countdown(COUNTDOWN_MAX).as_bytes(), b"235959");
    }
}
