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
//! Alarms and the ringing state machine.

use ufmt::{uWrite, uwriteln};

use crate::state::{RuntimeState, State};
use crate::time::{split_seconds, DateTime, Weekday, SECONDS_PER_DAY};

/// Melodies the transducer knows.
pub const MELODY_COUNT: u8 = 4;

/// Ringing limit used when the configured music timer is zero.
pub const DEFAULT_RING_MINUTES: u8 = 5;

/// Set of weekdays, one bit per day, Sunday in bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayMask(u8);

impl DayMask {
    pub const NONE: DayMask = DayMask(0);
    pub const ALL: DayMask = DayMask(0x7F);

    /// Bits above Saturday are dropped.
    pub fn from_bits(bits: u8) -> Self {
        DayMask(bits & Self::ALL.0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    fn bit(day: Weekday) -> u8 {
        1 << (day.number() - 1)
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn set(&mut self, day: Weekday, on: bool) {
        if on {
            self.0 |= Self::bit(day);
        } else {
            self.0 &= !Self::bit(day);
        }
    }

    pub fn toggle(&mut self, day: Weekday) {
        self.0 ^= Self::bit(day);
    }

    pub fn with(mut self, day: Weekday) -> Self {
        self.set(day, true);
        self
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn sunday(self) -> bool {
        self.contains(Weekday::Sunday)
    }

    pub fn monday(self) -> bool {
        self.contains(Weekday::Monday)
    }

    pub fn tuesday(self) -> bool {
        self.contains(Weekday::Tuesday)
    }

    pub fn wednesday(self) -> bool {
        self.contains(Weekday::Wednesday)
    }

    pub fn thursday(self) -> bool {
        self.contains(Weekday::Thursday)
    }

    pub fn friday(self) -> bool {
        self.contains(Weekday::Friday)
    }

    pub fn saturday(self) -> bool {
        self.contains(Weekday::Saturday)
    }
}

/// One configured alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Alarm {
    pub state: State,
    pub music: u8,
    pub days: DayMask,
    time: u32,
}

impl Alarm {
    pub fn new(state: State, music: u8, days: DayMask, time: u32) -> Self {
        Alarm {
            state,
            music: music % MELODY_COUNT,
            days,
            time: time % SECONDS_PER_DAY,
        }
    }

    /// Trigger time in seconds since midnight, always below 86400.
    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn set_time(&mut self, seconds: u32) {
        self.time = seconds % SECONDS_PER_DAY;
    }

    pub fn hour_minute(&self) -> (u8, u8) {
        let (hour, minute, _) = split_seconds(self.time);
        (hour, minute)
    }

    pub fn matches(&self, now: &DateTime) -> bool {
        self.state.is_enabled()
            && self.days.contains(now.weekday())
            && self.time == now.seconds_of_day()
    }
}

/// True when the alarm indicator should be lit.
pub fn any_enabled(alarms: &[Alarm]) -> bool {
    alarms.iter().any(|alarm| alarm.state.is_enabled())
}

/// Melody playback on the transducer.
pub trait Audio {
    fn play_melody(&mut self, index: u8);

    fn stop(&mut self);

    fn is_playing(&self) -> bool;

    /// Short feedback tick for user input.
    fn click(&mut self) {}
}

/// What started the ringing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Index into the configured alarms.
    Alarm(usize),
    Countdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlarmState {
    #[default]
    Idle,
    Ringing {
        trigger: Trigger,
        melody: u8,
        since_ms: u32,
    },
}

#[derive(Debug, Default)]
pub struct Scheduler {
    state: AlarmState,
    // time of the last match, so a second that is evaluated many times
    // only rings once
    last_match: Option<DateTime>,
}

impl Scheduler {
    pub const fn new() -> Self {
        Scheduler {
            state: AlarmState::Idle,
            last_match: None,
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn is_ringing(&self) -> bool {
        matches!(self.state, AlarmState::Ringing { .. })
    }

    pub fn trigger(&self) -> Option<Trigger> {
        match self.state {
            AlarmState::Ringing { trigger, .. } => Some(trigger),
            AlarmState::Idle => None,
        }
    }

    /// Check `alarms` against `now` and start ringing on a match. When more
    /// than one alarm matches the first one in `alarms` wins. Returns the
    /// index of the alarm that started ringing.
    pub fn evaluate<A: Audio, L: uWrite>(
        &mut self,
        alarms: &[Alarm],
        now: &DateTime,
        now_ms: u32,
        runtime: &mut RuntimeState,
        audio: &mut A,
        log: &mut L,
    ) -> Option<usize> {
        if self.last_match == Some(*now) {
            return None;
        }
        let (index, alarm) = alarms.iter().enumerate().find(|(_, a)| a.matches(now))?;
        self.last_match = Some(*now);
        uwriteln!(log, "alarm {} ringing", index + 1).ok();
        self.ring(Trigger::Alarm(index), alarm.music, now_ms, runtime, audio);
        Some(index)
    }

    /// Start ringing right away, regardless of the time.
    pub fn ring<A: Audio>(
        &mut self,
        trigger: Trigger,
        melody: u8,
        now_ms: u32,
        runtime: &mut RuntimeState,
        audio: &mut A,
    ) {
        audio.stop();
        audio.play_melody(melody);
        runtime.alarm = State::Enable;
        self.state = AlarmState::Ringing {
            trigger,
            melody,
            since_ms: now_ms,
        };
    }

    /// Keep the melody going and give up after the timeout. `timeout_minutes`
    /// of zero means [`DEFAULT_RING_MINUTES`].
    pub fn service<A: Audio, L: uWrite>(
        &mut self,
        timeout_minutes: u8,
        now_ms: u32,
        runtime: &mut RuntimeState,
        audio: &mut A,
        log: &mut L,
    ) {
        let AlarmState::Ringing {
            melody, since_ms, ..
        } = self.state
        else {
            return;
        };
        let minutes = match timeout_minutes {
            0 => DEFAULT_RING_MINUTES,
            m => m,
        };
        if now_ms.wrapping_sub(since_ms) >= u32::from(minutes) * 60_000 {
            uwriteln!(log, "alarm timed out").ok();
            self.silence(runtime, audio);
        } else if !audio.is_playing() {
            audio.play_melody(melody);
        }
    }

    /// User acknowledgment. Returns whether an alarm was ringing.
    pub fn acknowledge<A: Audio, L: uWrite>(
        &mut self,
        runtime: &mut RuntimeState,
        audio: &mut A,
        log: &mut L,
    ) -> bool {
        if !self.is_ringing() {
            return false;
        }
        uwriteln!(log, "alarm acknowledged").ok();
        self.silence(runtime, audio);
        true
    }

    fn silence<A: Audio>(&mut self, runtime: &mut RuntimeState, audio: &mut A) {
        audio.stop();
        runtime.alarm = State::Disable;
        self.state = AlarmState::Idle;
    }
}
