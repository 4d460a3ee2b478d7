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
//! EEPROM settings.
//!
//! The clock configuration is stored to the onboard EEPROM when an edit
//! session ends, and read back at startup. The record starts with a key
//! byte; anything else in that byte means the EEPROM was never written by
//! this firmware (or got corrupted) and the defaults are used instead.

use crate::adaptive::Brightness;
use crate::alarm::{Alarm, DayMask, MELODY_COUNT};
use crate::display::LEVELS;
use crate::effect::Effect;
use crate::state::State;
use crate::time::{DateFormat, TemperatureUnit, TimeFormat, SECONDS_PER_DAY};
use crate::{ALARM_COUNT, DISPLAY_COUNT};

/// First byte of a valid record.
pub const CONFIG_KEY: u8 = b'$';

/// EEPROM offset of the record.
pub const CONFIG_ADDRESS: u16 = 0;

const ALARM_LEN: usize = 7;
const ALARMS_AT: usize = 19;
const PHRASE_AT: usize = ALARMS_AT + ALARM_COUNT * ALARM_LEN;

/// Size of the stored record in bytes.
pub const CONFIG_LEN: usize = PHRASE_AT + DISPLAY_COUNT + 1;

// Stored brightness value meaning automatic.
const BRIGHTNESS_AUTO: u8 = LEVELS + 1;

// "Factory" default configuration can be configured here:
const GAIN_DEFAULT: u8 = 10;
const OFFSET_DEFAULT: u8 = 10;
const PHRASE_DEFAULT: [u8; DISPLAY_COUNT] = *b"Photon";

/// Byte access to the non-volatile memory.
pub trait Eeprom {
    fn read_byte(&self, offset: u16) -> u8;

    fn write_byte(&mut self, offset: u16, data: u8);
}

/// Saved clock configuration, restored at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Click on every input gesture.
    pub noise: State,
    /// Shut the tubes down when the backup cell runs low.
    pub battery: State,
    pub brightness: Brightness,
    /// Light sensor gain, in tenths.
    pub gain: u8,
    /// Light sensor offset, in calibrated counts.
    pub offset: u8,
    pub date_format: DateFormat,
    pub time_format: TimeFormat,
    pub temperature_unit: TemperatureUnit,
    /// Effect played at the top of every minute.
    pub effect: Effect,
    /// Blanking window, seconds since midnight. Equal values disable it.
    pub blank_begin: u32,
    pub blank_end: u32,
    /// Minutes an alarm rings before giving up, 0 for the built-in limit.
    pub music_timer: u8,
    pub alarm: [Alarm; ALARM_COUNT],
    /// Printable ASCII, scrolled by the phrase effect and while ringing.
    pub phrase: [u8; DISPLAY_COUNT],
}

impl Default for Config {
    fn default() -> Self {
        Config {
            noise: State::Enable,
            battery: State::Enable,
            brightness: Brightness::Auto,
            gain: GAIN_DEFAULT,
            offset: OFFSET_DEFAULT,
            date_format: DateFormat::DDMMYY,
            time_format: TimeFormat::H24,
            temperature_unit: TemperatureUnit::F,
            effect: Effect::None,
            blank_begin: 0,
            blank_end: 0,
            music_timer: 0,
            alarm: [Alarm::default(); ALARM_COUNT],
            phrase: PHRASE_DEFAULT,
        }
    }
}

fn state(v: u8, default: State) -> State {
    match v {
        0 => State::Disable,
        1 => State::Enable,
        _ => default,
    }
}

fn state_byte(s: State) -> u8 {
    match s {
        State::Disable => 0,
        State::Enable => 1,
    }
}

fn read_u32(bytes: &[u8; CONFIG_LEN], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn seconds(v: u32) -> u32 {
    v % SECONDS_PER_DAY
}

impl Config {
    /// Decode a stored record. `None` when the key byte is wrong.
    pub fn from_bytes(bytes: &[u8; CONFIG_LEN]) -> Option<Self> {
        if bytes[0] != CONFIG_KEY {
            return None;
        }
        let default = Config::default();

        let mut alarm = default.alarm;
        for (i, slot) in alarm.iter_mut().enumerate() {
            let at = ALARMS_AT + i * ALARM_LEN;
            *slot = Alarm::new(
                state(bytes[at], State::Disable),
                match bytes[at + 1] {
                    v if v < MELODY_COUNT => v,
                    _ => 0,
                },
                DayMask::from_bits(bytes[at + 2]),
                read_u32(bytes, at + 3),
            );
        }

        let mut phrase = default.phrase;
        let stored = &bytes[PHRASE_AT..PHRASE_AT + DISPLAY_COUNT];
        if stored.iter().all(|c| (b' '..=b'~').contains(c)) {
            phrase.copy_from_slice(stored);
        }

        Some(Config {
            noise: state(bytes[1], default.noise),
            battery: state(bytes[2], default.battery),
            brightness: match bytes[3] {
                v @ 0..=LEVELS => Brightness::Level(v),
                _ => Brightness::Auto,
            },
            gain: bytes[4],
            offset: bytes[5],
            date_format: match bytes[6] {
                0 => DateFormat::YYMMDD,
                1 => DateFormat::MMDDYY,
                2 => DateFormat::DDMMYY,
                _ => default.date_format,
            },
            time_format: match bytes[7] {
                0 => TimeFormat::H24,
                1 => TimeFormat::H12,
                _ => default.time_format,
            },
            temperature_unit: match bytes[8] {
                0 => TemperatureUnit::C,
                1 => TemperatureUnit::F,
                _ => default.temperature_unit,
            },
            effect: Effect::from_code(bytes[9]).unwrap_or(default.effect),
            blank_begin: seconds(read_u32(bytes, 10)),
            blank_end: seconds(read_u32(bytes, 14)),
            music_timer: bytes[18],
            alarm,
            phrase,
        })
    }

    pub fn to_bytes(&self) -> [u8; CONFIG_LEN] {
        let mut bytes = [0u8; CONFIG_LEN];
        bytes[0] = CONFIG_KEY;
        bytes[1] = state_byte(self.noise);
        bytes[2] = state_byte(self.battery);
        bytes[3] = match self.brightness {
            Brightness::Level(v) => v.min(LEVELS),
            Brightness::Auto => BRIGHTNESS_AUTO,
        };
        bytes[4] = self.gain;
        bytes[5] = self.offset;
        bytes[6] = self.date_format as u8;
        bytes[7] = self.time_format as u8;
        bytes[8] = self.temperature_unit as u8;
        bytes[9] = self.effect.code();
        bytes[10..14].copy_from_slice(&self.blank_begin.to_le_bytes());
        bytes[14..18].copy_from_slice(&self.blank_end.to_le_bytes());
        bytes[18] = self.music_timer;
        for (i, alarm) in self.alarm.iter().enumerate() {
            let at = ALARMS_AT + i * ALARM_LEN;
            bytes[at] = state_byte(alarm.state);
            bytes[at + 1] = alarm.music;
            bytes[at + 2] = alarm.days.bits();
            bytes[at + 3..at + 7].copy_from_slice(&alarm.time().to_le_bytes());
        }
        bytes[PHRASE_AT..PHRASE_AT + DISPLAY_COUNT].copy_from_slice(&self.phrase);
        // NUL terminated, as the record has always been laid out
        bytes[CONFIG_LEN - 1] = 0;
        bytes
    }

    /// Read the configuration from `eeprom`, or the defaults if nothing
    /// valid is stored. The flag tells which one it was.
    pub fn load<E: Eeprom>(eeprom: &E) -> (Self, bool) {
        let mut bytes = [0u8; CONFIG_LEN];
        for (offset, b) in (CONFIG_ADDRESS..).zip(bytes.iter_mut()) {
            *b = eeprom.read_byte(offset);
        }
        match Config::from_bytes(&bytes) {
            Some(config) => (config, true),
            None => (Config::default(), false),
        }
    }

    /// Save the configuration to `eeprom`, returning how many bytes changed.
    ///
    /// EEPROM has a limited number of write cycles in its life, so only
    /// bytes that differ are written. Call this from the main loop only: the
    /// display interrupt keeps running meanwhile and never reads the record.
    pub fn save<E: Eeprom>(&self, eeprom: &mut E) -> usize {
        let mut written = 0;
        for (offset, &b) in (CONFIG_ADDRESS..).zip(self.to_bytes().iter()) {
            if eeprom.read_byte(offset) != b {
                eeprom.write_byte(offset, b);
                written += 1;
            }
        }
        written
    }
}
