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
//! Automatic brightness, blanking and battery monitoring.

use crate::display::LEVELS;

/// Battery operating range in millivolts. Readings outside it mean the
/// clock runs from external power.
pub const BATTERY_MIN: u32 = 2400;
pub const BATTERY_MAX: u32 = 3100;

/// Below this the cell is nearly flat.
pub const BATTERY_LOW: u32 = 2600;

// Calibrated light reading needed for each level above 1.
const THRESHOLDS: [u16; LEVELS as usize - 1] = [40, 80, 140, 220, 320, 450, 600];

// How far the reading must fall below a threshold before dimming again.
const HYSTERESIS: u16 = 16;

/// Analog inputs.
pub trait Sensors {
    /// Photodiode, 10 bit ADC counts. Higher is brighter.
    fn light(&mut self) -> u16;

    fn battery_millivolts(&mut self) -> u32;
}

/// Brightness setting: a fixed level or derived from the light sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Brightness {
    Level(u8),
    #[default]
    Auto,
}

impl Brightness {
    /// Concrete level, using `auto_level` when set to [`Brightness::Auto`].
    pub fn resolve(self, auto_level: u8) -> u8 {
        match self {
            Brightness::Level(level) => level.min(LEVELS),
            Brightness::Auto => auto_level,
        }
    }
}

/// Apply the user calibration, `gain` in tenths.
pub fn calibrate(raw: u16, gain: u8, offset: u8) -> u16 {
    let value = u32::from(raw) * u32::from(gain) / 10 + u32::from(offset);
    value.min(u32::from(u16::MAX)) as u16
}

/// Level for a calibrated reading, `1..=LEVELS`. Never decreases as the
/// reading increases.
pub fn level_for(calibrated: u16) -> u8 {
    1 + THRESHOLDS.iter().filter(|&&t| calibrated >= t).count() as u8
}

/// Whether `now` falls in the blanking window `[begin, end)`, all in seconds
/// since midnight. The window may wrap past midnight; `begin == end` never
/// blanks.
pub fn is_blanked(begin: u32, end: u32, now: u32) -> bool {
    if begin <= end {
        begin <= now && now < end
    } else {
        now >= begin || now < end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerSource {
    External,
    BatteryOk,
    BatteryLow,
}

pub fn classify_battery(millivolts: u32) -> PowerSource {
    match millivolts {
        BATTERY_MIN..=BATTERY_MAX if millivolts < BATTERY_LOW => PowerSource::BatteryLow,
        BATTERY_MIN..=BATTERY_MAX => PowerSource::BatteryOk,
        _ => PowerSource::External,
    }
}

/// Exponential moving average, new samples weigh 1/4.
#[derive(Debug, Default)]
struct Average(Option<u32>);

impl Average {
    fn update(&mut self, sample: u32) -> u32 {
        let value = match self.0 {
            None => sample,
            Some(value) => (value * 3 + sample) / 4,
        };
        self.0 = Some(value);
        value
    }
}

/// Light sensor to brightness level, smoothed so sensor noise does not make
/// the tubes flicker between two levels.
#[derive(Debug)]
pub struct AutoBrightness {
    light: Average,
    level: u8,
}

impl AutoBrightness {
    pub const fn new() -> Self {
        AutoBrightness {
            light: Average(None),
            level: LEVELS,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn update(&mut self, raw: u16, gain: u8, offset: u8) -> u8 {
        let smoothed = self.light.update(u32::from(raw)) as u16;
        let calibrated = calibrate(smoothed, gain, offset);
        let target = level_for(calibrated);
        let sticky = level_for(calibrated.saturating_add(HYSTERESIS));
        if target > self.level {
            self.level = target;
        } else if sticky < self.level {
            self.level = sticky;
        }
        self.level
    }
}

impl Default for AutoBrightness {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub struct BatteryMonitor {
    millivolts: Average,
}

impl BatteryMonitor {
    pub const fn new() -> Self {
        BatteryMonitor {
            millivolts: Average(None),
        }
    }

    pub fn update(&mut self, millivolts: u32) -> PowerSource {
        classify_battery(self.millivolts.update(millivolts))
    }
}
