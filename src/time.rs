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
//! Wall clock time, read from the RTC, and its display formats.

use ufmt::{uWrite, uwrite, uwriteln};

use crate::text::{push_bytes, ScreenText, SpacePadded, TwoDigits};

pub const SECONDS_PER_DAY: u32 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFormat {
    #[default]
    H24,
    H12,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormat {
    YYMMDD,
    MMDDYY,
    #[default]
    DDMMYY,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    C,
    #[default]
    F,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    AM,
    PM,
}

/// Which half of the RTC reading to format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcSelect {
    Time,
    Date,
}

/// Day of the week, numbered the way the RTC counts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weekday {
    Sunday = 1,
    Monday = 2,
    Tuesday = 3,
    Wednesday = 4,
    Thursday = 5,
    Friday = 6,
    Saturday = 7,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn from_number(n: u8) -> Option<Weekday> {
        Weekday::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    /// Two letter label for the tubes.
    pub fn label(self) -> &'static [u8; 2] {
        match self {
            Weekday::Sunday => b"Su",
            Weekday::Monday => b"Mo",
            Weekday::Tuesday => b"Tu",
            Weekday::Wednesday => b"We",
            Weekday::Thursday => b"Th",
            Weekday::Friday => b"Fr",
            Weekday::Saturday => b"Sa",
        }
    }
}

/// One RTC reading. `year` counts from 2000, `weekday` runs 1 (Sunday) to 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    /// Saturday 2000-01-01 00:00:00, shown until the RTC answers.
    pub const EPOCH: DateTime = DateTime {
        year: 0,
        month: 1,
        day: 1,
        weekday: Weekday::Saturday as u8,
        hour: 0,
        minute: 0,
        second: 0,
    };

    pub fn is_valid(&self) -> bool {
        self.hour < 24
            && self.minute < 60
            && self.second < 60
            && Weekday::from_number(self.weekday).is_some()
            && self.year < 100
            && (1..=12).contains(&self.month)
            && (1..=days_in_month(self.month, self.year)).contains(&self.day)
    }

    pub fn seconds_of_day(&self) -> u32 {
        seconds_of_day(self.hour, self.minute, self.second)
    }

    pub fn weekday(&self) -> Weekday {
        Weekday::from_number(self.weekday).unwrap_or(Weekday::Sunday)
    }

    pub fn set_seconds_of_day(&mut self, seconds: u32) {
        let (hour, minute, second) = split_seconds(seconds);
        self.hour = hour;
        self.minute = minute;
        self.second = second;
    }

    /// Move forward by `seconds`, rolling the calendar over as needed.
    pub fn advance(&mut self, seconds: u32) {
        let total = self.seconds_of_day() + seconds % SECONDS_PER_DAY;
        let days = seconds / SECONDS_PER_DAY + total / SECONDS_PER_DAY;
        self.set_seconds_of_day(total % SECONDS_PER_DAY);
        for _ in 0..days {
            self.next_day();
        }
    }

    fn next_day(&mut self) {
        self.weekday = self.weekday % 7 + 1;
        if self.day < days_in_month(self.month, self.year) {
            self.day += 1;
            return;
        }
        self.day = 1;
        if self.month < 12 {
            self.month += 1;
            return;
        }
        self.month = 1;
        self.year = (self.year + 1) % 100;
    }
}

impl Default for DateTime {
    fn default() -> Self {
        DateTime::EPOCH
    }
}

pub fn is_leap_year(year: u8) -> bool {
    // 2000 to 2099, so the century rules never apply
    year % 4 == 0
}

pub fn days_in_month(month: u8, year: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

pub fn seconds_of_day(hour: u8, minute: u8, second: u8) -> u32 {
    u32::from(hour) * 3600 + u32::from(minute) * 60 + u32::from(second)
}

/// Hours, minutes and seconds of a second count, wrapped to one day.
pub fn split_seconds(seconds: u32) -> (u8, u8, u8) {
    let seconds = seconds % SECONDS_PER_DAY;
    (
        (seconds / 3600) as u8,
        (seconds / 60 % 60) as u8,
        (seconds % 60) as u8,
    )
}

/// 24 hour clock to 12 hour clock.
pub fn to_12_hour(hour: u8) -> (u8, Cycle) {
    let cycle = if hour < 12 { Cycle::AM } else { Cycle::PM };
    match hour % 12 {
        0 => (12, cycle),
        h => (h, cycle),
    }
}

/// 12 hour clock back to 24 hour clock.
pub fn to_24_hour(hour: u8, cycle: Cycle) -> u8 {
    let hour = hour % 12;
    match cycle {
        Cycle::AM => hour,
        Cycle::PM => hour + 12,
    }
}

/// Hour as shown on the tubes for the configured format.
pub fn format_hour(hour: u8, format: TimeFormat) -> u8 {
    match format {
        TimeFormat::H24 => hour,
        TimeFormat::H12 => to_12_hour(hour).0,
    }
}

/// Six characters of time (`HHMMSS`) or date (ordered per `date_format`).
pub fn format_rtc(
    rtc: &DateTime,
    select: RtcSelect,
    time_format: TimeFormat,
    date_format: DateFormat,
) -> ScreenText {
    let mut text = ScreenText::new();
    match select {
        RtcSelect::Time => {
            let hour = format_hour(rtc.hour, time_format);
            match time_format {
                TimeFormat::H24 => uwrite!(&mut text, "{}", TwoDigits(hour)).ok(),
                TimeFormat::H12 => uwrite!(&mut text, "{}", SpacePadded(hour)).ok(),
            };
            uwrite!(&mut text, "{}{}", TwoDigits(rtc.minute), TwoDigits(rtc.second)).ok();
        }
        RtcSelect::Date => {
            let (first, second, third) = match date_format {
                DateFormat::YYMMDD => (rtc.year, rtc.month, rtc.day),
                DateFormat::MMDDYY => (rtc.month, rtc.day, rtc.year),
                DateFormat::DDMMYY => (rtc.day, rtc.month, rtc.year),
            };
            uwrite!(
                &mut text,
                "{}{}{}",
                TwoDigits(first),
                TwoDigits(second),
                TwoDigits(third)
            )
            .ok();
        }
    }
    text
}

/// Temperature in quarter degrees Celsius, as `" 72*F "`. The `*` glyph
/// lights the upper square of a tube, which reads as a degree sign.
pub fn format_temperature(quarters: i16, unit: TemperatureUnit) -> ScreenText {
    let quarters = i32::from(quarters);
    let value = match unit {
        TemperatureUnit::C => (quarters + 2).div_euclid(4),
        TemperatureUnit::F => (quarters * 9 + 10).div_euclid(20) + 32,
    };
    let mut number = ScreenText::new();
    uwrite!(&mut number, "{}", value).ok();

    let mut text = ScreenText::new();
    for _ in number.len()..3 {
        text.push(' ').ok();
    }
    push_bytes(&mut text, number.as_bytes());
    push_bytes(
        &mut text,
        match unit {
            TemperatureUnit::C => b"*C",
            TemperatureUnit::F => b"*F",
        },
    );
    text
}

/// The RTC chip, as far as the clock is concerned.
pub trait Rtc {
    type Error;

    fn read(&mut self) -> Result<DateTime, Self::Error>;

    fn write(&mut self, rtc: &DateTime) -> Result<(), Self::Error>;

    /// Die temperature in quarter degrees Celsius.
    fn temperature(&mut self) -> Result<i16, Self::Error>;
}

/// Checked view of the RTC.
///
/// A failed or nonsensical read never reaches the tubes: the last good
/// reading is carried forward with the millisecond timer instead, starting
/// from [`DateTime::EPOCH`] if the RTC has never answered.
pub struct TimeSource {
    last: DateTime,
    last_ms: u32,
    failures: u16,
}

impl TimeSource {
    pub const fn new() -> Self {
        TimeSource {
            last: DateTime::EPOCH,
            last_ms: 0,
            failures: 0,
        }
    }

    /// Consecutive failed reads.
    pub fn failures(&self) -> u16 {
        self.failures
    }

    pub fn now<R: Rtc, L: uWrite>(&mut self, rtc: &mut R, now_ms: u32, log: &mut L) -> DateTime {
        match rtc.read() {
            Ok(reading) if reading.is_valid() => {
                if self.failures > 0 {
                    uwriteln!(log, "rtc back after {} failed reads", self.failures).ok();
                }
                self.failures = 0;
                self.last = reading;
                self.last_ms = now_ms;
            }
            result => {
                if self.failures == 0 {
                    match result {
                        Ok(_) => uwriteln!(log, "rtc returned an invalid time").ok(),
                        Err(_) => uwriteln!(log, "rtc read failed").ok(),
                    };
                }
                self.failures = self.failures.saturating_add(1);
                let elapsed = now_ms.wrapping_sub(self.last_ms) / 1000;
                if elapsed > 0 {
                    self.last.advance(elapsed);
                    self.last_ms = self.last_ms.wrapping_add(elapsed * 1000);
                }
            }
        }
        self.last
    }

    /// Set the RTC and the fallback copy together.
    pub fn set<R: Rtc>(&mut self, rtc: &mut R, time: DateTime, now_ms: u32) -> Result<(), R::Error> {
        self.last = time;
        self.last_ms = now_ms;
        rtc.write(&time)
    }
}

impl Default for TimeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoLog;
    use crate::test_support::FakeRtc;

    fn at(hour: u8, minute: u8, second: u8) -> DateTime {
        DateTime {
            year: 24,
            month: 2,
            day: 28,
            weekday: Weekday::Wednesday.number(),
            hour,
            minute,
            second,
        }
    }

    #[test]
    fn twelve_hour_round_trip() {
        for hour in 0..24 {
            let (h12, cycle) = to_12_hour(hour);
            assert!((1..=12).contains(&h12));
            assert_eq!(to_24_hour(h12, cycle), hour);
        }
        assert_eq!(to_12_hour(0), (12, Cycle::AM));
        assert_eq!(to_12_hour(12), (12, Cycle::PM));
        assert_eq!(to_12_hour(23), (11, Cycle::PM));
    }

    #[test]
    fn time_strings() {
        let t = at(7, 5, 9);
        let text = format_rtc(&t, RtcSelect::Time, TimeFormat::H24, DateFormat::DDMMYY);
        assert_eq!(text.as_bytes(), b"070509");
        let t = at(19, 45, 0);
        let text = format_rtc(&t, RtcSelect::Time, TimeFormat::H12, DateFormat::DDMMYY);
        assert_eq!(text.as_bytes(), b" 74500");
    }

    #[test]
    fn date_strings_follow_format() {
        let t = at(0, 0, 0);
        let fmt = |f| format_rtc(&t, RtcSelect::Date, TimeFormat::H24, f);
        assert_eq!(fmt(DateFormat::YYMMDD).as_bytes(), b"240228");
        assert_eq!(fmt(DateFormat::MMDDYY).as_bytes(), b"022824");
        assert_eq!(fmt(DateFormat::DDMMYY).as_bytes(), b"280224");
    }

    #[test]
    fn temperature_strings() {
        // 22.25 C
        assert_eq!(format_temperature(89, TemperatureUnit::C).as_bytes(), b" 22*C");
        assert_eq!(format_temperature(89, TemperatureUnit::F).as_bytes(), b" 72*F");
        assert_eq!(format_temperature(-48, TemperatureUnit::C).as_bytes(), b"-12*C");
    }

    #[test]
    fn validity() {
        assert!(at(23, 59, 59).is_valid());
        assert!(!at(24, 0, 0).is_valid());
        assert!(!at(0, 60, 0).is_valid());
        let mut t = at(0, 0, 0);
        t.day = 29;
        assert!(t.is_valid(), "2024 is a leap year");
        t.year = 23;
        assert!(!t.is_valid());
        t = at(0, 0, 0);
        t.weekday = 0;
        assert!(!t.is_valid());
    }

    #[test]
    fn advance_rolls_calendar() {
        let mut t = at(23, 59, 30);
        t.advance(45);
        assert_eq!((t.hour, t.minute, t.second), (0, 0, 15));
        assert_eq!((t.day, t.month), (29, 2));
        assert_eq!(t.weekday(), Weekday::Thursday);

        let mut t = DateTime {
            year: 99,
            month: 12,
            day: 31,
            weekday: Weekday::Saturday.number(),
            hour: 12,
            minute: 0,
            second: 0,
        };
        t.advance(SECONDS_PER_DAY);
        assert_eq!((t.year, t.month, t.day), (0, 1, 1));
        assert_eq!(t.weekday(), Weekday::Sunday);
    }

    #[test]
    fn failed_reads_fall_back_to_last_good_time() {
        let mut rtc = FakeRtc::new(at(7, 0, 0));
        let mut source = TimeSource::new();
        assert_eq!(source.now(&mut rtc, 1_000, &mut NoLog), at(7, 0, 0));

        rtc.fail = true;
        assert_eq!(source.now(&mut rtc, 3_500, &mut NoLog), at(7, 0, 2));
        assert_eq!(source.failures(), 1);

        rtc.fail = false;
        rtc.time = at(25, 0, 0);
        assert_eq!(source.now(&mut rtc, 4_000, &mut NoLog), at(7, 0, 3));
        assert_eq!(source.failures(), 2);

        rtc.time = at(7, 0, 4);
        assert_eq!(source.now(&mut rtc, 4_100, &mut NoLog), at(7, 0, 4));
        assert_eq!(source.failures(), 0);
    }

    #[test]
    fn never_answering_rtc_starts_at_epoch() {
        let mut rtc = FakeRtc::new(at(7, 0, 0));
        rtc.fail = true;
        let mut source = TimeSource::new();
        assert_eq!(source.now(&mut rtc, 0, &mut NoLog), DateTime::EPOCH);
        assert_eq!(DateTime::EPOCH.weekday(), Weekday::Saturday);
    }
}
