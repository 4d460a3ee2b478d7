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
//! Settings menu.
//!
//! The whole user interface is one encoder with a push button:
//!
//! - in the clock view, turning switches between time, date and temperature;
//!   a short press plays the effect and a long press opens the menu.
//! - in the menu, turning picks an item; a short press edits it and a long
//!   press saves and goes back to the clock.
//! - while editing, turning changes the field marked by the decimal points; a
//!   short press moves to the next field and a long press saves and goes back
//!   to the clock.
//!
//! Edits change the [`Config`] in place so they show up right away. Time and
//! date are edited on a copy and only reach the RTC when the edit ends.

use heapless::String;
use ufmt::uwrite;

use crate::adaptive::Brightness;
use crate::alarm::MELODY_COUNT;
use crate::countdown::format_countdown;
use crate::display::LEVELS;
use crate::effect::Effect;
use crate::glyph::{encode_text, Glyphs, DECIMAL_POINT};
use crate::input::Gesture;
use crate::settings::Config;
use crate::state::State;
use crate::text::{push_bytes, ScreenText, ToGlyphs, TwoDigits};
use crate::time::{
    days_in_month, seconds_of_day, split_seconds, DateFormat, DateTime, TemperatureUnit,
    TimeFormat, Weekday,
};
use crate::{ALARM_COUNT, DISPLAY_COUNT};

/// What the clock view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Time,
    Date,
    Temperature,
}

impl View {
    const ALL: [View; 3] = [View::Time, View::Date, View::Temperature];

    fn step(self, delta: i8) -> View {
        let i = View::ALL.iter().position(|&v| v == self).unwrap_or(0);
        View::ALL[step_index(i, delta, View::ALL.len())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    Time,
    Date,
    Alarm(usize),
    Timer,
    Brightness,
    TimeFormat,
    DateFormat,
    TemperatureUnit,
    Effect,
    BlankBegin,
    BlankEnd,
    Gain,
    Offset,
    MusicTimer,
    Noise,
    Battery,
    Phrase,
}

const ITEMS: [Item; 16 + ALARM_COUNT] = [
    Item::Time,
    Item::Date,
    Item::Alarm(0),
    Item::Alarm(1),
    Item::Alarm(2),
    Item::Timer,
    Item::Brightness,
    Item::TimeFormat,
    Item::DateFormat,
    Item::TemperatureUnit,
    Item::Effect,
    Item::BlankBegin,
    Item::BlankEnd,
    Item::Gain,
    Item::Offset,
    Item::MusicTimer,
    Item::Noise,
    Item::Battery,
    Item::Phrase,
];

// Alarm fields: on/off, hour, minute, one per weekday, melody.
const ALARM_DAYS: u8 = 3;
const ALARM_MELODY: u8 = ALARM_DAYS + 7;

const MUSIC_TIMER_MAX: u8 = 60;

/// Countdown length until the timer item is first edited.
pub const COUNTDOWN_DEFAULT: u32 = 5 * 60;

impl Item {
    fn fields(self) -> u8 {
        match self {
            Item::Time | Item::Timer => 3,
            Item::Date => 4,
            Item::Alarm(_) => ALARM_MELODY + 1,
            Item::BlankBegin | Item::BlankEnd => 2,
            Item::Phrase => DISPLAY_COUNT as u8,
            _ => 1,
        }
    }

    fn label(self) -> &'static [u8] {
        match self {
            Item::Time => b"Time",
            Item::Date => b"Date",
            Item::Alarm(0) => b"Alrm 1",
            Item::Alarm(1) => b"Alrm 2",
            Item::Alarm(_) => b"Alrm 3",
            Item::Timer => b"Timer",
            Item::Brightness => b"Bright",
            Item::TimeFormat => b"HrFmt",
            Item::DateFormat => b"DtFmt",
            Item::TemperatureUnit => b"Unit",
            Item::Effect => b"Effect",
            Item::BlankBegin => b"Blnk 1",
            Item::BlankEnd => b"Blnk 2",
            Item::Gain => b"Gain",
            Item::Offset => b"Offset",
            Item::MusicTimer => b"Music",
            Item::Noise => b"Noise",
            Item::Battery => b"Battry",
            Item::Phrase => b"Phrase",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Clock(View),
    Menu(usize),
    Edit { item: usize, field: u8 },
    /// A countdown is running on the tubes.
    Countdown,
}

/// Side effects of a gesture, carried out by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Command {
    pub play_effect: bool,
    /// Write the configuration to EEPROM.
    pub save: bool,
    /// Write this time to the RTC.
    pub set_clock: Option<DateTime>,
    /// Start a countdown of this many seconds.
    pub start_countdown: Option<u32>,
    pub cancel_countdown: bool,
}

pub struct Menu {
    mode: Mode,
    // time and date being edited
    draft: DateTime,
    // countdown length in seconds, kept for the next run
    countdown: u32,
}

fn step_index(index: usize, delta: i8, len: usize) -> usize {
    (index as i16 + i16::from(delta)).rem_euclid(len as i16) as usize
}

/// Add `delta` to `value`, wrapping inside `min..=max`.
fn wrap(value: u8, delta: i8, min: u8, max: u8) -> u8 {
    let span = i16::from(max) - i16::from(min) + 1;
    let offset = i16::from(value.clamp(min, max)) - i16::from(min) + i16::from(delta);
    (i16::from(min) + offset.rem_euclid(span)) as u8
}

// A toggle flips once per detent.
fn flips(delta: i8) -> bool {
    delta % 2 != 0
}

fn toggle(state: &mut State, delta: i8) {
    if flips(delta) {
        *state = state.toggled();
    }
}

fn on_off(state: State) -> &'static [u8] {
    match state {
        State::Enable => b" on",
        State::Disable => b"off",
    }
}

/// `label` on the left, `value` right aligned.
fn labeled(label: &[u8], value: u8) -> ScreenText {
    let mut number = String::<3>::new();
    uwrite!(&mut number, "{}", value).ok();
    text_right(label, number.as_bytes())
}

fn text_right(label: &[u8], value: &[u8]) -> ScreenText {
    let mut text = ScreenText::new();
    push_bytes(&mut text, label);
    for _ in (label.len() + value.len())..DISPLAY_COUNT {
        text.push(' ').ok();
    }
    push_bytes(&mut text, value);
    text
}

/// Light the decimal points under `tubes` to mark the field being edited.
fn mark(mut glyphs: Glyphs, tubes: core::ops::Range<usize>) -> Glyphs {
    for g in &mut glyphs[tubes] {
        *g |= DECIMAL_POINT;
    }
    glyphs
}

impl Menu {
    pub const fn new() -> Self {
        Menu {
            mode: Mode::Clock(View::Time),
            draft: DateTime::EPOCH,
            countdown: COUNTDOWN_DEFAULT,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The clock view, if the menu is closed.
    pub fn view(&self) -> Option<View> {
        match self.mode {
            Mode::Clock(view) => Some(view),
            _ => None,
        }
    }

    /// Close the menu without saving, leaving edits in `config`.
    pub fn close(&mut self) {
        self.mode = Mode::Clock(View::Time);
    }

    /// Countdown length the timer item is set to.
    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn handle(&mut self, gesture: Gesture, config: &mut Config, now: &DateTime) -> Command {
        let mut command = Command::default();
        match (self.mode, gesture) {
            (Mode::Clock(view), Gesture::Increment(n)) => self.mode = Mode::Clock(view.step(n)),
            (Mode::Clock(_), Gesture::Select) => command.play_effect = true,
            (Mode::Clock(_), Gesture::Update) => self.mode = Mode::Menu(0),

            (Mode::Menu(item), Gesture::Increment(n)) => {
                self.mode = Mode::Menu(step_index(item, n, ITEMS.len()))
            }
            (Mode::Menu(item), Gesture::Select) => {
                self.draft = *now;
                self.mode = Mode::Edit { item, field: 0 };
            }
            (Mode::Menu(_), Gesture::Update) => {
                command.save = true;
                self.close();
            }

            (Mode::Edit { item, field }, Gesture::Increment(n)) => {
                self.adjust(ITEMS[item], field, n, config)
            }
            (Mode::Edit { item, field }, Gesture::Select) => {
                if field + 1 < ITEMS[item].fields() {
                    self.mode = Mode::Edit {
                        item,
                        field: field + 1,
                    };
                } else {
                    command.set_clock = self.clock_edit(ITEMS[item], now);
                    self.mode = Mode::Menu(item);
                    self.start_countdown(ITEMS[item], &mut command);
                }
            }
            (Mode::Edit { item, .. }, Gesture::Update) => {
                command.set_clock = self.clock_edit(ITEMS[item], now);
                command.save = true;
                self.close();
                self.start_countdown(ITEMS[item], &mut command);
            }

            (Mode::Countdown, Gesture::Increment(_)) => {}
            (Mode::Countdown, Gesture::Select | Gesture::Update) => {
                command.cancel_countdown = true;
                self.close();
            }
        }
        command
    }

    fn start_countdown(&mut self, item: Item, command: &mut Command) {
        if item == Item::Timer && self.countdown > 0 {
            command.start_countdown = Some(self.countdown);
            self.mode = Mode::Countdown;
        }
    }

    // The edited half of the draft merged into the current time.
    fn clock_edit(&self, item: Item, now: &DateTime) -> Option<DateTime> {
        let mut time = *now;
        match item {
            Item::Time => {
                time.hour = self.draft.hour;
                time.minute = self.draft.minute;
                time.second = self.draft.second;
            }
            Item::Date => {
                time.year = self.draft.year;
                time.month = self.draft.month;
                time.day = self.draft.day;
                time.weekday = self.draft.weekday;
            }
            _ => return None,
        }
        Some(time)
    }

    fn adjust(&mut self, item: Item, field: u8, n: i8, config: &mut Config) {
        match item {
            Item::Time => {
                let d = &mut self.draft;
                match field {
                    0 => d.hour = wrap(d.hour, n, 0, 23),
                    1 => d.minute = wrap(d.minute, n, 0, 59),
                    _ => d.second = wrap(d.second, n, 0, 59),
                }
            }
            Item::Date => {
                let d = &mut self.draft;
                match field {
                    0 => d.year = wrap(d.year, n, 0, 99),
                    1 => d.month = wrap(d.month, n, 1, 12),
                    2 => d.day = wrap(d.day, n, 1, days_in_month(d.month, d.year)),
                    _ => d.weekday = wrap(d.weekday, n, 1, 7),
                }
                d.day = d.day.min(days_in_month(d.month, d.year));
            }
            Item::Timer => {
                let (hour, minute, second) = split_seconds(self.countdown);
                self.countdown = match field {
                    0 => seconds_of_day(wrap(hour, n, 0, 23), minute, second),
                    1 => seconds_of_day(hour, wrap(minute, n, 0, 59), second),
                    _ => seconds_of_day(hour, minute, wrap(second, n, 0, 59)),
                };
            }
            Item::Alarm(i) => {
                let alarm = &mut config.alarm[i];
                let (hour, minute) = alarm.hour_minute();
                match field {
                    0 => toggle(&mut alarm.state, n),
                    1 => alarm.set_time(seconds_of_day(wrap(hour, n, 0, 23), minute, 0)),
                    2 => alarm.set_time(seconds_of_day(hour, wrap(minute, n, 0, 59), 0)),
                    ALARM_MELODY => alarm.music = wrap(alarm.music, n, 0, MELODY_COUNT - 1),
                    day => {
                        if flips(n) {
                            alarm.days.toggle(Weekday::ALL[usize::from(day - ALARM_DAYS)]);
                        }
                    }
                }
            }
            Item::Brightness => {
                let code = match config.brightness {
                    Brightness::Level(v) => v,
                    Brightness::Auto => LEVELS + 1,
                };
                config.brightness = match wrap(code, n, 0, LEVELS + 1) {
                    v if v <= LEVELS => Brightness::Level(v),
                    _ => Brightness::Auto,
                };
            }
            Item::TimeFormat => {
                if flips(n) {
                    config.time_format = match config.time_format {
                        TimeFormat::H24 => TimeFormat::H12,
                        TimeFormat::H12 => TimeFormat::H24,
                    };
                }
            }
            Item::DateFormat => {
                const FORMATS: [DateFormat; 3] =
                    [DateFormat::YYMMDD, DateFormat::MMDDYY, DateFormat::DDMMYY];
                let i = config.date_format as usize;
                config.date_format = FORMATS[step_index(i, n, FORMATS.len())];
            }
            Item::TemperatureUnit => {
                if flips(n) {
                    config.temperature_unit = match config.temperature_unit {
                        TemperatureUnit::C => TemperatureUnit::F,
                        TemperatureUnit::F => TemperatureUnit::C,
                    };
                }
            }
            Item::Effect => config.effect = config.effect.step(n),
            Item::BlankBegin | Item::BlankEnd => {
                let window = match item {
                    Item::BlankBegin => &mut config.blank_begin,
                    _ => &mut config.blank_end,
                };
                let (hour, minute, _) = split_seconds(*window);
                *window = match field {
                    0 => seconds_of_day(wrap(hour, n, 0, 23), minute, 0),
                    _ => seconds_of_day(hour, wrap(minute, n, 0, 59), 0),
                };
            }
            Item::Gain => config.gain = wrap(config.gain, n, 0, u8::MAX),
            Item::Offset => config.offset = wrap(config.offset, n, 0, u8::MAX),
            Item::MusicTimer => {
                config.music_timer = wrap(config.music_timer, n, 0, MUSIC_TIMER_MAX)
            }
            Item::Noise => toggle(&mut config.noise, n),
            Item::Battery => toggle(&mut config.battery, n),
            Item::Phrase => {
                let c = &mut config.phrase[usize::from(field)];
                *c = wrap(*c, n, b' ', b'~');
            }
        }
    }

    /// Tube contents for the menu, or `None` in the clock view and while a
    /// countdown runs.
    pub fn render(&self, config: &Config) -> Option<Glyphs> {
        match self.mode {
            Mode::Clock(_) | Mode::Countdown => None,
            Mode::Menu(item) => Some(encode_text(ITEMS[item].label())),
            Mode::Edit { item, field } => Some(self.render_field(ITEMS[item], field, config)),
        }
    }

    fn render_field(&self, item: Item, field: u8, config: &Config) -> Glyphs {
        let f = usize::from(field);
        let mut text = ScreenText::new();
        match item {
            Item::Time => {
                let d = &self.draft;
                uwrite!(
                    &mut text,
                    "{}{}{}",
                    TwoDigits(d.hour),
                    TwoDigits(d.minute),
                    TwoDigits(d.second)
                )
                .ok();
                return mark(text.glyphs(), 2 * f..2 * f + 2);
            }
            Item::Date if field < 3 => {
                let d = &self.draft;
                uwrite!(
                    &mut text,
                    "{}{}{}",
                    TwoDigits(d.year),
                    TwoDigits(d.month),
                    TwoDigits(d.day)
                )
                .ok();
                return mark(text.glyphs(), 2 * f..2 * f + 2);
            }
            Item::Date => text = text_right(b"Day", self.draft.weekday().label()),
            Item::Timer => {
                return mark(format_countdown(self.countdown).glyphs(), 2 * f..2 * f + 2)
            }
            Item::Alarm(i) => {
                let alarm = &config.alarm[i];
                match field {
                    0 => {
                        uwrite!(&mut text, "AL{}", i + 1).ok();
                        text = text_right(text.as_bytes(), on_off(alarm.state));
                    }
                    1 | 2 => {
                        let (hour, minute) = alarm.hour_minute();
                        uwrite!(&mut text, "{} {}{}", i + 1, TwoDigits(hour), TwoDigits(minute)).ok();
                        return mark(text.glyphs(), 2 * f..2 * f + 2);
                    }
                    ALARM_MELODY => text = labeled(b"Tune", alarm.music + 1),
                    day => {
                        let day = Weekday::ALL[usize::from(day - ALARM_DAYS)];
                        text = text_right(day.label(), on_off(State::from(alarm.days.contains(day))));
                    }
                }
            }
            Item::Brightness => {
                text = match config.brightness {
                    Brightness::Level(v) => labeled(b"Br", v),
                    Brightness::Auto => text_right(b"Br", b"Auto"),
                }
            }
            Item::TimeFormat => {
                text = text_right(
                    b"",
                    match config.time_format {
                        TimeFormat::H24 => b"24 Hr",
                        TimeFormat::H12 => b"12 Hr",
                    },
                )
            }
            Item::DateFormat => {
                text = text_right(
                    b"",
                    match config.date_format {
                        DateFormat::YYMMDD => b"YYMMDD",
                        DateFormat::MMDDYY => b"MMDDYY",
                        DateFormat::DDMMYY => b"DDMMYY",
                    },
                )
            }
            Item::TemperatureUnit => {
                text = text_right(
                    b"Unit",
                    match config.temperature_unit {
                        TemperatureUnit::C => b"*C",
                        TemperatureUnit::F => b"*F",
                    },
                )
            }
            Item::Effect => {
                text = text_right(
                    b"",
                    match config.effect {
                        Effect::None => b"None",
                        Effect::Spiral => b"Spiral",
                        Effect::Date => b"Date",
                        Effect::Phrase => b"Phrase",
                    },
                )
            }
            Item::BlankBegin | Item::BlankEnd => {
                let (seconds, label) = match item {
                    Item::BlankBegin => (config.blank_begin, b'b'),
                    _ => (config.blank_end, b'E'),
                };
                let (hour, minute, _) = split_seconds(seconds);
                text.push(char::from(label)).ok();
                uwrite!(&mut text, " {}{}", TwoDigits(hour), TwoDigits(minute)).ok();
                return mark(text.glyphs(), 2 + 2 * f..4 + 2 * f);
            }
            Item::Gain => text = labeled(b"Gn", config.gain),
            Item::Offset => text = labeled(b"OF", config.offset),
            Item::MusicTimer => text = labeled(b"Mu", config.music_timer),
            Item::Noise => text = text_right(b"Nz", on_off(config.noise)),
            Item::Battery => text = text_right(b"Bt", on_off(config.battery)),
            Item::Phrase => return mark(encode_text(&config.phrase), f..f + 1),
        }
        text.glyphs()
    }
}

impl Default for Menu {
    fn default() -> Self {
        Self::new()
    }
}
