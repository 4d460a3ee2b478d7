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
//! The clock itself: one [`Controller::poll`] per main loop iteration reads
//! the inputs, runs the alarms and the adaptive loops, and produces the next
//! [`Frame`] for the multiplexer.

use ufmt::{uWrite, uwriteln};

use crate::adaptive::{is_blanked, AutoBrightness, BatteryMonitor, PowerSource, Sensors};
use crate::alarm::{any_enabled, Audio, Scheduler, Trigger};
use crate::countdown::{Countdown, COUNTDOWN_MELODY};
use crate::display::Frame;
use crate::effect::{Effect, EffectPlayer};
use crate::glyph::{Glyphs, DECIMAL_POINT};
use crate::input::{Dispatcher, Gesture, InputSource};
use crate::menu::{Menu, View};
use crate::settings::{Config, Eeprom};
use crate::state::{RuntimeState, State};
use crate::text::ToGlyphs;
use crate::time::{format_rtc, format_temperature, DateTime, Rtc, RtcSelect, TimeSource};
use crate::DISPLAY_COUNT;

/// How often the light sensor and the battery are sampled.
pub const SAMPLE_MS: u32 = 100;

/// How often the RTC temperature is read while it is on display.
pub const TEMPERATURE_MS: u32 = 1000;

/// High voltage supply for the tubes and filament.
pub trait PowerControl {
    fn set_voltage(&mut self, state: State);
}

/// Everything the controller talks to.
pub struct Hardware<R, S, A, I, P, E> {
    pub rtc: R,
    pub sensors: S,
    pub audio: A,
    pub input: I,
    pub power: P,
    pub eeprom: E,
}

pub struct Controller {
    config: Config,
    runtime: RuntimeState,
    time: TimeSource,
    now: DateTime,
    scheduler: Scheduler,
    brightness: AutoBrightness,
    battery: BatteryMonitor,
    source: Option<PowerSource>,
    // last state sent to the supply, `None` until the first poll
    commanded: Option<State>,
    dispatcher: Dispatcher,
    menu: Menu,
    effects: EffectPlayer,
    countdown: Countdown,
    last_second: Option<u8>,
    sampled_ms: Option<u32>,
    temperature: i16,
    temperature_ms: Option<u32>,
}

fn due(last: Option<u32>, now_ms: u32, period: u32) -> bool {
    last.map_or(true, |last| now_ms.wrapping_sub(last) >= period)
}

impl Controller {
    pub fn new(config: Config) -> Self {
        Controller {
            config,
            runtime: RuntimeState::default(),
            time: TimeSource::new(),
            now: DateTime::EPOCH,
            scheduler: Scheduler::new(),
            brightness: AutoBrightness::new(),
            battery: BatteryMonitor::new(),
            source: None,
            commanded: None,
            dispatcher: Dispatcher::new(),
            menu: Menu::new(),
            effects: EffectPlayer::new(),
            countdown: Countdown::new(),
            last_second: None,
            sampled_ms: None,
            temperature: 0,
            temperature_ms: None,
        }
    }

    /// Load the configuration, storing the defaults if nothing valid was
    /// there.
    pub fn boot<E: Eeprom, L: uWrite>(eeprom: &mut E, log: &mut L) -> Self {
        let (config, valid) = Config::load(eeprom);
        if !valid {
            uwriteln!(log, "no valid settings, defaults restored").ok();
            config.save(eeprom);
        }
        Controller::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runtime(&self) -> RuntimeState {
        self.runtime
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    /// Time as of the last poll.
    pub fn now(&self) -> DateTime {
        self.now
    }

    pub fn is_ringing(&self) -> bool {
        self.scheduler.is_ringing()
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    /// One pass of the main loop.
    pub fn poll<R, S, A, I, P, E, L>(
        &mut self,
        hw: &mut Hardware<R, S, A, I, P, E>,
        now_ms: u32,
        log: &mut L,
    ) -> Frame
    where
        R: Rtc,
        S: Sensors,
        A: Audio,
        I: InputSource,
        P: PowerControl,
        E: Eeprom,
        L: uWrite,
    {
        self.now = self.time.now(&mut hw.rtc, now_ms, log);

        loop {
            match self.dispatcher.poll(&mut hw.input, now_ms) {
                Ok(gesture) => self.gesture(gesture, hw, now_ms, log),
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => match e {},
            }
        }

        self.alarms(&mut hw.audio, now_ms, log);
        self.countdown_expiry(&mut hw.audio, now_ms, log);
        self.top_of_minute(now_ms);

        if due(self.sampled_ms, now_ms, SAMPLE_MS) {
            self.sampled_ms = Some(now_ms);
            self.sample(&mut hw.sensors, log);
        }
        if self.menu.view() == Some(View::Temperature)
            && due(self.temperature_ms, now_ms, TEMPERATURE_MS)
        {
            self.temperature_ms = Some(now_ms);
            // a failed read keeps showing the last value
            if let Ok(quarters) = hw.rtc.temperature() {
                self.temperature = quarters;
            }
        }

        self.power(&mut hw.power, log);
        self.frame(now_ms)
    }

    fn gesture<R, S, A, I, P, E, L>(
        &mut self,
        gesture: Gesture,
        hw: &mut Hardware<R, S, A, I, P, E>,
        now_ms: u32,
        log: &mut L,
    ) where
        R: Rtc,
        A: Audio,
        E: Eeprom,
        L: uWrite,
    {
        if self.config.noise.is_enabled() {
            hw.audio.click();
        }
        // any gesture silences a ringing alarm, and does nothing else
        let trigger = self.scheduler.trigger();
        if self
            .scheduler
            .acknowledge(&mut self.runtime, &mut hw.audio, log)
        {
            self.effects.stop();
            if trigger == Some(Trigger::Countdown) {
                self.countdown.clear();
            }
            return;
        }

        let command = self.menu.handle(gesture, &mut self.config, &self.now);
        if command.play_effect {
            self.effects.start(self.config.effect, now_ms, false);
        }
        if let Some(time) = command.set_clock {
            self.now = time;
            match self.time.set(&mut hw.rtc, time, now_ms) {
                Ok(()) => uwriteln!(log, "clock set").ok(),
                Err(_) => uwriteln!(log, "rtc write failed").ok(),
            };
        }
        if let Some(seconds) = command.start_countdown {
            self.countdown.start(seconds, now_ms);
            uwriteln!(log, "countdown of {} s started", seconds).ok();
        }
        if command.cancel_countdown {
            self.countdown.clear();
            uwriteln!(log, "countdown cancelled").ok();
        }
        if command.save {
            let written = self.config.save(&mut hw.eeprom);
            uwriteln!(log, "settings saved, {} bytes written", written).ok();
        }
    }

    fn alarms<A: Audio, L: uWrite>(&mut self, audio: &mut A, now_ms: u32, log: &mut L) {
        let ringing = self.scheduler.is_ringing();
        let started = self.scheduler.evaluate(
            &self.config.alarm,
            &self.now,
            now_ms,
            &mut self.runtime,
            audio,
            log,
        );
        if started.is_some() {
            self.effects.start(Effect::Phrase, now_ms, true);
        }
        self.scheduler.service(
            self.config.music_timer,
            now_ms,
            &mut self.runtime,
            audio,
            log,
        );
        if ringing && !self.scheduler.is_ringing() {
            self.effects.stop();
            if self.countdown.is_expired() {
                self.countdown.clear();
            }
        }
    }

    fn countdown_expiry<A: Audio, L: uWrite>(&mut self, audio: &mut A, now_ms: u32, log: &mut L) {
        if !self.countdown.expire(now_ms) {
            return;
        }
        uwriteln!(log, "countdown expired").ok();
        self.effects.stop();
        self.menu.close();
        self.scheduler.ring(
            Trigger::Countdown,
            COUNTDOWN_MELODY,
            now_ms,
            &mut self.runtime,
            audio,
        );
    }

    fn top_of_minute(&mut self, now_ms: u32) {
        let second = self.now.second;
        if self.last_second == Some(second) {
            return;
        }
        self.last_second = Some(second);
        if second == 0 && self.menu.view().is_some() && !self.scheduler.is_ringing() {
            self.effects.start(self.config.effect, now_ms, false);
        }
    }

    fn sample<S: Sensors, L: uWrite>(&mut self, sensors: &mut S, log: &mut L) {
        self.brightness
            .update(sensors.light(), self.config.gain, self.config.offset);

        let source = self.battery.update(sensors.battery_millivolts());
        if self.source != Some(source) {
            match source {
                PowerSource::External => uwriteln!(log, "power: external").ok(),
                PowerSource::BatteryOk => uwriteln!(log, "power: battery").ok(),
                PowerSource::BatteryLow => uwriteln!(log, "power: battery low").ok(),
            };
            self.source = Some(source);
        }
    }

    fn power<P: PowerControl, L: uWrite>(&mut self, power: &mut P, log: &mut L) {
        let flat = self.source == Some(PowerSource::BatteryLow) && self.config.battery.is_enabled();
        let voltage = State::from(!flat);
        let blanked = is_blanked(
            self.config.blank_begin,
            self.config.blank_end,
            self.now.seconds_of_day(),
        );
        // the alarm and the menu show through the blanking window
        let visible = !blanked || self.scheduler.is_ringing() || self.menu.view().is_none();
        self.runtime.display = State::from(!flat && visible);

        self.runtime.voltage = voltage;
        if self.commanded != Some(voltage) {
            self.commanded = Some(voltage);
            power.set_voltage(voltage);
            match voltage {
                State::Enable => uwriteln!(log, "high voltage on").ok(),
                State::Disable => uwriteln!(log, "high voltage off").ok(),
            };
        }
    }

    fn frame(&mut self, now_ms: u32) -> Frame {
        let glyphs = match self.menu.render(&self.config) {
            Some(glyphs) => glyphs,
            None => self.clock_glyphs(now_ms),
        };
        Frame {
            glyphs,
            level: self.config.brightness.resolve(self.brightness.level()),
            display: self.runtime.display,
        }
    }

    fn clock_glyphs(&mut self, now_ms: u32) -> Glyphs {
        let date = self.format(RtcSelect::Date);
        if let Some(glyphs) = self.effects.frame(now_ms, &date, &self.config.phrase) {
            return glyphs;
        }
        if let Some(glyphs) = self.countdown.frame(now_ms) {
            return glyphs;
        }
        let mut glyphs = match self.menu.view() {
            Some(View::Date) => date,
            Some(View::Temperature) => {
                format_temperature(self.temperature, self.config.temperature_unit).glyphs()
            }
            _ => self.format(RtcSelect::Time),
        };
        if any_enabled(&self.config.alarm) {
            glyphs[DISPLAY_COUNT - 1] |= DECIMAL_POINT;
        }
        glyphs
    }

    fn format(&self, select: RtcSelect) -> Glyphs {
        format_rtc(
            &self.now,
            select,
            self.config.time_format,
            self.config.date_format,
        )
        .glyphs()
    }
}
