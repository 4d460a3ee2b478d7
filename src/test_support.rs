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
//! Host side stand-ins for the board.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::adaptive::Sensors;
use crate::alarm::Audio;
use crate::clock::{Hardware, PowerControl};
use crate::input::InputSource;
use crate::settings::Eeprom;
use crate::state::State;
use crate::time::{DateTime, Rtc};

/// Every level change of a set of [`FakePin`]s, in order.
#[derive(Debug, Default, Clone)]
pub struct PinLog(Rc<RefCell<Vec<(char, bool)>>>);

impl PinLog {
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn entries(&self) -> Vec<(char, bool)> {
        self.0.borrow().clone()
    }

    /// Last level written to `pin`.
    pub fn last(&self, pin: char) -> Option<bool> {
        self.0
            .borrow()
            .iter()
            .rev()
            .find(|(name, _)| *name == pin)
            .map(|&(_, high)| high)
    }
}

pub struct FakePin {
    name: char,
    log: PinLog,
}

impl FakePin {
    pub fn new(name: char, log: &PinLog) -> Self {
        FakePin {
            name,
            log: log.clone(),
        }
    }
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.0.borrow_mut().push((self.name, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.0.borrow_mut().push((self.name, true));
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakeRtc {
    pub time: DateTime,
    /// Quarter degrees.
    pub temperature: i16,
    pub fail: bool,
}

impl FakeRtc {
    pub fn new(time: DateTime) -> Self {
        FakeRtc {
            time,
            temperature: 0,
            fail: false,
        }
    }
}

impl Rtc for FakeRtc {
    type Error = ();

    fn read(&mut self) -> Result<DateTime, ()> {
        if self.fail {
            return Err(());
        }
        Ok(self.time)
    }

    fn write(&mut self, rtc: &DateTime) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.time = *rtc;
        Ok(())
    }

    fn temperature(&mut self) -> Result<i16, ()> {
        if self.fail {
            return Err(());
        }
        Ok(self.temperature)
    }
}

#[derive(Debug, Default)]
pub struct FakeAudio {
    pub playing: Option<u8>,
    /// Every melody started, in order.
    pub started: Vec<u8>,
    pub clicks: u32,
}

impl Audio for FakeAudio {
    fn play_melody(&mut self, index: u8) {
        self.playing = Some(index);
        self.started.push(index);
    }

    fn stop(&mut self) {
        self.playing = None;
    }

    fn is_playing(&self) -> bool {
        self.playing.is_some()
    }

    fn click(&mut self) {
        self.clicks += 1;
    }
}

pub struct FakeEeprom {
    pub bytes: [u8; 1024],
}

impl FakeEeprom {
    /// Fresh chip, every byte reads 0xFF.
    pub fn erased() -> Self {
        FakeEeprom { bytes: [0xFF; 1024] }
    }
}

impl Eeprom for FakeEeprom {
    fn read_byte(&self, offset: u16) -> u8 {
        self.bytes[usize::from(offset)]
    }

    fn write_byte(&mut self, offset: u16, data: u8) {
        self.bytes[usize::from(offset)] = data;
    }
}

#[derive(Debug, Default)]
pub struct FakeInput {
    /// Counts handed out on the next read.
    pub counts: i8,
    pub pressed: bool,
}

impl InputSource for FakeInput {
    fn encoder_delta(&mut self) -> i8 {
        core::mem::take(&mut self.counts)
    }

    fn button_pressed(&mut self) -> bool {
        self.pressed
    }
}

#[derive(Debug)]
pub struct FakeSensors {
    pub light: u16,
    pub millivolts: u32,
}

impl Default for FakeSensors {
    fn default() -> Self {
        // mid-room light, USB powered
        FakeSensors {
            light: 500,
            millivolts: 5000,
        }
    }
}

impl Sensors for FakeSensors {
    fn light(&mut self) -> u16 {
        self.light
    }

    fn battery_millivolts(&mut self) -> u32 {
        self.millivolts
    }
}

#[derive(Debug, Default)]
pub struct FakePower {
    /// Last state set, `None` before the first call.
    pub voltage: Option<State>,
}

impl PowerControl for FakePower {
    fn set_voltage(&mut self, state: State) {
        self.voltage = Some(state);
    }
}

pub type FakeBoard =
    Hardware<FakeRtc, FakeSensors, FakeAudio, FakeInput, FakePower, FakeEeprom>;

impl FakeBoard {
    pub fn new(time: DateTime) -> Self {
        Hardware {
            rtc: FakeRtc::new(time),
            sensors: FakeSensors::default(),
            audio: FakeAudio::default(),
            input: FakeInput::default(),
            power: FakePower::default(),
            eeprom: FakeEeprom::erased(),
        }
    }
}
