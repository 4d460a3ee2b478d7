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
//! The real board: an ATmega328P at 16 MHz.
//!
//! Pin assignment:
//!
//! | pin | use |
//! |---|---|
//! | D2, D3 | encoder lines (INT0, INT1) |
//! | D4 | button, active low |
//! | D5 | high voltage enable |
//! | D6 | filament AC enable |
//! | D8, D9, D10, D11 | tube driver data, latch, clock, blank |
//! | D12 | filament AC toggle |
//! | D13, A0, A1 | piezo transducer |
//! | A2 | battery |
//! | A3 | photodiode |
//! | A4, A5 | I2C to the DS3231 |

use core::cell::{Cell, RefCell};

use arduino_hal::hal::port::{PB5, PC0, PC1, PC2, PC3, PD2, PD3, PD4, PD5, PD6};
use arduino_hal::port::mode::{Analog, Input, Output, PullUp};
use arduino_hal::port::Pin;
use avr_device::interrupt::Mutex;

use crate::adaptive::Sensors;
use crate::alarm::Audio;
use crate::clock::PowerControl;
use crate::input::{quadrature_step, InputSource};
use crate::melody::{Tune, CLICK, TICK_HZ};
use crate::settings::Eeprom;
use crate::state::State;

/// Onboard EEPROM.
pub struct OnboardEeprom(arduino_hal::Eeprom);

impl OnboardEeprom {
    pub fn new(eeprom: arduino_hal::Eeprom) -> Self {
        OnboardEeprom(eeprom)
    }
}

impl Eeprom for OnboardEeprom {
    fn read_byte(&self, offset: u16) -> u8 {
        self.0.read_byte(offset)
    }

    fn write_byte(&mut self, offset: u16, data: u8) {
        self.0.write_byte(offset, data)
    }
}

// ADC reference is AVcc.
const ADC_REFERENCE_MV: u32 = 5000;

pub struct AnalogSensors {
    adc: arduino_hal::Adc,
    light: Pin<Analog, PC3>,
    battery: Pin<Analog, PC2>,
}

impl AnalogSensors {
    pub fn new(adc: arduino_hal::Adc, light: Pin<Analog, PC3>, battery: Pin<Analog, PC2>) -> Self {
        AnalogSensors {
            adc,
            light,
            battery,
        }
    }
}

impl Sensors for AnalogSensors {
    fn light(&mut self) -> u16 {
        self.light.analog_read(&mut self.adc)
    }

    fn battery_millivolts(&mut self) -> u32 {
        u32::from(self.battery.analog_read(&mut self.adc)) * ADC_REFERENCE_MV / 1024
    }
}

/// High voltage boost converter and filament drive.
pub struct HighVoltage {
    hv: Pin<Output, PD5>,
    ac: Pin<Output, PD6>,
}

impl HighVoltage {
    pub fn new(mut hv: Pin<Output, PD5>, mut ac: Pin<Output, PD6>) -> Self {
        hv.set_low();
        ac.set_low();
        HighVoltage { hv, ac }
    }
}

impl PowerControl for HighVoltage {
    fn set_voltage(&mut self, state: State) {
        match state {
            State::Enable => {
                self.ac.set_high();
                self.hv.set_high();
            }
            State::Disable => {
                self.hv.set_low();
                self.ac.set_low();
            }
        }
    }
}

/// Piezo between D13 and A0/A1, driven push-pull.
struct Transducer {
    a: Pin<Output, PB5>,
    b: Pin<Output, PC0>,
    c: Pin<Output, PC1>,
}

impl Transducer {
    fn drive(&mut self, level: bool) {
        if level {
            self.a.set_high();
            self.b.set_low();
            self.c.set_low();
        } else {
            self.a.set_low();
            self.b.set_high();
            self.c.set_high();
        }
    }

    fn idle(&mut self) {
        self.a.set_low();
        self.b.set_low();
        self.c.set_low();
    }
}

struct Player {
    transducer: Transducer,
    tune: Option<Tune>,
}

static PLAYER: Mutex<RefCell<Option<Player>>> = Mutex::new(RefCell::new(None));

// 16MHz / 8 prescale / 250 = 8kHz
const TC1_PRESCALE_TOP: u16 = (16_000_000 / 8 / TICK_HZ) as u16 - 1;

/// Melodies played from the Timer/Counter 1 compare interrupt.
pub struct Buzzer {
    _tc1: arduino_hal::pac::TC1,
}

impl Buzzer {
    pub fn new(
        tc1: arduino_hal::pac::TC1,
        a: Pin<Output, PB5>,
        b: Pin<Output, PC0>,
        c: Pin<Output, PC1>,
    ) -> Self {
        let mut transducer = Transducer { a, b, c };
        transducer.idle();
        avr_device::interrupt::free(|cs| {
            PLAYER.borrow(cs).replace(Some(Player {
                transducer,
                tune: None,
            }));
        });

        // CTC mode on OCR1A, prescale 8.
        tc1.tccr1a.write(|w| w.wgm1().bits(0b00));
        tc1.tccr1b
            .write(|w| w.wgm1().bits(0b01).cs1().prescale_8());
        tc1.ocr1a.write(|w| w.bits(TC1_PRESCALE_TOP));
        tc1.timsk1.write(|w| w.ocie1a().set_bit());
        Buzzer { _tc1: tc1 }
    }

    fn set(&mut self, tune: Option<Tune>) {
        avr_device::interrupt::free(|cs| {
            if let Some(player) = PLAYER.borrow(cs).borrow_mut().as_mut() {
                player.tune = tune;
                player.transducer.idle();
            }
        });
    }
}

impl Audio for Buzzer {
    fn play_melody(&mut self, index: u8) {
        self.set(Some(Tune::melody(index)));
    }

    fn stop(&mut self) {
        self.set(None);
    }

    fn is_playing(&self) -> bool {
        avr_device::interrupt::free(|cs| {
            PLAYER
                .borrow(cs)
                .borrow()
                .as_ref()
                .and_then(|player| player.tune.as_ref())
                .is_some_and(|tune| !tune.is_finished())
        })
    }

    fn click(&mut self) {
        // a melody takes precedence
        if !self.is_playing() {
            self.set(Some(Tune::new(&CLICK)));
        }
    }
}

/// Timer/Counter 1 Compare Match A: one melody tick.
#[avr_device::interrupt(atmega328p)]
fn TIMER1_COMPA() {
    avr_device::interrupt::free(|cs| {
        if let Some(player) = PLAYER.borrow(cs).borrow_mut().as_mut() {
            match player.tune.as_mut().and_then(Tune::tick) {
                Some(level) => player.transducer.drive(level),
                None => player.transducer.idle(),
            }
        }
    })
}

struct EncoderLines {
    a: Pin<Input<PullUp>, PD2>,
    b: Pin<Input<PullUp>, PD3>,
    state: u8,
}

impl EncoderLines {
    fn read(&self) -> u8 {
        u8::from(self.a.is_high()) << 1 | u8::from(self.b.is_high())
    }
}

static ENCODER: Mutex<RefCell<Option<EncoderLines>>> = Mutex::new(RefCell::new(None));
static ENCODER_COUNTS: Mutex<Cell<i8>> = Mutex::new(Cell::new(0));

fn encoder_changed() {
    avr_device::interrupt::free(|cs| {
        if let Some(lines) = ENCODER.borrow(cs).borrow_mut().as_mut() {
            let current = lines.read();
            let step = quadrature_step(lines.state, current);
            lines.state = current;
            let counts = ENCODER_COUNTS.borrow(cs);
            counts.set(counts.get().saturating_add(step));
        }
    })
}

#[avr_device::interrupt(atmega328p)]
fn INT0() {
    encoder_changed()
}

#[avr_device::interrupt(atmega328p)]
fn INT1() {
    encoder_changed()
}

/// Rotary encoder on the external interrupts, and the push button.
pub struct Encoder {
    button: Pin<Input<PullUp>, PD4>,
}

impl Encoder {
    pub fn new(
        exint: &arduino_hal::pac::EXINT,
        a: Pin<Input<PullUp>, PD2>,
        b: Pin<Input<PullUp>, PD3>,
        button: Pin<Input<PullUp>, PD4>,
    ) -> Self {
        let mut lines = EncoderLines { a, b, state: 0 };
        lines.state = lines.read();
        avr_device::interrupt::free(|cs| {
            ENCODER.borrow(cs).replace(Some(lines));
        });
        // any logical change on INT0 and INT1
        exint.eicra.write(|w| unsafe { w.bits(0b0101) });
        exint.eimsk.write(|w| unsafe { w.bits(0b11) });
        Encoder { button }
    }
}

impl InputSource for Encoder {
    fn encoder_delta(&mut self) -> i8 {
        avr_device::interrupt::free(|cs| ENCODER_COUNTS.borrow(cs).replace(0))
    }

    fn button_pressed(&mut self) -> bool {
        self.button.is_low()
    }
}
