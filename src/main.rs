/*
 vfdclock

 Firmware for a six tube vacuum fluorescent display clock with a DS3231
 real time clock, a rotary encoder and a piezo transducer.

 Target: ATmega328P, clock at 16 MHz.

 This program is free software: you can redistribute it and/or modify
 it under the terms of the GNU General Public License as published by
 the Free Software Foundation, either version 3 of the License, or
 (at your option) any later version.

 This program is distributed in the hope that it will be useful,
 but WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 GNU General Public License for more details.

 You should have received a copy of the GNU General Public License
 along with this program.  If not, see <http://www.gnu.org/licenses/>.

 */

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]

mod timer;

#[cfg(feature = "panic-serial")]
mod panic;
#[cfg(not(feature = "panic-serial"))]
use panic_halt as _;

use core::cell::RefCell;

use arduino_hal::hal::port::{PB0, PB1, PB2, PB3, PB4};
use arduino_hal::hal::wdt;
use arduino_hal::port::mode::Output;
use arduino_hal::port::Pin;
use avr_device::interrupt::Mutex;
use ufmt::uwriteln;

use vfdclock::board::{AnalogSensors, Buzzer, Encoder, HighVoltage, OnboardEeprom};
use vfdclock::clock::{Controller, Hardware};
use vfdclock::display::{DisplayBuffer, Multiplexer, ShiftRegisterDriver, INTERRUPT_SLOW};
use vfdclock::ds3231::Ds3231;

type Driver =
    ShiftRegisterDriver<Pin<Output, PB2>, Pin<Output, PB0>, Pin<Output, PB1>, Pin<Output, PB3>>;

/// Everything the multiplex interrupt owns.
struct Tubes {
    mux: Multiplexer,
    driver: Driver,
    ac: Pin<Output, PB4>,
    tc2: arduino_hal::pac::TC2,
}

static DISPLAY: DisplayBuffer = DisplayBuffer::new();
static TUBES: Mutex<RefCell<Option<Tubes>>> = Mutex::new(RefCell::new(None));

/// Timer/Counter 2 Compare Match A: one multiplex step.
#[avr_device::interrupt(atmega328p)]
fn TIMER2_COMPA() {
    let frame = DISPLAY.snapshot();
    avr_device::interrupt::free(|cs| {
        if let Some(tubes) = TUBES.borrow(cs).borrow_mut().as_mut() {
            tubes.mux.tick(&frame, &mut tubes.driver);
            tubes.ac.toggle();
            timer::set_interrupt_speed(&tubes.tc2, frame.interrupt_speed());
        }
    })
}

#[arduino_hal::entry]
fn main() -> ! {
    let dp = arduino_hal::Peripherals::take().unwrap();
    let pins = arduino_hal::pins!(dp);

    // Armed first: after a watchdog reset the shortest timeout is running.
    let mut watchdog = wdt::Wdt::new(dp.WDT, &dp.CPU.mcusr);
    watchdog.start(wdt::Timeout::Ms2000).unwrap();

    let mut serial = arduino_hal::default_serial!(dp, pins, 19200);
    uwriteln!(&mut serial, "vfdclock {}\r", env!("CARGO_PKG_VERSION")).ok();

    // Supply off before anything can light a tube.
    let power = HighVoltage::new(pins.d5.into_output(), pins.d6.into_output());

    let driver = ShiftRegisterDriver::new(
        pins.d10.into_output(),
        pins.d8.into_output(),
        pins.d9.into_output(),
        pins.d11.into_output(),
    );
    timer::init_tc2(&dp.TC2, INTERRUPT_SLOW);
    avr_device::interrupt::free(|cs| {
        TUBES.borrow(cs).replace(Some(Tubes {
            mux: Multiplexer::new(),
            driver,
            ac: pins.d12.into_output(),
            tc2: dp.TC2,
        }));
    });
    timer::init_tc0(dp.TC0);

    let i2c = arduino_hal::I2c::new(
        dp.TWI,
        pins.a4.into_pull_up_input(),
        pins.a5.into_pull_up_input(),
        50000,
    );

    let mut adc = arduino_hal::Adc::new(dp.ADC, Default::default());
    let light = pins.a3.into_analog_input(&mut adc);
    let battery = pins.a2.into_analog_input(&mut adc);

    let mut hw = Hardware {
        rtc: Ds3231::new(i2c),
        sensors: AnalogSensors::new(adc, light, battery),
        audio: Buzzer::new(
            dp.TC1,
            pins.d13.into_output(),
            pins.a0.into_output(),
            pins.a1.into_output(),
        ),
        input: Encoder::new(
            &dp.EXINT,
            pins.d2.into_pull_up_input(),
            pins.d3.into_pull_up_input(),
            pins.d4.into_pull_up_input(),
        ),
        power,
        eeprom: OnboardEeprom::new(arduino_hal::Eeprom::new(dp.EEPROM)),
    };

    let mut clock = Controller::boot(&mut hw.eeprom, &mut serial);

    // SAFETY: every static the interrupts touch is initialised above.
    unsafe { avr_device::interrupt::enable() };

    loop {
        let frame = clock.poll(&mut hw, timer::millis(), &mut serial);
        DISPLAY.publish(frame);
        watchdog.feed();
    }
}
