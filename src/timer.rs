// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Timer/Counter 0 keeps the millisecond clock, Timer/Counter 2 paces the
//! tube multiplexer.
//!
//! The millisecond counter follows https://blog.rahix.de/005-avr-hal-millis/

use avr_device::interrupt::Mutex;
use core::cell::Cell;

// 16MHz / 64 prescale / 250 counts = 1 kHz
const TC0_PRESCALER: u32 = 64;
const TC0_COUNTS: u32 = 250;

const MILLIS_INCREMENT: u32 = TC0_PRESCALER * TC0_COUNTS / 16_000;

static MILLIS_COUNTER: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));

#[avr_device::interrupt(atmega328p)]
fn TIMER0_COMPA() {
    avr_device::interrupt::free(|cs| {
        let counter = MILLIS_COUNTER.borrow(cs);
        counter.set(counter.get().wrapping_add(MILLIS_INCREMENT));
    })
}

/// Milliseconds since `init_tc0()`, wrapping after about 49 days.
pub fn millis() -> u32 {
    avr_device::interrupt::free(|cs| MILLIS_COUNTER.borrow(cs).get())
}

/// Start TC0 in CTC mode with a compare interrupt every millisecond.
pub fn init_tc0(tc0: arduino_hal::pac::TC0) {
    tc0.tccr0a.write(|w| w.wgm0().ctc());
    tc0.ocr0a.write(|w| w.bits(TC0_COUNTS as u8 - 1));
    tc0.tccr0b.write(|w| w.cs0().prescale_64());
    tc0.timsk0.write(|w| w.ocie0a().set_bit());

    avr_device::interrupt::free(|cs| {
        MILLIS_COUNTER.borrow(cs).set(0);
    });
}

/// Start TC2 in CTC mode at 16MHz / 128, interrupting every `speed` + 1
/// counts. TIMER2_COMPA lives in main.
pub fn init_tc2(tc2: &arduino_hal::pac::TC2, speed: u8) {
    tc2.tccr2a.write(|w| w.wgm2().ctc());
    tc2.ocr2a.write(|w| w.bits(speed));
    tc2.tccr2b.write(|w| w.cs2().prescale_128());
    tc2.timsk2.write(|w| w.ocie2a().set_bit());
}

/// Change the TC2 compare value. Safe to call from TIMER2_COMPA.
pub fn set_interrupt_speed(tc2: &arduino_hal::pac::TC2, speed: u8) {
    tc2.ocr2a.write(|w| w.bits(speed));
}
