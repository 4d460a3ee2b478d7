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

//! Panic report on the serial console, for bench debugging.
//!
//! Based on https://github.com/Rahix/avr-hal/blob/main/examples/arduino-uno/src/bin/uno-panic.rs
//! License MIT

use ufmt::uwriteln;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    avr_device::interrupt::disable();

    // SAFETY: nothing else runs again, so taking the peripherals twice is ok.
    let dp = unsafe { arduino_hal::Peripherals::steal() };
    let pins = arduino_hal::pins!(dp);

    // The tubes must not stay lit on one grid with the boost converter on.
    pins.d5.into_output().set_low();
    pins.d11.into_output().set_high();

    let mut serial = arduino_hal::default_serial!(dp, pins, 19200);
    uwriteln!(&mut serial, "panic\r").ok();
    if let Some(loc) = info.location() {
        uwriteln!(&mut serial, " at {}:{}:{}\r", loc.file(), loc.line(), loc.column()).ok();
    }
    // the watchdog resets us from here
    loop {}
}
