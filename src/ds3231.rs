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
//! DS3231 RTC interface

use embedded_hal::i2c::I2c;

use crate::time::{to_24_hour, Cycle, DateTime, Rtc};

// 104 is the DS3231 RTC device address
const RTC_ADDRESS: u8 = 104;

const REG_SECONDS: u8 = 0x00;
const REG_TEMPERATURE: u8 = 0x11;

const HOUR_12: u8 = 0b0100_0000;
const HOUR_PM: u8 = 0b0010_0000;

fn bcd_encode(v: u8) -> u8 {
    let t = v / 10;
    let o = v - t * 10;
    (t << 4) | o
}

fn bcd_decode(v: u8) -> u8 {
    ((v & 0b11110000) >> 4) * 10 + (v & 0b00001111)
}

/// The onboard DS3231.
pub struct Ds3231<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Ds3231<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Ds3231 { i2c }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> Rtc for Ds3231<I2C> {
    type Error = I2C::Error;

    fn read(&mut self) -> Result<DateTime, Self::Error> {
        let mut buf = [0u8; 7];
        self.i2c.write_read(RTC_ADDRESS, &[REG_SECONDS], &mut buf)?;

        let hour = if buf[2] & HOUR_12 != 0 {
            // someone else left the chip in 12 hour mode
            let cycle = if buf[2] & HOUR_PM != 0 { Cycle::PM } else { Cycle::AM };
            to_24_hour(bcd_decode(buf[2] & 0b0001_1111), cycle)
        } else {
            bcd_decode(buf[2] & 0b0011_1111)
        };

        Ok(DateTime {
            second: bcd_decode(buf[0] & 0b0111_1111),
            minute: bcd_decode(buf[1] & 0b0111_1111),
            hour,
            weekday: buf[3] & 0b0000_0111,
            day: bcd_decode(buf[4] & 0b0011_1111),
            // bit 7 is the century flag, the clock only knows 2000 to 2099
            month: bcd_decode(buf[5] & 0b0001_1111),
            year: bcd_decode(buf[6]),
        })
    }

    fn write(&mut self, rtc: &DateTime) -> Result<(), Self::Error> {
        let buf: [u8; 8] = [
            REG_SECONDS,
            bcd_encode(rtc.second),
            bcd_encode(rtc.minute),
            bcd_encode(rtc.hour),
            rtc.weekday,
            bcd_encode(rtc.day),
            bcd_encode(rtc.month),
            bcd_encode(rtc.year),
        ];
        self.i2c.write(RTC_ADDRESS, &buf)
    }

    fn temperature(&mut self) -> Result<i16, Self::Error> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(RTC_ADDRESS, &[REG_TEMPERATURE], &mut buf)?;
        // integer degrees in the first register, quarters in the top two
        // bits of the second
        Ok(i16::from(buf[0] as i8) * 4 + i16::from(buf[1] >> 6))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::i2c::{ErrorType, Operation, SevenBitAddress};

    /// Register file with the DS3231's auto-incrementing register pointer.
    struct FakeChip {
        registers: [u8; 0x13],
        pointer: usize,
    }

    impl ErrorType for FakeChip {
        type Error = Infallible;
    }

    impl I2c for FakeChip {
        fn transaction(
            &mut self,
            address: SevenBitAddress,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            assert_eq!(address, RTC_ADDRESS);
            for operation in operations {
                match operation {
                    Operation::Write(bytes) => {
                        self.pointer = usize::from(bytes[0]);
                        for &b in &bytes[1..] {
                            self.registers[self.pointer] = b;
                            self.pointer += 1;
                        }
                    }
                    Operation::Read(buf) => {
                        for b in buf.iter_mut() {
                            *b = self.registers[self.pointer];
                            self.pointer += 1;
                        }
                    }
                }
            }
            Ok(())
        }
    }

    fn chip() -> FakeChip {
        FakeChip {
            registers: [0; 0x13],
            pointer: 0,
        }
    }

    #[test]
    fn bcd() {
        assert_eq!(bcd_encode(59), 0x59);
        assert_eq!(bcd_decode(0x59), 59);
        assert_eq!(bcd_encode(7), 0x07);
    }

    #[test]
    fn write_then_read() {
        let mut rtc = Ds3231::new(chip());
        let time = DateTime {
            year: 24,
            month: 12,
            day: 31,
            weekday: 3,
            hour: 23,
            minute: 59,
            second: 58,
        };
        rtc.write(&time).unwrap();
        assert_eq!(rtc.read().unwrap(), time);
        let chip = rtc.release();
        assert_eq!(&chip.registers[..7], &[0x58, 0x59, 0x23, 3, 0x31, 0x12, 0x24]);
    }

    #[test]
    fn twelve_hour_register() {
        let mut c = chip();
        c.registers[2] = HOUR_12 | HOUR_PM | 0x11;
        c.registers[3] = 1;
        c.registers[4] = 1;
        c.registers[5] = 1;
        assert_eq!(Ds3231::new(c).read().unwrap().hour, 23);
    }

    #[test]
    fn temperature_quarters() {
        let mut c = chip();
        c.registers[0x11] = 22;
        c.registers[0x12] = 0b0100_0000;
        let mut rtc = Ds3231::new(c);
        assert_eq!(rtc.temperature().unwrap(), 89);

        let mut c = rtc.release();
        c.registers[0x11] = 0xFF;
        c.registers[0x12] = 0b1100_0000;
        assert_eq!(Ds3231::new(c).temperature().unwrap(), -1);
    }
}
