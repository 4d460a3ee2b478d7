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
//! Digital clock for vacuum fluorescent display tubes.
//!
//! Everything in this library is hardware independent: the tubes, the RTC,
//! the sensors, the transducer and the encoder are reached through small
//! traits, implemented for the real board in [`board`] and by fakes in the
//! unit tests.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "board", feature(abi_avr_interrupt))]

pub mod adaptive;
pub mod alarm;
pub mod clock;
pub mod countdown;
pub mod display;
pub mod ds3231;
pub mod effect;
pub mod glyph;
pub mod input;
pub mod logging;
pub mod melody;
pub mod menu;
pub mod settings;
pub mod state;
pub mod text;
pub mod time;

#[cfg(feature = "board")]
pub mod board;

#[cfg(test)]
mod test_support;

/// Number of tubes on the board.
pub const DISPLAY_COUNT: usize = 6;

/// Number of alarms kept in the configuration.
pub const ALARM_COUNT: usize = 3;
