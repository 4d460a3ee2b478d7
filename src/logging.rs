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
//! Log sinks.
//!
//! The clock logs through any [`ufmt::uWrite`]; on the board that is the
//! serial port. Log writes are best effort and their errors are dropped.

use core::convert::Infallible;

use ufmt::uWrite;

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLog;

impl uWrite for NoLog {
    type Error = Infallible;

    fn write_str(&mut self, _s: &str) -> Result<(), Self::Error> {
        Ok(())
    }
}
