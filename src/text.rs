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
//! Screen text for `ufmt`, sized for the tubes.

use heapless::String;
use ufmt::{uDisplay, uWrite, Formatter};

use crate::glyph::{encode_text, Glyphs};
use crate::DISPLAY_COUNT;

/// Text for one screen of tubes. Writes past the last tube fail.
pub type ScreenText = String<DISPLAY_COUNT>;

/// Append ASCII bytes, stopping at the first one that does not fit.
pub fn push_bytes<const N: usize>(text: &mut String<N>, bytes: &[u8]) {
    for &c in bytes {
        if text.push(char::from(c)).is_err() {
            return;
        }
    }
}

pub trait ToGlyphs {
    fn glyphs(&self) -> Glyphs;
}

impl<const N: usize> ToGlyphs for String<N> {
    fn glyphs(&self) -> Glyphs {
        encode_text(self.as_bytes())
    }
}

/// Two digit, zero padded decimal.
pub struct TwoDigits(pub u8);

impl uDisplay for TwoDigits {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        let value = self.0 % 100;
        f.write_char(char::from(b'0' + value / 10))?;
        f.write_char(char::from(b'0' + value % 10))
    }
}

/// Two digit decimal with the leading zero blanked.
pub struct SpacePadded(pub u8);

impl uDisplay for SpacePadded {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        let value = self.0 % 100;
        if value < 10 {
            f.write_char(' ')?;
        } else {
            f.write_char(char::from(b'0' + value / 10))?;
        }
        f.write_char(char::from(b'0' + value % 10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ufmt::uwrite;

    #[test]
    fn digits_are_padded() {
        let mut text = ScreenText::new();
        uwrite!(&mut text, "{}{}{}", TwoDigits(7), SpacePadded(7), SpacePadded(12)).ok();
        assert_eq!(text.as_bytes(), b"07 712");
    }

    #[test]
    fn overflow_is_reported() {
        let mut text = String::<3>::new();
        assert!(uwrite!(&mut text, "abcdef").is_err());
        push_bytes(&mut text, b"xyz");
        assert_eq!(text.len(), 3);
    }

    #[test]
    fn short_text_is_blank_padded() {
        let mut text = ScreenText::new();
        push_bytes(&mut text, b"12");
        assert_eq!(text.glyphs(), encode_text(b"12    "));
    }
}
