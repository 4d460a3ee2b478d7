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
//! Character to segment lookup.
//!
//! Each tube has seven segments and a decimal point:
//!
//! ```text
//!  777777
//!  6    5
//!  6    5
//!  444444
//!  3    2
//!  3    2 00
//!  111111 00
//! ```
//!
//! where bit `n` of the bitmap drives segment `n`.

use crate::DISPLAY_COUNT;

/// Segment bitmaps for a whole display, leftmost tube first.
pub type Glyphs = [u8; DISPLAY_COUNT];

/// All tubes dark.
pub const BLANK: Glyphs = [0; DISPLAY_COUNT];

/// Character code of the "all segments on" glyph.
pub const FULL_BLOCK: u8 = 0x7F;

pub const DECIMAL_POINT: u8 = 1 << 0;
pub const SEG_BOTTOM: u8 = 1 << 1;
pub const SEG_LOWER_RIGHT: u8 = 1 << 2;
pub const SEG_LOWER_LEFT: u8 = 1 << 3;
pub const SEG_MIDDLE: u8 = 1 << 4;
pub const SEG_UPPER_RIGHT: u8 = 1 << 5;
pub const SEG_UPPER_LEFT: u8 = 1 << 6;
pub const SEG_TOP: u8 = 1 << 7;

const FIRST: u8 = 0x20;

static BITMAP: [u8; 96] = [
    0x00, 0x21, 0x60, 0x58, 0xD6, 0x39, 0xC6, 0x20, //  !"#$%&'
    0x48, 0x24, 0xF0, 0x34, 0x03, 0x10, 0x01, 0x38, // ()*+,-./
    0xEE, 0x24, 0xBA, 0xB6, 0x74, 0xD6, 0xDE, 0xA4, // 01234567
    0xFE, 0xF6, 0x82, 0x86, 0x3A, 0x12, 0x56, 0xB9, // 89:;<=>?
    0xBE, 0xFC, 0x5E, 0xCA, 0x3E, 0xDA, 0xD8, 0xF6, // @ABCDEFG
    0x7C, 0x24, 0x2E, 0x7C, 0x4A, 0xEC, 0xEC, 0xEE, // HIJKLMNO
    0xF8, 0xF4, 0xC8, 0xD6, 0x5A, 0x6E, 0x6E, 0x6E, // PQRSTUVW
    0x7C, 0x76, 0xBA, 0xCA, 0x54, 0xA6, 0xE0, 0x02, // XYZ[\]^_
    0x40, 0xBE, 0x5E, 0x1A, 0x3E, 0xFA, 0xD8, 0xF6, // `abcdefg
    0x5C, 0x04, 0x2E, 0x7C, 0x4A, 0x1C, 0x1C, 0x1E, // hijklmno
    0xF8, 0xF4, 0x18, 0xD6, 0x5A, 0x0E, 0x0E, 0x0E, // pqrstuvw
    0x7C, 0x76, 0xBA, 0x08, 0x48, 0x04, 0x80, 0xFF, // xyz{|}~█
];

/// Segment bitmap for `c`. Anything outside `0x20..=0x7F` is blank.
pub fn encode(c: u8) -> u8 {
    match c {
        FIRST..=FULL_BLOCK => BITMAP[usize::from(c - FIRST)],
        _ => 0,
    }
}

/// Segment bitmap for the last decimal digit of `n`.
pub fn digit(n: u8) -> u8 {
    encode(b'0' + n % 10)
}

/// Encode up to [`DISPLAY_COUNT`] characters, padding with blanks.
pub fn encode_text(text: &[u8]) -> Glyphs {
    let mut glyphs = BLANK;
    for (glyph, &c) in glyphs.iter_mut().zip(text) {
        *glyph = encode(c);
    }
    glyphs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_and_letters() {
        let expected = [0xEE, 0x24, 0xBA, 0xB6, 0x74, 0xD6, 0xDE, 0xA4, 0xFE, 0xF6];
        for (n, bitmap) in expected.into_iter().enumerate() {
            assert_eq!(digit(n as u8), bitmap);
            assert_eq!(encode(b'0' + n as u8), bitmap);
        }
        assert_eq!(encode(b'A'), 0xFC);
        assert_eq!(encode(b'a'), 0xBE);
        assert_eq!(encode(b'-'), SEG_MIDDLE);
        assert_eq!(encode(b'.'), DECIMAL_POINT);
        assert_eq!(encode(b'_'), SEG_BOTTOM);
        assert_eq!(encode(b'~'), SEG_TOP);
    }

    #[test]
    fn whole_supported_range_comes_from_table() {
        for c in FIRST..=FULL_BLOCK {
            assert_eq!(encode(c), BITMAP[usize::from(c - 0x20)]);
        }
        assert_eq!(encode(b' '), 0);
        assert_eq!(encode(FULL_BLOCK), 0xFF);
    }

    #[test]
    fn outside_range_is_blank() {
        for c in (0x00..FIRST).chain(0x80..=0xFF) {
            assert_eq!(encode(c), 0, "code {c:#x}");
        }
    }

    #[test]
    fn text_is_padded() {
        assert_eq!(
            encode_text(b"12"),
            [0x24, 0xBA, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(encode_text(b"1234567"), encode_text(b"123456"));
    }
}
