/*
 *  glyphs.rs
 *
 *  TickerTock - time is money
 *  (c) 2020-26 Stuart Hunter
 *
 *  Trend indicator glyphs for the scrolled ticker message.
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use embedded_graphics::image::ImageRaw;
use embedded_graphics::pixelcolor::BinaryColor;

use crate::quote::Trend;

/// Marker characters spliced into ticker messages; the message renderer
/// swaps them for the bitmaps below.
pub const TREND_UP_CHAR: char = '\u{25B2}'; // ▲
pub const TREND_DOWN_CHAR: char = '\u{25BC}'; // ▼
pub const TREND_CLOSED_CHAR: char = '\u{25CF}'; // ● market closed

// 5x8 cells, one byte per row, MSB leftmost
pub const GLYPH_TREND_UP: [u8; 8] = [0x00, 0x20, 0x20, 0x70, 0x70, 0xF8, 0x00, 0x00];
pub const GLYPH_TREND_DOWN: [u8; 8] = [0x00, 0xF8, 0x70, 0x70, 0x20, 0x20, 0x00, 0x00];
pub const GLYPH_TREND_CLOSED: [u8; 8] = [0x00, 0x00, 0x70, 0xF8, 0xF8, 0x70, 0x00, 0x00];

/// Marker character for a trend. Unknown and Error fall back to plain
/// text the message font can render.
pub fn trend_marker(trend: Trend) -> char {
    match trend {
        Trend::Up => TREND_UP_CHAR,
        Trend::Down => TREND_DOWN_CHAR,
        Trend::Closed => TREND_CLOSED_CHAR,
        Trend::Unknown => '-',
        Trend::Error => '!',
    }
}

/// Bitmap for a marker character, if it has one.
pub fn glyph_for_char(c: char) -> Option<ImageRaw<'static, BinaryColor>> {
    match c {
        TREND_UP_CHAR => Some(ImageRaw::new(&GLYPH_TREND_UP, 5)),
        TREND_DOWN_CHAR => Some(ImageRaw::new(&GLYPH_TREND_DOWN, 5)),
        TREND_CLOSED_CHAR => Some(ImageRaw::new(&GLYPH_TREND_CLOSED, 5)),
        _ => None,
    }
}
