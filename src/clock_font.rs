use embedded_graphics::{
    image::ImageRaw,
    pixelcolor::BinaryColor,
};

// 6x8 digit cells, one byte per row, MSB leftmost. The rightmost column of
// every cell is blank so adjacent digits keep a visible seam.
static DIGIT_GLYPHS: [[u8; 8]; 10] = [
    [0x70, 0x88, 0x98, 0xA8, 0xC8, 0x88, 0x70, 0x00], // 0
    [0x20, 0x60, 0x20, 0x20, 0x20, 0x20, 0x70, 0x00], // 1
    [0x70, 0x88, 0x08, 0x10, 0x20, 0x40, 0xF8, 0x00], // 2
    [0xF8, 0x10, 0x20, 0x10, 0x08, 0x88, 0x70, 0x00], // 3
    [0x10, 0x30, 0x50, 0x90, 0xF8, 0x10, 0x10, 0x00], // 4
    [0xF8, 0x80, 0xF0, 0x08, 0x08, 0x88, 0x70, 0x00], // 5
    [0x30, 0x40, 0x80, 0xF0, 0x88, 0x88, 0x70, 0x00], // 6
    [0xF8, 0x08, 0x10, 0x20, 0x40, 0x40, 0x40, 0x00], // 7
    [0x70, 0x88, 0x88, 0x70, 0x88, 0x88, 0x70, 0x00], // 8
    [0x70, 0x88, 0x88, 0x78, 0x08, 0x10, 0x60, 0x00], // 9
];

// 2-wide separator cells
static COLON_GLYPH: [u8; 8] = [0x00, 0x00, 0xC0, 0x00, 0x00, 0xC0, 0x00, 0x00];
static BLANK_GLYPH: [u8; 8] = [0x00; 8];

/// A struct that encapsulates all necessary data for a specific clock font.
/// Digits and the colon separator carry their own cell widths.
pub struct ClockFontData<'a> {
    pub digit_width: u32,
    pub colon_width: u32,
    pub digit_height: u32,
    digits: [ImageRaw<'a, BinaryColor>; 10],
    colon: ImageRaw<'a, BinaryColor>,
    space: ImageRaw<'a, BinaryColor>,
}

impl<'a> ClockFontData<'a> {
    pub fn new(
        digit_width: u32,
        colon_width: u32,
        digit_height: u32,
        digits: [ImageRaw<'a, BinaryColor>; 10],
        colon: ImageRaw<'a, BinaryColor>,
        space: ImageRaw<'a, BinaryColor>,
    ) -> Self {
        ClockFontData {
            digit_width,
            colon_width,
            digit_height,
            digits,
            colon,
            space,
        }
    }

    /// Retrieves the `ImageRaw` for a given character from this font.
    pub fn get_char_image_raw(&self, character: char) -> Option<&ImageRaw<'a, BinaryColor>> {
        match character {
            '0'..='9' => self.digits.get(character.to_digit(10).unwrap() as usize),
            ':' => Some(&self.colon),
            ' ' => Some(&self.space),
            _ => None, // Character not supported by this font
        }
    }

    /// Horizontal advance for a character cell.
    pub fn advance(&self, character: char) -> u32 {
        match character {
            ':' | ' ' => self.colon_width,
            _ => self.digit_width,
        }
    }
}

/// The bundled matrix font: chunky 6x8 digits with a 2-wide blinking colon.
pub fn font_matrix() -> ClockFontData<'static> {
    ClockFontData::new(
        6,
        2,
        8,
        core::array::from_fn(|i| ImageRaw::new(&DIGIT_GLYPHS[i], 6)),
        ImageRaw::new(&COLON_GLYPH, 2),
        ImageRaw::new(&BLANK_GLYPH, 2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_covers_clock_characters() {
        let font = font_matrix();
        for c in "0123456789: ".chars() {
            assert!(font.get_char_image_raw(c).is_some(), "missing glyph {:?}", c);
        }
        assert!(font.get_char_image_raw('x').is_none());
    }

    #[test]
    fn test_advances() {
        let font = font_matrix();
        assert_eq!(font.advance('0'), 6);
        assert_eq!(font.advance(':'), 2);
        assert_eq!(font.advance(' '), 2);
    }
}
