/*
 *  display/drivers/max7219.rs
 *
 *  TickerTock - time is money
 *  (c) 2020-26 Stuart Hunter
 *
 *  MAX7219 cascaded 8x8 LED matrix driver over spidev
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

use embedded_hal::spi::SpiDevice;
use linux_embedded_hal::SpidevDevice;
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use log::info;

use crate::display::error::DisplayError;
use crate::display::frame::MatrixFrame;
use crate::display::traits::{DisplayCapabilities, MatrixDriver};

const REG_DIGIT0: u8 = 0x01;
const REG_DECODE_MODE: u8 = 0x09;
const REG_INTENSITY: u8 = 0x0A;
const REG_SCAN_LIMIT: u8 = 0x0B;
const REG_SHUTDOWN: u8 = 0x0C;
const REG_DISPLAY_TEST: u8 = 0x0F;

/// One row byte for a single 8x8 block of the chain. The MAX7219 digit
/// register holds one row, MSB leftmost; `rotation` compensates for
/// modules wired with the chip mounted sideways.
pub(crate) fn pack_row(frame: &MatrixFrame, block: usize, row: usize, rotation: i16) -> u8 {
    let mut byte = 0u8;
    for col in 0..8usize {
        let (sx, sy) = match rotation {
            90 => (row, 7 - col),
            -90 => (7 - row, col),
            _ => (col, row),
        };
        if frame.is_set((block * 8 + sx) as u32, sy as u32) {
            byte |= 0x80 >> col;
        }
    }
    byte
}

/// Driver for a chain of MAX7219 8x8 LED matrix blocks on spidev.
pub struct Max7219 {
    spi: SpidevDevice,
    capabilities: DisplayCapabilities,
    blocks: usize,
    block_rotation: i16,
    reverse_blocks: bool,
}

impl Max7219 {
    pub fn new(
        bus: &str,
        speed_hz: u32,
        blocks: u32,
        block_rotation: i16,
        reverse_blocks: bool,
    ) -> Result<Self, DisplayError> {
        if blocks == 0 {
            return Err(DisplayError::InvalidConfiguration(
                "at least one cascaded block required".to_string(),
            ));
        }
        if !matches!(block_rotation, 0 | 90 | -90) {
            return Err(DisplayError::InvalidConfiguration(format!(
                "block rotation must be 0, 90 or -90 (got {})",
                block_rotation
            )));
        }

        let mut spi = SpidevDevice::open(bus)
            .map_err(|e| DisplayError::SpiError(format!("{} open failed: {:?}", bus, e)))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.0
            .configure(&options)
            .map_err(|e| DisplayError::SpiError(format!("{} configure failed: {}", bus, e)))?;

        info!("MAX7219 chain on {}: {} blocks @ {} Hz", bus, blocks, speed_hz);

        Ok(Self {
            spi,
            capabilities: DisplayCapabilities {
                width: blocks * 8,
                height: 8,
                cascaded_blocks: blocks,
                supports_contrast: true,
            },
            blocks: blocks as usize,
            block_rotation,
            reverse_blocks,
        })
    }

    /// Write the same register/value pair to every chip in the chain.
    fn write_all_blocks(&mut self, register: u8, value: u8) -> Result<(), DisplayError> {
        let mut buf = Vec::with_capacity(self.blocks * 2);
        for _ in 0..self.blocks {
            buf.push(register);
            buf.push(value);
        }
        self.spi.write(&buf)?;
        Ok(())
    }
}

impl MatrixDriver for Max7219 {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.write_all_blocks(REG_DISPLAY_TEST, 0x00)?;
        self.write_all_blocks(REG_SCAN_LIMIT, 0x07)?;
        self.write_all_blocks(REG_DECODE_MODE, 0x00)?;
        self.write_all_blocks(REG_SHUTDOWN, 0x01)?;
        self.clear()
    }

    fn set_contrast(&mut self, value: u8) -> Result<(), DisplayError> {
        // 0-255 mapped onto the chip's 4-bit intensity register
        self.write_all_blocks(REG_INTENSITY, value >> 4)
    }

    fn write_frame(&mut self, frame: &MatrixFrame) -> Result<(), DisplayError> {
        let expected = (self.capabilities.width * self.capabilities.height) as usize;
        let actual = (frame.width() * frame.height()) as usize;
        if expected != actual {
            return Err(DisplayError::BufferSizeMismatch { expected, actual });
        }

        // One transfer per row; the first register/value pair shifted out
        // ends up in the furthest chip of the chain.
        for row in 0..8usize {
            let mut buf = Vec::with_capacity(self.blocks * 2);
            let blocks: Vec<usize> = if self.reverse_blocks {
                (0..self.blocks).collect()
            } else {
                (0..self.blocks).rev().collect()
            };
            for block in blocks {
                buf.push(REG_DIGIT0 + row as u8);
                buf.push(pack_row(frame, block, row, self.block_rotation));
            }
            self.spi.write(&buf)?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        for row in 0..8u8 {
            self.write_all_blocks(REG_DIGIT0 + row, 0x00)?;
        }
        Ok(())
    }

    fn power(&mut self, on: bool) -> Result<(), DisplayError> {
        self.write_all_blocks(REG_SHUTDOWN, if on { 0x01 } else { 0x00 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::BinaryColor;
    use embedded_graphics::prelude::*;

    fn frame_with(pixels: &[(i32, i32)]) -> MatrixFrame {
        let mut frame = MatrixFrame::new(32, 8);
        frame
            .draw_iter(
                pixels
                    .iter()
                    .map(|(x, y)| Pixel(Point::new(*x, *y), BinaryColor::On)),
            )
            .unwrap();
        frame
    }

    #[test]
    fn test_pack_row_upright() {
        let frame = frame_with(&[(0, 0), (9, 2)]);
        // Top-left pixel of block 0
        assert_eq!(pack_row(&frame, 0, 0, 0), 0x80);
        assert_eq!(pack_row(&frame, 0, 1, 0), 0x00);
        // Column 1 of block 1, row 2
        assert_eq!(pack_row(&frame, 1, 2, 0), 0x40);
        assert_eq!(pack_row(&frame, 2, 2, 0), 0x00);
    }

    #[test]
    fn test_pack_row_rotated() {
        let frame = frame_with(&[(0, 0)]);
        // Rotated -90, the logical top-left lands in the last digit row
        assert_eq!(pack_row(&frame, 0, 7, -90), 0x80);
        for row in 0..7 {
            assert_eq!(pack_row(&frame, 0, row, -90), 0x00);
        }
        // Rotated +90, it lands at the end of digit row 0
        assert_eq!(pack_row(&frame, 0, 0, 90), 0x01);
    }
}
