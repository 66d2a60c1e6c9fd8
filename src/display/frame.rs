/*
 *  display/frame.rs
 *
 *  TickerTock - time is money
 *  (c) 2020-26 Stuart Hunter
 *
 *  1bpp framebuffer for embedded-graphics rendering, sized to the
 *  cascaded matrix chain.
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

/// A monochrome framebuffer for embedded-graphics.
#[derive(Debug, Clone)]
pub struct MatrixFrame {
    buf: Vec<BinaryColor>,
    w: u32,
    h: u32,
}

impl MatrixFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: vec![BinaryColor::Off; (width * height) as usize],
            w: width,
            h: height,
        }
    }

    pub fn width(&self) -> u32 {
        self.w
    }

    pub fn height(&self) -> u32 {
        self.h
    }

    /// Blank the frame
    pub fn clear_off(&mut self) {
        self.buf.fill(BinaryColor::Off);
    }

    /// Whether the pixel at (x, y) is lit; out of bounds reads as unlit
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        if x < self.w && y < self.h {
            self.buf[(y * self.w + x) as usize] == BinaryColor::On
        } else {
            false
        }
    }

    /// Number of lit pixels
    pub fn lit_pixels(&self) -> usize {
        self.buf.iter().filter(|c| **c == BinaryColor::On).count()
    }

    /// Overlay a horizontal window of `src` onto this frame: destination
    /// column `x` takes source column `x + offset`. Columns outside the
    /// source stay unlit, which is what a scroll wants.
    pub fn copy_from(&mut self, src: &MatrixFrame, offset: i32) {
        for y in 0..self.h.min(src.h) {
            for x in 0..self.w {
                let sx = x as i32 + offset;
                if sx >= 0 && src.is_set(sx as u32, y) {
                    self.buf[(y * self.w + x) as usize] = BinaryColor::On;
                }
            }
        }
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as u32, p.y as u32);
            if x < self.w && y < self.h {
                return Some((y * self.w + x) as usize);
            }
        }
        None
    }
}

impl OriginDimensions for MatrixFrame {
    fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }
}

impl DrawTarget for MatrixFrame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_and_read_back() {
        let mut frame = MatrixFrame::new(32, 8);
        frame
            .draw_iter([Pixel(Point::new(3, 2), BinaryColor::On)])
            .unwrap();
        assert!(frame.is_set(3, 2));
        assert!(!frame.is_set(2, 3));
        assert_eq!(frame.lit_pixels(), 1);

        frame.clear_off();
        assert_eq!(frame.lit_pixels(), 0);
    }

    #[test]
    fn test_out_of_bounds_draw_is_ignored() {
        let mut frame = MatrixFrame::new(32, 8);
        frame
            .draw_iter([
                Pixel(Point::new(-1, 0), BinaryColor::On),
                Pixel(Point::new(0, 9), BinaryColor::On),
                Pixel(Point::new(32, 0), BinaryColor::On),
            ])
            .unwrap();
        assert_eq!(frame.lit_pixels(), 0);
    }

    #[test]
    fn test_copy_from_offsets() {
        let mut strip = MatrixFrame::new(10, 8);
        strip
            .draw_iter([Pixel(Point::new(0, 0), BinaryColor::On)])
            .unwrap();

        let mut frame = MatrixFrame::new(32, 8);
        // Strip fully off the right edge of the window
        frame.copy_from(&strip, -32);
        assert_eq!(frame.lit_pixels(), 0);

        // Aligned: strip column 0 lands on frame column 0
        frame.copy_from(&strip, 0);
        assert!(frame.is_set(0, 0));

        // Negative offset shifts the strip rightwards
        let mut frame = MatrixFrame::new(32, 8);
        frame.copy_from(&strip, -5);
        assert!(frame.is_set(5, 0));
    }
}
