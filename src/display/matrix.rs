/*
 *  display/matrix.rs
 *
 *  TickerTock - time is money
 *  (c) 2020-26 Stuart Hunter
 *
 *  Matrix renderer: clock face, slide animations, and the scrolling
 *  message primitive.
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

use chrono::Local;
use embedded_graphics::image::Image;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_5X8;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use std::time::Duration;

use crate::clock_font::{ClockFontData, font_matrix};
use crate::display::error::DisplayError;
use crate::display::frame::MatrixFrame;
use crate::display::traits::BoxedDriver;
use crate::glyphs;

// Clock layout on the 32x8 chain
const HOURS_X: i32 = 1;
const COLON_X: i32 = 15;
const MINUTES_X: i32 = 18;

// Horizontal advance in the scrolled message font
const TEXT_ADVANCE: i32 = 5;
const GLYPH_ADVANCE: i32 = 6;

/// Renderer owning the driver and the working framebuffer.
pub struct MatrixDisplay {
    driver: BoxedDriver,
    frame: MatrixFrame,
    font: ClockFontData<'static>,
    scroll_delay: Duration,
    step_delay: Duration,
}

impl MatrixDisplay {
    pub fn new(
        mut driver: BoxedDriver,
        contrast: u8,
        scroll_delay: Duration,
    ) -> Result<Self, DisplayError> {
        driver
            .init()
            .map_err(|e| DisplayError::InitializationFailed(e.to_string()))?;
        driver.set_contrast(contrast)?;

        let (width, height) = driver.dimensions();
        Ok(Self {
            frame: MatrixFrame::new(width, height),
            driver,
            font: font_matrix(),
            scroll_delay,
            step_delay: Duration::from_millis(100),
        })
    }

    fn draw_clock_text(&mut self, text: &str, x: i32, y: i32) {
        let mut cursor = x;
        for c in text.chars() {
            if let Some(raw) = self.font.get_char_image_raw(c) {
                let _ = Image::new(raw, Point::new(cursor, y)).draw(&mut self.frame);
            }
            cursor += self.font.advance(c) as i32 + 1;
        }
    }

    /// Compose and flush one clock frame. The time is re-read on every
    /// call so mid-animation frames pick up a minute change naturally.
    fn compose_clock(&mut self, base_y: i32, minute_y: i32, colon: bool) -> Result<(), DisplayError> {
        let now = Local::now();
        let hours = now.format("%H").to_string();
        let minutes = now.format("%M").to_string();

        self.frame.clear_off();
        self.draw_clock_text(&hours, HOURS_X, base_y);
        self.draw_clock_text(if colon { ":" } else { " " }, COLON_X, base_y);
        self.draw_clock_text(&minutes, MINUTES_X, minute_y);
        self.driver.write_frame(&self.frame)
    }

    /// One normal clock redraw
    pub fn tick(&mut self, colon: bool) -> Result<(), DisplayError> {
        self.compose_clock(0, 0, colon)
    }

    /// Slide the clock up into view from below
    pub async fn rise(&mut self) -> Result<(), DisplayError> {
        for y in (0..=8).rev() {
            self.compose_clock(y, y, true)?;
            tokio::time::sleep(self.step_delay).await;
        }
        Ok(())
    }

    /// Slide the clock down out of view
    pub async fn sink(&mut self) -> Result<(), DisplayError> {
        for y in 0..=8 {
            self.compose_clock(y, y, true)?;
            tokio::time::sleep(self.step_delay).await;
        }
        Ok(())
    }

    /// Minute-change animation: the minute digits slide out the bottom
    /// and back in carrying the fresh value.
    pub async fn minute_roll(&mut self) -> Result<(), DisplayError> {
        for y in 1..=8 {
            self.compose_clock(0, y, true)?;
            tokio::time::sleep(self.step_delay).await;
        }
        for y in (0..8).rev() {
            self.compose_clock(0, y, true)?;
            tokio::time::sleep(self.step_delay).await;
        }
        Ok(())
    }

    fn message_width(msg: &str) -> i32 {
        msg.chars()
            .map(|c| {
                if glyphs::glyph_for_char(c).is_some() {
                    GLYPH_ADVANCE
                } else {
                    TEXT_ADVANCE
                }
            })
            .sum()
    }

    /// Render the message once into an off-screen strip; trend marker
    /// characters become their bitmaps, everything else the 5x8 text font.
    fn render_message(&self, msg: &str) -> MatrixFrame {
        let width = Self::message_width(msg).max(1) as u32;
        let mut strip = MatrixFrame::new(width, self.frame.height());
        let style = MonoTextStyle::new(&FONT_5X8, BinaryColor::On);

        let mut x = 0i32;
        let mut utf8 = [0u8; 4];
        for c in msg.chars() {
            if let Some(raw) = glyphs::glyph_for_char(c) {
                let _ = Image::new(&raw, Point::new(x, 0)).draw(&mut strip);
                x += GLYPH_ADVANCE;
            } else {
                let _ = Text::with_baseline(
                    c.encode_utf8(&mut utf8),
                    Point::new(x, 0),
                    style,
                    Baseline::Top,
                )
                .draw(&mut strip);
                x += TEXT_ADVANCE;
            }
        }
        strip
    }

    /// Scroll a message across the matrix, one pixel per frame, for the
    /// given number of full passes.
    pub async fn show_message(&mut self, msg: &str, passes: u32) -> Result<(), DisplayError> {
        let strip = self.render_message(msg);
        let window = self.frame.width() as i32;

        for _ in 0..passes {
            for offset in -window..=(strip.width() as i32) {
                self.frame.clear_off();
                self.frame.copy_from(&strip, offset);
                self.driver.write_frame(&self.frame)?;
                tokio::time::sleep(self.scroll_delay).await;
            }
        }
        Ok(())
    }

    /// Blank the panel
    pub fn blank(&mut self) -> Result<(), DisplayError> {
        self.driver.clear()
    }

    /// Panel power control; drivers without support report Unsupported
    pub fn power(&mut self, on: bool) -> Result<(), DisplayError> {
        self.driver.power(on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::{MockDriver, MockDriverState};
    use std::sync::{Arc, Mutex};

    fn mock_display() -> (MatrixDisplay, Arc<Mutex<MockDriverState>>) {
        let driver = MockDriver::new(32, 8);
        let state = driver.state();
        let mut display =
            MatrixDisplay::new(Box::new(driver), 16, Duration::ZERO).unwrap();
        display.step_delay = Duration::ZERO;
        (display, state)
    }

    #[test]
    fn test_new_initializes_driver() {
        let (_display, state) = mock_display();
        let s = state.lock().unwrap();
        assert_eq!(s.init_count, 1);
        assert_eq!(s.last_contrast, Some(16));
    }

    #[test]
    fn test_tick_flushes_one_lit_frame() {
        let (mut display, state) = mock_display();
        display.tick(true).unwrap();

        let s = state.lock().unwrap();
        assert_eq!(s.flush_count, 1);
        assert!(s.lit_pixels() > 0);
    }

    #[test]
    fn test_colon_blink_changes_frame() {
        let (mut display, state) = mock_display();

        display.tick(true).unwrap();
        let with_colon = state.lock().unwrap().last_frame.clone();
        display.tick(false).unwrap();
        let without_colon = state.lock().unwrap().last_frame.clone();

        assert_ne!(with_colon, without_colon);
    }

    #[tokio::test]
    async fn test_slide_animations_step_once_per_pixel() {
        let (mut display, state) = mock_display();

        display.rise().await.unwrap();
        assert_eq!(state.lock().unwrap().flush_count, 9);

        display.sink().await.unwrap();
        assert_eq!(state.lock().unwrap().flush_count, 18);

        // fully sunk clock leaves the panel dark
        assert_eq!(state.lock().unwrap().lit_pixels(), 0);
    }

    #[tokio::test]
    async fn test_minute_roll_frame_count() {
        let (mut display, state) = mock_display();
        display.minute_roll().await.unwrap();
        assert_eq!(state.lock().unwrap().flush_count, 16);
    }

    #[tokio::test]
    async fn test_show_message_scrolls_full_span() {
        let (mut display, state) = mock_display();

        // Two 5-wide characters: 10px strip, 32px window
        display.show_message("AB", 1).await.unwrap();
        assert_eq!(state.lock().unwrap().flush_count, 10 + 32 + 1);

        // Second pass doubles the frames
        display.show_message("AB", 2).await.unwrap();
        assert_eq!(state.lock().unwrap().flush_count, 43 + 2 * 43);
    }

    #[test]
    fn test_message_width_counts_glyphs_wider() {
        use crate::glyphs::TREND_UP_CHAR;
        assert_eq!(MatrixDisplay::message_width("AB"), 10);
        let msg = format!("A{}B", TREND_UP_CHAR);
        assert_eq!(MatrixDisplay::message_width(&msg), 16);
    }

    #[test]
    fn test_render_message_draws_trend_glyph() {
        let (display, _state) = mock_display();
        let strip = display.render_message(&crate::glyphs::TREND_UP_CHAR.to_string());
        assert!(strip.lit_pixels() > 0);
    }
}
