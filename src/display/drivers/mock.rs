/*
 *  display/drivers/mock.rs
 *
 *  TickerTock - time is money
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock matrix driver for testing without hardware
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

use std::sync::{Arc, Mutex};

use crate::display::error::DisplayError;
use crate::display::frame::MatrixFrame;
use crate::display::traits::{DisplayCapabilities, MatrixDriver};

/// Mock matrix driver
///
/// Simulates a display without hardware for unit tests and development
/// machines. Records all operations and keeps the last flushed frame
/// for verification.
pub struct MockDriver {
    capabilities: DisplayCapabilities,
    state: Arc<Mutex<MockDriverState>>,
}

/// Internal state for the mock driver (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockDriverState {
    /// Number of times init() was called
    pub init_count: usize,

    /// Number of frames flushed via write_frame()
    pub flush_count: usize,

    /// Number of times clear() was called
    pub clear_count: usize,

    /// Last contrast value set
    pub last_contrast: Option<u8>,

    /// Last power state set
    pub powered: Option<bool>,

    /// Pixels of the last flushed frame, row-major
    pub last_frame: Vec<bool>,

    /// Simulate failures (for error testing)
    pub simulate_flush_failure: bool,
}

impl MockDriverState {
    pub fn lit_pixels(&self) -> usize {
        self.last_frame.iter().filter(|p| **p).count()
    }
}

impl MockDriver {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            capabilities: DisplayCapabilities {
                width,
                height,
                cascaded_blocks: width / 8,
                supports_contrast: true,
            },
            state: Arc::new(Mutex::new(MockDriverState::default())),
        }
    }

    /// Shared handle onto the recorded state
    pub fn state(&self) -> Arc<Mutex<MockDriverState>> {
        Arc::clone(&self.state)
    }
}

impl MatrixDriver for MockDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.state.lock().unwrap().init_count += 1;
        Ok(())
    }

    fn set_contrast(&mut self, value: u8) -> Result<(), DisplayError> {
        self.state.lock().unwrap().last_contrast = Some(value);
        Ok(())
    }

    fn write_frame(&mut self, frame: &MatrixFrame) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        if state.simulate_flush_failure {
            return Err(DisplayError::Other("simulated flush failure".to_string()));
        }

        let (w, h) = (frame.width(), frame.height());
        let mut pixels = Vec::with_capacity((w * h) as usize);
        for y in 0..h {
            for x in 0..w {
                pixels.push(frame.is_set(x, y));
            }
        }
        state.last_frame = pixels;
        state.flush_count += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        state.clear_count += 1;
        state.last_frame.fill(false);
        Ok(())
    }

    fn power(&mut self, on: bool) -> Result<(), DisplayError> {
        self.state.lock().unwrap().powered = Some(on);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::BinaryColor;
    use embedded_graphics::prelude::*;

    #[test]
    fn test_mock_records_operations() {
        let mut driver = MockDriver::new(32, 8);
        let state = driver.state();

        driver.init().unwrap();
        driver.set_contrast(16).unwrap();

        let mut frame = MatrixFrame::new(32, 8);
        frame
            .draw_iter([Pixel(Point::new(1, 1), BinaryColor::On)])
            .unwrap();
        driver.write_frame(&frame).unwrap();

        let s = state.lock().unwrap();
        assert_eq!(s.init_count, 1);
        assert_eq!(s.flush_count, 1);
        assert_eq!(s.last_contrast, Some(16));
        assert_eq!(s.lit_pixels(), 1);
    }

    #[test]
    fn test_mock_simulated_failure() {
        let mut driver = MockDriver::new(32, 8);
        driver.state().lock().unwrap().simulate_flush_failure = true;

        let frame = MatrixFrame::new(32, 8);
        assert!(driver.write_frame(&frame).is_err());
    }
}
