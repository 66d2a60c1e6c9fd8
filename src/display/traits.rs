/*
 *  display/traits.rs
 *
 *  TickerTock - time is money
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for matrix driver abstraction
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

use crate::display::error::DisplayError;
use crate::display::frame::MatrixFrame;

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    /// Number of cascaded 8x8 blocks in the chain
    pub cascaded_blocks: u32,

    /// Whether the display supports contrast control
    pub supports_contrast: bool,
}

/// Minimal hardware abstraction - all matrix drivers must implement this
/// trait. It covers the operations the renderer needs: bring the panel up,
/// push a full frame, and control contrast and power.
pub trait MatrixDriver: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Initialize the display hardware
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Set display contrast (0-255, mapped to the panel's native range)
    fn set_contrast(&mut self, value: u8) -> Result<(), DisplayError>;

    /// Transfer a full framebuffer to the display hardware
    fn write_frame(&mut self, frame: &MatrixFrame) -> Result<(), DisplayError>;

    /// Clear the display to blank/off state
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Switch the panel on or off (if supported)
    fn power(&mut self, _on: bool) -> Result<(), DisplayError> {
        Err(DisplayError::UnsupportedOperation)
    }
}

pub type BoxedDriver = Box<dyn MatrixDriver>;
