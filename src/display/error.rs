/*
 *  display/error.rs
 *
 *  TickerTock - time is money
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for the display subsystem
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

use std::error::Error;
use std::fmt;

/// Unified error type for all display operations
#[derive(Debug)]
pub enum DisplayError {
    /// Hardware initialization failed
    InitializationFailed(String),

    /// SPI communication error
    SpiError(String),

    /// Invalid configuration
    InvalidConfiguration(String),

    /// Unsupported operation for this display
    UnsupportedOperation,

    /// Framebuffer size mismatch
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Generic error with message
    Other(String),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::InitializationFailed(msg) => {
                write!(f, "Display initialization failed: {}", msg)
            }
            DisplayError::SpiError(msg) => write!(f, "SPI communication error: {}", msg),
            DisplayError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            DisplayError::UnsupportedOperation => {
                write!(f, "Operation not supported by this display")
            }
            DisplayError::BufferSizeMismatch { expected, actual } => {
                write!(f, "Buffer size mismatch: expected {} pixels, got {}", expected, actual)
            }
            DisplayError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error for DisplayError {}

// Conversion from Linux SPI errors
impl From<linux_embedded_hal::SPIError> for DisplayError {
    fn from(err: linux_embedded_hal::SPIError) -> Self {
        DisplayError::SpiError(format!("{:?}", err))
    }
}
