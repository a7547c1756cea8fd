/*
 *  display/error.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for the display subsystem
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

/// Error returned by every display device operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    /// Device could not be opened or initialised
    InitializationFailed(String),

    /// Bus or driver level failure while talking to the panel
    Transport(String),

    /// The device does not expose this operation
    UnsupportedOperation,

    /// Window does not fit on the panel
    WindowOutOfBounds { x: u32, y: u32, width: u32, height: u32 },

    /// Surface size does not match what the operation expects
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Generic error with message
    Other(String),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::InitializationFailed(msg) =>
                write!(f, "Display initialization failed: {}", msg),
            DisplayError::Transport(msg) =>
                write!(f, "Display transport error: {}", msg),
            DisplayError::UnsupportedOperation =>
                write!(f, "Operation not supported by this display"),
            DisplayError::WindowOutOfBounds { x, y, width, height } =>
                write!(f, "Window {}x{} at ({}, {}) is outside the panel", width, height, x, y),
            DisplayError::BufferSizeMismatch { expected, actual } =>
                write!(f, "Buffer size mismatch: expected {} pixels, got {}", expected, actual),
            DisplayError::Other(msg) =>
                write!(f, "{}", msg),
        }
    }
}

impl Error for DisplayError {}

impl DisplayError {
    /// True for failures of the link to the panel, as opposed to a bad
    /// request. A device that failed this way may come back different.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DisplayError::InitializationFailed(_) | DisplayError::Transport(_) | DisplayError::Other(_)
        )
    }
}

impl From<std::io::Error> for DisplayError {
    fn from(err: std::io::Error) -> Self {
        DisplayError::Transport(err.to_string())
    }
}

/// Fatal errors raised while building the update controller
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Layout does not fit the panel, or the panel has no area
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The device has no way to put pixels on the panel
    #[error("display device exposes no write capability")]
    NoWriteCapability,

    #[error("display device error: {0}")]
    Device(#[from] DisplayError),
}

/// Error from the renderer for a single region
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    #[error("region {0} has no area")]
    EmptyRegion(String),
    #[error("drawing failed: {0}")]
    Drawing(String),
}
