/*
 *  display/traits.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display device abstraction with a feature-detected write surface
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
use crate::display::layout::Region;
use crate::display::surface::MonoSurface;

/// What a device handle can do. Devices differ: some take windowed writes
/// straight into controller RAM, some only offer a "display partial image"
/// call, some only accept whole frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCapabilities {
    /// Panel width in pixels
    pub width: u32,

    /// Panel height in pixels
    pub height: u32,

    /// Whole-frame write with a full refresh waveform
    pub supports_full_write: bool,

    /// Direct write of a rectangular window into the framebuffer
    pub supports_windowed_write: bool,

    /// Higher level partial image update for a region
    pub supports_partial_image: bool,

    /// Low power deep sleep
    pub supports_sleep: bool,
}

impl DisplayCapabilities {
    /// Full-write only device of the given size
    pub fn full_only(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            supports_full_write: true,
            supports_windowed_write: false,
            supports_partial_image: false,
            supports_sleep: true,
        }
    }

    /// True if the device can put pixels on the panel at all
    pub fn can_write(&self) -> bool {
        self.supports_full_write || self.supports_windowed_write || self.supports_partial_image
    }
}

/// A bi-state e-paper panel.
///
/// Only `capabilities` and `init` are mandatory. Optional operations
/// default to `UnsupportedOperation`; drivers override the ones their
/// hardware offers and advertise them in `DisplayCapabilities`.
/// All calls block until the panel reports done.
pub trait DisplayDevice: Send {
    /// Returns the capabilities of this device handle
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the panel dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Open and initialise the panel. Re-opening a reset device may change
    /// what `capabilities` reports.
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Write a panel-sized frame and run a full refresh
    fn full_write(&mut self, frame: &MonoSurface) -> Result<(), DisplayError> {
        let _ = frame;
        Err(DisplayError::UnsupportedOperation)
    }

    /// Write `surface` into the window at (x, y) and refresh only that window
    fn windowed_write(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        surface: &MonoSurface,
    ) -> Result<(), DisplayError> {
        let _ = (x, y, width, height, surface);
        Err(DisplayError::UnsupportedOperation)
    }

    /// Driver-level "display partial image" call for a region
    fn partial_image_write(&mut self, surface: &MonoSurface, region: &Region) -> Result<(), DisplayError> {
        let _ = (surface, region);
        Err(DisplayError::UnsupportedOperation)
    }

    /// Put the panel into deep sleep
    fn sleep(&mut self) -> Result<(), DisplayError> {
        Err(DisplayError::UnsupportedOperation)
    }
}

/// Boxed device handle as owned by the update controller
pub type BoxedDevice = Box<dyn DisplayDevice>;

/// Check a window against the panel and the surface handed in with it
pub fn check_window(
    caps: &DisplayCapabilities,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    surface: &MonoSurface,
) -> Result<(), DisplayError> {
    if width == 0
        || height == 0
        || x.saturating_add(width) > caps.width
        || y.saturating_add(height) > caps.height
    {
        return Err(DisplayError::WindowOutOfBounds { x, y, width, height });
    }
    let expected = width as usize * height as usize;
    if surface.len() != expected {
        return Err(DisplayError::BufferSizeMismatch { expected, actual: surface.len() });
    }
    Ok(())
}
