/*
 *  display/surface.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime-sized monochrome pixel surface
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
use embedded_graphics::primitives::Rectangle;

/// Paper colour. E-paper powers up white, so `Off` is the background.
pub const BACKGROUND: BinaryColor = BinaryColor::Off;

/// Ink colour
pub const INK: BinaryColor = BinaryColor::On;

/// A runtime-sized 1-bit surface for embedded-graphics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoSurface {
    buf: Vec<BinaryColor>,
    w: usize,
    h: usize,
}

impl MonoSurface {
    /// New surface filled with the background colour
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![BACKGROUND; w * h], w, h }
    }

    pub fn width(&self) -> u32 { self.w as u32 }
    pub fn height(&self) -> u32 { self.h as u32 }

    /// Number of pixels
    pub fn len(&self) -> usize { self.buf.len() }
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }

    /// Immutable raw access, row-major
    pub fn as_slice(&self) -> &[BinaryColor] { &self.buf }

    pub fn pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        self.idx(Point::new(x as i32, y as i32)).map(|i| self.buf[i])
    }

    pub fn fill(&mut self, color: BinaryColor) {
        self.buf.fill(color);
    }

    pub fn count_ink(&self) -> usize {
        self.buf.iter().filter(|&&p| p == INK).count()
    }

    /// Copy `src` onto this surface with its top-left corner at (x, y).
    /// Pixels outside the source rectangle are left untouched and
    /// anything falling off the edge is clipped.
    pub fn blit(&mut self, src: &MonoSurface, x: u32, y: u32) {
        let (x0, y0) = (x as usize, y as usize);
        if x0 >= self.w || y0 >= self.h {
            return;
        }
        let cols = src.w.min(self.w - x0);
        let rows = src.h.min(self.h - y0);
        for row in 0..rows {
            let dst = (y0 + row) * self.w + x0;
            let from = row * src.w;
            self.buf[dst..dst + cols].copy_from_slice(&src.buf[from..from + cols]);
        }
    }

    /// Pack rows MSB first, one bit per pixel, ink = 1, each row padded to
    /// a whole byte. This is the raster layout of binary PBM (P4).
    pub fn to_packed_rows(&self) -> Vec<u8> {
        let stride = self.w.div_ceil(8);
        let mut bytes = vec![0u8; stride * self.h];
        for (i, &pixel) in self.buf.iter().enumerate() {
            if pixel == INK {
                let (row, col) = (i / self.w, i % self.w);
                bytes[row * stride + col / 8] |= 0x80 >> (col % 8);
            }
        }
        bytes
    }

    /// Binary PBM image of the surface
    pub fn to_pbm(&self) -> Vec<u8> {
        let mut out = format!("P4\n{} {}\n", self.w, self.h).into_bytes();
        out.extend(self.to_packed_rows());
        out
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl OriginDimensions for MonoSurface {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for MonoSurface {
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
        self.fill(color);
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        // clip to the surface, then fill row slices
        let area = area.intersection(&self.bounding_box());
        let Size { width, height } = area.size;
        if width == 0 || height == 0 { return Ok(()); }
        let (x0, y0) = (area.top_left.x as usize, area.top_left.y as usize);
        for row in y0..y0 + height as usize {
            let base = row * self.w + x0;
            self.buf[base..base + width as usize].fill(color);
        }
        Ok(())
    }
}
