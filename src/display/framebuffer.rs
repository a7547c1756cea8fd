/*
 *  display/framebuffer.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Shadow frame - what the panel is known to be showing
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

use crate::display::layout::Region;
use crate::display::surface::MonoSurface;

/// Last full panel image that was successfully displayed.
///
/// Only ever updated after the device confirms a write. Partial writes
/// are folded in region by region; a full write replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowFrame {
    frame: MonoSurface,
}

impl ShadowFrame {
    /// Adopt a frame that was just written in full
    pub fn from_full(frame: MonoSurface) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &MonoSurface {
        &self.frame
    }

    /// Fold a region that was just written partially. Only pixels inside
    /// the region rectangle change.
    pub fn apply_region(&mut self, region: &Region, surface: &MonoSurface) {
        self.frame.blit(surface, region.x, region.y);
    }

    /// Working copy of the frame with `updates` folded in, for a full write
    /// built on top of what is already on the panel
    pub fn composite<'a, I>(&self, updates: I) -> MonoSurface
    where
        I: IntoIterator<Item = (&'a Region, &'a MonoSurface)>,
    {
        let mut out = self.frame.clone();
        for (region, surface) in updates {
            out.blit(surface, region.x, region.y);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::layout::RegionId;
    use crate::display::surface::{BACKGROUND, INK};

    fn band(id: RegionId, y: u32, height: u32) -> Region {
        Region { id, x: 0, y, width: 8, height }
    }

    fn inked(width: u32, height: u32) -> MonoSurface {
        let mut s = MonoSurface::new(width, height);
        s.fill(INK);
        s
    }

    #[test]
    fn test_apply_region_stays_inside_rectangle() {
        let mut shadow = ShadowFrame::from_full(MonoSurface::new(8, 8));
        shadow.apply_region(&band(RegionId::Room(0), 4, 2), &inked(8, 2));
        assert_eq!(shadow.frame().count_ink(), 16);
        assert_eq!(shadow.frame().pixel(0, 3), Some(BACKGROUND));
        assert_eq!(shadow.frame().pixel(0, 4), Some(INK));
    }

    #[test]
    fn test_apply_region_erases_stale_ink_in_region() {
        let mut shadow = ShadowFrame::from_full(inked(8, 8));
        shadow.apply_region(&band(RegionId::Clock, 0, 4), &MonoSurface::new(8, 4));
        assert_eq!(shadow.frame().count_ink(), 32);
    }

    #[test]
    fn test_composite_leaves_shadow_untouched() {
        let shadow = ShadowFrame::from_full(MonoSurface::new(8, 8));
        let region = band(RegionId::Room(1), 6, 2);
        let surface = inked(8, 2);
        let working = shadow.composite([(&region, &surface)]);
        assert_eq!(working.count_ink(), 16);
        assert_eq!(shadow.frame().count_ink(), 0);
    }
}
