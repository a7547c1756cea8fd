/*
 *  display/layout.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Panel layout - fixed regions for the clock and each room card
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

use std::fmt;

use crate::display::error::ControllerError;

/// Layout constants for the panel.
///
/// Regions are stacked top to bottom: the clock band, then one card per
/// room. Each band height includes the gap below it, and the last band
/// stretches to the bottom edge, so the regions tile the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Panel width in pixels
    pub width: u32,

    /// Panel height in pixels
    pub height: u32,

    /// Height of the clock band
    pub clock_height: u32,

    /// Height of one room card
    pub room_height: u32,

    /// Number of room cards
    pub room_count: usize,
}

impl LayoutConfig {
    /// Layout for the 2.13" 122x250 panel: a 58px clock band and four 48px cards
    pub fn epd_2in13(room_count: usize) -> Self {
        Self {
            width: 122,
            height: 250,
            clock_height: 58,
            room_height: 48,
            room_count,
        }
    }
}

/// Logical element a region belongs to. Ordering is drawing order:
/// the clock first, then rooms by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegionId {
    Clock,
    Room(usize),
    /// The whole panel, for full frames pushed through a partial write call
    Panel,
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionId::Clock => write!(f, "clock"),
            RegionId::Room(i) => write!(f, "room{}", i),
            RegionId::Panel => write!(f, "panel"),
        }
    }
}

/// Pixel rectangle on the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub id: RegionId,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Rectangle covering a whole `width` x `height` panel
    pub fn panel(width: u32, height: u32) -> Self {
        Self { id: RegionId::Panel, x: 0, y: 0, width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn intersects(&self, other: &Region) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Compute the region for every logical element, clock first.
///
/// Fails when the panel is smaller than the bands it has to hold.
pub fn regions(layout: &LayoutConfig) -> Result<Vec<Region>, ControllerError> {
    if layout.width == 0 || layout.height == 0 {
        return Err(ControllerError::Configuration(format!(
            "panel {}x{} has no area", layout.width, layout.height
        )));
    }
    if layout.clock_height == 0 || (layout.room_count > 0 && layout.room_height == 0) {
        return Err(ControllerError::Configuration("clock_height and room_height must be > 0".into()));
    }

    let needed = layout.clock_height as u64 + layout.room_height as u64 * layout.room_count as u64;
    if needed > layout.height as u64 {
        return Err(ControllerError::Configuration(format!(
            "panel height {} is smaller than the {} pixels needed for the clock and {} rooms",
            layout.height, needed, layout.room_count
        )));
    }

    let mut out = Vec::with_capacity(layout.room_count + 1);
    out.push(Region {
        id: RegionId::Clock,
        x: 0,
        y: 0,
        width: layout.width,
        height: layout.clock_height,
    });
    for i in 0..layout.room_count {
        out.push(Region {
            id: RegionId::Room(i),
            x: 0,
            y: layout.clock_height + i as u32 * layout.room_height,
            width: layout.width,
            height: layout.room_height,
        });
    }

    // last band absorbs the leftover rows
    if let Some(last) = out.last_mut() {
        last.height = layout.height - last.y;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partitions(layout: &LayoutConfig, rs: &[Region]) {
        let total: u64 = rs.iter().map(Region::area).sum();
        assert_eq!(total, layout.width as u64 * layout.height as u64);
        for (i, a) in rs.iter().enumerate() {
            for b in &rs[i + 1..] {
                assert!(!a.intersects(b), "{:?} overlaps {:?}", a, b);
            }
        }
        // every pixel is owned by exactly one region
        for y in 0..layout.height {
            for x in 0..layout.width {
                assert_eq!(rs.iter().filter(|r| r.contains(x, y)).count(), 1);
            }
        }
    }

    #[test]
    fn test_default_layout_tiles_panel() {
        let layout = LayoutConfig::epd_2in13(4);
        let rs = regions(&layout).unwrap();
        assert_eq!(rs.len(), 5);
        assert_eq!(rs[0].id, RegionId::Clock);
        assert_eq!(rs[4].id, RegionId::Room(3));
        assert_eq!(rs[4].y + rs[4].height, 250);
        assert_partitions(&layout, &rs);
    }

    #[test]
    fn test_last_region_absorbs_slack() {
        let layout = LayoutConfig::epd_2in13(2);
        let rs = regions(&layout).unwrap();
        assert_eq!(rs[2].y, 58 + 48);
        assert_eq!(rs[2].height, 250 - 106);
        assert_partitions(&layout, &rs);
    }

    #[test]
    fn test_clock_only_layout() {
        let layout = LayoutConfig::epd_2in13(0);
        let rs = regions(&layout).unwrap();
        assert_eq!(rs.len(), 1);
        assert_eq!(rs[0].height, 250);
        assert_partitions(&layout, &rs);
    }

    #[test]
    fn test_panel_too_small_is_fatal() {
        let layout = LayoutConfig::epd_2in13(5);
        assert!(matches!(regions(&layout), Err(ControllerError::Configuration(_))));
    }

    #[test]
    fn test_zero_panel_is_fatal() {
        let layout = LayoutConfig { width: 0, ..LayoutConfig::epd_2in13(1) };
        assert!(regions(&layout).is_err());
    }

    #[test]
    fn test_region_ids_sort_in_drawing_order() {
        let mut ids = vec![RegionId::Room(2), RegionId::Clock, RegionId::Room(0)];
        ids.sort();
        assert_eq!(ids, vec![RegionId::Clock, RegionId::Room(0), RegionId::Room(2)]);
    }
}
