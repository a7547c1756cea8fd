/*
 *  display/dirty.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Change detection between two scene snapshots
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

use std::collections::BTreeSet;

use crate::display::layout::RegionId;
use crate::scene::{RoomReading, SceneModel};

/// Temperature change (°C) below which a room is considered unchanged
pub const DEFAULT_TEMPERATURE_EPSILON: f32 = 0.05;

/// Regions needing a redraw, iterated in drawing order
pub type DirtySet = BTreeSet<RegionId>;

/// Every region for a scene with `room_count` rooms
pub fn all_regions(room_count: usize) -> DirtySet {
    std::iter::once(RegionId::Clock)
        .chain((0..room_count).map(RegionId::Room))
        .collect()
}

/// Work out which regions changed between `previous` and `current`.
///
/// With no previous scene everything is dirty. Humidity and battery
/// compare exactly; temperature only counts when it moves by more than
/// `epsilon` so sensor jitter does not trigger refreshes.
pub fn diff(previous: Option<&SceneModel>, current: &SceneModel, epsilon: f32) -> DirtySet {
    let Some(previous) = previous else {
        return all_regions(current.rooms.len());
    };

    let mut dirty = DirtySet::new();
    if previous.clock != current.clock {
        dirty.insert(RegionId::Clock);
    }
    for (i, room) in current.rooms.iter().enumerate() {
        let changed = match previous.rooms.get(i) {
            Some(before) => room_changed(before, room, epsilon),
            None => true,
        };
        if changed {
            dirty.insert(RegionId::Room(i));
        }
    }
    dirty
}

fn room_changed(before: &RoomReading, now: &RoomReading, epsilon: f32) -> bool {
    (now.temperature - before.temperature).abs() > epsilon
        || now.humidity != before.humidity
        || now.battery != before.battery
}
