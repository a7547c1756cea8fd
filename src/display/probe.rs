/*
 *  display/probe.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Capability probe - pick an update strategy for a device handle
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

use crate::display::traits::{DisplayCapabilities, DisplayDevice};

/// How the controller pushes changes to the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// Whole frame every time
    Full,
    /// One framebuffer window write per dirty region
    WindowedPartial,
    /// One driver "partial image" call per dirty region
    ConveniencePartial,
    /// No write path at all
    Unsupported,
}

impl UpdateStrategy {
    pub fn is_partial(self) -> bool {
        matches!(self, UpdateStrategy::WindowedPartial | UpdateStrategy::ConveniencePartial)
    }
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateStrategy::Full => "full",
            UpdateStrategy::WindowedPartial => "windowed-partial",
            UpdateStrategy::ConveniencePartial => "convenience-partial",
            UpdateStrategy::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Classify a capability set. Windowed writes beat the partial image
/// call, which beats full frames.
pub fn classify(caps: &DisplayCapabilities) -> UpdateStrategy {
    if !caps.can_write() {
        UpdateStrategy::Unsupported
    } else if caps.supports_windowed_write {
        UpdateStrategy::WindowedPartial
    } else if caps.supports_partial_image {
        UpdateStrategy::ConveniencePartial
    } else {
        UpdateStrategy::Full
    }
}

/// Inspect a device handle and pick its strategy
pub fn probe(device: &dyn DisplayDevice) -> UpdateStrategy {
    classify(device.capabilities())
}
