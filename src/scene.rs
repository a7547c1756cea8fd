/*
 *  scene.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Scene model - what should be on the panel this tick
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

use chrono::{DateTime, TimeZone};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sensors::SensorSource;

/// Default clock format, hours and minutes
pub const DEFAULT_CLOCK_FORMAT: &str = "%H:%M";

/// Formatted clock text as shown in the clock band
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClockValue(String);

impl ClockValue {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Format a timestamp with a strftime style pattern
    pub fn from_time<Tz>(now: &DateTime<Tz>, format: &str) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self(now.format(format).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClockValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One room's sensor state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomReading {
    pub name: String,
    /// Degrees Celsius
    pub temperature: f32,
    /// Relative humidity, 0..=100
    pub humidity: u8,
    /// Battery charge, 0..=100
    pub battery: u8,
}

impl RoomReading {
    pub fn new(name: impl Into<String>, temperature: f32, humidity: u8, battery: u8) -> Self {
        Self {
            name: name.into(),
            temperature,
            humidity,
            battery,
        }
    }
}

/// Everything the panel shows. Rooms are identified by index and the
/// room count does not change for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneModel {
    pub clock: ClockValue,
    pub rooms: Vec<RoomReading>,
}

impl SceneModel {
    pub fn new(clock: ClockValue, rooms: Vec<RoomReading>) -> Self {
        Self { clock, rooms }
    }

    /// Build the scene for this tick from the clock and the sensor source.
    ///
    /// A failed sensor read keeps the rooms from `previous` so only the clock
    /// can turn dirty; with no previous scene the configured fallback is used.
    pub fn capture<Tz>(
        now: &DateTime<Tz>,
        clock_format: &str,
        sensors: &mut dyn SensorSource,
        previous: Option<&SceneModel>,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let clock = ClockValue::from_time(now, clock_format);
        let rooms = match sensors.read() {
            Ok(rooms) => rooms,
            Err(e) => {
                warn!("Sensor read failed, keeping last readings: {}", e);
                previous
                    .map(|p| p.rooms.clone())
                    .unwrap_or_else(|| sensors.fallback())
            }
        };
        Self { clock, rooms }
    }
}

/// Content of one box on the panel
#[derive(Debug, Clone, PartialEq)]
pub enum BoxContent<'a> {
    Clock(&'a ClockValue),
    Room(&'a RoomReading),
}
