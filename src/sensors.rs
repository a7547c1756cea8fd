/*
 *  sensors.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Room sensor sources
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

use log::debug;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

use crate::scene::RoomReading;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sensor file parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected {expected} rooms, sensor source returned {actual}")]
    RoomCount { expected: usize, actual: usize },
    #[error("room '{name}': {field} {value} outside 0..=100")]
    OutOfRange { name: String, field: &'static str, value: u16 },
}

/// Source of the current room readings, polled once per tick.
///
/// Implementations must always return the same number of rooms.
pub trait SensorSource {
    fn read(&mut self) -> Result<Vec<RoomReading>, SensorError>;

    /// Rooms to show when the very first read fails
    fn fallback(&self) -> Vec<RoomReading>;

    /// Number of rooms this source reports
    fn room_count(&self) -> usize {
        self.fallback().len()
    }
}

/// Fixed readings, typically from the config file
#[derive(Debug, Clone)]
pub struct StaticSensors {
    rooms: Vec<RoomReading>,
}

impl StaticSensors {
    pub fn new(rooms: Vec<RoomReading>) -> Self {
        Self { rooms }
    }

    /// Replace the readings, keeping the room count
    pub fn set(&mut self, index: usize, reading: RoomReading) {
        if let Some(slot) = self.rooms.get_mut(index) {
            *slot = reading;
        }
    }
}

impl SensorSource for StaticSensors {
    fn read(&mut self) -> Result<Vec<RoomReading>, SensorError> {
        Ok(self.rooms.clone())
    }

    fn fallback(&self) -> Vec<RoomReading> {
        self.rooms.clone()
    }
}

/// Raw record as found in the sensor file. Humidity and battery are
/// parsed wide so out-of-range values are reported instead of wrapping.
#[derive(Debug, serde::Deserialize)]
struct RawReading {
    name: String,
    temperature: f32,
    humidity: u16,
    battery: u16,
}

impl RawReading {
    fn into_reading(self) -> Result<RoomReading, SensorError> {
        let humidity = percent(&self.name, "humidity", self.humidity)?;
        let battery = percent(&self.name, "battery", self.battery)?;
        Ok(RoomReading::new(self.name, self.temperature, humidity, battery))
    }
}

fn percent(name: &str, field: &'static str, value: u16) -> Result<u8, SensorError> {
    if value > 100 {
        return Err(SensorError::OutOfRange { name: name.to_string(), field, value });
    }
    Ok(value as u8)
}

/// Reads a JSON array of room readings from a file every tick.
///
/// Some other process (a BLE scanner, a cron job) keeps the file current.
#[derive(Debug, Clone)]
pub struct JsonFileSensors {
    path: PathBuf,
    initial: Vec<RoomReading>,
}

impl JsonFileSensors {
    /// `initial` fixes the room count and is shown until the file is readable
    pub fn new(path: impl Into<PathBuf>, initial: Vec<RoomReading>) -> Self {
        Self { path: path.into(), initial }
    }
}

impl SensorSource for JsonFileSensors {
    fn read(&mut self) -> Result<Vec<RoomReading>, SensorError> {
        let text = fs::read_to_string(&self.path)?;
        let raw: Vec<RawReading> = serde_json::from_str(&text)?;
        if raw.len() != self.initial.len() {
            return Err(SensorError::RoomCount {
                expected: self.initial.len(),
                actual: raw.len(),
            });
        }
        let rooms = raw
            .into_iter()
            .map(RawReading::into_reading)
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Read {} rooms from {}", rooms.len(), self.path.display());
        Ok(rooms)
    }

    fn fallback(&self) -> Vec<RoomReading> {
        self.initial.clone()
    }
}
