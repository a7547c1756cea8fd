/*
 *  config.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Configuration - YAML file, CLI overrides and validation
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

use chrono::format::{Item, StrftimeItems};
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::display::controller::{
    ControllerConfig, DEFAULT_FULL_UPDATE_AFTER_PARTIALS, DEFAULT_POLL_INTERVAL, DEFAULT_WRITE_RETRIES,
};
use crate::display::dirty::DEFAULT_TEMPERATURE_EPSILON;
use crate::display::layout::LayoutConfig;
use crate::display::traits::DisplayCapabilities;
use crate::scene::{RoomReading, DEFAULT_CLOCK_FORMAT};

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every field is optional so layers merge.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default, PartialEq)]
pub struct Config {
    pub log_level: Option<String>,              // e.g., "info" | "debug"
    pub poll_interval_secs: Option<u64>,
    pub full_update_after_partials: Option<u32>,
    pub temperature_epsilon: Option<f32>,       // °C
    pub write_retries: Option<u32>,
    pub clock_format: Option<String>,           // strftime, e.g. "%H:%M"
    /// panel geometry & device selection
    pub display: Option<DisplayConfig>,
    /// where room readings come from
    pub sensors: Option<SensorConfig>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default, PartialEq)]
pub struct DisplayConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub clock_height: Option<u32>,
    pub room_height: Option<u32>,
    pub device: Option<DeviceKind>,     // <- strongly-typed device selection
    pub preview_dir: Option<PathBuf>,
    pub windowed_write: Option<bool>,   // advertise windowed writes
    pub partial_image: Option<bool>,    // advertise the partial image call
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default, PartialEq)]
pub struct SensorConfig {
    /// JSON file re-read every tick
    pub file: Option<PathBuf>,
    /// fixed room list; also the fallback and room count for `file`
    pub rooms: Option<Vec<RoomReading>>,
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Mock,
    Preview,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "inkstat", version, about = "E-paper room status panel")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level
    #[arg(long, short = 'v', alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,
    #[arg(long)]
    pub full_update_after_partials: Option<u32>,
    #[arg(long, value_enum)]
    pub device: Option<DeviceKind>,
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub preview_dir: Option<PathBuf>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub sensors_file: Option<PathBuf>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
    /// run a single tick, put the panel to sleep and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub once: bool,
}

/// Public entry point: read YAML, merge CLI overrides, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/inkstat/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/inkstat/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/inkstat.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["inkstat.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    // top-level
    if src.log_level.is_some()                  { dst.log_level = src.log_level; }
    if src.poll_interval_secs.is_some()         { dst.poll_interval_secs = src.poll_interval_secs; }
    if src.full_update_after_partials.is_some() { dst.full_update_after_partials = src.full_update_after_partials; }
    if src.temperature_epsilon.is_some()        { dst.temperature_epsilon = src.temperature_epsilon; }
    if src.write_retries.is_some()              { dst.write_retries = src.write_retries; }
    if src.clock_format.is_some()               { dst.clock_format = src.clock_format; }
    // display
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
    // sensors
    match (&mut dst.sensors, src.sensors) {
        (None, Some(c)) => dst.sensors = Some(c),
        (Some(d), Some(s)) => {
            if s.file.is_some()  { d.file = s.file; }
            if s.rooms.is_some() { d.rooms = s.rooms; }
        }
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.width.is_some()          { dst.width = src.width; }
    if src.height.is_some()         { dst.height = src.height; }
    if src.clock_height.is_some()   { dst.clock_height = src.clock_height; }
    if src.room_height.is_some()    { dst.room_height = src.room_height; }
    if src.device.is_some()         { dst.device = src.device; }
    if src.preview_dir.is_some()    { dst.preview_dir = src.preview_dir; }
    if src.windowed_write.is_some() { dst.windowed_write = src.windowed_write; }
    if src.partial_image.is_some()  { dst.partial_image = src.partial_image; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()                  { cfg.log_level = cli.log_level.clone(); }
    if cli.poll_interval_secs.is_some()         { cfg.poll_interval_secs = cli.poll_interval_secs; }
    if cli.full_update_after_partials.is_some() { cfg.full_update_after_partials = cli.full_update_after_partials; }

    if cli.device.is_some() || cli.preview_dir.is_some() {
        let display = cfg.display.get_or_insert_with(DisplayConfig::default);
        if cli.device.is_some()      { display.device = cli.device; }
        if cli.preview_dir.is_some() { display.preview_dir = cli.preview_dir.clone(); }
    }
    if cli.sensors_file.is_some() {
        cfg.sensors.get_or_insert_with(SensorConfig::default).file = cli.sensors_file.clone();
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.poll_interval_secs == Some(0) {
        return Err(ConfigError::Validation("poll_interval_secs must be > 0".into()));
    }
    if cfg.full_update_after_partials == Some(0) {
        return Err(ConfigError::Validation("full_update_after_partials must be > 0".into()));
    }
    if let Some(eps) = cfg.temperature_epsilon {
        if !eps.is_finite() || eps < 0.0 {
            return Err(ConfigError::Validation("temperature_epsilon must be a finite value >= 0".into()));
        }
    }
    if let Some(fmt) = cfg.clock_format.as_deref() {
        if fmt.is_empty() || StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Validation(format!("clock_format '{}' is not a valid strftime pattern", fmt)));
        }
    }
    if let Some(display) = cfg.display.as_ref() {
        if display.width == Some(0) || display.height == Some(0) {
            return Err(ConfigError::Validation("display width/height must be > 0".into()));
        }
        if display.device == Some(DeviceKind::Preview) && display.preview_dir.is_none() {
            return Err(ConfigError::Validation("preview device needs display.preview_dir".into()));
        }
    }
    for room in cfg.sensors.iter().flat_map(|s| s.rooms.iter().flatten()) {
        if room.humidity > 100 || room.battery > 100 {
            return Err(ConfigError::Validation(format!(
                "room '{}': humidity and battery must be 0..=100", room.name
            )));
        }
    }
    Ok(())
}

impl Config {
    pub fn controller(&self) -> ControllerConfig {
        ControllerConfig {
            poll_interval: self.poll_interval_secs.map(Duration::from_secs).unwrap_or(DEFAULT_POLL_INTERVAL),
            full_update_after_partials: self
                .full_update_after_partials
                .unwrap_or(DEFAULT_FULL_UPDATE_AFTER_PARTIALS),
            temperature_epsilon: self.temperature_epsilon.unwrap_or(DEFAULT_TEMPERATURE_EPSILON),
            write_retries: self.write_retries.unwrap_or(DEFAULT_WRITE_RETRIES),
        }
    }

    pub fn clock_format(&self) -> &str {
        self.clock_format.as_deref().unwrap_or(DEFAULT_CLOCK_FORMAT)
    }

    /// Configured rooms, or four empty cards
    pub fn rooms(&self) -> Vec<RoomReading> {
        self.sensors
            .as_ref()
            .and_then(|s| s.rooms.clone())
            .unwrap_or_else(|| {
                ["Living", "Bedroom", "Kitchen", "Office"]
                    .into_iter()
                    .map(|name| RoomReading::new(name, 0.0, 0, 0))
                    .collect()
            })
    }

    pub fn sensors_file(&self) -> Option<&Path> {
        self.sensors.as_ref().and_then(|s| s.file.as_deref())
    }

    pub fn layout(&self, room_count: usize) -> LayoutConfig {
        let base = LayoutConfig::epd_2in13(room_count);
        let Some(d) = self.display.as_ref() else { return base };
        LayoutConfig {
            width: d.width.unwrap_or(base.width),
            height: d.height.unwrap_or(base.height),
            clock_height: d.clock_height.unwrap_or(base.clock_height),
            room_height: d.room_height.unwrap_or(base.room_height),
            room_count,
        }
    }

    pub fn device(&self) -> DeviceKind {
        self.display.as_ref().and_then(|d| d.device).unwrap_or(DeviceKind::Mock)
    }

    pub fn preview_dir(&self) -> Option<&Path> {
        self.display.as_ref().and_then(|d| d.preview_dir.as_deref())
    }

    /// Capability surface advertised by the simulated devices. Windowed
    /// writes are on unless switched off.
    pub fn device_capabilities(&self, layout: &LayoutConfig) -> DisplayCapabilities {
        let d = self.display.clone().unwrap_or_default();
        DisplayCapabilities {
            supports_windowed_write: d.windowed_write.unwrap_or(true),
            supports_partial_image: d.partial_image.unwrap_or(false),
            ..DisplayCapabilities::full_only(layout.width, layout.height)
        }
    }
}
