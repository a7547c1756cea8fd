/*
 *  display/controller.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Update controller - decides per tick between a full refresh, partial
 *  region writes, or nothing, and keeps the shadow frame in step with
 *  what the panel shows
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
use log::{debug, error, info, warn};
use std::fmt;
use std::time::Duration;

use crate::display::dirty::{self, DirtySet, DEFAULT_TEMPERATURE_EPSILON};
use crate::display::error::{ControllerError, DisplayError};
use crate::display::framebuffer::ShadowFrame;
use crate::display::layout::{self, LayoutConfig, Region, RegionId};
use crate::display::probe::{self, UpdateStrategy};
use crate::display::renderer::Renderer;
use crate::display::surface::MonoSurface;
use crate::display::traits::BoxedDevice;
use crate::scene::{BoxContent, SceneModel};
use crate::sensors::SensorSource;

/// Partial ticks allowed before a full refresh clears ghosting
pub const DEFAULT_FULL_UPDATE_AFTER_PARTIALS: u32 = 10;

/// Time between ticks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Immediate retries for a failed write
pub const DEFAULT_WRITE_RETRIES: u32 = 1;

/// Tuning for the update controller
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Sleep between ticks
    pub poll_interval: Duration,

    /// Ticks with partial writes before a forced full refresh
    pub full_update_after_partials: u32,

    /// Temperature change that marks a room dirty
    pub temperature_epsilon: f32,

    /// Immediate retries before a write counts as failed
    pub write_retries: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            full_update_after_partials: DEFAULT_FULL_UPDATE_AFTER_PARTIALS,
            temperature_epsilon: DEFAULT_TEMPERATURE_EPSILON,
            write_retries: DEFAULT_WRITE_RETRIES,
        }
    }
}

/// Where the controller is in its tick cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    /// Built, no tick run yet
    Idle,
    /// Between ticks
    AwaitingTick,
    /// Writing the given regions with the given strategy
    Dispatching { strategy: UpdateStrategy, regions: DirtySet },
    /// The last tick failed to write; the next tick is a full refresh
    Escalated,
}

/// Why a tick wrote the whole panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullReason {
    /// Nothing known to be on the panel yet
    FirstFrame,
    /// The device only takes whole frames
    StrategyFull,
    /// Partial write budget used up
    Scheduled,
    /// Previous tick failed to write
    Escalation,
    /// A region write failed twice this tick
    Degraded,
}

impl fmt::Display for FullReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FullReason::FirstFrame => "first frame",
            FullReason::StrategyFull => "full-only device",
            FullReason::Scheduled => "scheduled refresh",
            FullReason::Escalation => "escalation",
            FullReason::Degraded => "degraded partial",
        };
        f.write_str(name)
    }
}

/// What a tick did to the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Nothing changed, no I/O
    Unchanged,
    /// One or more region writes, no full write
    Partial,
    /// Exactly one full-panel write
    Full(FullReason),
    /// Dirty regions existed but none could be rendered
    RenderFailed,
    /// Writing failed, escalating to a full refresh next tick
    Failed,
}

/// How worried to be about a write failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// First failing tick, or recovered within the tick
    Transient,
    /// The previous tick failed as well
    Persistent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    /// Region whose write failed, `None` for a full write
    pub region: Option<RegionId>,
    pub kind: FailureKind,
    pub error: DisplayError,
}

/// Outcome of one tick, for logging and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub dirty: DirtySet,
    pub action: TickAction,
    pub partial_writes: usize,
    pub full_writes: usize,
    pub render_failures: Vec<RegionId>,
    pub failure: Option<WriteFailure>,
}

impl TickReport {
    fn new(dirty: DirtySet) -> Self {
        Self {
            dirty,
            action: TickAction::Unchanged,
            partial_writes: 0,
            full_writes: 0,
            render_failures: Vec::new(),
            failure: None,
        }
    }
}

/// Owns the device, the renderer, the previous scene and the shadow frame.
/// One tick runs to completion before the next starts.
pub struct UpdateController {
    device: BoxedDevice,
    renderer: Box<dyn Renderer>,
    config: ControllerConfig,
    regions: Vec<Region>,
    panel: (u32, u32),
    strategy: UpdateStrategy,
    state: ControllerState,
    previous: Option<SceneModel>,
    shadow: Option<ShadowFrame>,
    partial_update_counter: u32,
    pending_full: Option<FullReason>,
    reprobe: bool,
    failed_last_tick: bool,
    /// Regions that failed to render last tick; redrawn on the next one
    carry_dirty: DirtySet,
}

impl UpdateController {
    /// Compute regions, open the device and probe it.
    ///
    /// Fails if the layout does not fit, the device is a different size,
    /// the device will not initialise, or it has no write path.
    pub fn new(
        mut device: BoxedDevice,
        renderer: Box<dyn Renderer>,
        layout: &LayoutConfig,
        config: ControllerConfig,
    ) -> Result<Self, ControllerError> {
        let regions = layout::regions(layout)?;

        device.init()?;
        let panel = device.dimensions();
        if panel != (layout.width, layout.height) {
            return Err(ControllerError::Configuration(format!(
                "device panel is {}x{}, layout expects {}x{}",
                panel.0, panel.1, layout.width, layout.height
            )));
        }

        let strategy = probe::probe(device.as_ref());
        if strategy == UpdateStrategy::Unsupported {
            return Err(ControllerError::NoWriteCapability);
        }
        info!("Display {}x{} probed, update strategy: {}", panel.0, panel.1, strategy);

        Ok(Self {
            device,
            renderer,
            config,
            regions,
            panel,
            strategy,
            state: ControllerState::Idle,
            previous: None,
            shadow: None,
            partial_update_counter: 0,
            pending_full: None,
            reprobe: false,
            failed_last_tick: false,
            carry_dirty: DirtySet::new(),
        })
    }

    pub fn strategy(&self) -> UpdateStrategy { self.strategy }
    pub fn state(&self) -> &ControllerState { &self.state }
    pub fn regions(&self) -> &[Region] { &self.regions }
    pub fn config(&self) -> &ControllerConfig { &self.config }
    pub fn previous(&self) -> Option<&SceneModel> { self.previous.as_ref() }
    pub fn shadow(&self) -> Option<&ShadowFrame> { self.shadow.as_ref() }
    pub fn partial_update_counter(&self) -> u32 { self.partial_update_counter }

    /// True when the next tick writes the whole panel whatever changed
    pub fn full_refresh_pending(&self) -> bool {
        self.pending_full.is_some()
    }

    /// Capture the scene from the clock and sensors, then run a tick
    pub fn poll<Tz>(
        &mut self,
        now: &DateTime<Tz>,
        clock_format: &str,
        sensors: &mut dyn SensorSource,
    ) -> TickReport
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let scene = SceneModel::capture(now, clock_format, sensors, self.previous.as_ref());
        self.tick(scene)
    }

    /// Run one update cycle against `current`.
    ///
    /// Device errors never escape: they are logged, reported and turned
    /// into a full refresh on the next tick. `current` becomes the
    /// previous scene whatever happened; regions that failed to render
    /// stay dirty for the next tick.
    pub fn tick(&mut self, current: SceneModel) -> TickReport {
        let mut dirty = dirty::diff(self.previous.as_ref(), &current, self.config.temperature_epsilon);
        dirty.extend(std::mem::take(&mut self.carry_dirty));
        debug!("Tick dirty regions: {:?}", dirty);
        let mut report = TickReport::new(dirty);

        match self.full_reason(&report.dirty) {
            Some(reason) => self.dispatch_full(&current, reason, &mut report),
            None if report.dirty.is_empty() => {}
            None => self.dispatch_partial(&current, &mut report),
        }

        self.failed_last_tick = report.action == TickAction::Failed;
        self.carry_dirty = report.render_failures.iter().copied().collect();
        self.previous = Some(current);
        self.state = if self.pending_full == Some(FullReason::Escalation) {
            ControllerState::Escalated
        } else {
            ControllerState::AwaitingTick
        };
        report
    }

    /// Put the panel to sleep. Called once when the loop ends.
    pub fn shutdown(&mut self) {
        if !self.device.capabilities().supports_sleep {
            info!("Display has no sleep mode, leaving it as is");
            return;
        }
        match self.device.sleep() {
            Ok(()) => info!("Display put to sleep"),
            Err(e) => warn!("Display sleep failed: {}", e),
        }
    }

    fn full_reason(&self, dirty: &DirtySet) -> Option<FullReason> {
        if let Some(reason) = self.pending_full {
            return Some(reason);
        }
        if dirty.is_empty() {
            return None;
        }
        if self.shadow.is_none() {
            Some(FullReason::FirstFrame)
        } else if !self.strategy.is_partial() {
            Some(FullReason::StrategyFull)
        } else {
            None
        }
    }

    fn dispatch_full(&mut self, current: &SceneModel, reason: FullReason, report: &mut TickReport) {
        self.state = if reason == FullReason::Escalation {
            ControllerState::Escalated
        } else {
            ControllerState::Dispatching {
                strategy: UpdateStrategy::Full,
                regions: dirty::all_regions(current.rooms.len()),
            }
        };

        // a device that dropped off the bus has to be reopened first
        if self.reprobe {
            if let Err(e) = self.device.init() {
                self.escalate(None, e, report);
                return;
            }
        }

        let frame = self.render_frame(current, report);
        match self.write_full(&frame) {
            Ok(()) => {
                info!("Full refresh ({}), {} partial ticks since last", reason, self.partial_update_counter);
                self.shadow = Some(ShadowFrame::from_full(frame));
                self.partial_update_counter = 0;
                self.pending_full = None;
                report.full_writes = 1;
                report.action = TickAction::Full(reason);
                if self.reprobe {
                    self.reprobe_device();
                }
            }
            Err(e) => self.escalate(None, e, report),
        }
    }

    fn dispatch_partial(&mut self, current: &SceneModel, report: &mut TickReport) {
        let Some(mut shadow) = self.shadow.take() else {
            return self.dispatch_full(current, FullReason::FirstFrame, report);
        };
        self.state = ControllerState::Dispatching {
            strategy: self.strategy,
            regions: report.dirty.clone(),
        };

        let targets: Vec<Region> = self
            .regions
            .iter()
            .filter(|r| report.dirty.contains(&r.id))
            .copied()
            .collect();

        // once a region fails twice the rest of the tick is folded into one full write
        let mut degraded: Option<(RegionId, DisplayError)> = None;
        let mut held: Vec<(Region, MonoSurface)> = Vec::new();

        for region in targets {
            let Some(surface) = self.render_region(&region, current, report) else {
                continue;
            };
            if degraded.is_some() {
                held.push((region, surface));
                continue;
            }
            match self.write_region(&region, &surface) {
                Ok(()) => {
                    debug!("Partial write of {} ok", region.id);
                    shadow.apply_region(&region, &surface);
                    report.partial_writes += 1;
                }
                Err(e) => {
                    warn!("Partial write of {} failed ({}), degrading to a full write", region.id, e);
                    degraded = Some((region.id, e));
                    held.push((region, surface));
                }
            }
        }

        if let Some((region_id, first_error)) = degraded {
            let frame = shadow.composite(held.iter().map(|(r, s)| (r, s)));
            self.shadow = Some(shadow);
            match self.write_full(&frame) {
                Ok(()) => {
                    info!("Full refresh ({}) after {} failed", FullReason::Degraded, region_id);
                    self.shadow = Some(ShadowFrame::from_full(frame));
                    self.partial_update_counter = 0;
                    report.full_writes = 1;
                    report.action = TickAction::Full(FullReason::Degraded);
                    report.failure = Some(WriteFailure {
                        region: Some(region_id),
                        kind: FailureKind::Transient,
                        error: first_error,
                    });
                }
                Err(e) => self.escalate(Some(region_id), e, report),
            }
            return;
        }

        self.shadow = Some(shadow);
        if report.partial_writes == 0 {
            report.action = TickAction::RenderFailed;
            return;
        }

        report.action = TickAction::Partial;
        self.partial_update_counter += 1;
        debug!(
            "Partial tick {} of {} before forced refresh",
            self.partial_update_counter, self.config.full_update_after_partials
        );
        if self.partial_update_counter >= self.config.full_update_after_partials {
            info!("Partial update budget used, full refresh on next tick");
            self.pending_full = Some(FullReason::Scheduled);
        }
    }

    fn render_region(&self, region: &Region, scene: &SceneModel, report: &mut TickReport) -> Option<MonoSurface> {
        let content = content_for(region.id, scene)?;
        match self.renderer.render(region, &content) {
            Ok(surface) => Some(surface),
            Err(e) => {
                warn!("Rendering {} failed: {}", region.id, e);
                report.render_failures.push(region.id);
                None
            }
        }
    }

    /// Whole panel from scratch. Regions that fail to render stay blank.
    fn render_frame(&self, scene: &SceneModel, report: &mut TickReport) -> MonoSurface {
        let mut frame = MonoSurface::new(self.panel.0, self.panel.1);
        for region in &self.regions {
            if let Some(surface) = self.render_region(region, scene, report) {
                frame.blit(&surface, region.x, region.y);
            }
        }
        frame
    }

    fn write_region(&mut self, region: &Region, surface: &MonoSurface) -> Result<(), DisplayError> {
        let retries = self.config.write_retries;
        let device = &mut self.device;
        match self.strategy {
            UpdateStrategy::WindowedPartial => with_retry(retries, region.id, || {
                device.windowed_write(region.x, region.y, region.width, region.height, surface)
            }),
            UpdateStrategy::ConveniencePartial => {
                with_retry(retries, region.id, || device.partial_image_write(surface, region))
            }
            UpdateStrategy::Full | UpdateStrategy::Unsupported => Err(DisplayError::UnsupportedOperation),
        }
    }

    /// Whole-frame write. Devices without a full write get the frame as a
    /// single panel-sized partial write.
    fn write_full(&mut self, frame: &MonoSurface) -> Result<(), DisplayError> {
        let retries = self.config.write_retries;
        let caps = self.device.capabilities().clone();
        let panel = Region::panel(self.panel.0, self.panel.1);
        let device = &mut self.device;
        with_retry(retries, RegionId::Panel, || {
            if caps.supports_full_write {
                device.full_write(frame)
            } else if caps.supports_windowed_write {
                device.windowed_write(0, 0, panel.width, panel.height, frame)
            } else {
                device.partial_image_write(frame, &panel)
            }
        })
    }

    fn escalate(&mut self, region: Option<RegionId>, err: DisplayError, report: &mut TickReport) {
        let kind = if self.failed_last_tick { FailureKind::Persistent } else { FailureKind::Transient };
        match kind {
            FailureKind::Transient => error!("Display write failed ({}), full refresh next tick", err),
            FailureKind::Persistent => error!("Display still failing ({}), will keep retrying", err),
        }
        if err.is_transport() {
            self.reprobe = true;
        }
        self.pending_full = Some(FullReason::Escalation);
        report.action = TickAction::Failed;
        report.failure = Some(WriteFailure { region, kind, error: err });
    }

    fn reprobe_device(&mut self) {
        let strategy = probe::probe(self.device.as_ref());
        self.reprobe = false;
        if strategy == UpdateStrategy::Unsupported {
            error!("Display reports no write capability after reset, staying on full writes");
            self.strategy = UpdateStrategy::Full;
        } else if strategy != self.strategy {
            info!("Display strategy changed after reset: {} -> {}", self.strategy, strategy);
            self.strategy = strategy;
        }
    }
}

fn content_for(id: RegionId, scene: &SceneModel) -> Option<BoxContent<'_>> {
    match id {
        RegionId::Clock => Some(BoxContent::Clock(&scene.clock)),
        RegionId::Room(i) => scene.rooms.get(i).map(BoxContent::Room),
        RegionId::Panel => None,
    }
}

/// Run `op`, retrying it up to `retries` more times. Unsupported
/// operations are not retried.
fn with_retry<F>(retries: u32, target: RegionId, mut op: F) -> Result<(), DisplayError>
where
    F: FnMut() -> Result<(), DisplayError>,
{
    let mut attempt = 0;
    loop {
        match op() {
            Ok(()) => return Ok(()),
            Err(DisplayError::UnsupportedOperation) => return Err(DisplayError::UnsupportedOperation),
            Err(e) if attempt < retries => {
                attempt += 1;
                warn!("Write of {} failed ({}), retry {}/{}", target, e, attempt, retries);
            }
            Err(e) => return Err(e),
        }
    }
}
