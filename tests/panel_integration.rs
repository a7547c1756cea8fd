/*
 *  tests/panel_integration.rs
 *
 *  Integration tests for the display update loop
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 */

use chrono::{FixedOffset, TimeZone};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use inkstat::display::drivers::mock::MockDevice;
use inkstat::display::{
    CardRenderer, ControllerConfig, DirtySet, DisplayCapabilities, FullReason, LayoutConfig, MonoSurface,
    Region, RegionId, RenderError, Renderer, TickAction, UpdateController, UpdateStrategy,
};
use inkstat::scene::{BoxContent, ClockValue, RoomReading, SceneModel};
use inkstat::sensors::StaticSensors;

fn living(temperature: f32) -> RoomReading {
    RoomReading::new("Living", temperature, 45, 97)
}

fn scene(clock: &str, rooms: Vec<RoomReading>) -> SceneModel {
    SceneModel::new(ClockValue::new(clock), rooms)
}

fn two_rooms(clock: &str, t1: f32) -> SceneModel {
    scene(clock, vec![living(21.3), RoomReading::new("Bedroom", t1, 52, 88)])
}

fn start(mock: &MockDevice, rooms: usize, config: ControllerConfig) -> UpdateController {
    let layout = LayoutConfig::epd_2in13(rooms);
    let ctl = UpdateController::new(Box::new(mock.clone()), Box::new(CardRenderer::new()), &layout, config)
        .expect("controller starts");
    mock.set_regions(ctl.regions());
    ctl
}

#[test]
fn test_first_tick_writes_everything_once() {
    let mock = MockDevice::windowed(122, 250);
    let mut ctl = start(&mock, 1, ControllerConfig::default());

    let r = ctl.tick(scene("08:00", vec![living(21.3)]));
    assert_eq!(r.dirty, DirtySet::from([RegionId::Clock, RegionId::Room(0)]));
    assert_eq!(r.action, TickAction::Full(FullReason::FirstFrame));
    assert_eq!(r.full_writes, 1);

    let st = mock.state();
    let st = st.lock().unwrap();
    assert_eq!(st.full_writes, 1);
    assert_eq!(st.windowed_writes, 0);
    assert!(st.panel.count_ink() > 0);
}

#[test]
fn test_minute_tick_rewrites_only_the_clock() {
    let mock = MockDevice::windowed(122, 250);
    let mut ctl = start(&mock, 1, ControllerConfig::default());
    ctl.tick(scene("08:00", vec![living(21.3)]));

    let r = ctl.tick(scene("08:01", vec![living(21.3)]));
    assert_eq!(r.dirty, DirtySet::from([RegionId::Clock]));
    assert_eq!(r.action, TickAction::Partial);
    assert_eq!(mock.state().lock().unwrap().written_regions, vec![RegionId::Clock]);
}

#[test]
fn test_small_temperature_drift_is_ignored() {
    let mock = MockDevice::windowed(122, 250);
    let mut ctl = start(&mock, 1, ControllerConfig::default());
    ctl.tick(scene("08:00", vec![living(21.30)]));

    let r = ctl.tick(scene("08:00", vec![living(21.34)]));
    assert!(r.dirty.is_empty());
    assert_eq!(r.action, TickAction::Unchanged);

    // compared against the last scene, not the last drawn one
    let r = ctl.tick(scene("08:00", vec![living(21.40)]));
    assert_eq!(r.dirty, DirtySet::from([RegionId::Room(0)]));
    assert_eq!(r.action, TickAction::Partial);
}

#[test]
fn test_full_only_device_writes_one_frame_per_dirty_tick() {
    let mock = MockDevice::full_only(122, 250);
    let mut ctl = start(&mock, 2, ControllerConfig::default());
    assert_eq!(ctl.strategy(), UpdateStrategy::Full);

    ctl.tick(two_rooms("08:00", 19.0));
    let r = ctl.tick(two_rooms("08:01", 19.0));
    assert_eq!(r.action, TickAction::Full(FullReason::StrategyFull));
    let r = ctl.tick(two_rooms("08:02", 20.0));
    assert_eq!(r.dirty.len(), 2);
    assert_eq!(r.full_writes, 1);
    let r = ctl.tick(two_rooms("08:02", 20.0));
    assert_eq!(r.action, TickAction::Unchanged);

    let st = mock.state();
    let st = st.lock().unwrap();
    assert_eq!(st.full_writes, 3);
    assert_eq!(st.total_writes(), 3);
}

#[test]
fn test_region_failing_twice_degrades_to_one_full_write() {
    let mock = MockDevice::windowed(122, 250);
    let mut ctl = start(&mock, 2, ControllerConfig::default());
    ctl.tick(two_rooms("08:00", 19.0));
    ctl.tick(two_rooms("08:01", 19.0));
    assert_eq!(ctl.partial_update_counter(), 1);

    mock.state().lock().unwrap().fail_region = Some(RegionId::Room(1));
    let r = ctl.tick(two_rooms("08:02", 19.5));

    assert_eq!(r.action, TickAction::Full(FullReason::Degraded));
    assert_eq!(r.full_writes, 1);
    assert_eq!(r.failure.as_ref().and_then(|f| f.region), Some(RegionId::Room(1)));
    assert_eq!(ctl.partial_update_counter(), 0);
    assert!(!ctl.full_refresh_pending());

    let st = mock.state();
    let st = st.lock().unwrap();
    assert_eq!(st.full_writes, 2);
    drop(st);
    // what the controller believes is on the panel is what is on it
    assert_eq!(ctl.shadow().unwrap().frame(), &mock.panel());
}

#[test]
fn test_forced_refresh_after_consecutive_partials() {
    let mock = MockDevice::windowed(122, 250);
    let config = ControllerConfig { full_update_after_partials: 10, ..ControllerConfig::default() };
    let mut ctl = start(&mock, 1, config);
    ctl.tick(scene("08:00", vec![living(21.3)]));

    for minute in 1..=10 {
        let r = ctl.tick(scene(&format!("08:{:02}", minute), vec![living(21.3)]));
        assert_eq!(r.action, TickAction::Partial, "tick {}", minute);
    }
    assert_eq!(ctl.partial_update_counter(), 10);

    let r = ctl.tick(scene("08:11", vec![living(21.3)]));
    assert_eq!(r.action, TickAction::Full(FullReason::Scheduled));
    assert_eq!(ctl.partial_update_counter(), 0);
    assert_eq!(mock.state().lock().unwrap().full_writes, 2);
}

#[test]
fn test_clean_ticks_do_not_count_towards_refresh() {
    let mock = MockDevice::windowed(122, 250);
    let config = ControllerConfig { full_update_after_partials: 2, ..ControllerConfig::default() };
    let mut ctl = start(&mock, 1, config);
    ctl.tick(scene("08:00", vec![living(21.3)]));
    ctl.tick(scene("08:01", vec![living(21.3)]));
    ctl.tick(scene("08:01", vec![living(21.3)]));
    ctl.tick(scene("08:01", vec![living(21.3)]));
    assert_eq!(ctl.partial_update_counter(), 1);
    assert!(!ctl.full_refresh_pending());
}

#[test]
fn test_poll_reads_clock_and_sensors() {
    let mock = MockDevice::windowed(122, 250);
    let mut ctl = start(&mock, 1, ControllerConfig::default());
    let mut sensors = StaticSensors::new(vec![living(21.3)]);
    let tz = FixedOffset::east_opt(0).unwrap();

    let r = ctl.poll(&tz.with_ymd_and_hms(2026, 1, 5, 8, 0, 10).unwrap(), "%H:%M", &mut sensors);
    assert_eq!(r.action, TickAction::Full(FullReason::FirstFrame));

    // same minute, nothing to do
    let r = ctl.poll(&tz.with_ymd_and_hms(2026, 1, 5, 8, 0, 40).unwrap(), "%H:%M", &mut sensors);
    assert_eq!(r.action, TickAction::Unchanged);

    sensors.set(0, living(23.0));
    let r = ctl.poll(&tz.with_ymd_and_hms(2026, 1, 5, 8, 1, 5).unwrap(), "%H:%M", &mut sensors);
    assert_eq!(r.dirty, DirtySet::from([RegionId::Clock, RegionId::Room(0)]));
    assert_eq!(ctl.previous().unwrap().clock.as_str(), "08:01");
}

/// Card renderer that refuses one region while `broken` is set
struct FlakyRenderer {
    broken: Arc<AtomicBool>,
    target: RegionId,
}

impl Renderer for FlakyRenderer {
    fn render(&self, region: &Region, content: &BoxContent<'_>) -> Result<MonoSurface, RenderError> {
        if region.id == self.target && self.broken.load(Ordering::SeqCst) {
            return Err(RenderError::Drawing(format!("{} unavailable", region.id)));
        }
        CardRenderer::new().render(region, content)
    }
}

#[test]
fn test_windowed_device_without_full_write_gets_panel_window() {
    let caps = DisplayCapabilities {
        supports_full_write: false,
        supports_windowed_write: true,
        ..DisplayCapabilities::full_only(122, 250)
    };
    let mock = MockDevice::with_capabilities(caps);
    let mut ctl = start(&mock, 1, ControllerConfig::default());
    assert_eq!(ctl.strategy(), UpdateStrategy::WindowedPartial);

    let r = ctl.tick(scene("08:00", vec![living(21.3)]));
    assert_eq!(r.action, TickAction::Full(FullReason::FirstFrame));

    let st = mock.state();
    let st = st.lock().unwrap();
    assert_eq!(st.full_writes, 0);
    assert_eq!(st.written_windows, vec![(0, 0, 122, 250)]);
    assert_eq!(st.written_regions, vec![RegionId::Panel]);
    drop(st);
    assert_eq!(ctl.shadow().unwrap().frame(), &mock.panel());
}

#[test]
fn test_partial_image_device_without_full_write_gets_panel_region() {
    let caps = DisplayCapabilities {
        supports_full_write: false,
        supports_partial_image: true,
        ..DisplayCapabilities::full_only(122, 250)
    };
    let mock = MockDevice::with_capabilities(caps);
    let mut ctl = start(&mock, 1, ControllerConfig::default());
    assert_eq!(ctl.strategy(), UpdateStrategy::ConveniencePartial);

    let r = ctl.tick(scene("08:00", vec![living(21.3)]));
    assert_eq!(r.action, TickAction::Full(FullReason::FirstFrame));
    let r = ctl.tick(scene("08:01", vec![living(21.3)]));
    assert_eq!(r.action, TickAction::Partial);

    let st = mock.state();
    let st = st.lock().unwrap();
    assert_eq!(st.full_writes, 0);
    assert_eq!(st.partial_image_writes, 2);
    assert_eq!(st.written_regions, vec![RegionId::Panel, RegionId::Clock]);
}

#[test]
fn test_render_failure_only_costs_its_region() {
    let mock = MockDevice::windowed(122, 250);
    let broken = Arc::new(AtomicBool::new(false));
    let renderer = FlakyRenderer { broken: Arc::clone(&broken), target: RegionId::Room(1) };
    let layout = LayoutConfig::epd_2in13(2);
    let mut ctl = UpdateController::new(Box::new(mock.clone()), Box::new(renderer), &layout, ControllerConfig::default())
        .expect("controller starts");
    mock.set_regions(ctl.regions());
    ctl.tick(two_rooms("08:00", 20.0));

    broken.store(true, Ordering::SeqCst);

    // the only dirty region cannot be drawn: no I/O, no escalation
    let r = ctl.tick(two_rooms("08:00", 21.0));
    assert_eq!(r.action, TickAction::RenderFailed);
    assert_eq!(r.render_failures, vec![RegionId::Room(1)]);
    assert!(r.failure.is_none());
    assert!(!ctl.full_refresh_pending());
    assert_eq!(ctl.partial_update_counter(), 0);
    assert_eq!(mock.state().lock().unwrap().total_writes(), 1);

    // the clock still goes out while the room stays owed
    let r = ctl.tick(two_rooms("08:01", 21.0));
    assert_eq!(r.dirty, DirtySet::from([RegionId::Clock, RegionId::Room(1)]));
    assert_eq!(r.action, TickAction::Partial);
    assert_eq!(r.partial_writes, 1);
    assert_eq!(mock.state().lock().unwrap().written_regions, vec![RegionId::Clock]);

    // renderer recovers: the unchanged scene still redraws the room
    broken.store(false, Ordering::SeqCst);
    let r = ctl.tick(two_rooms("08:01", 21.0));
    assert_eq!(r.dirty, DirtySet::from([RegionId::Room(1)]));
    assert_eq!(r.action, TickAction::Partial);
    assert_eq!(mock.state().lock().unwrap().written_regions, vec![RegionId::Clock, RegionId::Room(1)]);
    assert_eq!(ctl.shadow().unwrap().frame(), &mock.panel());

    let r = ctl.tick(two_rooms("08:01", 21.0));
    assert_eq!(r.action, TickAction::Unchanged);
}
